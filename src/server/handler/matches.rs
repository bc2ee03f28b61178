//! 1v1 matches and their round results.
//!
//! A match is created by challenging a friend. Every played round is
//! submitted as a result by one of the two players and only counts
//! towards the running tally once the other player accepted it.

use actix_toolbox::tb_middleware::Session;
use actix_web::web::{Data, Json, Path};
use actix_web::{get, patch, post, put, HttpResponse};
use chrono::{DateTime, Utc};
use rorm::fields::types::ForeignModelByField;
use rorm::{and, insert, or, query, update, Database, FieldAccess, Model};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::{
    Account, Friendship, FriendshipState, Match, MatchInsert, MatchResult, MatchResultInsert,
    MatchState, ResultState,
};
use crate::scoring::{tally_rounds, RoundScores, ScoringMode};
use crate::server::handler::{AccountResponse, ApiError, ApiErrorResponse, ApiResult, PathUuid, ReviewAction};

/// The path of a single result within a match
#[derive(Deserialize, IntoParams)]
pub struct PathMatchResult {
    /// The uuid of the match
    pub(crate) uuid: Uuid,
    /// The uuid of the result
    pub(crate) result_uuid: Uuid,
}

/// The state of a match as used by the api
#[derive(Serialize, Deserialize, ToSchema, Copy, Clone, Debug)]
#[serde(rename_all = "lowercase")]
pub enum ApiMatchState {
    /// The match is still being played
    Active,
    /// The players have closed the match
    Completed,
}

impl From<MatchState> for ApiMatchState {
    fn from(value: MatchState) -> Self {
        match value {
            MatchState::Active => ApiMatchState::Active,
            MatchState::Completed => ApiMatchState::Completed,
        }
    }
}

/// The review state of a result as used by the api
#[derive(Serialize, ToSchema, Copy, Clone, Debug)]
#[serde(rename_all = "lowercase")]
pub enum ApiResultState {
    /// Waiting for the counterpart player
    Pending,
    /// Counts towards the tally
    Accepted,
    /// Excluded from the tally
    Rejected,
}

impl From<ResultState> for ApiResultState {
    fn from(value: ResultState) -> Self {
        match value {
            ResultState::Pending => ApiResultState::Pending,
            ResultState::Accepted => ApiResultState::Accepted,
            ResultState::Rejected => ApiResultState::Rejected,
        }
    }
}

/// A single match overview
#[derive(Serialize, ToSchema)]
pub struct MatchResponse {
    uuid: Uuid,
    #[schema(example = "Herbert vs Karl")]
    title: String,
    state: ApiMatchState,
    player1: AccountResponse,
    player2: AccountResponse,
    #[schema(example = 3)]
    player1_wins: i64,
    #[schema(example = 1)]
    player2_wins: i64,
    updated_at: DateTime<Utc>,
}

/// The matches a player participates in
#[derive(Serialize, ToSchema)]
pub struct GetMatchesResponse {
    matches: Vec<MatchResponse>,
}

/// A single submitted round result
#[derive(Serialize, ToSchema)]
pub struct MatchResultResponse {
    uuid: Uuid,
    #[schema(example = 72)]
    player1_strokes: i64,
    #[schema(example = 75)]
    player2_strokes: i64,
    played_at: DateTime<Utc>,
    state: ApiResultState,
    submitter: AccountResponse,
}

/// A match including all of its submitted results
#[derive(Serialize, ToSchema)]
pub struct GetMatchResponse {
    #[serde(flatten)]
    #[schema(inline)]
    match_data: MatchResponse,
    results: Vec<MatchResultResponse>,
}

/// Applies the "`player1` vs `player2`" fallback when no usable title
/// was supplied. The empty string counts as unsupplied.
fn title_or_default(requested: Option<String>, player1: &str, player2: &str) -> String {
    requested
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("{player1} vs {player2}"))
}

async fn query_match_response(
    tx: &mut rorm::db::transaction::Transaction,
    match_model: &Match,
) -> ApiResult<MatchResponse> {
    let (p1_username, p1_display_name) =
        query!(&mut *tx, (Account::F.username, Account::F.display_name))
            .condition(Account::F.uuid.equals(*match_model.player1.key()))
            .optional()
            .await?
            .ok_or(ApiError::AccountNotFound)?;

    let (p2_username, p2_display_name) =
        query!(&mut *tx, (Account::F.username, Account::F.display_name))
            .condition(Account::F.uuid.equals(*match_model.player2.key()))
            .optional()
            .await?
            .ok_or(ApiError::AccountNotFound)?;

    Ok(MatchResponse {
        uuid: match_model.uuid,
        title: match_model.title.clone(),
        state: match_model.state.into(),
        player1: AccountResponse {
            uuid: *match_model.player1.key(),
            username: p1_username,
            display_name: p1_display_name,
        },
        player2: AccountResponse {
            uuid: *match_model.player2.key(),
            username: p2_username,
            display_name: p2_display_name,
        },
        player1_wins: match_model.player1_wins,
        player2_wins: match_model.player2_wins,
        updated_at: DateTime::from_naive_utc_and_offset(match_model.updated_at, Utc),
    })
}

/// Retrieves all matches the executing user is a player of
#[utoipa::path(
    tag = "Matches",
    context_path = "/api/v2",
    responses(
        (status = 200, description = "Returns all matches of the player", body = GetMatchesResponse),
        (status = 401, description = "Unauthenticated", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[get("/matches")]
pub async fn get_matches(db: Data<Database>, session: Session) -> ApiResult<Json<GetMatchesResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let matches = query!(&mut tx, Match)
        .condition(or!(
            Match::F.player1.equals(uuid.as_ref()),
            Match::F.player2.equals(uuid.as_ref())
        ))
        .all()
        .await?;

    let mut responses = Vec::with_capacity(matches.len());
    for match_model in &matches {
        responses.push(query_match_response(&mut tx, match_model).await?);
    }

    tx.commit().await?;

    Ok(Json(GetMatchesResponse { matches: responses }))
}

/// The request to challenge a friend to a match
#[derive(Deserialize, ToSchema)]
pub struct CreateMatchRequest {
    /// The friend to challenge
    opponent: Uuid,
    /// Optional title, defaults to "`player1` vs `player2`"
    #[schema(example = "Herbert vs Karl")]
    title: Option<String>,
}

/// The response after creating a match
#[derive(Serialize, ToSchema)]
pub struct CreateMatchResponse {
    uuid: Uuid,
}

/// Challenge a friend to a new match.
///
/// The opponent must be an accepted friend of the executing user.
#[utoipa::path(
    tag = "Matches",
    context_path = "/api/v2",
    responses(
        (status = 200, description = "The match has been created", body = CreateMatchResponse),
        (status = 403, description = "The opponent is not a friend", body = ApiErrorResponse),
        (status = 404, description = "Opponent not found", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = CreateMatchRequest,
    security(("session_cookie" = []))
)]
#[post("/matches")]
pub async fn create_match(
    req: Json<CreateMatchRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<CreateMatchResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let opponent = query!(&mut tx, Account)
        .condition(Account::F.uuid.equals(req.opponent))
        .optional()
        .await?
        .ok_or(ApiError::AccountNotFound)?;

    // A match can only be created between friends
    query!(&mut tx, (Friendship::F.uuid,))
        .condition(and!(
            Friendship::F.state.equals(FriendshipState::Accepted),
            or!(
                and!(
                    Friendship::F.from.equals(uuid.as_ref()),
                    Friendship::F.to.equals(opponent.uuid.as_ref())
                ),
                and!(
                    Friendship::F.from.equals(opponent.uuid.as_ref()),
                    Friendship::F.to.equals(uuid.as_ref())
                )
            )
        ))
        .optional()
        .await?
        .ok_or(ApiError::NotFriends)?;

    let creator = query!(&mut tx, Account)
        .condition(Account::F.uuid.equals(uuid))
        .optional()
        .await?
        .ok_or(ApiError::SessionCorrupt)?;

    let title = title_or_default(req.title.clone(), &creator.display_name, &opponent.display_name);

    let match_uuid = insert!(&mut tx, MatchInsert)
        .return_primary_key()
        .single(&MatchInsert {
            uuid: Uuid::new_v4(),
            title,
            state: MatchState::Active,
            player1: ForeignModelByField::Key(uuid),
            player2: ForeignModelByField::Key(opponent.uuid),
        })
        .await?;

    tx.commit().await?;

    Ok(Json(CreateMatchResponse { uuid: match_uuid }))
}

/// Retrieves a single match including all submitted results.
///
/// Results are ordered by the day they were played, newest first.
#[utoipa::path(
    tag = "Matches",
    context_path = "/api/v2",
    responses(
        (status = 200, description = "Returns the match", body = GetMatchResponse),
        (status = 403, description = "Not a player of this match", body = ApiErrorResponse),
        (status = 404, description = "Match not found", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    security(("session_cookie" = []))
)]
#[get("/matches/{uuid}")]
pub async fn get_match(
    path: Path<PathUuid>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<GetMatchResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let match_model = query!(&mut tx, Match)
        .condition(Match::F.uuid.equals(path.uuid))
        .optional()
        .await?
        .ok_or(ApiError::MatchNotFound)?;

    if *match_model.player1.key() != uuid && *match_model.player2.key() != uuid {
        return Err(ApiError::MissingPrivileges);
    }

    let match_data = query_match_response(&mut tx, &match_model).await?;

    let mut results = query!(
        &mut tx,
        (
            MatchResult::F.uuid,
            MatchResult::F.player1_strokes,
            MatchResult::F.player2_strokes,
            MatchResult::F.played_at,
            MatchResult::F.state,
            MatchResult::F.submitter.uuid,
            MatchResult::F.submitter.username,
            MatchResult::F.submitter.display_name,
        )
    )
    .condition(MatchResult::F.match_.equals(path.uuid.as_ref()))
    .all()
    .await?;

    tx.commit().await?;

    results.sort_by(|a, b| b.3.cmp(&a.3));

    Ok(Json(GetMatchResponse {
        match_data,
        results: results
            .into_iter()
            .map(
                |(
                    uuid,
                    player1_strokes,
                    player2_strokes,
                    played_at,
                    state,
                    submitter_uuid,
                    submitter_username,
                    submitter_display_name,
                )| {
                    MatchResultResponse {
                        uuid,
                        player1_strokes,
                        player2_strokes,
                        played_at: DateTime::from_naive_utc_and_offset(played_at, Utc),
                        state: state.into(),
                        submitter: AccountResponse {
                            uuid: submitter_uuid,
                            username: submitter_username,
                            display_name: submitter_display_name,
                        },
                    }
                },
            )
            .collect(),
    }))
}

/// The request to update a match
///
/// All parameter are optional, but at least one of them is required.
#[derive(Deserialize, ToSchema)]
pub struct UpdateMatchRequest {
    #[schema(example = "Grudge match")]
    title: Option<String>,
    state: Option<ApiMatchState>,
}

/// Updates a match's title or state.
///
/// Both players may rename or close the match.
#[utoipa::path(
    tag = "Matches",
    context_path = "/api/v2",
    responses(
        (status = 200, description = "The match has been updated"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 403, description = "Not a player of this match", body = ApiErrorResponse),
        (status = 404, description = "Match not found", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    request_body = UpdateMatchRequest,
    security(("session_cookie" = []))
)]
#[put("/matches/{uuid}")]
pub async fn update_match(
    path: Path<PathUuid>,
    req: Json<UpdateMatchRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let match_model = query!(&mut tx, Match)
        .condition(Match::F.uuid.equals(path.uuid))
        .optional()
        .await?
        .ok_or(ApiError::MatchNotFound)?;

    if *match_model.player1.key() != uuid && *match_model.player2.key() != uuid {
        return Err(ApiError::MissingPrivileges);
    }

    if let Some(title) = &req.title {
        if title.is_empty() {
            return Err(ApiError::InvalidTitle);
        }
    }

    let state = req.state.map(|s| match s {
        ApiMatchState::Active => MatchState::Active,
        ApiMatchState::Completed => MatchState::Completed,
    });

    update!(&mut tx, Match)
        .condition(Match::F.uuid.equals(path.uuid))
        .begin_dyn_set()
        .set_if(Match::F.title, req.title.clone())
        .set_if(Match::F.state, state)
        .finish_dyn_set()
        .map_err(|_| ApiError::EmptyJson)?
        .exec()
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}

/// The request to submit a round result
#[derive(Deserialize, ToSchema)]
pub struct SubmitResultRequest {
    #[schema(example = 72)]
    player1_strokes: i64,
    #[schema(example = 75)]
    player2_strokes: i64,
    /// The day the round was played
    played_at: DateTime<Utc>,
}

/// The response after submitting a result
#[derive(Serialize, ToSchema)]
pub struct SubmitResultResponse {
    uuid: Uuid,
    state: ApiResultState,
}

/// Submit the scores of a played round.
///
/// Only the two players of the match may submit. The result starts out
/// pending and must be accepted by the other player before it counts
/// towards the match tally.
#[utoipa::path(
    tag = "Matches",
    context_path = "/api/v2",
    responses(
        (status = 200, description = "The result has been submitted", body = SubmitResultResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 403, description = "Not a player of this match", body = ApiErrorResponse),
        (status = 404, description = "Match not found", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    request_body = SubmitResultRequest,
    security(("session_cookie" = []))
)]
#[post("/matches/{uuid}/results")]
pub async fn submit_result(
    path: Path<PathUuid>,
    req: Json<SubmitResultRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<SubmitResultResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    if req.player1_strokes < 0 || req.player2_strokes < 0 {
        return Err(ApiError::InvalidStrokes);
    }

    let mut tx = db.start_transaction().await?;

    let match_model = query!(&mut tx, Match)
        .condition(Match::F.uuid.equals(path.uuid))
        .optional()
        .await?
        .ok_or(ApiError::MatchNotFound)?;

    // Only the two players may submit results
    if *match_model.player1.key() != uuid && *match_model.player2.key() != uuid {
        return Err(ApiError::MissingPrivileges);
    }

    let result_uuid = insert!(&mut tx, MatchResultInsert)
        .return_primary_key()
        .single(&MatchResultInsert {
            uuid: Uuid::new_v4(),
            match_: ForeignModelByField::Key(match_model.uuid),
            submitter: ForeignModelByField::Key(uuid),
            player1_strokes: req.player1_strokes,
            player2_strokes: req.player2_strokes,
            played_at: req.played_at.naive_utc(),
            state: ResultState::Pending,
        })
        .await?;

    tx.commit().await?;

    Ok(Json(SubmitResultResponse {
        uuid: result_uuid,
        state: ApiResultState::Pending,
    }))
}

/// The answer to a pending result
#[derive(Deserialize, ToSchema)]
pub struct ReviewResultRequest {
    action: ReviewAction,
}

/// The updated result and tally after a review
#[derive(Serialize, ToSchema)]
pub struct ReviewResultResponse {
    uuid: Uuid,
    state: ApiResultState,
    #[schema(example = 3)]
    player1_wins: i64,
    #[schema(example = 1)]
    player2_wins: i64,
}

/// Accept or reject a pending result.
///
/// Only the player who did *not* submit the result may review it. On
/// accept, the match tally is recomputed over all accepted results and
/// persisted. A rejected result is permanently excluded from the tally.
/// Answered results can not be reviewed again.
#[utoipa::path(
    tag = "Matches",
    context_path = "/api/v2",
    responses(
        (status = 200, description = "The result has been reviewed", body = ReviewResultResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 403, description = "Not a player of this match", body = ApiErrorResponse),
        (status = 404, description = "Match or result not found", body = ApiErrorResponse),
        (status = 409, description = "The result was already reviewed", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathMatchResult),
    request_body = ReviewResultRequest,
    security(("session_cookie" = []))
)]
#[patch("/matches/{uuid}/results/{result_uuid}")]
pub async fn review_result(
    path: Path<PathMatchResult>,
    req: Json<ReviewResultRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<ReviewResultResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let match_model = query!(&mut tx, Match)
        .condition(Match::F.uuid.equals(path.uuid))
        .optional()
        .await?
        .ok_or(ApiError::MatchNotFound)?;

    if *match_model.player1.key() != uuid && *match_model.player2.key() != uuid {
        return Err(ApiError::MissingPrivileges);
    }

    let result = query!(&mut tx, MatchResult)
        .condition(and!(
            MatchResult::F.uuid.equals(path.result_uuid),
            MatchResult::F.match_.equals(path.uuid.as_ref())
        ))
        .optional()
        .await?
        .ok_or(ApiError::ResultNotFound)?;

    // The submitter can not approve their own scores
    if *result.submitter.key() == uuid {
        return Err(ApiError::OwnResultReview);
    }

    if result.state != ResultState::Pending {
        return Err(ApiError::ResultAlreadyReviewed);
    }

    let new_state = match req.action {
        ReviewAction::Accept => ResultState::Accepted,
        ReviewAction::Reject => ResultState::Rejected,
    };

    update!(&mut tx, MatchResult)
        .condition(MatchResult::F.uuid.equals(path.result_uuid))
        .set(MatchResult::F.state, new_state)
        .exec()
        .await?;

    // Recompute the denormalized tally over all accepted results
    let rounds: Vec<RoundScores> = query!(
        &mut tx,
        (
            MatchResult::F.player1_strokes,
            MatchResult::F.player2_strokes,
            MatchResult::F.state,
        )
    )
    .condition(MatchResult::F.match_.equals(path.uuid.as_ref()))
    .all()
    .await?
    .into_iter()
    .map(|(player1, player2, state)| RoundScores {
        player1,
        player2,
        accepted: state == ResultState::Accepted,
    })
    .collect();

    let tally = tally_rounds(&rounds, ScoringMode::LowerWins);

    update!(&mut tx, Match)
        .condition(Match::F.uuid.equals(path.uuid))
        .set(Match::F.player1_wins, tally.player1_wins)
        .set(Match::F.player2_wins, tally.player2_wins)
        .exec()
        .await?;

    tx.commit().await?;

    Ok(Json(ReviewResultResponse {
        uuid: path.result_uuid,
        state: new_state.into(),
        player1_wins: tally.player1_wins,
        player2_wins: tally.player2_wins,
    }))
}

#[cfg(test)]
mod tests {
    use super::title_or_default;

    #[test]
    fn empty_titles_fall_back_to_the_default() {
        assert_eq!(
            title_or_default(None, "Herbert", "Karl"),
            "Herbert vs Karl"
        );
        assert_eq!(
            title_or_default(Some(String::new()), "Herbert", "Karl"),
            "Herbert vs Karl"
        );
        assert_eq!(
            title_or_default(Some("Grudge match".to_string()), "Herbert", "Karl"),
            "Grudge match"
        );
    }
}
