//! Group competitions: birdie checklists and bingo boards.
//!
//! A competition is created with its full participant list. Checklists
//! get their 18 holes upfront, bingo competitions deal every participant
//! a personal board sampled from the challenge pool. All setup happens
//! in one transaction.

use std::collections::HashMap;

use actix_toolbox::tb_middleware::Session;
use actix_web::web::{Data, Json, Path, Query};
use actix_web::{get, patch, post, HttpResponse};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::thread_rng;
use rorm::db::transaction::Transaction;
use rorm::fields::types::ForeignModelByField;
use rorm::{and, insert, query, update, Database, FieldAccess, Model};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::{
    Account, BingoSquare, BingoSquareInsert, Birdie, BirdieInsert, Competition,
    CompetitionHole, CompetitionHoleInsert, CompetitionInsert, CompetitionKind,
    CompetitionParticipant, CompetitionParticipantInsert,
};
use crate::scoring::{distinct_progress, leaderboard, progress, ProgressSummary};
use crate::server::handler::{AccountResponse, ApiError, ApiErrorResponse, ApiResult, PathUuid};

/// Number of holes of a birdie checklist
const HOLE_COUNT: i16 = 18;

/// The pool personal bingo boards are sampled from
const CHALLENGE_POOL: [&str; 25] = [
    "Birdie on a par 3",
    "Birdie on a par 4",
    "Birdie on a par 5",
    "Three pars in a row",
    "Hit all fairways on front 9",
    "Hit all greens on back 9",
    "No three-putts for 9 holes",
    "Chip in from off the green",
    "Sand save",
    "Up and down from 50+ yards",
    "Drive over 250 yards",
    "Putt over 20 feet",
    "Par or better on a hole with water",
    "Par or better on a hole with bunker",
    "Finish a round with the same ball",
    "Beat your handicap on 9 holes",
    "No double bogeys for 9 holes",
    "Play a round in under 4 hours",
    "Hit 5 fairways in a row",
    "Hit 5 greens in a row",
    "Make 3 one-putts in a row",
    "Par the hardest hole on the course",
    "Birdie the easiest hole on the course",
    "Play a round with no penalty strokes",
    "Play a round with no lost balls",
];

/// Samples a personal board of `board_size * board_size` challenge
/// descriptions without replacement.
fn sample_board(board_size: i16) -> Vec<&'static str> {
    let mut pool = CHALLENGE_POOL.to_vec();
    pool.shuffle(&mut thread_rng());
    pool.truncate((board_size * board_size) as usize);
    pool
}

/// Builds the participant list of a new competition: the creator first,
/// followed by the requested members without duplicates.
///
/// Listing queries join through the membership rows built from this list,
/// so every participant, the creator included, must appear exactly once.
fn participant_list(creator: Uuid, requested: &[Uuid]) -> Vec<Uuid> {
    let mut members = vec![creator];
    for member in requested {
        if !members.contains(member) {
            members.push(*member);
        }
    }
    members
}

/// The kind of a competition as used by the api
#[derive(Serialize, Deserialize, ToSchema, Copy, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum ApiCompetitionKind {
    /// An 18 hole birdie checklist
    BirdieChecklist,
    /// A bingo board of challenges per participant
    Bingo,
}

impl From<CompetitionKind> for ApiCompetitionKind {
    fn from(value: CompetitionKind) -> Self {
        match value {
            CompetitionKind::BirdieChecklist => ApiCompetitionKind::BirdieChecklist,
            CompetitionKind::Bingo => ApiCompetitionKind::Bingo,
        }
    }
}

/// A participant and how far they have come
#[derive(Serialize, ToSchema)]
pub struct ParticipantProgress {
    #[serde(flatten)]
    #[schema(inline)]
    participant: AccountResponse,
    #[schema(example = 7)]
    completed: u32,
    #[schema(example = 18)]
    total: u32,
    #[schema(example = 39)]
    percentage: u8,
}

/// A single competition overview.
///
/// `participants` is sorted by descending progress, participants with
/// equal progress keep their join order.
#[derive(Serialize, ToSchema)]
pub struct CompetitionResponse {
    uuid: Uuid,
    #[schema(example = "Summer birdie hunt")]
    title: String,
    kind: ApiCompetitionKind,
    #[schema(example = 5)]
    board_size: i16,
    creator: AccountResponse,
    participants: Vec<ParticipantProgress>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// The competitions the executing user takes part in
#[derive(Serialize, ToSchema)]
pub struct GetCompetitionsResponse {
    competitions: Vec<CompetitionResponse>,
}

/// A birdie logged on a hole
#[derive(Serialize, ToSchema)]
pub struct BirdieResponse {
    achiever: AccountResponse,
    attester: Option<AccountResponse>,
    achieved_at: DateTime<Utc>,
}

/// One hole of a checklist and everyone who birdied it
#[derive(Serialize, ToSchema)]
pub struct HoleResponse {
    #[schema(example = 3)]
    hole_number: i16,
    birdies: Vec<BirdieResponse>,
}

/// One square of a personal bingo board
#[derive(Serialize, ToSchema)]
pub struct SquareResponse {
    uuid: Uuid,
    #[schema(example = 13)]
    square_number: i16,
    #[schema(example = "Chip in from off the green")]
    description: String,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    attester: Option<AccountResponse>,
}

/// A participant's personal bingo board
#[derive(Serialize, ToSchema)]
pub struct BoardResponse {
    owner: AccountResponse,
    squares: Vec<SquareResponse>,
    #[schema(example = 4)]
    completed: u32,
    #[schema(example = 25)]
    total: u32,
    #[schema(example = 16)]
    percentage: u8,
}

/// A competition including its holes or boards
#[derive(Serialize, ToSchema)]
pub struct GetCompetitionResponse {
    #[serde(flatten)]
    #[schema(inline)]
    competition: CompetitionResponse,
    /// Only set for birdie checklists
    holes: Option<Vec<HoleResponse>>,
    /// Only set for bingo competitions
    boards: Option<Vec<BoardResponse>>,
}

/// Loads the participants of a competition in join order
async fn query_participants(
    tx: &mut Transaction,
    competition_uuid: Uuid,
) -> ApiResult<Vec<AccountResponse>> {
    let participants = query!(
        &mut *tx,
        (
            CompetitionParticipant::F.member.uuid,
            CompetitionParticipant::F.member.username,
            CompetitionParticipant::F.member.display_name,
        )
    )
    .condition(CompetitionParticipant::F.competition.equals(competition_uuid.as_ref()))
    .all()
    .await?;

    Ok(participants
        .into_iter()
        .map(|(uuid, username, display_name)| AccountResponse {
            uuid,
            username,
            display_name,
        })
        .collect())
}

/// Computes each participant's [ProgressSummary], sorted into a leaderboard
async fn query_progress(
    tx: &mut Transaction,
    competition: &Competition,
    participants: &[AccountResponse],
) -> ApiResult<Vec<(Uuid, ProgressSummary)>> {
    let by_participant: HashMap<Uuid, Vec<i16>> = match competition.kind {
        CompetitionKind::BirdieChecklist => query!(
            &mut *tx,
            (Birdie::F.achiever.uuid, Birdie::F.hole.hole_number)
        )
        .condition(Birdie::F.hole.competition.equals(competition.uuid.as_ref()))
        .all()
        .await?
        .into_iter()
        .into_group_map(),
        CompetitionKind::Bingo => query!(
            &mut *tx,
            (BingoSquare::F.owner.uuid, BingoSquare::F.square_number)
        )
        .condition(and!(
            BingoSquare::F.competition.equals(competition.uuid.as_ref()),
            BingoSquare::F.completed.equals(true)
        ))
        .all()
        .await?
        .into_iter()
        .into_group_map(),
    };

    let total = match competition.kind {
        CompetitionKind::BirdieChecklist => HOLE_COUNT as usize,
        CompetitionKind::Bingo => (competition.board_size * competition.board_size) as usize,
    };

    let entries = participants
        .iter()
        .map(|account| {
            let summary = match by_participant.get(&account.uuid) {
                Some(keys) => distinct_progress(keys.iter().copied(), total),
                None => progress(0, total),
            };
            (account.uuid, summary)
        })
        .collect();

    Ok(leaderboard(entries))
}

/// Assembles the overview response of a single competition
async fn competition_response(
    tx: &mut Transaction,
    competition: &Competition,
) -> ApiResult<CompetitionResponse> {
    let participants = query_participants(tx, competition.uuid).await?;
    let standings = query_progress(tx, competition, &participants).await?;

    let accounts: HashMap<Uuid, AccountResponse> = participants
        .into_iter()
        .map(|account| (account.uuid, account))
        .collect();

    let creator = accounts
        .get(competition.creator.key())
        .cloned()
        .ok_or(ApiError::InternalServerError)?;

    let mut ranked = Vec::with_capacity(standings.len());
    for (uuid, summary) in standings {
        let participant = accounts
            .get(&uuid)
            .cloned()
            .ok_or(ApiError::InternalServerError)?;
        ranked.push(ParticipantProgress {
            participant,
            completed: summary.completed as u32,
            total: summary.total as u32,
            percentage: summary.percentage,
        });
    }

    Ok(CompetitionResponse {
        uuid: competition.uuid,
        title: competition.title.clone(),
        kind: competition.kind.into(),
        board_size: competition.board_size,
        creator,
        participants: ranked,
        created_at: DateTime::from_naive_utc_and_offset(competition.created_at, Utc),
        updated_at: DateTime::from_naive_utc_and_offset(competition.updated_at, Utc),
    })
}

/// Checks whether an account takes part in the competition
async fn is_participant(
    tx: &mut Transaction,
    competition_uuid: Uuid,
    account_uuid: Uuid,
) -> ApiResult<bool> {
    Ok(query!(&mut *tx, (CompetitionParticipant::F.uuid,))
        .condition(and!(
            CompetitionParticipant::F.competition.equals(competition_uuid.as_ref()),
            CompetitionParticipant::F.member.equals(account_uuid.as_ref())
        ))
        .optional()
        .await?
        .is_some())
}

/// Filter for the competition list
#[derive(Deserialize, IntoParams)]
pub struct CompetitionsFilter {
    /// Only return competitions of this kind
    kind: Option<ApiCompetitionKind>,
}

/// Retrieves all competitions the executing user takes part in.
///
/// Every competition comes with a leaderboard of its participants.
#[utoipa::path(
    tag = "Competitions",
    context_path = "/api/v2",
    responses(
        (status = 200, description = "Returns all competitions of the user", body = GetCompetitionsResponse),
        (status = 401, description = "Unauthenticated", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(CompetitionsFilter),
    security(("session_cookie" = []))
)]
#[get("/competitions")]
pub async fn get_competitions(
    filter: Query<CompetitionsFilter>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<GetCompetitionsResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    // The creator always participates, so the membership join matches
    // exactly one row per competition
    let mut competitions = query!(&mut tx, Competition)
        .condition(Competition::F.participants.member.equals(uuid.as_ref()))
        .all()
        .await?;

    if let Some(kind) = filter.kind {
        competitions.retain(|c| ApiCompetitionKind::from(c.kind) == kind);
    }

    let mut responses = Vec::with_capacity(competitions.len());
    for competition in &competitions {
        responses.push(competition_response(&mut tx, competition).await?);
    }

    tx.commit().await?;

    Ok(Json(GetCompetitionsResponse {
        competitions: responses,
    }))
}

/// The request to create a new competition
#[derive(Deserialize, ToSchema)]
pub struct CreateCompetitionRequest {
    #[schema(example = "Summer birdie hunt")]
    title: String,
    kind: ApiCompetitionKind,
    /// Side length of the bingo boards, 2 through 5. Defaults to 5.
    ///
    /// Ignored for birdie checklists.
    board_size: Option<i16>,
    /// Participants besides the creator, who always takes part
    participants: Vec<Uuid>,
}

/// The response after creating a competition
#[derive(Serialize, ToSchema)]
pub struct CreateCompetitionResponse {
    uuid: Uuid,
}

/// Create a new competition.
///
/// The creator is always added as a participant. For birdie checklists
/// all 18 holes are created upfront, for bingo competitions every
/// participant is dealt a personal board sampled from the challenge
/// pool. The whole setup is one transaction, a failing step aborts the
/// creation entirely.
#[utoipa::path(
    tag = "Competitions",
    context_path = "/api/v2",
    responses(
        (status = 201, description = "The competition has been created", body = CreateCompetitionResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 404, description = "A participant was not found", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = CreateCompetitionRequest,
    security(("session_cookie" = []))
)]
#[post("/competitions")]
pub async fn create_competition(
    req: Json<CreateCompetitionRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    if req.title.is_empty() {
        return Err(ApiError::InvalidTitle);
    }

    let board_size = req.board_size.unwrap_or(5);
    if req.kind == ApiCompetitionKind::Bingo && !(2..=5).contains(&board_size) {
        return Err(ApiError::InvalidBoardSize);
    }

    let kind = match req.kind {
        ApiCompetitionKind::BirdieChecklist => CompetitionKind::BirdieChecklist,
        ApiCompetitionKind::Bingo => CompetitionKind::Bingo,
    };

    let members = participant_list(uuid, &req.participants);

    let mut tx = db.start_transaction().await?;

    for member in &members {
        query!(&mut tx, (Account::F.uuid,))
            .condition(Account::F.uuid.equals(*member))
            .optional()
            .await?
            .ok_or(ApiError::AccountNotFound)?;
    }

    let competition_uuid = insert!(&mut tx, CompetitionInsert)
        .return_primary_key()
        .single(&CompetitionInsert {
            uuid: Uuid::new_v4(),
            title: req.title.clone(),
            kind,
            board_size,
            creator: ForeignModelByField::Key(uuid),
        })
        .await?;

    let participant_inserts: Vec<CompetitionParticipantInsert> = members
        .iter()
        .map(|member| CompetitionParticipantInsert {
            uuid: Uuid::new_v4(),
            competition: ForeignModelByField::Key(competition_uuid),
            member: ForeignModelByField::Key(*member),
        })
        .collect();

    insert!(&mut tx, CompetitionParticipantInsert)
        .bulk(&participant_inserts)
        .await?;

    match kind {
        CompetitionKind::BirdieChecklist => {
            let holes: Vec<CompetitionHoleInsert> = (1..=HOLE_COUNT)
                .map(|hole_number| CompetitionHoleInsert {
                    uuid: Uuid::new_v4(),
                    competition: ForeignModelByField::Key(competition_uuid),
                    hole_number,
                })
                .collect();

            insert!(&mut tx, CompetitionHoleInsert).bulk(&holes).await?;
        }
        CompetitionKind::Bingo => {
            for member in &members {
                let squares: Vec<BingoSquareInsert> = sample_board(board_size)
                    .into_iter()
                    .enumerate()
                    .map(|(idx, description)| BingoSquareInsert {
                        uuid: Uuid::new_v4(),
                        competition: ForeignModelByField::Key(competition_uuid),
                        owner: ForeignModelByField::Key(*member),
                        square_number: idx as i16 + 1,
                        description: description.to_string(),
                        completed: false,
                        completed_at: None,
                        attester: None,
                    })
                    .collect();

                insert!(&mut tx, BingoSquareInsert).bulk(&squares).await?;
            }
        }
    }

    tx.commit().await?;

    Ok(HttpResponse::Created().json(CreateCompetitionResponse {
        uuid: competition_uuid,
    }))
}

/// Retrieves a single competition with its holes or boards.
///
/// Only participants may view a competition.
#[utoipa::path(
    tag = "Competitions",
    context_path = "/api/v2",
    responses(
        (status = 200, description = "Returns the competition", body = GetCompetitionResponse),
        (status = 403, description = "Not a participant", body = ApiErrorResponse),
        (status = 404, description = "Competition not found", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    security(("session_cookie" = []))
)]
#[get("/competitions/{uuid}")]
pub async fn get_competition(
    path: Path<PathUuid>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<GetCompetitionResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let competition = query!(&mut tx, Competition)
        .condition(Competition::F.uuid.equals(path.uuid))
        .optional()
        .await?
        .ok_or(ApiError::CompetitionNotFound)?;

    if !is_participant(&mut tx, competition.uuid, uuid).await? {
        return Err(ApiError::MissingPrivileges);
    }

    let overview = competition_response(&mut tx, &competition).await?;

    let accounts: HashMap<Uuid, AccountResponse> = query_participants(&mut tx, competition.uuid)
        .await?
        .into_iter()
        .map(|account| (account.uuid, account))
        .collect();

    let lookup = |uuid: &Uuid| accounts.get(uuid).cloned();

    let mut holes = None;
    let mut boards = None;

    match competition.kind {
        CompetitionKind::BirdieChecklist => {
            let hole_numbers: HashMap<Uuid, i16> = query!(
                &mut tx,
                (CompetitionHole::F.uuid, CompetitionHole::F.hole_number)
            )
            .condition(CompetitionHole::F.competition.equals(competition.uuid.as_ref()))
            .all()
            .await?
            .into_iter()
            .collect();

            let birdies = query!(&mut tx, Birdie)
                .condition(Birdie::F.hole.competition.equals(competition.uuid.as_ref()))
                .all()
                .await?;

            let by_hole: HashMap<i16, Vec<Birdie>> = birdies
                .into_iter()
                .map(|birdie| {
                    let hole_number = hole_numbers.get(birdie.hole.key()).copied().unwrap_or(0);
                    (hole_number, birdie)
                })
                .into_group_map();

            let mut hole_responses = Vec::with_capacity(HOLE_COUNT as usize);
            for hole_number in 1..=HOLE_COUNT {
                let mut birdie_responses = Vec::new();
                for birdie in by_hole.get(&hole_number).into_iter().flatten() {
                    let attester = match &birdie.attester {
                        Some(attester) => {
                            Some(lookup(attester.key()).ok_or(ApiError::InternalServerError)?)
                        }
                        None => None,
                    };
                    birdie_responses.push(BirdieResponse {
                        achiever: lookup(birdie.achiever.key())
                            .ok_or(ApiError::InternalServerError)?,
                        attester,
                        achieved_at: DateTime::from_naive_utc_and_offset(birdie.achieved_at, Utc),
                    });
                }
                hole_responses.push(HoleResponse {
                    hole_number,
                    birdies: birdie_responses,
                });
            }
            holes = Some(hole_responses);
        }
        CompetitionKind::Bingo => {
            boards = Some(query_boards(&mut tx, &competition, &accounts, None).await?);
        }
    }

    tx.commit().await?;

    Ok(Json(GetCompetitionResponse {
        competition: overview,
        holes,
        boards,
    }))
}

/// Loads the bingo boards of a competition, optionally restricted to one owner
async fn query_boards(
    tx: &mut Transaction,
    competition: &Competition,
    accounts: &HashMap<Uuid, AccountResponse>,
    owner: Option<Uuid>,
) -> ApiResult<Vec<BoardResponse>> {
    let squares = if let Some(owner) = owner {
        query!(&mut *tx, BingoSquare)
            .condition(and!(
                BingoSquare::F.competition.equals(competition.uuid.as_ref()),
                BingoSquare::F.owner.equals(owner.as_ref())
            ))
            .all()
            .await?
    } else {
        query!(&mut *tx, BingoSquare)
            .condition(BingoSquare::F.competition.equals(competition.uuid.as_ref()))
            .all()
            .await?
    };

    let total = (competition.board_size * competition.board_size) as usize;

    let by_owner: HashMap<Uuid, Vec<BingoSquare>> = squares
        .into_iter()
        .map(|square| (*square.owner.key(), square))
        .into_group_map();

    let mut boards = Vec::with_capacity(by_owner.len());
    for (owner_uuid, mut squares) in by_owner {
        squares.sort_by_key(|square| square.square_number);

        let completed = squares.iter().filter(|square| square.completed).count();
        let summary = progress(completed, total);

        let mut square_responses = Vec::with_capacity(squares.len());
        for square in squares {
            let attester = match &square.attester {
                Some(attester) => Some(
                    accounts
                        .get(attester.key())
                        .cloned()
                        .ok_or(ApiError::InternalServerError)?,
                ),
                None => None,
            };
            square_responses.push(SquareResponse {
                uuid: square.uuid,
                square_number: square.square_number,
                description: square.description,
                completed: square.completed,
                completed_at: square
                    .completed_at
                    .map(|at| DateTime::from_naive_utc_and_offset(at, Utc)),
                attester,
            });
        }

        boards.push(BoardResponse {
            owner: accounts
                .get(&owner_uuid)
                .cloned()
                .ok_or(ApiError::InternalServerError)?,
            squares: square_responses,
            completed: summary.completed as u32,
            total: summary.total as u32,
            percentage: summary.percentage,
        });
    }

    // Highest completion first, like the leaderboard
    boards.sort_by_key(|board| std::cmp::Reverse(board.completed));

    Ok(boards)
}

/// The request to log a birdie.
///
/// The achiever is always the executing user.
#[derive(Deserialize, ToSchema)]
pub struct LogBirdieRequest {
    #[schema(example = 3)]
    hole_number: i16,
    /// Another participant vouching for the birdie
    attester: Option<Uuid>,
    /// Defaults to now
    achieved_at: Option<DateTime<Utc>>,
}

/// The response after logging a birdie
#[derive(Serialize, ToSchema)]
pub struct LogBirdieResponse {
    uuid: Uuid,
}

/// Log a birdie on a hole of a birdie checklist.
///
/// The executing user must be a participant and must not have a birdie
/// on this hole yet. The attester, if supplied, must be a participant
/// as well.
#[utoipa::path(
    tag = "Competitions",
    context_path = "/api/v2",
    responses(
        (status = 201, description = "The birdie has been logged", body = LogBirdieResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 403, description = "Not a participant", body = ApiErrorResponse),
        (status = 404, description = "Competition or hole not found", body = ApiErrorResponse),
        (status = 409, description = "There already is a birdie for this hole", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    request_body = LogBirdieRequest,
    security(("session_cookie" = []))
)]
#[post("/competitions/{uuid}/birdies")]
pub async fn log_birdie(
    path: Path<PathUuid>,
    req: Json<LogBirdieRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    if !(1..=HOLE_COUNT).contains(&req.hole_number) {
        return Err(ApiError::InvalidHoleNumber);
    }

    let mut tx = db.start_transaction().await?;

    let competition = query!(&mut tx, Competition)
        .condition(Competition::F.uuid.equals(path.uuid))
        .optional()
        .await?
        .ok_or(ApiError::CompetitionNotFound)?;

    if competition.kind != CompetitionKind::BirdieChecklist {
        return Err(ApiError::WrongCompetitionKind);
    }

    if !is_participant(&mut tx, competition.uuid, uuid).await? {
        return Err(ApiError::NotParticipant);
    }

    if let Some(attester) = req.attester {
        if !is_participant(&mut tx, competition.uuid, attester).await? {
            return Err(ApiError::NotParticipant);
        }
    }

    let (hole_uuid,) = query!(&mut tx, (CompetitionHole::F.uuid,))
        .condition(and!(
            CompetitionHole::F.competition.equals(competition.uuid.as_ref()),
            CompetitionHole::F.hole_number.equals(req.hole_number)
        ))
        .optional()
        .await?
        .ok_or(ApiError::HoleNotFound)?;

    // At most one birdie per (hole, achiever)
    if query!(&mut tx, (Birdie::F.uuid,))
        .condition(and!(
            Birdie::F.hole.equals(hole_uuid.as_ref()),
            Birdie::F.achiever.equals(uuid.as_ref())
        ))
        .optional()
        .await?
        .is_some()
    {
        return Err(ApiError::BirdieAlreadyLogged);
    }

    let birdie_uuid = insert!(&mut tx, BirdieInsert)
        .return_primary_key()
        .single(&BirdieInsert {
            uuid: Uuid::new_v4(),
            hole: ForeignModelByField::Key(hole_uuid),
            achiever: ForeignModelByField::Key(uuid),
            attester: req.attester.map(ForeignModelByField::Key),
            achieved_at: req
                .achieved_at
                .map(|at| at.naive_utc())
                .unwrap_or_else(|| Utc::now().naive_utc()),
        })
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Created().json(LogBirdieResponse { uuid: birdie_uuid }))
}

/// Filter for the bingo board listing
#[derive(Deserialize, IntoParams)]
pub struct BoardFilter {
    /// Only return the board of this participant
    owner: Option<Uuid>,
}

/// The bingo boards of a competition
#[derive(Serialize, ToSchema)]
pub struct GetBoardsResponse {
    boards: Vec<BoardResponse>,
}

/// Retrieves the bingo boards of a competition.
///
/// Boards are sorted by completion, the owner filter restricts the
/// response to a single participant's board.
#[utoipa::path(
    tag = "Competitions",
    context_path = "/api/v2",
    responses(
        (status = 200, description = "Returns the boards", body = GetBoardsResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 403, description = "Not a participant", body = ApiErrorResponse),
        (status = 404, description = "Competition not found", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid, BoardFilter),
    security(("session_cookie" = []))
)]
#[get("/competitions/{uuid}/bingo")]
pub async fn get_boards(
    path: Path<PathUuid>,
    filter: Query<BoardFilter>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<GetBoardsResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let competition = query!(&mut tx, Competition)
        .condition(Competition::F.uuid.equals(path.uuid))
        .optional()
        .await?
        .ok_or(ApiError::CompetitionNotFound)?;

    if competition.kind != CompetitionKind::Bingo {
        return Err(ApiError::WrongCompetitionKind);
    }

    if !is_participant(&mut tx, competition.uuid, uuid).await? {
        return Err(ApiError::MissingPrivileges);
    }

    let accounts: HashMap<Uuid, AccountResponse> = query_participants(&mut tx, competition.uuid)
        .await?
        .into_iter()
        .map(|account| (account.uuid, account))
        .collect();

    let boards = query_boards(&mut tx, &competition, &accounts, filter.owner).await?;

    tx.commit().await?;

    Ok(Json(GetBoardsResponse { boards }))
}

/// The request to mark a square of the executing user's board as completed
#[derive(Deserialize, ToSchema)]
pub struct MarkSquareRequest {
    /// The square to mark
    square: Uuid,
    /// Another participant vouching for the completion
    attester: Option<Uuid>,
}

/// The response after marking a square
#[derive(Serialize, ToSchema)]
pub struct MarkSquareResponse {
    uuid: Uuid,
    completed: bool,
}

/// Mark a square of the executing user's own board as completed.
///
/// Fails if the square belongs to another participant's board or has
/// already been completed.
#[utoipa::path(
    tag = "Competitions",
    context_path = "/api/v2",
    responses(
        (status = 201, description = "The square has been marked as completed", body = MarkSquareResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 403, description = "Not your square", body = ApiErrorResponse),
        (status = 404, description = "Competition or square not found", body = ApiErrorResponse),
        (status = 409, description = "The square was already completed", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    request_body = MarkSquareRequest,
    security(("session_cookie" = []))
)]
#[post("/competitions/{uuid}/bingo")]
pub async fn mark_square(
    path: Path<PathUuid>,
    req: Json<MarkSquareRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let competition = query!(&mut tx, Competition)
        .condition(Competition::F.uuid.equals(path.uuid))
        .optional()
        .await?
        .ok_or(ApiError::CompetitionNotFound)?;

    if competition.kind != CompetitionKind::Bingo {
        return Err(ApiError::WrongCompetitionKind);
    }

    if !is_participant(&mut tx, competition.uuid, uuid).await? {
        return Err(ApiError::NotParticipant);
    }

    if let Some(attester) = req.attester {
        if !is_participant(&mut tx, competition.uuid, attester).await? {
            return Err(ApiError::NotParticipant);
        }
    }

    let square = query!(&mut tx, BingoSquare)
        .condition(and!(
            BingoSquare::F.uuid.equals(req.square),
            BingoSquare::F.competition.equals(competition.uuid.as_ref())
        ))
        .optional()
        .await?
        .ok_or(ApiError::SquareNotFound)?;

    // Everyone marks their own board
    if *square.owner.key() != uuid {
        return Err(ApiError::MissingPrivileges);
    }

    if square.completed {
        return Err(ApiError::SquareAlreadyCompleted);
    }

    update!(&mut tx, BingoSquare)
        .condition(BingoSquare::F.uuid.equals(square.uuid))
        .set(BingoSquare::F.completed, true)
        .set(BingoSquare::F.completed_at, Some(Utc::now().naive_utc()))
        .set(
            BingoSquare::F.attester,
            req.attester.map(ForeignModelByField::Key),
        )
        .exec()
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Created().json(MarkSquareResponse {
        uuid: square.uuid,
        completed: true,
    }))
}

/// A new description for a single square
#[derive(Deserialize, ToSchema)]
pub struct SquareDescription {
    /// The square to change
    uuid: Uuid,
    #[schema(example = "Hole in one on a par 3")]
    description: String,
}

/// The request to change square descriptions
#[derive(Deserialize, ToSchema)]
pub struct UpdateSquaresRequest {
    squares: Vec<SquareDescription>,
}

/// Change the challenge descriptions of bingo squares.
///
/// Only the creator of the competition may do this. Squares that do not
/// belong to the competition are rejected.
#[utoipa::path(
    tag = "Competitions",
    context_path = "/api/v2",
    responses(
        (status = 200, description = "The descriptions have been updated"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 403, description = "Only the creator may change descriptions", body = ApiErrorResponse),
        (status = 404, description = "Competition or square not found", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    request_body = UpdateSquaresRequest,
    security(("session_cookie" = []))
)]
#[patch("/competitions/{uuid}/bingo/squares")]
pub async fn update_squares(
    path: Path<PathUuid>,
    req: Json<UpdateSquaresRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let competition = query!(&mut tx, Competition)
        .condition(Competition::F.uuid.equals(path.uuid))
        .optional()
        .await?
        .ok_or(ApiError::CompetitionNotFound)?;

    if competition.kind != CompetitionKind::Bingo {
        return Err(ApiError::WrongCompetitionKind);
    }

    if *competition.creator.key() != uuid {
        return Err(ApiError::MissingPrivileges);
    }

    for square in &req.squares {
        if square.description.is_empty() {
            return Err(ApiError::InvalidTitle);
        }

        query!(&mut tx, (BingoSquare::F.uuid,))
            .condition(and!(
                BingoSquare::F.uuid.equals(square.uuid),
                BingoSquare::F.competition.equals(competition.uuid.as_ref())
            ))
            .optional()
            .await?
            .ok_or(ApiError::SquareNotFound)?;

        update!(&mut tx, BingoSquare)
            .condition(BingoSquare::F.uuid.equals(square.uuid))
            .set(BingoSquare::F.description, square.description.clone())
            .exec()
            .await?;
    }

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use uuid::Uuid;

    use super::{participant_list, sample_board, CHALLENGE_POOL};

    #[test]
    fn boards_are_sampled_without_replacement() {
        for board_size in 2..=5 {
            let board = sample_board(board_size);
            assert_eq!(board.len(), (board_size * board_size) as usize);

            let distinct: HashSet<&str> = board.iter().copied().collect();
            assert_eq!(distinct.len(), board.len());

            for challenge in board {
                assert!(CHALLENGE_POOL.contains(&challenge));
            }
        }
    }

    #[test]
    fn participant_list_holds_every_member_exactly_once() {
        let creator = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        // Creator listed again and a duplicate member, both collapse
        let members = participant_list(creator, &[a, creator, b, a]);
        assert_eq!(members, vec![creator, a, b]);

        // The creator participates even without any requested members
        assert_eq!(participant_list(creator, &[]), vec![creator]);
    }
}
