//! Friend requests and the friend list.
//!
//! A friendship is a single record between two accounts. It starts as a
//! pending request sent via a friend code lookup and becomes symmetric
//! once the recipient accepts it.

use actix_toolbox::tb_middleware::Session;
use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post, put, HttpResponse};
use chrono::{DateTime, Utc};
use rorm::fields::types::ForeignModelByField;
use rorm::{and, insert, or, query, update, Database, FieldAccess, Model};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Account, Friendship, FriendshipInsert, FriendshipState};
use crate::server::handler::{ApiError, ApiErrorResponse, ApiResult, PathUuid, ReviewAction};

/// The request of a new friendship
#[derive(Deserialize, ToSchema)]
pub struct CreateFriendRequest {
    /// The friend code of the user to add
    #[schema(example = "a1B2c3D4e5F6")]
    friend_code: String,
}

/// The response after creating a friend request
#[derive(Serialize, ToSchema)]
pub struct CreateFriendRequestResponse {
    uuid: Uuid,
}

/// Create a new friend request.
///
/// The target is found by its friend code. Fails if the target is the
/// executing user or any friendship record between the two users
/// already exists, in either direction.
#[utoipa::path(
    tag = "Friends",
    context_path = "/api/v2",
    responses(
        (status = 200, description = "Friend request has been created", body = CreateFriendRequestResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 404, description = "No account with this friend code", body = ApiErrorResponse),
        (status = 409, description = "A friendship record already exists", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = CreateFriendRequest,
    security(("session_cookie" = []))
)]
#[post("/friends")]
pub async fn create_friend_request(
    req: Json<CreateFriendRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<CreateFriendRequestResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    // Check if target exists
    let target = query!(&mut tx, Account)
        .condition(Account::F.friend_code.equals(&req.friend_code))
        .optional()
        .await?
        .ok_or(ApiError::AccountNotFound)?;

    if target.uuid == uuid {
        return Err(ApiError::SelfFriendRequest);
    }

    // At most one record may exist per pair, regardless of direction
    if let Some(friendship) = query!(&mut tx, Friendship)
        .condition(or!(
            and!(
                Friendship::F.from.equals(uuid.as_ref()),
                Friendship::F.to.equals(target.uuid.as_ref())
            ),
            and!(
                Friendship::F.from.equals(target.uuid.as_ref()),
                Friendship::F.to.equals(uuid.as_ref())
            )
        ))
        .optional()
        .await?
    {
        return Err(match friendship.state {
            FriendshipState::Accepted => ApiError::AlreadyFriends,
            _ => ApiError::FriendshipAlreadyRequested,
        });
    }

    let request_uuid = insert!(&mut tx, FriendshipInsert)
        .return_primary_key()
        .single(&FriendshipInsert {
            uuid: Uuid::new_v4(),
            state: FriendshipState::Pending,
            from: ForeignModelByField::Key(uuid),
            to: ForeignModelByField::Key(target.uuid),
        })
        .await?;

    tx.commit().await?;

    Ok(Json(CreateFriendRequestResponse { uuid: request_uuid }))
}

/// A friend of the executing user
#[derive(Serialize, ToSchema)]
pub struct FriendResponse {
    uuid: Uuid,
    #[schema(example = "Herbert")]
    display_name: String,
    #[schema(example = "a1B2c3D4e5F6")]
    friend_code: String,
    avatar: Option<String>,
}

/// The friends of the executing user
#[derive(Serialize, ToSchema)]
pub struct GetFriendsResponse {
    friends: Vec<FriendResponse>,
}

/// Retrieve all accepted friends of the executing user.
///
/// Friendships are symmetric, the response contains the counterpart of
/// every accepted record the user appears in.
#[utoipa::path(
    tag = "Friends",
    context_path = "/api/v2",
    responses(
        (status = 200, description = "Returns all friends", body = GetFriendsResponse),
        (status = 401, description = "Unauthenticated", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[get("/friends")]
pub async fn get_friends(db: Data<Database>, session: Session) -> ApiResult<Json<GetFriendsResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let outgoing = query!(
        &mut tx,
        (
            Friendship::F.to.uuid,
            Friendship::F.to.display_name,
            Friendship::F.to.friend_code,
            Friendship::F.to.avatar,
        )
    )
    .condition(and!(
        Friendship::F.state.equals(FriendshipState::Accepted),
        Friendship::F.from.equals(uuid.as_ref())
    ))
    .all()
    .await?;

    let incoming = query!(
        &mut tx,
        (
            Friendship::F.from.uuid,
            Friendship::F.from.display_name,
            Friendship::F.from.friend_code,
            Friendship::F.from.avatar,
        )
    )
    .condition(and!(
        Friendship::F.state.equals(FriendshipState::Accepted),
        Friendship::F.to.equals(uuid.as_ref())
    ))
    .all()
    .await?;

    tx.commit().await?;

    Ok(Json(GetFriendsResponse {
        friends: outgoing
            .into_iter()
            .chain(incoming)
            .map(|(uuid, display_name, friend_code, avatar)| FriendResponse {
                uuid,
                display_name,
                friend_code,
                avatar,
            })
            .collect(),
    }))
}

/// A single incoming friend request
#[derive(Serialize, ToSchema)]
pub struct FriendRequestResponse {
    uuid: Uuid,
    from: FriendResponse,
    created_at: DateTime<Utc>,
}

/// The pending friend requests the executing user has received
#[derive(Serialize, ToSchema)]
pub struct GetFriendRequestsResponse {
    requests: Vec<FriendRequestResponse>,
}

/// Retrieve all pending friend requests received by the executing user
#[utoipa::path(
    tag = "Friends",
    context_path = "/api/v2",
    responses(
        (status = 200, description = "Returns all pending friend requests", body = GetFriendRequestsResponse),
        (status = 401, description = "Unauthenticated", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[get("/friends/requests")]
pub async fn get_friend_requests(
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<GetFriendRequestsResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let requests = query!(
        db.as_ref(),
        (
            Friendship::F.uuid,
            Friendship::F.created_at,
            Friendship::F.from.uuid,
            Friendship::F.from.display_name,
            Friendship::F.from.friend_code,
            Friendship::F.from.avatar,
        )
    )
    .condition(and!(
        Friendship::F.state.equals(FriendshipState::Pending),
        Friendship::F.to.equals(uuid.as_ref())
    ))
    .all()
    .await?;

    Ok(Json(GetFriendRequestsResponse {
        requests: requests
            .into_iter()
            .map(
                |(uuid, created_at, from_uuid, display_name, friend_code, avatar)| {
                    FriendRequestResponse {
                        uuid,
                        created_at: DateTime::from_naive_utc_and_offset(created_at, Utc),
                        from: FriendResponse {
                            uuid: from_uuid,
                            display_name,
                            friend_code,
                            avatar,
                        },
                    }
                },
            )
            .collect(),
    }))
}

/// The answer to a friend request
#[derive(Deserialize, ToSchema)]
pub struct ReviewFriendRequestRequest {
    action: ReviewAction,
}

/// Accept or reject a pending friend request.
///
/// Only the recipient of the request may answer it. Once answered, the
/// request can not be answered again.
#[utoipa::path(
    tag = "Friends",
    context_path = "/api/v2",
    responses(
        (status = 200, description = "The request has been answered"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 403, description = "Only the recipient may answer", body = ApiErrorResponse),
        (status = 404, description = "No such friend request", body = ApiErrorResponse),
        (status = 409, description = "The request was already answered", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    request_body = ReviewFriendRequestRequest,
    security(("session_cookie" = []))
)]
#[put("/friends/requests/{uuid}")]
pub async fn review_friend_request(
    path: Path<PathUuid>,
    req: Json<ReviewFriendRequestRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let friendship = query!(&mut tx, Friendship)
        .condition(Friendship::F.uuid.equals(path.uuid))
        .optional()
        .await?
        .ok_or(ApiError::FriendshipNotFound)?;

    // Only the recipient may answer
    if *friendship.to.key() != uuid {
        return Err(ApiError::MissingPrivileges);
    }

    if friendship.state != FriendshipState::Pending {
        return Err(ApiError::RequestAlreadyAnswered);
    }

    let new_state = match req.action {
        ReviewAction::Accept => FriendshipState::Accepted,
        ReviewAction::Reject => FriendshipState::Rejected,
    };

    update!(&mut tx, Friendship)
        .condition(Friendship::F.uuid.equals(path.uuid))
        .set(Friendship::F.state, new_state)
        .exec()
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}

/// Remove a friend.
///
/// Either side of an accepted friendship may delete the record. Pending
/// requests are answered via `PUT /friends/requests/{uuid}` instead.
#[utoipa::path(
    tag = "Friends",
    context_path = "/api/v2",
    responses(
        (status = 200, description = "The friendship has been removed"),
        (status = 403, description = "Not part of this friendship", body = ApiErrorResponse),
        (status = 404, description = "No such friendship", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    security(("session_cookie" = []))
)]
#[delete("/friends/{uuid}")]
pub async fn delete_friend(
    path: Path<PathUuid>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let friendship = query!(&mut tx, Friendship)
        .condition(Friendship::F.uuid.equals(path.uuid))
        .optional()
        .await?
        .ok_or(ApiError::FriendshipNotFound)?;

    if *friendship.from.key() != uuid && *friendship.to.key() != uuid {
        return Err(ApiError::MissingPrivileges);
    }

    rorm::delete!(&mut tx, Friendship).single(&friendship).await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}
