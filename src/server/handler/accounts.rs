//! All handlers for the account endpoints live in here

use actix_toolbox::tb_middleware::Session;
use actix_web::web::{Data, Json};
use actix_web::{delete, get, post, put, HttpResponse};
use argon2::password_hash::{Error, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use rorm::{and, insert, or, query, update, Database, FieldAccess, Model};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{
    Account, AccountInsert, BingoSquare, Birdie, Friendship, FriendshipState, Match,
};
use crate::server::handler::{ApiError, ApiErrorResponse, ApiResult};

/// Length of the generated friend codes
const FRIEND_CODE_LEN: usize = 12;

/// Generates a fresh random friend code.
///
/// Uniqueness is enforced by the database, the caller retries on the
/// off chance of a collision.
pub(crate) fn generate_friend_code() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(FRIEND_CODE_LEN)
        .map(char::from)
        .collect()
}

/// The content to register a new account
#[derive(Debug, Deserialize, ToSchema)]
pub struct AccountRegistrationRequest {
    #[schema(example = "user123")]
    username: String,
    #[schema(example = "Herbert")]
    display_name: String,
    #[schema(example = "herbert@example.com")]
    email: String,
    #[schema(example = "super-secure-password")]
    password: String,
}

/// Register a new account
///
/// The account receives a randomly generated friend code which other
/// users can look up to send friend requests.
#[utoipa::path(
    tag = "Accounts",
    responses(
        (status = 200, description = "Account got created"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 409, description = "Username or email already taken", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = AccountRegistrationRequest,
)]
#[post("/api/v2/accounts/register")]
pub async fn register_account(
    req: Json<AccountRegistrationRequest>,
    db: Data<Database>,
) -> ApiResult<HttpResponse> {
    if req.username.is_empty() {
        return Err(ApiError::InvalidUsername);
    }

    if req.display_name.is_empty() {
        return Err(ApiError::InvalidDisplayName);
    }

    if req.email.is_empty() || !req.email.contains('@') {
        return Err(ApiError::InvalidEmail);
    }

    if req.password.is_empty() {
        return Err(ApiError::InvalidPassword);
    }

    let mut tx = db.start_transaction().await?;

    if query!(&mut tx, (Account::F.uuid,))
        .condition(Account::F.username.equals(&req.username))
        .optional()
        .await?
        .is_some()
    {
        return Err(ApiError::UsernameAlreadyOccupied);
    }

    if query!(&mut tx, (Account::F.uuid,))
        .condition(Account::F.email.equals(&req.email))
        .optional()
        .await?
        .is_some()
    {
        return Err(ApiError::EmailAlreadyOccupied);
    }

    let mut friend_code = generate_friend_code();
    while query!(&mut tx, (Account::F.uuid,))
        .condition(Account::F.friend_code.equals(&friend_code))
        .optional()
        .await?
        .is_some()
    {
        friend_code = generate_friend_code();
    }

    let salt = SaltString::generate(&mut thread_rng());
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)?
        .to_string();

    insert!(&mut tx, AccountInsert)
        .single(&AccountInsert {
            uuid: Uuid::new_v4(),
            username: req.username.clone(),
            display_name: req.display_name.clone(),
            email: req.email.clone(),
            friend_code,
            avatar: None,
            password_hash,
            last_login: None,
        })
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}

/// The account data
#[derive(Serialize, Deserialize, ToSchema, Eq, Ord, PartialOrd, PartialEq, Clone, Debug)]
pub struct AccountResponse {
    pub(crate) uuid: Uuid,
    #[schema(example = "user123")]
    pub(crate) username: String,
    #[schema(example = "Herbert")]
    pub(crate) display_name: String,
}

/// Aggregated counters for the dashboard
#[derive(Serialize, ToSchema)]
pub struct AccountStats {
    #[schema(example = 3)]
    matches: u64,
    #[schema(example = 7)]
    friends: u64,
    #[schema(example = 12)]
    birdies: u64,
    #[schema(example = 4)]
    bingo_squares: u64,
    #[schema(example = 1)]
    pending_friend_requests: u64,
}

/// The account data of the currently logged-in user
#[derive(Serialize, ToSchema)]
pub struct MeResponse {
    uuid: Uuid,
    #[schema(example = "user123")]
    username: String,
    #[schema(example = "Herbert")]
    display_name: String,
    #[schema(example = "herbert@example.com")]
    email: String,
    #[schema(example = "a1B2c3D4e5F6")]
    friend_code: String,
    avatar: Option<String>,
    stats: AccountStats,
}

/// Returns the account that is currently logged-in, including the
/// aggregated counters shown on the dashboard
#[utoipa::path(
    tag = "Accounts",
    context_path = "/api/v2",
    responses(
        (status = 200, description = "Returns the account data of the current user", body = MeResponse),
        (status = 401, description = "Unauthenticated", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[get("/accounts/me")]
pub async fn get_me(db: Data<Database>, session: Session) -> ApiResult<Json<MeResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let account = query!(&mut tx, Account)
        .condition(Account::F.uuid.equals(uuid))
        .optional()
        .await?
        .ok_or(ApiError::SessionCorrupt)?;

    let (matches,) = query!(&mut tx, (Match::F.uuid.count(),))
        .condition(or!(
            Match::F.player1.equals(uuid.as_ref()),
            Match::F.player2.equals(uuid.as_ref())
        ))
        .one()
        .await?;

    let (friends,) = query!(&mut tx, (Friendship::F.uuid.count(),))
        .condition(and!(
            Friendship::F.state.equals(FriendshipState::Accepted),
            or!(
                Friendship::F.from.equals(uuid.as_ref()),
                Friendship::F.to.equals(uuid.as_ref())
            )
        ))
        .one()
        .await?;

    let (pending,) = query!(&mut tx, (Friendship::F.uuid.count(),))
        .condition(and!(
            Friendship::F.state.equals(FriendshipState::Pending),
            Friendship::F.to.equals(uuid.as_ref())
        ))
        .one()
        .await?;

    let (birdies,) = query!(&mut tx, (Birdie::F.uuid.count(),))
        .condition(Birdie::F.achiever.equals(uuid.as_ref()))
        .one()
        .await?;

    let (bingo_squares,) = query!(&mut tx, (BingoSquare::F.uuid.count(),))
        .condition(and!(
            BingoSquare::F.owner.equals(uuid.as_ref()),
            BingoSquare::F.completed.equals(true)
        ))
        .one()
        .await?;

    tx.commit().await?;

    Ok(Json(MeResponse {
        uuid: account.uuid,
        username: account.username,
        display_name: account.display_name,
        email: account.email,
        friend_code: account.friend_code,
        avatar: account.avatar,
        stats: AccountStats {
            matches: matches as u64,
            friends: friends as u64,
            birdies: birdies as u64,
            bingo_squares: bingo_squares as u64,
            pending_friend_requests: pending as u64,
        },
    }))
}

/// Deletes the currently logged-in account
#[utoipa::path(
    tag = "Accounts",
    context_path = "/api/v2",
    responses(
        (status = 200, description = "Deleted the currently logged-in account"),
        (status = 401, description = "Unauthenticated", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[delete("/accounts/me")]
pub async fn delete_me(db: Data<Database>, session: Session) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    rorm::delete!(db.as_ref(), Account)
        .condition(Account::F.uuid.equals(uuid))
        .await?;

    // Clear the current session
    session.purge();

    Ok(HttpResponse::Ok().finish())
}

/// The set password request data
///
/// The parameter `new_password` must not be empty
#[derive(Deserialize, ToSchema)]
pub struct SetPasswordRequest {
    #[schema(example = "super-secure-password")]
    old_password: String,
    #[schema(example = "ultra-secure-password!!11!")]
    new_password: String,
}

/// Sets a new password for the currently logged-in account
#[utoipa::path(
    tag = "Accounts",
    context_path = "/api/v2",
    responses(
        (status = 200, description = "New password has been set"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = SetPasswordRequest,
    security(("session_cookie" = []))
)]
#[post("/accounts/me/setPassword")]
pub async fn set_password(
    req: Json<SetPasswordRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    if req.new_password.is_empty() {
        return Err(ApiError::InvalidPassword);
    }

    let mut tx = db.start_transaction().await?;

    let (pw_hash,) = query!(&mut tx, (Account::F.password_hash,))
        .condition(Account::F.uuid.equals(uuid))
        .optional()
        .await?
        .ok_or(ApiError::SessionCorrupt)?;

    Argon2::default()
        .verify_password(req.old_password.as_bytes(), &PasswordHash::new(&pw_hash)?)
        .map_err(|e| match e {
            Error::Password => ApiError::LoginFailed,
            _ => ApiError::InvalidHash(e),
        })?;

    let salt = SaltString::generate(&mut thread_rng());
    let password_hash = Argon2::default()
        .hash_password(req.new_password.as_bytes(), &salt)?
        .to_string();

    update!(&mut tx, Account)
        .condition(Account::F.uuid.equals(uuid))
        .set(Account::F.password_hash, password_hash)
        .exec()
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}

/// Update account request data
///
/// All parameter are optional, but at least one of them is required.
#[derive(Deserialize, ToSchema)]
pub struct UpdateAccountRequest {
    #[schema(example = "user321")]
    username: Option<String>,
    #[schema(example = "Heeeerbeeeert")]
    display_name: Option<String>,
    #[schema(example = "https://example.com/avatar.png")]
    avatar: Option<String>,
}

/// Updates the currently logged-in account
///
/// All parameter are optional, but at least one of them is required.
#[utoipa::path(
    tag = "Accounts",
    context_path = "/api/v2",
    responses(
        (status = 200, description = "Account has been updated"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = UpdateAccountRequest,
    security(("session_cookie" = []))
)]
#[put("/accounts/me")]
pub async fn update_me(
    req: Json<UpdateAccountRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    if let Some(username) = &req.username {
        if username.is_empty() {
            return Err(ApiError::InvalidUsername);
        }

        if query!(&mut tx, (Account::F.uuid,))
            .condition(Account::F.username.equals(username))
            .optional()
            .await?
            .is_some()
        {
            return Err(ApiError::UsernameAlreadyOccupied);
        }
    }

    if let Some(display_name) = &req.display_name {
        if display_name.is_empty() {
            return Err(ApiError::InvalidDisplayName);
        }
    }

    update!(&mut tx, Account)
        .condition(Account::F.uuid.equals(uuid))
        .begin_dyn_set()
        .set_if(Account::F.username, req.username.clone())
        .set_if(Account::F.display_name, req.display_name.clone())
        .set_if(Account::F.avatar, req.avatar.clone().map(Some))
        .finish_dyn_set()
        .map_err(|_| ApiError::EmptyJson)?
        .exec()
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}

/// The request to lookup an account by its friend code
#[derive(Deserialize, ToSchema)]
pub struct LookupAccountRequest {
    #[schema(example = "a1B2c3D4e5F6")]
    friend_code: String,
}

/// The public view of a looked-up account
#[derive(Serialize, ToSchema)]
pub struct LookupAccountResponse {
    uuid: Uuid,
    #[schema(example = "Herbert")]
    display_name: String,
    #[schema(example = "a1B2c3D4e5F6")]
    friend_code: String,
    avatar: Option<String>,
}

/// Retrieve an account by the friend code its owner shared with you.
///
/// This is the discovery mechanism for friend requests: exchange friend
/// codes out of band, look the code up here and send a request to the
/// returned account.
#[utoipa::path(
    tag = "Accounts",
    context_path = "/api/v2",
    responses(
        (status = 200, description = "Returns the requested account data", body = LookupAccountResponse),
        (status = 404, description = "No account with this friend code", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = LookupAccountRequest,
    security(("session_cookie" = []))
)]
#[post("/accounts/lookup")]
pub async fn lookup_account(
    req: Json<LookupAccountRequest>,
    db: Data<Database>,
) -> ApiResult<Json<LookupAccountResponse>> {
    let account = query!(db.as_ref(), Account)
        .condition(Account::F.friend_code.equals(&req.friend_code))
        .optional()
        .await?
        .ok_or(ApiError::AccountNotFound)?;

    Ok(Json(LookupAccountResponse {
        uuid: account.uuid,
        display_name: account.display_name,
        friend_code: account.friend_code,
        avatar: account.avatar,
    }))
}

#[cfg(test)]
mod tests {
    use super::{generate_friend_code, FRIEND_CODE_LEN};

    #[test]
    fn friend_codes_are_alphanumeric_and_fixed_length() {
        for _ in 0..100 {
            let code = generate_friend_code();
            assert_eq!(code.len(), FRIEND_CODE_LEN);
            assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }
}
