//! This module holds the handler of fairway

use std::fmt::{Display, Formatter};

use actix_toolbox::tb_middleware::actix_session::{SessionGetError, SessionInsertError};
use actix_web::body::BoxBody;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use log::{debug, error, trace};
use serde::{Deserialize, Serialize};
use serde_repr::Serialize_repr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub use crate::server::handler::accounts::*;
pub use crate::server::handler::auth::*;
pub use crate::server::handler::competitions::*;
pub use crate::server::handler::friends::*;
pub use crate::server::handler::health::*;
pub use crate::server::handler::matches::*;
pub use crate::server::handler::version::*;

pub mod accounts;
pub mod auth;
pub mod competitions;
pub mod friends;
pub mod health;
pub mod matches;
pub mod version;

/// The result that is used throughout the complete api.
pub type ApiResult<T> = Result<T, ApiError>;

/// A uuid in a path
#[derive(Deserialize, IntoParams)]
pub struct PathUuid {
    /// The uuid of the addressed entity
    pub(crate) uuid: Uuid,
}

/// The answer to a pending request
#[derive(Deserialize, ToSchema, Copy, Clone, Debug, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    /// Accept the pending request
    Accept,
    /// Reject the pending request
    Reject,
}

#[derive(Serialize_repr, ToSchema)]
#[repr(u16)]
pub(crate) enum ApiStatusCode {
    Unauthenticated = 1000,
    LoginFailed = 1001,
    UsernameAlreadyOccupied = 1002,
    EmailAlreadyOccupied = 1003,
    InvalidUsername = 1004,
    InvalidDisplayName = 1005,
    InvalidPassword = 1006,
    InvalidEmail = 1007,
    EmptyJson = 1008,
    InvalidJson = 1009,
    RouteNotFound = 1010,
    AccountNotFound = 1011,
    FriendshipNotFound = 1012,
    MatchNotFound = 1013,
    ResultNotFound = 1014,
    CompetitionNotFound = 1015,
    HoleNotFound = 1016,
    SquareNotFound = 1017,
    MissingPrivileges = 1018,
    SelfFriendRequest = 1019,
    FriendshipAlreadyRequested = 1020,
    AlreadyFriends = 1021,
    RequestAlreadyAnswered = 1022,
    ResultAlreadyReviewed = 1023,
    OwnResultReview = 1024,
    NotParticipant = 1025,
    WrongCompetitionKind = 1026,
    InvalidHoleNumber = 1027,
    InvalidBoardSize = 1028,
    BirdieAlreadyLogged = 1029,
    SquareAlreadyCompleted = 1030,
    InvalidStrokes = 1031,
    SessionCorrupt = 1032,
    NotFriends = 1033,
    InvalidTitle = 1034,

    InternalServerError = 2000,
    DatabaseError = 2001,
    SessionError = 2002,
}

#[derive(Serialize, ToSchema)]
pub(crate) struct ApiErrorResponse {
    #[schema(example = "Error message is here")]
    message: String,
    #[schema(example = 1000)]
    status_code: ApiStatusCode,
}

impl ApiErrorResponse {
    pub(crate) fn new(status_code: ApiStatusCode, message: String) -> Self {
        Self {
            message,
            status_code,
        }
    }
}

/// This enum holds all possible error types that can occur in the API
#[derive(Debug)]
pub enum ApiError {
    /// The user is not logged in
    Unauthenticated,
    /// Login was not successful. Can be caused by incorrect username / password
    LoginFailed,
    /// The username is already occupied
    UsernameAlreadyOccupied,
    /// The email address is already registered
    EmailAlreadyOccupied,
    /// Missing or malformed username
    InvalidUsername,
    /// Missing or malformed display name
    InvalidDisplayName,
    /// Missing or malformed password
    InvalidPassword,
    /// Missing or malformed email address
    InvalidEmail,
    /// An update request without any field set
    EmptyJson,
    /// The request body could not be parsed
    InvalidJson,
    /// There is no account with the given uuid or friend code
    AccountNotFound,
    /// There is no friendship or friend request with the given uuid
    FriendshipNotFound,
    /// There is no match with the given uuid
    MatchNotFound,
    /// There is no result with the given uuid in the given match
    ResultNotFound,
    /// There is no competition with the given uuid
    CompetitionNotFound,
    /// The addressed hole does not exist in this competition
    HoleNotFound,
    /// The addressed bingo square does not exist in this competition
    SquareNotFound,
    /// The user lacks the relationship required for this operation
    MissingPrivileges,
    /// A user tried to friend themselves
    SelfFriendRequest,
    /// There already is a pending or rejected request between the two users
    FriendshipAlreadyRequested,
    /// The two users are already friends
    AlreadyFriends,
    /// The friend request has already been answered
    RequestAlreadyAnswered,
    /// The match result has already been accepted or rejected
    ResultAlreadyReviewed,
    /// The submitter tried to review their own result
    OwnResultReview,
    /// The addressed user is not a participant of the competition
    NotParticipant,
    /// The operation does not apply to this kind of competition
    WrongCompetitionKind,
    /// The hole number is outside of 1..=18
    InvalidHoleNumber,
    /// The board size is outside of the supported range
    InvalidBoardSize,
    /// The achiever already has a birdie for this hole
    BirdieAlreadyLogged,
    /// The square has already been marked as completed
    SquareAlreadyCompleted,
    /// Negative stroke counts
    InvalidStrokes,
    /// The two users are not friends
    NotFriends,
    /// Missing or malformed title
    InvalidTitle,
    /// The session is in an invalid state
    SessionCorrupt,

    /// Unexpected internal error
    InternalServerError,
    /// All errors that are thrown by the database
    DatabaseError(rorm::Error),
    /// An invalid hash is retrieved from the database
    InvalidHash(argon2::password_hash::Error),
    /// An error occurred while retrieving data from the session
    SessionGet(SessionGetError),
    /// An error occurred while inserting data into the session
    SessionInsert(SessionInsertError),
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Unauthenticated => write!(f, "Unauthenticated"),
            ApiError::LoginFailed => write!(f, "The login was not successful"),
            ApiError::UsernameAlreadyOccupied => write!(f, "Username is already occupied"),
            ApiError::EmailAlreadyOccupied => write!(f, "Email address is already registered"),
            ApiError::InvalidUsername => write!(f, "Invalid username"),
            ApiError::InvalidDisplayName => write!(f, "Invalid display name"),
            ApiError::InvalidPassword => write!(f, "Invalid password"),
            ApiError::InvalidEmail => write!(f, "Invalid email address"),
            ApiError::EmptyJson => write!(f, "At least one parameter must be set"),
            ApiError::InvalidJson => write!(f, "Invalid json received"),
            ApiError::AccountNotFound => write!(f, "Account not found"),
            ApiError::FriendshipNotFound => write!(f, "Friendship not found"),
            ApiError::MatchNotFound => write!(f, "Match not found"),
            ApiError::ResultNotFound => write!(f, "Result not found"),
            ApiError::CompetitionNotFound => write!(f, "Competition not found"),
            ApiError::HoleNotFound => write!(f, "Hole not found in this competition"),
            ApiError::SquareNotFound => write!(f, "Bingo square not found in this competition"),
            ApiError::MissingPrivileges => write!(f, "Missing privileges"),
            ApiError::SelfFriendRequest => write!(f, "You can not add yourself as a friend"),
            ApiError::FriendshipAlreadyRequested => {
                write!(f, "There already is a friend request between you two")
            }
            ApiError::AlreadyFriends => write!(f, "You are already friends"),
            ApiError::RequestAlreadyAnswered => {
                write!(f, "The friend request has already been answered")
            }
            ApiError::ResultAlreadyReviewed => {
                write!(f, "The result has already been accepted or rejected")
            }
            ApiError::OwnResultReview => {
                write!(f, "You can not accept or reject your own result")
            }
            ApiError::NotParticipant => {
                write!(f, "The user is not a participant of this competition")
            }
            ApiError::WrongCompetitionKind => {
                write!(f, "The operation does not apply to this kind of competition")
            }
            ApiError::InvalidHoleNumber => write!(f, "The hole number must be between 1 and 18"),
            ApiError::InvalidBoardSize => {
                write!(f, "The board size must be between 2 and 5")
            }
            ApiError::BirdieAlreadyLogged => {
                write!(f, "There already is a birdie for this hole")
            }
            ApiError::SquareAlreadyCompleted => {
                write!(f, "The square has already been completed")
            }
            ApiError::InvalidStrokes => write!(f, "Stroke counts must not be negative"),
            ApiError::NotFriends => write!(f, "You are not friends with this user"),
            ApiError::InvalidTitle => write!(f, "Invalid title"),
            ApiError::SessionCorrupt => write!(f, "Corrupt session"),
            ApiError::InternalServerError
            | ApiError::DatabaseError(_)
            | ApiError::InvalidHash(_)
            | ApiError::SessionGet(_)
            | ApiError::SessionInsert(_) => write!(f, "Internal server error"),
        }
    }
}

impl ApiError {
    fn api_status_code(&self) -> ApiStatusCode {
        match self {
            ApiError::Unauthenticated => ApiStatusCode::Unauthenticated,
            ApiError::LoginFailed => ApiStatusCode::LoginFailed,
            ApiError::UsernameAlreadyOccupied => ApiStatusCode::UsernameAlreadyOccupied,
            ApiError::EmailAlreadyOccupied => ApiStatusCode::EmailAlreadyOccupied,
            ApiError::InvalidUsername => ApiStatusCode::InvalidUsername,
            ApiError::InvalidDisplayName => ApiStatusCode::InvalidDisplayName,
            ApiError::InvalidPassword => ApiStatusCode::InvalidPassword,
            ApiError::InvalidEmail => ApiStatusCode::InvalidEmail,
            ApiError::EmptyJson => ApiStatusCode::EmptyJson,
            ApiError::InvalidJson => ApiStatusCode::InvalidJson,
            ApiError::AccountNotFound => ApiStatusCode::AccountNotFound,
            ApiError::FriendshipNotFound => ApiStatusCode::FriendshipNotFound,
            ApiError::MatchNotFound => ApiStatusCode::MatchNotFound,
            ApiError::ResultNotFound => ApiStatusCode::ResultNotFound,
            ApiError::CompetitionNotFound => ApiStatusCode::CompetitionNotFound,
            ApiError::HoleNotFound => ApiStatusCode::HoleNotFound,
            ApiError::SquareNotFound => ApiStatusCode::SquareNotFound,
            ApiError::MissingPrivileges => ApiStatusCode::MissingPrivileges,
            ApiError::SelfFriendRequest => ApiStatusCode::SelfFriendRequest,
            ApiError::FriendshipAlreadyRequested => ApiStatusCode::FriendshipAlreadyRequested,
            ApiError::AlreadyFriends => ApiStatusCode::AlreadyFriends,
            ApiError::RequestAlreadyAnswered => ApiStatusCode::RequestAlreadyAnswered,
            ApiError::ResultAlreadyReviewed => ApiStatusCode::ResultAlreadyReviewed,
            ApiError::OwnResultReview => ApiStatusCode::OwnResultReview,
            ApiError::NotParticipant => ApiStatusCode::NotParticipant,
            ApiError::WrongCompetitionKind => ApiStatusCode::WrongCompetitionKind,
            ApiError::InvalidHoleNumber => ApiStatusCode::InvalidHoleNumber,
            ApiError::InvalidBoardSize => ApiStatusCode::InvalidBoardSize,
            ApiError::BirdieAlreadyLogged => ApiStatusCode::BirdieAlreadyLogged,
            ApiError::SquareAlreadyCompleted => ApiStatusCode::SquareAlreadyCompleted,
            ApiError::InvalidStrokes => ApiStatusCode::InvalidStrokes,
            ApiError::NotFriends => ApiStatusCode::NotFriends,
            ApiError::InvalidTitle => ApiStatusCode::InvalidTitle,
            ApiError::SessionCorrupt => ApiStatusCode::SessionCorrupt,
            ApiError::InternalServerError => ApiStatusCode::InternalServerError,
            ApiError::DatabaseError(_) => ApiStatusCode::DatabaseError,
            ApiError::InvalidHash(_) => ApiStatusCode::InternalServerError,
            ApiError::SessionGet(_) | ApiError::SessionInsert(_) => ApiStatusCode::SessionError,
        }
    }
}

impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::LoginFailed
            | ApiError::InvalidUsername
            | ApiError::InvalidDisplayName
            | ApiError::InvalidPassword
            | ApiError::InvalidEmail
            | ApiError::EmptyJson
            | ApiError::InvalidJson
            | ApiError::SelfFriendRequest
            | ApiError::OwnResultReview
            | ApiError::WrongCompetitionKind
            | ApiError::InvalidHoleNumber
            | ApiError::InvalidBoardSize
            | ApiError::InvalidStrokes
            | ApiError::InvalidTitle => StatusCode::BAD_REQUEST,

            ApiError::Unauthenticated | ApiError::SessionCorrupt => StatusCode::UNAUTHORIZED,

            ApiError::MissingPrivileges | ApiError::NotParticipant | ApiError::NotFriends => {
                StatusCode::FORBIDDEN
            }

            ApiError::AccountNotFound
            | ApiError::FriendshipNotFound
            | ApiError::MatchNotFound
            | ApiError::ResultNotFound
            | ApiError::CompetitionNotFound
            | ApiError::HoleNotFound
            | ApiError::SquareNotFound => StatusCode::NOT_FOUND,

            ApiError::UsernameAlreadyOccupied
            | ApiError::EmailAlreadyOccupied
            | ApiError::FriendshipAlreadyRequested
            | ApiError::AlreadyFriends
            | ApiError::RequestAlreadyAnswered
            | ApiError::ResultAlreadyReviewed
            | ApiError::BirdieAlreadyLogged
            | ApiError::SquareAlreadyCompleted => StatusCode::CONFLICT,

            ApiError::InternalServerError
            | ApiError::DatabaseError(_)
            | ApiError::InvalidHash(_)
            | ApiError::SessionGet(_)
            | ApiError::SessionInsert(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse<BoxBody> {
        match self {
            ApiError::DatabaseError(err) => error!("Database error: {err}"),
            ApiError::InvalidHash(err) => error!("Got invalid password hash from db: {err}"),
            ApiError::SessionGet(err) => error!("Session get error: {err}"),
            ApiError::SessionInsert(err) => error!("Session insert error: {err}"),
            ApiError::InternalServerError => error!("Internal server error"),
            ApiError::Unauthenticated => trace!("Unauthenticated"),
            err => debug!("Request failed: {err}"),
        }

        HttpResponse::build(actix_web::ResponseError::status_code(self)).json(
            ApiErrorResponse::new(self.api_status_code(), self.to_string()),
        )
    }
}

impl From<rorm::Error> for ApiError {
    fn from(value: rorm::Error) -> Self {
        Self::DatabaseError(value)
    }
}

impl From<argon2::password_hash::Error> for ApiError {
    fn from(value: argon2::password_hash::Error) -> Self {
        Self::InvalidHash(value)
    }
}

impl From<SessionGetError> for ApiError {
    fn from(value: SessionGetError) -> Self {
        Self::SessionGet(value)
    }
}

impl From<SessionInsertError> for ApiError {
    fn from(value: SessionInsertError) -> Self {
        Self::SessionInsert(value)
    }
}
