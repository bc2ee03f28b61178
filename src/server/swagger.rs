//! This module holds the definition of the swagger declaration

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::server::handler;

struct CookieSecurity;

impl Modify for CookieSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("id"))),
            )
        }
    }
}

/// Helper struct for the openapi definitions.
#[derive(OpenApi)]
#[openapi(
    paths(
        handler::register_account,
        handler::get_me,
        handler::delete_me,
        handler::update_me,
        handler::set_password,
        handler::lookup_account,
        handler::login,
        handler::logout,
        handler::version,
        handler::health,
        handler::create_friend_request,
        handler::get_friends,
        handler::get_friend_requests,
        handler::review_friend_request,
        handler::delete_friend,
        handler::get_matches,
        handler::create_match,
        handler::get_match,
        handler::update_match,
        handler::submit_result,
        handler::review_result,
        handler::get_competitions,
        handler::create_competition,
        handler::get_competition,
        handler::log_birdie,
        handler::get_boards,
        handler::mark_square,
        handler::update_squares,
    ),
    components(schemas(
        handler::ApiErrorResponse,
        handler::ApiStatusCode,
        handler::ReviewAction,
        handler::AccountRegistrationRequest,
        handler::AccountResponse,
        handler::AccountStats,
        handler::MeResponse,
        handler::SetPasswordRequest,
        handler::UpdateAccountRequest,
        handler::LookupAccountRequest,
        handler::LookupAccountResponse,
        handler::LoginRequest,
        handler::VersionResponse,
        handler::HealthResponse,
        handler::CreateFriendRequest,
        handler::CreateFriendRequestResponse,
        handler::FriendResponse,
        handler::GetFriendsResponse,
        handler::FriendRequestResponse,
        handler::GetFriendRequestsResponse,
        handler::ReviewFriendRequestRequest,
        handler::ApiMatchState,
        handler::ApiResultState,
        handler::MatchResponse,
        handler::GetMatchesResponse,
        handler::MatchResultResponse,
        handler::GetMatchResponse,
        handler::CreateMatchRequest,
        handler::CreateMatchResponse,
        handler::UpdateMatchRequest,
        handler::SubmitResultRequest,
        handler::SubmitResultResponse,
        handler::ReviewResultRequest,
        handler::ReviewResultResponse,
        handler::ApiCompetitionKind,
        handler::ParticipantProgress,
        handler::CompetitionResponse,
        handler::GetCompetitionsResponse,
        handler::BirdieResponse,
        handler::HoleResponse,
        handler::SquareResponse,
        handler::BoardResponse,
        handler::GetCompetitionResponse,
        handler::CreateCompetitionRequest,
        handler::CreateCompetitionResponse,
        handler::LogBirdieRequest,
        handler::LogBirdieResponse,
        handler::GetBoardsResponse,
        handler::MarkSquareRequest,
        handler::MarkSquareResponse,
        handler::SquareDescription,
        handler::UpdateSquaresRequest,
    )),
    modifiers(&CookieSecurity)
)]
pub struct ApiDoc;
