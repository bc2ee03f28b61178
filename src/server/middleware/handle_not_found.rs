use actix_web::dev::ServiceResponse;
use actix_web::middleware::ErrorHandlerResponse;
use actix_web::HttpResponse;

use crate::server::handler::{ApiErrorResponse, ApiStatusCode};

/// Replaces actix' empty 404 with the api's json error body
pub(crate) fn handle_not_found<B>(
    res: ServiceResponse<B>,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let (req, _) = res.into_parts();

    let res = HttpResponse::NotFound().json(ApiErrorResponse::new(
        ApiStatusCode::RouteNotFound,
        "The requested route does not exist".to_string(),
    ));

    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(req, res).map_into_right_body(),
    ))
}
