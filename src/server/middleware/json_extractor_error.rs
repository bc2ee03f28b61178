use actix_web::error::JsonPayloadError;
use actix_web::HttpRequest;
use log::debug;

use crate::server::handler::ApiError;

/// Maps json extractor failures to the api's error body
pub(crate) fn json_extractor_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!("Json extractor error: {err}");

    ApiError::InvalidJson.into()
}
