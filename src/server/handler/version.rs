use actix_web::get;
use actix_web::web::Json;
use serde::Serialize;
use utoipa::ToSchema;

/// The api version data for clients
#[derive(Serialize, ToSchema)]
pub struct VersionResponse {
    #[schema(example = 2)]
    version: u8,
}

/// Clients query this endpoint to detect which api version the server speaks
#[utoipa::path(
    tag = "Version",
    responses(
        (status = 200, description = "The supported api version", body = VersionResponse)
    ),
)]
#[get("/api/version")]
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse { version: 2 })
}
