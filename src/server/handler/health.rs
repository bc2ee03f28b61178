use actix_web::get;
use actix_web::web::{Data, Json};
use rorm::{query, Database, Model};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Account, Competition, Match};
use crate::server::handler::{ApiErrorResponse, ApiResult};

/// The health data of this server
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = 1337)]
    registered_accounts: u64,
    #[schema(example = 420)]
    matches: u64,
    #[schema(example = 42)]
    competitions: u64,
}

/// Request health data from this server.
///
/// `registered_accounts` are the currently registered user accounts on the server
#[utoipa::path(
    tag = "Server status",
    responses(
        (status = 200, description = "Health data of this server", body = HealthResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
)]
#[get("/api/health")]
pub async fn health(db: Data<Database>) -> ApiResult<Json<HealthResponse>> {
    let mut tx = db.start_transaction().await?;

    let (accounts,) = query!(&mut tx, (Account::F.uuid.count(),)).one().await?;
    let (matches,) = query!(&mut tx, (Match::F.uuid.count(),)).one().await?;
    let (competitions,) = query!(&mut tx, (Competition::F.uuid.count(),))
        .one()
        .await?;

    tx.commit().await?;

    Ok(Json(HealthResponse {
        registered_accounts: accounts as u64,
        matches: matches as u64,
        competitions: competitions as u64,
    }))
}
