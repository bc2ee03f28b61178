//! This module holds the server definition

use std::net::SocketAddr;

use actix_toolbox::tb_middleware::{
    setup_logging_mw, DBSessionStore, LoggingMiddlewareConfig, PersistentSession, SessionMiddleware,
};
use actix_web::cookie::time::Duration;
use actix_web::cookie::Key;
use actix_web::http::StatusCode;
use actix_web::middleware::{Compress, ErrorHandlers};
use actix_web::web::{scope, Data, JsonConfig, PayloadConfig};
use actix_web::{App, HttpServer};
use base64::prelude::{Engine, BASE64_STANDARD};
use log::info;
use rorm::Database;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::server::error::StartServerError;
use crate::server::handler::{
    create_competition, create_friend_request, create_match, delete_friend, delete_me, get_boards,
    get_competition, get_competitions, get_friend_requests, get_friends, get_match, get_matches,
    get_me, health, log_birdie, login, logout, lookup_account, mark_square, register_account,
    review_friend_request, review_result, set_password, submit_result, update_match, update_me,
    update_squares, version,
};
use crate::server::middleware::{handle_not_found, json_extractor_error, AuthenticationRequired};
use crate::server::swagger::ApiDoc;

pub mod error;
pub mod handler;
pub mod middleware;
pub mod swagger;

/// Start the fairway server
///
/// **Parameter**:
/// - `config`: Reference to a [Config] struct
/// - `db`: [Database]
pub async fn start_server(config: &Config, db: Database) -> Result<(), StartServerError> {
    let s_addr = SocketAddr::new(config.server.listen_address, config.server.listen_port);

    let key = BASE64_STANDARD
        .decode(&config.server.secret_key)
        .map_err(|_| StartServerError::InvalidSecretKey)?;
    if key.len() < 64 {
        return Err(StartServerError::InvalidSecretKey);
    }
    let key = Key::from(&key);

    info!("Starting to listen on {}", s_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(PayloadConfig::default())
            .app_data(JsonConfig::default().error_handler(json_extractor_error))
            .app_data(Data::new(db.clone()))
            .wrap(setup_logging_mw(LoggingMiddlewareConfig::default()))
            .wrap(
                SessionMiddleware::builder(DBSessionStore::new(db.clone()), key.clone())
                    .session_lifecycle(PersistentSession::default().session_ttl(Duration::hours(24)))
                    .build(),
            )
            .wrap(Compress::default())
            .wrap(ErrorHandlers::new().handler(StatusCode::NOT_FOUND, handle_not_found))
            .service(SwaggerUi::new("/docs/{_:.*}").url("/api-doc/openapi.json", ApiDoc::openapi()))
            .service(register_account)
            .service(version)
            .service(health)
            .service(scope("/api/v2/auth").service(login).service(logout))
            .service(
                scope("/api/v2")
                    .wrap(AuthenticationRequired)
                    .service(get_me)
                    .service(delete_me)
                    .service(update_me)
                    .service(set_password)
                    .service(lookup_account)
                    .service(create_friend_request)
                    .service(get_friends)
                    .service(get_friend_requests)
                    .service(review_friend_request)
                    .service(delete_friend)
                    .service(get_matches)
                    .service(create_match)
                    .service(get_match)
                    .service(update_match)
                    .service(submit_result)
                    .service(review_result)
                    .service(get_competitions)
                    .service(create_competition)
                    .service(get_competition)
                    .service(log_birdie)
                    .service(get_boards)
                    .service(mark_square)
                    .service(update_squares),
            )
    })
    .bind(s_addr)?
    .run()
    .await?;

    Ok(())
}
