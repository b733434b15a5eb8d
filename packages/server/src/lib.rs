#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for NYC restaurant inspection queries.
//!
//! A thin transport adapter over
//! [`QueryService`](restaurant_finder_query::QueryService):
//!
//! - `POST /query` takes `{borough?, cuisine?, min_grade?, limit?}` and
//!   returns the response envelope.
//! - `POST /details` takes `{restaurant_name, borough?}`.
//! - `GET /boroughs` and `GET /cuisines` list the distinct values.
//! - `GET /health` reports whether the live warehouse is reachable.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, error, middleware, web};
use restaurant_finder_query::{QueryConfig, QueryService};
use restaurant_finder_server_models::ApiError;

/// Shared application state.
pub struct AppState {
    /// Query service shared by every worker.
    pub service: Arc<QueryService>,
}

/// Registers the API routes and the JSON body error handler.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        let body = ApiError::new(format!("Invalid request body: {err}"));
        error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    }))
    .route("/health", web::get().to(handlers::health))
    .route("/query", web::post().to(handlers::query))
    .route("/details", web::post().to(handlers::details))
    .route("/boroughs", web::get().to(handlers::boroughs))
    .route("/cuisines", web::get().to(handlers::cuisines));
}

/// Serves `service` on `bind_addr:port` until shut down.
///
/// Logging must already be initialized.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn serve(service: QueryService, bind_addr: &str, port: u16) -> std::io::Result<()> {
    if service.is_mock_only() {
        log::warn!("No live source configured; every response will be mock data");
    }

    let state = web::Data::new(AppState {
        service: Arc::new(service),
    });

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

/// Starts the restaurant finder API server.
///
/// Initializes logging from `RUST_LOG`, loads [`QueryConfig`] from the
/// environment and binds to `BIND_ADDR`/`PORT` (default `127.0.0.1:8080`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the configuration is invalid or
/// the HTTP server fails to bind.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = QueryConfig::load().map_err(std::io::Error::other)?;
    let service = QueryService::from_config(&config).map_err(std::io::Error::other)?;

    let (bind_addr, port) = bind_from_env();
    serve(service, &bind_addr, port).await
}

/// Reads `BIND_ADDR` and `PORT`, falling back to `127.0.0.1:8080`.
#[must_use]
pub fn bind_from_env() -> (String, u16) {
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    (bind_addr, port)
}
