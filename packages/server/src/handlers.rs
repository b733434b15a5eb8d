//! HTTP handler functions for the restaurant finder API.

use actix_web::{HttpResponse, web};
use restaurant_finder_query_models::{DetailsQuery, FilterError, RawFilter};
use restaurant_finder_server_models::{ApiError, ApiHealth, DetailsRequest};

use crate::AppState;

/// `GET /health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let status = state.service.health().await;

    HttpResponse::Ok().json(ApiHealth {
        status: "healthy".to_string(),
        warehouse_available: status.live_available,
        live_source: status.live_source,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /query`
///
/// Runs a restaurant search. Unknown borough or grade values are rejected
/// with `400`; every other failure is absorbed by the mock fallback.
pub async fn query(state: web::Data<AppState>, body: web::Json<RawFilter>) -> HttpResponse {
    match state.service.execute_raw(&body).await {
        Ok(envelope) => {
            log::info!(
                "Query returned {} records (mock: {})",
                envelope.total_count(),
                envelope.is_mock()
            );
            HttpResponse::Ok().json(envelope)
        }
        Err(e) => bad_request(&e),
    }
}

/// `POST /details`
///
/// Returns every inspection of the restaurants whose name contains
/// `restaurant_name`.
pub async fn details(state: web::Data<AppState>, body: web::Json<DetailsRequest>) -> HttpResponse {
    let query = match DetailsQuery::from_raw(&body.restaurant_name, body.borough.as_deref()) {
        Ok(query) => query,
        Err(e) => return bad_request(&e),
    };

    let details = state.service.details(&query).await;
    log::info!(
        "Details for {:?} returned {} inspections (mock: {})",
        details.restaurant_name,
        details.inspection_count,
        details.mock_data
    );
    HttpResponse::Ok().json(details)
}

/// `GET /boroughs`
pub async fn boroughs(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.service.distinct_boroughs().await)
}

/// `GET /cuisines`
pub async fn cuisines(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.service.distinct_cuisines().await)
}

fn bad_request(error: &FilterError) -> HttpResponse {
    log::warn!("Rejected request: {error}");
    let FilterError::InvalidFilterValue { field, .. } = error;
    HttpResponse::BadRequest().json(ApiError::new(error.to_string()).with_field(*field))
}
