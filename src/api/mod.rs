pub mod bookings;
pub mod common;
pub mod reports;

use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::middleware::extract_current_user;
use crate::state::AppState;

/// Liveness plus snapshot cache counters.
async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now(),
        "cache": state.booking_cache.stats(),
    }))
}

/// Routes under `/api/v1`. Everything except the health check requires a
/// bearer token.
pub fn create_api_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let booking_routes = Router::new()
        .route("/", post(bookings::create_booking).get(bookings::list_bookings))
        .route("/check-duplicate", post(bookings::check_duplicate))
        .route(
            "/:record_id",
            get(bookings::get_booking)
                .put(bookings::update_booking)
                .delete(bookings::delete_booking),
        );

    let report_routes = Router::new()
        .route("/dashboard", get(reports::get_dashboard))
        .route("/kpi", get(reports::get_kpi))
        .route("/trend", get(reports::get_trend))
        .route("/daily", get(reports::get_daily_report))
        .route("/leaderboards", get(reports::get_leaderboard))
        .route("/breakdowns", get(reports::get_breakdowns))
        .route("/demographics", get(reports::get_demographics))
        .route("/analytics", get(reports::get_analytics))
        .route("/sales", get(reports::get_sales_report));

    let protected = Router::new()
        .nest("/bookings", booking_routes)
        .nest("/reports", report_routes)
        .layer(from_fn_with_state(state, extract_current_user));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected)
}
