// ============================================================================
// REPORTS API - dashboards and sales reports computed from the booking table
// ============================================================================

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::AppError;
use std::sync::Arc;
use tracing::debug;

use super::common::{parse_query_date, SimpleApiResponse};
use crate::domains::bookings::{DateRange, DateWindow};
use crate::domains::reports::{
    self, Breakdowns, DailyReport, Dashboard, Demographics, Dimension, KpiComparison, Leaderboard,
    RankBy, SalesRange, SalesReport, TimeSeries, TrendPoint,
};
use crate::state::AppState;

const DEFAULT_TREND_DAYS: u32 = 7;
const MAX_TREND_DAYS: u32 = 90;
const DEFAULT_RANGE_DAYS: u32 = 30;
const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
const MAX_LEADERBOARD_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl DateRangeQuery {
    /// Missing bounds default to the last `DEFAULT_RANGE_DAYS` days.
    fn resolve(&self, window: &DateWindow) -> Result<DateRange, AppError> {
        let fallback = window.last_n_days(DEFAULT_RANGE_DAYS);
        let start = parse_query_date("start_date", self.start_date.as_deref())?
            .unwrap_or_else(|| fallback.start_date());
        let end = parse_query_date("end_date", self.end_date.as_deref())?
            .unwrap_or_else(|| fallback.end_date());
        DateRange::custom(start, end).map_err(|e| AppError::bad_request(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub dimension: Option<Dimension>,
    pub metric: Option<RankBy>,
    pub limit: Option<usize>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    /// 30d | 60d | 90d | this_month | 6m | 1y | custom
    pub range: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// GET /api/v1/reports/dashboard
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SimpleApiResponse<Dashboard>>, AppError> {
    let bookings = state.bookings.load_all().await?;
    let window = state.bookings.window();
    Ok(Json(SimpleApiResponse::success(reports::dashboard(&bookings, &window))))
}

/// Today vs yesterday
///
/// # Endpoint
/// GET /api/v1/reports/kpi
pub async fn get_kpi(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SimpleApiResponse<KpiComparison>>, AppError> {
    let bookings = state.bookings.load_all().await?;
    let window = state.bookings.window();
    Ok(Json(SimpleApiResponse::success(reports::kpi_comparison(&bookings, &window))))
}

/// GET /api/v1/reports/trend?days=N
pub async fn get_trend(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<SimpleApiResponse<Vec<TrendPoint>>>, AppError> {
    let days = query.days.unwrap_or(DEFAULT_TREND_DAYS);
    if !(1..=MAX_TREND_DAYS).contains(&days) {
        return Err(AppError::bad_request(format!(
            "days must be between 1 and {}",
            MAX_TREND_DAYS
        )));
    }
    let bookings = state.bookings.load_all().await?;
    let window = state.bookings.window();
    Ok(Json(SimpleApiResponse::success(reports::booking_trend(&bookings, &window, days))))
}

/// End-of-day operational report
///
/// # Endpoint
/// GET /api/v1/reports/daily
pub async fn get_daily_report(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SimpleApiResponse<DailyReport>>, AppError> {
    let bookings = state.bookings.load_all().await?;
    let window = state.bookings.window();
    let report = reports::daily_report(&bookings, &window);
    debug!(
        "Daily report for {}: ots={} overall={} cancellations={}",
        report.date, report.ots.total, report.overall.total, report.cancellations.total
    );
    Ok(Json(SimpleApiResponse::success(report)))
}

/// GET /api/v1/reports/leaderboards?dimension=&metric=&limit=&start_date=&end_date=
pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<SimpleApiResponse<Leaderboard>>, AppError> {
    let window = state.bookings.window();
    let range = DateRangeQuery {
        start_date: query.start_date,
        end_date: query.end_date,
    }
    .resolve(&window)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, MAX_LEADERBOARD_LIMIT);

    let bookings = state.bookings.load_all().await?;
    Ok(Json(SimpleApiResponse::success(reports::leaderboard(
        &bookings,
        &range,
        query.dimension.unwrap_or_default(),
        query.metric.unwrap_or_default(),
        limit,
    ))))
}

/// Payment modes and price bands
///
/// # Endpoint
/// GET /api/v1/reports/breakdowns?start_date=&end_date=
pub async fn get_breakdowns(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<SimpleApiResponse<Breakdowns>>, AppError> {
    let range = query.resolve(&state.bookings.window())?;
    let bookings = state.bookings.load_all().await?;
    Ok(Json(SimpleApiResponse::success(reports::breakdowns(&bookings, &range))))
}

/// GET /api/v1/reports/demographics
pub async fn get_demographics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SimpleApiResponse<Demographics>>, AppError> {
    let bookings = state.bookings.load_all().await?;
    Ok(Json(SimpleApiResponse::success(reports::demographics(&bookings))))
}

/// Time series with granularity picked from the range length
///
/// # Endpoint
/// GET /api/v1/reports/analytics?start_date=&end_date=
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<SimpleApiResponse<TimeSeries>>, AppError> {
    let range = query.resolve(&state.bookings.window())?;
    let bookings = state.bookings.load_all().await?;
    Ok(Json(SimpleApiResponse::success(reports::time_series(&bookings, &range))))
}

/// Sales report with previous-period comparison
///
/// # Endpoint
/// GET /api/v1/reports/sales?range=30d|60d|90d|this_month|6m|1y|custom&start_date=&end_date=
pub async fn get_sales_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SalesQuery>,
) -> Result<Json<SimpleApiResponse<SalesReport>>, AppError> {
    let preset: SalesRange = match query.range.as_deref() {
        Some(raw) => raw.parse().map_err(|e: reports::SalesRangeError| AppError::bad_request(e.to_string()))?,
        None => SalesRange::default(),
    };
    let start: Option<NaiveDate> = parse_query_date("start_date", query.start_date.as_deref())?;
    let end: Option<NaiveDate> = parse_query_date("end_date", query.end_date.as_deref())?;

    let range = preset
        .resolve(&state.bookings.window(), start, end)
        .map_err(|e| AppError::bad_request(e.to_string()))?;

    let bookings = state.bookings.load_all().await?;
    Ok(Json(SimpleApiResponse::success(reports::sales_report(&bookings, preset, range))))
}
