// ============================================================================
// BOOKINGS API - intake, lookup and maintenance of booking rows
// ============================================================================

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use shared::AppError;
use std::sync::Arc;
use tracing::info;

use super::common::{paginate, parse_query_date, Paginated, PaginationParams, SimpleApiResponse};
use crate::domains::bookings::{
    Booking, BookingFilter, BookingPatch, MatchResult, NewBooking, StatusCategory,
};
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BookingListQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub branch: Option<String>,
    /// scheduled | cancelled | converted | promo_hunter | unknown
    pub status: Option<String>,
    pub agent: Option<String>,
    pub search: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl BookingListQuery {
    fn filter(&self) -> Result<BookingFilter, AppError> {
        let status = match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<StatusCategory>().map_err(AppError::bad_request)?),
            None => None,
        };
        let start_date = parse_query_date("start_date", self.start_date.as_deref())?;
        let end_date = parse_query_date("end_date", self.end_date.as_deref())?;
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(AppError::bad_request("start_date must not be after end_date"));
            }
        }

        Ok(BookingFilter {
            branch: self.branch.clone(),
            status,
            agent: self.agent.clone(),
            search: self.search.clone(),
            start_date,
            end_date,
        })
    }
}

/// Create a booking
///
/// # Endpoint
/// POST /api/v1/bookings
///
/// Runs the promo-hunter check against the master table before writing.
/// A match forces the status to "Promo hunter".
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<NewBooking>,
) -> Result<(StatusCode, Json<SimpleApiResponse<Booking>>), AppError> {
    let booking = state.bookings.create(request, &user.email).await?;
    Ok((StatusCode::CREATED, Json(SimpleApiResponse::success(booking))))
}

/// List bookings, newest first
///
/// # Endpoint
/// GET /api/v1/bookings?page=&page_size=&branch=&status=&agent=&search=&start_date=&end_date=
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<SimpleApiResponse<Paginated<Booking>>>, AppError> {
    let filter = query.filter()?;
    let (page, page_size) = PaginationParams {
        page: query.page,
        page_size: query.page_size,
    }
    .resolve();

    let bookings = state.bookings.list(&filter).await?;
    Ok(Json(SimpleApiResponse::success(paginate(bookings, page, page_size))))
}

/// GET /api/v1/bookings/:record_id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(record_id): Path<String>,
) -> Result<Json<SimpleApiResponse<Booking>>, AppError> {
    let booking = state.bookings.find(&record_id).await?;
    Ok(Json(SimpleApiResponse::success(booking)))
}

/// PUT /api/v1/bookings/:record_id
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(record_id): Path<String>,
    Json(patch): Json<BookingPatch>,
) -> Result<Json<SimpleApiResponse<Booking>>, AppError> {
    let booking = state.bookings.update(&record_id, patch, &user.email).await?;
    Ok(Json(SimpleApiResponse::success(booking)))
}

/// Delete a booking (admin only)
///
/// # Endpoint
/// DELETE /api/v1/bookings/:record_id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(record_id): Path<String>,
) -> Result<Json<SimpleApiResponse<Booking>>, AppError> {
    user.require_admin()?;
    let booking = state.bookings.delete(&record_id).await?;
    info!("Booking {} deleted by {}", record_id, user.email);
    Ok(Json(SimpleApiResponse::success_with_message(
        booking,
        format!("Booking {} deleted", record_id),
    )))
}

/// Dry-run of the promo-hunter check; nothing is written.
///
/// # Endpoint
/// POST /api/v1/bookings/check-duplicate
pub async fn check_duplicate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewBooking>,
) -> Result<Json<SimpleApiResponse<MatchResult>>, AppError> {
    let result = state.bookings.check_duplicate(&request).await?;
    Ok(Json(SimpleApiResponse::success(result)))
}
