use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::db::queries::{self, StatusCounts};
use crate::errors::AppError;
use crate::models::{BlockedDate, Booking, BookingStatus, TimeSlot};
use crate::services::lifecycle::{self, LifecycleError};
use crate::services::notifications::BookingEvent;
use crate::services::timezone;
use crate::state::AppState;

use super::spawn_notification;

const MAX_NOTES_LEN: usize = 2000;
const MAX_REASON_LEN: usize = 500;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Serialize)]
pub struct BookingsResponse {
    pub bookings: Vec<Booking>,
    pub stats: StatusCounts,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<BookingsResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status_filter = match query.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(BookingStatus::parse(raw).ok_or_else(|| {
            AppError::Validation(vec![
                "status must be one of: pending, confirmed, completed, cancelled".to_string(),
            ])
        })?),
    };
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let db = state.db.lock().unwrap();
    let bookings = queries::list_bookings(&db, status_filter, limit, offset)?;
    let stats = queries::booking_stats(&db)?;

    Ok(Json(BookingsResponse { bookings, stats }))
}

// GET /api/admin/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.db.lock().unwrap();
    let booking = queries::get_booking_by_id(&db, &id)?
        .ok_or_else(|| AppError::NotFound("booking not found".to_string()))?;
    Ok(Json(booking))
}

// PATCH /api/admin/bookings/:id
#[derive(Deserialize)]
pub struct UpdateBookingRequest {
    pub status: Option<String>,
    pub confirmed_date: Option<String>,
    pub confirmed_slot: Option<String>,
    pub admin_notes: Option<String>,
    pub cancellation_reason: Option<String>,
}

pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<UpdateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if payload.admin_notes.as_deref().is_some_and(|n| n.len() > MAX_NOTES_LEN) {
        return Err(AppError::Validation(vec![format!(
            "admin_notes must be at most {MAX_NOTES_LEN} characters"
        )]));
    }
    if payload
        .cancellation_reason
        .as_deref()
        .is_some_and(|r| r.len() > MAX_REASON_LEN)
    {
        return Err(AppError::Validation(vec![format!(
            "cancellation_reason must be at most {MAX_REASON_LEN} characters"
        )]));
    }

    // Status transitions route through the lifecycle engine; a request that
    // restates the current status is a plain notes update, and must not
    // re-send the transition notification.
    let (mut booking, event) = {
        let db = state.db.lock().unwrap();
        let current = queries::get_booking_by_id(&db, &id)?
            .ok_or_else(|| AppError::NotFound("booking not found".to_string()))?;

        match payload.status.as_deref() {
            None | Some("") => (current, None),
            Some(raw) => {
                let target = BookingStatus::parse(raw).ok_or_else(|| {
                    AppError::Validation(vec![
                        "status must be one of: pending, confirmed, completed, cancelled"
                            .to_string(),
                    ])
                })?;

                if target == current.status {
                    (current, None)
                } else {
                    match target {
                        BookingStatus::Confirmed => {
                            let date = parse_required_date(payload.confirmed_date.as_deref())?;
                            let slot = parse_required_slot(payload.confirmed_slot.as_deref())?;
                            let updated = lifecycle::confirm(&db, &id, date, slot)?;
                            (updated, Some(BookingEvent::Confirmed))
                        }
                        BookingStatus::Cancelled => {
                            let reason = payload
                                .cancellation_reason
                                .as_deref()
                                .map(str::trim)
                                .filter(|r| !r.is_empty());
                            let updated = lifecycle::cancel(&db, &id, reason, false)?;
                            (updated, Some(BookingEvent::Cancelled { by_customer: false }))
                        }
                        BookingStatus::Completed => {
                            let updated = lifecycle::complete(&db, &id)?;
                            (updated, None)
                        }
                        BookingStatus::Pending => {
                            return Err(LifecycleError::InvalidTransition {
                                from: current.status,
                                to: BookingStatus::Pending,
                            }
                            .into());
                        }
                    }
                }
            }
        }
    };

    if let Some(notes) = payload.admin_notes {
        let db = state.db.lock().unwrap();
        booking.admin_notes = Some(notes.trim().to_string()).filter(|n| !n.is_empty());
        booking.updated_at = chrono::Utc::now().naive_utc();
        queries::save_booking(&db, &booking)?;
    }

    if let Some(event) = event {
        spawn_notification(state.clone(), event, booking.clone());
    }

    Ok(Json(booking))
}

fn parse_required_date(raw: Option<&str>) -> Result<NaiveDate, AppError> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .ok_or_else(|| {
            AppError::Validation(vec![
                "confirming a booking requires confirmed_date (YYYY-MM-DD)".to_string(),
            ])
        })
}

fn parse_required_slot(raw: Option<&str>) -> Result<TimeSlot, AppError> {
    raw.map(str::trim)
        .and_then(TimeSlot::parse)
        .ok_or_else(|| {
            AppError::Validation(vec![
                "confirming a booking requires confirmed_slot (morning, afternoon or evening)"
                    .to_string(),
            ])
        })
}

// GET /api/admin/blocked-dates
#[derive(Deserialize)]
pub struct BlockedDatesQuery {
    /// Comma-separated YYYY-MM keys; defaults to the current and next month.
    pub months: Option<String>,
}

#[derive(Serialize)]
pub struct BlockedDatesResponse {
    pub blocked_dates: Vec<BlockedDate>,
}

pub async fn list_blocked_dates(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BlockedDatesQuery>,
) -> Result<Json<BlockedDatesResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let months: Vec<String> = match query.months.as_deref() {
        None | Some("") => {
            let today = timezone::local_today();
            let next = today + Months::new(1);
            vec![
                today.format("%Y-%m").to_string(),
                next.format("%Y-%m").to_string(),
            ]
        }
        Some(raw) => {
            let months: Vec<String> = raw
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect();
            for month in &months {
                if NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d").is_err() {
                    return Err(AppError::Validation(vec![format!(
                        "invalid month key: {month} (expected YYYY-MM)"
                    )]));
                }
            }
            months
        }
    };

    let db = state.db.lock().unwrap();
    let blocked_dates = queries::list_blocked_dates(&db, &months)?;
    Ok(Json(BlockedDatesResponse { blocked_dates }))
}

// POST /api/admin/blocked-dates
#[derive(Deserialize)]
pub struct BlockDateRequest {
    pub date: String,
    pub reason: Option<String>,
}

pub async fn add_blocked_date(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<BlockDateRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let date = NaiveDate::parse_from_str(payload.date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(vec!["date must be YYYY-MM-DD".to_string()]))?;
    let reason = payload
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    if reason.is_some_and(|r| r.len() > MAX_REASON_LEN) {
        return Err(AppError::Validation(vec![format!(
            "reason must be at most {MAX_REASON_LEN} characters"
        )]));
    }

    let db = state.db.lock().unwrap();
    queries::add_blocked_date(&db, date, reason)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

// DELETE /api/admin/blocked-dates/:date
pub async fn remove_blocked_date(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(raw_date): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let date = NaiveDate::parse_from_str(raw_date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(vec!["date must be YYYY-MM-DD".to_string()]))?;

    let db = state.db.lock().unwrap();
    if queries::remove_blocked_date(&db, date)? {
        Ok(Json(serde_json::json!({ "ok": true })))
    } else {
        Err(AppError::NotFound("date is not blocked".to_string()))
    }
}
