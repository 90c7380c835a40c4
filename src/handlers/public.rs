use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, LocationType, NewBooking, TimeSlot};
use crate::services::notifications::BookingEvent;
use crate::services::{lifecycle, ratelimit, timezone, token};
use crate::state::AppState;

use super::spawn_notification;

const MAX_MESSAGE_LEN: usize = 1000;
const MAX_REASON_LEN: usize = 500;

/// Rate limiting keys off the nearest client address we can see.
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "local".to_string())
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub location_type: String,
    pub address: Option<String>,
    pub preferred_date: Option<String>,
    pub preferred_slot: Option<String>,
    pub pressure: Option<String>,
    pub message: Option<String>,
}

impl CreateBookingRequest {
    /// Boundary validation: collects every failing field so the caller can
    /// fix the whole form in one round trip.
    fn validate(self) -> Result<NewBooking, Vec<String>> {
        let mut errors = vec![];

        let name = self.name.trim().to_string();
        if name.is_empty() {
            errors.push("name is required".to_string());
        }

        let email = self.email.trim().to_string();
        let at = email.find('@');
        if email.is_empty() || at.is_none() || at == Some(0) || email.ends_with('@') {
            errors.push("a valid email is required".to_string());
        }

        let phone = self.phone.trim().to_string();
        if phone.chars().filter(|c| c.is_ascii_digit()).count() < 7 {
            errors.push("a valid phone number is required".to_string());
        }

        let service = self.service.trim().to_string();
        if service.is_empty() {
            errors.push("service is required".to_string());
        }

        let location_type = match LocationType::parse(self.location_type.trim()) {
            Some(lt) => lt,
            None => {
                errors.push("location_type must be one of: home, hotel, office, event".to_string());
                LocationType::Home
            }
        };

        let preferred_date = match self.preferred_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    errors.push("preferred_date must be YYYY-MM-DD".to_string());
                    None
                }
            },
        };

        let preferred_slot = match self.preferred_slot.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match TimeSlot::parse(raw) {
                Some(slot) => Some(slot),
                None => {
                    errors.push(
                        "preferred_slot must be one of: morning, afternoon, evening".to_string(),
                    );
                    None
                }
            },
        };

        if self.message.as_deref().is_some_and(|m| m.len() > MAX_MESSAGE_LEN) {
            errors.push(format!("message must be at most {MAX_MESSAGE_LEN} characters"));
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NewBooking {
            customer_name: name,
            customer_email: email,
            customer_phone: phone,
            service,
            location_type,
            address: none_if_blank(self.address),
            preferred_date,
            preferred_slot,
            pressure: none_if_blank(self.pressure),
            message: none_if_blank(self.message),
        })
    }
}

fn none_if_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    {
        let db = state.db.lock().unwrap();
        if !ratelimit::check_and_record(&db, &ratelimit::CREATE_BOOKING, &client_key(&headers)) {
            return Err(AppError::RateLimited(
                "too many booking requests, please try again in a minute".to_string(),
            ));
        }
    }

    let new = payload.validate().map_err(AppError::Validation)?;

    let booking = {
        let db = state.db.lock().unwrap();
        queries::create_booking(&db, new)?
    };

    tracing::info!(token = %booking.token, service = %booking.service, "booking request created");
    spawn_notification(state.clone(), BookingEvent::Received, booking.clone());

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "token": booking.token,
            "status": booking.status.as_str(),
        })),
    ))
}

// GET /api/bookings/:token
//
// The public projection: no internal id, no admin notes.
#[derive(Serialize)]
pub struct BookingStatusView {
    pub token: String,
    pub status: String,
    pub service: String,
    pub location_type: String,
    pub preferred_date: Option<NaiveDate>,
    pub preferred_slot: Option<String>,
    pub preferred_display: Option<String>,
    pub confirmed_date: Option<NaiveDate>,
    pub confirmed_slot: Option<String>,
    pub confirmed_display: Option<String>,
    pub created_at: String,
    pub created_display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    pub can_cancel: bool,
}

impl BookingStatusView {
    fn from_booking(booking: &Booking) -> Self {
        let display = |date: Option<NaiveDate>, slot: Option<TimeSlot>| {
            date.map(|d| match slot {
                Some(s) => format!("{}, {}", timezone::format_date_long(d), s.label()),
                None => timezone::format_date_long(d),
            })
        };

        Self {
            token: booking.token.clone(),
            status: booking.status.as_str().to_string(),
            service: booking.service.clone(),
            location_type: booking.location_type.as_str().to_string(),
            preferred_date: booking.preferred_date,
            preferred_slot: booking.preferred_slot.map(|s| s.as_str().to_string()),
            preferred_display: display(booking.preferred_date, booking.preferred_slot),
            confirmed_date: booking.confirmed_date,
            confirmed_slot: booking.confirmed_slot.map(|s| s.as_str().to_string()),
            confirmed_display: display(booking.confirmed_date, booking.confirmed_slot),
            created_at: booking.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            created_display: timezone::format_instant_local(booking.created_at),
            cancellation_reason: booking.cancellation_reason.clone(),
            can_cancel: lifecycle::can_cancel_at(booking, timezone::now_utc()),
        }
    }
}

/// Shape-checks and resolves a customer-supplied token. Malformed input is
/// rejected before the store is consulted, distinct from "not found".
fn resolve_token(state: &AppState, raw: &str) -> Result<Booking, AppError> {
    let normalized = token::normalize(raw);
    if !token::is_well_formed(&normalized) {
        return Err(AppError::Validation(vec![format!(
            "booking codes look like {}-XXXXXX",
            token::TOKEN_PREFIX
        )]));
    }

    let db = state.db.lock().unwrap();
    queries::get_booking_by_token(&db, &normalized)?
        .ok_or_else(|| AppError::NotFound("no booking found for that code".to_string()))
}

pub async fn booking_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(raw_token): Path<String>,
) -> Result<Json<BookingStatusView>, AppError> {
    {
        let db = state.db.lock().unwrap();
        if !ratelimit::check_and_record(&db, &ratelimit::STATUS_LOOKUP, &client_key(&headers)) {
            return Err(AppError::RateLimited(
                "too many lookups, please try again in a minute".to_string(),
            ));
        }
    }

    let booking = resolve_token(&state, &raw_token)?;
    Ok(Json(BookingStatusView::from_booking(&booking)))
}

// POST /api/bookings/:token/cancel
#[derive(Deserialize, Default)]
pub struct CancelBookingRequest {
    pub reason: Option<String>,
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(raw_token): Path<String>,
    payload: Option<Json<CancelBookingRequest>>,
) -> Result<Json<serde_json::Value>, AppError> {
    {
        let db = state.db.lock().unwrap();
        if !ratelimit::check_and_record(&db, &ratelimit::CANCEL_BOOKING, &client_key(&headers)) {
            return Err(AppError::RateLimited(
                "too many cancellation attempts, please try again in a minute".to_string(),
            ));
        }
    }

    let reason = none_if_blank(payload.and_then(|Json(p)| p.reason));
    if reason.as_deref().is_some_and(|r| r.len() > MAX_REASON_LEN) {
        return Err(AppError::Validation(vec![format!(
            "reason must be at most {MAX_REASON_LEN} characters"
        )]));
    }

    let booking = resolve_token(&state, &raw_token)?;

    let cancelled = {
        let db = state.db.lock().unwrap();
        lifecycle::cancel(&db, &booking.id, reason.as_deref(), true)?
    };

    tracing::info!(token = %cancelled.token, "booking cancelled by customer");
    spawn_notification(
        state.clone(),
        BookingEvent::Cancelled { by_customer: true },
        cancelled.clone(),
    );

    Ok(Json(serde_json::json!({
        "ok": true,
        "status": cancelled.status.as_str(),
    })))
}
