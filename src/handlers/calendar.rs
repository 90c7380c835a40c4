use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::db::queries;
use crate::services::calendar::generate_ics;
use crate::services::token;
use crate::state::AppState;

// GET /calendar/:token.ics
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(raw_token): Path<String>,
) -> Response {
    let trimmed = raw_token.strip_suffix(".ics").unwrap_or(&raw_token);
    let normalized = token::normalize(trimmed);
    if !token::is_well_formed(&normalized) {
        return (StatusCode::BAD_REQUEST, "Invalid booking code").into_response();
    }

    let booking = {
        let db = state.db.lock().unwrap();
        match queries::get_booking_by_token(&db, &normalized) {
            Ok(Some(b)) => b,
            Ok(None) => {
                return (StatusCode::NOT_FOUND, "Booking not found").into_response();
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load booking for .ics");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response();
            }
        }
    };

    let Some(ics) = generate_ics(&booking, &state.config.business_name) else {
        return (
            StatusCode::NOT_FOUND,
            "Booking has no confirmed appointment yet",
        )
            .into_response();
    };

    let filename = format!("appointment-{normalized}.ics");
    (
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                &format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response()
}
