use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Duration;

use crate::db::queries;
use crate::errors::AppError;
use crate::services::notifications::{self, BookingEvent};
use crate::services::timezone;
use crate::state::AppState;

// POST /api/cron/reminders
//
// Invoked once a day by an external scheduler. Finds confirmed bookings
// whose confirmed date is tomorrow in the business timezone and sends each
// customer a reminder. Deliveries are awaited here (unlike lifecycle
// notifications) so the response can report how many went out.
pub async fn run_reminder_sweep(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    if state.config.cron_secret.is_empty() {
        tracing::warn!("CRON_SECRET not set, reminder sweep is unauthenticated");
    } else {
        let provided = headers
            .get("x-cron-secret")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if provided != state.config.cron_secret {
            return Err(AppError::Unauthorized);
        }
    }

    let tomorrow = timezone::local_today() + Duration::days(1);
    let bookings = {
        let db = state.db.lock().unwrap();
        queries::confirmed_bookings_on(&db, tomorrow)?
    };

    let mut sent = 0;
    let mut failed = 0;
    for booking in &bookings {
        let (subject, body) = notifications::render(BookingEvent::Reminder, booking);
        match state
            .notifier
            .send_email(&booking.customer_email, &subject, &body)
            .await
        {
            Ok(()) => sent += 1,
            Err(e) => {
                tracing::warn!(error = %e, token = %booking.token, "reminder delivery failed");
                failed += 1;
            }
        }
    }

    tracing::info!(date = %tomorrow, sent, failed, "reminder sweep finished");
    Ok(Json(serde_json::json!({
        "date": tomorrow.to_string(),
        "sent": sent,
        "failed": failed,
    })))
}
