pub mod admin;
pub mod calendar;
pub mod cron;
pub mod health;
pub mod public;

use std::sync::Arc;

use crate::models::Booking;
use crate::services::notifications::{self, BookingEvent};
use crate::state::AppState;

/// Notifications never block or fail the booking operation that triggered
/// them; they run after the mutation has committed.
pub(crate) fn spawn_notification(state: Arc<AppState>, event: BookingEvent, booking: Booking) {
    tokio::spawn(async move {
        notifications::dispatch(&state, event, &booking).await;
    });
}
