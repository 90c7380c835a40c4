pub mod resend;

use async_trait::async_trait;

use crate::models::Booking;
use crate::services::timezone;
use crate::state::AppState;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Used when no email provider is configured (local development): messages
/// are logged instead of delivered.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_email(&self, to: &str, subject: &str, _body: &str) -> anyhow::Result<()> {
        tracing::info!(to = %to, subject = %subject, "email notification (log only)");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingEvent {
    Received,
    Confirmed,
    Cancelled { by_customer: bool },
    Reminder,
}

/// Renders the customer-facing subject and body for a lifecycle event.
pub fn render(event: BookingEvent, booking: &Booking) -> (String, String) {
    let first_name = booking
        .customer_name
        .split_whitespace()
        .next()
        .unwrap_or("there");

    match event {
        BookingEvent::Received => (
            "We received your booking request".to_string(),
            format!(
                "Hi {first_name},\n\n\
                 Thanks for requesting a {service} appointment. We'll confirm a date and \
                 time with you shortly.\n\n\
                 Your lookup code is {token}. You can use it any time to check your \
                 booking status or cancel.\n\n\
                 Aura Mobile Massage",
                service = booking.service,
                token = booking.token,
            ),
        ),
        BookingEvent::Confirmed => {
            let when = match (booking.confirmed_date, booking.confirmed_slot) {
                (Some(date), Some(slot)) => format!(
                    "{}, {}",
                    timezone::format_date_long(date),
                    slot.label()
                ),
                _ => "your requested time".to_string(),
            };
            (
                "Your appointment is confirmed".to_string(),
                format!(
                    "Hi {first_name},\n\n\
                     Your {service} appointment is confirmed for {when}.\n\n\
                     Need to make a change? Use lookup code {token}, or just reply to \
                     this email.\n\n\
                     Aura Mobile Massage",
                    service = booking.service,
                    token = booking.token,
                ),
            )
        }
        BookingEvent::Cancelled { by_customer } => {
            let lede = if by_customer {
                "Your booking has been cancelled as requested."
            } else {
                "We're sorry - we had to cancel your booking."
            };
            let reason = booking
                .cancellation_reason
                .as_deref()
                .map(|r| format!("\n\nReason: {r}"))
                .unwrap_or_default();
            (
                "Your booking has been cancelled".to_string(),
                format!(
                    "Hi {first_name},\n\n{lede}{reason}\n\n\
                     We'd love to see you another time.\n\n\
                     Aura Mobile Massage"
                ),
            )
        }
        BookingEvent::Reminder => {
            let when = match (booking.confirmed_date, booking.confirmed_slot) {
                (Some(date), Some(slot)) => format!(
                    "tomorrow, {} - {}",
                    timezone::format_date_long(date),
                    slot.label()
                ),
                _ => "tomorrow".to_string(),
            };
            (
                "Reminder: your massage is tomorrow".to_string(),
                format!(
                    "Hi {first_name},\n\n\
                     A quick reminder that your {service} appointment is {when}.\n\n\
                     See you soon!\n\n\
                     Aura Mobile Massage",
                    service = booking.service,
                ),
            )
        }
    }
}

/// Fire-and-forget delivery for a lifecycle event. Failures are logged and
/// swallowed: the booking mutation has already committed, and its outcome
/// never depends on delivery.
pub async fn dispatch(state: &AppState, event: BookingEvent, booking: &Booking) {
    let (subject, body) = render(event, booking);

    if let Err(e) = state
        .notifier
        .send_email(&booking.customer_email, &subject, &body)
        .await
    {
        tracing::warn!(error = %e, token = %booking.token, "customer notification failed");
    }

    // New requests also alert the owner so nothing sits unconfirmed.
    if event == BookingEvent::Received && !state.config.owner_email.is_empty() {
        let owner_body = format!(
            "New booking request:\n\n\
             {name} <{email}> / {phone}\n\
             Service: {service} ({location})\n\
             Preferred: {preferred}\n\
             Lookup code: {token}",
            name = booking.customer_name,
            email = booking.customer_email,
            phone = booking.customer_phone,
            service = booking.service,
            location = booking.location_type.as_str(),
            preferred = match (booking.preferred_date, booking.preferred_slot) {
                (Some(d), Some(s)) => format!("{} ({})", d, s.as_str()),
                (Some(d), None) => d.to_string(),
                _ => "no preference".to_string(),
            },
            token = booking.token,
        );
        if let Err(e) = state
            .notifier
            .send_email(&state.config.owner_email, "New booking request", &owner_body)
            .await
        {
            tracing::warn!(error = %e, "owner notification failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingStatus, LocationType, TimeSlot};
    use chrono::{NaiveDate, Utc};

    fn sample_booking() -> Booking {
        let now = Utc::now().naive_utc();
        Booking {
            id: "b-1".to_string(),
            token: "AUR-7MK2XQ".to_string(),
            customer_name: "Jane Doe".to_string(),
            customer_email: "jane@x.com".to_string(),
            customer_phone: "555-0100".to_string(),
            service: "Swedish Massage".to_string(),
            location_type: LocationType::Home,
            address: None,
            preferred_date: None,
            preferred_slot: None,
            pressure: None,
            message: None,
            confirmed_date: NaiveDate::parse_from_str("2025-06-02", "%Y-%m-%d").ok(),
            confirmed_slot: Some(TimeSlot::Afternoon),
            admin_notes: None,
            cancellation_reason: None,
            status: BookingStatus::Confirmed,
            created_at: now,
            updated_at: now,
            confirmed_at: Some(now),
            completed_at: None,
            cancelled_at: None,
        }
    }

    #[test]
    fn test_received_mentions_token() {
        let (subject, body) = render(BookingEvent::Received, &sample_booking());
        assert!(subject.contains("received"));
        assert!(body.contains("AUR-7MK2XQ"));
        assert!(body.contains("Hi Jane"));
    }

    #[test]
    fn test_confirmed_mentions_date_and_slot() {
        let (_, body) = render(BookingEvent::Confirmed, &sample_booking());
        assert!(body.contains("Monday, June 2, 2025"));
        assert!(body.contains("Afternoon"));
    }

    #[test]
    fn test_cancelled_wording_differs_by_origin() {
        let booking = sample_booking();
        let (_, by_customer) = render(BookingEvent::Cancelled { by_customer: true }, &booking);
        let (_, by_admin) = render(BookingEvent::Cancelled { by_customer: false }, &booking);
        assert!(by_customer.contains("as requested"));
        assert!(by_admin.contains("we had to cancel"));
    }

    #[test]
    fn test_cancelled_includes_reason_when_present() {
        let mut booking = sample_booking();
        booking.cancellation_reason = Some("Customer request: schedule change".to_string());
        let (_, body) = render(BookingEvent::Cancelled { by_customer: true }, &booking);
        assert!(body.contains("Reason: Customer request: schedule change"));
    }

    #[test]
    fn test_reminder_says_tomorrow() {
        let (subject, body) = render(BookingEvent::Reminder, &sample_booking());
        assert!(subject.contains("tomorrow"));
        assert!(body.contains("tomorrow"));
    }
}
