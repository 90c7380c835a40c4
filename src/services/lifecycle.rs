use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{Booking, BookingStatus, TimeSlot};
use crate::services::timezone;

pub const DEFAULT_ADMIN_REASON: &str = "Cancelled by Aura Mobile Massage";
const CUSTOMER_REASON_PREFIX: &str = "Customer request";

/// How far ahead of the appointment a customer may still cancel on their
/// own. Inside the window they are asked to contact the business directly.
const CANCELLATION_NOTICE_HOURS: i64 = 24;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("booking not found")]
    NotFound,

    #[error("a {from} booking cannot be changed to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("{0} is blocked out and cannot take appointments")]
    DateBlocked(NaiveDate),

    #[error("the {slot} slot on {date} is already taken")]
    SlotTaken { date: NaiveDate, slot: TimeSlot },

    #[error("confirmed appointments can only be cancelled more than 24 hours in advance - please call or text us to make a change")]
    TooLateToCancel,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Confirms a pending booking onto a (date, slot) pair. The blocked-date
/// and slot-collision checks run in the same transaction as the write, on
/// the single shared connection, so two racing confirms cannot both pass
/// the availability check.
pub fn confirm(
    conn: &Connection,
    id: &str,
    date: NaiveDate,
    slot: TimeSlot,
) -> Result<Booking, LifecycleError> {
    let tx = conn.unchecked_transaction().map_err(anyhow::Error::from)?;

    let mut booking = queries::get_booking_by_id(&tx, id)?.ok_or(LifecycleError::NotFound)?;
    if !booking.status.can_transition_to(BookingStatus::Confirmed) {
        return Err(LifecycleError::InvalidTransition {
            from: booking.status,
            to: BookingStatus::Confirmed,
        });
    }
    if queries::get_blocked_date(&tx, date)?.is_some() {
        return Err(LifecycleError::DateBlocked(date));
    }
    if queries::slot_taken(&tx, date, slot, &booking.id)? {
        return Err(LifecycleError::SlotTaken { date, slot });
    }

    let now = Utc::now().naive_utc();
    booking.status = BookingStatus::Confirmed;
    booking.confirmed_date = Some(date);
    booking.confirmed_slot = Some(slot);
    booking.confirmed_at = Some(now);
    booking.updated_at = now;

    queries::save_booking(&tx, &booking)?;
    tx.commit().map_err(anyhow::Error::from)?;
    Ok(booking)
}

/// Cancels a booking. Admins may cancel anything that is not already
/// terminal; customers are additionally held to the 24-hour notice rule.
pub fn cancel(
    conn: &Connection,
    id: &str,
    reason: Option<&str>,
    by_customer: bool,
) -> Result<Booking, LifecycleError> {
    let mut booking = queries::get_booking_by_id(conn, id)?.ok_or(LifecycleError::NotFound)?;
    if !booking.status.can_transition_to(BookingStatus::Cancelled) {
        return Err(LifecycleError::InvalidTransition {
            from: booking.status,
            to: BookingStatus::Cancelled,
        });
    }
    if by_customer && !can_cancel_at(&booking, timezone::now_utc()) {
        return Err(LifecycleError::TooLateToCancel);
    }

    let now = Utc::now().naive_utc();
    booking.cancellation_reason = Some(match (by_customer, reason) {
        (true, Some(r)) => format!("{CUSTOMER_REASON_PREFIX}: {r}"),
        (true, None) => format!("{CUSTOMER_REASON_PREFIX}: no reason given"),
        (false, Some(r)) => r.to_string(),
        (false, None) => DEFAULT_ADMIN_REASON.to_string(),
    });
    booking.status = BookingStatus::Cancelled;
    booking.cancelled_at = Some(now);
    booking.updated_at = now;

    queries::save_booking(conn, &booking)?;
    Ok(booking)
}

pub fn complete(conn: &Connection, id: &str) -> Result<Booking, LifecycleError> {
    let mut booking = queries::get_booking_by_id(conn, id)?.ok_or(LifecycleError::NotFound)?;
    if !booking.status.can_transition_to(BookingStatus::Completed) {
        return Err(LifecycleError::InvalidTransition {
            from: booking.status,
            to: BookingStatus::Completed,
        });
    }

    let now = Utc::now().naive_utc();
    booking.status = BookingStatus::Completed;
    booking.completed_at = Some(now);
    booking.updated_at = now;

    queries::save_booking(conn, &booking)?;
    Ok(booking)
}

/// Customer self-service eligibility. Pending bookings can always be
/// cancelled; confirmed ones only while noon local on the confirmed date
/// is still more than 24 hours away; terminal bookings never.
pub fn can_cancel_at(booking: &Booking, now_utc: NaiveDateTime) -> bool {
    match booking.status {
        BookingStatus::Pending => true,
        BookingStatus::Confirmed => match booking.confirmed_date {
            Some(date) => {
                timezone::noon_local_as_utc(date) - now_utc
                    > Duration::hours(CANCELLATION_NOTICE_HOURS)
            }
            None => true,
        },
        BookingStatus::Completed | BookingStatus::Cancelled => false,
    }
}
