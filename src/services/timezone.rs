use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// All timestamps are stored as UTC; display and calendar math use the
/// business civil timezone, America/Phoenix. Phoenix does not observe DST,
/// so a fixed UTC-7 offset is exact year-round.
const BUSINESS_UTC_OFFSET_HOURS: i64 = -7;

pub fn business_tz() -> FixedOffset {
    FixedOffset::east_opt((BUSINESS_UTC_OFFSET_HOURS * 3600) as i32).unwrap()
}

pub fn now_utc() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub fn to_local(utc: NaiveDateTime) -> DateTime<FixedOffset> {
    DateTime::<Utc>::from_naive_utc_and_offset(utc, Utc).with_timezone(&business_tz())
}

/// Today's calendar date in the business timezone.
pub fn local_today() -> NaiveDate {
    Utc::now().with_timezone(&business_tz()).date_naive()
}

/// Noon local on the given calendar day, expressed as a UTC instant.
/// This is the anchor for the 24-hour cancellation window.
pub fn noon_local_as_utc(date: NaiveDate) -> NaiveDateTime {
    let noon_local = date.and_hms_opt(12, 0, 0).unwrap();
    noon_local - Duration::hours(BUSINESS_UTC_OFFSET_HOURS)
}

/// "Monday, June 2, 2025"
pub fn format_date_long(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

/// A stored UTC instant rendered for customers, e.g. "June 1, 2025 at 10:30 AM".
pub fn format_instant_local(utc: NaiveDateTime) -> String {
    to_local(utc).format("%B %-d, %Y at %-I:%M %p").to_string()
}
