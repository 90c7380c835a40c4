use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{BlockedDate, Booking, BookingStatus, LocationType, NewBooking, TimeSlot};
use crate::services::token;

const DT_FMT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FMT: &str = "%Y-%m-%d";

// ── Bookings ──

/// Assigns an id and a unique lookup token, initializes status to pending
/// and writes the record. Collisions on the token are detected and the
/// token regenerated; SQLite's unique index is the backstop.
pub fn create_booking(conn: &Connection, new: NewBooking) -> anyhow::Result<Booking> {
    let token = assign_unique_token(conn, &mut token::generate)?;
    let now = Utc::now().naive_utc();

    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        token,
        customer_name: new.customer_name,
        customer_email: new.customer_email,
        customer_phone: new.customer_phone,
        service: new.service,
        location_type: new.location_type,
        address: new.address,
        preferred_date: new.preferred_date,
        preferred_slot: new.preferred_slot,
        pressure: new.pressure,
        message: new.message,
        confirmed_date: None,
        confirmed_slot: None,
        admin_notes: None,
        cancellation_reason: None,
        status: BookingStatus::Pending,
        created_at: now,
        updated_at: now,
        confirmed_at: None,
        completed_at: None,
        cancelled_at: None,
    };

    insert_booking(conn, &booking)?;
    Ok(booking)
}

/// Draws tokens from the generator until one is free. The alphabet makes
/// collisions vanishingly rare, but the check is still required.
pub fn assign_unique_token(
    conn: &Connection,
    generate: &mut dyn FnMut() -> String,
) -> anyhow::Result<String> {
    for _ in 0..10 {
        let candidate = generate();
        if !token_exists(conn, &candidate)? {
            return Ok(candidate);
        }
        tracing::warn!(token = %candidate, "lookup token collision, regenerating");
    }
    anyhow::bail!("could not assign a unique lookup token after 10 attempts")
}

pub fn token_exists(conn: &Connection, token: &str) -> anyhow::Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM bookings WHERE token = ?1)",
        params![token],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn insert_booking(conn: &Connection, b: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, token, customer_name, customer_email, customer_phone,
            service, location_type, address, preferred_date, preferred_slot, pressure, message,
            confirmed_date, confirmed_slot, admin_notes, cancellation_reason, status,
            created_at, updated_at, confirmed_at, completed_at, cancelled_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
        params![
            b.id,
            b.token,
            b.customer_name,
            b.customer_email,
            b.customer_phone,
            b.service,
            b.location_type.as_str(),
            b.address,
            b.preferred_date.map(|d| d.format(DATE_FMT).to_string()),
            b.preferred_slot.map(|s| s.as_str()),
            b.pressure,
            b.message,
            b.confirmed_date.map(|d| d.format(DATE_FMT).to_string()),
            b.confirmed_slot.map(|s| s.as_str()),
            b.admin_notes,
            b.cancellation_reason,
            b.status.as_str(),
            b.created_at.format(DT_FMT).to_string(),
            b.updated_at.format(DT_FMT).to_string(),
            b.confirmed_at.map(|t| t.format(DT_FMT).to_string()),
            b.completed_at.map(|t| t.format(DT_FMT).to_string()),
            b.cancelled_at.map(|t| t.format(DT_FMT).to_string()),
        ],
    )?;
    Ok(())
}

/// Full-row update. Callers bump `updated_at` before saving; the row and
/// its status/date indexes commit together.
pub fn save_booking(conn: &Connection, b: &Booking) -> anyhow::Result<()> {
    let count = conn.execute(
        "UPDATE bookings SET
            customer_name = ?2, customer_email = ?3, customer_phone = ?4,
            service = ?5, location_type = ?6, address = ?7,
            preferred_date = ?8, preferred_slot = ?9, pressure = ?10, message = ?11,
            confirmed_date = ?12, confirmed_slot = ?13, admin_notes = ?14,
            cancellation_reason = ?15, status = ?16, updated_at = ?17,
            confirmed_at = ?18, completed_at = ?19, cancelled_at = ?20
         WHERE id = ?1",
        params![
            b.id,
            b.customer_name,
            b.customer_email,
            b.customer_phone,
            b.service,
            b.location_type.as_str(),
            b.address,
            b.preferred_date.map(|d| d.format(DATE_FMT).to_string()),
            b.preferred_slot.map(|s| s.as_str()),
            b.pressure,
            b.message,
            b.confirmed_date.map(|d| d.format(DATE_FMT).to_string()),
            b.confirmed_slot.map(|s| s.as_str()),
            b.admin_notes,
            b.cancellation_reason,
            b.status.as_str(),
            b.updated_at.format(DT_FMT).to_string(),
            b.confirmed_at.map(|t| t.format(DT_FMT).to_string()),
            b.completed_at.map(|t| t.format(DT_FMT).to_string()),
            b.cancelled_at.map(|t| t.format(DT_FMT).to_string()),
        ],
    )?;
    anyhow::ensure!(count > 0, "booking {} not found for update", b.id);
    Ok(())
}

const BOOKING_COLUMNS: &str = "id, token, customer_name, customer_email, customer_phone, \
    service, location_type, address, preferred_date, preferred_slot, pressure, message, \
    confirmed_date, confirmed_slot, admin_notes, cancellation_reason, status, \
    created_at, updated_at, confirmed_at, completed_at, cancelled_at";

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    let result = conn.query_row(&sql, params![id], |row| Ok(parse_booking_row(row)));

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_booking_by_token(conn: &Connection, token: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE token = ?1");
    let result = conn.query_row(&sql, params![token], |row| Ok(parse_booking_row(row)));

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_bookings(
    conn: &Connection,
    status_filter: Option<BookingStatus>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Booking>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = ?1 \
                 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3"
            ),
            vec![
                Box::new(status.as_str().to_string()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
                Box::new(offset),
            ],
        ),
        None => (
            format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings \
                 ORDER BY created_at DESC LIMIT ?1 OFFSET ?2"
            ),
            vec![
                Box::new(limit) as Box<dyn rusqlite::types::ToSql>,
                Box::new(offset),
            ],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

#[derive(Debug, Default, serde::Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub cancelled: i64,
}

pub fn booking_stats(conn: &Connection) -> anyhow::Result<StatusCounts> {
    let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM bookings GROUP BY status")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut counts = StatusCounts::default();
    for row in rows {
        let (status, count) = row?;
        match status.as_str() {
            "pending" => counts.pending = count,
            "confirmed" => counts.confirmed = count,
            "completed" => counts.completed = count,
            "cancelled" => counts.cancelled = count,
            other => tracing::warn!(status = %other, "unknown status in bookings table"),
        }
    }
    Ok(counts)
}

/// The (date, slot) pair is the collision key for confirmations. Only
/// active bookings occupy a slot; the booking being confirmed is excluded.
pub fn slot_taken(
    conn: &Connection,
    date: NaiveDate,
    slot: TimeSlot,
    exclude_id: &str,
) -> anyhow::Result<bool> {
    let taken: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM bookings
            WHERE confirmed_date = ?1 AND confirmed_slot = ?2
              AND status IN ('pending', 'confirmed')
              AND id <> ?3
        )",
        params![date.format(DATE_FMT).to_string(), slot.as_str(), exclude_id],
        |row| row.get(0),
    )?;
    Ok(taken)
}

pub fn confirmed_bookings_on(conn: &Connection, date: NaiveDate) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings \
         WHERE status = 'confirmed' AND confirmed_date = ?1 \
         ORDER BY confirmed_slot ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![date.format(DATE_FMT).to_string()], |row| {
        Ok(parse_booking_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let parse_dt = |s: String| {
        NaiveDateTime::parse_from_str(&s, DT_FMT).unwrap_or_else(|_| Utc::now().naive_utc())
    };
    let parse_date = |s: String| NaiveDate::parse_from_str(&s, DATE_FMT).ok();

    let location_str: String = row.get(6)?;
    let preferred_date: Option<String> = row.get(8)?;
    let preferred_slot: Option<String> = row.get(9)?;
    let confirmed_date: Option<String> = row.get(12)?;
    let confirmed_slot: Option<String> = row.get(13)?;
    let status_str: String = row.get(16)?;

    Ok(Booking {
        id: row.get(0)?,
        token: row.get(1)?,
        customer_name: row.get(2)?,
        customer_email: row.get(3)?,
        customer_phone: row.get(4)?,
        service: row.get(5)?,
        location_type: LocationType::parse(&location_str).unwrap_or(LocationType::Home),
        address: row.get(7)?,
        preferred_date: preferred_date.and_then(parse_date),
        preferred_slot: preferred_slot.as_deref().and_then(TimeSlot::parse),
        pressure: row.get(10)?,
        message: row.get(11)?,
        confirmed_date: confirmed_date.and_then(parse_date),
        confirmed_slot: confirmed_slot.as_deref().and_then(TimeSlot::parse),
        admin_notes: row.get(14)?,
        cancellation_reason: row.get(15)?,
        status: BookingStatus::parse(&status_str).unwrap_or(BookingStatus::Pending),
        created_at: parse_dt(row.get(17)?),
        updated_at: parse_dt(row.get(18)?),
        confirmed_at: row.get::<_, Option<String>>(19)?.map(parse_dt),
        completed_at: row.get::<_, Option<String>>(20)?.map(parse_dt),
        cancelled_at: row.get::<_, Option<String>>(21)?.map(parse_dt),
    })
}

// ── Blocked Dates ──

/// Idempotent: at most one record per calendar day. A repeated add
/// overwrites the reason (last write wins).
pub fn add_blocked_date(
    conn: &Connection,
    date: NaiveDate,
    reason: Option<&str>,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO blocked_dates (date, reason) VALUES (?1, ?2)
         ON CONFLICT(date) DO UPDATE SET reason = excluded.reason",
        params![date.format(DATE_FMT).to_string(), reason],
    )?;
    Ok(())
}

pub fn remove_blocked_date(conn: &Connection, date: NaiveDate) -> anyhow::Result<bool> {
    let count = conn.execute(
        "DELETE FROM blocked_dates WHERE date = ?1",
        params![date.format(DATE_FMT).to_string()],
    )?;
    Ok(count > 0)
}

pub fn get_blocked_date(conn: &Connection, date: NaiveDate) -> anyhow::Result<Option<BlockedDate>> {
    let result = conn.query_row(
        "SELECT date, reason FROM blocked_dates WHERE date = ?1",
        params![date.format(DATE_FMT).to_string()],
        |row| {
            let date_str: String = row.get(0)?;
            let reason: Option<String> = row.get(1)?;
            Ok((date_str, reason))
        },
    );

    match result {
        Ok((date_str, reason)) => Ok(NaiveDate::parse_from_str(&date_str, DATE_FMT)
            .ok()
            .map(|date| BlockedDate { date, reason })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Months are YYYY-MM keys, e.g. ["2025-06", "2025-07"].
pub fn list_blocked_dates(conn: &Connection, months: &[String]) -> anyhow::Result<Vec<BlockedDate>> {
    if months.is_empty() {
        return Ok(vec![]);
    }

    let placeholders: Vec<String> = (1..=months.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT date, reason FROM blocked_dates WHERE substr(date, 1, 7) IN ({}) ORDER BY date ASC",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        months.iter().map(|m| m as &dyn rusqlite::types::ToSql).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| {
        let date_str: String = row.get(0)?;
        let reason: Option<String> = row.get(1)?;
        Ok((date_str, reason))
    })?;

    let mut blocked = vec![];
    for row in rows {
        let (date_str, reason) = row?;
        if let Ok(date) = NaiveDate::parse_from_str(&date_str, DATE_FMT) {
            blocked.push(BlockedDate { date, reason });
        }
    }
    Ok(blocked)
}

// ── Rate Limit Events ──

pub fn prune_rate_events(
    conn: &Connection,
    action: &str,
    client: &str,
    cutoff_unix: i64,
) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM rate_limit_events WHERE action = ?1 AND client = ?2 AND at < ?3",
        params![action, client, cutoff_unix],
    )?;
    Ok(count)
}

pub fn count_rate_events(conn: &Connection, action: &str, client: &str) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM rate_limit_events WHERE action = ?1 AND client = ?2",
        params![action, client],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn record_rate_event(
    conn: &Connection,
    action: &str,
    client: &str,
    at_unix: i64,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO rate_limit_events (action, client, at) VALUES (?1, ?2, ?3)",
        params![action, client, at_unix],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_request() -> NewBooking {
        NewBooking {
            customer_name: "Jane Doe".to_string(),
            customer_email: "jane@x.com".to_string(),
            customer_phone: "555-0100".to_string(),
            service: "Swedish Massage".to_string(),
            location_type: LocationType::Home,
            address: None,
            preferred_date: Some(date("2025-06-01")),
            preferred_slot: Some(TimeSlot::Morning),
            pressure: None,
            message: None,
        }
    }

    #[test]
    fn test_create_booking_starts_pending_with_token() {
        let conn = setup_db();
        let booking = create_booking(&conn, sample_request()).unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        assert!(booking.token.starts_with("AUR-"));

        let loaded = get_booking_by_token(&conn, &booking.token).unwrap().unwrap();
        assert_eq!(loaded.id, booking.id);
        assert_eq!(loaded.customer_name, "Jane Doe");
        assert_eq!(loaded.preferred_slot, Some(TimeSlot::Morning));
    }

    #[test]
    fn test_assign_unique_token_retries_on_collision() {
        let conn = setup_db();
        let existing = create_booking(&conn, sample_request()).unwrap();

        let colliding = existing.token.clone();
        let mut calls = 0;
        let token = assign_unique_token(&conn, &mut || {
            calls += 1;
            if calls == 1 {
                colliding.clone()
            } else {
                "AUR-ZZZZZ9".to_string()
            }
        })
        .unwrap();

        assert_eq!(token, "AUR-ZZZZZ9");
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_assign_unique_token_gives_up_eventually() {
        let conn = setup_db();
        let existing = create_booking(&conn, sample_request()).unwrap();

        let colliding = existing.token.clone();
        let result = assign_unique_token(&conn, &mut || colliding.clone());
        assert!(result.is_err());
    }

    #[test]
    fn test_list_bookings_filter_and_pagination() {
        let conn = setup_db();
        for _ in 0..5 {
            create_booking(&conn, sample_request()).unwrap();
        }

        let all = list_bookings(&conn, None, 10, 0).unwrap();
        assert_eq!(all.len(), 5);

        let page = list_bookings(&conn, Some(BookingStatus::Pending), 2, 2).unwrap();
        assert_eq!(page.len(), 2);

        let none = list_bookings(&conn, Some(BookingStatus::Cancelled), 10, 0).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_booking_stats_counts_per_status() {
        let conn = setup_db();
        let a = create_booking(&conn, sample_request()).unwrap();
        create_booking(&conn, sample_request()).unwrap();

        let mut confirmed = a.clone();
        confirmed.status = BookingStatus::Confirmed;
        save_booking(&conn, &confirmed).unwrap();

        let stats = booking_stats(&conn).unwrap();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.confirmed, 1);
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.cancelled, 0);
    }

    #[test]
    fn test_slot_taken_excludes_the_booking_itself() {
        let conn = setup_db();
        let mut booking = create_booking(&conn, sample_request()).unwrap();
        booking.status = BookingStatus::Confirmed;
        booking.confirmed_date = Some(date("2025-06-02"));
        booking.confirmed_slot = Some(TimeSlot::Afternoon);
        save_booking(&conn, &booking).unwrap();

        assert!(slot_taken(&conn, date("2025-06-02"), TimeSlot::Afternoon, "").unwrap());
        assert!(!slot_taken(&conn, date("2025-06-02"), TimeSlot::Afternoon, &booking.id).unwrap());
        assert!(!slot_taken(&conn, date("2025-06-02"), TimeSlot::Morning, "").unwrap());
        assert!(!slot_taken(&conn, date("2025-06-03"), TimeSlot::Afternoon, "").unwrap());
    }

    #[test]
    fn test_cancelled_booking_frees_its_slot() {
        let conn = setup_db();
        let mut booking = create_booking(&conn, sample_request()).unwrap();
        booking.status = BookingStatus::Confirmed;
        booking.confirmed_date = Some(date("2025-06-02"));
        booking.confirmed_slot = Some(TimeSlot::Evening);
        save_booking(&conn, &booking).unwrap();
        assert!(slot_taken(&conn, date("2025-06-02"), TimeSlot::Evening, "").unwrap());

        booking.status = BookingStatus::Cancelled;
        save_booking(&conn, &booking).unwrap();
        assert!(!slot_taken(&conn, date("2025-06-02"), TimeSlot::Evening, "").unwrap());
    }

    #[test]
    fn test_blocked_date_add_is_idempotent_last_write_wins() {
        let conn = setup_db();
        add_blocked_date(&conn, date("2025-06-03"), Some("Holiday")).unwrap();
        add_blocked_date(&conn, date("2025-06-03"), Some("Family trip")).unwrap();

        let blocked = list_blocked_dates(&conn, &["2025-06".to_string()]).unwrap();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].reason.as_deref(), Some("Family trip"));
    }

    #[test]
    fn test_list_blocked_dates_scoped_by_month() {
        let conn = setup_db();
        add_blocked_date(&conn, date("2025-06-03"), None).unwrap();
        add_blocked_date(&conn, date("2025-07-04"), Some("Closed")).unwrap();
        add_blocked_date(&conn, date("2025-08-01"), None).unwrap();

        let months = vec!["2025-06".to_string(), "2025-07".to_string()];
        let blocked = list_blocked_dates(&conn, &months).unwrap();
        assert_eq!(blocked.len(), 2);
        assert_eq!(blocked[0].date, date("2025-06-03"));
        assert_eq!(blocked[1].date, date("2025-07-04"));
    }

    #[test]
    fn test_remove_blocked_date() {
        let conn = setup_db();
        add_blocked_date(&conn, date("2025-06-03"), None).unwrap();

        assert!(remove_blocked_date(&conn, date("2025-06-03")).unwrap());
        assert!(!remove_blocked_date(&conn, date("2025-06-03")).unwrap());
        assert!(get_blocked_date(&conn, date("2025-06-03")).unwrap().is_none());
    }
}
