use chrono::Utc;
use rusqlite::Connection;

use crate::db::queries;

/// Per-action sliding-window throttle. Limits are business configuration,
/// not part of the algorithm.
#[derive(Debug, Clone, Copy)]
pub struct RatePolicy {
    pub action: &'static str,
    pub limit: i64,
    pub window_secs: i64,
}

pub const CREATE_BOOKING: RatePolicy = RatePolicy {
    action: "create_booking",
    limit: 5,
    window_secs: 60,
};

pub const STATUS_LOOKUP: RatePolicy = RatePolicy {
    action: "status_lookup",
    limit: 10,
    window_secs: 60,
};

pub const CANCEL_BOOKING: RatePolicy = RatePolicy {
    action: "cancel_booking",
    limit: 3,
    window_secs: 60,
};

/// Prunes entries older than the window, counts what remains, and records
/// the request if it is allowed. Fail-open: a storage error never blocks
/// legitimate traffic, it just logs.
pub fn check_and_record(conn: &Connection, policy: &RatePolicy, client: &str) -> bool {
    let now = Utc::now().timestamp();
    let cutoff = now - policy.window_secs;

    let allowed = (|| -> anyhow::Result<bool> {
        queries::prune_rate_events(conn, policy.action, client, cutoff)?;
        let count = queries::count_rate_events(conn, policy.action, client)?;
        if count >= policy.limit {
            return Ok(false);
        }
        queries::record_rate_event(conn, policy.action, client, now)?;
        Ok(true)
    })();

    match allowed {
        Ok(verdict) => verdict,
        Err(e) => {
            tracing::warn!(error = %e, action = policy.action, "rate limit check failed, allowing request");
            true
        }
    }
}
