use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A calendar day on which no appointments may be confirmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedDate {
    pub date: NaiveDate,
    pub reason: Option<String>,
}
