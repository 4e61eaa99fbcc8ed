//! Append-only audit trail of user actions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of user action recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Booking,
    Payment,
    Cancellation,
    Update,
    Topup,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::Booking => "booking",
            ActivityKind::Payment => "payment",
            ActivityKind::Cancellation => "cancellation",
            ActivityKind::Update => "update",
            ActivityKind::Topup => "topup",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booking" => Ok(ActivityKind::Booking),
            "payment" => Ok(ActivityKind::Payment),
            "cancellation" => Ok(ActivityKind::Cancellation),
            "update" => Ok(ActivityKind::Update),
            "topup" => Ok(ActivityKind::Topup),
            other => Err(format!("unknown activity kind: {}", other)),
        }
    }
}

/// One entry of the audit trail; entries are never mutated or deleted
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub id: i64,
    pub user_id: i64,
    pub description: String,
    pub activity_type: ActivityKind,
    pub reference_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for an audit entry
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: i64,
    pub description: String,
    pub activity_type: ActivityKind,
    pub reference_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [
            ActivityKind::Booking,
            ActivityKind::Payment,
            ActivityKind::Cancellation,
            ActivityKind::Update,
            ActivityKind::Topup,
        ] {
            assert_eq!(kind.as_str().parse::<ActivityKind>(), Ok(kind));
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!("refund".parse::<ActivityKind>().is_err());
    }
}
