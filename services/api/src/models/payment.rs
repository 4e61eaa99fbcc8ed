//! Payment and top-up records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Payment record, at most one per booking
///
/// `paid_at` is null until the booking is actually paid. Reversing a
/// payment (cancel or update of a paid booking) deletes the record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: i64,
    pub booking_id: i64,
    pub amount: f64,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Balance top-up record, the ledger trace of every credit
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TopUp {
    pub id: i64,
    pub user_id: i64,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}
