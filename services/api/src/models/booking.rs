//! Booking model and request/response payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Booking entity
///
/// `total_price` is a snapshot of days x nightly category price taken when
/// the booking is created or updated; later category price changes do not
/// touch it. `is_paid` is true exactly while a payment with a non-null
/// `paid_at` exists for this booking.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: i64,
    pub user_id: i64,
    pub room_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_price: f64,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Number of nights currently covered by this booking
    pub fn nights(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

/// Insert payload for a new booking
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: i64,
    pub room_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_price: f64,
}

/// Request body for creating a booking
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub room_id: i64,
    pub start_date: DateTime<Utc>,
    pub days: i64,
}

/// Request body for updating a booking; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBookingRequest {
    pub room_id: Option<i64>,
    pub days: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
}

/// Response after creating a booking
#[derive(Debug, Serialize)]
pub struct BookingCreated {
    pub message: String,
    pub room_name: String,
    pub category: String,
    pub total_price: f64,
}

/// One row of the caller's booking list
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    pub booking_id: i64,
    pub room_id: i64,
    pub room_name: String,
    pub category: String,
    pub price: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_price: f64,
    pub is_paid: bool,
}

/// Response after a successful payment
#[derive(Debug, Serialize)]
pub struct PaymentReceipt {
    pub message: String,
    pub booking_id: i64,
    pub room_name: String,
    pub total_price: f64,
    pub balance: f64,
    pub is_paid: bool,
    pub paid_at: DateTime<Utc>,
}

/// Response after cancelling a booking
#[derive(Debug, Serialize)]
pub struct CancellationNotice {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<f64>,
}

/// Response after updating a booking
#[derive(Debug, Serialize)]
pub struct BookingUpdated {
    pub message: String,
    pub room_name: String,
    pub total_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<f64>,
}
