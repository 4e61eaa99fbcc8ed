//! Storage abstraction for the booking service
//!
//! The service talks to persistence through two traits. [`BookingStore`]
//! answers read-only queries and opens units of work; [`UnitOfWork`] scopes
//! one logical operation: every write performed through it becomes visible
//! only when [`UnitOfWork::commit`] is called, and dropping the value
//! without committing discards all of them. Reads inside a unit of work
//! lock the rows they return, so concurrent operations on the same room or
//! user serialize instead of racing their stock/balance checks.
//!
//! [`postgres::PgStore`] is the production implementation; [`memory::MemStore`]
//! backs the lifecycle tests.

pub mod memory;
pub mod postgres;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    ActivityEntry, Booking, BookingView, NewActivity, NewBooking, NewUser, Payment, RoomRecord,
    RoomSummary, RoomView, TopUp, User,
};

/// Custom error type for storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error surfaced by the underlying database
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value could not be decoded into its model type
    #[error("stored value could not be decoded: {0}")]
    Decode(String),
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;

/// Handle to the booking store
///
/// Cheap to clone; one value is shared by all request handlers.
#[allow(async_fn_in_trait)]
pub trait BookingStore: Clone + Send + Sync + 'static {
    type Uow: UnitOfWork;

    /// Open a unit of work covering one logical operation
    async fn begin(&self) -> StoreResult<Self::Uow>;

    /// All rooms with their category and remaining stock
    async fn rooms(&self) -> StoreResult<Vec<RoomSummary>>;

    /// A single room with its category, if it exists
    async fn room(&self, room_id: i64) -> StoreResult<Option<RoomView>>;

    /// A user account by id
    async fn user(&self, user_id: i64) -> StoreResult<Option<User>>;

    /// A user account by unique email
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Insert a freshly registered user
    async fn insert_user(&self, new_user: NewUser) -> StoreResult<User>;

    /// All bookings belonging to a user, with room and payment status
    async fn bookings_for_user(&self, user_id: i64) -> StoreResult<Vec<BookingView>>;

    /// The user's audit trail, newest entries first
    async fn activity_for_user(&self, user_id: i64) -> StoreResult<Vec<ActivityEntry>>;
}

/// One logical operation against the store
///
/// All writes commit together or not at all. Reads take row locks for the
/// lifetime of the unit of work.
#[allow(async_fn_in_trait)]
pub trait UnitOfWork: Send {
    /// Load a user row, locking it for the rest of the unit of work
    async fn user_for_update(&mut self, user_id: i64) -> StoreResult<Option<User>>;

    /// Overwrite a user's balance
    async fn set_balance(&mut self, user_id: i64, balance: f64) -> StoreResult<()>;

    /// Load a room joined with its category, locking the room row
    async fn room_for_update(&mut self, room_id: i64) -> StoreResult<Option<RoomRecord>>;

    /// Overwrite a room's remaining stock
    async fn set_room_stock(&mut self, room_id: i64, stock: i32) -> StoreResult<()>;

    /// Load a booking row, locking it for the rest of the unit of work
    async fn booking_for_update(&mut self, booking_id: i64) -> StoreResult<Option<Booking>>;

    /// Insert a new unpaid booking
    async fn insert_booking(&mut self, new_booking: NewBooking) -> StoreResult<Booking>;

    /// Persist changed booking fields (room, dates, price, paid flag)
    async fn update_booking(&mut self, booking: &Booking) -> StoreResult<()>;

    /// Delete a booking row
    async fn delete_booking(&mut self, booking_id: i64) -> StoreResult<()>;

    /// The payment belonging to a booking, if any, locked
    async fn payment_for_booking(&mut self, booking_id: i64) -> StoreResult<Option<Payment>>;

    /// Create the payment for a booking, or mark the existing one paid
    async fn upsert_payment(
        &mut self,
        booking_id: i64,
        amount: f64,
        paid_at: DateTime<Utc>,
    ) -> StoreResult<Payment>;

    /// Delete the payment belonging to a booking
    async fn delete_payment(&mut self, booking_id: i64) -> StoreResult<()>;

    /// Record a balance top-up
    async fn insert_top_up(&mut self, user_id: i64, amount: f64) -> StoreResult<TopUp>;

    /// Append one audit trail entry
    async fn append_activity(&mut self, entry: NewActivity) -> StoreResult<()>;

    /// Make every write of this unit of work visible atomically
    async fn commit(self) -> StoreResult<()>;
}
