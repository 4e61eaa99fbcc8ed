//! Booking service models

pub mod activity;
pub mod booking;
pub mod payment;
pub mod room;
pub mod user;

// Re-export for convenience
pub use activity::{ActivityEntry, ActivityKind, NewActivity};
pub use booking::{
    Booking, BookingCreated, BookingUpdated, BookingView, CancellationNotice,
    CreateBookingRequest, NewBooking, PaymentReceipt, UpdateBookingRequest,
};
pub use payment::{Payment, TopUp};
pub use room::{Category, Room, RoomRecord, RoomSummary, RoomView};
pub use user::{
    LoginRequest, LoginResponse, NewUser, RegisterRequest, TopUpReceipt, TopUpRequest, User,
    UserProfile,
};
