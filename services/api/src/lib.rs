//! Hotel Gardenia booking service
//!
//! Rooms are browsed publicly; authenticated users create bookings, pay for
//! them from a prepaid balance, change or cancel them, and get refunded.
//! All stock/balance/payment mutations go through [`service::BookingService`],
//! which scopes each operation to a single unit of work.

pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;
pub mod validation;
