//! Application state shared across handlers

use crate::jwt::JwtService;
use crate::notify::{InvoiceClient, Mailer};
use crate::service::BookingService;
use crate::store::postgres::PgStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: BookingService<PgStore, InvoiceClient>,
    pub jwt: JwtService,
    pub mailer: Option<Mailer>,
}
