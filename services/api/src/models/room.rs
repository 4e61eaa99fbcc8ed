//! Room and category models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Room category reference data (Standard, Deluxe, ...)
///
/// `price` is the nightly rate. Categories are static reference data seeded
/// by migration; changing a price never retro-applies to existing bookings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: f64,
}

/// A bookable room
///
/// `stock` counts the interchangeable units still available for this room;
/// it is decremented by bookings and incremented by cancellations.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Room {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
    pub stock: i32,
}

/// One row of the public room listing
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub name: String,
    pub category: String,
    pub price: f64,
    pub stock: i32,
}

/// Room details with category, as returned for a single room lookup
#[derive(Debug, Clone, Serialize)]
pub struct RoomView {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub stock: i32,
}

/// Room joined with its category, as read inside a unit of work
#[derive(Debug, Clone)]
pub struct RoomRecord {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
    pub category_name: String,
    pub price: f64,
    pub stock: i32,
}
