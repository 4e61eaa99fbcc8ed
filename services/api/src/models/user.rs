//! User model and related payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User account entity
///
/// `balance` is the prepaid credit a user spends on bookings. It is only
/// ever changed by top-ups, payments and refunds, and never goes negative.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub balance: f64,
    pub created_at: DateTime<Utc>,
}

/// New user insert payload (password already hashed)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Request body for user registration
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for user login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response for user login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Public view of a user account, including the current balance
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub balance: f64,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        UserProfile {
            id: user.id,
            name: user.name,
            email: user.email,
            balance: user.balance,
        }
    }
}

/// Request body for a balance top-up
#[derive(Debug, Clone, Deserialize)]
pub struct TopUpRequest {
    pub amount: f64,
}

/// Response for a balance top-up
#[derive(Debug, Serialize)]
pub struct TopUpReceipt {
    pub message: String,
    pub balance: f64,
}
