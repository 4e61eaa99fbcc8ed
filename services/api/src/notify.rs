//! Outbound notification collaborators
//!
//! Two external HTTP collaborators live here: the invoice provider called
//! when a booking is paid, and the mailer that greets fresh registrations.
//! The invoice call participates in the payment's consistency unit, so its
//! failure fails the payment. The welcome email is fire-and-forget.

use anyhow::Result;
use serde_json::json;
use tracing::debug;

use crate::models::{Booking, User};

/// Collaborator notified when a booking has been paid
#[allow(async_fn_in_trait)]
pub trait InvoiceNotifier: Clone + Send + Sync + 'static {
    /// Create an invoice for a freshly paid booking
    async fn invoice_created(
        &self,
        customer: &User,
        booking: &Booking,
        room_name: &str,
    ) -> Result<()>;
}

/// Invoice provider configuration
#[derive(Debug, Clone)]
pub struct InvoiceConfig {
    /// Base URL of the invoice provider
    pub api_url: String,
    /// API key; when unset, invoice notifications are disabled
    pub api_key: Option<String>,
    /// Invoice currency
    pub currency: String,
    /// How long an issued invoice stays payable, in seconds
    pub invoice_duration_secs: u64,
}

impl InvoiceConfig {
    /// Create a new InvoiceConfig from environment variables
    ///
    /// # Environment Variables
    /// - `INVOICE_API_URL`: provider base URL (default: `https://api.xendit.co`)
    /// - `INVOICE_API_KEY`: provider secret; unset disables notifications
    /// - `INVOICE_CURRENCY`: currency code (default: `IDR`)
    /// - `INVOICE_DURATION_SECS`: invoice validity (default: 86400)
    pub fn from_env() -> Self {
        let api_url = std::env::var("INVOICE_API_URL")
            .unwrap_or_else(|_| "https://api.xendit.co".to_string());
        let api_key = std::env::var("INVOICE_API_KEY").ok();
        let currency = std::env::var("INVOICE_CURRENCY").unwrap_or_else(|_| "IDR".to_string());
        let invoice_duration_secs = std::env::var("INVOICE_DURATION_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86400);

        InvoiceConfig {
            api_url,
            api_key,
            currency,
            invoice_duration_secs,
        }
    }
}

/// HTTP client for the invoice provider
#[derive(Clone)]
pub struct InvoiceClient {
    http: reqwest::Client,
    config: InvoiceConfig,
}

impl InvoiceClient {
    /// Create a new invoice client
    pub fn new(config: InvoiceConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

impl InvoiceNotifier for InvoiceClient {
    async fn invoice_created(
        &self,
        customer: &User,
        booking: &Booking,
        room_name: &str,
    ) -> Result<()> {
        let Some(api_key) = &self.config.api_key else {
            debug!("Invoice notifications disabled; skipping booking {}", booking.id);
            return Ok(());
        };

        let body = json!({
            "external_id": format!("booking-{}", booking.id),
            "amount": booking.total_price,
            "description": format!("Invoice for {}", room_name),
            "invoice_duration": self.config.invoice_duration_secs,
            "customer": {
                "name": customer.name,
                "email": customer.email,
            },
            "currency": self.config.currency,
            "items": [{
                "name": room_name,
                "quantity": 1,
                "price": booking.total_price,
            }],
            "should_send_email": true,
        });

        let response = self
            .http
            .post(format!("{}/v2/invoices", self.config.api_url))
            .basic_auth(api_key, None::<&str>)
            .json(&body)
            .send()
            .await?;
        response.error_for_status()?;

        Ok(())
    }
}

/// HTTP client for the welcome-email provider
#[derive(Clone)]
pub struct Mailer {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    sender: String,
}

impl Mailer {
    /// Create a Mailer from environment variables, or None when the
    /// provider is not configured
    ///
    /// # Environment Variables
    /// - `MAIL_API_URL`, `MAIL_API_KEY`: provider endpoint and secret
    /// - `MAIL_SENDER`: sender address (default: `welcome@hotelgardenia.example`)
    pub fn from_env() -> Option<Self> {
        let api_url = std::env::var("MAIL_API_URL").ok()?;
        let api_key = std::env::var("MAIL_API_KEY").ok()?;
        let sender = std::env::var("MAIL_SENDER")
            .unwrap_or_else(|_| "welcome@hotelgardenia.example".to_string());

        Some(Mailer {
            http: reqwest::Client::new(),
            api_url,
            api_key,
            sender,
        })
    }

    /// Send the post-registration welcome email
    pub async fn send_welcome(&self, email: &str, name: &str) -> Result<()> {
        let body = json!({
            "from": { "email": self.sender, "name": "Hotel Gardenia" },
            "to": [{ "email": email, "name": name }],
            "subject": "Thank You For Registering",
            "text": format!(
                "Hello {},\n\nThank you for registering with Hotel Gardenia!",
                name
            ),
        });

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        response.error_for_status()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fixtures() -> (User, Booking) {
        let user = User {
            id: 1,
            name: "Ayu Lestari".to_string(),
            email: "ayu@example.com".to_string(),
            password_hash: "hash".to_string(),
            balance: 500.0,
            created_at: Utc::now(),
        };
        let booking = Booking {
            id: 7,
            user_id: 1,
            room_id: 3,
            start_date: Utc::now(),
            end_date: Utc::now(),
            total_price: 300.0,
            is_paid: false,
            created_at: Utc::now(),
        };
        (user, booking)
    }

    #[tokio::test]
    async fn unconfigured_invoice_client_is_a_no_op() {
        let client = InvoiceClient::new(InvoiceConfig {
            api_url: "https://api.xendit.co".to_string(),
            api_key: None,
            currency: "IDR".to_string(),
            invoice_duration_secs: 86400,
        });

        let (user, booking) = fixtures();
        client
            .invoice_created(&user, &booking, "Palm 201")
            .await
            .expect("disabled client must not fail payments");
    }
}
