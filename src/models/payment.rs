//! Payment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Created,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub event_id: Uuid,
    /// Amount in minor currency units
    pub amount: i64,
    pub currency: String,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    #[serde(skip_serializing)]
    pub gateway_signature: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub student_id: Uuid,
    pub event_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub gateway_order_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub event_id: Uuid,
}

/// Everything the client needs to open the gateway checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub payment_id: Uuid,
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub key_id: String,
}

/// Pre-payment view of a paid event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSummary {
    pub event_id: Uuid,
    pub title: String,
    pub venue: Option<String>,
    pub price: i64,
    pub currency: String,
}

/// Gateway callback fields forwarded by the client after checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    pub event_id: Uuid,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub gateway_signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub payment_id: Uuid,
    pub registration_id: Uuid,
    pub already_verified: bool,
}
