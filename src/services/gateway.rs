//! Payment gateway integration
//!
//! Orders are created remotely; callback signatures are verified locally with
//! the shared key secret, following Razorpay's scheme:
//! `hex(HMAC-SHA256(key_secret, "<order_id>|<payment_id>"))`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use ring::hmac;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PaymentsConfig;
use crate::utils::errors::{ClubHubError, Result};
use crate::utils::logging::log_upstream_error;

const SERVICE: &str = "payment gateway";

/// Order as acknowledged by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an order for `amount` minor units of `currency`
    async fn create_order(&self, amount: i64, currency: &str, receipt: &str) -> Result<GatewayOrder>;
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

/// Razorpay Orders API client
#[derive(Debug, Clone)]
pub struct RazorpayGateway {
    client: Client,
    api_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayGateway {
    pub fn new(config: &PaymentsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("ClubHub/0.1")
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, amount: i64, currency: &str, receipt: &str) -> Result<GatewayOrder> {
        let url = format!("{}/orders", self.api_url);
        debug!(url = %url, amount = amount, currency = currency, receipt = receipt, "Creating gateway order");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&CreateOrderBody {
                amount,
                currency,
                receipt,
            })
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                };
                log_upstream_error(SERVICE, &reason, Some(receipt));
                ClubHubError::upstream(SERVICE, reason)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            log_upstream_error(SERVICE, &format!("HTTP {}: {}", status, error_text), Some(receipt));
            return Err(ClubHubError::upstream(SERVICE, format!("HTTP {}", status)));
        }

        let order: GatewayOrder = response.json().await.map_err(|e| {
            log_upstream_error(SERVICE, &e.to_string(), Some("order response"));
            ClubHubError::upstream(SERVICE, "unreadable order response")
        })?;

        info!(order_id = %order.id, amount = order.amount, "Gateway order created");
        Ok(order)
    }
}

/// Gateway stand-in for development and tests; never touches the network
#[derive(Debug, Default)]
pub struct MockPaymentGateway {
    failing: AtomicBool,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an Arc-wrapped instance for sharing
    pub fn shared() -> Arc<dyn PaymentGateway> {
        Arc::new(Self::new())
    }

    /// Make every subsequent order request fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_order(&self, amount: i64, currency: &str, receipt: &str) -> Result<GatewayOrder> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClubHubError::upstream(SERVICE, "injected gateway failure"));
        }

        let order = GatewayOrder {
            id: format!("order_mock_{}", uuid::Uuid::new_v4().simple()),
            amount,
            currency: currency.to_string(),
        };
        info!(order_id = %order.id, receipt = receipt, "Mock gateway order created");
        Ok(order)
    }
}

/// Computes and checks callback signatures with the shared key secret
#[derive(Clone)]
pub struct SignatureVerifier {
    key: hmac::Key,
}

impl SignatureVerifier {
    pub fn new(key_secret: &str) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, key_secret.as_bytes()),
        }
    }

    fn message(order_id: &str, payment_id: &str) -> String {
        format!("{}|{}", order_id, payment_id)
    }

    /// Signature the gateway is expected to send for this pair
    pub fn sign(&self, order_id: &str, payment_id: &str) -> String {
        let tag = hmac::sign(&self.key, Self::message(order_id, payment_id).as_bytes());
        hex::encode(tag.as_ref())
    }

    /// Constant-time check of a hex signature
    pub fn verify(&self, order_id: &str, payment_id: &str, signature: &str) -> Result<()> {
        let supplied = hex::decode(signature.trim()).map_err(|_| ClubHubError::PaymentVerification)?;

        hmac::verify(&self.key, Self::message(order_id, payment_id).as_bytes(), &supplied)
            .map_err(|_| ClubHubError::PaymentVerification)
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier").finish_non_exhaustive()
    }
}
