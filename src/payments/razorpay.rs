use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::RazorpayConfig;
use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

const RAZORPAY_API_URL: &str = "https://api.razorpay.com/v1";

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    /// Amount in paise
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

/// Gateway order as returned by the orders API.
#[derive(Debug, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct RazorpayClient {
    client: Client,
    key_id: String,
    key_secret: String,
    webhook_secret: String,
}

impl RazorpayClient {
    pub fn new(config: &RazorpayConfig) -> Self {
        Self {
            client: Client::new(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            webhook_secret: config.webhook_secret.clone(),
        }
    }

    /// Public key id, handed to the checkout page so the client-side widget
    /// can open the payment for the right account.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Create a gateway order for `amount` paise.
    pub async fn create_order(&self, amount: i64, receipt: &str) -> Result<GatewayOrder> {
        let request = CreateOrderRequest {
            amount,
            currency: "INR",
            receipt,
        };

        let response = self
            .client
            .post(format!("{}/orders", RAZORPAY_API_URL))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Razorpay API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "Razorpay API error: {}",
                error_text
            )));
        }

        let order: GatewayOrder = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Failed to parse Razorpay response: {}", e)))?;

        Ok(order)
    }

    /// Verify the signature a client submits after completing checkout.
    ///
    /// The signed payload is `<order_id>|<payment_id>` keyed with the API
    /// key secret; the signature is lowercase hex and compared byte-for-byte.
    pub fn verify_payment_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<bool> {
        let payload = format!("{}|{}", order_id, payment_id);
        let expected = self.hmac_hex(&self.key_secret, payload.as_bytes())?;
        Ok(constant_time_eq(expected.as_bytes(), signature.as_bytes()))
    }

    /// Verify an inbound webhook signature over the raw request body.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<bool> {
        let expected = self.hmac_hex(&self.webhook_secret, payload)?;
        Ok(constant_time_eq(expected.as_bytes(), signature.as_bytes()))
    }

    fn hmac_hex(&self, secret: &str, data: &[u8]) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| AppError::Internal("Invalid signing secret".into()))?;
        mac.update(data);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Constant-time comparison to prevent timing attacks.
///
/// Length check is not constant-time, but that's fine - signature length
/// is not secret (it's always 64 hex chars for SHA-256).
fn constant_time_eq(expected: &[u8], provided: &[u8]) -> bool {
    if expected.len() != provided.len() {
        return false;
    }
    expected.ct_eq(provided).into()
}

// ============ Webhook payloads ============

/// Generic Razorpay webhook event - payload entities depend on the event type
#[derive(Debug, Deserialize)]
pub struct RazorpayWebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: RazorpayWebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct RazorpayWebhookPayload {
    pub payment: Option<EntityWrapper<RazorpayPayment>>,
    pub order: Option<EntityWrapper<RazorpayOrder>>,
}

/// Razorpay nests every payload object under an `entity` key.
#[derive(Debug, Deserialize)]
pub struct EntityWrapper<T> {
    pub entity: T,
}

// ============ payment.captured / payment.failed ============

#[derive(Debug, Deserialize)]
pub struct RazorpayPayment {
    pub id: String,
    pub order_id: String,
    pub status: Option<String>,
    pub error_code: Option<String>,
    pub error_description: Option<String>,
}

// ============ order.paid ============

#[derive(Debug, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub status: Option<String>,
}
