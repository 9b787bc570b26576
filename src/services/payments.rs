//! Payment intent creation and callback verification.
//!
//! The gateway integration is Razorpay-shaped: intents are created with the
//! amount in minor currency units, and the browser callback carries an
//! HMAC-SHA256 signature over `<gateway_order_id>|<payment_id>` keyed with
//! the gateway secret. The amount always comes from the stored order, never
//! from the client.

use hmac::{Hmac, Mac};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    models::{parse_payment_status, PaymentMethod, PaymentStatus},
    services::orders::{OrderResponse, OrderService},
};

type HmacSha256 = Hmac<Sha256>;

/// Intent as issued by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayIntent {
    pub id: String,
}

/// What the browser needs to open the gateway checkout.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentIntentResponse {
    pub order_id: Uuid,
    pub intent_id: String,
    /// Amount in minor currency units (paise for INR).
    pub amount_minor: i64,
    pub currency: String,
    pub key_id: String,
}

/// Callback payload posted by the browser after gateway checkout completes.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    pub order_id: Uuid,
    pub gateway_order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// Outcome of a verified callback.
#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyPaymentResponse {
    pub verified: bool,
    pub order_id: Uuid,
    pub payment_status: String,
}

/// Upstream intent creation. Trait seam so tests can swap the HTTP client
/// out for a canned gateway.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayIntent, ServiceError>;
}

/// Razorpay-compatible HTTP gateway client using basic auth with the key
/// pair.
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl HttpPaymentGateway {
    pub fn new(
        base_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayIntent, ServiceError> {
        let url = format!("{}/v1/orders", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&serde_json::json!({
                "amount": amount_minor,
                "currency": currency,
                "receipt": receipt,
            }))
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("gateway request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, %body, "Payment gateway rejected intent creation");
            return Err(ServiceError::ExternalServiceError(format!(
                "gateway returned {status}"
            )));
        }

        response
            .json::<GatewayIntent>()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("gateway response: {e}")))
    }
}

#[derive(Clone)]
pub struct PaymentService {
    gateway: Arc<dyn PaymentGateway>,
    orders: OrderService,
    key_id: String,
    key_secret: String,
    currency: String,
}

impl PaymentService {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        orders: OrderService,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            orders,
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            currency: currency.into(),
        }
    }

    /// Creates a gateway intent for an online order. The charged amount is
    /// the stored quote converted to minor units.
    #[instrument(skip(self))]
    pub async fn create_intent(
        &self,
        order_id: Uuid,
    ) -> Result<PaymentIntentResponse, ServiceError> {
        let order = self.orders.find_model(order_id).await?;

        if order.payment_method != PaymentMethod::Online.to_string() {
            return Err(ServiceError::BadRequest(
                "Order is payable on delivery; no online payment is required".to_string(),
            ));
        }
        if parse_payment_status(&order.payment_status)? == PaymentStatus::Paid {
            return Err(ServiceError::Conflict(
                "Order is already paid".to_string(),
            ));
        }

        let amount_minor = to_minor_units(order.amount)?;
        let intent = self
            .gateway
            .create_intent(amount_minor, &self.currency, &order.tracking_code)
            .await?;

        info!(order_id = %order_id, intent_id = %intent.id, amount_minor, "Payment intent created");

        Ok(PaymentIntentResponse {
            order_id,
            intent_id: intent.id,
            amount_minor,
            currency: self.currency.clone(),
            key_id: self.key_id.clone(),
        })
    }

    /// Verifies a checkout callback and marks the order paid on success.
    /// A bad signature leaves the order untouched.
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn verify_payment(
        &self,
        request: VerifyPaymentRequest,
    ) -> Result<(VerifyPaymentResponse, OrderResponse), ServiceError> {
        if !self.verify_signature(
            &request.gateway_order_id,
            &request.payment_id,
            &request.signature,
        ) {
            warn!(order_id = %request.order_id, "Payment signature mismatch");
            return Err(ServiceError::SignatureMismatch);
        }

        let order = self
            .orders
            .mark_paid(request.order_id, &request.payment_id)
            .await?;

        Ok((
            VerifyPaymentResponse {
                verified: true,
                order_id: request.order_id,
                payment_status: order.payment_status.clone(),
            },
            order,
        ))
    }

    /// HMAC-SHA256 over `<gateway_order_id>|<payment_id>`, hex-encoded,
    /// compared in constant time.
    pub fn verify_signature(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> bool {
        let Ok(mut mac) = HmacSha256::new_from_slice(self.key_secret.as_bytes()) else {
            return false;
        };
        mac.update(format!("{gateway_order_id}|{payment_id}").as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());
        constant_time_eq(&expected, signature)
    }
}

fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    (amount * Decimal::from(100))
        .round()
        .to_i64()
        .ok_or_else(|| ServiceError::InternalError("order amount out of range".to_string()))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn signature_for(secret: &str, gateway_order_id: &str, payment_id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{gateway_order_id}|{payment_id}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    struct NoGateway;

    #[async_trait::async_trait]
    impl PaymentGateway for NoGateway {
        async fn create_intent(
            &self,
            _amount_minor: i64,
            _currency: &str,
            _receipt: &str,
        ) -> Result<GatewayIntent, ServiceError> {
            Err(ServiceError::ExternalServiceError("unused".into()))
        }
    }

    fn service(secret: &str) -> PaymentService {
        let db = Arc::new(sea_orm::DatabaseConnection::default());
        PaymentService::new(
            Arc::new(NoGateway),
            OrderService::new(db, None),
            "rzp_test_key",
            secret,
            "INR",
        )
    }

    #[test]
    fn valid_signature_verifies() {
        let svc = service("shhh-secret");
        let sig = signature_for("shhh-secret", "order_abc123", "pay_xyz789");
        assert!(svc.verify_signature("order_abc123", "pay_xyz789", &sig));
    }

    #[test]
    fn single_character_change_fails_verification() {
        let svc = service("shhh-secret");
        let mut sig = signature_for("shhh-secret", "order_abc123", "pay_xyz789");
        let flipped = if sig.ends_with('0') { '1' } else { '0' };
        sig.pop();
        sig.push(flipped);
        assert!(!svc.verify_signature("order_abc123", "pay_xyz789", &sig));
    }

    #[test]
    fn wrong_secret_or_payload_fails_verification() {
        let svc = service("shhh-secret");
        let sig = signature_for("other-secret", "order_abc123", "pay_xyz789");
        assert!(!svc.verify_signature("order_abc123", "pay_xyz789", &sig));

        let sig = signature_for("shhh-secret", "order_abc123", "pay_xyz789");
        assert!(!svc.verify_signature("order_abc124", "pay_xyz789", &sig));
        assert!(!svc.verify_signature("order_abc123", "pay_xyz780", &sig));
    }

    #[test]
    fn length_mismatch_is_rejected_outright() {
        let svc = service("shhh-secret");
        assert!(!svc.verify_signature("order_abc123", "pay_xyz789", "deadbeef"));
        assert!(!svc.verify_signature("order_abc123", "pay_xyz789", ""));
    }

    #[test]
    fn amounts_convert_to_minor_units() {
        assert_eq!(to_minor_units(dec!(50)).unwrap(), 5000);
        assert_eq!(to_minor_units(dec!(20.50)).unwrap(), 2050);
        assert_eq!(to_minor_units(dec!(1)).unwrap(), 100);
    }
}
