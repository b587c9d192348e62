//! Razorpay REST client
//!
//! Only the two calls the ordering flow needs: create a gateway order for
//! checkout, and refund a captured payment.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::GatewayError;

/// Gateway-side order returned by `create_order`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
}

/// Refund returned by `refund`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayRefund {
    pub id: String,
    pub payment_id: String,
    pub amount: i64,
}

/// The calls handlers make against the payment provider
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key id the checkout widget needs
    fn key_id(&self) -> &str;

    async fn create_order(
        &self,
        amount_paise: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError>;

    async fn refund(&self, payment_id: &str, amount_paise: i64)
        -> Result<GatewayRefund, GatewayError>;
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Debug, Serialize)]
struct RefundRequest {
    amount: i64,
}

/// Razorpay client using basic auth with the key id and secret
pub struct RazorpayGateway {
    client: Client,
    key_id: String,
    key_secret: String,
    base_url: String,
}

impl RazorpayGateway {
    pub fn new(
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GatewayError::api(status, error_text));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    async fn create_order(
        &self,
        amount_paise: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        let order: GatewayOrder = self
            .post(
                "/orders",
                &CreateOrderRequest {
                    amount: amount_paise,
                    currency,
                    receipt,
                },
            )
            .await?;
        tracing::info!(gateway_order_id = %order.id, amount_paise, "gateway order created");
        Ok(order)
    }

    async fn refund(
        &self,
        payment_id: &str,
        amount_paise: i64,
    ) -> Result<GatewayRefund, GatewayError> {
        let refund: GatewayRefund = self
            .post(
                &format!("/payments/{}/refund", payment_id),
                &RefundRequest {
                    amount: amount_paise,
                },
            )
            .await?;
        tracing::info!(refund_id = %refund.id, payment_id, amount_paise, "refund issued");
        Ok(refund)
    }
}

impl std::fmt::Debug for RazorpayGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayGateway")
            .field("key_id", &self.key_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
