//! Payment gateway client and signature verification

pub mod gateway;
pub mod signature;

pub use gateway::{GatewayOrder, GatewayRefund, PaymentGateway, RazorpayGateway};
pub use signature::{verify_payment, verify_webhook};

/// Longest gateway error body kept for logs
const MAX_ERROR_BODY: usize = 500;

/// Payment gateway failures
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway returned {status}: {body}")]
    Api { status: u16, body: String },
}

impl GatewayError {
    /// Build an API error, truncating the body so provider details don't
    /// flood logs.
    pub fn api(status: u16, body: String) -> Self {
        let body = if body.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            format!("{}...", &body[..cut])
        } else {
            body
        };
        Self::Api { status, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_truncates_body() {
        let err = GatewayError::api(400, "x".repeat(2_000));
        let GatewayError::Api { body, .. } = err else {
            panic!("expected Api");
        };
        assert_eq!(body.len(), MAX_ERROR_BODY + 3);
    }
}
