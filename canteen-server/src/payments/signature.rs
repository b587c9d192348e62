//! Gateway signature checks (HMAC-SHA256, hex encoded)

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Checkout callback signature: HMAC of `"{order_id}|{payment_id}"`
/// keyed with the API secret.
pub fn verify_payment(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let payload = format!("{order_id}|{payment_id}");
    verify(secret.as_bytes(), payload.as_bytes(), signature)
}

/// Webhook signature: HMAC of the raw request body keyed with the
/// webhook secret.
pub fn verify_webhook(secret: &str, body: &[u8], signature: &str) -> bool {
    verify(secret.as_bytes(), body, signature)
}

/// Hex-encoded signature for `payload`, for forging callbacks against a
/// test secret.
#[cfg(test)]
pub fn sign(secret: &[u8], payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("hmac accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

fn verify(secret: &[u8], payload: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);
    // Constant-time comparison
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "rzp_test_secret";

    #[test]
    fn payment_signature_accepts_valid() {
        let signature = sign(SECRET.as_bytes(), b"order_ABC|pay_XYZ");
        assert!(verify_payment(SECRET, "order_ABC", "pay_XYZ", &signature));
    }

    #[test]
    fn payment_signature_binds_both_ids() {
        let signature = sign(SECRET.as_bytes(), b"order_ABC|pay_XYZ");
        assert!(!verify_payment(SECRET, "order_ABC", "pay_OTHER", &signature));
        assert!(!verify_payment(SECRET, "order_OTHER", "pay_XYZ", &signature));
        assert!(!verify_payment("other-secret", "order_ABC", "pay_XYZ", &signature));
    }

    #[test]
    fn non_hex_signature_rejected() {
        assert!(!verify_payment(SECRET, "order_ABC", "pay_XYZ", "zz-not-hex"));
        assert!(!verify_payment(SECRET, "order_ABC", "pay_XYZ", ""));
    }

    #[test]
    fn webhook_signature_covers_body() {
        let body = br#"{"event":"payment.captured"}"#;
        let signature = sign(b"whsec", body);
        assert!(verify_webhook("whsec", body, &signature));
        assert!(!verify_webhook("whsec", br#"{"event":"payment.failed"}"#, &signature));
    }

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2
        assert_eq!(
            sign(b"Jefe", b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }
}
