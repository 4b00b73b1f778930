//! HMAC-SHA256 signatures used by gateway callbacks and webhooks.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{Secret, SignatureCheck};

type HmacSha256 = Hmac<Sha256>;

/// The message a checkout callback signature covers.
pub fn callback_message(gateway_order_ref: &str, payment_ref: &str) -> String {
    format!("{gateway_order_ref}|{payment_ref}")
}

/// Lowercase-hex HMAC-SHA256 of `message`.
pub fn sign(secret: &Secret, message: &[u8]) -> String {
    // HMAC accepts keys of any length
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.reveal().as_bytes()) else {
        return String::new();
    };
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a hex signature in constant time.
///
/// Signatures that are not valid hex, or an empty secret, never verify.
pub fn verify(secret: &Secret, message: &[u8], signature: &str) -> SignatureCheck {
    if secret.is_empty() {
        return SignatureCheck::Invalid;
    }
    let Ok(expected) = hex::decode(signature.trim()) else {
        return SignatureCheck::Invalid;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.reveal().as_bytes()) else {
        return SignatureCheck::Invalid;
    };
    mac.update(message);

    match mac.verify_slice(&expected) {
        Ok(()) => SignatureCheck::Valid,
        Err(_) => SignatureCheck::Invalid,
    }
}

/// Signs a checkout callback.
pub fn sign_callback(secret: &Secret, gateway_order_ref: &str, payment_ref: &str) -> String {
    sign(
        secret,
        callback_message(gateway_order_ref, payment_ref).as_bytes(),
    )
}

/// Verifies a checkout callback.
pub fn verify_callback(
    secret: &Secret,
    gateway_order_ref: &str,
    payment_ref: &str,
    signature: &str,
) -> SignatureCheck {
    verify(
        secret,
        callback_message(gateway_order_ref, payment_ref).as_bytes(),
        signature,
    )
}

/// Verifies a webhook body. A missing webhook secret rejects everything.
pub fn verify_webhook(secret: Option<&Secret>, body: &[u8], signature: &str) -> SignatureCheck {
    match secret {
        Some(secret) => verify(secret, body, signature),
        None => SignatureCheck::Invalid,
    }
}
