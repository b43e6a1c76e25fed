//! Base64 encoding of the `X-PAYMENT` header.

use base64::prelude::*;

use crate::error::HeaderError;
use crate::proto::PaymentPayload;

/// Encodes `payload` as the base64 JSON value of the `X-PAYMENT` header.
///
/// # Errors
///
/// Returns [`HeaderError::Json`] if JSON serialization fails.
pub fn encode_payment_header(payload: &PaymentPayload) -> Result<String, HeaderError> {
    let json = serde_json::to_vec(payload)?;
    Ok(BASE64_STANDARD.encode(&json))
}

/// Decodes an `X-PAYMENT` header value.
///
/// # Errors
///
/// Returns [`HeaderError`] on base64 or JSON decode failure.
pub fn decode_payment_header(header_value: &str) -> Result<PaymentPayload, HeaderError> {
    let bytes = BASE64_STANDARD.decode(header_value.trim())?;
    Ok(serde_json::from_slice(&bytes)?)
}
