//! JSON envelopes exchanged with the backend.

use serde::Deserialize;
use serde_json::Value;
use shopfront_core::{Cart, Product};

use super::BackendError;

/// Common reply envelope: `{ success, message?, ...payload }`.
#[derive(Debug, Deserialize)]
pub(super) struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Envelope<T> {
    /// Turn `success: false` into an error.
    pub fn into_success(self) -> Result<T, BackendError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(BackendError::Rejected(
                self.message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            ))
        }
    }
}

/// Payload-free acknowledgement.
#[derive(Debug, Deserialize)]
pub(super) struct Ack {}

#[derive(Debug, Deserialize)]
pub(super) struct CartPayload {
    #[serde(rename = "cartData", default)]
    pub cart_data: Option<Cart>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TokenPayload {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProductPayload {
    #[serde(default)]
    pub product: Option<Product>,
}

/// Interpret a product list reply.
///
/// The list endpoint answers `{ success, products }`; a bare array is
/// accepted as well. Anything else is a format error.
pub(super) fn parse_product_list(body: Value) -> Result<Vec<Product>, BackendError> {
    match body {
        Value::Array(_) => Ok(serde_json::from_value(body)?),
        Value::Object(mut map) => {
            if map.get("success") == Some(&Value::Bool(false)) {
                let message = map
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("request was not successful")
                    .to_string();
                return Err(BackendError::Rejected(message));
            }
            match map.remove("products") {
                Some(products @ Value::Array(_)) => Ok(serde_json::from_value(products)?),
                Some(other) => Err(BackendError::UnexpectedFormat(format!(
                    "`products` is {}",
                    describe(&other)
                ))),
                None => Err(BackendError::UnexpectedFormat(
                    "object without `products`".to_string(),
                )),
            }
        }
        other => Err(BackendError::UnexpectedFormat(describe(&other).to_string())),
    }
}

const fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
