//! Common types shared across WeCom API models.
//!
//! This module defines the response envelope, the token response and the
//! field-length checks used by the request builders.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{codes, WeComError};

/// Longest value WeCom accepts for names, ids and similar text fields.
pub const MAX_FIELD_CHARS: usize = 64;

/// Outcome of a WeCom call whose envelope was parsed.
///
/// `success` is derived from `errcode` alone; `payload` is the response
/// exactly as received.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    /// True when the envelope carried `errcode == 0`.
    pub success: bool,

    /// The full response body.
    pub payload: Value,
}

impl ApiReply {
    /// The vendor error code, if present.
    pub fn errcode(&self) -> Option<i64> {
        self.payload.get("errcode").and_then(Value::as_i64)
    }

    /// The vendor error message, if present.
    pub fn errmsg(&self) -> Option<&str> {
        self.payload.get("errmsg").and_then(Value::as_str)
    }

    /// Splits the reply into the `(success, payload)` pair.
    pub fn into_parts(self) -> (bool, Value) {
        (self.success, self.payload)
    }

    /// Decodes the payload into a typed view.
    ///
    /// # Errors
    ///
    /// Returns `WeComError::Serialization` if the payload does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, WeComError> {
        T::deserialize(&self.payload).map_err(WeComError::Serialization)
    }
}

/// Interprets a WeCom response envelope.
///
/// `errcode == 0` is success regardless of the other fields; a missing or
/// non-zero `errcode` is failure. The payload is returned untouched.
pub fn interpret_response(payload: Value) -> ApiReply {
    let success = payload.get("errcode").and_then(Value::as_i64) == Some(codes::SUCCESS);
    ApiReply { success, payload }
}

/// Response of `/gettoken`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Vendor error code.
    #[serde(default)]
    pub errcode: Option<i64>,

    /// Vendor error message.
    #[serde(default)]
    pub errmsg: Option<String>,

    /// The access token (present on success).
    #[serde(default)]
    pub access_token: Option<String>,

    /// Token lifetime in seconds (7200 in practice).
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenResponse {
    /// Extracts the token, or the reason there is none.
    pub fn into_token(self) -> Result<String, WeComError> {
        match self.access_token {
            Some(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(WeComError::authentication(
                self.errcode.unwrap_or(-1),
                self.errmsg
                    .unwrap_or_else(|| "no access_token in response".to_string()),
            )),
        }
    }
}

/// Checks that `value` holds between `min` and `max` characters.
pub(crate) fn check_length(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), WeComError> {
    let len = value.chars().count();
    if len < min {
        return Err(WeComError::validation(if min == 1 {
            format!("{} is required", field)
        } else {
            format!("{} must be at least {} characters", field, min)
        }));
    }
    if len > max {
        return Err(WeComError::validation(format!(
            "{} exceeds maximum length of {} characters (got {})",
            field, max, len
        )));
    }
    Ok(())
}

/// Same as [`check_length`] but skips absent values.
pub(crate) fn check_optional_length(
    field: &str,
    value: Option<&str>,
    min: usize,
    max: usize,
) -> Result<(), WeComError> {
    match value {
        Some(value) => check_length(field, value, min, max),
        None => Ok(()),
    }
}

/// Checks a user id (1-64 characters).
pub(crate) fn check_userid(userid: &str) -> Result<(), WeComError> {
    check_length("userid", userid, 1, MAX_FIELD_CHARS)
}

/// Serializes a flag the way WeCom expects it (`0` / `1`).
pub(crate) fn flag(value: bool) -> u8 {
    u8::from(value)
}

/// Serde helper for optional boolean fields WeCom sends as integers.
pub(crate) fn serialize_optional_flag<S>(
    value: &Option<bool>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(v) => serializer.serialize_some(&flag(*v)),
        None => serializer.serialize_none(),
    }
}
