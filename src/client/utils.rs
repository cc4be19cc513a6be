//! Utility functions for the hypermedia client.
//!
//! Status classification and response decoding shared by the request pipeline and
//! the root cache.

use crate::error::{HalError, HttpFailure, Result, VERSION_MISMATCH_STATUS};
use crate::types::HttpResponse;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Check if status code is in the `2xx` range
#[inline]
pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Check if status code signals a refused API version
#[inline]
pub fn is_version_mismatch_status(status: u16) -> bool {
    status == VERSION_MISMATCH_STATUS
}

/// Check if status code indicates access denied
pub fn is_access_denied_status(status: u16) -> bool {
    matches!(status, 401 | 403)
}

/// Classify a response and decode a success body.
///
/// Non-`2xx` responses become [`HalError::Http`] regardless of their body. An empty
/// `2xx` body decodes as JSON `null`, so `()` and `Option<T>` targets accept it.
pub fn decode_response<R: DeserializeOwned>(response: &HttpResponse) -> Result<R> {
    if !response.is_success() {
        return Err(HalError::Http(HttpFailure::from_bytes(
            response.status,
            &response.body,
        )));
    }
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_value(Value::Null).map_err(|e| {
            HalError::Decode(format!("empty {} response: {}", response.status, e))
        });
    }
    serde_json::from_slice(&response.body).map_err(HalError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_is_success_status() {
        assert!(is_success_status(200));
        assert!(is_success_status(204));
        assert!(!is_success_status(199));
        assert!(!is_success_status(300));
        assert!(!is_success_status(417));
    }

    #[test]
    fn test_status_helpers() {
        assert!(is_version_mismatch_status(417));
        assert!(is_access_denied_status(403));
        assert!(!is_access_denied_status(404));
    }

    #[test]
    fn test_decode_success() {
        let response = HttpResponse::new(200, r#"{"id": 1}"#);
        let value: Value = assert_ok!(decode_response(&response));
        assert_eq!(value, json!({"id": 1}));
    }

    #[test]
    fn test_decode_empty_body() {
        let response = HttpResponse::new(204, "");
        let unit: () = decode_response(&response).unwrap();
        assert_eq!(unit, ());
        let value: Option<Value> = decode_response(&response).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_non_success_never_decodes() {
        let response = HttpResponse::new(409, r#"{"id": 1, "message": "conflict"}"#);
        let err = decode_response::<Value>(&response).unwrap_err();
        match err {
            HalError::Http(failure) => {
                assert_eq!(failure.status, 409);
                assert_eq!(failure.body["message"], "conflict");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_decode_mismatch_is_decode_error() {
        let response = HttpResponse::new(200, "[1, 2]");
        let err = assert_err!(decode_response::<std::collections::HashMap<String, i32>>(&response));
        assert!(matches!(err, HalError::Decode(_)));
    }
}
