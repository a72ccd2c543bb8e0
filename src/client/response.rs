//! Response wrapper and structured error extraction.

use std::sync::OnceLock;

use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde_json::{Map, Value};

use super::error::classify;
use crate::types::WireFormat;
use crate::{Error, Result};

fn markup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)<\s*(!doctype|/?[a-z][a-z0-9]*)[^>]*>").expect("valid markup regex")
    })
}

const UNKNOWN_ERROR: &str = "Unknown error";

/// A completed HTTP exchange.
///
/// Empty and `null` bodies are normalized to an empty JSON object; bodies that
/// are not JSON are kept as a string value.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Value) -> Self {
        let body = match body {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        Self {
            status,
            headers,
            body,
        }
    }

    /// Build from raw response text.
    pub fn from_text(status: StatusCode, headers: HeaderMap, text: &str) -> Self {
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
        };
        Self::new(status, headers, body)
    }

    pub(crate) async fn read(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await.map_err(super::error::from_transport)?;
        Ok(Self::from_text(status, headers, &text))
    }

    pub fn status(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn into_body(self) -> Value {
        self.body
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as text; lookup is case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// 2xx, excluding 299.
    pub fn is_success(&self) -> bool {
        (200..299).contains(&self.status())
    }

    /// Human-readable failure message.
    ///
    /// Prefers the body's `message` field; markup bodies are replaced by a
    /// generic message and plain text bodies are used verbatim.
    pub fn error_message(&self) -> String {
        match &self.body {
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            Value::String(text) if is_markup(text) => {
                format!("Request failed with status {}", self.status())
            }
            Value::String(text) if !text.trim().is_empty() => text.clone(),
            _ => UNKNOWN_ERROR.to_string(),
        }
    }

    /// The body's `code` field, falling back to the HTTP status.
    pub fn error_code(&self) -> i64 {
        self.body
            .get("code")
            .and_then(|code| match code {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .unwrap_or_else(|| i64::from(self.status()))
    }

    pub fn error_type(&self) -> Option<&str> {
        self.body.get("type").and_then(Value::as_str)
    }

    /// Return the response unchanged on success, the typed error otherwise.
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(classify(&self))
        }
    }

    /// Decode the body into a resource model.
    pub fn parse<T: WireFormat>(&self) -> Result<T> {
        T::from_wire(&self.body).ok_or_else(|| {
            Error::api(format!(
                "Request failed: response body is not a valid {}",
                std::any::type_name::<T>()
                    .rsplit("::")
                    .next()
                    .unwrap_or("resource")
            ))
        })
    }
}

fn is_markup(text: &str) -> bool {
    markup_regex().is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, text: &str) -> Response {
        Response::from_text(
            StatusCode::from_u16(status).unwrap(),
            HeaderMap::new(),
            text,
        )
    }

    #[test]
    fn test_empty_body_normalizes_to_map() {
        assert_eq!(response(200, "").body(), &json!({}));
        assert_eq!(response(200, "  ").body(), &json!({}));
        assert_eq!(response(200, "null").body(), &json!({}));
    }

    #[test]
    fn test_non_json_body_kept_as_string() {
        let resp = response(200, "pong");
        assert_eq!(resp.body(), &json!("pong"));
    }

    #[test]
    fn test_success_range() {
        assert!(response(200, "").is_success());
        assert!(response(204, "").is_success());
        assert!(response(298, "").is_success());
        assert!(!response(299, "").is_success());
        assert!(!response(199, "").is_success());
        assert!(!response(404, "").is_success());
    }

    #[test]
    fn test_error_message_prefers_body_field() {
        let resp = response(404, r#"{"code":1,"type":"error","message":"Pet not found"}"#);
        assert_eq!(resp.error_message(), "Pet not found");
        assert_eq!(resp.error_code(), 1);
        assert_eq!(resp.error_type(), Some("error"));
    }

    #[test]
    fn test_error_message_for_markup() {
        let resp = response(502, "<html><body><h1>502 Bad Gateway</h1></body></html>");
        assert_eq!(resp.error_message(), "Request failed with status 502");

        let doctype = response(500, "<!DOCTYPE html><p>oops</p>");
        assert_eq!(doctype.error_message(), "Request failed with status 500");
    }

    #[test]
    fn test_error_message_plain_text_verbatim() {
        let resp = response(500, "upstream exploded");
        assert_eq!(resp.error_message(), "upstream exploded");
    }

    #[test]
    fn test_error_message_fallback() {
        assert_eq!(response(500, "").error_message(), "Unknown error");
        assert_eq!(response(500, r#"{"code":5}"#).error_message(), "Unknown error");
        assert_eq!(response(500, "[1,2]").error_message(), "Unknown error");
    }

    #[test]
    fn test_error_code_falls_back_to_status() {
        assert_eq!(response(503, "").error_code(), 503);
        assert_eq!(response(400, r#"{"code":"42"}"#).error_code(), 42);
        assert_eq!(response(400, "").error_type(), None);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", "60".parse().unwrap());
        let resp = Response::new(StatusCode::TOO_MANY_REQUESTS, headers, Value::Null);
        assert_eq!(resp.header("Retry-After"), Some("60"));
        assert_eq!(resp.header("RETRY-AFTER"), Some("60"));
    }

    #[test]
    fn test_into_result() {
        assert!(response(200, "{}").into_result().is_ok());
        let err = response(404, r#"{"message":"gone"}"#).into_result().unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
