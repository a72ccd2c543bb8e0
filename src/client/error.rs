//! Mapping of HTTP outcomes to [`Error`].

use super::response::Response;
use crate::Error;

/// `type` value the server uses for rejected orders.
pub const INVALID_ORDER_TYPE: &str = "InvalidOrder";

/// Classify a non-success response.
pub fn classify(response: &Response) -> Error {
    let status = response.status();
    let message = response.error_message();

    match status {
        404 => Error::NotFound {
            message,
            status: Some(status),
        },
        400 if response.error_type() == Some(INVALID_ORDER_TYPE) => Error::InvalidOrder {
            message,
            status: Some(status),
        },
        400 | 405 => Error::InvalidInput {
            message,
            status: Some(status),
        },
        429 => Error::RateLimit {
            message,
            status: Some(status),
            retry_after: response.header("retry-after").map(str::to_string),
        },
        _ => Error::Api {
            message,
            status: Some(status),
            code: Some(response.error_code()),
            error_type: response.error_type().map(str::to_string),
        },
    }
}

/// Map a transport failure where no response was obtained.
pub fn from_transport(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::connection(format!("Request timeout: {}", err))
    } else if err.is_connect() {
        Error::connection(format!("Connection failed: {}", err))
    } else {
        Error::api(format!("Request failed: {}", err))
    }
}

/// Whether the transport failure may succeed on a new attempt.
pub fn is_retryable_transport(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use reqwest::StatusCode;
    use reqwest::header::HeaderMap;

    fn response(status: u16, body: &str) -> Response {
        Response::from_text(StatusCode::from_u16(status).unwrap(), HeaderMap::new(), body)
    }

    #[test]
    fn test_not_found() {
        let err = classify(&response(404, r#"{"message":"Not found"}"#));
        assert!(matches!(err, Error::NotFound { .. }));
        assert_eq!(err.message(), "Not found");
        assert_eq!(err.status_code(), Some(404));
    }

    #[test]
    fn test_bad_request_distinguishes_invalid_order() {
        let order = classify(&response(
            400,
            r#"{"message":"Bad order","type":"InvalidOrder"}"#,
        ));
        assert_eq!(order.kind(), ErrorKind::InvalidOrder);
        assert_eq!(order.message(), "Bad order");

        let input = classify(&response(400, r#"{"message":"Bad order"}"#));
        assert_eq!(input.kind(), ErrorKind::InvalidInput);

        let other_type = classify(&response(400, r#"{"message":"x","type":"unknown"}"#));
        assert_eq!(other_type.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_method_not_allowed_is_invalid_input() {
        let err = classify(&response(405, r#"{"message":"Invalid input"}"#));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.status_code(), Some(405));
    }

    #[test]
    fn test_rate_limit_reads_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert("Retry-After", "60".parse().unwrap());
        let resp = Response::from_text(StatusCode::TOO_MANY_REQUESTS, headers, "");

        let err = classify(&resp);
        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert_eq!(err.retry_after(), Some("60"));
        assert_eq!(err.message(), "Unknown error");

        let without = classify(&response(429, r#"{"message":"slow down"}"#));
        assert_eq!(without.retry_after(), None);
    }

    #[test]
    fn test_other_statuses_are_api_errors() {
        for status in [401, 403, 409, 500, 503] {
            let err = classify(&response(status, r#"{"code":7,"type":"error","message":"nope"}"#));
            assert_eq!(err.kind(), ErrorKind::Generic, "{status}");
            let Error::Api {
                code, error_type, ..
            } = err
            else {
                unreachable!();
            };
            assert_eq!(code, Some(7));
            assert_eq!(error_type.as_deref(), Some("error"));
        }
    }

    #[test]
    fn test_api_error_code_defaults_to_status() {
        let err = classify(&response(500, "<html>Internal</html>"));
        assert_eq!(err.message(), "Request failed with status 500");
        assert!(matches!(err, Error::Api { code: Some(500), .. }));
    }
}
