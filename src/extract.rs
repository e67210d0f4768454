use reqwest::StatusCode;
use serde::Deserialize;

/// Message used when an error response has no body
pub const EMPTY_ERROR_BODY: &str = "(empty error body)";

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Turn the body of a non-success response into a readable message
///
/// JSON bodies of the form `{"error": "..."}` yield the `error` string;
/// anything else, including JSON without a usable `error` field, is returned
/// verbatim. An empty body yields [`EMPTY_ERROR_BODY`].
pub fn extract_error_message(status: StatusCode, content_type: Option<&str>, body: &str) -> String {
    if body.is_empty() {
        return EMPTY_ERROR_BODY.to_string();
    }

    if content_type.is_some_and(is_json) {
        if let Ok(ErrorBody { error: Some(error) }) = serde_json::from_str::<ErrorBody>(body) {
            if !error.is_empty() {
                return error;
            }
        }
        tracing::trace!(status = status.as_u16(), "error body has no usable error field");
    }

    body.to_string()
}

fn is_json(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: Option<&str> = Some("application/json");

    #[test]
    fn test_empty_body_sentinel() {
        assert_eq!(
            extract_error_message(StatusCode::INTERNAL_SERVER_ERROR, None, ""),
            EMPTY_ERROR_BODY
        );
        assert_eq!(
            extract_error_message(StatusCode::BAD_REQUEST, JSON, ""),
            EMPTY_ERROR_BODY
        );
    }

    #[test]
    fn test_json_error_field_extracted() {
        let message = extract_error_message(
            StatusCode::BAD_REQUEST,
            JSON,
            r#"{"error": "validation failed: header is required"}"#,
        );
        assert_eq!(message, "validation failed: header is required");
    }

    #[test]
    fn test_json_content_type_with_parameters() {
        let message = extract_error_message(
            StatusCode::BAD_REQUEST,
            Some("Application/JSON; charset=utf-8"),
            r#"{"error":"bad"}"#,
        );
        assert_eq!(message, "bad");

        let message = extract_error_message(
            StatusCode::BAD_REQUEST,
            Some("application/problem+json"),
            r#"{"error":"problem"}"#,
        );
        assert_eq!(message, "problem");
    }

    #[test]
    fn test_json_without_error_field_returns_raw() {
        let body = r#"{"message": "something went wrong"}"#;
        assert_eq!(extract_error_message(StatusCode::BAD_REQUEST, JSON, body), body);
    }

    #[test]
    fn test_json_with_empty_or_non_string_error_returns_raw() {
        let body = r#"{"error": ""}"#;
        assert_eq!(extract_error_message(StatusCode::BAD_REQUEST, JSON, body), body);

        let body = r#"{"error": {"code": 7}}"#;
        assert_eq!(extract_error_message(StatusCode::BAD_REQUEST, JSON, body), body);
    }

    #[test]
    fn test_plain_text_returned_verbatim() {
        assert_eq!(
            extract_error_message(StatusCode::BAD_REQUEST, Some("text/plain"), "Bad Request"),
            "Bad Request"
        );
        assert_eq!(
            extract_error_message(StatusCode::BAD_REQUEST, None, "Bad Request"),
            "Bad Request"
        );
    }

    #[test]
    fn test_json_body_without_json_content_type_returned_verbatim() {
        let body = r#"{"error":"hidden"}"#;
        assert_eq!(
            extract_error_message(StatusCode::BAD_REQUEST, Some("text/plain"), body),
            body
        );
    }

    #[test]
    fn test_malformed_json_returned_verbatim() {
        let body = "{not json";
        assert_eq!(extract_error_message(StatusCode::BAD_GATEWAY, JSON, body), body);
    }
}
