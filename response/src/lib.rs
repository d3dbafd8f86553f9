use lambda_http::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
};
use lambda_http::http::{response::Builder, StatusCode};
use lambda_http::{Body, Response};
use serde::de::IgnoredAny;
use serde::Serialize;
use serde_json::json;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";
pub const ALLOW_METHODS: &str = "GET,POST,OPTIONS";

fn cors(status: StatusCode) -> Builder {
    Response::builder()
        .status(status)
        .header(ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW_ORIGIN)
        .header(ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS)
        .header(ACCESS_CONTROL_ALLOW_METHODS, ALLOW_METHODS)
}

/// Answers a CORS preflight: 200 with no body.
pub fn preflight() -> Response<Body> {
    cors(StatusCode::OK)
        .body(Body::Empty)
        .expect("failed to render response")
}

pub fn ok<T>(body: T) -> Response<Body>
where
    T: Serialize,
{
    with_status(StatusCode::OK, body)
}

pub fn with_status<T>(status: StatusCode, body: T) -> Response<Body>
where
    T: Serialize,
{
    render(status, "application/json", json!(body).to_string())
}

/// Sends an already rendered body, e.g. an upstream payload passed through as is.
/// Bodies that are not JSON go out as plain text.
pub fn raw(status: StatusCode, body: String) -> Response<Body> {
    let content_type = if serde_json::from_str::<IgnoredAny>(&body).is_ok() {
        "application/json"
    } else {
        "text/plain; charset=utf-8"
    };
    render(status, content_type, body)
}

fn render(status: StatusCode, content_type: &str, body: String) -> Response<Body> {
    cors(status)
        .header(CONTENT_TYPE, content_type)
        .body(Body::Text(body))
        .expect("failed to render response")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
        response.headers().get(name).and_then(|value| value.to_str().ok())
    }

    #[test]
    fn preflight_has_cors_headers_and_no_body() {
        let response = preflight();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, "access-control-allow-origin"), Some("*"));
        assert_eq!(
            header(&response, "access-control-allow-headers"),
            Some("Content-Type, Authorization")
        );
        assert_eq!(header(&response, "access-control-allow-methods"), Some("GET,POST,OPTIONS"));
        assert_eq!(header(&response, "content-type"), None);
        assert!(matches!(response.body(), Body::Empty));
    }

    #[test]
    fn renders_json_with_status() {
        let response = with_status(StatusCode::METHOD_NOT_ALLOWED, json!({ "error": "Method Not Allowed" }));

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(header(&response, "content-type"), Some("application/json"));
        assert_eq!(header(&response, "access-control-allow-origin"), Some("*"));
        match response.body() {
            Body::Text(text) => assert_eq!(text, r#"{"error":"Method Not Allowed"}"#),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn raw_keeps_body_verbatim() {
        let upstream = r#"{"code":"INVALID_TOKEN","status":"error"}"#;
        let response = raw(StatusCode::UNAUTHORIZED, upstream.to_string());

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(header(&response, "content-type"), Some("application/json"));
        match response.body() {
            Body::Text(text) => assert_eq!(text, upstream),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn raw_non_json_is_plain_text() {
        let response = raw(StatusCode::BAD_GATEWAY, "<html>Bad Gateway</html>".to_string());

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(header(&response, "content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(header(&response, "access-control-allow-origin"), Some("*"));
        match response.body() {
            Body::Text(text) => assert_eq!(text, "<html>Bad Gateway</html>"),
            other => panic!("unexpected body {:?}", other),
        }
    }
}
