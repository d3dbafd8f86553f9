use lambda_http::http::StatusCode;
use lambda_http::{Body, Response};
use serde::Serialize;
use zoho::ZohoError;

/// Every way a request can fail before Zoho's answer is known.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    MissingCredentials(String),
    #[error(transparent)]
    Zoho(#[from] ZohoError),
    #[error("unreadable response from Zoho: {0}")]
    UpstreamBody(serde_json::Error),
    #[error("request body is not valid JSON: {0}")]
    InvalidBody(serde_json::Error),
    #[error("Method Not Allowed")]
    MethodNotAllowed,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let error = match self {
            GatewayError::MissingCredentials(_) => "Missing token",
            GatewayError::InvalidBody(_) => "Bad Request",
            GatewayError::MethodNotAllowed => "Method Not Allowed",
            GatewayError::Zoho(_) | GatewayError::UpstreamBody(_) => "Server error",
        };
        let message = match self {
            GatewayError::MethodNotAllowed => None,
            other => Some(other.to_string()),
        };
        ErrorBody { error, message }
    }

    pub fn into_response(self) -> Response<Body> {
        response::with_status(self.status(), self.body())
    }
}
