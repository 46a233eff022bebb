use std::error;
use std::fmt;
use std::sync::Arc;

use navigation::progress::StoreError;

pub mod client;
pub mod itineraries;
pub mod progress;

pub use client::BackendClient;

#[derive(Debug, Clone)]
pub enum ApiError {
    RequestError(Arc<reqwest::Error>),
    JsonError(Arc<serde_json::Error>),
    InvalidResponse {
        status_code: reqwest::StatusCode,
        url: String,
        response: Option<String>,
    },
}

impl error::Error for ApiError {}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::RequestError(e) => write!(f, "HTTP request error: {}", e),
            ApiError::JsonError(e) => write!(f, "JSON parse error: {}", e),
            ApiError::InvalidResponse {
                status_code,
                url,
                response,
            } => match response {
                Some(text) => {
                    write!(f, "Invalid Response ({}) {}: {}", status_code, text, url)
                }
                None => write!(f, "Invalid Response({}) {}", status_code, url),
            },
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::RequestError(Arc::new(e))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::JsonError(Arc::new(e))
    }
}

impl From<ApiError> for StoreError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::InvalidResponse { status_code, .. }
                if status_code == reqwest::StatusCode::UNAUTHORIZED
                    || status_code == reqwest::StatusCode::FORBIDDEN =>
            {
                StoreError::Unauthorized
            }
            ApiError::InvalidResponse { status_code, .. }
                if status_code == reqwest::StatusCode::NOT_FOUND =>
            {
                StoreError::NotFound
            }
            ApiError::JsonError(why) => StoreError::Malformed(why.to_string()),
            other => StoreError::Remote(Box::new(other)),
        }
    }
}
