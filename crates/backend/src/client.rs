use std::env;

use serde::{Deserialize, Serialize};

use crate::ApiError;

/// HTTP access to the tourism backend.
pub struct BackendClient {
    pub base_url: String,
    http: reqwest::Client,
}

impl BackendClient {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Reads `BACKEND_URL`.
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("BACKEND_URL").ok()?;
        Some(Self::new(base_url))
    }

    pub fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// Fetch data from an endpoint. `None` when the backend has no such
    /// record or answers with `null`.
    pub async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        token: Option<&str>,
    ) -> Result<Option<T>, ApiError> {
        let url = self.url(endpoint);
        log::debug!("Requesting Endpoint '{url}'.");

        /* perform get-request */
        let mut request = self.http.get(&url).header("accept", "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        /* parse response */
        match response.status() {
            reqwest::StatusCode::OK => {
                let text = response.text().await?;
                Ok(serde_json::from_str::<Option<T>>(&text)?)
            }
            reqwest::StatusCode::NOT_FOUND | reqwest::StatusCode::NO_CONTENT => Ok(None),
            other => Err(invalid_response(other, url, response).await),
        }
    }

    /// Send `body` as JSON to an endpoint.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<(), ApiError> {
        let url = self.url(endpoint);
        log::debug!("Posting to Endpoint '{url}'.");

        let mut request = self.http.post(&url).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(invalid_response(response.status(), url, response).await)
        }
    }
}

async fn invalid_response(
    status_code: reqwest::StatusCode,
    url: String,
    response: reqwest::Response,
) -> ApiError {
    ApiError::InvalidResponse {
        status_code,
        url,
        response: response.text().await.ok(),
    }
}
