use std::env;

use async_trait::async_trait;
use model::{geo::Coordinate, transport::TransportMode};
use navigation::directions::{
    DirectionsProvider, DirectionsRequest, DirectionsResponse, GeometryFormat, ProviderError,
};
use serde::{Deserialize, Serialize};

use crate::{response::DirectionsDto, ApiError};

pub const MAPBOX_API_URL: &str = "https://api.mapbox.com";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionsCredentials {
    pub base_url: String,
    pub access_token: String,
    pub proxy: Option<String>,
}

impl DirectionsCredentials {
    pub fn from_env() -> Result<Self, ApiError> {
        let access_token = env::var("DIRECTIONS_ACCESS_TOKEN")
            .map_err(|_| ApiError::MissingCredentials("DIRECTIONS_ACCESS_TOKEN"))?;
        let base_url =
            env::var("DIRECTIONS_BASE_URL").unwrap_or_else(|_| MAPBOX_API_URL.to_owned());

        Ok(Self {
            base_url,
            access_token,
            proxy: None,
        })
    }
}

pub struct DirectionsClient {
    pub credentials: DirectionsCredentials,
    http: reqwest::Client,
}

fn profile(mode: TransportMode) -> &'static str {
    match mode {
        TransportMode::Walking => "mapbox/walking",
        TransportMode::Cycling => "mapbox/cycling",
        TransportMode::Driving => "mapbox/driving",
    }
}

fn waypoint(coordinate: &Coordinate) -> String {
    format!("{},{}", coordinate.longitude, coordinate.latitude)
}

impl DirectionsClient {
    pub fn new(credentials: &DirectionsCredentials) -> Result<Self, ApiError> {
        /* build the http client with optional proxy */
        let http = match &credentials.proxy {
            Some(proxy_url) => reqwest::Client::builder()
                .proxy(reqwest::Proxy::all(proxy_url)?)
                .build()?,
            None => reqwest::Client::new(),
        };
        Ok(Self {
            credentials: credentials.clone(),
            http,
        })
    }

    /// Endpoint for `request`, without the access token.
    pub fn endpoint(&self, request: &DirectionsRequest) -> String {
        let geometries = match request.geometry {
            GeometryFormat::GeoJson => "geojson",
        };
        format!(
            "{}/directions/v5/{}/{};{}?geometries={}&steps={}&overview=full",
            self.credentials.base_url.trim_end_matches('/'),
            profile(request.mode),
            waypoint(request.start()),
            waypoint(request.end()),
            geometries,
            request.steps,
        )
    }

    pub async fn route(&self, request: &DirectionsRequest) -> Result<DirectionsResponse, ApiError> {
        let url = self.endpoint(request);
        log::debug!("Requesting directions '{url}'.");

        /* perform get-request */
        let response = self
            .http
            .get(&url)
            .query(&[("access_token", &self.credentials.access_token)])
            .send()
            .await?;

        /* parse response */
        match response.status() {
            reqwest::StatusCode::OK => {
                let dto: DirectionsDto = response.json().await?;
                dto.into_response()
            }
            other => match response.text().await {
                Ok(val) => Err(ApiError::InvalidResponse {
                    status_code: other,
                    url,
                    response: Some(val),
                }),
                Err(_) => Err(ApiError::InvalidResponse {
                    status_code: other,
                    url,
                    response: None,
                }),
            },
        }
    }
}

#[async_trait]
impl DirectionsProvider for DirectionsClient {
    async fn directions(
        &self,
        request: &DirectionsRequest,
    ) -> Result<DirectionsResponse, ProviderError> {
        Ok(self.route(request).await?)
    }
}
