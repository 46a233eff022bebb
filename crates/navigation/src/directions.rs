use std::error::Error;

use async_trait::async_trait;
use model::{geo::Coordinate, route::DirectionStep, transport::TransportMode};
use serde::{Deserialize, Serialize};

pub type ProviderError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryFormat {
    GeoJson,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionsRequest {
    pub mode: TransportMode,
    pub waypoints: [Coordinate; 2],
    pub geometry: GeometryFormat,
    pub steps: bool,
}

impl DirectionsRequest {
    pub fn new(mode: TransportMode, start: Coordinate, end: Coordinate) -> Self {
        Self {
            mode,
            waypoints: [start, end],
            geometry: GeometryFormat::GeoJson,
            steps: true,
        }
    }

    pub fn start(&self) -> &Coordinate {
        &self.waypoints[0]
    }

    pub fn end(&self) -> &Coordinate {
        &self.waypoints[1]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionsResponse {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub geometry: Vec<Coordinate>,
    pub legs: Vec<Leg>,
}

impl DirectionsResponse {
    /// Steps of all legs, in travel order.
    pub fn steps(&self) -> Vec<DirectionStep> {
        self.legs
            .iter()
            .flat_map(|leg| leg.steps.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub steps: Vec<DirectionStep>,
}

/// External routing service.
#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    async fn directions(
        &self,
        request: &DirectionsRequest,
    ) -> Result<DirectionsResponse, ProviderError>;
}
