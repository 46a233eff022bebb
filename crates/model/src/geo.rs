use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use utility::geo::{haversine_distance, squared_planar_distance};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Haversine distance in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine_distance(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }

    pub fn planar_distance_squared(&self, other: &Coordinate) -> f64 {
        squared_planar_distance(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }

    pub fn as_tuple(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}

/// A single fix of the device. Only the most recent one is ever kept.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPosition {
    pub latitude: f64,
    pub longitude: f64,
    /// Degrees clockwise from north.
    pub heading: Option<f64>,
    /// Accuracy radius in meters.
    pub accuracy: Option<f64>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl UserPosition {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            heading: None,
            accuracy: None,
            timestamp: timestamp.trunc_subsecs(3),
        }
    }

    /// Drops sub-millisecond precision, which no store keeps.
    pub fn truncated(mut self) -> Self {
        self.timestamp = self.timestamp.trunc_subsecs(3);
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        self.coordinate().distance_to(other)
    }
}
