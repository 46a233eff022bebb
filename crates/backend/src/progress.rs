use async_trait::async_trait;
use chrono::DateTime;
use indexmap::IndexSet;
use model::{geo::UserPosition, itinerary::Itinerary, progress::ProgressState};
use navigation::progress::{Credentials, RemoteProgress, StoreError};
use serde::{Deserialize, Serialize};
use utility::{
    id::Id,
    serde::{lenient_f64, lenient_string},
};

use crate::BackendClient;

/// Body of `GET`/`POST /itinerary-progress/{id}`.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDto {
    #[serde(default)]
    pub current_pin_index: usize,
    #[serde(default, deserialize_with = "lenient_string::deserialize_vec")]
    pub visited_sites: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string::deserialize_vec")]
    pub skipped_sites: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string::deserialize_vec")]
    pub optimized_order: Vec<String>,
    #[serde(default)]
    pub last_position: Option<PositionDto>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDto {
    #[serde(deserialize_with = "lenient_f64::deserialize")]
    pub latitude: f64,
    #[serde(deserialize_with = "lenient_f64::deserialize")]
    pub longitude: f64,
    pub heading: Option<f64>,
    pub accuracy: Option<f64>,
    /// Milliseconds since the epoch.
    pub timestamp: Option<i64>,
}

impl From<&ProgressState> for ProgressDto {
    fn from(state: &ProgressState) -> Self {
        Self {
            current_pin_index: state.current_index,
            visited_sites: state.visited.iter().map(|id| id.raw()).collect(),
            skipped_sites: state.skipped.iter().map(|id| id.raw()).collect(),
            optimized_order: state.optimized_order.iter().map(|id| id.raw()).collect(),
            last_position: state.last_position.map(|position| PositionDto {
                latitude: position.latitude,
                longitude: position.longitude,
                heading: position.heading,
                accuracy: position.accuracy,
                timestamp: Some(position.timestamp.timestamp_millis()),
            }),
        }
    }
}

impl From<ProgressDto> for ProgressState {
    fn from(dto: ProgressDto) -> Self {
        Self {
            optimized_order: dto.optimized_order.into_iter().map(Id::new).collect(),
            current_index: dto.current_pin_index,
            visited: dto.visited_sites.into_iter().map(Id::new).collect::<IndexSet<_>>(),
            skipped: dto.skipped_sites.into_iter().map(Id::new).collect::<IndexSet<_>>(),
            // a position without a usable timestamp is of no use
            last_position: dto.last_position.and_then(|position| {
                let timestamp = DateTime::from_timestamp_millis(position.timestamp?)?;
                Some(UserPosition {
                    latitude: position.latitude,
                    longitude: position.longitude,
                    heading: position.heading,
                    accuracy: position.accuracy,
                    timestamp,
                })
            }),
        }
    }
}

fn endpoint(itinerary: &Id<Itinerary>) -> String {
    format!("itinerary-progress/{}", itinerary)
}

#[async_trait]
impl RemoteProgress for BackendClient {
    async fn fetch(
        &self,
        itinerary: &Id<Itinerary>,
        credentials: &Credentials,
    ) -> Result<Option<ProgressState>, StoreError> {
        let dto: Option<ProgressDto> = self
            .get(&endpoint(itinerary), Some(credentials.token.as_str()))
            .await?;
        Ok(dto.map(ProgressState::from))
    }

    async fn upsert(
        &self,
        itinerary: &Id<Itinerary>,
        credentials: &Credentials,
        state: &ProgressState,
    ) -> Result<(), StoreError> {
        self.post(
            &endpoint(itinerary),
            Some(credentials.token.as_str()),
            &ProgressDto::from(state),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ids(raw: &[&str]) -> Vec<Id<model::site::Site>> {
        raw.iter().map(|id| Id::from(*id)).collect()
    }

    #[test]
    fn reads_numeric_and_string_ids() {
        let dto: ProgressDto = serde_json::from_value(json!({
            "currentPinIndex": 1,
            "visitedSites": [12],
            "skippedSites": null,
            "optimizedOrder": [12, "13", 14],
            "lastPosition": {"latitude": "14.59", "longitude": 120.97, "timestamp": 1700000000000i64}
        }))
        .unwrap();
        let state = ProgressState::from(dto);
        assert_eq!(state.optimized_order, ids(&["12", "13", "14"]));
        assert_eq!(state.visited, IndexSet::from([Id::from("12")]));
        assert!(state.skipped.is_empty());
        assert_eq!(state.current_index, 1);
        let position = state.last_position.unwrap();
        assert_eq!(position.latitude, 14.59);
        assert_eq!(position.timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn missing_fields_mean_no_progress() {
        let dto: ProgressDto = serde_json::from_value(json!({})).unwrap();
        let state = ProgressState::from(dto);
        assert!(!state.has_progress());
        assert!(state.last_position.is_none());
    }

    #[test]
    fn writes_the_backend_shape() {
        let state = ProgressState {
            optimized_order: ids(&["A", "B", "C"]),
            current_index: 1,
            visited: IndexSet::from([Id::from("A")]),
            ..Default::default()
        };
        let body = serde_json::to_value(ProgressDto::from(&state)).unwrap();
        assert_eq!(
            body,
            json!({
                "currentPinIndex": 1,
                "visitedSites": ["A"],
                "skippedSites": [],
                "optimizedOrder": ["A", "B", "C"]
            })
        );
    }

    #[test]
    fn save_load_round_trip_through_the_wire_format() {
        let state = ProgressState {
            optimized_order: ids(&["A", "B", "C"]),
            current_index: 1,
            visited: IndexSet::from([Id::from("A")]),
            last_position: Some(UserPosition {
                heading: Some(270.0),
                ..UserPosition::new(14.59, 120.97, chrono::Utc::now())
            }),
            ..Default::default()
        };
        let wire = serde_json::to_string(&ProgressDto::from(&state)).unwrap();
        let back = ProgressState::from(serde_json::from_str::<ProgressDto>(&wire).unwrap());
        assert_eq!(back, state);
    }
}
