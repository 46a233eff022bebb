//! Wire format of the Mapbox Directions API (v5).

use model::{geo::Coordinate, route::DirectionStep};
use navigation::directions::{DirectionsResponse, Leg};
use serde::Deserialize;

use crate::ApiError;

/// `[longitude, latitude]`, the GeoJSON order.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LonLat(pub f64, pub f64);

impl From<LonLat> for Coordinate {
    fn from(LonLat(longitude, latitude): LonLat) -> Self {
        Coordinate::new(latitude, longitude)
    }
}

#[derive(Debug, Deserialize)]
pub struct DirectionsDto {
    pub code: String,
    #[serde(default)]
    pub routes: Vec<RouteDto>,
}

#[derive(Debug, Deserialize)]
pub struct RouteDto {
    pub distance: f64,
    pub duration: f64,
    pub geometry: LineStringDto,
    #[serde(default)]
    pub legs: Vec<LegDto>,
}

#[derive(Debug, Deserialize)]
pub struct LineStringDto {
    #[serde(default)]
    pub coordinates: Vec<LonLat>,
}

#[derive(Debug, Deserialize)]
pub struct LegDto {
    #[serde(default)]
    pub steps: Vec<StepDto>,
}

#[derive(Debug, Deserialize)]
pub struct StepDto {
    pub maneuver: ManeuverDto,
}

#[derive(Debug, Deserialize)]
pub struct ManeuverDto {
    #[serde(default)]
    pub instruction: String,
    pub location: LonLat,
}

impl DirectionsDto {
    /// The first route, the one the provider recommends.
    pub fn into_response(self) -> Result<DirectionsResponse, ApiError> {
        if self.code != "Ok" {
            return Err(ApiError::NoRoute(self.code));
        }
        let route = self
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NoRoute("no routes".to_owned()))?;

        Ok(DirectionsResponse {
            distance_meters: route.distance,
            duration_seconds: route.duration,
            geometry: route
                .geometry
                .coordinates
                .into_iter()
                .map(Coordinate::from)
                .collect(),
            legs: route
                .legs
                .into_iter()
                .map(|leg| Leg {
                    steps: leg
                        .steps
                        .into_iter()
                        .map(|step| {
                            DirectionStep::new(
                                step.maneuver.instruction,
                                step.maneuver.location.into(),
                            )
                        })
                        .collect(),
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "code": "Ok",
        "routes": [{
            "distance": 412.3,
            "duration": 296.1,
            "weight": 296.1,
            "geometry": {
                "type": "LineString",
                "coordinates": [[120.9690, 14.5890], [120.9695, 14.5896], [120.9700, 14.5900]]
            },
            "legs": [{
                "summary": "Calle Real",
                "steps": [
                    {"distance": 80.0, "maneuver": {"type": "depart", "instruction": "Head northeast on Calle Real", "location": [120.9690, 14.5890]}},
                    {"distance": 0.0, "maneuver": {"type": "arrive", "instruction": "You have arrived", "location": [120.9700, 14.5900]}}
                ]
            }]
        }],
        "waypoints": []
    }"#;

    #[test]
    fn converts_first_route() {
        let dto: DirectionsDto = serde_json::from_str(SAMPLE).unwrap();
        let response = dto.into_response().unwrap();
        assert_eq!(response.distance_meters, 412.3);
        assert_eq!(response.duration_seconds, 296.1);
        assert_eq!(response.geometry.len(), 3);
        assert_eq!(response.geometry[0], Coordinate::new(14.5890, 120.9690));

        let steps = response.steps();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].instruction, "Head northeast on Calle Real");
        assert_eq!(steps[1].maneuver_location, Coordinate::new(14.5900, 120.9700));
    }

    #[test]
    fn no_route_code_is_an_error() {
        let dto: DirectionsDto =
            serde_json::from_str(r#"{"code": "NoRoute", "routes": []}"#).unwrap();
        assert!(matches!(dto.into_response(), Err(ApiError::NoRoute(code)) if code == "NoRoute"));
    }

    #[test]
    fn ok_without_routes_is_an_error() {
        let dto: DirectionsDto = serde_json::from_str(r#"{"code": "Ok"}"#).unwrap();
        assert!(matches!(dto.into_response(), Err(ApiError::NoRoute(_))));
    }
}
