use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};
use utility::id::Id;

use crate::{geo::Coordinate, site::Site, transport::TransportMode};

/// One turn-by-turn instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionStep {
    pub instruction: String,
    pub maneuver_location: Coordinate,
}

impl DirectionStep {
    pub fn new<S: Into<String>>(instruction: S, maneuver_location: Coordinate) -> Self {
        Self {
            instruction: instruction.into(),
            maneuver_location,
        }
    }
}

/// Where the numbers of a [`NavigationSnapshot`] come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteSource {
    /// Geometry and duration as returned by the directions provider.
    Provider,
    /// Straight line between start and target, duration from the speed table.
    StraightLine,
    /// Known distance re-timed for a new transport mode while the
    /// authoritative request is in flight.
    Optimistic,
}

/// Route to the active site. Derived on every update and never persisted.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationSnapshot {
    pub target: Id<Site>,
    pub mode: TransportMode,
    pub distance_meters: f64,
    pub eta_seconds: f64,
    pub arrival_clock_time: DateTime<Local>,
    pub route_geometry: Vec<Coordinate>,
    pub steps: Vec<DirectionStep>,
    pub current_step_index: Option<usize>,
    pub source: RouteSource,
}

impl NavigationSnapshot {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        target: Id<Site>,
        mode: TransportMode,
        distance_meters: f64,
        eta_seconds: f64,
        route_geometry: Vec<Coordinate>,
        steps: Vec<DirectionStep>,
        source: RouteSource,
        now: DateTime<Local>,
    ) -> Self {
        Self {
            target,
            mode,
            distance_meters,
            eta_seconds,
            arrival_clock_time: arrival_at(now, eta_seconds),
            route_geometry,
            steps,
            current_step_index: None,
            source,
        }
    }

    /// Same route, ETA recomputed from the known distance for `mode`.
    pub fn retimed(&self, mode: TransportMode, now: DateTime<Local>) -> Self {
        let eta_seconds = mode.estimate_seconds(self.distance_meters);
        Self {
            mode,
            eta_seconds,
            arrival_clock_time: arrival_at(now, eta_seconds),
            source: RouteSource::Optimistic,
            ..self.clone()
        }
    }

    pub fn current_step(&self) -> Option<&DirectionStep> {
        self.current_step_index.and_then(|index| self.steps.get(index))
    }
}

/// Falls back to `now` when the eta does not fit the calendar.
fn arrival_at(now: DateTime<Local>, eta_seconds: f64) -> DateTime<Local> {
    Duration::try_milliseconds((eta_seconds * 1000.0).round() as i64)
        .and_then(|eta| now.checked_add_signed(eta))
        .unwrap_or(now)
}
