use std::{fmt, sync::Arc};

use chrono::{DateTime, Local};
use model::{
    geo::Coordinate,
    route::{DirectionStep, NavigationSnapshot, RouteSource},
    site::Site,
    transport::TransportMode,
    WithId,
};

use crate::{
    boundary::BoundingPolygon,
    directions::{DirectionsProvider, DirectionsRequest, DirectionsResponse},
};

/// Identifies one directions request. Later requests compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Only the most recently issued request may deliver a result.
#[derive(Debug, Default)]
pub struct RequestFence {
    latest: u64,
}

impl RequestFence {
    pub fn issue(&mut self) -> RequestId {
        self.latest += 1;
        RequestId(self.latest)
    }

    pub fn is_current(&self, id: RequestId) -> bool {
        id.0 == self.latest
    }

    /// Turns every outstanding request stale.
    pub fn revoke(&mut self) {
        self.latest += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    EmptyGeometry,
    OutOfBounds,
    BadFigures,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGeometry => write!(f, "route has no geometry"),
            Self::OutOfBounds => write!(f, "route leaves the touring area"),
            Self::BadFigures => write!(f, "route has an unusable distance or duration"),
        }
    }
}

/// Stateless half of the navigator, cheap to clone into request tasks.
#[derive(Clone)]
pub struct RoutePlanner {
    provider: Arc<dyn DirectionsProvider>,
    boundary: Arc<BoundingPolygon>,
}

impl RoutePlanner {
    pub fn new(provider: Arc<dyn DirectionsProvider>, boundary: BoundingPolygon) -> Self {
        Self {
            provider,
            boundary: Arc::new(boundary),
        }
    }

    /// Asks the provider for a route and validates it against the touring
    /// area. Never fails: any problem yields the straight-line estimate.
    pub async fn build_route(
        &self,
        start: Coordinate,
        target: &WithId<Site>,
        mode: TransportMode,
    ) -> NavigationSnapshot {
        let request = DirectionsRequest::new(mode, start, target.content.coordinate());
        let result = self.provider.directions(&request).await;
        let now = Local::now();
        match result {
            Ok(response) => match self.validate(&response) {
                Ok(()) => NavigationSnapshot::new(
                    target.id.clone(),
                    mode,
                    response.distance_meters,
                    response.duration_seconds,
                    response.geometry.clone(),
                    response.steps(),
                    RouteSource::Provider,
                    now,
                ),
                Err(rejection) => {
                    log::info!(
                        "discarding route to {}: {}, using straight line",
                        target.id,
                        rejection
                    );
                    straight_line(start, target, mode, now)
                }
            },
            Err(why) => {
                log::info!(
                    "directions provider failed for {}: {}, using straight line",
                    target.id,
                    why
                );
                straight_line(start, target, mode, now)
            }
        }
    }

    fn validate(&self, response: &DirectionsResponse) -> Result<(), Rejection> {
        if response.geometry.is_empty() {
            return Err(Rejection::EmptyGeometry);
        }
        let usable = |value: f64| value.is_finite() && value >= 0.0;
        if !usable(response.distance_meters) || !usable(response.duration_seconds) {
            return Err(Rejection::BadFigures);
        }
        if !self.boundary.contains_all(&response.geometry) {
            return Err(Rejection::OutOfBounds);
        }
        Ok(())
    }
}

/// Direct line from `start` to the site, timed with the fallback speed table.
pub fn straight_line(
    start: Coordinate,
    target: &WithId<Site>,
    mode: TransportMode,
    now: DateTime<Local>,
) -> NavigationSnapshot {
    let end = target.content.coordinate();
    let distance = start.distance_to(&end);
    NavigationSnapshot::new(
        target.id.clone(),
        mode,
        distance,
        mode.estimate_seconds(distance),
        vec![start, end],
        vec![DirectionStep::new(
            format!("{} directly to {}", mode.verb(), target.content.name),
            end,
        )],
        RouteSource::StraightLine,
        now,
    )
}

/// Holds the route to the active site and decides which request results may
/// replace it.
pub struct Navigator {
    planner: RoutePlanner,
    fence: RequestFence,
    current: Option<NavigationSnapshot>,
}

impl Navigator {
    pub fn new(planner: RoutePlanner) -> Self {
        Self {
            planner,
            fence: RequestFence::default(),
            current: None,
        }
    }

    pub fn planner(&self) -> RoutePlanner {
        self.planner.clone()
    }

    /// Starts a new request, superseding all earlier ones.
    pub fn issue(&mut self) -> RequestId {
        self.fence.issue()
    }

    /// Installs the result of request `id` unless a newer request was issued
    /// in the meantime.
    pub fn accept(
        &mut self,
        id: RequestId,
        snapshot: NavigationSnapshot,
    ) -> Option<&NavigationSnapshot> {
        if !self.fence.is_current(id) {
            log::debug!("ignoring stale route response {}", id);
            return None;
        }
        self.current = Some(snapshot);
        self.current.as_ref()
    }

    /// Re-times the known route for `mode` without waiting for the provider.
    pub fn retime(&mut self, mode: TransportMode) -> Option<&NavigationSnapshot> {
        let retimed = self.current.as_ref()?.retimed(mode, Local::now());
        self.current = Some(retimed);
        self.current.as_ref()
    }

    pub fn current(&self) -> Option<&NavigationSnapshot> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut NavigationSnapshot> {
        self.current.as_mut()
    }

    /// Forgets the route and turns every outstanding request stale.
    pub fn reset(&mut self) {
        self.current = None;
        self.fence.revoke();
    }
}
