use model::{geo::UserPosition, progress::ProgressState, site::Site, WithId};
use utility::id::Id;

pub const DEFAULT_ARRIVAL_RADIUS_M: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrivalCheck {
    pub is_nearby: bool,
    pub distance_meters: f64,
}

/// What the session should do about the active site after a position update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    Away,
    /// Within the geofence; the user confirms the visit.
    Nearby,
    /// Within the geofence of the last open site, which is visited without
    /// confirmation.
    AutoVisit,
}

impl Arrival {
    pub fn is_nearby(&self) -> bool {
        !matches!(self, Self::Away)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ArrivalDetector {
    radius_m: f64,
}

impl Default for ArrivalDetector {
    fn default() -> Self {
        Self::new(DEFAULT_ARRIVAL_RADIUS_M)
    }
}

impl ArrivalDetector {
    pub fn new(radius_m: f64) -> Self {
        Self { radius_m }
    }

    pub fn check_arrival(&self, position: &UserPosition, site: &Site) -> ArrivalCheck {
        let distance_meters = position.distance_to(&site.coordinate());
        ArrivalCheck {
            is_nearby: distance_meters <= self.radius_m,
            distance_meters,
        }
    }

    pub fn evaluate(
        &self,
        position: &UserPosition,
        active: &WithId<Site>,
        progress: &ProgressState,
    ) -> Arrival {
        if !self.check_arrival(position, &active.content).is_nearby {
            return Arrival::Away;
        }
        if !progress.visited.contains(&active.id) && is_terminal(progress, &active.id) {
            Arrival::AutoVisit
        } else {
            Arrival::Nearby
        }
    }
}

/// Whether every site of the order other than `site` is visited or skipped.
pub fn is_terminal(progress: &ProgressState, site: &Id<Site>) -> bool {
    progress
        .optimized_order
        .iter()
        .filter(|id| *id != site)
        .all(|id| progress.visited.contains(id) || progress.skipped.contains(id))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use model::ExampleData;

    use super::*;

    fn site(id: &str, latitude: f64, longitude: f64) -> WithId<Site> {
        WithId::new(
            Id::from(id),
            Site {
                latitude,
                longitude,
                ..Site::example_data()
            },
        )
    }

    fn ids(raw: &[&str]) -> Vec<Id<Site>> {
        raw.iter().map(|id| Id::from(*id)).collect()
    }

    // ~0.00018 degrees of latitude is 20 m
    fn near(site: &WithId<Site>) -> UserPosition {
        UserPosition::new(site.content.latitude + 0.00018, site.content.longitude, Utc::now())
    }

    #[test]
    fn geofence_is_fifty_meters() {
        let detector = ArrivalDetector::default();
        let fort = site("fort", 14.5953, 120.9700);
        let inside = detector.check_arrival(&near(&fort), &fort.content);
        assert!(inside.is_nearby);
        assert!((inside.distance_meters - 20.0).abs() < 0.5);

        // ~0.00063 degrees is 70 m
        let far = UserPosition::new(14.5953 + 0.00063, 120.97, Utc::now());
        assert!(!detector.check_arrival(&far, &fort.content).is_nearby);
    }

    #[test]
    fn last_open_site_is_visited_automatically() {
        let detector = ArrivalDetector::default();
        let last = site("c", 14.59, 120.97);
        let mut progress = ProgressState::new(ids(&["a", "b", "c"]));
        progress.visited.insert(Id::from("a"));
        progress.skipped.insert(Id::from("b"));
        progress.current_index = 2;
        assert_eq!(detector.evaluate(&near(&last), &last, &progress), Arrival::AutoVisit);
    }

    #[test]
    fn other_sites_are_only_flagged_nearby() {
        let detector = ArrivalDetector::default();
        let first = site("a", 14.59, 120.97);
        let progress = ProgressState::new(ids(&["a", "b", "c"]));
        let arrival = detector.evaluate(&near(&first), &first, &progress);
        assert_eq!(arrival, Arrival::Nearby);
        assert!(arrival.is_nearby());
        assert!(progress.visited.is_empty());
    }

    #[test]
    fn away_from_the_site() {
        let detector = ArrivalDetector::default();
        let only = site("a", 14.59, 120.97);
        let progress = ProgressState::new(ids(&["a"]));
        let position = UserPosition::new(14.60, 120.97, Utc::now());
        assert_eq!(detector.evaluate(&position, &only, &progress), Arrival::Away);
    }

    #[test]
    fn visited_site_is_not_visited_twice() {
        let detector = ArrivalDetector::default();
        let only = site("a", 14.59, 120.97);
        let mut progress = ProgressState::new(ids(&["a"]));
        progress.visited.insert(Id::from("a"));
        assert_eq!(detector.evaluate(&near(&only), &only, &progress), Arrival::Nearby);
    }
}
