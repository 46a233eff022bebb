use itertools::Itertools;
use model::{geo::UserPosition, route::DirectionStep};

/// Index of the step whose maneuver is closest to `position`, by squared
/// planar distance. `None` for an empty step list.
pub fn current_step(position: &UserPosition, steps: &[DirectionStep]) -> Option<usize> {
    let here = position.coordinate();
    steps.iter().position_min_by(|a, b| {
        here.planar_distance_squared(&a.maneuver_location)
            .total_cmp(&here.planar_distance_squared(&b.maneuver_location))
    })
}

/// Tracks the reported step and only signals when it changes.
#[derive(Debug, Default)]
pub struct StepSynchronizer {
    reported: Option<usize>,
}

impl StepSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reported(&self) -> Option<usize> {
        self.reported
    }

    /// Returns the new index if it differs from the one reported last.
    pub fn sync(&mut self, position: &UserPosition, steps: &[DirectionStep]) -> Option<usize> {
        let index = current_step(position, steps);
        if index == self.reported {
            return None;
        }
        self.reported = index;
        index
    }

    pub fn reset(&mut self) {
        self.reported = None;
    }
}
