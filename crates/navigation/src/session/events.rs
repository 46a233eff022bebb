use model::{route::NavigationSnapshot, site::Site};
use utility::id::Id;

use crate::tracker::PositionError;

/// What the UI gets told while a session runs.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Saved progress exists; answer with `Resume` or `Restart`.
    ResumePrompt {
        visited: usize,
        skipped: usize,
        total: usize,
    },
    Started {
        order: Vec<Id<Site>>,
    },
    ActiveSiteChanged {
        index: usize,
        site: Id<Site>,
    },
    RouteUpdated(NavigationSnapshot),
    StepChanged {
        index: usize,
        instruction: String,
    },
    NearbyChanged(bool),
    /// Within the geofence of a site that waits for confirmation. The UI
    /// shows the site summary.
    ArrivedAtSite(Id<Site>),
    SiteVisited(Id<Site>),
    SiteSkipped(Id<Site>),
    Completed,
    PositionUnavailable(PositionError),
}
