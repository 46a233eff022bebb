use std::{fs::File, io::BufReader, path::PathBuf};

use async_trait::async_trait;
use model::itinerary::Itinerary;
use navigation::{
    announcer::Announcer,
    directions::{DirectionsProvider, DirectionsRequest, DirectionsResponse, ProviderError},
    sites::{SiteSource, SourceError},
};
use utility::id::Id;

/// Itineraries stored as JSON files next to the trace. The id is only logged.
pub struct FileSites {
    path: PathBuf,
}

impl FileSites {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl SiteSource for FileSites {
    async fn itinerary(&self, id: &Id<Itinerary>) -> Result<Itinerary, SourceError> {
        log::info!("Reading itinerary {} from {}.", id, self.path.display());
        let reader = BufReader::new(File::open(&self.path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Writes announcements to the log instead of a speech engine.
pub struct LogAnnouncer;

impl Announcer for LogAnnouncer {
    fn announce(&self, text: &str) {
        log::info!("🔊 {}", text);
    }
}

/// Used when no directions credentials are configured. Every request fails, so
/// every route is a straight line.
pub struct NoDirections;

#[async_trait]
impl DirectionsProvider for NoDirections {
    async fn directions(
        &self,
        _request: &DirectionsRequest,
    ) -> Result<DirectionsResponse, ProviderError> {
        Err("no directions provider configured".into())
    }
}
