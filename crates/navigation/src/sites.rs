use std::error::Error;

use async_trait::async_trait;
use model::itinerary::Itinerary;
use utility::id::Id;

pub type SourceError = Box<dyn Error + Send + Sync>;

/// Read-only access to the content service owning itineraries and sites.
#[async_trait]
pub trait SiteSource: Send + Sync {
    async fn itinerary(&self, id: &Id<Itinerary>) -> Result<Itinerary, SourceError>;
}
