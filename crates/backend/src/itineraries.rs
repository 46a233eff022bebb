use async_trait::async_trait;
use model::{
    itinerary::Itinerary,
    site::{MediaRef, Site, SiteStatus},
    WithId,
};
use navigation::sites::{SiteSource, SourceError};
use serde::Deserialize;
use utility::{
    id::Id,
    serde::{lenient_f64, lenient_string},
};

use crate::BackendClient;

/// `GET /itineraries/{id}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryDto {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub sites: Vec<SiteDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDto {
    #[serde(deserialize_with = "lenient_string::deserialize")]
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_f64::deserialize")]
    pub latitude: f64,
    #[serde(deserialize_with = "lenient_f64::deserialize")]
    pub longitude: f64,
    #[serde(default)]
    pub media: Vec<MediaRef>,
    pub fee_info: Option<String>,
    #[serde(default)]
    pub status: SiteStatus,
}

impl From<SiteDto> for WithId<Site> {
    fn from(dto: SiteDto) -> Self {
        WithId::new(
            Id::new(dto.id),
            Site {
                name: dto.name,
                description: dto.description,
                latitude: dto.latitude,
                longitude: dto.longitude,
                media: dto.media,
                fee_info: dto.fee_info,
                status: dto.status,
            },
        )
    }
}

impl From<ItineraryDto> for Itinerary {
    fn from(dto: ItineraryDto) -> Self {
        Itinerary {
            name: dto.name,
            description: dto.description,
            sites: dto.sites.into_iter().map(WithId::from).collect(),
        }
    }
}

#[async_trait]
impl SiteSource for BackendClient {
    async fn itinerary(&self, id: &Id<Itinerary>) -> Result<Itinerary, SourceError> {
        let dto: Option<ItineraryDto> = self.get(&format!("itineraries/{}", id), None).await?;
        match dto {
            Some(dto) => Ok(dto.into()),
            None => Err(format!("itinerary {} does not exist", id).into()),
        }
    }
}
