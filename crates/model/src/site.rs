use serde::{Deserialize, Serialize};
use utility::id::HasId;

use crate::{geo::Coordinate, ExampleData};

/// A point of interest of an itinerary. Owned by the content service and never
/// modified by the navigation core.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub name: String,
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub media: Vec<MediaRef>,
    pub fee_info: Option<String>,
    #[serde(default)]
    pub status: SiteStatus,
}

impl Site {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

impl HasId for Site {
    type IdType = String;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub url: String,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    #[default]
    Active,
    Inactive,
    #[serde(other)]
    Unknown,
}

impl ExampleData for Site {
    fn example_data() -> Self {
        Site {
            name: "Fort Santiago".to_owned(),
            description: Some("Citadel at the mouth of the Pasig river.".to_owned()),
            latitude: 14.5953,
            longitude: 120.9700,
            media: vec![],
            fee_info: Some("PHP 75".to_owned()),
            status: SiteStatus::Active,
        }
    }
}
