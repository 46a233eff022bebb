use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{site::Site, WithId};

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub sites: Vec<WithId<Site>>,
}

impl Itinerary {
    pub fn site(&self, id: &Id<Site>) -> Option<&WithId<Site>> {
        self.sites.iter().find(|site| &site.id == id)
    }

    pub fn site_ids(&self) -> Vec<Id<Site>> {
        self.sites.iter().map(|site| site.id.clone()).collect()
    }
}

impl HasId for Itinerary {
    type IdType = String;
}
