use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use model::{itinerary::Itinerary, progress::ProgressState};
use tokio::sync::RwLock;
use utility::id::Id;

use super::{GuestSession, Identity, ProgressStore, StoreError};

type Key = (GuestSession, Id<Itinerary>);

/// Progress of guests, kept in memory for the lifetime of their session.
#[derive(Debug, Clone, Default)]
pub struct GuestProgressStore {
    states: Arc<RwLock<HashMap<Key, ProgressState>>>,
}

impl GuestProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets everything the guest session saved.
    pub async fn end_session(&self, session: GuestSession) {
        let mut states = self.states.write().await;
        let before = states.len();
        states.retain(|(owner, _), _| *owner != session);
        log::debug!(
            "dropped {} progress records of {}",
            before - states.len(),
            session
        );
    }
}

fn guest_key(itinerary: &Id<Itinerary>, identity: &Identity) -> Result<Key, StoreError> {
    match identity {
        Identity::Guest(session) => Ok((*session, itinerary.clone())),
        Identity::Authenticated(_) => Err(StoreError::Unauthorized),
    }
}

#[async_trait]
impl ProgressStore for GuestProgressStore {
    async fn load(
        &self,
        itinerary: &Id<Itinerary>,
        identity: &Identity,
    ) -> Result<Option<ProgressState>, StoreError> {
        let key = guest_key(itinerary, identity)?;
        Ok(self.states.read().await.get(&key).cloned())
    }

    async fn save(
        &self,
        itinerary: &Id<Itinerary>,
        identity: &Identity,
        state: &ProgressState,
    ) -> Result<(), StoreError> {
        let key = guest_key(itinerary, identity)?;
        self.states.write().await.insert(key, state.clone());
        Ok(())
    }

    async fn clear(
        &self,
        itinerary: &Id<Itinerary>,
        identity: &Identity,
    ) -> Result<(), StoreError> {
        let key = guest_key(itinerary, identity)?;
        self.states.write().await.remove(&key);
        Ok(())
    }
}
