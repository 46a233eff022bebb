use std::sync::Arc;

use async_trait::async_trait;
use model::{itinerary::Itinerary, progress::ProgressState};
use utility::id::Id;

use super::{GuestProgressStore, Identity, ProgressStore, RemoteProgress, StoreError};

/// Sends authenticated progress to the backend and keeps guest progress in
/// memory.
#[derive(Clone)]
pub struct ScopedProgressStore {
    remote: Arc<dyn RemoteProgress>,
    guest: GuestProgressStore,
}

impl ScopedProgressStore {
    pub fn new(remote: Arc<dyn RemoteProgress>, guest: GuestProgressStore) -> Self {
        Self { remote, guest }
    }

    pub fn guest(&self) -> &GuestProgressStore {
        &self.guest
    }
}

#[async_trait]
impl ProgressStore for ScopedProgressStore {
    async fn load(
        &self,
        itinerary: &Id<Itinerary>,
        identity: &Identity,
    ) -> Result<Option<ProgressState>, StoreError> {
        match identity {
            Identity::Authenticated(credentials) => {
                self.remote.fetch(itinerary, credentials).await
            }
            Identity::Guest(_) => self.guest.load(itinerary, identity).await,
        }
    }

    async fn save(
        &self,
        itinerary: &Id<Itinerary>,
        identity: &Identity,
        state: &ProgressState,
    ) -> Result<(), StoreError> {
        match identity {
            Identity::Authenticated(credentials) => {
                self.remote.upsert(itinerary, credentials, state).await
            }
            Identity::Guest(_) => self.guest.save(itinerary, identity, state).await,
        }
    }

    async fn clear(
        &self,
        itinerary: &Id<Itinerary>,
        identity: &Identity,
    ) -> Result<(), StoreError> {
        match identity {
            // the backend has no delete, an empty record reads as no progress
            Identity::Authenticated(credentials) => {
                self.remote
                    .upsert(itinerary, credentials, &ProgressState::default())
                    .await
            }
            Identity::Guest(_) => self.guest.clear(itinerary, identity).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexSet;

    use super::*;
    use crate::progress::{tests::MemoryRemote, Credentials, GuestSession};

    fn state() -> ProgressState {
        ProgressState {
            optimized_order: vec![Id::from("A"), Id::from("B"), Id::from("C")],
            current_index: 1,
            visited: IndexSet::from([Id::from("A")]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn authenticated_progress_goes_to_the_backend() {
        let remote = Arc::new(MemoryRemote::default());
        let store = ScopedProgressStore::new(remote.clone(), GuestProgressStore::new());
        let user = Identity::Authenticated(Credentials::new("token"));
        let itinerary = Id::from("intramuros");

        store.save(&itinerary, &user, &state()).await.unwrap();
        assert_eq!(remote.records.lock().unwrap().get(&itinerary), Some(&state()));
        assert_eq!(store.load(&itinerary, &user).await.unwrap(), Some(state()));
    }

    #[tokio::test]
    async fn guest_progress_never_reaches_the_backend() {
        let remote = Arc::new(MemoryRemote::default());
        let store = ScopedProgressStore::new(remote.clone(), GuestProgressStore::new());
        let guest = Identity::Guest(GuestSession::new());
        let itinerary = Id::from("intramuros");

        store.save(&itinerary, &guest, &state()).await.unwrap();
        assert_eq!(*remote.upserts.lock().unwrap(), 0);
        assert_eq!(store.load(&itinerary, &guest).await.unwrap(), Some(state()));
    }

    #[tokio::test]
    async fn clearing_authenticated_progress_posts_an_empty_record() {
        let remote = Arc::new(MemoryRemote::default());
        let store = ScopedProgressStore::new(remote.clone(), GuestProgressStore::new());
        let user = Identity::Authenticated(Credentials::new("token"));
        let itinerary = Id::from("intramuros");

        store.save(&itinerary, &user, &state()).await.unwrap();
        store.clear(&itinerary, &user).await.unwrap();
        let cleared = store.load(&itinerary, &user).await.unwrap().unwrap();
        assert!(!cleared.has_progress());
        assert!(cleared.optimized_order.is_empty());
    }

    #[tokio::test]
    async fn backend_failures_surface_as_remote_errors() {
        let remote = Arc::new(MemoryRemote::default());
        *remote.offline.lock().unwrap() = true;
        let store = ScopedProgressStore::new(remote, GuestProgressStore::new());
        let user = Identity::Authenticated(Credentials::new("token"));
        assert!(matches!(
            store.save(&Id::from("intramuros"), &user, &state()).await,
            Err(StoreError::Remote(_))
        ));
    }
}
