use std::sync::Arc;

use model::{itinerary::Itinerary, progress::ProgressState};
use tokio::{sync::watch, task::JoinHandle};
use utility::id::Id;

use super::{Identity, ProgressStore};

#[derive(Debug, Clone, PartialEq)]
enum PendingWrite {
    Save(ProgressState),
    Clear,
}

/// Persists progress in the background so mutations never wait on the store.
///
/// Only the newest pending write is kept: a slow backend sees the latest state
/// once it is free again instead of every intermediate one. A failed write is
/// logged and left alone; the next mutation brings a fresh attempt.
pub struct ProgressWriter {
    pending: watch::Sender<Option<PendingWrite>>,
    task: JoinHandle<()>,
}

impl ProgressWriter {
    pub fn spawn(
        store: Arc<dyn ProgressStore>,
        itinerary: Id<Itinerary>,
        identity: Identity,
    ) -> Self {
        let (pending, mut rx) = watch::channel(None);
        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let write = rx.borrow_and_update().clone();
                let result = match &write {
                    Some(PendingWrite::Save(state)) => store.save(&itinerary, &identity, state).await,
                    Some(PendingWrite::Clear) => store.clear(&itinerary, &identity).await,
                    None => continue,
                };
                match result {
                    Ok(()) => log::debug!("persisted progress of {}", itinerary),
                    Err(why) => log::warn!(
                        "could not persist progress of {} for {}: {}",
                        itinerary,
                        identity,
                        why
                    ),
                }
            }
        });
        Self { pending, task }
    }

    pub fn save(&self, state: ProgressState) {
        self.pending.send_replace(Some(PendingWrite::Save(state)));
    }

    pub fn clear(&self) {
        self.pending.send_replace(Some(PendingWrite::Clear));
    }

    /// Writes whatever is still pending and stops the task.
    pub async fn flush(self) {
        let Self { pending, task } = self;
        drop(pending);
        if let Err(why) = task.await {
            log::warn!("progress writer failed: {}", why);
        }
    }
}
