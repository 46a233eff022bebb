//! A navigation session: the controller actor plus the position watch that
//! feeds it.

use std::{fmt, sync::Arc};

use actors::{actor::ActorError, actor_ref::ActorRef};
use model::{
    geo::Coordinate, itinerary::Itinerary, progress::ProgressState,
    route::NavigationSnapshot, transport::TransportMode, WithId,
};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    announcer::Announcer,
    config::NavigationConfig,
    directions::DirectionsProvider,
    progress::{Identity, ProgressStore},
    tracker::{
        acquire_initial_fix, routing_channel, GeoTracker, PositionSource, RoutingUpdate,
        TrackerHandle,
    },
};

pub mod controller;
pub mod events;
pub mod messages;

pub use controller::SessionController;
pub use events::SessionEvent;
pub use messages::SessionSnapshot;

use messages::{
    ChangeMode, End, Next, PositionLost, PositionUpdate, Prev, Restart, Resume, Skip,
    Snapshot, Start,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NotStarted,
    /// Saved progress was found and the user has not chosen yet.
    AwaitingChoice,
    /// Planning waits for the first position fix.
    AwaitingPosition,
    InProgress(usize),
    Completed,
}

/// A transition the session refused. The session itself keeps running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    NotStarted,
    Completed,
    AwaitingChoice,
    ActorUnavailable(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "the tour has not started"),
            Self::Completed => write!(f, "the tour is already completed"),
            Self::AwaitingChoice => write!(f, "choose to resume or restart first"),
            Self::ActorUnavailable(why) => write!(f, "session unavailable: {}", why),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<ActorError> for SessionError {
    fn from(why: ActorError) -> Self {
        Self::ActorUnavailable(why.to_string())
    }
}

/// Everything a session is built from.
#[derive(Clone)]
pub struct SessionParts {
    pub itinerary: WithId<Itinerary>,
    pub identity: Identity,
    pub store: Arc<dyn ProgressStore>,
    pub directions: Arc<dyn DirectionsProvider>,
    pub announcer: Arc<dyn Announcer>,
    pub config: NavigationConfig,
    pub mode: TransportMode,
}

pub struct NavigationSession {
    controller: ActorRef<SessionController>,
    tracker: TrackerHandle,
    forwarder: JoinHandle<()>,
}

impl NavigationSession {
    /// Spawns the controller, waits for the first fix and starts watching the
    /// position. Without a fix the session still starts and plans once a
    /// position arrives.
    pub async fn start(
        parts: SessionParts,
        source: &dyn PositionSource,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>), SessionError> {
        let (events_tx, events) = mpsc::unbounded_channel();
        let timeout = parts.config.initial_fix_timeout;
        let tracker_config = parts.config.tracker;

        let factory_events = events_tx.clone();
        let controller = actors::run(move || SessionController::new(&parts, factory_events.clone()));

        let position = match acquire_initial_fix(source, timeout).await {
            Ok(position) => Some(position),
            Err(why) => {
                log::warn!("no initial position: {}", why);
                // receiver is still in scope
                let _ = events_tx.send(SessionEvent::PositionUnavailable(why));
                None
            }
        };
        controller.ask(Start { position }).await?;

        let (routing_tx, routing_rx) = routing_channel();
        let tracker = GeoTracker::new(tracker_config).spawn(
            source,
            routing_tx,
            CancellationToken::new(),
        );
        let forwarder = tokio::spawn(forward_positions(routing_rx, controller.clone()));

        Ok((
            Self {
                controller,
                tracker,
                forwarder,
            },
            events,
        ))
    }

    pub async fn resume(&self) -> Result<SessionPhase, SessionError> {
        self.controller.ask(Resume).await?
    }

    pub async fn restart(&self) -> Result<SessionPhase, SessionError> {
        self.controller.ask(Restart).await?
    }

    pub async fn next(&self) -> Result<SessionPhase, SessionError> {
        self.controller.ask(Next).await?
    }

    pub async fn skip(&self) -> Result<SessionPhase, SessionError> {
        self.controller.ask(Skip).await?
    }

    pub async fn prev(&self) -> Result<SessionPhase, SessionError> {
        self.controller.ask(Prev).await?
    }

    pub async fn change_mode(
        &self,
        mode: TransportMode,
    ) -> Result<Option<NavigationSnapshot>, SessionError> {
        Ok(self.controller.ask(ChangeMode(mode)).await?)
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        Ok(self.controller.ask(Snapshot).await?)
    }

    pub fn headings(&self) -> watch::Receiver<Option<f64>> {
        self.tracker.headings.clone()
    }

    pub fn camera(&self) -> watch::Receiver<Option<Coordinate>> {
        self.tracker.camera.clone()
    }

    /// Unsubscribes from the position source, drops the in-flight route
    /// request and persists the final progress.
    pub async fn end(self) -> Result<ProgressState, SessionError> {
        let Self {
            controller,
            tracker,
            forwarder,
        } = self;
        tracker.shutdown().await;
        if let Err(why) = forwarder.await {
            log::warn!("position forwarder failed: {}", why);
        }
        let progress = controller.ask(End).await?;
        controller.stop();
        Ok(progress)
    }
}

async fn forward_positions(
    mut updates: mpsc::Receiver<RoutingUpdate>,
    controller: ActorRef<SessionController>,
) {
    while let Some(update) = updates.recv().await {
        let sent = match update {
            RoutingUpdate::Position(position) => controller.tell(PositionUpdate(position)).await,
            RoutingUpdate::Unavailable(why) => controller.tell(PositionLost(why)).await,
        };
        if sent.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use model::{geo::UserPosition, site::Site, ExampleData};
    use utility::id::Id;

    use super::*;
    use crate::{
        navigator::tests::FixedProvider,
        progress::{GuestProgressStore, GuestSession},
        tracker::{tests::ScriptedSource, PositionError, SensorEvent},
    };

    struct Mute;

    impl Announcer for Mute {
        fn announce(&self, _: &str) {}
    }

    fn site(id: &str, latitude: f64, longitude: f64) -> WithId<Site> {
        WithId::new(
            Id::from(id),
            Site {
                latitude,
                longitude,
                ..Site::example_data()
            },
        )
    }

    fn parts(store: &GuestProgressStore, identity: &Identity) -> SessionParts {
        SessionParts {
            itinerary: WithId::new(
                Id::from("intramuros"),
                Itinerary {
                    name: "Intramuros walk".to_owned(),
                    description: None,
                    sites: vec![site("b", 14.5920, 120.9720), site("a", 14.5900, 120.9700)],
                },
            ),
            identity: identity.clone(),
            store: Arc::new(store.clone()),
            directions: Arc::new(FixedProvider::failing()),
            announcer: Arc::new(Mute),
            config: NavigationConfig::default(),
            mode: TransportMode::Walking,
        }
    }

    #[tokio::test]
    async fn first_fix_plans_and_end_persists() {
        let store = GuestProgressStore::new();
        let identity = Identity::Guest(GuestSession::new());
        let source = ScriptedSource(vec![SensorEvent::Position(UserPosition::new(
            14.5890,
            120.9690,
            Utc::now(),
        ))]);

        let (session, _events) = NavigationSession::start(parts(&store, &identity), &source)
            .await
            .unwrap();
        assert_eq!(
            session.snapshot().await.unwrap().phase,
            SessionPhase::InProgress(0)
        );
        assert_eq!(session.next().await, Ok(SessionPhase::InProgress(1)));

        let progress = session.end().await.unwrap();
        assert_eq!(progress.optimized_order, vec![Id::from("a"), Id::from("b")]);
        let saved = store.load(&Id::from("intramuros"), &identity).await.unwrap();
        assert_eq!(saved, Some(progress));
    }

    #[tokio::test]
    async fn missing_fix_is_reported_and_planning_waits() {
        let store = GuestProgressStore::new();
        let identity = Identity::Guest(GuestSession::new());
        let source = ScriptedSource(vec![SensorEvent::Error(PositionError::PermissionDenied)]);

        let (session, mut events) = NavigationSession::start(parts(&store, &identity), &source)
            .await
            .unwrap();
        assert_eq!(
            events.recv().await,
            Some(SessionEvent::PositionUnavailable(PositionError::PermissionDenied))
        );
        assert_eq!(
            session.snapshot().await.unwrap().phase,
            SessionPhase::AwaitingPosition
        );
        assert_eq!(session.skip().await, Err(SessionError::NotStarted));
        session.end().await.unwrap();
    }
}
