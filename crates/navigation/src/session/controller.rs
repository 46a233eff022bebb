use std::{any::Any, sync::Arc};

use actors::{
    actor::{Actor, SupervisionStrategy},
    actor_ref::WeakActorRef,
    handler::Handler,
};
use async_trait::async_trait;
use model::{
    geo::UserPosition, itinerary::Itinerary, progress::ProgressState,
    route::NavigationSnapshot, site::Site, transport::TransportMode, WithId,
};
use tokio::{sync::mpsc, task::AbortHandle};

use super::{
    events::SessionEvent,
    messages::{
        ChangeMode, End, Next, PositionLost, PositionUpdate, Prev, Restart, Resume,
        RouteResolved, SessionSnapshot, Skip, Snapshot, Start,
    },
    SessionError, SessionPhase, SessionParts,
};
use crate::{
    announcer::Announcer,
    arrival::{Arrival, ArrivalDetector},
    navigator::{Navigator, RoutePlanner},
    optimizer::optimize,
    progress::{Identity, ProgressStore, ProgressWriter},
    steps::{current_step, StepSynchronizer},
};

/// Single owner of the progress of one navigation session. Every mutation of
/// the progress and the route goes through its mailbox.
pub struct SessionController {
    itinerary: WithId<Itinerary>,
    identity: Identity,
    store: Arc<dyn ProgressStore>,
    writer: Option<ProgressWriter>,
    navigator: Navigator,
    arrival: ArrivalDetector,
    steps: StepSynchronizer,
    announcer: Arc<dyn Announcer>,
    events: mpsc::UnboundedSender<SessionEvent>,
    this: Option<WeakActorRef<Self>>,
    route_task: Option<AbortHandle>,
    phase: SessionPhase,
    progress: ProgressState,
    mode: TransportMode,
    position: Option<UserPosition>,
    nearby: bool,
}

impl SessionController {
    pub fn new(parts: &SessionParts, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            itinerary: parts.itinerary.clone(),
            identity: parts.identity.clone(),
            store: parts.store.clone(),
            writer: None,
            navigator: Navigator::new(RoutePlanner::new(
                parts.directions.clone(),
                parts.config.boundary.clone(),
            )),
            arrival: ArrivalDetector::new(parts.config.arrival_radius_m),
            steps: StepSynchronizer::new(),
            announcer: parts.announcer.clone(),
            events,
            this: None,
            route_task: None,
            phase: SessionPhase::NotStarted,
            progress: ProgressState::default(),
            mode: parts.mode,
            position: None,
            nearby: false,
        }
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            log::debug!("no one listens to session events any more");
        }
    }

    fn persist(&self) {
        if let Some(writer) = &self.writer {
            writer.save(self.progress.clone());
        }
    }

    fn active_site(&self) -> Option<WithId<Site>> {
        match self.phase {
            SessionPhase::InProgress(_) => self
                .progress
                .current_site()
                .and_then(|id| self.itinerary.content.site(id))
                .cloned(),
            _ => None,
        }
    }

    fn in_progress(&self) -> Result<usize, SessionError> {
        match self.phase {
            SessionPhase::InProgress(index) => Ok(index),
            SessionPhase::Completed => Err(SessionError::Completed),
            SessionPhase::AwaitingChoice => Err(SessionError::AwaitingChoice),
            SessionPhase::NotStarted | SessionPhase::AwaitingPosition => {
                Err(SessionError::NotStarted)
            }
        }
    }

    /// Optimizes a new order around the current position, leaving visited and
    /// skipped sites at the end.
    fn begin(&mut self) -> SessionPhase {
        let Some(position) = self.position else {
            log::info!(
                "waiting for a position fix before planning {}",
                self.itinerary.id
            );
            self.phase = SessionPhase::AwaitingPosition;
            return self.phase;
        };
        if self.itinerary.content.sites.is_empty() {
            log::warn!("itinerary {} has no sites", self.itinerary.id);
            self.phase = SessionPhase::NotStarted;
            return self.phase;
        }

        let excluded = self.progress.excluded();
        let order = optimize(&position.coordinate(), &self.itinerary.content.sites, &excluded);
        log::info!(
            "planned {} sites of {} ({} excluded)",
            order.len(),
            self.itinerary.id,
            excluded.len()
        );
        self.progress = ProgressState {
            optimized_order: order.clone(),
            current_index: 0,
            visited: std::mem::take(&mut self.progress.visited),
            skipped: std::mem::take(&mut self.progress.skipped),
            last_position: Some(position.truncated()),
        };
        self.emit(SessionEvent::Started { order });
        self.settle()
    }

    /// Derives the phase from the progress, saves and enters the active site.
    fn settle(&mut self) -> SessionPhase {
        if self.progress.is_complete() {
            self.progress.current_index = self.progress.optimized_order.len();
            self.phase = SessionPhase::Completed;
        } else {
            self.phase = SessionPhase::InProgress(self.progress.current_index);
        }
        self.persist();
        self.enter_site();
        self.phase
    }

    fn advance(&mut self) -> SessionPhase {
        self.progress.current_index += 1;
        self.settle()
    }

    fn mark_visited(&mut self, site: &WithId<Site>) {
        self.progress.skipped.shift_remove(&site.id);
        if self.progress.visited.insert(site.id.clone()) {
            self.emit(SessionEvent::SiteVisited(site.id.clone()));
        }
    }

    fn enter_site(&mut self) {
        self.abort_route();
        self.navigator.reset();
        self.steps.reset();
        self.set_nearby(false);
        match self.phase {
            SessionPhase::Completed => {
                log::info!("completed {}", self.itinerary.id);
                self.emit(SessionEvent::Completed);
            }
            SessionPhase::InProgress(index) => {
                let Some(site) = self.active_site() else {
                    return;
                };
                self.emit(SessionEvent::ActiveSiteChanged {
                    index,
                    site: site.id,
                });
                if !self.check_arrival() {
                    self.request_route();
                }
            }
            _ => {}
        }
    }

    fn set_nearby(&mut self, nearby: bool) {
        if self.nearby != nearby {
            self.nearby = nearby;
            self.emit(SessionEvent::NearbyChanged(nearby));
        }
    }

    /// Returns whether the session moved on to another site.
    fn check_arrival(&mut self) -> bool {
        let (Some(position), Some(active)) = (self.position, self.active_site()) else {
            return false;
        };
        match self.arrival.evaluate(&position, &active, &self.progress) {
            Arrival::AutoVisit => {
                log::info!("arrived at {}, the last open site", active.id);
                self.announcer
                    .announce(&format!("You have arrived at {}", active.content.name));
                self.mark_visited(&active);
                self.advance();
                true
            }
            Arrival::Nearby => {
                if !self.nearby {
                    self.set_nearby(true);
                    self.announcer
                        .announce(&format!("You have arrived at {}", active.content.name));
                    self.emit(SessionEvent::ArrivedAtSite(active.id));
                }
                false
            }
            Arrival::Away => {
                self.set_nearby(false);
                false
            }
        }
    }

    /// Requests a route to the active site. The result comes back as
    /// [`RouteResolved`] and replaces the route only if no newer request was
    /// issued meanwhile.
    fn request_route(&mut self) {
        let (Some(position), Some(target), Some(this)) =
            (self.position, self.active_site(), self.this.clone())
        else {
            return;
        };
        self.abort_route();
        let request = self.navigator.issue();
        let planner = self.navigator.planner();
        let mode = self.mode;
        let task = tokio::spawn(async move {
            let snapshot = planner
                .build_route(position.coordinate(), &target, mode)
                .await;
            let Some(session) = this.upgrade() else {
                return;
            };
            if session.tell(RouteResolved { request, snapshot }).await.is_err() {
                log::debug!("session ended before route {} resolved", request);
            }
        });
        self.route_task = Some(task.abort_handle());
    }

    fn abort_route(&mut self) {
        if let Some(task) = self.route_task.take() {
            task.abort();
        }
    }

    fn sync_steps(&mut self, position: &UserPosition) {
        let changed = {
            let Some(route) = self.navigator.current_mut() else {
                return;
            };
            route.current_step_index = current_step(position, &route.steps);
            self.steps
                .sync(position, &route.steps)
                .and_then(|index| route.steps.get(index).map(|step| (index, step.instruction.clone())))
        };
        if let Some((index, instruction)) = changed {
            self.announcer.announce(&instruction);
            self.emit(SessionEvent::StepChanged { index, instruction });
        }
    }

    fn every_site_visited(&self) -> bool {
        self.progress.is_complete()
            || self
                .itinerary
                .content
                .sites
                .iter()
                .all(|site| self.progress.visited.contains(&site.id))
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            progress: self.progress.clone(),
            mode: self.mode,
            is_nearby: self.nearby,
            position: self.position,
            route: self.navigator.current().cloned(),
        }
    }
}

#[async_trait]
impl Actor for SessionController {
    async fn on_start(&mut self, this: WeakActorRef<Self>) {
        self.this = Some(this);
        self.writer = Some(ProgressWriter::spawn(
            self.store.clone(),
            self.itinerary.id.clone(),
            self.identity.clone(),
        ));
    }

    async fn on_stop(&mut self) {
        self.abort_route();
        if let Some(writer) = self.writer.take() {
            writer.flush().await;
        }
    }

    fn on_fail(&mut self, _: Box<dyn Any + Send>) -> SupervisionStrategy {
        // the progress lives in this actor, a restart would lose it
        SupervisionStrategy::Resume
    }
}

#[async_trait]
impl Handler<Start> for SessionController {
    async fn handle(&mut self, message: Start) -> SessionPhase {
        if self.phase != SessionPhase::NotStarted {
            return self.phase;
        }
        self.position = message.position;

        let stored = match self.store.load(&self.itinerary.id, &self.identity).await {
            Ok(stored) => stored,
            Err(why) => {
                log::warn!(
                    "could not load progress of {}, starting fresh: {}",
                    self.itinerary.id,
                    why
                );
                None
            }
        };
        let site_ids = self.itinerary.content.site_ids();
        self.progress = stored
            .map(|state| state.normalized(&site_ids))
            .unwrap_or_default();

        if self.progress.has_progress() {
            self.phase = SessionPhase::AwaitingChoice;
            self.emit(SessionEvent::ResumePrompt {
                visited: self.progress.visited.len(),
                skipped: self.progress.skipped.len(),
                total: site_ids.len(),
            });
            return self.phase;
        }
        self.begin()
    }
}

#[async_trait]
impl Handler<Resume> for SessionController {
    async fn handle(&mut self, _: Resume) -> Result<SessionPhase, SessionError> {
        match self.phase {
            SessionPhase::AwaitingChoice => {}
            SessionPhase::NotStarted => return Err(SessionError::NotStarted),
            phase => return Ok(phase),
        }
        if self.progress.optimized_order.is_empty() {
            // the saved order did not match the itinerary any more
            return Ok(self.begin());
        }
        log::info!(
            "resuming {} at site {}",
            self.itinerary.id,
            self.progress.current_index
        );
        Ok(self.settle())
    }
}

#[async_trait]
impl Handler<Restart> for SessionController {
    async fn handle(&mut self, _: Restart) -> Result<SessionPhase, SessionError> {
        let start_over = match self.phase {
            SessionPhase::NotStarted => return Err(SessionError::NotStarted),
            SessionPhase::Completed => true,
            // a finished tour loaded from the store
            SessionPhase::AwaitingChoice => self.every_site_visited(),
            _ => false,
        };
        if start_over {
            self.progress = ProgressState::default();
            if let Some(writer) = &self.writer {
                writer.clear();
            }
        }
        Ok(self.begin())
    }
}

#[async_trait]
impl Handler<PositionUpdate> for SessionController {
    async fn handle(&mut self, message: PositionUpdate) {
        let position = message.0;
        self.position = Some(position);
        self.progress.last_position = Some(position.truncated());
        match self.phase {
            SessionPhase::AwaitingPosition => {
                self.begin();
            }
            SessionPhase::InProgress(_) => {
                if self.check_arrival() {
                    return;
                }
                self.request_route();
                self.sync_steps(&position);
            }
            _ => {}
        }
    }
}

#[async_trait]
impl Handler<PositionLost> for SessionController {
    async fn handle(&mut self, message: PositionLost) {
        log::warn!("position lost: {}", message.0);
        self.emit(SessionEvent::PositionUnavailable(message.0));
    }
}

#[async_trait]
impl Handler<ChangeMode> for SessionController {
    async fn handle(&mut self, message: ChangeMode) -> Option<NavigationSnapshot> {
        let mode = message.0;
        if mode == self.mode {
            return self.navigator.current().cloned();
        }
        self.mode = mode;
        let optimistic = self.navigator.retime(mode).cloned();
        if let Some(snapshot) = &optimistic {
            self.emit(SessionEvent::RouteUpdated(snapshot.clone()));
        }
        self.request_route();
        optimistic
    }
}

#[async_trait]
impl Handler<Next> for SessionController {
    async fn handle(&mut self, _: Next) -> Result<SessionPhase, SessionError> {
        self.in_progress()?;
        if let Some(site) = self.active_site() {
            self.mark_visited(&site);
        }
        Ok(self.advance())
    }
}

#[async_trait]
impl Handler<Skip> for SessionController {
    async fn handle(&mut self, _: Skip) -> Result<SessionPhase, SessionError> {
        self.in_progress()?;
        if let Some(site) = self.active_site() {
            if !self.progress.visited.contains(&site.id)
                && self.progress.skipped.insert(site.id.clone())
            {
                self.emit(SessionEvent::SiteSkipped(site.id));
            }
        }
        Ok(self.advance())
    }
}

#[async_trait]
impl Handler<Prev> for SessionController {
    async fn handle(&mut self, _: Prev) -> Result<SessionPhase, SessionError> {
        let index = self.in_progress()?;
        if index == 0 {
            return Ok(self.phase);
        }
        self.progress.current_index = index - 1;
        Ok(self.settle())
    }
}

#[async_trait]
impl Handler<RouteResolved> for SessionController {
    async fn handle(&mut self, message: RouteResolved) {
        if self
            .navigator
            .accept(message.request, message.snapshot)
            .is_none()
        {
            return;
        }
        if let Some(position) = self.position {
            self.sync_steps(&position);
        }
        if let Some(route) = self.navigator.current().cloned() {
            self.emit(SessionEvent::RouteUpdated(route));
        }
    }
}

#[async_trait]
impl Handler<Snapshot> for SessionController {
    async fn handle(&mut self, _: Snapshot) -> SessionSnapshot {
        self.snapshot()
    }
}

#[async_trait]
impl Handler<End> for SessionController {
    async fn handle(&mut self, _: End) -> ProgressState {
        self.abort_route();
        self.navigator.reset();
        self.announcer.cancel();
        if let Some(writer) = self.writer.take() {
            writer.save(self.progress.clone());
            writer.flush().await;
        }
        log::info!("ended session on {}", self.itinerary.id);
        self.progress.clone()
    }
}
