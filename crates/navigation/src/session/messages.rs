use actors::handler::Message;
use model::{
    geo::UserPosition, progress::ProgressState, route::NavigationSnapshot,
    transport::TransportMode,
};

use super::{SessionError, SessionPhase};
use crate::{navigator::RequestId, tracker::PositionError};

/// Loads saved progress and either prompts or starts right away.
pub struct Start {
    pub position: Option<UserPosition>,
}

impl Message for Start {
    type Response = SessionPhase;
}

/// Continues the saved tour as it was.
pub struct Resume;

impl Message for Resume {
    type Response = Result<SessionPhase, SessionError>;
}

/// Re-optimizes the tour from the current position.
pub struct Restart;

impl Message for Restart {
    type Response = Result<SessionPhase, SessionError>;
}

pub struct PositionUpdate(pub UserPosition);

impl Message for PositionUpdate {
    type Response = ();
}

pub struct PositionLost(pub PositionError);

impl Message for PositionLost {
    type Response = ();
}

/// Returns the optimistically re-timed route, if one is known.
pub struct ChangeMode(pub TransportMode);

impl Message for ChangeMode {
    type Response = Option<NavigationSnapshot>;
}

/// Marks the active site visited ("mark done") and moves on.
pub struct Next;

impl Message for Next {
    type Response = Result<SessionPhase, SessionError>;
}

/// Moves on without visiting the active site.
pub struct Skip;

impl Message for Skip {
    type Response = Result<SessionPhase, SessionError>;
}

/// Goes back one site. Visited and skipped marks stay.
pub struct Prev;

impl Message for Prev {
    type Response = Result<SessionPhase, SessionError>;
}

/// Result of a directions request, sent by the request task.
pub struct RouteResolved {
    pub(crate) request: RequestId,
    pub(crate) snapshot: NavigationSnapshot,
}

impl Message for RouteResolved {
    type Response = ();
}

pub struct Snapshot;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub progress: ProgressState,
    pub mode: TransportMode,
    pub is_nearby: bool,
    pub position: Option<UserPosition>,
    pub route: Option<NavigationSnapshot>,
}

impl Message for Snapshot {
    type Response = SessionSnapshot;
}

/// Cancels outstanding work and persists the final state, which is returned.
pub struct End;

impl Message for End {
    type Response = ProgressState;
}
