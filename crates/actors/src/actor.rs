use core::fmt;
use std::any::Any;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::actor_ref::WeakActorRef;

#[derive(Debug, Clone)]
pub enum SupervisionStrategy {
    Restart,
    Resume,
    Stop,
}

#[async_trait]
pub trait Actor: Send + Sync + Sized + 'static {
    /// Called before the first message is handled, and again after every
    /// restart. `this` may be handed to spawned tasks that report back.
    #[allow(unused_variables)]
    async fn on_start(&mut self, this: WeakActorRef<Self>) {}

    /// Called once the actor leaves its message loop, for whatever reason.
    async fn on_stop(&mut self) {}

    /// Called when a handler on the actor panics. The return value represents the
    /// supervision strategy used to handle the panic.
    /// NOTE: If this method panics, the actor can not recover from the panic.
    #[allow(unused_variables)]
    fn on_fail(&mut self, error: Box<dyn Any + Send>) -> SupervisionStrategy {
        SupervisionStrategy::Restart
    }
}

#[derive(Debug)]
pub enum ActorError {
    /// The actor has left its message loop.
    Stopped,
    ReceiveAnswerError(oneshot::error::RecvError),
}

impl fmt::Display for ActorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "actor stopped"),
            Self::ReceiveAnswerError(why) => write!(f, "ReceiveError: {}", why),
        }
    }
}

impl std::error::Error for ActorError {}

impl From<oneshot::error::RecvError> for ActorError {
    fn from(why: oneshot::error::RecvError) -> Self {
        Self::ReceiveAnswerError(why)
    }
}
