use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::{
    actor::{Actor, ActorError},
    handler::{ActorMessage, Handler, Message},
    mailbox::{Mailbox, WeakMailbox},
};

pub struct ActorRef<A: Actor> {
    sender: Mailbox<A>,
    stop: CancellationToken,
}

impl<A: Actor> Clone for ActorRef<A> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            stop: self.stop.clone(),
        }
    }
}

impl<A: Actor> ActorRef<A> {
    pub(crate) fn new(sender: Mailbox<A>, stop: CancellationToken) -> Self {
        Self { sender, stop }
    }

    /// Enqueues a message without waiting for it to be handled.
    pub async fn tell<M>(&self, msg: M) -> Result<(), ActorError>
    where
        M: Message,
        A: Handler<M>,
    {
        let message = ActorMessage::<M, A>::new(msg, None);
        self.sender
            .send(message)
            .await
            .map_err(|_| ActorError::Stopped)
    }

    /// Enqueues a message and waits for the handler's answer.
    pub async fn ask<M>(&self, msg: M) -> Result<M::Response, ActorError>
    where
        M: Message,
        A: Handler<M>,
    {
        let (response_tx, response_rx) = oneshot::channel();
        let message = ActorMessage::<M, A>::new(msg, Some(response_tx));
        self.sender
            .send(message)
            .await
            .map_err(|_| ActorError::Stopped)?;
        response_rx.await.map_err(ActorError::from)
    }

    /// Makes the actor leave its loop after the message it is currently
    /// handling. Queued messages are dropped.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled() || self.sender.is_closed()
    }

    pub fn downgrade(&self) -> WeakActorRef<A> {
        WeakActorRef {
            sender: self.sender.downgrade(),
            stop: self.stop.clone(),
        }
    }
}

/// Reference that does not keep the actor alive.
pub struct WeakActorRef<A: Actor> {
    sender: WeakMailbox<A>,
    stop: CancellationToken,
}

impl<A: Actor> Clone for WeakActorRef<A> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            stop: self.stop.clone(),
        }
    }
}

impl<A: Actor> WeakActorRef<A> {
    pub fn upgrade(&self) -> Option<ActorRef<A>> {
        if self.stop.is_cancelled() {
            return None;
        }
        self.sender
            .upgrade()
            .map(|sender| ActorRef::new(sender, self.stop.clone()))
    }
}
