use tokio::sync::mpsc;

use crate::{handler::MessageHandler, Actor};

pub(crate) type Envelope<A> = Box<dyn MessageHandler<A>>;

pub struct Mailbox<A: Actor>(mpsc::Sender<Envelope<A>>);

impl<A: Actor> Clone for Mailbox<A> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A: Actor> Mailbox<A> {
    pub(crate) async fn send<M>(&self, message: M) -> Result<(), M>
    where
        M: MessageHandler<A> + 'static,
    {
        // hand the undelivered message back instead of the boxed envelope
        let permit = match self.0.reserve().await {
            Ok(permit) => permit,
            Err(_) => return Err(message),
        };
        permit.send(Box::new(message));
        Ok(())
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.0.is_closed()
    }

    pub(crate) fn downgrade(&self) -> WeakMailbox<A> {
        WeakMailbox(self.0.downgrade())
    }
}

pub struct WeakMailbox<A: Actor>(mpsc::WeakSender<Envelope<A>>);

impl<A: Actor> Clone for WeakMailbox<A> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A: Actor> WeakMailbox<A> {
    pub(crate) fn upgrade(&self) -> Option<Mailbox<A>> {
        self.0.upgrade().map(Mailbox)
    }
}

pub(crate) struct MailboxReceiver<A: Actor>(mpsc::Receiver<Envelope<A>>);

impl<A: Actor> MailboxReceiver<A> {
    pub(crate) async fn recv(&mut self) -> Option<Envelope<A>> {
        self.0.recv().await
    }

    pub(crate) fn close(&mut self) {
        self.0.close()
    }
}

pub(crate) fn bounded_mailbox<A: Actor>(buffer: usize) -> (Mailbox<A>, MailboxReceiver<A>) {
    let (tx, rx) = mpsc::channel(buffer);
    (Mailbox(tx), MailboxReceiver(rx))
}
