use std::panic::AssertUnwindSafe;

use actor::{Actor, SupervisionStrategy};
use actor_ref::ActorRef;
use futures::FutureExt;
use mailbox::bounded_mailbox;
use tokio_util::sync::CancellationToken;

pub mod actor;
pub mod actor_ref;
pub mod handler;
pub mod mailbox;

pub const MAILBOX_CAPACITY: usize = 32;

/// Creates and runs an actor. If the actor panics, it is either restared, resumed
/// or stoped acording to the behavior specified by `Actor::on_fail()`.
///
/// The actor runs until every `ActorRef` is dropped or `ActorRef::stop` is
/// called. `Actor::on_stop` runs in both cases.
pub fn run<A, F>(actor_factory: F) -> ActorRef<A>
where
    A: Actor,
    F: 'static + Send + Fn() -> A,
{
    let (tx, mut rx) = bounded_mailbox(MAILBOX_CAPACITY);
    let stop = CancellationToken::new();
    let actor_ref = ActorRef::new(tx, stop.clone());
    let this = actor_ref.downgrade();

    // run actor
    tokio::spawn(async move {
        let mut actor = actor_factory();
        actor.on_start(this.clone()).await;
        loop {
            let mut message = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                message = rx.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };
            // handle message
            let result = AssertUnwindSafe(message.handle(&mut actor))
                .catch_unwind()
                .await;
            // handler paniced?
            if let Err(why) = result {
                log::error!("actor paniced: {:?}", why);
                match actor.on_fail(why) {
                    SupervisionStrategy::Restart => {
                        actor = actor_factory();
                        actor.on_start(this.clone()).await;
                    }
                    SupervisionStrategy::Resume => {}
                    SupervisionStrategy::Stop => {
                        break;
                    }
                };
            }
        }
        rx.close();
        stop.cancel();
        actor.on_stop().await;
    });

    actor_ref
}

#[cfg(test)]
mod tests {
    use std::{
        any::Any,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        actor::ActorError,
        actor_ref::WeakActorRef,
        handler::{Handler, Message},
    };

    struct Visits {
        count: i64,
        this: Option<WeakActorRef<Visits>>,
        stopped: Arc<AtomicUsize>,
        strategy: SupervisionStrategy,
    }

    struct Visit(i64);

    impl Message for Visit {
        type Response = ();
    }

    struct Count;

    impl Message for Count {
        type Response = i64;
    }

    struct Explode;

    impl Message for Explode {
        type Response = ();
    }

    /// Visits itself through the weak reference handed to `on_start`.
    struct VisitLater(i64);

    impl Message for VisitLater {
        type Response = ();
    }

    #[async_trait]
    impl Actor for Visits {
        async fn on_start(&mut self, this: WeakActorRef<Self>) {
            self.this = Some(this);
        }

        async fn on_stop(&mut self) {
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }

        fn on_fail(&mut self, _: Box<dyn Any + Send>) -> SupervisionStrategy {
            self.strategy.clone()
        }
    }

    #[async_trait]
    impl Handler<Visit> for Visits {
        async fn handle(&mut self, message: Visit) {
            self.count += message.0;
        }
    }

    #[async_trait]
    impl Handler<Count> for Visits {
        async fn handle(&mut self, _: Count) -> i64 {
            self.count
        }
    }

    #[async_trait]
    impl Handler<Explode> for Visits {
        async fn handle(&mut self, _: Explode) {
            panic!("boom");
        }
    }

    #[async_trait]
    impl Handler<VisitLater> for Visits {
        async fn handle(&mut self, message: VisitLater) {
            if let Some(this) = self.this.as_ref().and_then(|this| this.upgrade()) {
                tokio::spawn(async move {
                    let _ = this.tell(Visit(message.0)).await;
                });
            }
        }
    }

    fn spawn(strategy: SupervisionStrategy, stopped: Arc<AtomicUsize>) -> ActorRef<Visits> {
        run(move || Visits {
            count: 0,
            this: None,
            stopped: stopped.clone(),
            strategy: strategy.clone(),
        })
    }

    #[tokio::test]
    async fn tell_then_ask() {
        let actor = spawn(SupervisionStrategy::Resume, Arc::default());
        actor.tell(Visit(1)).await.unwrap();
        actor.tell(Visit(5)).await.unwrap();
        actor.tell(Visit(-2)).await.unwrap();
        assert_eq!(actor.ask(Count).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn restart_resets_state() {
        let actor = spawn(SupervisionStrategy::Restart, Arc::default());
        actor.tell(Visit(3)).await.unwrap();
        assert!(actor.ask(Explode).await.is_err());
        assert_eq!(actor.ask(Count).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn resume_keeps_state() {
        let actor = spawn(SupervisionStrategy::Resume, Arc::default());
        actor.tell(Visit(3)).await.unwrap();
        assert!(actor.ask(Explode).await.is_err());
        assert_eq!(actor.ask(Count).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn spawned_tasks_report_back_through_weak_ref() {
        let actor = spawn(SupervisionStrategy::Resume, Arc::default());
        actor.tell(VisitLater(7)).await.unwrap();
        let mut count = 0;
        for _ in 0..100 {
            count = actor.ask(Count).await.unwrap();
            if count == 7 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(count, 7);
    }

    #[tokio::test]
    async fn stop_runs_on_stop_and_rejects_messages() {
        let stopped = Arc::new(AtomicUsize::new(0));
        let actor = spawn(SupervisionStrategy::Resume, stopped.clone());
        actor.tell(Visit(1)).await.unwrap();
        actor.stop();
        assert!(actor.is_stopped());
        for _ in 0..100 {
            if stopped.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
        assert!(matches!(actor.tell(Visit(1)).await, Err(ActorError::Stopped)));
        assert!(actor.downgrade().upgrade().is_none());
    }
}
