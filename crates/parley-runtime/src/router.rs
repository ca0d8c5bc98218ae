//! Per-conversation event routing.
//!
//! The [`EventRouter`] sits between adapters and the [`Dispatcher`]. Every
//! active conversation gets its own FIFO queue and one worker task that
//! drains it, so events for the same conversation are dispatched one after
//! another in arrival order while different conversations run in parallel.
//!
//! Queues are created on demand and the worker retires as soon as its queue
//! is empty; idle conversations hold no task and no channel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, debug_span, trace};

use parley_core::{ConversationKey, Event};
use parley_framework::Dispatcher;

use crate::error::RouteError;

struct RouterInner {
    dispatcher: Dispatcher,
    queues: parking_lot::Mutex<HashMap<ConversationKey, mpsc::Sender<Event>>>,
    tracker: TaskTracker,
    capacity: usize,
}

/// Routes events to per-conversation worker tasks.
#[derive(Clone)]
pub struct EventRouter {
    inner: Arc<RouterInner>,
}

impl EventRouter {
    /// Creates a router that keeps at most `capacity` events waiting per
    /// conversation.
    pub fn new(dispatcher: Dispatcher, capacity: usize) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                dispatcher,
                queues: parking_lot::Mutex::new(HashMap::new()),
                tracker: TaskTracker::new(),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Returns the dispatcher events are routed to.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// Queues `event` behind any events already waiting for its conversation.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn route(&self, event: Event) -> Result<(), RouteError> {
        let mut queues = self.inner.queues.lock();
        if self.inner.tracker.is_closed() {
            return Err(RouteError::Closed);
        }

        let key = event.key().clone();
        let event = match queues.get(&key) {
            Some(queue) => match queue.try_send(event) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(_)) => return Err(RouteError::QueueFull(key)),
                // The worker is gone; start a fresh one below
                Err(TrySendError::Closed(event)) => event,
            },
            None => event,
        };

        let (tx, rx) = mpsc::channel(self.inner.capacity);
        if tx.try_send(event).is_err() {
            return Err(RouteError::QueueFull(key));
        }
        queues.insert(key.clone(), tx);

        let span = debug_span!("conversation", key = %key);
        self.inner
            .tracker
            .spawn(Self::drain(Arc::clone(&self.inner), key, rx).instrument(span));
        Ok(())
    }

    async fn drain(inner: Arc<RouterInner>, key: ConversationKey, mut rx: mpsc::Receiver<Event>) {
        debug!("Conversation worker started");
        loop {
            let event = match rx.try_recv() {
                Ok(event) => event,
                Err(_) => {
                    // Re-check under the map lock so no routed event is stranded
                    let mut queues = inner.queues.lock();
                    match rx.try_recv() {
                        Ok(event) => event,
                        Err(_) => {
                            queues.remove(&key);
                            break;
                        }
                    }
                }
            };

            let outcome = inner.dispatcher.dispatch(event).await;
            trace!(?outcome, "Event dispatched");
        }
        debug!("Conversation worker retired");
    }

    /// Returns the number of conversations with a live worker.
    pub fn active_conversations(&self) -> usize {
        self.inner.queues.lock().len()
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.tracker.is_closed()
    }

    /// Stops accepting events and waits for queued events to be dispatched.
    pub async fn shutdown(&self) {
        {
            let _queues = self.inner.queues.lock();
            self.inner.tracker.close();
        }
        debug!(
            workers = self.inner.tracker.len(),
            "Waiting for conversation workers"
        );
        self.inner.tracker.wait().await;
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("active_conversations", &self.active_conversations())
            .field("capacity", &self.inner.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parley_core::{EventType, Message, ReplyResult, ReplySink};
    use parley_framework::{HandlerContext, HandlerDescriptor, HandlerRegistry, Text};

    #[derive(Default)]
    struct Recorder {
        replies: parking_lot::Mutex<Vec<(ConversationKey, String)>>,
    }

    #[async_trait]
    impl ReplySink for Recorder {
        async fn reply(&self, event: &Event, message: Message) -> ReplyResult<()> {
            self.replies
                .lock()
                .push((event.key().clone(), message.text));
            Ok(())
        }
    }

    async fn echo(text: Text) -> String {
        tokio::task::yield_now().await;
        text.0
    }

    async fn start(ctx: Arc<HandlerContext>) -> &'static str {
        ctx.advance();
        "started"
    }

    fn router(capacity: usize) -> (EventRouter, Arc<Recorder>) {
        let registry = HandlerRegistry::builder()
            .with(HandlerDescriptor::new("start").pattern("^start$").next("echo").handler(start))
            .with(HandlerDescriptor::new("echo").handler(echo))
            .with(HandlerDescriptor::new("any").pattern(".").handler(echo))
            .build()
            .unwrap();
        let recorder = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::new(registry, recorder.clone());
        (EventRouter::new(dispatcher, capacity), recorder)
    }

    fn message(user: &str, text: &str) -> Event {
        Event::text_event(EventType::Message, ConversationKey::new("C1", user), text)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_key_preserves_arrival_order() {
        let (router, recorder) = router(256);

        for i in 0..100 {
            router.route(message("U1", &format!("m{i}"))).unwrap();
        }
        router.shutdown().await;

        let expected: Vec<_> = (0..100).map(|i| format!("m{i}")).collect();
        let got: Vec<_> = recorder.replies.lock().iter().map(|(_, t)| t.clone()).collect();
        assert_eq!(got, expected);
        assert_eq!(router.active_conversations(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_conversation_sees_events_in_order() {
        let (router, recorder) = router(16);

        // The second event must reach the armed handler, never the scan
        router.route(message("U1", "start")).unwrap();
        router.route(message("U1", "hello")).unwrap();
        router.route(message("U2", "other")).unwrap();
        router.shutdown().await;

        let replies = recorder.replies.lock();
        let u1: Vec<_> = replies
            .iter()
            .filter(|(k, _)| k.user_id() == Some("U1"))
            .map(|(_, t)| t.as_str())
            .collect();
        assert_eq!(u1, vec!["started", "hello"]);
        assert_eq!(replies.len(), 3);
    }

    #[tokio::test]
    async fn test_full_queue_rejects() {
        let (router, _recorder) = router(2);

        // The worker cannot run before this task yields
        router.route(message("U1", "a")).unwrap();
        router.route(message("U1", "b")).unwrap();
        assert_eq!(
            router.route(message("U1", "c")),
            Err(RouteError::QueueFull(ConversationKey::new("C1", "U1")))
        );
        router.route(message("U2", "d")).unwrap();

        router.shutdown().await;
    }

    #[tokio::test]
    async fn test_closed_router_rejects() {
        let (router, recorder) = router(4);
        router.shutdown().await;

        assert!(router.is_closed());
        assert_eq!(router.route(message("U1", "late")), Err(RouteError::Closed));
        assert!(recorder.replies.lock().is_empty());
    }

    #[tokio::test]
    async fn test_workers_retire_when_idle() {
        let (router, recorder) = router(4);

        router.route(message("U1", "one")).unwrap();
        assert_eq!(router.active_conversations(), 1);

        while router.active_conversations() > 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(recorder.replies.lock().len(), 1);

        // A new event for the same key starts a fresh worker
        router.route(message("U1", "two")).unwrap();
        router.shutdown().await;
        assert_eq!(recorder.replies.lock().len(), 2);
    }
}
