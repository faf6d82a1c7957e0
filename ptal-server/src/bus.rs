//! In-process typed event bus.
//!
//! Triggers (webhooks, future automation sources) publish events; execution
//! happens in handlers registered at startup. Events buffer in an unbounded
//! queue and a single consumer loop dispatches each one to every handler of
//! its kind, running the handlers concurrently and logging their failures in
//! isolation. Shutdown aborts the consumer; queued-but-undelivered events are
//! dropped, which is an accepted limitation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Closed union of every event the bus can carry. New kinds get a variant
/// here and a matching [`EventKind`] discriminant.
#[derive(Debug, Clone)]
pub enum Event {
    /// External automation (e.g. a translation-sync bot) opened or re-opened
    /// a PR that tracked channels should be notified about.
    AutomationPullRequest {
        repo_owner: String,
        repo_name: String,
        pr_number: u64,
        html_url: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AutomationPullRequest,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::AutomationPullRequest { .. } => EventKind::AutomationPullRequest,
        }
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: Event) -> Result<()>;
}

struct BusInner {
    tx: mpsc::UnboundedSender<Event>,
    // Receiver parks here until start() moves it into the consumer task.
    rx: Mutex<Option<mpsc::UnboundedReceiver<Event>>>,
    handlers: Mutex<HashMap<EventKind, Vec<Arc<dyn EventHandler>>>>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

/// The bus handle. Cloning shares the same queue and handler registry.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(BusInner {
                tx,
                rx: Mutex::new(Some(rx)),
                handlers: Mutex::new(HashMap::new()),
                consumer: Mutex::new(None),
            }),
        }
    }

    /// Register a handler for an event kind. Subscriptions happen once at
    /// startup; there is no unsubscribe.
    pub fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        self.inner
            .handlers
            .lock()
            .expect("mutex poisoned")
            .entry(kind)
            .or_default()
            .push(handler);
    }

    /// Enqueue an event. Events published before `start` buffer until the
    /// consumer runs; publishing after shutdown is an error.
    pub fn publish(&self, event: Event) -> Result<()> {
        self.inner
            .tx
            .send(event)
            .map_err(|_| anyhow!("Event bus has been shut down"))
    }

    /// Spawn the single consumer loop. Idempotent: a second call is a no-op.
    pub fn start(&self) {
        let mut rx_slot = self.inner.rx.lock().expect("mutex poisoned");
        let Some(mut rx) = rx_slot.take() else {
            warn!("Event bus consumer already started");
            return;
        };
        drop(rx_slot);

        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            info!("Event bus consumer started");
            while let Some(event) = rx.recv().await {
                let handlers: Vec<Arc<dyn EventHandler>> = inner
                    .handlers
                    .lock()
                    .expect("mutex poisoned")
                    .get(&event.kind())
                    .cloned()
                    .unwrap_or_default();

                if handlers.is_empty() {
                    warn!("No handlers registered for event {:?}", event.kind());
                    continue;
                }

                // Fan out concurrently; one failing handler never blocks or
                // aborts its siblings.
                for handler in handlers {
                    let event = event.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handler.handle(event).await {
                            error!("Event handler failed: {:#}", e);
                        }
                    });
                }
            }
        });

        *self.inner.consumer.lock().expect("mutex poisoned") = Some(handle);
    }

    /// Abort the consumer loop and wait for it to terminate. Events still
    /// queued are dropped.
    pub async fn shutdown(&self) {
        let handle = self
            .inner
            .consumer
            .lock()
            .expect("mutex poisoned")
            .take();

        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
            info!("Event bus consumer stopped");
        }
    }
}
