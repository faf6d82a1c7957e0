//! Keyed registry of running background tasks.
//!
//! Lets an ingress acknowledge a trigger immediately while the slow work
//! proceeds in a spawned task that stays observable (and cancelable) under a
//! caller-supplied key. Registering under an occupied key supersedes the old
//! entry: the new handle replaces it, and the superseded task keeps running
//! detached (dropping a tokio `JoinHandle` does not cancel).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

#[derive(Clone, Default)]
pub struct TaskRegistry {
    inner: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task under a key, replacing any previous entry. Handles
    /// whose task has already finished are pruned here, so the map tracks
    /// in-flight work rather than growing with every request ever served.
    pub fn register(&self, key: impl Into<String>, handle: JoinHandle<()>) {
        let mut tasks = self.inner.lock().expect("mutex poisoned");
        tasks.retain(|_, existing| !existing.is_finished());
        tasks.insert(key.into(), handle);
    }

    /// Abort and remove the task under a key. Returns whether one existed.
    pub fn cancel(&self, key: &str) -> bool {
        let handle = self.inner.lock().expect("mutex poisoned").remove(key);
        match handle {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().expect("mutex poisoned").contains_key(key)
    }

    /// Whether the task under a key is registered and still running.
    pub fn is_running(&self, key: &str) -> bool {
        self.inner
            .lock()
            .expect("mutex poisoned")
            .get(key)
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().expect("mutex poisoned").is_empty()
    }
}
