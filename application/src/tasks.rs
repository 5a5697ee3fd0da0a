//! Task registry — live task ids mapped to their cancellation handles.
//!
//! Shared by the receiver (which inserts on new instructions and cancels on
//! control commands) and by each runner (which removes its own entry on
//! exit). The server is authoritative about task ids: a duplicate insert for
//! a live id cancels the existing entry and installs the new one.
//!
//! The map is the only multi-writer structure in the core; it sits behind a
//! `std::sync::Mutex` held only for map operations, never across I/O.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

struct Entry {
    token: CancellationToken,
    generation: u64,
}

/// Handle returned by [`TaskRegistry::insert`]. Carries the task's
/// cancellation token plus the generation that identifies this particular
/// insertion, so a late-exiting runner cannot remove a successor task that
/// reused the same id.
pub struct TaskGuard {
    token: CancellationToken,
    generation: u64,
}

impl TaskGuard {
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

/// Mapping from task id to cancellation handle.
#[derive(Default)]
pub struct TaskRegistry {
    entries: Mutex<HashMap<String, Entry>>,
    next_generation: AtomicU64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a task, returning its guard. The task token is a child of
    /// `parent` (the client token), so global shutdown cancels every task.
    /// An existing live entry under the same id is cancelled first.
    pub fn insert(&self, task_id: &str, parent: &CancellationToken) -> TaskGuard {
        let token = parent.child_token();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = entries.remove(task_id) {
            warn!(task_id, "task id already live, cancelling previous instance");
            previous.token.cancel();
        }
        entries.insert(
            task_id.to_string(),
            Entry {
                token: token.clone(),
                generation,
            },
        );

        TaskGuard { token, generation }
    }

    /// Cancels one task. Returns false if the id is not live (no-op).
    pub fn cancel(&self, task_id: &str) -> bool {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(task_id) {
            Some(entry) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels every live task. Entries are removed by their runners' own
    /// cleanup as they observe the cancellation.
    pub fn cancel_all(&self) {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        for (task_id, entry) in entries.iter() {
            debug!(task_id, "cancelling task");
            entry.token.cancel();
        }
    }

    /// Removes the entry for `task_id`, but only if it still belongs to the
    /// insertion identified by `guard`. A replaced runner finds its handle
    /// superseded and leaves the successor's entry alone.
    pub fn remove(&self, task_id: &str, guard: &TaskGuard) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(task_id) {
            Some(entry) if entry.generation == guard.generation => {
                entries.remove(task_id);
            }
            Some(_) => {
                debug!(task_id, "task was replaced, keeping successor entry");
            }
            None => {}
        }
    }

    /// Number of live tasks.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
