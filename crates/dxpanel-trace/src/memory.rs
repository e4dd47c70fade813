//! In-memory implementation of `SessionStore`.
//!
//! `InMemorySessionStore` keeps sessions in a `HashMap` behind an `RwLock`,
//! with an insertion-order queue for eviction. Lookups take the read lock;
//! inserts take the write lock only long enough to update the map and queue.
//!
//! Retention: unbounded by default. With a capacity, inserting past it
//! evicts the oldest registered session. An evicted session stays alive for
//! whoever still holds its `Arc` (including a case that is still running);
//! it just can no longer be looked up.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};

use dxpanel_core::{session::CaseExecutionSession, traits::SessionStore};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct RegistryState {
    pub(crate) sessions: HashMap<String, Arc<CaseExecutionSession>>,
    /// Case ids in insertion order. A re-registered id moves to the back.
    pub(crate) order: VecDeque<String>,
}

// ── Public store ──────────────────────────────────────────────────────────────

pub struct InMemorySessionStore {
    capacity: Option<usize>,
    pub(crate) state: RwLock<RegistryState>,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionStore {
    /// An unbounded store.
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// A store retaining at most `capacity` sessions (`None` for unbounded).
    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            capacity: capacity.map(|c| c.max(1)),
            state: RwLock::new(RegistryState {
                sessions: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Drop a session from the registry, returning it if it was present.
    pub fn remove(&self, case_id: &str) -> Option<Arc<CaseExecutionSession>> {
        let mut state = self.write();
        state.order.retain(|id| id != case_id);
        state.sessions.remove(case_id)
    }

    /// Registered case ids, oldest first.
    pub fn case_ids(&self) -> Vec<String> {
        self.read().order.iter().cloned().collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ── SessionStore impl ─────────────────────────────────────────────────────────

impl SessionStore for InMemorySessionStore {
    /// Register a session under its case id.
    ///
    /// Registering an id that is already present replaces the old session
    /// (logged at `warn`) and counts as the newest entry.
    fn insert(&self, session: Arc<CaseExecutionSession>) {
        let case_id = session.case_id().to_string();
        let mut state = self.write();

        if state.sessions.insert(case_id.clone(), session).is_some() {
            warn!(case_id = %case_id, "case id re-registered; previous session replaced");
            state.order.retain(|id| id != &case_id);
        }
        state.order.push_back(case_id);

        if let Some(capacity) = self.capacity {
            while state.sessions.len() > capacity {
                let Some(oldest) = state.order.pop_front() else { break };
                state.sessions.remove(&oldest);
                info!(case_id = %oldest, capacity, "session evicted from registry");
            }
        }
    }

    fn get(&self, case_id: &str) -> Option<Arc<CaseExecutionSession>> {
        self.read().sessions.get(case_id).cloned()
    }

    fn len(&self) -> usize {
        self.read().sessions.len()
    }
}
