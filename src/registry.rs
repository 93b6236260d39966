// Copyright (C) 2021 Quickwit, Inc.
//
// Quickwit is offered under the AGPL v3.0 and as commercial software.
// For commercial licensing, contact us at hello@quickwit.io.
//
// AGPL:
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

use std::sync::{Arc, Mutex};

use crate::actor::ActorRecord;
use crate::error::fatal;
use crate::message::ActorId;
use crate::role::Role;

struct RegistryState {
    records: Vec<Arc<ActorRecord>>,
    dead_count: usize,
}

/// Append-only collection of actor records, indexed by id.
///
/// Lock order: whenever a caller needs both an actor's lock and this
/// registry's lock, the actor's lock is acquired first (see
/// [`ActorRegistry::mark_dead`]); nothing in this module ever acquires the
/// registry lock and then blocks waiting on an actor lock.
pub(crate) struct ActorRegistry {
    state: Mutex<RegistryState>,
    cast_limit: usize,
    mailbox_capacity_hint: usize,
}

impl ActorRegistry {
    pub fn new(cast_limit: usize, mailbox_capacity_hint: usize) -> Self {
        ActorRegistry {
            state: Mutex::new(RegistryState {
                records: Vec::new(),
                dead_count: 0,
            }),
            cast_limit,
            mailbox_capacity_hint,
        }
    }

    /// Allocates a new actor running `role`. Aborts the process if the
    /// system's cast limit has been exhausted; there is no recovery path
    /// from running out of actor ids.
    pub fn add(&self, role: Arc<Role>) -> ActorId {
        let mut state = self.state.lock().unwrap_or_else(|_| {
            fatal("registry lock poisoned");
        });
        if state.records.len() == self.cast_limit {
            fatal("actor cast limit exceeded");
        }
        let id = ActorId(state.records.len() as u64);
        state
            .records
            .push(Arc::new(ActorRecord::new(id, role, self.mailbox_capacity_hint)));
        id
    }

    /// Strict less-than bounds check: `id == records.len()` is out of range,
    /// not a one-past-the-end alias for the last record.
    pub fn get(&self, id: ActorId) -> Option<Arc<ActorRecord>> {
        let state = self.state.lock().unwrap_or_else(|_| fatal("registry lock poisoned"));
        state.records.get(id.as_index()).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap_or_else(|_| fatal("registry lock poisoned")).records.len()
    }

    /// Marks `id` dead. Returns `true` if every actor in the system is now
    /// dead (the system has become quiescent and teardown must begin).
    /// Returns `false` if `id` was already dead or unknown.
    ///
    /// Lock order here is actor-then-registry: the `Arc` is cloned out from
    /// under a short-lived registry lock acquisition *before* the actor's
    /// own lock is taken, so by the time we re-acquire the registry lock
    /// (to update `dead_count`) we are holding only the actor's lock, never
    /// the other way around.
    pub fn mark_dead(&self, id: ActorId) -> bool {
        let Some(record) = self.get(id) else {
            return false;
        };
        let mut inner = record.lock();
        if inner.is_dead {
            return false;
        }
        inner.is_dead = true;
        let mut state = self.state.lock().unwrap_or_else(|_| fatal("registry lock poisoned"));
        state.dead_count += 1;
        state.dead_count == state.records.len()
    }
}
