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

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crate::error::fatal;
use crate::message::ActorId;

struct PoolState {
    runnable: VecDeque<ActorId>,
    draining: bool,
    active_workers: usize,
}

/// Fixed-size worker pool consuming the runnable queue.
///
/// `state`'s lock, together with `not_empty`, is the single synchronization
/// point for `runnable`, `draining`, and worker accounting. The three are
/// always read and mutated together.
pub(crate) struct WorkerPool {
    pool_size: usize,
    state: Mutex<PoolState>,
    not_empty: Condvar,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(pool_size: usize) -> Arc<Self> {
        Arc::new(WorkerPool {
            pool_size,
            state: Mutex::new(PoolState {
                runnable: VecDeque::new(),
                draining: false,
                active_workers: pool_size,
            }),
            not_empty: Condvar::new(),
            handles: Mutex::new(Vec::new()),
        })
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Pushes `id` onto the runnable queue and wakes a waiting worker.
    /// Callers are responsible for the "at most one enqueue" discipline
    /// (see `scheduler::try_schedule`). This method trusts its caller.
    pub fn enqueue(&self, id: ActorId) {
        let mut state = self.lock_state();
        state.runnable.push_back(id);
        self.not_empty.notify_all();
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, PoolState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(_) => fatal("worker pool lock poisoned"),
        }
    }

    /// Steps 1–3 of the dispatch loop: wait for work or a shutdown signal,
    /// and pop the next runnable id. Returns `None` once this worker must
    /// exit (the pool has been marked draining and the queue is empty).
    pub fn next(&self, alive: &AtomicBool, signaled: &AtomicBool) -> Option<ActorId> {
        let mut state = self.lock_state();
        loop {
            if !state.runnable.is_empty() {
                break;
            }
            let should_stop = !alive.load(Ordering::Acquire) || signaled.load(Ordering::Acquire);
            if should_stop || state.draining {
                break;
            }
            state = match self.not_empty.wait(state) {
                Ok(guard) => guard,
                Err(_) => fatal("worker pool lock poisoned"),
            };
        }
        let should_stop = !alive.load(Ordering::Acquire) || signaled.load(Ordering::Acquire);
        if (should_stop || state.draining) && state.runnable.is_empty() {
            state.draining = true;
            self.not_empty.notify_all();
            return None;
        }
        state.runnable.pop_front()
    }

    /// Wakes every worker currently blocked in [`WorkerPool::next`] without
    /// enqueueing anything. Used when `alive`/`signaled` flips so idle
    /// workers re-check their exit condition promptly instead of waiting
    /// for the next real message.
    pub fn wake_all(&self) {
        let _guard = self.lock_state();
        self.not_empty.notify_all();
    }

    /// Called by a worker right before it returns from its thread body.
    /// Returns `true` if this was the last worker to exit, in which case
    /// the caller is responsible for driving system teardown.
    pub fn worker_exited(&self) -> bool {
        let mut state = self.lock_state();
        state.active_workers -= 1;
        state.active_workers == 0
    }

    /// Spawns `pool_size` OS threads, each running `body`. `body` is handed
    /// a clone of this pool's `Arc` so it can call [`WorkerPool::next`],
    /// [`WorkerPool::enqueue`], and [`WorkerPool::worker_exited`].
    pub fn spawn<F>(self: &Arc<Self>, body: F)
    where
        F: Fn(Arc<WorkerPool>) + Send + Sync + Clone + 'static,
    {
        let mut handles = self.handles.lock().unwrap_or_else(|_| fatal("worker pool lock poisoned"));
        for worker_index in 0..self.pool_size {
            let pool = Arc::clone(self);
            let body = body.clone();
            let handle = std::thread::Builder::new()
                .name(format!("cacti-worker-{worker_index}"))
                .spawn(move || body(pool))
                .expect("failed to spawn worker thread");
            handles.push(handle);
        }
    }

    /// Joins every worker thread. Must only be called once all workers have
    /// observed `draining` and are on their way out. Calling this from a
    /// worker thread trying to join itself would deadlock, which is why
    /// `system::system_join` (never a worker) is the only caller.
    pub fn join_all(&self) {
        let handles = std::mem::take(&mut *self.handles.lock().unwrap_or_else(|_| fatal("worker pool lock poisoned")));
        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }
    }
}
