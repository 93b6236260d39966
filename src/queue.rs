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

//! A small mutex-guarded FIFO, shared by actor mailboxes and the pool's
//! runnable queue. Deliberately unremarkable: growth and wraparound are
//! `VecDeque`'s problem, not ours.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::error::fatal;

/// Capacity policy for a [`BoundedQueue`].
#[derive(Clone, Copy, Debug)]
pub enum QueueCapacity {
    Bounded(usize),
    Unbounded,
}

/// Thread-safe generic FIFO queue with an optional capacity.
///
/// All operations serialize through a single internal lock. There is no
/// blocking semantics here; that is layered above by callers (mailboxes use
/// the actor's own lock, the runnable queue uses the pool's condvar).
pub struct BoundedQueue<T> {
    capacity: QueueCapacity,
    items: Mutex<VecDeque<T>>,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: QueueCapacity) -> Self {
        BoundedQueue {
            capacity,
            items: Mutex::new(VecDeque::new()),
        }
    }

    fn lock_items(&self) -> MutexGuard<'_, VecDeque<T>> {
        match self.items.lock() {
            Ok(guard) => guard,
            Err(_) => fatal("bounded queue lock poisoned"),
        }
    }

    /// Pushes `value` onto the back of the queue. Returns the value back to
    /// the caller, without dropping it, if the queue is at capacity.
    pub fn push(&self, value: T) -> Result<(), T> {
        let mut items = self.lock_items();
        if let QueueCapacity::Bounded(limit) = self.capacity {
            if items.len() >= limit {
                return Err(value);
            }
        }
        items.push_back(value);
        Ok(())
    }

    pub fn pop(&self) -> Option<T> {
        self.lock_items().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock_items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> BoundedQueue<T> {
    pub fn peek(&self) -> Option<T> {
        self.lock_items().front().cloned()
    }
}
