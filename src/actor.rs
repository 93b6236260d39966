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
use std::sync::{Arc, Mutex};

use crate::message::{ActorId, Envelope, UserState};
use crate::role::Role;

/// Everything a single lock-acquisition needs to touch: mailbox membership,
/// the enqueue flag, and the dead flag travel together because every
/// decision that reads one of them also needs the other two.
pub(crate) struct ActorInner {
    pub mailbox: VecDeque<Envelope>,
    pub user_state: UserState,
    pub is_dead: bool,
    pub is_enqueued: bool,
}

/// Per-actor record. `id` and `role` are set once at creation and never
/// change; everything else lives behind `inner`.
pub(crate) struct ActorRecord {
    pub id: ActorId,
    pub role: Arc<Role>,
    inner: Mutex<ActorInner>,
}

impl ActorRecord {
    pub fn new(id: ActorId, role: Arc<Role>, mailbox_capacity_hint: usize) -> Self {
        ActorRecord {
            id,
            role,
            inner: Mutex::new(ActorInner {
                mailbox: VecDeque::with_capacity(mailbox_capacity_hint),
                user_state: UserState::default(),
                is_dead: false,
                is_enqueued: false,
            }),
        }
    }

    pub fn lock(&self) -> std::sync::MutexGuard<'_, ActorInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(_) => crate::error::fatal("actor lock poisoned"),
        }
    }
}
