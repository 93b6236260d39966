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

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::role::Role;

/// A dense, stable actor handle. Ids are assigned sequentially starting at 0
/// and are never reused within a system's lifetime.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ActorId(pub(crate) u64);

impl ActorId {
    pub(crate) fn as_index(self) -> usize {
        self.0 as usize
    }

    /// Builds an id from a raw integer without checking it against any
    /// system. Meant for tests exercising [`crate::send`]'s rejection of
    /// ids that were never allocated; real ids should only ever come from
    /// [`crate::system_create`] or a `Hello` payload.
    pub fn from_raw(id: u64) -> Self {
        ActorId(id)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type-erased, reference-counted message payload.
///
/// The runtime never copies or interprets the contents; cloning a `Payload`
/// clones the `Arc` pointer, not the value underneath.
#[derive(Clone)]
pub struct Payload(Arc<dyn Any + Send + Sync>);

impl Payload {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Payload(Arc::new(value))
    }

    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload").finish_non_exhaustive()
    }
}

/// The runtime-reserved kinds, plus the open range of user-defined kinds
/// dispatched through a role's handler table.
#[derive(Clone, Debug)]
pub(crate) enum MessageKind {
    /// Spawn a child actor running the role carried in the payload.
    Spawn,
    /// Mark the recipient dead after this burst drains.
    GoDie,
    /// Dispatches to `role.handlers[index]`.
    User(u32),
}

/// A message as handed to [`crate::send`]. The runtime wraps this into a
/// runtime-owned envelope on enqueue and drops the envelope once the
/// handler returns; it never owns `payload`'s contents.
#[derive(Clone, Debug)]
pub struct Message {
    pub(crate) kind: MessageKind,
    pub nbytes: usize,
    pub payload: Option<Payload>,
}

impl Message {
    /// Convention message, index 0: sent automatically on spawn and on
    /// system creation for the initial actor.
    pub fn hello(payload: Option<Payload>) -> Self {
        Message {
            kind: MessageKind::User(0),
            nbytes: 0,
            payload,
        }
    }

    /// A user-defined message dispatching to `role.handlers[index]`.
    pub fn user(index: u32, payload: Option<Payload>) -> Self {
        Message {
            kind: MessageKind::User(index),
            nbytes: 0,
            payload,
        }
    }

    pub fn with_nbytes(mut self, nbytes: usize) -> Self {
        self.nbytes = nbytes;
        self
    }

    /// Reserved: spawn a child running `role`, which will receive an
    /// automatic [`Message::hello`] carrying the spawning actor's id.
    pub fn spawn(role: Role) -> Self {
        Message {
            kind: MessageKind::Spawn,
            nbytes: 0,
            payload: Some(Payload::new(Arc::new(role))),
        }
    }

    /// Reserved: mark the recipient dead once this burst finishes draining.
    pub fn go_die() -> Self {
        Message {
            kind: MessageKind::GoDie,
            nbytes: 0,
            payload: None,
        }
    }
}

pub(crate) struct Envelope {
    pub kind: MessageKind,
    pub nbytes: usize,
    pub payload: Option<Payload>,
}

impl From<Message> for Envelope {
    fn from(message: Message) -> Self {
        Envelope {
            kind: message.kind,
            nbytes: message.nbytes,
            payload: message.payload,
        }
    }
}

/// A type-erased cell holding an actor's private state.
///
/// Handlers receive this by mutable reference, so a handler may inspect,
/// replace, or clear its actor's state in place.
#[derive(Default)]
pub struct UserState(Option<Box<dyn Any + Send>>);

impl UserState {
    pub fn get<T: Any + Send>(&self) -> Option<&T> {
        self.0.as_deref()?.downcast_ref::<T>()
    }

    pub fn get_mut<T: Any + Send>(&mut self) -> Option<&mut T> {
        self.0.as_deref_mut()?.downcast_mut::<T>()
    }

    pub fn set<T: Any + Send>(&mut self, value: T) {
        self.0 = Some(Box::new(value));
    }

    pub fn take<T: Any + Send>(&mut self) -> Option<T> {
        if self.0.as_deref().map(|b| b.is::<T>()) != Some(true) {
            return None;
        }
        self.0.take().and_then(|b| b.downcast::<T>().ok()).map(|b| *b)
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}
