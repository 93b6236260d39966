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

use crate::message::{Payload, UserState};

/// A single message handler: `index 0` is the `Hello` convention, the rest
/// are application-defined.
pub type Handler = Box<dyn Fn(&mut UserState, usize, Option<&Payload>) + Send + Sync>;

/// An immutable, user-supplied handler table. Message type `t` (`t <
/// handlers.len()`) dispatches to `handlers[t]`; the two reserved kinds
/// (`Spawn`, `GoDie`) never appear here, the runtime handles them itself.
pub struct Role {
    handlers: Vec<Handler>,
}

impl Role {
    pub fn new(handlers: Vec<Handler>) -> Self {
        Role { handlers }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub(crate) fn handler(&self, index: u32) -> Option<&Handler> {
        self.handlers.get(index as usize)
    }
}

/// Builds a [`Role`] one handler at a time, in index order.
#[derive(Default)]
pub struct RoleBuilder {
    handlers: Vec<Handler>,
}

impl RoleBuilder {
    pub fn new() -> Self {
        RoleBuilder::default()
    }

    /// Appends a handler; its index is its position, so call order matters.
    pub fn handler<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut UserState, usize, Option<&Payload>) + Send + Sync + 'static,
    {
        self.handlers.push(Box::new(f));
        self
    }

    pub fn build(self) -> Role {
        Role::new(self.handlers)
    }
}
