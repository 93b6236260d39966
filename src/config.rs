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

/// Hard ceiling on the number of actors ever created in one system.
pub const DEFAULT_CAST_LIMIT: usize = 1 << 20;

/// Default worker thread count.
pub const DEFAULT_POOL_SIZE: usize = 4;

/// Tunables for [`crate::system_create_with_config`].
#[derive(Clone, Copy, Debug)]
pub struct SystemConfig {
    /// Number of OS worker threads servicing the runnable queue.
    pub pool_size: usize,
    /// Maximum number of actors this system will ever allocate.
    pub cast_limit: usize,
    /// Capacity hint passed to a freshly created actor's mailbox; `0` lets it
    /// grow from empty.
    pub initial_mailbox_capacity: usize,
}

impl Default for SystemConfig {
    fn default() -> Self {
        SystemConfig {
            pool_size: DEFAULT_POOL_SIZE,
            cast_limit: DEFAULT_CAST_LIMIT,
            initial_mailbox_capacity: 0,
        }
    }
}
