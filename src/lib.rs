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

//! An in-process actor runtime: dense actor ids, per-actor mailboxes, a
//! bounded worker pool, and a scheduler that gives every runnable actor a
//! fair service burst instead of letting one flood the others out.
//!
//! A process hosts at most one system at a time:
//!
//! ```no_run
//! use cacti::{system_create, system_join, send, self_id, Message, RoleBuilder};
//!
//! let role = RoleBuilder::new()
//!     .handler(|_state, _nbytes, _payload| {
//!         println!("hello from {:?}", self_id());
//!         send(self_id().unwrap(), Message::go_die()).unwrap();
//!     })
//!     .build();
//!
//! system_create(role).unwrap();
//! system_join();
//! ```

mod actor;
mod config;
mod error;
mod message;
mod pool;
mod queue;
mod registry;
mod role;
mod scheduler;
mod system;

pub use config::{SystemConfig, DEFAULT_CAST_LIMIT, DEFAULT_POOL_SIZE};
pub use error::{CreateError, SendError};
pub use message::{ActorId, Message, Payload, UserState};
pub use queue::{BoundedQueue, QueueCapacity};
pub use role::{Handler, Role, RoleBuilder};
pub use system::{self_id, send, system_config, system_create, system_create_with_config, system_join};
