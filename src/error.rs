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

use thiserror::Error;

use crate::ActorId;

/// Failure modes of [`crate::send`].
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum SendError {
    /// No system exists in this process, or it has already been joined.
    #[error("no active actor system")]
    NoActiveSystem,
    /// `target` is not (yet, or ever) a valid actor id in the current system.
    #[error("actor {0} is unknown to this system")]
    UnknownActor(ActorId),
    /// `target` already processed `GoDie`, or the system has observed SIGINT.
    #[error("actor {0} is dead or the system is stopping")]
    DeadOrStopping(ActorId),
}

impl SendError {
    /// Numeric status code, preserved for callers migrating off an
    /// integer-return convention.
    pub fn code(self) -> i32 {
        match self {
            SendError::DeadOrStopping(_) => -1,
            SendError::UnknownActor(_) => -2,
            SendError::NoActiveSystem => -4,
        }
    }
}

/// Failure modes of [`crate::system_create`].
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum CreateError {
    /// A system already exists in this process; it must be joined first.
    #[error("an actor system already exists in this process")]
    AlreadyExists,
}

impl CreateError {
    pub fn code(self) -> i32 {
        match self {
            CreateError::AlreadyExists => -3,
        }
    }
}

/// Aborts the process after logging a diagnostic.
///
/// Reserved for conditions with no recovery path: the actor cast limit, or
/// a poisoned lock indicating a prior panic left shared state inconsistent.
#[cold]
#[track_caller]
pub(crate) fn fatal(message: &str) -> ! {
    tracing::error!(location = %std::panic::Location::caller(), "{message}");
    std::process::abort();
}
