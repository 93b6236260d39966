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

//! Process-wide system lifecycle: creation, the join/teardown handshake,
//! and the SIGINT-driven shutdown path. At most one system exists per
//! process at a time, enforced by a single global slot.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use once_cell::sync::Lazy;
use signal_hook::consts::SIGINT;

use crate::config::SystemConfig;
use crate::error::{CreateError, SendError};
use crate::message::{ActorId, Message};
use crate::pool::WorkerPool;
use crate::registry::ActorRegistry;
use crate::role::Role;
use crate::scheduler;

thread_local! {
    static SELF_ID: Cell<Option<ActorId>> = const { Cell::new(None) };
}

/// Returns the id of the actor whose handler is currently executing on this
/// thread, or `None` outside of any handler (e.g. on the thread that called
/// `system_create`).
pub fn self_id() -> Option<ActorId> {
    SELF_ID.with(|cell| cell.get())
}

fn set_self_id(id: Option<ActorId>) {
    SELF_ID.with(|cell| cell.set(id));
}

/// Everything workers and senders need once a system is running. Shared via
/// `Arc` between the global slot, every worker thread, and every handler
/// invocation that calls [`send`] or spawns a child.
pub(crate) struct SystemInner {
    pub registry: ActorRegistry,
    pub pool: Arc<WorkerPool>,
    pub alive: AtomicBool,
    pub signaled: Arc<AtomicBool>,
    pub config: SystemConfig,
    signal_id: Option<signal_hook::SigId>,
}

#[cfg(test)]
impl SystemInner {
    pub(crate) fn for_test(
        registry: ActorRegistry,
        pool: Arc<WorkerPool>,
        config: SystemConfig,
    ) -> Arc<Self> {
        Arc::new(SystemInner {
            registry,
            pool,
            alive: AtomicBool::new(true),
            signaled: Arc::new(AtomicBool::new(false)),
            config,
            signal_id: None,
        })
    }
}

/// What the last worker to exit hands off to whichever thread calls
/// `system_join`: the pool (to be joined) and the installed signal hook
/// (to be unregistered). The registry is not part of this. By the time
/// we're here every `Arc<ActorRecord>` is only reachable through mailboxes
/// that have all been drained, and it is dropped along with `SystemInner`
/// once the last worker's own reference to it goes out of scope.
struct JoinTeardown {
    pool: Arc<WorkerPool>,
    signal_id: Option<signal_hook::SigId>,
    signaled: Arc<AtomicBool>,
}

enum GlobalState {
    Empty,
    Active(Arc<SystemInner>),
    Stopped(JoinTeardown),
}

struct GlobalSystem {
    state: Mutex<GlobalState>,
    join_cv: Condvar,
}

static GLOBAL: Lazy<GlobalSystem> = Lazy::new(|| GlobalSystem {
    state: Mutex::new(GlobalState::Empty),
    join_cv: Condvar::new(),
});

/// Creates the one actor system this process may have at a time, running
/// `role` as its initial actor. The initial actor immediately receives a
/// `Hello` with no payload, exactly like every other spawned actor.
pub fn system_create(role: Role) -> Result<ActorId, CreateError> {
    system_create_with_config(role, SystemConfig::default())
}

/// As [`system_create`], with explicit tunables.
pub fn system_create_with_config(role: Role, config: SystemConfig) -> Result<ActorId, CreateError> {
    let mut state = GLOBAL.state.lock().unwrap_or_else(|_| crate::error::fatal("system lock poisoned"));
    if !matches!(*state, GlobalState::Empty) {
        return Err(CreateError::AlreadyExists);
    }

    let registry = ActorRegistry::new(config.cast_limit, config.initial_mailbox_capacity);
    let first_id = registry.add(Arc::new(role));
    let pool = WorkerPool::new(config.pool_size);
    let signaled = Arc::new(AtomicBool::new(false));
    let signal_id = signal_hook::flag::register(SIGINT, Arc::clone(&signaled))
        .map(Some)
        .unwrap_or_else(|err| {
            tracing::warn!(%err, "failed to install SIGINT hook, shutdown-on-interrupt disabled");
            None
        });

    let sys = Arc::new(SystemInner {
        registry,
        pool: Arc::clone(&pool),
        alive: AtomicBool::new(true),
        signaled,
        config,
        signal_id,
    });

    let sys_for_workers = Arc::clone(&sys);
    pool.spawn(move |pool_handle| worker_loop(Arc::clone(&sys_for_workers), pool_handle));

    scheduler::send_envelope(&sys, first_id, Message::hello(None))
        .expect("the initial actor always exists and is alive");

    tracing::info!(actor = %first_id, pool_size = sys.pool.pool_size(), "actor system created");
    *state = GlobalState::Active(sys);
    Ok(first_id)
}

/// Blocks the calling thread until the system terminates: either every
/// actor has died, or SIGINT was observed and all in-flight bursts drained.
pub fn system_join() {
    let teardown = {
        let mut state = GLOBAL
            .state
            .lock()
            .unwrap_or_else(|_| crate::error::fatal("system lock poisoned"));
        loop {
            match &*state {
                GlobalState::Active(_) => {
                    state = GLOBAL
                        .join_cv
                        .wait(state)
                        .unwrap_or_else(|_| crate::error::fatal("system lock poisoned"));
                }
                GlobalState::Stopped(_) => break,
                GlobalState::Empty => return,
            }
        }
        match std::mem::replace(&mut *state, GlobalState::Empty) {
            GlobalState::Stopped(teardown) => teardown,
            _ => unreachable!("checked above"),
        }
    };

    teardown.pool.join_all();
    if let Some(signal_id) = teardown.signal_id {
        signal_hook::low_level::unregister(signal_id);
    }
    teardown.signaled.store(false, Ordering::Release);
    tracing::info!("actor system joined");
}

/// One worker thread's entire lifetime: repeatedly service the next
/// runnable actor until told to drain, then, if this is the last worker
/// standing, hand off to teardown.
fn worker_loop(sys: Arc<SystemInner>, pool: Arc<WorkerPool>) {
    loop {
        let Some(id) = pool.next(&sys.alive, &sys.signaled) else {
            break;
        };
        let snapshot = sys
            .registry
            .get(id)
            .map(|record| record.lock().mailbox.len())
            .unwrap_or(0);
        set_self_id(Some(id));
        scheduler::service_burst(&sys, id, snapshot);
        set_self_id(None);
    }

    if pool.worker_exited() {
        tracing::info!("last worker exited, tearing down system");
        let mut state = GLOBAL
            .state
            .lock()
            .unwrap_or_else(|_| crate::error::fatal("system lock poisoned"));
        if matches!(*state, GlobalState::Active(_)) {
            *state = GlobalState::Stopped(JoinTeardown {
                pool: Arc::clone(&sys.pool),
                signal_id: sys.signal_id,
                signaled: Arc::clone(&sys.signaled),
            });
            GLOBAL.join_cv.notify_all();
        }
    }
}

/// `send(target, message)`, the only public way to put a message into an
/// actor's mailbox.
pub fn send(target: ActorId, message: Message) -> Result<(), SendError> {
    let state = GLOBAL
        .state
        .lock()
        .unwrap_or_else(|_| crate::error::fatal("system lock poisoned"));
    match &*state {
        GlobalState::Active(sys) => {
            let sys = Arc::clone(sys);
            drop(state);
            scheduler::send_envelope(&sys, target, message)
        }
        GlobalState::Stopped(_) | GlobalState::Empty => Err(SendError::NoActiveSystem),
    }
}

/// Returns the tunables the running system was created with, or `None` if
/// no system is currently active.
pub fn system_config() -> Option<SystemConfig> {
    let state = GLOBAL.state.lock().unwrap_or_else(|_| crate::error::fatal("system lock poisoned"));
    match &*state {
        GlobalState::Active(sys) => Some(sys.config),
        GlobalState::Stopped(_) | GlobalState::Empty => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::RoleBuilder;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    // These tests create and join a real global system, so they must not
    // run concurrently with each other within the same process.
    static SERIAL: StdMutex<()> = StdMutex::new(());

    #[test]
    fn double_create_is_rejected_until_joined() {
        let _guard = SERIAL.lock().unwrap();
        let role = RoleBuilder::new()
            .handler(|_s, _n, _p| {
                crate::send(crate::self_id().unwrap(), Message::go_die()).unwrap();
            })
            .build();
        let first = system_create(role).unwrap();
        let second_role = RoleBuilder::new().build();
        assert_eq!(system_create(second_role).unwrap_err(), CreateError::AlreadyExists);
        system_join();
        assert!(self_id().is_none());
        let _ = first;
    }

    #[test]
    fn single_actor_lifecycle_terminates() {
        let _guard = SERIAL.lock().unwrap();
        let role = RoleBuilder::new()
            .handler(|_s, _n, _p| {
                crate::send(crate::self_id().unwrap(), Message::go_die()).unwrap();
            })
            .build();
        system_create(role).unwrap();
        system_join();
    }

    #[test]
    fn self_id_inside_handler_matches_actor_id() {
        let _guard = SERIAL.lock().unwrap();
        let observed = Arc::new(StdMutex::new(None));
        let observed_clone = Arc::clone(&observed);
        let role = RoleBuilder::new()
            .handler(move |_s, _n, _p| {
                *observed_clone.lock().unwrap() = crate::self_id();
                crate::send(crate::self_id().unwrap(), Message::go_die()).unwrap();
            })
            .build();
        let first = system_create(role).unwrap();
        system_join();
        assert_eq!(*observed.lock().unwrap(), Some(first));
    }

    #[test]
    fn system_config_reflects_the_running_system_and_clears_after_join() {
        let _guard = SERIAL.lock().unwrap();
        let config = crate::SystemConfig {
            pool_size: 3,
            ..crate::SystemConfig::default()
        };
        let role = RoleBuilder::new()
            .handler(|_s, _n, _p| {
                crate::send(crate::self_id().unwrap(), Message::go_die()).unwrap();
            })
            .build();
        system_create_with_config(role, config).unwrap();
        assert_eq!(system_config().unwrap().pool_size, 3);
        system_join();
        assert!(system_config().is_none());
    }

    #[test]
    fn send_after_join_returns_no_active_system() {
        let _guard = SERIAL.lock().unwrap();
        let role = RoleBuilder::new()
            .handler(|_s, _n, _p| {
                crate::send(crate::self_id().unwrap(), Message::go_die()).unwrap();
            })
            .build();
        let first = system_create(role).unwrap();
        system_join();
        assert_eq!(send(first, Message::go_die()).unwrap_err(), SendError::NoActiveSystem);
    }

    #[test]
    fn fan_out_spawn_under_pool_pressure_terminates() {
        let _guard = SERIAL.lock().unwrap();
        const CHILDREN: usize = 300;
        let spawned = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let spawned_clone = Arc::clone(&spawned);

        fn child_role(counter: Arc<std::sync::atomic::AtomicUsize>) -> Role {
            RoleBuilder::new()
                .handler(move |_s, _n, _p| {
                    counter.fetch_add(1, Ordering::AcqRel);
                    crate::send(crate::self_id().unwrap(), Message::go_die()).unwrap();
                })
                .build()
        }

        let first_role = RoleBuilder::new()
            .handler(move |_s, _n, _p| {
                for _ in 0..CHILDREN {
                    crate::send(
                        crate::self_id().unwrap(),
                        Message::spawn(child_role(Arc::clone(&spawned_clone))),
                    )
                    .unwrap();
                }
                crate::send(crate::self_id().unwrap(), Message::go_die()).unwrap();
            })
            .build();

        let config = SystemConfig {
            pool_size: 2,
            ..SystemConfig::default()
        };
        system_create_with_config(first_role, config).unwrap();
        system_join();
        // Give any last in-flight increments a moment; by the time
        // system_join returns every actor (including every child) has
        // already processed GoDie, so this should already be exact.
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(spawned.load(Ordering::Acquire), CHILDREN);
    }
}
