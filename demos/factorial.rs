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

//! Reads `n` from stdin and prints `n!`, computed by a chain of actors:
//! the current link spawns the next one, hands it the running product once
//! it announces itself, and dies; the last link prints the total.

use std::io::Read;

use anyhow::{Context, Result};
use cacti::{self_id, send, system_create, system_join, ActorId, Message, Payload, Role, RoleBuilder};

#[derive(Clone, Copy)]
struct Running {
    n: u64,
    next: u64,
    acc: u64,
}

/// Sent to a freshly spawned link's own `hello` slot (index 0): announces
/// its id to the parent that spawned it.
fn hello_handler(state: &mut cacti::UserState, _nbytes: usize, payload: Option<&Payload>) {
    let Some(parent) = payload.and_then(|p| p.downcast_ref::<ActorId>()).copied() else {
        return;
    };
    let _ = state;
    send(parent, Message::user(1, Some(Payload::new(self_id().unwrap())))).unwrap();
}

/// Slot 1, shared by the first link and every later link: a just-spawned
/// child has announced itself, so hand it the running product and die.
fn announce_handler(state: &mut cacti::UserState, _nbytes: usize, payload: Option<&Payload>) {
    let child = payload.and_then(|p| p.downcast_ref::<ActorId>()).copied().unwrap();
    let running = state.get::<Running>().copied().expect("set before spawning the child");
    send(child, Message::user(2, Some(Payload::new(running)))).unwrap();
    send(self_id().unwrap(), Message::go_die()).unwrap();
}

/// Slot 2, only on non-first links: multiply in this link's factor, then
/// either finish the chain or spawn the next link.
fn calc_handler(state: &mut cacti::UserState, _nbytes: usize, payload: Option<&Payload>) {
    let mut running = payload.and_then(|p| p.downcast_ref::<Running>()).copied().unwrap();
    running.acc *= running.next;
    if running.next == running.n {
        println!("{}", running.acc);
        send(self_id().unwrap(), Message::go_die()).unwrap();
    } else {
        running.next += 1;
        state.set(running);
        send(self_id().unwrap(), Message::spawn(default_role())).unwrap();
    }
}

fn default_role() -> Role {
    RoleBuilder::new()
        .handler(hello_handler)
        .handler(announce_handler)
        .handler(calc_handler)
        .build()
}

/// Slot 0 of the first link: the system auto-sends a payload-less hello on
/// creation, which this ignores; the real computation starts once `main`
/// sends the one carrying `n`.
fn first_hello_handler(state: &mut cacti::UserState, _nbytes: usize, payload: Option<&Payload>) {
    let Some(n) = payload.and_then(|p| p.downcast_ref::<u64>()).copied() else {
        return;
    };
    if n == 0 || n == 1 {
        println!("1");
        send(self_id().unwrap(), Message::go_die()).unwrap();
    } else {
        state.set(Running { n, next: 2, acc: 1 });
        send(self_id().unwrap(), Message::spawn(default_role())).unwrap();
    }
}

fn first_role() -> Role {
    RoleBuilder::new().handler(first_hello_handler).handler(announce_handler).build()
}

fn main() -> Result<()> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read n from stdin")?;
    let n: u64 = input
        .split_whitespace()
        .next()
        .context("expected a single integer n")?
        .parse()
        .context("n must be a non-negative integer")?;

    let first = system_create(first_role()).context("an actor system already exists")?;
    send(first, Message::hello(Some(Payload::new(n)))).context("failed to start the chain")?;
    system_join();
    Ok(())
}
