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

//! Reads a matrix from stdin and prints each row's sum, one actor per row:
//! row `i` spawns row `i+1`, every row computes its own sum once the whole
//! chain exists, and the result cascades back up to row 0 before printing
//! back down the chain in row order.

use std::io::{self, Read};
use std::sync::Arc;

use anyhow::{Context, Result};
use cacti::{self_id, send, system_create, system_join, ActorId, Message, Payload, Role, RoleBuilder, UserState};

type Grid = Arc<Vec<Vec<i64>>>;

#[derive(Clone)]
struct RowState {
    matrix: Grid,
    my_row: usize,
    rows: usize,
    sum: i64,
    father: Option<ActorId>,
    child: Option<ActorId>,
}

const NOTIFY: u32 = 1;
const SEND_INFO: u32 = 2;
const CALC: u32 = 3;
const NOTIFY_FATHER: u32 = 4;
const END: u32 = 5;

fn hello(_state: &mut UserState, _nbytes: usize, payload: Option<&Payload>) {
    let father = payload.and_then(|p| p.downcast_ref::<ActorId>()).copied().unwrap();
    send(father, Message::user(NOTIFY, Some(Payload::new(self_id().unwrap())))).unwrap();
}

fn get_notify(state: &mut UserState, _nbytes: usize, payload: Option<&Payload>) {
    let child = payload.and_then(|p| p.downcast_ref::<ActorId>()).copied().unwrap();
    let mine = state.get_mut::<RowState>().expect("own row state set before any child exists");
    mine.child = Some(child);
    let child_state = RowState {
        matrix: Arc::clone(&mine.matrix),
        my_row: mine.my_row + 1,
        rows: mine.rows,
        sum: 0,
        father: Some(self_id().unwrap()),
        child: None,
    };
    send(child, Message::user(SEND_INFO, Some(Payload::new(child_state)))).unwrap();
    send(self_id().unwrap(), Message::user(CALC, None)).unwrap();
}

fn get_info(state: &mut UserState, _nbytes: usize, payload: Option<&Payload>) {
    let info = payload.and_then(|p| p.downcast_ref::<RowState>()).cloned().unwrap();
    let spawn_more = info.my_row + 1 < info.rows;
    state.set(info);
    if spawn_more {
        send(self_id().unwrap(), Message::spawn(default_role())).unwrap();
    } else {
        send(self_id().unwrap(), Message::user(CALC, None)).unwrap();
    }
}

fn calculate(state: &mut UserState, _nbytes: usize, _payload: Option<&Payload>) {
    let mine = state.get_mut::<RowState>().expect("row state set by hello/get_info");
    mine.sum = mine.matrix[mine.my_row].iter().sum();
    if mine.my_row + 1 == mine.rows && mine.rows != 1 {
        send(self_id().unwrap(), Message::user(NOTIFY_FATHER, None)).unwrap();
    }
}

fn notify_father(state: &mut UserState, _nbytes: usize, _payload: Option<&Payload>) {
    let mine = state.get::<RowState>().expect("row state set by hello/get_info");
    let father = mine.father.expect("only row 0 has no father, and it never reaches here");
    if mine.my_row == 1 {
        send(father, Message::user(END, None)).unwrap();
    } else {
        send(father, Message::user(NOTIFY_FATHER, None)).unwrap();
    }
}

fn end(state: &mut UserState, _nbytes: usize, _payload: Option<&Payload>) {
    let mine = state.get::<RowState>().expect("row state set by hello/get_info");
    println!("{}", mine.sum);
    if mine.my_row + 1 < mine.rows {
        send(mine.child.expect("every non-last row has a child"), Message::user(END, None)).unwrap();
    }
    send(self_id().unwrap(), Message::go_die()).unwrap();
}

fn default_role() -> Role {
    RoleBuilder::new()
        .handler(hello)
        .handler(get_notify)
        .handler(get_info)
        .handler(calculate)
        .handler(notify_father)
        .handler(end)
        .build()
}

fn first_hello(state: &mut UserState, _nbytes: usize, payload: Option<&Payload>) {
    let Some(matrix) = payload.and_then(|p| p.downcast_ref::<Grid>()).cloned() else {
        return;
    };
    let rows = matrix.len();
    state.set(RowState {
        matrix,
        my_row: 0,
        rows,
        sum: 0,
        father: None,
        child: None,
    });
    if rows == 1 {
        send(self_id().unwrap(), Message::user(CALC, None)).unwrap();
        send(self_id().unwrap(), Message::user(END, None)).unwrap();
    } else {
        send(self_id().unwrap(), Message::spawn(default_role())).unwrap();
    }
}

fn first_role() -> Role {
    RoleBuilder::new()
        .handler(first_hello)
        .handler(get_notify)
        .handler(get_info)
        .handler(calculate)
        .handler(notify_father)
        .handler(end)
        .build()
}

fn read_matrix() -> Result<Vec<Vec<i64>>> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input).context("failed to read matrix from stdin")?;
    let mut numbers = input.split_whitespace();
    let rows: usize = numbers.next().context("expected row count")?.parse()?;
    let cols: usize = numbers.next().context("expected column count")?.parse()?;
    let mut matrix = Vec::with_capacity(rows);
    for _ in 0..rows {
        let mut row = Vec::with_capacity(cols);
        for _ in 0..cols {
            row.push(numbers.next().context("matrix has fewer values than rows * columns")?.parse()?);
        }
        matrix.push(row);
    }
    Ok(matrix)
}

fn main() -> Result<()> {
    let matrix = read_matrix()?;
    if matrix.is_empty() || matrix[0].is_empty() {
        println!("0");
        return Ok(());
    }

    let first = system_create(first_role()).context("an actor system already exists")?;
    let grid: Grid = Arc::new(matrix);
    send(first, Message::hello(Some(Payload::new(grid)))).context("failed to start row 0")?;
    system_join();
    Ok(())
}
