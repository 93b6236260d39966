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

//! Scheduler glue: enqueue-on-send, the "at most one enqueue" discipline,
//! the post-burst re-check, and dispatch of the two reserved message kinds.
//! This is the part of the runtime that ties the registry and the pool
//! together; neither of those modules knows about the other.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::actor::ActorRecord;
use crate::error::SendError;
use crate::message::{ActorId, Message, MessageKind, Payload};
use crate::role::Role;
use crate::system::SystemInner;

/// Enqueues `record.id` on the runnable queue iff its mailbox is non-empty
/// and it is not already enqueued/being drained. Idempotent: calling this
/// on an already-enqueued actor is a safe no-op.
fn try_schedule(record: &ActorRecord, sys: &SystemInner) {
    let should_enqueue = {
        let mut inner = record.lock();
        if !inner.mailbox.is_empty() && !inner.is_enqueued {
            inner.is_enqueued = true;
            true
        } else {
            false
        }
    };
    if should_enqueue {
        sys.pool.enqueue(record.id);
    }
}

/// Clears `is_enqueued` once a service burst has finished draining its
/// snapshot. Any send racing with the burst either observes the cleared
/// flag and schedules the actor itself, or this function's caller performs
/// the post-burst re-check (step 7 of the dispatch loop). At least one of
/// the two paths always fires.
fn end_work(record: &ActorRecord) {
    record.lock().is_enqueued = false;
}

/// `send(target, message)`: the only way application code (or the runtime
/// itself, for `Hello`/`Spawn` follow-ups) gets a message into a mailbox.
pub(crate) fn send_envelope(
    sys: &SystemInner,
    target: ActorId,
    message: Message,
) -> Result<(), SendError> {
    if !sys.alive.load(Ordering::Acquire) {
        return Err(SendError::NoActiveSystem);
    }
    if target.as_index() >= sys.registry.len() {
        return Err(SendError::UnknownActor(target));
    }
    let record = sys
        .registry
        .get(target)
        .ok_or(SendError::UnknownActor(target))?;
    {
        let mut inner = record.lock();
        if inner.is_dead || sys.signaled.load(Ordering::Acquire) {
            return Err(SendError::DeadOrStopping(target));
        }
        inner.mailbox.push_back(message.into());
    }
    try_schedule(&record, sys);
    Ok(())
}

/// Executes exactly `snapshot` messages from `id`'s mailbox (the service
/// burst), then clears `is_enqueued` and re-checks whether more work
/// arrived during the burst.
///
/// Bounding the burst to the snapshot taken at dispatch time is what gives
/// every other runnable actor a chance to run even when a handler floods
/// its own mailbox: self-sends land behind the re-enqueue, at the tail of
/// the runnable queue, not ahead of it.
pub(crate) fn service_burst(sys: &SystemInner, id: ActorId, snapshot: usize) {
    let Some(record) = sys.registry.get(id) else {
        return;
    };
    for _ in 0..snapshot {
        let envelope = {
            let mut inner = record.lock();
            inner.mailbox.pop_front()
        };
        let Some(envelope) = envelope else { break };
        match envelope.kind {
            MessageKind::Spawn => dispatch_spawn(sys, id, envelope.payload),
            MessageKind::GoDie => dispatch_go_die(sys, id),
            MessageKind::User(index) => dispatch_user(&record, index, envelope.nbytes, envelope.payload.as_ref()),
        }
    }
    end_work(&record);
    try_schedule(&record, sys);
}

fn dispatch_spawn(sys: &SystemInner, parent: ActorId, payload: Option<Payload>) {
    if sys.signaled.load(Ordering::Acquire) {
        tracing::debug!(parent = %parent, "spawn suppressed: system is stopping");
        return;
    }
    let Some(role) = payload.as_ref().and_then(|p| p.downcast_ref::<Arc<Role>>()).cloned() else {
        tracing::warn!(parent = %parent, "spawn message carried no role, dropping");
        return;
    };
    let child = sys.registry.add(role);
    tracing::debug!(parent = %parent, child = %child, "actor spawned");
    if let Err(err) = send_envelope(sys, child, Message::hello(Some(Payload::new(parent)))) {
        tracing::warn!(child = %child, %err, "failed to deliver hello to newborn actor");
    }
}

fn dispatch_go_die(sys: &SystemInner, id: ActorId) {
    let quiescent = sys.registry.mark_dead(id);
    tracing::debug!(actor = %id, quiescent, "actor died");
    if quiescent {
        sys.alive.store(false, Ordering::Release);
        sys.pool.wake_all();
    }
}

fn dispatch_user(record: &ActorRecord, index: u32, nbytes: usize, payload: Option<&Payload>) {
    let Some(handler) = record.role.handler(index) else {
        tracing::warn!(actor = %record.id, message_type = index, "no handler registered for message type, dropping");
        return;
    };
    let mut inner = record.lock();
    handler(&mut inner.user_state, nbytes, payload);
}
