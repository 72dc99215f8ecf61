/*
 * Created on Wed Jun 14 2023
 *
 * This file is a part of Sable
 * Sable is a free and open-source Redis-wire-compatible in-memory data
 * store written by Sayan Nandan ("the Author") with the vision to provide
 * a simple, correct and fast caching primitive without compromising on
 * compatibility with the existing client ecosystem
 *
 * Copyright (c) 2023, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! # Transaction actions
//!
//! `MULTI`/`EXEC`/`DISCARD`/`WATCH`/`UNWATCH`. The dispatcher owns the
//! queueing itself (see `queryengine`); these handlers own the state
//! transitions. `EXEC` runs the queue inline on the executor, so nothing
//! from another connection can interleave: that is the whole atomicity
//! argument, no locks involved.
//!
//! Optimistic locking: `WATCH` records each key's version counter; `EXEC`
//! re-reads them and aborts with a null array on any mismatch, including a
//! watched key having been deleted or expired in the meantime

use {
    super::{keyword, ActionResult},
    crate::{
        corestore::Data,
        queryengine::{client::TxnState, Engine},
        resp::Reply,
    },
    std::mem,
};

pub fn multi(engine: &mut Engine, cid: u64, _args: &[Data]) -> ActionResult<Reply> {
    let client = match engine.clients.get_mut(&cid) {
        Some(c) => c,
        None => return Ok(Reply::None),
    };
    if client.txn.in_txn() {
        aerr!(MULTI_NESTED_ERR);
    }
    client.txn = TxnState::Queued(Vec::new());
    Ok(Reply::ok())
}

pub fn discard(engine: &mut Engine, cid: u64, _args: &[Data]) -> ActionResult<Reply> {
    let client = match engine.clients.get_mut(&cid) {
        Some(c) => c,
        None => return Ok(Reply::None),
    };
    if !client.txn.in_txn() {
        aerr!(DISCARD_WITHOUT_MULTI_ERR);
    }
    client.txn = TxnState::Normal;
    client.watch.clear();
    Ok(Reply::ok())
}

pub fn watch(engine: &mut Engine, cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let now = engine.now;
    let Engine { table, clients, .. } = engine;
    let client = match clients.get_mut(&cid) {
        Some(c) => c,
        None => return Ok(Reply::None),
    };
    if client.txn.in_txn() {
        aerr!(WATCH_IN_MULTI_ERR);
    }
    for key in args {
        let version = table.version_of(key, now);
        client.watch.push((key.clone(), version));
    }
    Ok(Reply::ok())
}

pub fn unwatch(engine: &mut Engine, cid: u64, _args: &[Data]) -> ActionResult<Reply> {
    if let Some(client) = engine.clients.get_mut(&cid) {
        client.watch.clear();
    }
    Ok(Reply::ok())
}

pub fn exec(engine: &mut Engine, cid: u64, _args: &[Data]) -> ActionResult<Reply> {
    let client = match engine.clients.get_mut(&cid) {
        Some(c) => c,
        None => return Ok(Reply::None),
    };
    let queue = match mem::take(&mut client.txn) {
        TxnState::Normal => aerr!(EXEC_WITHOUT_MULTI_ERR),
        TxnState::Dirty => {
            client.watch.clear();
            aerr!(EXECABORT_ERR);
        }
        TxnState::Queued(queue) => queue,
    };
    let watched = mem::take(&mut client.watch);
    // optimistic check: every watched key must still be at its recorded
    // version
    let now = engine.now;
    for (key, version) in &watched {
        if engine.table.version_of(key, now) != *version {
            return Ok(Reply::NullArray);
        }
    }
    let mut replies = Vec::with_capacity(queue.len());
    for cmd in queue {
        let name = keyword(&cmd.args[0]);
        // queue-time validation guarantees the lookup succeeds
        let spec = match engine.registry.get(name.as_str()).copied() {
            Some(spec) => spec,
            None => continue,
        };
        let before = engine.table.mutation_count();
        match (spec.handler)(engine, cid, &cmd.args[1..]) {
            Ok(reply) => {
                if spec.is_write && engine.table.mutation_count() != before {
                    engine.log_and_propagate(&cmd.frame);
                }
                replies.push(reply);
            }
            Err(e) => replies.push(e.into_reply()),
        }
    }
    Ok(Reply::Array(replies))
}
