/*
 * Created on Wed Jul 19 2023
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

//! # Primary-side replication actions
//!
//! `PSYNC` turns an ordinary connection into a streaming replica link:
//! reply `+FULLRESYNC <replid> <offset>`, then the whole keyspace as an
//! RDB blob framed `$<len>\r\n<bytes>` (no trailing CRLF), then every
//! subsequent write as it happens. Partial resync is not offered; any
//! `PSYNC` gets the full treatment

use {
    super::{keyword, parse_int, ActionResult},
    crate::{
        corestore::Data,
        queryengine::Engine,
        replication::Role,
        resp::Reply,
        storage::rdb,
    },
    bytes::{BufMut, BytesMut},
};

pub fn replconf(engine: &mut Engine, cid: u64, args: &[Data]) -> ActionResult<Reply> {
    match keyword(&args[0]).as_str() {
        "LISTENING-PORT" if args.len() == 2 => {
            let port = parse_int(&args[1])?;
            if let Some(client) = engine.clients.get_mut(&cid) {
                client.replica_port = u16::try_from(port).ok();
            }
            Ok(Reply::ok())
        }
        "CAPA" => Ok(Reply::ok()),
        "ACK" if args.len() == 2 => {
            let offset = parse_int(&args[1])?;
            if let Some(client) = engine.clients.get_mut(&cid) {
                client.ack_offset = offset.max(0) as u64;
            }
            // ACK is one-way: the replica is not waiting for a reply
            Ok(Reply::None)
        }
        other => aerr_fmt!(
            "ERR Unrecognized REPLCONF option: {}",
            other.to_ascii_lowercase()
        ),
    }
}

pub fn psync(engine: &mut Engine, cid: u64, _args: &[Data]) -> ActionResult<Reply> {
    let (replid, offset) = match &mut engine.role {
        Role::Primary(state) => {
            if !state.replicas.contains(&cid) {
                state.replicas.push(cid);
            }
            (state.replid.clone(), state.offset)
        }
        Role::Replica { .. } => aerr!(NOT_PRIMARY_ERR),
    };
    let snapshot = rdb::serialize(&engine.table, engine.now);
    let client = match engine.clients.get_mut(&cid) {
        Some(c) => c,
        None => return Ok(Reply::None),
    };
    client.is_replica_link = true;
    client.ack_offset = 0;
    let mut buf = BytesMut::new();
    buf.put_slice(format!("+FULLRESYNC {replid} {offset}\r\n").as_bytes());
    buf.put_slice(format!("${}\r\n", snapshot.len()).as_bytes());
    buf.put_slice(&snapshot);
    let _ = client.tx.send(buf.freeze());
    Ok(Reply::None)
}
