/*
 * Created on Sat Jun 17 2023
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

use {
    crate::corestore::Data,
    bytes::Bytes,
    std::{collections::HashSet, net::SocketAddr},
    tokio::sync::mpsc,
};

/// A command held in a transaction queue: its argv and the original frame
/// bytes for write-behind logging at `EXEC` time
#[derive(Debug)]
pub struct QueuedCmd {
    pub args: Vec<Data>,
    pub frame: Bytes,
}

/// Transaction state of a connection
#[derive(Debug, Default)]
pub enum TxnState {
    #[default]
    Normal,
    /// `MULTI` seen; commands are queuing
    Queued(Vec<QueuedCmd>),
    /// A queued command failed to validate; `EXEC` must abort
    Dirty,
}

impl TxnState {
    pub const fn in_txn(&self) -> bool {
        !matches!(self, TxnState::Normal)
    }
}

/// Everything the executor knows about one accepted connection
#[derive(Debug)]
pub struct ClientState {
    pub id: u64,
    pub addr: SocketAddr,
    pub fd: i32,
    pub name: Option<String>,
    /// Seconds since the epoch at accept time
    pub created_at: i64,
    /// Seconds since the epoch at the last dispatched command
    pub last_cmd_at: i64,
    /// Lowercased name of the last dispatched command
    pub last_cmd: String,
    /// The outbound queue: everything the executor wants on this socket
    pub tx: mpsc::UnboundedSender<Bytes>,
    /// Channel subscriptions
    pub subs: HashSet<Data>,
    /// Pattern subscriptions
    pub psubs: HashSet<Data>,
    pub txn: TxnState,
    /// `WATCH`ed keys with the version seen at watch time (`None` = absent)
    pub watch: Vec<(Data, Option<u64>)>,
    /// This connection completed a `PSYNC` and receives the write stream
    pub is_replica_link: bool,
    /// Last offset the replica on this link acknowledged
    pub ack_offset: u64,
    /// `REPLCONF listening-port`, for `INFO`
    pub replica_port: Option<u16>,
    /// `QUIT` was acknowledged: drop this client once the reply is queued
    pub closing: bool,
}

impl ClientState {
    pub fn new(id: u64, addr: SocketAddr, fd: i32, tx: mpsc::UnboundedSender<Bytes>, now_secs: i64) -> Self {
        Self {
            id,
            addr,
            fd,
            name: None,
            created_at: now_secs,
            last_cmd_at: now_secs,
            last_cmd: String::new(),
            tx,
            subs: HashSet::new(),
            psubs: HashSet::new(),
            txn: TxnState::Normal,
            watch: Vec::new(),
            is_replica_link: false,
            ack_offset: 0,
            replica_port: None,
            closing: false,
        }
    }
    /// The connection is in subscriber mode while it has any subscription
    pub fn in_subscriber_mode(&self) -> bool {
        !self.subs.is_empty() || !self.psubs.is_empty()
    }
    pub fn subscription_count(&self) -> usize {
        self.subs.len() + self.psubs.len()
    }
    /// The single-letter flag for `CLIENT LIST`
    pub fn flag(&self) -> char {
        if self.is_replica_link {
            'S'
        } else if self.in_subscriber_mode() {
            'P'
        } else {
            'N'
        }
    }
}
