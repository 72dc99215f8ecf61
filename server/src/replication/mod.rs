/*
 * Created on Tue Jul 18 2023
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

//! # Replication
//!
//! A server is exactly one of primary or replica. The primary keeps a
//! registry of streaming replica links (by client id) and an offset that
//! counts every propagated byte; the replica side lives in its own task
//! (see [`replica`]) and shares a status cell with the executor so `INFO`
//! can report the link

pub mod replica;

use {parking_lot::RwLock, std::sync::Arc};

/// Phases of the replica-side handshake, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    Ping,
    Port,
    Capa,
    Psync,
    Load,
    Stream,
}

/// What the replica task shares with the executor
#[derive(Debug)]
pub struct LinkStatus {
    pub up: bool,
    pub phase: HandshakePhase,
    /// Offset of the last applied byte of the stream
    pub offset: u64,
    /// Replication id announced by the primary in FULLRESYNC
    pub replid: String,
}

impl Default for LinkStatus {
    fn default() -> Self {
        Self {
            up: false,
            phase: HandshakePhase::Ping,
            offset: 0,
            replid: String::new(),
        }
    }
}

#[derive(Debug)]
pub struct PrimaryState {
    /// Stable 40-hex-char replication id, minted at startup
    pub replid: String,
    /// Monotonic byte count of everything propagated to the stream
    pub offset: u64,
    /// Client ids of connections that have completed a PSYNC
    pub replicas: Vec<u64>,
}

impl PrimaryState {
    pub fn new() -> Self {
        Self {
            replid: mint_replid(),
            offset: 0,
            replicas: Vec::new(),
        }
    }
}

impl Default for PrimaryState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub enum Role {
    Primary(PrimaryState),
    Replica {
        host: String,
        port: u16,
        status: Arc<RwLock<LinkStatus>>,
    },
}

impl Role {
    pub const fn is_replica(&self) -> bool {
        matches!(self, Role::Replica { .. })
    }
}

/// A 40-hex-char replication id out of a v4 uuid (two of them, truncated)
fn mint_replid() -> String {
    let mut id = String::with_capacity(40);
    id.push_str(&uuid::Uuid::new_v4().simple().to_string());
    id.push_str(&uuid::Uuid::new_v4().simple().to_string()[..8]);
    id
}
