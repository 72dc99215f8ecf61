/*
 * Created on Tue Aug 22 2023
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

//! # Database networking
//!
//! The listener accepts connections under a semaphore cap; each connection
//! gets one task that owns the socket, does the RESP2 framing in both
//! directions, and talks to the executor over channels. No connection task
//! ever touches shared state

pub mod connection;
pub mod listener;

use std::{
    sync::atomic::{AtomicU64, AtomicU8, Ordering},
    time::Duration,
};

pub use listener::{BaseListener, Listener};

pub const MAXIMUM_CONNECTION_LIMIT: usize = 50000;

/// Source of connection ids (`CLIENT ID`); 0 is reserved for the virtual
/// replay/replication client
static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_client_id() -> u64 {
    NEXT_CLIENT_ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
}

/// A backoff implementation that is meant to be used in connection loops
pub struct NetBackoff {
    c: AtomicU8,
}

impl NetBackoff {
    /// The maximum backoff duration in seconds
    const MAX_BACKOFF: u8 = 64;
    /// Create a new [`NetBackoff`] instance
    pub const fn new() -> Self {
        Self {
            c: AtomicU8::new(1),
        }
    }
    /// Wait for the current backoff duration, then grow it (capped)
    pub async fn spin(&self) {
        let cur = self.c.load(Ordering::Relaxed);
        tokio::time::sleep(Duration::from_secs(cur as _)).await;
        self.c
            .store((cur << 1).min(Self::MAX_BACKOFF).max(1), Ordering::Relaxed);
    }
    /// Should we give up on this peer?
    pub fn should_disconnect(&self) -> bool {
        self.c.load(Ordering::Relaxed) >= Self::MAX_BACKOFF
    }
    /// A successful attempt resets the curve
    pub fn reset(&self) {
        self.c.store(1, Ordering::Relaxed);
    }
}
