/*
 * Created on Wed Feb 01 2023
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

//! Primitives for generating RESP2 compatible responses

pub mod groups {
    #![allow(unused)]
    //! # Pre-compiled response lines
    //! These are complete RESP2 frames that can be written to a stream as-is.
    //! Error texts follow the upstream wording byte-for-byte: clients and
    //! client libraries match on them

    /// `+OK`, the canonical success reply
    pub const OKAY: &[u8] = "+OK\r\n".as_bytes();
    /// `+PONG`, the zero-argument `PING` reply
    pub const PONG: &[u8] = "+PONG\r\n".as_bytes();
    /// `+QUEUED`, the in-transaction acknowledgement
    pub const QUEUED: &[u8] = "+QUEUED\r\n".as_bytes();
    /// The null bulk string
    pub const NIL: &[u8] = "$-1\r\n".as_bytes();
    /// The null array (also the aborted-`EXEC` reply)
    pub const NIL_ARRAY: &[u8] = "*-1\r\n".as_bytes();
    /// An empty array
    pub const EMPTY_ARRAY: &[u8] = "*0\r\n".as_bytes();
    /// `:0`
    pub const ZERO: &[u8] = ":0\r\n".as_bytes();
    /// `:1`
    pub const ONE: &[u8] = ":1\r\n".as_bytes();
    /// The `BGREWRITEAOF` acknowledgement
    pub const AOF_REWRITE_STARTED: &[u8] =
        "+Background append only file rewriting started\r\n".as_bytes();
    /// The `BGSAVE` acknowledgement
    pub const BGSAVE_STARTED: &[u8] = "+Background saving started\r\n".as_bytes();

    /// Command run against a key holding another type of value
    pub const WRONGTYPE_ERR: &[u8] =
        "-WRONGTYPE Operation against a key holding the wrong kind of value\r\n".as_bytes();
    /// Conflicting flags or malformed options
    pub const SYNTAX_ERR: &[u8] = "-ERR syntax error\r\n".as_bytes();
    /// Integer parse failure in a value position
    pub const NOT_INT_ERR: &[u8] = "-ERR value is not an integer or out of range\r\n".as_bytes();
    /// Float parse failure in a value position
    pub const NOT_FLOAT_ERR: &[u8] = "-ERR value is not a valid float\r\n".as_bytes();
    /// Malformed `ZRANGEBYSCORE` boundary
    pub const BAD_SCORE_RANGE_ERR: &[u8] = "-ERR min or max is not a float\r\n".as_bytes();
    /// Non-positive TTL where a positive one is required
    pub const INVALID_EXPIRE_SET_ERR: &[u8] = "-ERR invalid expire time in set\r\n".as_bytes();
    /// `RENAME`/`RENAMENX` source missing
    pub const NO_SUCH_KEY_ERR: &[u8] = "-ERR no such key\r\n".as_bytes();
    /// `EXEC` outside a transaction
    pub const EXEC_WITHOUT_MULTI_ERR: &[u8] = "-ERR EXEC without MULTI\r\n".as_bytes();
    /// `DISCARD` outside a transaction
    pub const DISCARD_WITHOUT_MULTI_ERR: &[u8] = "-ERR DISCARD without MULTI\r\n".as_bytes();
    /// `MULTI` inside a transaction
    pub const MULTI_NESTED_ERR: &[u8] = "-ERR MULTI calls can not be nested\r\n".as_bytes();
    /// `WATCH` inside a transaction
    pub const WATCH_IN_MULTI_ERR: &[u8] = "-ERR WATCH inside MULTI is not allowed\r\n".as_bytes();
    /// `EXEC` after a queuing error
    pub const EXECABORT_ERR: &[u8] =
        "-EXECABORT Transaction discarded because of previous errors\r\n".as_bytes();
    /// Write attempted against a replica by a normal client
    pub const READONLY_ERR: &[u8] =
        "-READONLY You can't write against a read only replica\r\n".as_bytes();
    /// `RESTORE` against an existing key without `REPLACE`
    pub const BUSYKEY_ERR: &[u8] =
        "-BUSYKEY Target key name already exists.\r\n".as_bytes();
    /// `RESTORE` with a corrupt payload
    pub const RESTORE_BAD_PAYLOAD_ERR: &[u8] =
        "-ERR DUMP payload version or checksum are wrong\r\n".as_bytes();
    /// `CLIENT SETNAME` with whitespace in the name
    pub const BAD_CLIENT_NAME_ERR: &[u8] =
        "-ERR Client names cannot contain spaces, newlines or special characters.\r\n".as_bytes();
    /// `PSYNC`/`REPLCONF` sent to something that cannot serve them
    pub const NOT_PRIMARY_ERR: &[u8] =
        "-ERR Can't SYNC: instance is not a primary\r\n".as_bytes();
}
