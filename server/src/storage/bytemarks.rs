/*
 * Created on Wed Aug 09 2023
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

//! # Bytemarks
//!
//! Single-byte tags used by the snapshot and `DUMP` encodings. These are
//! wire-stable: bump `RDB_VERSION` before ever reassigning one

// value type tags
pub const BYTEMARK_STR: u8 = 0x00;
pub const BYTEMARK_LIST: u8 = 0x01;
pub const BYTEMARK_SET: u8 = 0x02;
pub const BYTEMARK_HASH: u8 = 0x03;
pub const BYTEMARK_ZSET: u8 = 0x04;

// expiry flags
pub const BYTEMARK_PERSISTENT: u8 = 0x00;
pub const BYTEMARK_HAS_EXPIRY: u8 = 0x01;

/// End-of-entries sentinel, followed by the checksum
pub const BYTEMARK_EOF: u8 = 0xff;

/// 8-byte snapshot magic
pub const RDB_MAGIC: &[u8; 8] = b"SABLERDB";
/// Snapshot format version
pub const RDB_VERSION: u32 = 1;
/// `DUMP`/`RESTORE` payload format version
pub const DUMP_VERSION: u16 = 1;
