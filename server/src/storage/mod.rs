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

//! # The storage engines
//!
//! Two durability mechanisms, layered: the snapshot ([`rdb`]) is the
//! point-in-time base, the append only file ([`aof`]) is the serial log
//! replayed on top of it at startup

pub mod aof;
pub mod bytemarks;
pub mod rdb;
#[cfg(test)]
mod tests;

/// The snapshot file, in the working directory
pub const RDB_FILE: &str = "dump.rdb";
/// The append only file, in the working directory
pub const AOF_FILE: &str = "appendonly.aof";
