/*
 * Created on Thu Apr 20 2023
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

//! # Response primitives
//!
//! Command handlers return a [`Reply`]; the dispatcher serializes it with
//! [`writer::write_reply`] and hands the bytes to the connection's outbound
//! queue. Encoding is total: every `Reply` maps to exactly one byte
//! sequence

pub mod writer;

use crate::corestore::Data;

#[derive(Debug, Clone, PartialEq)]
/// An internal reply value, one variant per RESP2 frame shape plus a
/// passthrough for the pre-compiled lines in `protocol::responses`
pub enum Reply {
    /// Nothing at all: the handler already queued its own frames (pub/sub
    /// confirmations, PSYNC) or the command takes no reply (REPLCONF ACK)
    None,
    /// A whole pre-encoded frame (must already carry its CRLFs)
    Static(&'static [u8]),
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Data),
    NullBulk,
    Array(Vec<Reply>),
    NullArray,
}

impl Reply {
    pub const fn ok() -> Self {
        Reply::Static(crate::protocol::responses::groups::OKAY)
    }
    pub fn bulk(data: impl Into<Data>) -> Self {
        Reply::Bulk(data.into())
    }
    /// Optional bulk: `None` is the null bulk string
    pub fn opt_bulk(data: Option<Data>) -> Self {
        match data {
            Some(data) => Reply::Bulk(data),
            None => Reply::NullBulk,
        }
    }
    /// An array of bulks out of any iterable of byte containers
    pub fn bulk_array(items: impl IntoIterator<Item = Data>) -> Self {
        Reply::Array(items.into_iter().map(Reply::Bulk).collect())
    }
    /// A score formatted the way Redis prints doubles: integral scores
    /// lose the decimal point, infinities render as `inf`/`-inf`
    pub fn score(score: f64) -> Self {
        Reply::Bulk(Data::from_string(format_score(score)))
    }
}

/// Format a score for the wire
pub fn format_score(score: f64) -> String {
    if score == f64::INFINITY {
        "inf".to_owned()
    } else if score == f64::NEG_INFINITY {
        "-inf".to_owned()
    } else if score == score.trunc() && score.abs() < 1e17 {
        format!("{}", score as i64)
    } else {
        format!("{}", score)
    }
}
