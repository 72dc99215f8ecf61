/*
 * Created on Thu Jun 08 2023
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

//! # Actions
//!
//! Actions are the command handlers: you provide arguments, they mutate the
//! store through the executor's state and return a [`Reply`]. Handlers never
//! touch a socket and never log to the AOF themselves; the dispatcher owns
//! write-behind (see `queryengine`), which is what keeps transactions and
//! replica-apply on the same code path

#[macro_use]
pub mod macros;
pub mod client;
pub mod expire;
pub mod generic;
pub mod hashes;
pub mod lists;
pub mod pubsub;
pub mod repl;
pub mod server;
pub mod sets;
pub mod strings;
pub mod txn;
pub mod zsets;

use crate::{
    corestore::{Data, IncrError, Wrongtype},
    protocol::responses::groups,
    resp::Reply,
};

/// A generic result for actions
pub type ActionResult<T> = Result<T, ActionError>;

/// Errors that can occur while running actions. Both variants are error
/// *replies*: they terminate the command, never the connection
#[derive(Debug, PartialEq)]
pub enum ActionError {
    /// A pre-compiled error line from `protocol::responses`
    Static(&'static [u8]),
    /// A formatted error (without the leading `-` or trailing CRLF)
    Owned(String),
}

impl ActionError {
    pub fn into_reply(self) -> Reply {
        match self {
            // the static lines are full frames; pass them through
            ActionError::Static(raw) => Reply::Static(raw),
            ActionError::Owned(text) => Reply::Error(text),
        }
    }
}

impl From<&'static [u8]> for ActionError {
    fn from(e: &'static [u8]) -> Self {
        Self::Static(e)
    }
}

impl From<Wrongtype> for ActionError {
    fn from(_: Wrongtype) -> Self {
        Self::Static(groups::WRONGTYPE_ERR)
    }
}

impl From<IncrError> for ActionError {
    fn from(e: IncrError) -> Self {
        match e {
            IncrError::Wrongtype => Self::Static(groups::WRONGTYPE_ERR),
            IncrError::NotInteger => Self::Static(groups::NOT_INT_ERR),
        }
    }
}

/// Parse an argument that must be a decimal 64-bit integer
pub fn parse_int(arg: &Data) -> ActionResult<i64> {
    crate::util::parse_i64(arg).ok_or(ActionError::Static(groups::NOT_INT_ERR))
}

/// Parse an argument that must be a score (a double, `NaN` excluded)
pub fn parse_score_arg(arg: &Data) -> ActionResult<f64> {
    crate::util::parse_score(arg).ok_or(ActionError::Static(groups::NOT_FLOAT_ERR))
}

/// Uppercase an option/subcommand argument for keyword comparison
pub fn keyword(arg: &Data) -> String {
    String::from_utf8_lossy(arg).to_ascii_uppercase()
}
