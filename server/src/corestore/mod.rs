/*
 * Created on Fri Mar 17 2023
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

//! # The core store
//!
//! This module contains the in-memory keyspace: the typed value model, the
//! key table with expiration metadata and version counters, and the byte
//! container that keys, members and fields are made of. Everything in here
//! is plain single-owner data; the executor task is the only thing that
//! ever holds a reference to a [`KeyTable`], which is what makes the
//! no-locks design sound

pub mod keyspace;
pub mod pattern;
pub mod zset;

pub use keyspace::{
    Entry, ExpireCond, IncrError, KeyTable, SetCond, SetExpiry, Value, Wrongtype, ZaddFlags,
};
pub use zset::{ScoreBound, SortedSet};

use bytes::Bytes;
use std::borrow::Borrow;

/// A wrapper for `Bytes`: the byte container used for keys, string values,
/// list elements, set members, hash fields and hash values. Cloning is a
/// refcount bump
#[derive(Debug, PartialEq, Clone, Hash)]
pub struct Data {
    /// The blob of data
    blob: Bytes,
}

impl Data {
    /// Create a new blob from a string
    pub fn from_string(val: String) -> Self {
        Data {
            blob: Bytes::from(val.into_bytes()),
        }
    }
    /// Create a new blob from an existing `Bytes` instance
    pub const fn from_blob(blob: Bytes) -> Self {
        Data { blob }
    }
    pub fn copy_from_slice(slice: &[u8]) -> Self {
        Self {
            blob: Bytes::copy_from_slice(slice),
        }
    }
    pub fn len(&self) -> usize {
        self.blob.len()
    }
    pub fn is_empty(&self) -> bool {
        self.blob.is_empty()
    }
}

impl Eq for Data {}

impl PartialEq<str> for Data {
    fn eq(&self, oth: &str) -> bool {
        self.blob.eq(oth)
    }
}

impl PartialEq<[u8]> for Data {
    fn eq(&self, oth: &[u8]) -> bool {
        self.blob.eq(oth)
    }
}

impl Borrow<[u8]> for Data {
    fn borrow(&self) -> &[u8] {
        &self.blob
    }
}

impl AsRef<[u8]> for Data {
    fn as_ref(&self) -> &[u8] {
        &self.blob
    }
}

impl std::ops::Deref for Data {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.blob
    }
}

impl<T> From<T> for Data
where
    T: Into<Bytes>,
{
    fn from(dat: T) -> Self {
        Self { blob: dat.into() }
    }
}
