/*
 * Created on Tue Jan 03 2023
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

use std::{fmt, io::Error as IoError};

pub type SableResult<T> = Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// An error from the storage subsystem (AOF or snapshot)
    Storage(StorageError),
    /// A generic I/O error
    IoError(IoError),
    /// An I/O error with context about what was being attempted
    IoErrorExtra(IoError, String),
    /// A replication link error
    Replication(String),
    /// Any other error
    OtherError(String),
}

impl Error {
    pub fn ioerror_extra(ioe: IoError, extra: impl ToString) -> Self {
        Self::IoErrorExtra(ioe, extra.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(serr) => write!(f, "Storage engine error: {}", serr),
            Self::IoError(nerr) => write!(f, "I/O error: {}", nerr),
            Self::IoErrorExtra(ioe, extra) => write!(f, "I/O error while {extra}: {ioe}"),
            Self::Replication(rerr) => write!(f, "Replication error: {}", rerr),
            Self::OtherError(oerr) => write!(f, "Error: {}", oerr),
        }
    }
}

impl From<IoError> for Error {
    fn from(ioe: IoError) -> Self {
        Self::IoError(ioe)
    }
}

impl From<StorageError> for Error {
    fn from(serr: StorageError) -> Self {
        Self::Storage(serr)
    }
}

#[derive(Debug, PartialEq)]
/// Errors that can arise while decoding on-disk data
pub enum StorageError {
    /// The file header (magic/version) is not something we recognize
    BadHeader,
    /// The trailing checksum did not match the payload
    ChecksumMismatch,
    /// The file ended before the structure did
    Truncated,
    /// A type bytemark that this version does not know
    UnknownBytemark(u8),
    /// A length field or scalar failed to decode
    BadEncoding,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadHeader => write!(f, "bad file header"),
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
            Self::Truncated => write!(f, "unexpected end of file"),
            Self::UnknownBytemark(bm) => write!(f, "unknown bytemark {bm:#04x}"),
            Self::BadEncoding => write!(f, "bad encoding"),
        }
    }
}
