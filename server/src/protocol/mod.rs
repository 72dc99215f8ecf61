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

//! # The RESP2 protocol
//!
//! This module contains the deserializer for RESP2, the wire protocol spoken
//! by Redis clients. Requests are always arrays of bulk strings; replies can
//! be any of the five frame types. The [`Parser`] is streaming: hand it the
//! read buffer as-is and it will either return a fully formed frame along
//! with the number of bytes it consumed, ask for more bytes, or report a
//! protocol violation. On "more bytes" the buffer is left untouched so the
//! next call (with more data appended) can retry from the start of the frame.
//!
//! ## Important note
//!
//! All developers willing to modify the deserializer must keep this in mind:
//! the cursor is always Ahead-Of-Position, that is, the cursor should always
//! point at the next byte that can be read.

pub mod responses;
#[cfg(test)]
mod tests;

use core::fmt;

/// The maximum size of a single bulk string (512 MB, same ceiling as Redis)
const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;
/// The maximum number of elements in a request array
const MAX_REQUEST_ARITY: usize = 1024 * 1024;

#[derive(Debug, PartialEq)]
/// # Parser Errors
///
/// Several errors can arise during parsing and this enum accounts for them
pub enum ParseError {
    /// Didn't get the number of expected bytes. Not an error: read more off
    /// the socket and try again
    NotEnough,
    /// The buffer contains a byte that is illegal at this position
    UnexpectedByte,
    /// A length field or integer failed to decode
    DatatypeParseFailure,
    /// The frame is structurally valid but semantically impossible as a
    /// request (for example a `*0` or `*-1` top-level array)
    BadPacket,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotEnough => write!(f, "incomplete frame"),
            Self::UnexpectedByte => write!(f, "unexpected byte"),
            Self::DatatypeParseFailure => write!(f, "invalid length or integer"),
            Self::BadPacket => write!(f, "invalid request frame"),
        }
    }
}

/// A generic result to indicate parsing errors through the [`ParseError`] enum
pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, PartialEq)]
/// A single decoded RESP2 frame, borrowing from the source buffer
pub enum Element<'a> {
    /// `+...\r\n`
    Simple(&'a [u8]),
    /// `-...\r\n`
    Error(&'a [u8]),
    /// `:<n>\r\n`
    Integer(i64),
    /// `$<len>\r\n<bytes>\r\n`
    Bulk(&'a [u8]),
    /// `$-1\r\n`
    NullBulk,
    /// `*<len>\r\n<frames>`
    Array(Vec<Element<'a>>),
    /// `*-1\r\n`
    NullArray,
}

/// A fully decoded request: the command name followed by its arguments, each
/// a bulk string borrowed from the source buffer
pub type Query<'a> = Vec<&'a [u8]>;

#[derive(Debug)]
/// # The RESP2 deserializer
///
/// The parser is pessimistic and will readily throw out any errors. It never
/// partially commits: [`ParseError::NotEnough`] leaves the buffer reusable
/// for the next call once more bytes have arrived
pub struct Parser<'a> {
    buffer: &'a [u8],
    cursor: usize,
}

impl<'a> Parser<'a> {
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }
    /// Returns what we have consumed so far
    const fn consumed(&self) -> usize {
        self.cursor
    }
    fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }
    fn exhausted(&self) -> bool {
        self.cursor >= self.buffer.len()
    }
    /// Read one byte off the buffer, moving the cursor past it
    fn next_byte(&mut self) -> ParseResult<u8> {
        if self.exhausted() {
            Err(ParseError::NotEnough)
        } else {
            let byte = self.buffer[self.cursor];
            self.cursor += 1;
            Ok(byte)
        }
    }
    /// Read `until` bytes from the source
    fn read_until(&mut self, until: usize) -> ParseResult<&'a [u8]> {
        if self.remaining() < until {
            Err(ParseError::NotEnough)
        } else {
            let chunk = &self.buffer[self.cursor..self.cursor + until];
            self.cursor += until;
            Ok(chunk)
        }
    }
    /// Read a line up to (but not including) the CRLF terminator. The cursor
    /// is left one past the LF. A lone LF, or a CR anywhere but directly
    /// before the LF, is a protocol violation
    fn read_line(&mut self) -> ParseResult<&'a [u8]> {
        let start = self.cursor;
        let mut pos = start;
        while pos < self.buffer.len() {
            match self.buffer[pos] {
                b'\n' => {
                    // the LF must be preceded by a CR inside this line
                    if pos == start || self.buffer[pos - 1] != b'\r' {
                        return Err(ParseError::UnexpectedByte);
                    }
                    self.cursor = pos + 1;
                    return Ok(&self.buffer[start..pos - 1]);
                }
                b'\r' => {
                    // fine only if the next byte is the LF; let the loop find it
                    if pos + 1 < self.buffer.len() && self.buffer[pos + 1] != b'\n' {
                        return Err(ParseError::UnexpectedByte);
                    }
                    pos += 1;
                }
                _ => pos += 1,
            }
        }
        Err(ParseError::NotEnough)
    }
    /// Require an exact CRLF at the cursor
    fn read_crlf(&mut self) -> ParseResult<()> {
        let crlf = self.read_until(2)?;
        if crlf == b"\r\n" {
            Ok(())
        } else {
            Err(ParseError::UnexpectedByte)
        }
    }
}

impl<'a> Parser<'a> {
    /// Parse a stream of ASCII digits into a [`usize`], rejecting empty
    /// input, non-digits and overflow
    fn parse_into_usize(bytes: &[u8]) -> ParseResult<usize> {
        if bytes.is_empty() {
            return Err(ParseError::DatatypeParseFailure);
        }
        let mut item_usize = 0usize;
        for dig in bytes {
            if !dig.is_ascii_digit() {
                return Err(ParseError::DatatypeParseFailure);
            }
            let curdig = (dig - b'0') as usize;
            item_usize = item_usize
                .checked_mul(10)
                .and_then(|v| v.checked_add(curdig))
                .ok_or(ParseError::DatatypeParseFailure)?;
        }
        Ok(item_usize)
    }
    /// Parse a (possibly signed) decimal into an [`i64`]
    fn parse_into_i64(bytes: &[u8]) -> ParseResult<i64> {
        crate::util::parse_i64(bytes).ok_or(ParseError::DatatypeParseFailure)
    }
    /// Parse a length field: either a non-negative decimal or exactly `-1`
    fn parse_length(bytes: &[u8]) -> ParseResult<Option<usize>> {
        if bytes == b"-1" {
            Ok(None)
        } else {
            Self::parse_into_usize(bytes).map(Some)
        }
    }
}

impl<'a> Parser<'a> {
    /// Parse the next frame of any of the five RESP2 types. **The cursor
    /// should be at the tsymbol (not passed)**
    fn parse_next_element(&mut self) -> ParseResult<Element<'a>> {
        let tsymbol = self.next_byte()?;
        let ret = match tsymbol {
            b'+' => Element::Simple(self.read_line()?),
            b'-' => Element::Error(self.read_line()?),
            b':' => {
                let line = self.read_line()?;
                Element::Integer(Self::parse_into_i64(line)?)
            }
            b'$' => {
                let sizeline = self.read_line()?;
                match Self::parse_length(sizeline)? {
                    Some(size) if size <= MAX_BULK_SIZE => {
                        let blob = self.read_until(size)?;
                        self.read_crlf()?;
                        Element::Bulk(blob)
                    }
                    Some(_) => return Err(ParseError::DatatypeParseFailure),
                    None => Element::NullBulk,
                }
            }
            b'*' => {
                let sizeline = self.read_line()?;
                match Self::parse_length(sizeline)? {
                    Some(size) if size <= MAX_REQUEST_ARITY => {
                        let mut array = Vec::with_capacity(size.min(64));
                        for _ in 0..size {
                            array.push(self.parse_next_element()?);
                        }
                        Element::Array(array)
                    }
                    Some(_) => return Err(ParseError::DatatypeParseFailure),
                    None => Element::NullArray,
                }
            }
            _ => return Err(ParseError::UnexpectedByte),
        };
        Ok(ret)
    }
    /// Parse the next bulk string. **The cursor should be at the tsymbol
    /// (not passed)**
    fn parse_next_blob(&mut self) -> ParseResult<&'a [u8]> {
        if self.next_byte()? != b'$' {
            return Err(ParseError::UnexpectedByte);
        }
        let sizeline = self.read_line()?;
        match Self::parse_length(sizeline)? {
            Some(size) if size <= MAX_BULK_SIZE => {
                let blob = self.read_until(size)?;
                self.read_crlf()?;
                Ok(blob)
            }
            // null bulks and oversized blobs are both illegal inside requests
            _ => Err(ParseError::BadPacket),
        }
    }
}

impl<'a> Parser<'a> {
    /// Try to parse the buffer into a request: an array of bulk strings.
    /// On success returns the query along with the number of bytes consumed,
    /// which the caller must advance its buffer by
    pub fn parse(buffer: &'a [u8]) -> ParseResult<(Query<'a>, usize)> {
        let mut slf = Self::new(buffer);
        if slf.next_byte()? != b'*' {
            return Err(ParseError::UnexpectedByte);
        }
        let sizeline = slf.read_line()?;
        let arity = match Self::parse_length(sizeline)? {
            Some(0) | None => return Err(ParseError::BadPacket),
            Some(n) if n > MAX_REQUEST_ARITY => return Err(ParseError::DatatypeParseFailure),
            Some(n) => n,
        };
        let mut query = Vec::with_capacity(arity);
        for _ in 0..arity {
            query.push(slf.parse_next_blob()?);
        }
        Ok((query, slf.consumed()))
    }
    /// Try to parse the buffer into any single RESP2 frame. This is what the
    /// replication client uses to read handshake replies and the command
    /// stream, and what the codec tests round-trip through
    pub fn parse_element(buffer: &'a [u8]) -> ParseResult<(Element<'a>, usize)> {
        let mut slf = Self::new(buffer);
        let elem = slf.parse_next_element()?;
        Ok((elem, slf.consumed()))
    }
}
