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

//! # The snapshot format
//!
//! ```text
//! "SABLERDB" | version u32 | entry* | 0xFF | crc64 u64
//! entry := type u8 | expiry-flag u8 [ expiry-ms i64 ] | key | body
//! ```
//! All scalars little-endian; byte strings are a u64 length + bytes;
//! doubles are IEEE-754 bits. The checksum is CRC-64/REDIS over every
//! byte before it. Loads verify magic, version and checksum and refuse
//! the file otherwise; a replica that trips this aborts the sync and
//! retries the handshake.
//!
//! The per-value body codec is shared with `DUMP`/`RESTORE`, which wrap it
//! in a 2-byte format version and the same checksum

use {
    super::bytemarks::*,
    crate::{
        corestore::{Data, KeyTable, SortedSet, Value},
        util::error::{SableResult, StorageError},
    },
    crc::{Crc, CRC_64_REDIS},
    std::{
        collections::{HashMap, HashSet, VecDeque},
        fs,
        io::Write,
        path::Path,
    },
};

const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_REDIS);

// encoding

fn put_len(buf: &mut Vec<u8>, len: usize) {
    buf.extend_from_slice(&(len as u64).to_le_bytes());
}

fn put_blob(buf: &mut Vec<u8>, blob: &[u8]) {
    put_len(buf, blob.len());
    buf.extend_from_slice(blob);
}

/// Encode one value body (no type tag)
fn encode_body(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Str(s) => put_blob(buf, s),
        Value::List(list) => {
            put_len(buf, list.len());
            for item in list {
                put_blob(buf, item);
            }
        }
        Value::Set(set) => {
            put_len(buf, set.len());
            for member in set {
                put_blob(buf, member);
            }
        }
        Value::Hash(hash) => {
            put_len(buf, hash.len());
            for (field, val) in hash {
                put_blob(buf, field);
                put_blob(buf, val);
            }
        }
        Value::Zset(zset) => {
            put_len(buf, zset.len());
            for (member, score) in zset.iter_ordered() {
                put_blob(buf, member);
                buf.extend_from_slice(&score.to_bits().to_le_bytes());
            }
        }
    }
}

const fn bytemark_for(value: &Value) -> u8 {
    match value {
        Value::Str(_) => BYTEMARK_STR,
        Value::List(_) => BYTEMARK_LIST,
        Value::Set(_) => BYTEMARK_SET,
        Value::Hash(_) => BYTEMARK_HASH,
        Value::Zset(_) => BYTEMARK_ZSET,
    }
}

/// Serialize the live keyspace (expired entries filtered against `now`)
pub fn serialize(table: &KeyTable, now: i64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4096);
    buf.extend_from_slice(RDB_MAGIC);
    buf.extend_from_slice(&RDB_VERSION.to_le_bytes());
    for (key, entry) in table.entries() {
        if entry.is_expired_at(now) {
            continue;
        }
        buf.push(bytemark_for(&entry.value));
        match entry.expires_at {
            Some(at) => {
                buf.push(BYTEMARK_HAS_EXPIRY);
                buf.extend_from_slice(&at.to_le_bytes());
            }
            None => buf.push(BYTEMARK_PERSISTENT),
        }
        put_blob(&mut buf, key);
        encode_body(&mut buf, &entry.value);
    }
    buf.push(BYTEMARK_EOF);
    let checksum = CRC64.checksum(&buf);
    buf.extend_from_slice(&checksum.to_le_bytes());
    buf
}

/// Write the snapshot with a tempfile-and-rename so a crash mid-save can
/// never eat the previous snapshot
pub fn save(table: &KeyTable, path: &Path, now: i64) -> SableResult<()> {
    let bytes = serialize(table, now);
    let tmp = path.with_extension("rdb.tmp");
    let mut file = fs::File::create(&tmp)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

// decoding

struct Reader<'a> {
    buf: &'a [u8],
    at: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, at: 0 }
    }
    fn take(&mut self, n: usize) -> Result<&'a [u8], StorageError> {
        if self.buf.len() - self.at < n {
            return Err(StorageError::Truncated);
        }
        let chunk = &self.buf[self.at..self.at + n];
        self.at += n;
        Ok(chunk)
    }
    fn u8(&mut self) -> Result<u8, StorageError> {
        Ok(self.take(1)?[0])
    }
    fn u64(&mut self) -> Result<u64, StorageError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(raw))
    }
    fn i64(&mut self) -> Result<i64, StorageError> {
        Ok(self.u64()? as i64)
    }
    fn len(&mut self) -> Result<usize, StorageError> {
        let len = self.u64()?;
        // no blob can be longer than what is left in the buffer
        if len > (self.buf.len() - self.at) as u64 {
            return Err(StorageError::BadEncoding);
        }
        Ok(len as usize)
    }
    fn blob(&mut self) -> Result<Data, StorageError> {
        let len = self.len()?;
        Ok(Data::copy_from_slice(self.take(len)?))
    }
    fn f64(&mut self) -> Result<f64, StorageError> {
        Ok(f64::from_bits(self.u64()?))
    }
}

fn decode_body(reader: &mut Reader, bytemark: u8) -> Result<Value, StorageError> {
    let value = match bytemark {
        BYTEMARK_STR => Value::Str(reader.blob()?),
        BYTEMARK_LIST => {
            let len = reader.len()?;
            let mut list = VecDeque::with_capacity(len);
            for _ in 0..len {
                list.push_back(reader.blob()?);
            }
            Value::List(list)
        }
        BYTEMARK_SET => {
            let len = reader.len()?;
            let mut set = HashSet::with_capacity(len);
            for _ in 0..len {
                set.insert(reader.blob()?);
            }
            Value::Set(set)
        }
        BYTEMARK_HASH => {
            let len = reader.len()?;
            let mut hash = HashMap::with_capacity(len);
            for _ in 0..len {
                let field = reader.blob()?;
                let val = reader.blob()?;
                hash.insert(field, val);
            }
            Value::Hash(hash)
        }
        BYTEMARK_ZSET => {
            let len = reader.len()?;
            let mut zset = SortedSet::new();
            for _ in 0..len {
                let member = reader.blob()?;
                let score = reader.f64()?;
                if score.is_nan() {
                    return Err(StorageError::BadEncoding);
                }
                zset.insert(member, score);
            }
            Value::Zset(zset)
        }
        other => return Err(StorageError::UnknownBytemark(other)),
    };
    Ok(value)
}

/// Decode a full snapshot buffer into `(key, value, expiry)` triples
pub fn deserialize(bytes: &[u8]) -> Result<Vec<(Data, Value, Option<i64>)>, StorageError> {
    // the trailer must be present before anything else is believed
    if bytes.len() < RDB_MAGIC.len() + 4 + 1 + 8 {
        return Err(StorageError::Truncated);
    }
    let (payload, trailer) = bytes.split_at(bytes.len() - 8);
    let mut expected = [0u8; 8];
    expected.copy_from_slice(trailer);
    if CRC64.checksum(payload) != u64::from_le_bytes(expected) {
        return Err(StorageError::ChecksumMismatch);
    }
    let mut reader = Reader::new(payload);
    if reader.take(RDB_MAGIC.len())? != RDB_MAGIC {
        return Err(StorageError::BadHeader);
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(reader.take(4)?);
    if u32::from_le_bytes(version) != RDB_VERSION {
        return Err(StorageError::BadHeader);
    }
    let mut entries = Vec::new();
    loop {
        let bytemark = reader.u8()?;
        if bytemark == BYTEMARK_EOF {
            break;
        }
        let expires_at = match reader.u8()? {
            BYTEMARK_PERSISTENT => None,
            BYTEMARK_HAS_EXPIRY => Some(reader.i64()?),
            other => return Err(StorageError::UnknownBytemark(other)),
        };
        let key = reader.blob()?;
        let value = decode_body(&mut reader, bytemark)?;
        entries.push((key, value, expires_at));
    }
    Ok(entries)
}

/// Load a snapshot file; `Ok(None)` when there is no file to load
pub fn load(path: &Path) -> SableResult<Option<Vec<(Data, Value, Option<i64>)>>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(deserialize(&bytes)?))
}

// DUMP / RESTORE

/// The `DUMP` payload: type tag + body + format version + crc64
pub fn dump_value(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.push(bytemark_for(value));
    encode_body(&mut buf, value);
    buf.extend_from_slice(&DUMP_VERSION.to_le_bytes());
    let checksum = CRC64.checksum(&buf);
    buf.extend_from_slice(&checksum.to_le_bytes());
    buf
}

/// Decode a `RESTORE` payload, verifying version and checksum
pub fn restore_value(payload: &[u8]) -> Result<Value, StorageError> {
    if payload.len() < 1 + 2 + 8 {
        return Err(StorageError::Truncated);
    }
    let (body, trailer) = payload.split_at(payload.len() - 8);
    let mut expected = [0u8; 8];
    expected.copy_from_slice(trailer);
    if CRC64.checksum(body) != u64::from_le_bytes(expected) {
        return Err(StorageError::ChecksumMismatch);
    }
    let (body, version) = body.split_at(body.len() - 2);
    if u16::from_le_bytes([version[0], version[1]]) != DUMP_VERSION {
        return Err(StorageError::BadHeader);
    }
    let mut reader = Reader::new(body);
    let bytemark = reader.u8()?;
    let value = decode_body(&mut reader, bytemark)?;
    if reader.at != body.len() {
        return Err(StorageError::BadEncoding);
    }
    Ok(value)
}
