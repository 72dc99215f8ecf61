/*
 * Created on Thu Aug 10 2023
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

//! # The append only file
//!
//! Every effective write-class command lands here as its original RESP2
//! request frame, so the file is itself a valid RESP2 stream and replay is
//! just the normal dispatch path with logging and propagation switched
//! off. `always` fsyncs per append, `everysec` rides the flush ticker,
//! `no` leaves it to the OS.
//!
//! The rewrite compacts the log into the canonical command stream that
//! rebuilds the current keyspace (`SET`/`RPUSH`/`SADD`/`HSET`/`ZADD` plus
//! a `PEXPIREAT` per deadline), written to a tempfile and swapped in

use {
    crate::{
        corestore::{Data, KeyTable, Value},
        protocol::{ParseError, Parser},
        resp::{format_score, writer::write_request},
        util::error::SableResult,
    },
    bytes::BytesMut,
    std::{
        fs::{self, File, OpenOptions},
        io::{BufWriter, Write},
        path::{Path, PathBuf},
        str::FromStr,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsyncPolicy {
    Always,
    EverySec,
    No,
}

impl FsyncPolicy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FsyncPolicy::Always => "always",
            FsyncPolicy::EverySec => "everysec",
            FsyncPolicy::No => "no",
        }
    }
}

impl FromStr for FsyncPolicy {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, ()> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(FsyncPolicy::Always),
            "everysec" => Ok(FsyncPolicy::EverySec),
            "no" => Ok(FsyncPolicy::No),
            _ => Err(()),
        }
    }
}

#[derive(Debug)]
pub struct Aof {
    file: BufWriter<File>,
    path: PathBuf,
    policy: FsyncPolicy,
    /// Unsynced appends are pending (everysec)
    needs_flush: bool,
}

impl Aof {
    /// Open (or create) the log for appending
    pub fn open(path: PathBuf, policy: FsyncPolicy) -> SableResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            file: BufWriter::new(file),
            path,
            policy,
            needs_flush: false,
        })
    }
    pub fn set_policy(&mut self, policy: FsyncPolicy) {
        self.policy = policy;
    }
    /// Append one request frame, honoring the fsync policy
    pub fn append(&mut self, frame: &[u8]) -> SableResult<()> {
        self.file.write_all(frame)?;
        match self.policy {
            FsyncPolicy::Always => {
                self.file.flush()?;
                self.file.get_ref().sync_data()?;
            }
            FsyncPolicy::EverySec => self.needs_flush = true,
            FsyncPolicy::No => {
                self.file.flush()?;
            }
        }
        Ok(())
    }
    /// The everysec ticker: flush whatever accumulated since the last tick
    pub fn flush_tick(&mut self) {
        if !self.needs_flush {
            return;
        }
        self.needs_flush = false;
        if let Err(e) = self.file.flush().and_then(|_| self.file.get_ref().sync_data()) {
            log::error!("Failed to flush AOF: {e}");
        }
    }
    /// Flush and fsync everything (shutdown path)
    pub fn sync_all(&mut self) -> SableResult<()> {
        self.file.flush()?;
        self.file.get_ref().sync_all()?;
        Ok(())
    }
    /// Replace the log with the canonical command stream for `table`.
    /// Tempfile + rename, then the append handle moves to the new file
    pub fn rewrite(&mut self, table: &KeyTable, now: i64) -> SableResult<()> {
        let tmp = self.path.with_extension("aof.tmp");
        {
            let mut out = BufWriter::new(File::create(&tmp)?);
            let mut buf = BytesMut::new();
            for (key, entry) in table.entries() {
                if entry.is_expired_at(now) {
                    continue;
                }
                buf.clear();
                rebuild_value(&mut buf, key, &entry.value);
                if let Some(at) = entry.expires_at {
                    write_request(
                        &mut buf,
                        [b"PEXPIREAT".as_ref(), key.as_ref(), at.to_string().as_bytes()],
                    );
                }
                out.write_all(&buf)?;
            }
            out.flush()?;
            out.get_ref().sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        let file = OpenOptions::new().append(true).open(&self.path)?;
        self.file = BufWriter::new(file);
        self.needs_flush = false;
        Ok(())
    }
}

/// The command that rebuilds one value at one key
fn rebuild_value(buf: &mut BytesMut, key: &Data, value: &Value) {
    match value {
        Value::Str(s) => {
            write_request(buf, [b"SET".as_ref(), key.as_ref(), s.as_ref()]);
        }
        Value::List(list) => {
            let mut parts: Vec<&[u8]> = Vec::with_capacity(list.len() + 2);
            parts.push(b"RPUSH");
            parts.push(key);
            parts.extend(list.iter().map(|item| item.as_ref()));
            write_request(buf, parts);
        }
        Value::Set(set) => {
            let mut parts: Vec<&[u8]> = Vec::with_capacity(set.len() + 2);
            parts.push(b"SADD");
            parts.push(key);
            parts.extend(set.iter().map(|member| member.as_ref()));
            write_request(buf, parts);
        }
        Value::Hash(hash) => {
            let mut parts: Vec<&[u8]> = Vec::with_capacity(hash.len() * 2 + 2);
            parts.push(b"HSET");
            parts.push(key);
            for (field, val) in hash {
                parts.push(field);
                parts.push(val);
            }
            write_request(buf, parts);
        }
        Value::Zset(zset) => {
            let scores: Vec<String> = zset
                .iter_ordered()
                .map(|(_, score)| format_score(score))
                .collect();
            let mut parts: Vec<&[u8]> = Vec::with_capacity(zset.len() * 2 + 2);
            parts.push(b"ZADD");
            parts.push(key);
            for ((member, _), score_repr) in zset.iter_ordered().zip(&scores) {
                parts.push(score_repr.as_bytes());
                parts.push(member);
            }
            write_request(buf, parts);
        }
    }
}

/// Read the whole log as a sequence of request argvs. A clean or missing
/// file yields what it has; a torn tail (truncated last frame) is dropped
/// with a warning; any other malformation stops the scan at the last good
/// frame
pub fn load_frames(path: &Path) -> SableResult<Vec<Vec<Data>>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut frames = Vec::new();
    let mut at = 0;
    while at < bytes.len() {
        match Parser::parse(&bytes[at..]) {
            Ok((query, consumed)) => {
                frames.push(query.iter().map(|arg| Data::copy_from_slice(arg)).collect());
                at += consumed;
            }
            Err(ParseError::NotEnough) => {
                log::warn!("AOF has a truncated trailing frame; dropping it");
                break;
            }
            Err(e) => {
                log::error!("AOF is corrupt at byte {at} ({e}); stopping replay there");
                break;
            }
        }
    }
    Ok(frames)
}
