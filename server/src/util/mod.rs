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

pub mod error;

use {
    self::error::{Error, SableResult},
    std::{
        fs,
        io::{self, Write},
        path::{Path, PathBuf},
        process,
    },
};

const EXITCODE_ONE: i32 = 0x01;

/// Terminate the process with exit code 1
pub fn exit_error() -> ! {
    process::exit(EXITCODE_ONE)
}

/// The marker file that pins a data directory to one live server process
const LOCK_FILE: &str = ".sable_pid";

/// Exclusive ownership of a data directory for the lifetime of the
/// process. Acquisition is atomic: the pid file is opened with
/// `create_new`, so two servers racing for the same directory cannot both
/// win, and a stale winner's pid is reported in the loser's error
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
    _file: fs::File,
}

impl InstanceLock {
    pub fn acquire(dir: &Path) -> SableResult<Self> {
        fs::create_dir_all(dir)
            .map_err(|e| Error::ioerror_extra(e, format!("creating '{}'", dir.display())))?;
        let path = dir.join(LOCK_FILE);
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                writeln!(file, "{}", process::id())?;
                file.sync_all()?;
                Ok(Self { path, _file: file })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let owner = fs::read_to_string(&path).unwrap_or_default();
                Err(Error::OtherError(format!(
                    "data directory '{}' is in use by another process (pid {})",
                    dir.display(),
                    match owner.trim() {
                        "" => "unknown",
                        pid => pid,
                    }
                )))
            }
            Err(e) => Err(Error::ioerror_extra(
                e,
                format!("creating the pid file '{}'", path.display()),
            )),
        }
    }
    /// Remove the marker. Called once shutdown persistence is done
    pub fn release(self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::error!("Shutdown failure: Failed to remove pid file: {}", e);
        }
    }
}


/// Current wall-clock time as milliseconds since the UNIX epoch
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Parse a decimal signed 64-bit integer from a byte slice. This is the
/// value-space parse used by commands like `INCRBY` and `EXPIRE`; it is
/// stricter than `str::parse` in that it rejects empty input and any
/// non-digit byte
pub fn parse_i64(bytes: &[u8]) -> Option<i64> {
    if bytes.is_empty() {
        return None;
    }
    let (neg, digits) = match bytes[0] {
        b'-' => (true, &bytes[1..]),
        b'+' => (false, &bytes[1..]),
        _ => (false, bytes),
    };
    if digits.is_empty() {
        return None;
    }
    let mut val: i64 = 0;
    for dig in digits {
        if !dig.is_ascii_digit() {
            return None;
        }
        val = val.checked_mul(10)?;
        let cur = (dig - b'0') as i64;
        val = if neg {
            val.checked_sub(cur)?
        } else {
            val.checked_add(cur)?
        };
    }
    Some(val)
}

/// Parse an IEEE-754 double from a byte slice, accepting `+inf`/`-inf`/`inf`
/// (case-insensitive) the way score arguments do. `NaN` is rejected
pub fn parse_score(bytes: &[u8]) -> Option<f64> {
    let s = std::str::from_utf8(bytes).ok()?;
    match s.to_ascii_lowercase().as_str() {
        "inf" | "+inf" | "infinity" | "+infinity" => return Some(f64::INFINITY),
        "-inf" | "-infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    let parsed: f64 = s.parse().ok()?;
    if parsed.is_nan() {
        None
    } else {
        Some(parsed)
    }
}
