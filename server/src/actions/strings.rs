/*
 * Created on Fri Jun 09 2023
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

//! # String actions
//!
//! `SET` carries the full option surface (`NX`/`XX`, `EX`/`PX`/`EXAT`/
//! `PXAT`/`KEEPTTL`); the integer family shares one strict base-10 parse

use {
    super::{keyword, parse_int, ActionResult},
    crate::{
        corestore::{Data, SetCond, SetExpiry},
        queryengine::Engine,
        resp::Reply,
    },
};

pub fn set(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let (key, val) = (&args[0], args[1].clone());
    let mut cond = SetCond::Any;
    let mut expiry = SetExpiry::Clear;
    let mut idx = 2;
    while idx < args.len() {
        match keyword(&args[idx]).as_str() {
            "NX" if cond == SetCond::Any => cond = SetCond::IfAbsent,
            "XX" if cond == SetCond::Any => cond = SetCond::IfPresent,
            "KEEPTTL" if expiry == SetExpiry::Clear => expiry = SetExpiry::Keep,
            kw @ ("EX" | "PX" | "EXAT" | "PXAT") if expiry == SetExpiry::Clear => {
                idx += 1;
                let raw = match args.get(idx) {
                    Some(arg) => parse_int(arg)?,
                    None => aerr!(SYNTAX_ERR),
                };
                expiry = SetExpiry::At(deadline_for(kw, raw, engine.now)?);
            }
            _ => aerr!(SYNTAX_ERR),
        }
        idx += 1;
    }
    let outcome = engine
        .table
        .set_str(key, val, expiry, cond, engine.now)?;
    Ok(match outcome {
        Some(_) => Reply::ok(),
        None => Reply::NullBulk,
    })
}

/// Convert a relative/absolute expiry argument into an absolute deadline,
/// rejecting non-positive lifetimes and arithmetic overflow
fn deadline_for(kw: &str, raw: i64, now: i64) -> ActionResult<i64> {
    let deadline = match kw {
        "EX" => raw
            .checked_mul(1000)
            .and_then(|ms| now.checked_add(ms)),
        "PX" => now.checked_add(raw),
        "EXAT" => raw.checked_mul(1000),
        "PXAT" => Some(raw),
        _ => None,
    };
    match deadline {
        // EX/PX demand a positive lifetime; EXAT/PXAT a positive timestamp
        Some(at) if raw > 0 => Ok(at),
        _ => aerr!(INVALID_EXPIRE_SET_ERR),
    }
}

pub fn get(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    Ok(Reply::opt_bulk(engine.table.get_str(&args[0], engine.now)?))
}

pub fn getset(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    // probe first: GETSET over a container must fail, not overwrite
    let old = engine.table.get_str(&args[0], engine.now)?;
    engine.table.set_str(
        &args[0],
        args[1].clone(),
        SetExpiry::Clear,
        SetCond::Any,
        engine.now,
    )?;
    Ok(Reply::opt_bulk(old))
}

pub fn append(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let newlen = engine.table.append(&args[0], &args[1], engine.now)?;
    Ok(Reply::Integer(newlen as i64))
}

pub fn strlen(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    Ok(Reply::Integer(
        engine.table.strlen(&args[0], engine.now)? as i64
    ))
}

pub fn incr(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    incr_by_delta(engine, &args[0], 1)
}

pub fn decr(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    incr_by_delta(engine, &args[0], -1)
}

pub fn incrby(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let delta = parse_int(&args[1])?;
    incr_by_delta(engine, &args[0], delta)
}

pub fn decrby(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    // negating i64::MIN has no representation, so it can never be applied
    let delta = match parse_int(&args[1])?.checked_neg() {
        Some(delta) => delta,
        None => aerr_fmt!("ERR decrement would overflow"),
    };
    incr_by_delta(engine, &args[0], delta)
}

fn incr_by_delta(engine: &mut Engine, key: &Data, delta: i64) -> ActionResult<Reply> {
    let new = engine.table.incr_by(key, delta, engine.now)?;
    Ok(Reply::Integer(new))
}

pub fn mget(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    // MGET never errors: a key of another type reads as nil
    let now = engine.now;
    Ok(Reply::Array(
        args.iter()
            .map(|key| Reply::opt_bulk(engine.table.get_str(key, now).ok().flatten()))
            .collect(),
    ))
}

pub fn mset(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    if args.len() % 2 != 0 {
        aerr_fmt!("ERR wrong number of arguments for 'mset' command");
    }
    for pair in args.chunks_exact(2) {
        engine.table.set_str(
            &pair[0],
            pair[1].clone(),
            SetExpiry::Clear,
            SetCond::Any,
            engine.now,
        )?;
    }
    Ok(Reply::ok())
}
