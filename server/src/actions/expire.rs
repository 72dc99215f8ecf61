/*
 * Created on Sat Jun 10 2023
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

//! # Expiration actions
//!
//! The whole `EXPIRE` family funnels into the key table's `expire_at` with
//! an absolute ms deadline; only the unit and reference point differ per
//! command. `TTL`/`PTTL` report -2 for a missing key and -1 for a
//! persistent one

use {
    super::{keyword, parse_int, ActionResult},
    crate::{
        corestore::{Data, ExpireCond},
        queryengine::Engine,
        resp::Reply,
    },
};

fn parse_cond(args: &[Data]) -> ActionResult<ExpireCond> {
    match args.first() {
        None => Ok(ExpireCond::Always),
        Some(flag) => match keyword(flag).as_str() {
            "NX" => Ok(ExpireCond::Nx),
            "XX" => Ok(ExpireCond::Xx),
            "GT" => Ok(ExpireCond::Gt),
            "LT" => Ok(ExpireCond::Lt),
            _ => aerr!(SYNTAX_ERR),
        },
    }
}

fn apply(engine: &mut Engine, key: &Data, deadline: Option<i64>, cond: ExpireCond) -> Reply {
    match deadline {
        Some(deadline) => {
            let applied = engine.table.expire_at(key, deadline, cond, engine.now);
            Reply::Integer(applied as i64)
        }
        // overflowed arithmetic can never be a reachable deadline
        None => Reply::Integer(0),
    }
}

pub fn expire(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let secs = parse_int(&args[1])?;
    let cond = parse_cond(&args[2..])?;
    let deadline = secs
        .checked_mul(1000)
        .and_then(|ms| engine.now.checked_add(ms));
    Ok(apply(engine, &args[0], deadline, cond))
}

pub fn pexpire(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let ms = parse_int(&args[1])?;
    let cond = parse_cond(&args[2..])?;
    Ok(apply(engine, &args[0], engine.now.checked_add(ms), cond))
}

pub fn expireat(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let secs = parse_int(&args[1])?;
    let cond = parse_cond(&args[2..])?;
    Ok(apply(engine, &args[0], secs.checked_mul(1000), cond))
}

pub fn pexpireat(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let ms = parse_int(&args[1])?;
    let cond = parse_cond(&args[2..])?;
    Ok(apply(engine, &args[0], Some(ms), cond))
}

pub fn ttl(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    Ok(Reply::Integer(match engine.table.pttl(&args[0], engine.now) {
        None => -2,
        Some(None) => -1,
        // round to the nearest second the way the reference server does
        Some(Some(ms)) => (ms + 500) / 1000,
    }))
}

pub fn pttl(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    Ok(Reply::Integer(match engine.table.pttl(&args[0], engine.now) {
        None => -2,
        Some(None) => -1,
        Some(Some(ms)) => ms,
    }))
}

pub fn expiretime(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    Ok(Reply::Integer(
        match engine.table.expire_time(&args[0], engine.now) {
            None => -2,
            Some(None) => -1,
            Some(Some(at)) => at / 1000,
        },
    ))
}

pub fn pexpiretime(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    Ok(Reply::Integer(
        match engine.table.expire_time(&args[0], engine.now) {
            None => -2,
            Some(None) => -1,
            Some(Some(at)) => at,
        },
    ))
}

pub fn persist(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let cleared = engine.table.persist(&args[0], engine.now);
    Ok(Reply::Integer(cleared as i64))
}
