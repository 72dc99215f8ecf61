/*
 * Created on Sun Jun 11 2023
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

//! # List actions
//!
//! A bare `LPOP`/`RPOP` replies with one bulk (or nil); with a count the
//! reply is an array (or nil array), even when the count is 1

use {
    super::{parse_int, ActionResult},
    crate::{corestore::Data, queryengine::Engine, resp::Reply},
};

fn push(engine: &mut Engine, args: &[Data], left: bool) -> ActionResult<Reply> {
    let vals: Vec<Data> = args[1..].to_vec();
    let newlen = engine.table.push(&args[0], vals, left, engine.now)?;
    Ok(Reply::Integer(newlen as i64))
}

pub fn lpush(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    push(engine, args, true)
}

pub fn rpush(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    push(engine, args, false)
}

fn pop(engine: &mut Engine, args: &[Data], left: bool) -> ActionResult<Reply> {
    let count = match args.get(1) {
        Some(arg) => {
            let count = parse_int(arg)?;
            if count < 0 {
                aerr_fmt!("ERR value is out of range, must be positive");
            }
            Some(count as usize)
        }
        None => None,
    };
    let popped = engine
        .table
        .pop(&args[0], count.unwrap_or(1), left, engine.now)?;
    Ok(match (popped, count) {
        // no count: single bulk or nil
        (Some(mut vals), None) => Reply::opt_bulk(vals.pop()),
        (None, None) => Reply::NullBulk,
        // with a count: array or nil array
        (Some(vals), Some(_)) => Reply::bulk_array(vals),
        (None, Some(_)) => Reply::NullArray,
    })
}

pub fn lpop(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    pop(engine, args, true)
}

pub fn rpop(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    pop(engine, args, false)
}

pub fn llen(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    Ok(Reply::Integer(engine.table.llen(&args[0], engine.now)? as i64))
}

pub fn lrange(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let start = parse_int(&args[1])?;
    let stop = parse_int(&args[2])?;
    let slice = engine.table.lrange(&args[0], start, stop, engine.now)?;
    Ok(Reply::bulk_array(slice))
}
