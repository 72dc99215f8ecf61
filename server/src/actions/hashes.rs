/*
 * Created on Mon Jun 12 2023
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

//! Hash actions. `HGETALL` replies with a flat field/value array; field
//! order is not part of the contract

use {
    super::ActionResult,
    crate::{corestore::Data, queryengine::Engine, resp::Reply},
};

pub fn hset(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    if (args.len() - 1) % 2 != 0 {
        aerr_fmt!("ERR wrong number of arguments for 'hset' command");
    }
    let pairs: Vec<(Data, Data)> = args[1..]
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect();
    let new_fields = engine.table.hset(&args[0], pairs, engine.now)?;
    Ok(Reply::Integer(new_fields as i64))
}

pub fn hget(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    Ok(Reply::opt_bulk(
        engine.table.hget(&args[0], &args[1], engine.now)?,
    ))
}

pub fn hdel(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let removed = engine.table.hdel(&args[0], &args[1..], engine.now)?;
    Ok(Reply::Integer(removed as i64))
}

pub fn hgetall(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let pairs = engine.table.hgetall(&args[0], engine.now)?;
    let mut flat = Vec::with_capacity(pairs.len() * 2);
    for (field, val) in pairs {
        flat.push(Reply::Bulk(field));
        flat.push(Reply::Bulk(val));
    }
    Ok(Reply::Array(flat))
}

pub fn hkeys(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    Ok(Reply::bulk_array(engine.table.hkeys(&args[0], engine.now)?))
}

pub fn hvals(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    Ok(Reply::bulk_array(engine.table.hvals(&args[0], engine.now)?))
}

pub fn hexists(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let found = engine.table.hexists(&args[0], &args[1], engine.now)?;
    Ok(Reply::Integer(found as i64))
}

pub fn hlen(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    Ok(Reply::Integer(engine.table.hlen(&args[0], engine.now)? as i64))
}
