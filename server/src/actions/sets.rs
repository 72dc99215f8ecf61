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

//! Set actions

use {
    super::ActionResult,
    crate::{corestore::Data, queryengine::Engine, resp::Reply},
};

pub fn sadd(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let members: Vec<Data> = args[1..].to_vec();
    let added = engine.table.sadd(&args[0], members, engine.now)?;
    Ok(Reply::Integer(added as i64))
}

pub fn srem(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let removed = engine.table.srem(&args[0], &args[1..], engine.now)?;
    Ok(Reply::Integer(removed as i64))
}

pub fn sismember(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let found = engine.table.sismember(&args[0], &args[1], engine.now)?;
    Ok(Reply::Integer(found as i64))
}

pub fn smembers(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    Ok(Reply::bulk_array(engine.table.smembers(&args[0], engine.now)?))
}

pub fn scard(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    Ok(Reply::Integer(engine.table.scard(&args[0], engine.now)? as i64))
}
