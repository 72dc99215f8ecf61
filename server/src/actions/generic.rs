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

//! # Keyspace-generic actions
//!
//! Key lifecycle and introspection: existence, deletion, renames, type
//! reporting, the glob scan, and the serialized `DUMP`/`RESTORE` pair

use {
    super::{keyword, parse_int, ActionResult},
    crate::{
        corestore::Data,
        queryengine::Engine,
        resp::Reply,
        storage::rdb,
    },
};

pub fn del(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let now = engine.now;
    let count = args.iter().filter(|key| engine.table.delete(key, now)).count();
    Ok(Reply::Integer(count as i64))
}

pub fn exists(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    // duplicates count each time they are checked
    let now = engine.now;
    let count = args.iter().filter(|key| engine.table.exists(key, now)).count();
    Ok(Reply::Integer(count as i64))
}

pub fn type_of(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    Ok(Reply::Simple(
        engine
            .table
            .type_of(&args[0], engine.now)
            .unwrap_or("none")
            .to_owned(),
    ))
}

pub fn keys(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    Ok(Reply::bulk_array(engine.table.keys(&args[0], engine.now)))
}

pub fn randomkey(engine: &mut Engine, _cid: u64, _args: &[Data]) -> ActionResult<Reply> {
    Ok(Reply::opt_bulk(engine.table.randomkey(engine.now)))
}

pub fn dbsize(engine: &mut Engine, _cid: u64, _args: &[Data]) -> ActionResult<Reply> {
    Ok(Reply::Integer(engine.table.dbsize(engine.now) as i64))
}

pub fn rename(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    match engine.table.rename(&args[0], &args[1], false, engine.now) {
        Some(_) => Ok(Reply::ok()),
        None => aerr!(NO_SUCH_KEY_ERR),
    }
}

pub fn renamenx(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    match engine.table.rename(&args[0], &args[1], true, engine.now) {
        Some(true) => Ok(Reply::Integer(1)),
        Some(false) => Ok(Reply::Integer(0)),
        None => aerr!(NO_SUCH_KEY_ERR),
    }
}

pub fn copy(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let replace = match args.get(2) {
        Some(opt) if keyword(opt) == "REPLACE" => true,
        Some(_) => aerr!(SYNTAX_ERR),
        None => false,
    };
    let copied = engine.table.copy(&args[0], &args[1], replace, engine.now);
    Ok(Reply::Integer(copied as i64))
}

pub fn flushall(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    // ASYNC/SYNC are accepted and mean the same thing here
    match args.first().map(keyword).as_deref() {
        None | Some("ASYNC") | Some("SYNC") => {}
        Some(_) => aerr!(SYNTAX_ERR),
    }
    engine.table.flushall();
    Ok(Reply::ok())
}

pub fn dump(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    match engine.table.raw_entry(&args[0], engine.now) {
        Some(entry) => Ok(Reply::bulk(rdb::dump_value(&entry.value))),
        None => Ok(Reply::NullBulk),
    }
}

pub fn restore(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let ttl_ms = parse_int(&args[1])?;
    if ttl_ms < 0 {
        aerr_fmt!("ERR Invalid TTL value, must be >= 0");
    }
    let replace = match args.get(3) {
        Some(opt) if keyword(opt) == "REPLACE" => true,
        Some(_) => aerr!(SYNTAX_ERR),
        None => false,
    };
    if !replace && engine.table.exists(&args[0], engine.now) {
        aerr!(BUSYKEY_ERR);
    }
    let value = match rdb::restore_value(&args[2]) {
        Ok(value) => value,
        Err(_) => aerr!(RESTORE_BAD_PAYLOAD_ERR),
    };
    let expires_at = if ttl_ms == 0 {
        None
    } else {
        Some(engine.now + ttl_ms)
    };
    engine.table.install(args[0].clone(), value, expires_at);
    Ok(Reply::ok())
}
