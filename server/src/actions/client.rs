/*
 * Created on Tue Jun 13 2023
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

//! Connection-level actions: `PING`, `ECHO`, `QUIT` and the `CLIENT`
//! subcommands

use {
    super::{keyword, ActionResult},
    crate::{corestore::Data, protocol::responses::groups, queryengine::Engine, resp::Reply},
};

pub fn ping(_engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    // the protocol quirk: bare PING gets a simple string, PING x echoes a bulk
    Ok(match args.first() {
        None => Reply::Static(groups::PONG),
        Some(msg) => Reply::Bulk(msg.clone()),
    })
}

pub fn echo(_engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    Ok(Reply::Bulk(args[0].clone()))
}

pub fn quit(engine: &mut Engine, cid: u64, _args: &[Data]) -> ActionResult<Reply> {
    if let Some(client) = engine.clients.get_mut(&cid) {
        client.closing = true;
    }
    Ok(Reply::ok())
}

pub fn client(engine: &mut Engine, cid: u64, args: &[Data]) -> ActionResult<Reply> {
    match keyword(&args[0]).as_str() {
        "ID" if args.len() == 1 => Ok(Reply::Integer(cid as i64)),
        "GETNAME" if args.len() == 1 => {
            let name = engine
                .clients
                .get(&cid)
                .and_then(|c| c.name.clone())
                .unwrap_or_default();
            Ok(Reply::bulk(Data::from_string(name)))
        }
        "SETNAME" if args.len() == 2 => setname(engine, cid, &args[1]),
        "LIST" if args.len() == 1 => Ok(list(engine)),
        other => aerr_fmt!(
            "ERR Unknown CLIENT subcommand or wrong number of arguments for '{}'",
            other.to_ascii_lowercase()
        ),
    }
}

fn setname(engine: &mut Engine, cid: u64, name: &Data) -> ActionResult<Reply> {
    let printable = name
        .iter()
        .all(|b| (b'!'..=b'~').contains(b));
    if !printable {
        aerr!(BAD_CLIENT_NAME_ERR);
    }
    if let Some(client) = engine.clients.get_mut(&cid) {
        client.name = Some(String::from_utf8_lossy(name).into_owned());
    }
    Ok(Reply::ok())
}

fn list(engine: &Engine) -> Reply {
    let now_secs = engine.now / 1000;
    let mut ids: Vec<u64> = engine.clients.keys().copied().collect();
    ids.sort_unstable();
    let mut out = String::new();
    for id in ids {
        let c = &engine.clients[&id];
        out.push_str(&format!(
            "id={} addr={} fd={} name={} age={} idle={} flags={} cmd={}\n",
            c.id,
            c.addr,
            c.fd,
            c.name.as_deref().unwrap_or(""),
            now_secs.saturating_sub(c.created_at),
            now_secs.saturating_sub(c.last_cmd_at),
            c.flag(),
            c.last_cmd,
        ));
    }
    Reply::bulk(Data::from_string(out))
}
