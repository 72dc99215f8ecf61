/*
 * Created on Fri Jun 16 2023
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

//! Server administration actions: `CONFIG`, `DEBUG`, `INFO`, `COMMAND` and
//! the persistence triggers

use {
    super::{keyword, ActionResult},
    crate::{
        corestore::{pattern, Data},
        protocol::responses::groups,
        queryengine::Engine,
        replication::{HandshakePhase, Role},
        resp::Reply,
        storage::aof::FsyncPolicy,
    },
    std::time::Duration,
};

pub fn config(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    match keyword(&args[0]).as_str() {
        "GET" if args.len() == 2 => Ok(config_get(engine, &args[1])),
        "SET" if args.len() == 3 => config_set(engine, &args[1], &args[2]),
        other => aerr_fmt!(
            "ERR Unknown CONFIG subcommand or wrong number of arguments for '{}'",
            other.to_ascii_lowercase()
        ),
    }
}

fn config_get(engine: &Engine, pat: &Data) -> Reply {
    let params: [(&str, String); 4] = [
        ("dir", engine.cfg.dir.display().to_string()),
        ("appendfsync", engine.cfg.appendfsync.as_str().to_owned()),
        ("maxclients", engine.cfg.maxclients.to_string()),
        ("port", engine.cfg.port.to_string()),
    ];
    let mut flat = Vec::new();
    for (name, value) in params {
        if pattern::matches(pat, name.as_bytes()) {
            flat.push(Reply::bulk(Data::from_string(name.to_owned())));
            flat.push(Reply::bulk(Data::from_string(value)));
        }
    }
    Reply::Array(flat)
}

fn config_set(engine: &mut Engine, param: &Data, value: &Data) -> ActionResult<Reply> {
    match keyword(param).as_str() {
        "APPENDFSYNC" => {
            let parsed = String::from_utf8_lossy(value).parse::<FsyncPolicy>();
            match parsed {
                Ok(policy) => {
                    engine.cfg.appendfsync = policy;
                    if let Some(aof) = engine.aof.as_mut() {
                        aof.set_policy(policy);
                    }
                    Ok(Reply::ok())
                }
                Err(_) => aerr_fmt!(
                    "ERR Invalid argument '{}' for CONFIG SET 'appendfsync'",
                    String::from_utf8_lossy(value)
                ),
            }
        }
        other => aerr_fmt!("ERR Unsupported CONFIG parameter: {}", other.to_ascii_lowercase()),
    }
}

pub fn debug(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    match keyword(&args[0]).as_str() {
        "SLEEP" if args.len() == 2 => {
            let secs: f64 = String::from_utf8_lossy(&args[1])
                .parse()
                .unwrap_or(0.0);
            // deliberately block the executor: nothing else may run while a
            // command is in flight, and this makes that observable
            std::thread::sleep(Duration::from_secs_f64(secs.max(0.0)));
            Ok(Reply::ok())
        }
        "OBJECT" if args.len() == 2 => match engine.table.raw_entry(&args[1], engine.now) {
            Some(entry) => Ok(Reply::Simple(format!(
                "Value at:0 refcount:1 encoding:{} serializedlength:{}",
                entry.value.type_name(),
                crate::storage::rdb::dump_value(&entry.value).len(),
            ))),
            None => aerr!(NO_SUCH_KEY_ERR),
        },
        other => aerr_fmt!(
            "ERR DEBUG subcommand '{}' is not supported",
            other.to_ascii_lowercase()
        ),
    }
}

pub fn command(_engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    // enough surface to keep interactive clients happy
    match args.first().map(keyword).as_deref() {
        Some("COUNT") => Ok(Reply::Integer(0)),
        _ => Ok(Reply::Static(groups::EMPTY_ARRAY)),
    }
}

pub fn info(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let filter = args.first().map(|section| keyword(section));
    let wants = |section: &str| match &filter {
        Some(f) => f == &section.to_ascii_uppercase(),
        None => true,
    };
    let mut out = String::new();
    if wants("server") {
        out.push_str("# Server\r\n");
        out.push_str(&format!("sable_version:{}\r\n", libsable::VERSION));
        out.push_str(&format!("tcp_port:{}\r\n", engine.cfg.port));
        out.push_str(&format!(
            "uptime_in_seconds:{}\r\n",
            engine.now / 1000 - engine.start_time
        ));
        out.push_str("\r\n");
    }
    if wants("clients") {
        out.push_str("# Clients\r\n");
        out.push_str(&format!("connected_clients:{}\r\n", engine.clients.len()));
        out.push_str("\r\n");
    }
    if wants("persistence") {
        out.push_str("# Persistence\r\n");
        out.push_str(&format!(
            "aof_enabled:{}\r\n",
            engine.aof.is_some() as u8
        ));
        out.push_str(&format!("rdb_last_save_time:{}\r\n", engine.lastsave));
        out.push_str(&format!("rdb_changes_since_last_save:{}\r\n", engine.dirty));
        out.push_str("\r\n");
    }
    if wants("replication") {
        out.push_str("# Replication\r\n");
        match &engine.role {
            Role::Primary(state) => {
                out.push_str("role:master\r\n");
                out.push_str(&format!("connected_slaves:{}\r\n", state.replicas.len()));
                for (idx, cid) in state.replicas.iter().enumerate() {
                    if let Some(link) = engine.clients.get(cid) {
                        out.push_str(&format!(
                            "slave{}:ip={},port={},offset={}\r\n",
                            idx,
                            link.addr.ip(),
                            link.replica_port.unwrap_or(0),
                            link.ack_offset,
                        ));
                    }
                }
                out.push_str(&format!("master_replid:{}\r\n", state.replid));
                out.push_str(&format!("master_repl_offset:{}\r\n", state.offset));
            }
            Role::Replica { host, port, status } => {
                let status = status.read();
                out.push_str("role:slave\r\n");
                out.push_str(&format!("master_host:{host}\r\n"));
                out.push_str(&format!("master_port:{port}\r\n"));
                out.push_str(&format!(
                    "master_link_status:{}\r\n",
                    if status.up { "up" } else { "down" }
                ));
                out.push_str(&format!(
                    "master_sync_in_progress:{}\r\n",
                    (status.phase == HandshakePhase::Load) as u8
                ));
                out.push_str(&format!("slave_repl_offset:{}\r\n", status.offset));
                out.push_str(&format!("master_replid:{}\r\n", status.replid));
            }
        }
        out.push_str("\r\n");
    }
    if wants("keyspace") {
        out.push_str("# Keyspace\r\n");
        let keys = engine.table.dbsize(engine.now);
        if keys > 0 {
            out.push_str(&format!("db0:keys={keys},expires=0\r\n"));
        }
        out.push_str("\r\n");
    }
    Ok(Reply::bulk(Data::from_string(out)))
}

pub fn save(engine: &mut Engine, _cid: u64, _args: &[Data]) -> ActionResult<Reply> {
    match engine.save_rdb() {
        Ok(()) => Ok(Reply::ok()),
        Err(e) => aerr_fmt!("ERR {}", e),
    }
}

pub fn bgsave(engine: &mut Engine, _cid: u64, _args: &[Data]) -> ActionResult<Reply> {
    // synchronous under the hood: the executor owns the table, and a save
    // is a plain serialization of it
    match engine.save_rdb() {
        Ok(()) => Ok(Reply::Static(groups::BGSAVE_STARTED)),
        Err(e) => aerr_fmt!("ERR {}", e),
    }
}

pub fn bgrewriteaof(engine: &mut Engine, _cid: u64, _args: &[Data]) -> ActionResult<Reply> {
    match engine.rewrite_aof() {
        Ok(()) => Ok(Reply::Static(groups::AOF_REWRITE_STARTED)),
        Err(e) => aerr_fmt!("ERR {}", e),
    }
}

pub fn lastsave(engine: &mut Engine, _cid: u64, _args: &[Data]) -> ActionResult<Reply> {
    Ok(Reply::Integer(engine.lastsave))
}
