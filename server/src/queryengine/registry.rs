/*
 * Created on Sun Jul 30 2023
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

//! # The command registry
//!
//! Every command the server knows, with its arity window (argument counts
//! exclude the command name; `None` max = unbounded), whether it is a
//! write (and hence AOF-logged and propagated), and whether subscriber
//! mode admits it. Lookup is by uppercased name; the dispatcher uppercases
//! before calling in

use {
    super::Engine,
    crate::{
        actions::{
            client, expire, generic, hashes, lists, pubsub, repl, server, sets, strings, txn,
            zsets, ActionResult,
        },
        corestore::Data,
        resp::Reply,
    },
    std::collections::HashMap,
};

pub type HandlerFn = fn(&mut Engine, u64, &[Data]) -> ActionResult<Reply>;

#[derive(Clone, Copy)]
pub struct CmdSpec {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: Option<usize>,
    pub is_write: bool,
    pub handler: HandlerFn,
}

macro_rules! registry {
    ($($name:literal => $handler:path, $min:literal, $max:expr, $write:literal);* $(;)?) => {{
        let mut map = HashMap::new();
        $(
            map.insert($name, CmdSpec {
                name: $name,
                min_args: $min,
                max_args: $max,
                is_write: $write,
                handler: $handler,
            });
        )*
        map
    }};
}

pub fn build() -> HashMap<&'static str, CmdSpec> {
    registry! {
        // connection
        "PING" => client::ping, 0, Some(1), false;
        "ECHO" => client::echo, 1, Some(1), false;
        "QUIT" => client::quit, 0, Some(0), false;
        "CLIENT" => client::client, 1, Some(3), false;
        // strings
        "SET" => strings::set, 2, Some(5), true;
        "GET" => strings::get, 1, Some(1), false;
        "GETSET" => strings::getset, 2, Some(2), true;
        "APPEND" => strings::append, 2, Some(2), true;
        "STRLEN" => strings::strlen, 1, Some(1), false;
        "INCR" => strings::incr, 1, Some(1), true;
        "DECR" => strings::decr, 1, Some(1), true;
        "INCRBY" => strings::incrby, 2, Some(2), true;
        "DECRBY" => strings::decrby, 2, Some(2), true;
        "MGET" => strings::mget, 1, None, false;
        "MSET" => strings::mset, 2, None, true;
        // generic
        "DEL" => generic::del, 1, None, true;
        "UNLINK" => generic::del, 1, None, true;
        "EXISTS" => generic::exists, 1, None, false;
        "TOUCH" => generic::exists, 1, None, false;
        "TYPE" => generic::type_of, 1, Some(1), false;
        "KEYS" => generic::keys, 1, Some(1), false;
        "RANDOMKEY" => generic::randomkey, 0, Some(0), false;
        "DBSIZE" => generic::dbsize, 0, Some(0), false;
        "RENAME" => generic::rename, 2, Some(2), true;
        "RENAMENX" => generic::renamenx, 2, Some(2), true;
        "COPY" => generic::copy, 2, Some(3), true;
        "DUMP" => generic::dump, 1, Some(1), false;
        "RESTORE" => generic::restore, 3, Some(4), true;
        "FLUSHALL" => generic::flushall, 0, Some(1), true;
        // expiration
        "TTL" => expire::ttl, 1, Some(1), false;
        "PTTL" => expire::pttl, 1, Some(1), false;
        "EXPIRETIME" => expire::expiretime, 1, Some(1), false;
        "PEXPIRETIME" => expire::pexpiretime, 1, Some(1), false;
        "EXPIRE" => expire::expire, 2, Some(3), true;
        "PEXPIRE" => expire::pexpire, 2, Some(3), true;
        "EXPIREAT" => expire::expireat, 2, Some(3), true;
        "PEXPIREAT" => expire::pexpireat, 2, Some(3), true;
        "PERSIST" => expire::persist, 1, Some(1), true;
        // lists
        "LPUSH" => lists::lpush, 2, None, true;
        "RPUSH" => lists::rpush, 2, None, true;
        "LPOP" => lists::lpop, 1, Some(2), true;
        "RPOP" => lists::rpop, 1, Some(2), true;
        "LLEN" => lists::llen, 1, Some(1), false;
        "LRANGE" => lists::lrange, 3, Some(3), false;
        // sets
        "SADD" => sets::sadd, 2, None, true;
        "SREM" => sets::srem, 2, None, true;
        "SISMEMBER" => sets::sismember, 2, Some(2), false;
        "SMEMBERS" => sets::smembers, 1, Some(1), false;
        "SCARD" => sets::scard, 1, Some(1), false;
        // hashes
        "HSET" => hashes::hset, 3, None, true;
        "HGET" => hashes::hget, 2, Some(2), false;
        "HDEL" => hashes::hdel, 2, None, true;
        "HGETALL" => hashes::hgetall, 1, Some(1), false;
        "HKEYS" => hashes::hkeys, 1, Some(1), false;
        "HVALS" => hashes::hvals, 1, Some(1), false;
        "HEXISTS" => hashes::hexists, 2, Some(2), false;
        "HLEN" => hashes::hlen, 1, Some(1), false;
        // sorted sets
        "ZADD" => zsets::zadd, 3, None, true;
        "ZREM" => zsets::zrem, 2, None, true;
        "ZSCORE" => zsets::zscore, 2, Some(2), false;
        "ZCARD" => zsets::zcard, 1, Some(1), false;
        "ZRANGE" => zsets::zrange, 3, Some(4), false;
        "ZRANGEBYSCORE" => zsets::zrangebyscore, 3, Some(4), false;
        // transactions
        "MULTI" => txn::multi, 0, Some(0), false;
        "EXEC" => txn::exec, 0, Some(0), false;
        "DISCARD" => txn::discard, 0, Some(0), false;
        "WATCH" => txn::watch, 1, None, false;
        "UNWATCH" => txn::unwatch, 0, Some(0), false;
        // pub/sub
        "SUBSCRIBE" => pubsub::subscribe, 1, None, false;
        "UNSUBSCRIBE" => pubsub::unsubscribe, 0, None, false;
        "PSUBSCRIBE" => pubsub::psubscribe, 1, None, false;
        "PUNSUBSCRIBE" => pubsub::punsubscribe, 0, None, false;
        "PUBLISH" => pubsub::publish, 2, Some(2), false;
        "PUBSUB" => pubsub::pubsub, 1, None, false;
        // server
        "CONFIG" => server::config, 1, Some(3), false;
        "DEBUG" => server::debug, 1, Some(2), false;
        "INFO" => server::info, 0, Some(1), false;
        "COMMAND" => server::command, 0, None, false;
        "SAVE" => server::save, 0, Some(0), false;
        "BGSAVE" => server::bgsave, 0, Some(1), false;
        "BGREWRITEAOF" => server::bgrewriteaof, 0, Some(0), false;
        "LASTSAVE" => server::lastsave, 0, Some(0), false;
        // replication
        "REPLCONF" => repl::replconf, 1, None, false;
        "PSYNC" => repl::psync, 2, Some(2), false;
    }
}

/// Commands a connection in subscriber mode may still run
pub fn subscriber_allowed(name: &str) -> bool {
    matches!(
        name,
        "SUBSCRIBE" | "UNSUBSCRIBE" | "PSUBSCRIBE" | "PUNSUBSCRIBE" | "PING" | "QUIT"
    )
}

#[cfg(test)]
mod tests {
    use super::build;

    #[test]
    fn registry_is_consistent() {
        let map = build();
        for (name, spec) in &map {
            assert_eq!(*name, spec.name);
            assert!(name.chars().all(|c| c.is_ascii_uppercase()));
            if let Some(max) = spec.max_args {
                assert!(spec.min_args <= max, "{name} has an inverted arity window");
            }
        }
        // the write set drives AOF and replication; pin the membership of
        // the commands the durability tests lean on
        for write_cmd in [
            "SET", "DEL", "LPUSH", "RPUSH", "LPOP", "RPOP", "SADD", "SREM", "HSET", "HDEL",
            "ZADD", "ZREM", "EXPIRE", "PEXPIREAT", "PERSIST", "RENAME", "RENAMENX", "COPY",
            "RESTORE", "FLUSHALL",
        ] {
            assert!(map[write_cmd].is_write, "{write_cmd} must be write-class");
        }
        for read_cmd in ["GET", "LRANGE", "EXEC", "SUBSCRIBE", "PSYNC", "INFO"] {
            assert!(!map[read_cmd].is_write, "{read_cmd} must not be write-class");
        }
    }
}
