/*
 * Created on Thu Jun 15 2023
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

//! # Pub/sub actions
//!
//! Subscribe-family handlers write their own confirmation frames (one per
//! channel, as the protocol demands) straight onto the connection's
//! outbound queue and return no reply of their own. Delivery frames are
//! enqueued at publish time; the socket task flushes them in order

use {
    super::{keyword, ActionResult},
    crate::{
        corestore::Data,
        queryengine::Engine,
        resp::{writer::encode_reply, Reply},
    },
};

fn confirmation(kind: &'static str, channel: Option<&Data>, count: usize) -> Reply {
    Reply::Array(vec![
        Reply::bulk(Data::from_blob(bytes::Bytes::from_static(kind.as_bytes()))),
        match channel {
            Some(ch) => Reply::Bulk(ch.clone()),
            None => Reply::NullBulk,
        },
        Reply::Integer(count as i64),
    ])
}

pub fn subscribe(engine: &mut Engine, cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let Engine { bus, clients, .. } = engine;
    let client = match clients.get_mut(&cid) {
        Some(c) => c,
        None => return Ok(Reply::None),
    };
    for ch in args {
        bus.subscribe(cid, ch.clone());
        client.subs.insert(ch.clone());
        let frame = confirmation("subscribe", Some(ch), client.subscription_count());
        let _ = client.tx.send(encode_reply(&frame));
    }
    Ok(Reply::None)
}

pub fn unsubscribe(engine: &mut Engine, cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let Engine { bus, clients, .. } = engine;
    let client = match clients.get_mut(&cid) {
        Some(c) => c,
        None => return Ok(Reply::None),
    };
    let targets: Vec<Data> = if args.is_empty() {
        client.subs.iter().cloned().collect()
    } else {
        args.to_vec()
    };
    if targets.is_empty() {
        // nothing to leave: one frame with a null channel
        let frame = confirmation("unsubscribe", None, client.subscription_count());
        let _ = client.tx.send(encode_reply(&frame));
        return Ok(Reply::None);
    }
    for ch in targets {
        bus.unsubscribe(cid, &ch);
        client.subs.remove(&*ch);
        let frame = confirmation("unsubscribe", Some(&ch), client.subscription_count());
        let _ = client.tx.send(encode_reply(&frame));
    }
    Ok(Reply::None)
}

pub fn psubscribe(engine: &mut Engine, cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let Engine { bus, clients, .. } = engine;
    let client = match clients.get_mut(&cid) {
        Some(c) => c,
        None => return Ok(Reply::None),
    };
    for pat in args {
        bus.psubscribe(cid, pat.clone());
        client.psubs.insert(pat.clone());
        let frame = confirmation("psubscribe", Some(pat), client.subscription_count());
        let _ = client.tx.send(encode_reply(&frame));
    }
    Ok(Reply::None)
}

pub fn punsubscribe(engine: &mut Engine, cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let Engine { bus, clients, .. } = engine;
    let client = match clients.get_mut(&cid) {
        Some(c) => c,
        None => return Ok(Reply::None),
    };
    let targets: Vec<Data> = if args.is_empty() {
        client.psubs.iter().cloned().collect()
    } else {
        args.to_vec()
    };
    if targets.is_empty() {
        let frame = confirmation("punsubscribe", None, client.subscription_count());
        let _ = client.tx.send(encode_reply(&frame));
        return Ok(Reply::None);
    }
    for pat in targets {
        bus.punsubscribe(cid, &pat);
        client.psubs.remove(&*pat);
        let frame = confirmation("punsubscribe", Some(&pat), client.subscription_count());
        let _ = client.tx.send(encode_reply(&frame));
    }
    Ok(Reply::None)
}

pub fn publish(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let Engine { bus, clients, .. } = engine;
    let deliveries = bus.publish(&args[0], &args[1]);
    let count = deliveries.len();
    for delivery in deliveries {
        if let Some(subscriber) = clients.get(&delivery.target) {
            let frame = Reply::bulk_array(delivery.frame);
            let _ = subscriber.tx.send(encode_reply(&frame));
        }
    }
    Ok(Reply::Integer(count as i64))
}

pub fn pubsub(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    match keyword(&args[0]).as_str() {
        "CHANNELS" if args.len() <= 2 => {
            let filter = args.get(1).map(|pat| pat.as_ref());
            Ok(Reply::bulk_array(engine.bus.active_channels(filter)))
        }
        "NUMSUB" => {
            let mut flat = Vec::with_capacity((args.len() - 1) * 2);
            for ch in &args[1..] {
                flat.push(Reply::Bulk(ch.clone()));
                flat.push(Reply::Integer(engine.bus.subscriber_count(ch) as i64));
            }
            Ok(Reply::Array(flat))
        }
        "NUMPAT" if args.len() == 1 => Ok(Reply::Integer(engine.bus.pattern_count() as i64)),
        other => aerr_fmt!(
            "ERR Unknown PUBSUB subcommand or wrong number of arguments for '{}'",
            other.to_ascii_lowercase()
        ),
    }
}
