/*
 * Created on Fri May 05 2023
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

//! # The pub/sub bus
//!
//! Channel and pattern registries keyed by connection id. The bus never
//! holds a connection handle: subscribers are plain u64 ids, and the
//! executor resolves ids to outbound queues at publish time. Deregistering
//! a closed connection by id is what keeps this free of dangling
//! references.
//!
//! There is no persistence: a message published while nobody subscribes is
//! gone

use {
    crate::corestore::{pattern, Data},
    std::collections::{HashMap, HashSet},
};

#[derive(Debug, Default)]
pub struct Bus {
    channels: HashMap<Data, HashSet<u64>>,
    patterns: HashMap<Data, HashSet<u64>>,
}

/// One delivery: the target connection and the frame parts to send it
pub struct Delivery {
    pub target: u64,
    /// `["message", channel, payload]` or `["pmessage", pattern, channel, payload]`
    pub frame: Vec<Data>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }
    /// Register `id` on `channel`. Returns `true` if this is a new
    /// subscription for the id
    pub fn subscribe(&mut self, id: u64, channel: Data) -> bool {
        self.channels.entry(channel).or_default().insert(id)
    }
    pub fn unsubscribe(&mut self, id: u64, channel: &[u8]) -> bool {
        let gone = match self.channels.get_mut(channel) {
            Some(subs) => subs.remove(&id),
            None => false,
        };
        if gone {
            if let Some(subs) = self.channels.get(channel) {
                if subs.is_empty() {
                    self.channels.remove(channel);
                }
            }
        }
        gone
    }
    pub fn psubscribe(&mut self, id: u64, pattern: Data) -> bool {
        self.patterns.entry(pattern).or_default().insert(id)
    }
    pub fn punsubscribe(&mut self, id: u64, pattern: &[u8]) -> bool {
        let gone = match self.patterns.get_mut(pattern) {
            Some(subs) => subs.remove(&id),
            None => false,
        };
        if gone {
            if let Some(subs) = self.patterns.get(pattern) {
                if subs.is_empty() {
                    self.patterns.remove(pattern);
                }
            }
        }
        gone
    }
    /// Compute the fan-out for one published message, in stable order:
    /// channel subscribers first, then pattern subscribers per matching
    /// pattern. Returns the deliveries and the receiver count
    pub fn publish(&self, channel: &Data, payload: &Data) -> Vec<Delivery> {
        let mut out = Vec::new();
        if let Some(subs) = self.channels.get(&**channel) {
            for &target in subs {
                out.push(Delivery {
                    target,
                    frame: vec![
                        Data::from_blob(bytes::Bytes::from_static(b"message")),
                        channel.clone(),
                        payload.clone(),
                    ],
                });
            }
        }
        for (pat, subs) in &self.patterns {
            if pattern::matches(pat, channel) {
                for &target in subs {
                    out.push(Delivery {
                        target,
                        frame: vec![
                            Data::from_blob(bytes::Bytes::from_static(b"pmessage")),
                            pat.clone(),
                            channel.clone(),
                            payload.clone(),
                        ],
                    });
                }
            }
        }
        out
    }
    /// Channels with at least one subscriber, optionally filtered
    pub fn active_channels(&self, filter: Option<&[u8]>) -> Vec<Data> {
        self.channels
            .keys()
            .filter(|ch| match filter {
                Some(pat) => pattern::matches(pat, ch),
                None => true,
            })
            .cloned()
            .collect()
    }
    pub fn subscriber_count(&self, channel: &[u8]) -> usize {
        self.channels.get(channel).map_or(0, |s| s.len())
    }
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
    /// Tear down every registration `id` holds (connection close)
    pub fn drop_subscriber(&mut self, id: u64, channels: &[Data], patterns: &[Data]) {
        for ch in channels {
            self.unsubscribe(id, ch);
        }
        for pat in patterns {
            self.punsubscribe(id, pat);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Bus;
    use crate::corestore::Data;

    fn d(s: &str) -> Data {
        Data::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn publish_reaches_channel_and_pattern_subscribers() {
        let mut bus = Bus::new();
        assert!(bus.subscribe(1, d("news")));
        assert!(bus.psubscribe(2, d("n*")));
        let deliveries = bus.publish(&d("news"), &d("hello"));
        assert_eq!(deliveries.len(), 2);
        let direct = deliveries.iter().find(|dv| dv.target == 1).unwrap();
        assert_eq!(direct.frame[0], d("message"));
        assert_eq!(direct.frame[1], d("news"));
        assert_eq!(direct.frame[2], d("hello"));
        let via_pattern = deliveries.iter().find(|dv| dv.target == 2).unwrap();
        assert_eq!(via_pattern.frame[0], d("pmessage"));
        assert_eq!(via_pattern.frame[1], d("n*"));
        assert_eq!(via_pattern.frame[2], d("news"));
        assert_eq!(via_pattern.frame[3], d("hello"));
    }

    #[test]
    fn publish_without_subscribers_is_lost() {
        let bus = Bus::new();
        assert!(bus.publish(&d("void"), &d("msg")).is_empty());
    }

    #[test]
    fn unsubscribe_cleans_empty_channels() {
        let mut bus = Bus::new();
        bus.subscribe(1, d("a"));
        assert!(bus.unsubscribe(1, b"a"));
        assert!(!bus.unsubscribe(1, b"a"));
        assert!(bus.active_channels(None).is_empty());
    }

    #[test]
    fn duplicate_subscription_is_idempotent() {
        let mut bus = Bus::new();
        assert!(bus.subscribe(1, d("a")));
        assert!(!bus.subscribe(1, d("a")));
        assert_eq!(bus.subscriber_count(b"a"), 1);
        assert_eq!(bus.publish(&d("a"), &d("x")).len(), 1);
    }

    #[test]
    fn drop_subscriber_clears_everything() {
        let mut bus = Bus::new();
        bus.subscribe(7, d("a"));
        bus.psubscribe(7, d("b*"));
        bus.drop_subscriber(7, &[d("a")], &[d("b*")]);
        assert_eq!(bus.subscriber_count(b"a"), 0);
        assert_eq!(bus.pattern_count(), 0);
    }
}
