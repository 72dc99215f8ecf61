/*
 * Created on Sat Mar 18 2023
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

//! # The key table
//!
//! The mapping from byte-string keys to typed values, with per-entry
//! expiration deadlines and version counters. Expiration is lazy: any
//! operation that touches a key first checks its deadline and evicts it if
//! the deadline has passed, so no reader can ever observe a stale value.
//! Containers that a mutation empties are removed in the same call.
//!
//! Every mutation advances a table-global counter; the value the counter
//! had at the time of the last mutation of a key is that key's "version".
//! `WATCH` snapshots versions and `EXEC` compares them, and the dispatcher
//! compares the global counter across a handler run to decide whether the
//! command had an effect worth logging and propagating.

use {
    super::{zset::SortedSet, Data},
    std::collections::{HashMap, HashSet, VecDeque},
};

/// Marker for "the key holds another kind of value"
#[derive(Debug, PartialEq, Eq)]
pub struct Wrongtype;

/// Errors from the string-integer operations (`INCR` and friends)
#[derive(Debug, PartialEq, Eq)]
pub enum IncrError {
    Wrongtype,
    /// Not a base-10 64-bit integer, or the arithmetic overflowed
    NotInteger,
}

#[derive(Debug, Clone, PartialEq)]
/// A value is one of five variants. Each variant owns its contents:
/// replacing a value at a key releases the prior value's storage
pub enum Value {
    Str(Data),
    List(VecDeque<Data>),
    Set(HashSet<Data>),
    Hash(HashMap<Data, Data>),
    Zset(SortedSet),
}

impl Value {
    /// The name reported by `TYPE`
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Hash(_) => "hash",
            Value::Zset(_) => "zset",
        }
    }
    fn is_empty_container(&self) -> bool {
        match self {
            Value::Str(_) => false,
            Value::List(l) => l.is_empty(),
            Value::Set(s) => s.is_empty(),
            Value::Hash(h) => h.is_empty(),
            Value::Zset(z) => z.is_empty(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub value: Value,
    /// Absolute expiry deadline in ms since the epoch; `None` is persistent
    pub expires_at: Option<i64>,
    /// The table-global mutation count at the time this entry was last
    /// created or modified
    pub version: u64,
}

impl Entry {
    pub fn is_expired_at(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}

/// Expiry policy for `SET`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetExpiry {
    /// Drop any existing deadline (the default for a plain `SET`)
    Clear,
    /// `KEEPTTL`: retain whatever deadline the key had
    Keep,
    /// An absolute deadline in ms
    At(i64),
}

/// Presence condition for `SET`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetCond {
    Any,
    /// `NX`
    IfAbsent,
    /// `XX`
    IfPresent,
}

/// Condition for the `EXPIRE` family
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExpireCond {
    Always,
    /// Only if the key has no deadline
    Nx,
    /// Only if the key has a deadline
    Xx,
    /// Only if the new deadline is later than the current one (a persistent
    /// key counts as infinitely late)
    Gt,
    /// Only if the new deadline is earlier than the current one
    Lt,
}

/// Flags accepted by `ZADD`. Flag compatibility is validated at the command
/// boundary; this struct only carries the decisions
#[derive(Debug, Clone, Copy, Default)]
pub struct ZaddFlags {
    pub nx: bool,
    pub xx: bool,
    pub gt: bool,
    pub lt: bool,
    pub ch: bool,
}

/// Normalize an `(start, stop)` pair of signed, end-relative, inclusive
/// indices against a length: negative values index from the end, then both
/// are clamped into `[0, len - 1]`. Empty iff `start > stop` after
/// normalization
pub fn normalize_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    debug_assert!(len > 0);
    let norm = |i: i64| -> usize {
        let i = if i < 0 { i + len as i64 } else { i };
        i.clamp(0, len as i64 - 1) as usize
    };
    let (start, stop) = (norm(start), norm(stop));
    if start > stop {
        None
    } else {
        Some((start, stop))
    }
}

#[derive(Debug, Default)]
pub struct KeyTable {
    map: HashMap<Data, Entry>,
    /// Global mutation counter; see the module docs
    mutations: u64,
}

impl KeyTable {
    pub fn new() -> Self {
        Self::default()
    }
    /// The total number of mutations this table has seen
    pub const fn mutation_count(&self) -> u64 {
        self.mutations
    }
    fn bump(&mut self) -> u64 {
        self.mutations += 1;
        self.mutations
    }
    /// Evict `key` if its deadline has passed. Eviction counts as a mutation
    fn evict_if_expired(&mut self, key: &[u8], now: i64) {
        let expired = match self.map.get(key) {
            Some(e) => e.is_expired_at(now),
            None => return,
        };
        if expired {
            self.map.remove(key);
            self.bump();
        }
    }
    /// Live-entry lookup. This is the only way any operation below reaches
    /// an entry, which is what enforces the lazy-expiry invariant
    fn live(&mut self, key: &[u8], now: i64) -> Option<&Entry> {
        self.evict_if_expired(key, now);
        self.map.get(key)
    }
    fn live_mut(&mut self, key: &[u8], now: i64) -> Option<&mut Entry> {
        self.evict_if_expired(key, now);
        self.map.get_mut(key)
    }
    /// Remove the key if the last mutation left it an empty container
    fn drop_if_empty(&mut self, key: &[u8]) {
        if let Some(e) = self.map.get(key) {
            if e.value.is_empty_container() {
                self.map.remove(key);
            }
        }
    }
    /// Remove every expired entry right now. Bulk read-outs (`KEYS`,
    /// `DBSIZE`, `RANDOMKEY`) go through this so they never see the dead
    fn sweep(&mut self, now: i64) {
        let dead: Vec<Data> = self
            .map
            .iter()
            .filter(|(_, e)| e.is_expired_at(now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in dead {
            self.map.remove(&*key);
            self.bump();
        }
    }
}

// generic operations
impl KeyTable {
    pub fn exists(&mut self, key: &[u8], now: i64) -> bool {
        self.live(key, now).is_some()
    }
    pub fn delete(&mut self, key: &[u8], now: i64) -> bool {
        self.evict_if_expired(key, now);
        if self.map.remove(key).is_some() {
            self.bump();
            true
        } else {
            false
        }
    }
    pub fn type_of(&mut self, key: &[u8], now: i64) -> Option<&'static str> {
        self.live(key, now).map(|e| e.value.type_name())
    }
    /// The key's current version, `None` if absent. Used by `WATCH`
    pub fn version_of(&mut self, key: &[u8], now: i64) -> Option<u64> {
        self.live(key, now).map(|e| e.version)
    }
    pub fn dbsize(&mut self, now: i64) -> usize {
        self.sweep(now);
        self.map.len()
    }
    pub fn keys(&mut self, pattern: &[u8], now: i64) -> Vec<Data> {
        self.sweep(now);
        self.map
            .keys()
            .filter(|k| super::pattern::matches(pattern, k))
            .cloned()
            .collect()
    }
    pub fn randomkey(&mut self, now: i64) -> Option<Data> {
        self.sweep(now);
        if self.map.is_empty() {
            return None;
        }
        // the map's per-process seeded iteration order plus a rolling offset
        // gives an arbitrary (not uniform) pick, which is all RANDOMKEY
        // promises
        let nth = (self.mutations as usize).wrapping_mul(31) % self.map.len();
        self.map.keys().nth(nth).cloned()
    }
    pub fn rename(&mut self, src: &[u8], dst: &[u8], nx: bool, now: i64) -> Option<bool> {
        self.evict_if_expired(src, now);
        self.evict_if_expired(dst, now);
        if !self.map.contains_key(src) {
            return None;
        }
        if nx && self.map.contains_key(dst) {
            return Some(false);
        }
        let mut entry = match self.map.remove(src) {
            Some(e) => e,
            None => return None,
        };
        entry.version = self.bump();
        self.map.insert(Data::copy_from_slice(dst), entry);
        Some(true)
    }
    pub fn copy(&mut self, src: &[u8], dst: &[u8], replace: bool, now: i64) -> bool {
        self.evict_if_expired(src, now);
        self.evict_if_expired(dst, now);
        let entry = match self.map.get(src) {
            Some(e) => e.clone(),
            None => return false,
        };
        if !replace && self.map.contains_key(dst) {
            return false;
        }
        let version = self.bump();
        self.map.insert(
            Data::copy_from_slice(dst),
            Entry {
                value: entry.value,
                expires_at: entry.expires_at,
                version,
            },
        );
        true
    }
    pub fn flushall(&mut self) {
        self.map.clear();
        self.bump();
    }
    /// Raw read-only view of the entries. Snapshotting and the AOF rewrite
    /// iterate this and filter expired entries themselves
    pub fn entries(&self) -> impl Iterator<Item = (&Data, &Entry)> {
        self.map.iter()
    }
    pub fn raw_entry(&mut self, key: &[u8], now: i64) -> Option<&Entry> {
        self.live(key, now)
    }
    /// Install an entry wholesale (`RESTORE`, snapshot load)
    pub fn install(&mut self, key: Data, value: Value, expires_at: Option<i64>) {
        let version = self.bump();
        self.map.insert(
            key,
            Entry {
                value,
                expires_at,
                version,
            },
        );
    }
    /// Replace the entire table (replica full sync, startup snapshot load)
    pub fn replace_all(&mut self, entries: Vec<(Data, Value, Option<i64>)>) {
        self.map.clear();
        self.bump();
        for (key, value, expires_at) in entries {
            self.install(key, value, expires_at);
        }
    }
}

// expiration operations
impl KeyTable {
    /// Remaining lifetime in ms: `None` if the key is absent,
    /// `Some(None)` if it has no deadline
    pub fn pttl(&mut self, key: &[u8], now: i64) -> Option<Option<i64>> {
        self.live(key, now).map(|e| e.expires_at.map(|at| at - now))
    }
    /// Absolute deadline in ms: same shape as [`Self::pttl`]
    pub fn expire_time(&mut self, key: &[u8], now: i64) -> Option<Option<i64>> {
        self.live(key, now).map(|e| e.expires_at)
    }
    /// Set the deadline of `key` to the absolute `deadline` ms, subject to
    /// `cond`. Returns `true` if the deadline was applied. A deadline that
    /// is already in the past deletes the key (and still counts as applied)
    pub fn expire_at(&mut self, key: &[u8], deadline: i64, cond: ExpireCond, now: i64) -> bool {
        self.evict_if_expired(key, now);
        let cur = match self.map.get(key) {
            Some(e) => e.expires_at,
            None => return false,
        };
        let ok = match cond {
            ExpireCond::Always => true,
            ExpireCond::Nx => cur.is_none(),
            ExpireCond::Xx => cur.is_some(),
            // a persistent key is "infinitely late", so GT never relaxes it
            ExpireCond::Gt => matches!(cur, Some(at) if deadline > at),
            ExpireCond::Lt => match cur {
                Some(at) => deadline < at,
                None => true,
            },
        };
        if !ok {
            return false;
        }
        if deadline <= now {
            self.map.remove(key);
            self.bump();
        } else {
            let version = self.bump();
            if let Some(e) = self.map.get_mut(key) {
                e.expires_at = Some(deadline);
                e.version = version;
            }
        }
        true
    }
    /// Drop the deadline. Returns `true` if there was one to drop
    pub fn persist(&mut self, key: &[u8], now: i64) -> bool {
        let had = match self.live_mut(key, now) {
            Some(e) if e.expires_at.is_some() => {
                e.expires_at = None;
                true
            }
            _ => false,
        };
        if had {
            let v = self.bump();
            if let Some(e) = self.map.get_mut(key) {
                e.version = v;
            }
        }
        had
    }
}

// string operations
impl KeyTable {
    pub fn get_str(&mut self, key: &[u8], now: i64) -> Result<Option<Data>, Wrongtype> {
        match self.live(key, now) {
            Some(Entry {
                value: Value::Str(s),
                ..
            }) => Ok(Some(s.clone())),
            Some(_) => Err(Wrongtype),
            None => Ok(None),
        }
    }
    /// `SET` with its expiry policy and presence condition. Returns the
    /// prior string value (for `GETSET`-style callers) wrapped in
    /// `Some(..)` if the write went through, `None` if the condition
    /// blocked it
    pub fn set_str(
        &mut self,
        key: &[u8],
        val: Data,
        expiry: SetExpiry,
        cond: SetCond,
        now: i64,
    ) -> Result<Option<Option<Data>>, Wrongtype> {
        self.evict_if_expired(key, now);
        let existing = self.map.get(key);
        match (cond, existing.is_some()) {
            (SetCond::IfAbsent, true) | (SetCond::IfPresent, false) => return Ok(None),
            _ => {}
        }
        let old = match existing {
            Some(Entry {
                value: Value::Str(s),
                ..
            }) => Some(s.clone()),
            Some(_) => {
                // GETSET-style callers need the old *string*; a SET over a
                // container is legal but there is no old string to return
                None
            }
            None => None,
        };
        let expires_at = match expiry {
            SetExpiry::Clear => None,
            SetExpiry::Keep => existing.and_then(|e| e.expires_at),
            SetExpiry::At(at) => Some(at),
        };
        let version = self.bump();
        self.map.insert(
            Data::copy_from_slice(key),
            Entry {
                value: Value::Str(val),
                expires_at,
                version,
            },
        );
        Ok(Some(old))
    }
    pub fn append(&mut self, key: &[u8], tail: &[u8], now: i64) -> Result<usize, Wrongtype> {
        self.evict_if_expired(key, now);
        match self.map.get(key) {
            Some(Entry {
                value: Value::Str(s),
                ..
            }) => {
                let mut joined = Vec::with_capacity(s.len() + tail.len());
                joined.extend_from_slice(s);
                joined.extend_from_slice(tail);
                let newlen = joined.len();
                let version = self.bump();
                if let Some(e) = self.map.get_mut(key) {
                    e.value = Value::Str(Data::from(joined));
                    e.version = version;
                }
                Ok(newlen)
            }
            Some(_) => Err(Wrongtype),
            None => {
                let version = self.bump();
                self.map.insert(
                    Data::copy_from_slice(key),
                    Entry {
                        value: Value::Str(Data::copy_from_slice(tail)),
                        expires_at: None,
                        version,
                    },
                );
                Ok(tail.len())
            }
        }
    }
    pub fn strlen(&mut self, key: &[u8], now: i64) -> Result<usize, Wrongtype> {
        match self.live(key, now) {
            Some(Entry {
                value: Value::Str(s),
                ..
            }) => Ok(s.len()),
            Some(_) => Err(Wrongtype),
            None => Ok(0),
        }
    }
    /// Add `delta` to the integer stored at `key` (absent counts as 0)
    pub fn incr_by(&mut self, key: &[u8], delta: i64, now: i64) -> Result<i64, IncrError> {
        self.evict_if_expired(key, now);
        let cur = match self.map.get(key) {
            Some(Entry {
                value: Value::Str(s),
                ..
            }) => crate::util::parse_i64(s).ok_or(IncrError::NotInteger)?,
            Some(_) => return Err(IncrError::Wrongtype),
            None => 0,
        };
        let new = cur.checked_add(delta).ok_or(IncrError::NotInteger)?;
        let repr = Data::from_string(new.to_string());
        let version = self.bump();
        match self.map.get_mut(key) {
            Some(e) => {
                e.value = Value::Str(repr);
                e.version = version;
            }
            None => {
                self.map.insert(
                    Data::copy_from_slice(key),
                    Entry {
                        value: Value::Str(repr),
                        expires_at: None,
                        version,
                    },
                );
            }
        }
        Ok(new)
    }
}

// list operations
impl KeyTable {
    fn list_mut(&mut self, key: &[u8], now: i64) -> Result<Option<&mut VecDeque<Data>>, Wrongtype> {
        match self.live_mut(key, now) {
            Some(Entry {
                value: Value::List(l),
                ..
            }) => Ok(Some(l)),
            Some(_) => Err(Wrongtype),
            None => Ok(None),
        }
    }
    /// Push onto head (`left = true`) or tail. Returns the new length
    pub fn push(
        &mut self,
        key: &[u8],
        vals: Vec<Data>,
        left: bool,
        now: i64,
    ) -> Result<usize, Wrongtype> {
        self.evict_if_expired(key, now);
        match self.map.get_mut(key) {
            Some(Entry {
                value: Value::List(_),
                ..
            })
            | None => {}
            Some(_) => return Err(Wrongtype),
        }
        let version = self.bump();
        let entry = self
            .map
            .entry(Data::copy_from_slice(key))
            .or_insert_with(|| Entry {
                value: Value::List(VecDeque::new()),
                expires_at: None,
                version,
            });
        entry.version = version;
        if let Value::List(list) = &mut entry.value {
            for val in vals {
                if left {
                    list.push_front(val);
                } else {
                    list.push_back(val);
                }
            }
            Ok(list.len())
        } else {
            // unreachable: the variant was checked above
            Err(Wrongtype)
        }
    }
    /// Pop up to `count` elements from head or tail. `None` means no key
    pub fn pop(
        &mut self,
        key: &[u8],
        count: usize,
        left: bool,
        now: i64,
    ) -> Result<Option<Vec<Data>>, Wrongtype> {
        let list = match self.list_mut(key, now)? {
            Some(l) => l,
            None => return Ok(None),
        };
        let take = count.min(list.len());
        let mut out = Vec::with_capacity(take);
        for _ in 0..take {
            let popped = if left {
                list.pop_front()
            } else {
                list.pop_back()
            };
            match popped {
                Some(v) => out.push(v),
                None => break,
            }
        }
        if !out.is_empty() {
            let version = self.bump();
            if let Some(e) = self.map.get_mut(key) {
                e.version = version;
            }
            self.drop_if_empty(key);
        }
        Ok(Some(out))
    }
    pub fn lrange(
        &mut self,
        key: &[u8],
        start: i64,
        stop: i64,
        now: i64,
    ) -> Result<Vec<Data>, Wrongtype> {
        let list = match self.list_mut(key, now)? {
            Some(l) => l,
            None => return Ok(Vec::new()),
        };
        match normalize_range(list.len(), start, stop) {
            Some((start, stop)) => Ok(list.iter().skip(start).take(stop - start + 1).cloned().collect()),
            None => Ok(Vec::new()),
        }
    }
    pub fn llen(&mut self, key: &[u8], now: i64) -> Result<usize, Wrongtype> {
        Ok(self.list_mut(key, now)?.map_or(0, |l| l.len()))
    }
}

// set operations
impl KeyTable {
    fn set_ref(&mut self, key: &[u8], now: i64) -> Result<Option<&HashSet<Data>>, Wrongtype> {
        match self.live(key, now) {
            Some(Entry {
                value: Value::Set(s),
                ..
            }) => Ok(Some(s)),
            Some(_) => Err(Wrongtype),
            None => Ok(None),
        }
    }
    pub fn sadd(&mut self, key: &[u8], members: Vec<Data>, now: i64) -> Result<usize, Wrongtype> {
        self.evict_if_expired(key, now);
        let added = match self.map.get_mut(key) {
            Some(Entry {
                value: Value::Set(set),
                ..
            }) => members.into_iter().filter(|m| set.insert(m.clone())).count(),
            Some(_) => return Err(Wrongtype),
            None => {
                let set: HashSet<Data> = members.into_iter().collect();
                let added = set.len();
                let version = self.bump();
                self.map.insert(
                    Data::copy_from_slice(key),
                    Entry {
                        value: Value::Set(set),
                        expires_at: None,
                        version,
                    },
                );
                return Ok(added);
            }
        };
        if added > 0 {
            let version = self.bump();
            if let Some(e) = self.map.get_mut(key) {
                e.version = version;
            }
        }
        Ok(added)
    }
    pub fn srem(&mut self, key: &[u8], members: &[Data], now: i64) -> Result<usize, Wrongtype> {
        let removed = match self.live_mut(key, now) {
            Some(Entry {
                value: Value::Set(set),
                ..
            }) => members.iter().filter(|m| set.remove(&***m)).count(),
            Some(_) => return Err(Wrongtype),
            None => return Ok(0),
        };
        if removed > 0 {
            let version = self.bump();
            if let Some(e) = self.map.get_mut(key) {
                e.version = version;
            }
            self.drop_if_empty(key);
        }
        Ok(removed)
    }
    pub fn sismember(&mut self, key: &[u8], member: &[u8], now: i64) -> Result<bool, Wrongtype> {
        Ok(self.set_ref(key, now)?.is_some_and(|s| s.contains(member)))
    }
    pub fn smembers(&mut self, key: &[u8], now: i64) -> Result<Vec<Data>, Wrongtype> {
        Ok(self
            .set_ref(key, now)?
            .map_or_else(Vec::new, |s| s.iter().cloned().collect()))
    }
    pub fn scard(&mut self, key: &[u8], now: i64) -> Result<usize, Wrongtype> {
        Ok(self.set_ref(key, now)?.map_or(0, |s| s.len()))
    }
}

// hash operations
impl KeyTable {
    fn hash_ref(&mut self, key: &[u8], now: i64) -> Result<Option<&HashMap<Data, Data>>, Wrongtype> {
        match self.live(key, now) {
            Some(Entry {
                value: Value::Hash(h),
                ..
            }) => Ok(Some(h)),
            Some(_) => Err(Wrongtype),
            None => Ok(None),
        }
    }
    /// Returns the number of *new* fields
    pub fn hset(
        &mut self,
        key: &[u8],
        pairs: Vec<(Data, Data)>,
        now: i64,
    ) -> Result<usize, Wrongtype> {
        self.evict_if_expired(key, now);
        let (new_fields, mutated) = match self.map.get_mut(key) {
            Some(Entry {
                value: Value::Hash(hash),
                ..
            }) => {
                let (mut new_fields, mut mutated) = (0, false);
                for (field, val) in pairs {
                    match hash.insert(field, val.clone()) {
                        None => {
                            new_fields += 1;
                            mutated = true;
                        }
                        Some(old) => mutated |= old != val,
                    }
                }
                (new_fields, mutated)
            }
            Some(_) => return Err(Wrongtype),
            None => {
                let hash: HashMap<Data, Data> = pairs.into_iter().collect();
                let new_fields = hash.len();
                let version = self.bump();
                self.map.insert(
                    Data::copy_from_slice(key),
                    Entry {
                        value: Value::Hash(hash),
                        expires_at: None,
                        version,
                    },
                );
                return Ok(new_fields);
            }
        };
        if mutated {
            let version = self.bump();
            if let Some(e) = self.map.get_mut(key) {
                e.version = version;
            }
        }
        Ok(new_fields)
    }
    pub fn hget(&mut self, key: &[u8], field: &[u8], now: i64) -> Result<Option<Data>, Wrongtype> {
        Ok(self.hash_ref(key, now)?.and_then(|h| h.get(field).cloned()))
    }
    pub fn hdel(&mut self, key: &[u8], fields: &[Data], now: i64) -> Result<usize, Wrongtype> {
        let removed = match self.live_mut(key, now) {
            Some(Entry {
                value: Value::Hash(hash),
                ..
            }) => fields.iter().filter(|f| hash.remove(&***f).is_some()).count(),
            Some(_) => return Err(Wrongtype),
            None => return Ok(0),
        };
        if removed > 0 {
            let version = self.bump();
            if let Some(e) = self.map.get_mut(key) {
                e.version = version;
            }
            self.drop_if_empty(key);
        }
        Ok(removed)
    }
    pub fn hgetall(&mut self, key: &[u8], now: i64) -> Result<Vec<(Data, Data)>, Wrongtype> {
        Ok(self
            .hash_ref(key, now)?
            .map_or_else(Vec::new, |h| h.iter().map(|(f, v)| (f.clone(), v.clone())).collect()))
    }
    pub fn hkeys(&mut self, key: &[u8], now: i64) -> Result<Vec<Data>, Wrongtype> {
        Ok(self
            .hash_ref(key, now)?
            .map_or_else(Vec::new, |h| h.keys().cloned().collect()))
    }
    pub fn hvals(&mut self, key: &[u8], now: i64) -> Result<Vec<Data>, Wrongtype> {
        Ok(self
            .hash_ref(key, now)?
            .map_or_else(Vec::new, |h| h.values().cloned().collect()))
    }
    pub fn hexists(&mut self, key: &[u8], field: &[u8], now: i64) -> Result<bool, Wrongtype> {
        Ok(self.hash_ref(key, now)?.is_some_and(|h| h.contains_key(field)))
    }
    pub fn hlen(&mut self, key: &[u8], now: i64) -> Result<usize, Wrongtype> {
        Ok(self.hash_ref(key, now)?.map_or(0, |h| h.len()))
    }
}

// sorted-set operations
impl KeyTable {
    fn zset_ref(&mut self, key: &[u8], now: i64) -> Result<Option<&SortedSet>, Wrongtype> {
        match self.live(key, now) {
            Some(Entry {
                value: Value::Zset(z),
                ..
            }) => Ok(Some(z)),
            Some(_) => Err(Wrongtype),
            None => Ok(None),
        }
    }
    /// Returns `(added, changed)` where `changed` counts both additions and
    /// score updates (the `CH` accounting)
    pub fn zadd(
        &mut self,
        key: &[u8],
        flags: ZaddFlags,
        pairs: Vec<(f64, Data)>,
        now: i64,
    ) -> Result<(usize, usize), Wrongtype> {
        self.evict_if_expired(key, now);
        match self.map.get(key) {
            Some(Entry {
                value: Value::Zset(_),
                ..
            }) => {}
            Some(_) => return Err(Wrongtype),
            None => {
                if flags.xx {
                    return Ok((0, 0));
                }
                let version = self.bump();
                self.map.insert(
                    Data::copy_from_slice(key),
                    Entry {
                        value: Value::Zset(SortedSet::new()),
                        expires_at: None,
                        version,
                    },
                );
            }
        }
        let (mut added, mut changed) = (0, 0);
        if let Some(Entry {
            value: Value::Zset(zset),
            ..
        }) = self.map.get_mut(key)
        {
            for (score, member) in pairs {
                match zset.score(&member) {
                    Some(cur) => {
                        if flags.nx
                            || (flags.gt && score <= cur)
                            || (flags.lt && score >= cur)
                            || score == cur
                        {
                            continue;
                        }
                        zset.insert(member, score);
                        changed += 1;
                    }
                    None => {
                        if flags.xx {
                            continue;
                        }
                        zset.insert(member, score);
                        added += 1;
                        changed += 1;
                    }
                }
            }
        }
        if changed > 0 {
            let version = self.bump();
            if let Some(e) = self.map.get_mut(key) {
                e.version = version;
            }
        }
        Ok((added, changed))
    }
    pub fn zrem(&mut self, key: &[u8], members: &[Data], now: i64) -> Result<usize, Wrongtype> {
        let removed = match self.live_mut(key, now) {
            Some(Entry {
                value: Value::Zset(zset),
                ..
            }) => members.iter().filter(|m| zset.remove(m)).count(),
            Some(_) => return Err(Wrongtype),
            None => return Ok(0),
        };
        if removed > 0 {
            let version = self.bump();
            if let Some(e) = self.map.get_mut(key) {
                e.version = version;
            }
            self.drop_if_empty(key);
        }
        Ok(removed)
    }
    pub fn zscore(&mut self, key: &[u8], member: &[u8], now: i64) -> Result<Option<f64>, Wrongtype> {
        Ok(self.zset_ref(key, now)?.and_then(|z| z.score(member)))
    }
    pub fn zcard(&mut self, key: &[u8], now: i64) -> Result<usize, Wrongtype> {
        Ok(self.zset_ref(key, now)?.map_or(0, |z| z.len()))
    }
    pub fn zrange(
        &mut self,
        key: &[u8],
        start: i64,
        stop: i64,
        now: i64,
    ) -> Result<Vec<(Data, f64)>, Wrongtype> {
        let zset = match self.zset_ref(key, now)? {
            Some(z) => z,
            None => return Ok(Vec::new()),
        };
        match normalize_range(zset.len(), start, stop) {
            Some((start, stop)) => Ok(zset.range_by_rank(start, stop)),
            None => Ok(Vec::new()),
        }
    }
    pub fn zrangebyscore(
        &mut self,
        key: &[u8],
        min: super::zset::ScoreBound,
        max: super::zset::ScoreBound,
        now: i64,
    ) -> Result<Vec<(Data, f64)>, Wrongtype> {
        Ok(self
            .zset_ref(key, now)?
            .map_or_else(Vec::new, |z| z.range_by_score(min, max)))
    }
}
