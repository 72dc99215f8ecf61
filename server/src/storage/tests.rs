/*
 * Created on Thu Aug 10 2023
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

//! Round-trip tests for the snapshot and dump codecs: `load(save(K)) ≡ K`
//! for every value shape, and corruption is refused, never half-loaded

use {
    super::rdb,
    crate::{
        corestore::{Data, KeyTable, SetCond, SetExpiry, Value, ZaddFlags},
        util::error::StorageError,
    },
};

fn d(s: &str) -> Data {
    Data::copy_from_slice(s.as_bytes())
}

fn populated_table() -> KeyTable {
    let mut kt = KeyTable::new();
    kt.set_str(b"str", d("value"), SetExpiry::Clear, SetCond::Any, 0)
        .unwrap();
    kt.set_str(
        b"binary\x00key",
        Data::copy_from_slice(b"\x01\x02\xff"),
        SetExpiry::At(90_000_000_000_000),
        SetCond::Any,
        0,
    )
    .unwrap();
    kt.push(b"list", vec![d("a"), d("b"), d("c")], false, 0).unwrap();
    kt.sadd(b"set", vec![d("x"), d("y")], 0).unwrap();
    kt.hset(b"hash", vec![(d("f1"), d("v1")), (d("f2"), d("v2"))], 0)
        .unwrap();
    kt.zadd(
        b"zset",
        ZaddFlags::default(),
        vec![
            (1.5, d("m1")),
            (f64::INFINITY, d("m2")),
            (f64::NEG_INFINITY, d("m0")),
        ],
        0,
    )
    .unwrap();
    kt
}

#[test]
fn snapshot_roundtrip() {
    let mut kt = populated_table();
    let bytes = rdb::serialize(&kt, 0);
    let entries = rdb::deserialize(&bytes).unwrap();
    let mut restored = KeyTable::new();
    restored.replace_all(entries);

    assert_eq!(restored.dbsize(0), kt.dbsize(0));
    assert_eq!(restored.get_str(b"str", 0).unwrap(), Some(d("value")));
    assert_eq!(
        restored.pttl(b"binary\x00key", 0),
        Some(Some(90_000_000_000_000))
    );
    assert_eq!(
        restored.lrange(b"list", 0, -1, 0).unwrap(),
        vec![d("a"), d("b"), d("c")]
    );
    assert!(restored.sismember(b"set", b"x", 0).unwrap());
    assert_eq!(restored.hget(b"hash", b"f2", 0).unwrap(), Some(d("v2")));
    let order: Vec<Data> = restored
        .zrange(b"zset", 0, -1, 0)
        .unwrap()
        .into_iter()
        .map(|(m, _)| m)
        .collect();
    assert_eq!(order, vec![d("m0"), d("m1"), d("m2")]);
    assert_eq!(restored.zscore(b"zset", b"m2", 0).unwrap(), Some(f64::INFINITY));
}

#[test]
fn snapshot_skips_expired_entries() {
    let mut kt = KeyTable::new();
    kt.set_str(b"dead", d("v"), SetExpiry::At(100), SetCond::Any, 0)
        .unwrap();
    kt.set_str(b"live", d("v"), SetExpiry::Clear, SetCond::Any, 0)
        .unwrap();
    let bytes = rdb::serialize(&kt, 10_000);
    let entries = rdb::deserialize(&bytes).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, d("live"));
}

#[test]
fn corrupted_snapshot_is_refused() {
    let kt = populated_table();
    let mut bytes = rdb::serialize(&kt, 0);
    // flip one payload byte: the checksum must catch it
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0x40;
    assert_eq!(
        rdb::deserialize(&bytes).unwrap_err(),
        StorageError::ChecksumMismatch
    );
}

#[test]
fn truncated_snapshot_is_refused() {
    let kt = populated_table();
    let bytes = rdb::serialize(&kt, 0);
    let cut = &bytes[..bytes.len() - 3];
    // a cut tail is either a bad checksum or a short file, never a load
    assert!(rdb::deserialize(cut).is_err());
}

#[test]
fn bad_magic_is_refused() {
    let kt = KeyTable::new();
    let mut bytes = rdb::serialize(&kt, 0);
    bytes[0] = b'X';
    // fix the checksum so only the magic is at fault
    let len = bytes.len();
    let crc = crc::Crc::<u64>::new(&crc::CRC_64_REDIS).checksum(&bytes[..len - 8]);
    bytes[len - 8..].copy_from_slice(&crc.to_le_bytes());
    assert_eq!(
        rdb::deserialize(&bytes).unwrap_err(),
        StorageError::BadHeader
    );
}

#[test]
fn dump_restore_roundtrip() {
    let mut kt = populated_table();
    for key in [&b"str"[..], b"list", b"set", b"hash", b"zset"] {
        let entry = kt.raw_entry(key, 0).unwrap();
        let payload = rdb::dump_value(&entry.value);
        let value = rdb::restore_value(&payload).unwrap();
        assert_eq!(&value, &kt.raw_entry(key, 0).unwrap().value);
    }
}

#[test]
fn tampered_dump_payload_is_refused() {
    let value = Value::Str(d("hello"));
    let mut payload = rdb::dump_value(&value);
    payload[1] ^= 0x01;
    assert!(rdb::restore_value(&payload).is_err());
    let short = &payload[..4];
    assert_eq!(
        rdb::restore_value(short).unwrap_err(),
        StorageError::Truncated
    );
}
