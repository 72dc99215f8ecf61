/*
 * Created on Sun Dec 10 2023
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

//! Durability tests: AOF replay equivalence and the snapshot-then-AOF
//! recovery order, all through the real dispatch path against scratch
//! directories

use {
    super::{scratch_dir, test_engine, Harness},
    crate::storage::{self, aof::Aof, aof::FsyncPolicy},
};

/// Replaying the AOF into a fresh engine must rebuild the same keyspace
#[test]
fn aof_replay_equivalence() {
    let dir = scratch_dir("aof-replay");
    let mut h = Harness::with_engine({
        let mut engine = test_engine(dir.clone());
        engine.aof = Some(Aof::open(dir.join(storage::AOF_FILE), FsyncPolicy::Always).unwrap());
        engine
    });
    h.connect(1);
    h.cmd(1, &[b"SET", b"s", b"v1"]);
    h.cmd(1, &[b"RPUSH", b"l", b"a", b"b"]);
    h.cmd(1, &[b"SADD", b"set", b"m1", b"m2"]);
    h.cmd(1, &[b"HSET", b"h", b"f", b"v"]);
    h.cmd(1, &[b"ZADD", b"z", b"1", b"one", b"2", b"two"]);
    h.cmd(1, &[b"DEL", b"l"]);
    h.cmd(1, &[b"INCR", b"n"]);
    // reads and no-effect writes must not be replayed
    h.cmd(1, &[b"GET", b"s"]);
    h.cmd(1, &[b"SET", b"s", b"ignored", b"NX"]);
    drop(h);

    let mut rebuilt = Harness::with_engine({
        let mut engine = test_engine(dir);
        engine.load_startup_data().unwrap();
        engine
    });
    rebuilt.connect(1);
    assert_eq!(rebuilt.cmd(1, &[b"GET", b"s"]), b"$2\r\nv1\r\n");
    assert_eq!(rebuilt.cmd(1, &[b"EXISTS", b"l"]), b":0\r\n");
    assert_eq!(rebuilt.cmd(1, &[b"SISMEMBER", b"set", b"m2"]), b":1\r\n");
    assert_eq!(rebuilt.cmd(1, &[b"HGET", b"h", b"f"]), b"$1\r\nv\r\n");
    assert_eq!(
        rebuilt.cmd(1, &[b"ZRANGE", b"z", b"0", b"-1"]),
        b"*2\r\n$3\r\none\r\n$3\r\ntwo\r\n"
    );
    assert_eq!(rebuilt.cmd(1, &[b"GET", b"n"]), b"$1\r\n1\r\n");
}

/// Transactions log their inner commands at EXEC time, so replay includes
/// exactly what committed
#[test]
fn aof_includes_committed_transactions_only() {
    let dir = scratch_dir("aof-txn");
    let mut h = Harness::with_engine({
        let mut engine = test_engine(dir.clone());
        engine.aof = Some(Aof::open(dir.join(storage::AOF_FILE), FsyncPolicy::Always).unwrap());
        engine
    });
    h.connect(1);
    h.cmd(1, &[b"MULTI"]);
    h.cmd(1, &[b"SET", b"committed", b"yes"]);
    h.cmd(1, &[b"EXEC"]);
    // an aborted transaction leaves no trace
    h.cmd(1, &[b"WATCH", b"committed"]);
    h.connect(2);
    h.cmd(2, &[b"SET", b"committed", b"overwritten"]);
    h.cmd(1, &[b"MULTI"]);
    h.cmd(1, &[b"SET", b"aborted", b"yes"]);
    assert_eq!(h.cmd(1, &[b"EXEC"]), b"*-1\r\n");
    drop(h);

    let mut rebuilt = Harness::with_engine({
        let mut engine = test_engine(dir);
        engine.load_startup_data().unwrap();
        engine
    });
    rebuilt.connect(1);
    assert_eq!(
        rebuilt.cmd(1, &[b"GET", b"committed"]),
        b"$11\r\noverwritten\r\n"
    );
    assert_eq!(rebuilt.cmd(1, &[b"EXISTS", b"aborted"]), b":0\r\n");
}

/// FLUSHALL is logged, so replay reproduces the wipe
#[test]
fn aof_replays_flushall() {
    let dir = scratch_dir("aof-flushall");
    let mut h = Harness::with_engine({
        let mut engine = test_engine(dir.clone());
        engine.aof = Some(Aof::open(dir.join(storage::AOF_FILE), FsyncPolicy::Always).unwrap());
        engine
    });
    h.connect(1);
    h.cmd(1, &[b"SET", b"a", b"1"]);
    h.cmd(1, &[b"FLUSHALL"]);
    h.cmd(1, &[b"SET", b"b", b"2"]);
    drop(h);

    let mut rebuilt = Harness::with_engine({
        let mut engine = test_engine(dir);
        engine.load_startup_data().unwrap();
        engine
    });
    rebuilt.connect(1);
    assert_eq!(rebuilt.cmd(1, &[b"EXISTS", b"a"]), b":0\r\n");
    assert_eq!(rebuilt.cmd(1, &[b"GET", b"b"]), b"$1\r\n2\r\n");
}

/// SAVE writes dump.rdb; a fresh engine loads it before replaying the AOF
#[test]
fn snapshot_then_aof_recovery_order() {
    let dir = scratch_dir("rdb-order");
    let mut h = Harness::with_engine(test_engine(dir.clone()));
    h.connect(1);
    h.cmd(1, &[b"SET", b"base", b"from-rdb"]);
    assert_eq!(h.cmd(1, &[b"SAVE"]), b"+OK\r\n");
    // now only the AOF sees this one
    h.engine.aof = Some(Aof::open(dir.join(storage::AOF_FILE), FsyncPolicy::Always).unwrap());
    h.cmd(1, &[b"SET", b"later", b"from-aof"]);
    h.cmd(1, &[b"SET", b"base", b"overridden"]);
    drop(h);

    let mut rebuilt = Harness::with_engine({
        let mut engine = test_engine(dir);
        engine.load_startup_data().unwrap();
        engine
    });
    rebuilt.connect(1);
    assert_eq!(rebuilt.cmd(1, &[b"GET", b"later"]), b"$8\r\nfrom-aof\r\n");
    // the AOF layer wins over the snapshot
    assert_eq!(rebuilt.cmd(1, &[b"GET", b"base"]), b"$10\r\noverridden\r\n");
}

/// BGREWRITEAOF compacts: the rewritten log rebuilds the same keyspace
#[test]
fn aof_rewrite_equivalence() {
    let dir = scratch_dir("aof-rewrite");
    let mut h = Harness::with_engine({
        let mut engine = test_engine(dir.clone());
        engine.aof = Some(Aof::open(dir.join(storage::AOF_FILE), FsyncPolicy::Always).unwrap());
        engine
    });
    h.connect(1);
    for i in 0..50 {
        h.cmd(1, &[b"SET", b"churn", format!("{i}").as_bytes()]);
    }
    h.cmd(1, &[b"RPUSH", b"l", b"a", b"b", b"c"]);
    h.cmd(1, &[b"EXPIRE", b"l", b"1000"]);
    h.cmd(1, &[b"ZADD", b"z", b"1.5", b"m"]);
    let before = std::fs::metadata(dir.join(storage::AOF_FILE)).unwrap().len();
    assert_eq!(
        h.cmd(1, &[b"BGREWRITEAOF"]),
        b"+Background append only file rewriting started\r\n"
    );
    let after = std::fs::metadata(dir.join(storage::AOF_FILE)).unwrap().len();
    assert!(after < before, "rewrite did not shrink the log ({before} -> {after})");
    drop(h);

    let mut rebuilt = Harness::with_engine({
        let mut engine = test_engine(dir);
        engine.load_startup_data().unwrap();
        engine
    });
    rebuilt.connect(1);
    assert_eq!(rebuilt.cmd(1, &[b"GET", b"churn"]), b"$2\r\n49\r\n");
    assert_eq!(
        rebuilt.cmd(1, &[b"LRANGE", b"l", b"0", b"-1"]),
        b"*3\r\n$1\r\na\r\n$1\r\nb\r\n$1\r\nc\r\n"
    );
    // the deadline survived the rewrite as an absolute timestamp
    let ttl = rebuilt.cmd(1, &[b"TTL", b"l"]);
    let secs: i64 = String::from_utf8_lossy(&ttl[1..ttl.len() - 2]).parse().unwrap();
    assert!((1..=1000).contains(&secs), "ttl {secs}");
    assert_eq!(rebuilt.cmd(1, &[b"ZSCORE", b"z", b"m"]), b"$3\r\n1.5\r\n");
}

/// A torn tail on the AOF drops only the torn frame
#[test]
fn truncated_aof_tail_is_tolerated() {
    let dir = scratch_dir("aof-torn");
    let mut h = Harness::with_engine({
        let mut engine = test_engine(dir.clone());
        engine.aof = Some(Aof::open(dir.join(storage::AOF_FILE), FsyncPolicy::Always).unwrap());
        engine
    });
    h.connect(1);
    h.cmd(1, &[b"SET", b"intact", b"yes"]);
    drop(h);
    // simulate a crash mid-append
    let path = dir.join(storage::AOF_FILE);
    let mut bytes = std::fs::read(&path).unwrap();
    bytes.extend_from_slice(b"*3\r\n$3\r\nSET\r\n$4\r\ntor");
    std::fs::write(&path, &bytes).unwrap();

    let mut rebuilt = Harness::with_engine({
        let mut engine = test_engine(dir);
        engine.load_startup_data().unwrap();
        engine
    });
    rebuilt.connect(1);
    assert_eq!(rebuilt.cmd(1, &[b"GET", b"intact"]), b"$3\r\nyes\r\n");
    assert_eq!(rebuilt.cmd(1, &[b"DBSIZE"]), b":1\r\n");
}
