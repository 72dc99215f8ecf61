/*
 * Created on Mon Dec 11 2023
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

//! End-to-end replication tests: a real primary and a real replica, full
//! sync plus the command stream, checked through the replica's own client
//! port

use {
    super::{scratch_dir, spawn_stack, TestConn},
    std::time::Duration,
    tokio::time,
};

/// Poll a GET on the replica until it answers with the wanted frame
async fn wait_for(replica: &mut TestConn, key: &[u8], want: &[u8]) {
    let deadline = time::Instant::now() + Duration::from_secs(5);
    loop {
        let got = replica.cmd(&[b"GET", key]).await;
        if got == want {
            return;
        }
        assert!(
            time::Instant::now() < deadline,
            "replica never converged on {:?} (last: {:?})",
            String::from_utf8_lossy(key),
            got
        );
        time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn replica_full_syncs_and_follows_the_stream() {
    let primary = spawn_stack(scratch_dir("repl-primary"), None, false).await;
    let mut pcon = TestConn::connect(primary.addr).await;
    // state that must arrive via the snapshot
    assert_eq!(pcon.cmd(&[b"SET", b"seed", b"snapshot"]).await, b"+OK\r\n");
    assert_eq!(pcon.cmd(&[b"RPUSH", b"l", b"a", b"b"]).await, b":2\r\n");

    let replica = spawn_stack(scratch_dir("repl-replica"), Some(primary.addr), false).await;
    let mut rcon = TestConn::connect(replica.addr).await;
    wait_for(&mut rcon, b"seed", b"$8\r\nsnapshot\r\n").await;
    assert_eq!(
        rcon.cmd(&[b"LRANGE", b"l", b"0", b"-1"]).await,
        b"*2\r\n$1\r\na\r\n$1\r\nb\r\n"
    );

    // state that must arrive via the stream
    assert_eq!(pcon.cmd(&[b"SET", b"live", b"streamed"]).await, b"+OK\r\n");
    assert_eq!(pcon.cmd(&[b"SADD", b"s", b"m"]).await, b":1\r\n");
    assert_eq!(pcon.cmd(&[b"DEL", b"l"]).await, b":1\r\n");
    wait_for(&mut rcon, b"live", b"$8\r\nstreamed\r\n").await;
    assert_eq!(rcon.cmd(&[b"SISMEMBER", b"s", b"m"]).await, b":1\r\n");
    assert_eq!(rcon.cmd(&[b"EXISTS", b"l"]).await, b":0\r\n");
}

#[tokio::test]
async fn replica_rejects_writes_but_serves_reads() {
    let primary = spawn_stack(scratch_dir("repl-ro-primary"), None, false).await;
    let mut pcon = TestConn::connect(primary.addr).await;
    pcon.cmd(&[b"SET", b"k", b"v"]).await;

    let replica = spawn_stack(scratch_dir("repl-ro-replica"), Some(primary.addr), false).await;
    let mut rcon = TestConn::connect(replica.addr).await;
    wait_for(&mut rcon, b"k", b"$1\r\nv\r\n").await;
    assert_eq!(
        rcon.cmd(&[b"SET", b"k", b"nope"]).await,
        b"-READONLY You can't write against a read only replica\r\n"
    );
    assert_eq!(rcon.cmd(&[b"GET", b"k"]).await, b"$1\r\nv\r\n");
}

#[tokio::test]
async fn replica_applies_expirations_from_the_stream() {
    let primary = spawn_stack(scratch_dir("repl-exp-primary"), None, false).await;
    let mut pcon = TestConn::connect(primary.addr).await;
    pcon.cmd(&[b"SET", b"gone", b"soon"]).await;

    let replica = spawn_stack(scratch_dir("repl-exp-replica"), Some(primary.addr), false).await;
    let mut rcon = TestConn::connect(replica.addr).await;
    wait_for(&mut rcon, b"gone", b"$4\r\nsoon\r\n").await;
    // an already-elapsed absolute deadline deletes on both sides
    assert_eq!(pcon.cmd(&[b"PEXPIREAT", b"gone", b"1"]).await, b":1\r\n");
    wait_for(&mut rcon, b"gone", b"$-1\r\n").await;
}

#[tokio::test]
async fn primary_reports_acknowledging_replicas() {
    let primary = spawn_stack(scratch_dir("repl-info-primary"), None, false).await;
    let _replica = spawn_stack(scratch_dir("repl-info-replica"), Some(primary.addr), false).await;
    let mut pcon = TestConn::connect(primary.addr).await;
    let deadline = time::Instant::now() + Duration::from_secs(5);
    loop {
        let info = pcon.cmd(&[b"INFO", b"replication"]).await;
        let text = String::from_utf8_lossy(&info).into_owned();
        if text.contains("connected_slaves:1") {
            assert!(text.contains("role:master"));
            break;
        }
        assert!(time::Instant::now() < deadline, "INFO never saw the replica: {text}");
        time::sleep(Duration::from_millis(50)).await;
    }
}
