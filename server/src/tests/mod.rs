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

//! # The integration suite
//!
//! Two harnesses. [`Harness`] drives the executor synchronously with fake
//! connections: every scenario that does not need real sockets runs
//! through it, deterministic and sleep-free. [`spawn_stack`] brings up the
//! whole server (listener, services, optionally the replication client)
//! on an ephemeral port for the wire-level and replication tests

mod commands;
mod persistence;
mod replication_tests;

use {
    crate::{
        corestore::Data,
        dbnet::{BaseListener, Listener},
        protocol::{ParseError, Parser},
        queryengine::{client::ClientState, Engine, EngineCfg, Source},
        replication::{replica, LinkStatus, PrimaryState, Role},
        resp::writer::write_request,
        services,
        storage::{self, aof::Aof, aof::FsyncPolicy},
    },
    bytes::{Buf, Bytes, BytesMut},
    parking_lot::RwLock,
    std::{
        collections::HashMap,
        net::SocketAddr,
        path::PathBuf,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    },
    tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpStream,
        sync::{broadcast, mpsc},
        time,
    },
};

static DIR_SEQ: AtomicUsize = AtomicUsize::new(0);

/// A fresh scratch directory per test
pub fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "sable-test-{}-{}-{}",
        tag,
        std::process::id(),
        DIR_SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn test_engine(dir: PathBuf) -> Engine {
    Engine::new(
        EngineCfg {
            dir,
            appendfsync: FsyncPolicy::No,
            maxclients: 128,
            port: 0,
        },
        Role::Primary(PrimaryState::new()),
    )
}

/// Synchronous executor harness: fake clients, direct dispatch, collected
/// reply bytes
pub struct Harness {
    pub engine: Engine,
    outputs: HashMap<u64, mpsc::UnboundedReceiver<Bytes>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_engine(test_engine(scratch_dir("harness")))
    }
    pub fn with_engine(engine: Engine) -> Self {
        Self {
            engine,
            outputs: HashMap::new(),
        }
    }
    /// Register a fake connection under the given id
    pub fn connect(&mut self, id: u64) {
        let (tx, rx) = mpsc::unbounded_channel();
        let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        self.engine
            .clients
            .insert(id, ClientState::new(id, addr, -1, tx, 0));
        self.outputs.insert(id, rx);
    }
    /// Run one command and return everything the engine wrote back
    pub fn cmd(&mut self, id: u64, parts: &[&[u8]]) -> Vec<u8> {
        let mut framed = BytesMut::new();
        write_request(&mut framed, parts.iter().copied());
        let frame = framed.freeze();
        let (query, _) = Parser::parse(&frame).unwrap();
        let args: Vec<Data> = query.iter().map(|a| Data::copy_from_slice(a)).collect();
        self.engine.dispatch(id, args, frame, Source::Client);
        self.drain(id)
    }
    /// Collect whatever is queued for the connection right now
    pub fn drain(&mut self, id: u64) -> Vec<u8> {
        let mut out = Vec::new();
        if let Some(rx) = self.outputs.get_mut(&id) {
            while let Ok(chunk) = rx.try_recv() {
                out.extend_from_slice(&chunk);
            }
        }
        out
    }
}

/// Everything a test needs to talk to a running server stack
pub struct TestStack {
    pub addr: SocketAddr,
    pub signal: broadcast::Sender<()>,
}

/// Bring up the full server on an ephemeral port. The stack dies when the
/// returned signal sender fires (or is dropped)
pub async fn spawn_stack(dir: PathBuf, replicaof: Option<SocketAddr>, aof: bool) -> TestStack {
    let (signal, _) = broadcast::channel::<()>(1);
    let (engine_tx, engine_rx) = mpsc::channel(64);
    let role = match replicaof {
        None => Role::Primary(PrimaryState::new()),
        Some(primary) => Role::Replica {
            host: primary.ip().to_string(),
            port: primary.port(),
            status: Arc::new(RwLock::new(LinkStatus::default())),
        },
    };
    let mut engine = Engine::new(
        EngineCfg {
            dir: dir.clone(),
            appendfsync: FsyncPolicy::No,
            maxclients: 128,
            port: 0,
        },
        role,
    );
    if !engine.role.is_replica() {
        engine.load_startup_data().unwrap();
    }
    if aof {
        engine.aof = Some(Aof::open(dir.join(storage::AOF_FILE), FsyncPolicy::No).unwrap());
    }
    let base = BaseListener::init(
        engine_tx.clone(),
        "127.0.0.1".parse().unwrap(),
        0,
        128,
        signal.clone(),
    )
    .await
    .unwrap();
    let addr = base.listener.local_addr().unwrap();
    let mut listener = Listener::new(base);
    tokio::spawn(async move {
        let _ = listener.run().await;
        listener.base.release_self().await;
    });
    tokio::spawn(services::run_tickers(engine_tx.clone(), signal.subscribe()));
    if let Role::Replica { host, port, status } = &engine.role {
        let cfg = replica::ReplicaConfig {
            primary_host: host.clone(),
            primary_port: *port,
            listening_port: addr.port(),
        };
        tokio::spawn(replica::run(
            cfg,
            status.clone(),
            engine_tx.clone(),
            signal.subscribe(),
        ));
    }
    tokio::spawn(engine.run(engine_rx, signal.subscribe()));
    TestStack { addr, signal }
}

/// A raw RESP2 client for the wire tests
pub struct TestConn {
    stream: TcpStream,
    buf: BytesMut,
}

impl TestConn {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self {
            stream,
            buf: BytesMut::new(),
        }
    }
    /// Send one command and read back exactly one frame
    pub async fn cmd(&mut self, parts: &[&[u8]]) -> Vec<u8> {
        self.send(parts).await;
        self.read_frame().await
    }
    pub async fn send(&mut self, parts: &[&[u8]]) {
        let mut framed = BytesMut::new();
        write_request(&mut framed, parts.iter().copied());
        self.stream.write_all(&framed).await.unwrap();
    }
    pub async fn send_raw(&mut self, raw: &[u8]) {
        self.stream.write_all(raw).await.unwrap();
    }
    /// Read one complete RESP2 frame (any type), with a test timeout
    pub async fn read_frame(&mut self) -> Vec<u8> {
        time::timeout(Duration::from_secs(5), async {
            loop {
                match Parser::parse_element(&self.buf) {
                    Ok((_, consumed)) => {
                        let frame = self.buf[..consumed].to_vec();
                        self.buf.advance(consumed);
                        return frame;
                    }
                    Err(ParseError::NotEnough) => {
                        let read = self.stream.read_buf(&mut self.buf).await.unwrap();
                        assert!(read > 0, "server closed the connection mid-frame");
                    }
                    Err(e) => panic!("bad frame from server: {e}"),
                }
            }
        })
        .await
        .expect("timed out waiting for a reply")
    }
    /// True once the server closes the connection
    pub async fn closed(&mut self) -> bool {
        time::timeout(Duration::from_secs(5), async {
            loop {
                match self.stream.read_buf(&mut self.buf).await {
                    Ok(0) | Err(_) => return true,
                    Ok(_) => {}
                }
            }
        })
        .await
        .unwrap_or(false)
    }
}
