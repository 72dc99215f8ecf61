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

//! # The query engine
//!
//! One task owns everything: the key table, the client table, the pub/sub
//! bus, the AOF handle and the replication registry. Connection tasks
//! parse frames and feed this task over a channel; replies travel back
//! over per-connection queues. A handler runs start-to-finish with no
//! await point, so commands are serialized by construction and
//! `MULTI`/`EXEC`/`WATCH` need no locks.
//!
//! The dispatcher also owns write-behind: a write-class command whose
//! handler succeeded *and* moved the table's mutation counter gets its
//! original request frame appended to the AOF and fanned out to every
//! streaming replica. Handlers never log or propagate themselves

pub mod client;
pub mod registry;

use {
    self::{
        client::{ClientState, QueuedCmd, TxnState},
        registry::CmdSpec,
    },
    crate::{
        actions::keyword,
        corestore::{Data, KeyTable, Value},
        protocol::responses::groups,
        pubsub::Bus,
        replication::Role,
        resp::{writer::encode_reply, Reply},
        storage::{self, aof, aof::Aof, rdb},
        util::error::SableResult,
    },
    bytes::Bytes,
    std::{collections::HashMap, net::SocketAddr, path::PathBuf},
    tokio::sync::{broadcast, mpsc},
};

/// Where a request came from; decides reply, logging and propagation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// A connected client: replies are sent, effective writes are logged
    /// and propagated
    Client,
    /// The replication stream on a replica: applied silently, never
    /// re-logged nor re-propagated
    Replica,
    /// AOF replay at startup: applied silently, errors reported
    Replay,
}

/// Everything the executor task can be told
pub enum Event {
    Connected {
        id: u64,
        addr: SocketAddr,
        fd: i32,
        tx: mpsc::UnboundedSender<Bytes>,
    },
    Query {
        id: u64,
        args: Vec<Data>,
        frame: Bytes,
    },
    Disconnected {
        id: u64,
    },
    /// `everysec` fsync pacing
    AofFlushTick,
    /// Primary keepalive: propagate a PING to streaming replicas
    ReplHeartbeat,
    /// Replica: a freshly loaded snapshot replaces the keyspace
    ReplSnapshot {
        entries: Vec<(Data, Value, Option<i64>)>,
    },
    /// Replica: one command off the primary's stream
    ReplApply {
        args: Vec<Data>,
    },
}

/// Runtime configuration the engine needs at dispatch time
#[derive(Debug, Clone)]
pub struct EngineCfg {
    pub dir: PathBuf,
    pub appendfsync: aof::FsyncPolicy,
    pub maxclients: usize,
    pub port: u16,
}

pub struct Engine {
    pub table: KeyTable,
    pub clients: HashMap<u64, ClientState>,
    pub bus: Bus,
    pub aof: Option<Aof>,
    pub role: Role,
    pub registry: HashMap<&'static str, CmdSpec>,
    pub cfg: EngineCfg,
    /// Wall clock in ms, refreshed once per dispatched event
    pub now: i64,
    /// Startup time in seconds
    pub start_time: i64,
    /// Unix seconds of the last successful snapshot
    pub lastsave: i64,
    /// Effective writes since the last snapshot
    pub dirty: u64,
}

impl Engine {
    pub fn new(cfg: EngineCfg, role: Role) -> Self {
        let now = crate::util::now_ms();
        Self {
            table: KeyTable::new(),
            clients: HashMap::new(),
            bus: Bus::new(),
            aof: None,
            role,
            registry: registry::build(),
            cfg,
            now,
            start_time: now / 1000,
            lastsave: now / 1000,
            dirty: 0,
        }
    }

    /// Drain events until the termination signal fires, then hand the state
    /// back for final persistence
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<Event>,
        mut termination: broadcast::Receiver<()>,
    ) -> Self {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.on_event(event),
                    None => break,
                },
                _ = termination.recv() => break,
            }
        }
        self
    }

    fn on_event(&mut self, event: Event) {
        match event {
            Event::Connected { id, addr, fd, tx } => {
                let now_secs = crate::util::now_ms() / 1000;
                self.clients
                    .insert(id, ClientState::new(id, addr, fd, tx, now_secs));
            }
            Event::Query { id, args, frame } => {
                self.dispatch(id, args, frame, Source::Client);
            }
            Event::Disconnected { id } => self.remove_client(id),
            Event::AofFlushTick => {
                if let Some(aof) = self.aof.as_mut() {
                    aof.flush_tick();
                }
            }
            Event::ReplHeartbeat => self.heartbeat(),
            Event::ReplSnapshot { entries } => {
                log::info!("Replication: loaded snapshot with {} keys", entries.len());
                self.table.replace_all(entries);
            }
            Event::ReplApply { args } => {
                self.dispatch(0, args, Bytes::new(), Source::Replica);
            }
        }
    }

    /// The dispatch algorithm: bookkeeping, transaction queueing, the
    /// subscriber gate, lookup, arity, the read-only gate, the handler
    /// itself, then write-behind and the reply
    pub fn dispatch(&mut self, cid: u64, args: Vec<Data>, frame: Bytes, source: Source) {
        self.now = crate::util::now_ms();
        if args.is_empty() {
            return;
        }
        let name = keyword(&args[0]);
        if source == Source::Client && !self.clients.contains_key(&cid) {
            // the connection vanished while this query sat in the channel
            return;
        }
        if source == Source::Client {
            if let Some(client) = self.clients.get_mut(&cid) {
                client.last_cmd_at = self.now / 1000;
                client.last_cmd = name.to_ascii_lowercase();
            }
        }
        // transaction queueing comes before everything else except the
        // five commands that control the transaction itself. A dirty
        // transaction keeps absorbing commands too: only EXEC resolves it
        let queueing = source == Source::Client
            && self.clients.get(&cid).is_some_and(|c| c.txn.in_txn())
            && !matches!(
                name.as_str(),
                "EXEC" | "DISCARD" | "MULTI" | "WATCH" | "UNWATCH"
            );
        if queueing {
            self.queue_command(cid, name, args, frame);
            return;
        }
        // subscriber mode gate
        if source == Source::Client {
            let subscribed = self
                .clients
                .get(&cid)
                .is_some_and(|c| c.in_subscriber_mode());
            if subscribed && !registry::subscriber_allowed(&name) {
                let reply = Reply::Error(format!(
                    "ERR Can't execute '{}': only (P)SUBSCRIBE / (P)UNSUBSCRIBE / PING / QUIT are allowed",
                    name.to_ascii_lowercase()
                ));
                self.send_reply(cid, &reply);
                return;
            }
        }
        let spec = match self.registry.get(name.as_str()).copied() {
            Some(spec) => spec,
            None => {
                self.answer(
                    cid,
                    source,
                    &name,
                    Reply::Error(format!(
                        "ERR unknown command '{}'",
                        String::from_utf8_lossy(&args[0])
                    )),
                );
                return;
            }
        };
        if !arity_ok(&spec, args.len() - 1) {
            self.answer(
                cid,
                source,
                &name,
                Reply::Error(format!(
                    "ERR wrong number of arguments for '{}' command",
                    name.to_ascii_lowercase()
                )),
            );
            return;
        }
        if source == Source::Client && spec.is_write && self.role.is_replica() {
            self.send_reply(cid, &Reply::Static(groups::READONLY_ERR));
            return;
        }
        let before = self.table.mutation_count();
        let outcome = match (spec.handler)(self, cid, &args[1..]) {
            Ok(reply) => {
                let effective = self.table.mutation_count() != before;
                if spec.is_write && effective && source == Source::Client {
                    self.log_and_propagate(&frame);
                }
                if spec.is_write && effective {
                    self.dirty += 1;
                }
                reply
            }
            Err(e) => e.into_reply(),
        };
        self.answer(cid, source, &name, outcome);
        if let Some(client) = self.clients.get(&cid) {
            if client.closing {
                self.remove_client(cid);
            }
        }
    }

    /// Queue-time validation: unknown names, bad arity, writes on a
    /// replica and commands that cannot meaningfully run inside a
    /// transaction all dirty it instead of queueing
    fn queue_command(&mut self, cid: u64, name: String, args: Vec<Data>, frame: Bytes) {
        let verdict = match self.registry.get(name.as_str()) {
            None => Some(Reply::Error(format!(
                "ERR unknown command '{}'",
                String::from_utf8_lossy(&args[0])
            ))),
            Some(spec) if !arity_ok(spec, args.len() - 1) => Some(Reply::Error(format!(
                "ERR wrong number of arguments for '{}' command",
                name.to_ascii_lowercase()
            ))),
            Some(spec) if spec.is_write && self.role.is_replica() => {
                Some(Reply::Static(groups::READONLY_ERR))
            }
            Some(_)
                if matches!(
                    name.as_str(),
                    "SUBSCRIBE" | "UNSUBSCRIBE" | "PSUBSCRIBE" | "PUNSUBSCRIBE" | "PSYNC"
                ) =>
            {
                Some(Reply::Error(format!(
                    "ERR {} is not allowed in transactions",
                    name
                )))
            }
            Some(_) => None,
        };
        let client = match self.clients.get_mut(&cid) {
            Some(c) => c,
            None => return,
        };
        match verdict {
            Some(error) => {
                client.txn = TxnState::Dirty;
                let _ = client.tx.send(encode_reply(&error));
            }
            None => {
                // in the dirty state the queue is gone; the command is
                // acknowledged but EXEC will abort anyway
                if let TxnState::Queued(queue) = &mut client.txn {
                    queue.push(QueuedCmd { args, frame });
                }
                let _ = client.tx.send(encode_reply(&Reply::Static(groups::QUEUED)));
            }
        }
    }

    fn answer(&mut self, cid: u64, source: Source, name: &str, reply: Reply) {
        match source {
            Source::Client => self.send_reply(cid, &reply),
            Source::Replay | Source::Replica => {
                // silent apply; only surface failures
                if let Reply::Error(text) = &reply {
                    log::error!(
                        "{}: error applying '{}': {}",
                        if source == Source::Replay {
                            "AOF replay"
                        } else {
                            "Replication"
                        },
                        name.to_ascii_lowercase(),
                        text
                    );
                }
            }
        }
    }

    pub fn send_reply(&self, cid: u64, reply: &Reply) {
        if matches!(reply, Reply::None) {
            return;
        }
        if let Some(client) = self.clients.get(&cid) {
            let _ = client.tx.send(encode_reply(reply));
        }
    }

    /// Write-behind: append the original request frame to the AOF and fan
    /// it out to every streaming replica, advancing the primary offset
    pub fn log_and_propagate(&mut self, frame: &Bytes) {
        if frame.is_empty() {
            return;
        }
        if let Some(aof) = self.aof.as_mut() {
            if let Err(e) = aof.append(frame) {
                log::error!("Failed to append to AOF: {e}");
            }
        }
        self.propagate(frame);
    }

    /// Fan a frame out to the replica links without touching the AOF
    fn propagate(&mut self, frame: &Bytes) {
        if let Role::Primary(state) = &mut self.role {
            if state.replicas.is_empty() {
                return;
            }
            state.offset += frame.len() as u64;
            let mut gone = Vec::new();
            for &cid in &state.replicas {
                match self.clients.get(&cid) {
                    Some(link) => {
                        let _ = link.tx.send(frame.clone());
                    }
                    None => gone.push(cid),
                }
            }
            state.replicas.retain(|cid| !gone.contains(cid));
        }
    }

    fn heartbeat(&mut self) {
        static PING: &[u8] = b"*1\r\n$4\r\nPING\r\n";
        self.propagate(&Bytes::from_static(PING));
    }

    pub fn remove_client(&mut self, cid: u64) {
        if let Some(client) = self.clients.remove(&cid) {
            let channels: Vec<Data> = client.subs.into_iter().collect();
            let patterns: Vec<Data> = client.psubs.into_iter().collect();
            self.bus.drop_subscriber(cid, &channels, &patterns);
            if let Role::Primary(state) = &mut self.role {
                state.replicas.retain(|&id| id != cid);
            }
        }
    }

    /// Snapshot the keyspace to `dump.rdb`
    pub fn save_rdb(&mut self) -> SableResult<()> {
        let path = self.cfg.dir.join(storage::RDB_FILE);
        rdb::save(&self.table, &path, self.now)?;
        self.lastsave = crate::util::now_ms() / 1000;
        self.dirty = 0;
        Ok(())
    }

    /// Rewrite the AOF as the canonical command stream for the current
    /// keyspace
    pub fn rewrite_aof(&mut self) -> SableResult<()> {
        let now = self.now;
        match self.aof.as_mut() {
            Some(aof) => aof.rewrite(&self.table, now),
            None => Err(crate::util::error::Error::OtherError(
                "append only file support is disabled".to_owned(),
            )),
        }
    }

    /// Startup recovery on a primary: snapshot first, AOF replayed on top
    pub fn load_startup_data(&mut self) -> SableResult<()> {
        let rdb_path = self.cfg.dir.join(storage::RDB_FILE);
        if let Some(entries) = rdb::load(&rdb_path)? {
            log::info!("Loaded snapshot with {} keys", entries.len());
            self.table.replace_all(entries);
        }
        let aof_path = self.cfg.dir.join(storage::AOF_FILE);
        let frames = aof::load_frames(&aof_path)?;
        if !frames.is_empty() {
            log::info!("Replaying {} commands from the append only file", frames.len());
            for args in frames {
                self.dispatch(0, args, Bytes::new(), Source::Replay);
            }
        }
        Ok(())
    }
}

fn arity_ok(spec: &CmdSpec, argc: usize) -> bool {
    argc >= spec.min_args && spec.max_args.map_or(true, |max| argc <= max)
}
