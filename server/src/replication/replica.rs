/*
 * Created on Wed Jul 19 2023
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

//! # The replica task
//!
//! Owns the link to the primary: handshake (`PING` → `REPLCONF
//! listening-port` → `REPLCONF capa` → `PSYNC ? -1`), the `$len`-framed
//! snapshot, then the apply loop. Every received frame advances the local
//! offset by its byte length; an `ACK` goes back once a second and on
//! `GETACK`. Anything going wrong tears the link down and the outer loop
//! reconnects with backoff, doing a full resync from scratch

use {
    super::{HandshakePhase, LinkStatus},
    crate::{
        corestore::Data,
        dbnet::NetBackoff,
        protocol::{Element, ParseError, Parser},
        queryengine::Event,
        resp::writer::write_request,
        storage::rdb,
        util::error::{Error, SableResult},
    },
    bytes::{Buf, BytesMut},
    parking_lot::RwLock,
    std::{sync::Arc, time::Duration},
    tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpStream,
        sync::{broadcast, mpsc},
        time,
    },
};

pub struct ReplicaConfig {
    pub primary_host: String,
    pub primary_port: u16,
    /// Our own listening port, reported in the handshake
    pub listening_port: u16,
}

/// Run the replication client until the termination signal fires
pub async fn run(
    cfg: ReplicaConfig,
    status: Arc<RwLock<LinkStatus>>,
    engine_tx: mpsc::Sender<Event>,
    mut termination: broadcast::Receiver<()>,
) {
    let backoff = NetBackoff::new();
    loop {
        let session = sync_session(&cfg, &status, &engine_tx);
        tokio::select! {
            _ = termination.recv() => return,
            outcome = session => {
                {
                    let mut st = status.write();
                    if st.up {
                        // the link was established: restart the backoff curve
                        backoff.reset();
                    }
                    st.up = false;
                    st.phase = HandshakePhase::Ping;
                }
                match outcome {
                    Ok(()) => return,
                    Err(e) => log::error!(
                        "Replication: link to {}:{} failed: {e}; retrying",
                        cfg.primary_host, cfg.primary_port
                    ),
                }
            }
        }
        backoff.spin().await;
    }
}

/// One full sync session: connect, handshake, load, stream. Returns only
/// on error (the apply loop is endless otherwise)
async fn sync_session(
    cfg: &ReplicaConfig,
    status: &Arc<RwLock<LinkStatus>>,
    engine_tx: &mpsc::Sender<Event>,
) -> SableResult<()> {
    let stream = TcpStream::connect((cfg.primary_host.as_str(), cfg.primary_port)).await?;
    let mut link = Link::new(stream);
    log::info!(
        "Replication: connected to primary {}:{}",
        cfg.primary_host,
        cfg.primary_port
    );

    // handshake
    status.write().phase = HandshakePhase::Ping;
    link.send(&[b"PING"]).await?;
    link.expect_simple("PONG").await?;
    status.write().phase = HandshakePhase::Port;
    let port_repr = cfg.listening_port.to_string();
    link.send(&[b"REPLCONF", b"listening-port", port_repr.as_bytes()])
        .await?;
    link.expect_simple("OK").await?;
    status.write().phase = HandshakePhase::Capa;
    link.send(&[b"REPLCONF", b"capa", b"psync2"]).await?;
    link.expect_simple("OK").await?;
    status.write().phase = HandshakePhase::Psync;
    link.send(&[b"PSYNC", b"?", b"-1"]).await?;
    let fullresync = link.read_simple().await?;
    let (replid, offset) = parse_fullresync(&fullresync)?;

    // snapshot
    status.write().phase = HandshakePhase::Load;
    let snapshot = link.read_rdb_payload().await?;
    let entries = rdb::deserialize(&snapshot).map_err(Error::Storage)?;
    if engine_tx
        .send(Event::ReplSnapshot { entries })
        .await
        .is_err()
    {
        return Ok(());
    }
    {
        let mut st = status.write();
        st.up = true;
        st.phase = HandshakePhase::Stream;
        st.offset = offset;
        st.replid = replid;
    }
    log::info!("Replication: full sync done at offset {offset}");

    // apply loop
    let mut offset = offset;
    let mut ack_pacer = time::interval(Duration::from_secs(1));
    ack_pacer.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            incoming = link.read_command() => {
                let (args, frame_len) = incoming?;
                offset += frame_len as u64;
                status.write().offset = offset;
                match classify(&args) {
                    StreamCmd::Ping => {}
                    StreamCmd::GetAck => link.send_ack(offset).await?,
                    StreamCmd::Write => {
                        if engine_tx.send(Event::ReplApply { args }).await.is_err() {
                            return Ok(());
                        }
                    }
                }
            }
            _ = ack_pacer.tick() => link.send_ack(offset).await?,
        }
    }
}

enum StreamCmd {
    Ping,
    GetAck,
    Write,
}

fn classify(args: &[Data]) -> StreamCmd {
    let name = args
        .first()
        .map(|a| String::from_utf8_lossy(a).to_ascii_uppercase())
        .unwrap_or_default();
    match name.as_str() {
        "PING" => StreamCmd::Ping,
        "REPLCONF"
            if args
                .get(1)
                .is_some_and(|sub| sub.eq_ignore_ascii_case(b"GETACK")) =>
        {
            StreamCmd::GetAck
        }
        _ => StreamCmd::Write,
    }
}

fn parse_fullresync(line: &str) -> SableResult<(String, u64)> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("FULLRESYNC"), Some(replid), Some(offset)) => {
            let offset = offset
                .parse()
                .map_err(|_| Error::Replication(format!("bad FULLRESYNC offset in '{line}'")))?;
            Ok((replid.to_owned(), offset))
        }
        _ => Err(Error::Replication(format!(
            "expected FULLRESYNC, primary said '{line}'"
        ))),
    }
}

/// The buffered, frame-oriented view of the primary connection
struct Link {
    stream: TcpStream,
    buf: BytesMut,
}

impl Link {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            buf: BytesMut::with_capacity(libsable::BUF_CAP),
        }
    }
    async fn send(&mut self, parts: &[&[u8]]) -> SableResult<()> {
        let mut out = BytesMut::new();
        write_request(&mut out, parts.iter().copied());
        self.stream.write_all(&out).await?;
        self.stream.flush().await?;
        Ok(())
    }
    async fn send_ack(&mut self, offset: u64) -> SableResult<()> {
        let repr = offset.to_string();
        self.send(&[b"REPLCONF", b"ACK", repr.as_bytes()]).await
    }
    async fn fill(&mut self) -> SableResult<()> {
        if self.stream.read_buf(&mut self.buf).await? == 0 {
            return Err(Error::Replication("primary closed the link".to_owned()));
        }
        Ok(())
    }
    /// Read one simple-string reply (errors from the primary are errors
    /// here too)
    async fn read_simple(&mut self) -> SableResult<String> {
        loop {
            let parsed = match Parser::parse_element(&self.buf) {
                Ok((Element::Simple(line), consumed)) => {
                    Some((String::from_utf8_lossy(line).into_owned(), consumed))
                }
                Ok((Element::Error(line), _)) => {
                    return Err(Error::Replication(format!(
                        "primary answered with an error: {}",
                        String::from_utf8_lossy(line)
                    )))
                }
                Ok(_) => {
                    return Err(Error::Replication(
                        "unexpected frame during handshake".to_owned(),
                    ))
                }
                Err(ParseError::NotEnough) => None,
                Err(e) => return Err(Error::Replication(format!("protocol error: {e}"))),
            };
            match parsed {
                Some((line, consumed)) => {
                    self.buf.advance(consumed);
                    return Ok(line);
                }
                None => self.fill().await?,
            }
        }
    }
    async fn expect_simple(&mut self, want: &str) -> SableResult<()> {
        let got = self.read_simple().await?;
        if got.eq_ignore_ascii_case(want) {
            Ok(())
        } else {
            Err(Error::Replication(format!(
                "handshake expected +{want}, got '{got}'"
            )))
        }
    }
    /// Read the `$<len>\r\n<bytes>` snapshot payload (no trailing CRLF)
    async fn read_rdb_payload(&mut self) -> SableResult<Vec<u8>> {
        // header first
        let len = loop {
            if let Some(nl) = self.buf.iter().position(|&b| b == b'\n') {
                if nl < 3 || self.buf[0] != b'$' || self.buf[nl - 1] != b'\r' {
                    return Err(Error::Replication("bad snapshot header".to_owned()));
                }
                let digits = &self.buf[1..nl - 1];
                let len = std::str::from_utf8(digits)
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .ok_or_else(|| Error::Replication("bad snapshot length".to_owned()))?;
                self.buf.advance(nl + 1);
                break len;
            }
            self.fill().await?;
        };
        while self.buf.len() < len {
            self.fill().await?;
        }
        let payload = self.buf.split_to(len);
        Ok(payload.to_vec())
    }
    /// Read one request frame off the stream, returning its argv and its
    /// exact byte length (for offset accounting)
    async fn read_command(&mut self) -> SableResult<(Vec<Data>, usize)> {
        loop {
            let parsed = match Parser::parse(&self.buf) {
                Ok((query, consumed)) => {
                    let args: Vec<Data> =
                        query.iter().map(|arg| Data::copy_from_slice(arg)).collect();
                    Some((args, consumed))
                }
                Err(ParseError::NotEnough) => None,
                Err(e) => {
                    return Err(Error::Replication(format!(
                        "protocol error on the stream: {e}"
                    )))
                }
            };
            match parsed {
                Some((args, consumed)) => {
                    self.buf.advance(consumed);
                    return Ok((args, consumed));
                }
                None => self.fill().await?,
            }
        }
    }
}
