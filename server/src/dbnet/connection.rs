/*
 * Created on Tue Aug 22 2023
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

//! # The connection task
//!
//! One task per accepted socket. Inbound: grow a buffer, peel off complete
//! RESP2 requests, hand each (argv + original frame bytes) to the executor.
//! Outbound: drain the unbounded reply queue the executor writes into.
//! Replies, pub/sub pushes and the replication stream all travel the same
//! queue, which is what keeps them ordered per connection.
//!
//! A protocol error gets a final `-ERR Protocol error` line and the socket
//! is closed; the executor is told either way

use {
    crate::{
        corestore::Data,
        protocol::{ParseError, Parser},
        queryengine::Event,
        util::error::SableResult,
    },
    bytes::{Buf, Bytes, BytesMut},
    tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpStream,
        sync::{broadcast, mpsc},
    },
};

#[cfg(unix)]
fn raw_fd(stream: &TcpStream) -> i32 {
    use std::os::unix::io::AsRawFd;
    stream.as_raw_fd()
}

#[cfg(not(unix))]
fn raw_fd(_stream: &TcpStream) -> i32 {
    -1
}

pub async fn run(
    mut stream: TcpStream,
    id: u64,
    engine_tx: mpsc::Sender<Event>,
    mut termination: broadcast::Receiver<()>,
) -> SableResult<()> {
    let addr = stream.peer_addr()?;
    let fd = raw_fd(&stream);
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Bytes>();
    if engine_tx
        .send(Event::Connected {
            id,
            addr,
            fd,
            tx: outbound_tx,
        })
        .await
        .is_err()
    {
        return Ok(());
    }
    let mut buffer = BytesMut::with_capacity(libsable::BUF_CAP);
    let outcome = drive(
        &mut stream,
        id,
        &engine_tx,
        &mut outbound_rx,
        &mut termination,
        &mut buffer,
    )
    .await;
    // tell the executor, whatever happened; subscription and transaction
    // state dies with the connection
    let _ = engine_tx.send(Event::Disconnected { id }).await;
    outcome
}

async fn drive(
    stream: &mut TcpStream,
    id: u64,
    engine_tx: &mpsc::Sender<Event>,
    outbound_rx: &mut mpsc::UnboundedReceiver<Bytes>,
    termination: &mut broadcast::Receiver<()>,
    buffer: &mut BytesMut,
) -> SableResult<()> {
    loop {
        tokio::select! {
            read = stream.read_buf(buffer) => {
                let read = read?;
                if read == 0 {
                    // peer closed; anything buffered is an abandoned
                    // partial request
                    return Ok(());
                }
                if !drain_requests(buffer, id, engine_tx, stream).await? {
                    return Ok(());
                }
            }
            queued = outbound_rx.recv() => match queued {
                Some(bytes) => {
                    stream.write_all(&bytes).await?;
                    // opportunistically drain whatever else is queued
                    while let Ok(more) = outbound_rx.try_recv() {
                        stream.write_all(&more).await?;
                    }
                    stream.flush().await?;
                }
                // the executor dropped us (QUIT): the queue has been fully
                // drained by recv returning None only after the buffer empties
                None => {
                    stream.flush().await?;
                    return Ok(());
                }
            },
            _ = termination.recv() => return Ok(()),
        }
    }
}

/// Peel complete requests off the buffer. Returns `false` when the
/// connection must close (protocol error already reported)
async fn drain_requests(
    buffer: &mut BytesMut,
    id: u64,
    engine_tx: &mpsc::Sender<Event>,
    stream: &mut TcpStream,
) -> SableResult<bool> {
    loop {
        let (args, consumed) = match Parser::parse(buffer) {
            Ok((query, consumed)) => {
                let args: Vec<Data> = query.iter().map(|arg| Data::copy_from_slice(arg)).collect();
                (args, consumed)
            }
            Err(ParseError::NotEnough) => return Ok(true),
            Err(e) => {
                // protocol errors are terminal for the connection
                let line = format!("-ERR Protocol error: {e}\r\n");
                let _ = stream.write_all(line.as_bytes()).await;
                let _ = stream.flush().await;
                return Ok(false);
            }
        };
        let frame = buffer.copy_to_bytes(consumed);
        if engine_tx
            .send(Event::Query { id, args, frame })
            .await
            .is_err()
        {
            return Ok(false);
        }
    }
}
