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

use {
    super::{connection, next_client_id, NetBackoff},
    crate::{
        queryengine::Event,
        util::error::{Error, SableResult},
    },
    std::{net::IpAddr, sync::Arc},
    tokio::{
        net::{TcpListener, TcpStream},
        sync::{broadcast, mpsc, Semaphore},
    },
};

/// The base TCP listener: the binding plus everything a connection handler
/// needs to be spawned
pub struct BaseListener {
    /// The channel into the executor
    pub engine_tx: mpsc::Sender<Event>,
    /// The incoming connection listener (binding)
    pub listener: TcpListener,
    /// The maximum number of connections
    pub climit: Arc<Semaphore>,
    /// The shutdown broadcaster
    pub signal: broadcast::Sender<()>,
    // When all `Sender`s are dropped - the `Receiver` gets a `None` value
    // We send a clone of `terminate_tx` to each connection task
    pub terminate_tx: mpsc::Sender<()>,
    pub terminate_rx: mpsc::Receiver<()>,
}

impl BaseListener {
    pub async fn init(
        engine_tx: mpsc::Sender<Event>,
        host: IpAddr,
        port: u16,
        maxcon: usize,
        signal: broadcast::Sender<()>,
    ) -> SableResult<Self> {
        let (terminate_tx, terminate_rx) = mpsc::channel(1);
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|e| Error::ioerror_extra(e, format!("binding to port {port}")))?;
        Ok(Self {
            engine_tx,
            listener,
            climit: Arc::new(Semaphore::new(maxcon)),
            signal,
            terminate_tx,
            terminate_rx,
        })
    }
    /// Wait for every connection task to wind down
    pub async fn release_self(self) {
        let Self {
            mut terminate_rx,
            terminate_tx,
            signal,
            ..
        } = self;
        drop(signal);
        drop(terminate_tx);
        let _ = terminate_rx.recv().await;
    }
}

/// The plain-TCP listener
pub struct Listener {
    pub base: BaseListener,
}

impl Listener {
    pub fn new(base: BaseListener) -> Self {
        Self { base }
    }
    /// Accept an incoming connection, backing off on transient failures
    async fn accept(&mut self) -> SableResult<TcpStream> {
        let backoff = NetBackoff::new();
        loop {
            match self.base.listener.accept().await {
                Ok((stream, _)) => return Ok(stream),
                Err(e) => {
                    if backoff.should_disconnect() {
                        // too many retries; give up on the binding
                        return Err(e.into());
                    }
                }
            }
            backoff.spin().await;
        }
    }
    /// Run the accept loop until the shutdown signal fires
    pub async fn run(&mut self) -> SableResult<()> {
        let mut shutdown = self.base.signal.subscribe();
        loop {
            // take the permit first; it rides along into the handler task
            // and is released when the connection closes
            let permit = tokio::select! {
                permit = self.base.climit.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return Ok(()),
                },
                _ = shutdown.recv() => return Ok(()),
            };
            let stream = tokio::select! {
                stream = self.accept() => match stream {
                    Ok(stream) => stream,
                    Err(e) => {
                        log::error!("Accept failed: {e}");
                        return Err(e);
                    }
                },
                _ = shutdown.recv() => return Ok(()),
            };
            let id = next_client_id();
            let engine_tx = self.base.engine_tx.clone();
            let termination = self.base.signal.subscribe();
            let _term_guard = self.base.terminate_tx.clone();
            tokio::spawn(async move {
                let _permit = permit;
                let _term_guard = _term_guard;
                if let Err(e) = connection::run(stream, id, engine_tx, termination).await {
                    log::error!("Connection {id} error: {e}");
                }
            });
        }
    }
}
