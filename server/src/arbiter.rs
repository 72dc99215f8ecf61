/*
 * Created on Fri Nov 10 2023
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

//! # The arbiter
//!
//! Wires everything together and babysits it: build the engine, recover
//! state from disk, bind the listener, start the services and (on a
//! replica) the replication client, then run the executor until a
//! termination signal lands. Hands the engine back so `main` can do final
//! persistence after the runtime is gone

use {
    crate::{
        config::{self, ConfigurationSet},
        dbnet::{BaseListener, Listener},
        queryengine::{Engine, EngineCfg},
        replication::{replica, LinkStatus, PrimaryState, Role},
        services,
        storage::{self, aof::Aof},
        util::error::SableResult,
    },
    parking_lot::RwLock,
    std::sync::Arc,
    tokio::sync::{broadcast, mpsc},
};

/// Capacity of the channel feeding the executor; connection tasks block
/// (backpressure) when the executor falls this far behind
const ENGINE_QUEUE_DEPTH: usize = 512;

pub async fn run(cfg: ConfigurationSet) -> SableResult<Engine> {
    let (signal, _) = broadcast::channel::<()>(1);
    let (engine_tx, engine_rx) = mpsc::channel(ENGINE_QUEUE_DEPTH);

    let role = match &cfg.replicaof {
        None => Role::Primary(PrimaryState::new()),
        Some((host, port)) => Role::Replica {
            host: host.clone(),
            port: *port,
            status: Arc::new(RwLock::new(LinkStatus::default())),
        },
    };
    let engine_cfg = EngineCfg {
        dir: cfg.dir.clone(),
        appendfsync: cfg.appendfsync,
        maxclients: cfg.maxcon,
        port: cfg.port,
    };
    let mut engine = Engine::new(engine_cfg, role);

    // recovery order: snapshot, then the AOF on top; a replica skips both
    // and waits for the snapshot from its primary
    if !engine.role.is_replica() {
        engine.load_startup_data()?;
    }
    if cfg.aof_enabled {
        let aof_path = cfg.dir.join(storage::AOF_FILE);
        engine.aof = Some(Aof::open(aof_path, cfg.appendfsync)?);
    }

    // the signal task: first SIGINT/SIGTERM fans out through `signal`
    spawn_signal_watcher(signal.clone())?;

    // the listener
    let base = BaseListener::init(
        engine_tx.clone(),
        cfg.host,
        cfg.port,
        cfg.maxcon,
        signal.clone(),
    )
    .await?;
    let mut listener = Listener::new(base);
    log::info!("Server started on {}", config::describe(&cfg));
    tokio::spawn(async move {
        if let Err(e) = listener.run().await {
            log::error!("Listener terminated with error: {e}");
        }
        listener.base.release_self().await;
    });

    // services and, on a replica, the replication client
    tokio::spawn(services::run_tickers(engine_tx.clone(), signal.subscribe()));
    if let Role::Replica { host, port, status } = &engine.role {
        let replica_cfg = replica::ReplicaConfig {
            primary_host: host.clone(),
            primary_port: *port,
            listening_port: cfg.port,
        };
        tokio::spawn(replica::run(
            replica_cfg,
            status.clone(),
            engine_tx.clone(),
            signal.subscribe(),
        ));
    }

    // run the executor until termination
    let engine = engine.run(engine_rx, signal.subscribe()).await;
    log::info!("Stopped accepting incoming connections");
    Ok(engine)
}

fn spawn_signal_watcher(signal: broadcast::Sender<()>) -> SableResult<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal as unix_signal, SignalKind};
        let mut sigterm = unix_signal(SignalKind::terminate())?;
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
            log::info!("Termination signal received");
            let _ = signal.send(());
        });
    }
    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Termination signal received");
            let _ = signal.send(());
        });
    }
    Ok(())
}
