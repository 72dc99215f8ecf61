/*
 * Created on Mon Dec 18 2023
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

//! # Sable
//!
//! The `sabled` crate is Sable's database server: a RESP2 (Redis wire
//! protocol) in-memory data store with an append-only command log, binary
//! snapshots and primary/replica replication. See the modules for their
//! respective documentation

use {
    env_logger::Builder,
    libsable::{util::terminal, URL, VERSION},
    std::{env, thread, time},
};

mod actions;
mod arbiter;
mod config;
mod corestore;
mod dbnet;
mod protocol;
mod pubsub;
mod queryengine;
mod replication;
mod resp;
mod services;
mod storage;
#[cfg(test)]
mod tests;
mod util;

use crate::{queryengine::Engine, replication::Role, util::InstanceLock};

#[cfg(all(not(target_env = "msvc"), not(miri)))]
use jemallocator::Jemalloc;

#[cfg(all(not(target_env = "msvc"), not(miri)))]
#[global_allocator]
/// Jemallocator - this is the default memory allocator for platforms other than msvc
static GLOBAL: Jemalloc = Jemalloc;

fn main() {
    Builder::new()
        .parse_filters(&env::var("SABLE_LOG").unwrap_or_else(|_| "info".to_owned()))
        .init();
    let cfg = config::get_config_or_exit();
    println!("Sable v{} | {}", VERSION, URL);
    // claim the data directory before anything gets to read or write it
    let lock = match InstanceLock::acquire(&cfg.dir) {
        Ok(lock) => lock,
        Err(e) => {
            log::error!("Startup failure: {e}");
            util::exit_error();
        }
    };
    // Start the server which asynchronously waits for a termination signal
    // which will safely shut down the server
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("server")
        .enable_all()
        .build()
        .unwrap();
    let engine = runtime.block_on(arbiter::run(cfg));
    // make sure all background workers terminate
    drop(runtime);
    let engine = match engine {
        Ok(engine) => engine,
        Err(e) => {
            log::error!("Startup failure: {e}");
            lock.release();
            util::exit_error();
        }
    };
    shutdown_persistence(engine);
    lock.release();
    terminal::write_info("Goodbye :)\n").unwrap_or(());
}

/// Flush the append only file and, on a primary, keep trying to write the
/// final snapshot until it lands
fn shutdown_persistence(mut engine: Engine) {
    if let Some(aof) = engine.aof.as_mut() {
        if let Err(e) = aof.sync_all() {
            log::error!("Shutdown: failed to flush the append only file: {e}");
        }
    }
    if matches!(engine.role, Role::Primary(_)) {
        loop {
            match engine.save_rdb() {
                Ok(()) => {
                    log::info!("Successfully saved data to disk");
                    break;
                }
                Err(e) => {
                    log::error!(
                        "Failed to write data with error '{}'. Attempting to retry in 10s",
                        e
                    );
                }
            }
            thread::sleep(time::Duration::from_secs(10));
        }
    }
}

