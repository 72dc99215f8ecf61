/*
 * Created on Thu Sep 07 2023
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

//! # Background services
//!
//! The executor never sleeps on timers itself; this task feeds it ticks:
//! the `everysec` AOF flush and the replica heartbeat. Both collapse into
//! no-ops inside the engine when they do not apply

use {
    crate::queryengine::Event,
    std::time::Duration,
    tokio::{
        sync::{broadcast, mpsc},
        time,
    },
};

/// How often the primary pings its replica links
const HEARTBEAT_EVERY: Duration = Duration::from_secs(10);

pub async fn run_tickers(engine_tx: mpsc::Sender<Event>, mut termination: broadcast::Receiver<()>) {
    let mut aof_pacer = time::interval(Duration::from_secs(1));
    let mut heartbeat = time::interval(HEARTBEAT_EVERY);
    aof_pacer.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    heartbeat.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = aof_pacer.tick() => {
                if engine_tx.send(Event::AofFlushTick).await.is_err() {
                    return;
                }
            }
            _ = heartbeat.tick() => {
                if engine_tx.send(Event::ReplHeartbeat).await.is_err() {
                    return;
                }
            }
            _ = termination.recv() => return,
        }
    }
}
