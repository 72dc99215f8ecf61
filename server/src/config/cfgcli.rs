/*
 * Created on Mon Oct 16 2023
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
    clap::Parser,
    std::{net::IpAddr, path::PathBuf},
};

#[derive(Debug, Parser)]
#[command(
    name = "sabled",
    version = libsable::VERSION,
    about = "Sable: a Redis-wire-compatible in-memory data store"
)]
pub struct CliArgs {
    /// Bind address
    #[arg(long, value_name = "HOST")]
    pub host: Option<IpAddr>,
    /// Bind port
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,
    /// Run as a replica of the given primary
    #[arg(long, num_args = 2, value_names = ["HOST", "PORT"])]
    pub replicaof: Option<Vec<String>>,
    /// YAML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Data directory for the snapshot and the append only file
    #[arg(long, value_name = "PATH")]
    pub dir: Option<PathBuf>,
    /// AOF fsync policy: always, everysec or no
    #[arg(long, value_name = "POLICY")]
    pub appendfsync: Option<String>,
    /// Disable the append only file entirely
    #[arg(long)]
    pub noaof: bool,
    /// Maximum number of simultaneous connections
    #[arg(long, value_name = "COUNT")]
    pub maxcon: Option<usize>,
}
