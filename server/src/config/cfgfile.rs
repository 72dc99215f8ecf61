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
    serde::Deserialize,
    std::{net::IpAddr, path::PathBuf},
};

/// The YAML configuration file. Every field is optional; the layering in
/// `config::get_config` fills the gaps
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    pub dir: Option<PathBuf>,
    pub appendfsync: Option<String>,
    pub noaof: Option<bool>,
    pub maxcon: Option<usize>,
    pub replicaof: Option<ReplicaOf>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReplicaOf {
    pub host: String,
    pub port: u16,
}
