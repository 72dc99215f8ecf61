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

//! # Configuration
//!
//! Four layers, weakest first: defaults, the YAML file (`--config`),
//! `SABLE_*` environment variables, command-line flags. Each stronger
//! layer only overrides what it actually sets

mod cfgcli;
mod cfgfile;

use {
    crate::storage::aof::FsyncPolicy,
    clap::Parser,
    std::{
        env,
        net::{IpAddr, Ipv4Addr},
        path::PathBuf,
    },
};

// server defaults
const DEFAULT_IPV4: IpAddr = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));
const DEFAULT_PORT: u16 = 6379;
const DEFAULT_MAXCON: usize = crate::dbnet::MAXIMUM_CONNECTION_LIMIT;

/// The fully resolved server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationSet {
    pub host: IpAddr,
    pub port: u16,
    /// `Some((host, port))` runs this node as a replica
    pub replicaof: Option<(String, u16)>,
    /// Where `dump.rdb`, `appendonly.aof` and the pid file live
    pub dir: PathBuf,
    pub appendfsync: FsyncPolicy,
    pub aof_enabled: bool,
    pub maxcon: usize,
}

impl Default for ConfigurationSet {
    fn default() -> Self {
        Self {
            host: DEFAULT_IPV4,
            port: DEFAULT_PORT,
            replicaof: None,
            dir: PathBuf::from("."),
            appendfsync: FsyncPolicy::EverySec,
            aof_enabled: true,
            maxcon: DEFAULT_MAXCON,
        }
    }
}

/// Resolve the configuration, terminating the process on bad input:
/// `--help`/`--version` exit 0, anything invalid exits 1 with a one-line
/// error on stderr
pub fn get_config_or_exit() -> ConfigurationSet {
    let args = match cfgcli::CliArgs::try_parse() {
        Ok(args) => args,
        Err(e)
            if matches!(
                e.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            let _ = e.print();
            std::process::exit(0);
        }
        Err(e) => {
            // one line, stderr, exit 1
            let text = e.to_string();
            eprintln!("sabled: {}", text.lines().next().unwrap_or("bad arguments"));
            std::process::exit(1);
        }
    };
    match resolve(args) {
        Ok(cfg) => cfg,
        Err(msg) => {
            eprintln!("sabled: {msg}");
            std::process::exit(1);
        }
    }
}

fn resolve(args: cfgcli::CliArgs) -> Result<ConfigurationSet, String> {
    let mut cfg = ConfigurationSet::default();
    // layer 2: the file
    if let Some(path) = &args.config {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read config file '{}': {e}", path.display()))?;
        let file: cfgfile::ConfigFile = serde_yaml::from_str(&raw)
            .map_err(|e| format!("cannot parse config file '{}': {e}", path.display()))?;
        apply_file(&mut cfg, file)?;
    }
    // layer 3: the environment
    apply_env(&mut cfg);
    // layer 4: the command line
    apply_cli(&mut cfg, args)?;
    Ok(cfg)
}

fn apply_file(cfg: &mut ConfigurationSet, file: cfgfile::ConfigFile) -> Result<(), String> {
    if let Some(host) = file.host {
        cfg.host = host;
    }
    if let Some(port) = file.port {
        cfg.port = port;
    }
    if let Some(dir) = file.dir {
        cfg.dir = dir;
    }
    if let Some(policy) = file.appendfsync {
        cfg.appendfsync = parse_fsync(&policy)?;
    }
    if let Some(noaof) = file.noaof {
        cfg.aof_enabled = !noaof;
    }
    if let Some(maxcon) = file.maxcon {
        cfg.maxcon = maxcon;
    }
    if let Some(replicaof) = file.replicaof {
        cfg.replicaof = Some((replicaof.host, replicaof.port));
    }
    Ok(())
}

fn apply_env(cfg: &mut ConfigurationSet) {
    match env::var("SABLE_HOST") {
        Ok(raw) => match raw.parse() {
            Ok(host) => cfg.host = host,
            Err(_) => log::warn!("Ignoring unparseable SABLE_HOST '{raw}'"),
        },
        Err(_) => {}
    }
    match env::var("SABLE_PORT") {
        Ok(raw) => match raw.parse() {
            Ok(port) => cfg.port = port,
            Err(_) => log::warn!("Ignoring unparseable SABLE_PORT '{raw}'"),
        },
        Err(_) => {}
    }
}

fn apply_cli(cfg: &mut ConfigurationSet, args: cfgcli::CliArgs) -> Result<(), String> {
    if let Some(host) = args.host {
        cfg.host = host;
    }
    if let Some(port) = args.port {
        cfg.port = port;
    }
    if let Some(dir) = args.dir {
        cfg.dir = dir;
    }
    if let Some(policy) = args.appendfsync {
        cfg.appendfsync = parse_fsync(&policy)?;
    }
    if args.noaof {
        cfg.aof_enabled = false;
    }
    if let Some(maxcon) = args.maxcon {
        if maxcon == 0 {
            return Err("--maxcon must be at least 1".to_owned());
        }
        cfg.maxcon = maxcon;
    }
    if let Some(pair) = args.replicaof {
        // clap guarantees exactly two values
        let host = pair[0].clone();
        let port: u16 = pair[1]
            .parse()
            .map_err(|_| format!("invalid primary port '{}'", pair[1]))?;
        cfg.replicaof = Some((host, port));
    }
    Ok(())
}

fn parse_fsync(raw: &str) -> Result<FsyncPolicy, String> {
    raw.parse::<FsyncPolicy>()
        .map_err(|_| format!("invalid appendfsync policy '{raw}' (always/everysec/no)"))
}

/// Pretty description for the startup log line
pub fn describe(cfg: &ConfigurationSet) -> String {
    match &cfg.replicaof {
        Some((host, port)) => format!(
            "{}:{} (replica of {}:{})",
            cfg.host, cfg.port, host, port
        ),
        None => format!("{}:{} (primary)", cfg.host, cfg.port),
    }
}
