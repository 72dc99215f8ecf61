/*
 * Created on Mon Jun 12 2023
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

//! # Sorted-set actions
//!
//! `ZADD` validates its flag matrix up front (`NX`|`XX` exclusive, `GT`/`LT`
//! incompatible with `NX`); score arguments reject `NaN` at this boundary so
//! the store below never sees one

use {
    super::{keyword, parse_int, ActionResult},
    crate::{
        corestore::{Data, ScoreBound, ZaddFlags},
        queryengine::Engine,
        resp::Reply,
    },
};

pub fn zadd(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let mut flags = ZaddFlags::default();
    let mut idx = 1;
    while idx < args.len() {
        match keyword(&args[idx]).as_str() {
            "NX" => flags.nx = true,
            "XX" => flags.xx = true,
            "GT" => flags.gt = true,
            "LT" => flags.lt = true,
            "CH" => flags.ch = true,
            _ => break,
        }
        idx += 1;
    }
    if flags.nx && flags.xx {
        aerr_fmt!("ERR XX and NX options at the same time are not compatible");
    }
    if (flags.gt && flags.lt) || (flags.nx && (flags.gt || flags.lt)) {
        aerr_fmt!("ERR GT, LT, and/or NX options at the same time are not compatible");
    }
    let rest = &args[idx..];
    if rest.is_empty() || rest.len() % 2 != 0 {
        aerr!(SYNTAX_ERR);
    }
    let mut pairs = Vec::with_capacity(rest.len() / 2);
    for pair in rest.chunks_exact(2) {
        let score = super::parse_score_arg(&pair[0])?;
        pairs.push((score, pair[1].clone()));
    }
    let (added, changed) = engine.table.zadd(&args[0], flags, pairs, engine.now)?;
    Ok(Reply::Integer(if flags.ch {
        changed as i64
    } else {
        added as i64
    }))
}

pub fn zrem(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let removed = engine.table.zrem(&args[0], &args[1..], engine.now)?;
    Ok(Reply::Integer(removed as i64))
}

pub fn zscore(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    Ok(match engine.table.zscore(&args[0], &args[1], engine.now)? {
        Some(score) => Reply::score(score),
        None => Reply::NullBulk,
    })
}

pub fn zcard(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    Ok(Reply::Integer(engine.table.zcard(&args[0], engine.now)? as i64))
}

fn with_scores_flag(args: &[Data]) -> ActionResult<bool> {
    match args.first() {
        None => Ok(false),
        Some(flag) if keyword(flag) == "WITHSCORES" => Ok(true),
        Some(_) => aerr!(SYNTAX_ERR),
    }
}

fn render(pairs: Vec<(Data, f64)>, withscores: bool) -> Reply {
    if withscores {
        let mut flat = Vec::with_capacity(pairs.len() * 2);
        for (member, score) in pairs {
            flat.push(Reply::Bulk(member));
            flat.push(Reply::score(score));
        }
        Reply::Array(flat)
    } else {
        Reply::bulk_array(pairs.into_iter().map(|(member, _)| member))
    }
}

pub fn zrange(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let start = parse_int(&args[1])?;
    let stop = parse_int(&args[2])?;
    let withscores = with_scores_flag(&args[3..])?;
    let pairs = engine.table.zrange(&args[0], start, stop, engine.now)?;
    Ok(render(pairs, withscores))
}

/// Parse a `ZRANGEBYSCORE` boundary: `(`-prefixed is exclusive, and the
/// infinities are spelled `+inf`/`-inf`
fn parse_bound(arg: &Data) -> ActionResult<ScoreBound> {
    let (exclusive, raw) = match arg.first() {
        Some(b'(') => (true, &arg[1..]),
        _ => (false, &arg[..]),
    };
    let score = match crate::util::parse_score(raw) {
        Some(score) => score,
        None => aerr!(BAD_SCORE_RANGE_ERR),
    };
    Ok(if exclusive {
        ScoreBound::Exclusive(score)
    } else {
        ScoreBound::Inclusive(score)
    })
}

pub fn zrangebyscore(engine: &mut Engine, _cid: u64, args: &[Data]) -> ActionResult<Reply> {
    let min = parse_bound(&args[1])?;
    let max = parse_bound(&args[2])?;
    let withscores = with_scores_flag(&args[3..])?;
    let pairs = engine.table.zrangebyscore(&args[0], min, max, engine.now)?;
    Ok(render(pairs, withscores))
}
