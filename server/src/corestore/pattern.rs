/*
 * Created on Sun Mar 19 2023
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

//! Glob matching for `KEYS` and pattern subscriptions: `*` (zero or more
//! bytes), `?` (exactly one byte), `[...]` with `^` negation and `a-b`
//! ranges, `\x` literal escape. Matching is byte-wise, never
//! Unicode-aware

/// Does `pattern` match the whole of `data`?
pub fn matches(pattern: &[u8], data: &[u8]) -> bool {
    match_from(pattern, data)
}

fn match_from(mut pat: &[u8], mut data: &[u8]) -> bool {
    while let Some(&pb) = pat.first() {
        match pb {
            b'*' => {
                // collapse a run of stars
                while pat.get(1) == Some(&b'*') {
                    pat = &pat[1..];
                }
                if pat.len() == 1 {
                    return true;
                }
                // try every split point for the tail
                let tail = &pat[1..];
                for skip in 0..=data.len() {
                    if match_from(tail, &data[skip..]) {
                        return true;
                    }
                }
                return false;
            }
            b'?' => {
                if data.is_empty() {
                    return false;
                }
                pat = &pat[1..];
                data = &data[1..];
            }
            b'[' => {
                let (matched, rest) = match_class(&pat[1..], data.first().copied());
                match (matched, data.is_empty()) {
                    (true, false) => {
                        pat = rest;
                        data = &data[1..];
                    }
                    _ => return false,
                }
            }
            b'\\' if pat.len() >= 2 => {
                if data.first() != Some(&pat[1]) {
                    return false;
                }
                pat = &pat[2..];
                data = &data[1..];
            }
            _ => {
                if data.first() != Some(&pb) {
                    return false;
                }
                pat = &pat[1..];
                data = &data[1..];
            }
        }
    }
    data.is_empty()
}

/// Match a `[...]` class against `byte`; returns (matched, pattern after
/// the closing bracket). An unterminated class matches nothing
fn match_class(mut pat: &[u8], byte: Option<u8>) -> (bool, &[u8]) {
    let byte = match byte {
        Some(b) => b,
        None => {
            // still need to consume the class to find the tail
            let rest = skip_class(pat);
            return (false, rest);
        }
    };
    let negate = pat.first() == Some(&b'^');
    if negate {
        pat = &pat[1..];
    }
    let mut hit = false;
    let mut first = true;
    loop {
        match pat.first() {
            None => return (false, pat),
            // a `]` as the very first member is a literal
            Some(&b']') if !first => return (hit != negate, &pat[1..]),
            Some(&b'\\') if pat.len() >= 2 => {
                hit |= pat[1] == byte;
                pat = &pat[2..];
            }
            Some(&lo) if pat.get(1) == Some(&b'-') && pat.len() >= 3 && pat[2] != b']' => {
                let (lo, hi) = if lo <= pat[2] { (lo, pat[2]) } else { (pat[2], lo) };
                hit |= (lo..=hi).contains(&byte);
                pat = &pat[3..];
            }
            Some(&pb) => {
                hit |= pb == byte;
                pat = &pat[1..];
            }
        }
        first = false;
    }
}

fn skip_class(mut pat: &[u8]) -> &[u8] {
    if pat.first() == Some(&b'^') {
        pat = &pat[1..];
    }
    let mut first = true;
    while let Some(&pb) = pat.first() {
        match pb {
            b']' if !first => return &pat[1..],
            b'\\' if pat.len() >= 2 => pat = &pat[2..],
            _ => pat = &pat[1..],
        }
        first = false;
    }
    pat
}
