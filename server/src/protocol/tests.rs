/*
 * Created on Thu Feb 02 2023
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

use super::{Element, ParseError, Parser};

#[test]
fn parse_simple_set_request() {
    let buf = b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n";
    let (query, consumed) = Parser::parse(buf).unwrap();
    assert_eq!(consumed, buf.len());
    assert_eq!(query, vec![&b"SET"[..], &b"foo"[..], &b"bar"[..]]);
}

#[test]
fn parse_binary_safe_bulk() {
    let buf = b"*2\r\n$4\r\nECHO\r\n$5\r\na\r\nb!\r\n";
    let (query, consumed) = Parser::parse(buf).unwrap();
    assert_eq!(consumed, buf.len());
    assert_eq!(query[1], b"a\r\nb!");
}

#[test]
fn parse_pipelined_requests() {
    let buf = b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPING\r\n";
    let (query, consumed) = Parser::parse(buf).unwrap();
    assert_eq!(query, vec![&b"PING"[..]]);
    // the second request is parsed off the remainder
    let (query, consumed2) = Parser::parse(&buf[consumed..]).unwrap();
    assert_eq!(query, vec![&b"PING"[..]]);
    assert_eq!(consumed + consumed2, buf.len());
}

#[test]
fn parse_incomplete_requests_need_more() {
    // every proper prefix of a valid request must yield NotEnough
    let buf = b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n";
    for cut in 0..buf.len() {
        assert_eq!(
            Parser::parse(&buf[..cut]).unwrap_err(),
            ParseError::NotEnough,
            "prefix of {cut} bytes should be incomplete"
        );
    }
}

#[test]
fn parse_rejects_non_array_request() {
    assert_eq!(
        Parser::parse(b"+PING\r\n").unwrap_err(),
        ParseError::UnexpectedByte
    );
    assert_eq!(
        Parser::parse(b"$4\r\nPING\r\n").unwrap_err(),
        ParseError::UnexpectedByte
    );
}

#[test]
fn parse_rejects_null_and_empty_request_arrays() {
    assert_eq!(Parser::parse(b"*0\r\n").unwrap_err(), ParseError::BadPacket);
    assert_eq!(Parser::parse(b"*-1\r\n").unwrap_err(), ParseError::BadPacket);
}

#[test]
fn parse_rejects_bad_length_fields() {
    assert_eq!(
        Parser::parse(b"*x\r\n").unwrap_err(),
        ParseError::DatatypeParseFailure
    );
    assert_eq!(
        Parser::parse(b"*1\r\n$-2\r\n").unwrap_err(),
        ParseError::DatatypeParseFailure
    );
    assert_eq!(
        Parser::parse(b"*1\r\n$3x\r\nfoo\r\n").unwrap_err(),
        ParseError::DatatypeParseFailure
    );
}

#[test]
fn parse_rejects_missing_crlf_after_blob() {
    assert_eq!(
        Parser::parse(b"*1\r\n$3\r\nfooXX").unwrap_err(),
        ParseError::UnexpectedByte
    );
}

#[test]
fn parse_rejects_bare_lf_terminator() {
    assert_eq!(
        Parser::parse(b"*1\n$4\r\nPING\r\n").unwrap_err(),
        ParseError::UnexpectedByte
    );
}

#[test]
fn parse_rejects_null_bulk_inside_request() {
    assert_eq!(
        Parser::parse(b"*2\r\n$3\r\nGET\r\n$-1\r\n").unwrap_err(),
        ParseError::BadPacket
    );
}

#[test]
fn element_parse_all_types() {
    let (e, n) = Parser::parse_element(b"+OK\r\n").unwrap();
    assert_eq!((e, n), (Element::Simple(&b"OK"[..]), 5));
    let (e, _) = Parser::parse_element(b"-ERR boom\r\n").unwrap();
    assert_eq!(e, Element::Error(&b"ERR boom"[..]));
    let (e, _) = Parser::parse_element(b":-42\r\n").unwrap();
    assert_eq!(e, Element::Integer(-42));
    let (e, _) = Parser::parse_element(b"$3\r\nbar\r\n").unwrap();
    assert_eq!(e, Element::Bulk(&b"bar"[..]));
    let (e, _) = Parser::parse_element(b"$-1\r\n").unwrap();
    assert_eq!(e, Element::NullBulk);
    let (e, _) = Parser::parse_element(b"*-1\r\n").unwrap();
    assert_eq!(e, Element::NullArray);
    let (e, n) = Parser::parse_element(b"*2\r\n:1\r\n$1\r\na\r\n").unwrap();
    assert_eq!(
        e,
        Element::Array(vec![Element::Integer(1), Element::Bulk(&b"a"[..])])
    );
    assert_eq!(n, 15);
}

#[test]
fn element_parse_nested_array() {
    let (e, _) = Parser::parse_element(b"*1\r\n*1\r\n+hi\r\n").unwrap();
    assert_eq!(
        e,
        Element::Array(vec![Element::Array(vec![Element::Simple(&b"hi"[..])])])
    );
}

#[test]
fn random_binary_requests_roundtrip() {
    use rand::{Rng, SeedableRng};
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xcafe);
    for _ in 0..200 {
        let arity = rng.gen_range(1..=8);
        let args: Vec<Vec<u8>> = (0..arity)
            .map(|_| {
                let len = rng.gen_range(0..64);
                (0..len).map(|_| rng.gen::<u8>()).collect()
            })
            .collect();
        let mut wire = Vec::new();
        wire.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
        for arg in &args {
            wire.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
            wire.extend_from_slice(arg);
            wire.extend_from_slice(b"\r\n");
        }
        let (query, consumed) = Parser::parse(&wire).unwrap();
        assert_eq!(consumed, wire.len());
        assert_eq!(query.len(), args.len());
        for (got, want) in query.iter().zip(&args) {
            assert_eq!(got, &want.as_slice());
        }
    }
}
