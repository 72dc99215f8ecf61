/*
 * Created on Thu Apr 20 2023
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
    super::Reply,
    bytes::{BufMut, BytesMut},
};

/// Serialize a reply into the buffer. The `Static` variant is written
/// verbatim; everything else gets its tsymbol, length/payload and CRLFs
pub fn write_reply(buf: &mut BytesMut, reply: &Reply) {
    match reply {
        Reply::None => {}
        Reply::Static(raw) => buf.put_slice(raw),
        Reply::Simple(line) => {
            buf.put_u8(b'+');
            buf.put_slice(line.as_bytes());
            buf.put_slice(b"\r\n");
        }
        Reply::Error(line) => {
            buf.put_u8(b'-');
            buf.put_slice(line.as_bytes());
            buf.put_slice(b"\r\n");
        }
        Reply::Integer(int) => {
            buf.put_u8(b':');
            buf.put_slice(int.to_string().as_bytes());
            buf.put_slice(b"\r\n");
        }
        Reply::Bulk(blob) => write_bulk(buf, blob),
        Reply::NullBulk => buf.put_slice(b"$-1\r\n"),
        Reply::Array(items) => {
            buf.put_u8(b'*');
            buf.put_slice(items.len().to_string().as_bytes());
            buf.put_slice(b"\r\n");
            for item in items {
                write_reply(buf, item);
            }
        }
        Reply::NullArray => buf.put_slice(b"*-1\r\n"),
    }
}

/// Serialize a reply into a frozen buffer ready for an outbound queue
pub fn encode_reply(reply: &Reply) -> bytes::Bytes {
    let mut buf = BytesMut::new();
    write_reply(&mut buf, reply);
    buf.freeze()
}

/// Serialize a single bulk string frame
pub fn write_bulk(buf: &mut BytesMut, blob: &[u8]) {
    buf.put_u8(b'$');
    buf.put_slice(blob.len().to_string().as_bytes());
    buf.put_slice(b"\r\n");
    buf.put_slice(blob);
    buf.put_slice(b"\r\n");
}

/// Serialize a request frame (an array of bulk strings). This is what the
/// AOF rewrite and the replication handshake use to produce command frames
pub fn write_request<I, B>(buf: &mut BytesMut, parts: I)
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let parts: Vec<B> = parts.into_iter().collect();
    buf.put_u8(b'*');
    buf.put_slice(parts.len().to_string().as_bytes());
    buf.put_slice(b"\r\n");
    for part in parts {
        write_bulk(buf, part.as_ref());
    }
}
