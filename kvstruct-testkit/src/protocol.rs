//! # Request Framing
//!
//! Incremental parser for RESP2 command arrays arriving on a socket, and the
//! reply encoders the dispatcher writes back.

use bytes::{Buf, BytesMut};

/// Framing failure; the connection is closed after reporting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolError;

/// Parses one command from the front of `buf`.
///
/// Returns `Ok(None)` until a full command has arrived; a parsed command is
/// consumed from the buffer.
pub fn parse_command(buf: &mut BytesMut) -> Result<Option<Vec<String>>, ProtocolError> {
    let mut pos = 0;
    let count = match read_header(buf, &mut pos, b'*')? {
        Some(count) => count,
        None => return Ok(None),
    };

    let mut spans = Vec::with_capacity(count);
    for _ in 0..count {
        let len = match read_header(buf, &mut pos, b'$')? {
            Some(len) => len,
            None => return Ok(None),
        };
        if buf.len() < pos + len + 2 {
            return Ok(None);
        }
        if &buf[pos + len..pos + len + 2] != b"\r\n" {
            return Err(ProtocolError);
        }
        spans.push((pos, len));
        pos += len + 2;
    }

    let args = spans
        .into_iter()
        .map(|(start, len)| String::from_utf8_lossy(&buf[start..start + len]).into_owned())
        .collect();
    buf.advance(pos);
    Ok(Some(args))
}

fn read_header(buf: &BytesMut, pos: &mut usize, prefix: u8) -> Result<Option<usize>, ProtocolError> {
    let rest = &buf[*pos..];
    let Some(end) = rest.windows(2).position(|window| window == b"\r\n") else {
        return Ok(None);
    };
    if rest.first() != Some(&prefix) {
        return Err(ProtocolError);
    }
    let len = std::str::from_utf8(&rest[1..end])
        .ok()
        .and_then(|text| text.parse::<usize>().ok())
        .ok_or(ProtocolError)?;
    *pos += end + 2;
    Ok(Some(len))
}

pub fn resp_simple(message: &str) -> Vec<u8> {
    format!("+{message}\r\n").into_bytes()
}

pub fn resp_error(message: &str) -> Vec<u8> {
    format!("-{message}\r\n").into_bytes()
}

pub fn resp_integer(value: i64) -> Vec<u8> {
    format!(":{value}\r\n").into_bytes()
}

pub fn resp_bulk(data: &str) -> Vec<u8> {
    format!("${}\r\n{data}\r\n", data.len()).into_bytes()
}

pub fn resp_null() -> Vec<u8> {
    b"$-1\r\n".to_vec()
}

pub fn resp_opt_bulk(data: Option<&str>) -> Vec<u8> {
    data.map_or_else(resp_null, resp_bulk)
}

pub fn resp_array<S: AsRef<str>>(items: &[S]) -> Vec<u8> {
    let mut buf = format!("*{}\r\n", items.len()).into_bytes();
    for item in items {
        buf.extend_from_slice(&resp_bulk(item.as_ref()));
    }
    buf
}
