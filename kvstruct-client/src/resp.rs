//! # RESP2 Encoding and Parsing
//!
//! Purpose: Frame commands for the backing store and turn its replies into
//! the typed values the data structures work with.
//!
//! ## Design Principles
//! 1. **State-Free Parsing**: Replies are parsed top-down with minimal state.
//! 2. **Buffer Reuse**: Caller provides buffers to avoid per-call allocations.
//! 3. **Typed Exits**: Each `into_*` conversion accepts exactly the reply
//!    shapes its command family can produce; anything else is an error.

use std::io::BufRead;

use kvstruct_common::{StoreError, StoreResult};

/// RESP reply value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// +OK or +PONG style replies.
    Simple(String),
    /// -ERR ... replies.
    Error(String),
    /// :123 replies.
    Integer(i64),
    /// $... bulk strings, with None for null.
    Bulk(Option<Vec<u8>>),
    /// *... arrays, with an empty vector for null arrays.
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Accepts any status reply, e.g. `+OK`.
    pub fn into_status(self) -> StoreResult<String> {
        match self {
            RespValue::Simple(text) => Ok(text),
            other => Err(other.into_error()),
        }
    }

    /// Accepts an integer reply.
    pub fn into_integer(self) -> StoreResult<i64> {
        match self {
            RespValue::Integer(value) => Ok(value),
            other => Err(other.into_error()),
        }
    }

    /// Accepts a bulk string reply, `None` for the null bulk string.
    pub fn into_opt_string(self) -> StoreResult<Option<String>> {
        match self {
            RespValue::Bulk(Some(data)) => bytes_to_string(data).map(Some),
            RespValue::Bulk(None) => Ok(None),
            other => Err(other.into_error()),
        }
    }

    /// Accepts an array of bulk strings; null entries are skipped.
    pub fn into_strings(self) -> StoreResult<Vec<String>> {
        match self {
            RespValue::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(text) = item.into_opt_string()? {
                        out.push(text);
                    }
                }
                Ok(out)
            }
            RespValue::Bulk(None) => Ok(Vec::new()),
            other => Err(other.into_error()),
        }
    }

    /// Error replies keep their meaning; any other shape is a mismatch.
    pub(crate) fn into_error(self) -> StoreError {
        match self {
            RespValue::Error(message) => StoreError::from_server(message),
            _ => StoreError::UnexpectedResponse,
        }
    }
}

fn bytes_to_string(data: Vec<u8>) -> StoreResult<String> {
    String::from_utf8(data).map_err(|_| StoreError::UnexpectedResponse)
}

/// Encodes a RESP2 array command into the provided buffer.
pub fn encode_command<A: AsRef<[u8]>>(args: &[A], out: &mut Vec<u8>) {
    push_header(out, b'*', args.len());
    for arg in args {
        let arg = arg.as_ref();
        push_header(out, b'$', arg.len());
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
}

fn push_header(out: &mut Vec<u8>, prefix: u8, len: usize) {
    out.push(prefix);
    out.extend_from_slice(len.to_string().as_bytes());
    out.extend_from_slice(b"\r\n");
}

/// Reads one RESP value from the buffered reader.
pub fn read_response<R: BufRead>(reader: &mut R, line_buf: &mut Vec<u8>) -> StoreResult<RespValue> {
    read_line(reader, line_buf)?;
    let (&kind, rest) = line_buf.split_first().ok_or(StoreError::Protocol)?;

    match kind {
        b'+' => Ok(RespValue::Simple(line_to_string(rest))),
        b'-' => Ok(RespValue::Error(line_to_string(rest))),
        b':' => Ok(RespValue::Integer(parse_i64(rest)?)),
        b'$' => {
            let len = parse_i64(rest)?;
            read_bulk(reader, len)
        }
        b'*' => {
            let len = parse_i64(rest)?;
            read_array(reader, len, line_buf)
        }
        _ => Err(StoreError::Protocol),
    }
}

fn read_bulk<R: BufRead>(reader: &mut R, len: i64) -> StoreResult<RespValue> {
    if len < 0 {
        return Ok(RespValue::Bulk(None));
    }
    let mut data = vec![0u8; len as usize];
    reader.read_exact(&mut data)?;

    let mut crlf = [0u8; 2];
    reader.read_exact(&mut crlf)?;
    if &crlf != b"\r\n" {
        return Err(StoreError::Protocol);
    }
    Ok(RespValue::Bulk(Some(data)))
}

fn read_array<R: BufRead>(
    reader: &mut R,
    len: i64,
    line_buf: &mut Vec<u8>,
) -> StoreResult<RespValue> {
    if len <= 0 {
        return Ok(RespValue::Array(Vec::new()));
    }

    let mut items = Vec::with_capacity(len as usize);
    for _ in 0..len {
        items.push(read_response(reader, line_buf)?);
    }
    Ok(RespValue::Array(items))
}

fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> StoreResult<()> {
    buf.clear();
    let bytes = reader.read_until(b'\n', buf)?;
    if bytes == 0 {
        return Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed by store",
        )));
    }
    if !buf.ends_with(b"\r\n") {
        return Err(StoreError::Protocol);
    }
    buf.truncate(buf.len() - 2);
    Ok(())
}

fn line_to_string(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}

fn parse_i64(data: &[u8]) -> StoreResult<i64> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or(StoreError::Protocol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(bytes: &[u8]) -> StoreResult<RespValue> {
        let mut reader = Cursor::new(bytes.to_vec());
        let mut line = Vec::new();
        read_response(&mut reader, &mut line)
    }

    #[test]
    fn encodes_command() {
        let mut buf = Vec::new();
        encode_command(&["HSET", "users:bob", "email"], &mut buf);
        assert_eq!(
            &buf,
            b"*3\r\n$4\r\nHSET\r\n$9\r\nusers:bob\r\n$5\r\nemail\r\n"
        );
    }

    #[test]
    fn parses_status_and_error() {
        assert_eq!(parse(b"+PONG\r\n").unwrap(), RespValue::Simple("PONG".into()));
        assert_eq!(
            parse(b"-ERR bad\r\n").unwrap(),
            RespValue::Error("ERR bad".into())
        );
    }

    #[test]
    fn parses_null_bulk_as_none() {
        let value = parse(b"$-1\r\n").unwrap();
        assert_eq!(value.into_opt_string().unwrap(), None);
    }

    #[test]
    fn parses_array_of_bulk_strings() {
        let value = parse(b"*2\r\n$3\r\nabc\r\n$0\r\n\r\n").unwrap();
        assert_eq!(value.into_strings().unwrap(), vec!["abc".to_string(), String::new()]);
    }

    #[test]
    fn parses_nested_scan_reply() {
        let value = parse(b"*2\r\n$1\r\n0\r\n*1\r\n$4\r\nkv:a\r\n").unwrap();
        match value {
            RespValue::Array(mut parts) => {
                let keys = parts.pop().unwrap().into_strings().unwrap();
                let cursor = parts.pop().unwrap().into_opt_string().unwrap();
                assert_eq!(cursor.as_deref(), Some("0"));
                assert_eq!(keys, vec!["kv:a".to_string()]);
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn error_reply_maps_through_classifier() {
        let value = parse(b"-ERR value is not an integer or out of range\r\n").unwrap();
        assert!(matches!(
            value.into_integer(),
            Err(StoreError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_bad_framing() {
        assert!(matches!(parse(b"?what\r\n"), Err(StoreError::Protocol)));
        assert!(matches!(parse(b":12x\r\n"), Err(StoreError::Protocol)));
        assert!(matches!(parse(b"+OK\n"), Err(StoreError::Protocol)));
    }

    #[test]
    fn wrong_shape_is_unexpected() {
        let value = parse(b":1\r\n").unwrap();
        assert!(matches!(value.into_status(), Err(StoreError::UnexpectedResponse)));
    }
}
