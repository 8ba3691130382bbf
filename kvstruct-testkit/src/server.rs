//! # TCP Server
//!
//! Accept RESP2 connections, parse commands, and dispatch them to the
//! keyspace. Each connection carries its own selected database and
//! authentication state.

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

use crate::engine::{EngineError, EngineResult, Keyspace};
use crate::protocol::{
    parse_command, resp_array, resp_bulk, resp_error, resp_integer, resp_opt_bulk, resp_simple,
};

/// State shared by every connection of one mock store.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) keyspace: Keyspace,
    pub(crate) password: Option<String>,
}

/// Logical databases a connection may select.
const DATABASES: u32 = 16;

struct Session {
    db: u32,
    authenticated: bool,
}

/// Accepts connections until the runtime shuts down.
pub(crate) async fn serve(listener: TcpListener, shared: Arc<Shared>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(error = %err, "accept failed");
                continue;
            }
        };
        debug!(%peer, "mock store connection opened");
        let shared = shared.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, shared).await {
                debug!(%peer, error = %err, "mock store connection ended with error");
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, shared: Arc<Shared>) -> std::io::Result<()> {
    let mut buffer = BytesMut::with_capacity(8 * 1024);
    let mut session = Session {
        db: 0,
        authenticated: shared.password.is_none(),
    };

    loop {
        let bytes = stream.read_buf(&mut buffer).await?;
        if bytes == 0 {
            break;
        }

        loop {
            match parse_command(&mut buffer) {
                Ok(Some(args)) => {
                    let response = dispatch_command(&args, &mut session, &shared);
                    stream.write_all(&response).await?;
                }
                Ok(None) => break,
                Err(_) => {
                    stream.write_all(&resp_error("ERR protocol error")).await?;
                    return Ok(());
                }
            }
        }
    }

    Ok(())
}

fn dispatch_command(args: &[String], session: &mut Session, shared: &Shared) -> Vec<u8> {
    let Some(name) = args.first() else {
        return resp_error("ERR empty command");
    };
    let name = name.to_ascii_uppercase();

    if name == "AUTH" {
        return handle_auth(args, session, shared);
    }
    if !session.authenticated {
        return resp_error("NOAUTH Authentication required.");
    }

    let keyspace = &shared.keyspace;
    let db = session.db;
    match (name.as_str(), args.len()) {
        ("PING", 1) => resp_simple("PONG"),
        ("PING", 2) => resp_bulk(&args[1]),
        ("SELECT", 2) => match args[1].parse::<u32>() {
            Ok(index) if index < DATABASES => {
                session.db = index;
                resp_simple("OK")
            }
            _ => resp_error("ERR DB index is out of range"),
        },
        ("GET", 2) => reply(keyspace.get(db, &args[1]), |value| resp_opt_bulk(value.as_deref())),
        ("SET", _) => handle_set(args, db, keyspace),
        ("DEL", n) if n >= 2 => {
            let removed = args[1..].iter().filter(|key| keyspace.del(db, key)).count();
            resp_integer(removed as i64)
        }
        ("EXISTS", 2) => resp_integer(keyspace.exists(db, &args[1]) as i64),
        ("INCR", 2) => reply(keyspace.incr(db, &args[1]), resp_integer),
        ("EXPIRE", 3) => match args[2].parse::<u64>() {
            Ok(seconds) => resp_integer(keyspace.expire(db, &args[1], Duration::from_secs(seconds)) as i64),
            Err(_) => resp_error(EngineError::NotInteger.reply()),
        },
        ("PTTL", 2) => resp_integer(keyspace.pttl(db, &args[1])),
        ("TTL", 2) => match keyspace.pttl(db, &args[1]) {
            millis if millis < 0 => resp_integer(millis),
            millis => resp_integer((millis + 500) / 1000),
        },
        ("SCAN", _) => handle_scan(args, db, keyspace),
        ("DBSIZE", 1) => resp_integer(keyspace.dbsize(db) as i64),
        ("RPUSH", 3) => reply(keyspace.rpush(db, &args[1], &args[2]), |len| resp_integer(len as i64)),
        ("LRANGE", 4) => match (args[2].parse::<i64>(), args[3].parse::<i64>()) {
            (Ok(start), Ok(stop)) => reply(keyspace.lrange(db, &args[1], start, stop), |items| resp_array(&items)),
            _ => resp_error(EngineError::NotInteger.reply()),
        },
        ("LINDEX", 3) => match args[2].parse::<i64>() {
            Ok(index) => reply(keyspace.lindex(db, &args[1], index), |item| resp_opt_bulk(item.as_deref())),
            Err(_) => resp_error(EngineError::NotInteger.reply()),
        },
        ("LLEN", 2) => reply(keyspace.llen(db, &args[1]), |len| resp_integer(len as i64)),
        ("SADD", 3) => reply(keyspace.sadd(db, &args[1], &args[2]), |added| resp_integer(added as i64)),
        ("SISMEMBER", 3) => reply(keyspace.sismember(db, &args[1], &args[2]), |found| resp_integer(found as i64)),
        ("SREM", 3) => reply(keyspace.srem(db, &args[1], &args[2]), |removed| resp_integer(removed as i64)),
        ("SMEMBERS", 2) => reply(keyspace.smembers(db, &args[1]), |members| resp_array(&members)),
        ("SCARD", 2) => reply(keyspace.scard(db, &args[1]), |len| resp_integer(len as i64)),
        ("HSET", 4) => reply(keyspace.hset(db, &args[1], &args[2], &args[3]), |added| resp_integer(added as i64)),
        ("HGET", 3) => reply(keyspace.hget(db, &args[1], &args[2]), |value| resp_opt_bulk(value.as_deref())),
        ("HEXISTS", 3) => reply(keyspace.hexists(db, &args[1], &args[2]), |found| resp_integer(found as i64)),
        ("HDEL", 3) => reply(keyspace.hdel(db, &args[1], &args[2]), |removed| resp_integer(removed as i64)),
        ("HKEYS", 2) => reply(keyspace.hkeys(db, &args[1]), |fields| resp_array(&fields)),
        ("HLEN", 2) => reply(keyspace.hlen(db, &args[1]), |len| resp_integer(len as i64)),
        _ => resp_error(&format!("ERR unknown command or wrong number of arguments for '{name}'")),
    }
}

fn reply<T>(result: EngineResult<T>, encode: impl FnOnce(T) -> Vec<u8>) -> Vec<u8> {
    match result {
        Ok(value) => encode(value),
        Err(err) => resp_error(err.reply()),
    }
}

fn handle_auth(args: &[String], session: &mut Session, shared: &Shared) -> Vec<u8> {
    if args.len() != 2 {
        return resp_error("ERR wrong number of arguments for 'auth' command");
    }
    match shared.password.as_deref() {
        None => resp_error("ERR AUTH <password> called without any password configured for the default user."),
        Some(password) if password == args[1] => {
            session.authenticated = true;
            resp_simple("OK")
        }
        Some(_) => resp_error("WRONGPASS invalid username-password pair or user is disabled."),
    }
}

fn handle_set(args: &[String], db: u32, keyspace: &Keyspace) -> Vec<u8> {
    let ttl = match args.len() {
        3 => None,
        5 => {
            let Ok(amount) = args[4].parse::<u64>() else {
                return resp_error(EngineError::NotInteger.reply());
            };
            if amount == 0 {
                return resp_error("ERR invalid expire time in 'set' command");
            }
            match args[3].to_ascii_uppercase().as_str() {
                "EX" => Some(Duration::from_secs(amount)),
                "PX" => Some(Duration::from_millis(amount)),
                _ => return resp_error("ERR syntax error"),
            }
        }
        _ => return resp_error("ERR syntax error"),
    };
    keyspace.set(db, &args[1], &args[2], ttl);
    resp_simple("OK")
}

fn handle_scan(args: &[String], db: u32, keyspace: &Keyspace) -> Vec<u8> {
    let Some(Ok(cursor)) = args.get(1).map(|cursor| cursor.parse::<usize>()) else {
        return resp_error("ERR invalid cursor");
    };

    let mut pattern: &str = "*";
    let mut count = 10;
    for option in args[2..].chunks(2) {
        match (option[0].to_ascii_uppercase().as_str(), option.get(1)) {
            ("MATCH", Some(value)) => pattern = value,
            ("COUNT", Some(value)) => match value.parse::<usize>() {
                Ok(value) => count = value,
                Err(_) => return resp_error(EngineError::NotInteger.reply()),
            },
            _ => return resp_error("ERR syntax error"),
        }
    }

    let (next, keys) = keyspace.scan(db, cursor, pattern, count);
    let mut buf = b"*2\r\n".to_vec();
    buf.extend_from_slice(&resp_bulk(&next.to_string()));
    buf.extend_from_slice(&resp_array(&keys));
    buf
}
