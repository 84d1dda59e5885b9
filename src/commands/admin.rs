//! Administrative and introspection commands: PING/INFO/CLIENT/CONFIG/DEBUG/TIME.

use crate::database::Database;
use crate::error::Error;
use crate::protocol::RespValue;
use crate::server::ServerState;
use bytes::Bytes;
use wildmatch::WildMatch;

pub fn ping(message: Option<Bytes>) -> Result<RespValue, Error> {
    Ok(match message {
        Some(m) => RespValue::BulkString(m),
        None => RespValue::SimpleString("PONG".to_string()),
    })
}

pub fn flushall(dbs: &mut [Database]) -> Result<RespValue, Error> {
    for db in dbs.iter_mut() {
        db.flush();
    }
    Ok(RespValue::ok())
}

pub fn info(server: &ServerState, section: Option<&str>) -> Result<RespValue, Error> {
    let config = server.config.lock();
    let wants = |name: &str| section.is_none_or(|s| s.eq_ignore_ascii_case(name));
    let mut out = String::new();
    if wants("server") {
        out.push_str("# Server\r\n");
        out.push_str(&format!("redis_version:{}\r\n", config.server_version));
        out.push_str("redis_mode:standalone\r\n");
        out.push_str("\r\n");
    }
    if wants("clients") {
        out.push_str("# Clients\r\n");
        out.push_str(&format!("connected_clients:{}\r\n", server.clients.len()));
        out.push_str("\r\n");
    }
    if wants("keyspace") {
        out.push_str("# Keyspace\r\n");
        out.push_str("\r\n");
    }
    Ok(RespValue::BulkString(Bytes::from(out)))
}

pub fn client_list(server: &ServerState) -> Result<RespValue, Error> {
    let mut out = String::new();
    for entry in server.clients.iter() {
        let c = entry.value();
        out.push_str(&format!(
            "id={} addr={} db={} name={}\n",
            c.id,
            c.addr,
            c.db_index,
            c.name.as_deref().map(|b| String::from_utf8_lossy(b).into_owned()).unwrap_or_default()
        ));
    }
    Ok(RespValue::BulkString(Bytes::from(out)))
}

pub fn config_get(server: &ServerState, pattern: &str) -> Result<RespValue, Error> {
    const PARAMS: &[&str] = &["server-version", "databases", "notify-keyspace-events", "maxmemory", "maxmemory-policy", "requirepass"];
    let config = server.config.lock();
    let matcher = WildMatch::new(pattern);
    let mut out = Vec::new();
    for name in PARAMS {
        if matcher.matches(name) {
            if let Some(value) = config.get_param(name) {
                out.push(RespValue::BulkString(Bytes::from(*name)));
                out.push(RespValue::BulkString(Bytes::from(value)));
            }
        }
    }
    Ok(RespValue::Array(out))
}

pub fn config_set(server: &ServerState, pairs: &[(String, String)]) -> Result<RespValue, Error> {
    let mut config = server.config.lock();
    for (name, value) in pairs {
        if !config.set_param(name, value) {
            return Err(Error::InvalidState(format!("Unknown option or number of arguments for CONFIG SET - '{name}'")));
        }
    }
    Ok(RespValue::ok())
}

pub fn debug_object(db: &Database, key: &Bytes, now_ms: u64) -> Result<RespValue, Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(RespValue::SimpleString(format!(
            "Value at:0x0 refcount:1 encoding:{} serializedlength:{} lru:0 lru_seconds_idle:0",
            v.data.type_name(),
            v.data.memory_usage(),
        ))),
        None => Err(Error::InvalidState("no such key".into())),
    }
}

pub fn time(now_ms: u64) -> Result<RespValue, Error> {
    let secs = now_ms / 1000;
    let micros = (now_ms % 1000) * 1000;
    Ok(RespValue::Array(vec![
        RespValue::BulkString(Bytes::from(secs.to_string())),
        RespValue::BulkString(Bytes::from(micros.to_string())),
    ]))
}
