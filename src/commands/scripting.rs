//! EVAL/EVALSHA/SCRIPT: dispatches into the embedder-supplied `ScriptEvaluator`
//! and maintains the SHA1 script cache `SCRIPT LOAD`/`EVALSHA` share.

use crate::error::Error;
use crate::protocol::RespValue;
use crate::server::ServerState;
use bytes::Bytes;
use sha1::{Digest, Sha1};

fn sha1_hex(script: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(script);
    hex::encode(hasher.finalize())
}

pub fn eval(server: &ServerState, script: &Bytes, keys: &[Bytes], argv: &[Bytes]) -> Result<RespValue, Error> {
    server.scripts.lock().insert(sha1_hex(script), script.clone());
    server.scripting.eval(script, keys, argv)
}

pub fn evalsha(server: &ServerState, sha1: &str, keys: &[Bytes], argv: &[Bytes]) -> Result<RespValue, Error> {
    let script = server.scripts.lock().get(&sha1.to_ascii_lowercase()).cloned().ok_or(Error::NoScript)?;
    server.scripting.eval(&script, keys, argv)
}

pub fn script_load(server: &ServerState, script: &Bytes) -> Result<RespValue, Error> {
    let sha = sha1_hex(script);
    server.scripts.lock().insert(sha.clone(), script.clone());
    Ok(RespValue::BulkString(Bytes::from(sha)))
}

pub fn script_exists(server: &ServerState, shas: &[String]) -> Result<RespValue, Error> {
    let cache = server.scripts.lock();
    let out = shas.iter().map(|s| RespValue::Integer(cache.contains_key(&s.to_ascii_lowercase()) as i64)).collect();
    Ok(RespValue::Array(out))
}
