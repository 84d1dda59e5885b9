//! Small cursor helpers for parsing a command's argument vector, grounded in
//! the teacher's `core/commands/helpers.rs` extraction functions.

use crate::error::Error;
use bytes::Bytes;

pub fn extract_string(b: &Bytes) -> Result<String, Error> {
    String::from_utf8(b.to_vec()).map_err(|_| Error::Protocol("invalid utf-8 argument".into()))
}

pub fn extract_i64(b: &Bytes) -> Result<i64, Error> {
    extract_string(b)?.trim().parse::<i64>().map_err(|_| Error::NotAnInteger)
}

pub fn extract_u64(b: &Bytes) -> Result<u64, Error> {
    extract_string(b)?.trim().parse::<u64>().map_err(|_| Error::NotAnInteger)
}

pub fn extract_usize(b: &Bytes) -> Result<usize, Error> {
    extract_string(b)?.trim().parse::<usize>().map_err(|_| Error::NotAnInteger)
}

pub fn extract_f64(b: &Bytes) -> Result<f64, Error> {
    let s = extract_string(b)?;
    match s.to_ascii_lowercase().as_str() {
        "inf" | "+inf" | "infinity" | "+infinity" => Ok(f64::INFINITY),
        "-inf" | "-infinity" => Ok(f64::NEG_INFINITY),
        _ => s.trim().parse::<f64>().map_err(|_| Error::NotAFloat),
    }
}

/// A cursor over a command's argument slice, consumed left-to-right by
/// per-command parsers so options can appear in any order (`SET k v EX 5
/// NX` / `SET k v NX EX 5`).
pub struct Cursor<'a> {
    args: &'a [Bytes],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(args: &'a [Bytes]) -> Self {
        Self { args, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.args.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.args.len()
    }

    pub fn next(&mut self) -> Option<&'a Bytes> {
        let v = self.args.get(self.pos)?;
        self.pos += 1;
        Some(v)
    }

    pub fn peek(&self) -> Option<&'a Bytes> {
        self.args.get(self.pos)
    }

    pub fn next_required(&mut self, command: &str) -> Result<&'a Bytes, Error> {
        self.next().ok_or_else(|| Error::Arity(command.to_string()))
    }

    /// Case-insensitively matches the next token against `keyword`, consuming
    /// it only on a match.
    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        if let Some(b) = self.peek() {
            if b.eq_ignore_ascii_case(keyword.as_bytes()) {
                self.pos += 1;
                return true;
            }
        }
        false
    }

    pub fn rest(&self) -> &'a [Bytes] {
        &self.args[self.pos..]
    }
}
