//! Bitmap commands, operating on the raw bytes of a string value.

use super::expect_string;
use crate::database::Database;
use crate::dispatch::command::{BitOpKind, BitUnit};
use crate::error::Error;
use crate::protocol::RespValue;
use crate::storage::DataValue;
use bytes::Bytes;

fn get_bytes<'a>(db: &'a Database, key: &Bytes, now_ms: u64) -> Result<&'a [u8], Error> {
    match db.get(key, now_ms) {
        Some(v) => Ok(expect_string(&v.data)?),
        None => Ok(&[]),
    }
}

pub fn setbit(db: &mut Database, key: &Bytes, offset: usize, value: usize, now_ms: u64) -> Result<RespValue, Error> {
    if value > 1 {
        return Err(Error::Range("bit is not an integer or out of range".into()));
    }
    let mut buf = match db.get(key, now_ms) {
        Some(v) => expect_string(&v.data)?.to_vec(),
        None => Vec::new(),
    };
    let byte_idx = offset / 8;
    if buf.len() <= byte_idx {
        buf.resize(byte_idx + 1, 0);
    }
    let bit_idx = 7 - (offset % 8);
    let old = (buf[byte_idx] >> bit_idx) & 1;
    if value == 1 {
        buf[byte_idx] |= 1 << bit_idx;
    } else {
        buf[byte_idx] &= !(1 << bit_idx);
    }
    db.set(key.clone(), DataValue::String(Bytes::from(buf)));
    Ok(RespValue::Integer(old as i64))
}

pub fn getbit(db: &Database, key: &Bytes, offset: usize, now_ms: u64) -> Result<RespValue, Error> {
    let bytes = get_bytes(db, key, now_ms)?;
    let byte_idx = offset / 8;
    let bit = bytes.get(byte_idx).map(|b| (b >> (7 - offset % 8)) & 1).unwrap_or(0);
    Ok(RespValue::Integer(bit as i64))
}

fn resolve_byte_range(len: i64, start: i64, end: i64) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let start = if start < 0 { (len + start).max(0) } else { start };
    let end = if end < 0 { len + end } else { end.min(len - 1) };
    if start > end || start >= len {
        return None;
    }
    Some((start as usize, end as usize))
}

pub fn bitcount(db: &Database, key: &Bytes, range: Option<(i64, i64, BitUnit)>, now_ms: u64) -> Result<RespValue, Error> {
    let bytes = get_bytes(db, key, now_ms)?;
    let count = match range {
        None => bytes.iter().map(|b| b.count_ones() as i64).sum(),
        Some((start, end, BitUnit::Byte)) => match resolve_byte_range(bytes.len() as i64, start, end) {
            Some((a, b)) => bytes[a..=b].iter().map(|b| b.count_ones() as i64).sum(),
            None => 0,
        },
        Some((start, end, BitUnit::Bit)) => {
            let total_bits = bytes.len() as i64 * 8;
            match resolve_byte_range(total_bits, start, end) {
                Some((a, b)) => (a..=b).filter(|&i| (bytes[i / 8] >> (7 - i % 8)) & 1 == 1).count() as i64,
                None => 0,
            }
        }
    };
    Ok(RespValue::Integer(count))
}

pub fn bitop(db: &mut Database, op: BitOpKind, dest: &Bytes, keys: &[Bytes], now_ms: u64) -> Result<RespValue, Error> {
    let sources: Vec<Vec<u8>> =
        keys.iter().map(|k| get_bytes(db, k, now_ms).map(|b| b.to_vec())).collect::<Result<_, _>>()?;
    if op == BitOpKind::Not && sources.len() != 1 {
        return Err(Error::Syntax);
    }
    let max_len = sources.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut result = vec![0u8; max_len];
    match op {
        BitOpKind::Not => {
            for (i, b) in sources[0].iter().enumerate() {
                result[i] = !b;
            }
        }
        BitOpKind::And => {
            result = vec![0xFFu8; max_len];
            for src in &sources {
                for i in 0..max_len {
                    let b = src.get(i).copied().unwrap_or(0);
                    result[i] &= b;
                }
            }
        }
        BitOpKind::Or => {
            for src in &sources {
                for i in 0..max_len {
                    result[i] |= src.get(i).copied().unwrap_or(0);
                }
            }
        }
        BitOpKind::Xor => {
            for src in &sources {
                for i in 0..max_len {
                    result[i] ^= src.get(i).copied().unwrap_or(0);
                }
            }
        }
    }
    let len = result.len();
    if len == 0 {
        db.remove(dest, now_ms);
    } else {
        db.set(dest.clone(), DataValue::String(Bytes::from(result)));
    }
    Ok(RespValue::Integer(len as i64))
}

pub fn bitpos(db: &Database, key: &Bytes, bit: u8, range: Option<(i64, Option<i64>, BitUnit)>, now_ms: u64) -> Result<RespValue, Error> {
    let bytes = get_bytes(db, key, now_ms)?;
    if bytes.is_empty() {
        return Ok(RespValue::Integer(if bit == 0 { 0 } else { -1 }));
    }
    let no_explicit_end = matches!(range, Some((_, None, _)) | None);
    let (start_bit, end_bit) = match range {
        None => (0usize, bytes.len() * 8 - 1),
        Some((start, end, BitUnit::Byte)) => {
            match resolve_byte_range(bytes.len() as i64, start, end.unwrap_or(-1)) {
                Some((a, b)) => (a * 8, b * 8 + 7),
                None => return Ok(RespValue::Integer(-1)),
            }
        }
        Some((start, end, BitUnit::Bit)) => {
            match resolve_byte_range(bytes.len() as i64 * 8, start, end.unwrap_or(bytes.len() as i64 * 8 - 1)) {
                Some((a, b)) => (a, b),
                None => return Ok(RespValue::Integer(-1)),
            }
        }
    };
    for i in start_bit..=end_bit {
        let byte = bytes[i / 8];
        let got = (byte >> (7 - i % 8)) & 1;
        if got == bit {
            return Ok(RespValue::Integer(i as i64));
        }
    }
    if bit == 0 && no_explicit_end {
        return Ok(RespValue::Integer(bytes.len() as i64 * 8));
    }
    Ok(RespValue::Integer(-1))
}
