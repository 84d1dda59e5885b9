//! The RESP2/RESP3 wire frame and its `tokio_util::codec` encoder/decoder.
//!
//! Mirrors the shape of a production RESP codec: a type-tagged frame enum
//! decoded off a byte buffer, with the inline-command fallback spec.md §4.1
//! requires alongside the canonical length-prefixed array form.

use crate::error::Error;
use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

const CRLF: &[u8] = b"\r\n";
const CRLF_LEN: usize = 2;
const MAX_FRAME_ELEMENTS: usize = 1_024 * 1_024;
const MAX_BULK_STRING_SIZE: usize = 512 * 1024 * 1024;

/// A single frame of the RESP protocol, wire-level representation.
#[derive(Debug, Clone, PartialEq)]
pub enum RespFrame {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Bytes),
    Null,
    NullArray,
    Array(Vec<RespFrame>),
    // RESP3 additions; degraded to RESP2-compatible shapes when the
    // connection negotiated protocol version 2 (see `RespCodec::encode`).
    Map(Vec<(RespFrame, RespFrame)>),
    Set(Vec<RespFrame>),
    Boolean(bool),
    Double(f64),
    BigNumber(String),
    VerbatimString(String, Bytes),
    Push(Vec<RespFrame>),
}

impl RespFrame {
    pub fn encode_to_vec(&self, protocol_version: u8) -> Result<Vec<u8>, Error> {
        let mut buf = BytesMut::new();
        RespCodec::new(protocol_version).encode(self.clone(), &mut buf)?;
        Ok(buf.to_vec())
    }
}

/// Encodes/decodes `RespFrame`s for a single connection at a fixed protocol
/// version (2 or 3, negotiated via `HELLO`).
#[derive(Debug)]
pub struct RespCodec {
    protocol_version: u8,
}

impl RespCodec {
    pub fn new(protocol_version: u8) -> Self {
        Self { protocol_version }
    }

    pub fn set_protocol_version(&mut self, version: u8) {
        self.protocol_version = version;
    }
}

impl Encoder<RespFrame> for RespCodec {
    type Error = Error;

    fn encode(&mut self, item: RespFrame, dst: &mut BytesMut) -> Result<(), Error> {
        let resp3 = self.protocol_version >= 3;
        match item {
            RespFrame::SimpleString(s) => {
                dst.extend_from_slice(b"+");
                dst.extend_from_slice(s.as_bytes());
                dst.extend_from_slice(CRLF);
            }
            RespFrame::Error(s) => {
                dst.extend_from_slice(b"-");
                dst.extend_from_slice(s.as_bytes());
                dst.extend_from_slice(CRLF);
            }
            RespFrame::Integer(i) => {
                dst.extend_from_slice(b":");
                dst.extend_from_slice(itoa::Buffer::new().format(i).as_bytes());
                dst.extend_from_slice(CRLF);
            }
            RespFrame::BulkString(b) => {
                dst.extend_from_slice(b"$");
                dst.extend_from_slice(b.len().to_string().as_bytes());
                dst.extend_from_slice(CRLF);
                dst.extend_from_slice(&b);
                dst.extend_from_slice(CRLF);
            }
            RespFrame::Null => {
                if resp3 {
                    dst.extend_from_slice(b"_\r\n");
                } else {
                    dst.extend_from_slice(b"$-1\r\n");
                }
            }
            RespFrame::NullArray => {
                if resp3 {
                    dst.extend_from_slice(b"_\r\n");
                } else {
                    dst.extend_from_slice(b"*-1\r\n");
                }
            }
            RespFrame::Array(arr) => {
                dst.extend_from_slice(b"*");
                dst.extend_from_slice(arr.len().to_string().as_bytes());
                dst.extend_from_slice(CRLF);
                for frame in arr {
                    self.encode(frame, dst)?;
                }
            }
            RespFrame::Map(entries) => {
                if resp3 {
                    dst.extend_from_slice(b"%");
                    dst.extend_from_slice(entries.len().to_string().as_bytes());
                    dst.extend_from_slice(CRLF);
                    for (k, v) in entries {
                        self.encode(k, dst)?;
                        self.encode(v, dst)?;
                    }
                } else {
                    dst.extend_from_slice(b"*");
                    dst.extend_from_slice((entries.len() * 2).to_string().as_bytes());
                    dst.extend_from_slice(CRLF);
                    for (k, v) in entries {
                        self.encode(k, dst)?;
                        self.encode(v, dst)?;
                    }
                }
            }
            RespFrame::Set(items) => {
                let tag: &[u8] = if resp3 { b"~" } else { b"*" };
                dst.extend_from_slice(tag);
                dst.extend_from_slice(items.len().to_string().as_bytes());
                dst.extend_from_slice(CRLF);
                for item in items {
                    self.encode(item, dst)?;
                }
            }
            RespFrame::Boolean(b) => {
                if resp3 {
                    dst.extend_from_slice(if b { b"#t\r\n" } else { b"#f\r\n" });
                } else {
                    dst.extend_from_slice(if b { b":1\r\n" } else { b":0\r\n" });
                }
            }
            RespFrame::Double(d) => {
                if resp3 {
                    dst.extend_from_slice(b",");
                    dst.extend_from_slice(format_double(d).as_bytes());
                    dst.extend_from_slice(CRLF);
                } else {
                    let s = format_double(d);
                    dst.extend_from_slice(b"$");
                    dst.extend_from_slice(s.len().to_string().as_bytes());
                    dst.extend_from_slice(CRLF);
                    dst.extend_from_slice(s.as_bytes());
                    dst.extend_from_slice(CRLF);
                }
            }
            RespFrame::BigNumber(s) => {
                if resp3 {
                    dst.extend_from_slice(b"(");
                    dst.extend_from_slice(s.as_bytes());
                    dst.extend_from_slice(CRLF);
                } else {
                    dst.extend_from_slice(b"$");
                    dst.extend_from_slice(s.len().to_string().as_bytes());
                    dst.extend_from_slice(CRLF);
                    dst.extend_from_slice(s.as_bytes());
                    dst.extend_from_slice(CRLF);
                }
            }
            RespFrame::VerbatimString(format, text) => {
                if resp3 {
                    dst.extend_from_slice(b"=");
                    dst.extend_from_slice((text.len() + 4).to_string().as_bytes());
                    dst.extend_from_slice(CRLF);
                    dst.extend_from_slice(format.as_bytes());
                    dst.extend_from_slice(b":");
                    dst.extend_from_slice(&text);
                    dst.extend_from_slice(CRLF);
                } else {
                    dst.extend_from_slice(b"$");
                    dst.extend_from_slice(text.len().to_string().as_bytes());
                    dst.extend_from_slice(CRLF);
                    dst.extend_from_slice(&text);
                    dst.extend_from_slice(CRLF);
                }
            }
            RespFrame::Push(items) => {
                let tag: &[u8] = if resp3 { b">" } else { b"*" };
                dst.extend_from_slice(tag);
                dst.extend_from_slice(items.len().to_string().as_bytes());
                dst.extend_from_slice(CRLF);
                for item in items {
                    self.encode(item, dst)?;
                }
            }
        }
        Ok(())
    }
}

/// Shortest round-tripping representation, matching the `INCRBYFLOAT`
/// formatting rule in spec.md §4.3 (trailing-zero trimming via `ryu`, with an
/// integral fallback so whole numbers print without a trailing dot).
pub fn format_double(d: f64) -> String {
    if d.is_infinite() {
        return if d > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }
    if d.is_nan() {
        return "nan".to_string();
    }
    if d == d.trunc() && d.abs() < 1e17 {
        return format!("{}", d as i64);
    }
    let mut buf = ryu::Buffer::new();
    buf.format(d).trim_end_matches('0').trim_end_matches('.').to_string()
}

impl Decoder for RespCodec {
    type Item = RespFrame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Error> {
        if src.is_empty() {
            return Ok(None);
        }
        // Inline commands: a plain line not starting with '*' (spec.md glossary).
        let result = if src[0] == b'*' || src[0] == b'$' {
            parse_frame(src)
        } else {
            parse_inline(src)
        };
        match result {
            Ok((frame, len)) => {
                src.advance(len);
                Ok(Some(frame))
            }
            Err(Error::Incomplete) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn find_crlf(src: &[u8]) -> Option<usize> {
    src.windows(CRLF_LEN).position(|w| w == CRLF)
}

fn parse_line(src: &[u8]) -> Result<(&[u8], usize), Error> {
    find_crlf(src).map(|pos| (&src[..pos], pos + CRLF_LEN)).ok_or(Error::Incomplete)
}

/// Parses a single inline line (whitespace-separated tokens) into an
/// argument array, per spec.md's "Inline command" glossary entry.
fn parse_inline(src: &[u8]) -> Result<(RespFrame, usize), Error> {
    // Inline commands may also be plain newline-terminated ("\n" only).
    let nl_pos = src.iter().position(|&b| b == b'\n');
    let Some(nl_pos) = nl_pos else {
        return Err(Error::Incomplete);
    };
    let mut line = &src[..nl_pos];
    if line.last() == Some(&b'\r') {
        line = &line[..line.len() - 1];
    }
    let args: Vec<RespFrame> = line
        .split(|&b| b == b' ' || b == b'\t')
        .filter(|s| !s.is_empty())
        .map(|tok| RespFrame::BulkString(Bytes::copy_from_slice(tok)))
        .collect();
    Ok((RespFrame::Array(args), nl_pos + 1))
}

fn parse_frame(src: &[u8]) -> Result<(RespFrame, usize), Error> {
    if src.is_empty() {
        return Err(Error::Incomplete);
    }
    match src[0] {
        b'+' => parse_simple_string(src),
        b'-' => parse_error(src),
        b':' => parse_integer(src),
        b'$' => parse_bulk_string(src),
        b'*' => parse_array(src),
        _ => Err(Error::Protocol(format!(
            "expected '*' or '$', got '{}'",
            src[0] as char
        ))),
    }
}

fn parse_simple_string(src: &[u8]) -> Result<(RespFrame, usize), Error> {
    let (line, len) = parse_line(&src[1..])?;
    Ok((RespFrame::SimpleString(String::from_utf8_lossy(line).to_string()), len + 1))
}

fn parse_error(src: &[u8]) -> Result<(RespFrame, usize), Error> {
    let (line, len) = parse_line(&src[1..])?;
    Ok((RespFrame::Error(String::from_utf8_lossy(line).to_string()), len + 1))
}

fn parse_integer(src: &[u8]) -> Result<(RespFrame, usize), Error> {
    let (line, len) = parse_line(&src[1..])?;
    let s = String::from_utf8_lossy(line);
    let i = s.parse::<i64>().map_err(|_| Error::Protocol("invalid integer".into()))?;
    Ok((RespFrame::Integer(i), len + 1))
}

fn parse_bulk_string(src: &[u8]) -> Result<(RespFrame, usize), Error> {
    let (line, len_of_line) = parse_line(&src[1..])?;
    let s = String::from_utf8_lossy(line);
    let str_len = s.parse::<isize>().map_err(|_| Error::Protocol("invalid bulk length".into()))?;

    if str_len == -1 {
        return Ok((RespFrame::Null, len_of_line + 1));
    }
    let str_len = str_len as usize;
    if str_len > MAX_BULK_STRING_SIZE {
        return Err(Error::Protocol("bulk string too large".into()));
    }
    let prefix = len_of_line + 1;
    if src.len() < prefix + str_len + CRLF_LEN {
        return Err(Error::Incomplete);
    }
    if &src[prefix + str_len..prefix + str_len + CRLF_LEN] != CRLF {
        return Err(Error::Protocol("missing CRLF after bulk string".into()));
    }
    let data = Bytes::copy_from_slice(&src[prefix..prefix + str_len]);
    Ok((RespFrame::BulkString(data), prefix + str_len + CRLF_LEN))
}

fn parse_array(src: &[u8]) -> Result<(RespFrame, usize), Error> {
    let (line, len_of_line) = parse_line(&src[1..])?;
    let s = String::from_utf8_lossy(line);
    let arr_len = s.parse::<isize>().map_err(|_| Error::Protocol("invalid array length".into()))?;

    if arr_len == -1 {
        return Ok((RespFrame::NullArray, len_of_line + 1));
    }
    let arr_len = arr_len as usize;
    if arr_len > MAX_FRAME_ELEMENTS {
        return Err(Error::Protocol("array too large".into()));
    }
    let mut frames = Vec::with_capacity(arr_len);
    let mut cursor = len_of_line + 1;
    for _ in 0..arr_len {
        let (frame, frame_len) = parse_frame(&src[cursor..])?;
        frames.push(frame);
        cursor += frame_len;
    }
    Ok((RespFrame::Array(frames), cursor))
}

/// Flattens a decoded client frame into the argument vector the dispatcher
/// expects. `NullArray`/non-array top-level frames are rejected as protocol
/// errors, per spec.md §4.1 ("Errors during decoding are fatal").
pub fn frame_to_args(frame: RespFrame) -> Result<Vec<Bytes>, Error> {
    match frame {
        RespFrame::Array(items) => items
            .into_iter()
            .map(|f| match f {
                RespFrame::BulkString(b) => Ok(b),
                RespFrame::SimpleString(s) => Ok(Bytes::from(s)),
                RespFrame::Integer(i) => Ok(Bytes::from(i.to_string())),
                other => Err(Error::Protocol(format!(
                    "unexpected element in command array: {other:?}"
                ))),
            })
            .collect(),
        other => Err(Error::Protocol(format!("expected command array, got {other:?}"))),
    }
}
