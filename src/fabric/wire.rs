//! Wire format shared by every RoboOne server: one byte length prefix `L`,
//! followed by `L` bytes whose first byte is a type code and whose
//! remainder is the type-specific body.
//!
//! Bodies are encoded explicitly (never via `#[repr(C, packed)]`): every
//! catalog struct implements [`Encode`] and `catalog::DecodeR` itself, and
//! multi-byte fields are written little-endian with
//! `to_le_bytes`/`from_le_bytes`.

use anyhow::{bail, Context};

/// `MAX_MSG_BODY_LENGTH` in `original_source/MessagingServer/api/messaging_server.h`.
pub const MAX_BODY_LEN: usize = 253;

/// `MAX_SHORT_MSG_BODY_LENGTH` in `original_source/timer/api/timer_server.h`
/// (`MAX_MSG_BODY_LENGTH - 40`), small enough to nest inside another message.
pub const MAX_SHORT_BODY_LEN: usize = MAX_BODY_LEN - 40;

/// A full wire message: type code plus body, ready to be length-prefixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub msg_type: u8,
    pub body: Vec<u8>,
}

impl Frame {
    pub fn new(msg_type: u8, body: Vec<u8>) -> anyhow::Result<Self> {
        if body.len() > MAX_BODY_LEN {
            bail!("message body too long: {} bytes (max {MAX_BODY_LEN})", body.len());
        }
        Ok(Self { msg_type, body })
    }

    /// `L` as it appears on the wire: one byte for the type code, then the body.
    pub fn wire_length(&self) -> u8 {
        (1 + self.body.len()) as u8
    }

    pub fn to_wire_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.body.len());
        out.push(self.wire_length());
        out.push(self.msg_type);
        out.extend_from_slice(&self.body);
        out
    }
}

/// The nested, smaller message variant used to carry timer expiry payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortFrame {
    pub msg_type: u8,
    pub body: Vec<u8>,
}

impl ShortFrame {
    pub fn new(msg_type: u8, body: Vec<u8>) -> anyhow::Result<Self> {
        if body.len() > MAX_SHORT_BODY_LEN {
            bail!(
                "short message body too long: {} bytes (max {MAX_SHORT_BODY_LEN})",
                body.len()
            );
        }
        Ok(Self { msg_type, body })
    }

    pub fn into_frame(self) -> Frame {
        Frame { msg_type: self.msg_type, body: self.body }
    }

    /// Serialise as a nested byte string: length, type, body — the same
    /// layout as [`Frame`], so it can be embedded inside another body and
    /// decoded back with [`decode_nested`].
    pub fn encode_nested(&self, out: &mut Vec<u8>) {
        out.push((1 + self.body.len()) as u8);
        out.push(self.msg_type);
        out.extend_from_slice(&self.body);
    }

    pub fn decoded_len(&self) -> usize {
        2 + self.body.len()
    }
}

/// Decode a [`ShortFrame`] that was embedded with [`ShortFrame::encode_nested`].
pub fn decode_nested(buf: &[u8]) -> anyhow::Result<(ShortFrame, &[u8])> {
    let &len = buf.first().context("nested short message truncated")?;
    let len = len as usize;
    if len == 0 {
        bail!("nested short message has zero length");
    }
    let total = 1 + len;
    if buf.len() < total {
        bail!("nested short message truncated: need {total} bytes, have {}", buf.len());
    }
    let msg_type = buf[1];
    let body = buf[2..total].to_vec();
    Ok((ShortFrame { msg_type, body }, &buf[total..]))
}

/// A received message, or `None` for the zero-length shutdown signal.
pub type Received = Option<Frame>;

pub trait Encode {
    fn encode(&self, out: &mut Vec<u8>);
}

// Little-endian primitive helpers, used by generated catalog bodies.

pub fn put_u8(out: &mut Vec<u8>, v: u8) {
    out.push(v);
}

pub fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn put_i16(out: &mut Vec<u8>, v: i16) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn put_i32(out: &mut Vec<u8>, v: i32) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn put_bool(out: &mut Vec<u8>, v: bool) {
    out.push(v as u8);
}

/// Writes a fixed-width, nul-terminated/padded string field, truncating and
/// re-terminating if `s` does not fit — the re-expression of the original's
/// `MAX_LEN_*` string truncation rules (§4.5 of the spec).
pub fn put_fixed_str(out: &mut Vec<u8>, s: &str, width: usize) {
    let mut bytes = s.as_bytes().to_vec();
    if bytes.len() > width - 1 {
        bytes.truncate(width - 1);
    }
    bytes.push(0);
    bytes.resize(width, 0);
    out.extend_from_slice(&bytes);
}

pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn u8(&mut self) -> anyhow::Result<u8> {
        let v = *self.buf.get(self.pos).context("buffer underrun reading u8")?;
        self.pos += 1;
        Ok(v)
    }

    pub fn u16(&mut self) -> anyhow::Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn u32(&mut self) -> anyhow::Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn i16(&mut self) -> anyhow::Result<i16> {
        let bytes = self.take(2)?;
        Ok(i16::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn i32(&mut self) -> anyhow::Result<i32> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn bool(&mut self) -> anyhow::Result<bool> {
        Ok(self.u8()? != 0)
    }

    pub fn fixed_str(&mut self, width: usize) -> anyhow::Result<String> {
        let bytes = self.take(width)?;
        let nul = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..nul]).into_owned())
    }

    pub fn take(&mut self, n: usize) -> anyhow::Result<Vec<u8>> {
        let end = self.pos + n;
        if end > self.buf.len() {
            bail!("buffer underrun: need {n} bytes at offset {}, have {}", self.pos, self.buf.len());
        }
        let out = self.buf[self.pos..end].to_vec();
        self.pos = end;
        Ok(out)
    }

    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_round_trips_length_prefix() {
        let frame = Frame::new(7, vec![1, 2, 3]).unwrap();
        let bytes = frame.to_wire_bytes();
        assert_eq!(bytes, vec![4, 7, 1, 2, 3]);
    }

    #[test]
    fn frame_rejects_oversize_body() {
        assert!(Frame::new(0, vec![0u8; MAX_BODY_LEN + 1]).is_err());
    }

    #[test]
    fn fixed_str_truncates_and_reterminates() {
        let mut out = Vec::new();
        put_fixed_str(&mut out, "hello world", 6);
        assert_eq!(out, b"hello\0");
    }

    #[test]
    fn nested_short_frame_round_trips() {
        let short = ShortFrame::new(3, vec![9, 9]).unwrap();
        let mut out = Vec::new();
        short.encode_nested(&mut out);
        out.extend_from_slice(&[0xAA, 0xBB]);
        let (decoded, rest) = decode_nested(&out).unwrap();
        assert_eq!(decoded, short);
        assert_eq!(rest, &[0xAA, 0xBB]);
    }
}
