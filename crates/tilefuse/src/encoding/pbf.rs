//! Low-level protocol buffer wire helpers
//!
//! Only what the tile envelope needs: enough varint and field-key handling to
//! slice the top-level tile message into per-layer views and to frame layer
//! submessages back into a tile.

use crate::error::{Error, Result};
use bytes::BufMut;

/// Varint wire type
pub const WIRE_VARINT: u32 = 0;
/// 64-bit fixed wire type
pub const WIRE_FIXED64: u32 = 1;
/// Length-delimited wire type
pub const WIRE_LEN: u32 = 2;
/// 32-bit fixed wire type
pub const WIRE_FIXED32: u32 = 5;

/// Read a varint at `pos`, advancing it
pub fn read_varint(data: &[u8], pos: &mut usize) -> Result<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *data
            .get(*pos)
            .ok_or_else(|| Error::decode("truncated varint"))?;
        *pos += 1;
        if shift == 63 && byte > 1 {
            return Err(Error::decode("varint overflows 64 bits"));
        }
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift >= 64 {
            return Err(Error::decode("varint overflows 64 bits"));
        }
    }
}

/// Split a field key into (field number, wire type)
pub fn split_key(key: u64) -> (u32, u32) {
    ((key >> 3) as u32, (key & 0x7) as u32)
}

/// Skip over a value of the given wire type at `pos`, advancing it
pub fn skip_value(data: &[u8], pos: &mut usize, wire_type: u32) -> Result<()> {
    match wire_type {
        WIRE_VARINT => {
            read_varint(data, pos)?;
        }
        WIRE_FIXED64 => {
            advance(data, pos, 8)?;
        }
        WIRE_LEN => {
            let len = read_varint(data, pos)? as usize;
            advance(data, pos, len)?;
        }
        WIRE_FIXED32 => {
            advance(data, pos, 4)?;
        }
        other => {
            return Err(Error::Decode(format!("unsupported wire type {other}")));
        }
    }
    Ok(())
}

fn advance(data: &[u8], pos: &mut usize, len: usize) -> Result<()> {
    let end = pos
        .checked_add(len)
        .ok_or_else(|| Error::decode("field length overflow"))?;
    if end > data.len() {
        return Err(Error::decode("field extends past end of buffer"));
    }
    *pos = end;
    Ok(())
}

/// Write a varint
pub fn write_varint<B: BufMut>(buf: &mut B, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Write a field key
pub fn write_key<B: BufMut>(buf: &mut B, field: u32, wire_type: u32) {
    write_varint(buf, u64::from(field) << 3 | u64::from(wire_type));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_roundtrip() {
        for value in [0u64, 1, 127, 128, 300, 0x7fff_ffff, u64::MAX] {
            let mut buf = Vec::new();
            write_varint(&mut buf, value);
            let mut pos = 0;
            assert_eq!(read_varint(&buf, &mut pos).unwrap(), value);
            assert_eq!(pos, buf.len());
        }
    }

    #[test]
    fn test_truncated_varint() {
        let mut pos = 0;
        assert!(read_varint(&[0x80, 0x80], &mut pos).is_err());
    }

    #[test]
    fn test_skip_value() {
        let mut buf = Vec::new();
        write_varint(&mut buf, 300);
        buf.extend_from_slice(&[0u8; 8]);

        let mut pos = 0;
        skip_value(&buf, &mut pos, WIRE_VARINT).unwrap();
        skip_value(&buf, &mut pos, WIRE_FIXED64).unwrap();
        assert_eq!(pos, buf.len());

        let mut pos = 0;
        assert!(skip_value(&buf, &mut pos, 3).is_err());
    }

    #[test]
    fn test_split_key() {
        assert_eq!(split_key(0x1a), (3, WIRE_LEN));
        assert_eq!(split_key(0x78), (15, WIRE_VARINT));
    }
}
