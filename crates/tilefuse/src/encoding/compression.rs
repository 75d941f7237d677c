//! Tile compression envelope
//!
//! Ingest autodetects gzip and zlib by magic bytes and decompresses under an
//! output-size cap. Emit is gzip only; an empty payload is returned verbatim
//! since callers treat a non-zero length as the "non-empty tile" signal.

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::{Error, Result};

/// Default cap on decompressed tile size (2 GiB)
pub const DEFAULT_SIZE_LIMIT: usize = 2147483648;

/// Default gzip compression level
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// True iff the buffer starts with the gzip magic bytes
pub fn is_gzip(data: &[u8]) -> bool {
    data.len() > 2 && data[0] == 0x1f && data[1] == 0x8b
}

/// True iff the buffer starts with a common zlib header
pub fn is_zlib(data: &[u8]) -> bool {
    data.len() > 2 && data[0] == 0x78 && matches!(data[1], 0x01 | 0x5e | 0x9c | 0xda)
}

/// True iff the buffer looks gzip- or zlib-compressed
pub fn is_compressed(data: &[u8]) -> bool {
    is_gzip(data) || is_zlib(data)
}

/// Streaming decompressor with an output-size cap
pub struct Decompressor {
    max_size: usize,
}

impl Decompressor {
    /// Create a decompressor with the default 2 GiB cap
    pub fn new() -> Self {
        Self {
            max_size: DEFAULT_SIZE_LIMIT,
        }
    }

    /// Create a decompressor with a custom output cap
    pub fn with_max_size(max_size: usize) -> Self {
        Self { max_size }
    }

    /// Decompress a gzip or zlib buffer
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        if is_gzip(data) {
            self.read_capped(GzDecoder::new(data), &mut output)?;
        } else if is_zlib(data) {
            self.read_capped(ZlibDecoder::new(data), &mut output)?;
        } else {
            return Err(Error::decompression("unrecognized compression header"));
        }
        Ok(output)
    }

    fn read_capped<R: Read>(&self, reader: R, output: &mut Vec<u8>) -> Result<()> {
        let cap = (self.max_size as u64).saturating_add(1);
        reader
            .take(cap)
            .read_to_end(output)
            .map_err(|e| Error::Decompression(format!("failed to inflate tile: {e}")))?;
        if output.len() > self.max_size {
            return Err(Error::SizeLimit {
                limit: self.max_size,
            });
        }
        Ok(())
    }
}

impl Default for Decompressor {
    fn default() -> Self {
        Self::new()
    }
}

/// Gzip compressor
pub struct Compressor {
    level: Compression,
}

impl Compressor {
    /// Create a compressor at the default level
    pub fn new() -> Self {
        Self::with_level(DEFAULT_COMPRESSION_LEVEL)
    }

    /// Create a compressor with a custom level (0-9)
    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level),
        }
    }

    /// Gzip-compress a buffer; an empty input is returned unchanged
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let mut encoder = GzEncoder::new(Vec::new(), self.level);
        encoder
            .write_all(data)
            .map_err(|e| Error::Compression(format!("gzip compression failed: {e}")))?;
        encoder
            .finish()
            .map_err(|e| Error::Compression(format!("gzip finish failed: {e}")))
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}
