//! Binary encoding/decoding of command payloads and data messages
//!
//! Data messages are a concatenation of length-prefixed byte arrays: every
//! array is preceded by its length as a 4-byte big-endian integer. Strings
//! are UTF-8.

use crate::core::Bounds;
use crate::error::{Error, Result};

/// Size of an encoded [`Bounds`] payload in bytes
pub const BOUNDS_SIZE: usize = 16;

/// Encode bounds as two big-endian int64 values (min, max)
pub fn encode_bounds(bounds: Bounds) -> [u8; BOUNDS_SIZE] {
    let mut buffer = [0u8; BOUNDS_SIZE];
    buffer[0..8].copy_from_slice(&bounds.min.to_be_bytes());
    buffer[8..16].copy_from_slice(&bounds.max.to_be_bytes());
    buffer
}

/// Decode a 16-byte bounds payload
pub fn decode_bounds(buffer: &[u8]) -> Result<Bounds> {
    if buffer.len() != BOUNDS_SIZE {
        return Err(Error::Codec(format!(
            "bounds payload must be {} bytes, got {}",
            BOUNDS_SIZE,
            buffer.len()
        )));
    }
    let mut min = [0u8; 8];
    let mut max = [0u8; 8];
    min.copy_from_slice(&buffer[0..8]);
    max.copy_from_slice(&buffer[8..16]);
    Ok(Bounds::new(i64::from_be_bytes(min), i64::from_be_bytes(max)))
}

/// Concatenate byte arrays, each prefixed with its length
pub fn write_byte_arrays(arrays: &[&[u8]]) -> Vec<u8> {
    let total: usize = arrays.iter().map(|a| a.len() + 4).sum();
    let mut buffer = Vec::with_capacity(total);
    for array in arrays {
        buffer.extend_from_slice(&(array.len() as u32).to_be_bytes());
        buffer.extend_from_slice(array);
    }
    buffer
}

/// Split a buffer produced by [`write_byte_arrays`]
pub fn read_byte_arrays(buffer: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut reader = ByteReader::new(buffer);
    let mut arrays = Vec::new();
    while !reader.is_empty() {
        arrays.push(reader.read_bytes()?.to_vec());
    }
    Ok(arrays)
}

/// Cursor over a length-prefixed buffer
pub struct ByteReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.position >= self.buffer.len()
    }

    /// Read the next length-prefixed array
    pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let header_end = self.position + 4;
        if header_end > self.buffer.len() {
            return Err(Error::Codec(format!(
                "truncated length prefix at offset {}",
                self.position
            )));
        }
        let mut length = [0u8; 4];
        length.copy_from_slice(&self.buffer[self.position..header_end]);
        let end = header_end + u32::from_be_bytes(length) as usize;
        if end > self.buffer.len() {
            return Err(Error::Codec(format!(
                "array at offset {} runs past the end of the message",
                self.position
            )));
        }
        self.position = end;
        Ok(&self.buffer[header_end..end])
    }

    /// Read the next array as a UTF-8 string
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::Codec(e.to_string()))
    }

    /// Read the next array as a decimal integer string
    pub fn read_i64(&mut self) -> Result<i64> {
        let text = self.read_string()?;
        text.trim()
            .parse()
            .map_err(|_| Error::Codec(format!("expected an integer, got {:?}", text)))
    }
}
