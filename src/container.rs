//! Compressed prefetch envelope (`MAM` header).
//!
//! ```text
//! offset  size  field
//!      0     3  "MAM"
//!      3     1  format byte: low nibble = compression format, 0x80 = checksum present
//!      4     4  decompressed size (u32 LE)
//!      8     4  checksum (u32 LE, only when flagged)
//! ```
//!
//! Only compression format 4 (Xpress Huffman) is accepted.  The checksum is
//! carried through for display and never validated.

use byteorder::{LittleEndian, ReadBytesExt};
use serde::Serialize;
use std::io::{self, Read};
use thiserror::Error;

pub const MAGIC_PREFIX: &[u8; 3] = b"MAM";
/// Magic of an unflagged Xpress Huffman container.
pub const MAGIC: &[u8; 4] = b"MAM\x04";
pub const COMPRESSION_XPRESS_HUFF: u8 = 4;
pub const FLAG_CHECKSUM: u8 = 0x80;
pub const HEADER_SIZE: usize = 8;
pub const HEADER_SIZE_WITH_CHECKSUM: usize = 12;

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Input too short for container header ({0} bytes)")]
    TooShort(usize),
    #[error("Invalid container magic: {}", hex::encode(.0))]
    InvalidMagic([u8; 4]),
    #[error("Unsupported compression format: {0}")]
    UnsupportedCompression(u8),
    #[error("Declared decompressed size {declared} exceeds limit {limit}")]
    SizeLimit { declared: u32, limit: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerHeader {
    #[serde(serialize_with = "crate::serde_hex")]
    pub magic:             [u8; 4],
    pub decompressed_size: u32,
    pub checksum:          Option<u32>,
}

impl ContainerHeader {
    /// Compression format nibble of the magic's last byte.
    pub fn compression_format(&self) -> u8 {
        self.magic[3] & 0x0F
    }

    /// Number of header bytes preceding the compressed payload.
    pub fn header_len(&self) -> usize {
        if self.checksum.is_some() { HEADER_SIZE_WITH_CHECKSUM } else { HEADER_SIZE }
    }

    pub fn read<R: Read>(mut reader: R) -> Result<Self, ContainerError> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic).map_err(|_| ContainerError::TooShort(0))?;
        if &magic[..3] != MAGIC_PREFIX {
            return Err(ContainerError::InvalidMagic(magic));
        }
        let format = magic[3] & 0x0F;
        if format != COMPRESSION_XPRESS_HUFF {
            return Err(ContainerError::UnsupportedCompression(format));
        }
        let decompressed_size = reader
            .read_u32::<LittleEndian>()
            .map_err(|_| ContainerError::TooShort(4))?;
        let checksum = if magic[3] & FLAG_CHECKSUM != 0 {
            Some(reader.read_u32::<LittleEndian>().map_err(|_| ContainerError::TooShort(8))?)
        } else {
            None
        };
        Ok(Self { magic, decompressed_size, checksum })
    }

    /// Parse the header at the start of `data` and return it with the payload.
    pub fn split(data: &[u8]) -> Result<(Self, &[u8]), ContainerError> {
        if data.len() < HEADER_SIZE {
            return Err(ContainerError::TooShort(data.len()));
        }
        let header = Self::read(data).map_err(|e| match e {
            ContainerError::TooShort(_) => ContainerError::TooShort(data.len()),
            other => other,
        })?;
        let len = header.header_len();
        Ok((header, &data[len..]))
    }

    pub fn write_to(&self, out: &mut Vec<u8>) -> io::Result<()> {
        use byteorder::WriteBytesExt;
        out.extend_from_slice(&self.magic);
        out.write_u32::<LittleEndian>(self.decompressed_size)?;
        if let Some(sum) = self.checksum {
            out.write_u32::<LittleEndian>(sum)?;
        }
        Ok(())
    }
}
