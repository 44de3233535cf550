use byteorder::{LittleEndian, ReadBytesExt};
use serde::Serialize;
use std::io::{self, Read};

use super::strings::decode_utf16;

pub const SIGNATURE: &[u8; 4] = b"SCCA";
pub const SUPPORTED_VERSION: u32 = 31;
pub const RECORD_HEADER_SIZE: usize = 84;
/// Executable name field: 30 UTF-16 code units, null padded.
pub const EXECUTABLE_NAME_SIZE: usize = 60;

/// Fixed 84-byte header at the start of the decompressed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordHeader {
    pub version:         u32,
    #[serde(serialize_with = "crate::serde_ascii")]
    pub signature:       [u8; 4],
    pub unknown1:        u32,
    pub file_size:       u32,
    pub executable_name: String,
    pub prefetch_hash:   u32,
    pub flags:           u32,
}

impl RecordHeader {
    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        let version = reader.read_u32::<LittleEndian>()?;
        let mut signature = [0u8; 4];
        reader.read_exact(&mut signature)?;
        let unknown1 = reader.read_u32::<LittleEndian>()?;
        let file_size = reader.read_u32::<LittleEndian>()?;
        let mut name = [0u8; EXECUTABLE_NAME_SIZE];
        reader.read_exact(&mut name)?;
        Ok(Self {
            version,
            signature,
            unknown1,
            file_size,
            executable_name: decode_utf16(&name, 16),
            prefetch_hash: reader.read_u32::<LittleEndian>()?,
            flags: reader.read_u32::<LittleEndian>()?,
        })
    }
}
