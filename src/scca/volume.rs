//! Volume information entries (96 bytes each).
//!
//! The device path, file reference and directory string offsets inside an
//! entry are relative to the start of the volume information section.

use byteorder::{LittleEndian, ReadBytesExt};
use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use std::io::{self, Read};

use super::strings::{decode_utf16, read_directory_strings, slice_at};
use super::{filetime_to_datetime, ParseError};

pub const VOLUME_ENTRY_SIZE: usize = 96;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeInformationEntry {
    pub device_path_offset:       u32,
    /// Length of the device path in UTF-16 code units.
    pub device_path_chars:        u32,
    pub creation_time:            u64,
    pub serial_number:            u32,
    pub file_references_offset:   u32,
    pub file_references_size:     u32,
    pub directory_strings_offset: u32,
    pub directory_string_count:   u32,
    pub unknown1:                 u32,
    #[serde(serialize_with = "crate::serde_hex")]
    pub unknown2:                 [u8; 24],
    pub unknown3:                 u32,
    #[serde(serialize_with = "crate::serde_hex")]
    pub unknown4:                 [u8; 24],
    pub unknown5:                 u32,
}

impl VolumeInformationEntry {
    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        let device_path_offset = reader.read_u32::<LittleEndian>()?;
        let device_path_chars = reader.read_u32::<LittleEndian>()?;
        let creation_time = reader.read_u64::<LittleEndian>()?;
        let serial_number = reader.read_u32::<LittleEndian>()?;
        let file_references_offset = reader.read_u32::<LittleEndian>()?;
        let file_references_size = reader.read_u32::<LittleEndian>()?;
        let directory_strings_offset = reader.read_u32::<LittleEndian>()?;
        let directory_string_count = reader.read_u32::<LittleEndian>()?;
        let unknown1 = reader.read_u32::<LittleEndian>()?;
        let mut unknown2 = [0u8; 24];
        reader.read_exact(&mut unknown2)?;
        let unknown3 = reader.read_u32::<LittleEndian>()?;
        let mut unknown4 = [0u8; 24];
        reader.read_exact(&mut unknown4)?;
        let unknown5 = reader.read_u32::<LittleEndian>()?;
        Ok(Self {
            device_path_offset,
            device_path_chars,
            creation_time,
            serial_number,
            file_references_offset,
            file_references_size,
            directory_strings_offset,
            directory_string_count,
            unknown1,
            unknown2,
            unknown3,
            unknown4,
            unknown5,
        })
    }
}

/// Bounds of the volume information section inside the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeSection {
    pub offset: usize,
    pub size:   usize,
}

impl VolumeSection {
    pub fn end(&self) -> usize {
        self.offset + self.size
    }

    fn absolute(&self, relative: u32) -> u64 {
        self.offset as u64 + u64::from(relative)
    }
}

/// A volume entry with its strings resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Volume {
    pub entry:       VolumeInformationEntry,
    pub device_path: String,
    pub directories: Vec<String>,
}

impl Volume {
    /// Decode entry `index` of `section` and resolve its strings.
    /// `directory_strings_offset` points at the u16 length prefix of the first
    /// directory string, not at its characters.
    pub fn parse(buf: &[u8], section: VolumeSection, index: u32) -> Result<Self, ParseError> {
        let entry_offset = section.offset as u64 + u64::from(index) * VOLUME_ENTRY_SIZE as u64;
        let raw = slice_at(buf, entry_offset, VOLUME_ENTRY_SIZE as u64, "volume information entry")?;
        let entry = VolumeInformationEntry::read(raw).map_err(|_| ParseError::Truncated {
            what:      "volume information entry",
            offset:    entry_offset,
            len:       VOLUME_ENTRY_SIZE as u64,
            available: buf.len(),
        })?;

        let path_offset = section.absolute(entry.device_path_offset);
        let path_bytes = slice_at(
            buf,
            path_offset,
            u64::from(entry.device_path_chars) * 2,
            "volume device path",
        )?;
        let device_path = decode_utf16(path_bytes, path_offset as usize);

        let directories = if entry.directory_string_count == 0 {
            Vec::new()
        } else {
            let dir_offset = usize::try_from(section.absolute(entry.directory_strings_offset))
                .unwrap_or(usize::MAX);
            read_directory_strings(buf, dir_offset, entry.directory_string_count, section.end())?
        };

        debug!(
            "volume {}: {} (serial {:08x}, {} directories)",
            index,
            device_path,
            entry.serial_number,
            directories.len()
        );
        Ok(Self { entry, device_path, directories })
    }

    pub fn creation_time(&self) -> Option<DateTime<Utc>> {
        filetime_to_datetime(self.entry.creation_time)
    }
}
