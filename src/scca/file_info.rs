//! File information header (version 30/31 layout, 212 bytes at offset 84).
//!
//! ```text
//! offset  size  field
//!      0     4  file metrics array offset
//!      4     4  file metrics entry count
//!      8     4  trace chains array offset
//!     12     4  trace chains entry count
//!     16     4  filename strings offset
//!     20     4  filename strings size
//!     24     4  volumes information offset
//!     28     4  volume count
//!     32     4  volumes information size
//!     36     8  unknown
//!     44    64  last run times (8 x FILETIME, most recent first)
//!    108     8  unknown
//!    116     4  run count
//!    120     4  unknown
//!    124     4  unknown
//!    128     4  hash string offset
//!    132     4  hash string size
//!    136    76  unknown
//! ```
//!
//! Offsets are absolute positions in the decompressed record.

use byteorder::{LittleEndian, ReadBytesExt};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{self, Read};

use super::filetime_to_datetime;
use super::header::RECORD_HEADER_SIZE;

pub const FILE_INFO_OFFSET: usize = RECORD_HEADER_SIZE;
pub const FILE_INFO_SIZE:   usize = 212;
pub const LAST_RUN_SLOTS:   usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInformationHeader {
    pub metrics_offset:          u32,
    pub metrics_count:           u32,
    pub trace_chains_offset:     u32,
    pub trace_chains_count:      u32,
    pub filename_strings_offset: u32,
    pub filename_strings_size:   u32,
    pub volumes_offset:          u32,
    pub volume_count:            u32,
    pub volumes_size:            u32,
    pub unknown1:                u64,
    pub last_run_times:          [u64; LAST_RUN_SLOTS],
    pub unknown2:                u64,
    pub run_count:               u32,
    pub unknown3:                u32,
    pub unknown4:                u32,
    pub hash_string_offset:      u32,
    pub hash_string_size:        u32,
    #[serde(serialize_with = "crate::serde_hex")]
    pub unknown5:                [u8; 76],
}

impl FileInformationHeader {
    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        let metrics_offset = reader.read_u32::<LittleEndian>()?;
        let metrics_count = reader.read_u32::<LittleEndian>()?;
        let trace_chains_offset = reader.read_u32::<LittleEndian>()?;
        let trace_chains_count = reader.read_u32::<LittleEndian>()?;
        let filename_strings_offset = reader.read_u32::<LittleEndian>()?;
        let filename_strings_size = reader.read_u32::<LittleEndian>()?;
        let volumes_offset = reader.read_u32::<LittleEndian>()?;
        let volume_count = reader.read_u32::<LittleEndian>()?;
        let volumes_size = reader.read_u32::<LittleEndian>()?;
        let unknown1 = reader.read_u64::<LittleEndian>()?;
        let mut last_run_times = [0u64; LAST_RUN_SLOTS];
        reader.read_u64_into::<LittleEndian>(&mut last_run_times)?;
        let unknown2 = reader.read_u64::<LittleEndian>()?;
        let run_count = reader.read_u32::<LittleEndian>()?;
        let unknown3 = reader.read_u32::<LittleEndian>()?;
        let unknown4 = reader.read_u32::<LittleEndian>()?;
        let hash_string_offset = reader.read_u32::<LittleEndian>()?;
        let hash_string_size = reader.read_u32::<LittleEndian>()?;
        let mut unknown5 = [0u8; 76];
        reader.read_exact(&mut unknown5)?;
        Ok(Self {
            metrics_offset,
            metrics_count,
            trace_chains_offset,
            trace_chains_count,
            filename_strings_offset,
            filename_strings_size,
            volumes_offset,
            volume_count,
            volumes_size,
            unknown1,
            last_run_times,
            unknown2,
            run_count,
            unknown3,
            unknown4,
            hash_string_offset,
            hash_string_size,
            unknown5,
        })
    }

    /// Non-empty last-run slots as UTC timestamps, most recent first.
    pub fn last_run_utc(&self) -> Vec<DateTime<Utc>> {
        self.last_run_times.iter().filter_map(|&ft| filetime_to_datetime(ft)).collect()
    }
}
