//! Decompressed prefetch record (`SCCA`, format version 31).
//!
//! # Layout
//! ```text
//! 0      RecordHeader           (84 bytes: version, "SCCA", executable name, hash)
//! 84     FileInformationHeader  (212 bytes: section offsets, run times, run count)
//! ...    file metrics / trace chains          (not decoded)
//! ...    filename strings block               (null-terminated UTF-16LE)
//! ...    volume information section
//!          VolumeInformationEntry[count]      (96 bytes each)
//!          device paths, directory strings    (offsets relative to the section)
//! ```
//!
//! Every offset/length pair is checked against the buffer before it is
//! dereferenced.  Any failure aborts the parse; no partial record is returned.

pub mod file_info;
pub mod header;
pub mod strings;
pub mod volume;

pub use file_info::{FileInformationHeader, FILE_INFO_OFFSET, FILE_INFO_SIZE};
pub use header::{RecordHeader, RECORD_HEADER_SIZE, SIGNATURE, SUPPORTED_VERSION};
pub use volume::{Volume, VolumeInformationEntry, VolumeSection, VOLUME_ENTRY_SIZE};

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use thiserror::Error;

use strings::{slice_at, split_string_block};

/// 100 ns intervals between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_EPOCH_SECS: i64 = 11_644_473_600;
const FILETIME_TICKS_PER_SEC: u64 = 10_000_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid record signature: {:?}", String::from_utf8_lossy(.0))]
    InvalidSignature([u8; 4]),
    #[error("Unsupported prefetch version: {0} (only 31 is supported)")]
    UnsupportedVersion(u32),
    #[error("Truncated data: {what} at offset {offset} (length {len}) exceeds buffer of {available} bytes")]
    Truncated { what: &'static str, offset: u64, len: u64, available: usize },
    #[error("String at offset {offset} starts outside its block ({available} bytes available)")]
    StringDecode { offset: usize, available: usize },
}

/// A fully decoded prefetch record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub header:    RecordHeader,
    pub file_info: FileInformationHeader,
    pub volumes:   Vec<Volume>,
    /// Paths of files referenced during launch.
    pub filenames: Vec<String>,
}

/// Check the signature, then the version, reading nothing else.
pub fn validate(buf: &[u8]) -> Result<(), ParseError> {
    let prologue = slice_at(buf, 0, 8, "record signature")?;
    let signature: [u8; 4] = [prologue[4], prologue[5], prologue[6], prologue[7]];
    if &signature != SIGNATURE {
        return Err(ParseError::InvalidSignature(signature));
    }
    let version = u32::from_le_bytes([prologue[0], prologue[1], prologue[2], prologue[3]]);
    if version != SUPPORTED_VERSION {
        return Err(ParseError::UnsupportedVersion(version));
    }
    Ok(())
}

/// Parse a decompressed record.
pub fn parse_record(buf: &[u8]) -> Result<Record, ParseError> {
    validate(buf)?;

    let header = read_fixed(buf, 0, RECORD_HEADER_SIZE, "record header", |raw| {
        RecordHeader::read(raw)
    })?;
    let file_info = read_fixed(
        buf,
        FILE_INFO_OFFSET,
        FILE_INFO_SIZE,
        "file information header",
        |raw| FileInformationHeader::read(raw),
    )?;
    debug!(
        "record {:?}: {} volumes at {}, filename strings at {} ({} bytes)",
        header.executable_name,
        file_info.volume_count,
        file_info.volumes_offset,
        file_info.filename_strings_offset,
        file_info.filename_strings_size
    );

    let volumes = read_volumes(buf, &file_info)?;
    let filenames = read_filenames(buf, &file_info)?;

    Ok(Record { header, file_info, volumes, filenames })
}

fn read_fixed<T>(
    buf:    &[u8],
    offset: usize,
    len:    usize,
    what:   &'static str,
    read:   impl FnOnce(&[u8]) -> std::io::Result<T>,
) -> Result<T, ParseError> {
    let raw = slice_at(buf, offset as u64, len as u64, what)?;
    read(raw).map_err(|_| ParseError::Truncated {
        what,
        offset:    offset as u64,
        len:       len as u64,
        available: buf.len(),
    })
}

fn read_volumes(buf: &[u8], info: &FileInformationHeader) -> Result<Vec<Volume>, ParseError> {
    if info.volume_count == 0 {
        return Ok(Vec::new());
    }
    let offset = u64::from(info.volumes_offset);
    let size = u64::from(info.volumes_size);
    slice_at(buf, offset, size, "volume information section")?;
    let section = VolumeSection { offset: offset as usize, size: size as usize };

    let capacity = (info.volume_count as usize).min(buf.len() / VOLUME_ENTRY_SIZE);
    let mut volumes = Vec::with_capacity(capacity);
    for index in 0..info.volume_count {
        volumes.push(Volume::parse(buf, section, index)?);
    }
    Ok(volumes)
}

fn read_filenames(buf: &[u8], info: &FileInformationHeader) -> Result<Vec<String>, ParseError> {
    if info.filename_strings_size == 0 {
        return Ok(Vec::new());
    }
    let block = slice_at(
        buf,
        u64::from(info.filename_strings_offset),
        u64::from(info.filename_strings_size),
        "filename strings",
    )?;
    Ok(split_string_block(block, info.filename_strings_offset as usize))
}

/// Convert a Windows FILETIME to UTC.  Zero means "unset".
pub fn filetime_to_datetime(filetime: u64) -> Option<DateTime<Utc>> {
    if filetime == 0 {
        return None;
    }
    let secs = (filetime / FILETIME_TICKS_PER_SEC) as i64 - FILETIME_UNIX_EPOCH_SECS;
    let nanos = ((filetime % FILETIME_TICKS_PER_SEC) * 100) as u32;
    DateTime::from_timestamp(secs, nanos)
}
