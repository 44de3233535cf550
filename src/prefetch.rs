//! High-level [`Prefetch`] API: container, decompression and record parsing
//! in one call.
//!
//! ```no_run
//! use pfdecode::prefetch::{DecodeOptions, Prefetch};
//!
//! let bytes = std::fs::read("NOTEPAD.EXE-D8414F97.pf")?;
//! let pf = Prefetch::from_bytes(&bytes, &DecodeOptions::default())?;
//! for volume in pf.volumes() {
//!     println!("{} ({} directories)", volume.device_path, volume.directories.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::container::{ContainerError, ContainerHeader};
use crate::scca::{self, ParseError, Record, Volume, SIGNATURE};
use crate::xpress::{self, XpressError};

/// Largest decompressed size accepted by default (64 MiB).
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: u32 = 64 * 1024 * 1024;

// ── DecodeOptions ─────────────────────────────────────────────────────────────

/// Configuration for [`Prefetch::from_bytes`] and [`Prefetch::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Containers declaring a larger decompressed size are rejected before
    /// any output is allocated.
    pub max_decompressed_size: u32,
    /// Accept input that is already a bare `SCCA` record.
    pub allow_uncompressed:    bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
            allow_uncompressed:    true,
        }
    }
}

// ── PrefetchError ─────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum PrefetchError {
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),
    #[error("Decompression error: {0}")]
    Decompress(#[from] XpressError),
    #[error("Record error: {0}")]
    Parse(#[from] ParseError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

// ── Prefetch ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prefetch {
    /// `None` when the input was an uncompressed record.
    pub container: Option<ContainerHeader>,
    pub record:    Record,
}

impl Prefetch {
    // ── Constructors ─────────────────────────────────────────────────────────

    pub fn from_bytes(bytes: &[u8], opts: &DecodeOptions) -> Result<Self, PrefetchError> {
        let (container, raw) = decompress_record(bytes, opts)?;
        let record = scca::parse_record(&raw)?;
        Ok(Self { container, record })
    }

    pub fn open<P: AsRef<Path>>(path: P, opts: &DecodeOptions) -> Result<Self, PrefetchError> {
        let path = path.as_ref();
        debug!("reading {}", path.display());
        Self::from_bytes(&fs::read(path)?, opts)
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn version(&self) -> u32 {
        self.record.header.version
    }

    pub fn executable_name(&self) -> &str {
        &self.record.header.executable_name
    }

    pub fn prefetch_hash(&self) -> u32 {
        self.record.header.prefetch_hash
    }

    pub fn run_count(&self) -> u32 {
        self.record.file_info.run_count
    }

    pub fn volumes(&self) -> &[Volume] {
        &self.record.volumes
    }

    pub fn filenames(&self) -> &[String] {
        &self.record.filenames
    }

    /// Recorded launch times, most recent first.  Unused slots are skipped.
    pub fn last_run_times(&self) -> Vec<DateTime<Utc>> {
        self.record.file_info.last_run_utc()
    }

    pub fn is_compressed(&self) -> bool {
        self.container.is_some()
    }
}

// ── helpers ──────────────────────────────────────────────────────────────────

/// Return the raw record bytes of `bytes`, decompressing when needed.
///
/// The container header is returned alongside when one was present.
pub fn decompress_record(
    bytes: &[u8],
    opts:  &DecodeOptions,
) -> Result<(Option<ContainerHeader>, Vec<u8>), PrefetchError> {
    if opts.allow_uncompressed && is_uncompressed(bytes) {
        debug!("input is an uncompressed record ({} bytes)", bytes.len());
        return Ok((None, bytes.to_vec()));
    }
    let (header, payload) = ContainerHeader::split(bytes)?;
    debug!(
        "container {}: decompressed size {}, checksum {:?}",
        hex::encode(header.magic),
        header.decompressed_size,
        header.checksum
    );
    if header.decompressed_size > opts.max_decompressed_size {
        return Err(ContainerError::SizeLimit {
            declared: header.decompressed_size,
            limit:    opts.max_decompressed_size,
        }
        .into());
    }
    let raw = xpress::decompress(payload, header.decompressed_size as usize)?;
    Ok((Some(header), raw))
}

fn is_uncompressed(bytes: &[u8]) -> bool {
    bytes.get(4..8) == Some(&SIGNATURE[..])
}
