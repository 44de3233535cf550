//! Decoder for compressed Windows prefetch files.
//!
//! ```no_run
//! use pfdecode::{DecodeOptions, Prefetch};
//!
//! let pf = Prefetch::open("CMD.EXE-0BD30981.pf", &DecodeOptions::default())?;
//! println!("{} ran {} times", pf.executable_name(), pf.run_count());
//! for t in pf.last_run_times() {
//!     println!("  {t}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod container;
pub mod perf;
pub mod prefetch;
pub mod scca;
pub mod xpress;

pub use container::{ContainerError, ContainerHeader};
pub use prefetch::{DecodeOptions, Prefetch, PrefetchError};
pub use scca::{parse_record, ParseError, Record};
pub use xpress::{decompress, FormatError, XpressError};

use serde::Serializer;

/// Serialize opaque bytes as a lowercase hex string.
pub(crate) fn serde_hex<S, T>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: AsRef<[u8]>,
{
    serializer.serialize_str(&hex::encode(bytes.as_ref()))
}

/// Serialize a four-character tag as text.
pub(crate) fn serde_ascii<S: Serializer>(tag: &[u8; 4], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(tag))
}
