//! Xpress Huffman (LZ77 + canonical Huffman) decompression.
//!
//! # Stream layout
//! The payload is a sequence of blocks.  Each block is a 256-byte table of
//! packed code lengths followed by a bitstream that produces up to 64 KiB of
//! output.  The next block starts at the first byte the previous block's bit
//! reader did not fetch.
//!
//! # Symbols
//! Symbols `0..256` are literal bytes.  For symbols `256..512` the value
//! `slot = symbol - 256` packs a match:
//!
//! | bits of `slot` | meaning                                   |
//! |----------------|-------------------------------------------|
//! | `0..4`         | length − 3; `15` means "read more"        |
//! | `4..8`         | number of extra distance bits `n`         |
//!
//! The distance is `(1 << n) + next n bits`.  A length field of 15 is
//! followed by one raw byte added to 15; a raw byte of 255 is instead followed
//! by a raw u16 holding the full length − 3.

mod bitstream;
mod huffman;

pub use bitstream::{BitReader, Underflow};
pub use huffman::{DecodeTable, Entry, MAX_CODE_LEN, NUM_SYMBOLS, TABLE_BYTES};

use log::{debug, trace};
use thiserror::Error;

/// Output bytes produced per block before a new table is read.
pub const BLOCK_OUTPUT_SIZE: usize = 64 * 1024;
pub const MIN_MATCH: usize = 3;

// ── Error types ──────────────────────────────────────────────────────────────

/// Malformed compressed data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Huffman table has no symbols")]
    EmptyPrefixCode,
    #[error("Huffman code lengths oversubscribe the code space")]
    OversubscribedPrefixCode,
    #[error("Huffman code lengths leave the code space incomplete")]
    IncompletePrefixCode,
    #[error("Match distance {distance} reaches before output start (position {position})")]
    DistanceBeforeStart { distance: usize, position: usize },
    #[error("Extended match length {0} is below 15")]
    ShortExtendedLength(u16),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XpressError {
    #[error("Format error: {0}")]
    Format(#[from] FormatError),
    #[error("Compressed stream exhausted at offset {offset} after {produced} of {expected} bytes")]
    BitstreamUnderflow { offset: usize, produced: usize, expected: usize },
}

// ── Decoder ──────────────────────────────────────────────────────────────────

/// Decompress `input` into exactly `decompressed_size` bytes.
///
/// Input left over once the output is complete is padding and ignored.
pub fn decompress(input: &[u8], decompressed_size: usize) -> Result<Vec<u8>, XpressError> {
    let mut out = Vec::with_capacity(decompressed_size);
    let mut in_pos = 0usize;

    while out.len() < decompressed_size {
        let underflow = |offset: usize, produced: usize| XpressError::BitstreamUnderflow {
            offset,
            produced,
            expected: decompressed_size,
        };

        let packed: &[u8; TABLE_BYTES] = in_pos
            .checked_add(TABLE_BYTES)
            .and_then(|end| input.get(in_pos..end))
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| underflow(input.len(), out.len()))?;
        let table = DecodeTable::build(packed)?;
        let mut bits = BitReader::new(input, in_pos + TABLE_BYTES)
            .map_err(|u| underflow(u.offset, out.len()))?;

        let block_end = decompressed_size.min(out.len() + BLOCK_OUTPUT_SIZE);
        debug!(
            "xpress block: input offset {}, output {}..{}",
            in_pos,
            out.len(),
            block_end
        );
        decode_block(&table, &mut bits, &mut out, block_end, decompressed_size)
            .map_err(|e| match e {
                BlockError::Underflow(u) => underflow(u.offset, out.len()),
                BlockError::Format(f) => XpressError::Format(f),
            })?;
        in_pos = bits.position();
    }

    debug!("xpress: {} input bytes -> {} output bytes", input.len(), out.len());
    Ok(out)
}

enum BlockError {
    Underflow(Underflow),
    Format(FormatError),
}

impl From<Underflow> for BlockError {
    fn from(u: Underflow) -> Self {
        BlockError::Underflow(u)
    }
}

impl From<FormatError> for BlockError {
    fn from(f: FormatError) -> Self {
        BlockError::Format(f)
    }
}

/// Decode tokens until `out` reaches `block_end`.  Matches may run past the
/// block end but are clipped at `limit`.
fn decode_block(
    table:     &DecodeTable,
    bits:      &mut BitReader<'_>,
    out:       &mut Vec<u8>,
    block_end: usize,
    limit:     usize,
) -> Result<(), BlockError> {
    while out.len() < block_end {
        let entry = table.lookup(bits.peek(MAX_CODE_LEN));
        bits.consume(u32::from(entry.len))?;

        if entry.symbol < 256 {
            out.push(entry.symbol as u8);
            continue;
        }

        let slot = entry.symbol - 256;
        let offset_bits = u32::from(slot >> 4);
        let mut length = usize::from(slot & 0x0F);
        if length == 15 {
            let extra = bits.read_byte()?;
            length = if extra == 255 {
                let full = bits.read_u16()?;
                if full < 15 {
                    return Err(FormatError::ShortExtendedLength(full).into());
                }
                usize::from(full)
            } else {
                usize::from(extra) + 15
            };
        }
        length += MIN_MATCH;

        let distance = (1usize << offset_bits) + bits.read_bits(offset_bits)? as usize;
        let position = out.len();
        if distance > position {
            return Err(FormatError::DistanceBeforeStart { distance, position }.into());
        }
        trace!("match at {}: length {}, distance {}", position, length, distance);

        copy_match(out, distance, length.min(limit - position));
    }
    Ok(())
}

/// Append `length` bytes copied from `distance` bytes back.  Byte-wise so a
/// distance shorter than the length repeats the overlapping run.
#[inline]
fn copy_match(out: &mut Vec<u8>, distance: usize, length: usize) {
    let mut src = out.len() - distance;
    for _ in 0..length {
        let byte = out[src];
        out.push(byte);
        src += 1;
    }
}
