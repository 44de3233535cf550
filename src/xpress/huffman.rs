//! Canonical Huffman decode table for Xpress Huffman blocks.
//!
//! Each block starts with 256 bytes holding 512 four-bit code lengths: the
//! low nibble of byte `i` is the length of symbol `2i`, the high nibble the
//! length of symbol `2i + 1`.  Codes are assigned canonically in
//! (length, symbol) order and expanded into a direct lookup table indexed by
//! the next [`MAX_CODE_LEN`] bits of the stream.

use super::FormatError;

pub const NUM_SYMBOLS:   usize = 512;
pub const TABLE_BYTES:   usize = NUM_SYMBOLS / 2;
pub const MAX_CODE_LEN:  u32   = 15;
const LOOKUP_SIZE:       usize = 1 << MAX_CODE_LEN;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Entry {
    pub symbol: u16,
    pub len:    u8,
}

pub struct DecodeTable {
    lookup: Vec<Entry>,
}

impl DecodeTable {
    pub fn build(packed: &[u8; TABLE_BYTES]) -> Result<Self, FormatError> {
        let lengths = unpack_lengths(packed);

        let mut counts = [0u32; MAX_CODE_LEN as usize + 1];
        for &len in &lengths {
            counts[len as usize] += 1;
        }
        let used = NUM_SYMBOLS as u32 - counts[0];

        match used {
            0 => return Err(FormatError::EmptyPrefixCode),
            1 => {
                // A lone symbol gets the empty code and consumes no bits.
                let symbol = lengths.iter().position(|&l| l != 0).unwrap_or(0) as u16;
                return Ok(Self { lookup: vec![Entry { symbol, len: 0 }; LOOKUP_SIZE] });
            }
            _ => {}
        }

        // Kraft check: `left` is the number of unused codes at each length.
        let mut left: i64 = 1;
        for &count in &counts[1..] {
            left = (left << 1) - i64::from(count);
            if left < 0 {
                return Err(FormatError::OversubscribedPrefixCode);
            }
        }
        if left != 0 {
            return Err(FormatError::IncompletePrefixCode);
        }

        let mut lookup = vec![Entry::default(); LOOKUP_SIZE];
        let mut code: usize = 0;
        let mut prev_len = 0u32;
        for len in 1..=MAX_CODE_LEN {
            for (symbol, _) in lengths.iter().enumerate().filter(|&(_, &l)| u32::from(l) == len) {
                code <<= len - prev_len;
                prev_len = len;
                let shift = MAX_CODE_LEN - len;
                let start = code << shift;
                let end = (code + 1) << shift;
                lookup[start..end].fill(Entry { symbol: symbol as u16, len: len as u8 });
                code += 1;
            }
        }
        Ok(Self { lookup })
    }

    /// Resolve the symbol whose code prefixes `bits` (the next 15 stream bits).
    #[inline]
    pub fn lookup(&self, bits: u32) -> Entry {
        self.lookup[bits as usize & (LOOKUP_SIZE - 1)]
    }
}

fn unpack_lengths(packed: &[u8; TABLE_BYTES]) -> [u8; NUM_SYMBOLS] {
    let mut lengths = [0u8; NUM_SYMBOLS];
    for (i, &byte) in packed.iter().enumerate() {
        lengths[2 * i] = byte & 0x0F;
        lengths[2 * i + 1] = byte >> 4;
    }
    lengths
}
