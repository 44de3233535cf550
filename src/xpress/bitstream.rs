//! MSB-first bit reader over 16-bit little-endian words.

/// Raised when the reader needs more input than the payload holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Underflow {
    /// Byte offset in the payload where input ran out.
    pub offset: usize,
}

pub struct BitReader<'a> {
    input: &'a [u8],
    pos:   usize,
    /// Buffered bits, left-aligned.
    acc:   u32,
    /// Number of valid bits in `acc`.
    bits:  u32,
}

impl<'a> BitReader<'a> {
    /// Start reading at `pos`, preloading two words.
    pub fn new(input: &'a [u8], pos: usize) -> Result<Self, Underflow> {
        let hi = read_word(input, pos).ok_or(Underflow { offset: pos })?;
        let lo = read_word(input, pos + 2).ok_or(Underflow { offset: pos + 2 })?;
        Ok(Self {
            input,
            pos: pos + 4,
            acc: (u32::from(hi) << 16) | u32::from(lo),
            bits: 32,
        })
    }

    /// Next `n` bits (n <= 16) without consuming them.  Bits past the end of
    /// the input read as zero.
    #[inline]
    pub fn peek(&self, n: u32) -> u32 {
        debug_assert!(n <= 16);
        if n == 0 { 0 } else { self.acc >> (32 - n) }
    }

    #[inline]
    pub fn consume(&mut self, n: u32) -> Result<(), Underflow> {
        debug_assert!(n <= 16);
        if n > self.bits {
            return Err(Underflow { offset: self.pos });
        }
        self.acc <<= n;
        self.bits -= n;
        if self.bits < 16 {
            if let Some(word) = read_word(self.input, self.pos) {
                self.acc |= u32::from(word) << (16 - self.bits);
                self.bits += 16;
                self.pos += 2;
            }
        }
        Ok(())
    }

    /// Consume and return `n` bits.
    #[inline]
    pub fn read_bits(&mut self, n: u32) -> Result<u32, Underflow> {
        let value = self.peek(n);
        self.consume(n)?;
        Ok(value)
    }

    /// Read one raw byte from the byte position following the buffered words.
    pub fn read_byte(&mut self) -> Result<u8, Underflow> {
        let byte = *self.input.get(self.pos).ok_or(Underflow { offset: self.pos })?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_u16(&mut self) -> Result<u16, Underflow> {
        let word = read_word(self.input, self.pos).ok_or(Underflow { offset: self.pos })?;
        self.pos += 2;
        Ok(word)
    }

    /// Byte offset of the next unread input byte.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn buffered_bits(&self) -> u32 {
        self.bits
    }
}

#[inline]
fn read_word(input: &[u8], pos: usize) -> Option<u16> {
    let bytes = input.get(pos..pos.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}
