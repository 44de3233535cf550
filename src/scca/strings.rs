//! Bounds-checked slicing and UTF-16LE string decoding.

use log::warn;

use super::ParseError;

/// `len` bytes at `offset` of `buf`, or [`ParseError::Truncated`] naming `what`.
pub fn slice_at<'a>(
    buf:    &'a [u8],
    offset: u64,
    len:    u64,
    what:   &'static str,
) -> Result<&'a [u8], ParseError> {
    let truncated = || ParseError::Truncated { what, offset, len, available: buf.len() };
    let start = usize::try_from(offset).map_err(|_| truncated())?;
    let size = usize::try_from(len).map_err(|_| truncated())?;
    let end = start.checked_add(size).ok_or_else(truncated)?;
    buf.get(start..end).ok_or_else(truncated)
}

/// Decode UTF-16LE code units up to the first null unit or the end of `bytes`.
/// Unpaired surrogates become U+FFFD.  `offset` is only used for diagnostics.
pub fn decode_utf16(bytes: &[u8], offset: usize) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0);
    let mut lossy = false;
    let text: String = char::decode_utf16(units)
        .map(|r| {
            r.unwrap_or_else(|_| {
                lossy = true;
                char::REPLACEMENT_CHARACTER
            })
        })
        .collect();
    if lossy {
        warn!("invalid UTF-16 in string at offset {:#x}", offset);
    }
    text
}

/// Read `count` directory strings starting at `offset`.
///
/// Each entry is a u16 character count, the characters, and a null unit.
/// No entry may start at or past `block_end`; an entry whose declared length
/// runs past `block_end` is cut at the block end.
pub fn read_directory_strings(
    buf:       &[u8],
    offset:    usize,
    count:     u32,
    block_end: usize,
) -> Result<Vec<String>, ParseError> {
    let block_end = block_end.min(buf.len());
    let mut strings = Vec::with_capacity((count as usize).min(buf.len() / 4));
    let mut pos = offset;

    for _ in 0..count {
        let text_start = match pos.checked_add(2) {
            Some(start) if start <= block_end => start,
            _ => {
                return Err(ParseError::StringDecode {
                    offset:    pos,
                    available: block_end.saturating_sub(pos),
                })
            }
        };
        let chars = usize::from(u16::from_le_bytes([buf[pos], buf[pos + 1]]));
        let text_end = text_start + chars * 2;
        let clipped = text_end.min(block_end);
        if clipped < text_end {
            warn!("directory string at {:#x} runs past the end of its block", pos);
        }
        strings.push(decode_utf16(&buf[text_start..clipped], text_start));
        pos = text_end + 2;
    }
    Ok(strings)
}

/// Split a block of null-terminated UTF-16LE strings.  The last string may
/// be terminated by the end of the block instead; empty entries are skipped.
pub fn split_string_block(block: &[u8], base: usize) -> Vec<String> {
    let mut strings = Vec::new();
    let mut start = 0usize;
    while start + 2 <= block.len() {
        let rest = &block[start..];
        let end = rest
            .chunks_exact(2)
            .position(|unit| unit == [0, 0])
            .map(|i| i * 2)
            .unwrap_or(rest.len() & !1);
        if end > 0 {
            strings.push(decode_utf16(&rest[..end], base + start));
        }
        start += end + 2;
    }
    strings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    fn dir_entry(s: &str) -> Vec<u8> {
        let mut out = (s.encode_utf16().count() as u16).to_le_bytes().to_vec();
        out.extend(utf16(s));
        out.extend([0, 0]);
        out
    }

    #[test]
    fn slice_at_checks_bounds() {
        let buf = [1u8, 2, 3, 4];
        assert_eq!(slice_at(&buf, 1, 2, "x").unwrap(), &[2, 3]);
        assert_eq!(slice_at(&buf, 4, 0, "x").unwrap(), &[] as &[u8]);
        assert_eq!(
            slice_at(&buf, 3, 2, "field"),
            Err(ParseError::Truncated { what: "field", offset: 3, len: 2, available: 4 })
        );
        assert!(slice_at(&buf, u64::MAX, 2, "x").is_err());
    }

    #[test]
    fn decode_stops_at_null() {
        let mut bytes = utf16("NTDLL.DLL");
        bytes.extend([0, 0, b'X', 0]);
        assert_eq!(decode_utf16(&bytes, 0), "NTDLL.DLL");
    }

    #[test]
    fn decode_replaces_unpaired_surrogates() {
        let bytes = [0x00, 0xD8, b'a', 0x00];
        assert_eq!(decode_utf16(&bytes, 0), "\u{FFFD}a");
    }

    #[test]
    fn reads_length_prefixed_directories() {
        let mut buf = vec![0xEE; 4];
        buf.extend(dir_entry("\\VOLUME{01}\\WINDOWS"));
        buf.extend(dir_entry("\\VOLUME{01}\\WINDOWS\\SYSTEM32"));
        let end = buf.len();
        let dirs = read_directory_strings(&buf, 4, 2, end).unwrap();
        assert_eq!(dirs, vec!["\\VOLUME{01}\\WINDOWS", "\\VOLUME{01}\\WINDOWS\\SYSTEM32"]);
    }

    #[test]
    fn directory_offset_at_buffer_end_is_string_error() {
        let buf = dir_entry("C");
        let len = buf.len();
        assert_eq!(
            read_directory_strings(&buf, len, 1, len),
            Err(ParseError::StringDecode { offset: len, available: 0 })
        );
    }

    #[test]
    fn overlong_directory_is_cut_at_block_end() {
        let mut buf = 40u16.to_le_bytes().to_vec();
        buf.extend(utf16("ABC"));
        let end = buf.len();
        assert_eq!(read_directory_strings(&buf, 0, 1, end).unwrap(), vec!["ABC"]);
        assert!(read_directory_strings(&buf, 0, 2, end).is_err());
    }

    #[test]
    fn splits_string_block() {
        let mut block = utf16("A.DLL");
        block.extend([0, 0]);
        block.extend(utf16("B.DLL"));
        block.extend([0, 0, 0, 0]);
        block.extend(utf16("TAIL"));
        assert_eq!(split_string_block(&block, 0), vec!["A.DLL", "B.DLL", "TAIL"]);
    }
}
