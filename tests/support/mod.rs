//! Test-only helpers: a reference Xpress Huffman encoder and a builder for
//! version 31 prefetch records.
#![allow(dead_code)]

use std::collections::HashMap;

use pfdecode::container::{ContainerHeader, MAGIC};

pub const TABLE_BYTES: usize = 256;
pub const BLOCK_OUTPUT_SIZE: usize = 64 * 1024;
const MIN_MATCH: usize = 3;
const MAX_MATCH: usize = 0xFFFF + MIN_MATCH;
const MAX_DISTANCE: usize = 0xFFFF;

// ── Encoder ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Literal(u8),
    Match { length: usize, distance: usize },
}

enum Event {
    Bits { count: u32, value: u32 },
    Byte(u8),
}

enum Slot {
    Word(usize),
    Byte(u8),
}

/// Encode one block.  Every symbol uses a 9-bit code equal to its index,
/// so the table is 256 bytes of `0x99`.
pub fn encode_block(tokens: &[Token]) -> Vec<u8> {
    let mut events = Vec::new();
    for token in tokens {
        match *token {
            Token::Literal(b) => events.push(Event::Bits { count: 9, value: u32::from(b) }),
            Token::Match { length, distance } => {
                assert!((MIN_MATCH..=MAX_MATCH).contains(&length));
                assert!((1..=MAX_DISTANCE).contains(&distance));
                let m = length - MIN_MATCH;
                let offset_bits = usize::BITS - 1 - distance.leading_zeros();
                let field = m.min(15) as u32;
                events.push(Event::Bits { count: 9, value: 256 + (offset_bits << 4) + field });
                if m >= 15 {
                    if m - 15 < 255 {
                        events.push(Event::Byte((m - 15) as u8));
                    } else {
                        events.push(Event::Byte(255));
                        events.push(Event::Byte(m as u8));
                        events.push(Event::Byte((m >> 8) as u8));
                    }
                }
                events.push(Event::Bits {
                    count: offset_bits,
                    value: (distance - (1 << offset_bits)) as u32,
                });
            }
        }
    }

    // Mirror the decoder's refill schedule: two words up front, one more
    // whenever fewer than 16 bits stay buffered; raw bytes sit wherever the
    // decoder's byte cursor is when it asks for them.
    let mut bits: Vec<bool> = Vec::new();
    let mut layout = vec![Slot::Word(0), Slot::Word(1)];
    let mut fetched = 2usize;
    for event in events {
        match event {
            Event::Bits { count, value } => {
                bits.extend((0..count).rev().map(|i| (value >> i) & 1 == 1));
                if fetched * 16 - bits.len() < 16 {
                    layout.push(Slot::Word(fetched));
                    fetched += 1;
                }
            }
            Event::Byte(b) => layout.push(Slot::Byte(b)),
        }
    }
    bits.resize(fetched * 16, false);

    let mut out = vec![0x99u8; TABLE_BYTES];
    for slot in layout {
        match slot {
            Slot::Byte(b) => out.push(b),
            Slot::Word(k) => {
                let word = bits[k * 16..k * 16 + 16]
                    .iter()
                    .fold(0u16, |w, &bit| (w << 1) | u16::from(bit));
                out.extend_from_slice(&word.to_le_bytes());
            }
        }
    }
    out
}

/// Greedy LZ77 parse of `data[start..end]`.  Matches may reach back before
/// `start` but never run past `end`.
pub fn tokenize(data: &[u8], start: usize, end: usize) -> Vec<Token> {
    let mut recent: HashMap<[u8; 3], usize> = HashMap::new();
    for i in start.saturating_sub(MAX_DISTANCE)..start {
        if i + 3 <= data.len() {
            recent.insert([data[i], data[i + 1], data[i + 2]], i);
        }
    }

    let mut tokens = Vec::new();
    let mut i = start;
    while i < end {
        let mut matched = None;
        if i + MIN_MATCH <= end {
            let key = [data[i], data[i + 1], data[i + 2]];
            if let Some(&cand) = recent.get(&key) {
                let distance = i - cand;
                if distance <= MAX_DISTANCE {
                    let limit = (end - i).min(MAX_MATCH);
                    let mut length = 0;
                    while length < limit && data[cand + length] == data[i + length] {
                        length += 1;
                    }
                    if length >= MIN_MATCH {
                        matched = Some((length, distance));
                    }
                }
            }
        }
        let step = match matched {
            Some((length, distance)) => {
                tokens.push(Token::Match { length, distance });
                length
            }
            None => {
                tokens.push(Token::Literal(data[i]));
                1
            }
        };
        for j in i..i + step {
            if j + 3 <= data.len() {
                recent.insert([data[j], data[j + 1], data[j + 2]], j);
            }
        }
        i += step;
    }
    tokens
}

/// Compress `data` into a raw Xpress Huffman stream, one block per 64 KiB.
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for start in (0..data.len()).step_by(BLOCK_OUTPUT_SIZE) {
        let end = (start + BLOCK_OUTPUT_SIZE).min(data.len());
        out.extend(encode_block(&tokenize(data, start, end)));
    }
    out
}

/// Wrap `data` in an unflagged `MAM\x04` container.
pub fn container(data: &[u8]) -> Vec<u8> {
    let header = ContainerHeader {
        magic:             *MAGIC,
        decompressed_size: data.len() as u32,
        checksum:          None,
    };
    let mut out = Vec::new();
    header.write_to(&mut out).unwrap();
    out.extend(compress(data));
    out
}

/// Low-entropy pseudo-random bytes, so both literals and matches occur.
pub fn sample_data(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            b"pfdecode-"[(state % 9) as usize]
        })
        .collect()
}

// ── Record builder ────────────────────────────────────────────────────────────

pub const RECORD_HEADER_SIZE: usize = 84;
pub const FILE_INFO_OFFSET: usize = 84;
pub const FILE_INFO_SIZE: usize = 212;
pub const VOLUME_ENTRY_SIZE: usize = 96;

#[derive(Debug, Clone)]
pub struct VolumeSpec {
    pub device_path:   String,
    pub serial_number: u32,
    pub creation_time: u64,
    pub directories:   Vec<String>,
}

/// Builds a version 31 `SCCA` record.
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    pub executable_name: String,
    pub prefetch_hash:   u32,
    pub run_count:       u32,
    pub last_run_times:  Vec<u64>,
    pub filenames:       Vec<String>,
    pub volumes:         Vec<VolumeSpec>,
}

impl RecordBuilder {
    pub fn new(executable_name: &str, prefetch_hash: u32) -> Self {
        Self {
            executable_name: executable_name.to_owned(),
            prefetch_hash,
            ..Default::default()
        }
    }

    pub fn run(mut self, filetime: u64) -> Self {
        self.last_run_times.push(filetime);
        self.run_count += 1;
        self
    }

    pub fn file(mut self, name: &str) -> Self {
        self.filenames.push(name.to_owned());
        self
    }

    pub fn volume(mut self, device_path: &str, serial_number: u32, creation_time: u64, dirs: &[&str]) -> Self {
        self.volumes.push(VolumeSpec {
            device_path: device_path.to_owned(),
            serial_number,
            creation_time,
            directories: dirs.iter().map(|d| (*d).to_owned()).collect(),
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut buf = vec![0u8; RECORD_HEADER_SIZE + FILE_INFO_SIZE];

        let filenames_offset = buf.len();
        for name in &self.filenames {
            buf.extend(utf16z(name));
        }
        let filenames_size = buf.len() - filenames_offset;

        let volumes_offset = buf.len();
        buf.resize(volumes_offset + self.volumes.len() * VOLUME_ENTRY_SIZE, 0);
        for (i, volume) in self.volumes.iter().enumerate() {
            let path_rel = buf.len() - volumes_offset;
            buf.extend(utf16z(&volume.device_path));
            let dirs_rel = buf.len() - volumes_offset;
            for dir in &volume.directories {
                buf.extend((dir.encode_utf16().count() as u16).to_le_bytes());
                buf.extend(utf16z(dir));
            }

            let e = volumes_offset + i * VOLUME_ENTRY_SIZE;
            put_u32(&mut buf, e, path_rel as u32);
            put_u32(&mut buf, e + 4, volume.device_path.encode_utf16().count() as u32);
            put_u64(&mut buf, e + 8, volume.creation_time);
            put_u32(&mut buf, e + 16, volume.serial_number);
            put_u32(&mut buf, e + 28, dirs_rel as u32);
            put_u32(&mut buf, e + 32, volume.directories.len() as u32);
        }
        let volumes_size = buf.len() - volumes_offset;

        put_u32(&mut buf, 0, 31);
        buf[4..8].copy_from_slice(b"SCCA");
        put_u32(&mut buf, 8, 0x11);
        let total = buf.len() as u32;
        put_u32(&mut buf, 12, total);
        let name: Vec<u8> = self.executable_name.encode_utf16().take(29).flat_map(|u| u.to_le_bytes()).collect();
        buf[16..16 + name.len()].copy_from_slice(&name);
        put_u32(&mut buf, 76, self.prefetch_hash);

        let fi = FILE_INFO_OFFSET;
        put_u32(&mut buf, fi, filenames_offset as u32);
        put_u32(&mut buf, fi + 8, filenames_offset as u32);
        put_u32(&mut buf, fi + 16, filenames_offset as u32);
        put_u32(&mut buf, fi + 20, filenames_size as u32);
        put_u32(&mut buf, fi + 24, volumes_offset as u32);
        put_u32(&mut buf, fi + 28, self.volumes.len() as u32);
        put_u32(&mut buf, fi + 32, volumes_size as u32);
        for (slot, &t) in self.last_run_times.iter().take(8).enumerate() {
            put_u64(&mut buf, fi + 44 + slot * 8, t);
        }
        put_u32(&mut buf, fi + 116, self.run_count);
        buf
    }
}

pub fn utf16z(s: &str) -> Vec<u8> {
    let mut out: Vec<u8> = s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
    out.extend([0, 0]);
    out
}

pub fn get_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(buf[at..at + 4].try_into().unwrap())
}

pub fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn put_u64(buf: &mut [u8], at: usize, value: u64) {
    buf[at..at + 8].copy_from_slice(&value.to_le_bytes());
}
