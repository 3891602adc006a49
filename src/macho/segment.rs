//! `LC_SEGMENT_64` decoding: segment header plus its trailing sections
use crate::byte_reader::{ByteReader, Endian};
use crate::entropy::shannon_entropy;
use crate::error::MachpError;
use serde::Serialize;

const SEGMENT_HEADER_SIZE: usize = 72;
const SECTION_SIZE: usize = 80;

#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub sectname: String,
    pub segname: String,
    pub addr: u64,
    pub size: u64,
    pub offset: u32,
    pub align: u32,
    pub reloff: u32,
    pub nreloc: u32,
    pub flags: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub segname: String,
    pub vmaddr: u64,
    pub vmsize: u64,
    pub fileoff: u64,
    pub filesize: u64,
    pub maxprot: i32,
    pub initprot: i32,
    pub nsects: u32,
    pub flags: u32,
    pub sections: Vec<Section>,
    /// Shannon entropy of `[fileoff, fileoff+filesize)`, when that range is
    /// non-empty and falls within the slice. `None` otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entropy: Option<f64>,
}

impl Segment {
    /// Decodes the segment command at `cmd_offset` (the start of the 8-byte
    /// `cmd`/`cmdsize` pair), reading the 72-byte body and `nsects` trailing
    /// 80-byte section records, then computing payload entropy.
    pub fn decode(reader: &ByteReader, cmd_offset: usize, endian: Endian) -> Result<Self, MachpError> {
        let body = cmd_offset + 8;
        let segname = reader.read_fixed_ascii(body, 16)?;
        let vmaddr = reader.read_u64(body + 16, endian)?;
        let vmsize = reader.read_u64(body + 24, endian)?;
        let fileoff = reader.read_u64(body + 32, endian)?;
        let filesize = reader.read_u64(body + 40, endian)?;
        let maxprot = reader.read_i32(body + 48, endian)?;
        let initprot = reader.read_i32(body + 52, endian)?;
        let nsects = reader.read_u32(body + 56, endian)?;
        let flags = reader.read_u32(body + 60, endian)?;

        // nsects is an attacker-controlled 32-bit count; clamp the
        // pre-allocation hint to what could actually fit in the remaining
        // buffer rather than trusting it directly
        let cursor_start = body + SEGMENT_HEADER_SIZE - 8;
        let max_records = reader
            .len()
            .saturating_sub(cursor_start)
            .checked_div(SECTION_SIZE)
            .unwrap_or(0);
        let mut sections = Vec::with_capacity((nsects as usize).min(max_records));
        let mut cursor = cursor_start;
        for i in 0..nsects {
            if cursor + SECTION_SIZE > reader.len() {
                return Err(MachpError::Parsing(format!(
                    "section {i} of segment {segname:?} exceeds slice bounds at offset {cursor}"
                )));
            }
            let sectname = reader.read_fixed_ascii(cursor, 16)?;
            let secsegname = reader.read_fixed_ascii(cursor + 16, 16)?;
            let addr = reader.read_u64(cursor + 32, endian)?;
            let size = reader.read_u64(cursor + 40, endian)?;
            let offset = reader.read_u32(cursor + 48, endian)?;
            let align = reader.read_u32(cursor + 52, endian)?;
            let reloff = reader.read_u32(cursor + 56, endian)?;
            let nreloc = reader.read_u32(cursor + 60, endian)?;
            let secflags = reader.read_u32(cursor + 64, endian)?;
            sections.push(Section {
                sectname,
                segname: secsegname,
                addr,
                size,
                offset,
                align,
                reloff,
                nreloc,
                flags: secflags,
            });
            cursor += SECTION_SIZE;
        }

        let entropy = if filesize > 0 {
            let start = fileoff as usize;
            let end = start.checked_add(filesize as usize);
            match end {
                Some(end) if end <= reader.len() => {
                    reader.slice(start, filesize as usize).ok().map(shannon_entropy)
                }
                _ => None,
            }
        } else {
            None
        };

        Ok(Self {
            segname,
            vmaddr,
            vmsize,
            fileoff,
            filesize,
            maxprot,
            initprot,
            nsects,
            flags,
            sections,
            entropy,
        })
    }
}
