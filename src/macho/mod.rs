//! Mach-O decoding pipeline: fat dispatch -> per-slice header/load-command/
//! segment/symbol/code-signature decode
pub mod dylib;
pub mod dysymtab;
pub mod fat;
pub mod header;
pub mod load_command;
pub mod segment;
pub mod symtab;

use crate::byte_reader::ByteReader;
use crate::codesign::{self, CodeSignature};
use crate::error::MachpError;
use dylib::DylibRef;
use dysymtab::Dysymtab;
use header::Header;
use load_command::LoadCommand;
use segment::Segment;
use symtab::Symtab;

/// One fully-decoded thin Mach-O image, addressed within its enclosing file
/// at `[offset, offset+size)`.
pub struct DecodedSlice<'a> {
    pub offset: u64,
    pub size: u64,
    pub align: u32,
    pub bytes: &'a [u8],
    pub header: Header,
    pub commands: Vec<LoadCommand>,
    pub segments: Vec<Segment>,
    pub dylibs: Vec<DylibRef>,
    pub symtab: Option<Symtab>,
    pub dysymtab: Option<Dysymtab>,
    pub code_signature: Option<CodeSignature>,
}

/// Decodes the thin 64-bit Mach-O image occupying `[offset, offset+size)`
/// of `file`.
pub fn decode_slice(file: &[u8], offset: u64, size: u64, align: u32) -> Result<DecodedSlice<'_>, MachpError> {
    let end = offset
        .checked_add(size)
        .ok_or_else(|| MachpError::Parsing("slice bounds overflow".to_string()))?;
    if end as usize > file.len() {
        return Err(MachpError::Parsing(format!(
            "slice [{offset}, {end}) exceeds file length {}",
            file.len()
        )));
    }
    let bytes = &file[offset as usize..end as usize];
    let reader = ByteReader::new(bytes);

    let header = Header::decode(&reader, 0)?;
    let walk = load_command::walk(
        &reader,
        header::HEADER_SIZE,
        header.ncmds,
        header.sizeofcmds,
        header.endian(),
    )?;

    let code_signature = match walk.code_signature {
        Some((dataoff, datasize)) => {
            Some(codesign::decode(&reader, dataoff as usize, datasize as usize)?)
        }
        None => None,
    };

    Ok(DecodedSlice {
        offset,
        size,
        align,
        bytes,
        header,
        commands: walk.commands,
        segments: walk.segments,
        dylibs: walk.dylibs,
        symtab: walk.symtab,
        dysymtab: walk.dysymtab,
        code_signature,
    })
}

/// Splits `file` into its constituent slices (via the fat dispatcher) and
/// fully decodes each one. Returns `(is_fat, slices)`.
pub fn decode_file(file: &[u8]) -> Result<(bool, Vec<DecodedSlice<'_>>), MachpError> {
    let reader = ByteReader::new(file);
    let archs = fat::dispatch(&reader)?;
    let is_fat = archs.len() != 1 || archs[0].offset != 0 || archs[0].size != file.len() as u64;

    let mut slices = Vec::with_capacity(archs.len());
    for arch in &archs {
        slices.push(decode_slice(file, arch.offset, arch.size, arch.align)?);
    }
    Ok((is_fat, slices))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_thin_image() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&header::MH_MAGIC_64.to_be_bytes());
        buf.extend_from_slice(&0x0100_000cu32.to_le_bytes()); // cputype ARM64
        buf.extend_from_slice(&0u32.to_le_bytes()); // cpusubtype
        buf.extend_from_slice(&2u32.to_le_bytes()); // filetype EXECUTE
        buf.extend_from_slice(&0u32.to_le_bytes()); // ncmds
        buf.extend_from_slice(&0u32.to_le_bytes()); // sizeofcmds
        buf.extend_from_slice(&0u32.to_le_bytes()); // flags
        buf.extend_from_slice(&0u32.to_le_bytes()); // reserved
        buf
    }

    #[test]
    fn decodes_thin_image_as_single_slice() {
        let file = minimal_thin_image();
        let (is_fat, slices) = decode_file(&file).unwrap();
        assert!(!is_fat);
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].header.cputype_str, "ARM64");
        assert!(slices[0].code_signature.is_none());
    }
}
