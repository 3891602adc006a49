//! `LC_DYSYMTAB`: 18 fixed `u32` fields describing the dynamic symbol table layout
use crate::byte_reader::{ByteReader, Endian};
use crate::error::MachpError;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Dysymtab {
    pub ilocalsym: u32,
    pub nlocalsym: u32,
    pub iextdefsym: u32,
    pub nextdefsym: u32,
    pub iundefsym: u32,
    pub nundefsym: u32,
    pub tocoff: u32,
    pub ntoc: u32,
    pub modtaboff: u32,
    pub nmodtab: u32,
    pub extrefsymoff: u32,
    pub nextrefsyms: u32,
    pub indirectsymoff: u32,
    pub nindirectsyms: u32,
    pub extreloff: u32,
    pub nextrel: u32,
    pub locreloff: u32,
    pub nlocrel: u32,
}

/// Decodes the 18 `u32` fields following the 8-byte `cmd`/`cmdsize` header.
pub fn decode(reader: &ByteReader, cmd_offset: usize, endian: Endian) -> Result<Dysymtab, MachpError> {
    let body = cmd_offset + 8;
    let mut fields = [0u32; 18];
    for (i, f) in fields.iter_mut().enumerate() {
        *f = reader.read_u32(body + i * 4, endian)?;
    }
    Ok(Dysymtab {
        ilocalsym: fields[0],
        nlocalsym: fields[1],
        iextdefsym: fields[2],
        nextdefsym: fields[3],
        iundefsym: fields[4],
        nundefsym: fields[5],
        tocoff: fields[6],
        ntoc: fields[7],
        modtaboff: fields[8],
        nmodtab: fields[9],
        extrefsymoff: fields[10],
        nextrefsyms: fields[11],
        indirectsymoff: fields[12],
        nindirectsyms: fields[13],
        extreloff: fields[14],
        nextrel: fields[15],
        locreloff: fields[16],
        nlocrel: fields[17],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_eighteen_fields_in_order() {
        let mut buf = vec![0u8; 8];
        for i in 0..18u32 {
            buf.extend_from_slice(&(i + 1).to_le_bytes());
        }
        let r = ByteReader::new(&buf);
        let dys = decode(&r, 0, Endian::Little).unwrap();
        assert_eq!(dys.ilocalsym, 1);
        assert_eq!(dys.nlocrel, 18);
    }
}
