//! `LC_SYMTAB`/`LC_DYSYMTAB`: nlist_64 symbol table decoding
use crate::byte_reader::{ByteReader, Endian};
use crate::error::MachpError;
use serde::Serialize;

const NLIST_64_SIZE: usize = 16;

const N_STAB: u8 = 0xe0;
const N_PEXT: u8 = 0x10;
const N_TYPE: u8 = 0x0e;
const N_EXT: u8 = 0x01;

const N_UNDF: u8 = 0x0;
const N_ABS: u8 = 0x2;
const N_SECT: u8 = 0xe;
const N_PBUD: u8 = 0xc;
const N_INDR: u8 = 0xa;

const N_WEAK_REF: u16 = 0x0040;
const N_WEAK_DEF: u16 = 0x0080;

#[derive(Debug, Clone, Serialize)]
pub struct Symbol {
    pub name: String,
    pub n_type: u8,
    pub n_sect: u8,
    pub n_desc: u16,
    pub n_value: u64,
    pub is_external: bool,
    pub is_debug: bool,
    pub is_weak_ref: bool,
    pub is_weak_def: bool,
    /// `true` when the symbol is undefined, external, and unbound
    /// (`n_value == 0`) — i.e. it is imported from elsewhere, per spec §3.
    pub is_imported: bool,
    /// `true` when the symbol is externally visible and its type is not
    /// `N_UNDF`, per spec §3's literal bit formula.
    pub is_exported: bool,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct Symtab {
    pub symbols: Vec<Symbol>,
}

/// Decodes `nsyms` nlist_64 records at `symoff`, resolving names against the
/// string table at `[stroff, stroff+strsize)`.
pub fn decode(
    reader: &ByteReader,
    symoff: u32,
    nsyms: u32,
    stroff: u32,
    strsize: u32,
    endian: Endian,
) -> Result<Symtab, MachpError> {
    // nsyms is an attacker-controlled 32-bit count; clamp the pre-allocation
    // hint to what could actually fit in the remaining buffer so a truncated
    // or malicious file cannot force a multi-gigabyte allocation up front
    let max_records = reader
        .len()
        .saturating_sub(symoff as usize)
        .checked_div(NLIST_64_SIZE)
        .unwrap_or(0);
    let mut symbols = Vec::with_capacity((nsyms as usize).min(max_records));
    let str_end = (stroff as usize)
        .checked_add(strsize as usize)
        .ok_or_else(|| MachpError::Parsing("string table bounds overflow".to_string()))?;
    if str_end > reader.len() {
        return Err(MachpError::Parsing(format!(
            "string table [{stroff}, {str_end}) exceeds slice bounds"
        )));
    }

    let mut cursor = symoff as usize;
    for i in 0..nsyms {
        if cursor + NLIST_64_SIZE > reader.len() {
            return Err(MachpError::Parsing(format!(
                "nlist_64 record {i} at offset {cursor} exceeds slice bounds"
            )));
        }
        let n_strx = reader.read_u32(cursor, endian)?;
        let n_type = reader.read_u8(cursor + 4)?;
        let n_sect = reader.read_u8(cursor + 5)?;
        let n_desc = reader.read_u16(cursor + 6, endian)?;
        let n_value = reader.read_u64(cursor + 8, endian)?;

        let name_off = stroff as usize + n_strx as usize;
        let name = if n_strx == 0 || name_off >= str_end {
            String::new()
        } else {
            reader.read_nul_terminated(name_off, str_end - name_off)?
        };

        let is_debug = n_type & N_STAB != 0;
        let is_external = n_type & N_EXT != 0;
        let basic_type = n_type & N_TYPE;
        let is_imported = !is_debug && basic_type == N_UNDF && is_external && n_value == 0;
        let is_exported = !is_debug && is_external && basic_type != N_UNDF;

        symbols.push(Symbol {
            name,
            n_type,
            n_sect,
            n_desc,
            n_value,
            is_external,
            is_debug,
            is_weak_ref: n_desc & N_WEAK_REF != 0,
            is_weak_def: n_desc & N_WEAK_DEF != 0,
            is_imported,
            is_exported,
        });
        cursor += NLIST_64_SIZE;
    }

    Ok(Symtab { symbols })
}

// keep the unused constants documented/visible for the classification above
#[allow(dead_code)]
const N_ABS_DOC: u8 = N_ABS;
#[allow(dead_code)]
const N_SECT_DOC: u8 = N_SECT;
#[allow(dead_code)]
const N_PEXT_DOC: u8 = N_PEXT;
#[allow(dead_code)]
const N_PBUD_DOC: u8 = N_PBUD;
#[allow(dead_code)]
const N_INDR_DOC: u8 = N_INDR;
