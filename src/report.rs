//! Typed report model fed to the JSON serializer
use crate::codesign::CodeSignature;
use crate::digest::sha256_hex;
use crate::entropy::shannon_entropy;
use crate::error::MachpError;
use crate::macho::dylib::DylibRef;
use crate::macho::dysymtab::Dysymtab;
use crate::macho::header::{cpu_type_name, file_type_name};
use crate::macho::load_command::LoadCommand;
use crate::macho::segment::Segment;
use crate::macho::symtab::Symtab;
use crate::macho::{self, DecodedSlice};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HeaderReport {
    pub magic: u32,
    pub cputype: u32,
    pub cputype_str: &'static str,
    pub cpusubtype: u32,
    pub filetype: u32,
    pub filetype_str: &'static str,
    pub ncmds: u32,
    pub sizeofcmds: u32,
    pub flags: u32,
    pub flags_decoded: Vec<&'static str>,
    pub load_commands: Vec<LoadCommand>,
    pub segments: Vec<Segment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_signature: Option<CodeSignature>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SliceReport {
    pub offset: u64,
    pub size: u64,
    pub cputype: u32,
    pub cputype_str: &'static str,
    pub cpusubtype: u32,
    pub align: u32,
    pub sha256: String,
    pub entropy: f64,
    pub header: HeaderReport,
    pub dylibs: Vec<DylibRef>,
    pub imported_symbols: Vec<String>,
    pub num_imported_symbols: usize,
    pub exports: Vec<String>,
    pub num_exports: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symtab: Option<Symtab>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dysymtab: Option<Dysymtab>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileReport {
    pub file_path: String,
    pub file_size: u64,
    pub entropy: f64,
    pub fat: bool,
    pub parsed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slices: Option<Vec<SliceReport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_slice: Option<SliceReport>,
    pub dylibs: Vec<DylibRef>,
    pub imported_symbols: Vec<String>,
    pub num_imported_symbols: usize,
    pub exports: Vec<String>,
    pub num_exports: usize,
}

fn slice_report(slice: &DecodedSlice<'_>) -> SliceReport {
    let mut imported: Vec<String> = Vec::new();
    let mut exported: Vec<String> = Vec::new();
    if let Some(symtab) = &slice.symtab {
        for sym in &symtab.symbols {
            if sym.is_imported && !sym.name.is_empty() {
                imported.push(sym.name.clone());
            }
            if sym.is_exported && !sym.name.is_empty() {
                exported.push(sym.name.clone());
            }
        }
    }
    imported.sort();
    imported.dedup();
    exported.sort();
    exported.dedup();

    SliceReport {
        offset: slice.offset,
        size: slice.size,
        cputype: slice.header.cputype,
        cputype_str: cpu_type_name(slice.header.cputype),
        cpusubtype: slice.header.cpusubtype,
        align: slice.align,
        sha256: sha256_hex(slice.bytes),
        entropy: shannon_entropy(slice.bytes),
        header: HeaderReport {
            magic: slice.header.magic,
            cputype: slice.header.cputype,
            cputype_str: slice.header.cputype_str,
            cpusubtype: slice.header.cpusubtype,
            filetype: slice.header.filetype,
            filetype_str: file_type_name(slice.header.filetype),
            ncmds: slice.header.ncmds,
            sizeofcmds: slice.header.sizeofcmds,
            flags: slice.header.flags,
            flags_decoded: slice.header.flags_decoded.clone(),
            load_commands: slice.commands.clone(),
            segments: slice.segments.clone(),
            code_signature: slice.code_signature.clone(),
        },
        dylibs: slice.dylibs.clone(),
        imported_symbols: imported.clone(),
        num_imported_symbols: imported.len(),
        exports: exported.clone(),
        num_exports: exported.len(),
        symtab: slice.symtab.clone(),
        dysymtab: slice.dysymtab.clone(),
    }
}

/// Decodes `file_bytes` (the full contents of `file_path`) into the
/// top-level report model.
pub fn build(file_path: &str, file_bytes: &[u8]) -> Result<FileReport, MachpError> {
    let (is_fat, slices) = macho::decode_file(file_bytes)?;

    let reports: Vec<SliceReport> = slices.iter().map(slice_report).collect();

    let mut dylib_seen = BTreeSet::new();
    let mut dylibs = Vec::new();
    for r in &reports {
        for d in &r.dylibs {
            if dylib_seen.insert(d.name.clone()) {
                dylibs.push(d.clone());
            }
        }
    }

    let mut imported: BTreeSet<String> = BTreeSet::new();
    let mut exported: BTreeSet<String> = BTreeSet::new();
    for r in &reports {
        imported.extend(r.imported_symbols.iter().cloned());
        exported.extend(r.exports.iter().cloned());
    }
    let imported: Vec<String> = imported.into_iter().collect();
    let exported: Vec<String> = exported.into_iter().collect();

    let (slices_field, header_slice_field) = if is_fat {
        (Some(reports), None)
    } else {
        (None, reports.into_iter().next())
    };

    Ok(FileReport {
        file_path: file_path.to_string(),
        file_size: file_bytes.len() as u64,
        entropy: shannon_entropy(file_bytes),
        fat: is_fat,
        parsed: true,
        slices: slices_field,
        header_slice: header_slice_field,
        imported_symbols: imported.clone(),
        num_imported_symbols: imported.len(),
        exports: exported.clone(),
        num_exports: exported.len(),
        dylibs,
    })
}
