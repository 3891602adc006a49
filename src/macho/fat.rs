//! Fat/universal archive dispatch
use crate::byte_reader::{ByteReader, Endian};
use crate::error::MachpError;
use crate::macho::header::{MH_CIGAM_64, MH_MAGIC_64};

pub const FAT_MAGIC: u32 = 0xcafe_babe;
pub const FAT_MAGIC_64: u32 = 0xcafe_babf;

const CPU_ARCH_ABI64: u32 = 0x0100_0000;

/// One arch entry's location within the fat archive
#[derive(Debug, Clone, Copy)]
pub struct FatArch {
    pub cputype: u32,
    pub cpusubtype: u32,
    pub offset: u64,
    pub size: u64,
    pub align: u32,
}

/// Splits `data` into its constituent Mach-O slices.
///
/// Three cases:
/// - `FAT_MAGIC`/`FAT_MAGIC_64`: walk the fat-arch table, big-endian,
///   yielding one `FatArch` per entry whose `cputype` has the 64-bit ABI
///   bit set; other entries are enumerated but skipped.
/// - A bare `MH_MAGIC_64`/`MH_CIGAM_64`: the whole file is a single thin
///   64-bit slice.
/// - Anything else: `InvalidFormat`.
pub fn dispatch(reader: &ByteReader) -> Result<Vec<FatArch>, MachpError> {
    if reader.len() < 4 {
        return Err(MachpError::InvalidFormat("file too small to contain a magic".to_string()));
    }
    let magic = reader.read_u32(0, Endian::Big)?;
    match magic {
        FAT_MAGIC | FAT_MAGIC_64 => dispatch_fat(reader, magic),
        MH_MAGIC_64 | MH_CIGAM_64 => Ok(vec![FatArch {
            cputype: 0,
            cpusubtype: 0,
            offset: 0,
            size: reader.len() as u64,
            align: 0,
        }]),
        other => Err(MachpError::InvalidFormat(format!(
            "unrecognized file magic 0x{other:08x}"
        ))),
    }
}

fn dispatch_fat(reader: &ByteReader, magic: u32) -> Result<Vec<FatArch>, MachpError> {
    let wide = magic == FAT_MAGIC_64;
    let nfat_arch = reader.read_u32(4, Endian::Big)?;
    let entry_size = if wide { 32 } else { 20 };
    // nfat_arch is an attacker-controlled 32-bit count; clamp the
    // pre-allocation hint to what could actually fit in the remaining
    // buffer rather than trusting it directly
    let max_records = reader.len().saturating_sub(8).checked_div(entry_size).unwrap_or(0);
    let mut archs = Vec::with_capacity((nfat_arch as usize).min(max_records));
    let mut cursor = 8usize;

    for i in 0..nfat_arch {
        if cursor + entry_size > reader.len() {
            return Err(MachpError::Parsing(format!(
                "fat-arch entry {i} at offset {cursor} exceeds file bounds"
            )));
        }
        let cputype = reader.read_u32(cursor, Endian::Big)?;
        let cpusubtype = reader.read_u32(cursor + 4, Endian::Big)?;
        let (offset, size, align) = if wide {
            let offset = reader.read_u64(cursor + 8, Endian::Big)?;
            let size = reader.read_u64(cursor + 16, Endian::Big)?;
            let align = reader.read_u32(cursor + 24, Endian::Big)?;
            (offset, size, align)
        } else {
            let offset = reader.read_u32(cursor + 8, Endian::Big)? as u64;
            let size = reader.read_u32(cursor + 12, Endian::Big)? as u64;
            let align = reader.read_u32(cursor + 16, Endian::Big)?;
            (offset, size, align)
        };
        cursor += entry_size;

        // Only 64-bit-ABI slices are descended into; others are enumerated
        // but skipped, per spec's fat-dispatcher policy.
        if cputype & CPU_ARCH_ABI64 == 0 {
            continue;
        }

        let in_bounds = offset
            .checked_add(size)
            .is_some_and(|end| end as usize <= reader.len());
        if !in_bounds {
            return Err(MachpError::Parsing(format!(
                "fat-arch entry {i} declares slice [{offset}, {offset}+{size}) out of file bounds"
            )));
        }

        archs.push(FatArch {
            cputype,
            cpusubtype,
            offset,
            size,
            align,
        });
    }

    Ok(archs)
}
