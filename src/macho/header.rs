//! Mach-O 64-bit header decoding
use crate::byte_reader::{ByteReader, Endian};
use crate::error::MachpError;
use serde::Serialize;

pub const MH_MAGIC_64: u32 = 0xfeedfacf;
pub const MH_CIGAM_64: u32 = 0xcffaedfe;

/// `(bit, name)` table in fixed ascending bit-position order, per spec §4.2
const MH_FLAGS: &[(u32, &str)] = &[
    (0x1, "MH_NOUNDEFS"),
    (0x2, "MH_INCRLINK"),
    (0x4, "MH_DYLDLINK"),
    (0x8, "MH_BINDATLOAD"),
    (0x10, "MH_PREBOUND"),
    (0x20, "MH_SPLIT_SEGS"),
    (0x40, "MH_LAZY_INIT"),
    (0x80, "MH_TWOLEVEL"),
    (0x100, "MH_FORCE_FLAT"),
    (0x200, "MH_NOMULTIDEFS"),
    (0x400, "MH_NOFIXPREBINDING"),
    (0x800, "MH_PREBINDABLE"),
    (0x1000, "MH_ALLMODSBOUND"),
    (0x2000, "MH_SUBSECTIONS_VIA_SYMBOLS"),
    (0x4000, "MH_CANONICAL"),
    (0x8000, "MH_WEAK_DEFINES"),
    (0x10000, "MH_BINDS_TO_WEAK"),
    (0x20000, "MH_ALLOW_STACK_EXECUTION"),
    (0x40000, "MH_ROOT_SAFE"),
    (0x80000, "MH_SETUID_SAFE"),
    (0x100000, "MH_NO_REEXPORTED_DYLIBS"),
    (0x200000, "MH_PIE"),
    (0x400000, "MH_DEAD_STRIPPABLE_DYLIB"),
    (0x800000, "MH_HAS_TLV_DESCRIPTORS"),
    (0x1000000, "MH_NO_HEAP_EXECUTION"),
    (0x02000000, "MH_APP_EXTENSION_SAFE"),
    (0x04000000, "MH_NLIST_OUTOFSYNC_WITH_DYLDINFO"),
    (0x08000000, "MH_SIM_SUPPORT"),
    (0x80000000, "MH_DYLIB_IN_CACHE"),
];

/// Decodes `flags` against the fixed 29-entry mapping, in ascending bit order
pub fn decode_flags(flags: u32) -> Vec<&'static str> {
    MH_FLAGS
        .iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, name)| *name)
        .collect()
}

pub fn cpu_type_name(cputype: u32) -> &'static str {
    match cputype {
        1 => "VAX",
        6 => "MC680x0",
        7 => "I386",
        8 => "MIPS",
        10 => "MC98000",
        11 => "HPPA",
        12 => "ARM",
        13 => "MC88000",
        14 => "SPARC",
        15 => "I860",
        16 => "ALPHA",
        18 => "POWERPC",
        0x0100_0012 => "POWERPC64",
        0x0100_0007 => "X86_64",
        0x0100_000c => "ARM64",
        0x0200_000c => "ARM64_32",
        0xffff_ffff => "ANY",
        _ => "UNKNOWN",
    }
}

pub fn file_type_name(filetype: u32) -> &'static str {
    match filetype {
        0x1 => "OBJECT",
        0x2 => "EXECUTE",
        0x3 => "FVMLIB",
        0x4 => "CORE",
        0x5 => "PRELOAD",
        0x6 => "DYLIB",
        0x7 => "DYLINKER",
        0x8 => "BUNDLE",
        0x9 => "DYLIB_STUB",
        0xa => "DSYM",
        0xb => "KEXT_BUNDLE",
        0xc => "FILESET",
        0xd => "GPU_EXECUTE",
        0xe => "GPU_DYLIB",
        _ => "UNKNOWN",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Header {
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
    /// Not a wire field: derived from `magic`
    #[serde(skip)]
    pub big_endian: bool,
}

pub const HEADER_SIZE: usize = 32;

impl Header {
    /// Decodes the 32-byte header at `offset` within `reader`. Requires
    /// `offset + 32 <= reader.len()`. Only `MH_MAGIC_64`/`MH_CIGAM_64` magics
    /// are accepted; anything else is `InvalidFormat`.
    pub fn decode(reader: &ByteReader, offset: usize) -> Result<Self, MachpError> {
        let magic = reader.read_u32(offset, Endian::Big)?;
        let big_endian = match magic {
            MH_MAGIC_64 => false,
            MH_CIGAM_64 => true,
            other => {
                return Err(MachpError::InvalidFormat(format!(
                    "unsupported Mach-O magic 0x{other:08x} at offset {offset}"
                )));
            }
        };
        let endian = if big_endian { Endian::Big } else { Endian::Little };

        let cputype = reader.read_u32(offset + 4, endian)?;
        let cpusubtype = reader.read_u32(offset + 8, endian)?;
        let filetype = reader.read_u32(offset + 12, endian)?;
        let ncmds = reader.read_u32(offset + 16, endian)?;
        let sizeofcmds = reader.read_u32(offset + 20, endian)?;
        let flags = reader.read_u32(offset + 24, endian)?;
        // offset + 28..32 is `reserved`, unread

        if (sizeofcmds as usize) > reader.len().saturating_sub(offset + HEADER_SIZE) {
            return Err(MachpError::Parsing(format!(
                "sizeofcmds {sizeofcmds} exceeds remaining slice size at offset {offset}"
            )));
        }

        Ok(Self {
            magic,
            cputype,
            cputype_str: cpu_type_name(cputype),
            cpusubtype,
            filetype,
            filetype_str: file_type_name(filetype),
            ncmds,
            sizeofcmds,
            flags,
            flags_decoded: decode_flags(flags),
            big_endian,
        })
    }

    pub fn endian(&self) -> Endian {
        if self.big_endian {
            Endian::Big
        } else {
            Endian::Little
        }
    }
}
