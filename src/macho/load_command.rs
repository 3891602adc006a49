//! Load-command walker: iterates `ncmds` records starting at header+32
use crate::byte_reader::{ByteReader, Endian};
use crate::error::MachpError;
use crate::macho::dylib::DylibRef;
use crate::macho::dysymtab::{self, Dysymtab};
use crate::macho::segment::Segment;
use crate::macho::symtab::{self, Symtab};
use serde::Serialize;

pub const LC_SEGMENT: u32 = 0x1;
pub const LC_SYMTAB: u32 = 0x2;
pub const LC_THREAD: u32 = 0x4;
pub const LC_UNIXTHREAD: u32 = 0x5;
pub const LC_LOADFVMLIB: u32 = 0x6;
pub const LC_IDFVMLIB: u32 = 0x7;
pub const LC_IDENT: u32 = 0x8;
pub const LC_FVMFILE: u32 = 0x9;
pub const LC_PREPAGE: u32 = 0xa;
pub const LC_DYSYMTAB: u32 = 0xb;
pub const LC_LOAD_DYLIB: u32 = 0xc;
pub const LC_ID_DYLIB: u32 = 0xd;
pub const LC_LOAD_DYLINKER: u32 = 0xe;
pub const LC_ID_DYLINKER: u32 = 0xf;
pub const LC_SEGMENT_64: u32 = 0x19;
pub const LC_UUID: u32 = 0x1b;
pub const LC_CODE_SIGNATURE: u32 = 0x1d;
pub const LC_VERSION_MIN_MACOSX: u32 = 0x24;
pub const LC_VERSION_MIN_IPHONEOS: u32 = 0x25;
pub const LC_VERSION_MIN_TVOS: u32 = 0x2f;
pub const LC_VERSION_MIN_WATCHOS: u32 = 0x30;
pub const LC_BUILD_VERSION: u32 = 0x32;
pub const LC_LOAD_WEAK_DYLIB: u32 = 0x8000_0018;
pub const LC_REEXPORT_DYLIB: u32 = 0x8000_001f;
pub const LC_LAZY_LOAD_DYLIB: u32 = 0x20;
pub const LC_LOAD_UPWARD_DYLIB: u32 = 0x8000_0023;

fn cmd_name(cmd: u32) -> String {
    let name = match cmd {
        LC_SEGMENT => "LC_SEGMENT",
        LC_SYMTAB => "LC_SYMTAB",
        0x3 => "LC_SYMSEG",
        LC_THREAD => "LC_THREAD",
        LC_UNIXTHREAD => "LC_UNIXTHREAD",
        LC_LOADFVMLIB => "LC_LOADFVMLIB",
        LC_IDFVMLIB => "LC_IDFVMLIB",
        LC_IDENT => "LC_IDENT",
        LC_FVMFILE => "LC_FVMFILE",
        LC_PREPAGE => "LC_PREPAGE",
        LC_DYSYMTAB => "LC_DYSYMTAB",
        LC_LOAD_DYLIB => "LC_LOAD_DYLIB",
        LC_ID_DYLIB => "LC_ID_DYLIB",
        LC_LOAD_DYLINKER => "LC_LOAD_DYLINKER",
        LC_ID_DYLINKER => "LC_ID_DYLINKER",
        0x10 => "LC_PREBOUND_DYLIB",
        0x11 => "LC_ROUTINES",
        0x12 => "LC_SUB_FRAMEWORK",
        0x13 => "LC_SUB_UMBRELLA",
        0x14 => "LC_SUB_CLIENT",
        0x15 => "LC_SUB_LIBRARY",
        0x16 => "LC_TWOLEVEL_HINTS",
        0x17 => "LC_PREBIND_CKSUM",
        LC_LOAD_WEAK_DYLIB => "LC_LOAD_WEAK_DYLIB",
        LC_SEGMENT_64 => "LC_SEGMENT_64",
        0x1a => "LC_ROUTINES_64",
        LC_UUID => "LC_UUID",
        0x8000_001c => "LC_RPATH",
        LC_CODE_SIGNATURE => "LC_CODE_SIGNATURE",
        0x1e => "LC_SEGMENT_SPLIT_INFO",
        LC_REEXPORT_DYLIB => "LC_REEXPORT_DYLIB",
        LC_LAZY_LOAD_DYLIB => "LC_LAZY_LOAD_DYLIB",
        0x21 => "LC_ENCRYPTION_INFO",
        0x22 => "LC_DYLD_INFO",
        0x8000_0022 => "LC_DYLD_INFO_ONLY",
        LC_LOAD_UPWARD_DYLIB => "LC_LOAD_UPWARD_DYLIB",
        LC_VERSION_MIN_MACOSX => "LC_VERSION_MIN_MACOSX",
        LC_VERSION_MIN_IPHONEOS => "LC_VERSION_MIN_IPHONEOS",
        0x26 => "LC_FUNCTION_STARTS",
        0x27 => "LC_DYLD_ENVIRONMENT",
        0x8000_0028 => "LC_MAIN",
        0x29 => "LC_DATA_IN_CODE",
        0x2a => "LC_SOURCE_VERSION",
        0x2b => "LC_DYLIB_CODE_SIGN_DRS",
        0x2c => "LC_ENCRYPTION_INFO_64",
        0x2d => "LC_LINKER_OPTION",
        0x2e => "LC_LINKER_OPTIMIZATION_HINT",
        LC_VERSION_MIN_TVOS => "LC_VERSION_MIN_TVOS",
        LC_VERSION_MIN_WATCHOS => "LC_VERSION_MIN_WATCHOS",
        0x31 => "LC_NOTE",
        LC_BUILD_VERSION => "LC_BUILD_VERSION",
        0x8000_0033 => "LC_DYLD_EXPORTS_TRIE",
        0x8000_0034 => "LC_DYLD_CHAINED_FIXUPS",
        0x8000_0035 => "LC_FILESET_ENTRY",
        _ => return format!("Unknown (0x{cmd:08x})"),
    };
    name.to_string()
}

/// Normalized `major.minor.patch` rendering, per spec §3
pub fn render_version(v: u32) -> String {
    let major = (v >> 16) & 0xffff;
    let minor = (v >> 8) & 0xff;
    let patch = v & 0xff;
    format!("{major}.{minor}.{patch}")
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildVersion {
    pub platform: u32,
    pub minos: String,
    pub sdk: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadCommand {
    pub cmd: u32,
    pub cmd_name: String,
    pub cmdsize: u32,
    pub offset: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_version: Option<BuildVersion>,
}

/// Result of walking a slice's load commands
pub struct WalkResult {
    pub commands: Vec<LoadCommand>,
    pub segments: Vec<Segment>,
    pub dylibs: Vec<DylibRef>,
    pub code_signature: Option<(u32, u32)>,
    pub symtab: Option<Symtab>,
    pub dysymtab: Option<Dysymtab>,
}

const DYLIB_LIKE: &[u32] = &[
    LC_LOAD_DYLIB,
    LC_LOAD_WEAK_DYLIB,
    LC_REEXPORT_DYLIB,
    LC_LAZY_LOAD_DYLIB,
    LC_LOAD_UPWARD_DYLIB,
];

pub fn walk(
    reader: &ByteReader,
    start: usize,
    ncmds: u32,
    sizeofcmds: u32,
    endian: Endian,
) -> Result<WalkResult, MachpError> {
    let mut commands = Vec::new();
    let mut segments = Vec::new();
    let mut dylibs = Vec::new();
    let mut code_signature = None;
    let mut symtab = None;
    let mut dysymtab = None;

    let mut cursor = start;
    let mut total: u64 = 0;
    for i in 0..ncmds {
        if cursor + 8 > reader.len() {
            return Err(MachpError::Parsing(format!(
                "load command {i} header exceeds file bounds at offset {cursor}"
            )));
        }
        let cmd = reader.read_u32(cursor, endian)?;
        let cmdsize = reader.read_u32(cursor + 4, endian)?;

        if cmdsize < 8 {
            return Err(MachpError::Parsing(format!(
                "load command {i} at offset {cursor} has invalid cmdsize {cmdsize}"
            )));
        }
        if cursor + cmdsize as usize > reader.len() {
            return Err(MachpError::Parsing(format!(
                "load command {i} at offset {cursor} (cmdsize {cmdsize}) exceeds slice bounds"
            )));
        }

        let mut uuid = None;
        let mut build_version = None;

        match cmd {
            LC_SEGMENT_64 => {
                segments.push(Segment::decode(reader, cursor, endian)?);
            }
            LC_SYMTAB => {
                let symoff = reader.read_u32(cursor + 8, endian)?;
                let nsyms = reader.read_u32(cursor + 12, endian)?;
                let stroff = reader.read_u32(cursor + 16, endian)?;
                let strsize = reader.read_u32(cursor + 20, endian)?;
                symtab = Some(symtab::decode(reader, symoff, nsyms, stroff, strsize, endian)?);
            }
            LC_DYSYMTAB => {
                dysymtab = Some(dysymtab::decode(reader, cursor, endian)?);
            }
            LC_CODE_SIGNATURE => {
                let dataoff = reader.read_u32(cursor + 8, endian)?;
                let datasize = reader.read_u32(cursor + 12, endian)?;
                code_signature = Some((dataoff, datasize));
            }
            LC_UUID => {
                let bytes = reader.slice(cursor + 8, 16)?;
                uuid = Some(format_uuid(bytes));
            }
            LC_BUILD_VERSION => {
                let platform = reader.read_u32(cursor + 8, endian)?;
                let minos = reader.read_u32(cursor + 12, endian)?;
                let sdk = reader.read_u32(cursor + 16, endian)?;
                build_version = Some(BuildVersion {
                    platform,
                    minos: render_version(minos),
                    sdk: render_version(sdk),
                });
            }
            LC_VERSION_MIN_MACOSX | LC_VERSION_MIN_IPHONEOS | LC_VERSION_MIN_TVOS
            | LC_VERSION_MIN_WATCHOS => {
                let minos = reader.read_u32(cursor + 8, endian)?;
                let sdk = reader.read_u32(cursor + 12, endian)?;
                build_version = Some(BuildVersion {
                    platform: cmd,
                    minos: render_version(minos),
                    sdk: render_version(sdk),
                });
            }
            _ if DYLIB_LIKE.contains(&cmd) || cmd == LC_ID_DYLIB => {
                let name_off = reader.read_u32(cursor + 8, endian)?;
                let timestamp = reader.read_u32(cursor + 12, endian)?;
                let current_version = reader.read_u32(cursor + 16, endian)?;
                let compat_version = reader.read_u32(cursor + 20, endian)?;
                let name_start = cursor + name_off as usize;
                // the dylib_command's fixed fields (cmd, cmdsize, name offset,
                // timestamp, current_version, compatibility_version) occupy
                // the first 24 bytes, so the name cannot start before that
                if name_off < 24 || name_start >= cursor + cmdsize as usize {
                    return Err(MachpError::Parsing(format!(
                        "dylib command at offset {cursor} has out-of-range name offset {name_off}"
                    )));
                }
                let name_len = cursor + cmdsize as usize - name_start;
                let name = reader.read_fixed_ascii(name_start, name_len)?;
                if DYLIB_LIKE.contains(&cmd) {
                    dylibs.push(DylibRef {
                        name,
                        timestamp,
                        current_version: render_version(current_version),
                        compatibility_version: render_version(compat_version),
                    });
                }
            }
            _ => {}
        }

        commands.push(LoadCommand {
            cmd,
            cmd_name: cmd_name(cmd),
            cmdsize,
            offset: cursor,
            uuid,
            build_version,
        });

        total += cmdsize as u64;
        cursor += cmdsize as usize;
    }

    if total != sizeofcmds as u64 {
        return Err(MachpError::Parsing(format!(
            "sum of cmdsize ({total}) does not equal sizeofcmds ({sizeofcmds})"
        )));
    }

    Ok(WalkResult {
        commands,
        segments,
        dylibs,
        code_signature,
        symtab,
        dysymtab,
    })
}

fn format_uuid(bytes: &[u8]) -> String {
    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        bytes[6], bytes[7],
        bytes[8], bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le_u32(v: u32) -> [u8; 4] {
        v.to_le_bytes()
    }

    #[test]
    fn conserves_cmdsize_sum_and_visits_ncmds() {
        // two opaque 8-byte commands
        let mut buf = Vec::new();
        buf.extend_from_slice(&le_u32(LC_IDENT));
        buf.extend_from_slice(&le_u32(8));
        buf.extend_from_slice(&le_u32(LC_PREPAGE));
        buf.extend_from_slice(&le_u32(8));
        let r = ByteReader::new(&buf);
        let res = walk(&r, 0, 2, 16, Endian::Little).unwrap();
        assert_eq!(res.commands.len(), 2);
    }

    #[test]
    fn truncated_command_fails_with_parsing() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&le_u32(LC_SEGMENT_64));
        buf.extend_from_slice(&le_u32(72));
        buf.extend_from_slice(&[0u8; 32]); // only 40 bytes total, not 72
        let r = ByteReader::new(&buf);
        let err = walk(&r, 0, 1, 72, Endian::Little).unwrap_err();
        assert!(matches!(err, MachpError::Parsing(_)));
    }

    #[test]
    fn unknown_cmd_is_recorded() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&le_u32(0xfeed_0099));
        buf.extend_from_slice(&le_u32(8));
        let r = ByteReader::new(&buf);
        let res = walk(&r, 0, 1, 8, Endian::Little).unwrap();
        assert_eq!(res.commands[0].cmd_name, "Unknown (0xfeed0099)");
    }

    #[test]
    fn version_rendering() {
        assert_eq!(render_version(0x00010203), "1.2.3");
    }

    #[test]
    fn dylib_name_extraction() {
        let mut buf = Vec::new();
        let name = b"libfoo.dylib\0\0\0\0"; // pad to 8-byte align
        let cmdsize = 24 + name.len() as u32;
        buf.extend_from_slice(&le_u32(LC_LOAD_DYLIB));
        buf.extend_from_slice(&le_u32(cmdsize));
        buf.extend_from_slice(&le_u32(24)); // name offset
        buf.extend_from_slice(&le_u32(0)); // timestamp
        buf.extend_from_slice(&le_u32(0x00010203)); // current_version
        buf.extend_from_slice(&le_u32(0x00010000)); // compat_version
        buf.extend_from_slice(name);
        let r = ByteReader::new(&buf);
        let res = walk(&r, 0, 1, cmdsize, Endian::Little).unwrap();
        assert_eq!(res.dylibs.len(), 1);
        assert_eq!(res.dylibs[0].name, "libfoo.dylib");
        assert_eq!(res.dylibs[0].current_version, "1.2.3");
        assert_eq!(res.dylibs[0].compatibility_version, "1.0.0");
    }
}
