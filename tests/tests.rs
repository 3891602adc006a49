//! End-to-end tests driving the public report-building entry point over
//! synthetic in-memory Mach-O byte buffers.
use machp::error::MachpError;
use machp::report;

fn le32(v: u32) -> [u8; 4] {
    v.to_le_bytes()
}

fn thin_header(ncmds: u32, sizeofcmds: u32, flags: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&0xfeed_facfu32.to_be_bytes());
    buf.extend_from_slice(&le32(0x0100_000c)); // ARM64
    buf.extend_from_slice(&le32(0)); // cpusubtype
    buf.extend_from_slice(&le32(2)); // EXECUTE
    buf.extend_from_slice(&le32(ncmds));
    buf.extend_from_slice(&le32(sizeofcmds));
    buf.extend_from_slice(&le32(flags));
    buf.extend_from_slice(&le32(0)); // reserved
    buf
}

#[test]
fn thin_binary_with_segment_and_symtab_produces_full_report() {
    let mut buf = thin_header(2, 0, 0x1 | 0x4);
    let header_end = buf.len();

    // LC_SEGMENT_64: cmd=0x19, cmdsize=72+80 (one section)
    let seg_cmdsize: u32 = 72 + 80;
    buf.extend_from_slice(&le32(0x19));
    buf.extend_from_slice(&le32(seg_cmdsize));
    let mut segname = [0u8; 16];
    segname[0..6].copy_from_slice(b"__TEXT");
    buf.extend_from_slice(&segname);
    buf.extend_from_slice(&0u64.to_le_bytes()); // vmaddr
    buf.extend_from_slice(&0u64.to_le_bytes()); // vmsize
    buf.extend_from_slice(&0u64.to_le_bytes()); // fileoff
    buf.extend_from_slice(&0u64.to_le_bytes()); // filesize
    buf.extend_from_slice(&le32(7)); // maxprot
    buf.extend_from_slice(&le32(5)); // initprot
    buf.extend_from_slice(&le32(1)); // nsects
    buf.extend_from_slice(&le32(0)); // flags
    let mut sectname = [0u8; 16];
    sectname[0..6].copy_from_slice(b"__text");
    buf.extend_from_slice(&sectname);
    buf.extend_from_slice(&segname);
    buf.extend_from_slice(&0u64.to_le_bytes()); // addr
    buf.extend_from_slice(&0u64.to_le_bytes()); // size
    buf.extend_from_slice(&le32(0)); // offset
    buf.extend_from_slice(&le32(0)); // align
    buf.extend_from_slice(&le32(0)); // reloff
    buf.extend_from_slice(&le32(0)); // nreloc
    buf.extend_from_slice(&le32(0)); // flags
    buf.extend_from_slice(&le32(0)); // reserved1
    buf.extend_from_slice(&le32(0)); // reserved2
    buf.extend_from_slice(&le32(0)); // reserved3

    // LC_SYMTAB: one imported, one exported symbol
    let strtab = b"\0_imported\0_exported\0";
    let symtab_cmdsize: u32 = 24;
    let nlist_off = buf.len() as u32 + symtab_cmdsize;
    let stroff = nlist_off + 32;
    buf.extend_from_slice(&le32(0x2));
    buf.extend_from_slice(&le32(symtab_cmdsize));
    buf.extend_from_slice(&le32(nlist_off));
    buf.extend_from_slice(&le32(2));
    buf.extend_from_slice(&le32(stroff));
    buf.extend_from_slice(&le32(strtab.len() as u32));

    // nlist_64 #0: imported (N_UNDF | N_EXT)
    buf.extend_from_slice(&le32(1));
    buf.push(0x01);
    buf.push(0);
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes());
    // nlist_64 #1: exported (N_SECT | N_EXT)
    buf.extend_from_slice(&le32(10));
    buf.push(0x0e | 0x01);
    buf.push(1);
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&0x1000u64.to_le_bytes());

    buf.extend_from_slice(strtab);

    let sizeofcmds = (buf.len() - header_end) as u32;
    buf[20..24].copy_from_slice(&sizeofcmds.to_le_bytes());

    let report = report::build("synthetic.bin", &buf).unwrap();
    assert!(!report.fat);
    let slice = report.header_slice.as_ref().unwrap();
    assert_eq!(slice.header.cputype_str, "ARM64");
    assert_eq!(slice.header.segments.len(), 1);
    assert_eq!(slice.header.segments[0].sections.len(), 1);
    assert_eq!(slice.imported_symbols, vec!["_imported".to_string()]);
    assert_eq!(slice.exports, vec!["_exported".to_string()]);
    assert_eq!(report.imported_symbols, vec!["_imported".to_string()]);
    assert_eq!(report.exports, vec!["_exported".to_string()]);
}

#[test]
fn truncated_command_fails_citing_the_load_command_region() {
    // ncmds=1, a segment command declaring cmdsize=72 but only 40 bytes of
    // load-command data follow header+32 (i.e. offset 32)
    let mut buf = thin_header(1, 72, 0);
    buf.extend_from_slice(&le32(0x19));
    buf.extend_from_slice(&le32(72));
    buf.extend_from_slice(&[0u8; 32]);

    let err = report::build("truncated.bin", &buf).unwrap_err();
    match err {
        MachpError::Parsing(msg) => assert!(msg.contains("32") || msg.contains("exceeds")),
        other => panic!("expected Parsing error, got {other:?}"),
    }
}

#[test]
fn unrecognized_top_level_magic_is_invalid_format() {
    let buf = 0xdead_beefu32.to_be_bytes().to_vec();
    let err = report::build("bad.bin", &buf).unwrap_err();
    assert!(matches!(err, MachpError::InvalidFormat(_)));
}

#[test]
fn file_with_code_signature_super_blob_decodes_code_directory() {
    let mut buf = thin_header(1, 0, 0);
    let header_end = buf.len();

    // build the CodeDirectory blob first so we know its size
    let ident = b"com.example.app\0";
    let cd_header_len = 44usize;
    let mut cd = vec![0u8; cd_header_len];
    cd[0..4].copy_from_slice(&0xfade_0c02u32.to_be_bytes());
    cd[8..12].copy_from_slice(&0x2000_0u32.to_be_bytes()); // version
    let ident_offset = cd_header_len as u32;
    cd[20..24].copy_from_slice(&ident_offset.to_be_bytes());
    cd[16..20].copy_from_slice(&ident_offset.to_be_bytes()); // hashOffset == identOffset, no slots
    cd[36] = 20; // hash_size
    cd[37] = 1; // hash_type
    cd.extend_from_slice(ident);
    let cd_len = cd.len() as u32;
    cd[4..8].copy_from_slice(&cd_len.to_be_bytes());

    // super-blob: 12-byte header + one 8-byte index entry + the CD blob
    let super_header_len = 12 + 8;
    let cd_offset = super_header_len as u32;
    let total_len = super_header_len as u32 + cd_len;
    let mut cs = Vec::new();
    cs.extend_from_slice(&0xfade_0cc0u32.to_be_bytes());
    cs.extend_from_slice(&total_len.to_be_bytes());
    cs.extend_from_slice(&1u32.to_be_bytes()); // count
    cs.extend_from_slice(&0u32.to_be_bytes()); // slot type (CodeDirectory)
    cs.extend_from_slice(&cd_offset.to_be_bytes());
    cs.extend_from_slice(&cd);

    // LC_CODE_SIGNATURE: dataoff, datasize
    let dataoff = header_end as u32 + 16; // right after this one load command
    buf.extend_from_slice(&le32(0x1d));
    buf.extend_from_slice(&le32(16));
    buf.extend_from_slice(&le32(dataoff));
    buf.extend_from_slice(&le32(cs.len() as u32));
    buf.extend_from_slice(&cs);

    let sizeofcmds = 16u32;
    buf[20..24].copy_from_slice(&sizeofcmds.to_le_bytes());

    let report = report::build("signed.bin", &buf).unwrap();
    let slice = report.header_slice.unwrap();
    let cs_report = slice.header.code_signature.unwrap();
    let cd_report = cs_report.code_directory.unwrap();
    assert_eq!(cd_report.ident, "com.example.app");
    assert_eq!(cd_report.n_special_slots, 0);
}
