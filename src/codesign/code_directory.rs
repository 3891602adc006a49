//! CodeDirectory sub-blob (magic `0xFADE0C02`) decoding
use crate::byte_reader::{ByteReader, Endian};
use crate::digest::sha1_hex;
use crate::error::MachpError;
use serde::Serialize;
use std::collections::BTreeMap;

const CD_HEADER_SIZE: usize = 44;

fn special_slot_label(index: u32) -> String {
    match index {
        0 => "Entitlements Blob".to_string(),
        1 => "Application Specific".to_string(),
        2 => "Resource Directory".to_string(),
        3 => "Requirements Blob".to_string(),
        4 => "Bound Info.plist".to_string(),
        n => format!("Special Slot {n}"),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeDirectory {
    pub ident: String,
    pub version: u32,
    pub flags: u32,
    pub hash_offset: u32,
    pub ident_offset: u32,
    pub n_special_slots: u32,
    pub n_code_slots: u32,
    pub code_limit: u32,
    pub hash_size: u8,
    pub hash_type: u8,
    pub platform: u8,
    pub page_size: u8,
    pub cd_hash: String,
    /// special-slot index (ascending) → hash rendering, `"Not Bound"` for all-zero
    pub special_slots: BTreeMap<String, String>,
}

/// Decodes a CodeDirectory blob. `blob` is the full blob as stored
/// (including its 8-byte `magic`/`length` header), which is also the input
/// to `cdHash = SHA-1(blob)`.
pub fn decode(blob: &[u8]) -> Result<CodeDirectory, MachpError> {
    let reader = ByteReader::new(blob);
    if blob.len() < CD_HEADER_SIZE {
        return Err(MachpError::Parsing(format!(
            "CodeDirectory blob of {} bytes is shorter than its 44-byte header",
            blob.len()
        )));
    }
    let version = reader.read_u32(8, Endian::Big)?;
    let flags = reader.read_u32(12, Endian::Big)?;
    let hash_offset = reader.read_u32(16, Endian::Big)?;
    let ident_offset = reader.read_u32(20, Endian::Big)?;
    let n_special_slots = reader.read_u32(24, Endian::Big)?;
    let n_code_slots = reader.read_u32(28, Endian::Big)?;
    let code_limit = reader.read_u32(32, Endian::Big)?;
    let hash_size = reader.read_u8(36)?;
    let hash_type = reader.read_u8(37)?;
    let platform = reader.read_u8(38)?;
    let page_size = reader.read_u8(39)?;
    // offset 40..44 is `spare2`, unread

    let ident = if ident_offset == 0 {
        String::new()
    } else {
        let start = ident_offset as usize;
        if start >= blob.len() {
            return Err(MachpError::Parsing(format!(
                "CodeDirectory identOffset {ident_offset} exceeds blob length {}",
                blob.len()
            )));
        }
        reader.read_nul_terminated(start, blob.len() - start)?
    };

    let hash_size = if hash_size == 0 { 20 } else { hash_size };
    let mut special_slots = BTreeMap::new();
    // special-slot index 0 sits immediately before hashOffset; increasing
    // index walks backward toward the start of the blob
    for i in 0..n_special_slots {
        let slot_start = (hash_offset as usize).checked_sub((i as usize + 1) * hash_size as usize);
        let Some(slot_start) = slot_start else {
            continue;
        };
        if slot_start + hash_size as usize > blob.len() {
            continue;
        }
        let hash_bytes = reader.slice(slot_start, hash_size as usize)?;
        let rendered = if hash_bytes.iter().all(|&b| b == 0) {
            "Not Bound".to_string()
        } else {
            hex_encode(hash_bytes)
        };
        special_slots.insert(special_slot_label(i), rendered);
    }

    Ok(CodeDirectory {
        ident,
        version,
        flags,
        hash_offset,
        ident_offset,
        n_special_slots,
        n_code_slots,
        code_limit,
        hash_size,
        hash_type,
        platform,
        page_size,
        cd_hash: sha1_hex(blob),
        special_slots,
    })
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_cd(ident: &str, special_hashes: &[[u8; 20]]) -> Vec<u8> {
        let n_special = special_hashes.len() as u32;
        let hash_offset = CD_HEADER_SIZE as u32 + n_special * 20;
        let mut buf = vec![0u8; CD_HEADER_SIZE];
        buf[0..4].copy_from_slice(&0xfade_0c02u32.to_be_bytes());
        // length filled in at the end
        buf[8..12].copy_from_slice(&0x2000_0u32.to_be_bytes()); // version
        buf[16..20].copy_from_slice(&hash_offset.to_be_bytes());
        // no code slots in this synthetic blob, so the identifier follows immediately
        let ident_offset = hash_offset;
        buf[24..28].copy_from_slice(&n_special.to_be_bytes());
        buf[28..32].copy_from_slice(&0u32.to_be_bytes()); // n_code_slots
        buf[36] = 20; // hash_size
        buf[37] = 1; // hash_type (SHA-1)

        // special slot hashes, stored in reverse order immediately before hashOffset
        for h in special_hashes.iter().rev() {
            buf.extend_from_slice(h);
        }
        buf[20..24].copy_from_slice(&ident_offset.to_be_bytes());
        buf.extend_from_slice(ident.as_bytes());
        buf.push(0);
        let len = buf.len() as u32;
        buf[4..8].copy_from_slice(&len.to_be_bytes());
        buf
    }

    #[test]
    fn cdhash_is_sha1_of_stored_bytes() {
        let blob = build_cd("com.example.app", &[]);
        let cd = decode(&blob).unwrap();
        assert_eq!(cd.cd_hash, sha1_hex(&blob));
        assert_eq!(cd.ident, "com.example.app");
    }

    #[test]
    fn special_slots_count_matches_declared() {
        let zero_hash = [0u8; 20];
        let mut nonzero_hash = [0u8; 20];
        nonzero_hash[0] = 0xab;
        let blob = build_cd("id", &[zero_hash, nonzero_hash]);
        let cd = decode(&blob).unwrap();
        assert_eq!(cd.special_slots.len(), 2);
        assert_eq!(cd.special_slots["Entitlements Blob"], "Not Bound");
        assert!(cd.special_slots["Application Specific"].starts_with("ab"));
    }

    #[test]
    fn truncated_header_fails() {
        let blob = vec![0u8; 10];
        assert!(matches!(decode(&blob), Err(MachpError::Parsing(_))));
    }
}
