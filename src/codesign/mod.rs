//! Code-signature super-blob decoder
//!
//! All multi-byte integers inside code-signature data are big-endian
//! regardless of the enclosing slice's endianness.
pub mod cms;
pub mod code_directory;
pub mod entitlements;
pub mod requirement;

use crate::byte_reader::{ByteReader, Endian};
use crate::error::MachpError;
use base64::Engine;
use code_directory::CodeDirectory;
use serde::Serialize;
use std::collections::BTreeMap;

const CS_MAGIC_EMBEDDED_SIGNATURE: u32 = 0xfade_0cc0;
const CS_MAGIC_DETACHED_SIGNATURE: u32 = 0xfade_0cc1;
const CSMAGIC_REQUIREMENT: u32 = 0xfade_0c00;
const CSMAGIC_REQUIREMENTS: u32 = 0xfade_0c01;
const CSMAGIC_CODEDIRECTORY: u32 = 0xfade_0c02;
const CSMAGIC_EMBEDDED_ENTITLEMENTS: u32 = 0xfade_7171;
const CSMAGIC_EMBEDDED_DER_ENTITLEMENTS: u32 = 0xfade_7172;
const CSMAGIC_BLOBWRAPPER: u32 = 0xfade_0b01;

#[derive(Debug, Clone, Serialize, Default)]
pub struct CodeSignature {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_directory: Option<CodeDirectory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entitlements: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub der_entitlements: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub certificates: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub other_blobs: BTreeMap<String, String>,
}

/// Decodes the embedded code-signature super-blob located at
/// `[cs_offset, cs_offset + cs_size)` within `reader`.
pub fn decode(reader: &ByteReader, cs_offset: usize, cs_size: usize) -> Result<CodeSignature, MachpError> {
    if cs_offset + cs_size > reader.len() || cs_size < 12 {
        return Err(MachpError::Parsing(format!(
            "code signature region [{cs_offset}, {cs_offset}+{cs_size}) exceeds slice bounds"
        )));
    }
    let blob = reader.subrange(cs_offset, cs_offset + cs_size)?;

    let magic = blob.read_u32(0, Endian::Big)?;
    if !matches!(magic, CS_MAGIC_EMBEDDED_SIGNATURE | CS_MAGIC_DETACHED_SIGNATURE) {
        return Err(MachpError::InvalidFormat(format!(
            "unrecognized code-signature super-blob magic 0x{magic:08x}"
        )));
    }
    let count = blob.read_u32(8, Endian::Big)?;

    let mut signature = CodeSignature::default();

    for i in 0..count {
        let index_off = 12 + i as usize * 8;
        if index_off + 8 > blob.len() {
            return Err(MachpError::Parsing(format!(
                "super-blob index entry {i} exceeds bounds"
            )));
        }
        let _slot_type = blob.read_u32(index_off, Endian::Big)?;
        let blob_offset = blob.read_u32(index_off + 4, Endian::Big)? as usize;

        if blob_offset + 8 > blob.len() {
            return Err(MachpError::Parsing(format!(
                "sub-blob {i} at offset {blob_offset} exceeds super-blob bounds"
            )));
        }
        let blob_magic = blob.read_u32(blob_offset, Endian::Big)?;
        let blob_length = blob.read_u32(blob_offset + 4, Endian::Big)? as usize;
        if blob_length < 8 || blob_offset + blob_length > blob.len() {
            return Err(MachpError::Parsing(format!(
                "sub-blob {i} (magic 0x{blob_magic:08x}) declares invalid length {blob_length}"
            )));
        }
        let raw = blob.slice(blob_offset, blob_length)?;
        let payload = &raw[8..];

        match blob_magic {
            CSMAGIC_CODEDIRECTORY => {
                signature.code_directory = Some(code_directory::decode(raw)?);
            }
            CSMAGIC_EMBEDDED_ENTITLEMENTS => match entitlements::decode_xml(payload) {
                Ok(keys) => signature.entitlements = Some(keys),
                Err(_) => signature.entitlements = Some(Vec::new()),
            },
            CSMAGIC_EMBEDDED_DER_ENTITLEMENTS => {
                signature.der_entitlements = Some(entitlements::decode_der(payload));
            }
            CSMAGIC_REQUIREMENT => {
                signature.requirement = Some(requirement::decode(payload));
            }
            CSMAGIC_REQUIREMENTS => {
                signature.requirements = Some(requirement::decode(payload));
            }
            CSMAGIC_BLOBWRAPPER => {
                signature.certificates = cms::decode(payload);
            }
            other => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(raw);
                signature.other_blobs.insert(format!("0x{other:08x}"), encoded);
            }
        }
    }

    Ok(signature)
}
