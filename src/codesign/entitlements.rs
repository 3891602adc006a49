//! Entitlements sub-blobs: XML plist (`0xFADE7171`) and DER (`0xFADE7172`)
use crate::error::MachpError;

/// Parses an XML-plist entitlements blob (header already stripped) and
/// returns its sorted top-level dictionary keys.
pub fn decode_xml(payload: &[u8]) -> Result<Vec<String>, MachpError> {
    let value: plist::Value = plist::from_bytes(payload)
        .map_err(|e| MachpError::Parsing(format!("invalid entitlements plist: {e}")))?;
    let dict = value
        .as_dictionary()
        .ok_or_else(|| MachpError::Parsing("entitlements plist root is not a dictionary".to_string()))?;
    let mut keys: Vec<String> = dict.keys().cloned().collect();
    keys.sort();
    Ok(keys)
}

// Minimal DER/ASN.1 primitives needed to walk Apple's nonstandard
// DER-entitlements encoding: an application-tagged outer SEQUENCE, an
// INTEGER (version, skipped), then a context-tagged dictionary whose
// members are SEQUENCEs of `(UTF8String key, value)`.
struct Tlv<'a> {
    tag: u8,
    content: &'a [u8],
    rest: &'a [u8],
}

fn read_tlv(data: &[u8]) -> Option<Tlv<'_>> {
    if data.is_empty() {
        return None;
    }
    let tag = data[0];
    let (len, len_bytes) = read_length(&data[1..])?;
    let header_len = 1 + len_bytes;
    if data.len() < header_len + len {
        return None;
    }
    Some(Tlv {
        tag,
        content: &data[header_len..header_len + len],
        rest: &data[header_len + len..],
    })
}

/// Returns `(length, bytes_consumed)` for a DER length field (short or long form).
fn read_length(data: &[u8]) -> Option<(usize, usize)> {
    let first = *data.first()?;
    if first & 0x80 == 0 {
        return Some((first as usize, 1));
    }
    let n = (first & 0x7f) as usize;
    if n == 0 || n > 8 || data.len() < 1 + n {
        return None;
    }
    let mut len = 0usize;
    for &b in &data[1..1 + n] {
        len = (len << 8) | b as usize;
    }
    Some((len, 1 + n))
}

/// Decodes a DER entitlements blob (header already stripped), returning the
/// dictionary's key list in document order. Unknown/unparseable tags
/// terminate the walk gracefully, returning whatever was already decoded.
pub fn decode_der(payload: &[u8]) -> Vec<String> {
    let mut keys = Vec::new();
    let Some(outer) = read_tlv(payload) else {
        return keys;
    };
    // outer application-tagged SEQUENCE
    if outer.tag & 0x20 == 0 {
        return keys;
    }
    let mut body = outer.content;

    // INTEGER (version), skipped
    let Some(version) = read_tlv(body) else {
        return keys;
    };
    if version.tag != 0x02 {
        return keys;
    }
    body = version.rest;

    // context-tagged dictionary
    let Some(dict) = read_tlv(body) else {
        return keys;
    };
    let mut members = dict.content;
    while let Some(member) = read_tlv(members) {
        members = member.rest;
        if member.tag & 0x20 == 0 {
            break; // not a constructed SEQUENCE member
        }
        let Some(key_tlv) = read_tlv(member.content) else {
            break;
        };
        if key_tlv.tag != 0x0c {
            // UTF8String
            break;
        }
        match std::str::from_utf8(key_tlv.content) {
            Ok(s) => keys.push(s.to_string()),
            Err(_) => break,
        }
    }

    keys
}
