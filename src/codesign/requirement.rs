//! Requirement / requirement-set sub-blobs (`0xFADE0C00` / `0xFADE0C01`)
//!
//! This inspector has no structured requirement-language decoder (the
//! opcode grammar used by `csreq` is proprietary and undocumented), so
//! decoding always falls back to scanning for printable-ASCII runs.

/// Scans `payload` (blob header already stripped) for runs of printable
/// ASCII of length >= 4 and joins them with `", "`.
pub fn decode(payload: &[u8]) -> String {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for &b in payload {
        if (0x20..=0x7e).contains(&b) {
            current.push(b);
        } else if current.len() >= 4 {
            runs.push(String::from_utf8_lossy(&current).to_string());
            current.clear();
        } else {
            current.clear();
        }
    }
    if current.len() >= 4 {
        runs.push(String::from_utf8_lossy(&current).to_string());
    }
    runs.join(", ")
}
