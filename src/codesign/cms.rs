//! CMS wrapper sub-blob (`0xFADE0B01`): PKCS#7 SignedData certificate chain
use cryptographic_message_syntax::SignedData;

/// Parses `payload` (blob header already stripped) as a PKCS#7 SignedData
/// structure and returns the subject-summary string for every embedded
/// certificate. Returns an empty list, never an error, on any parse failure
/// — per spec, CMS decoding failures are recoverable by design.
pub fn decode(payload: &[u8]) -> Vec<String> {
    match SignedData::parse_ber(payload) {
        Ok(signed_data) => signed_data
            .certificates()
            .map(|cert| cert.subject_common_name().unwrap_or_else(|| "Unknown Subject".to_string()))
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_cms_yields_empty_list() {
        assert_eq!(decode(b"not a real SignedData structure"), Vec::<String>::new());
    }

    #[test]
    fn empty_payload_yields_empty_list() {
        assert_eq!(decode(&[]), Vec::<String>::new());
    }
}
