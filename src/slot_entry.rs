use hex;
use sha2::{Digest, Sha256};

/// Integrity envelope for values kept in the durable slot
///
/// The slot lives outside the process (a file on disk) and may be truncated
/// or edited between runs. Every stored value is wrapped with a SHA-256
/// checksum:
/// 1. The checksum is computed when the value is written
/// 2. It is checked again when the value is read back
/// 3. A mismatch or unreadable envelope reads as "no prior session"

/// Wrapper for a slot value with integrity validation
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SlotEntry {
    /// The stored value (JSON string)
    pub data: String,
    /// SHA-256 checksum of the value (hex encoded)
    pub checksum: String,
}

impl SlotEntry {
    /// Creates a new entry with computed checksum
    pub fn new(data: String) -> Self {
        let checksum = sha256_hex(data.as_bytes());
        Self { data, checksum }
    }

    /// Returns true if the checksum matches the data
    pub fn is_valid(&self) -> bool {
        sha256_hex(self.data.as_bytes()) == self.checksum
    }

    /// Serializes the entry for the slot
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes and validates an entry read from the slot
    ///
    /// Returns Some(data) if valid, None if corrupted or invalid JSON
    pub fn decode(serialized: &str) -> Option<String> {
        let entry: SlotEntry = match serde_json::from_str(serialized) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Slot entry unreadable, ignoring saved state: {}", e);
                return None;
            }
        };

        if entry.is_valid() {
            Some(entry.data)
        } else {
            tracing::warn!(
                "Slot entry failed checksum validation. Expected: {}, Data length: {}",
                entry.checksum,
                entry.data.len()
            );
            None
        }
    }
}

/// Hex-encoded SHA-256 of `bytes`. Also used for artifact digests on intake.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_validation() {
        let data = r#"{"firstName":"Ada"}"#.to_string();
        let entry = SlotEntry::new(data.clone());

        assert!(entry.is_valid());
        assert_eq!(entry.data, data);
    }

    #[test]
    fn test_encode_decode() {
        let data = r#"{"city":"Austin"}"#.to_string();
        let encoded = SlotEntry::new(data.clone()).encode().unwrap();

        assert_eq!(SlotEntry::decode(&encoded), Some(data));
    }

    #[test]
    fn test_edited_slot_returns_none() {
        let encoded = SlotEntry::new(r#"{"city":"Austin"}"#.to_string())
            .encode()
            .unwrap();

        let tampered = encoded.replace("Austin", "Boston");
        assert_eq!(SlotEntry::decode(&tampered), None);
    }

    #[test]
    fn test_truncated_slot_returns_none() {
        let encoded = SlotEntry::new("{}".to_string()).encode().unwrap();
        assert_eq!(SlotEntry::decode(&encoded[..encoded.len() / 2]), None);
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
