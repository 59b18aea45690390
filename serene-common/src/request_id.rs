//! Request correlation identifiers
//!
//! Ids are attached to outgoing worker requests for log correlation only.
//! Format: `<unix millis>-<8 hex digits>`.

use chrono::Utc;
use rand::Rng;

/// Generate a new request id (timestamp + random component)
pub fn generate() -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!("{}-{:08x}", Utc::now().timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timestamp_millis(id: &str) -> Option<i64> {
        let (millis, suffix) = id.split_once('-')?;
        if suffix.len() != 8 || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        millis.parse().ok()
    }

    #[test]
    fn test_generate_is_parseable() {
        let before = Utc::now().timestamp_millis();
        let id = generate();
        let after = Utc::now().timestamp_millis();

        let ts = timestamp_millis(&id).expect("generated id should parse");
        assert!(ts >= before && ts <= after);
    }

    #[test]
    fn test_generate_is_unique() {
        let ids: std::collections::HashSet<String> = (0..256).map(|_| generate()).collect();
        assert_eq!(ids.len(), 256);
    }

    #[test]
    fn test_timestamp_rejects_malformed() {
        assert_eq!(timestamp_millis("not-an-id"), None);
        assert_eq!(timestamp_millis("12345"), None);
        assert_eq!(timestamp_millis("12345-zzzzzzzz"), None);
        assert_eq!(timestamp_millis("12345-00ab12cd"), Some(12345));
    }
}
