//! Time-ordered document identifiers.
//!
//! Generated ids are 23-character ASCII strings:
//!
//! ```text
//! 1718000000000 000042 9f3a
//! |millis:013-| |ctr:06| |rnd:04x|
//! ```
//!
//! The millisecond prefix and the process-wide counter keep ids generated by
//! one process in creation order, so a full-range scan over the key-ordered
//! backend returns documents roughly in insertion order. The random suffix
//! separates ids minted by different processes in the same millisecond.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

/// Length in bytes of a generated id.
pub const GENERATED_ID_LEN: usize = 13 + 6 + 4;

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new sequential document id.
pub fn generate_id() -> String {
    let millis = now_millis();
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed) % 1_000_000;
    let suffix: u16 = rand::thread_rng().gen();
    format!("{:013}{:06}{:04x}", millis, seq, suffix)
}

/// Returns true if `id` is usable as a document id (a non-empty string).
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
}

/// Get current time in milliseconds.
fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_id_shape() {
        let id = generate_id();
        assert_eq!(id.len(), GENERATED_ID_LEN);
        assert!(id.is_ascii());
        assert!(id[..19].chars().all(|c| c.is_ascii_digit()));
        assert!(id[19..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generated_ids_unique() {
        let ids: HashSet<String> = (0..10_000).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_generated_ids_sorted_within_millisecond() {
        let a = generate_id();
        let b = generate_id();
        // Same or later millisecond, and the counter advances
        assert!(a[..13] <= b[..13]);
        if a[..13] == b[..13] && a[13..19] < b[13..19] {
            assert!(a < b);
        }
    }

    #[test]
    fn test_is_valid_id() {
        assert!(is_valid_id("x"));
        assert!(!is_valid_id(""));
    }
}
