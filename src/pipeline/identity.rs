//! Identifier normalization at pipeline entry.
//!
//! Every email leaves this step with an id containing at least one ASCII
//! digit. Synthesized ids are advisory: collisions are possible and nothing
//! downstream treats them as keys.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use uuid::Uuid;

/// Upper bound (exclusive) of synthesized identifiers.
const SYNTHETIC_ID_RANGE: u32 = 1_000_000;

/// Return `candidate` unchanged if it is a string containing a digit,
/// otherwise a fresh numeric identifier.
pub fn normalize_id(candidate: Option<&Value>) -> String {
    match candidate.and_then(Value::as_str) {
        Some(id) if has_digit(id) => id.to_string(),
        _ => synthesize_id(),
    }
}

pub fn has_digit(id: &str) -> bool {
    id.chars().any(|c| c.is_ascii_digit())
}

/// A number in `[0, 1_000_000)` from an RNG seeded with fresh UUIDv4 entropy.
pub fn synthesize_id() -> String {
    let seed = Uuid::new_v4().as_u128() as u64;
    let mut rng = StdRng::seed_from_u64(seed);
    rng.gen_range(0..SYNTHETIC_ID_RANGE).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_ids_with_digits() {
        assert_eq!(normalize_id(Some(&json!("test001"))), "test001");
        assert_eq!(normalize_id(Some(&json!("42"))), "42");
    }

    #[test]
    fn is_idempotent() {
        let once = normalize_id(Some(&json!("abc")));
        let twice = normalize_id(Some(&Value::String(once.clone())));
        assert_eq!(once, twice);
    }

    #[test]
    fn replaces_missing_or_digitless_ids() {
        for candidate in [None, Some(json!("abc")), Some(json!("")), Some(json!(12)), Some(Value::Null)] {
            let id = normalize_id(candidate.as_ref());
            assert!(has_digit(&id), "id {id:?} has no digit");
            let n: u32 = id.parse().expect("synthesized id is numeric");
            assert!(n < SYNTHETIC_ID_RANGE);
        }
    }

    #[test]
    fn non_ascii_digits_do_not_count() {
        // Arabic-Indic digit five
        assert!(!has_digit("\u{0665}"));
    }
}
