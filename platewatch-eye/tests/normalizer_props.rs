//! Property tests for plate text normalization

use platewatch_eye::plate::{clean, is_valid_plate, normalize, VANITY_PREFIXES};
use proptest::prelude::*;

fn has_vanity_prefix(text: &str) -> bool {
    VANITY_PREFIXES.iter().any(|vp| text.starts_with(vp))
}

proptest! {
    #[test]
    fn normalize_is_idempotent(raw in "[A-Za-z0-9 -]{0,10}") {
        let once = normalize(&raw);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn changed_output_matches_grammar(raw in "[A-Za-z0-9 -]{0,10}") {
        prop_assume!(!has_vanity_prefix(&raw));
        let normalized = normalize(&raw);
        if normalized != clean(&raw) {
            prop_assert!(is_valid_plate(&normalized), "{} -> {}", raw, normalized);
        }
    }

    #[test]
    fn vanity_prefixes_pass_through(
        prefix in prop::sample::select(VANITY_PREFIXES.to_vec()),
        rest in "[A-Z0-9]{0,5}",
    ) {
        let raw = format!("{}{}", prefix, rest);
        prop_assert_eq!(normalize(&raw), raw);
    }

    #[test]
    fn valid_plates_unchanged(plate in "[A-Z]{1,3}[0-9]{1,4}[A-Z]?") {
        prop_assume!(!has_vanity_prefix(&plate));
        prop_assert_eq!(normalize(&plate), plate);
    }
}
