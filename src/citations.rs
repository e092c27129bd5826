//! Static regulation-citation lookup table.
//!
//! Maps rule kinds to human-readable regulation citations. The table is
//! bundled at compile time and parsed once at first use; it is never
//! written at runtime, so concurrent audit runs can share it freely.

use lazy_static::lazy_static;
use std::collections::BTreeMap;

const CITATIONS_JSON: &str = include_str!("../resources/citations.json");

lazy_static! {
    static ref CITATIONS: BTreeMap<String, Vec<String>> = serde_json::from_str(CITATIONS_JSON)
        .expect("bundled citations.json must be valid JSON");
}

/// Fallback citation for kinds the table does not know.
pub const GENERIC_CITATION: &str = "General compliance requirements";

/// Primary citation for a rule kind.
pub fn citation_for(kind: &str) -> String {
    CITATIONS
        .get(kind)
        .and_then(|list| list.first())
        .cloned()
        .unwrap_or_else(|| GENERIC_CITATION.to_string())
}

/// All citations recorded for a rule kind.
pub fn citations_for(kind: &str) -> &'static [String] {
    CITATIONS.get(kind).map(Vec::as_slice).unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_kind_has_citation() {
        assert_eq!(
            citation_for("gdpr.cookie_banner"),
            "GDPR Article 7 - Conditions for consent"
        );
    }

    #[test]
    fn test_multi_citation_kind() {
        let all = citations_for("wcag.unlabeled_inputs");
        assert_eq!(all.len(), 2);
        assert!(all[1].contains("3.3.2"));
    }

    #[test]
    fn test_unknown_kind_falls_back() {
        assert_eq!(citation_for("made.up_kind"), GENERIC_CITATION);
        assert!(citations_for("made.up_kind").is_empty());
    }
}
