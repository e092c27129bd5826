//! Technical Scanner: rule-based compliance evaluation.
//!
//! Runs a fixed, ordered battery of independent rule checks against the
//! Document Model and produces typed violation records. Rules are pure
//! functions; a failing rule is recorded as a warning and never aborts
//! the scan.

mod rules;

pub use rules::{keyboard_trap_elements, unlabeled_inputs};

use crate::document::{Document, RequestContext};
use crate::models::Violation;
use anyhow::Result;
use std::fmt;
use tracing::warn;

/// Closed enumeration of scanner rules, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleId {
    ConsentMechanism,
    PrivacyPolicy,
    ContactInfo,
    ImageAltText,
    HeadingStructure,
    FormLabels,
    LinkText,
    KeyboardAccess,
    Landmarks,
    TransportEncryption,
    ExternalScripts,
    Metadata,
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleId::ConsentMechanism => "consent_mechanism",
            RuleId::PrivacyPolicy => "privacy_policy",
            RuleId::ContactInfo => "contact_info",
            RuleId::ImageAltText => "image_alt_text",
            RuleId::HeadingStructure => "heading_structure",
            RuleId::FormLabels => "form_labels",
            RuleId::LinkText => "link_text",
            RuleId::KeyboardAccess => "keyboard_access",
            RuleId::Landmarks => "landmarks",
            RuleId::TransportEncryption => "transport_encryption",
            RuleId::ExternalScripts => "external_scripts",
            RuleId::Metadata => "metadata",
        };
        write!(f, "{}", name)
    }
}

/// A pure rule check: reads the document, returns zero or more violations.
pub type RuleFn = fn(&Document, &RequestContext) -> Result<Vec<Violation>>;

/// The fixed rule registry. Output ordering follows this declaration
/// order, which makes repeated scans of the same document byte-identical.
const RULES: &[(RuleId, RuleFn)] = &[
    (RuleId::ConsentMechanism, rules::check_consent_mechanism),
    (RuleId::PrivacyPolicy, rules::check_privacy_policy),
    (RuleId::ContactInfo, rules::check_contact_info),
    (RuleId::ImageAltText, rules::check_image_alt_text),
    (RuleId::HeadingStructure, rules::check_heading_structure),
    (RuleId::FormLabels, rules::check_form_labels),
    (RuleId::LinkText, rules::check_link_text),
    (RuleId::KeyboardAccess, rules::check_keyboard_access),
    (RuleId::Landmarks, rules::check_landmarks),
    (RuleId::TransportEncryption, rules::check_transport_encryption),
    (RuleId::ExternalScripts, rules::check_external_scripts),
    (RuleId::Metadata, rules::check_metadata),
];

/// Number of registered rules.
pub fn rule_count() -> usize {
    RULES.len()
}

/// Result of one scan: violations in rule order plus per-rule warnings.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub violations: Vec<Violation>,
    pub warnings: Vec<String>,
}

/// Rule-based compliance scanner.
pub struct Scanner;

impl Scanner {
    pub fn new() -> Self {
        Self
    }

    /// Run every registered rule against the document.
    ///
    /// A rule returning an error contributes zero violations and a
    /// scanner-level warning; the remaining rules still run.
    pub fn scan(&self, document: &Document, context: &RequestContext) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();

        for (rule_id, rule) in RULES {
            match rule(document, context) {
                Ok(mut violations) => outcome.violations.append(&mut violations),
                Err(e) => {
                    warn!("Rule {} failed: {}", rule_id, e);
                    outcome
                        .warnings
                        .push(format!("rule {} failed: {}", rule_id, e));
                }
            }
        }

        outcome
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn compliant_document() -> Document {
        let json = r#"{
            "tag": "html",
            "children": [
                {"tag": "head", "children": [
                    {"tag": "title", "text": "Acme Store - Home"},
                    {"tag": "meta", "attributes": {"name": "description", "content": "Shop at Acme"}}
                ]},
                {"tag": "body", "children": [
                    {"tag": "header", "children": [
                        {"tag": "h1", "text": "Acme Store"},
                        {"tag": "nav", "children": [
                            {"tag": "a", "attributes": {"href": "/products"}, "text": "Browse products"},
                            {"tag": "a", "attributes": {"href": "/privacy"}, "text": "Privacy policy"}
                        ]}
                    ]},
                    {"tag": "main", "children": [
                        {"tag": "img", "attributes": {"src": "hero.png", "alt": "Storefront"}},
                        {"tag": "form", "children": [
                            {"tag": "label", "attributes": {"for": "email"}, "text": "Email"},
                            {"tag": "input", "attributes": {"type": "email", "id": "email"}}
                        ]}
                    ]},
                    {"tag": "footer", "children": [
                        {"tag": "div", "attributes": {"id": "cookie-consent"}, "text": "We use cookies"},
                        {"tag": "p", "text": "Contact us: hello@acme.example"}
                    ]}
                ]}
            ]
        }"#;
        Document::from_json(json).unwrap()
    }

    fn non_compliant_document() -> Document {
        let json = r#"{
            "tag": "html",
            "children": [
                {"tag": "head", "children": []},
                {"tag": "body", "children": [
                    {"tag": "img", "attributes": {"src": "a.png"}},
                    {"tag": "img", "attributes": {"src": "b.png"}},
                    {"tag": "img", "attributes": {"src": "c.png"}},
                    {"tag": "input", "attributes": {"type": "text", "name": "q"}},
                    {"tag": "a", "text": "menu"},
                    {"tag": "a", "attributes": {"href": "/x"}, "text": "click here"},
                    {"tag": "script", "attributes": {"src": "https://cdn.evil.example/t.js"}}
                ]}
            ]
        }"#;
        Document::from_json(json).unwrap()
    }

    #[test]
    fn test_compliant_document_yields_no_violations() {
        let doc = compliant_document();
        let ctx = RequestContext::from_url("https://acme.example/");
        let outcome = Scanner::new().scan(&doc, &ctx);

        assert!(
            outcome.violations.is_empty(),
            "unexpected violations: {:?}",
            outcome.violations
        );
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_non_compliant_document_scenario() {
        let doc = non_compliant_document();
        let ctx = RequestContext::from_url("http://acme.example/");
        let outcome = Scanner::new().scan(&doc, &ctx);

        let kinds: Vec<&str> = outcome.violations.iter().map(|v| v.kind.as_str()).collect();
        assert!(kinds.contains(&"wcag.missing_alt"));
        assert!(kinds.contains(&"security.no_encryption"));

        let alt = outcome
            .violations
            .iter()
            .find(|v| v.kind == "wcag.missing_alt")
            .unwrap();
        assert!(alt.subject.contains('3'));

        let encryption = outcome
            .violations
            .iter()
            .find(|v| v.kind == "security.no_encryption")
            .unwrap();
        assert_eq!(encryption.severity, Severity::Critical);
    }

    #[test]
    fn test_scan_is_deterministic() {
        let doc = non_compliant_document();
        let ctx = RequestContext::from_url("http://acme.example/");
        let scanner = Scanner::new();

        let first = serde_json::to_string(&scanner.scan(&doc, &ctx).violations).unwrap();
        let second = serde_json::to_string(&scanner.scan(&doc, &ctx).violations).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_violations_follow_rule_declaration_order() {
        let doc = non_compliant_document();
        let ctx = RequestContext::from_url("http://acme.example/");
        let outcome = Scanner::new().scan(&doc, &ctx);

        let cookie_pos = outcome
            .violations
            .iter()
            .position(|v| v.kind == "gdpr.cookie_banner");
        let seo_pos = outcome
            .violations
            .iter()
            .position(|v| v.kind == "seo.missing_meta_description");
        assert!(cookie_pos.unwrap() < seo_pos.unwrap());
    }

    #[test]
    fn test_every_violation_has_a_citation() {
        let doc = non_compliant_document();
        let ctx = RequestContext::from_url("http://acme.example/");
        let outcome = Scanner::new().scan(&doc, &ctx);

        assert!(!outcome.violations.is_empty());
        for violation in &outcome.violations {
            assert!(!violation.regulation.is_empty(), "{}", violation.kind);
            assert!(!violation.suggestion.is_empty(), "{}", violation.kind);
        }
    }
}
