//! Individual scanner rule implementations.
//!
//! Each check is a pure function over the Document Model. Severities are
//! fixed per rule; citations come from the static citation table.

use crate::citations::citation_for;
use crate::document::{Document, Element, RequestContext};
use crate::models::{Severity, Violation};
use anyhow::Result;

/// Input types that require an accessible label.
const LABELLED_INPUT_TYPES: &[&str] = &["text", "email", "password", "tel", "url"];

/// Link texts that carry no purpose information.
const GENERIC_LINK_TEXTS: &[&str] = &["click here", "read more", "more", "here", "link"];

/// Landmark tags and ARIA landmark roles for screen-reader navigation.
const LANDMARK_TAGS: &[&str] = &["nav", "main", "header", "footer", "aside"];
const LANDMARK_ROLES: &[&str] = &["navigation", "main", "banner", "contentinfo", "complementary"];

fn violation(
    kind: &str,
    severity: Severity,
    subject: &str,
    description: String,
    suggestion: &str,
) -> Violation {
    Violation {
        kind: kind.to_string(),
        severity,
        subject: subject.to_string(),
        description,
        regulation: citation_for(kind),
        suggestion: suggestion.to_string(),
    }
}

/// GDPR: a consent mechanism must be present.
pub fn check_consent_mechanism(
    document: &Document,
    _context: &RequestContext,
) -> Result<Vec<Violation>> {
    let has_banner = document
        .find_first(|e| e.id_or_class_contains(&["cookie", "consent", "gdpr"]))
        .is_some();

    if has_banner {
        return Ok(vec![]);
    }

    Ok(vec![violation(
        "gdpr.cookie_banner",
        Severity::Critical,
        "document",
        "Missing cookie consent banner required by GDPR Article 7".to_string(),
        "Implement a cookie consent banner with accept/reject options",
    )])
}

/// GDPR: a privacy policy link must be reachable.
pub fn check_privacy_policy(
    document: &Document,
    _context: &RequestContext,
) -> Result<Vec<Violation>> {
    let has_link = document
        .find_first(|e| {
            e.tag == "a"
                && (e.text.to_lowercase().contains("privacy")
                    || e.attr("href")
                        .map(|h| h.to_lowercase().contains("privacy"))
                        .unwrap_or(false))
        })
        .is_some();

    if has_link {
        return Ok(vec![]);
    }

    Ok(vec![violation(
        "gdpr.privacy_policy",
        Severity::High,
        "navigation",
        "Missing privacy policy link required by GDPR Article 13".to_string(),
        "Add a visible privacy policy link in the footer or header",
    )])
}

/// GDPR: data controller contact information must be present.
pub fn check_contact_info(document: &Document, _context: &RequestContext) -> Result<Vec<Violation>> {
    let text = document.root.text_content().to_lowercase();
    let has_contact = ["contact", "email", "phone", "@"]
        .iter()
        .any(|needle| text.contains(needle));

    if has_contact {
        return Ok(vec![]);
    }

    Ok(vec![violation(
        "gdpr.contact_info",
        Severity::Medium,
        "document",
        "Missing data controller contact information".to_string(),
        "Provide clear contact information for data protection queries",
    )])
}

/// WCAG: images need alternative text.
pub fn check_image_alt_text(
    document: &Document,
    _context: &RequestContext,
) -> Result<Vec<Violation>> {
    let missing: Vec<&Element> = document
        .root
        .find_all("img")
        .into_iter()
        .filter(|img| !img.has_attr("alt") && !img.has_attr("aria-label"))
        .collect();

    if missing.is_empty() {
        return Ok(vec![]);
    }

    Ok(vec![violation(
        "wcag.missing_alt",
        Severity::High,
        &format!("{} images", missing.len()),
        format!("Images missing alt text: {} violations", missing.len()),
        "Add descriptive alt text to all images",
    )])
}

/// WCAG: exactly one main heading.
pub fn check_heading_structure(
    document: &Document,
    _context: &RequestContext,
) -> Result<Vec<Violation>> {
    let h1_count = document.root.find_all("h1").len();

    let violations = match h1_count {
        0 => vec![violation(
            "wcag.missing_h1",
            Severity::High,
            "document",
            "Missing main heading (h1) element".to_string(),
            "Add a descriptive h1 heading to the page",
        )],
        1 => vec![],
        n => vec![violation(
            "wcag.multiple_h1",
            Severity::Medium,
            "document",
            format!("Multiple h1 elements found ({})", n),
            "Use only one h1 element per page",
        )],
    };

    Ok(violations)
}

/// WCAG: text-like inputs need labels.
pub fn check_form_labels(document: &Document, _context: &RequestContext) -> Result<Vec<Violation>> {
    let unlabeled = unlabeled_inputs(document);

    if unlabeled.is_empty() {
        return Ok(vec![]);
    }

    Ok(vec![violation(
        "wcag.unlabeled_inputs",
        Severity::High,
        &format!("{} form inputs", unlabeled.len()),
        format!(
            "Form inputs without proper labels: {} violations",
            unlabeled.len()
        ),
        "Add proper labels or aria-label attributes to all form inputs",
    )])
}

/// Shared with the mapper: text-like inputs lacking any label association.
pub fn unlabeled_inputs(document: &Document) -> Vec<&Element> {
    let labelled_ids: Vec<&str> = document
        .root
        .find_all("label")
        .into_iter()
        .filter_map(|label| label.attr("for"))
        .collect();

    document
        .root
        .find_all("input")
        .into_iter()
        .filter(|input| {
            let input_type = input.attr("type").unwrap_or("");
            if !LABELLED_INPUT_TYPES.contains(&input_type) {
                return false;
            }
            let has_label = input
                .attr("id")
                .map(|id| labelled_ids.contains(&id))
                .unwrap_or(false);
            !has_label && !input.has_attr("aria-label") && !input.has_attr("aria-labelledby")
        })
        .collect()
}

/// WCAG: link text must convey purpose.
pub fn check_link_text(document: &Document, _context: &RequestContext) -> Result<Vec<Violation>> {
    let generic: Vec<&Element> = document
        .root
        .find_all("a")
        .into_iter()
        .filter(|a| {
            a.has_attr("href") && GENERIC_LINK_TEXTS.contains(&a.text.trim().to_lowercase().as_str())
        })
        .collect();

    if generic.is_empty() {
        return Ok(vec![]);
    }

    Ok(vec![violation(
        "wcag.generic_links",
        Severity::Medium,
        &format!("{} links", generic.len()),
        format!(
            "Links with non-descriptive text: {} violations",
            generic.len()
        ),
        "Use descriptive link text that indicates the link's purpose",
    )])
}

/// ADA: interactive elements must be keyboard operable.
pub fn check_keyboard_access(
    document: &Document,
    _context: &RequestContext,
) -> Result<Vec<Violation>> {
    let inaccessible = keyboard_trap_elements(document);

    if inaccessible.is_empty() {
        return Ok(vec![]);
    }

    Ok(vec![violation(
        "ada.keyboard_access",
        Severity::High,
        &format!("{} interactive elements", inaccessible.len()),
        "Interactive elements not accessible via keyboard".to_string(),
        "Ensure all interactive elements are keyboard accessible",
    )])
}

/// Shared with the mapper: anchors without href and tabindex traps.
pub fn keyboard_trap_elements(document: &Document) -> Vec<&Element> {
    document
        .root
        .descendants()
        .into_iter()
        .filter(|e| {
            (e.tag == "a" && !e.has_attr("href")) || e.attr("tabindex") == Some("-1")
        })
        .collect()
}

/// ADA: the page needs landmark regions for screen-reader navigation.
pub fn check_landmarks(document: &Document, _context: &RequestContext) -> Result<Vec<Violation>> {
    let count = document
        .root
        .descendants()
        .into_iter()
        .filter(|e| {
            LANDMARK_TAGS.contains(&e.tag.as_str())
                || e.attr("role")
                    .map(|r| LANDMARK_ROLES.contains(&r))
                    .unwrap_or(false)
        })
        .count();

    if count >= 2 {
        return Ok(vec![]);
    }

    Ok(vec![violation(
        "ada.missing_landmarks",
        Severity::Medium,
        "document structure",
        "Insufficient landmark regions for screen reader navigation".to_string(),
        "Add semantic HTML5 elements or ARIA landmark roles",
    )])
}

/// Security: the page must be served over an encrypted transport.
pub fn check_transport_encryption(
    _document: &Document,
    context: &RequestContext,
) -> Result<Vec<Violation>> {
    if context.is_encrypted() {
        return Ok(vec![]);
    }

    Ok(vec![violation(
        "security.no_encryption",
        Severity::Critical,
        "protocol",
        "Document not served over HTTPS".to_string(),
        "Install a TLS certificate and redirect HTTP to HTTPS",
    )])
}

/// Security: flag scripts loaded from other origins.
pub fn check_external_scripts(
    document: &Document,
    context: &RequestContext,
) -> Result<Vec<Violation>> {
    let external: Vec<&Element> = document
        .root
        .find_all("script")
        .into_iter()
        .filter(|script| {
            script
                .attr("src")
                .map(|src| src.starts_with("http") && !src.starts_with(&context.url))
                .unwrap_or(false)
        })
        .collect();

    if external.is_empty() {
        return Ok(vec![]);
    }

    Ok(vec![violation(
        "security.external_scripts",
        Severity::Medium,
        &format!("{} external scripts", external.len()),
        "External scripts may pose security risks".to_string(),
        "Review and validate all external script sources",
    )])
}

/// SEO: title and meta description must be present and non-empty.
pub fn check_metadata(document: &Document, _context: &RequestContext) -> Result<Vec<Violation>> {
    let mut violations = Vec::new();

    let has_title = document
        .find_first(|e| e.tag == "title" && !e.text.trim().is_empty())
        .is_some();
    if !has_title {
        violations.push(violation(
            "seo.missing_title",
            Severity::Medium,
            "title tag",
            "Missing or empty title tag".to_string(),
            "Add a descriptive page title",
        ));
    }

    let has_description = document
        .find_first(|e| {
            e.tag == "meta"
                && e.attr("name") == Some("description")
                && e.has_attr("content")
        })
        .is_some();
    if !has_description {
        violations.push(violation(
            "seo.missing_meta_description",
            Severity::Low,
            "meta tags",
            "Missing meta description".to_string(),
            "Add a descriptive meta description (150-160 characters)",
        ));
    }

    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> Document {
        Document::from_json(json).unwrap()
    }

    fn ctx() -> RequestContext {
        RequestContext::from_url("https://example.com/")
    }

    #[test]
    fn test_consent_mechanism_detects_banner_by_class() {
        let with_banner = doc(
            r#"{"tag": "html", "children": [
                {"tag": "div", "attributes": {"class": "cookie-notice"}}
            ]}"#,
        );
        assert!(check_consent_mechanism(&with_banner, &ctx()).unwrap().is_empty());

        let without = doc(r#"{"tag": "html", "children": []}"#);
        let violations = check_consent_mechanism(&without, &ctx()).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, "gdpr.cookie_banner");
        assert_eq!(violations[0].severity, Severity::Critical);
    }

    #[test]
    fn test_privacy_policy_matches_href() {
        let page = doc(
            r#"{"tag": "html", "children": [
                {"tag": "a", "attributes": {"href": "/legal/privacy-policy"}, "text": "Legal"}
            ]}"#,
        );
        assert!(check_privacy_policy(&page, &ctx()).unwrap().is_empty());
    }

    #[test]
    fn test_image_alt_counts_only_unlabelled() {
        let page = doc(
            r#"{"tag": "html", "children": [
                {"tag": "img", "attributes": {"src": "a.png"}},
                {"tag": "img", "attributes": {"src": "b.png", "alt": "B"}},
                {"tag": "img", "attributes": {"src": "c.png", "aria-label": "C"}}
            ]}"#,
        );
        let violations = check_image_alt_text(&page, &ctx()).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].subject, "1 images");
    }

    #[test]
    fn test_heading_structure_variants() {
        let none = doc(r#"{"tag": "html", "children": []}"#);
        assert_eq!(
            check_heading_structure(&none, &ctx()).unwrap()[0].kind,
            "wcag.missing_h1"
        );

        let two = doc(
            r#"{"tag": "html", "children": [
                {"tag": "h1", "text": "A"}, {"tag": "h1", "text": "B"}
            ]}"#,
        );
        let violations = check_heading_structure(&two, &ctx()).unwrap();
        assert_eq!(violations[0].kind, "wcag.multiple_h1");
        assert!(violations[0].description.contains('2'));
    }

    #[test]
    fn test_form_labels_accepts_label_for_and_aria() {
        let page = doc(
            r#"{"tag": "html", "children": [
                {"tag": "label", "attributes": {"for": "mail"}, "text": "Email"},
                {"tag": "input", "attributes": {"type": "email", "id": "mail"}},
                {"tag": "input", "attributes": {"type": "text", "aria-label": "Search"}},
                {"tag": "input", "attributes": {"type": "text", "name": "bare"}},
                {"tag": "input", "attributes": {"type": "hidden"}}
            ]}"#,
        );
        let unlabeled = unlabeled_inputs(&page);
        assert_eq!(unlabeled.len(), 1);
        assert_eq!(unlabeled[0].attr("name"), Some("bare"));
    }

    #[test]
    fn test_keyboard_access_flags_traps() {
        let page = doc(
            r#"{"tag": "html", "children": [
                {"tag": "a", "text": "menu"},
                {"tag": "button", "attributes": {"tabindex": "-1"}, "text": "Hidden"},
                {"tag": "a", "attributes": {"href": "/ok"}, "text": "Fine"}
            ]}"#,
        );
        assert_eq!(keyboard_trap_elements(&page).len(), 2);
        let violations = check_keyboard_access(&page, &ctx()).unwrap();
        assert_eq!(violations[0].subject, "2 interactive elements");
    }

    #[test]
    fn test_landmarks_accepts_roles() {
        let page = doc(
            r#"{"tag": "html", "children": [
                {"tag": "div", "attributes": {"role": "navigation"}},
                {"tag": "div", "attributes": {"role": "main"}}
            ]}"#,
        );
        assert!(check_landmarks(&page, &ctx()).unwrap().is_empty());
    }

    #[test]
    fn test_transport_encryption_uses_context_scheme() {
        let page = doc(r#"{"tag": "html", "children": []}"#);
        let plain = RequestContext::from_url("http://example.com/");
        let violations = check_transport_encryption(&page, &plain).unwrap();
        assert_eq!(violations[0].kind, "security.no_encryption");

        assert!(check_transport_encryption(&page, &ctx()).unwrap().is_empty());
    }

    #[test]
    fn test_external_scripts_ignores_same_origin() {
        let page = doc(
            r#"{"tag": "html", "children": [
                {"tag": "script", "attributes": {"src": "https://example.com/app.js"}},
                {"tag": "script", "attributes": {"src": "https://cdn.other.example/lib.js"}},
                {"tag": "script", "attributes": {"src": "/local.js"}}
            ]}"#,
        );
        let violations = check_external_scripts(&page, &ctx()).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].subject, "1 external scripts");
    }

    #[test]
    fn test_metadata_reports_both_gaps() {
        let page = doc(r#"{"tag": "html", "children": []}"#);
        let violations = check_metadata(&page, &ctx()).unwrap();
        let kinds: Vec<&str> = violations.iter().map(|v| v.kind.as_str()).collect();
        assert_eq!(kinds, vec!["seo.missing_title", "seo.missing_meta_description"]);
    }
}
