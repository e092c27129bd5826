//! Remediation Advisor: actionable fix plans for mapped issues.
//!
//! Turns mapped issues into concrete fixes with code examples,
//! implementation steps, and effort estimates. Templates are keyed by
//! kind substring; unknown kinds always get a usable generic fix.

use crate::models::{MappedIssue, RemediationFix, RemediationPhases, RemediationPlan, Severity};
use std::collections::BTreeSet;

/// Kind patterns in recommended implementation order: consent and
/// transport first, then structural accessibility, then presentation.
const PRIORITY_PATTERNS: &[&str] = &[
    "no_encryption",
    "cookie_banner",
    "missing_alt",
    "unlabeled_inputs",
    "keyboard_access",
    "seo.",
];

/// Generates remediation plans from mapped issues.
pub struct RemediationAdvisor;

impl RemediationAdvisor {
    pub fn new() -> Self {
        Self
    }

    /// Build the full remediation plan: one fix per distinct issue kind,
    /// a recommended implementation order, phased rollout buckets, and a
    /// total hour estimate.
    pub fn plan(&self, issues: &[MappedIssue]) -> RemediationPlan {
        let mut fixes: Vec<RemediationFix> = Vec::new();
        let mut seen_kinds: BTreeSet<String> = BTreeSet::new();

        for issue in issues {
            if !seen_kinds.insert(issue.kind.clone()) {
                continue;
            }
            fixes.push(fix_for(&issue.kind));
        }

        let estimated_total_hours = fixes
            .iter()
            .map(|fix| effort_hours(&fix.estimated_effort))
            .sum();

        RemediationPlan {
            priority_order: prioritize(&fixes),
            phases: phase_buckets(issues),
            estimated_total_hours,
            fixes,
        }
    }
}

impl Default for RemediationAdvisor {
    fn default() -> Self {
        Self::new()
    }
}

/// Select the fix template whose pattern occurs in the kind, falling
/// back to a generic fix for unrecognized kinds.
fn fix_for(kind: &str) -> RemediationFix {
    if kind.contains("cookie_banner") {
        cookie_banner_fix(kind)
    } else if kind.contains("missing_alt") {
        alt_text_fix(kind)
    } else if kind.contains("unlabeled_inputs") {
        form_label_fix(kind)
    } else if kind.contains("keyboard_access") {
        keyboard_access_fix(kind)
    } else if kind.contains("no_encryption") {
        encryption_fix(kind)
    } else if kind.contains("seo.") {
        meta_tags_fix(kind)
    } else {
        generic_fix(kind)
    }
}

/// Recommended implementation order: pattern-priority kinds first, then
/// remaining fixes in order of appearance.
fn prioritize(fixes: &[RemediationFix]) -> Vec<String> {
    let mut ordered: Vec<String> = Vec::new();

    for pattern in PRIORITY_PATTERNS {
        for fix in fixes {
            if fix.issue_kind.contains(pattern) && !ordered.contains(&fix.issue_kind) {
                ordered.push(fix.issue_kind.clone());
            }
        }
    }

    for fix in fixes {
        if !ordered.contains(&fix.issue_kind) {
            ordered.push(fix.issue_kind.clone());
        }
    }

    ordered
}

/// Bucket issue kinds by severity for phased rollout. Low-severity
/// kinds share the medium phase; nothing is dropped.
fn phase_buckets(issues: &[MappedIssue]) -> RemediationPhases {
    let mut phases = RemediationPhases::default();

    for issue in issues {
        let bucket = match issue.severity {
            Severity::Critical => &mut phases.critical_immediate,
            Severity::High => &mut phases.high_priority,
            Severity::Medium | Severity::Low => &mut phases.medium_priority,
        };
        if !bucket.contains(&issue.kind) {
            bucket.push(issue.kind.clone());
        }
    }

    phases
}

/// Parse an effort string into hours. "N days" counts as N*8 hours;
/// anything unparseable counts as 2 hours.
fn effort_hours(effort: &str) -> u32 {
    let first_number = effort
        .split_whitespace()
        .next()
        .and_then(|token| token.parse::<u32>().ok());

    if effort.contains("day") {
        first_number.unwrap_or(1) * 8
    } else if effort.contains("hour") {
        first_number.unwrap_or(2)
    } else {
        2
    }
}

fn cookie_banner_fix(kind: &str) -> RemediationFix {
    RemediationFix {
        issue_kind: kind.to_string(),
        description:
            "Implement a GDPR-compliant cookie consent banner with accept/reject options"
                .to_string(),
        example: r#"<script src="https://cdn.jsdelivr.net/gh/orestbida/cookieconsent@v3.0.0/dist/cookieconsent.umd.js"></script>
<script>
CookieConsent.run({
    categories: {
        necessary: { readOnly: true },
        analytics: {}
    },
    language: {
        default: "en",
        translations: {
            en: {
                consentModal: {
                    title: "We use cookies",
                    acceptAllBtn: "Accept all",
                    acceptNecessaryBtn: "Accept necessary only"
                }
            }
        }
    }
});
</script>"#
            .to_string(),
        steps: vec![
            "Add a cookie consent library to the page".to_string(),
            "Configure consent categories (necessary, analytics, marketing)".to_string(),
            "Customize banner text and styling".to_string(),
            "Block non-essential cookies until consent is given".to_string(),
            "Update the privacy policy with cookie information".to_string(),
            "Test accept/reject functionality".to_string(),
        ],
        validation:
            "Test banner appearance, accept/reject functionality, and verify cookies are only set after consent"
                .to_string(),
        estimated_effort: "4 hours".to_string(),
    }
}

fn alt_text_fix(kind: &str) -> RemediationFix {
    RemediationFix {
        issue_kind: kind.to_string(),
        description: "Add descriptive alt text to all images for screen reader accessibility"
            .to_string(),
        example: r#"<!-- Before -->
<img src="product-image.jpg">

<!-- After -->
<img src="product-image.jpg" alt="Blue wireless headphones with noise cancellation">

<!-- Decorative images -->
<img src="decorative-border.jpg" alt="" role="presentation">"#
            .to_string(),
        steps: vec![
            "Audit all images on the page".to_string(),
            "Identify decorative vs informative images".to_string(),
            "Write descriptive alt text for informative images".to_string(),
            "Use empty alt=\"\" for decorative images".to_string(),
            "Test with screen reader software".to_string(),
        ],
        validation: "Use NVDA or JAWS to verify alt text is read correctly".to_string(),
        estimated_effort: "3 hours".to_string(),
    }
}

fn form_label_fix(kind: &str) -> RemediationFix {
    RemediationFix {
        issue_kind: kind.to_string(),
        description: "Add proper labels to all form inputs for accessibility".to_string(),
        example: r#"<!-- Explicit label -->
<label for="email">Email Address (required)</label>
<input type="email" id="email" name="email" required>

<!-- ARIA label for inputs without visible labels -->
<input type="search" aria-label="Search products" placeholder="Search...">"#
            .to_string(),
        steps: vec![
            "Identify all form inputs without labels".to_string(),
            "Add explicit labels using for/id attributes".to_string(),
            "Use aria-label for inputs without visible labels".to_string(),
            "Group related inputs with fieldset/legend".to_string(),
            "Test tab navigation and screen reader compatibility".to_string(),
        ],
        validation:
            "Navigate the form using only the keyboard and verify every field is announced by screen readers"
                .to_string(),
        estimated_effort: "2 hours".to_string(),
    }
}

fn keyboard_access_fix(kind: &str) -> RemediationFix {
    RemediationFix {
        issue_kind: kind.to_string(),
        description: "Ensure all interactive elements are reachable via keyboard navigation"
            .to_string(),
        example: r##"<!-- Skip link -->
<a href="#main-content" class="skip-link">Skip to main content</a>

<!-- Custom interactive element -->
<div role="button" tabindex="0" onkeypress="handleKeyPress(event)" onclick="customAction()">
    Custom Button
</div>

<style>
.skip-link:focus, button:focus, [role="button"]:focus {
    outline: 2px solid #0066cc;
    outline-offset: 2px;
}
</style>"##
            .to_string(),
        steps: vec![
            "Add skip navigation links".to_string(),
            "Give every interactive element a proper href or tabindex".to_string(),
            "Implement keyboard event handlers for custom elements".to_string(),
            "Add visible focus indicators".to_string(),
            "Verify logical tab order".to_string(),
        ],
        validation: "Navigate the entire page using only Tab, Enter, Space, and Arrow keys"
            .to_string(),
        estimated_effort: "4 hours".to_string(),
    }
}

fn encryption_fix(kind: &str) -> RemediationFix {
    RemediationFix {
        issue_kind: kind.to_string(),
        description: "Serve the site over HTTPS with a valid certificate".to_string(),
        example: r#"# Apache: redirect HTTP to HTTPS
<VirtualHost *:80>
    ServerName yourdomain.com
    Redirect permanent / https://yourdomain.com/
</VirtualHost>

<VirtualHost *:443>
    SSLEngine on
    SSLCertificateFile /path/to/certificate.crt
    SSLCertificateKeyFile /path/to/private.key
    Header always set Strict-Transport-Security "max-age=31536000; includeSubDomains"
</VirtualHost>"#
            .to_string(),
        steps: vec![
            "Obtain a certificate from a trusted CA or Let's Encrypt".to_string(),
            "Install the certificate on the web server".to_string(),
            "Redirect all HTTP traffic to HTTPS".to_string(),
            "Update internal links to use HTTPS".to_string(),
            "Add security headers (HSTS, CSP)".to_string(),
        ],
        validation: "Use SSL Labs SSL Test to verify the certificate installation and grade"
            .to_string(),
        estimated_effort: "1 day".to_string(),
    }
}

fn meta_tags_fix(kind: &str) -> RemediationFix {
    RemediationFix {
        issue_kind: kind.to_string(),
        description: "Add descriptive title and meta tags for search and social visibility"
            .to_string(),
        example: r#"<title>Descriptive Page Title - Brand Name</title>
<meta name="description" content="Compelling description under 160 characters with target keywords">
<meta property="og:title" content="Page Title">
<meta property="og:description" content="Page description">"#
            .to_string(),
        steps: vec![
            "Add a unique, descriptive title tag to every page".to_string(),
            "Write meta descriptions under 160 characters".to_string(),
            "Add Open Graph tags for social sharing".to_string(),
            "Include canonical URLs to prevent duplicate content".to_string(),
        ],
        validation: "Check search result and social media previews with the platform debug tools"
            .to_string(),
        estimated_effort: "3 hours".to_string(),
    }
}

fn generic_fix(kind: &str) -> RemediationFix {
    RemediationFix {
        issue_kind: kind.to_string(),
        description: "General compliance improvement needed".to_string(),
        example: "<!-- Review and update this element for compliance -->".to_string(),
        steps: vec![
            "Review issue details".to_string(),
            "Apply appropriate fix".to_string(),
            "Test implementation".to_string(),
        ],
        validation: "Verify compliance using accessibility testing tools".to_string(),
        estimated_effort: "2 hours".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordSource;

    fn issue(kind: &str, severity: Severity) -> MappedIssue {
        MappedIssue {
            kind: kind.to_string(),
            severity,
            subject: "test subject".to_string(),
            description: "test description".to_string(),
            regulation: "Test regulation".to_string(),
            suggestion: "Fix it".to_string(),
            element_path: "/html/body".to_string(),
            element_selector: "body".to_string(),
            business_impact: "impact".to_string(),
            fix_priority: 1,
            estimated_effort: "2 hours".to_string(),
            source: RecordSource::Technical,
        }
    }

    #[test]
    fn test_one_fix_per_distinct_kind() {
        let issues = vec![
            issue("wcag.missing_alt", Severity::High),
            issue("wcag.missing_alt", Severity::High),
            issue("gdpr.cookie_banner", Severity::Critical),
        ];

        let plan = RemediationAdvisor::new().plan(&issues);
        assert_eq!(plan.fixes.len(), 2);
    }

    #[test]
    fn test_unknown_kind_gets_generic_fix() {
        let issues = vec![issue("custom.unknown_rule", Severity::Medium)];
        let plan = RemediationAdvisor::new().plan(&issues);

        assert_eq!(plan.fixes.len(), 1);
        assert!(!plan.fixes[0].description.is_empty());
        assert_eq!(plan.fixes[0].estimated_effort, "2 hours");
    }

    #[test]
    fn test_priority_order_puts_encryption_and_consent_first() {
        let issues = vec![
            issue("seo.missing_title", Severity::Medium),
            issue("wcag.missing_alt", Severity::High),
            issue("gdpr.cookie_banner", Severity::Critical),
            issue("security.no_encryption", Severity::Critical),
        ];

        let plan = RemediationAdvisor::new().plan(&issues);
        assert_eq!(
            plan.priority_order,
            vec![
                "security.no_encryption",
                "gdpr.cookie_banner",
                "wcag.missing_alt",
                "seo.missing_title",
            ]
        );
    }

    #[test]
    fn test_unmatched_kinds_keep_appearance_order() {
        let issues = vec![
            issue("custom.second", Severity::Low),
            issue("custom.first", Severity::Low),
        ];

        let plan = RemediationAdvisor::new().plan(&issues);
        assert_eq!(plan.priority_order, vec!["custom.second", "custom.first"]);
    }

    #[test]
    fn test_phases_follow_severity() {
        let issues = vec![
            issue("security.no_encryption", Severity::Critical),
            issue("wcag.missing_alt", Severity::High),
            issue("seo.missing_title", Severity::Medium),
            issue("seo.missing_meta_description", Severity::Low),
        ];

        let plan = RemediationAdvisor::new().plan(&issues);
        assert_eq!(plan.phases.critical_immediate, vec!["security.no_encryption"]);
        assert_eq!(plan.phases.high_priority, vec!["wcag.missing_alt"]);
        assert_eq!(
            plan.phases.medium_priority,
            vec!["seo.missing_title", "seo.missing_meta_description"]
        );
    }

    #[test]
    fn test_effort_hours_parsing() {
        assert_eq!(effort_hours("3 hours"), 3);
        assert_eq!(effort_hours("1 day"), 8);
        assert_eq!(effort_hours("2 days"), 16);
        assert_eq!(effort_hours("soonish"), 2);
        assert_eq!(effort_hours("several hours"), 2);
    }

    #[test]
    fn test_total_hours_sums_per_fix() {
        let issues = vec![
            issue("security.no_encryption", Severity::Critical), // 1 day = 8
            issue("wcag.missing_alt", Severity::High),           // 3 hours
        ];

        let plan = RemediationAdvisor::new().plan(&issues);
        assert_eq!(plan.estimated_total_hours, 11);
    }
}
