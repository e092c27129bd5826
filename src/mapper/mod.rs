//! Issue Mapper: resolves violations to concrete element locators,
//! assigns remediation priorities, and computes the scored compliance
//! report plus the severity priority matrix.

use crate::config::ScoringConfig;
use crate::document::{Document, Element, ElementLocator};
use crate::models::{
    ComplianceReport, MappedIssue, NarrativeFinding, PriorityMatrix, RecordSource, Severity,
    SeverityBreakdown, Violation,
};
use crate::scanner::{keyboard_trap_elements, unlabeled_inputs};
use std::collections::BTreeMap;

/// Everything the mapper produces for one audit.
#[derive(Debug, Clone)]
pub struct MappingOutcome {
    pub issues: Vec<MappedIssue>,
    pub report: ComplianceReport,
    pub matrix: PriorityMatrix,
}

/// Maps violations to elements, regulations, and priorities.
pub struct IssueMapper {
    scoring: ScoringConfig,
}

impl IssueMapper {
    pub fn new(scoring: ScoringConfig) -> Self {
        Self { scoring }
    }

    /// Map each violation to a locator and priority, then score the set.
    pub fn map(&self, document: &Document, violations: &[Violation]) -> MappingOutcome {
        let mut issues: Vec<MappedIssue> = Vec::with_capacity(violations.len());
        let mut counters = SeverityBreakdown::default();

        for violation in violations {
            let locator = resolve_locator(document, &violation.kind);
            let index = index_for(&counters, violation.severity);
            counters.record(violation.severity);

            issues.push(MappedIssue {
                kind: violation.kind.clone(),
                severity: violation.severity,
                subject: violation.subject.clone(),
                description: violation.description.clone(),
                regulation: violation.regulation.clone(),
                suggestion: violation.suggestion.clone(),
                element_path: locator.path,
                element_selector: locator.selector,
                business_impact: business_impact(violation.severity).to_string(),
                fix_priority: fix_priority(violation.severity, index),
                estimated_effort: estimated_effort(&violation.kind, violation.severity).to_string(),
                source: RecordSource::Technical,
            });
        }

        // Most urgent first; stable sort preserves discovery order on ties.
        issues.sort_by_key(|issue| issue.fix_priority);

        let report = self.compliance_report(&issues);
        let matrix = PriorityMatrix::from_issues(&issues);

        MappingOutcome {
            issues,
            report,
            matrix,
        }
    }

    /// Map narrative findings into issue records, continuing the
    /// priority sequence from `counters` (the technical severity counts).
    pub fn map_narrative(
        &self,
        document: &Document,
        findings: &[NarrativeFinding],
        source: RecordSource,
        counters: &mut SeverityBreakdown,
    ) -> Vec<MappedIssue> {
        findings
            .iter()
            .map(|finding| {
                let locator = resolve_locator(document, &finding.kind);
                let index = index_for(counters, finding.severity);
                counters.record(finding.severity);

                MappedIssue {
                    kind: finding.kind.clone(),
                    severity: finding.severity,
                    subject: finding.subject.clone(),
                    description: finding.description.clone(),
                    regulation: crate::citations::citation_for(&finding.kind),
                    suggestion: String::new(),
                    element_path: locator.path,
                    element_selector: locator.selector,
                    business_impact: business_impact(finding.severity).to_string(),
                    fix_priority: fix_priority(finding.severity, index),
                    estimated_effort: estimated_effort(&finding.kind, finding.severity)
                        .to_string(),
                    source,
                }
            })
            .collect()
    }

    /// Score a set of mapped issues.
    pub fn compliance_report(&self, issues: &[MappedIssue]) -> ComplianceReport {
        let mut severity_breakdown = SeverityBreakdown::default();
        let mut category_breakdown: BTreeMap<String, usize> = BTreeMap::new();

        for issue in issues {
            severity_breakdown.record(issue.severity);
            *category_breakdown.entry(issue.family().to_string()).or_insert(0) += 1;
        }

        let penalty = self.scoring.critical_penalty as i64 * severity_breakdown.critical as i64
            + self.scoring.high_penalty as i64 * severity_breakdown.high as i64
            + self.scoring.medium_penalty as i64 * severity_breakdown.medium as i64
            + self.scoring.low_penalty as i64 * severity_breakdown.low as i64;
        let compliance_score = (100 - penalty).clamp(0, 100) as u32;

        ComplianceReport {
            total_issues: issues.len(),
            estimated_fix_time: estimated_fix_time(&severity_breakdown),
            severity_breakdown,
            category_breakdown,
            compliance_score,
        }
    }
}

/// Priority assignment: capped per-severity counters keep critical
/// issues at 1-2, high at 2-4, medium at 5-7, and low at 8+.
fn fix_priority(severity: Severity, index_within_severity: u32) -> u32 {
    match severity {
        Severity::Critical => (1 + index_within_severity).min(2),
        Severity::High => (2 + index_within_severity).min(4),
        Severity::Medium => (5 + index_within_severity).min(7),
        Severity::Low => 8 + index_within_severity,
    }
}

fn index_for(counters: &SeverityBreakdown, severity: Severity) -> u32 {
    let count = match severity {
        Severity::Critical => counters.critical,
        Severity::High => counters.high,
        Severity::Medium => counters.medium,
        Severity::Low => counters.low,
    };
    count as u32
}

fn business_impact(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => {
            "Legal liability, potential lawsuits, immediate compliance action required"
        }
        Severity::High => "Significant user accessibility barriers, compliance violations",
        Severity::Medium => "User experience issues, potential compliance gaps",
        Severity::Low => "Minor usability issues, best practice improvements",
    }
}

fn estimated_effort(kind: &str, severity: Severity) -> &'static str {
    if kind.contains("cookie_banner") || kind.contains("no_encryption") {
        "1 day"
    } else if kind.contains("missing_alt") {
        "3 hours"
    } else if kind.contains("unlabeled_inputs") {
        "2 hours"
    } else if kind.contains("keyboard_access") {
        "4 hours"
    } else {
        match severity {
            Severity::Critical | Severity::High => "4 hours",
            Severity::Medium => "2 hours",
            Severity::Low => "1 hour",
        }
    }
}

/// Resolve the most specific matching element for an issue kind, falling
/// back to the whole-document locator when nothing concrete matches.
fn resolve_locator(document: &Document, kind: &str) -> ElementLocator {
    if kind.contains("missing_alt") {
        return document.locate(|e| e.tag == "img" && !e.has_attr("alt") && !e.has_attr("aria-label"));
    }
    if kind.contains("unlabeled_inputs") {
        return locate_element(document, unlabeled_inputs(document).first().copied());
    }
    if kind.contains("keyboard_access") {
        return locate_element(document, keyboard_trap_elements(document).first().copied());
    }
    if kind.contains("cookie_banner") {
        return document.locate(|e| e.tag == "body");
    }
    if kind.contains("multiple_h1") {
        return document.locate(|e| e.tag == "h1");
    }
    if kind.contains("generic_links") {
        return document.locate(|e| {
            e.tag == "a"
                && e.has_attr("href")
                && ["click here", "read more", "more", "here", "link"]
                    .contains(&e.text.trim().to_lowercase().as_str())
        });
    }
    if kind.contains("external_scripts") {
        return document.locate(|e| {
            e.tag == "script"
                && e.attr("src").map(|s| s.starts_with("http")).unwrap_or(false)
        });
    }
    if kind.starts_with("seo.") {
        return document.locate(|e| e.tag == "head");
    }

    document.whole_document_locator()
}

fn locate_element(document: &Document, element: Option<&Element>) -> ElementLocator {
    match element {
        // Pointer identity pins down the exact node the scanner flagged.
        Some(target) => document.locate(|e| std::ptr::eq(e, target)),
        None => document.whole_document_locator(),
    }
}

/// Render a total-hours estimate the way operators read it.
fn estimated_fix_time(breakdown: &SeverityBreakdown) -> String {
    let total_hours = breakdown.critical * 8 + breakdown.high * 4 + breakdown.medium * 2
        + breakdown.low;

    if total_hours <= 8 {
        format!("{} hours", total_hours)
    } else if total_hours <= 40 {
        format!("{} days", total_hours / 8)
    } else {
        format!("{} weeks", total_hours / 40)
    }
}
