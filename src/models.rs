//! Data models for the compliance auditor.
//!
//! This module contains all the core data structures used throughout
//! the application for representing violations, mapped issues,
//! remediation plans, narrative records, and the combined report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Severity level of a compliance violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Low severity - best practice gaps, minor improvements
    Low,
    /// Medium severity - user experience issues, potential compliance gaps
    Medium,
    /// High severity - accessibility barriers, compliance violations
    High,
    /// Critical severity - legal liability, immediate action required
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

impl Severity {
    /// Returns an emoji representation of the severity.
    pub fn emoji(&self) -> &'static str {
        match self {
            Severity::Low => "🟢",
            Severity::Medium => "🟡",
            Severity::High => "🟠",
            Severity::Critical => "🔴",
        }
    }

    /// Remediation rank: 0 is the most urgent.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }

    /// Parse a loosely formatted severity string, defaulting to Medium.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "critical" | "severe" => Severity::Critical,
            "high" | "urgent" => Severity::High,
            "low" | "minor" => Severity::Low,
            _ => Severity::Medium,
        }
    }
}

/// Provenance of a record: produced by the deterministic scan or
/// extracted from collaborator narrative text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordSource {
    /// Produced by the rule-based technical scanner.
    #[serde(rename = "technical")]
    Technical,
    /// Decoded from a well-formed structured block in narrative text.
    #[serde(rename = "narrative-strict")]
    NarrativeStrict,
    /// Recovered from narrative text via keyword classification.
    #[serde(rename = "narrative-heuristic")]
    NarrativeHeuristic,
    /// Role-specific conservative default; nothing usable was extracted.
    #[serde(rename = "narrative-default")]
    NarrativeDefault,
}

impl RecordSource {
    /// True for any of the narrative-derived variants.
    pub fn is_narrative(&self) -> bool {
        !matches!(self, RecordSource::Technical)
    }
}

/// A single detected deviation from a compliance rule.
///
/// Violations are immutable once created by the scanner; downstream
/// stages append new records instead of editing them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Rule tag, e.g. `gdpr.cookie_banner` or `wcag.missing_alt`.
    pub kind: String,
    /// Severity of the violation.
    pub severity: Severity,
    /// Short description of the offending element(s).
    pub subject: String,
    /// Detailed description of the violation.
    pub description: String,
    /// Regulation citation, e.g. "GDPR Article 7 - Conditions for consent".
    pub regulation: String,
    /// Suggested fix or improvement.
    pub suggestion: String,
}

impl Violation {
    /// Regulation family: the kind prefix before the first dot.
    pub fn family(&self) -> &str {
        self.kind.split('.').next().unwrap_or(&self.kind)
    }
}

/// A violation resolved to a concrete element locator, with business
/// context and remediation priority attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappedIssue {
    /// Rule tag, carried over from the violation.
    pub kind: String,
    /// Severity of the issue.
    pub severity: Severity,
    /// Short description of the offending element(s).
    pub subject: String,
    /// Detailed description of the issue.
    pub description: String,
    /// Regulation citation.
    pub regulation: String,
    /// Suggested fix.
    pub suggestion: String,
    /// Tree-position locator: `/`-joined tag[index] segments from the root.
    pub element_path: String,
    /// Attribute-based locator: `#id`, `tag.classes`, or bare tag.
    pub element_selector: String,
    /// Business impact statement for this severity.
    pub business_impact: String,
    /// Remediation priority; 1 is the most urgent.
    pub fix_priority: u32,
    /// Effort estimate, e.g. "4 hours" or "1 day".
    pub estimated_effort: String,
    /// Whether this issue came from the scanner or from narrative text.
    pub source: RecordSource,
}

impl MappedIssue {
    /// Regulation family: the kind prefix before the first dot.
    pub fn family(&self) -> &str {
        self.kind.split('.').next().unwrap_or(&self.kind)
    }
}

/// Count of issues per severity level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityBreakdown {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityBreakdown {
    /// Count one issue of the given severity.
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }

    /// Total across all severities.
    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

/// Scored summary of an audit: severity and category counts plus the
/// 0-100 compliance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// Total number of mapped issues.
    pub total_issues: usize,
    /// Issue counts per severity.
    pub severity_breakdown: SeverityBreakdown,
    /// Issue counts per regulation family (gdpr, wcag, ada, ...).
    pub category_breakdown: BTreeMap<String, usize>,
    /// 100 minus severity-weighted penalties, clamped at 0.
    pub compliance_score: u32,
    /// Human-readable total fix-time estimate.
    pub estimated_fix_time: String,
}

/// Mapped issues partitioned into severity buckets for downstream
/// consumers (phasing, report sections).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriorityMatrix {
    pub critical_immediate: Vec<MappedIssue>,
    pub high_priority: Vec<MappedIssue>,
    pub medium_priority: Vec<MappedIssue>,
    pub low_priority: Vec<MappedIssue>,
}

impl PriorityMatrix {
    /// Partition issues by severity, preserving input order within buckets.
    pub fn from_issues(issues: &[MappedIssue]) -> Self {
        let mut matrix = Self::default();
        for issue in issues {
            match issue.severity {
                Severity::Critical => matrix.critical_immediate.push(issue.clone()),
                Severity::High => matrix.high_priority.push(issue.clone()),
                Severity::Medium => matrix.medium_priority.push(issue.clone()),
                Severity::Low => matrix.low_priority.push(issue.clone()),
            }
        }
        matrix
    }
}

/// An actionable fix plan for one issue kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationFix {
    /// Issue kind this fix addresses.
    pub issue_kind: String,
    /// What to change; always non-empty, even for unknown kinds.
    pub description: String,
    /// Example markup or configuration implementing the fix.
    pub example: String,
    /// Ordered implementation steps.
    pub steps: Vec<String>,
    /// How to verify the fix.
    pub validation: String,
    /// Effort estimate, e.g. "4 hours" or "1 day".
    pub estimated_effort: String,
}

/// Phased rollout buckets for remediation fixes (issue kinds).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemediationPhases {
    pub critical_immediate: Vec<String>,
    pub high_priority: Vec<String>,
    pub medium_priority: Vec<String>,
}

/// The complete remediation plan for an audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationPlan {
    /// One fix per distinct issue kind.
    pub fixes: Vec<RemediationFix>,
    /// Issue kinds in recommended implementation order.
    pub priority_order: Vec<String>,
    /// Phase buckets using the same severity thresholds as the mapper.
    pub phases: RemediationPhases,
    /// Sum of per-fix hour estimates.
    pub estimated_total_hours: u32,
}

/// A violation-shaped finding extracted from collaborator narrative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeFinding {
    pub kind: String,
    pub severity: Severity,
    pub subject: String,
    pub description: String,
}

/// Additional findings extracted from the scan-enhancement role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEnhancement {
    pub findings: Vec<NarrativeFinding>,
    pub summary: String,
    pub source: RecordSource,
}

/// Legal context extracted from the legal-context role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalContext {
    pub recent_updates: Vec<String>,
    pub relevant_regulations: Vec<String>,
    pub enforcement_trends: Vec<String>,
    pub compliance_deadlines: Vec<String>,
    pub summary: String,
    pub source: RecordSource,
}

/// Qualitative risk framing extracted from the risk-assessment role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall_risk_level: Severity,
    pub risk_factors: Vec<String>,
    pub potential_penalties: Vec<String>,
    pub business_impact: String,
    pub summary: String,
    pub source: RecordSource,
}

/// Roadmap phrasing extracted from the roadmap-enhancement role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadmapEnhancement {
    pub immediate: Vec<String>,
    pub short_term: Vec<String>,
    pub long_term: Vec<String>,
    pub ongoing_maintenance: Vec<String>,
    pub summary: String,
    pub source: RecordSource,
}

/// Narrative sections of the combined report. A role that failed or
/// timed out leaves its section absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NarrativeSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_context: Option<LegalContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_assessment: Option<RiskAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roadmap: Option<RoadmapEnhancement>,
}

/// Outcome of an audit run as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    /// All four collaborator roles succeeded.
    Completed,
    /// Deterministic stages succeeded; at least one role failed.
    Partial,
    /// A deterministic stage failed.
    Failed,
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditStatus::Completed => write!(f, "completed"),
            AuditStatus::Partial => write!(f, "partial"),
            AuditStatus::Failed => write!(f, "failed"),
        }
    }
}

/// The single output artifact of an audit run: deterministic scan
/// results merged with validated narrative context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedReport {
    /// Run outcome: completed, partial, or failed.
    pub status: AuditStatus,
    /// When the report was produced.
    pub generated_at: DateTime<Utc>,
    /// URL of the audited document.
    pub url: String,
    /// 0-100 compliance score from the deterministic scan.
    pub compliance_score: u32,
    /// Issue counts per severity.
    pub severity_breakdown: SeverityBreakdown,
    /// Issue counts per regulation family.
    pub category_breakdown: BTreeMap<String, usize>,
    /// All issues: technical first, then deduplicated narrative findings.
    pub mapped_issues: Vec<MappedIssue>,
    /// Severity-bucketed view of the mapped issues.
    pub priority_matrix: PriorityMatrix,
    /// Fixes, ordering, and phased rollout.
    pub remediation_plan: RemediationPlan,
    /// Narrative context from the collaborator roles that succeeded.
    pub narrative: NarrativeSection,
    /// Names of collaborator roles that completed within budget.
    pub roles_succeeded: Vec<String>,
    /// Scanner and orchestrator warnings accumulated during the run.
    pub warnings: Vec<String>,
}
