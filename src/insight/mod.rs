//! Narrative Insight Extractor: structured records from free-form text.
//!
//! Collaborator responses arrive as prose, JSON, or a mix of both. Each
//! role has a three-tier extractor: decode the first balanced JSON
//! object against the role schema, fall back to keyword-routed sentence
//! classification, and finally to conservative role defaults. Extraction
//! is pure and never errors; provenance is tagged on every record.

use crate::models::{
    LegalContext, NarrativeFinding, RecordSource, RiskAssessment, RoadmapEnhancement,
    ScanEnhancement, Severity,
};
use crate::narrator::NarratorRole;
use serde::Deserialize;
use serde_json::Value;

/// A typed record extracted from one role's narrative output.
#[derive(Debug, Clone)]
pub enum NarrativeRecord {
    Scan(ScanEnhancement),
    Legal(LegalContext),
    Risk(RiskAssessment),
    Roadmap(RoadmapEnhancement),
}

/// Extract the record for a role from its raw narrative text.
pub fn extract(role: NarratorRole, text: &str) -> NarrativeRecord {
    match role {
        NarratorRole::ScanEnhance => NarrativeRecord::Scan(extract_scan_enhancement(text)),
        NarratorRole::LegalContext => NarrativeRecord::Legal(extract_legal_context(text)),
        NarratorRole::RiskAssessment => NarrativeRecord::Risk(extract_risk_assessment(text)),
        NarratorRole::Roadmap => NarrativeRecord::Roadmap(extract_roadmap(text)),
    }
}

// -- shared helpers ---------------------------------------------------------

/// First balanced `{...}` span in the text, string-literal aware.
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split text into sentence units, dropping fragments below `min_len`.
fn sentence_units(text: &str, min_len: usize) -> Vec<String> {
    text.replace('\n', ". ")
        .split('.')
        .map(str::trim)
        .filter(|s| s.len() >= min_len)
        .map(str::to_string)
        .collect()
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Flatten a JSON list into strings; objects contribute their `action`
/// field so roadmap items with metadata still extract cleanly.
fn string_items(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(|value| match value {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map
                .get("action")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
        .collect()
}

// -- scan enhancement -------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawScanEnhancement {
    findings: Option<Vec<RawFinding>>,
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFinding {
    kind: Option<String>,
    severity: Option<String>,
    subject: Option<String>,
    description: Option<String>,
}

const VIOLATION_HINTS: &[&str] = &[
    "violation",
    "issue",
    "error",
    "missing",
    "invalid",
    "non-compliant",
];

const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("gdpr", &["gdpr", "privacy", "cookie", "consent", "data protection"]),
    ("ada", &["accessibility", "screen reader", "keyboard", "aria"]),
    ("wcag", &["wcag", "contrast", "alt text", "heading", "color"]),
    ("seo", &["seo", "meta", "title", "description", "robots"]),
    ("security", &["security", "ssl", "https", "certificate", "encryption"]),
];

const HIGH_SEVERITY_HINTS: &[&str] = &["critical", "severe", "major"];
const LOW_SEVERITY_HINTS: &[&str] = &["low", "minor", "suggestion"];

pub fn extract_scan_enhancement(text: &str) -> ScanEnhancement {
    // Strict tier
    if let Some(span) = first_json_object(text) {
        if let Ok(raw) = serde_json::from_str::<RawScanEnhancement>(span) {
            if let Some(raw_findings) = raw.findings {
                let findings: Vec<NarrativeFinding> = raw_findings
                    .into_iter()
                    .filter_map(|f| {
                        let description = f.description?;
                        Some(NarrativeFinding {
                            kind: f.kind.unwrap_or_else(|| "narrative.finding".to_string()),
                            severity: f
                                .severity
                                .as_deref()
                                .map(Severity::parse_lenient)
                                .unwrap_or(Severity::Medium),
                            subject: f.subject.unwrap_or_else(|| "narrative".to_string()),
                            description,
                        })
                    })
                    .collect();
                return ScanEnhancement {
                    findings,
                    summary: raw
                        .summary
                        .unwrap_or_else(|| "Narrative scan enhancement".to_string()),
                    source: RecordSource::NarrativeStrict,
                };
            }
        }
    }

    // Heuristic tier
    let sentences = sentence_units(text, 15);
    let mut findings = Vec::new();

    for sentence in &sentences {
        if findings.len() >= 6 {
            break;
        }
        let lower = sentence.to_lowercase();
        if !contains_any(&lower, VIOLATION_HINTS) {
            continue;
        }
        for (family, keywords) in CATEGORY_KEYWORDS {
            if contains_any(&lower, keywords) {
                let severity = if contains_any(&lower, HIGH_SEVERITY_HINTS) {
                    Severity::High
                } else if contains_any(&lower, LOW_SEVERITY_HINTS) {
                    Severity::Low
                } else {
                    Severity::Medium
                };
                findings.push(NarrativeFinding {
                    kind: format!("{}.narrative", family),
                    severity,
                    subject: "narrative finding".to_string(),
                    description: sentence.clone(),
                });
                break;
            }
        }
    }

    if !findings.is_empty() {
        return ScanEnhancement {
            summary: format!("Analyzed {} statements from compliance scan", sentences.len()),
            findings,
            source: RecordSource::NarrativeHeuristic,
        };
    }

    // Default tier
    ScanEnhancement {
        findings: Vec::new(),
        summary: "No additional findings extracted".to_string(),
        source: RecordSource::NarrativeDefault,
    }
}

// -- legal context ----------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawLegalContext {
    recent_updates: Option<Vec<String>>,
    relevant_regulations: Option<Vec<String>>,
    enforcement_trends: Option<Vec<String>>,
    compliance_deadlines: Option<Vec<String>>,
    #[serde(alias = "summary")]
    update_summary: Option<String>,
}

const UPDATE_KEYWORDS: &[&str] = &["update", "change", "new", "revised", "amended"];
const REGULATION_KEYWORDS: &[&str] = &["gdpr", "wcag", "ada", "ccpa", "article", "section"];
const ENFORCEMENT_KEYWORDS: &[&str] = &["enforcement", "penalty", "fine", "violation", "court"];
const DEADLINE_KEYWORDS: &[&str] = &["deadline", "compliance", "must", "required", "by"];

pub fn extract_legal_context(text: &str) -> LegalContext {
    // Strict tier
    if let Some(span) = first_json_object(text) {
        if let Ok(raw) = serde_json::from_str::<RawLegalContext>(span) {
            let recent_updates = raw.recent_updates.unwrap_or_default();
            let relevant_regulations = raw.relevant_regulations.unwrap_or_default();
            let enforcement_trends = raw.enforcement_trends.unwrap_or_default();
            let compliance_deadlines = raw.compliance_deadlines.unwrap_or_default();
            let has_content = !recent_updates.is_empty()
                || !relevant_regulations.is_empty()
                || !enforcement_trends.is_empty()
                || !compliance_deadlines.is_empty();

            if let Some(summary) = raw.update_summary {
                if !summary.is_empty() && has_content {
                    return LegalContext {
                        recent_updates,
                        relevant_regulations,
                        enforcement_trends,
                        compliance_deadlines,
                        summary,
                        source: RecordSource::NarrativeStrict,
                    };
                }
            }
        }
    }

    // Heuristic tier: first matching keyword family wins per sentence.
    let sentences = sentence_units(text, 20);
    let mut legal = LegalContext {
        recent_updates: Vec::new(),
        relevant_regulations: Vec::new(),
        enforcement_trends: Vec::new(),
        compliance_deadlines: Vec::new(),
        summary: String::new(),
        source: RecordSource::NarrativeHeuristic,
    };

    for sentence in &sentences {
        let lower = sentence.to_lowercase();
        let bucket = if contains_any(&lower, UPDATE_KEYWORDS) {
            &mut legal.recent_updates
        } else if contains_any(&lower, REGULATION_KEYWORDS) {
            &mut legal.relevant_regulations
        } else if contains_any(&lower, ENFORCEMENT_KEYWORDS) {
            &mut legal.enforcement_trends
        } else if contains_any(&lower, DEADLINE_KEYWORDS) {
            &mut legal.compliance_deadlines
        } else {
            continue;
        };
        if bucket.len() < 5 {
            bucket.push(sentence.clone());
        }
    }

    let has_content = !legal.recent_updates.is_empty()
        || !legal.relevant_regulations.is_empty()
        || !legal.enforcement_trends.is_empty()
        || !legal.compliance_deadlines.is_empty();

    if has_content {
        legal.summary = format!(
            "Extracted legal context from {} legal statements",
            sentences.len()
        );
        return legal;
    }

    // Default tier
    LegalContext {
        recent_updates: Vec::new(),
        relevant_regulations: Vec::new(),
        enforcement_trends: Vec::new(),
        compliance_deadlines: Vec::new(),
        summary: "No legal updates retrieved".to_string(),
        source: RecordSource::NarrativeDefault,
    }
}

// -- risk assessment --------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawRiskAssessment {
    overall_risk_level: Option<String>,
    risk_factors: Option<Vec<String>>,
    potential_penalties: Option<Vec<String>>,
    business_impact: Option<String>,
    #[serde(alias = "summary")]
    risk_summary: Option<String>,
}

const RISK_FACTOR_KEYWORDS: &[&str] =
    &["risk", "violation", "non-compliant", "missing", "inadequate"];
const PENALTY_KEYWORDS: &[&str] = &["fine", "penalty", "sanction", "legal action", "lawsuit"];
const HIGH_RISK_KEYWORDS: &[&str] = &["critical", "severe", "major", "significant"];
const LOW_RISK_KEYWORDS: &[&str] = &["minor", "low", "cosmetic", "suggestion"];

/// Stock penalty framing used when the narrative names none.
const STOCK_PENALTIES: &[&str] = &[
    "GDPR fines up to €20 million or 4% of annual turnover",
    "ADA litigation and accessibility lawsuit costs",
    "Regulatory enforcement actions and compliance orders",
    "Reputation damage and loss of user trust",
];

const DEFAULT_BUSINESS_IMPACT: &str =
    "Compliance violations may impact business operations and user trust";

pub fn extract_risk_assessment(text: &str) -> RiskAssessment {
    // Strict tier: requires a summary plus at least one substantive list.
    if let Some(span) = first_json_object(text) {
        if let Ok(raw) = serde_json::from_str::<RawRiskAssessment>(span) {
            let risk_factors = raw.risk_factors.unwrap_or_default();
            let potential_penalties = raw.potential_penalties.unwrap_or_default();
            let has_content = !risk_factors.is_empty() || !potential_penalties.is_empty();

            if let Some(summary) = raw.risk_summary {
                if !summary.is_empty() && has_content {
                    return RiskAssessment {
                        overall_risk_level: raw
                            .overall_risk_level
                            .as_deref()
                            .map(Severity::parse_lenient)
                            .unwrap_or(Severity::Medium),
                        risk_factors,
                        potential_penalties,
                        business_impact: raw
                            .business_impact
                            .unwrap_or_else(|| DEFAULT_BUSINESS_IMPACT.to_string()),
                        summary,
                        source: RecordSource::NarrativeStrict,
                    };
                }
            }
        }
    }

    // Heuristic tier
    let sentences = sentence_units(text, 15);
    let mut risk_factors: Vec<String> = Vec::new();
    let mut potential_penalties: Vec<String> = Vec::new();
    let mut high_count = 0usize;
    let mut medium_count = 0usize;
    let mut low_count = 0usize;

    for sentence in &sentences {
        let lower = sentence.to_lowercase();

        if contains_any(&lower, RISK_FACTOR_KEYWORDS) {
            risk_factors.push(sentence.clone());
            if contains_any(&lower, HIGH_RISK_KEYWORDS) {
                high_count += 1;
            } else if contains_any(&lower, LOW_RISK_KEYWORDS) {
                low_count += 1;
            } else {
                medium_count += 1;
            }
        }

        if contains_any(&lower, PENALTY_KEYWORDS) {
            potential_penalties.push(sentence.clone());
        }
    }

    if !risk_factors.is_empty() || !potential_penalties.is_empty() {
        let overall_risk_level = if high_count > 2 {
            Severity::High
        } else if high_count > 0 || medium_count > 3 {
            Severity::Medium
        } else if low_count > 0 {
            Severity::Low
        } else {
            Severity::Medium
        };

        if potential_penalties.is_empty() {
            potential_penalties = STOCK_PENALTIES.iter().map(|s| s.to_string()).collect();
        }
        risk_factors.truncate(6);
        potential_penalties.truncate(4);

        return RiskAssessment {
            summary: format!(
                "Risk level: {} - Based on analysis of {} compliance statements",
                overall_risk_level.to_string().to_uppercase(),
                sentences.len()
            ),
            overall_risk_level,
            risk_factors,
            potential_penalties,
            business_impact: DEFAULT_BUSINESS_IMPACT.to_string(),
            source: RecordSource::NarrativeHeuristic,
        };
    }

    // Default tier
    RiskAssessment {
        overall_risk_level: Severity::Medium,
        risk_factors: Vec::new(),
        potential_penalties: Vec::new(),
        business_impact: DEFAULT_BUSINESS_IMPACT.to_string(),
        summary: "No risk assessment completed".to_string(),
        source: RecordSource::NarrativeDefault,
    }
}

// -- roadmap ----------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawRoadmap {
    immediate: Option<Vec<Value>>,
    short_term: Option<Vec<Value>>,
    long_term: Option<Vec<Value>>,
    ongoing_maintenance: Option<Vec<Value>>,
    #[serde(alias = "summary")]
    roadmap_summary: Option<String>,
}

const ROADMAP_SECTIONS: &[(usize, &[&str])] = &[
    (0, &["immediate", "critical", "urgent", "security", "ssl", "cookie"]),
    (1, &["short", "accessibility", "wcag", "gdpr", "privacy"]),
    (2, &["long", "framework", "training", "monitoring", "strategic"]),
    (3, &["ongoing", "maintenance", "monitor", "regular", "continuous"]),
];

pub fn extract_roadmap(text: &str) -> RoadmapEnhancement {
    // Strict tier: all four phase sections must be present.
    if let Some(span) = first_json_object(text) {
        if let Ok(raw) = serde_json::from_str::<RawRoadmap>(span) {
            if let (Some(immediate), Some(short_term), Some(long_term), Some(ongoing)) = (
                raw.immediate,
                raw.short_term,
                raw.long_term,
                raw.ongoing_maintenance,
            ) {
                return RoadmapEnhancement {
                    immediate: string_items(&immediate),
                    short_term: string_items(&short_term),
                    long_term: string_items(&long_term),
                    ongoing_maintenance: string_items(&ongoing),
                    summary: raw
                        .roadmap_summary
                        .unwrap_or_else(|| "Narrative implementation roadmap".to_string()),
                    source: RecordSource::NarrativeStrict,
                };
            }
        }
    }

    // Heuristic tier: section headers route subsequent bullet lines.
    let mut phases: [Vec<String>; 4] = Default::default();
    let mut current: Option<usize> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let lower = line.to_lowercase();
        let looks_like_header =
            line.contains(':') || lower.contains("action") || lower.contains("phase");
        if looks_like_header {
            for (index, keywords) in ROADMAP_SECTIONS {
                if contains_any(&lower, keywords) {
                    current = Some(*index);
                    break;
                }
            }
        }

        let is_item = line.starts_with(['-', '*', '•'])
            || line.chars().next().is_some_and(|c| c.is_ascii_digit());
        if let (Some(section), true) = (current, is_item) {
            let cleaned = line
                .trim_start_matches(|c: char| "-*•0123456789. ".contains(c))
                .trim();
            if cleaned.len() > 15 && phases[section].len() < 5 {
                phases[section].push(cleaned.to_string());
            }
        }
    }

    if phases.iter().any(|phase| !phase.is_empty()) {
        let [immediate, short_term, long_term, ongoing_maintenance] = phases;
        return RoadmapEnhancement {
            immediate,
            short_term,
            long_term,
            ongoing_maintenance,
            summary: "Implementation roadmap recovered from narrative text".to_string(),
            source: RecordSource::NarrativeHeuristic,
        };
    }

    // Default tier
    RoadmapEnhancement {
        immediate: Vec::new(),
        short_term: Vec::new(),
        long_term: Vec::new(),
        ongoing_maintenance: Vec::new(),
        summary: "No roadmap enhancement extracted".to_string(),
        source: RecordSource::NarrativeDefault,
    }
}
