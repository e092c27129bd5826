//! Aggregator/Orchestrator: runs the full audit pipeline.
//!
//! Stage one is deterministic: scanner, mapper, and advisor run
//! synchronously and any failure there is fatal. Stage two asks the
//! narrator four role-framed questions in fixed order, each under its
//! own timeout; a role that fails or times out is skipped with a
//! warning and the run degrades to `partial` instead of aborting.

use crate::advisor::RemediationAdvisor;
use crate::config::ScoringConfig;
use crate::document::{Document, RequestContext};
use crate::insight;
use crate::mapper::IssueMapper;
use crate::models::{
    AuditStatus, CombinedReport, MappedIssue, NarrativeSection, PriorityMatrix, RemediationPlan,
    RoadmapEnhancement, ScanEnhancement,
};
use crate::narrator::{Narrator, NarratorRole};
use crate::scanner::{self, Scanner};
use chrono::Utc;
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Fatal pipeline failure: a deterministic stage could not produce its
/// output. Collaborator-role failures never surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// The audit pipeline.
pub struct AuditPipeline {
    scoring: ScoringConfig,
    role_timeout: Duration,
    narrative: bool,
}

impl AuditPipeline {
    pub fn new(scoring: ScoringConfig, role_timeout: Duration) -> Self {
        Self {
            scoring,
            role_timeout,
            narrative: true,
        }
    }

    /// Skip the collaborator roles entirely; the run reports `partial`.
    pub fn without_narrative(mut self) -> Self {
        self.narrative = false;
        self
    }

    /// Run the full audit: deterministic stages, then the four
    /// collaborator roles, then the merge.
    pub async fn run_audit<N: Narrator>(
        &self,
        document: &Document,
        context: &RequestContext,
        narrator: &N,
    ) -> Result<CombinedReport, PipelineError> {
        // Stage 1: deterministic scan, map, plan.
        info!("Scanning {}", context.url);
        let scan = Scanner::new().scan(document, context);
        if scan.violations.is_empty() && scan.warnings.len() == scanner::rule_count() {
            return Err(PipelineError::Stage {
                stage: "scanner",
                source: anyhow::anyhow!("every rule failed; no usable scan output"),
            });
        }

        let mapper = IssueMapper::new(self.scoring.clone());
        let mapping = mapper.map(document, &scan.violations);
        let plan = RemediationAdvisor::new().plan(&mapping.issues);

        info!(
            "Deterministic stages complete: {} issues, score {}",
            mapping.issues.len(),
            mapping.report.compliance_score
        );

        let mut warnings = scan.warnings;
        let mut roles_succeeded: Vec<String> = Vec::new();
        let mut scan_enhancement: Option<ScanEnhancement> = None;
        let mut narrative = NarrativeSection::default();

        // Stage 2: collaborator roles, sequential, context accumulates.
        if self.narrative {
            let mut role_context = technical_summary(context, &mapping.issues, &plan,
                mapping.report.compliance_score);

            for role in NarratorRole::ALL {
                match tokio::time::timeout(self.role_timeout, narrator.ask(role, &role_context))
                    .await
                {
                    Ok(Ok(text)) => {
                        let record = insight::extract(role, &text);
                        role_context.push_str(&format!("\n\n[{}] {}", role, digest(&record)));
                        roles_succeeded.push(role.to_string());

                        match record {
                            insight::NarrativeRecord::Scan(enhancement) => {
                                scan_enhancement = Some(enhancement);
                            }
                            insight::NarrativeRecord::Legal(legal) => {
                                narrative.legal_context = Some(legal);
                            }
                            insight::NarrativeRecord::Risk(risk) => {
                                narrative.risk_assessment = Some(risk);
                            }
                            insight::NarrativeRecord::Roadmap(roadmap) => {
                                narrative.roadmap = Some(roadmap);
                            }
                        }
                    }
                    Ok(Err(e)) => {
                        warn!("Role {} failed: {}", role, e);
                        warnings.push(format!("role {} failed: {}", role, e));
                    }
                    Err(_) => {
                        warn!("Role {} timed out after {:?}", role, self.role_timeout);
                        warnings.push(format!(
                            "role {} timed out after {}s",
                            role,
                            self.role_timeout.as_secs()
                        ));
                    }
                }
            }
        } else {
            warnings.push("narrative analysis disabled; deterministic results only".to_string());
        }

        // Merge: narrative findings join the issue list, technical wins
        // on (kind, subject) collisions.
        let mut mapped_issues = mapping.issues;
        if let Some(enhancement) = scan_enhancement {
            let seen: BTreeSet<(String, String)> = mapped_issues
                .iter()
                .map(|issue| (issue.kind.clone(), issue.subject.clone()))
                .collect();
            let fresh: Vec<_> = enhancement
                .findings
                .iter()
                .filter(|f| !seen.contains(&(f.kind.clone(), f.subject.clone())))
                .cloned()
                .collect();

            let mut counters = mapping.report.severity_breakdown.clone();
            mapped_issues.extend(mapper.map_narrative(
                document,
                &fresh,
                enhancement.source,
                &mut counters,
            ));
        }

        if let Some(roadmap) = narrative.roadmap.take() {
            narrative.roadmap = Some(merge_roadmap(&plan, roadmap));
        }

        let status = if !self.narrative || roles_succeeded.len() < NarratorRole::ALL.len() {
            AuditStatus::Partial
        } else {
            AuditStatus::Completed
        };

        Ok(CombinedReport {
            status,
            generated_at: Utc::now(),
            url: context.url.clone(),
            compliance_score: mapping.report.compliance_score,
            severity_breakdown: mapping.report.severity_breakdown,
            category_breakdown: mapping.report.category_breakdown,
            priority_matrix: PriorityMatrix::from_issues(&mapped_issues),
            mapped_issues,
            remediation_plan: plan,
            narrative,
            roles_succeeded,
            warnings,
        })
    }
}

/// Technical summary handed to the first role and extended after each
/// successful role.
fn technical_summary(
    context: &RequestContext,
    issues: &[MappedIssue],
    plan: &RemediationPlan,
    score: u32,
) -> String {
    let mut summary = format!(
        "COMPLIANCE AUDIT of {}\nCompliance score: {}/100\nTotal issues: {}\n\nFindings:\n",
        context.url,
        score,
        issues.len()
    );

    for issue in issues.iter().take(15) {
        summary.push_str(&format!(
            "- [{}] {} ({}): {} [{}]\n",
            issue.severity, issue.kind, issue.element_selector, issue.description,
            issue.regulation
        ));
    }

    summary.push_str(&format!(
        "\nPlanned fixes: {} totaling ~{} hours. Recommended order: {}.\n",
        plan.fixes.len(),
        plan.estimated_total_hours,
        plan.priority_order.join(", ")
    ));

    summary
}

/// One-line digest of a role's extraction, appended to the running
/// context for subsequent roles.
fn digest(record: &insight::NarrativeRecord) -> String {
    match record {
        insight::NarrativeRecord::Scan(s) => {
            format!("{} additional findings. {}", s.findings.len(), s.summary)
        }
        insight::NarrativeRecord::Legal(l) => format!(
            "{} regulations, {} enforcement trends. {}",
            l.relevant_regulations.len(),
            l.enforcement_trends.len(),
            l.summary
        ),
        insight::NarrativeRecord::Risk(r) => format!(
            "overall risk {}. {}",
            r.overall_risk_level, r.summary
        ),
        insight::NarrativeRecord::Roadmap(r) => format!(
            "{} immediate actions. {}",
            r.immediate.len(),
            r.summary
        ),
    }
}

/// Concatenate technical remediation phases ahead of the narrative
/// roadmap items.
fn merge_roadmap(plan: &RemediationPlan, narrative: RoadmapEnhancement) -> RoadmapEnhancement {
    let mut immediate = plan.phases.critical_immediate.clone();
    immediate.extend(narrative.immediate);
    let mut short_term = plan.phases.high_priority.clone();
    short_term.extend(narrative.short_term);
    let mut long_term = plan.phases.medium_priority.clone();
    long_term.extend(narrative.long_term);

    RoadmapEnhancement {
        immediate,
        short_term,
        long_term,
        ongoing_maintenance: narrative.ongoing_maintenance,
        summary: narrative.summary,
        source: narrative.source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordSource;
    use anyhow::Result;
    use std::collections::HashMap;

    /// Narrator stub returning canned text per role; unscripted roles fail.
    struct ScriptedNarrator {
        responses: HashMap<String, String>,
    }

    impl ScriptedNarrator {
        fn new(entries: &[(NarratorRole, &str)]) -> Self {
            Self {
                responses: entries
                    .iter()
                    .map(|(role, text)| (role.to_string(), text.to_string()))
                    .collect(),
            }
        }
    }

    impl Narrator for ScriptedNarrator {
        async fn ask(&self, role: NarratorRole, _context: &str) -> Result<String> {
            self.responses
                .get(&role.to_string())
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("connection refused"))
        }
    }

    /// Narrator stub that never answers within any budget.
    struct HangingNarrator;

    impl Narrator for HangingNarrator {
        async fn ask(&self, _role: NarratorRole, _context: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    fn document() -> Document {
        Document::from_json(
            r#"{"tag": "html", "children": [
                {"tag": "head", "children": []},
                {"tag": "body", "children": [
                    {"tag": "img", "attributes": {"src": "a.png"}}
                ]}
            ]}"#,
        )
        .unwrap()
    }

    fn pipeline() -> AuditPipeline {
        AuditPipeline::new(ScoringConfig::default(), Duration::from_secs(5))
    }

    fn all_roles_scripted() -> ScriptedNarrator {
        ScriptedNarrator::new(&[
            (
                NarratorRole::ScanEnhance,
                r#"{"findings": [{"kind": "gdpr.consent_wording", "severity": "high",
                    "subject": "cookie banner", "description": "Consent wording is ambiguous"}],
                    "summary": "One extra issue"}"#,
            ),
            (
                NarratorRole::LegalContext,
                r#"{"recent_updates": ["WCAG 2.2 published"], "relevant_regulations": ["GDPR Article 7"],
                    "enforcement_trends": [], "compliance_deadlines": [],
                    "update_summary": "Consent rules tightening"}"#,
            ),
            (
                NarratorRole::RiskAssessment,
                r#"{"overall_risk_level": "high", "risk_factors": ["No consent banner"],
                    "potential_penalties": ["GDPR fines"], "business_impact": "Legal exposure",
                    "risk_summary": "High risk"}"#,
            ),
            (
                NarratorRole::Roadmap,
                r#"{"immediate": ["Install SSL certificate"], "short_term": ["Fix alt text"],
                    "long_term": [], "ongoing_maintenance": ["Quarterly audits"],
                    "roadmap_summary": "Transport security first"}"#,
            ),
        ])
    }

    #[tokio::test]
    async fn test_all_roles_failing_degrades_to_partial() {
        let doc = document();
        let context = RequestContext::from_url("http://example.com/");
        let narrator = ScriptedNarrator::new(&[]);

        let report = pipeline()
            .run_audit(&doc, &context, &narrator)
            .await
            .unwrap();

        assert_eq!(report.status, AuditStatus::Partial);
        assert!(report.roles_succeeded.is_empty());
        assert_eq!(
            report
                .warnings
                .iter()
                .filter(|w| w.contains("failed"))
                .count(),
            4
        );
        // Deterministic results are intact.
        assert!(!report.mapped_issues.is_empty());
        assert!(report.mapped_issues.iter().all(|i| i.source == RecordSource::Technical));
        assert!(report.narrative.risk_assessment.is_none());
    }

    #[tokio::test]
    async fn test_all_roles_succeeding_completes() {
        let doc = document();
        let context = RequestContext::from_url("http://example.com/");
        let narrator = all_roles_scripted();

        let report = pipeline()
            .run_audit(&doc, &context, &narrator)
            .await
            .unwrap();

        assert_eq!(report.status, AuditStatus::Completed);
        assert_eq!(report.roles_succeeded.len(), 4);
        assert!(report.narrative.legal_context.is_some());
        assert!(report.narrative.risk_assessment.is_some());
        assert!(report.narrative.roadmap.is_some());

        // The narrative finding was merged with a locator and priority.
        let extra = report
            .mapped_issues
            .iter()
            .find(|i| i.kind == "gdpr.consent_wording")
            .unwrap();
        assert_eq!(extra.source, RecordSource::NarrativeStrict);
        assert!(!extra.element_path.is_empty());
    }

    #[tokio::test]
    async fn test_merge_deduplicates_on_kind_and_subject() {
        let doc = document();
        let context = RequestContext::from_url("http://example.com/");

        // Run once to learn the technical (kind, subject) pairs, then
        // script the narrator to repeat one of them.
        let baseline = pipeline()
            .run_audit(&doc, &context, &ScriptedNarrator::new(&[]))
            .await
            .unwrap();
        let first = &baseline.mapped_issues[0];
        let duplicate_response = format!(
            r#"{{"findings": [{{"kind": "{}", "severity": "low",
                "subject": "{}", "description": "duplicate"}}], "summary": "dup"}}"#,
            first.kind, first.subject
        );

        let narrator =
            ScriptedNarrator::new(&[(NarratorRole::ScanEnhance, duplicate_response.as_str())]);
        let report = pipeline()
            .run_audit(&doc, &context, &narrator)
            .await
            .unwrap();

        // Same issue count; the technical record won.
        assert_eq!(report.mapped_issues.len(), baseline.mapped_issues.len());
        let kept = report
            .mapped_issues
            .iter()
            .find(|i| i.kind == first.kind && i.subject == first.subject)
            .unwrap();
        assert_eq!(kept.source, RecordSource::Technical);
    }

    #[tokio::test]
    async fn test_role_timeout_is_skipped_with_warning() {
        let doc = document();
        let context = RequestContext::from_url("http://example.com/");
        let fast = AuditPipeline::new(ScoringConfig::default(), Duration::from_millis(10));

        let report = fast
            .run_audit(&doc, &context, &HangingNarrator)
            .await
            .unwrap();

        assert_eq!(report.status, AuditStatus::Partial);
        assert!(report.warnings.iter().any(|w| w.contains("timed out")));
    }

    #[tokio::test]
    async fn test_without_narrative_reports_partial() {
        let doc = document();
        let context = RequestContext::from_url("https://example.com/");
        let narrator = all_roles_scripted();

        let report = pipeline()
            .without_narrative()
            .run_audit(&doc, &context, &narrator)
            .await
            .unwrap();

        assert_eq!(report.status, AuditStatus::Partial);
        assert!(report.roles_succeeded.is_empty());
        assert!(report.warnings.iter().any(|w| w.contains("disabled")));
    }

    #[tokio::test]
    async fn test_roadmap_merge_puts_technical_phases_first() {
        let doc = document();
        let context = RequestContext::from_url("http://example.com/");
        let narrator = all_roles_scripted();

        let report = pipeline()
            .run_audit(&doc, &context, &narrator)
            .await
            .unwrap();

        let roadmap = report.narrative.roadmap.unwrap();
        // The http scan produces critical consent and encryption issues;
        // their kinds lead the immediate phase ahead of the narrative item.
        assert!(roadmap.immediate.contains(&"security.no_encryption".to_string()));
        assert_eq!(roadmap.immediate.first().unwrap(), "gdpr.cookie_banner");
        assert_eq!(roadmap.immediate.last().unwrap(), "Install SSL certificate");
        assert_eq!(roadmap.ongoing_maintenance, vec!["Quarterly audits"]);
    }
}
