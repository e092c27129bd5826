//! Markdown report generation.
//!
//! This module renders the combined audit report as Markdown for
//! operators and as pretty-printed JSON for downstream tooling.

use crate::config::ReportConfig;
use crate::models::{CombinedReport, MappedIssue, RemediationFix, Severity};
use anyhow::Result;
use std::io::Write;
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &CombinedReport, config: &ReportConfig) -> String {
    let mut output = String::new();

    output.push_str("# Compliance Audit Report\n\n");

    output.push_str(&generate_metadata_section(report));
    output.push_str(&generate_score_section(report));
    output.push_str(&generate_issues_section(&report.mapped_issues));
    if config.include_matrix {
        output.push_str(&generate_matrix_section(report));
    }
    output.push_str(&generate_remediation_section(report, config));
    output.push_str(&generate_narrative_section(report));
    output.push_str(&generate_warnings_section(&report.warnings));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(report: &CombinedReport) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **URL:** {}\n", report.url));
    section.push_str(&format!(
        "- **Audit Date:** {}\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Status:** {}\n", report.status));
    if !report.roles_succeeded.is_empty() {
        section.push_str(&format!(
            "- **Narrative Roles:** {}\n",
            report.roles_succeeded.join(", ")
        ));
    }
    section.push_str(&format!(
        "- **Total Issues:** {}\n",
        report.mapped_issues.len()
    ));
    section.push('\n');

    section
}

/// Generate the compliance score and breakdown tables.
fn generate_score_section(report: &CombinedReport) -> String {
    let mut section = String::new();

    section.push_str("## Compliance Score\n\n");
    section.push_str(&format!(
        "**{}/100** ({} issues)\n\n",
        report.compliance_score,
        report.severity_breakdown.total()
    ));

    section.push_str("### Issue Severity Breakdown\n\n");
    section.push_str(&format!(
        "| {} Critical | {} High | {} Medium | {} Low | **Total** |\n",
        Severity::Critical.emoji(),
        Severity::High.emoji(),
        Severity::Medium.emoji(),
        Severity::Low.emoji(),
    ));
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | **{}** |\n\n",
        report.severity_breakdown.critical,
        report.severity_breakdown.high,
        report.severity_breakdown.medium,
        report.severity_breakdown.low,
        report.severity_breakdown.total()
    ));

    if !report.category_breakdown.is_empty() {
        section.push_str("### Issues by Regulation Family\n\n");
        section.push_str("| Family | Count |\n");
        section.push_str("|:---|:---:|\n");

        let mut categories: Vec<_> = report.category_breakdown.iter().collect();
        categories.sort_by_key(|(_, count)| std::cmp::Reverse(**count));

        for (category, count) in categories {
            section.push_str(&format!("| {} | {} |\n", category, count));
        }
        section.push('\n');
    }

    section
}

/// Generate the per-issue section, most urgent first.
fn generate_issues_section(issues: &[MappedIssue]) -> String {
    let mut section = String::new();

    section.push_str("## Issues\n\n");

    if issues.is_empty() {
        section.push_str("No compliance issues were found. 🎉\n\n");
        return section;
    }

    for issue in issues {
        section.push_str(&generate_issue_block(issue));
    }

    section
}

/// Generate a single issue block.
fn generate_issue_block(issue: &MappedIssue) -> String {
    let mut block = String::new();

    let severity_badge = match issue.severity {
        Severity::Critical => "🔴 **CRITICAL**",
        Severity::High => "🟠 **HIGH**",
        Severity::Medium => "🟡 **MEDIUM**",
        Severity::Low => "🟢 **LOW**",
    };

    block.push_str(&format!(
        "#### {} {} (priority {})\n\n",
        severity_badge, issue.kind, issue.fix_priority
    ));

    block.push_str(&format!(
        "**Element:** `{}` (`{}`)\n\n",
        issue.element_path, issue.element_selector
    ));
    block.push_str(&format!("**Regulation:** {}\n\n", issue.regulation));

    if !issue.description.is_empty() {
        block.push_str(&format!("**Description:** {}\n\n", issue.description));
    }
    block.push_str(&format!("**Business Impact:** {}\n\n", issue.business_impact));
    block.push_str(&format!("**Estimated Effort:** {}\n\n", issue.estimated_effort));

    if !issue.suggestion.is_empty() {
        block.push_str(&format!("> 💡 **Suggestion:** {}\n\n", issue.suggestion));
    }
    if issue.source.is_narrative() {
        block.push_str("*Source: narrative analysis*\n\n");
    }

    block.push_str("---\n\n");

    block
}

/// Generate the priority matrix section.
fn generate_matrix_section(report: &CombinedReport) -> String {
    let mut section = String::new();

    section.push_str("## Priority Matrix\n\n");

    let buckets = [
        ("Critical - act immediately", &report.priority_matrix.critical_immediate),
        ("High priority", &report.priority_matrix.high_priority),
        ("Medium priority", &report.priority_matrix.medium_priority),
        ("Low priority", &report.priority_matrix.low_priority),
    ];

    for (title, issues) in buckets {
        if issues.is_empty() {
            continue;
        }
        section.push_str(&format!("### {}\n\n", title));
        for issue in issues.iter() {
            section.push_str(&format!("- {} — {}\n", issue.kind, issue.subject));
        }
        section.push('\n');
    }

    section
}

/// Generate the remediation plan section.
fn generate_remediation_section(report: &CombinedReport, config: &ReportConfig) -> String {
    let mut section = String::new();
    let plan = &report.remediation_plan;

    section.push_str("## Remediation Plan\n\n");
    section.push_str(&format!(
        "{} fixes, estimated {} hours total.\n\n",
        plan.fixes.len(),
        plan.estimated_total_hours
    ));

    if !plan.priority_order.is_empty() {
        section.push_str("**Recommended order:**\n\n");
        for (i, kind) in plan.priority_order.iter().enumerate() {
            section.push_str(&format!("{}. {}\n", i + 1, kind));
        }
        section.push('\n');
    }

    for fix in &plan.fixes {
        section.push_str(&generate_fix_block(fix, config));
    }

    section
}

/// Generate one fix block with steps and an optional code example.
fn generate_fix_block(fix: &RemediationFix, config: &ReportConfig) -> String {
    let mut block = String::new();

    block.push_str(&format!("### {}\n\n", fix.issue_kind));
    block.push_str(&format!(
        "{} *({})*\n\n",
        fix.description, fix.estimated_effort
    ));

    for step in &fix.steps {
        block.push_str(&format!("- {}\n", step));
    }
    block.push('\n');

    if config.include_fix_examples && !fix.example.is_empty() {
        block.push_str("<details>\n<summary>Example</summary>\n\n```html\n");
        block.push_str(&fix.example);
        block.push_str("\n```\n</details>\n\n");
    }

    block.push_str(&format!("**Validation:** {}\n\n", fix.validation));

    block
}

/// Generate the narrative sections for roles that succeeded.
fn generate_narrative_section(report: &CombinedReport) -> String {
    let mut section = String::new();
    let narrative = &report.narrative;

    if narrative.legal_context.is_none()
        && narrative.risk_assessment.is_none()
        && narrative.roadmap.is_none()
    {
        return section;
    }

    section.push_str("## Narrative Analysis\n\n");

    if let Some(ref legal) = narrative.legal_context {
        section.push_str("### Legal Context\n\n");
        section.push_str(&format!("{}\n\n", legal.summary));
        push_list(&mut section, "Recent updates", &legal.recent_updates);
        push_list(&mut section, "Relevant regulations", &legal.relevant_regulations);
        push_list(&mut section, "Enforcement trends", &legal.enforcement_trends);
        push_list(&mut section, "Compliance deadlines", &legal.compliance_deadlines);
    }

    if let Some(ref risk) = narrative.risk_assessment {
        section.push_str("### Risk Assessment\n\n");
        section.push_str(&format!(
            "**Overall risk:** {} {}\n\n",
            risk.overall_risk_level.emoji(),
            risk.overall_risk_level
        ));
        section.push_str(&format!("{}\n\n", risk.summary));
        push_list(&mut section, "Risk factors", &risk.risk_factors);
        push_list(&mut section, "Potential penalties", &risk.potential_penalties);
        if !risk.business_impact.is_empty() {
            section.push_str(&format!("**Business impact:** {}\n\n", risk.business_impact));
        }
    }

    if let Some(ref roadmap) = narrative.roadmap {
        section.push_str("### Implementation Roadmap\n\n");
        section.push_str(&format!("{}\n\n", roadmap.summary));
        push_list(&mut section, "Immediate", &roadmap.immediate);
        push_list(&mut section, "Short term", &roadmap.short_term);
        push_list(&mut section, "Long term", &roadmap.long_term);
        push_list(&mut section, "Ongoing maintenance", &roadmap.ongoing_maintenance);
    }

    section
}

fn push_list(section: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    section.push_str(&format!("**{}:**\n\n", title));
    for item in items {
        section.push_str(&format!("- {}\n", item));
    }
    section.push('\n');
}

/// Generate the warnings section.
fn generate_warnings_section(warnings: &[String]) -> String {
    if warnings.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Warnings\n\n");
    for warning in warnings {
        section.push_str(&format!("- ⚠️ {}\n", warning));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by regauditor*\n");

    footer
}

/// Write the Markdown report to a file.
pub fn write_report(report: &CombinedReport, config: &ReportConfig, path: &Path) -> Result<()> {
    let content = generate_markdown_report(report, config);

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

/// Generate a JSON report.
pub fn generate_json_report(report: &CombinedReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write a JSON report to a file.
pub fn write_json_report(report: &CombinedReport, path: &Path) -> Result<()> {
    let content = generate_json_report(report)?;

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AuditStatus, NarrativeSection, PriorityMatrix, RecordSource, RemediationPhases,
        RemediationPlan, RiskAssessment, SeverityBreakdown,
    };
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn test_issue() -> MappedIssue {
        MappedIssue {
            kind: "gdpr.cookie_banner".to_string(),
            severity: Severity::Critical,
            subject: "document".to_string(),
            description: "No cookie consent mechanism found".to_string(),
            regulation: "GDPR Article 7 - Conditions for consent".to_string(),
            suggestion: "Add a consent banner".to_string(),
            element_path: "/html/body".to_string(),
            element_selector: "body".to_string(),
            business_impact: "Legal liability".to_string(),
            fix_priority: 1,
            estimated_effort: "1 day".to_string(),
            source: RecordSource::Technical,
        }
    }

    fn test_report() -> CombinedReport {
        let issues = vec![test_issue()];
        CombinedReport {
            status: AuditStatus::Partial,
            generated_at: Utc::now(),
            url: "https://example.com/".to_string(),
            compliance_score: 70,
            severity_breakdown: SeverityBreakdown {
                critical: 1,
                ..SeverityBreakdown::default()
            },
            category_breakdown: BTreeMap::from([("gdpr".to_string(), 1)]),
            priority_matrix: PriorityMatrix::from_issues(&issues),
            mapped_issues: issues,
            remediation_plan: RemediationPlan {
                fixes: vec![RemediationFix {
                    issue_kind: "gdpr.cookie_banner".to_string(),
                    description: "Implement a consent banner".to_string(),
                    example: "<div id=\"consent\"></div>".to_string(),
                    steps: vec!["Add the banner".to_string()],
                    validation: "Check the banner appears".to_string(),
                    estimated_effort: "4 hours".to_string(),
                }],
                priority_order: vec!["gdpr.cookie_banner".to_string()],
                phases: RemediationPhases::default(),
                estimated_total_hours: 4,
            },
            narrative: NarrativeSection {
                risk_assessment: Some(RiskAssessment {
                    overall_risk_level: Severity::High,
                    risk_factors: vec!["Missing consent".to_string()],
                    potential_penalties: vec!["GDPR fines".to_string()],
                    business_impact: "Legal exposure".to_string(),
                    summary: "High risk".to_string(),
                    source: RecordSource::NarrativeStrict,
                }),
                ..NarrativeSection::default()
            },
            roles_succeeded: vec!["risk_assessment".to_string()],
            warnings: vec!["role roadmap failed: connection refused".to_string()],
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = test_report();
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("# Compliance Audit Report"));
        assert!(markdown.contains("**70/100**"));
        assert!(markdown.contains("gdpr.cookie_banner"));
        assert!(markdown.contains("GDPR Article 7"));
        assert!(markdown.contains("## Remediation Plan"));
        assert!(markdown.contains("### Risk Assessment"));
        assert!(markdown.contains("## Warnings"));
        assert!(markdown.contains("connection refused"));
    }

    #[test]
    fn test_fix_examples_can_be_disabled() {
        let report = test_report();
        let config = ReportConfig {
            include_fix_examples: false,
            ..ReportConfig::default()
        };
        let markdown = generate_markdown_report(&report, &config);

        assert!(!markdown.contains("<summary>Example</summary>"));
        assert!(markdown.contains("**Validation:**"));
    }

    #[test]
    fn test_issue_block_marks_narrative_source() {
        let mut issue = test_issue();
        issue.source = RecordSource::NarrativeHeuristic;
        let block = generate_issue_block(&issue);
        assert!(block.contains("narrative analysis"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"status\": \"partial\""));
        assert!(json.contains("\"compliance_score\": 70"));
        assert!(json.contains("\"mapped_issues\""));
        // Absent narrative sections are omitted, not null.
        assert!(!json.contains("\"legal_context\""));
    }
}
