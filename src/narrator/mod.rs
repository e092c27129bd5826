//! Narrator interface: the external reasoning collaborator.
//!
//! The orchestrator talks to an LLM through the [`Narrator`] trait so
//! tests can script responses. The production implementation posts to
//! the Ollama chat API with a role-specific system prompt.

use crate::config::NarratorConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// The four collaborator roles, in pipeline invocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarratorRole {
    ScanEnhance,
    LegalContext,
    RiskAssessment,
    Roadmap,
}

impl NarratorRole {
    /// All roles in the order the pipeline runs them.
    pub const ALL: [NarratorRole; 4] = [
        NarratorRole::ScanEnhance,
        NarratorRole::LegalContext,
        NarratorRole::RiskAssessment,
        NarratorRole::Roadmap,
    ];

    /// System prompt establishing the role's analytical focus.
    pub fn system_prompt(&self) -> &'static str {
        match self {
            NarratorRole::ScanEnhance => SCAN_ENHANCE_PROMPT,
            NarratorRole::LegalContext => LEGAL_CONTEXT_PROMPT,
            NarratorRole::RiskAssessment => RISK_ASSESSMENT_PROMPT,
            NarratorRole::Roadmap => ROADMAP_PROMPT,
        }
    }
}

impl fmt::Display for NarratorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NarratorRole::ScanEnhance => "scan_enhance",
            NarratorRole::LegalContext => "legal_context",
            NarratorRole::RiskAssessment => "risk_assessment",
            NarratorRole::Roadmap => "roadmap",
        };
        write!(f, "{}", name)
    }
}

/// An external collaborator that answers one role-framed question at a
/// time. Implementations may fail or hang; the orchestrator owns the
/// timeout and skip policy.
pub trait Narrator {
    fn ask(
        &self,
        role: NarratorRole,
        context: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// Chat message in the Ollama wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Ollama-backed narrator.
pub struct OllamaNarrator {
    config: NarratorConfig,
    http_client: reqwest::Client,
}

impl OllamaNarrator {
    pub fn new(config: NarratorConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.role_timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }
}

impl Narrator for OllamaNarrator {
    async fn ask(&self, role: NarratorRole, context: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.config.ollama_url);

        let request = OllamaChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: role.system_prompt().to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: context.to_string(),
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        };

        debug!("Sending {} request to {}", role, url);

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!(
                        "Request timed out after {}s. Try a different model.",
                        self.config.role_timeout_seconds
                    )
                } else if e.is_connect() {
                    anyhow::anyhow!(
                        "Cannot connect to Ollama at {}. Is Ollama running?",
                        self.config.ollama_url
                    )
                } else {
                    anyhow::anyhow!("Failed to send request: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Ollama API error {}: {}", status, body));
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(chat_response.message.content)
    }
}

const SCAN_ENHANCE_PROMPT: &str = r#"You are a web compliance auditor reviewing an automated scan.
Given the technical findings, identify any additional compliance issues the scan may have missed.
Prefer a JSON response: {"findings": [{"kind": "...", "severity": "critical|high|medium|low", "subject": "...", "description": "..."}], "summary": "..."}.
Base every finding on the specific violations provided, not generic advice."#;

const LEGAL_CONTEXT_PROMPT: &str = r#"You are a regulatory compliance analyst.
Given the compliance findings, summarize the relevant legal context.
Prefer a JSON response: {"recent_updates": [...], "relevant_regulations": [...], "enforcement_trends": [...], "compliance_deadlines": [...], "update_summary": "..."}.
Include specific regulation references (GDPR Articles, WCAG guidelines, ADA requirements)."#;

const RISK_ASSESSMENT_PROMPT: &str = r#"You are a compliance risk assessor.
Given the compliance findings and legal context, assess the overall risk.
Prefer a JSON response: {"overall_risk_level": "critical|high|medium|low", "risk_factors": [...], "potential_penalties": [...], "business_impact": "...", "risk_summary": "..."}.
Consider regulatory penalties, litigation exposure, and reputation risk."#;

const ROADMAP_PROMPT: &str = r#"You are a compliance remediation planner.
Given the full analysis, propose a phased implementation roadmap.
Prefer a JSON response: {"immediate": [...], "short_term": [...], "long_term": [...], "ongoing_maintenance": [...], "roadmap_summary": "..."}.
Base every action on the specific violations found, with concrete technical steps."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_run_in_pipeline_order() {
        assert_eq!(NarratorRole::ALL[0], NarratorRole::ScanEnhance);
        assert_eq!(NarratorRole::ALL[3], NarratorRole::Roadmap);
    }

    #[test]
    fn test_role_display_names() {
        assert_eq!(NarratorRole::ScanEnhance.to_string(), "scan_enhance");
        assert_eq!(NarratorRole::RiskAssessment.to_string(), "risk_assessment");
    }

    #[test]
    fn test_every_role_has_a_prompt() {
        for role in NarratorRole::ALL {
            assert!(!role.system_prompt().is_empty());
        }
    }
}
