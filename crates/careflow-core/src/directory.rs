//! Agent Directory
//!
//! Supplies the selectable agents with their labels and system prompts.
//! The multiplexer consumes a directory but never owns one; when the
//! directory is unreachable it keeps the built-in fallback list.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

/// A selectable agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Agent id, used as the runtime slot key
    pub id: String,
    /// Display label
    pub label: String,
    /// Short description for the selector
    #[serde(default)]
    pub description: String,
    /// System prompt
    #[serde(default, deserialize_with = "deserialize_system")]
    pub system: String,
}

impl AgentDescriptor {
    /// Create a descriptor with an empty description and system prompt
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: String::new(),
            system: String::new(),
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the system prompt
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }
}

/// Accepts a plain string or `{"content": [{"text": ..}, ..]}`.
fn deserialize_system<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(text) => text,
        Value::Object(map) => map
            .get("content")
            .and_then(Value::as_array)
            .map(|chunks| {
                chunks
                    .iter()
                    .filter_map(|chunk| chunk.get("text").and_then(Value::as_str))
                    .filter(|text| !text.trim().is_empty())
                    .collect::<Vec<_>>()
                    .join("\n\n")
            })
            .unwrap_or_default(),
        _ => String::new(),
    })
}

/// Built-in agents used until (or instead of) a directory answer
#[must_use]
pub fn fallback_agents() -> Vec<AgentDescriptor> {
    vec![
        AgentDescriptor::new("defaultAgent", "Default Agent")
            .with_description("General assistant for text requests and explanations."),
        AgentDescriptor::new("geoAgent", "Geo Agent")
            .with_description("Geodata specialist: nearby places, routes and weather."),
        AgentDescriptor::new("salesAgent", "Sales Agent").with_description(
            "Clinic coordinator: books appointments, confirms visits and follows up with patients.",
        ),
        AgentDescriptor::new("browserAgent", "Browser Agent")
            .with_description("Explores web pages, extracts data and takes screenshots."),
        AgentDescriptor::new("doctorAgent", "Doctor Agent")
            .with_description("Medical questions answered from PubMed sources only."),
        AgentDescriptor::new("n8nAgent", "n8n Agent")
            .with_description("n8n automation expert: workflow design, validation and setup."),
    ]
}

/// Source of selectable agents
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    /// List available agents
    async fn list_agents(&self) -> Result<Vec<AgentDescriptor>>;
}

/// Directory serving a fixed list
#[derive(Debug, Clone)]
pub struct StaticAgentDirectory {
    agents: Vec<AgentDescriptor>,
}

impl StaticAgentDirectory {
    /// Serve `agents`
    #[must_use]
    pub fn new(agents: Vec<AgentDescriptor>) -> Self {
        Self { agents }
    }
}

impl Default for StaticAgentDirectory {
    fn default() -> Self {
        Self::new(fallback_agents())
    }
}

#[async_trait]
impl AgentDirectory for StaticAgentDirectory {
    async fn list_agents(&self) -> Result<Vec<AgentDescriptor>> {
        Ok(self.agents.clone())
    }
}

#[derive(Debug, Deserialize)]
struct AgentsResponse {
    #[serde(default)]
    agents: Vec<AgentDescriptor>,
}

/// Directory read from `GET {base_url}/api/agents`
pub struct HttpAgentDirectory {
    client: Client,
    base_url: String,
}

impl HttpAgentDirectory {
    /// Create a directory client
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::directory(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Base URL of the directory
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl AgentDirectory for HttpAgentDirectory {
    async fn list_agents(&self) -> Result<Vec<AgentDescriptor>> {
        let url = format!("{}/api/agents", self.base_url);
        debug!(url = %url, "Fetching agent directory");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::directory(format!(
                "directory returned status {}",
                response.status()
            )));
        }

        let body: AgentsResponse = response.json().await?;
        Ok(body.agents)
    }
}

/// A starter prompt for an empty thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThreadSuggestion {
    /// Headline
    pub title: &'static str,
    /// Secondary line
    pub label: &'static str,
    /// Prompt sent when picked
    pub prompt: &'static str,
}

const fn suggestion(
    title: &'static str,
    label: &'static str,
    prompt: &'static str,
) -> ThreadSuggestion {
    ThreadSuggestion {
        title,
        label,
        prompt,
    }
}

const DEFAULT_SUGGESTIONS: &[ThreadSuggestion] = &[
    suggestion(
        "What can this agent do",
        "capabilities overview",
        "Briefly describe which tasks this agent can solve and what its limits are",
    ),
    suggestion(
        "Help me get started",
        "suggest a plan",
        "List the first steps to start using the assistant",
    ),
    suggestion(
        "Collect questions",
        "for the manager",
        "Draft the questions worth asking the onboarding manager",
    ),
    suggestion(
        "Suggest scenarios",
        "for a demo",
        "Suggest 3 scenarios we could show a client in a demo",
    ),
];

const SALES_SUGGESTIONS: &[ThreadSuggestion] = &[
    suggestion(
        "Book a visit",
        "new patient",
        "Book Anna Petrova with the therapist for a checkup, phone +7 900 000-00-00",
    ),
    suggestion(
        "Confirm tomorrow",
        "move to scheduled",
        "Confirm the pending visits for tomorrow morning and record the time slots",
    ),
    suggestion(
        "Follow up",
        "after the visit",
        "Add a follow-up note to every completed visit from this week",
    ),
    suggestion(
        "Board summary",
        "per stage",
        "Summarise the board: how many requests are in each stage and what is next",
    ),
];

const DOCTOR_SUGGESTIONS: &[ThreadSuggestion] = &[
    suggestion(
        "Find studies",
        "on a condition",
        "Find 3 recent PubMed studies on migraine treatment and summarise the findings",
    ),
    suggestion(
        "Answer a patient",
        "with sources",
        "Write a short consultation on bronchitis symptoms citing PubMed sources",
    ),
];

const N8N_SUGGESTIONS: &[ThreadSuggestion] = &[
    suggestion(
        "Design a workflow",
        "for lead capture",
        "Propose an n8n workflow that collects leads from a form and notifies Slack",
    ),
    suggestion(
        "Prepare a checklist",
        "for deployment",
        "Write a checklist for deploying a new n8n workflow to production",
    ),
];

/// Starter prompts for an agent's welcome view
#[must_use]
pub fn thread_suggestions(agent_id: &str) -> &'static [ThreadSuggestion] {
    match agent_id {
        "salesAgent" => SALES_SUGGESTIONS,
        "doctorAgent" => DOCTOR_SUGGESTIONS,
        "n8nAgent" => N8N_SUGGESTIONS,
        _ => DEFAULT_SUGGESTIONS,
    }
}
