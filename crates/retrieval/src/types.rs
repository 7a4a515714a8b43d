// Core data types shared by the retrieval pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Tool categories used for candidate selection and category scoring
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Code,
    FileSystem,
    Git,
    Search,
    Web,
    Database,
    Testing,
    Security,
    Documentation,
    Deployment,
    Monitoring,
    Communication,
    Analysis,
    System,
    Custom(String),
}

impl ToolCategory {
    pub fn as_str(&self) -> &str {
        match self {
            ToolCategory::Code => "code",
            ToolCategory::FileSystem => "file_system",
            ToolCategory::Git => "git",
            ToolCategory::Search => "search",
            ToolCategory::Web => "web",
            ToolCategory::Database => "database",
            ToolCategory::Testing => "testing",
            ToolCategory::Security => "security",
            ToolCategory::Documentation => "documentation",
            ToolCategory::Deployment => "deployment",
            ToolCategory::Monitoring => "monitoring",
            ToolCategory::Communication => "communication",
            ToolCategory::Analysis => "analysis",
            ToolCategory::System => "system",
            ToolCategory::Custom(name) => name.as_str(),
        }
    }
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry-owned description of a tool. Read-only to the retrieval pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpec {
    /// Unique within a registry
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: ToolCategory,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub required_permissions: Vec<String>,
    /// 0..=100
    #[serde(default)]
    pub priority: u8,
    #[serde(default)]
    pub token_cost: u32,
    #[serde(default)]
    pub deprecated: bool,
    pub last_updated: DateTime<Utc>,
}

impl ToolSpec {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        category: ToolCategory,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            category,
            capabilities: Vec::new(),
            keywords: Vec::new(),
            required_permissions: Vec::new(),
            priority: 50,
            token_cost: 100,
            deprecated: false,
            last_updated: Utc::now(),
        }
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.min(100);
        self
    }

    pub fn with_token_cost(mut self, token_cost: u32) -> Self {
        self.token_cost = token_cost;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Text used for semantic embedding of the tool
    pub fn embedding_text(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.name,
            self.description,
            self.capabilities.join(" "),
            self.keywords.join(" "),
            self.category
        )
    }
}

/// Structured interpretation of a query, produced by an intent analyzer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedIntent {
    pub normalized_query: String,
    pub keywords: Vec<String>,
    pub relevant_categories: Vec<ToolCategory>,
    pub required_capabilities: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceFeedback {
    Helpful,
    NotHelpful,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUsageRecord {
    pub tool_id: String,
    pub success: bool,
    #[serde(default)]
    pub feedback: Option<RelevanceFeedback>,
}

impl ToolUsageRecord {
    pub fn new(tool_id: impl Into<String>, success: bool) -> Self {
        Self {
            tool_id: tool_id.into(),
            success,
            feedback: None,
        }
    }

    pub fn with_feedback(mut self, feedback: RelevanceFeedback) -> Self {
        self.feedback = Some(feedback);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPreferences {
    #[serde(default)]
    pub preferred_tools: Vec<String>,
    #[serde(default)]
    pub excluded_tools: Vec<String>,
    #[serde(default)]
    pub preferred_categories: Vec<ToolCategory>,
}

/// What the agent is currently working on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskContext {
    pub task_type: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Caller-supplied agent state. Read-only to the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentContext {
    pub agent_id: String,
    #[serde(default)]
    pub permissions: BTreeSet<String>,
    /// Oldest first
    #[serde(default)]
    pub history: Vec<ToolUsageRecord>,
    #[serde(default)]
    pub preferences: AgentPreferences,
    #[serde(default)]
    pub task_context: Option<TaskContext>,
}

impl AgentContext {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            ..Default::default()
        }
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_history(mut self, history: Vec<ToolUsageRecord>) -> Self {
        self.history = history;
        self
    }

    pub fn with_preferences(mut self, preferences: AgentPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_task_context(mut self, task_context: TaskContext) -> Self {
        self.task_context = Some(task_context);
        self
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

/// Per-call overrides and hints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalOptions {
    pub max_tools: Option<usize>,
    pub max_token_budget: Option<u32>,
    pub min_relevance_score: Option<f64>,
    #[serde(default)]
    pub include_deprecated: bool,
    #[serde(default)]
    pub excluded_tool_ids: Vec<String>,
    /// Tools the caller wants ranked up (x1.5)
    #[serde(default)]
    pub prioritized_tool_ids: Vec<String>,
    #[serde(default)]
    pub category_boosts: HashMap<ToolCategory, f64>,
    #[serde(default)]
    pub bypass_permissions: bool,
}

impl RetrievalOptions {
    /// True when nothing overrides the engine configuration
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Stable textual form, used to separate cache entries of differently-constrained calls
    pub fn fingerprint(&self) -> String {
        let mut excluded = self.excluded_tool_ids.clone();
        excluded.sort();
        let mut prioritized = self.prioritized_tool_ids.clone();
        prioritized.sort();
        let mut boosts: Vec<String> = self
            .category_boosts
            .iter()
            .map(|(category, boost)| format!("{}={}", category, boost))
            .collect();
        boosts.sort();

        format!(
            "max={:?};budget={:?};min={:?};deprecated={};excluded={};prioritized={};boosts={};bypass={}",
            self.max_tools,
            self.max_token_budget,
            self.min_relevance_score,
            self.include_deprecated,
            excluded.join(","),
            prioritized.join(","),
            boosts.join(","),
            self.bypass_permissions
        )
    }
}

/// A scored candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedTool {
    pub tool: ToolSpec,
    pub semantic_score: f64,
    pub keyword_score: f64,
    pub permission_score: f64,
    pub priority_score: f64,
    pub category_score: f64,
    /// Weighted blend before contextual boosts, clamped to [0, 1]
    pub relevance_score: f64,
    /// Weighted and boosted, clamped to [0, 1]
    pub final_score: f64,
    pub match_reasons: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalMetadata {
    pub candidates_scanned: usize,
    pub filtered_by_permissions: usize,
    pub filtered_by_score: usize,
    pub semantic_search_used: bool,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRetrievalResult {
    /// Descending by final score
    pub tools: Vec<RetrievedTool>,
    pub total_candidates: usize,
    pub query: String,
    pub retrieval_time_ms: u64,
    pub total_token_cost: u64,
    pub metadata: RetrievalMetadata,
}

impl ToolRetrievalResult {
    pub fn tool_ids(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.tool.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_display_and_serde() {
        assert_eq!(ToolCategory::FileSystem.to_string(), "file_system");
        assert_eq!(ToolCategory::Custom("ml".into()).to_string(), "ml");

        let json = serde_json::to_string(&ToolCategory::Security).unwrap();
        assert_eq!(json, "\"security\"");
    }

    #[test]
    fn test_embedding_text_includes_all_fields() {
        let tool = ToolSpec::new("scan", "Vuln Scanner", "scans dependencies", ToolCategory::Security)
            .with_capabilities(["audit"])
            .with_keywords(["cve"]);

        let text = tool.embedding_text();
        assert!(text.contains("Vuln Scanner"));
        assert!(text.contains("scans dependencies"));
        assert!(text.contains("audit"));
        assert!(text.contains("cve"));
        assert!(text.contains("security"));
    }

    #[test]
    fn test_options_fingerprint_is_order_independent() {
        let a = RetrievalOptions {
            excluded_tool_ids: vec!["b".into(), "a".into()],
            ..Default::default()
        };
        let b = RetrievalOptions {
            excluded_tool_ids: vec!["a".into(), "b".into()],
            ..Default::default()
        };
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert!(RetrievalOptions::default().is_default());
        assert!(!a.is_default());
    }

    #[test]
    fn test_priority_is_capped() {
        let tool = ToolSpec::new("t", "t", "t", ToolCategory::Code).with_priority(250);
        assert_eq!(tool.priority, 100);
    }
}
