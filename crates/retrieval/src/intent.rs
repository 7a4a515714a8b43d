// Intent analysis: contract and a keyword-table analyzer

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;

use crate::types::{AgentContext, ParsedIntent, TaskContext, ToolCategory};

/// Turns a natural-language query into a `ParsedIntent`
#[async_trait]
pub trait IntentAnalyzer: Send + Sync {
    async fn analyze(&self, query: &str, context: Option<&AgentContext>) -> Result<ParsedIntent>;

    async fn analyze_with_task_context(
        &self,
        query: &str,
        task_context: &TaskContext,
    ) -> Result<ParsedIntent>;
}

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "for", "from", "help", "how",
    "i", "in", "is", "it", "me", "my", "need", "of", "on", "or", "please", "some", "that", "the",
    "this", "to", "tool", "tools", "use", "want", "we", "with", "you",
];

fn default_category_triggers() -> Vec<(ToolCategory, Vec<&'static str>)> {
    vec![
        (ToolCategory::Code, vec!["code", "refactor", "compile", "lint", "format"]),
        (ToolCategory::FileSystem, vec!["file", "files", "directory", "folder", "path"]),
        (ToolCategory::Git, vec!["git", "commit", "branch", "merge", "diff"]),
        (ToolCategory::Search, vec!["search", "find", "grep", "lookup"]),
        (ToolCategory::Web, vec!["web", "http", "url", "fetch", "download", "browser"]),
        (ToolCategory::Database, vec!["database", "sql", "query", "table", "schema"]),
        (ToolCategory::Testing, vec!["test", "tests", "testing", "coverage", "assert"]),
        (ToolCategory::Security, vec!["security", "vulnerability", "vulnerabilities", "audit", "secret", "cve"]),
        (ToolCategory::Documentation, vec!["docs", "documentation", "readme", "document"]),
        (ToolCategory::Deployment, vec!["deploy", "deployment", "release", "rollout"]),
        (ToolCategory::Monitoring, vec!["monitor", "monitoring", "metrics", "alert", "logs"]),
        (ToolCategory::Communication, vec!["message", "email", "notify", "chat", "slack"]),
        (ToolCategory::Analysis, vec!["analyze", "analysis", "profile", "report"]),
        (ToolCategory::System, vec!["shell", "process", "system", "command"]),
    ]
}

/// Analyzer driven by a stop-word list, a category trigger table and an
/// optional capability vocabulary
#[derive(Debug, Clone)]
pub struct KeywordIntentAnalyzer {
    category_triggers: Vec<(ToolCategory, Vec<&'static str>)>,
    capability_vocabulary: HashSet<String>,
}

impl Default for KeywordIntentAnalyzer {
    fn default() -> Self {
        Self {
            category_triggers: default_category_triggers(),
            capability_vocabulary: HashSet::new(),
        }
    }
}

impl KeywordIntentAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Words that, when present in a query, become required capabilities
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capability_vocabulary = capabilities
            .into_iter()
            .map(|c| c.into().to_lowercase())
            .collect();
        self
    }

    /// Custom categories, recognized when a query names them
    pub fn with_custom_categories<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let category = ToolCategory::Custom(name.into().to_lowercase());
            if !self.category_triggers.iter().any(|(c, _)| *c == category) {
                self.category_triggers.push((category, Vec::new()));
            }
        }
        self
    }

    pub fn normalize(query: &str) -> String {
        query
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { ' ' })
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn extract_keywords(normalized: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        normalized
            .split_whitespace()
            .filter(|w| w.len() > 1 && !STOP_WORDS.contains(w))
            .filter(|w| seen.insert(*w))
            .map(str::to_string)
            .collect()
    }

    fn categories_for(&self, keywords: &[String]) -> Vec<ToolCategory> {
        self.category_triggers
            .iter()
            .filter(|(category, triggers)| {
                keywords
                    .iter()
                    .any(|k| triggers.contains(&k.as_str()) || k == category.as_str())
            })
            .map(|(category, _)| category.clone())
            .collect()
    }

    fn parse(&self, query: &str) -> ParsedIntent {
        let normalized_query = Self::normalize(query);
        let keywords = Self::extract_keywords(&normalized_query);
        let relevant_categories = self.categories_for(&keywords);
        let required_capabilities = keywords
            .iter()
            .filter(|k| self.capability_vocabulary.contains(k.as_str()))
            .cloned()
            .collect();

        ParsedIntent {
            normalized_query,
            keywords,
            relevant_categories,
            required_capabilities,
        }
    }
}

#[async_trait]
impl IntentAnalyzer for KeywordIntentAnalyzer {
    async fn analyze(&self, query: &str, _context: Option<&AgentContext>) -> Result<ParsedIntent> {
        Ok(self.parse(query))
    }

    async fn analyze_with_task_context(
        &self,
        query: &str,
        task_context: &TaskContext,
    ) -> Result<ParsedIntent> {
        let mut intent = self.parse(query);

        // The task type can imply a category the query itself does not name
        let task_text = format!(
            "{} {}",
            task_context.task_type,
            task_context.description.as_deref().unwrap_or_default()
        );
        let task_keywords = Self::extract_keywords(&Self::normalize(&task_text));
        for category in self.categories_for(&task_keywords) {
            if !intent.relevant_categories.contains(&category) {
                intent.relevant_categories.push(category);
            }
        }

        Ok(intent)
    }
}
