// Candidate pool selection from parsed intent

use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::config::JitToolConfig;
use crate::error::{Result, RetrievalError};
use crate::registry::{ToolRegistry, ToolSearchQuery};
use crate::types::{ParsedIntent, RetrievalOptions, ToolCategory, ToolSpec};

/// Derives the initial tool pool for one retrieval call
#[derive(Clone)]
pub struct CandidateSelector {
    registry: Arc<dyn ToolRegistry>,
}

impl std::fmt::Debug for CandidateSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateSelector").finish_non_exhaustive()
    }
}

impl CandidateSelector {
    pub fn new(registry: Arc<dyn ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Candidate order is not significant; the pipeline re-sorts after scoring.
    pub async fn select(
        &self,
        intent: &ParsedIntent,
        config: &JitToolConfig,
        options: &RetrievalOptions,
    ) -> Result<Vec<ToolSpec>> {
        let mut candidates = if !intent.relevant_categories.is_empty() {
            self.by_categories(&intent.relevant_categories).await?
        } else if !config.included_categories.is_empty() {
            self.by_categories(&config.included_categories).await?
        } else {
            self.registry
                .get_all(!options.include_deprecated)
                .await
                .map_err(|source| RetrievalError::RegistryFailed { source })?
        };
        debug!(count = candidates.len(), "initial candidate pool");

        let allowed = |tool: &ToolSpec| {
            !config.excluded_categories.contains(&tool.category)
                && !options.excluded_tool_ids.contains(&tool.id)
        };
        candidates.retain(|tool| allowed(tool));

        // Capability matches only ever add to the pool, and never re-admit exclusions
        if !intent.required_capabilities.is_empty() {
            let query = ToolSearchQuery {
                capabilities: intent.required_capabilities.clone(),
                include_deprecated: options.include_deprecated,
            };
            let matches = self
                .registry
                .search(&query)
                .await
                .map_err(|source| RetrievalError::RegistryFailed { source })?;

            let mut seen: HashSet<String> = candidates.iter().map(|t| t.id.clone()).collect();
            let before = candidates.len();
            for tool in matches.into_iter().filter(|tool| allowed(tool)) {
                if seen.insert(tool.id.clone()) {
                    candidates.push(tool);
                }
            }
            debug!(added = candidates.len() - before, "merged capability matches");
        }

        Ok(candidates)
    }

    async fn by_categories(&self, categories: &[ToolCategory]) -> Result<Vec<ToolSpec>> {
        let mut seen = HashSet::new();
        let mut tools = Vec::new();
        for category in categories {
            let found = self
                .registry
                .get_by_category(category)
                .await
                .map_err(|source| RetrievalError::RegistryFailed { source })?;
            for tool in found {
                if seen.insert(tool.id.clone()) {
                    tools.push(tool);
                }
            }
        }
        Ok(tools)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryToolRegistry;

    fn selector() -> CandidateSelector {
        let registry = InMemoryToolRegistry::with_tools(vec![
            ToolSpec::new("lint", "Linter", "lints", ToolCategory::Code).with_capabilities(["lint"]),
            ToolSpec::new("old", "Old", "legacy", ToolCategory::Code).deprecated(),
            ToolSpec::new("scan", "Scanner", "scans", ToolCategory::Security)
                .with_capabilities(["audit"]),
            ToolSpec::new("unit", "Unit runner", "runs tests", ToolCategory::Testing)
                .with_capabilities(["audit"]),
            ToolSpec::new("docs", "Doc gen", "docs", ToolCategory::Documentation),
        ]);
        CandidateSelector::new(Arc::new(registry))
    }

    fn ids(tools: &[ToolSpec]) -> Vec<&str> {
        let mut ids: Vec<&str> = tools.iter().map(|t| t.id.as_str()).collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn test_intent_categories_take_precedence() {
        let intent = ParsedIntent {
            relevant_categories: vec![ToolCategory::Security, ToolCategory::Testing],
            ..Default::default()
        };
        let config = JitToolConfig {
            included_categories: vec![ToolCategory::Documentation],
            ..Default::default()
        };
        let tools = selector()
            .select(&intent, &config, &RetrievalOptions::default())
            .await
            .unwrap();
        assert_eq!(ids(&tools), vec!["scan", "unit"]);
    }

    #[tokio::test]
    async fn test_included_categories_when_intent_has_none() {
        let config = JitToolConfig {
            included_categories: vec![ToolCategory::Documentation],
            ..Default::default()
        };
        let tools = selector()
            .select(&ParsedIntent::default(), &config, &RetrievalOptions::default())
            .await
            .unwrap();
        assert_eq!(ids(&tools), vec!["docs"]);
    }

    #[tokio::test]
    async fn test_full_registry_fallback_and_deprecation() {
        let selector = selector();
        let config = JitToolConfig::default();

        let tools = selector
            .select(&ParsedIntent::default(), &config, &RetrievalOptions::default())
            .await
            .unwrap();
        assert_eq!(ids(&tools), vec!["docs", "lint", "scan", "unit"]);

        let options = RetrievalOptions {
            include_deprecated: true,
            ..Default::default()
        };
        let tools = selector
            .select(&ParsedIntent::default(), &config, &options)
            .await
            .unwrap();
        assert_eq!(tools.len(), 5);
    }

    #[tokio::test]
    async fn test_exclusions() {
        let config = JitToolConfig {
            excluded_categories: vec![ToolCategory::Code],
            ..Default::default()
        };
        let options = RetrievalOptions {
            excluded_tool_ids: vec!["docs".into()],
            ..Default::default()
        };
        let tools = selector()
            .select(&ParsedIntent::default(), &config, &options)
            .await
            .unwrap();
        assert_eq!(ids(&tools), vec!["scan", "unit"]);
    }

    #[tokio::test]
    async fn test_capability_matches_are_merged_without_duplicates() {
        let intent = ParsedIntent {
            relevant_categories: vec![ToolCategory::Security],
            required_capabilities: vec!["audit".into()],
            ..Default::default()
        };
        let tools = selector()
            .select(&intent, &JitToolConfig::default(), &RetrievalOptions::default())
            .await
            .unwrap();
        assert_eq!(ids(&tools), vec!["scan", "unit"]);
    }

    #[tokio::test]
    async fn test_capability_matches_do_not_readmit_excluded_tools() {
        let intent = ParsedIntent {
            relevant_categories: vec![ToolCategory::Security],
            required_capabilities: vec!["audit".into()],
            ..Default::default()
        };
        let options = RetrievalOptions {
            excluded_tool_ids: vec!["unit".into()],
            ..Default::default()
        };
        let tools = selector()
            .select(&intent, &JitToolConfig::default(), &options)
            .await
            .unwrap();
        assert_eq!(ids(&tools), vec!["scan"]);
    }
}
