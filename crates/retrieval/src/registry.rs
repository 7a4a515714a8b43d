// Tool registry contract and an in-memory implementation

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::types::{ToolCategory, ToolSpec};

/// Capability search request
#[derive(Debug, Clone, Default)]
pub struct ToolSearchQuery {
    pub capabilities: Vec<String>,
    pub include_deprecated: bool,
}

/// Source of tool specs consumed by the retriever
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    async fn get_by_category(&self, category: &ToolCategory) -> Result<Vec<ToolSpec>>;

    async fn get_all(&self, exclude_deprecated: bool) -> Result<Vec<ToolSpec>>;

    /// Tools offering at least one of the requested capabilities
    async fn search(&self, query: &ToolSearchQuery) -> Result<Vec<ToolSpec>>;
}

/// Thread-safe registry backed by a map keyed by tool id
#[derive(Debug, Default)]
pub struct InMemoryToolRegistry {
    tools: RwLock<HashMap<String, ToolSpec>>,
}

impl InMemoryToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tools(tools: impl IntoIterator<Item = ToolSpec>) -> Self {
        let map = tools
            .into_iter()
            .map(|tool| (tool.id.clone(), tool))
            .collect();
        Self {
            tools: RwLock::new(map),
        }
    }

    /// Insert or replace a tool; returns the previous spec with the same id
    pub async fn register(&self, tool: ToolSpec) -> Option<ToolSpec> {
        debug!(tool_id = %tool.id, category = %tool.category, "registering tool");
        self.tools.write().await.insert(tool.id.clone(), tool)
    }

    pub async fn unregister(&self, id: &str) -> Option<ToolSpec> {
        self.tools.write().await.remove(id)
    }

    pub async fn get(&self, id: &str) -> Option<ToolSpec> {
        self.tools.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.tools.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tools.read().await.is_empty()
    }

    // Sorted by id so callers see a stable order
    async fn collect<F>(&self, mut keep: F) -> Vec<ToolSpec>
    where
        F: FnMut(&ToolSpec) -> bool,
    {
        let tools = self.tools.read().await;
        let mut matched: Vec<ToolSpec> = tools.values().filter(|t| keep(*t)).cloned().collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        matched
    }
}

#[async_trait]
impl ToolRegistry for InMemoryToolRegistry {
    async fn get_by_category(&self, category: &ToolCategory) -> Result<Vec<ToolSpec>> {
        Ok(self.collect(|t| &t.category == category).await)
    }

    async fn get_all(&self, exclude_deprecated: bool) -> Result<Vec<ToolSpec>> {
        Ok(self.collect(|t| !(exclude_deprecated && t.deprecated)).await)
    }

    async fn search(&self, query: &ToolSearchQuery) -> Result<Vec<ToolSpec>> {
        let wanted: Vec<String> = query
            .capabilities
            .iter()
            .map(|c| c.to_lowercase())
            .collect();

        Ok(self
            .collect(|t| {
                (query.include_deprecated || !t.deprecated)
                    && t.capabilities
                        .iter()
                        .any(|c| wanted.contains(&c.to_lowercase()))
            })
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> InMemoryToolRegistry {
        InMemoryToolRegistry::with_tools(vec![
            ToolSpec::new("lint", "Linter", "lints code", ToolCategory::Code)
                .with_capabilities(["lint", "format"]),
            ToolSpec::new("old_lint", "Old linter", "legacy", ToolCategory::Code)
                .with_capabilities(["lint"])
                .deprecated(),
            ToolSpec::new("scan", "Scanner", "scans", ToolCategory::Security)
                .with_capabilities(["audit"]),
        ])
    }

    #[tokio::test]
    async fn test_get_by_category() {
        let tools = registry().get_by_category(&ToolCategory::Code).await.unwrap();
        let ids: Vec<_> = tools.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["lint", "old_lint"]);
    }

    #[tokio::test]
    async fn test_get_all_respects_deprecation() {
        let registry = registry();
        assert_eq!(registry.get_all(true).await.unwrap().len(), 2);
        assert_eq!(registry.get_all(false).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_search_by_capability_is_case_insensitive() {
        let registry = registry();
        let query = ToolSearchQuery {
            capabilities: vec!["LINT".into()],
            include_deprecated: false,
        };
        let ids: Vec<_> = registry
            .search(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["lint".to_string()]);
    }

    #[tokio::test]
    async fn test_unregister_removes_tool_from_every_lookup() {
        let registry = registry();

        let removed = registry.unregister("lint").await;
        assert_eq!(removed.map(|t| t.id), Some("lint".to_string()));
        assert!(registry.unregister("lint").await.is_none());

        assert!(registry.get("lint").await.is_none());
        assert_eq!(registry.len().await, 2);
        let query = ToolSearchQuery {
            capabilities: vec!["format".into()],
            include_deprecated: true,
        };
        assert!(registry.search(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_replaces_existing() {
        let registry = registry();
        let replaced = registry
            .register(ToolSpec::new("scan", "Scanner v2", "scans more", ToolCategory::Security))
            .await;
        assert!(replaced.is_some());
        assert_eq!(registry.len().await, 3);
        assert_eq!(registry.get("scan").await.unwrap().name, "Scanner v2");
    }
}
