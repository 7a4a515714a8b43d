// Permission filtering of scored candidates

use crate::config::PermissionMode;
use crate::types::{AgentContext, RetrievedTool, ToolSpec};

#[derive(Debug, Clone, Copy)]
pub struct PermissionFilter {
    mode: PermissionMode,
}

impl PermissionFilter {
    pub fn new(mode: PermissionMode) -> Self {
        Self { mode }
    }

    /// Whether the agent may use `tool` under this filter's mode
    pub fn is_allowed(&self, tool: &ToolSpec, context: &AgentContext) -> bool {
        match self.mode {
            PermissionMode::Disabled => true,
            PermissionMode::Strict => tool
                .required_permissions
                .iter()
                .all(|p| context.has_permission(p)),
            PermissionMode::Lenient => {
                tool.required_permissions.is_empty()
                    || tool
                        .required_permissions
                        .iter()
                        .any(|p| context.has_permission(p))
            }
        }
    }

    /// Returns the kept tools and how many were removed. Without a context,
    /// or when bypassed, nothing is removed.
    pub fn apply(
        &self,
        tools: Vec<RetrievedTool>,
        context: Option<&AgentContext>,
        bypass: bool,
    ) -> (Vec<RetrievedTool>, usize) {
        let context = match context {
            Some(context) if !bypass && self.mode != PermissionMode::Disabled => context,
            _ => return (tools, 0),
        };

        let before = tools.len();
        let kept: Vec<RetrievedTool> = tools
            .into_iter()
            .filter(|t| self.is_allowed(&t.tool, context))
            .collect();
        let removed = before - kept.len();
        (kept, removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolCategory;
    use rstest::rstest;

    fn retrieved(id: &str, permissions: &[&str]) -> RetrievedTool {
        RetrievedTool {
            tool: ToolSpec::new(id, id, id, ToolCategory::System)
                .with_permissions(permissions.iter().copied()),
            semantic_score: 0.0,
            keyword_score: 0.0,
            permission_score: 0.0,
            priority_score: 0.0,
            category_score: 0.0,
            relevance_score: 0.5,
            final_score: 0.5,
            match_reasons: vec![],
        }
    }

    fn pool() -> Vec<RetrievedTool> {
        vec![
            retrieved("free", &[]),
            retrieved("read", &["fs:read"]),
            retrieved("read_write", &["fs:read", "fs:write"]),
            retrieved("admin", &["admin"]),
        ]
    }

    fn kept_ids(tools: &[RetrievedTool]) -> Vec<&str> {
        tools.iter().map(|t| t.tool.id.as_str()).collect()
    }

    #[rstest]
    #[case(PermissionMode::Strict, vec!["free", "read"], 2)]
    #[case(PermissionMode::Lenient, vec!["free", "read", "read_write"], 1)]
    #[case(PermissionMode::Disabled, vec!["free", "read", "read_write", "admin"], 0)]
    fn test_modes(
        #[case] mode: PermissionMode,
        #[case] expected: Vec<&str>,
        #[case] expected_removed: usize,
    ) {
        let context = AgentContext::new("agent").with_permissions(["fs:read"]);
        let (kept, removed) = PermissionFilter::new(mode).apply(pool(), Some(&context), false);
        assert_eq!(kept_ids(&kept), expected);
        assert_eq!(removed, expected_removed);
    }

    #[test]
    fn test_no_context_means_no_filtering() {
        let (kept, removed) = PermissionFilter::new(PermissionMode::Strict).apply(pool(), None, false);
        assert_eq!(kept.len(), 4);
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_bypass() {
        let context = AgentContext::new("agent");
        let (kept, removed) =
            PermissionFilter::new(PermissionMode::Strict).apply(pool(), Some(&context), true);
        assert_eq!(kept.len(), 4);
        assert_eq!(removed, 0);
    }
}
