// Greedy count- and token-budget-constrained selection

use crate::types::RetrievedTool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetAllocator {
    pub max_tools: usize,
    pub max_token_budget: u32,
}

impl BudgetAllocator {
    pub fn new(max_tools: usize, max_token_budget: u32) -> Self {
        Self {
            max_tools,
            max_token_budget,
        }
    }

    /// `ranked` must already be sorted by descending score. A tool that does
    /// not fit the remaining budget is skipped, and later cheaper tools are
    /// still considered. Output keeps the input order.
    pub fn allocate(&self, ranked: Vec<RetrievedTool>) -> Vec<RetrievedTool> {
        let mut remaining = u64::from(self.max_token_budget);
        let mut selected = Vec::new();

        for tool in ranked {
            if selected.len() >= self.max_tools {
                break;
            }
            let cost = u64::from(tool.tool.token_cost);
            if cost > remaining {
                continue;
            }
            remaining -= cost;
            selected.push(tool);
        }

        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ToolCategory, ToolSpec};
    use proptest::prelude::*;

    fn ranked(costs: &[u32]) -> Vec<RetrievedTool> {
        costs
            .iter()
            .enumerate()
            .map(|(i, cost)| {
                let score = 1.0 - i as f64 * 0.01;
                RetrievedTool {
                    tool: ToolSpec::new(format!("t{}", i + 1), "t", "t", ToolCategory::Code)
                        .with_token_cost(*cost),
                    semantic_score: 0.0,
                    keyword_score: 0.0,
                    permission_score: 1.0,
                    priority_score: 0.5,
                    category_score: 0.0,
                    relevance_score: score,
                    final_score: score,
                    match_reasons: vec![],
                }
            })
            .collect()
    }

    fn ids(tools: &[RetrievedTool]) -> Vec<&str> {
        tools.iter().map(|t| t.tool.id.as_str()).collect()
    }

    #[test]
    fn test_expensive_second_tool_is_skipped() {
        let selected = BudgetAllocator::new(10, 120).allocate(ranked(&[100, 50, 30]));
        assert_eq!(ids(&selected), vec!["t1"]);
    }

    #[test]
    fn test_exact_fit_takes_all() {
        let selected = BudgetAllocator::new(10, 120).allocate(ranked(&[100, 15, 5]));
        assert_eq!(ids(&selected), vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn test_skip_then_keep_checking_gives_non_contiguous_selection() {
        let selected = BudgetAllocator::new(10, 120).allocate(ranked(&[100, 50, 20]));
        assert_eq!(ids(&selected), vec!["t1", "t3"]);
    }

    #[test]
    fn test_count_limit_stops_walk() {
        let selected = BudgetAllocator::new(2, 10_000).allocate(ranked(&[1, 1, 1]));
        assert_eq!(ids(&selected), vec!["t1", "t2"]);
    }

    #[test]
    fn test_zero_budget_keeps_only_free_tools() {
        let selected = BudgetAllocator::new(5, 0).allocate(ranked(&[0, 10, 0]));
        assert_eq!(ids(&selected), vec!["t1", "t3"]);
    }

    proptest! {
        #[test]
        fn prop_limits_are_respected(
            costs in proptest::collection::vec(0u32..500, 0..40),
            max_tools in 0usize..15,
            budget in 0u32..2000,
        ) {
            let selected = BudgetAllocator::new(max_tools, budget).allocate(ranked(&costs));
            let total: u64 = selected.iter().map(|t| u64::from(t.tool.token_cost)).sum();

            prop_assert!(selected.len() <= max_tools);
            prop_assert!(total <= u64::from(budget));
            prop_assert!(selected
                .windows(2)
                .all(|w| w[0].final_score >= w[1].final_score));
        }
    }
}
