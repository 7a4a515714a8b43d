// Multi-signal relevance scoring

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ScoringWeights;
use crate::embedding::EmbeddingCache;
use crate::error::{Result, RetrievalError};
use crate::types::{
    AgentContext, ParsedIntent, RelevanceFeedback, RetrievedTool, ToolCategory, ToolSpec,
};

pub const PRIORITIZED_BOOST: f64 = 1.5;
pub const PREFERRED_BOOST: f64 = 1.3;
const HISTORY_SUCCESS_WEIGHT: f64 = 0.2;
const HISTORY_HELPFUL_WEIGHT: f64 = 0.2;
const NEUTRAL_HELPFUL_RATE: f64 = 0.5;
const HIGH_SEMANTIC_THRESHOLD: f64 = 0.7;
const KEYWORD_REASON_THRESHOLD: f64 = 0.5;
const MAX_LISTED_MATCHES: usize = 3;

/// Inputs that stay fixed while every candidate of one call is scored
#[derive(Debug, Clone, Copy)]
pub struct ScoringRequest<'a> {
    pub intent: &'a ParsedIntent,
    pub context: Option<&'a AgentContext>,
    pub weights: &'a ScoringWeights,
    pub semantic_enabled: bool,
    pub prioritized_tool_ids: &'a [String],
    pub category_boosts: &'a HashMap<ToolCategory, f64>,
}

#[derive(Debug, Clone)]
pub struct Scorer {
    embeddings: Option<Arc<EmbeddingCache>>,
}

impl Scorer {
    pub fn new(embeddings: Option<Arc<EmbeddingCache>>) -> Self {
        Self { embeddings }
    }

    /// Score candidates one after another, in input order
    pub async fn score_all(
        &self,
        tools: Vec<ToolSpec>,
        request: &ScoringRequest<'_>,
    ) -> Result<Vec<RetrievedTool>> {
        let mut scored = Vec::with_capacity(tools.len());
        for tool in tools {
            scored.push(self.score(tool, request).await?);
        }
        Ok(scored)
    }

    pub async fn score(&self, tool: ToolSpec, request: &ScoringRequest<'_>) -> Result<RetrievedTool> {
        let semantic_score = self.semantic_score(&tool, request).await?;
        let (keyword_score, matched_keywords) = keyword_score(&tool, &request.intent.keywords);
        let permission_score = permission_score(&tool, request.context);
        let priority_score = priority_score(&tool);
        let category_score = category_score(&tool, request.intent, request.category_boosts);

        let weights = request.weights;
        let weighted = semantic_score * weights.semantic
            + keyword_score * weights.keyword
            + permission_score * weights.permission
            + priority_score * weights.priority
            + category_score * weights.category;

        let mut boosted = weighted;
        if request.prioritized_tool_ids.contains(&tool.id) {
            boosted *= PRIORITIZED_BOOST;
        }
        if let Some(context) = request.context {
            if context.preferences.preferred_tools.contains(&tool.id) {
                boosted *= PREFERRED_BOOST;
            }
            boosted *= history_boost(&tool.id, context);
        }

        let match_reasons = match_reasons(
            &tool,
            request.intent,
            semantic_score,
            keyword_score,
            &matched_keywords,
            permission_score,
        );

        Ok(RetrievedTool {
            tool,
            semantic_score,
            keyword_score,
            permission_score,
            priority_score,
            category_score,
            relevance_score: weighted.clamp(0.0, 1.0),
            final_score: boosted.clamp(0.0, 1.0),
            match_reasons,
        })
    }

    // Negative cosine values are kept; only the final score is clamped
    async fn semantic_score(&self, tool: &ToolSpec, request: &ScoringRequest<'_>) -> Result<f64> {
        if !request.semantic_enabled {
            return Ok(0.0);
        }
        match &self.embeddings {
            Some(cache) => cache
                .similarity(tool, &request.intent.normalized_query)
                .await
                .map_err(|source| RetrievalError::EmbeddingFailed { source }),
            None => Ok(0.0),
        }
    }
}

/// Keyword overlap between the tool's name, keywords and capabilities and the
/// query keywords. Returns the score and the query keywords that matched.
pub fn keyword_score(tool: &ToolSpec, query_keywords: &[String]) -> (f64, Vec<String>) {
    if query_keywords.is_empty() {
        return (0.0, Vec::new());
    }

    let tool_tokens: Vec<String> = tool
        .keywords
        .iter()
        .chain(tool.capabilities.iter())
        .chain(std::iter::once(&tool.name))
        .map(|t| t.to_lowercase())
        .collect();

    let mut matches = 0.0;
    let mut matched = Vec::new();
    for keyword in query_keywords {
        let keyword = keyword.to_lowercase();
        if tool_tokens.iter().any(|t| *t == keyword) {
            matches += 1.0;
            matched.push(keyword);
        } else if tool_tokens
            .iter()
            .any(|t| t.contains(keyword.as_str()) || keyword.contains(t.as_str()))
        {
            matches += 0.5;
            matched.push(keyword);
        }
    }

    let score = (matches / query_keywords.len() as f64).min(1.0);
    (score, matched)
}

pub fn permission_score(tool: &ToolSpec, context: Option<&AgentContext>) -> f64 {
    let context = match context {
        Some(context) if !tool.required_permissions.is_empty() => context,
        _ => return 1.0,
    };

    let granted = tool
        .required_permissions
        .iter()
        .filter(|p| context.has_permission(p))
        .count();
    granted as f64 / tool.required_permissions.len() as f64
}

pub fn priority_score(tool: &ToolSpec) -> f64 {
    f64::from(tool.priority) / 100.0
}

pub fn category_score(
    tool: &ToolSpec,
    intent: &ParsedIntent,
    category_boosts: &HashMap<ToolCategory, f64>,
) -> f64 {
    if !intent.relevant_categories.contains(&tool.category) {
        return 0.0;
    }
    let boost = category_boosts.get(&tool.category).copied().unwrap_or(1.0);
    boost.min(1.0)
}

/// Multiplier from the agent's past use of this tool; 1.0 without history
pub fn history_boost(tool_id: &str, context: &AgentContext) -> f64 {
    let records: Vec<_> = context
        .history
        .iter()
        .filter(|r| r.tool_id == tool_id)
        .collect();
    if records.is_empty() {
        return 1.0;
    }

    let successes = records.iter().filter(|r| r.success).count();
    let success_rate = successes as f64 / records.len() as f64;

    let with_feedback: Vec<_> = records.iter().filter_map(|r| r.feedback).collect();
    let helpful_rate = if with_feedback.is_empty() {
        NEUTRAL_HELPFUL_RATE
    } else {
        let helpful = with_feedback
            .iter()
            .filter(|f| **f == RelevanceFeedback::Helpful)
            .count();
        helpful as f64 / with_feedback.len() as f64
    };

    1.0 + HISTORY_SUCCESS_WEIGHT * success_rate + HISTORY_HELPFUL_WEIGHT * helpful_rate
}

fn match_reasons(
    tool: &ToolSpec,
    intent: &ParsedIntent,
    semantic_score: f64,
    keyword_score: f64,
    matched_keywords: &[String],
    permission_score: f64,
) -> Vec<String> {
    let mut reasons = Vec::new();

    if semantic_score > HIGH_SEMANTIC_THRESHOLD {
        reasons.push("High semantic similarity".to_string());
    }

    if keyword_score > KEYWORD_REASON_THRESHOLD && !matched_keywords.is_empty() {
        let listed: Vec<&str> = matched_keywords
            .iter()
            .take(MAX_LISTED_MATCHES)
            .map(String::as_str)
            .collect();
        reasons.push(format!("Keyword match: {}", listed.join(", ")));
    }

    if intent.relevant_categories.contains(&tool.category) {
        reasons.push(format!("Category match: {}", tool.category));
    }

    let matched_capabilities: Vec<&str> = tool
        .capabilities
        .iter()
        .filter(|c| {
            intent
                .required_capabilities
                .iter()
                .any(|r| r.eq_ignore_ascii_case(c))
        })
        .take(MAX_LISTED_MATCHES)
        .map(String::as_str)
        .collect();
    if !matched_capabilities.is_empty() {
        reasons.push(format!("Capabilities: {}", matched_capabilities.join(", ")));
    }

    if permission_score == 1.0 && !tool.required_permissions.is_empty() {
        reasons.push("Full permission match".to_string());
    }

    reasons
}
