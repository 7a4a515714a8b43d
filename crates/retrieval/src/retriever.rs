// JIT tool retriever: orchestrates selection, scoring, filtering and budgeting

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};

use crate::budget::BudgetAllocator;
use crate::cache::{CacheStats, ResultCache};
use crate::config::{JitToolConfig, JitToolConfigPatch};
use crate::embedding::{EmbeddingCache, EmbeddingProvider, HashEmbeddingProvider};
use crate::error::{Result, RetrievalError};
use crate::events::{RetrievalEvent, RetrievalObserver};
use crate::intent::IntentAnalyzer;
use crate::permissions::PermissionFilter;
use crate::registry::ToolRegistry;
use crate::scoring::{Scorer, ScoringRequest};
use crate::selection::CandidateSelector;
use crate::types::{
    AgentContext, RelevanceFeedback, RetrievalMetadata, RetrievalOptions, RetrievedTool,
    ToolCategory, ToolRetrievalResult,
};

/// Boost injected by `retrieve_by_categories` for the requested categories
pub const CATEGORY_BOOST: f64 = 2.0;

/// History entries considered by `get_recommendations`
pub const RECOMMENDATION_HISTORY: usize = 10;

/// Selects a relevant, budget-constrained tool subset for a query
pub struct JitToolRetriever {
    config: RwLock<JitToolConfig>,
    selector: CandidateSelector,
    intent_analyzer: Arc<dyn IntentAnalyzer>,
    embeddings: Arc<EmbeddingCache>,
    scorer: Scorer,
    cache: ResultCache,
    observers: Vec<Arc<dyn RetrievalObserver>>,
}

impl std::fmt::Debug for JitToolRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JitToolRetriever")
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl JitToolRetriever {
    /// Retriever with default configuration and the hash embedding provider
    pub fn new(registry: Arc<dyn ToolRegistry>, intent_analyzer: Arc<dyn IntentAnalyzer>) -> Self {
        Self::with_config(registry, intent_analyzer, JitToolConfig::default())
    }

    pub fn with_config(
        registry: Arc<dyn ToolRegistry>,
        intent_analyzer: Arc<dyn IntentAnalyzer>,
        config: JitToolConfig,
    ) -> Self {
        let embeddings = Arc::new(EmbeddingCache::new(Arc::new(
            HashEmbeddingProvider::default(),
        )));

        Self {
            config: RwLock::new(config),
            selector: CandidateSelector::new(registry),
            intent_analyzer,
            scorer: Scorer::new(Some(Arc::clone(&embeddings))),
            embeddings,
            cache: ResultCache::new(),
            observers: Vec::new(),
        }
    }

    /// Replace the embedding provider; memoized vectors start empty
    pub fn with_embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embeddings = Arc::new(EmbeddingCache::new(provider));
        self.scorer = Scorer::new(Some(Arc::clone(&self.embeddings)));
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RetrievalObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Full pipeline: cache, intent, candidates, scoring, permissions,
    /// score threshold, budget.
    pub async fn retrieve(
        &self,
        query: &str,
        context: Option<&AgentContext>,
        options: RetrievalOptions,
    ) -> Result<ToolRetrievalResult> {
        self.retrieve_with(query, context, options, &[]).await
    }

    /// `categories` are added to whatever the analyzer finds in the query
    #[instrument(
        name = "retrieve",
        skip(self, context, options, categories),
        fields(query_len = query.len())
    )]
    async fn retrieve_with(
        &self,
        query: &str,
        context: Option<&AgentContext>,
        options: RetrievalOptions,
        categories: &[ToolCategory],
    ) -> Result<ToolRetrievalResult> {
        self.emit(RetrievalEvent::Started {
            query: query.to_string(),
        });

        match self.run_pipeline(query, context, &options, categories).await {
            Ok(result) => {
                info!(
                    tools = result.tools.len(),
                    candidates = result.total_candidates,
                    token_cost = result.total_token_cost,
                    duration_ms = result.retrieval_time_ms,
                    cache_hit = result.metadata.cache_hit,
                    "tool retrieval completed"
                );
                self.emit(RetrievalEvent::Completed {
                    result: Box::new(result.clone()),
                });
                Ok(result)
            }
            Err(e) => {
                error!(error = %e, "tool retrieval failed");
                self.emit(RetrievalEvent::Error {
                    query: query.to_string(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Retrieve tools offering the given capabilities
    pub async fn retrieve_by_capabilities(
        &self,
        capabilities: &[String],
        context: Option<&AgentContext>,
        options: RetrievalOptions,
    ) -> Result<ToolRetrievalResult> {
        let query = format!("tools that can {}", capabilities.join(", "));
        self.retrieve(&query, context, options).await
    }

    /// Retrieve tools from the given categories, boosting their category score
    pub async fn retrieve_by_categories(
        &self,
        categories: &[ToolCategory],
        context: Option<&AgentContext>,
        mut options: RetrievalOptions,
    ) -> Result<ToolRetrievalResult> {
        for category in categories {
            options
                .category_boosts
                .insert(category.clone(), CATEGORY_BOOST);
        }
        let names: Vec<&str> = categories.iter().map(ToolCategory::as_str).collect();
        let query = format!("{} tools", names.join(" "));
        self.retrieve_with(&query, context, options, categories).await
    }

    /// Recommend tools from the agent's recent successful usage and preferences
    pub async fn get_recommendations(
        &self,
        context: &AgentContext,
        mut options: RetrievalOptions,
    ) -> Result<ToolRetrievalResult> {
        let mut terms: Vec<&str> = Vec::new();
        for record in context
            .history
            .iter()
            .rev()
            .filter(|r| r.success && r.feedback != Some(RelevanceFeedback::NotHelpful))
            .take(RECOMMENDATION_HISTORY)
        {
            if !terms.contains(&record.tool_id.as_str()) {
                terms.push(&record.tool_id);
            }
        }
        terms.extend(
            context
                .preferences
                .preferred_categories
                .iter()
                .map(ToolCategory::as_str),
        );

        let query = if terms.is_empty() {
            "general tools".to_string()
        } else {
            format!("tools similar to {}", terms.join(" "))
        };
        debug!(%query, "built recommendation query");

        options
            .prioritized_tool_ids
            .extend(context.preferences.preferred_tools.iter().cloned());
        options
            .excluded_tool_ids
            .extend(context.preferences.excluded_tools.iter().cloned());

        self.retrieve(&query, Some(context), options).await
    }

    /// Merge a partial configuration; cached rankings are discarded
    pub async fn update_config(&self, patch: JitToolConfigPatch) {
        self.config.write().await.apply(patch);
        self.cache.clear().await;
        info!("retriever configuration updated, cache cleared");
    }

    pub async fn get_config(&self) -> JitToolConfig {
        self.config.read().await.clone()
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    fn emit(&self, event: RetrievalEvent) {
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }

    async fn run_pipeline(
        &self,
        query: &str,
        context: Option<&AgentContext>,
        options: &RetrievalOptions,
        categories: &[ToolCategory],
    ) -> Result<ToolRetrievalResult> {
        let start = Instant::now();
        // Generation first: a clear landing after this point rejects our put
        let generation = self.cache.generation().await;
        // Snapshot so a concurrent update_config cannot change settings mid-call
        let config = self.config.read().await.clone();
        let ttl = Duration::from_millis(config.cache_ttl_ms);

        let cache_key = config
            .enable_caching
            .then(|| ResultCache::key(query, context, options));
        if let Some(key) = &cache_key {
            if let Some(hit) = self.cache.get(key, ttl).await {
                self.emit(RetrievalEvent::CacheHit {
                    query: query.to_string(),
                });
                return Ok(hit);
            }
            self.emit(RetrievalEvent::CacheMiss {
                query: query.to_string(),
            });
        }

        let mut intent = match context.and_then(|c| c.task_context.as_ref()) {
            Some(task) => {
                self.intent_analyzer
                    .analyze_with_task_context(query, task)
                    .await
            }
            None => self.intent_analyzer.analyze(query, context).await,
        }
        .map_err(|source| RetrievalError::IntentAnalysisFailed { source })?;
        for category in categories {
            if !intent.relevant_categories.contains(category) {
                intent.relevant_categories.push(category.clone());
            }
        }
        debug!(
            keywords = ?intent.keywords,
            categories = ?intent.relevant_categories,
            capabilities = ?intent.required_capabilities,
            "parsed intent"
        );

        let candidates = self.selector.select(&intent, &config, options).await?;
        let total_candidates = candidates.len();

        let request = ScoringRequest {
            intent: &intent,
            context,
            weights: &config.scoring_weights,
            semantic_enabled: config.enable_semantic_search,
            prioritized_tool_ids: &options.prioritized_tool_ids,
            category_boosts: &options.category_boosts,
        };
        let scored = self.scorer.score_all(candidates, &request).await?;

        let (permitted, filtered_by_permissions) = PermissionFilter::new(config.permission_mode)
            .apply(scored, context, options.bypass_permissions);

        let min_score = options
            .min_relevance_score
            .unwrap_or(config.min_relevance_score);
        let before_threshold = permitted.len();
        let mut ranked: Vec<RetrievedTool> = permitted
            .into_iter()
            .filter(|t| t.final_score >= min_score)
            .collect();
        let filtered_by_score = before_threshold - ranked.len();

        // Ties broken by id to keep results deterministic
        ranked.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.tool.id.cmp(&b.tool.id))
        });

        let allocator = BudgetAllocator::new(
            options.max_tools.unwrap_or(config.max_tools),
            options.max_token_budget.unwrap_or(config.max_token_budget),
        );
        let tools = allocator.allocate(ranked);
        let total_token_cost = tools.iter().map(|t| u64::from(t.tool.token_cost)).sum();

        debug!(
            candidates = total_candidates,
            filtered_by_permissions,
            filtered_by_score,
            selected = tools.len(),
            "pipeline finished"
        );

        let result = ToolRetrievalResult {
            tools,
            total_candidates,
            query: query.to_string(),
            retrieval_time_ms: start.elapsed().as_millis() as u64,
            total_token_cost,
            metadata: RetrievalMetadata {
                candidates_scanned: total_candidates,
                filtered_by_permissions,
                filtered_by_score,
                semantic_search_used: config.enable_semantic_search,
                cache_hit: false,
            },
        };

        if let Some(key) = cache_key {
            self.cache.put(key, result.clone(), ttl, generation).await;
        }

        Ok(result)
    }

    /// Number of memoized (tool, query) embeddings
    pub async fn embedding_cache_size(&self) -> (usize, usize) {
        self.embeddings.len().await
    }
}
