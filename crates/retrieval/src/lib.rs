//! Just-in-time tool retrieval.
//!
//! Given a natural-language request and an optional agent context, the
//! [`JitToolRetriever`] picks a small, relevant, permission-compatible and
//! token-budget-bounded subset of the tools held by a [`ToolRegistry`]:
//!
//! 1. intent analysis ([`IntentAnalyzer`])
//! 2. candidate selection by category and capability
//! 3. multi-signal scoring (semantic, keyword, permission, priority, category)
//! 4. permission and relevance-threshold filtering
//! 5. greedy allocation under count and token limits
//!
//! Results are cached per query and agent for a configurable TTL.

pub mod budget;
pub mod cache;
pub mod config;
pub mod embedding;
pub mod error;
pub mod events;
pub mod intent;
pub mod logging;
pub mod permissions;
pub mod registry;
pub mod retriever;
pub mod scoring;
pub mod selection;
pub mod types;

pub use budget::BudgetAllocator;
pub use cache::{CacheStats, ResultCache};
pub use config::{JitToolConfig, JitToolConfigPatch, PermissionMode, ScoringWeights};
pub use embedding::{cosine_similarity, EmbeddingCache, EmbeddingProvider, HashEmbeddingProvider};
pub use error::{Result, RetrievalError};
pub use events::{BroadcastObserver, RetrievalEvent, RetrievalObserver, TracingObserver};
pub use intent::{IntentAnalyzer, KeywordIntentAnalyzer};
pub use logging::{init_logging, LoggingConfig};
pub use permissions::PermissionFilter;
pub use registry::{InMemoryToolRegistry, ToolRegistry, ToolSearchQuery};
pub use retriever::JitToolRetriever;
pub use scoring::{Scorer, ScoringRequest};
pub use selection::CandidateSelector;
pub use types::{
    AgentContext, AgentPreferences, ParsedIntent, RelevanceFeedback, RetrievalMetadata,
    RetrievalOptions, RetrievedTool, TaskContext, ToolCategory, ToolRetrievalResult, ToolSpec,
    ToolUsageRecord,
};
