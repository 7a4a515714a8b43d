// TTL cache of retrieval results

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use crate::types::{AgentContext, RetrievalOptions, ToolRetrievalResult};

/// Size above which a write triggers a sweep of expired entries
pub const SWEEP_THRESHOLD: usize = 1000;

const NO_CONTEXT: &str = "no-context";

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: ToolRetrievalResult,
    pub created_at: Instant,
    pub key: String,
}

impl CacheEntry {
    // Fresh strictly within the TTL, so a zero TTL never serves
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() < ttl
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
    /// Bumped by every `clear`
    generation: u64,
}

/// Process-local result cache shared by concurrent retrievals.
/// Concurrent writes of one key are last-writer-wins.
#[derive(Debug, Default)]
pub struct ResultCache {
    state: RwLock<CacheState>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowercased, trimmed query plus a fingerprint of the agent context.
    /// Calls carrying per-call overrides get their options appended.
    pub fn key(query: &str, context: Option<&AgentContext>, options: &RetrievalOptions) -> String {
        let context_part = match context {
            Some(context) => format!(
                "{}:{}:{}",
                context.agent_id,
                // BTreeSet iterates sorted
                context
                    .permissions
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
                context
                    .task_context
                    .as_ref()
                    .map(|t| t.task_type.as_str())
                    .unwrap_or("none")
            ),
            None => NO_CONTEXT.to_string(),
        };

        let mut key = format!("{}|{}", query.trim().to_lowercase(), context_part);
        if !options.is_default() {
            key.push('|');
            key.push_str(&options.fingerprint());
        }
        key
    }

    /// Returns a fresh entry marked as a cache hit; evicts it if expired
    pub async fn get(&self, key: &str, ttl: Duration) -> Option<ToolRetrievalResult> {
        let mut state = self.state.write().await;

        let fresh = match state.entries.get(key).map(|entry| entry.is_fresh(ttl)) {
            Some(true) => state.entries.get(key).map(|entry| {
                let mut result = entry.result.clone();
                result.metadata.cache_hit = true;
                result
            }),
            Some(false) => {
                debug!(key, "evicting expired cache entry");
                state.entries.remove(key);
                None
            }
            None => None,
        };

        if fresh.is_some() {
            state.hits += 1;
        } else {
            state.misses += 1;
        }
        fresh
    }

    /// Current invalidation generation. Read it before computing a result and
    /// hand it back to `put`.
    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    /// Store a result computed under `generation`. Returns false, storing
    /// nothing, when the cache was cleared since then.
    pub async fn put(
        &self,
        key: String,
        result: ToolRetrievalResult,
        ttl: Duration,
        generation: u64,
    ) -> bool {
        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!(key = %key, "discarding result computed before cache invalidation");
            return false;
        }
        state.entries.insert(
            key.clone(),
            CacheEntry {
                result,
                created_at: Instant::now(),
                key,
            },
        );

        if state.entries.len() > SWEEP_THRESHOLD {
            let before = state.entries.len();
            state.entries.retain(|_, entry| entry.is_fresh(ttl));
            debug!(
                evicted = before - state.entries.len(),
                remaining = state.entries.len(),
                "swept expired cache entries"
            );
        }
        true
    }

    /// Drop every entry and invalidate results still being computed
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.entries.clear();
        state.generation += 1;
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        CacheStats {
            entries: state.entries.len(),
            hits: state.hits,
            misses: state.misses,
        }
    }
}
