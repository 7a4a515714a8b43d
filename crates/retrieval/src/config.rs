// Engine configuration: defaults, partial updates and environment overlay

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::error::{Result, RetrievalError};
use crate::types::ToolCategory;

/// How strictly required permissions are enforced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionMode {
    Disabled,
    Lenient,
    Strict,
}

impl Default for PermissionMode {
    fn default() -> Self {
        Self::Strict
    }
}

impl FromStr for PermissionMode {
    type Err = RetrievalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "disabled" | "off" | "none" => Ok(Self::Disabled),
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            other => Err(RetrievalError::Configuration {
                message: format!("unknown permission mode '{}'", other),
            }),
        }
    }
}

/// Weights of the five scoring signals. They need not sum to 1; the final
/// score is clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringWeights {
    pub semantic: f64,
    pub keyword: f64,
    pub permission: f64,
    pub priority: f64,
    pub category: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            semantic: 0.35,
            keyword: 0.25,
            permission: 0.15,
            priority: 0.10,
            category: 0.15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JitToolConfig {
    /// Maximum number of tools returned
    pub max_tools: usize,

    /// Maximum cumulative token cost of the returned set
    pub max_token_budget: u32,

    /// Tools scoring below this are dropped before budget allocation
    pub min_relevance_score: f64,

    pub enable_semantic_search: bool,

    pub enable_caching: bool,

    pub cache_ttl_ms: u64,

    pub permission_mode: PermissionMode,

    pub included_categories: Vec<ToolCategory>,

    pub excluded_categories: Vec<ToolCategory>,

    pub scoring_weights: ScoringWeights,
}

impl Default for JitToolConfig {
    fn default() -> Self {
        Self {
            max_tools: 10,
            max_token_budget: 8000,
            min_relevance_score: 0.3,
            enable_semantic_search: true,
            enable_caching: true,
            cache_ttl_ms: 5 * 60 * 1000,
            permission_mode: PermissionMode::default(),
            included_categories: Vec::new(),
            excluded_categories: Vec::new(),
            scoring_weights: ScoringWeights::default(),
        }
    }
}

/// Partial configuration merged over the current one by `update_config`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JitToolConfigPatch {
    pub max_tools: Option<usize>,
    pub max_token_budget: Option<u32>,
    pub min_relevance_score: Option<f64>,
    pub enable_semantic_search: Option<bool>,
    pub enable_caching: Option<bool>,
    pub cache_ttl_ms: Option<u64>,
    pub permission_mode: Option<PermissionMode>,
    pub included_categories: Option<Vec<ToolCategory>>,
    pub excluded_categories: Option<Vec<ToolCategory>>,
    pub scoring_weights: Option<ScoringWeights>,
}

impl JitToolConfig {
    /// Parse a (possibly partial) JSON document; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RetrievalError::Configuration {
            message: format!("invalid config JSON: {}", e),
        })
    }

    /// Load defaults overlaid with `JIT_*` environment variables.
    ///
    /// Recognized variables: `JIT_MAX_TOOLS`, `JIT_MAX_TOKEN_BUDGET`,
    /// `JIT_MIN_RELEVANCE_SCORE`, `JIT_ENABLE_SEMANTIC_SEARCH`,
    /// `JIT_ENABLE_CACHING`, `JIT_CACHE_TTL_MS`, `JIT_PERMISSION_MODE`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = env_parse::<usize>("JIT_MAX_TOOLS")? {
            config.max_tools = v;
        }
        if let Some(v) = env_parse::<u32>("JIT_MAX_TOKEN_BUDGET")? {
            config.max_token_budget = v;
        }
        if let Some(v) = env_parse::<f64>("JIT_MIN_RELEVANCE_SCORE")? {
            config.min_relevance_score = v;
        }
        if let Some(v) = env_parse::<bool>("JIT_ENABLE_SEMANTIC_SEARCH")? {
            config.enable_semantic_search = v;
        }
        if let Some(v) = env_parse::<bool>("JIT_ENABLE_CACHING")? {
            config.enable_caching = v;
        }
        if let Some(v) = env_parse::<u64>("JIT_CACHE_TTL_MS")? {
            config.cache_ttl_ms = v;
        }
        if let Ok(mode) = env::var("JIT_PERMISSION_MODE") {
            config.permission_mode = mode.parse()?;
        }

        Ok(config)
    }

    /// Merge a partial update over this configuration
    pub fn apply(&mut self, patch: JitToolConfigPatch) {
        if let Some(v) = patch.max_tools {
            self.max_tools = v;
        }
        if let Some(v) = patch.max_token_budget {
            self.max_token_budget = v;
        }
        if let Some(v) = patch.min_relevance_score {
            self.min_relevance_score = v;
        }
        if let Some(v) = patch.enable_semantic_search {
            self.enable_semantic_search = v;
        }
        if let Some(v) = patch.enable_caching {
            self.enable_caching = v;
        }
        if let Some(v) = patch.cache_ttl_ms {
            self.cache_ttl_ms = v;
        }
        if let Some(v) = patch.permission_mode {
            self.permission_mode = v;
        }
        if let Some(v) = patch.included_categories {
            self.included_categories = v;
        }
        if let Some(v) = patch.excluded_categories {
            self.excluded_categories = v;
        }
        if let Some(v) = patch.scoring_weights {
            self.scoring_weights = v;
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| RetrievalError::Configuration {
                message: format!("{} has invalid value '{}'", key, raw),
            }),
        Err(_) => Ok(None),
    }
}
