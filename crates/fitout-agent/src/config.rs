//! Agent configuration: tool server URLs, inference API, timeouts, sessions.

use serde::{Deserialize, Serialize};

/// Agent config. All values come from the environment in production
/// (`from_env`); serde defaults keep test construction terse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Firestore-backed data tool server endpoint.
    pub data_server_url: String,
    /// Estimate-email tool server endpoint.
    pub email_server_url: String,
    /// Chat completions endpoint (OpenAI-compatible). Empty disables the LLM
    /// router; the keyword fallback then handles every utterance.
    #[serde(default)]
    pub inference_url: String,
    /// Model id (e.g. `gpt-4o-mini`, `claude-3-5-sonnet`).
    #[serde(default = "default_model")]
    pub model: String,
    /// API key; if None, read from env by URL (`resolve_api_key`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Per-tool-call timeout, in seconds.
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    /// Overall per-message timeout, in seconds.
    #[serde(default = "default_handle_timeout_secs")]
    pub handle_timeout_secs: u64,
    /// Session inactivity TTL, in seconds.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    /// Soft cap on live sessions; oldest are evicted past this.
    #[serde(default = "default_session_soft_cap")]
    pub session_soft_cap: usize,
    /// Bounded limit for list-then-match document lookups.
    #[serde(default = "default_lookup_limit")]
    pub lookup_limit: u64,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_tool_timeout_secs() -> u64 {
    30
}

fn default_handle_timeout_secs() -> u64 {
    60
}

fn default_session_ttl_secs() -> u64 {
    86_400
}

fn default_session_soft_cap() -> usize {
    10_000
}

fn default_lookup_limit() -> u64 {
    1_000
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            data_server_url: String::new(),
            email_server_url: String::new(),
            inference_url: String::new(),
            model: default_model(),
            api_key: None,
            tool_timeout_secs: default_tool_timeout_secs(),
            handle_timeout_secs: default_handle_timeout_secs(),
            session_ttl_secs: default_session_ttl_secs(),
            session_soft_cap: default_session_soft_cap(),
            lookup_limit: default_lookup_limit(),
        }
    }
}

impl AgentConfig {
    /// Read config from `FITOUT_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_server_url: env_string("FITOUT_DATA_SERVER_URL")
                .unwrap_or(defaults.data_server_url),
            email_server_url: env_string("FITOUT_EMAIL_SERVER_URL")
                .unwrap_or(defaults.email_server_url),
            inference_url: env_string("FITOUT_INFERENCE_URL").unwrap_or(defaults.inference_url),
            model: env_string("FITOUT_MODEL").unwrap_or(defaults.model),
            api_key: env_string("FITOUT_API_KEY"),
            tool_timeout_secs: env_u64("FITOUT_TOOL_TIMEOUT_SECS")
                .unwrap_or(defaults.tool_timeout_secs),
            handle_timeout_secs: env_u64("FITOUT_HANDLE_TIMEOUT_SECS")
                .unwrap_or(defaults.handle_timeout_secs),
            session_ttl_secs: env_u64("FITOUT_SESSION_TTL_SECS")
                .unwrap_or(defaults.session_ttl_secs),
            session_soft_cap: env_u64("FITOUT_SESSION_SOFT_CAP")
                .map(|cap| cap as usize)
                .unwrap_or(defaults.session_soft_cap),
            lookup_limit: env_u64("FITOUT_LOOKUP_LIMIT").unwrap_or(defaults.lookup_limit),
        }
    }

    /// Resolve API key: config value, or env (OPENAI_API_KEY / ANTHROPIC_API_KEY)
    /// by URL. Local inference endpoints get no key; the proxy holds it.
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }
        if self.inference_url.contains("127.0.0.1") || self.inference_url.contains("localhost") {
            return None;
        }
        if self.inference_url.contains("anthropic") || self.inference_url.contains("claude") {
            return std::env::var("ANTHROPIC_API_KEY").ok();
        }
        std::env::var("OPENAI_API_KEY").ok()
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key).and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_operational_policy() {
        let config = AgentConfig::default();
        assert_eq!(config.tool_timeout_secs, 30);
        assert_eq!(config.handle_timeout_secs, 60);
        assert_eq!(config.session_ttl_secs, 86_400);
        assert_eq!(config.session_soft_cap, 10_000);
        assert_eq!(config.lookup_limit, 1_000);
    }

    #[test]
    fn explicit_api_key_wins() {
        let config = AgentConfig {
            api_key: Some("sk-test".to_string()),
            inference_url: "https://api.openai.com/v1/chat/completions".to_string(),
            ..AgentConfig::default()
        };
        assert_eq!(config.resolve_api_key().as_deref(), Some("sk-test"));
    }

    #[test]
    fn local_inference_url_sends_no_key() {
        let config = AgentConfig {
            inference_url: "http://127.0.0.1:4000/v1/chat/completions".to_string(),
            ..AgentConfig::default()
        };
        assert_eq!(config.resolve_api_key(), None);
    }
}
