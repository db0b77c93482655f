use std::env;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:2024";
pub const DEFAULT_ASSISTANT_ID: &str = "Deep Researcher";

/// Connection settings for the remote agent runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub api_url: String,
    pub assistant_id: String,
    pub api_key: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            api_url: DEFAULT_API_URL.to_string(),
            assistant_id: DEFAULT_ASSISTANT_ID.to_string(),
            api_key: None,
        }
    }
}

impl RuntimeConfig {
    /// Build a config from environment variables, falling back to the local
    /// development defaults.
    pub fn from_env() -> Self {
        RuntimeConfig {
            api_url: env::var("LANGGRAPH_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            assistant_id: env::var("LANGGRAPH_ASSISTANT_ID")
                .unwrap_or_else(|_| DEFAULT_ASSISTANT_ID.to_string()),
            api_key: env::var("LANGGRAPH_API_KEY").ok(),
        }
    }

    /// API keys are for hosted deployments; local servers reject unexpected
    /// auth headers, so keys are suppressed for localhost endpoints.
    pub fn effective_api_key(&self) -> Option<&str> {
        if self.api_url.contains("127.0.0.1") || self.api_url.contains("localhost") {
            None
        } else {
            self.api_key.as_deref()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_suppressed_for_localhost() {
        let config = RuntimeConfig {
            api_url: "http://127.0.0.1:2024".to_string(),
            api_key: Some("secret".to_string()),
            ..RuntimeConfig::default()
        };
        assert_eq!(config.effective_api_key(), None);

        let config = RuntimeConfig {
            api_url: "http://localhost:8123".to_string(),
            api_key: Some("secret".to_string()),
            ..RuntimeConfig::default()
        };
        assert_eq!(config.effective_api_key(), None);
    }

    #[test]
    fn test_api_key_kept_for_hosted_endpoints() {
        let config = RuntimeConfig {
            api_url: "https://agents.example.com".to_string(),
            api_key: Some("secret".to_string()),
            ..RuntimeConfig::default()
        };
        assert_eq!(config.effective_api_key(), Some("secret"));
    }
}
