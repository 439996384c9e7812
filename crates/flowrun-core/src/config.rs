use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};

/// Top-level flowrun configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gateway: Option<GatewayConfig>,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub email: Option<EmailConfig>,
    #[serde(default)]
    pub ai: AiConfig,
}

/// HTTP gateway settings.
///
/// With neither `token` nor `api_keys` set the gateway accepts anonymous
/// requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub api_keys: Vec<ApiKeyConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            token: None,
            api_keys: vec![],
        }
    }
}

impl GatewayConfig {
    /// Whether any credential is configured.
    pub fn auth_enabled(&self) -> bool {
        self.token.is_some() || !self.api_keys.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyConfig {
    pub name: String,
    pub key: String,
}

fn default_bind() -> String { "127.0.0.1:18790".to_string() }

/// Execution limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Deadline for a single outbound HTTP call, connect through body read.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    /// Deadline for a whole run; nodes still pending are cancelled.
    #[serde(default = "default_max_run")]
    pub max_run_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            max_run_secs: default_max_run(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_http_timeout() -> u64 { 10 }
fn default_max_run() -> u64 { 60 }
fn default_user_agent() -> String { format!("flowrun/{}", env!("CARGO_PKG_VERSION")) }

/// Transactional email provider used by `send_email` nodes.
///
/// When absent, `send_email` reports a mocked delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub api_key: String,
    #[serde(default = "default_email_from")]
    pub from: String,
    #[serde(default = "default_email_endpoint")]
    pub endpoint: String,
}

fn default_email_from() -> String { "Flowrun <noreply@flowrun.local>".to_string() }
fn default_email_endpoint() -> String { "https://api.resend.com/emails".to_string() }

/// Provider credentials for `ai_chat` nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default = "default_openai_url")]
    pub openai_base_url: String,
    #[serde(default = "default_anthropic_url")]
    pub anthropic_base_url: String,
    #[serde(default = "default_gemini_url")]
    pub gemini_base_url: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            anthropic_api_key: None,
            gemini_api_key: None,
            openai_base_url: default_openai_url(),
            anthropic_base_url: default_anthropic_url(),
            gemini_base_url: default_gemini_url(),
        }
    }
}

fn default_openai_url() -> String { "https://api.openai.com/v1".to_string() }
fn default_anthropic_url() -> String { "https://api.anthropic.com/v1".to_string() }
fn default_gemini_url() -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| FlowError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        toml::from_str(&expanded).map_err(|e| FlowError::Config(e.to_string()))
    }

    /// Build a config from well-known environment variables only.
    pub fn from_env() -> Self {
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let gateway = GatewayConfig {
            bind: env("FLOWRUN_BIND").unwrap_or_else(default_bind),
            token: env("FLOWRUN_TOKEN"),
            api_keys: vec![],
        };

        let email = env("RESEND_API_KEY").map(|api_key| EmailConfig {
            api_key,
            from: env("EMAIL_FROM").unwrap_or_else(default_email_from),
            endpoint: default_email_endpoint(),
        });

        Self {
            gateway: Some(gateway),
            engine: EngineConfig::default(),
            email,
            ai: AiConfig {
                openai_api_key: env("OPENAI_API_KEY"),
                anthropic_api_key: env("ANTHROPIC_API_KEY"),
                gemini_api_key: env("GEMINI_API_KEY")
                    .or_else(|| env("GOOGLE_GENERATIVE_AI_API_KEY")),
                ..AiConfig::default()
            },
        }
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Leave the reference as written if unset
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("TEST_FLOWRUN_VAR", "hello");
        let result = expand_env_vars("key = \"${TEST_FLOWRUN_VAR}\"");
        assert_eq!(result, "key = \"hello\"");
        std::env::remove_var("TEST_FLOWRUN_VAR");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("key = \"${NONEXISTENT_FLOWRUN_VAR}\"");
        assert_eq!(result, "key = \"${NONEXISTENT_FLOWRUN_VAR}\"");
    }

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.gateway.is_none());
        assert!(config.email.is_none());
        assert_eq!(config.engine.http_timeout_secs, 10);
        assert_eq!(config.engine.max_run_secs, 60);
        assert!(config.engine.user_agent.starts_with("flowrun/"));
        assert_eq!(config.ai.openai_base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_gateway_section() {
        let toml_str = r#"
[gateway]
token = "secret"

[[gateway.api_keys]]
name = "ci"
key = "fk_ci"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        let gw = config.gateway.unwrap();
        assert_eq!(gw.bind, "127.0.0.1:18790");
        assert_eq!(gw.token.as_deref(), Some("secret"));
        assert_eq!(gw.api_keys[0].name, "ci");
        assert!(gw.auth_enabled());
    }

    #[test]
    fn test_auth_disabled_by_default() {
        assert!(!GatewayConfig::default().auth_enabled());
    }

    #[test]
    fn test_email_section_defaults() {
        let toml_str = r#"
[email]
api_key = "re_123"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        let email = config.email.unwrap();
        assert_eq!(email.endpoint, "https://api.resend.com/emails");
        assert!(email.from.contains("noreply"));
    }
}
