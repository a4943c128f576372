//! Server configuration, loaded from environment variables at startup.

use anyhow::bail;
use collabrix_types::DirectorySource;

/// Runtime configuration for collabrix-server.
///
/// Every field but the token key has a default. `COLLABRIX_TOKEN_KEY` must be
/// set or startup fails; the completion API key has to be supplied for the
/// chatbot to answer.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:4000"`).
    pub bind_address: String,

    /// sqlx SQLite URL (default: `"sqlite://collabrix.db"`).
    pub database_url: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// HMAC secret used to sign and verify access tokens.
    pub token_key: String,

    /// Access token lifetime in seconds.
    pub token_ttl_secs: u64,

    /// Base URL of the OpenAI-compatible completion API.
    pub completion_base_url: String,

    /// Bearer key for the completion API.
    pub completion_api_key: String,

    /// Model identifier sent with each completion request.
    pub completion_model: String,

    /// Transport timeout for one completion call.
    pub completion_timeout_secs: u64,

    /// Which reference set the chatbot sees.
    pub directory_source: DirectorySource,

    /// Maximum entities folded into one snapshot; `0` means no cap.
    pub directory_limit: usize,

    /// Most recent turns included in a prompt; `0` keeps the whole transcript.
    pub history_window: usize,

    /// Comma-separated allowed origins; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI and the OpenAPI document.
    pub enable_swagger: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            bind_address: env_or("COLLABRIX_BIND", "0.0.0.0:4000"),
            database_url: env_or("COLLABRIX_DATABASE_URL", "sqlite://collabrix.db"),
            log_level: env_or("COLLABRIX_LOG", "info"),
            log_json: parse_bool("COLLABRIX_LOG_JSON", false),
            token_key: token_key(std::env::var("COLLABRIX_TOKEN_KEY").ok())?,
            token_ttl_secs: parse_env("COLLABRIX_TOKEN_TTL_SECS", 7 * 24 * 60 * 60),
            completion_base_url: env_or(
                "COLLABRIX_COMPLETION_BASE_URL",
                "https://openrouter.ai/api/v1",
            ),
            completion_api_key: env_or("COLLABRIX_COMPLETION_API_KEY", ""),
            completion_model: env_or(
                "COLLABRIX_COMPLETION_MODEL",
                "deepseek/deepseek-r1-distill-qwen-32b",
            ),
            completion_timeout_secs: parse_env("COLLABRIX_COMPLETION_TIMEOUT_SECS", 120),
            directory_source: parse_env("COLLABRIX_DIRECTORY_SOURCE", DirectorySource::Users),
            directory_limit: parse_env("COLLABRIX_DIRECTORY_LIMIT", 500),
            history_window: parse_env("COLLABRIX_HISTORY_WINDOW", 50),
            cors_allowed_origins: std::env::var("COLLABRIX_CORS_ORIGINS").ok(),
            enable_swagger: parse_bool("COLLABRIX_ENABLE_SWAGGER", true),
        })
    }
}

#[cfg(test)]
impl Config {
    /// In-memory database, unreachable completion endpoint.
    pub(crate) fn for_tests() -> Self {
        Self {
            bind_address: "127.0.0.1:0".to_owned(),
            database_url: "sqlite::memory:".to_owned(),
            log_level: "info".to_owned(),
            log_json: false,
            token_key: "test-secret".to_owned(),
            token_ttl_secs: 3600,
            completion_base_url: "http://127.0.0.1:9".to_owned(),
            completion_api_key: String::new(),
            completion_model: "test-model".to_owned(),
            completion_timeout_secs: 5,
            directory_source: DirectorySource::Users,
            directory_limit: 500,
            history_window: 50,
            cors_allowed_origins: None,
            enable_swagger: false,
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

/// Required; there is no built-in signing key.
fn token_key(raw: Option<String>) -> anyhow::Result<String> {
    match raw.map(|k| k.trim().to_owned()) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => bail!("COLLABRIX_TOKEN_KEY must be set"),
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}
