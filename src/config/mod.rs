use std::env;

/// Application configuration loaded from environment variables.
///
/// Every variable has a default so the service boots with no configuration;
/// the AI key is optional by design and gates fix generation rather than
/// startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub upload_dir: String,
    pub max_upload_bytes: usize,
    pub schema_fixes_path: String,
    pub classifier_model_path: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub ai_suggestions_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            host: env::var("BUGTRACKD_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("BUGTRACKD_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            database_path: env::var("BUGTRACKD_DATABASE")
                .unwrap_or_else(|_| "data/bug_tracker.db".to_string()),
            upload_dir: env::var("BUGTRACKD_UPLOAD_DIR")
                .unwrap_or_else(|_| "uploads".to_string()),
            max_upload_bytes: env::var("BUGTRACKD_MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| (16 * 1024 * 1024).to_string())
                .parse()
                .unwrap_or(16 * 1024 * 1024),
            schema_fixes_path: env::var("BUGTRACKD_SCHEMA_FIXES")
                .unwrap_or_else(|_| "db/fixes.sql".to_string()),
            classifier_model_path: env::var("BUGTRACKD_CLASSIFIER_MODEL")
                .unwrap_or_else(|_| "data/bug_classifier.json".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            ai_suggestions_enabled: env::var("BUGTRACKD_AI_SUGGESTIONS")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_env() {
        // Env vars are process-global; only assert on keys the test suite
        // never sets.
        let config = AppConfig::from_env();
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_upload_bytes, 16 * 1024 * 1024);
        assert!(config.ai_suggestions_enabled);
        assert_eq!(config.openai_model, "gpt-4o");
    }
}
