pub mod analyzers;
pub mod classifier;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use sqlx::SqlitePool;

use classifier::BugClassifier;
use services::ai_fix::AiCodeFixer;
use services::git::GitIntegration;

/// Shared application state passed to all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: config::AppConfig,
    pub classifier: Arc<BugClassifier>,
    pub fixer: Arc<AiCodeFixer>,
    pub git: Arc<GitIntegration>,
    /// In-process toggle for AI fix generation, flipped by
    /// `/toggle-ai-suggestions`.
    pub ai_enabled: Arc<AtomicBool>,
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use crate::classifier::BugClassifier;
    use crate::config::AppConfig;
    use crate::services::ai_fix::AiCodeFixer;
    use crate::services::git::GitIntegration;
    use crate::{db, AppState};

    /// State over an in-memory store, with AI generation disabled so no test
    /// touches the network.
    pub(crate) async fn test_state() -> AppState {
        let pool = db::create_memory_pool().await.expect("memory pool");
        db::init_schema(&pool, "does/not/exist.sql")
            .await
            .expect("schema");
        AppState {
            db: pool,
            config: AppConfig::from_env(),
            classifier: Arc::new(BugClassifier::without_model()),
            fixer: Arc::new(AiCodeFixer::new(None, "gpt-4o")),
            git: Arc::new(GitIntegration::default()),
            ai_enabled: Arc::new(AtomicBool::new(false)),
        }
    }
}
