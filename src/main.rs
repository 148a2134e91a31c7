use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use bugtrackd::classifier::BugClassifier;
use bugtrackd::config::AppConfig;
use bugtrackd::services::ai_fix::AiCodeFixer;
use bugtrackd::services::git::GitIntegration;
use bugtrackd::{db, routes, AppState};
use mimalloc::MiMalloc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bugtrackd=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = AppConfig::from_env();

    if let Some(parent) = Path::new(&config.database_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir_all(&config.upload_dir)?;

    db::check_schema_drift(&config.database_path).await?;
    let pool = db::create_pool(&config.database_path).await?;
    db::init_schema(&pool, &config.schema_fixes_path).await?;

    let classifier = BugClassifier::load_or_train(Path::new(&config.classifier_model_path));
    let fixer = AiCodeFixer::new(config.openai_api_key.clone(), config.openai_model.clone());
    let ai_enabled = Arc::new(AtomicBool::new(config.ai_suggestions_enabled));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!(host = %addr, "Starting bugtrackd API server");

    let state = AppState {
        db: pool,
        config,
        classifier: Arc::new(classifier),
        fixer: Arc::new(fixer),
        git: Arc::new(GitIntegration::default()),
        ai_enabled,
    };

    let app = routes::router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
