//! End-to-end pipeline test over an in-memory store.
//!
//! The JavaScript analyzer is used throughout because it shells out to no
//! external binaries, keeping the full analyze → classify → persist →
//! export flow deterministic on any machine.

use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use bugtrackd::analyzers::Language;
use bugtrackd::classifier::BugClassifier;
use bugtrackd::config::AppConfig;
use bugtrackd::models::bug::{BugStatus, Severity};
use bugtrackd::services::ai_fix::{AiCodeFixer, FixSuggestion};
use bugtrackd::services::analysis;
use bugtrackd::services::bug::{self, BugFilters, UpdateBugRequest};
use bugtrackd::services::dashboard;
use bugtrackd::services::export;
use bugtrackd::services::git::GitIntegration;
use bugtrackd::{db, AppState};

async fn test_state() -> AppState {
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
        // Disabled: no test may touch the network.
        ai_enabled: Arc::new(AtomicBool::new(false)),
    }
}

fn sample_js_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".js").tempfile().unwrap();
    writeln!(file, "const counter = 1;").unwrap();
    writeln!(file, "console.log('debug output');").unwrap();
    writeln!(file, "eval(userInput);").unwrap();
    file
}

#[tokio::test]
async fn full_pipeline_persists_classified_bugs() {
    let state = test_state().await;
    let file = sample_js_file();

    let bug_ids = analysis::run_pipeline(&state, file.path(), "app.js", Language::JavaScript)
        .await
        .expect("pipeline");
    assert!(!bug_ids.is_empty());

    let bugs = bug::bugs_for_file(&state.db, "app.js").await.unwrap();
    assert_eq!(bugs.len(), bug_ids.len());
    for bug in &bugs {
        assert_eq!(bug.bug.language, "javascript");
        assert_eq!(bug.bug.status, BugStatus::Open);
        assert!(!bug.bug.kind.is_empty());
        // Classification is total: every bug carries one of the four tiers.
        assert!(Severity::ALL.contains(&bug.bug.severity));
    }
    assert!(bugs.iter().any(|b| b.bug.kind == "no-console"));
    assert!(bugs.iter().any(|b| b.bug.kind == "no-eval"));
}

#[tokio::test]
async fn workflow_updates_are_audited() {
    let state = test_state().await;
    let file = sample_js_file();
    let bug_ids = analysis::run_pipeline(&state, file.path(), "app.js", Language::JavaScript)
        .await
        .unwrap();
    let id = bug_ids[0];
    let actor = bug::current_user(&state.db).await.unwrap();

    let request = UpdateBugRequest {
        status: Some(BugStatus::InProgress),
        assigned_to: Some(actor.id.to_string()),
        severity: Some(Severity::Critical),
    };
    let updated = bug::update(&state.db, id, &request, &actor).await.unwrap();
    assert_eq!(updated.status, BugStatus::InProgress);
    assert_eq!(updated.assigned_to, Some(actor.id));

    let history = bug::get_history(&state.db, id).await.unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|h| h.username.as_deref() == Some("admin")));
}

#[tokio::test]
async fn deleting_a_bug_leaves_no_orphans() {
    let state = test_state().await;
    let file = sample_js_file();
    let bug_ids = analysis::run_pipeline(&state, file.path(), "app.js", Language::JavaScript)
        .await
        .unwrap();
    let id = bug_ids[0];
    let actor = bug::current_user(&state.db).await.unwrap();

    // One of each dependent row.
    bug::add_comment(&state.db, id, &actor, "triaging").await.unwrap();
    bug::add_tag(&state.db, id, 1, &actor).await.unwrap();
    bug::insert_fix(
        &state.db,
        id,
        "javascript",
        &FixSuggestion {
            suggestion: "Remove the console statement.".to_string(),
            code_example: String::new(),
        },
    )
    .await
    .unwrap();

    bug::delete(&state.db, id).await.unwrap();

    for table in ["bug_comments", "bug_history", "bug_tags", "suggested_fixes"] {
        let orphans: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE bug_id = ?"))
                .bind(id)
                .fetch_one(&state.db)
                .await
                .unwrap();
        assert_eq!(orphans, 0, "orphan rows left in {table}");
    }

    // The remaining bugs from the same file are untouched.
    let remaining = bug::bugs_for_file(&state.db, "app.js").await.unwrap();
    assert_eq!(remaining.len(), bug_ids.len() - 1);
}

#[tokio::test]
async fn export_formats_agree_on_row_count() {
    let state = test_state().await;
    let file = sample_js_file();
    analysis::run_pipeline(&state, file.path(), "app.js", Language::JavaScript)
        .await
        .unwrap();

    let rows = export::export_rows(&state.db).await.unwrap();
    assert!(!rows.is_empty());

    let json = serde_json::to_value(&rows).unwrap();
    let csv_text = export::to_csv(&rows).unwrap();
    let csv_records = csv_text.lines().count() - 1; // minus header
    assert_eq!(csv_records, json.as_array().unwrap().len());
}

#[tokio::test]
async fn dashboard_reflects_ingested_bugs() {
    let state = test_state().await;
    let file = sample_js_file();
    let bug_ids = analysis::run_pipeline(&state, file.path(), "app.js", Language::JavaScript)
        .await
        .unwrap();

    let stats = dashboard::get_stats(&state.db).await.unwrap();
    assert_eq!(stats.stats.total, bug_ids.len() as i64);
    assert_eq!(stats.stats.open, bug_ids.len() as i64);
    assert!(stats
        .language_distribution
        .iter()
        .any(|g| g.name == "javascript"));
}

#[tokio::test]
async fn filtered_listing_narrows_results() {
    let state = test_state().await;
    let file = sample_js_file();
    analysis::run_pipeline(&state, file.path(), "app.js", Language::JavaScript)
        .await
        .unwrap();

    let all = bug::list(&state.db, &BugFilters::default()).await.unwrap();
    let no_console_only = bug::list(
        &state.db,
        &BugFilters {
            search: Some("console".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(!no_console_only.is_empty());
    assert!(no_console_only.len() < all.len());

    let none = bug::list(
        &state.db,
        &BugFilters {
            language: Some("go".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(none.is_empty());
}
