//! Command execution against file-system storage

use clap::Parser;
use maestro_cli::cli::{Cli, Command, ContextArgs, ModelsCommand, RulesCommand};
use maestro_cli::commands::{execute, read_context};
use maestro_sdk::{HybridInferenceEngine, ModelKind, RepositoryConfig, StrategicMindBuilder};
use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

async fn engine(dir: &Path) -> HybridInferenceEngine {
    StrategicMindBuilder::new()
        .with_repository(RepositoryConfig::file_system(dir.join("rules").to_string_lossy()))
        .with_models_path(dir.join("models"))
        .build()
        .await
        .unwrap()
}

fn inline(context: serde_json::Value) -> ContextArgs {
    ContextArgs {
        context: Some(context.to_string()),
        context_file: None,
    }
}

fn write_json(dir: &TempDir, name: &str, value: serde_json::Value) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();
    path
}

#[test]
fn test_parse_global_flags_and_subcommand() {
    let cli = Cli::try_parse_from([
        "maestro",
        "rules",
        "list",
        "--type",
        "ctr_prediction",
        "--repository",
        "/srv/rules",
    ])
    .unwrap();
    assert_eq!(cli.repository, Some(PathBuf::from("/srv/rules")));
    assert!(matches!(
        cli.command,
        Command::Rules(RulesCommand::List { rule_type: Some(ref t) }) if t == "ctr_prediction"
    ));
}

#[test]
fn test_parse_model_kind() {
    let cli = Cli::try_parse_from([
        "maestro", "models", "train", "--kind", "roi", "--dataset", "d.json", "--target", "roi",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Command::Models(ModelsCommand::Train { kind: ModelKind::Roi, .. })
    ));
    assert!(Cli::try_parse_from(["maestro", "models", "train", "--kind", "cpm", "--dataset", "d", "--target", "t"]).is_err());
}

#[test]
fn test_context_flags_conflict() {
    let result = Cli::try_parse_from([
        "maestro",
        "predict-ctr",
        "--context",
        "{}",
        "--context-file",
        "ctx.json",
    ]);
    assert!(result.is_err());
}

#[tokio::test]
async fn test_read_context_validation() {
    assert!(read_context(&inline(json!([1, 2]))).await.is_err());
    assert!(read_context(&ContextArgs { context: None, context_file: None }).await.is_err());
    assert!(read_context(&ContextArgs { context: Some("{oops".into()), context_file: None }).await.is_err());

    let context = read_context(&inline(json!({"industry": "retail"}))).await.unwrap();
    assert_eq!(context.get("industry").and_then(|v| v.as_str()), Some("retail"));
}

#[tokio::test]
async fn test_predict_ctr_heuristic_output() {
    let dir = TempDir::new().unwrap();
    let engine = engine(dir.path()).await;

    let output = execute(
        &engine,
        Command::PredictCtr(inline(json!({"industry": "food", "channel": "display", "budget": 1000}))),
    )
    .await
    .unwrap();
    assert_eq!(output["method"], json!("heuristic"));
    assert!((output["prediction"].as_f64().unwrap() - 0.036).abs() < 1e-9);
    assert_eq!(output["insights"]["trend"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_rule_lifecycle_persists_across_restarts() {
    let dir = TempDir::new().unwrap();
    let files = TempDir::new().unwrap();

    let rule_file = write_json(
        &files,
        "rule.json",
        json!({
            "name": "tech audiences",
            "rule_type": "ctr_prediction",
            "conditions": {"field": "industry", "value": "technology"},
            "actions": {"ctr": 0.08},
            "priority": 1
        }),
    );
    let engine_a = engine(dir.path()).await;
    let added = execute(&engine_a, Command::Rules(RulesCommand::Add { file: rule_file }))
        .await
        .unwrap();
    let id = added["id"].as_i64().unwrap();

    let feedback_file = write_json(
        &files,
        "feedback.json",
        json!({"rule_feedback": [{"rule_id": id, "is_useful": true}]}),
    );
    let applied = execute(&engine_a, Command::Feedback { file: feedback_file })
        .await
        .unwrap();
    assert_eq!(applied["success"], json!(true));

    // a fresh engine reads the same directory
    let engine_b = engine(dir.path()).await;
    let listed = execute(&engine_b, Command::Rules(RulesCommand::List { rule_type: None }))
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["priority"], json!(2));

    let matched = execute(
        &engine_b,
        Command::Rules(RulesCommand::Evaluate {
            context: inline(json!({"industry": "technology"})),
            rule_type: Some("ctr_prediction".into()),
        }),
    )
    .await
    .unwrap();
    assert_eq!(matched[0]["rule_id"], json!(id));

    let patch_file = write_json(&files, "patch.json", json!({"is_active": false}));
    execute(&engine_b, Command::Rules(RulesCommand::Update { id, file: patch_file }))
        .await
        .unwrap();
    let prediction = execute(&engine_b, Command::PredictCtr(inline(json!({"industry": "technology"}))))
        .await
        .unwrap();
    assert_eq!(prediction["method"], json!("heuristic"));
}

#[tokio::test]
async fn test_update_missing_rule_fails() {
    let dir = TempDir::new().unwrap();
    let engine = engine(dir.path()).await;
    let patch = write_json(&dir, "patch.json", json!({"priority": 4}));
    assert!(execute(&engine, Command::Rules(RulesCommand::Update { id: 77, file: patch }))
        .await
        .is_err());
}

#[tokio::test]
async fn test_train_then_predict_with_model() {
    let dir = TempDir::new().unwrap();
    let files = TempDir::new().unwrap();
    let records: Vec<serde_json::Value> = (0..40)
        .map(|i| {
            let budget = 500.0 + 250.0 * i as f64;
            json!({"budget": budget, "duration": (i % 7) + 1, "ctr": 0.01 + budget / 1_000_000.0})
        })
        .collect();
    let dataset = write_json(&files, "dataset.json", json!(records));

    let engine_a = engine(dir.path()).await;
    let trained = execute(
        &engine_a,
        Command::Models(ModelsCommand::Train {
            kind: ModelKind::Ctr,
            dataset,
            target: "ctr".into(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(trained["trained"], json!(true));
    assert_eq!(trained["metrics"]["n_samples"], json!(32));

    let engine_b = engine(dir.path()).await;
    let report = execute(&engine_b, Command::Models(ModelsCommand::Report)).await.unwrap();
    assert_eq!(report["loaded_models"], json!(["ctr"]));
    assert_eq!(report["available_features"]["ctr"], json!(["budget", "duration"]));

    let prediction = execute(
        &engine_b,
        Command::PredictCtr(inline(json!({"budget": 3000, "duration": 3}))),
    )
    .await
    .unwrap();
    assert_eq!(prediction["method"], json!("ml_model"));
    let value = prediction["prediction"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&value));
}

#[tokio::test]
async fn test_train_with_unknown_target_fails() {
    let dir = TempDir::new().unwrap();
    let dataset = write_json(&dir, "dataset.json", json!([{"budget": 1, "ctr": 0.1}]));
    let engine = engine(dir.path()).await;
    let result = execute(
        &engine,
        Command::Models(ModelsCommand::Train {
            kind: ModelKind::Ctr,
            dataset,
            target: "roi".into(),
        }),
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_status_output() {
    let dir = TempDir::new().unwrap();
    let engine = engine(dir.path()).await;
    let status = execute(&engine, Command::Status).await.unwrap();
    assert_eq!(status["knowledge_base"]["rule_count"], json!(0));
    assert_eq!(status["models"]["loaded_models"], json!([]));
}
