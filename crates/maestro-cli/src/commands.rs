//! Subcommand execution
//!
//! Each command returns the JSON document the binary prints.

use anyhow::{bail, Context as _, Result};
use maestro_sdk::{
    context_from_json, Context, Dataset, FeedbackBatch, HybridInferenceEngine, NewRule, RulePatch,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};
use std::path::Path;
use tokio::fs;

use crate::cli::{Command, ContextArgs, ModelsCommand, RulesCommand};

pub async fn execute(engine: &HybridInferenceEngine, command: Command) -> Result<JsonValue> {
    let output = match command {
        Command::PredictCtr(args) => {
            let context = read_context(&args).await?;
            serde_json::to_value(engine.predict_ctr(&context).await)?
        }
        Command::PredictRoi(args) => {
            let context = read_context(&args).await?;
            serde_json::to_value(engine.predict_roi(&context).await)?
        }
        Command::RecommendChannels(args) => {
            let context = read_context(&args).await?;
            serde_json::to_value(engine.recommend_channels(&context).await)?
        }
        Command::Rules(command) => rules(engine, command).await?,
        Command::Feedback { file } => {
            let batch: FeedbackBatch = read_json(&file).await?;
            let success = engine.update_from_feedback(&batch).await;
            json!({
                "success": success,
                "rule_feedback": batch.rule_feedback.len(),
                "ml_feedback": batch.ml_feedback.len(),
            })
        }
        Command::Models(command) => models(engine, command).await?,
        Command::Status => serde_json::to_value(engine.status().await)?,
    };
    Ok(output)
}

async fn rules(engine: &HybridInferenceEngine, command: RulesCommand) -> Result<JsonValue> {
    let kb = engine.knowledge_base();
    let output = match command {
        RulesCommand::List { rule_type } => serde_json::to_value(kb.get_rules(rule_type.as_deref()).await)?,
        RulesCommand::Add { file } => {
            let rule: NewRule = read_json(&file).await?;
            let added = kb.try_add_rule(rule).await.context("failed to add rule")?;
            serde_json::to_value(added)?
        }
        RulesCommand::Evaluate { context, rule_type } => {
            let context = read_context(&context).await?;
            serde_json::to_value(kb.evaluate(&context, rule_type.as_deref()).await)?
        }
        RulesCommand::Update { id, file } => {
            let patch: RulePatch = read_json(&file).await?;
            let updated = kb
                .try_update_rule(id, patch)
                .await
                .with_context(|| format!("failed to update rule {}", id))?;
            serde_json::to_value(updated)?
        }
    };
    Ok(output)
}

async fn models(engine: &HybridInferenceEngine, command: ModelsCommand) -> Result<JsonValue> {
    let store = engine.model_store();
    let output = match command {
        ModelsCommand::Train {
            kind,
            dataset,
            target,
        } => {
            let records: Vec<JsonValue> = read_json(&dataset).await?;
            let dataset = Dataset::from_records(&records, store.coercion())
                .with_context(|| format!("invalid dataset {}", dataset.display()))?;
            if !store.train_and_save(kind, &dataset, &target).await {
                bail!("training the {} model failed, see the log for details", kind);
            }
            json!({
                "kind": kind,
                "trained": true,
                "models_path": store.models_path(),
                "metrics": store.metrics(kind).await,
            })
        }
        ModelsCommand::Report => serde_json::to_value(store.performance_report().await)?,
    };
    Ok(output)
}

/// Parse `--context` or `--context-file` into a context
pub async fn read_context(args: &ContextArgs) -> Result<Context> {
    let raw = match (&args.context, &args.context_file) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => bail!("a context is required: pass --context or --context-file"),
    };
    let json: JsonValue = serde_json::from_str(&raw).context("context is not valid JSON")?;
    if !json.is_object() {
        bail!("context must be a JSON object");
    }
    Ok(context_from_json(json))
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}
