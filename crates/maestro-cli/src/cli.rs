use clap::{Args, Parser, Subcommand};
use maestro_sdk::ModelKind;
use std::path::PathBuf;

/// Rule and model driven campaign predictions.
///
/// Every command prints a JSON document on stdout; logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "maestro", version, about = "Maestro Strategic Mind")]
pub struct Cli {
    /// Config file (default: config/maestro.{toml,yaml,json} if present)
    #[arg(long, global = true, env = "MAESTRO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding model artifacts
    #[arg(long, global = true)]
    pub models_path: Option<PathBuf>,

    /// Store rules as YAML files under this directory
    #[arg(long, global = true)]
    pub repository: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Predict click-through rate for a campaign
    PredictCtr(ContextArgs),

    /// Predict return on investment for a campaign
    PredictRoi(ContextArgs),

    /// Rank advertising channels for a campaign
    RecommendChannels(ContextArgs),

    /// Manage knowledge base rules
    #[command(subcommand)]
    Rules(RulesCommand),

    /// Apply a feedback batch (JSON file)
    Feedback {
        #[arg(long)]
        file: PathBuf,
    },

    /// Train and inspect models
    #[command(subcommand)]
    Models(ModelsCommand),

    /// Show knowledge base and model status
    Status,
}

#[derive(Subcommand, Debug)]
pub enum RulesCommand {
    /// List cached rules by descending priority
    List {
        #[arg(long = "type")]
        rule_type: Option<String>,
    },

    /// Add a rule from a JSON file
    Add {
        #[arg(long)]
        file: PathBuf,
    },

    /// Show the rules matching a context
    Evaluate {
        #[command(flatten)]
        context: ContextArgs,

        #[arg(long = "type")]
        rule_type: Option<String>,
    },

    /// Apply a partial update (JSON file) to a rule
    Update {
        id: i64,

        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// Train a model from a JSON array of records
    Train {
        /// ctr, roi or channel
        #[arg(long)]
        kind: ModelKind,

        #[arg(long)]
        dataset: PathBuf,

        /// Column to predict
        #[arg(long)]
        target: String,
    },

    /// Loaded models, their features, metrics and feedback
    Report,
}

/// Campaign context, inline or from a file
#[derive(Args, Debug, Clone)]
pub struct ContextArgs {
    /// Context as a JSON object
    #[arg(long, conflicts_with = "context_file")]
    pub context: Option<String>,

    /// Path to a JSON file holding the context object
    #[arg(long)]
    pub context_file: Option<PathBuf>,
}
