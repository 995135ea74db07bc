use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use paperlens_lib::models::ReviewOptions;
use paperlens_lib::services::export::{save_csv, save_json, save_text_report, FeedbackVariant};
use paperlens_lib::services::review::ReviewPipeline;
use paperlens_lib::services::{AppConfig, ConfigStore};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "paperlens",
    about = "Heuristic research paper review with optional LLM enrichment",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Review a paper (PDF, DOCX, TXT or Markdown) and print the report
    Review(ReviewArgs),
    /// Inspect or edit the stored configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the config file location
    Path,
    /// Print the effective config (stored values plus environment overrides)
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing config (the old one is backed up)
        #[arg(long)]
        force: bool,
    },
    /// Set the default generation model
    SetModel { model: String },
}

#[derive(Args, Debug)]
struct ReviewArgs {
    /// Document to review
    path: PathBuf,
    /// Skip rewrites, critiques and the scorecard
    #[arg(long)]
    no_enrich: bool,
    /// Generation model (defaults to the configured model)
    #[arg(long)]
    model: Option<String>,
    /// Skip the plagiarism check
    #[arg(long)]
    no_plagiarism: bool,
    /// Write the full result as JSON
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,
    /// Write feedback as Type,Feedback CSV
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,
    /// Write the unabridged text report
    #[arg(long, value_name = "PATH")]
    text: Option<PathBuf>,
    /// Use rewritten feedback in CSV and text exports
    #[arg(long)]
    rewritten: bool,
}

#[tokio::main]
async fn main() {
    paperlens_lib::init_logging();

    if let Err(err) = run().await {
        eprintln!("application error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Review(args) => run_review(args, AppConfig::load_effective()).await,
        Command::Config { action } => run_config(action),
    }
}

async fn run_review(args: ReviewArgs, config: AppConfig) -> Result<()> {
    let options = ReviewOptions {
        enrich: config.review.enrich && !args.no_enrich,
        model: args
            .model
            .clone()
            .unwrap_or_else(|| config.generation.default_model.clone()),
        check_plagiarism: config.plagiarism.enabled && !args.no_plagiarism,
    };

    let pipeline = Arc::new(ReviewPipeline::from_config(&config));
    let result = pipeline
        .review_guarded(args.path.clone(), options)
        .await
        .with_context(|| format!("review of {} failed", args.path.display()))?;

    println!("{}", result.report);

    let variant = if args.rewritten {
        FeedbackVariant::Rewritten
    } else {
        FeedbackVariant::Original
    };
    let file_label = args
        .path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| args.path.display().to_string());

    if let Some(path) = &args.json {
        save_json(&result, path).with_context(|| format!("writing {}", path.display()))?;
        println!("JSON written to {}", path.display());
    }
    if let Some(path) = &args.csv {
        save_csv(&result, variant, path).with_context(|| format!("writing {}", path.display()))?;
        println!("CSV written to {}", path.display());
    }
    if let Some(path) = &args.text {
        save_text_report(&result, &file_label, variant, path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Text report written to {}", path.display());
    }
    Ok(())
}

fn run_config(action: ConfigAction) -> Result<()> {
    let store = ConfigStore::open_default().map_err(anyhow::Error::msg)?;
    match action {
        ConfigAction::Path => println!("{}", store.config_file().display()),
        ConfigAction::Show => {
            let config = AppConfig::load_effective();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Init { force } => {
            if store.init(force).map_err(anyhow::Error::msg)? {
                println!("Config written to {}", store.config_file().display());
            } else {
                println!(
                    "Config already exists at {} (use --force to overwrite)",
                    store.config_file().display()
                );
            }
        }
        ConfigAction::SetModel { model } => {
            let config = store
                .update(|config| config.generation.default_model = model.clone())
                .map_err(anyhow::Error::msg)
                .context("updating config")?;
            println!("Default model set to {}", config.generation.default_model);
        }
    }
    Ok(())
}
