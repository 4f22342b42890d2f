use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use labeller_core::CrossValidationReport;
use labeller_ingest::read_review_csv;
use labeller_pipeline::{ArtifactStore, ModelContext, ReviewSession, Trainer, TrainingReport};

mod config;
mod review_prompt;
mod state;

use config::Config;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("LABELLER_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(name = "labeller", version = VERSION, about = "Suggest categories for bank transactions")]
struct Cli {
    /// Config file (default: ~/.labeller/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit the model on a labeled CSV, evaluate it and save the artifacts
    Train {
        /// Labeled CSV with Name and Category columns
        #[arg(long)]
        csv: Option<PathBuf>,

        #[arg(long)]
        artifacts: Option<PathBuf>,

        /// N for the top-N accuracy metrics
        #[arg(long)]
        top_n: Option<usize>,

        #[arg(long)]
        folds: Option<usize>,

        /// Laplace smoothing
        #[arg(long)]
        alpha: Option<f64>,

        /// Print the full training report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rank categories for one or more descriptions
    Predict {
        #[arg(long)]
        artifacts: Option<PathBuf>,

        #[arg(long)]
        top_n: Option<usize>,

        #[arg(required = true)]
        descriptions: Vec<String>,
    },

    /// Fill in categories for a transaction CSV and write a reviewed copy
    Label {
        #[arg(long)]
        csv: PathBuf,

        /// Output CSV (default: labeled_transactions.csv next to the input)
        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(long)]
        artifacts: Option<PathBuf>,

        #[arg(long)]
        top_n: Option<usize>,

        /// Hide suggestions below this probability
        #[arg(long)]
        min_probability: Option<f64>,

        /// Step through each row and confirm or change its category
        #[arg(long)]
        interactive: bool,
    },

    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a config file with defaults if none exists
    Init,
    /// Print the effective config
    Show,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config_path = cli.config;
    let load = || config::load_config(config_path.as_deref());

    match cli.command {
        Command::Train {
            csv,
            artifacts,
            top_n,
            folds,
            alpha,
            json,
        } => {
            let mut cfg = load()?;
            if let Some(p) = csv {
                cfg.paths.data = p;
            }
            if let Some(p) = artifacts {
                cfg.paths.artifacts = p;
            }
            if let Some(n) = top_n {
                cfg.training.top_n = n;
            }
            if let Some(k) = folds {
                cfg.training.folds = k;
            }
            if let Some(a) = alpha {
                cfg.model.alpha = a;
            }
            train(&cfg, json)?;
        }

        Command::Predict {
            artifacts,
            top_n,
            descriptions,
        } => {
            let mut cfg = load()?;
            if let Some(p) = artifacts {
                cfg.paths.artifacts = p;
            }
            let n = top_n.unwrap_or(cfg.inference.top_n);
            predict(&cfg.artifact_store(), &descriptions, n)?;
        }

        Command::Label {
            csv,
            out,
            artifacts,
            top_n,
            min_probability,
            interactive,
        } => {
            let mut cfg = load()?;
            if let Some(p) = artifacts {
                cfg.paths.artifacts = p;
            }
            if let Some(n) = top_n {
                cfg.inference.top_n = n;
            }
            if let Some(m) = min_probability {
                cfg.inference.min_probability = m;
            }
            let out = out.unwrap_or_else(|| default_output(&csv));
            label(&cfg, &csv, &out, interactive)?;
        }

        Command::Config { command } => match command {
            // An explicit --config path may not exist yet, so init never loads.
            ConfigCommand::Init => config::init_config(config_path.as_deref())?,
            ConfigCommand::Show => {
                let cfg = load()?;
                print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
        },
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn default_output(input: &Path) -> PathBuf {
    input
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join("labeled_transactions.csv")
}

fn train(cfg: &Config, json: bool) -> Result<()> {
    let data = &cfg.paths.data;
    if !data.exists() {
        bail!("CSV not found: {} (pass --csv <path>)", data.display());
    }

    let trainer = Trainer::new(cfg.training_config(), cfg.artifact_store());
    let report = trainer
        .run(data)
        .with_context(|| format!("training on {}", data.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &TrainingReport) {
    println!(
        "Trained on {} samples, {} categories, {} terms",
        report.samples,
        report.categories.len(),
        report.vocabulary_size
    );
    println!("Accuracy: {:.4}", report.accuracy);
    println!("Top-{} accuracy: {:.4}", report.top_n, report.top_n_accuracy);
    print_cv("Cross-validation accuracy", &report.cv_accuracy);
    print_cv(
        &format!("Cross-validation top-{} accuracy", report.top_n),
        &report.cv_top_n_accuracy,
    );
    println!("Model: {}", report.artifacts.model.display());
    println!("Vectorizer: {}", report.artifacts.vectorizer.display());
}

fn print_cv(label: &str, cv: &std::result::Result<CrossValidationReport, String>) {
    match cv {
        Ok(cv) => {
            let scores: Vec<String> = cv.scores().iter().map(|s| format!("{:.4}", s)).collect();
            match (cv.mean(), cv.std_dev()) {
                (Some(mean), Some(sd)) => {
                    println!("{}: [{}] mean={:.4} sd={:.4}", label, scores.join(", "), mean, sd)
                }
                _ => println!("{}: no fold produced a score", label),
            }
            if cv.failed_folds() > 0 {
                println!("  {} fold(s) failed", cv.failed_folds());
            }
            for w in &cv.warnings {
                println!("  warning: {}", w);
            }
        }
        Err(e) => println!("{}: skipped ({})", label, e),
    }
}

fn load_model(store: &ArtifactStore) -> Result<ModelContext> {
    let ctx = ModelContext::new(store.clone());
    ctx.load_once().with_context(|| {
        format!(
            "loading model from {} (run: labeller train)",
            store.dir().display()
        )
    })?;
    Ok(ctx)
}

fn predict(store: &ArtifactStore, descriptions: &[String], n: usize) -> Result<()> {
    let ctx = load_model(store)?;
    let predictions = ctx.predict_categories(descriptions, n)?;

    for (i, description) in descriptions.iter().enumerate() {
        println!("{}", description);
        for r in predictions.row(i).unwrap_or_default() {
            println!("  {:<24} {:>6.1}%", r.category, r.probability * 100.0);
        }
    }
    Ok(())
}

fn label(cfg: &Config, input: &Path, out: &Path, interactive: bool) -> Result<()> {
    let ctx = load_model(&cfg.artifact_store())?;
    let batch = read_review_csv(input).with_context(|| format!("reading {}", input.display()))?;
    let rows = batch.len();
    let mut session = ReviewSession::start(&ctx, batch, cfg.inference.top_n)?;

    if interactive {
        let stdin = io::stdin();
        let visited = review_prompt::run_review(
            &mut session,
            cfg.inference.min_probability,
            &mut stdin.lock(),
            &mut io::stdout(),
        )?;
        println!("\nReviewed {} of {} rows", visited, rows);
    }

    let flagged = session.flagged_rows().len();
    session
        .into_batch()
        .write_csv(out)
        .with_context(|| format!("writing {}", out.display()))?;
    println!("Labeled {} rows ({} flagged) -> {}", rows, flagged, out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["labeller", "predict", "--top-n", "2", "SHELL OIL", "NETFLIX"]).unwrap();
        match cli.command {
            Command::Predict {
                top_n, descriptions, ..
            } => {
                assert_eq!(top_n, Some(2));
                assert_eq!(descriptions, vec!["SHELL OIL", "NETFLIX"]);
            }
            other => panic!("unexpected {:?}", other),
        }

        let cli = Cli::try_parse_from(["labeller", "train", "--alpha", "0.5", "--config", "c.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        assert!(matches!(cli.command, Command::Train { alpha: Some(a), .. } if a == 0.5));

        assert!(Cli::try_parse_from(["labeller", "predict"]).is_err());
        assert!(Cli::try_parse_from(["labeller", "label"]).is_err());
    }

    #[test]
    fn test_version_carries_build_id() {
        let rest = VERSION.strip_prefix(env!("CARGO_PKG_VERSION")).unwrap();
        assert!(rest.starts_with(" ("));
        assert!(rest.ends_with(')'));
        assert!(rest.len() > 3);
    }

    #[test]
    fn test_default_output_sits_next_to_input() {
        assert_eq!(
            default_output(Path::new("data/in/march.csv")),
            PathBuf::from("data/in/labeled_transactions.csv")
        );
        assert_eq!(
            default_output(Path::new("march.csv")),
            PathBuf::from("labeled_transactions.csv")
        );
    }
}
