/// wdl-model diagnostic CLI
///
/// Loads a document (a JSON construction payload) together with its imports,
/// validates it and prints every issue found.
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wdl_model::{ModelError, Project, Settings};

#[derive(Parser)]
#[command(name = "wdl-model")]
#[command(about = "Inspect and validate WDL documents", long_about = None)]
struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a document and its imports, then report validation issues
    Check {
        /// Document payload (JSON)
        path: String,

        /// Maximum import nesting depth
        #[arg(long)]
        max_import_depth: Option<usize>,

        /// Only print errors
        #[arg(short = 'q', long = "quiet")]
        quiet: bool,
    },

    /// Print the effective settings as TOML
    Config,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the document is free of errors
async fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Check {
            path,
            max_import_depth,
            quiet,
        } => {
            let mut builder = Settings::builder().config_path(cli.config);
            if let Some(depth) = max_import_depth {
                builder = builder.max_import_depth(depth);
            }
            let settings = builder.build()?;

            let project = Project::with_fs(settings);
            let document = project
                .load(&path)
                .await
                .with_context(|| format!("Failed to load {}", path))?;

            let clean = match project.model_mut().ensure_valid(document) {
                Ok(()) => true,
                Err(ModelError::Invalid(_)) => false,
                Err(e) => return Err(e.into()),
            };
            let issues = project.model().issues(document)?;
            let mut errors = 0;
            for issue in &issues {
                if issue.is_error() {
                    errors += 1;
                } else if quiet {
                    continue;
                }
                println!("{}", describe(&project, issue));
            }

            println!(
                "{}: {} issue(s), {} error(s)",
                path,
                issues.len(),
                errors
            );
            Ok(clean)
        }

        Commands::Config => {
            let settings = Settings::load(cli.config)?;
            print!("{}", settings.to_toml()?);
            Ok(true)
        }
    }
}

fn describe(project: &Project, issue: &wdl_model::Issue) -> String {
    let model = project.model();
    let mut location: Vec<String> = model
        .ancestors(issue.entity)
        .into_iter()
        .rev()
        .chain(std::iter::once(issue.entity))
        .filter_map(|id| model.name(id).map(str::to_string))
        .collect();
    if location.is_empty() {
        location.push(issue.entity.kind().to_string());
    }
    format!(
        "{:7} {}: {} [{}]",
        issue.severity.as_str(),
        location.join("."),
        issue.message,
        issue.rule_id
    )
}
