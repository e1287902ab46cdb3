//! Waypoint - documentation-first learning roadmaps
//!
//! Serves a single generation endpoint that turns a topic into an ordered,
//! validated roadmap of modules pointing at official documentation.

mod server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use waypoint_adapters::config::{Config, API_KEY_ENV};
use waypoint_core::GenerationRequest;
use waypoint_engine::Pipeline;

/// Identity the rate limiter sees for one-shot CLI generations.
const CLI_IDENTITY: &str = "cli";

#[derive(Parser, Debug)]
#[command(
    name = "waypoint",
    about = "Learning roadmap generator",
    long_about = "Generates ordered learning roadmaps that cite official documentation.\n\
                  Uses a live model when CEREBRAS_API_KEY is set, mock responses otherwise.",
    version
)]
struct Args {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Address to listen on (overrides config and WAYPOINT_BIND)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Generate one roadmap and print it as JSON
    Generate {
        topic: String,

        /// Title of a roadmap the learner already has (repeatable)
        #[arg(long = "existing", value_name = "TITLE")]
        existing: Vec<String>,
    },
    /// Report the effective configuration
    Check,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,waypoint=info,tower_http=warn")
            }),
        )
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(Config::load()),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging();

    let mut config = load_config(args.config.as_ref())?;

    match args.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            server::run_server(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Generate { topic, existing } => generate_once(&config, topic, existing).await,
        Command::Check => {
            check(&config, args.config.as_ref());
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Run the pipeline once in-process and print the roadmap or the error body.
async fn generate_once(config: &Config, topic: String, existing: Vec<String>) -> Result<ExitCode> {
    let pipeline = Pipeline::from_config(config).context("failed to build generation pipeline")?;
    let mut request = GenerationRequest::new(topic);
    if !existing.is_empty() {
        request = request.with_existing_titles(existing);
    }
    let body = serde_json::to_vec(&request).context("failed to encode request")?;

    match pipeline.handle(CLI_IDENTITY, &body).await {
        Ok(roadmap) => {
            println!("{}", serde_json::to_string_pretty(&roadmap)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            if let Some(diagnostic) = &err.diagnostic {
                tracing::warn!(kind = err.kind.as_str(), diagnostic = %diagnostic, "generation failed");
            }
            println!("{}", serde_json::to_string_pretty(&err.body())?);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn check(config: &Config, explicit: Option<&PathBuf>) {
    let location = match explicit {
        Some(path) => path.display().to_string(),
        None => match Config::default_path().filter(|p| p.exists()) {
            Some(path) => path.display().to_string(),
            None => format!("{} (not present, using defaults)", Config::config_location()),
        },
    };
    println!("  config      {}", location);
    println!("  mode        {}", config.mode().as_str());
    if config.api_key.is_none() {
        println!("              set {} to use the live model", API_KEY_ENV);
    }
    println!("  bind        {}", config.server.bind);
    println!("  upstream    {}", config.upstream.base_url);
    println!("  model       {}", config.upstream.model);
    println!(
        "  rate limit  {} requests / {}s",
        config.rate_limit.max_requests, config.rate_limit.window_secs
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn generate_accepts_repeated_existing_titles() {
        let args = Args::parse_from([
            "waypoint",
            "generate",
            "Kubernetes",
            "--existing",
            "Learn Docker",
            "--existing",
            "Linux Basics",
        ]);
        match args.command {
            Command::Generate { topic, existing } => {
                assert_eq!(topic, "Kubernetes");
                assert_eq!(existing, vec!["Learn Docker", "Linux Basics"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let args = Args::parse_from(["waypoint", "serve", "--config", "/tmp/w.toml", "--bind", "0.0.0.0:8080"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/w.toml")));
        assert!(matches!(args.command, Command::Serve { bind: Some(ref b) } if b == "0.0.0.0:8080"));
    }

    #[test]
    fn explicit_config_must_exist_and_parse() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(load_config(Some(&missing)).is_err());

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[server\nbind = ").unwrap();
        assert!(load_config(Some(&broken)).is_err());

        let good = dir.path().join("good.toml");
        std::fs::write(&good, "[rate_limit]\nmax_requests = 9\n").unwrap();
        assert_eq!(load_config(Some(&good)).unwrap().rate_limit.max_requests, 9);
    }
}
