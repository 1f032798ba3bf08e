//! Operator CLI for Darkroom.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use darkroom_core::config::AppConfig;
use darkroom_core::{Algorithm, compute_digests};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use futures::TryStreamExt;
use std::io;
use tokio_util::io::StreamReader;

#[derive(Parser)]
#[command(name = "darkroomctl")]
#[command(about = "Operator CLI for Darkroom")]
#[command(version)]
struct Cli {
    /// Config file path (TOML). Env vars prefixed DARKROOM_ override it.
    #[arg(long, env = "DARKROOM_CONFIG", global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute digests of a file behind a scheme URI.
    Hash {
        /// The file to hash, as scheme://path.
        uri: String,

        /// Algorithms to compute (defaults to the configured set).
        #[arg(long, value_delimiter = ',')]
        algorithms: Vec<String>,
    },
    /// Validate the configuration and report the registered schemes.
    CheckConfig,
}

fn load_config(path: Option<&str>) -> Result<AppConfig> {
    let mut figment = Figment::new();
    if let Some(path) = path {
        figment = figment.merge(Toml::file(path));
    }
    let config: AppConfig = figment
        .merge(Env::prefixed("DARKROOM_").split("__"))
        .extract()
        .context("failed to load configuration")?;
    config.validate().map_err(|e| anyhow!(e))?;
    Ok(config)
}

async fn run_hash(config: AppConfig, uri: &str, algorithm_names: &[String]) -> Result<()> {
    let algorithms: Vec<Algorithm> = if algorithm_names.is_empty() {
        config.fixity.algorithms.clone()
    } else {
        algorithm_names
            .iter()
            .map(|name| Algorithm::parse(name))
            .collect::<darkroom_core::Result<_>>()?
    };
    if algorithms.is_empty() {
        return Err(anyhow!("no algorithms enabled or requested"));
    }

    let registry = darkroom_storage::registry_from_config(&config).await?;
    let stream = registry
        .get_stream(uri)
        .await
        .with_context(|| format!("cannot open {uri}"))?;
    let reader = StreamReader::new(stream.map_err(io::Error::other));

    let digests = compute_digests(reader, &algorithms, config.fixity.chunk_size)
        .await
        .with_context(|| format!("read failed for {uri}"))?;

    for algorithm in &algorithms {
        if let Some(digest) = digests.get(algorithm) {
            println!("{algorithm}\t{digest}\t{uri}");
        }
    }
    Ok(())
}

async fn run_check_config(config: AppConfig) -> Result<()> {
    let registry = darkroom_storage::registry_from_config(&config).await?;
    let mut schemes: Vec<&str> = registry.schemes().collect();
    schemes.sort_unstable();

    println!("configuration ok");
    println!("enabled algorithms:");
    for algorithm in &config.fixity.algorithms {
        println!("  {algorithm} ({})", algorithm.label());
    }
    println!("schemes:");
    for scheme in schemes {
        println!("  {scheme}://");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Hash { uri, algorithms } => run_hash(config, &uri, &algorithms).await,
        Commands::CheckConfig => run_check_config(config).await,
    }
}
