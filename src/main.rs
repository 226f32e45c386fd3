mod apply;
mod config;
mod error;
mod mage;
mod stack;
mod template;

use std::path::PathBuf;

use anyhow::bail;
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::apply::KubeApplier;
use crate::config::MageConfig;
use crate::mage::QueryRequest;

#[derive(Parser)]
#[command(
    name = "oncall-deploy",
    about = "Apply oncall deployment stacks and query Mage"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a stack's manifests, in order, to one or more namespaces
    Apply {
        /// Stack name, see `stacks`
        #[arg(long)]
        stack: String,
        /// Target namespace; repeat for multiple namespaces
        #[arg(long = "namespace", required = true)]
        namespaces: Vec<String>,
        /// Directory holding the manifest templates
        #[arg(long, default_value = "manifests")]
        manifest_dir: PathBuf,
    },
    /// Run a one-shot Mage search and print the JSON response
    Search {
        #[arg(long)]
        query: String,
        /// Result-size cap; matches beyond it are truncated server-side
        #[arg(long, default_value_t = 1)]
        size: u32,
        /// Window start, RFC 3339 (default: 24h before end)
        #[arg(long)]
        start: Option<DateTime<Utc>>,
        /// Window end, RFC 3339 (default: now)
        #[arg(long)]
        end: Option<DateTime<Utc>>,
    },
    /// List the built-in stacks and their apply order
    Stacks {
        #[arg(long, default_value = "manifests")]
        manifest_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match Cli::parse().command {
        Command::Apply {
            stack,
            namespaces,
            manifest_dir,
        } => {
            let Some(stack) = stack::find_stack(&manifest_dir, &stack) else {
                bail!("unknown stack {stack:?}, see `oncall-deploy stacks`");
            };

            let mut applier = KubeApplier::connect().await?;
            let failures = apply::run_namespaces(&mut applier, &stack, &namespaces).await;
            if !failures.is_empty() {
                for e in &failures {
                    error!("{e}");
                }
                bail!(
                    "{} of {} namespace run(s) failed",
                    failures.len(),
                    namespaces.len()
                );
            }
        }
        Command::Search {
            query,
            size,
            start,
            end,
        } => {
            let config = MageConfig::from_env()?;
            let end_time = end.unwrap_or_else(Utc::now);
            let start_time = start.unwrap_or(end_time - Duration::hours(24));
            let req = QueryRequest {
                query,
                size,
                start_time,
                end_time,
            };

            let result = mage::search(&config, &req)
                .await
                .map_err(error::DeployError::Http)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Stacks { manifest_dir } => {
            for stack in stack::builtin_stacks(&manifest_dir) {
                println!("{stack}");
            }
        }
    }

    Ok(())
}
