//! sentvec CLI
//!
//! Encodes the configured sentences into `embeddings.json`, or queries a written
//! document by cosine similarity.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sentvec::{LogFormat, LoggingConfig, SentvecConfig};
use tracing_subscriber::EnvFilter;

/// Sentence embeddings to JSON
#[derive(Parser)]
#[command(name = "sentvec")]
#[command(about = "Encode sentences with a pre-trained model and write the vectors as JSON", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (yaml, toml or json); defaults to ./sentvec.* when present
    #[arg(long, global = true, env = "SENTVEC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Encode the configured sentences and write the embedding document (default)
    Encode {
        /// Output file, overrides output.path
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON document
        #[arg(long)]
        pretty: bool,
    },

    /// Find the records closest to a text
    Query {
        /// Text to encode and search for
        text: String,

        /// Number of results, overrides query.top_k
        #[arg(long)]
        top_k: Option<usize>,

        /// Embedding document to search, overrides output.path
        #[arg(long)]
        embeddings: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut cfg = SentvecConfig::load(cli.config.as_deref()).context("loading configuration")?;
    init_tracing(&cfg.logging);

    match cli.command.unwrap_or(Command::Encode {
        output: None,
        pretty: false,
    }) {
        Command::Encode { output, pretty } => {
            if let Some(output) = output {
                cfg.output.path = output;
            }
            cfg.output.pretty |= pretty;

            let summary = sentvec::run(&cfg).await?;
            println!(
                "wrote {} embeddings ({} dimensions) to {}",
                summary.records,
                summary.dimension,
                summary.output_path.display()
            );
        }
        Command::Query {
            text,
            top_k,
            embeddings,
        } => {
            if let Some(path) = embeddings {
                cfg.output.path = path;
            }
            let top_k = top_k.unwrap_or(cfg.query.top_k);

            let matches = sentvec::query(&cfg, &text, top_k).await?;
            println!("{}", serde_json::to_string_pretty(&matches)?);
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout carries only results. `RUST_LOG` wins over `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}
