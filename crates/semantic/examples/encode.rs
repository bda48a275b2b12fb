//! Encode a few sentences and print the vector shape.
//!
//! `cargo run -p sentvec-semantic --example encode -- "first sentence" "second one"`
//!
//! Set `SENTVEC_EXAMPLE_FAST=1` to use the deterministic stub instead of downloading the model.

use std::env;

use semantic::{EncoderMode, SemanticConfig, SentenceEncoder};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut texts: Vec<String> = env::args().skip(1).collect();
    if texts.is_empty() {
        texts.push("Hello world from sentvec.".into());
    }

    let mut cfg = SemanticConfig::default();
    if env::var_os("SENTVEC_EXAMPLE_FAST").is_some() {
        cfg.mode = EncoderMode::Fast;
    }
    println!("model: {} ({:?})", cfg.repo_id(), cfg.mode);

    let encoder = SentenceEncoder::load(&cfg).await?;
    let vectors = encoder.encode(&texts)?;

    for (text, vector) in texts.iter().zip(&vectors) {
        println!("{text:?}");
        println!("  dim: {}", vector.len());
        println!("  first values: {:?}", &vector[..vector.len().min(6)]);
    }

    Ok(())
}
