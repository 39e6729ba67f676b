//! Line-oriented front end for the mystery duel.
//!
//! Reads commands from stdin and prints the chat as tagged lines on stdout:
//!
//! ```bash
//! cargo run -p rondo -- --theme "a lighthouse on a stormy night"
//! ```
//!
//! Logs and the witch's thinking go to stderr, so stdout stays a clean
//! transcript.

mod headless;

use clap::Parser;
use rondo_core::{ClaudeOracle, OracleConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rondo")]
#[command(about = "Duel the witch over an impossible crime", long_about = None)]
#[command(version)]
pub struct Args {
    /// Model for conversation, judging and the tutorial
    #[arg(long)]
    pub model: Option<String>,

    /// Model for mystery generation
    #[arg(long)]
    pub mystery_model: Option<String>,

    /// Start a game on this theme right away (empty for a random one)
    #[arg(long)]
    pub theme: Option<String>,

    /// Start the tutorial right away
    #[arg(long, conflicts_with = "theme")]
    pub tutorial: bool,

    /// Extended thinking budget in tokens
    #[arg(long)]
    pub thinking_budget: Option<usize>,
}

impl Args {
    fn oracle_config(&self) -> OracleConfig {
        let mut config = OracleConfig::default();
        if let Some(model) = &self.model {
            config = config.with_model(model);
        }
        if let Some(model) = &self.mystery_model {
            config = config.with_mystery_model(model);
        }
        if let Some(budget) = self.thinking_budget {
            config = config.with_thinking_budget(budget);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if std::env::var("ANTHROPIC_API_KEY").is_err() {
        eprintln!("Error: ANTHROPIC_API_KEY environment variable not set.");
        eprintln!("Please set it in .env file or with: export ANTHROPIC_API_KEY=your_key_here");
        std::process::exit(1);
    }

    let oracle = ClaudeOracle::from_env()?.with_config(args.oracle_config());
    tracing::info!(model = %oracle.config().model, "oracle ready");

    headless::run(oracle, &args).await?;
    Ok(())
}
