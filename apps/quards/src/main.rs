//! # Quards - Card Game State Space Explorer
//!
//! The main binary for the Quards exploration engine.
//!
//! This application provides:
//! - CLI interface for seeding and exploring runs
//! - Turn summaries and state inspection over the stored graph
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             apps/quards (THE BINARY)        │
//! │                                             │
//! │   ┌─────────────┐      ┌───────────────┐    │
//! │   │    CLI      │      │  quards.toml  │    │
//! │   │   (clap)    │      │    (toml)     │    │
//! │   └──────┬──────┘      └───────┬───────┘    │
//! │          └───────────┬─────────┘            │
//! │                      ▼                      │
//! │              ┌───────────────┐              │
//! │              │  quards-core  │              │
//! │              │  (THE LOGIC)  │              │
//! │              └───────────────┘              │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Explore the first four turns with four workers
//! quards -g seed-1 explore --max-depth 4 --workers 4
//!
//! # Continue after an interruption
//! quards -g seed-1 explore --max-depth 6 --resume
//!
//! # Inspect the result
//! quards -g seed-1 summary --turn 3
//! quards -g seed-1 status
//! ```

use clap::Parser;
use quards::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // QUARDS_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("QUARDS_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quards=info,quards_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Quards startup banner.
fn print_banner() {
    println!(
        r#"
   ██████╗ ██╗   ██╗ █████╗ ██████╗ ██████╗ ███████╗
  ██╔═══██╗██║   ██║██╔══██╗██╔══██╗██╔══██╗██╔════╝
  ██║   ██║██║   ██║███████║██████╔╝██║  ██║███████╗
  ██║▄▄ ██║██║   ██║██╔══██║██╔══██╗██║  ██║╚════██║
  ╚██████╔╝╚██████╔╝██║  ██║██║  ██║██████╔╝███████║
   ╚══▀▀═╝  ╚═════╝ ╚═╝  ╚═╝╚═╝  ╚═╝╚═════╝ ╚══════╝

  Card Game State Space Explorer v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
