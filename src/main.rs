//! Xero tap CLI
//!
//! Protocol messages go to stdout, logs to stderr.

use clap::Parser;
use tracing::error;
use xero_tap::cli::{Cli, Runner};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let runner = Runner::new(cli);

    if let Err(e) = runner.run().await {
        error!("{e}");
        std::process::exit(1);
    }
}
