use clap::Parser;
use tracing_subscriber::EnvFilter;

use winsync_cli::Args;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    if let Err(e) = winsync_cli::run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
