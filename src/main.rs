//! Binary entry point.

use git_chronicle::{cli, commands, logger};

#[tokio::main]
async fn main() {
    if let Err(e) = logger::init() {
        eprintln!("Failed to initialize logger: {e}");
    }

    if let Err(e) = cli::main().await {
        std::process::exit(commands::exit_code_for(&e));
    }
}
