#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Safety map report server.
//!
//! ```text
//! safety_map_server              # start with environment configuration
//! safety_map_server interactive  # prompt for address, port and endpoints
//! ```

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "safety_map_server",
    about = "Serve unsafe-location report page sessions"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Prompt for configuration before starting
    Interactive,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Interactive) => safety_map_server::interactive::run().await,
        None => safety_map_server::run_server().await,
    }
}
