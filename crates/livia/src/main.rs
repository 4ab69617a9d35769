// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LIVIA - multi-tenant WhatsApp support inbox.
//!
//! This is the binary entry point for the LIVIA server.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod doctor;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use livia_config::model::LiviaConfig;

/// LIVIA - multi-tenant WhatsApp support inbox.
#[derive(Parser, Debug)]
#[command(name = "livia", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway.
    Serve,
    /// Check configuration, database and wallet ledgers.
    Doctor,
}

fn load_config(path: Option<&PathBuf>) -> LiviaConfig {
    let loaded = match path {
        Some(path) => livia_config::load_and_validate_path(path),
        None => livia_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            livia_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Doctor) => doctor::run_doctor(&config).await,
        None => {
            println!("livia: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
