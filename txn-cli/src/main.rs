// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction endpoint console entry point

use clap::Parser;
use colored::Colorize;

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments first to get log level
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if let Some(level) = cli.log_level {
        level.to_level_filter()
    } else {
        // Default to Warn (can still be overridden by RUST_LOG env var)
        log::LevelFilter::Warn
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    match cli.command {
        Commands::Version => {
            println!(
                "{} {}",
                txn_endpoint::CRATE_NAME.bold().green(),
                txn_endpoint::VERSION
            );
            println!("Transactional HTTP query endpoint");
            Ok(())
        }

        Commands::Console {
            config,
            idle_timeout_ms,
            script,
            format,
        } => cli::handle_console(config, idle_timeout_ms, script, format),

        Commands::Request {
            method,
            path,
            body,
            format,
        } => cli::handle_request(method, path, body, format),
    }
}
