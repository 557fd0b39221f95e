// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Command-line arguments

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "txn-cli")]
#[command(about = "Console for the transactional graph endpoint", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<log::Level>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show version information
    Version,

    /// Interactive console sending raw requests to an in-memory endpoint
    Console {
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the idle timeout (milliseconds)
        #[arg(long)]
        idle_timeout_ms: Option<u64>,

        /// Run the requests in this file instead of reading from the terminal
        #[arg(short, long)]
        script: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Send a single request to a fresh in-memory endpoint
    Request {
        /// Request method (POST or DELETE)
        method: String,

        /// Request path, e.g. /db/data/transaction/commit
        path: String,

        /// JSON request body
        body: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}
