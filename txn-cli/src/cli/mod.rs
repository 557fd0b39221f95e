// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for the transaction endpoint
//!
//! Provides an interactive console (REPL) and a script runner that send raw
//! `METHOD path [json]` requests to an in-memory endpoint, plus one-off
//! request execution.

pub mod commands;
pub mod console;
pub mod output;

pub use commands::{Cli, Commands};
pub use console::{handle_console, handle_request};
