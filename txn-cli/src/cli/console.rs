// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Interactive console and script runner

use super::commands::OutputFormat;
use super::output::ResponseFormatter;
use colored::*;
use rustyline::{error::ReadlineError, CompletionType, Config, EditMode, Editor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use txn_endpoint::{EndpointConfig, MemoryEngine, Method, TransactionEndpoint};

/// Placeholder replaced by the location of the most recently begun transaction
const LAST_TRANSACTION: &str = "$tx";

/// One parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Request {
        method: Method,
        path: String,
        body: String,
    },
    Stats,
    Open,
    Sweep,
    Help,
    Quit,
    Empty,
}

/// Parse a console line
///
/// Requests are written `METHOD path [json body]`; console commands start
/// with `:`.
pub fn parse_line(line: &str) -> Result<ConsoleCommand, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(ConsoleCommand::Empty);
    }

    match trimmed.to_lowercase().as_str() {
        ":stats" => return Ok(ConsoleCommand::Stats),
        ":open" => return Ok(ConsoleCommand::Open),
        ":sweep" => return Ok(ConsoleCommand::Sweep),
        ":help" | "help" => return Ok(ConsoleCommand::Help),
        ":quit" | ":exit" | "quit" | "exit" => return Ok(ConsoleCommand::Quit),
        _ => {}
    }
    if trimmed.starts_with(':') {
        return Err(format!("Unknown command: {}", trimmed));
    }

    let mut parts = trimmed.splitn(3, char::is_whitespace);
    let method = parts
        .next()
        .unwrap_or_default()
        .parse::<Method>()?;
    let path = parts
        .next()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| "Missing request path".to_string())?
        .to_string();
    let body = parts.next().unwrap_or("").trim().to_string();

    Ok(ConsoleCommand::Request { method, path, body })
}

/// Console state shared across lines
struct Console {
    endpoint: Arc<TransactionEndpoint>,
    format: OutputFormat,
    last_location: Option<String>,
}

impl Console {
    fn new(endpoint: Arc<TransactionEndpoint>, format: OutputFormat) -> Self {
        Self {
            endpoint,
            format,
            last_location: None,
        }
    }

    /// Run one line, returning `false` when the console should stop
    fn run_line(&mut self, line: &str) -> bool {
        let command = match parse_line(line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", format!("Error: {}", e).red());
                return true;
            }
        };

        match command {
            ConsoleCommand::Empty => {}
            ConsoleCommand::Quit => return false,
            ConsoleCommand::Help => print_help(),
            ConsoleCommand::Stats => {
                println!(
                    "{}",
                    ResponseFormatter::format_statistics(&self.endpoint.statistics())
                );
            }
            ConsoleCommand::Open => {
                let ids = self.endpoint.registry().open_ids();
                if ids.is_empty() {
                    println!("{}", "No open transactions".yellow());
                }
                for id in ids {
                    println!("{}", self.endpoint.handler().uris().transaction_uri(id));
                }
            }
            ConsoleCommand::Sweep => {
                let expired = self.endpoint.sweep_expired();
                println!("{}", format!("Expired {} transaction(s)", expired).cyan());
            }
            ConsoleCommand::Request { method, path, body } => {
                let path = match self.resolve_path(&path) {
                    Some(path) => path,
                    None => {
                        eprintln!(
                            "{}",
                            format!("Error: no transaction begun yet, cannot use {}", LAST_TRANSACTION)
                                .red()
                        );
                        return true;
                    }
                };
                let response = self.endpoint.handle_request(method, &path, body.as_bytes());
                if let Some(location) = &response.location {
                    self.last_location = Some(location.clone());
                }
                println!("{}", ResponseFormatter::format(&response, self.format));
            }
        }
        true
    }

    fn resolve_path(&self, path: &str) -> Option<String> {
        if !path.contains(LAST_TRANSACTION) {
            return Some(path.to_string());
        }
        self.last_location
            .as_ref()
            .map(|location| path.replace(LAST_TRANSACTION, location))
    }
}

fn build_endpoint(
    config_path: Option<PathBuf>,
    idle_timeout_ms: Option<u64>,
) -> Result<Arc<TransactionEndpoint>, Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => EndpointConfig::from_json_file(path)?,
        None => EndpointConfig::default(),
    };
    if let Some(ms) = idle_timeout_ms {
        config = config.with_idle_timeout(Duration::from_millis(ms));
    }

    let endpoint = TransactionEndpoint::new(Arc::new(MemoryEngine::new()), config)?;
    Ok(Arc::new(endpoint))
}

/// Handle the console command
pub fn handle_console(
    config: Option<PathBuf>,
    idle_timeout_ms: Option<u64>,
    script: Option<PathBuf>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = build_endpoint(config, idle_timeout_ms)?;

    // The reaper runs on the runtime's worker threads while the console blocks on input.
    let runtime = tokio::runtime::Runtime::new()?;
    {
        let _guard = runtime.enter();
        endpoint.start_reaper();
    }

    let mut console = Console::new(endpoint.clone(), format);
    let result = match script {
        Some(path) => run_script(&mut console, &path),
        None => run_repl(&mut console),
    };

    runtime.block_on(endpoint.shutdown());
    result
}

/// Handle the request command (one-off request)
pub fn handle_request(
    method: String,
    path: String,
    body: Option<String>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let method = method.parse::<Method>()?;
    let endpoint = build_endpoint(None, None)?;

    let response = endpoint.handle_request(method, &path, body.unwrap_or_default().as_bytes());
    println!("{}", ResponseFormatter::format(&response, format));

    if response.status.is_success() && response.body.errors.is_empty() {
        Ok(())
    } else {
        Err(format!("Request failed with {}", response.status).into())
    }
}

fn run_script(console: &mut Console, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    for line in contents.lines() {
        if matches!(parse_line(line), Ok(ConsoleCommand::Empty)) {
            continue;
        }
        println!("{} {}", ">".cyan(), line.trim());
        if !console.run_line(line) {
            break;
        }
    }
    Ok(())
}

fn run_repl(console: &mut Console) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "Transaction endpoint console".bold().green());
    println!("Type ':help' for commands, ':quit' to exit\n");
    println!(
        "Serving transactions under {}",
        console.endpoint.config().base_uri.cyan()
    );

    let config = Config::builder()
        .edit_mode(EditMode::Emacs)
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .auto_add_history(false)
        .build();

    let mut rl = Editor::<(), _>::with_config(config)?;

    loop {
        let line = match rl.readline("txn> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        };

        if !line.trim().is_empty() {
            rl.add_history_entry(line.as_str())?;
        }
        if !console.run_line(&line) {
            println!("{}", "Goodbye!".green());
            break;
        }
    }

    Ok(())
}

fn print_help() {
    println!("{}", "Requests:".bold());
    println!("  POST /db/data/transaction [body]          begin a transaction");
    println!("  POST /db/data/transaction/commit [body]   run statements in one transaction");
    println!("  POST $tx [body]                           run statements in the last begun transaction");
    println!("  POST $tx/commit [body]                    commit the last begun transaction");
    println!("  DELETE $tx                                roll back the last begun transaction");
    println!();
    println!("  body: {{\"statements\": [{{\"statement\": \"CREATE (n) RETURN n\"}}]}}");
    println!();
    println!("{}", "Commands:".bold());
    println!("  :stats   transaction counters");
    println!("  :open    list open transactions");
    println!("  :sweep   expire idle transactions now");
    println!("  :help    show this help");
    println!("  :quit    exit");
}
