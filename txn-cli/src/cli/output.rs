// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Response formatting for CLI output

use super::commands::OutputFormat;
use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use txn_endpoint::{ResultEntry, TransactionResponse, TransactionStatistics, Value};

/// Response formatter for different output formats
pub struct ResponseFormatter;

impl ResponseFormatter {
    pub fn format(response: &TransactionResponse, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => Self::format_table(response),
            OutputFormat::Json => Self::format_json(response),
        }
    }

    fn status_line(response: &TransactionResponse) -> String {
        let status = response.status.to_string();
        if response.status.is_success() && response.body.errors.is_empty() {
            status.green().bold().to_string()
        } else if response.status.is_success() {
            status.yellow().bold().to_string()
        } else {
            status.red().bold().to_string()
        }
    }

    /// Status, headers and one table per statement result
    fn format_table(response: &TransactionResponse) -> String {
        let mut output = String::new();
        output.push_str(&format!("{}\n", Self::status_line(response)));

        if let Some(location) = &response.location {
            output.push_str(&format!("Location: {}\n", location.cyan()));
        }
        if let Some(commit) = &response.body.commit {
            output.push_str(&format!("Commit:   {}\n", commit));
        }
        if let Some(transaction) = &response.body.transaction {
            output.push_str(&format!("Expires:  {}\n", transaction.expires));
        }

        for (i, result) in response.body.results.iter().enumerate() {
            output.push_str(&format!(
                "\n{} ({} row(s))\n",
                format!("Statement {}", i + 1).bold(),
                result.data.len()
            ));
            output.push_str(&Self::result_table(result));
            output.push('\n');
        }

        if !response.body.errors.is_empty() {
            output.push_str(&format!("\n{}\n", "Errors:".bold().red()));
            for error in &response.body.errors {
                output.push_str(&format!(
                    "  {}: {}\n",
                    error.code.to_string().red(),
                    error.message
                ));
            }
        }

        output
    }

    fn result_table(result: &ResultEntry) -> String {
        if result.columns.is_empty() {
            return format!("{}", "No columns".yellow());
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);

        let header_cells: Vec<Cell> = result
            .columns
            .iter()
            .map(|col| Cell::new(col).fg(Color::Green))
            .collect();
        table.set_header(header_cells);

        for row in &result.data {
            let row_values: Vec<String> = row.values().iter().map(Self::value_to_string).collect();
            table.add_row(row_values);
        }

        table.to_string()
    }

    fn value_to_string(value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::String(s) => format!("'{}'", s),
            Value::Node(_) => value.to_json().to_string(),
            other => other.to_string(),
        }
    }

    fn format_json(response: &TransactionResponse) -> String {
        let mut output = String::new();
        output.push_str(&format!("{}\n", Self::status_line(response)));
        if let Some(location) = &response.location {
            output.push_str(&format!("Location: {}\n", location));
        }
        let body = serde_json::to_string_pretty(&response.body.to_json())
            .unwrap_or_else(|_| response.body.to_json_string());
        output.push_str(&body);
        output
    }

    pub fn format_statistics(stats: &TransactionStatistics) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            Cell::new("open").fg(Color::Green),
            Cell::new("created").fg(Color::Green),
            Cell::new("committed").fg(Color::Green),
            Cell::new("rolled back").fg(Color::Green),
            Cell::new("expired").fg(Color::Green),
        ]);
        table.add_row(vec![
            stats.open.to_string(),
            stats.created.to_string(),
            stats.committed.to_string(),
            stats.rolled_back.to_string(),
            stats.expired.to_string(),
        ]);
        table.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txn_endpoint::{DataEntry, ErrorKind, ErrorRecord, ResponseEnvelope, StatusCode};

    fn response_with_rows() -> TransactionResponse {
        let mut body = ResponseEnvelope::new();
        body.push_result(ResultEntry {
            columns: vec!["name".to_string(), "age".to_string()],
            data: vec![DataEntry::Row(vec![Value::from("Alice"), Value::Integer(30)])],
        });
        TransactionResponse::new(StatusCode::Ok, body)
    }

    #[test]
    fn test_table_output_contains_rows() {
        colored::control::set_override(false);
        let output = ResponseFormatter::format(&response_with_rows(), OutputFormat::Table);
        assert!(output.starts_with("200 OK"));
        assert!(output.contains("'Alice'"));
        assert!(output.contains("30"));
        assert!(!output.contains("Errors:"));
    }

    #[test]
    fn test_table_output_lists_errors() {
        colored::control::set_override(false);
        let response = TransactionResponse::error(
            StatusCode::NotFound,
            ErrorRecord::new(ErrorKind::InvalidTransactionId, "Unrecognized transaction id 9"),
        );
        let output = ResponseFormatter::format(&response, OutputFormat::Table);
        assert!(output.contains("404 Not Found"));
        assert!(output.contains("InvalidTransactionId: Unrecognized transaction id 9"));
    }

    #[test]
    fn test_json_output_is_the_body() {
        colored::control::set_override(false);
        let output = ResponseFormatter::format(&response_with_rows(), OutputFormat::Json);
        let json_start = output.find('{').unwrap();
        let body: serde_json::Value = serde_json::from_str(&output[json_start..]).unwrap();
        assert_eq!(body["results"][0]["data"][0][0], "Alice");
        assert_eq!(body["errors"], serde_json::json!([]));
    }
}
