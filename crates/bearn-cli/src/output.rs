// crates/bearn-cli/src/output.rs
//
// Output formatting utilities for the Bearn CLI.
// Supports table and JSON output modes.

use serde::Serialize;
use tabled::{Table, Tabled};

use bearn_economics::Bfi;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed table output (default).
    Table,
    /// JSON output for machine consumption.
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        }
    }
}

/// Format a slice of Tabled items as a table string.
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    Table::new(data).to_string()
}

/// Format a serializable value as a pretty-printed JSON string.
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("JSON serialization error: {}", e))
}

/// An 18-decimal amount as a plain decimal string, without a unit.
pub fn decimal(wei: u128) -> String {
    let formatted = Bfi::from_wei(wei).to_string();
    formatted.trim_end_matches(" BFI").to_string()
}

/// A token amount in base units as a decimal string with `decimals` places,
/// trailing zeros trimmed.
pub fn decimal_units(amount: u128, decimals: u8) -> String {
    let Some(scale) = 10u128.checked_pow(decimals as u32) else {
        return amount.to_string();
    };
    let whole = amount / scale;
    let frac = amount % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
