//! Output formatting utilities

use crate::error::CliResult;
use colored::*;
use serde::Serialize;

pub fn print_json<T: Serialize>(data: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Print a bare value so scripts can capture it.
pub fn print_value(value: &str) {
    println!("{}", value);
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

pub fn print_none(what: &str) {
    println!("{}", format!("no {}", what).dimmed());
}
