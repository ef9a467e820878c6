//! Output formatting for the command line.
//!
//! Renders explorer results as an ASCII table (like the MySQL CLI), a markdown
//! table, or JSON.

use crate::models::{PersistedConnection, Table, TabularResult, mask_dsn};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

/// Output format for printed results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// ASCII table format (like MySQL CLI)
    #[default]
    Table,
    /// Markdown table format
    Markdown,
    /// JSON object with columns and rows
    Json,
}

pub fn format_result(result: &TabularResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_as_table(result),
        OutputFormat::Markdown => format_as_markdown(result),
        OutputFormat::Json => to_json(result),
    }
}

pub fn format_tables(tables: &[Table], format: OutputFormat) -> String {
    let mut result = TabularResult::new(vec!["schema".to_string(), "name".to_string()]);
    for table in tables {
        result.push_row(vec![table.schema.clone(), table.name.clone()]);
    }
    match format {
        OutputFormat::Json => to_json(tables),
        _ => format_result(&result, format),
    }
}

/// Recent connections, passwords masked.
pub fn format_connections(connections: &[PersistedConnection], format: OutputFormat) -> String {
    let mut result = TabularResult::new(vec![
        "name".to_string(),
        "dsn".to_string(),
        "last_used_at".to_string(),
    ]);
    for conn in connections {
        result.push_row(vec![
            conn.name.clone(),
            mask_dsn(&conn.dsn),
            conn.last_used_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }
    format_result(&result, format)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

/// Pad to a display width; `format!` widths count chars, not terminal columns.
fn pad(text: &str, width: usize, right_align: bool) -> String {
    let fill = " ".repeat(width.saturating_sub(text.width()));
    if right_align {
        format!("{fill}{text}")
    } else {
        format!("{text}{fill}")
    }
}

fn looks_numeric(value: &str) -> bool {
    !value.is_empty() && value.parse::<f64>().is_ok()
}

pub fn format_as_table(result: &TabularResult) -> String {
    if result.columns.is_empty() {
        return "Empty set\n".to_string();
    }

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.width()).collect();
    for row in &result.rows {
        for (i, value) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(value.width());
            }
        }
    }

    let mut output = String::new();
    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    output.push_str(&separator);
    let header: String = result
        .columns
        .iter()
        .zip(&widths)
        .map(|(col, w)| format!("| {} ", pad(col, *w, false)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);
    output.push_str(&separator);

    for row in &result.rows {
        let row_str: String = row
            .iter()
            .zip(&widths)
            .map(|(value, w)| format!("| {} ", pad(value, *w, looks_numeric(value))))
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&separator);

    let row_count = result.row_count();
    let row_text = if row_count == 1 { "row" } else { "rows" };
    output.push_str(&format!("{} {} in set\n", row_count, row_text));

    output
}

pub fn format_as_markdown(result: &TabularResult) -> String {
    if result.columns.is_empty() {
        return "*Empty set*\n".to_string();
    }

    let mut output = String::new();

    let header: String = result
        .columns
        .iter()
        .map(|c| format!("| {} ", c))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);

    let sep: String = result.columns.iter().map(|_| "|---").collect::<String>() + "|\n";
    output.push_str(&sep);

    for row in &result.rows {
        let row_str: String = row
            .iter()
            .map(|value| format!("| {} ", value.replace('|', "\\|")))
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&format!("\n*{} rows*\n", result.row_count()));

    output
}
