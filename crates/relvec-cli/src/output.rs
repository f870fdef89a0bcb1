//! Statement output formatting.

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use serde::Serialize;

use relvec_core::SqlValue;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Text,
    Json,
}

/// A generated statement as printed by every subcommand.
#[derive(Debug, Serialize)]
pub struct Rendered {
    pub sql: String,
    pub params: Vec<SqlValue>,
    /// Metadata fields projected for keyword search.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub projected: Vec<String>,
}

/// Print a statement in the requested format
pub fn print(rendered: &Rendered, format: Format) -> anyhow::Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(rendered)?),
        Format::Text => print_text(rendered),
    }
    Ok(())
}

fn print_text(rendered: &Rendered) {
    if rendered.sql.is_empty() {
        println!("{}", "(empty predicate)".dimmed());
    } else {
        println!("{}", rendered.sql);
    }

    if !rendered.projected.is_empty() {
        println!("{} {}", "Projected:".bold(), rendered.projected.join(", "));
    }

    if rendered.params.is_empty() {
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").fg(Color::Cyan),
            Cell::new("Param").fg(Color::Cyan),
        ]);
    for (i, param) in rendered.params.iter().enumerate() {
        table.add_row(vec![Cell::new(i + 1), Cell::new(param.to_string())]);
    }
    println!("{table}");
}
