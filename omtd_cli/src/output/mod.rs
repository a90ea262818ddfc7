use crate::cli::OutputFormat;
use crate::commands::Result;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};
use omtd_core::{Facet, SearchResult};
use owo_colors::OwoColorize;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum OutputData {
    SearchResults { keyword: String, result: SearchResult },
    Source(String),
}

pub fn format_output(data: &OutputData, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(data)?);
        }
        OutputFormat::Pretty => format_pretty(data),
    }
    Ok(())
}

fn format_pretty(data: &OutputData) {
    match data {
        OutputData::SearchResults { keyword, result } => {
            let keyword = if keyword.is_empty() { "*" } else { keyword.as_str() };
            println!(
                "{} {} {}",
                "Search".bold().cyan(),
                format!("'{}'", keyword).bold(),
                hits_summary(result).dimmed()
            );

            for facet in &result.facets {
                println!();
                println!("{}", facet.label.bold());
                println!("{}", facet_table(facet));
            }

            if !result.publications.is_empty() {
                println!();
                println!("{}", "Records".bold());
                for (offset, record) in result.publications.iter().enumerate() {
                    println!(
                        "{} {}",
                        format!("{:>4}.", result.from + offset + 1).dimmed(),
                        preview(record, 160)
                    );
                }
            }
        }
        OutputData::Source(name) => println!("{}", name.bold()),
    }
}

pub fn hits_summary(result: &SearchResult) -> String {
    if result.total_hits == 0 {
        return "(no hits)".to_string();
    }
    format!(
        "({}-{} of {} hits)",
        result.from + 1,
        result.to,
        result.total_hits
    )
}

fn facet_table(facet: &Facet) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Value", "Label", "Count"]);
    for value in &facet.values {
        table.add_row(vec![
            Cell::new(&value.value),
            Cell::new(&value.label),
            Cell::new(value.count),
        ]);
    }
    table
}

/// Single-line preview of a record, cut at `max` characters.
pub fn preview(record: &str, max: usize) -> String {
    let flat: String = record.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max).collect();
        format!("{}…", cut)
    }
}
