use crate::config::{self, AppRecord};
use crate::context::AppContext;
use crate::ui;
use anyhow::Result;
use crossterm::style::Stylize;

const RULE_WIDTH: usize = 50;
const DESCRIPTION_WIDTH: usize = 50;

/// One table row, before colors are applied.
#[derive(Debug, PartialEq, Eq)]
pub struct Row {
    pub present: bool,
    pub name: String,
    pub kind: &'static str,
    pub description: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Listing {
    Empty,
    Table(Vec<Row>),
}

pub fn listing(records: &[(String, AppRecord)]) -> Listing {
    if records.is_empty() {
        return Listing::Empty;
    }
    let rows = records
        .iter()
        .map(|(name, rec)| Row {
            present: rec.payload_exists(),
            name: name.clone(),
            kind: rec.kind.as_str(),
            description: ui::truncate(&rec.description, DESCRIPTION_WIDTH).to_string(),
        })
        .collect();
    Listing::Table(rows)
}

pub fn run_list(ctx: &AppContext) -> Result<()> {
    let records: Vec<(String, AppRecord)> = config::list_names(ctx)?
        .into_iter()
        .map(|name| {
            let rec = config::load(ctx, &name);
            (name, rec)
        })
        .collect();
    let rows = match listing(&records) {
        Listing::Empty => {
            ui::info("No applications registered");
            return Ok(());
        }
        Listing::Table(rows) => rows,
    };
    ui::heading("Registered applications:");
    println!("{}", "-".repeat(RULE_WIDTH));
    for row in &rows {
        println!(
            "{} {} {} {}",
            ui::glyph(row.present),
            format!("{:<20}", row.name).cyan(),
            format!("{:<10}", row.kind).yellow(),
            row.description
        );
    }
    println!("{}", "-".repeat(RULE_WIDTH));
    ui::info(format!("Total applications: {}", rows.len()));
    Ok(())
}
