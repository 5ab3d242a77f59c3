use crate::config::{self, AppRecord};
use crate::context::AppContext;
use crate::error::ApolloError;
use crate::external;
use crate::runtime::container::Container;
use crate::ui;
use anyhow::Result;
use crossterm::style::Stylize;
use std::path::Path;

const RULE_WIDTH: usize = 50;

pub fn system_info(ctx: &AppContext) -> Result<()> {
    ui::heading(format!("Apollo v{}", env!("CARGO_PKG_VERSION")));
    println!("{}", "Directories:".cyan());
    println!("  Settings:     {}", ctx.configs_dir.display());
    println!("  Applications: {}", ctx.apps_dir.display());
    println!("  Logs:         {}", ctx.logs_dir.display());
    println!();

    println!("{}", "Dependencies:".cyan());
    for dep in external::ALL {
        println!("  {} {}", ui::glyph(dep.is_present()), dep.name);
    }
    println!();

    println!("{}", "Statistics:".cyan());
    println!("  Registered applications: {}", config::list_names(ctx)?.len());
    println!("  Container {}: {}", ctx.container(), container_status(ctx));
    Ok(())
}

fn container_status(ctx: &AppContext) -> String {
    if !external::LXC.is_present() {
        return "lxc not installed".to_string();
    }
    match Container::from_ctx(ctx).state() {
        Ok(state) => state.label().to_string(),
        Err(e) => format!("unknown ({e})"),
    }
}

pub fn app_info(ctx: &AppContext, name: &str) -> Result<()> {
    config::validate_name(name)?;
    if !config::exists(ctx, name) {
        return Err(ApolloError::ConfigNotFound {
            name: name.to_string(),
        }
        .into());
    }
    let rec = config::load(ctx, name);
    ui::heading(format!("Application: {name}"));
    println!("{}", "-".repeat(RULE_WIDTH));
    print_record(&rec);
    println!("{}", "-".repeat(RULE_WIDTH));
    match rec.path.as_deref() {
        Some(path) if path.exists() => {
            ui::info(format!("Payload present: {} ({} bytes)", path.display(), payload_size(path)))
        }
        Some(path) => ui::warning(format!("Payload not found: {}", path.display())),
        None => ui::warning("Payload not found: no path recorded"),
    }
    Ok(())
}

/// One `key: value` line per field, collections indented below their key.
pub fn print_record(rec: &AppRecord) {
    fn field(k: &str, v: &dyn std::fmt::Display) {
        println!("{} {v}", format!("{k}:").yellow());
    }
    field("name", &rec.name);
    field("kind", &rec.kind);
    field(
        "path",
        &rec.path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
    );
    field("description", &rec.description);
    field("network", &rec.network);
    field("arguments", &rec.arguments);
    field("working_dir", &rec.working_dir);
    println!("{}", "environment:".yellow());
    for (k, v) in &rec.environment {
        println!("  {k} = {v}");
    }
    println!("{}", "mounts:".yellow());
    for m in &rec.mounts {
        println!("  - {m}");
    }
}

/// Size of a file, or of every file under a bundle directory.
pub fn payload_size(path: &Path) -> u64 {
    let Ok(meta) = fs_err::metadata(path) else {
        return 0;
    };
    if !meta.is_dir() {
        return meta.len();
    }
    fs_err::read_dir(path)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| payload_size(&e.path()))
                .sum()
        })
        .unwrap_or(0)
}
