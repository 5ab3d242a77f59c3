use crate::command_handlers::info::print_record;
use crate::config::{self, AppRecord, Mount, NetworkMode};
use crate::context::AppContext;
use crate::error::{ApolloError, Result as ApolloResult};
use crate::ui::{self, Prompter};
use anyhow::{bail, Context, Result};
use std::process::Command;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOutcome {
    Save,
    Discard,
}

pub fn run_conf(ctx: &AppContext, name: &str) -> Result<()> {
    config::validate_name(name)?;
    if !config::exists(ctx, name) {
        return Err(ApolloError::ConfigNotFound {
            name: name.to_string(),
        }
        .into());
    }
    let mut prompter = Prompter::new()?;
    ui::heading(format!("Editing settings: {name}"));
    println!("How do you want to edit them?");
    println!("  1. Interactive menu");
    println!("  2. Text editor");
    match prompter.ask("Choice [1/2]: ")?.as_str() {
        "1" => {
            let mut rec = config::load(ctx, name);
            let mut ask = |p: &str| prompter.ask(p);
            match edit_menu(&mut rec, &mut ask)? {
                MenuOutcome::Save => {
                    config::save(ctx, name, &rec)?;
                    ui::success(format!("Settings for '{name}' saved"));
                }
                MenuOutcome::Discard => ui::info("Leaving without saving"),
            }
            Ok(())
        }
        "2" => open_in_editor(ctx, name),
        _ => {
            ui::error("Invalid choice");
            Ok(())
        }
    }
}

/// `$EDITOR`, then `$VISUAL`, then the `editor` setting, then nano.
pub fn pick_editor(
    editor: Option<String>,
    visual: Option<String>,
    configured: Option<&str>,
) -> String {
    [editor, visual, configured.map(str::to_string)]
        .into_iter()
        .flatten()
        .find(|e| !e.trim().is_empty())
        .unwrap_or_else(|| "nano".to_string())
}

fn open_in_editor(ctx: &AppContext, name: &str) -> Result<()> {
    let path = ctx.config_file(name);
    if !path.exists() {
        // legacy file: rewrite as TOML first so the user edits the current format
        config::save(ctx, name, &config::load(ctx, name))?;
    }
    let editor = pick_editor(
        std::env::var("EDITOR").ok(),
        std::env::var("VISUAL").ok(),
        ctx.settings.editor.as_deref(),
    );
    let mut parts = editor.split_whitespace();
    let program = parts.next().context("empty editor command")?;
    ui::info(format!("Opening settings in {editor}..."));
    debug!(editor = %editor, path = %path.display(), "spawning editor");
    let status = Command::new(program)
        .args(parts)
        .arg(&path)
        .status()
        .with_context(|| format!("failed to start editor '{editor}'"))?;
    if !status.success() {
        bail!("editor '{editor}' exited with {status}");
    }
    let data = fs_err::read_to_string(&path)?;
    match AppRecord::from_toml(name, &data) {
        Ok(_) => ui::success("Settings saved"),
        Err(e) => ui::warning(format!(
            "Settings file no longer parses ({}); defaults will be used where it is invalid",
            e.to_string().lines().next().unwrap_or_default()
        )),
    }
    Ok(())
}

fn show_menu() {
    println!("What do you want to change?");
    println!("  1. Name");
    println!("  2. Description");
    println!("  3. Environment variables");
    println!("  4. Command-line arguments");
    println!("  5. Working directory");
    println!("  6. Network mode");
    println!("  7. Mounts");
    println!("  8. Show current settings");
    println!("  9. Save and exit");
    println!("  0. Exit without saving");
}

/// The interactive menu loop. `ask` supplies one line of input per prompt.
pub fn edit_menu(
    rec: &mut AppRecord,
    ask: &mut dyn FnMut(&str) -> ApolloResult<String>,
) -> ApolloResult<MenuOutcome> {
    println!("Kind: {}", rec.kind);
    println!(
        "Payload: {}",
        rec.path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "not set".into())
    );
    println!();
    loop {
        show_menu();
        match ask("Choose an option [0-9]: ")?.as_str() {
            "1" => {
                let name = ask("New name: ")?;
                if !name.is_empty() {
                    rec.name = name;
                    ui::success("Name updated");
                }
            }
            "2" => {
                rec.description = ask("Description: ")?;
                ui::success("Description updated");
            }
            "3" => edit_environment(rec, ask)?,
            "4" => {
                rec.arguments = ask("Arguments: ")?;
                ui::success("Arguments updated");
            }
            "5" => {
                rec.working_dir = ask("Working directory (empty for default): ")?;
                ui::success("Working directory updated");
            }
            "6" => {
                println!("Current network mode: {}", rec.network);
                println!("Available: nat, bridge, host, none");
                match ask("New network mode: ")?.parse::<NetworkMode>() {
                    Ok(mode) => {
                        rec.network = mode;
                        ui::success("Network mode updated");
                    }
                    Err(e) => ui::error(e),
                }
            }
            "7" => edit_mounts(rec, ask)?,
            "8" => {
                println!();
                print_record(rec);
                println!();
            }
            "9" => return Ok(MenuOutcome::Save),
            "0" => return Ok(MenuOutcome::Discard),
            _ => ui::error("Invalid choice"),
        }
        println!();
    }
}

fn edit_environment(
    rec: &mut AppRecord,
    ask: &mut dyn FnMut(&str) -> ApolloResult<String>,
) -> ApolloResult<()> {
    println!("Current environment:");
    for (k, v) in &rec.environment {
        println!("  {k}={v}");
    }
    match ask("Add (a), delete (d) or clear (c)? ")?.to_ascii_lowercase().as_str() {
        "a" => {
            let key = ask("Variable name: ")?;
            let value = ask(&format!("Value of {key}: "))?;
            if !key.is_empty() {
                ui::success(format!("Variable {key} added"));
                rec.environment.insert(key, value);
            }
        }
        "d" => {
            let key = ask("Variable to delete: ")?;
            if rec.environment.remove(&key).is_some() {
                ui::success(format!("Variable {key} deleted"));
            }
        }
        "c" => {
            rec.environment.clear();
            ui::success("Environment cleared");
        }
        _ => {}
    }
    Ok(())
}

fn edit_mounts(
    rec: &mut AppRecord,
    ask: &mut dyn FnMut(&str) -> ApolloResult<String>,
) -> ApolloResult<()> {
    println!("Current mounts:");
    for (i, m) in rec.mounts.iter().enumerate() {
        println!("  {}. {m}", i + 1);
    }
    match ask("Add (a), delete (d) or clear (c)? ")?.to_ascii_lowercase().as_str() {
        "a" => {
            let host = ask("Host path: ")?;
            let container = ask("Container path: ")?;
            if !host.is_empty() && !container.is_empty() {
                rec.mounts.push(Mount { host, container });
                ui::success("Mount added");
            }
        }
        "d" => {
            let idx = ask("Number to delete: ")?.parse::<usize>().ok();
            match idx.filter(|i| (1..=rec.mounts.len()).contains(i)) {
                Some(i) => {
                    let removed = rec.mounts.remove(i - 1);
                    ui::success(format!("Removed {removed}"));
                }
                None => ui::error("Invalid number"),
            }
        }
        "c" => {
            rec.mounts.clear();
            ui::success("All mounts cleared");
        }
        _ => {}
    }
    Ok(())
}
