use crate::config;
use crate::context::AppContext;
use crate::error::{ApolloError, Result as ApolloResult};
use crate::ui::{self, Prompter};
use anyhow::Result;
use crossterm::style::Stylize;
use std::path::PathBuf;

/// Files and directories that removing `name` deletes.
pub fn removal_targets(ctx: &AppContext, name: &str) -> Vec<PathBuf> {
    [
        ctx.config_file(name),
        ctx.legacy_config_file(name),
        ctx.app_dir(name),
    ]
    .into_iter()
    .filter(|p| p.exists())
    .collect()
}

pub fn run_remove(ctx: &AppContext, name: &str, yes: bool) -> Result<()> {
    let mut prompter: Option<Prompter> = None;
    remove_with(ctx, name, &mut |question: &str| {
        if yes {
            return Ok(true);
        }
        if prompter.is_none() {
            prompter = Some(Prompter::new()?);
        }
        prompter.as_mut().map_or(Ok(false), |p| p.confirm(question))
    })
}

/// Show what will be deleted, ask `confirm`, then delete on a yes.
pub fn remove_with(
    ctx: &AppContext,
    name: &str,
    confirm: &mut dyn FnMut(&str) -> ApolloResult<bool>,
) -> Result<()> {
    config::validate_name(name)?;
    if !config::exists(ctx, name) {
        return Err(ApolloError::ConfigNotFound {
            name: name.to_string(),
        }
        .into());
    }
    println!("{}", "The following will be deleted:".red());
    for path in removal_targets(ctx, name) {
        println!("  • {}", path.display());
    }
    if !confirm(&format!("Remove application '{name}'?"))? {
        ui::info("Removal cancelled");
        return Ok(());
    }
    remove_app(ctx, name)?;
    ui::success(format!("Application '{name}' removed"));
    Ok(())
}

/// Delete the settings and the copied payload directory.
pub fn remove_app(ctx: &AppContext, name: &str) -> Result<()> {
    config::remove(ctx, name)?;
    let dir = ctx.app_dir(name);
    if dir.exists() {
        fs_err::remove_dir_all(&dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppRecord;
    use crate::settings::Settings;

    fn with_quake() -> (tempfile::TempDir, AppContext) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppContext::with_settings(dir.path().to_path_buf(), Settings::default());
        ctx.ensure_dirs().unwrap();
        std::fs::create_dir_all(ctx.app_dir("Quake")).unwrap();
        std::fs::write(ctx.app_dir("Quake").join("quake.exe"), b"MZ").unwrap();
        config::save(&ctx, "Quake", &AppRecord::new("Quake")).unwrap();
        (dir, ctx)
    }

    #[test]
    fn removes_settings_and_payload_dir() {
        let (_dir, ctx) = with_quake();

        assert_eq!(
            removal_targets(&ctx, "Quake"),
            vec![ctx.config_file("Quake"), ctx.app_dir("Quake")]
        );
        run_remove(&ctx, "Quake", true).unwrap();
        assert!(!config::exists(&ctx, "Quake"));
        assert!(!ctx.app_dir("Quake").exists());
    }

    #[test]
    fn unknown_name_is_config_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppContext::with_settings(dir.path().to_path_buf(), Settings::default());
        let err = run_remove(&ctx, "ghost", true).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ApolloError>(),
            Some(ApolloError::ConfigNotFound { .. })
        ));
    }

    #[test]
    fn answering_no_keeps_everything() {
        let (_dir, ctx) = with_quake();
        let mut asked = Vec::new();
        remove_with(&ctx, "Quake", &mut |q: &str| {
            asked.push(q.to_string());
            Ok(ui::is_yes("n"))
        })
        .unwrap();
        assert_eq!(asked, vec!["Remove application 'Quake'?".to_string()]);
        assert!(ctx.config_file("Quake").exists());
        assert!(ctx.app_dir("Quake").join("quake.exe").exists());
    }

    #[test]
    fn empty_or_dotted_names_never_touch_the_apps_dir() {
        let (_dir, ctx) = with_quake();
        for bad in ["", ".", "..", "Quake/.."] {
            let err = remove_with(&ctx, bad, &mut |_: &str| Ok(true)).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<ApolloError>(),
                Some(ApolloError::InvalidName { .. })
            ));
        }
        assert!(ctx.apps_dir.is_dir());
        assert!(ctx.app_dir("Quake").join("quake.exe").exists());
        assert!(config::exists(&ctx, "Quake"));
    }
}
