use crate::context::AppContext;
use crate::run_registry;
use crate::ui;
use anyhow::Result;
use std::time::SystemTime;

pub fn run_clean(ctx: &AppContext) -> Result<()> {
    let report = run_registry::clean_logs(ctx, ctx.settings.log_retention(), SystemTime::now())?;
    run_registry::reset(ctx)?;
    ui::success(format!("Logs deleted: {}", report.deleted));
    ui::info(format!("Log directory size: {} bytes", report.remaining_bytes));
    Ok(())
}
