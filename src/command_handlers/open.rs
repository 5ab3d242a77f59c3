use crate::context::AppContext;
use crate::dispatcher;
use crate::runtime::AdapterTable;
use crate::ui;
use anyhow::Result;

pub fn run_open(ctx: &AppContext, target: &str) -> Result<()> {
    let table = AdapterTable::new();
    let handle = dispatcher::open(ctx, &table, target)?;
    ui::success(format!("Launched {target} (pid {})", handle.pid()));
    if let Some(log) = handle.log_path() {
        ui::info(format!("Output is logged to {}", log.display()));
    }
    Ok(())
}
