use crate::cli::Commands;
use crate::command_handlers::{add, clean, conf, info, list, open, remove};
use crate::context::AppContext;
use anyhow::Result;

pub fn dispatch(cmd: Commands, ctx: &AppContext) -> Result<()> {
    match cmd {
        Commands::Open { target } => open::run_open(ctx, &target),
        Commands::Add { path, name } => add::run_add(ctx, &path, name.as_deref()).map(drop),
        Commands::List => list::run_list(ctx),
        Commands::Conf { name } => conf::run_conf(ctx, &name),
        Commands::Remove { name, yes } => remove::run_remove(ctx, &name, yes),
        Commands::Info { name } => match name {
            Some(name) => info::app_info(ctx, &name),
            None => info::system_info(ctx),
        },
        Commands::Clean => clean::run_clean(ctx),
        Commands::Version => {
            println!("apollo {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
