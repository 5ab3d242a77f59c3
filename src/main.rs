use anyhow::Result;
use apollo::cli::Cli;
use apollo::command_handlers;
use apollo::context::AppContext;
use apollo::error::ApolloError;
use apollo::ui;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("APOLLO_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = exit_on_signal() {
        tracing::warn!("cannot install signal handler: {e}");
    }

    if let Err(e) = run(cli) {
        let apollo_err = e.downcast_ref::<ApolloError>();
        if matches!(apollo_err, Some(ApolloError::Interrupted)) {
            println!();
            std::process::exit(0);
        }
        // ApolloError already renders its io source
        let text = if e.is::<ApolloError>() {
            e.to_string()
        } else {
            format!("{e:#}")
        };
        ui::error(text);
        if let Some(hint) = apollo_err.and_then(ApolloError::hint) {
            ui::info(hint);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let ctx = AppContext::resolve(cli.home)?;
    ctx.ensure_dirs()?;
    tracing::debug!(root = %ctx.root.display(), "apollo home");
    command_handlers::dispatch::dispatch(cli.command, &ctx)
}

/// SIGINT/SIGTERM end apollo quietly with status 0. Launched applications
/// live in their own process groups and are not affected.
#[cfg(unix)]
fn exit_on_signal() -> std::io::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            tracing::debug!(signal = sig, "interrupted");
            println!();
            std::process::exit(0);
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn exit_on_signal() -> std::io::Result<()> {
    Ok(())
}
