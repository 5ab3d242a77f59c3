use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    version,
    name = "apollo",
    about = "Apollo: run Windows, Android, macOS and Linux apps through compatibility runtimes"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory (defaults to ~/.apollo)
    #[arg(long, global = true, env = "APOLLO_HOME", value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Log debug output to stderr (APOLLO_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch a payload file, or a registered application by name.
    /// Examples:
    ///   apollo open ~/Downloads/setup.exe
    ///   apollo open Quake
    Open {
        #[arg(value_name = "PATH_OR_NAME")]
        target: String,
    },
    /// Copy a payload into the apps directory and register it
    Add {
        path: PathBuf,
        /// Registered name (defaults to the file stem)
        #[arg(long)]
        name: Option<String>,
    },
    /// List registered applications
    List,
    /// Edit an application's settings (interactive menu or $EDITOR)
    Conf { name: String },
    /// Delete an application's payload and settings
    Remove {
        name: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Show system status, or one application's settings
    Info { name: Option<String> },
    /// Delete old logs and reset the run registry
    Clean,
    /// Print the version
    Version,
}
