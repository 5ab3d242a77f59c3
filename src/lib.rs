//! Apollo: detect an application payload's kind and run it through the
//! matching compatibility runtime (Wine in LXC, Waydroid, Darling, or
//! directly).

pub mod cli;
pub mod command_handlers;
pub mod config;
pub mod context;
pub mod detect;
pub mod dispatcher;
pub mod error;
pub mod external;
pub mod platform;
pub mod run_registry;
pub mod runtime;
pub mod settings;
pub mod ui;
