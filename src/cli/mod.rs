//! CLI command definitions for task-manager
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod export;

use clap::{Parser, Subcommand};
use export::ExportArgs;

/// Single-user task tracker with a web interface
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Address to listen on (overrides config)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web server (default if no subcommand given)
    Serve,

    /// Write all tasks as a JSON array
    Export(ExportArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["task-manager"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log, "2");
        assert!(!cli.verbose);
    }

    #[test]
    fn global_overrides_after_subcommand() {
        let cli = Cli::try_parse_from([
            "task-manager",
            "serve",
            "--port",
            "8080",
            "--database",
            "/tmp/t.db",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Command::Serve)));
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.database.as_deref(), Some("/tmp/t.db"));
    }

    #[test]
    fn export_flags() {
        let cli = Cli::try_parse_from([
            "task-manager",
            "export",
            "-o",
            "tasks.json",
            "--pending-only",
        ])
        .unwrap();
        let Some(Command::Export(args)) = cli.command else {
            panic!("expected export");
        };
        assert_eq!(args.output.as_deref(), Some(std::path::Path::new("tasks.json")));
        assert!(args.pending_only);
        assert!(!args.compact);
    }

    #[test]
    fn rejects_bad_port() {
        assert!(Cli::try_parse_from(["task-manager", "--port", "99999"]).is_err());
    }
}
