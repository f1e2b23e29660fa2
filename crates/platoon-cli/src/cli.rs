//! CLI argument definitions for Platoon.
//!
//! Uses `clap` derive macros to define the command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "platoon",
    version,
    about = "Dependency resolution with platform alignment",
    long_about = "Platoon resolves a module dependency graph to one version per module, \
                  aligning modules that belong to the same platform and iterating until \
                  the alignment is stable."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a request against module catalogs
    Resolve {
        /// Resolution request (TOML)
        #[arg(short, long)]
        request: PathBuf,
        /// Module catalog (TOML); may be given more than once
        #[arg(short, long = "catalog")]
        catalogs: Vec<PathBuf>,
        /// Output format
        #[arg(short, long, default_value = "tree", value_parser = ["tree", "list", "json"])]
        format: String,
        /// Maximum tree depth
        #[arg(long)]
        depth: Option<u32>,
        /// Explain why a module is included
        #[arg(long)]
        why: Option<String>,
        /// Show the dependents of a module
        #[arg(long)]
        inverted: Option<String>,
        /// Show version conflicts
        #[arg(long)]
        conflicts: bool,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn resolve_collects_catalogs() {
        let cli = Cli::try_parse_from([
            "platoon", "resolve", "-r", "req.toml", "-c", "a.toml", "--catalog", "b.toml",
        ])
        .unwrap();
        match cli.command {
            Command::Resolve {
                catalogs, format, ..
            } => {
                assert_eq!(catalogs.len(), 2);
                assert_eq!(format, "tree");
            }
        }
    }
}
