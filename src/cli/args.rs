//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Use this config file instead of the standard locations
//! - `--debug`: Enable debug logging

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// catalogctl - Inspect document catalog snapshot dumps
#[derive(Parser, Debug)]
#[command(name = "catalogctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to load
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the catalog tree of a snapshot dump
    #[command(
        name = "show",
        after_help = "\
EXAMPLES:
    # Tree view
    catalogctl show catalog.json

    # Canonical JSON, the form fingerprints are computed over
    catalogctl show catalog.json --json"
    )]
    Show {
        /// Snapshot dump (JSON)
        dump: PathBuf,

        /// Print the canonical JSON dump instead of a tree
        #[arg(long)]
        json: bool,
    },

    /// Check a snapshot dump against the catalog invariants
    #[command(
        name = "verify",
        long_about = "Check a snapshot dump against the catalog invariants.\n\n\
            Reports nested doc parts without a parent, doc part index columns \
            naming unknown fields, logical indexes missing a doc part index, and \
            doc part indexes no logical index anchors. Exits non-zero when any \
            violation is found."
    )]
    Verify {
        /// Snapshot dump (JSON)
        dump: PathBuf,
    },

    /// Print the content fingerprint of a snapshot dump
    Fingerprint {
        /// Snapshot dump (JSON)
        dump: PathBuf,
    },

    /// Print the effective configuration
    Config,
}
