//! Command-line interface for edit-validator.
//!
//! `validate` is the hook entry point and reads a JSON event from stdin.
//! The remaining commands manage the state the hook consults.

mod manage;
mod run;


pub use manage::{CooldownCommand, DiscoverKind, SkipCommand, UnskipCommand};
pub use run::{context_unavailable, exit_code_from_i32, run, CliContext, CliOutput};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lint and test the project after every edit.
///
/// Install `edit-validator validate` as a `PostToolUse` hook. After each
/// file edit it finds the project's lint and test commands, runs them in
/// parallel, and exits with code 2 and the failure output if either fails.
#[derive(Parser, Debug)]
#[command(name = "edit-validator")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate the file named in a hook event (stdin: JSON hook input).
    ///
    /// Flags override the config file and environment.
    Validate {
        /// Per-command timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Minimum seconds between validations of the same project (0 disables)
        #[arg(long)]
        cooldown: Option<u64>,

        /// Do not run the lint command
        #[arg(long)]
        skip_lint: bool,

        /// Do not run the test command
        #[arg(long)]
        skip_test: bool,

        /// Project root; found from the edited file when omitted
        #[arg(long)]
        project_root: Option<PathBuf>,
    },

    /// Skip lint, test, or both for a project, or inspect skips.
    #[command(subcommand)]
    Skip(SkipCommand),

    /// Re-enable lint, test, or both. With no kind, clears all skips for
    /// the current project.
    Unskip {
        /// What to re-enable
        #[command(subcommand)]
        kind: Option<UnskipCommand>,
    },

    /// Print the command validation would run for a project.
    Discover {
        /// Lint or test
        #[arg(value_enum)]
        kind: DiscoverKind,

        /// Directory to discover from (default: current directory)
        dir: Option<PathBuf>,
    },

    /// Manage cooldown stamps.
    #[command(subcommand)]
    Cooldown(CooldownCommand),

    /// Show version information.
    Version,
}

impl Command {
    /// Returns true if this command requires stdin input.
    #[must_use]
    pub const fn needs_stdin(&self) -> bool {
        matches!(self, Self::Validate { .. })
    }
}
