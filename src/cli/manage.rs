//! Subcommands for the skip registry, discovery, and cooldowns.

use crate::discovery::CommandKind;
use crate::skip::SkipKind;
use clap::{Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// Skip registry commands.
///
/// Skips are recorded per project root, so skipping from a subdirectory
/// applies to the whole project.
///
/// ```bash
/// # Stop running the (slow) test suite after edits
/// edit-validator skip test
///
/// # See what is skipped where
/// edit-validator skip list
/// ```
#[derive(Subcommand, Debug, Clone)]
pub enum SkipCommand {
    /// Never run the lint command here.
    Lint {
        /// Project directory (default: current directory)
        dir: Option<PathBuf>,
    },

    /// Never run the test command here.
    Test {
        /// Project directory (default: current directory)
        dir: Option<PathBuf>,
    },

    /// Run neither command here.
    All {
        /// Project directory (default: current directory)
        dir: Option<PathBuf>,
    },

    /// List every project with skips.
    List,

    /// Show the skips for one project.
    Status {
        /// Project directory (default: current directory)
        dir: Option<PathBuf>,
    },
}

impl SkipCommand {
    /// The kind being added and its target, for the three adding variants.
    #[must_use]
    pub fn target(&self) -> Option<(SkipKind, Option<&Path>)> {
        match self {
            Self::Lint { dir } => Some((SkipKind::Lint, dir.as_deref())),
            Self::Test { dir } => Some((SkipKind::Test, dir.as_deref())),
            Self::All { dir } => Some((SkipKind::All, dir.as_deref())),
            Self::List | Self::Status { .. } => None,
        }
    }
}

/// What `unskip` re-enables.
#[derive(Subcommand, Debug, Clone)]
pub enum UnskipCommand {
    /// Run the lint command again.
    Lint {
        /// Project directory (default: current directory)
        dir: Option<PathBuf>,
    },

    /// Run the test command again.
    Test {
        /// Project directory (default: current directory)
        dir: Option<PathBuf>,
    },

    /// Run both commands again.
    All {
        /// Project directory (default: current directory)
        dir: Option<PathBuf>,
    },
}

impl UnskipCommand {
    /// The kind being removed and its target.
    #[must_use]
    pub fn target(&self) -> (SkipKind, Option<&Path>) {
        match self {
            Self::Lint { dir } => (SkipKind::Lint, dir.as_deref()),
            Self::Test { dir } => (SkipKind::Test, dir.as_deref()),
            Self::All { dir } => (SkipKind::All, dir.as_deref()),
        }
    }
}

/// Which command `discover` looks for.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverKind {
    /// The lint command.
    Lint,
    /// The test command.
    Test,
}

impl From<DiscoverKind> for CommandKind {
    fn from(kind: DiscoverKind) -> Self {
        match kind {
            DiscoverKind::Lint => Self::Lint,
            DiscoverKind::Test => Self::Test,
        }
    }
}

/// Cooldown commands.
#[derive(Subcommand, Debug, Clone)]
pub enum CooldownCommand {
    /// Forget when a project was last validated, so the next edit runs.
    Clear {
        /// Project directory (default: current directory)
        dir: Option<PathBuf>,
    },
}
