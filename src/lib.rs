//! # `edit_validator`
//!
//! Runs a project's lint and test commands after an assistant edits a file,
//! and reports failures back so they are fixed before the session moves on.

pub mod cancel;
#[cfg(feature = "cli")]
pub mod cli;
pub mod command;
pub mod config;
pub mod cooldown;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod hook_logging;
#[cfg(feature = "cli")]
pub mod hooks;
pub mod lock;
pub mod paths;
pub mod project;
#[cfg(feature = "cli")]
pub mod signals;
pub mod skip;
pub mod store;
pub mod templates;
pub mod testing;
pub mod traits;
pub mod validate;

pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use skip::{SkipKind, SkipOverride, SkipRegistry};
pub use validate::{validate, Outcome, ValidationRequest, Validator, EXIT_PASS, EXIT_SHOW_MESSAGE};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }
}
