//! Command execution for the CLI.
//!
//! Every command produces a [`CliOutput`]; nothing here prints or exits,
//! so the whole surface is testable in-process.

use crate::cancel::CancelToken;
use crate::cli::{Command, CooldownCommand, SkipCommand, UnskipCommand};
use crate::command::RealCommandRunner;
use crate::config::ValidatorConfig;
use crate::cooldown::CooldownTracker;
use crate::discovery::{CommandDiscoverer, CommandKind, Discovery};
use crate::hook_logging;
use crate::hooks::{edited_file, parse_hook_input};
use crate::paths::{normalize_dir, StateDir};
use crate::project::find_project_root;
use crate::skip::{SkipOverride, SkipRegistry};
use crate::store::JsonFileStore;
use crate::templates;
use crate::traits::SystemClock;
use crate::validate::{validate, Validator};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

/// Output from running the CLI, with separate stdout and stderr messages.
#[derive(Debug)]
pub struct CliOutput {
    /// Exit code for the process.
    pub exit_code: ExitCode,
    /// Messages to print to stdout.
    pub stdout: Vec<String>,
    /// Messages to print to stderr.
    pub stderr: Vec<String>,
}

impl CliOutput {
    fn ok(stdout: Vec<String>) -> Self {
        Self { exit_code: ExitCode::SUCCESS, stdout, stderr: vec![] }
    }

    fn error(message: String) -> Self {
        Self { exit_code: ExitCode::from(1), stdout: vec![], stderr: vec![message] }
    }
}

/// Where the CLI runs: state location, working directory, cancellation.
#[derive(Debug, Clone)]
pub struct CliContext {
    /// State directory holding the registry, cooldowns, locks and config.
    pub state: StateDir,
    /// Directory relative paths resolve against.
    pub cwd: PathBuf,
    /// Tripped on SIGINT/SIGTERM.
    pub cancel: CancelToken,
}

impl CliContext {
    /// Context for the running process.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn from_env(cancel: CancelToken) -> std::io::Result<Self> {
        Ok(Self { state: StateDir::from_env(), cwd: std::env::current_dir()?, cancel })
    }

    fn resolve(&self, dir: Option<&Path>) -> PathBuf {
        match dir {
            Some(dir) if dir.is_absolute() => dir.to_path_buf(),
            Some(dir) => self.cwd.join(dir),
            None => self.cwd.clone(),
        }
    }

    /// The project root containing `dir`.
    fn project_root(&self, dir: Option<&Path>) -> crate::error::Result<PathBuf> {
        normalize_dir(&find_project_root(&normalize_dir(&self.resolve(dir))?))
    }

    fn skip_registry(&self) -> SkipRegistry {
        SkipRegistry::new(JsonFileStore::new(self.state.skip_registry()))
    }

    fn cooldowns(&self) -> CooldownTracker {
        CooldownTracker::new(JsonFileStore::new(self.state.cooldowns()), Arc::new(SystemClock))
    }

    /// Config file plus environment; a broken file becomes a warning.
    fn load_config(&self, warnings: &mut Vec<String>) -> ValidatorConfig {
        ValidatorConfig::load(&self.state).unwrap_or_else(|e| {
            warnings.push(format!("edit-validator: warning: {e}; using defaults"));
            let mut config = ValidatorConfig::default();
            config.apply_env_from(|key| std::env::var(key).ok());
            config
        })
    }
}

/// Output for `command` when no [`CliContext`] could be built.
///
/// `validate` runs as a hook and must never block the session, so it only
/// warns. Every other command fails.
#[must_use]
pub fn context_unavailable(command: &Command, error: &std::io::Error) -> CliOutput {
    match command {
        Command::Validate { .. } => CliOutput {
            exit_code: ExitCode::SUCCESS,
            stdout: vec![],
            stderr: vec![format!("edit-validator: warning: current directory unavailable: {error}")],
        },
        _ => CliOutput::error(format!("Error determining current directory: {error}")),
    }
}

/// Run a CLI command with the given stdin input.
pub fn run(command: Command, stdin: &str, ctx: &CliContext) -> CliOutput {
    match command {
        Command::Validate { timeout, cooldown, skip_lint, skip_test, project_root } => {
            let skip = SkipOverride { skip_lint, skip_test };
            run_validate(stdin, ctx, timeout, cooldown, skip, project_root.as_deref())
        }
        Command::Skip(cmd) => run_skip_cmd(&cmd, ctx),
        Command::Unskip { kind } => run_unskip_cmd(kind.as_ref(), ctx),
        Command::Discover { kind, dir } => run_discover(kind.into(), dir.as_deref(), ctx),
        Command::Cooldown(CooldownCommand::Clear { dir }) => {
            run_cooldown_clear(dir.as_deref(), ctx)
        }
        Command::Version => run_version(),
    }
}

// === Hook ===

fn run_validate(
    stdin: &str,
    ctx: &CliContext,
    timeout: Option<u64>,
    cooldown: Option<u64>,
    skip: SkipOverride,
    project_root: Option<&Path>,
) -> CliOutput {
    let mut stderr = vec![];
    let mut config = ctx.load_config(&mut stderr);
    hook_logging::init_tracing(config.debug);

    if let Some(timeout) = timeout.filter(|t| *t > 0) {
        config.timeout_secs = timeout;
    }
    if let Some(cooldown) = cooldown {
        config.cooldown_secs = cooldown;
    }

    let input = match parse_hook_input(stdin) {
        Ok(input) => input,
        Err(e) => {
            stderr.push(format!("edit-validator: warning: ignoring unreadable hook input: {e}"));
            return CliOutput { exit_code: ExitCode::SUCCESS, stdout: vec![], stderr };
        }
    };
    let Some(file) = edited_file(&input, &ctx.cwd) else {
        tracing::debug!(tool = ?input.tool_name, "not an edit event");
        return CliOutput { exit_code: ExitCode::SUCCESS, stdout: vec![], stderr };
    };

    if let Err(e) = templates::init_templates(Some(&ctx.state.root().join("templates"))) {
        stderr.push(format!("edit-validator: warning: {e}"));
    }

    let project_root = project_root.map(|root| ctx.resolve(Some(root)));
    let validator = Validator::from_config(&config, &ctx.state);
    let (code, message) = validate(
        &validator,
        project_root.as_deref(),
        &file,
        skip,
        config.timeout_secs,
        config.cooldown_secs,
        &ctx.cancel,
    );
    if !message.is_empty() {
        stderr.push(message);
    }
    CliOutput { exit_code: exit_code_from_i32(code), stdout: vec![], stderr }
}

// === Skip Registry ===

fn run_skip_cmd(cmd: &SkipCommand, ctx: &CliContext) -> CliOutput {
    let registry = ctx.skip_registry();

    if let Some((kind, dir)) = cmd.target() {
        let root = match ctx.project_root(dir) {
            Ok(root) => root,
            Err(e) => return CliOutput::error(format!("Error resolving directory: {e}")),
        };
        return match registry.add(&root, kind) {
            Ok(entry) => CliOutput::ok(vec![format!("Skipping {entry} for {}", root.display())]),
            Err(e) => CliOutput::error(format!("Error updating skip registry: {e}")),
        };
    }

    match cmd {
        SkipCommand::Status { dir } => {
            let root = match ctx.project_root(dir.as_deref()) {
                Ok(root) => root,
                Err(e) => return CliOutput::error(format!("Error resolving directory: {e}")),
            };
            match registry.get(&root) {
                Ok(entry) => CliOutput::ok(vec![format!("{}: skipping {entry}", root.display())]),
                Err(e) => CliOutput::error(format!("Error reading skip registry: {e}")),
            }
        }
        _ => match registry.list() {
            Ok(entries) if entries.is_empty() => {
                CliOutput::ok(vec!["No projects have skips.".to_string()])
            }
            Ok(entries) => CliOutput::ok(
                entries.iter().map(|(dir, entry)| format!("{dir}: skipping {entry}")).collect(),
            ),
            Err(e) => CliOutput::error(format!("Error reading skip registry: {e}")),
        },
    }
}

fn run_unskip_cmd(cmd: Option<&UnskipCommand>, ctx: &CliContext) -> CliOutput {
    let registry = ctx.skip_registry();
    let dir = cmd.and_then(|c| c.target().1);
    let root = match ctx.project_root(dir) {
        Ok(root) => root,
        Err(e) => return CliOutput::error(format!("Error resolving directory: {e}")),
    };

    let result = match cmd {
        Some(cmd) => registry.remove(&root, cmd.target().0),
        None => registry.delete(&root).map(|_| crate::skip::SkipEntry::default()),
    };
    match result {
        Ok(entry) if entry.is_empty() => {
            CliOutput::ok(vec![format!("Validating lint and test for {}", root.display())])
        }
        Ok(entry) => CliOutput::ok(vec![format!("Skipping {entry} for {}", root.display())]),
        Err(e) => CliOutput::error(format!("Error updating skip registry: {e}")),
    }
}

// === Discovery ===

fn run_discover(kind: CommandKind, dir: Option<&Path>, ctx: &CliContext) -> CliOutput {
    let mut stderr = vec![];
    let config = ctx.load_config(&mut stderr);
    hook_logging::init_tracing(config.debug);

    let found = normalize_dir(&ctx.resolve(dir)).and_then(|dir| {
        let root = normalize_dir(&find_project_root(&dir))?;
        Discovery::new(Arc::new(RealCommandRunner::new()))
            .with_overrides(config.overrides())
            .discover(&dir, &root, kind)
            .map(|found| (found, root))
    });

    match found {
        Ok((Some(command), _)) => CliOutput {
            exit_code: ExitCode::SUCCESS,
            stdout: vec![
                command.to_string(),
                format!("  source: {}", command.source),
                format!("  dir: {}", command.working_dir.display()),
            ],
            stderr,
        },
        Ok((None, root)) => {
            stderr.push(format!("No {kind} command found for {}", root.display()));
            CliOutput { exit_code: ExitCode::from(1), stdout: vec![], stderr }
        }
        Err(e) => CliOutput::error(format!("Error discovering {kind} command: {e}")),
    }
}

// === Cooldown ===

fn run_cooldown_clear(dir: Option<&Path>, ctx: &CliContext) -> CliOutput {
    let root = match ctx.project_root(dir) {
        Ok(root) => root,
        Err(e) => return CliOutput::error(format!("Error resolving directory: {e}")),
    };
    match ctx.cooldowns().clear(&root) {
        Ok(true) => CliOutput::ok(vec![format!("Cleared cooldown for {}", root.display())]),
        Ok(false) => CliOutput::ok(vec![format!("No cooldown recorded for {}", root.display())]),
        Err(e) => CliOutput::error(format!("Error updating cooldowns: {e}")),
    }
}

// === Utility ===

fn run_version() -> CliOutput {
    CliOutput {
        exit_code: ExitCode::SUCCESS,
        stdout: vec![],
        stderr: vec![format!("edit-validator v{}", crate::VERSION)],
    }
}

/// Convert an i32 exit code to `ExitCode`, clamping to the valid range.
#[must_use]
pub fn exit_code_from_i32(code: i32) -> ExitCode {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let code_u8 = if code < 0 {
        1u8
    } else if code > 255 {
        255u8
    } else {
        code as u8
    };
    ExitCode::from(code_u8)
}
