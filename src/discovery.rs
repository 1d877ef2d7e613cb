//! Heuristic discovery of a project's lint and test commands.
//!
//! Discovery walks from the edited file's directory up to the project root.
//! At each level an ordered list of [`Probe`]s is tried; the first probe to
//! produce a command wins, so the nearest task-runner file beats one further
//! up the tree. An explicit override from config beats everything.

use crate::error::Result;
use crate::traits::CommandRunner;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Which of the two validation commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Static analysis.
    Lint,
    /// The test suite.
    Test,
}

impl CommandKind {
    /// The conventional target/script name for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lint => "lint",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A runnable command found for a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredCommand {
    /// Lint or test.
    pub kind: CommandKind,
    /// Program to launch.
    pub executable: String,
    /// Arguments to pass.
    pub args: Vec<String>,
    /// Directory to run in.
    pub working_dir: PathBuf,
    /// Which probe found it, e.g. `Makefile` or `package.json`.
    pub source: String,
}

impl DiscoveredCommand {
    fn new(
        kind: CommandKind,
        executable: impl Into<String>,
        args: &[&str],
        working_dir: &Path,
        source: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            executable: executable.into(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            working_dir: working_dir.to_path_buf(),
            source: source.into(),
        }
    }
}

impl fmt::Display for DiscoveredCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Configured overrides read as the shell line the user wrote.
        if self.source == OVERRIDE_SOURCE {
            if let [flag, script] = self.args.as_slice() {
                if flag == "-c" {
                    return f.write_str(script);
                }
            }
        }
        f.write_str(&self.executable)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// One heuristic for finding a command in a single directory.
pub trait Probe: Send + Sync {
    /// Short name used in debug output.
    fn name(&self) -> &'static str;

    /// Look for a `kind` command defined in `dir` (not its ancestors).
    ///
    /// `Ok(None)` means the probe does not apply here.
    ///
    /// # Errors
    ///
    /// Returns an error if a relevant file exists but cannot be read or
    /// parsed. The caller treats that the same as `Ok(None)`.
    fn probe(
        &self,
        dir: &Path,
        kind: CommandKind,
        runner: &dyn CommandRunner,
    ) -> Result<Option<DiscoveredCommand>>;
}

/// Something that can find the lint/test command for a directory.
pub trait CommandDiscoverer: Send + Sync {
    /// Find the `kind` command for `dir`, searching up to `project_root`.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures outside individual probes.
    fn discover(
        &self,
        dir: &Path,
        project_root: &Path,
        kind: CommandKind,
    ) -> Result<Option<DiscoveredCommand>>;
}

impl<T: CommandDiscoverer + ?Sized> CommandDiscoverer for Arc<T> {
    fn discover(
        &self,
        dir: &Path,
        project_root: &Path,
        kind: CommandKind,
    ) -> Result<Option<DiscoveredCommand>> {
        (**self).discover(dir, project_root, kind)
    }
}

const OVERRIDE_SOURCE: &str = "override";

/// Shell commands configured to replace discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOverrides {
    /// Replaces the lint command.
    pub lint: Option<String>,
    /// Replaces the test command.
    pub test: Option<String>,
}

impl CommandOverrides {
    fn get(&self, kind: CommandKind) -> Option<&str> {
        match kind {
            CommandKind::Lint => self.lint.as_deref(),
            CommandKind::Test => self.test.as_deref(),
        }
        .map(str::trim)
        .filter(|c| !c.is_empty())
    }
}

/// The standard probe cascade.
pub struct Discovery {
    runner: Arc<dyn CommandRunner>,
    probes: Vec<Box<dyn Probe>>,
    overrides: CommandOverrides,
}

impl Discovery {
    /// Discovery with the default probe list, resolving tools via `runner`.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner, probes: default_probes(), overrides: CommandOverrides::default() }
    }

    /// Use explicit commands instead of probing where configured.
    #[must_use]
    pub fn with_overrides(mut self, overrides: CommandOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Replace the probe list.
    #[must_use]
    pub fn with_probes(mut self, probes: Vec<Box<dyn Probe>>) -> Self {
        self.probes = probes;
        self
    }

    fn probe_level(&self, dir: &Path, kind: CommandKind) -> Option<DiscoveredCommand> {
        for probe in &self.probes {
            match probe.probe(dir, kind, self.runner.as_ref()) {
                Ok(Some(command)) => {
                    tracing::debug!(probe = probe.name(), dir = %dir.display(), %command, "found");
                    return Some(command);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(probe = probe.name(), dir = %dir.display(), error = %e, "declined");
                }
            }
        }
        None
    }
}

impl CommandDiscoverer for Discovery {
    fn discover(
        &self,
        dir: &Path,
        project_root: &Path,
        kind: CommandKind,
    ) -> Result<Option<DiscoveredCommand>> {
        if let Some(command) = self.overrides.get(kind) {
            return Ok(Some(DiscoveredCommand::new(
                kind,
                "sh",
                &["-c", command],
                project_root,
                OVERRIDE_SOURCE,
            )));
        }

        for level in dir.ancestors() {
            if let Some(command) = self.probe_level(level, kind) {
                return Ok(Some(command));
            }
            if level == project_root {
                break;
            }
        }
        tracing::debug!(%kind, dir = %dir.display(), "no command found");
        Ok(None)
    }
}

/// Probes in cascade order.
#[must_use]
pub fn default_probes() -> Vec<Box<dyn Probe>> {
    vec![
        Box::new(MakefileProbe),
        Box::new(TaskfileProbe),
        Box::new(JustfileProbe),
        Box::new(PackageJsonProbe),
        Box::new(ScriptsDirProbe),
        Box::new(ToolchainProbe::GO),
        Box::new(ToolchainProbe::RUST),
        Box::new(ToolchainProbe::PYTHON),
    ]
}

/// Read `dir/name` if it exists.
fn read_optional(dir: &Path, name: &str) -> Result<Option<String>> {
    match std::fs::read_to_string(dir.join(name)) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Find the first of `names` that exists in `dir`, with its contents.
fn read_first(dir: &Path, names: &[&'static str]) -> Result<Option<(&'static str, String)>> {
    for name in names {
        if let Some(content) = read_optional(dir, name)? {
            return Ok(Some((*name, content)));
        }
    }
    Ok(None)
}

fn runner_missing(tool: &str, file: &str) -> Option<DiscoveredCommand> {
    tracing::debug!(tool, file, "runner not on PATH");
    None
}

static MAKE_RULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([A-Za-z0-9_./%$()-][^:=#\n]*?)\s*::?(?:[^=]|$)").unwrap());

static JUST_RECIPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^@?([A-Za-z_][A-Za-z0-9_-]*)(?:\s+[^:\n]*)?:(?:[^=]|$)").unwrap());

/// Whether a makefile defines a rule for `target`.
fn makefile_has_target(content: &str, target: &str) -> bool {
    MAKE_RULE
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .any(|targets| targets.as_str().split_whitespace().any(|t| t == target))
}

/// Whether a justfile defines a recipe named `recipe`.
fn justfile_has_recipe(content: &str, recipe: &str) -> bool {
    JUST_RECIPE.captures_iter(content).filter_map(|caps| caps.get(1)).any(|m| m.as_str() == recipe)
}

/// `make <kind>` when a makefile has that rule.
pub struct MakefileProbe;

impl Probe for MakefileProbe {
    fn name(&self) -> &'static str {
        "makefile"
    }

    fn probe(
        &self,
        dir: &Path,
        kind: CommandKind,
        runner: &dyn CommandRunner,
    ) -> Result<Option<DiscoveredCommand>> {
        let Some((file, content)) = read_first(dir, &["GNUmakefile", "makefile", "Makefile"])?
        else {
            return Ok(None);
        };
        if !makefile_has_target(&content, kind.as_str()) {
            tracing::debug!(file, target = kind.as_str(), "no such make target");
            return Ok(None);
        }
        if !runner.is_available("make") {
            return Ok(runner_missing("make", file));
        }
        Ok(Some(DiscoveredCommand::new(kind, "make", &[kind.as_str()], dir, "Makefile")))
    }
}

/// `task <kind>` when a Taskfile defines that task.
pub struct TaskfileProbe;

impl Probe for TaskfileProbe {
    fn name(&self) -> &'static str {
        "taskfile"
    }

    fn probe(
        &self,
        dir: &Path,
        kind: CommandKind,
        runner: &dyn CommandRunner,
    ) -> Result<Option<DiscoveredCommand>> {
        let Some((file, content)) = read_first(dir, &["Taskfile.yml", "Taskfile.yaml"])? else {
            return Ok(None);
        };
        let doc: serde_yaml::Value = serde_yaml::from_str(&content)?;
        if doc.get("tasks").and_then(|tasks| tasks.get(kind.as_str())).is_none() {
            tracing::debug!(file, task = kind.as_str(), "no such task");
            return Ok(None);
        }
        if !runner.is_available("task") {
            return Ok(runner_missing("task", file));
        }
        Ok(Some(DiscoveredCommand::new(kind, "task", &[kind.as_str()], dir, file)))
    }
}

/// `just <kind>` when a justfile defines that recipe.
pub struct JustfileProbe;

impl Probe for JustfileProbe {
    fn name(&self) -> &'static str {
        "justfile"
    }

    fn probe(
        &self,
        dir: &Path,
        kind: CommandKind,
        runner: &dyn CommandRunner,
    ) -> Result<Option<DiscoveredCommand>> {
        let Some((file, content)) = read_first(dir, &["justfile", "Justfile", ".justfile"])? else {
            return Ok(None);
        };
        if !justfile_has_recipe(&content, kind.as_str()) {
            tracing::debug!(file, recipe = kind.as_str(), "no such recipe");
            return Ok(None);
        }
        if !runner.is_available("just") {
            return Ok(runner_missing("just", file));
        }
        Ok(Some(DiscoveredCommand::new(kind, "just", &[kind.as_str()], dir, file)))
    }
}

/// `<pm> run <kind>` when package.json has that script.
pub struct PackageJsonProbe;

impl PackageJsonProbe {
    fn package_manager(dir: &Path) -> &'static str {
        [
            ("yarn.lock", "yarn"),
            ("pnpm-lock.yaml", "pnpm"),
            ("bun.lockb", "bun"),
            ("bun.lock", "bun"),
        ]
        .into_iter()
        .find(|(lockfile, _)| dir.join(lockfile).exists())
        .map_or("npm", |(_, pm)| pm)
    }
}

impl Probe for PackageJsonProbe {
    fn name(&self) -> &'static str {
        "package.json"
    }

    fn probe(
        &self,
        dir: &Path,
        kind: CommandKind,
        runner: &dyn CommandRunner,
    ) -> Result<Option<DiscoveredCommand>> {
        let Some(content) = read_optional(dir, "package.json")? else {
            return Ok(None);
        };
        let manifest: serde_json::Value = serde_json::from_str(&content)?;
        let has_script = manifest
            .get("scripts")
            .and_then(|scripts| scripts.get(kind.as_str()))
            .is_some_and(serde_json::Value::is_string);
        if !has_script {
            tracing::debug!(script = kind.as_str(), "no such package.json script");
            return Ok(None);
        }
        let pm = Self::package_manager(dir);
        if !runner.is_available(pm) {
            return Ok(runner_missing(pm, "package.json"));
        }
        Ok(Some(DiscoveredCommand::new(kind, pm, &["run", kind.as_str()], dir, "package.json")))
    }
}

/// An executable `scripts/<kind>`.
pub struct ScriptsDirProbe;

impl Probe for ScriptsDirProbe {
    fn name(&self) -> &'static str {
        "scripts"
    }

    fn probe(
        &self,
        dir: &Path,
        kind: CommandKind,
        _runner: &dyn CommandRunner,
    ) -> Result<Option<DiscoveredCommand>> {
        let script = dir.join("scripts").join(kind.as_str());
        let metadata = match std::fs::metadata(&script) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() || !is_executable(&metadata) {
            tracing::debug!(script = %script.display(), "exists but is not executable");
            return Ok(None);
        }
        let executable = script.to_string_lossy().into_owned();
        Ok(Some(DiscoveredCommand::new(kind, executable, &[], dir, "scripts/")))
    }
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    true
}

/// A program plus fixed arguments.
#[derive(Debug, Clone, Copy)]
pub struct Tool {
    /// Program looked up on PATH.
    pub program: &'static str,
    /// Arguments.
    pub args: &'static [&'static str],
}

/// Language default tools, picked by a marker file.
///
/// Candidates are tried in order and the first one found on PATH is used.
#[derive(Debug, Clone, Copy)]
pub struct ToolchainProbe {
    /// Name reported as the command's source.
    pub source: &'static str,
    /// Any of these files marks a project of this language.
    pub markers: &'static [&'static str],
    /// Lint candidates.
    pub lint: &'static [Tool],
    /// Test candidates.
    pub test: &'static [Tool],
}

impl ToolchainProbe {
    /// Go modules.
    pub const GO: Self = Self {
        source: "go.mod",
        markers: &["go.mod"],
        lint: &[
            Tool { program: "golangci-lint", args: &["run"] },
            Tool { program: "go", args: &["vet", "./..."] },
        ],
        test: &[Tool { program: "go", args: &["test", "./..."] }],
    };

    /// Cargo packages.
    pub const RUST: Self = Self {
        source: "Cargo.toml",
        markers: &["Cargo.toml"],
        lint: &[Tool { program: "cargo", args: &["clippy", "--", "-D", "warnings"] }],
        test: &[Tool { program: "cargo", args: &["test"] }],
    };

    /// Python projects.
    pub const PYTHON: Self = Self {
        source: "Python project",
        markers: &["pyproject.toml", "setup.py", "requirements.txt"],
        lint: &[
            Tool { program: "ruff", args: &["check", "."] },
            Tool { program: "flake8", args: &["."] },
            Tool { program: "pylint", args: &["."] },
        ],
        test: &[
            Tool { program: "pytest", args: &[] },
            Tool { program: "python", args: &["-m", "unittest"] },
        ],
    };
}

impl Probe for ToolchainProbe {
    fn name(&self) -> &'static str {
        self.source
    }

    fn probe(
        &self,
        dir: &Path,
        kind: CommandKind,
        runner: &dyn CommandRunner,
    ) -> Result<Option<DiscoveredCommand>> {
        if !self.markers.iter().any(|m| dir.join(m).exists()) {
            return Ok(None);
        }
        let candidates = match kind {
            CommandKind::Lint => self.lint,
            CommandKind::Test => self.test,
        };
        let found = candidates.iter().find(|tool| {
            let available = runner.is_available(tool.program);
            if !available {
                tracing::debug!(tool = tool.program, "not on PATH");
            }
            available
        });
        Ok(found.map(|tool| DiscoveredCommand::new(kind, tool.program, tool.args, dir, self.source)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCommandRunner;
    use std::fs;
    use tempfile::TempDir;

    fn discovery(available: &[&str]) -> Discovery {
        let runner = MockCommandRunner::new();
        for program in available {
            runner.set_available(program);
        }
        Discovery::new(Arc::new(runner))
    }

    #[test]
    fn test_makefile_target() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Makefile"), ".PHONY: lint\nlint:\n\techo lint\n").unwrap();

        let found = discovery(&["make"]).discover(dir.path(), dir.path(), CommandKind::Lint);
        let found = found.unwrap().unwrap();
        assert_eq!(found.to_string(), "make lint");
        assert_eq!(found.source, "Makefile");
        assert_eq!(found.working_dir, dir.path());
    }

    #[test]
    fn test_makefile_missing_target_falls_through() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Makefile"), "build:\n\tcc main.c\n").unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[package]\n").unwrap();

        let found = discovery(&["make", "cargo"])
            .discover(dir.path(), dir.path(), CommandKind::Test)
            .unwrap()
            .unwrap();
        assert_eq!(found.to_string(), "cargo test");
    }

    #[test]
    fn test_makefile_requires_make_on_path() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Makefile"), "test:\n\t./run\n").unwrap();
        let found = discovery(&[]).discover(dir.path(), dir.path(), CommandKind::Test).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_make_rule_parsing() {
        let content = "VAR := 1\nOTHER = 2\nlint test: deps\n\t@echo\n# test:\nall::\n";
        assert!(makefile_has_target(content, "lint"));
        assert!(makefile_has_target(content, "test"));
        assert!(makefile_has_target(content, "all"));
        assert!(!makefile_has_target(content, "VAR"));
        assert!(!makefile_has_target(content, "OTHER"));
        assert!(!makefile_has_target("\tlint: x\n", "lint"));
    }

    #[test]
    fn test_just_recipe_parsing() {
        let content = "set shell := [\"bash\", \"-c\"]\nalias t := test\n@lint:\n  cargo clippy\ntest filter='':\n  cargo test {{filter}}\n";
        assert!(justfile_has_recipe(content, "lint"));
        assert!(justfile_has_recipe(content, "test"));
        assert!(!justfile_has_recipe(content, "set"));
        assert!(!justfile_has_recipe(content, "alias"));
    }

    #[test]
    fn test_taskfile() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("Taskfile.yml"),
            "version: '3'\ntasks:\n  lint:\n    cmds:\n      - golangci-lint run\n",
        )
        .unwrap();
        let found = discovery(&["task"])
            .discover(dir.path(), dir.path(), CommandKind::Lint)
            .unwrap()
            .unwrap();
        assert_eq!(found.to_string(), "task lint");
        assert_eq!(found.source, "Taskfile.yml");
        assert!(discovery(&["task"])
            .discover(dir.path(), dir.path(), CommandKind::Test)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_justfile() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("justfile"), "test:\n    cargo test\n").unwrap();
        let found = discovery(&["just"])
            .discover(dir.path(), dir.path(), CommandKind::Test)
            .unwrap()
            .unwrap();
        assert_eq!(found.to_string(), "just test");
    }

    #[test]
    fn test_package_json_picks_package_manager() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"scripts": {"lint": "eslint .", "test": "jest"}}"#,
        )
        .unwrap();

        let found = discovery(&["npm", "pnpm"])
            .discover(dir.path(), dir.path(), CommandKind::Lint)
            .unwrap()
            .unwrap();
        assert_eq!(found.to_string(), "npm run lint");

        fs::write(dir.path().join("pnpm-lock.yaml"), "").unwrap();
        let found = discovery(&["npm", "pnpm"])
            .discover(dir.path(), dir.path(), CommandKind::Test)
            .unwrap()
            .unwrap();
        assert_eq!(found.to_string(), "pnpm run test");
        assert_eq!(found.source, "package.json");
    }

    #[test]
    fn test_unparsable_package_json_declined() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), "{ broken").unwrap();
        let found = discovery(&["npm"]).discover(dir.path(), dir.path(), CommandKind::Lint);
        assert!(found.unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_scripts_dir_requires_executable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let scripts = dir.path().join("scripts");
        fs::create_dir(&scripts).unwrap();
        let script = scripts.join("test");
        fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o644)).unwrap();

        let d = discovery(&[]);
        assert!(d.discover(dir.path(), dir.path(), CommandKind::Test).unwrap().is_none());

        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        let found = d.discover(dir.path(), dir.path(), CommandKind::Test).unwrap().unwrap();
        assert_eq!(found.executable, script.to_string_lossy());
        assert_eq!(found.source, "scripts/");
    }

    #[test]
    fn test_go_prefers_golangci_lint() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("go.mod"), "module example.com/x\n").unwrap();

        let found = discovery(&["go", "golangci-lint"])
            .discover(dir.path(), dir.path(), CommandKind::Lint)
            .unwrap()
            .unwrap();
        assert_eq!(found.to_string(), "golangci-lint run");

        let found = discovery(&["go"])
            .discover(dir.path(), dir.path(), CommandKind::Lint)
            .unwrap()
            .unwrap();
        assert_eq!(found.to_string(), "go vet ./...");
    }

    #[test]
    fn test_python_fallbacks() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("requirements.txt"), "requests\n").unwrap();

        let found = discovery(&["flake8", "python"])
            .discover(dir.path(), dir.path(), CommandKind::Lint)
            .unwrap()
            .unwrap();
        assert_eq!(found.to_string(), "flake8 .");

        let found = discovery(&["flake8", "python"])
            .discover(dir.path(), dir.path(), CommandKind::Test)
            .unwrap()
            .unwrap();
        assert_eq!(found.to_string(), "python -m unittest");
    }

    #[test]
    fn test_language_tool_must_be_on_path() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[package]\n").unwrap();
        assert!(discovery(&[])
            .discover(dir.path(), dir.path(), CommandKind::Lint)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_nearest_level_wins() {
        let root = TempDir::new().unwrap();
        let sub = root.path().join("service");
        fs::create_dir(&sub).unwrap();
        fs::write(root.path().join("Makefile"), "test:\n\tmake -C service test\n").unwrap();
        fs::write(sub.join("go.mod"), "module svc\n").unwrap();

        let found = discovery(&["make", "go"])
            .discover(&sub, root.path(), CommandKind::Test)
            .unwrap()
            .unwrap();
        assert_eq!(found.to_string(), "go test ./...");
        assert_eq!(found.working_dir, sub);
    }

    #[test]
    fn test_walks_up_to_root() {
        let root = TempDir::new().unwrap();
        let deep = root.path().join("a/b");
        fs::create_dir_all(&deep).unwrap();
        fs::write(root.path().join("Makefile"), "lint:\n\ttrue\n").unwrap();

        let found = discovery(&["make"])
            .discover(&deep, root.path(), CommandKind::Lint)
            .unwrap()
            .unwrap();
        assert_eq!(found.working_dir, root.path());
    }

    #[test]
    fn test_stops_at_project_root() {
        let outer = TempDir::new().unwrap();
        let project = outer.path().join("project");
        fs::create_dir(&project).unwrap();
        fs::write(outer.path().join("Makefile"), "lint:\n\ttrue\n").unwrap();

        let found = discovery(&["make"]).discover(&project, &project, CommandKind::Lint).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_override_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Makefile"), "lint:\n\ttrue\n").unwrap();
        let overrides =
            CommandOverrides { lint: Some("ruff check src".to_string()), test: None };

        let d = discovery(&["make"]).with_overrides(overrides);
        let lint = d.discover(dir.path(), dir.path(), CommandKind::Lint).unwrap().unwrap();
        assert_eq!(lint.executable, "sh");
        assert_eq!(lint.args, vec!["-c".to_string(), "ruff check src".to_string()]);
        assert_eq!(lint.source, "override");
        assert_eq!(lint.to_string(), "ruff check src");

        let test = d.discover(dir.path(), dir.path(), CommandKind::Test).unwrap();
        assert!(test.is_none());
    }

    #[test]
    fn test_blank_override_ignored() {
        let dir = TempDir::new().unwrap();
        let overrides = CommandOverrides { lint: Some("  ".to_string()), test: None };
        let d = discovery(&[]).with_overrides(overrides);
        assert!(d.discover(dir.path(), dir.path(), CommandKind::Lint).unwrap().is_none());
    }

    #[test]
    fn test_custom_probe_list() {
        struct Always;
        impl Probe for Always {
            fn name(&self) -> &'static str {
                "always"
            }
            fn probe(
                &self,
                dir: &Path,
                kind: CommandKind,
                _runner: &dyn CommandRunner,
            ) -> Result<Option<DiscoveredCommand>> {
                Ok(Some(DiscoveredCommand::new(kind, "true", &[], dir, "always")))
            }
        }

        let dir = TempDir::new().unwrap();
        let d = discovery(&[]).with_probes(vec![Box::new(Always)]);
        let found = d.discover(dir.path(), dir.path(), CommandKind::Lint).unwrap().unwrap();
        assert_eq!(found.source, "always");
    }
}
