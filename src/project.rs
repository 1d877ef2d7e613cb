//! Project root detection and edited-file filtering.

use std::path::{Path, PathBuf};

/// Files or directories whose presence marks a project root.
const ROOT_MARKERS: &[&str] = &[
    ".git",
    "go.mod",
    "package.json",
    "Cargo.toml",
    "setup.py",
    "pyproject.toml",
    "Makefile",
    "justfile",
    "Justfile",
];

/// Directory names whose contents are never validated.
const IGNORED_DIRS: &[&str] =
    &["vendor", "node_modules", "build", ".git", "dist", "__pycache__", ".cache", "target", ".next"];

const TEST_SUFFIXES: &[&str] = &[
    "_test.go",
    "_test.py",
    ".test.js",
    ".test.ts",
    ".test.jsx",
    ".test.tsx",
    ".spec.js",
    ".spec.ts",
    ".spec.jsx",
    ".spec.tsx",
];

const GENERATED_SUFFIXES: &[&str] = &[".generated.go", ".pb.go", ".gen.go", "_gen.go"];

/// Walk up from `start` to the nearest directory containing a root marker.
///
/// Falls back to `start` itself when no ancestor has one.
#[must_use]
pub fn find_project_root(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| ROOT_MARKERS.iter().any(|marker| dir.join(marker).exists()))
        .unwrap_or(start)
        .to_path_buf()
}

/// Whether an edit to `file` should be ignored entirely.
///
/// Only the part of the path below `project_root` is inspected, so a
/// project that itself lives under e.g. `/tmp/build/` is still validated.
#[must_use]
pub fn should_skip_file(file: &Path, project_root: &Path) -> bool {
    let relative = file.strip_prefix(project_root).unwrap_or(file);

    let in_ignored_dir = relative
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .filter_map(|c| c.as_os_str().to_str())
        .any(|name| IGNORED_DIRS.contains(&name));
    if in_ignored_dir {
        return true;
    }

    let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    TEST_SUFFIXES.iter().chain(GENERATED_SUFFIXES).any(|suffix| name.ends_with(suffix))
}
