//! Template loading and rendering using Tera.
//!
//! User-facing failure messages live in `templates/` and are embedded into
//! the binary. A directory of `.tera` files can be supplied at startup to
//! override individual messages.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use tera::{Context, Tera};

/// Lint failed, test passed or skipped.
pub const LINT_FAILED: &str = "messages/lint_failed.tera";
/// Test failed, lint passed or skipped.
pub const TEST_FAILED: &str = "messages/test_failed.tera";
/// Both failed.
pub const BOTH_FAILED: &str = "messages/both_failed.tera";

static EMBEDDED_TEMPLATES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (LINT_FAILED, include_str!("../templates/messages/lint_failed.tera")),
        (TEST_FAILED, include_str!("../templates/messages/test_failed.tera")),
        (BOTH_FAILED, include_str!("../templates/messages/both_failed.tera")),
    ])
});

/// Global template engine with caching.
static TERA: Lazy<RwLock<Option<Tera>>> = Lazy::new(|| RwLock::new(None));

/// Initialize the template engine, loading overrides from `overrides_dir`.
///
/// Any template not present in `overrides_dir` (or all of them, when it is
/// `None` or missing) comes from the embedded defaults.
///
/// # Errors
///
/// Returns an error if the overrides directory contains invalid templates.
pub fn init_templates(overrides_dir: Option<&Path>) -> Result<()> {
    let mut tera = match overrides_dir.filter(|dir| dir.is_dir()) {
        Some(dir) => {
            let glob_pattern = format!("{}/**/*.tera", dir.display());
            Tera::new(&glob_pattern).map_err(|e| {
                Error::Template(format!("Failed to load templates from {}: {e}", dir.display()))
            })?
        }
        None => Tera::default(),
    };

    for (name, content) in EMBEDDED_TEMPLATES.iter() {
        if tera.get_template(name).is_err() {
            tera.add_raw_template(name, content)
                .map_err(|e| Error::Template(format!("Embedded template {name}: {e}")))?;
        }
    }

    *TERA.write().map_err(|e| Error::Template(e.to_string()))? = Some(tera);
    Ok(())
}

/// Render a template with the given context.
///
/// Templates are initialized from the embedded defaults on first use if
/// [`init_templates`] was never called.
///
/// # Errors
///
/// Returns an error if the template doesn't exist or rendering fails.
pub fn render(name: &str, context: &Context) -> Result<String> {
    let needs_init = TERA.read().map_err(|e| Error::Template(e.to_string()))?.is_none();
    if needs_init {
        init_templates(None)?;
    }

    let guard = TERA.read().map_err(|e| Error::Template(e.to_string()))?;
    let tera = guard.as_ref().ok_or_else(|| Error::Template("Templates not initialized".into()))?;
    let rendered = tera
        .render(name, context)
        .map_err(|e| Error::Template(format!("Failed to render template {name}: {e}")))?;
    drop(guard);

    Ok(rendered.trim_end().to_string())
}

/// Reset the template cache, forcing re-initialization on next use.
///
/// # Errors
///
/// Returns an error if the write lock cannot be acquired.
pub fn reset_cache() -> Result<()> {
    *TERA.write().map_err(|e| Error::Template(e.to_string()))? = None;
    Ok(())
}

/// Names of all embedded templates.
#[must_use]
pub fn embedded_template_names() -> Vec<&'static str> {
    EMBEDDED_TEMPLATES.keys().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn sample_context() -> Context {
        let mut ctx = Context::new();
        ctx.insert("lint_dir", "/proj");
        ctx.insert("lint_command", "make lint");
        ctx.insert("lint_output", "main.go:1: bad");
        ctx.insert("test_dir", "/proj");
        ctx.insert("test_command", "make test");
        ctx.insert("test_output", "FAIL TestX");
        ctx
    }

    #[test]
    #[serial]
    fn test_all_embedded_templates_render() {
        reset_cache().unwrap();
        for name in embedded_template_names() {
            let rendered = render(name, &sample_context()).unwrap();
            assert!(rendered.starts_with("⛔ BLOCKING"), "{name}: {rendered}");
        }
    }

    #[test]
    #[serial]
    fn test_lint_failed_message() {
        reset_cache().unwrap();
        let rendered = render(LINT_FAILED, &sample_context()).unwrap();
        assert_eq!(
            rendered,
            "⛔ BLOCKING: Run 'cd /proj && make lint' to fix lint failures\n\nmain.go:1: bad"
        );
    }

    #[test]
    #[serial]
    fn test_empty_output_omitted() {
        reset_cache().unwrap();
        let mut ctx = sample_context();
        ctx.insert("test_output", "");
        let rendered = render(TEST_FAILED, &ctx).unwrap();
        assert_eq!(rendered, "⛔ BLOCKING: Run 'cd /proj && make test' to fix test failures");
    }

    #[test]
    #[serial]
    fn test_both_failed_includes_both_outputs() {
        reset_cache().unwrap();
        let rendered = render(BOTH_FAILED, &sample_context()).unwrap();
        assert!(rendered.contains("'cd /proj && make lint' and 'cd /proj && make test'"));
        assert!(rendered.contains("Lint output:\nmain.go:1: bad"));
        assert!(rendered.contains("Test output:\nFAIL TestX"));
    }

    #[test]
    #[serial]
    fn test_output_not_html_escaped() {
        reset_cache().unwrap();
        let mut ctx = sample_context();
        ctx.insert("lint_output", "expected <T> & found 'U'");
        let rendered = render(LINT_FAILED, &ctx).unwrap();
        assert!(rendered.ends_with("expected <T> & found 'U'"));
    }

    #[test]
    #[serial]
    fn test_override_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("messages")).unwrap();
        std::fs::write(dir.path().join("messages/lint_failed.tera"), "lint broke: {{ lint_command }}")
            .unwrap();

        init_templates(Some(dir.path())).unwrap();
        assert_eq!(render(LINT_FAILED, &sample_context()).unwrap(), "lint broke: make lint");
        // Non-overridden templates still come from the embedded set.
        assert!(render(TEST_FAILED, &sample_context()).unwrap().starts_with("⛔ BLOCKING"));

        reset_cache().unwrap();
    }

    #[test]
    #[serial]
    fn test_missing_override_dir_uses_embedded() {
        init_templates(Some(Path::new("/nonexistent/templates"))).unwrap();
        assert!(render(LINT_FAILED, &sample_context()).unwrap().starts_with("⛔ BLOCKING"));
        reset_cache().unwrap();
    }

    #[test]
    #[serial]
    fn test_unknown_template_is_error() {
        reset_cache().unwrap();
        assert!(matches!(render("messages/nope.tera", &Context::new()), Err(Error::Template(_))));
    }
}
