//! Turning SIGINT/SIGTERM into a [`CancelToken`].
//!
//! Validation itself is synchronous. Signals are awaited on a dedicated
//! thread running a current-thread tokio runtime; when one arrives the token
//! trips and the executor kills the running process groups.

use crate::cancel::CancelToken;
use std::io;
use std::thread::JoinHandle;

/// Spawn a thread that cancels `token` on SIGINT or SIGTERM.
///
/// The thread is detached in practice: it lives until a signal arrives or
/// the process exits.
///
/// # Errors
///
/// Returns an error if the runtime or the thread cannot be created.
pub fn watch_signals(token: CancelToken) -> io::Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

    std::thread::Builder::new().name("signal-watcher".to_string()).spawn(move || {
        runtime.block_on(async move {
            match wait_for_shutdown().await {
                Ok(name) => tracing::debug!(signal = name, "cancelling validation"),
                Err(e) => {
                    tracing::warn!(error = %e, "could not install signal handlers");
                    return;
                }
            }
            token.cancel();
        });
    })
}

#[cfg(unix)]
async fn wait_for_shutdown() -> io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => Ok("SIGTERM"),
        _ = sigint.recv() => Ok("SIGINT"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
