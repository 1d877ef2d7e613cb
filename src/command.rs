//! Real command execution and process-table access.

use crate::error::Result;
use crate::traits::{CommandOutput, CommandRunner, Invocation, Processes};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// ETXTBSY error code (errno 26 on Linux).
/// This error occurs when trying to execute a file that is currently being written.
const ETXTBSY: i32 = 26;

/// How often a running child is checked for exit, deadline and cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long output readers may keep running after the child exits.
///
/// A background grandchild can hold the pipes open; once this passes the
/// whole process group is killed so the readers see EOF.
const READER_GRACE: Duration = Duration::from_millis(500);

/// Spawn a command with retry logic for ETXTBSY errors.
///
/// ETXTBSY ("Text file busy") can occur on overlay filesystems (like Docker)
/// when executing a script that was just created. The file may still be held
/// open by the filesystem layer. A brief retry usually succeeds.
fn spawn_with_etxtbsy_retry<F>(mut spawn_fn: F) -> std::io::Result<Child>
where
    F: FnMut() -> std::io::Result<Child>,
{
    loop {
        match spawn_fn() {
            Ok(child) => return Ok(child),
            Err(e) if e.raw_os_error() == Some(ETXTBSY) => {
                std::thread::sleep(Duration::from_millis(1));
            }
            Err(e) => return Err(e),
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

fn readers_finished(
    stdout: Option<&JoinHandle<Vec<u8>>>,
    stderr: Option<&JoinHandle<Vec<u8>>>,
) -> bool {
    stdout.map_or(true, JoinHandle::is_finished) && stderr.map_or(true, JoinHandle::is_finished)
}

/// Kill every process in the child's process group, then the child itself.
fn kill_process_group(child: &mut Child) {
    #[cfg(unix)]
    {
        let _ = Command::new("kill")
            .args(["-KILL", "--", &format!("-{}", child.id())])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }
    let _ = child.kill();
}

/// Real command runner that executes external commands.
///
/// Each command runs in its own process group so that a timeout or
/// cancellation kills everything it started, not just the direct child.
#[derive(Debug, Default, Clone)]
pub struct RealCommandRunner;

impl RealCommandRunner {
    /// Create a new command runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CommandRunner for RealCommandRunner {
    fn run(&self, invocation: &Invocation<'_>) -> Result<CommandOutput> {
        let mut command = Command::new(invocation.program);
        command
            .args(invocation.args)
            .current_dir(invocation.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = spawn_with_etxtbsy_retry(|| command.spawn())?;
        let stdout: Option<JoinHandle<Vec<u8>>> =
            child.stdout.take().map(spawn_reader::<ChildStdout>);
        let stderr: Option<JoinHandle<Vec<u8>>> =
            child.stderr.take().map(spawn_reader::<ChildStderr>);

        let started = Instant::now();
        let mut timed_out = false;
        let mut cancelled = false;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if invocation.timeout.is_some_and(|limit| started.elapsed() >= limit) {
                timed_out = true;
            } else if invocation.cancel.is_some_and(|token| token.is_cancelled()) {
                cancelled = true;
            }
            if timed_out || cancelled {
                tracing::debug!(program = invocation.program, timed_out, cancelled, "killing");
                kill_process_group(&mut child);
                break child.wait()?;
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let exited = Instant::now();
        while !readers_finished(stdout.as_ref(), stderr.as_ref()) {
            if exited.elapsed() >= READER_GRACE {
                kill_process_group(&mut child);
                break;
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        let exit_code = if timed_out || cancelled { -1 } else { status.code().unwrap_or(-1) };
        Ok(CommandOutput {
            exit_code,
            stdout: collect(stdout),
            stderr: collect(stderr),
            timed_out,
            cancelled,
        })
    }

    fn resolve(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

/// The real OS process table.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsProcesses;

impl Processes for OsProcesses {
    fn current_pid(&self) -> u32 {
        std::process::id()
    }

    fn is_alive(&self, pid: u32) -> bool {
        if pid == 0 {
            return false;
        }
        #[cfg(target_os = "linux")]
        {
            std::path::Path::new(&format!("/proc/{pid}")).exists()
        }
        #[cfg(all(unix, not(target_os = "linux")))]
        {
            Command::new("kill")
                .args(["-0", &pid.to_string()])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .is_ok_and(|s| s.success())
        }
        #[cfg(not(unix))]
        {
            // No cheap probe; the lock age bound reclaims dead holders.
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use std::path::Path;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_run_echo() {
        let runner = RealCommandRunner::new();
        let args = vec!["hello".to_string()];
        let output = runner.run(&Invocation::new("echo", &args, Path::new("/"))).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[test]
    fn test_run_failing_command() {
        let runner = RealCommandRunner::new();
        let output = runner.run(&Invocation::new("false", &[], Path::new("/"))).unwrap();
        assert!(!output.success());
        assert_ne!(output.exit_code, 0);
    }

    #[test]
    fn test_run_uses_working_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let runner = RealCommandRunner::new();
        let args = sh("pwd");
        let output = runner.run(&Invocation::new("sh", &args, dir.path())).unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(Path::new(output.stdout.trim()).canonicalize().unwrap(), expected);
    }

    #[test]
    fn test_run_captures_both_streams() {
        let runner = RealCommandRunner::new();
        let args = sh("echo out; echo err >&2; exit 3");
        let output = runner.run(&Invocation::new("sh", &args, Path::new("/"))).unwrap();
        assert_eq!(output.exit_code, 3);
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[test]
    fn test_run_times_out() {
        let runner = RealCommandRunner::new();
        let args = sh("sleep 5");
        let started = Instant::now();
        let output = runner
            .run(&Invocation::new("sh", &args, Path::new("/")).with_timeout(Duration::from_millis(300)))
            .unwrap();
        assert!(output.timed_out);
        assert!(!output.success());
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_timeout_kills_grandchildren() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("survived");
        let runner = RealCommandRunner::new();
        let args = sh(&format!("(sleep 1; touch '{}') & wait", marker.display()));
        let output = runner
            .run(&Invocation::new("sh", &args, dir.path()).with_timeout(Duration::from_millis(200)))
            .unwrap();
        assert!(output.timed_out);
        std::thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists());
    }

    #[test]
    fn test_background_child_does_not_hang_reader() {
        let runner = RealCommandRunner::new();
        let args = sh("sleep 10 & echo done");
        let started = Instant::now();
        let output = runner.run(&Invocation::new("sh", &args, Path::new("/"))).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "done");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_run_cancelled() {
        let runner = RealCommandRunner::new();
        let args = sh("sleep 5");
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(200));
            trigger.cancel();
        });
        let started = Instant::now();
        let output =
            runner.run(&Invocation::new("sh", &args, Path::new("/")).with_cancel(&cancel)).unwrap();
        handle.join().unwrap();
        assert!(output.cancelled);
        assert!(!output.timed_out);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_resolve() {
        let runner = RealCommandRunner::new();
        assert!(runner.is_available("sh"));
        assert!(runner.resolve("definitely_not_a_real_command_12345").is_none());
    }

    #[test]
    fn test_run_nonexistent_command() {
        let runner = RealCommandRunner::new();
        let result =
            runner.run(&Invocation::new("definitely_not_a_real_command_12345", &[], Path::new("/")));
        assert!(result.is_err());
    }

    #[test]
    fn test_spawn_with_etxtbsy_retry_retries_on_etxtbsy() {
        let mut call_count = 0;
        let mut command = Command::new("true");
        command.stdout(Stdio::null()).stderr(Stdio::null());

        let result = spawn_with_etxtbsy_retry(|| {
            call_count += 1;
            if call_count < 3 {
                Err(std::io::Error::from_raw_os_error(ETXTBSY))
            } else {
                command.spawn()
            }
        });

        let mut child = result.unwrap();
        child.wait().unwrap();
        assert_eq!(call_count, 3);
    }

    #[test]
    fn test_spawn_with_etxtbsy_retry_propagates_other_errors() {
        let mut call_count = 0;
        let result = spawn_with_etxtbsy_retry(|| {
            call_count += 1;
            Err(std::io::Error::from_raw_os_error(2))
        });
        assert_eq!(call_count, 1);
        assert_eq!(result.unwrap_err().raw_os_error(), Some(2));
    }

    #[test]
    fn test_os_processes_current_is_alive() {
        let procs = OsProcesses;
        assert!(procs.is_alive(procs.current_pid()));
        assert!(!procs.is_alive(0));
    }

    #[test]
    fn test_os_processes_reaped_child_is_dead() {
        let mut child = Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        assert!(!OsProcesses.is_alive(pid));
    }
}
