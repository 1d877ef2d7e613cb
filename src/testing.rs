//! Testing utilities and mock implementations.
//!
//! These types are provided for use in tests. They may appear unused in
//! the library itself but are consumed by unit and integration tests.
//!
//! Every fake is `Send + Sync` because lint and test run on separate threads.

#![allow(dead_code)]
#![allow(clippy::missing_panics_doc)]

use crate::discovery::{CommandDiscoverer, CommandKind, DiscoveredCommand};
use crate::error::Result;
use crate::store::Store;
use crate::traits::{Clock, CommandOutput, CommandRunner, Invocation, Processes};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type Call = (String, Vec<String>);

/// A mock command runner for testing.
///
/// Each expected command is matched by program and arguments, in any order,
/// since lint and test run concurrently. An unexpected call panics.
#[derive(Debug, Default)]
pub struct MockCommandRunner {
    expectations: Mutex<HashMap<Call, Vec<CommandOutput>>>,
    delays: Mutex<HashMap<Call, Duration>>,
    available_programs: Mutex<HashSet<String>>,
    calls: Mutex<Vec<Call>>,
    expected_count: AtomicUsize,
}

fn call_key(program: &str, args: &[impl AsRef<str>]) -> Call {
    (program.to_string(), args.iter().map(|a| a.as_ref().to_string()).collect())
}

impl MockCommandRunner {
    /// Create a new mock command runner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an expected command and its output.
    pub fn expect(&self, program: &str, args: &[&str], output: CommandOutput) {
        self.expectations.lock().unwrap().entry(call_key(program, args)).or_default().push(output);
        self.expected_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Make a command take `delay` before returning its output.
    pub fn delay(&self, program: &str, args: &[&str], delay: Duration) {
        self.delays.lock().unwrap().insert(call_key(program, args), delay);
    }

    /// Add a program as available on PATH.
    pub fn set_available(&self, program: &str) {
        self.available_programs.lock().unwrap().insert(program.to_string());
    }

    /// Number of commands run so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Commands run so far, in completion order.
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }

    /// Verify all expected commands were called.
    ///
    /// # Panics
    ///
    /// Panics if not all expected commands were called.
    pub fn verify(&self) {
        let made = self.call_count();
        let expected = self.expected_count.load(Ordering::SeqCst);
        assert_eq!(made, expected, "Expected {expected} command calls, but {made} were made");
    }
}

impl CommandRunner for MockCommandRunner {
    fn run(&self, invocation: &Invocation<'_>) -> Result<CommandOutput> {
        let key = call_key(invocation.program, invocation.args);

        let delay = self.delays.lock().unwrap().get(&key).copied();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let output = {
            let mut expectations = self.expectations.lock().unwrap();
            let queue = expectations.get_mut(&key);
            let output = queue.filter(|q| !q.is_empty()).map(|q| q.remove(0));
            output.unwrap_or_else(|| {
                panic!("Unexpected command call: {} {:?}", invocation.program, invocation.args)
            })
        };
        self.calls.lock().unwrap().push(key);
        Ok(output)
    }

    fn resolve(&self, program: &str) -> Option<PathBuf> {
        self.available_programs
            .lock()
            .unwrap()
            .contains(program)
            .then(|| PathBuf::from("/usr/bin").join(program))
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FakeClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeClock {
    /// A clock fixed at 2026-01-01T00:00:00Z.
    #[must_use]
    pub fn new() -> Self {
        Self::at(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())
    }

    /// A clock fixed at `now`.
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(by).unwrap();
    }

    /// Move the clock backward.
    pub fn rewind(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now -= chrono::Duration::from_std(by).unwrap();
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// A process table where only chosen PIDs are alive.
///
/// The current PID is alive unless explicitly marked dead.
#[derive(Debug)]
pub struct FakeProcesses {
    current: u32,
    alive: Mutex<HashSet<u32>>,
}

impl FakeProcesses {
    /// A table whose current process is `current`.
    #[must_use]
    pub fn new(current: u32) -> Self {
        Self { current, alive: Mutex::new(HashSet::from([current])) }
    }

    /// Mark `pid` alive or dead.
    pub fn set_alive(&self, pid: u32, alive: bool) {
        let mut set = self.alive.lock().unwrap();
        if alive {
            set.insert(pid);
        } else {
            set.remove(&pid);
        }
    }
}

impl Processes for FakeProcesses {
    fn current_pid(&self) -> u32 {
        self.current
    }

    fn is_alive(&self, pid: u32) -> bool {
        self.alive.lock().unwrap().contains(&pid)
    }
}

/// An in-memory [`Store`].
#[derive(Debug)]
pub struct MemoryStore<V> {
    table: Mutex<BTreeMap<String, V>>,
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self { table: Mutex::new(BTreeMap::new()) }
    }
}

impl<V> MemoryStore<V> {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<V: Clone + Send> Store<V> for MemoryStore<V> {
    fn get(&self, key: &str) -> Result<Option<V>> {
        Ok(self.table.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: V) -> Result<()> {
        self.table.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.table.lock().unwrap().remove(key).is_some())
    }

    fn entries(&self) -> Result<BTreeMap<String, V>> {
        Ok(self.table.lock().unwrap().clone())
    }
}

/// Wraps a discoverer and counts calls per kind.
pub struct CountingDiscoverer {
    inner: Box<dyn CommandDiscoverer>,
    lint_calls: AtomicUsize,
    test_calls: AtomicUsize,
}

impl CountingDiscoverer {
    /// Count calls forwarded to `inner`.
    pub fn new(inner: impl CommandDiscoverer + 'static) -> Self {
        Self { inner: Box::new(inner), lint_calls: AtomicUsize::new(0), test_calls: AtomicUsize::new(0) }
    }

    /// Calls made for `kind`.
    pub fn calls(&self, kind: CommandKind) -> usize {
        match kind {
            CommandKind::Lint => self.lint_calls.load(Ordering::SeqCst),
            CommandKind::Test => self.test_calls.load(Ordering::SeqCst),
        }
    }

    /// Calls made for either kind.
    pub fn total_calls(&self) -> usize {
        self.calls(CommandKind::Lint) + self.calls(CommandKind::Test)
    }
}

impl CommandDiscoverer for CountingDiscoverer {
    fn discover(
        &self,
        dir: &std::path::Path,
        project_root: &std::path::Path,
        kind: CommandKind,
    ) -> Result<Option<DiscoveredCommand>> {
        match kind {
            CommandKind::Lint => self.lint_calls.fetch_add(1, Ordering::SeqCst),
            CommandKind::Test => self.test_calls.fetch_add(1, Ordering::SeqCst),
        };
        self.inner.discover(dir, project_root, kind)
    }
}
