//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for driving the drts CLI against an isolated daemon.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};

// Aggressive timeouts for fast tests.
const DRTS_TIMEOUT_CONNECT_MS: &str = "2000";
const DRTS_TIMEOUT_EXIT_MS: &str = "500";
const DRTS_TIMEOUT_IPC_MS: &str = "500";
const DRTS_CONNECT_POLL_MS: &str = "5";

pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 2000;

/// Path to a workspace binary, falling back to the test binary's target dir.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // target/debug/deps/specs-<hash> -> target/debug/
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

fn drts_binary() -> PathBuf {
    binary_path("drts")
}

pub fn drtsd_binary() -> PathBuf {
    binary_path("drtsd")
}

pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// Fluent CLI invocation
pub struct CliBuilder {
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            envs: vec![
                (
                    "DRTS_DAEMON_BINARY".into(),
                    drtsd_binary().to_string_lossy().into(),
                ),
                ("DRTS_TIMEOUT_CONNECT_MS".into(), DRTS_TIMEOUT_CONNECT_MS.into()),
                ("DRTS_TIMEOUT_EXIT_MS".into(), DRTS_TIMEOUT_EXIT_MS.into()),
                ("DRTS_TIMEOUT_IPC_MS".into(), DRTS_TIMEOUT_IPC_MS.into()),
                ("DRTS_CONNECT_POLL_MS".into(), DRTS_CONNECT_POLL_MS.into()),
            ],
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((
            key.to_string(),
            value.as_ref().to_string_lossy().to_string(),
        ));
        self
    }

    pub fn command(self) -> Command {
        let mut cmd = Command::new(drts_binary());
        cmd.args(&self.args);
        cmd.env_remove("XDG_STATE_HOME");
        for (key, value) in self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    /// Start the command without waiting for it
    pub fn spawn(self) -> Child {
        let mut cmd = self.command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd.spawn().expect("command should spawn")
    }

    /// Run and expect exit code 0
    pub fn passes(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect a non-zero exit code
    pub fn fails(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    /// Exact stdout comparison with a diff on failure
    pub fn stdout_eq(self, expected: &str) -> Self {
        similar_asserts::assert_eq!(self.stdout(), expected);
        self
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{}'\nstdout: {}",
            expected,
            stdout
        );
        self
    }

    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            !stdout.contains(unexpected),
            "stdout should not contain '{}'\nstdout: {}",
            unexpected,
            stdout
        );
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{}'\nstderr: {}",
            expected,
            stderr
        );
        self
    }
}

/// Poll `condition` until it holds or `timeout_ms` elapses
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);
    let poll_interval = std::time::Duration::from_millis(SPEC_POLL_INTERVAL_MS);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(poll_interval);
    }
    false
}

/// An isolated state directory with its own daemon.
pub struct Cluster {
    state_dir: tempfile::TempDir,
    workers: Vec<Child>,
}

impl Cluster {
    pub fn new() -> Self {
        Self {
            state_dir: tempfile::tempdir().unwrap(),
            workers: Vec::new(),
        }
    }

    pub fn state_path(&self) -> &Path {
        self.state_dir.path()
    }

    /// Run drts against this cluster's daemon
    pub fn drts(&self) -> CliBuilder {
        cli().env("DRTS_STATE_DIR", self.state_path())
    }

    /// Write `config.toml` before the daemon starts
    pub fn settings(&self, content: &str) {
        std::fs::write(self.state_path().join("config.toml"), content).unwrap();
    }

    /// Start `drts worker` in the background and wait until the daemon lists it
    pub fn worker(&mut self, args: &[&str]) {
        let name = args
            .iter()
            .position(|a| *a == "--name")
            .and_then(|i| args.get(i + 1))
            .copied()
            .expect("worker needs --name");

        let mut argv = vec!["worker"];
        argv.extend_from_slice(args);
        self.workers.push(self.drts().args(&argv).spawn());

        let registered = wait_for(SPEC_WAIT_MAX_MS, || {
            let output = self.drts().args(&["workers"]).command().output().unwrap();
            String::from_utf8_lossy(&output.stdout).contains(name)
        });
        assert!(registered, "worker {} never registered\n{}", name, self.daemon_log());
    }

    pub fn job_state(&self, id: &str) -> String {
        let output = self
            .drts()
            .args(&["status", id, "-o", "json"])
            .command()
            .output()
            .unwrap();
        let value: serde_json::Value =
            serde_json::from_slice(&output.stdout).unwrap_or(serde_json::Value::Null);
        value["state"].as_str().unwrap_or("").to_string()
    }

    pub fn daemon_log(&self) -> String {
        std::fs::read_to_string(self.state_path().join("daemon.log"))
            .unwrap_or_else(|_| "(no daemon log)".to_string())
    }
}

impl Default for Cluster {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        for worker in &mut self.workers {
            let _ = worker.kill();
            let _ = worker.wait();
        }
        let mut cmd = self.drts().args(&["daemon", "stop"]).command();
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
        let _ = cmd.status();
    }
}
