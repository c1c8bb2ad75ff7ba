//! External tool boundary.
//!
//! Every subprocess goes through a [`CommandRunner`] and comes back as
//! `Result<ToolOutput, ToolFailure>`. Stages match on the failure to apply
//! partial credit; nothing here is allowed to abort a validation.

pub mod eslint;
pub mod npm_audit;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use thiserror::Error;

/// A subprocess to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub timeout: Duration,
}

impl Invocation {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Command line for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured output of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code (None if terminated by a signal).
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Why an external tool produced no usable result.
#[derive(Error, Debug)]
pub enum ToolFailure {
    #[error("{program} is not installed or not on PATH")]
    Unavailable { program: String },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {}s", .timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },

    #[error("{tool} produced unusable output: {message}")]
    MalformedOutput { tool: String, message: String },
}

/// Launches subprocesses. Implemented by [`SystemRunner`]; tests substitute
/// scripted runners.
pub trait CommandRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolFailure>;

    /// Check that `program` is installed by running `program --version`.
    fn probe(&self, program: &str, timeout: Duration) -> Result<(), ToolFailure> {
        let output = self.run(&Invocation::new(program, timeout).arg("--version"))?;
        if output.success() {
            Ok(())
        } else {
            Err(ToolFailure::Unavailable {
                program: program.to_string(),
            })
        }
    }
}

/// Runs real processes with piped output and a hard deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolFailure> {
        let program = &invocation.program;
        let mut command = Command::new(program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &invocation.env {
            command.env(key, value);
        }

        tracing::debug!(command = %invocation.display(), "spawning external tool");
        let mut child = command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ToolFailure::Unavailable {
                program: program.clone(),
            },
            _ => ToolFailure::Spawn {
                program: program.clone(),
                source: e,
            },
        })?;

        // Drain pipes on threads so a chatty tool can't block on a full pipe.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let exit = wait_with_timeout(&mut child, invocation.timeout).map_err(|e| {
            ToolFailure::Spawn {
                program: program.clone(),
                source: e,
            }
        })?;

        match exit {
            WaitOutcome::Exited(exit_code) => Ok(ToolOutput {
                exit_code,
                stdout: join(stdout),
                stderr: join(stderr),
            }),
            // Readers stay detached: grandchildren may still hold the pipes.
            WaitOutcome::TimedOut => Err(ToolFailure::TimedOut {
                program: program.clone(),
                timeout: invocation.timeout,
            }),
        }
    }
}

enum WaitOutcome {
    Exited(Option<i32>),
    TimedOut,
}

/// Poll a child until it exits or the deadline passes; kill it on expiry.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<WaitOutcome> {
    let start = Instant::now();
    let poll_interval = Duration::from_millis(50);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(WaitOutcome::Exited(status.code())),
            Ok(None) => {}
            Err(e) => {
                reap(child);
                return Err(e);
            }
        }
        if start.elapsed() >= timeout {
            reap(child);
            return Ok(WaitOutcome::TimedOut);
        }
        std::thread::sleep(poll_interval);
    }
}

/// Kill and reap. Already-exited races are fine.
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}
