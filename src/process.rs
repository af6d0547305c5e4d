//! Deadline-bound execution of external commands.
//!
//! Every compiler run, test-binary run and post-link fixup goes through an
//! [`Executor`]. The real one, [`ProcessRunner`], captures stdout and stderr
//! into a single buffer and kills the child once the deadline passes.

use crate::error::{CmError, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Output of a command that exited successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    pub output: Vec<u8>,
}

impl ProcessResult {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Result of running a test binary. A non-zero exit means "tests failed",
/// never a tool failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRunOutcome {
    pub exit_code: Option<i32>,
    pub output: Vec<u8>,
}

impl TestRunOutcome {
    pub fn passed(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

pub trait Executor {
    /// Run to completion, capturing combined output. Non-zero exit is an
    /// [`CmError::Execution`] carrying the output.
    fn execute(&self, program: &str, args: &[String]) -> Result<ProcessResult>;

    /// Run attached to the caller's stdin/stdout/stderr.
    fn execute_interactive(&self, program: &str, args: &[String]) -> Result<()>;

    /// Run a test binary. Only launch failures and timeouts are errors.
    fn execute_tests(&self, program: &str, args: &[String]) -> Result<TestRunOutcome> {
        match self.execute(program, args) {
            Ok(result) => Ok(TestRunOutcome {
                exit_code: Some(0),
                output: result.output,
            }),
            Err(CmError::Execution {
                status: Some(status),
                output,
                ..
            }) => Ok(TestRunOutcome {
                exit_code: status.code(),
                output,
            }),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
    working_dir: Option<PathBuf>,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn command(&self, program: &str, args: &[String]) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Like [`Self::command`], but the child leads its own process group so a
    /// timeout can take down everything it forked (`cc1plus`, `as`, `ld`).
    fn grouped_command(&self, program: &str, args: &[String]) -> Command {
        let mut cmd = self.command(program, args);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        cmd
    }

    fn spawn_failed(program: &str, args: &[String], e: std::io::Error) -> CmError {
        CmError::Execution {
            command: display_command(program, args),
            status: None,
            output: format!("could not start {}: {}", program, e).into_bytes(),
        }
    }

    /// Poll the child until it exits or the deadline passes.
    fn wait_with_deadline(&self, child: &mut Child) -> std::io::Result<Option<ExitStatus>> {
        let deadline = Instant::now() + self.timeout;
        let mut backoff = Duration::from_millis(1);
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            let now = Instant::now();
            if now >= deadline {
                kill_tree(child);
                child.wait()?;
                return Ok(None);
            }
            thread::sleep(backoff.min(deadline - now));
            backoff = (backoff * 2).min(Duration::from_millis(50));
        }
    }
}

impl Executor for ProcessRunner {
    fn execute(&self, program: &str, args: &[String]) -> Result<ProcessResult> {
        let mut child = self
            .grouped_command(program, args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Self::spawn_failed(program, args, e))?;

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let readers: Vec<JoinHandle<()>> = [
            child.stdout.take().map(|s| drain(s, Arc::clone(&buffer))),
            child.stderr.take().map(|s| drain(s, Arc::clone(&buffer))),
        ]
        .into_iter()
        .flatten()
        .collect();

        let waited = self.wait_with_deadline(&mut child);
        // After a kill, anything that escaped the group may still hold the pipes.
        let grace = matches!(waited, Ok(None)).then_some(READER_GRACE);
        join_readers(readers, grace);
        let output = match Arc::try_unwrap(buffer) {
            Ok(m) => m.into_inner().unwrap_or_else(|p| p.into_inner()),
            Err(shared) => shared.lock().map(|b| b.clone()).unwrap_or_default(),
        };

        let command = display_command(program, args);
        match waited {
            Ok(Some(status)) if status.success() => Ok(ProcessResult { output }),
            Ok(Some(status)) => Err(CmError::Execution {
                command,
                status: Some(status),
                output,
            }),
            Ok(None) => Err(CmError::Timeout {
                command,
                limit: self.timeout,
                output,
            }),
            Err(e) => Err(CmError::Execution {
                command,
                status: None,
                output: format!("could not wait for process: {}", e).into_bytes(),
            }),
        }
    }

    fn execute_interactive(&self, program: &str, args: &[String]) -> Result<()> {
        let mut child = self
            .command(program, args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Self::spawn_failed(program, args, e))?;

        let command = display_command(program, args);
        match self.wait_with_deadline(&mut child) {
            Ok(Some(status)) if status.success() => Ok(()),
            Ok(Some(status)) => Err(CmError::Execution {
                command,
                status: Some(status),
                output: Vec::new(),
            }),
            Ok(None) => Err(CmError::Timeout {
                command,
                limit: self.timeout,
                output: Vec::new(),
            }),
            Err(e) => Err(CmError::Execution {
                command,
                status: None,
                output: e.to_string().into_bytes(),
            }),
        }
    }
}

/// How long to wait for pipe readers once the command has been killed.
const READER_GRACE: Duration = Duration::from_millis(250);

/// Kill the child and, on Unix, every process in its group.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Ok(pid) = i32::try_from(child.id()) {
            let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
        }
    }
    child.kill().ok();
}

/// Join the readers. With a grace period, readers still blocked when it runs
/// out are detached and the output collected so far is kept.
fn join_readers(readers: Vec<JoinHandle<()>>, grace: Option<Duration>) {
    let Some(grace) = grace else {
        for reader in readers {
            let _ = reader.join();
        }
        return;
    };

    let deadline = Instant::now() + grace;
    let mut pending = readers;
    while !pending.is_empty() && Instant::now() < deadline {
        let (done, running): (Vec<_>, Vec<_>) =
            pending.into_iter().partition(|r| r.is_finished());
        for reader in done {
            let _ = reader.join();
        }
        pending = running;
        if !pending.is_empty() {
            thread::sleep(Duration::from_millis(5));
        }
    }
}

fn drain<R: Read + Send + 'static>(mut source: R, sink: Arc<Mutex<Vec<u8>>>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        loop {
            match source.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if let Ok(mut buf) = sink.lock() {
                        buf.extend_from_slice(&chunk[..n]);
                    }
                }
            }
        }
    })
}

/// `program arg1 arg2 ...`, for diagnostics.
pub fn display_command(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

/// Path to a binary in a form `Command` will execute rather than look up on `PATH`.
pub fn executable_path(path: &Path) -> String {
    if path.is_absolute() || path.components().count() > 1 {
        path.to_string_lossy().into_owned()
    } else {
        format!("./{}", path.display())
    }
}
