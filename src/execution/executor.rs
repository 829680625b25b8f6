//! Command execution engine.
//!
//! Every invocation runs in a fresh child process placed in its own process
//! group. The caller blocks until the child exits or the deadline passes; on
//! timeout the whole group gets SIGTERM, a grace period, then SIGKILL.

use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::command::{CommandRequest, Invocation};
use super::result::{CommandResult, SENTINEL_EXIT_CODE};
use crate::security::sanitize_for_display;
use crate::Result;

/// Default pause between SIGTERM and SIGKILL.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(500);

/// Interval between child status polls.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[cfg(unix)]
const DEFAULT_SHELL: &str = "sh";
#[cfg(unix)]
const SHELL_FLAG: &str = "-c";
#[cfg(windows)]
const DEFAULT_SHELL: &str = "cmd";
#[cfg(windows)]
const SHELL_FLAG: &str = "/C";

/// Executor settings.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Shell used for command lines. `None` uses `sh` (`cmd` on Windows).
    pub shell: Option<String>,
    /// Time the process group gets to exit after SIGTERM.
    pub grace_period: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            shell: None,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Runs [`CommandRequest`]s as child processes.
///
/// Holds no per-invocation state; one executor can serve any number of
/// concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    config: ExecutorConfig,
}

impl CommandExecutor {
    /// Create an executor with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an executor with the given settings.
    pub fn with_config(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run a command, blocking until it exits or times out.
    ///
    /// Always returns a result: timeouts and launch failures are encoded in
    /// [`CommandResult::outcome`] with exit code -1.
    pub fn execute(&self, request: &CommandRequest) -> CommandResult {
        let start = Instant::now();
        let shown = request.display();

        match panic::catch_unwind(AssertUnwindSafe(|| self.run(request, &shown, start))) {
            Ok(result) => result,
            Err(_) => {
                warn!(command = %sanitize_for_display(&shown), "executor panicked");
                CommandResult::launch_failed(shown, "internal executor failure", start.elapsed())
            }
        }
    }

    /// Run a command on tokio's blocking pool.
    pub async fn execute_async(&self, request: CommandRequest) -> CommandResult {
        let executor = self.clone();
        let shown = request.display();
        let start = Instant::now();

        match tokio::task::spawn_blocking(move || executor.execute(&request)).await {
            Ok(result) => result,
            Err(e) => CommandResult::launch_failed(shown, e, start.elapsed()),
        }
    }

    fn run(&self, request: &CommandRequest, shown: &str, start: Instant) -> CommandResult {
        // Timeouts too large for an Instant never expire.
        let deadline = start.checked_add(request.timeout());

        let mut child = match self.build_command(request).spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(command = %sanitize_for_display(shown), error = %e, "failed to launch command");
                return CommandResult::launch_failed(shown, e, start.elapsed());
            }
        };
        debug!(pid = child.id(), command = %sanitize_for_display(shown), "command spawned");

        let (tx, rx) = mpsc::channel();
        spawn_reader(child.stdout.take(), Stream::Stdout, tx.clone());
        spawn_reader(child.stderr.take(), Stream::Stderr, tx);

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if deadline.is_some_and(|d| Instant::now() >= d) => {
                    self.terminate(&mut child);
                    warn!(
                        command = %sanitize_for_display(shown),
                        timeout_secs = request.timeout_secs(),
                        "command timed out"
                    );
                    return CommandResult::timed_out(shown, request.timeout_secs(), start.elapsed());
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    self.terminate(&mut child);
                    warn!(command = %sanitize_for_display(shown), error = %e, "failed to wait on command");
                    return CommandResult::launch_failed(shown, e, start.elapsed());
                }
            }
        };

        // A background descendant may still hold the pipes open.
        let mut stdout = None;
        let mut stderr = None;
        while stdout.is_none() || stderr.is_none() {
            let received = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    rx.recv_timeout(remaining.max(POLL_INTERVAL))
                }
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok((Stream::Stdout, bytes)) => stdout = Some(bytes),
                Ok((Stream::Stderr, bytes)) => stderr = Some(bytes),
                Err(RecvTimeoutError::Timeout) => {
                    self.terminate_group(child.id(), None);
                    warn!(
                        command = %sanitize_for_display(shown),
                        timeout_secs = request.timeout_secs(),
                        "command output still open at deadline"
                    );
                    return CommandResult::timed_out(shown, request.timeout_secs(), start.elapsed());
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let exit_code = exit_code_of(status);
        debug!(exit_code, elapsed_ms = start.elapsed().as_millis() as u64, "command exited");

        CommandResult::exited(
            shown,
            exit_code,
            decode(stdout.unwrap_or_default()),
            decode(stderr.unwrap_or_default()),
            start.elapsed(),
        )
    }

    fn build_command(&self, request: &CommandRequest) -> Command {
        let mut cmd = match request.invocation() {
            Invocation::Shell(line) => {
                let shell = self.config.shell.as_deref().unwrap_or(DEFAULT_SHELL);
                let mut cmd = Command::new(shell);
                cmd.arg(SHELL_FLAG).arg(line);
                cmd
            }
            Invocation::Argv { program, args } => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
        };

        if let Some(dir) = request.working_dir() {
            cmd.current_dir(dir);
        }
        cmd.envs(request.env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        cmd
    }

    /// Stop a running child and everything in its process group, then reap it.
    fn terminate(&self, child: &mut Child) {
        let pid = child.id();
        self.terminate_group(pid, Some(child));
    }

    #[cfg(unix)]
    fn terminate_group(&self, pgid: u32, mut child: Option<&mut Child>) {
        let pgid = pgid as libc::pid_t;
        signal_group(pgid, libc::SIGTERM);

        let grace_deadline = Instant::now() + self.config.grace_period;
        let mut leader_done = child.is_none();
        while Instant::now() < grace_deadline {
            if let Some(child) = child.as_deref_mut() {
                if !leader_done {
                    leader_done = !matches!(child.try_wait(), Ok(None));
                }
            }
            if leader_done && !group_alive(pgid) {
                break;
            }
            thread::sleep(POLL_INTERVAL);
        }

        signal_group(pgid, libc::SIGKILL);
        if let Some(child) = child {
            let _ = child.wait();
        }
    }

    #[cfg(not(unix))]
    fn terminate_group(&self, _pgid: u32, child: Option<&mut Child>) {
        if let Some(child) = child {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

#[cfg(unix)]
fn signal_group(pgid: libc::pid_t, signal: libc::c_int) {
    // SAFETY: killpg only sends a signal; ESRCH for an empty group is ignored.
    let rc = unsafe { libc::killpg(pgid, signal) };
    if rc != 0 {
        debug!(pgid, signal, error = %std::io::Error::last_os_error(), "killpg failed");
    }
}

#[cfg(unix)]
fn group_alive(pgid: libc::pid_t) -> bool {
    // SAFETY: signal 0 performs the permission and existence check only.
    unsafe { libc::killpg(pgid, 0) == 0 }
}

fn spawn_reader<R>(pipe: Option<R>, stream: Stream, tx: Sender<(Stream, Vec<u8>)>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            if let Err(e) = pipe.read_to_end(&mut buf) {
                debug!(?stream, error = %e, "pipe read ended early");
            }
        }
        let _ = tx.send((stream, buf));
    });
}

fn decode(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    SENTINEL_EXIT_CODE
}

/// Run a shell command with the default timeout.
pub fn execute(command_line: &str) -> Result<CommandResult> {
    let request = CommandRequest::new(command_line)?;
    Ok(CommandExecutor::new().execute(&request))
}

/// Run a shell command with an explicit timeout in seconds.
pub fn execute_with_timeout(command_line: &str, timeout_secs: u64) -> Result<CommandResult> {
    let request = CommandRequest::with_timeout(command_line, timeout_secs)?;
    Ok(CommandExecutor::new().execute(&request))
}
