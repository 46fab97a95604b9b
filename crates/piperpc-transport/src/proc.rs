use std::ffi::OsStr;
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{Result, TransportError};

/// Poll interval while waiting for a child to exit.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long a child gets between SIGTERM and the final kill.
const TERM_GRACE: Duration = Duration::from_millis(250);

/// A spawned child process with all three standard streams pipe-connected.
///
/// The process may outlive this handle: dropping it closes nothing and kills
/// nothing. Callers that want the child gone use [`shutdown`] or [`kill`].
///
/// [`shutdown`]: ChildProcess::shutdown
/// [`kill`]: ChildProcess::kill
pub struct ChildProcess {
    child: Child,
    command: String,
}

impl ChildProcess {
    /// Spawn `command` with stdin, stdout, and stderr connected to pipes.
    ///
    /// Arguments are passed verbatim to the OS; no shell interprets them.
    pub fn spawn<I, S>(command: impl AsRef<OsStr>, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let command_name = command.as_ref().to_string_lossy().into_owned();
        let child = Command::new(command.as_ref())
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| TransportError::Spawn {
                command: command_name.clone(),
                source,
            })?;

        debug!(command = %command_name, pid = child.id(), "spawned child process");

        Ok(Self {
            child,
            command: command_name,
        })
    }

    /// OS process id.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// The command this child was spawned from, for diagnostics.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Take the write end of the child's stdin. Each endpoint can be taken once.
    pub fn take_stdin(&mut self) -> Result<ChildStdin> {
        self.child
            .stdin
            .take()
            .ok_or(TransportError::StreamUnavailable { stream: "stdin" })
    }

    /// Take the read end of the child's stdout. Each endpoint can be taken once.
    pub fn take_stdout(&mut self) -> Result<ChildStdout> {
        self.child
            .stdout
            .take()
            .ok_or(TransportError::StreamUnavailable { stream: "stdout" })
    }

    /// Take the read end of the child's stderr. Each endpoint can be taken once.
    pub fn take_stderr(&mut self) -> Result<ChildStderr> {
        self.child
            .stderr
            .take()
            .ok_or(TransportError::StreamUnavailable { stream: "stderr" })
    }

    /// Check for exit without blocking.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        self.child.try_wait().map_err(TransportError::Wait)
    }

    /// Block until the child exits and reap it.
    pub fn wait(&mut self) -> Result<ExitStatus> {
        self.child.wait().map_err(TransportError::Wait)
    }

    /// Wait up to `timeout` for the child to exit.
    ///
    /// Returns `Ok(None)` if the child is still running when time runs out.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<ExitStatus>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.try_wait()? {
                return Ok(Some(status));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            std::thread::sleep(WAIT_POLL_INTERVAL.min(deadline - now));
        }
    }

    /// Force-kill the child immediately.
    pub fn kill(&mut self) -> Result<()> {
        self.child.kill().map_err(TransportError::Kill)
    }

    /// Escalating shutdown: wait up to `grace` for a voluntary exit, then
    /// SIGTERM with a short follow-up wait, then kill. Always reaps.
    ///
    /// Closing the child's stdin beforehand is the cooperative exit hint;
    /// this path exists for children that ignore it.
    pub fn shutdown(&mut self, grace: Duration) -> Result<ExitStatus> {
        if let Some(status) = self.wait_timeout(grace)? {
            debug!(pid = self.id(), ?status, "child exited within grace period");
            return Ok(status);
        }

        #[cfg(unix)]
        {
            self.send_sigterm();
            if let Some(status) = self.wait_timeout(TERM_GRACE)? {
                debug!(pid = self.id(), ?status, "child exited after SIGTERM");
                return Ok(status);
            }
        }

        warn!(pid = self.id(), command = %self.command, "child ignored shutdown; killing");
        self.kill()?;
        self.wait()
    }

    #[cfg(unix)]
    fn send_sigterm(&self) {
        let pid = self.child.id() as libc::pid_t;
        // SAFETY: plain signal send to a pid we spawned and have not reaped.
        let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
        if rc == 0 {
            debug!(pid, "sent SIGTERM");
        } else {
            debug!(pid, "SIGTERM not delivered; child likely already exited");
        }
    }
}

impl std::fmt::Debug for ChildProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildProcess")
            .field("command", &self.command)
            .field("pid", &self.child.id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::*;

    #[test]
    fn spawn_failure_names_command() {
        let err = ChildProcess::spawn("piperpc-no-such-binary", std::iter::empty::<&str>())
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::Spawn { command, .. } if command == "piperpc-no-such-binary"
        ));
    }

    #[test]
    #[cfg(unix)]
    fn endpoints_taken_exactly_once() {
        let mut child = ChildProcess::spawn("cat", std::iter::empty::<&str>()).unwrap();

        assert!(child.take_stdin().is_ok());
        assert!(child.take_stdout().is_ok());
        assert!(child.take_stderr().is_ok());

        let err = child.take_stdin().unwrap_err();
        assert!(matches!(
            err,
            TransportError::StreamUnavailable { stream: "stdin" }
        ));

        child.kill().unwrap();
        child.wait().unwrap();
    }

    #[test]
    #[cfg(unix)]
    fn stdin_to_stdout_roundtrip() {
        let mut child = ChildProcess::spawn("cat", std::iter::empty::<&str>()).unwrap();

        let mut stdin = child.take_stdin().unwrap();
        let mut stdout = child.take_stdout().unwrap();

        stdin.write_all(b"ping").unwrap();
        drop(stdin);

        let mut out = Vec::new();
        stdout.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"ping");

        assert!(child.wait().unwrap().success());
    }

    #[test]
    #[cfg(unix)]
    fn stderr_is_independent() {
        let mut child = ChildProcess::spawn("sh", ["-c", "echo oops >&2"]).unwrap();

        let mut stderr = child.take_stderr().unwrap();
        let mut err = String::new();
        stderr.read_to_string(&mut err).unwrap();
        assert_eq!(err, "oops\n");

        assert!(child.wait().unwrap().success());
    }

    #[test]
    #[cfg(unix)]
    fn wait_timeout_none_while_running() {
        let mut child = ChildProcess::spawn("sleep", ["5"]).unwrap();

        let status = child.wait_timeout(Duration::from_millis(50)).unwrap();
        assert!(status.is_none());

        child.kill().unwrap();
        child.wait().unwrap();
    }

    #[test]
    #[cfg(unix)]
    fn wait_timeout_reports_exit() {
        let mut child = ChildProcess::spawn("true", std::iter::empty::<&str>()).unwrap();

        let status = child.wait_timeout(Duration::from_secs(5)).unwrap();
        assert!(status.unwrap().success());
    }

    #[test]
    #[cfg(unix)]
    fn shutdown_reaps_quick_child() {
        let mut child = ChildProcess::spawn("true", std::iter::empty::<&str>()).unwrap();

        let status = child.shutdown(Duration::from_secs(5)).unwrap();
        assert!(status.success());
    }

    #[test]
    #[cfg(unix)]
    fn shutdown_terminates_sleeping_child() {
        let mut child = ChildProcess::spawn("sleep", ["10"]).unwrap();

        let status = child.shutdown(Duration::from_millis(50)).unwrap();
        assert!(!status.success());
    }

    #[test]
    #[cfg(unix)]
    fn shutdown_kills_child_that_ignores_sigterm() {
        let mut child =
            ChildProcess::spawn("sh", ["-c", "trap '' TERM; sleep 10"]).unwrap();

        let status = child.shutdown(Duration::from_millis(50)).unwrap();
        assert!(!status.success());
    }
}
