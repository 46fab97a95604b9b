use std::ffi::OsStr;
use std::io::{BufRead, BufReader};
use std::process::{ChildStderr, ChildStdin, ChildStdout, ExitStatus};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use piperpc_frame::{FramerConfig, Message, MessageReader, MessageWriter};
use piperpc_rpc::{encode_notify, encode_request, Notification, Request};
use piperpc_transport::ChildProcess;
use tracing::debug;

use crate::error::{PeerError, Result};

/// A JSON-RPC channel over a child process's standard streams.
///
/// Outgoing writes are serialized: one framed message completes in full
/// before the next begins, so concurrent senders never interleave bytes on
/// the child's stdin. The two drain loops are independent of each other and
/// of senders; each stream can be claimed by exactly one drain, typically
/// running on its own thread.
pub struct PipeChannel {
    process: Mutex<ChildProcess>,
    writer: Mutex<Option<MessageWriter<ChildStdin>>>,
    stdout: Mutex<Option<ChildStdout>>,
    stderr: Mutex<Option<ChildStderr>>,
    config: FramerConfig,
    next_id: AtomicI64,
    pid: u32,
}

impl PipeChannel {
    /// Spawn `command` with all three streams pipe-connected.
    pub fn spawn<I, S>(command: impl AsRef<OsStr>, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Self::spawn_with_config(command, args, FramerConfig::default())
    }

    /// Spawn with explicit framing configuration for both directions.
    pub fn spawn_with_config<I, S>(
        command: impl AsRef<OsStr>,
        args: I,
        config: FramerConfig,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut process = ChildProcess::spawn(command, args)?;
        let stdin = process.take_stdin()?;
        let stdout = process.take_stdout()?;
        let stderr = process.take_stderr()?;
        let pid = process.id();

        Ok(Self {
            process: Mutex::new(process),
            writer: Mutex::new(Some(MessageWriter::with_config(stdin, config.clone()))),
            stdout: Mutex::new(Some(stdout)),
            stderr: Mutex::new(Some(stderr)),
            config,
            next_id: AtomicI64::new(1),
            pid,
        })
    }

    /// OS process id of the child.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Allocate the next request id. Monotonic per channel.
    pub fn next_request_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Frame and send a request down the child's stdin.
    ///
    /// Errors surface here, synchronously: a dead child means a broken pipe
    /// on this call, not a deferred failure.
    pub fn send_request(&self, request: &Request) -> Result<()> {
        let body = encode_request(request)?;
        debug!(method = %request.method, id = %request.id, "sending request");
        self.write_body(&body)
    }

    /// Frame and send a notification down the child's stdin.
    pub fn send_notify(&self, notification: &Notification) -> Result<()> {
        let body = encode_notify(notification)?;
        debug!(method = %notification.method, "sending notification");
        self.write_body(&body)
    }

    fn write_body(&self, body: &[u8]) -> Result<()> {
        let mut guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let writer = guard.as_mut().ok_or(PeerError::ChannelClosed)?;
        writer.write_message(body)?;
        Ok(())
    }

    /// Drain framed messages from the child's stdout until it closes.
    ///
    /// A UTF-8 byte order mark is tolerated once at the very start of the
    /// stream. Claims the stdout endpoint; a second call fails with
    /// [`PeerError::StreamTaken`]. Returns `Ok(())` when the child closes
    /// its end cleanly; framing errors are fatal to the stream and returned.
    pub fn drain_stdout(&self, mut on_message: impl FnMut(Message)) -> Result<()> {
        let stdout = self
            .stdout
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(PeerError::StreamTaken("stdout"))?;

        debug!(pid = self.pid, "draining stdout");
        let mut reader =
            MessageReader::with_config(stdout, self.config.clone()).strip_leading_bom();
        while let Some(message) = reader.read_message()? {
            on_message(message);
        }
        debug!(pid = self.pid, "stdout closed");
        Ok(())
    }

    /// Drain stderr line by line until it closes.
    ///
    /// Lines are delivered without their trailing newline; bytes that are
    /// not UTF-8 are replaced rather than dropped. Claims the stderr
    /// endpoint; a second call fails with [`PeerError::StreamTaken`].
    pub fn drain_stderr(&self, mut on_line: impl FnMut(&str)) -> Result<()> {
        let stderr = self
            .stderr
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(PeerError::StreamTaken("stderr"))?;

        debug!(pid = self.pid, "draining stderr");
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|err| PeerError::Transport(err.into()))?;
            if read == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            on_line(line.trim_end_matches(['\r', '\n']));
        }
        debug!(pid = self.pid, "stderr closed");
        Ok(())
    }

    /// Close every stream this channel still holds.
    ///
    /// Drops the stdin writer, which is the cooperative exit hint for the
    /// child, plus any stdout/stderr endpoint no drain has claimed. The
    /// process itself keeps running; pair with [`shutdown`] when the child
    /// must actually be gone.
    ///
    /// [`shutdown`]: PipeChannel::shutdown
    pub fn terminate(&self) {
        debug!(pid = self.pid, "closing channel streams");
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.stdout
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.stderr
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// [`terminate`], then escalate until the process has exited.
    ///
    /// Waits up to `grace` for a voluntary exit after the streams close,
    /// then falls back to signalling and killing. Always reaps.
    ///
    /// [`terminate`]: PipeChannel::terminate
    pub fn shutdown(&self, grace: Duration) -> Result<ExitStatus> {
        self.terminate();
        let mut process = self.process.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(process.shutdown(grace)?)
    }

    /// Check for child exit without blocking.
    pub fn try_wait(&self) -> Result<Option<ExitStatus>> {
        let mut process = self.process.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(process.try_wait()?)
    }
}

impl std::fmt::Debug for PipeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeChannel")
            .field("pid", &self.pid)
            .finish()
    }
}
