//! Worker process handle
//!
//! Spawns one external process with piped output, merges stdout and stderr
//! into a single line stream and terminates the process with a graceful
//! signal followed by a forced kill.

use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{SupervisorError, SupervisorResult};

/// Lines longer than this are split rather than buffered without bound
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Queue depth between the pipe readers and the consumer
const OUTPUT_QUEUE_DEPTH: usize = 256;

/// Handle for one spawned worker
#[derive(Debug)]
pub struct WorkerProcess {
    child: Child,
    pid: u32,
    program: String,
}

impl WorkerProcess {
    /// Spawn `command[0]` with the remaining elements as arguments
    pub fn spawn(command: &[String]) -> SupervisorResult<(Self, OutputLines)> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| SupervisorError::config("worker command is empty"))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| SupervisorError::Spawn {
            program: program.clone(),
            source,
        })?;

        let pid = child.id().unwrap_or(0);

        let mut readers: Vec<Box<dyn AsyncRead + Send + Unpin>> = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(Box::new(stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(Box::new(stderr));
        }

        debug!(pid, program = %program, "🔧 Spawned worker process");

        let process = Self {
            child,
            pid,
            program: program.clone(),
        };
        Ok((process, OutputLines::from_readers(readers)))
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Non-blocking exit check
    pub fn is_alive(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(None) => true,     // Still running
            Ok(Some(_)) => false, // Exited
            Err(_) => false,      // Error checking status
        }
    }

    /// Stop the process: graceful signal, then a forced kill after `grace`
    ///
    /// Returns only once the process has exited.
    pub async fn terminate(&mut self, grace: Duration) -> SupervisorResult<()> {
        if !self.is_alive() {
            return Ok(());
        }

        self.signal_graceful_stop();

        match timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!(pid = self.pid, %status, "Worker exited after stop signal");
                return Ok(());
            }
            Ok(Err(e)) => {
                warn!(pid = self.pid, error = %e, "Waiting for worker exit failed, forcing kill");
            }
            Err(_) => {
                warn!(pid = self.pid, grace_secs = grace.as_secs_f64(), "Worker ignored stop signal, forcing kill");
            }
        }

        if let Err(e) = self.child.kill().await {
            if self.is_alive() {
                return Err(e.into());
            }
        }
        Ok(())
    }

    #[cfg(unix)]
    fn signal_graceful_stop(&mut self) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let sent = i32::try_from(self.pid)
            .ok()
            .filter(|pid| *pid > 0)
            .map(|pid| kill(Pid::from_raw(pid), Signal::SIGTERM));

        match sent {
            Some(Ok(())) => {}
            Some(Err(e)) => warn!(pid = self.pid, error = %e, "SIGTERM failed"),
            None => {
                let _ = self.child.start_kill();
            }
        }
    }

    #[cfg(not(unix))]
    fn signal_graceful_stop(&mut self) {
        let _ = self.child.start_kill();
    }
}

/// Merged, line-oriented output of a worker
///
/// Lines end at `\n` or `\r`; progress-reporting encoders redraw their status
/// line with a bare carriage return. The sequence ends once every underlying
/// reader has reached end of file.
#[derive(Debug)]
pub struct OutputLines {
    receiver: mpsc::Receiver<io::Result<String>>,
}

impl OutputLines {
    pub fn from_readers<R>(readers: Vec<R>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let (sender, receiver) = mpsc::channel(OUTPUT_QUEUE_DEPTH);
        for reader in readers {
            tokio::spawn(pump_lines(reader, sender.clone()));
        }
        Self { receiver }
    }

    /// Next line, or `None` when the output has closed
    pub async fn next_line(&mut self) -> Option<io::Result<String>> {
        self.receiver.recv().await
    }
}

async fn pump_lines<R>(reader: R, sender: mpsc::Sender<io::Result<String>>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let (lines, consumed) = match reader.fill_buf().await {
            Ok([]) => break,
            Ok(buf) => (split_lines(&mut pending, buf), buf.len()),
            Err(e) => {
                let _ = sender.send(Err(e)).await;
                return;
            }
        };
        reader.consume(consumed);

        for line in lines {
            if sender.send(Ok(line)).await.is_err() {
                return;
            }
        }
    }

    if !pending.is_empty() {
        let _ = sender.send(Ok(String::from_utf8_lossy(&pending).into_owned())).await;
    }
}

fn split_lines(pending: &mut Vec<u8>, buf: &[u8]) -> Vec<String> {
    let mut lines = Vec::new();
    for &byte in buf {
        if byte == b'\n' || byte == b'\r' {
            if !pending.is_empty() {
                lines.push(String::from_utf8_lossy(pending).into_owned());
                pending.clear();
            }
        } else {
            pending.push(byte);
            if pending.len() >= MAX_LINE_BYTES {
                lines.push(String::from_utf8_lossy(pending).into_owned());
                pending.clear();
            }
        }
    }
    lines
}
