//! Ownership of a spawned Payara Micro process

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, info, trace, warn};

use payara_harness_common::{Error, Result};

/// How long a process gets to exit after SIGTERM before it is killed
const STOP_GRACE: Duration = Duration::from_secs(10);

/// Interval between liveness checks while stopping
const STOP_POLL: Duration = Duration::from_millis(100);

/// Output lines kept for the next waiter; older lines are dropped
const OUTPUT_BACKLOG: usize = 1024;

/// Handle to a running runtime process.
///
/// Output from stdout and stderr is drained by background threads and
/// delivered line by line to [`MicroProcess::wait_for`]. Only the most
/// recent [`OUTPUT_BACKLOG`] lines are retained between waits. The process
/// is terminated when the handle is dropped.
pub struct MicroProcess {
    child: Child,
    output: broadcast::Receiver<String>,
    stop_grace: Duration,
}

impl MicroProcess {
    /// Spawn the command with piped output
    pub fn spawn(mut command: Command, console_output: bool) -> Result<Self> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| {
            Error::Process(format!(
                "Failed to spawn {}: {}",
                command.get_program().to_string_lossy(),
                e
            ))
        })?;

        let (tx, rx) = broadcast::channel(OUTPUT_BACKLOG);
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, tx.clone(), console_output);
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, tx, console_output);
        }

        info!("Payara Micro started with PID {}", child.id());
        Ok(Self {
            child,
            output: rx,
            stop_grace: STOP_GRACE,
        })
    }

    /// Grace period between SIGTERM and SIGKILL
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Drop output produced since the last wait. Returns the number of
    /// lines discarded.
    pub fn discard_output(&mut self) -> usize {
        let mut discarded = 0;
        loop {
            match self.output.try_recv() {
                Ok(_) => discarded += 1,
                Err(TryRecvError::Lagged(n)) => discarded += n as usize,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return discarded,
            }
        }
    }

    /// Feed output lines to `inspect` until it returns an outcome.
    ///
    /// Fails with [`Error::Timeout`] when `limit` elapses first, and with
    /// [`Error::Process`] when the process closes its output.
    pub async fn wait_for<T, F>(&mut self, limit: Option<Duration>, mut inspect: F) -> Result<T>
    where
        F: FnMut(&str) -> Option<Result<T>>,
    {
        let output = &mut self.output;
        let child = &mut self.child;

        let wait = async move {
            loop {
                match output.recv().await {
                    Ok(line) => {
                        if let Some(outcome) = inspect(&line) {
                            return outcome;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Skipped {} lines of Payara Micro output", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            Err(match child.try_wait() {
                Ok(Some(status)) => Error::Process(format!("Payara Micro exited: {}", status)),
                Ok(None) => Error::Process("Payara Micro closed its output streams".to_string()),
                Err(e) => Error::Io(e),
            })
        };

        match limit {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| Error::Timeout {
                    seconds: limit.as_secs(),
                })?,
            None => wait.await,
        }
    }

    /// Terminate the process: SIGTERM, a grace period, then SIGKILL.
    ///
    /// Waiting happens on the async timer so the executor keeps running.
    pub async fn stop(&mut self) -> Result<()> {
        if !self.is_running() {
            self.child.wait()?;
            return Ok(());
        }

        info!("Stopping Payara Micro (pid: {})", self.child.id());

        if self.terminate() {
            let deadline = tokio::time::Instant::now() + self.stop_grace;
            while self.is_running() && tokio::time::Instant::now() < deadline {
                tokio::time::sleep(STOP_POLL).await;
            }
        }

        if self.is_running() {
            self.force_kill();
        }

        while self.is_running() {
            tokio::time::sleep(STOP_POLL).await;
        }
        let status = self.child.wait()?;
        info!("Payara Micro exited: {}", status);
        Ok(())
    }

    /// Blocking variant of [`MicroProcess::stop`], used on drop
    fn stop_blocking(&mut self) -> Result<()> {
        if !self.is_running() {
            self.child.wait()?;
            return Ok(());
        }

        info!("Stopping Payara Micro (pid: {})", self.child.id());

        if self.terminate() {
            let deadline = Instant::now() + self.stop_grace;
            while self.is_running() && Instant::now() < deadline {
                std::thread::sleep(STOP_POLL);
            }
        }

        if self.is_running() {
            self.force_kill();
        }

        let status = self.child.wait()?;
        info!("Payara Micro exited: {}", status);
        Ok(())
    }

    /// Send SIGTERM. Returns false when no signal could be delivered.
    #[cfg(unix)]
    fn terminate(&mut self) -> bool {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        kill(Pid::from_raw(self.child.id() as i32), Signal::SIGTERM).is_ok()
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> bool {
        false
    }

    fn force_kill(&mut self) {
        warn!("Force killing Payara Micro (pid: {})", self.child.id());
        if let Err(e) = self.child.kill() {
            warn!("Kill failed: {}", e);
        }
    }
}

impl Drop for MicroProcess {
    fn drop(&mut self) {
        let _ = self.stop_blocking();
    }
}

fn forward_lines<R>(stream: R, tx: broadcast::Sender<String>, console_output: bool)
where
    R: Read + Send + 'static,
{
    std::thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            let Ok(line) = line else { break };
            if console_output {
                info!(target: "payara_micro", "{}", line);
            } else {
                trace!(target: "payara_micro", "{}", line);
            }
            // Nobody listening any more is fine, keep draining the pipe
            let _ = tx.send(line);
        }
    });
}

/// Whether a line announces that the runtime finished booting
pub fn is_ready_line(line: &str) -> bool {
    line.contains("ready in") && line.contains("(ms)")
}

/// Extract `(host, port)` from the first http(s) URL in a line
pub fn parse_endpoint(line: &str) -> Option<(String, u16)> {
    let start = line.find("http://").or_else(|| line.find("https://"))?;
    let rest = &line[start..];
    let rest = &rest[rest.find("://")? + 3..];
    let authority = rest
        .split(|c: char| c == '/' || c.is_whitespace())
        .next()?;
    let (host, port) = authority.rsplit_once(':')?;
    if host.is_empty() {
        return None;
    }
    Some((host.to_string(), port.parse().ok()?))
}
