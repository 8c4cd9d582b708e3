// src/exec/worker.rs

//! Child process supervision for a single task.
//!
//! Each worker is a child process (`sh -c` for `EXEC`, `sleep` for `SLEEP`)
//! watched by its own tokio task. The supervisor owns a [`WorkerContext`]
//! describing that one invocation, so concurrent workers never share state.

use std::ffi::OsString;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Directive;
use crate::dag::WorkerId;
use crate::engine::ExitOutcome;
use crate::errors::{MasterError, Result};

use super::backend::{DispatchedTask, WorkerExit};

/// How long output readers may keep going after the child exited. Background
/// grandchildren can hold the pipes open indefinitely.
const OUTPUT_GRACE: Duration = Duration::from_millis(500);

/// Size of one read from a child's pipe.
const CHUNK_SIZE: usize = 8 * 1024;

/// Reported for a worker killed because its log file could not be created.
const SIGKILL: i32 = 9;

/// State of one worker invocation.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    pub index: usize,
    pub name: String,
    pub pid: WorkerId,
    pub log_path: PathBuf,
    pub timeout: Option<Duration>,
}

/// What the supervisor learned about a finished child.
#[derive(Debug)]
struct Completion {
    status: io::Result<ExitStatus>,
    timed_out: bool,
}

/// Spawn the child for `task` and hand it to a supervisor task.
///
/// Returns the child's pid. The exit is later reported on `exit_tx`.
pub fn spawn_worker(task: DispatchedTask, exit_tx: mpsc::Sender<WorkerExit>) -> Result<WorkerId> {
    let mut cmd = build_command(&task.directive);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|source| MasterError::Spawn {
        task: task.name.clone(),
        source,
    })?;
    let pid = child
        .id()
        .ok_or_else(|| MasterError::MissingPid(task.name.clone()))?;

    let ctx = WorkerContext {
        index: task.index,
        name: task.name,
        pid,
        log_path: task.log_path,
        timeout: task.timeout,
    };

    info!(
        task = %ctx.name,
        pid,
        directive = ?task.directive,
        timeout = ?ctx.timeout,
        "starting worker process"
    );

    tokio::spawn(supervise(ctx, child, exit_tx));
    Ok(pid)
}

fn build_command(directive: &Directive) -> Command {
    match directive {
        Directive::Exec { command } => {
            let mut c = Command::new("sh");
            c.arg("-c").arg(command);
            c
        }
        Directive::Sleep { seconds } => {
            let mut c = Command::new("sleep");
            c.arg(seconds.to_string());
            c
        }
    }
}

async fn supervise(ctx: WorkerContext, mut child: Child, exit_tx: mpsc::Sender<WorkerExit>) {
    let spool_path = stderr_spool_path(&ctx.log_path);
    let sinks = match open_sinks(&ctx.log_path, &spool_path).await {
        Ok(sinks) => Some(sinks),
        Err(e) => {
            warn!(
                task = %ctx.name,
                path = %ctx.log_path.display(),
                error = %e,
                "cannot create log file; killing worker"
            );
            if let Err(e) = child.start_kill() {
                warn!(task = %ctx.name, error = %e, "failed to kill worker");
            }
            None
        }
    };
    let log_opened = sinks.is_some();
    let (log, spool) = sinks.unzip();

    // Both pipes are drained while the child runs, whether or not there is
    // somewhere to write the bytes; an undrained pipe blocks the child.
    let stdout = OutputReader::spawn(&ctx, "stdout", child.stdout.take(), log);
    let stderr = OutputReader::spawn(&ctx, "stderr", child.stderr.take(), spool);

    let completion = wait_for_exit(&ctx, &mut child).await;
    let (stdout, stderr) = tokio::join!(stdout.finish(&ctx), stderr.finish(&ctx));

    let mut status = completion.status.map(ExitOutcome::from);
    if !log_opened {
        // The kill can land after the child already exited on its own; the
        // task still must not count as a success.
        if let Ok(outcome) = &mut status {
            if outcome.is_success() {
                *outcome = ExitOutcome::Signaled(SIGKILL);
            }
        }
    }

    if let Ok(outcome) = &status {
        if log_opened {
            let tail = LogTail {
                outcome: *outcome,
                timed_out: completion.timed_out,
            };
            if let Err(e) = finish_log(stdout, stderr, tail).await {
                warn!(task = %ctx.name, error = %e, "failed to write log file");
            }
        }
    }
    if log_opened {
        if let Err(e) = tokio::fs::remove_file(&spool_path).await {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(
                    task = %ctx.name,
                    path = %spool_path.display(),
                    error = %e,
                    "failed to remove stderr spool"
                );
            }
        }
    }

    match &status {
        Ok(outcome) => info!(task = %ctx.name, pid = ctx.pid, %outcome, "worker exited"),
        Err(e) => warn!(task = %ctx.name, pid = ctx.pid, error = %e, "waiting for worker failed"),
    }

    let exit = WorkerExit {
        pid: ctx.pid,
        status,
    };
    if exit_tx.send(exit).await.is_err() {
        debug!(task = %ctx.name, "master no longer listening for worker exits");
    }
}

/// Where stderr is kept until the stdout section of the log is closed.
pub fn stderr_spool_path(log_path: &Path) -> PathBuf {
    let mut path = OsString::from(log_path.as_os_str());
    path.push(".stderr");
    PathBuf::from(path)
}

/// Create the log file with its stdout header, and the stderr spool.
async fn open_sinks(log_path: &Path, spool_path: &Path) -> io::Result<(File, File)> {
    let mut log = File::create(log_path).await?;
    log.write_all(section_header("stdout").as_bytes()).await?;
    let spool = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(spool_path)
        .await?;
    Ok((log, spool))
}

/// Wait for the child, killing it if it outlives its timeout.
async fn wait_for_exit(ctx: &WorkerContext, child: &mut Child) -> Completion {
    let Some(limit) = ctx.timeout else {
        return Completion {
            status: child.wait().await,
            timed_out: false,
        };
    };

    match tokio::time::timeout(limit, child.wait()).await {
        Ok(status) => Completion {
            status,
            timed_out: false,
        },
        Err(_) => {
            warn!(task = %ctx.name, pid = ctx.pid, ?limit, "worker timed out; killing");
            if let Err(e) = child.kill().await {
                warn!(task = %ctx.name, error = %e, "failed to kill timed-out worker");
            }
            Completion {
                status: child.wait().await,
                timed_out: true,
            }
        }
    }
}

/// Bytes copied from one pipe, and the file they went to.
#[derive(Debug, Default)]
struct Captured {
    sink: Option<File>,
    bytes: u64,
    last_byte: Option<u8>,
}

impl Captured {
    fn needs_newline(&self) -> bool {
        self.last_byte.is_some_and(|b| b != b'\n')
    }
}

/// A pipe being copied into a file by its own task.
struct OutputReader {
    stream: &'static str,
    handle: JoinHandle<Captured>,
    stop: oneshot::Sender<()>,
}

impl OutputReader {
    fn spawn<R>(
        ctx: &WorkerContext,
        stream: &'static str,
        pipe: Option<R>,
        sink: Option<File>,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (stop, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(copy_output(ctx.name.clone(), stream, pipe, sink, stop_rx));
        Self {
            stream,
            handle,
            stop,
        }
    }

    /// Give the reader a grace period to reach end of stream, then stop it.
    async fn finish(mut self, ctx: &WorkerContext) -> Captured {
        let waited = tokio::time::timeout(OUTPUT_GRACE, &mut self.handle).await;
        let joined = match waited {
            Ok(joined) => joined,
            Err(_) => {
                warn!(
                    task = %ctx.name,
                    stream = self.stream,
                    "output still open after exit; discarding the rest"
                );
                let _ = self.stop.send(());
                self.handle.await
            }
        };
        joined.unwrap_or_else(|e| {
            warn!(task = %ctx.name, stream = self.stream, error = %e, "output reader panicked");
            Captured::default()
        })
    }
}

/// Copy raw bytes from `pipe` into `sink` until end of stream or `stop`.
///
/// A failing sink is dropped, but the pipe keeps being drained.
async fn copy_output<R>(
    task: String,
    stream: &'static str,
    pipe: Option<R>,
    sink: Option<File>,
    mut stop: oneshot::Receiver<()>,
) -> Captured
where
    R: AsyncRead + Unpin,
{
    let mut captured = Captured {
        sink,
        ..Captured::default()
    };
    let Some(mut pipe) = pipe else {
        return captured;
    };

    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let read = tokio::select! {
            _ = &mut stop => break,
            read = pipe.read(&mut buf) => read,
        };
        let chunk = match read {
            Ok(0) => break,
            Ok(n) => &buf[..n],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(task = %task, stream, error = %e, "reading worker output failed");
                break;
            }
        };

        for line in String::from_utf8_lossy(chunk).lines() {
            debug!(task = %task, stream, "{}", line);
        }
        captured.bytes += chunk.len() as u64;
        captured.last_byte = chunk.last().copied();

        if let Some(file) = captured.sink.as_mut() {
            if let Err(e) = file.write_all(chunk).await {
                warn!(task = %task, stream, error = %e, "writing worker output failed");
                captured.sink = None;
            }
        }
    }

    if let Some(file) = captured.sink.as_mut() {
        if let Err(e) = file.flush().await {
            warn!(task = %task, stream, error = %e, "flushing worker output failed");
            captured.sink = None;
        }
    }
    captured
}

/// How the worker ended, for the log trailer.
#[derive(Debug, Clone, Copy)]
struct LogTail {
    outcome: ExitOutcome,
    timed_out: bool,
}

/// Close the stdout section, append the spooled stderr section and the trailer.
async fn finish_log(stdout: Captured, stderr: Captured, tail: LogTail) -> io::Result<()> {
    let stdout_needs_newline = stdout.needs_newline();
    let stderr_needs_newline = stderr.needs_newline();
    let Some(mut log) = stdout.sink else {
        return Err(io::Error::other("stdout section was not written"));
    };

    if stdout_needs_newline {
        log.write_all(b"\n").await?;
    }
    log.write_all(section_footer("stdout").as_bytes()).await?;

    if stderr.bytes > 0 {
        log.write_all(section_header("stderr").as_bytes()).await?;
        match stderr.sink {
            Some(mut spool) => {
                spool.seek(SeekFrom::Start(0)).await?;
                tokio::io::copy(&mut spool, &mut log).await?;
            }
            None => log.write_all(b"(stderr could not be captured)\n").await?,
        }
        if stderr_needs_newline {
            log.write_all(b"\n").await?;
        }
        log.write_all(section_footer("stderr").as_bytes()).await?;
    }

    log.write_all(trailer(tail.outcome, tail.timed_out).as_bytes())
        .await?;
    log.flush().await
}

fn section_header(stream: &str) -> String {
    format!("=== Task output to {stream} ===\n")
}

fn section_footer(stream: &str) -> String {
    format!("=== End of task output to {stream} ===\n")
}

/// Last lines of a task's log file.
pub fn trailer(outcome: ExitOutcome, timed_out: bool) -> String {
    let mut out = match outcome {
        ExitOutcome::Exited(code) => format!("Process ended normally with code {code}\n"),
        ExitOutcome::Signaled(signal) => format!("Process killed by signal {signal}\n"),
    };
    if timed_out {
        out.push_str("Process killed due to timeout\n");
    }
    out
}
