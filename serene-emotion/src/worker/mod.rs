//! Persistent inference worker supervision
//!
//! A [`WorkerSupervisor`] owns one long-lived subprocess that keeps a model
//! resident. Lifecycle: `Created → start() → Starting → (ready marker on
//! stderr) → Ready → exit or shutdown() → Stopped`. A stopped worker may be
//! started again; nothing restarts it automatically. Subscribe to the
//! [`EventBus`] to build a restart policy.
//!
//! Requests are serialized through a [`RequestQueue`]: only one request is
//! written to the worker's stdin while its response is outstanding. Requests
//! sent while the worker is still loading wait in the queue (their timeouts
//! keep running) and are written once the ready marker is seen.
//!
//! Concurrency: queue and state live behind one `std::sync::Mutex` that is
//! never held across an await. Reader, writer and exit tasks tag themselves
//! with the process generation that spawned them and ignore the shared state
//! once a newer generation (restart or shutdown) has taken over.

pub mod protocol;
pub mod queue;

pub use protocol::{InferenceMode, InferenceRequest, InferenceResponse};
pub use queue::{LineOutcome, RequestQueue};

use crate::config::WorkerConfig;
use crate::error::{InferenceError, InferenceResult};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serene_common::{request_id, EventBus, WorkerEvent};
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long the exit handler waits for stdout to drain after the process exits
const STDOUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Request/response capability of an inference backend
///
/// Implemented by [`WorkerSupervisor`]; clients depend on this trait so they
/// can be exercised without a subprocess.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Submit one request and wait for its response
    async fn infer(&self, request: InferenceRequest) -> InferenceResult<InferenceResponse>;
}

/// Worker lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Constructed, never started
    Created,
    /// Process spawned, model still loading
    Starting,
    /// Ready marker observed, serving requests
    Ready,
    /// Exited or shut down
    Stopped,
}

impl WorkerState {
    /// Whether a process handle exists
    pub fn is_running(self) -> bool {
        matches!(self, WorkerState::Starting | WorkerState::Ready)
    }
}

/// Point-in-time worker status for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub name: String,
    pub state: WorkerState,
    pub pid: Option<u32>,
    pub pending: usize,
}

struct Outgoing {
    request_id: String,
    line: String,
}

struct WorkerInner {
    state: WorkerState,
    generation: u64,
    pid: Option<u32>,
    queue: RequestQueue,
    writer: Option<mpsc::UnboundedSender<Outgoing>>,
    kill: Option<oneshot::Sender<()>>,
}

impl WorkerInner {
    /// Write the head of the queue if the worker is ready and nothing is in flight
    fn dispatch_next(&mut self, worker: &str) {
        if self.state != WorkerState::Ready {
            return;
        }

        while let Some((request_id, line)) = self.queue.take_dispatch() {
            let Some(writer) = &self.writer else {
                self.queue.fail(&request_id, InferenceError::WorkerNotRunning);
                continue;
            };

            debug!(
                worker = %worker,
                request_id = %request_id,
                queue_len = self.queue.len(),
                "Dispatching request"
            );

            match writer.send(Outgoing {
                request_id: request_id.clone(),
                line,
            }) {
                Ok(()) => return,
                Err(_) => {
                    // Writer task gone: stdin is closed
                    self.queue.fail(&request_id, InferenceError::WorkerTerminated);
                }
            }
        }
    }
}

struct Shared {
    name: String,
    events: EventBus,
    inner: Mutex<WorkerInner>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, WorkerInner> {
        // Every critical section leaves the queue consistent
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Supervisor for one persistent inference subprocess
///
/// Construct once at bootstrap and share by `Arc`.
pub struct WorkerSupervisor {
    config: WorkerConfig,
    shared: Arc<Shared>,
}

impl WorkerSupervisor {
    pub fn new(config: WorkerConfig, events: EventBus) -> Self {
        let shared = Arc::new(Shared {
            name: config.name.clone(),
            events,
            inner: Mutex::new(WorkerInner {
                state: WorkerState::Created,
                generation: 0,
                pid: None,
                queue: RequestQueue::new(),
                writer: None,
                kill: None,
            }),
        });
        Self { config, shared }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn state(&self) -> WorkerState {
        self.shared.lock().state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == WorkerState::Ready
    }

    pub fn status(&self) -> WorkerStatus {
        let inner = self.shared.lock();
        WorkerStatus {
            name: self.config.name.clone(),
            state: inner.state,
            pid: inner.pid,
            pending: inner.queue.len(),
        }
    }

    /// Spawn the worker process
    ///
    /// No-op if already starting or ready. Must be called from within a tokio
    /// runtime. The worker only becomes [`WorkerState::Ready`] once its ready
    /// marker appears on stderr.
    pub fn start(&self) -> InferenceResult<()> {
        let mut inner = self.shared.lock();
        if inner.state.is_running() {
            return Ok(());
        }

        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                InferenceError::SpawnError(format!("{}: {}", self.config.program, e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| InferenceError::SpawnError("stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| InferenceError::SpawnError("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| InferenceError::SpawnError("stderr not captured".to_string()))?;

        inner.generation += 1;
        let generation = inner.generation;
        let pid = child.id();

        let (writer_tx, writer_rx) = mpsc::unbounded_channel();
        let (kill_tx, kill_rx) = oneshot::channel();

        inner.state = WorkerState::Starting;
        inner.pid = pid;
        inner.writer = Some(writer_tx);
        inner.kill = Some(kill_tx);
        drop(inner);

        tokio::spawn(write_requests(
            Arc::clone(&self.shared),
            generation,
            stdin,
            writer_rx,
        ));
        let stdout_task = tokio::spawn(read_responses(
            Arc::clone(&self.shared),
            generation,
            stdout,
        ));
        tokio::spawn(read_stderr(
            Arc::clone(&self.shared),
            generation,
            stderr,
            self.config.ready_marker.clone(),
        ));
        tokio::spawn(watch_exit(
            Arc::clone(&self.shared),
            generation,
            child,
            kill_rx,
            stdout_task,
        ));

        info!(
            worker = %self.config.name,
            pid = ?pid,
            program = %self.config.program,
            "Worker spawned, waiting for ready marker"
        );
        self.shared.events.emit_lossy(WorkerEvent::Spawned {
            worker: self.config.name.clone(),
            pid,
            timestamp: Utc::now(),
        });

        Ok(())
    }

    /// Send a request using the configured timeout
    pub async fn send(&self, request: InferenceRequest) -> InferenceResult<InferenceResponse> {
        self.send_with_timeout(request, self.config.timeout()).await
    }

    /// Send a request with an explicit timeout
    ///
    /// Fails fast with [`InferenceError::WorkerNotRunning`] when no process
    /// exists. Otherwise resolves exactly once: with the worker's response, an
    /// error reported by the worker, [`InferenceError::RequestTimeout`], or
    /// [`InferenceError::WorkerTerminated`].
    pub async fn send_with_timeout(
        &self,
        request: InferenceRequest,
        timeout: Duration,
    ) -> InferenceResult<InferenceResponse> {
        let request_id = request_id::generate();
        let line = request.encode_line(&request_id)?;
        let (tx, mut rx) = oneshot::channel();

        {
            let mut inner = self.shared.lock();
            if !inner.state.is_running() {
                return Err(InferenceError::WorkerNotRunning);
            }
            inner.queue.push(request_id.clone(), line, tx);
            debug!(
                worker = %self.config.name,
                request_id = %request_id,
                mode = ?request.mode,
                queue_len = inner.queue.len(),
                "Request queued"
            );
            inner.dispatch_next(&self.config.name);
        }
        let _cancel = CancelOnDrop {
            shared: &self.shared,
            request_id: &request_id,
        };

        match tokio::time::timeout(timeout, &mut rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(InferenceError::WorkerTerminated),
            Err(_) => {
                let expired = {
                    let mut inner = self.shared.lock();
                    let expired = inner.queue.expire(&request_id);
                    if expired.is_some() {
                        inner.dispatch_next(&self.config.name);
                    }
                    expired
                };

                match expired {
                    Some(in_flight) => {
                        warn!(
                            worker = %self.config.name,
                            request_id = %request_id,
                            in_flight,
                            timeout_ms = timeout.as_millis() as u64,
                            "Request timed out"
                        );
                        self.shared.events.emit_lossy(WorkerEvent::RequestTimedOut {
                            worker: self.config.name.clone(),
                            request_id: request_id.clone(),
                            in_flight,
                            timestamp: Utc::now(),
                        });
                        Err(InferenceError::RequestTimeout(timeout))
                    }
                    // Resolved between the deadline and taking the lock
                    None => rx.try_recv().unwrap_or(Err(InferenceError::WorkerTerminated)),
                }
            }
        }
    }

    /// Terminate the worker and reject everything pending
    ///
    /// Idempotent; safe after the process has already exited.
    pub fn shutdown(&self) {
        let mut inner = self.shared.lock();
        let was_running = inner.state.is_running();

        if let Some(kill) = inner.kill.take() {
            let _ = kill.send(());
        }
        inner.writer = None;
        inner.pid = None;
        inner.state = WorkerState::Stopped;
        // Detach tasks of the old process
        inner.generation += 1;
        let rejected = inner.queue.reject_all(InferenceError::WorkerTerminated);
        drop(inner);

        if was_running {
            info!(worker = %self.config.name, rejected, "Worker shut down");
            self.shared.events.emit_lossy(WorkerEvent::ShutDown {
                worker: self.config.name.clone(),
                timestamp: Utc::now(),
            });
        }
    }
}

/// Withdraws a request whose caller stopped waiting
///
/// A completed or timed-out request has already left the queue, so this only
/// acts when the `send` future is dropped mid-wait.
struct CancelOnDrop<'a> {
    shared: &'a Shared,
    request_id: &'a str,
}

impl Drop for CancelOnDrop<'_> {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        if let Some(in_flight) = inner.queue.expire(self.request_id) {
            debug!(
                worker = %self.shared.name,
                request_id = %self.request_id,
                in_flight,
                "Caller cancelled request"
            );
            inner.dispatch_next(&self.shared.name);
        }
    }
}

impl Drop for WorkerSupervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[async_trait]
impl InferenceBackend for WorkerSupervisor {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn infer(&self, request: InferenceRequest) -> InferenceResult<InferenceResponse> {
        self.send(request).await
    }
}

async fn write_requests(
    shared: Arc<Shared>,
    generation: u64,
    mut stdin: ChildStdin,
    mut rx: mpsc::UnboundedReceiver<Outgoing>,
) {
    while let Some(outgoing) = rx.recv().await {
        let written = async {
            stdin.write_all(outgoing.line.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await
        }
        .await;

        if let Err(e) = written {
            warn!(
                worker = %shared.name,
                request_id = %outgoing.request_id,
                error = %e,
                "Failed to write request to worker stdin"
            );
            let mut inner = shared.lock();
            if inner.generation != generation {
                return;
            }
            inner.queue.fail(&outgoing.request_id, InferenceError::WorkerTerminated);
            inner.dispatch_next(&shared.name);
        }
    }
}

async fn read_responses(shared: Arc<Shared>, generation: u64, stdout: ChildStdout) {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(worker = %shared.name, error = %e, "Worker stdout read failed");
                break;
            }
        }

        let text = std::str::from_utf8(&buf);
        if text.is_ok_and(|line| line.trim().is_empty()) {
            continue;
        }

        let mut inner = shared.lock();
        if inner.generation != generation {
            return;
        }

        let outcome = match text {
            Ok(line) => inner.queue.route_line(line),
            Err(e) => inner.queue.route_malformed(format!("output is not valid UTF-8: {}", e)),
        };

        match outcome {
            LineOutcome::Delivered { request_id } => {
                debug!(worker = %shared.name, request_id = %request_id, "Response delivered");
            }
            LineOutcome::Rejected { request_id } => {
                warn!(
                    worker = %shared.name,
                    request_id = %request_id,
                    "Worker response rejected"
                );
            }
            LineOutcome::Discarded { request_id } => {
                warn!(
                    worker = %shared.name,
                    request_id = ?request_id,
                    "Discarded response for abandoned request"
                );
                if let Some(request_id) = request_id {
                    shared.events.emit_lossy(WorkerEvent::LateResponseDiscarded {
                        worker: shared.name.clone(),
                        request_id,
                        timestamp: Utc::now(),
                    });
                }
            }
            LineOutcome::Unsolicited => {
                warn!(
                    worker = %shared.name,
                    "Unsolicited worker output: {}",
                    String::from_utf8_lossy(&buf).trim_end()
                );
            }
        }

        inner.dispatch_next(&shared.name);
    }

    debug!(worker = %shared.name, "Worker stdout closed");
}

async fn read_stderr(
    shared: Arc<Shared>,
    generation: u64,
    stderr: ChildStderr,
    ready_marker: String,
) {
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    let mut ready_seen = false;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        // Model libraries write arbitrary bytes to stderr
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end();
        debug!(target: "serene_emotion::worker::stderr", worker = %shared.name, "{}", line);

        if ready_seen || !line.contains(ready_marker.as_str()) {
            continue;
        }
        ready_seen = true;

        let mut inner = shared.lock();
        if inner.generation != generation {
            return;
        }
        if inner.state == WorkerState::Starting {
            inner.state = WorkerState::Ready;
            info!(
                worker = %shared.name,
                queued = inner.queue.len(),
                "Worker ready"
            );
            shared.events.emit_lossy(WorkerEvent::Ready {
                worker: shared.name.clone(),
                timestamp: Utc::now(),
            });
            inner.dispatch_next(&shared.name);
        }
    }
}

async fn watch_exit(
    shared: Arc<Shared>,
    generation: u64,
    mut child: Child,
    kill_rx: oneshot::Receiver<()>,
    stdout_task: JoinHandle<()>,
) {
    let exited = tokio::select! {
        status = child.wait() => Some(status),
        _ = kill_rx => None,
    };
    let status = match exited {
        Some(status) => status,
        None => {
            // Shutdown requested (or supervisor dropped)
            let _ = child.start_kill();
            child.wait().await
        }
    };

    // Let responses already written reach their callers first
    let _ = tokio::time::timeout(STDOUT_DRAIN_TIMEOUT, stdout_task).await;

    let exit_code = match &status {
        Ok(status) => status.code(),
        Err(e) => {
            warn!(worker = %shared.name, error = %e, "Failed to wait for worker exit");
            None
        }
    };

    let mut inner = shared.lock();
    if inner.generation != generation {
        debug!(worker = %shared.name, exit_code = ?exit_code, "Previous worker process exited");
        return;
    }

    inner.state = WorkerState::Stopped;
    inner.writer = None;
    inner.kill = None;
    inner.pid = None;
    let rejected = inner.queue.reject_all(InferenceError::WorkerTerminated);
    drop(inner);

    warn!(
        worker = %shared.name,
        exit_code = ?exit_code,
        rejected,
        "Worker process exited"
    );
    shared.events.emit_lossy(WorkerEvent::Terminated {
        worker: shared.name.clone(),
        exit_code,
        rejected,
        timestamp: Utc::now(),
    });
}
