//! Frame driver: runs a [`FilterGraph`] on a dedicated thread.
//!
//! The driver owns the graph. Each loop iteration:
//! 1. Drain commands from the handle (edits are applied here, between frames).
//! 2. If started, run `update(dt)` then `process()`.
//! 3. Send statistics periodically.
//! 4. Rate-limit to the configured fps.
//!
//! A failed frame is dropped and reported as [`DriverMessage::FrameError`];
//! the loop keeps running.

use crate::config::DriverConfig;
use crate::graph::error::GraphResult;
use crate::graph::filter_graph::FilterGraph;
use crate::graph::id::NodeId;
use crate::graph::state::GraphState;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Structural edit applied on the driver thread between two frames.
pub type GraphEdit = Box<dyn FnOnce(&mut FilterGraph) -> GraphResult<()> + Send>;

/// Commands sent from callers to the driver thread.
pub enum DriverCommand {
    /// Start running frames.
    Start,
    /// Stop running frames; commands are still served.
    Stop,
    /// Change the target frame rate.
    SetFps(u32),
    /// Push a new resolution into the device output.
    PropagateNumPixels { num_pixels: usize, num_rows: usize },
    /// Apply an arbitrary edit to the graph.
    Edit(GraphEdit),
    /// Reply with [`DriverMessage::State`].
    RequestState,
    /// Reply with [`DriverMessage::Stats`].
    RequestStats,
    /// Stop the thread.
    Shutdown,
}

impl fmt::Debug for DriverCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverCommand::Start => write!(f, "Start"),
            DriverCommand::Stop => write!(f, "Stop"),
            DriverCommand::SetFps(fps) => write!(f, "SetFps({})", fps),
            DriverCommand::PropagateNumPixels {
                num_pixels,
                num_rows,
            } => write!(f, "PropagateNumPixels({}x{})", num_pixels, num_rows),
            DriverCommand::Edit(_) => write!(f, "Edit(..)"),
            DriverCommand::RequestState => write!(f, "RequestState"),
            DriverCommand::RequestStats => write!(f, "RequestStats"),
            DriverCommand::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Counters maintained by the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub frames: u64,
    pub failed_frames: u64,
    /// Wall time of the last `update` + `process`
    pub last_frame: Duration,
    pub active: bool,
    pub fps: u32,
}

/// Messages sent from the driver thread to callers.
#[derive(Debug, Clone)]
pub enum DriverMessage {
    /// A frame failed and was dropped.
    FrameError {
        node_id: Option<NodeId>,
        message: String,
    },
    /// An [`DriverCommand::Edit`] returned an error. The failing graph call
    /// was rejected; calls the edit made before it stay applied.
    EditFailed(String),
    State(GraphState),
    Stats(FrameStats),
    /// The driver thread is exiting.
    Shutdown,
}

/// Channel capacity for commands (caller → driver).
const CMD_CHANNEL_CAPACITY: usize = 256;
/// Channel capacity for messages (driver → caller).
const MSG_CHANNEL_CAPACITY: usize = 1024;

/// The driver loop. Usually started through [`FrameDriver::spawn`].
pub struct FrameDriver {
    graph: FilterGraph,
    config: DriverConfig,
    active: bool,
    running: Arc<AtomicBool>,
    cmd_rx: Receiver<DriverCommand>,
    msg_tx: Sender<DriverMessage>,
    last_frame_time: Option<Instant>,
    last_stats_time: Instant,
    stats: FrameStats,
}

impl FrameDriver {
    pub fn new(
        graph: FilterGraph,
        config: DriverConfig,
        cmd_rx: Receiver<DriverCommand>,
        msg_tx: Sender<DriverMessage>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            graph,
            config,
            active: false,
            running,
            cmd_rx,
            msg_tx,
            last_frame_time: None,
            last_stats_time: Instant::now(),
            stats: FrameStats {
                fps: config.fps,
                ..Default::default()
            },
        }
    }

    /// Move `graph` onto a new thread and return the handle controlling it.
    pub fn spawn(graph: FilterGraph, config: DriverConfig) -> std::io::Result<DriverHandle> {
        let (cmd_tx, cmd_rx) = bounded(CMD_CHANNEL_CAPACITY);
        let (msg_tx, msg_rx) = bounded(MSG_CHANNEL_CAPACITY);
        let running = Arc::new(AtomicBool::new(true));

        let mut driver = FrameDriver::new(graph, config, cmd_rx, msg_tx, running.clone());
        let thread = std::thread::Builder::new()
            .name("audioled-frame".into())
            .spawn(move || {
                driver.run();
                driver.graph
            })?;

        Ok(DriverHandle {
            cmd_tx,
            msg_rx,
            running,
            thread: Some(thread),
        })
    }

    pub fn graph(&self) -> &FilterGraph {
        &self.graph
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    // ── Main run loop ──

    /// Run until `running` is cleared or Shutdown is received.
    pub fn run(&mut self) {
        tracing::info!("Frame driver started at {} fps", self.config.fps);

        while self.running.load(Ordering::Relaxed) {
            self.process_commands();
            if !self.running.load(Ordering::Relaxed) {
                break;
            }

            if self.active {
                self.frame();
            }

            if self.last_stats_time.elapsed() >= self.config.stats_interval() {
                self.send_stats();
                self.last_stats_time = Instant::now();
            }

            self.rate_limit();
        }

        self.send(DriverMessage::Shutdown);
        tracing::info!(
            "Frame driver exiting after {} frames ({} failed)",
            self.stats.frames,
            self.stats.failed_frames
        );
    }

    fn process_commands(&mut self) {
        while let Ok(cmd) = self.cmd_rx.try_recv() {
            tracing::trace!("Driver command {:?}", cmd);
            match cmd {
                DriverCommand::Start => {
                    if !self.active {
                        self.active = true;
                        self.last_frame_time = None;
                        tracing::info!("Frame driver running");
                    }
                }
                DriverCommand::Stop => {
                    if self.active {
                        self.active = false;
                        tracing::info!("Frame driver stopped");
                    }
                }
                DriverCommand::SetFps(fps) => {
                    self.config.fps = fps;
                }
                DriverCommand::PropagateNumPixels {
                    num_pixels,
                    num_rows,
                } => {
                    self.graph.propagate_num_pixels(num_pixels, num_rows);
                }
                DriverCommand::Edit(edit) => {
                    if let Err(err) = edit(&mut self.graph) {
                        tracing::warn!("Graph edit failed: {}", err);
                        self.send(DriverMessage::EditFailed(err.to_string()));
                    }
                }
                DriverCommand::RequestState => {
                    self.send(DriverMessage::State(self.graph.state()));
                }
                DriverCommand::RequestStats => {
                    self.send_stats();
                }
                DriverCommand::Shutdown => {
                    self.running.store(false, Ordering::Relaxed);
                    return;
                }
            }
        }
    }

    /// Run one `update` + `process` pass.
    pub fn frame(&mut self) {
        let start = Instant::now();
        let dt = match self.last_frame_time {
            Some(last) => start.duration_since(last).as_secs_f64(),
            None => self
                .config
                .frame_interval()
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0),
        };
        self.last_frame_time = Some(start);

        let result = self.graph.update(dt).and_then(|()| self.graph.process());
        self.stats.frames += 1;
        self.stats.last_frame = start.elapsed();

        if let Err(err) = result {
            self.stats.failed_frames += 1;
            let node_id = err.node_id();
            match node_id {
                Some(id) => tracing::error!("Frame dropped, node {:?} failed: {}", id, err),
                None => tracing::error!("Frame dropped: {}", err),
            }
            self.send(DriverMessage::FrameError {
                node_id,
                message: err.to_string(),
            });
        }
    }

    fn send_stats(&mut self) {
        self.stats.active = self.active;
        self.stats.fps = self.config.fps;
        self.send(DriverMessage::Stats(self.stats));
    }

    fn send(&self, msg: DriverMessage) {
        match self.msg_tx.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(msg)) => {
                tracing::trace!("Message channel full, dropping {:?}", msg);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    // ── Rate limiting ──

    fn rate_limit(&self) {
        let Some(target_interval) = self.config.frame_interval() else {
            std::thread::sleep(Duration::from_millis(10));
            return;
        };

        match self.last_frame_time {
            Some(last) if self.active => {
                let elapsed = last.elapsed();
                if elapsed < target_interval {
                    let remaining = target_interval - elapsed;
                    // Sleep most of the wait, spin the rest for sub-millisecond accuracy
                    if remaining > Duration::from_millis(2) {
                        std::thread::sleep(remaining - Duration::from_millis(1));
                    }
                    while last.elapsed() < target_interval {
                        std::hint::spin_loop();
                    }
                }
            }
            _ => {
                // Not running frames, idle wait
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }
}

/// Caller-side handle for a spawned [`FrameDriver`].
///
/// Dropping the handle stops the driver thread and waits for it.
pub struct DriverHandle {
    cmd_tx: Sender<DriverCommand>,
    msg_rx: Receiver<DriverMessage>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<FilterGraph>>,
}

impl DriverHandle {
    pub fn send_command(&self, cmd: DriverCommand) -> bool {
        self.cmd_tx.send(cmd).is_ok()
    }

    pub fn start(&self) {
        let _ = self.cmd_tx.send(DriverCommand::Start);
    }

    pub fn stop(&self) {
        let _ = self.cmd_tx.send(DriverCommand::Stop);
    }

    pub fn set_fps(&self, fps: u32) {
        let _ = self.cmd_tx.send(DriverCommand::SetFps(fps));
    }

    pub fn propagate_num_pixels(&self, num_pixels: usize, num_rows: usize) {
        let _ = self.cmd_tx.send(DriverCommand::PropagateNumPixels {
            num_pixels,
            num_rows,
        });
    }

    /// Queue a graph edit. A failure comes back as [`DriverMessage::EditFailed`].
    pub fn edit<F>(&self, edit: F)
    where
        F: FnOnce(&mut FilterGraph) -> GraphResult<()> + Send + 'static,
    {
        let _ = self.cmd_tx.send(DriverCommand::Edit(Box::new(edit)));
    }

    pub fn request_state(&self) {
        let _ = self.cmd_tx.send(DriverCommand::RequestState);
    }

    pub fn request_stats(&self) {
        let _ = self.cmd_tx.send(DriverCommand::RequestStats);
    }

    /// Try to receive a single message without blocking.
    pub fn try_recv(&self) -> Option<DriverMessage> {
        self.msg_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<DriverMessage> {
        self.msg_rx.recv_timeout(timeout).ok()
    }

    /// Drain all pending messages.
    pub fn drain(&self) -> Vec<DriverMessage> {
        self.msg_rx.try_iter().collect()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stop the driver and take the graph back.
    ///
    /// Returns `None` if the driver thread panicked.
    pub fn shutdown(mut self) -> Option<FilterGraph> {
        let _ = self.cmd_tx.send(DriverCommand::Shutdown);
        let thread = self.thread.take()?;
        match thread.join() {
            Ok(graph) => Some(graph),
            Err(_) => {
                tracing::error!("Frame driver thread panicked");
                None
            }
        }
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.running.store(false, Ordering::Relaxed);
            let _ = thread.join();
        }
    }
}
