//! Board controller: owns the polling lifecycle.
//!
//! The controller runs as a single tokio task. It fetches the topology once
//! and the health snapshot repeatedly, and publishes whole [`BoardState`]
//! values through a watch channel. The UI only ever reads those states, so it
//! never sees a half-updated snapshot and never blocks on the network.
//!
//! ```text
//!            ┌──────────── BoardHandle ─────────────┐
//!  commands ─┼─▶ mpsc ──▶ ┌──────────────┐          │
//!            │            │  controller  │──▶ watch ┼─▶ App (render pass)
//!  shutdown ─┼─▶ watch ─▶ │    task      │          │
//!            │            └──────┬───────┘          │
//!            └───────────────────┼──────────────────┘
//!                                ▼
//!                           StatusApi
//! ```

mod controller;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::source::{ApiError, Config, Snapshot, StatusApi};

/// Shortest refresh cadence the controller will use.
pub const MIN_REFRESH: Duration = Duration::from_secs(1);

/// Lifecycle phase of the board.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BoardPhase {
    /// Initial config and snapshot fetches are in flight.
    #[default]
    Loading,
    /// Data is loaded and displayed.
    Ready,
    /// A snapshot refetch is in flight; the previous data is still shown.
    Refreshing,
    /// The initial load failed. The controller has stopped.
    Failed(String),
}

impl BoardPhase {
    pub fn label(&self) -> &'static str {
        match self {
            BoardPhase::Loading => "Loading",
            BoardPhase::Ready => "Ready",
            BoardPhase::Refreshing => "Refreshing",
            BoardPhase::Failed(_) => "Failed",
        }
    }
}

/// Everything the UI needs to draw the board.
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    pub phase: BoardPhase,
    /// Topology, present once loaded. Never replaced afterwards.
    pub config: Option<Arc<Config>>,
    /// Latest snapshot, swapped as a whole on every successful fetch.
    pub snapshot: Option<Arc<Snapshot>>,
    /// Incremented on every snapshot swap. Unchanged by failed refreshes.
    pub generation: u64,
    /// When the current snapshot was received.
    pub last_refresh: Option<DateTime<Utc>>,
    /// Most recent refresh failure, cleared by the next success.
    pub last_error: Option<String>,
    /// A manual refresh is running.
    pub busy: bool,
    /// Cadence of the automatic refresh.
    pub cadence: Option<Duration>,
}

impl BoardState {
    /// Config and snapshot, once both are loaded.
    pub fn data(&self) -> Option<(&Arc<Config>, &Arc<Snapshot>)> {
        Some((self.config.as_ref()?, self.snapshot.as_ref()?))
    }
}

/// Options for the controller.
#[derive(Debug, Clone, Default)]
pub struct BoardOptions {
    /// Fixed refresh cadence. When unset, half the backend's interval is used.
    pub refresh_override: Option<Duration>,
}

impl BoardOptions {
    /// Cadence for the automatic refresh.
    ///
    /// Half the backend's probe interval, so the board never shows data older
    /// than one full backend cycle. Never below [`MIN_REFRESH`].
    pub fn cadence(&self, config: &Config) -> Duration {
        let cadence = match self.refresh_override {
            Some(fixed) => fixed,
            None if config.refresh_interval > 0.0 => {
                Duration::try_from_secs_f64(config.refresh_interval / 2.0).unwrap_or(MIN_REFRESH)
            }
            None => MIN_REFRESH,
        };
        cadence.max(MIN_REFRESH)
    }
}

/// Requests the UI can send to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardCommand {
    /// Have the backend re-probe everything, then show the fresh snapshot.
    RefreshAll,
    /// Have the backend re-probe one endpoint, then re-read the snapshot.
    RefreshEndpoint { group: String, endpoint: String },
}

/// Starts board controllers.
pub struct Board;

impl Board {
    /// Spawn the controller task. The initial config and snapshot fetches
    /// start immediately and run concurrently.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(api: Arc<dyn StatusApi>, options: BoardOptions) -> BoardHandle {
        let (state_tx, state_rx) = watch::channel(BoardState::default());
        let (command_tx, command_rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);

        let task = tokio::spawn(controller::run(api, options, state_tx, command_rx, stop_rx));

        BoardHandle {
            state: state_rx,
            commands: command_tx,
            stop_tx,
            task,
        }
    }
}

/// Handle to a running controller.
///
/// Dropping the handle stops the refresh loop; [`BoardHandle::shutdown`] does
/// so explicitly and also abandons any fetch in flight.
#[derive(Debug)]
pub struct BoardHandle {
    state: watch::Receiver<BoardState>,
    commands: mpsc::Sender<BoardCommand>,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<Result<(), ApiError>>,
}

impl BoardHandle {
    /// Current state.
    pub fn state(&self) -> BoardState {
        self.state.borrow().clone()
    }

    /// A receiver that observes every published state.
    pub fn subscribe(&self) -> watch::Receiver<BoardState> {
        self.state.clone()
    }

    /// Request a full backend refresh. Returns false if the request could not
    /// be queued (controller stopped or already saturated with requests).
    pub fn refresh_all(&self) -> bool {
        self.commands.try_send(BoardCommand::RefreshAll).is_ok()
    }

    /// Request a refresh of a single endpoint.
    pub fn refresh_endpoint(&self, group: &str, endpoint: &str) -> bool {
        self.commands
            .try_send(BoardCommand::RefreshEndpoint {
                group: group.to_string(),
                endpoint: endpoint.to_string(),
            })
            .is_ok()
    }

    /// Whether the controller task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the refresh loop and abandon any fetch in flight.
    pub fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        self.task.abort();
    }

    /// Wait for the controller to end and return its result. Only the initial
    /// load can fail; the refresh loop itself never returns an error.
    pub async fn join(self) -> Result<(), ApiError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(ApiError::Http(format!("controller task ended: {}", e))),
        }
    }
}
