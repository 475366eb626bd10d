use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::{BoardCommand, BoardOptions, BoardPhase, BoardState};
use crate::source::{ApiError, Snapshot, StatusApi};

/// Controller task body.
///
/// Loads config and snapshot concurrently, then refreshes the snapshot on a
/// fixed cadence until stopped. Every fetch is awaited inside the loop, so a
/// slow backend delays the next tick instead of stacking requests.
pub(super) async fn run(
    api: Arc<dyn StatusApi>,
    options: BoardOptions,
    state_tx: watch::Sender<BoardState>,
    mut commands: mpsc::Receiver<BoardCommand>,
    mut stop_rx: watch::Receiver<bool>,
) -> Result<(), ApiError> {
    info!(source = api.description(), "Loading board");

    let (config, snapshot) = tokio::join!(api.config(), api.read_all());
    let (config, snapshot) = match (config, snapshot) {
        (Ok(config), Ok(snapshot)) => (config, snapshot),
        (Err(e), _) | (_, Err(e)) => {
            error!(error = %e, "Initial load failed");
            state_tx.send_modify(|s| s.phase = BoardPhase::Failed(e.to_string()));
            return Err(e);
        }
    };

    let cadence = options.cadence(&config);
    info!(
        groups = config.groups.len(),
        records = snapshot.len(),
        cadence_ms = cadence.as_millis() as u64,
        "Board loaded"
    );

    state_tx.send_modify(|s| {
        s.config = Some(Arc::new(config));
        s.snapshot = Some(Arc::new(snapshot));
        s.generation += 1;
        s.last_refresh = Some(Utc::now());
        s.cadence = Some(cadence);
        s.phase = BoardPhase::Ready;
    });

    loop {
        tokio::select! {
            _ = tokio::time::sleep(cadence) => {
                debug!("Refresh tick");
                swap_snapshot(&state_tx, false, api.read_all()).await;
            }
            Some(command) = commands.recv() => {
                debug!(?command, "Manual refresh");
                match command {
                    BoardCommand::RefreshAll => {
                        swap_snapshot(&state_tx, true, api.refresh_all()).await;
                    }
                    BoardCommand::RefreshEndpoint { group, endpoint } => {
                        let api = Arc::clone(&api);
                        let fetch = async move {
                            api.refresh_endpoint(&group, &endpoint).await?;
                            api.read_all().await
                        };
                        swap_snapshot(&state_tx, true, fetch).await;
                    }
                }
            }
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
        }
    }

    info!("Board controller stopped");
    Ok(())
}

/// Run one fetch and publish its outcome. A failure keeps the previous
/// snapshot and generation.
async fn swap_snapshot<F>(state_tx: &watch::Sender<BoardState>, manual: bool, fetch: F)
where
    F: Future<Output = Result<Snapshot, ApiError>>,
{
    state_tx.send_modify(|s| {
        s.phase = BoardPhase::Refreshing;
        s.busy = manual;
    });

    let result = fetch.await;

    state_tx.send_modify(|s| {
        match result {
            Ok(snapshot) => {
                s.snapshot = Some(Arc::new(snapshot));
                s.generation += 1;
                s.last_refresh = Some(Utc::now());
                s.last_error = None;
            }
            Err(e) => {
                warn!(error = %e, "Refresh failed, keeping previous snapshot");
                s.last_error = Some(e.to_string());
            }
        }
        s.phase = BoardPhase::Ready;
        s.busy = false;
    });
}
