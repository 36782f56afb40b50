//! Long-running background task that polls the Soroban RPC and writes
//! decoded EduFund events to the database.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db;
use crate::rpc;

pub struct IndexerState {
    pub pool: SqlitePool,
    pub config: Config,
    pub client: Client,
}

/// Run the indexer loop until `shutdown` is cancelled.
pub async fn run(state: Arc<IndexerState>, shutdown: CancellationToken) {
    info!("Indexer starting — contract: {}", state.config.contract_id);

    let (mut current_ledger, mut cursor) =
        resume_point(&state.pool, state.config.start_ledger).await;

    info!("Resuming from ledger {current_ledger}");

    loop {
        let poll = poll_once(
            &state.pool,
            &state.client,
            &state.config,
            current_ledger,
            cursor.as_deref(),
        );

        tokio::select! {
            _ = shutdown.cancelled() => break,
            result = poll => match result {
                Ok((next_ledger, next_cursor)) => {
                    current_ledger = next_ledger;
                    cursor = next_cursor;
                }
                Err(e) => {
                    error!("Indexer poll error: {e}");
                }
            },
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(state.config.poll_interval_secs)) => {}
        }
    }

    info!("Indexer stopped at ledger {current_ledger}");
}

/// Load the saved ledger and cursor; fall back to `start_ledger` and no
/// cursor when nothing is saved or the database cannot be read.
async fn resume_point(pool: &SqlitePool, start_ledger: u32) -> (u32, Option<String>) {
    let last_ledger = db::get_last_ledger(pool).await.unwrap_or_else(|e| {
        warn!("Could not read saved ledger, rescanning from the start ledger: {e}");
        0
    });
    let cursor = db::get_cursor_string(pool).await.unwrap_or_else(|e| {
        warn!("Could not read saved cursor, paginating from scratch: {e}");
        None
    });

    let ledger = if last_ledger > 0 {
        last_ledger as u32
    } else {
        start_ledger
    };
    (ledger, cursor)
}

/// Perform a single poll iteration.
///
/// Returns `(next_start_ledger, next_cursor)`.
async fn poll_once(
    pool: &SqlitePool,
    client: &Client,
    config: &Config,
    start_ledger: u32,
    cursor: Option<&str>,
) -> crate::errors::Result<(u32, Option<String>)> {
    let (raw_events, next_cursor, latest_ledger) = rpc::fetch_events(
        client,
        &config.rpc_url,
        &config.contract_id,
        start_ledger,
        cursor,
        config.events_per_page,
    )
    .await?;

    if !raw_events.is_empty() {
        let decoded = rpc::decode_events(&raw_events, &config.contract_id);
        let inserted = db::insert_events(pool, &decoded).await?;
        info!(
            "Polled {} raw events → {} new records stored",
            raw_events.len(),
            inserted
        );
    }

    // With a next_cursor the RPC resumes from it; the ledger only matters
    // when no cursor is held, so track the latest ledger seen.
    let next_ledger = latest_ledger
        .map(|l| (l as u32).max(start_ledger))
        .unwrap_or(start_ledger);

    // Persist in the same order as the writes above, so a crash in between
    // only causes a redelivery that the event id dedupe absorbs.
    db::save_cursor(pool, next_ledger as i64, next_cursor.as_deref()).await?;

    Ok((next_ledger, next_cursor))
}
