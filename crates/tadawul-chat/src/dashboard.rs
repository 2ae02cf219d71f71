//! Dashboard composition

use crate::error::{ChatError, Result};
use crate::market::MarketData;
use crate::models::{DashboardEntry, MoverKind};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Today's top gainers followed by today's top losers
///
/// Both lists are fetched concurrently. The first failure fails the whole
/// call; the other fetch is left to finish on its own and its result is
/// dropped.
#[instrument(skip_all)]
pub async fn compose_dashboard(
    market: Arc<dyn MarketData>,
    cancel: &CancellationToken,
) -> Result<Vec<DashboardEntry>> {
    let gainers = spawn_side(Arc::clone(&market), MoverKind::Gainers, cancel.clone());
    let losers = spawn_side(market, MoverKind::Losers, cancel.clone());

    let (mut gainers, losers) = tokio::try_join!(join_side(gainers), join_side(losers))?;

    info!(
        gainers = gainers.len(),
        losers = losers.len(),
        "Dashboard composed"
    );
    gainers.extend(losers);
    Ok(gainers)
}

fn spawn_side(
    market: Arc<dyn MarketData>,
    kind: MoverKind,
    cancel: CancellationToken,
) -> JoinHandle<Result<Vec<DashboardEntry>>> {
    tokio::spawn(async move {
        market
            .top_movers(kind, &cancel)
            .await
            .map_err(|e| ChatError::fetch(kind.as_path(), e))
    })
}

async fn join_side(handle: JoinHandle<Result<Vec<DashboardEntry>>>) -> Result<Vec<DashboardEntry>> {
    handle.await?
}
