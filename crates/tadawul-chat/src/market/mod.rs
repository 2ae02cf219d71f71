//! Market data capability
//!
//! Two strategies implement [`MarketData`]: the live RapidAPI client and a
//! synthetic generator. The strategy is chosen once from configuration.

pub mod rapidapi;
pub mod synthetic;

pub use rapidapi::RapidApiClient;
pub use synthetic::SyntheticMarket;

use crate::config::{ChatConfig, DataMode};
use crate::error::{FetchResult, Result};
use crate::models::{DashboardEntry, MoverKind, PriceTick, SearchMatch};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Stateless remote calls for Saudi Exchange data
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Best match for a company name, `None` when nothing matches
    async fn search_company_stocks(
        &self,
        company_name: &str,
        cancel: &CancellationToken,
    ) -> FetchResult<Option<SearchMatch>>;

    /// One month of price ticks for an instrument
    async fn detailed_prices(
        &self,
        tadawul_id: &str,
        cancel: &CancellationToken,
    ) -> FetchResult<Vec<PriceTick>>;

    /// Today's top movers on one side
    async fn top_movers(
        &self,
        kind: MoverKind,
        cancel: &CancellationToken,
    ) -> FetchResult<Vec<DashboardEntry>>;
}

/// Build the market data strategy selected by the configuration
pub fn from_config(config: &ChatConfig) -> Result<Arc<dyn MarketData>> {
    match config.data_mode {
        DataMode::Live => Ok(Arc::new(RapidApiClient::from_config(config)?)),
        DataMode::Synthetic => Ok(Arc::new(SyntheticMarket::new())),
    }
}
