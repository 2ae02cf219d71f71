//! Chat service façade
//!
//! Wires the trimmer, inference gateway, dispatcher, dashboard composer and
//! daily aggregator together behind the three request kinds the outer
//! surface exposes.

use crate::companies::CompanyDirectory;
use crate::config::ChatConfig;
use crate::conversation::trim_history;
use crate::daily::aggregate;
use crate::dashboard::compose_dashboard;
use crate::dispatch::ToolDispatcher;
use crate::error::{ChatError, Result};
use crate::gateway::ChatGateway;
use crate::market::{self, MarketData};
use crate::models::{ChatRequest, DailyBar, DashboardEntry, ResponseEnvelope};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// How a direct chart request names its instrument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartLookup {
    /// Tadawul instrument id, used as-is
    TadawulId(String),
    /// Company id, resolved through the company directory
    CompanyId(i64),
}

/// Entry point for chat, dashboard and chart requests
#[derive(Clone)]
pub struct ChatService {
    gateway: ChatGateway,
    dispatcher: ToolDispatcher,
    market: Arc<dyn MarketData>,
    companies: Arc<CompanyDirectory>,
    max_history: usize,
}

impl ChatService {
    pub fn new(
        gateway: ChatGateway,
        market: Arc<dyn MarketData>,
        companies: Arc<CompanyDirectory>,
        max_history: usize,
    ) -> Self {
        Self {
            gateway,
            dispatcher: ToolDispatcher::new(Arc::clone(&market)),
            market,
            companies,
            max_history,
        }
    }

    /// Build every collaborator from configuration
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        let gateway = ChatGateway::from_config(config)?;
        let market = market::from_config(config)?;
        let companies = Arc::new(CompanyDirectory::load(config.company_map_path.as_deref())?);

        info!(
            model = %config.llm_model,
            data_mode = ?config.data_mode,
            "Chat service ready"
        );
        Ok(Self::new(gateway, market, companies, config.max_history))
    }

    /// Run one chat turn
    #[instrument(skip_all, fields(messages = request.messages.len()))]
    pub async fn chat(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope> {
        let messages = trim_history(&request.messages, self.max_history);
        let reply = self
            .gateway
            .infer(&messages, request.context.as_ref(), cancel)
            .await?;

        self.dispatcher
            .dispatch(reply.answer, &reply.tool_invocations, cancel)
            .await
    }

    /// Today's gainers followed by today's losers
    pub async fn dashboard(&self, cancel: &CancellationToken) -> Result<Vec<DashboardEntry>> {
        compose_dashboard(Arc::clone(&self.market), cancel).await
    }

    /// Daily bars for one instrument
    #[instrument(skip(self, cancel))]
    pub async fn company_chart(
        &self,
        lookup: &ChartLookup,
        cancel: &CancellationToken,
    ) -> Result<Vec<DailyBar>> {
        let tadawul_id = match lookup {
            ChartLookup::TadawulId(id) => id.as_str(),
            ChartLookup::CompanyId(company_id) => self
                .companies
                .tadawul_id(*company_id)
                .ok_or(ChatError::UnknownCompany(*company_id))?,
        };

        let ticks = self
            .market
            .detailed_prices(tadawul_id, cancel)
            .await
            .map_err(|e| ChatError::fetch(format!("company chart for {tadawul_id}"), e))?;

        Ok(aggregate(&ticks))
    }

    /// The company directory in use
    pub fn companies(&self) -> &CompanyDirectory {
        &self.companies
    }
}
