//! Tool-call dispatch
//!
//! Executes at most one proposed function call per turn and shapes the
//! response envelope. Arguments arrive double-encoded: a JSON string whose
//! contents are the JSON argument object.

use crate::error::{ChatError, DecodeStage, Result};
use crate::market::MarketData;
use crate::models::{
    DetailedPricesArgs, Payload, PayloadKind, ResponseEnvelope, SearchCompanyStocksArgs,
    ToolFunction, ToolInvocation,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Runs the first proposed function call against market data
#[derive(Clone)]
pub struct ToolDispatcher {
    market: Arc<dyn MarketData>,
}

/// Answer used when a company search finds nothing
pub fn not_found_answer(company_name: &str) -> String {
    format!("Sorry, I couldn't find any stocks for {company_name}")
}

/// Decode double-encoded arguments into `T`
pub fn decode_arguments<T: DeserializeOwned>(invocation: &ToolInvocation) -> Result<T> {
    let decode_error = |stage, source| ChatError::ArgumentDecode {
        function: invocation.function_name.clone(),
        stage,
        source,
    };

    let inner: String = serde_json::from_str(&invocation.arguments_json)
        .map_err(|e| decode_error(DecodeStage::Wrapper, e))?;
    serde_json::from_str(&inner).map_err(|e| decode_error(DecodeStage::Arguments, e))
}

impl ToolDispatcher {
    pub fn new(market: Arc<dyn MarketData>) -> Self {
        Self { market }
    }

    /// Shape the envelope for one turn
    ///
    /// Only the first invocation is executed; the rest are discarded. Names
    /// other than the two advertised functions yield a plain answer.
    #[instrument(skip_all, fields(tool_calls = invocations.len()))]
    pub async fn dispatch(
        &self,
        answer: String,
        invocations: &[ToolInvocation],
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope> {
        let Some(invocation) = invocations.first() else {
            return Ok(ResponseEnvelope::text(answer));
        };

        if invocations.len() > 1 {
            debug!(
                discarded = invocations.len() - 1,
                "Only the first tool call is executed"
            );
        }

        match invocation.function() {
            Some(ToolFunction::SearchCompanyStocks) => {
                self.search_company_stocks(answer, invocation, cancel).await
            }
            Some(ToolFunction::GetDetailedCompanyStockPrices) => {
                self.detailed_prices(answer, invocation, cancel).await
            }
            _ => {
                debug!(function = %invocation.function_name, "No handler for tool call");
                Ok(ResponseEnvelope::text(answer))
            }
        }
    }

    async fn search_company_stocks(
        &self,
        answer: String,
        invocation: &ToolInvocation,
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope> {
        let args: SearchCompanyStocksArgs = decode_arguments(invocation)?;

        let found = self
            .market
            .search_company_stocks(&args.company_name, cancel)
            .await
            .map_err(|e| ChatError::fetch(format!("company search for {}", args.company_name), e))?;

        let Some(found) = found else {
            info!(company = %args.company_name, "Company search found nothing");
            return Ok(ResponseEnvelope {
                answer: not_found_answer(&args.company_name),
                payload: None,
                payload_kind: PayloadKind::SearchResult,
            });
        };

        info!(company = %args.company_name, tadawul_id = %found.tadawul_id, "Company found");
        Ok(ResponseEnvelope {
            answer,
            payload: Some(Payload::Search(found)),
            payload_kind: PayloadKind::SearchResult,
        })
    }

    async fn detailed_prices(
        &self,
        answer: String,
        invocation: &ToolInvocation,
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope> {
        let args: DetailedPricesArgs = decode_arguments(invocation)?;

        let ticks = self
            .market
            .detailed_prices(&args.tadawul_id, cancel)
            .await
            .map_err(|e| ChatError::fetch(format!("detailed prices for {}", args.tadawul_id), e))?;

        info!(tadawul_id = %args.tadawul_id, ticks = ticks.len(), "Price history fetched");
        Ok(ResponseEnvelope {
            answer,
            payload: Some(Payload::Ticks(ticks)),
            payload_kind: PayloadKind::DetailedPrices,
        })
    }
}
