//! RapidAPI Saudi Exchange client

use super::MarketData;
use crate::config::ChatConfig;
use crate::error::{ChatError, FetchError, FetchResult, Result};
use crate::models::{DashboardEntry, MoverKind, PriceTick, SearchMatch};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

const KEY_HEADER: &str = "x-rapidapi-key";
const HOST_HEADER: &str = "x-rapidapi-host";

/// Lookback requested for price history
const PRICE_PERIOD: &str = "1M";

/// Live market data over RapidAPI
///
/// Price history is billed to the v1 key; search and movers to the v2 key.
#[derive(Debug, Clone)]
pub struct RapidApiClient {
    client: Client,
    base_url: String,
    host: String,
    v1_key: String,
    v2_key: String,
}

/// Body shape shared by every endpoint
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct SearchQuery<'a> {
    query: &'a str,
}

impl RapidApiClient {
    /// Create a client from explicit credentials
    pub fn new(
        base_url: impl Into<String>,
        host: impl Into<String>,
        v1_key: impl Into<String>,
        v2_key: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            host: host.into(),
            v1_key: v1_key.into(),
            v2_key: v2_key.into(),
        })
    }

    /// Create a client from the loaded configuration
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        let (Some(v1), Some(v2), Some(host)) = (
            &config.rapid_api_v1_key,
            &config.rapid_api_v2_key,
            &config.rapid_api_host,
        ) else {
            return Err(ChatError::Config(
                "RapidAPI keys and host are required for live market data".to_string(),
            ));
        };

        Self::new(
            &config.rapid_api_base,
            host,
            v1,
            v2,
            config.request_timeout,
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Send a request and decode the envelope, aborting on cancellation
    async fn call(
        &self,
        request: RequestBuilder,
        key: &str,
        cancel: &CancellationToken,
    ) -> FetchResult<Envelope> {
        let request = request
            .header(KEY_HEADER, key)
            .header(HOST_HEADER, &self.host);

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(FetchError::Cancelled),
            result = Self::execute(request) => result,
        }
    }

    async fn execute(request: RequestBuilder) -> FetchResult<Envelope> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        parse_envelope(status.as_u16(), &body)
    }
}

fn parse_envelope(status: u16, body: &str) -> FetchResult<Envelope> {
    match serde_json::from_str::<Envelope>(body) {
        Ok(envelope) => Ok(envelope),
        Err(_) if !(200..300).contains(&status) => Err(FetchError::Status {
            status,
            body: body.to_string(),
        }),
        Err(e) => {
            debug!(body, "Undecodable market data response");
            Err(FetchError::Json(e))
        }
    }
}

/// Decode `data` as a list; `null` is an empty list
fn decode_list<T: DeserializeOwned>(envelope: Envelope, endpoint: &str) -> FetchResult<Vec<T>> {
    if !envelope.success {
        return Err(FetchError::Api(format!("{endpoint} reported failure")));
    }
    if envelope.data.is_null() {
        return Ok(Vec::new());
    }

    serde_json::from_value(envelope.data.clone()).map_err(|e| {
        debug!(data = %envelope.data, endpoint, "Undecodable market data payload");
        FetchError::Json(e)
    })
}

fn decode_search(envelope: Envelope) -> FetchResult<Option<SearchMatch>> {
    if !envelope.success || envelope.data.is_null() {
        return Ok(None);
    }
    let matches: Vec<SearchMatch> = decode_list(envelope, "search")?;
    Ok(matches.into_iter().next())
}

#[async_trait]
impl MarketData for RapidApiClient {
    #[instrument(skip(self, cancel))]
    async fn search_company_stocks(
        &self,
        company_name: &str,
        cancel: &CancellationToken,
    ) -> FetchResult<Option<SearchMatch>> {
        let request = self
            .client
            .post(self.url("stock/search-stocks-with-prices/"))
            .json(&SearchQuery {
                query: company_name,
            });

        let envelope = self.call(request, &self.v2_key, cancel).await?;
        let found = decode_search(envelope)?;
        if found.is_none() {
            debug!("No company matched");
        }
        Ok(found)
    }

    #[instrument(skip(self, cancel))]
    async fn detailed_prices(
        &self,
        tadawul_id: &str,
        cancel: &CancellationToken,
    ) -> FetchResult<Vec<PriceTick>> {
        let request = self
            .client
            .get(self.url("stock/getPrice"))
            .query(&[("companyId", tadawul_id), ("period", PRICE_PERIOD)]);

        let envelope = self.call(request, &self.v1_key, cancel).await?;
        let ticks: Vec<PriceTick> = decode_list(envelope, "getPrice")?;
        debug!(ticks = ticks.len(), "Fetched price history");
        Ok(ticks)
    }

    #[instrument(skip(self, cancel))]
    async fn top_movers(
        &self,
        kind: MoverKind,
        cancel: &CancellationToken,
    ) -> FetchResult<Vec<DashboardEntry>> {
        let path = format!("stock/{}", kind.as_path());
        let request = self.client.get(self.url(&path));

        let envelope = self.call(request, &self.v2_key, cancel).await?;
        let entries: Vec<DashboardEntry> = decode_list(envelope, kind.as_path())?;
        if entries.is_empty() {
            warn!("Movers list is empty");
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_RAPID_API_BASE;
    use std::time::Duration;

    fn client() -> RapidApiClient {
        RapidApiClient::new(
            format!("{DEFAULT_RAPID_API_BASE}/"),
            "saudi-exchange-stocks-tadawul.p.rapidapi.com",
            "v1",
            "v2",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        assert_eq!(
            client().url("stock/top-gainers"),
            format!("{DEFAULT_RAPID_API_BASE}/stock/top-gainers")
        );
    }

    #[test]
    fn test_search_failure_is_no_match() {
        let envelope = parse_envelope(200, r#"{"success": false, "data": null}"#).unwrap();
        assert_eq!(decode_search(envelope).unwrap(), None);

        let envelope = parse_envelope(200, r#"{"success": true, "data": []}"#).unwrap();
        assert_eq!(decode_search(envelope).unwrap(), None);
    }

    #[test]
    fn test_search_takes_first_match() {
        let body = r#"{"success": true, "data": [
            {"tadawulID": "2222", "companyID": 1, "companyName": "Saudi Aramco",
             "sector": "Energy", "acrynomNameAr": "", "argaamID": "", "companyNameAr": "",
             "sectorAr": "", "acrynomName": "ARAMCO", "price": 27.5, "change": 0.1,
             "changePercent": 0.36},
            {"tadawulID": "2030", "companyID": 2, "companyName": "Saudi Aramco Base Oil",
             "sector": "Energy", "acrynomNameAr": "", "argaamID": "", "companyNameAr": "",
             "sectorAr": "", "acrynomName": "LUBEREF", "price": 110.0, "change": 0.0,
             "changePercent": 0.0}
        ]}"#;

        let found = decode_search(parse_envelope(200, body).unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(found.tadawul_id, "2222");
    }

    #[test]
    fn test_list_decoding() {
        let body = r#"{"success": true, "data": [
            {"date": "2025-06-02 10:00:00", "open": 1, "high": 2, "low": 0.5,
             "close": 1.5, "volume": 10, "x": 0, "y": 0}
        ]}"#;
        let ticks: Vec<PriceTick> = decode_list(parse_envelope(200, body).unwrap(), "getPrice").unwrap();
        assert_eq!(ticks.len(), 1);

        let empty: Vec<PriceTick> =
            decode_list(parse_envelope(200, r#"{"success": true}"#).unwrap(), "getPrice").unwrap();
        assert!(empty.is_empty());

        let failed = decode_list::<PriceTick>(
            parse_envelope(200, r#"{"success": false}"#).unwrap(),
            "getPrice",
        );
        assert!(matches!(failed, Err(FetchError::Api(_))));
    }

    #[test]
    fn test_odd_tick_dates_do_not_fail_history() {
        let body = r#"{"success": true, "data": [
            {"date": "2025-06-02 10:00:00", "open": 1, "high": 2, "low": 0.5,
             "close": 1.5, "volume": 10},
            {"date": "2025-06-02T10:05:00.000Z", "open": 1.5, "high": 2.5, "low": 1,
             "close": 2, "volume": 5},
            {"date": "sometime", "open": 9, "high": 9, "low": 9, "close": 9, "volume": 9}
        ]}"#;
        let ticks: Vec<PriceTick> =
            decode_list(parse_envelope(200, body).unwrap(), "getPrice").unwrap();
        assert_eq!(ticks.len(), 3);
        assert_eq!(ticks[1].date, "2025-06-02T10:05:00.000Z");

        let bars = crate::daily::aggregate(&ticks);
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 2.0);
        assert_eq!(bars[0].volume, 15);
    }

    #[test]
    fn test_movers_with_null_arabic_names() {
        let body = r#"{"success": true, "data": [
            {"companyID": 7, "argaamID": null, "companyName": "Almarai",
             "companyNameAr": null, "acrynomNameAr": null, "sector": "Food",
             "sectorAr": null, "percentageGained": 3.2, "price": 55.0}
        ]}"#;
        let entries: Vec<DashboardEntry> =
            decode_list(parse_envelope(200, body).unwrap(), "top-gainers").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].company_name, "Almarai");
        assert!(entries[0].company_name_ar.is_empty());
        assert!(entries[0].sector_ar.is_empty());
    }

    #[test]
    fn test_non_json_error_status() {
        let err = parse_envelope(502, "Bad Gateway").unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 502, .. }));

        let err = parse_envelope(200, "<html>").unwrap_err();
        assert!(matches!(err, FetchError::Json(_)));
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = client().top_movers(MoverKind::Gainers, &cancel).await;
        assert!(matches!(result, Err(FetchError::Cancelled)));
    }

    #[tokio::test]
    #[ignore] // Requires network access and RapidAPI credentials
    async fn test_live_movers() {
        let config = ChatConfig::from_env().unwrap();
        let client = RapidApiClient::from_config(&config).unwrap();

        let gainers = client
            .top_movers(MoverKind::Gainers, &CancellationToken::new())
            .await
            .unwrap();
        assert!(!gainers.is_empty());
    }
}
