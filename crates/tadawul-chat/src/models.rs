//! Request, response and market data types
//!
//! Every value here is request-scoped. Wire names follow the upstream
//! providers (camelCase, including the provider's `acrynom*` spelling).

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};

pub use tadawul_llm::Role;

/// One entry of the caller-supplied conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Empty or whitespace-only content
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Structured result the user is referring back to
///
/// `stocks` is opaque: it is injected into the system preamble as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerContext {
    #[serde(default)]
    pub chart: String,
    #[serde(default)]
    pub stocks: serde_json::Value,
}

/// Inbound chat turn
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<AnswerContext>,
}

/// Functions known to the assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolFunction {
    SearchCompanyStocks,
    GetDetailedCompanyStockPrices,
    GetTodayTopFiveGainersOrLosers,
    GetDailyInformationForAllCompanies,
    GetThisWeekDividends,
}

impl ToolFunction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SearchCompanyStocks => "SearchCompanyStocks",
            Self::GetDetailedCompanyStockPrices => "GetDetailedCompanyStockPrices",
            Self::GetTodayTopFiveGainersOrLosers => "GetTodayTopFiveGainersOrLosers",
            Self::GetDailyInformationForAllCompanies => "GetDailyInformationForAllCompanies",
            Self::GetThisWeekDividends => "GetThisWeekDividends",
        }
    }

    /// Parse a function name as proposed by the model
    pub fn from_name(name: &str) -> Option<Self> {
        [
            Self::SearchCompanyStocks,
            Self::GetDetailedCompanyStockPrices,
            Self::GetTodayTopFiveGainersOrLosers,
            Self::GetDailyInformationForAllCompanies,
            Self::GetThisWeekDividends,
        ]
        .into_iter()
        .find(|f| f.as_str() == name)
    }
}

/// A function call proposed by the model
///
/// `arguments_json` is the raw JSON text of the `arguments` field, which is
/// itself a JSON string wrapping the argument object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub id: String,
    pub function_name: String,
    pub arguments_json: String,
}

impl ToolInvocation {
    pub fn function(&self) -> Option<ToolFunction> {
        ToolFunction::from_name(&self.function_name)
    }
}

/// Arguments of `SearchCompanyStocks`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCompanyStocksArgs {
    #[serde(rename = "companyName")]
    pub company_name: String,
}

/// Arguments of `GetDetailedCompanyStockPrices`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedPricesArgs {
    #[serde(rename = "tadawulID")]
    pub tadawul_id: String,
}

/// Layout of tick dates produced locally
pub const TICK_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Layouts accepted from the market data provider, tried in order
const PROVIDER_TICK_FORMATS: [&str; 3] = [
    TICK_DATE_FORMAT,
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.fZ",
];

/// One timestamped price observation
///
/// `date` is kept exactly as the provider sent it, so the tool-call path
/// hands ticks back untouched. Use [`PriceTick::timestamp`] to interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub open: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub high: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub low: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub close: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub volume: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub x: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub y: f64,
}

impl PriceTick {
    /// Parse `date`; `None` when it matches no known layout
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        let raw = self.date.trim();
        PROVIDER_TICK_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .map(|d| d.and_time(NaiveTime::default()))
            })
    }
}

/// One calendar day's aggregated prices
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    #[serde(with = "bar_date")]
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub x: f64,
    pub y: f64,
}

impl DailyBar {
    /// All-zero bar dated `date`
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            open: 0.0,
            high: 0.0,
            low: 0.0,
            close: 0.0,
            volume: 0,
            x: 0.0,
            y: 0.0,
        }
    }
}

/// Best match returned by the company search
///
/// Provider fields may be missing or `null`; both decode to the zero value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMatch {
    #[serde(rename = "tadawulID", default, deserialize_with = "null_as_default")]
    pub tadawul_id: String,
    #[serde(rename = "companyID", default, deserialize_with = "null_as_default")]
    pub company_id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub company_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sector: String,
    #[serde(rename = "acrynomNameAr", default, deserialize_with = "null_as_default")]
    pub acronym_name_ar: String,
    #[serde(rename = "argaamID", default, deserialize_with = "null_as_default")]
    pub argaam_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub company_name_ar: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sector_ar: String,
    #[serde(rename = "acrynomName", default, deserialize_with = "null_as_default")]
    pub acronym_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub change: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub change_percent: f64,
}

/// One row of the gainers or losers snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardEntry {
    #[serde(rename = "companyID", default, deserialize_with = "null_as_default")]
    pub company_id: i64,
    #[serde(rename = "argaamID", default, deserialize_with = "null_as_default")]
    pub argaam_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub company_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub company_name_ar: String,
    #[serde(rename = "acrynomNameAr", default, deserialize_with = "null_as_default")]
    pub acronym_name_ar: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sector: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sector_ar: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub percentage_gained: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: f64,
}

/// Decode `null` as the type's zero value
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Which side of today's movers to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoverKind {
    Gainers,
    Losers,
}

impl MoverKind {
    /// Path segment used by the market data provider
    pub fn as_path(self) -> &'static str {
        match self {
            Self::Gainers => "top-gainers",
            Self::Losers => "top-losers",
        }
    }
}

/// Structured data attached to a chat answer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Search(SearchMatch),
    Ticks(Vec<PriceTick>),
    Bars(Vec<DailyBar>),
    Dashboard(Vec<DashboardEntry>),
}

/// Tag telling the client how to render the payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadKind {
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "search_company_stocks")]
    SearchResult,
    #[serde(rename = "detailed_company_stock_prices")]
    DetailedPrices,
}

impl PayloadKind {
    /// Wire tag, empty when there is nothing to render
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::SearchResult => "search_company_stocks",
            Self::DetailedPrices => "detailed_company_stock_prices",
        }
    }
}

/// Result of one chat turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    pub answer: String,
    #[serde(rename = "stocks")]
    pub payload: Option<Payload>,
    #[serde(rename = "chart")]
    pub payload_kind: PayloadKind,
}

impl ResponseEnvelope {
    /// Plain answer, nothing to render
    pub fn text(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            payload: None,
            payload_kind: PayloadKind::None,
        }
    }

    /// Context a client sends back on its next turn to refer to this result
    pub fn answer_context(&self) -> Option<AnswerContext> {
        let payload = self.payload.as_ref()?;
        Some(AnswerContext {
            chart: self.payload_kind.as_str().to_string(),
            stocks: serde_json::to_value(payload).unwrap_or_default(),
        })
    }
}

mod bar_date {
    use chrono::{NaiveDate, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const FORMAT: &str = "%Y-%m-%dT00:00:00";

    pub fn serialize<S: Serializer>(value: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S")
            .map(|dt| dt.date())
            .or_else(|_| NaiveDate::parse_from_str(&raw, "%Y-%m-%d"))
            .map_err(|e| D::Error::custom(format!("invalid bar date {raw:?}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_function_names() {
        assert_eq!(
            ToolFunction::from_name("SearchCompanyStocks"),
            Some(ToolFunction::SearchCompanyStocks)
        );
        assert_eq!(
            ToolFunction::from_name("GetThisWeekDividends"),
            Some(ToolFunction::GetThisWeekDividends)
        );
        assert_eq!(ToolFunction::from_name("searchCompanyStocks"), None);
    }

    #[test]
    fn test_tick_accepts_provider_formats() {
        let tick: PriceTick = serde_json::from_value(json!({
            "date": "2025-06-02 10:15:00",
            "open": 10.0, "high": 12.0, "low": 9.0, "close": 11.0,
            "volume": 1500, "x": 1.5, "y": 2.5
        }))
        .unwrap();
        assert_eq!(tick.timestamp().unwrap().to_string(), "2025-06-02 10:15:00");

        let tick: PriceTick = serde_json::from_value(json!({
            "date": "2025-06-02",
            "open": 1.0, "high": 1.0, "low": 1.0, "close": 1.0, "volume": 1
        }))
        .unwrap();
        assert_eq!(tick.timestamp().unwrap().to_string(), "2025-06-02 00:00:00");
        assert_eq!(tick.x, 0.0);

        let tick: PriceTick = serde_json::from_value(json!({
            "date": "2025-06-02T10:05:00.000Z",
            "open": 1.0, "high": 1.0, "low": 1.0, "close": 1.0, "volume": 1
        }))
        .unwrap();
        assert_eq!(tick.timestamp().unwrap().to_string(), "2025-06-02 10:05:00");
    }

    #[test]
    fn test_unrecognised_tick_date_still_decodes() {
        let tick: PriceTick = serde_json::from_value(json!({
            "date": "02/06/2025",
            "open": 1.0, "high": 1.0, "low": 1.0, "close": 1.0, "volume": null
        }))
        .unwrap();
        assert_eq!(tick.timestamp(), None);
        assert_eq!(tick.volume, 0);
    }

    #[test]
    fn test_tick_date_passes_through_unchanged() {
        let raw = json!({
            "date": "2025-06-02",
            "open": 1.0, "high": 1.0, "low": 1.0, "close": 1.0,
            "volume": 1, "x": 0.0, "y": 0.0
        });
        let tick: PriceTick = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&tick).unwrap(), raw);
    }

    #[test]
    fn test_null_provider_fields_decode_as_empty() {
        let entry: DashboardEntry = serde_json::from_value(json!({
            "companyID": 7, "companyName": "Almarai", "companyNameAr": null,
            "sector": "Food", "sectorAr": null, "acrynomNameAr": null,
            "percentageGained": 3.2, "price": 55.0
        }))
        .unwrap();
        assert_eq!(entry.company_id, 7);
        assert!(entry.company_name_ar.is_empty());
        assert!(entry.sector_ar.is_empty());
        assert!(entry.argaam_id.is_empty());

        let found: SearchMatch = serde_json::from_value(json!({
            "tadawulID": "2280", "companyID": 7, "companyName": "Almarai",
            "companyNameAr": null, "sectorAr": null, "price": null
        }))
        .unwrap();
        assert_eq!(found.tadawul_id, "2280");
        assert!(found.company_name_ar.is_empty());
        assert_eq!(found.price, 0.0);
    }

    #[test]
    fn test_bar_date_format() {
        let bar = DailyBar::empty(NaiveDate::from_ymd_opt(2025, 6, 6).unwrap());
        let value = serde_json::to_value(bar).unwrap();
        assert_eq!(value["date"], "2025-06-06T00:00:00");

        let back: DailyBar = serde_json::from_value(value).unwrap();
        assert_eq!(back, bar);
    }

    #[test]
    fn test_envelope_wire_shape() {
        let envelope = ResponseEnvelope::text("hello");
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value, json!({"answer": "hello", "stocks": null, "chart": ""}));

        let envelope = ResponseEnvelope {
            answer: "not found".to_string(),
            payload: None,
            payload_kind: PayloadKind::SearchResult,
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["chart"], "search_company_stocks");
        assert_eq!(value["chart"], PayloadKind::SearchResult.as_str());
    }

    #[test]
    fn test_answer_context_from_envelope() {
        assert_eq!(ResponseEnvelope::text("hi").answer_context(), None);

        let envelope = ResponseEnvelope {
            answer: "chart".to_string(),
            payload: Some(Payload::Bars(vec![DailyBar::empty(
                NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
            )])),
            payload_kind: PayloadKind::DetailedPrices,
        };
        let context = envelope.answer_context().unwrap();
        assert_eq!(context.chart, "detailed_company_stock_prices");
        assert_eq!(context.stocks[0]["date"], "2025-06-05T00:00:00");
    }

    #[test]
    fn test_search_match_wire_names() {
        let raw = json!({
            "tadawulID": "2222", "companyID": 1, "companyName": "Saudi Aramco",
            "sector": "Energy", "acrynomNameAr": "أرامكو", "argaamID": "2222",
            "companyNameAr": "أرامكو السعودية", "sectorAr": "الطاقة",
            "acrynomName": "ARAMCO", "price": 27.5, "change": 0.1, "changePercent": 0.36
        });
        let found: SearchMatch = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(found.tadawul_id, "2222");
        assert_eq!(found.acronym_name, "ARAMCO");
        assert_eq!(serde_json::to_value(&found).unwrap(), raw);
    }

    #[test]
    fn test_answer_context_defaults() {
        let ctx: AnswerContext = serde_json::from_value(json!({})).unwrap();
        assert!(ctx.chart.is_empty());
        assert!(ctx.stocks.is_null());
    }

    #[test]
    fn test_blank_message() {
        assert!(ChatMessage::user("  \n\t").is_blank());
        assert!(!ChatMessage::user(" hi ").is_blank());
    }
}
