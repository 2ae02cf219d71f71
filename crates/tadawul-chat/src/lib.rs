//! Conversational backend for Saudi Exchange (Tadawul) equities
//!
//! A chat turn is trimmed, sent to the language model together with two
//! callable functions, and the first proposed call (if any) is executed
//! against market data to shape a [`ResponseEnvelope`]. Alongside chat the
//! crate serves a gainers/losers dashboard and daily price charts.
//!
//! - [`conversation`]: history window and blank-turn repair
//! - [`gateway`]: inference request shape and reply decoding
//! - [`dispatch`]: single-call tool dispatch with two-stage argument decoding
//! - [`daily`]: tick to daily bar aggregation with weekend backfill
//! - [`dashboard`]: concurrent gainers/losers fetch
//! - [`market`]: live RapidAPI and synthetic market data strategies
//!
//! # Example
//!
//! ```rust,ignore
//! use tadawul_chat::{ChatConfig, ChatMessage, ChatRequest, ChatService};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = ChatConfig::from_env()?;
//! let service = ChatService::from_config(&config)?;
//!
//! let request = ChatRequest {
//!     messages: vec![ChatMessage::user("How is Aramco doing?")],
//!     context: None,
//! };
//! let envelope = service.chat(&request, &CancellationToken::new()).await?;
//! println!("{}", envelope.answer);
//! ```

pub mod companies;
pub mod config;
pub mod conversation;
pub mod daily;
pub mod dashboard;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod market;
pub mod models;
pub mod service;

#[cfg(test)]
mod testing;

pub use companies::CompanyDirectory;
pub use config::{ChatConfig, ChatConfigBuilder, DataMode};
pub use conversation::{MAX_HISTORY, trim_history};
pub use daily::aggregate;
pub use dashboard::compose_dashboard;
pub use dispatch::ToolDispatcher;
pub use error::{ChatError, FetchError, Result};
pub use gateway::{ChatGateway, InferenceReply};
pub use market::MarketData;
pub use models::{
    AnswerContext, ChatMessage, ChatRequest, DailyBar, DashboardEntry, MoverKind, Payload,
    PayloadKind, PriceTick, ResponseEnvelope, SearchMatch, ToolInvocation,
};
pub use service::{ChartLookup, ChatService};
