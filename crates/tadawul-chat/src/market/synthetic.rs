//! Synthetic market data for demos and offline development

use super::MarketData;
use crate::error::{FetchError, FetchResult};
use crate::models::{DashboardEntry, MoverKind, PriceTick, SearchMatch, TICK_DATE_FORMAT};
use async_trait::async_trait;
use chrono::{Duration, Local, NaiveTime};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Days of price history produced per request
const HISTORY_DAYS: i64 = 31;

/// Entries produced per movers list
const MOVERS_PER_SIDE: usize = 5;

const STARTING_PRICE: f64 = 100.0;

const MOVER_COMPANIES: [(&str, &str, &str, &str); MOVERS_PER_SIDE] = [
    ("Desert Energy", "طاقة الصحراء", "Energy", "الطاقة"),
    ("Najd Cement", "أسمنت نجد", "Materials", "المواد الأساسية"),
    ("Red Sea Logistics", "لوجستيات البحر الأحمر", "Transportation", "النقل"),
    ("Hejaz Foods", "أغذية الحجاز", "Food & Beverages", "الأغذية والمشروبات"),
    ("Gulf Digital", "الخليج الرقمية", "Technology", "التقنية"),
];

/// Randomised, network-free market data
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticMarket;

impl SyntheticMarket {
    pub fn new() -> Self {
        Self
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn ensure_active(cancel: &CancellationToken) -> FetchResult<()> {
    if cancel.is_cancelled() {
        Err(FetchError::Cancelled)
    } else {
        Ok(())
    }
}

fn sample_match() -> SearchMatch {
    let mut rng = rand::thread_rng();
    SearchMatch {
        tadawul_id: "4536".to_string(),
        company_id: 1,
        company_name: "ASM Company".to_string(),
        sector: "Technology".to_string(),
        acronym_name_ar: "ASM".to_string(),
        argaam_id: "102001".to_string(),
        company_name_ar: "شركة الصناعات التكنولوجية".to_string(),
        sector_ar: "التكنولوجيا".to_string(),
        acronym_name: "ASM".to_string(),
        price: round2(rng.gen_range(0.0..10.0)),
        change: round2(rng.gen_range(0.0..1.0)),
        change_percent: round2(rng.gen_range(0.0..1.0)),
    }
}

/// Random walk of daily ticks, oldest first, ending today
fn sample_history() -> Vec<PriceTick> {
    let mut rng = rand::thread_rng();
    let today = Local::now().date_naive();

    let mut ticks = Vec::with_capacity(HISTORY_DAYS as usize);
    let mut previous_close = STARTING_PRICE;

    for offset in (0..HISTORY_DAYS).rev() {
        let open = previous_close + rng.gen_range(-0.5..0.5);
        let close = previous_close + rng.gen_range(-2.0..2.0);
        let high = open.max(close) + rng.gen_range(0.0..1.0);
        let low = open.min(close) - rng.gen_range(0.0..1.0);

        ticks.push(PriceTick {
            date: (today - Duration::days(offset))
                .and_time(NaiveTime::default())
                .format(TICK_DATE_FORMAT)
                .to_string(),
            open,
            high,
            low,
            close,
            volume: rng.gen_range(1000..6000),
            x: 0.0,
            y: 0.0,
        });
        previous_close = close;
    }

    ticks
}

fn sample_movers(kind: MoverKind) -> Vec<DashboardEntry> {
    let mut rng = rand::thread_rng();
    let (id_base, sign) = match kind {
        MoverKind::Gainers => (1000, 1.0),
        MoverKind::Losers => (2000, -1.0),
    };

    let mut entries: Vec<DashboardEntry> = MOVER_COMPANIES
        .iter()
        .zip(1i64..)
        .map(|(&(name, name_ar, sector, sector_ar), n)| DashboardEntry {
            company_id: id_base + n,
            argaam_id: (id_base + n).to_string(),
            company_name: name.to_string(),
            company_name_ar: name_ar.to_string(),
            acronym_name_ar: String::new(),
            sector: sector.to_string(),
            sector_ar: sector_ar.to_string(),
            percentage_gained: sign * round2(rng.gen_range(0.5..10.0)),
            price: round2(rng.gen_range(5.0..150.0)),
        })
        .collect();

    // Biggest movers first, as the live endpoint orders them
    entries.sort_by(|a, b| b.percentage_gained.abs().total_cmp(&a.percentage_gained.abs()));
    entries
}

#[async_trait]
impl MarketData for SyntheticMarket {
    async fn search_company_stocks(
        &self,
        company_name: &str,
        cancel: &CancellationToken,
    ) -> FetchResult<Option<SearchMatch>> {
        ensure_active(cancel)?;
        debug!(company_name, "Synthetic search");
        Ok(Some(sample_match()))
    }

    async fn detailed_prices(
        &self,
        tadawul_id: &str,
        cancel: &CancellationToken,
    ) -> FetchResult<Vec<PriceTick>> {
        ensure_active(cancel)?;
        debug!(tadawul_id, "Synthetic price history");
        Ok(sample_history())
    }

    async fn top_movers(
        &self,
        kind: MoverKind,
        cancel: &CancellationToken,
    ) -> FetchResult<Vec<DashboardEntry>> {
        ensure_active(cancel)?;
        Ok(sample_movers(kind))
    }
}
