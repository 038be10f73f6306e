// 📦 Canonical Record Models
// One validated daily/monthly price point per source, plus monthly summaries.
// Records are plain values: every transform step builds new ones.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// ============================================================================
// DATASETS
// ============================================================================

/// Dataset - which upstream feed a batch came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    /// Brent crude benchmark price (USD)
    Benchmark,
    /// National retail fuel prices per station/product/month
    Retail,
    /// USD/ARS exchange rates (oficial + blue)
    Exchange,
}

impl Dataset {
    pub const ALL: [Dataset; 3] = [Dataset::Benchmark, Dataset::Retail, Dataset::Exchange];

    pub fn name(&self) -> &'static str {
        match self {
            Dataset::Benchmark => "benchmark",
            Dataset::Retail => "retail",
            Dataset::Exchange => "exchange",
        }
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// SourceTag - which quote an exchange rate row carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    Oficial,
    Blue,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Oficial => "oficial",
            SourceTag::Blue => "blue",
        }
    }

    /// Case-insensitive match against the two recognized tags
    pub fn parse(raw: &str) -> Option<SourceTag> {
        match raw.trim().to_lowercase().as_str() {
            "oficial" => Some(SourceTag::Oficial),
            "blue" => Some(SourceTag::Blue),
            _ => None,
        }
    }
}

/// Floor a calendar date to the first day of its month.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

// ============================================================================
// DAILY / RAW-GRAIN RECORDS (staging)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkPricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetailPriceRecord {
    /// Always the first day of the month
    pub period: NaiveDate,
    pub region: String,
    pub brand: Option<String>,
    pub product: String,
    pub pump_price: f64,
    pub volume: Option<f64>,
    pub market_share_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRatePoint {
    pub date: NaiveDate,
    pub source_tag: SourceTag,
    pub buy: Option<f64>,
    pub sell: f64,
}

// ============================================================================
// MONTHLY SUMMARIES (analytics)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBenchmarkSummary {
    pub month: NaiveDate,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub sample_count: i64,
}

/// `region` / `brand` are only set under the regional granularity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRetailSummary {
    pub month: NaiveDate,
    pub region: Option<String>,
    pub brand: Option<String>,
    pub product: String,
    pub median_price: f64,
    pub total_volume: f64,
    pub sample_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyExchangeSummary {
    pub month: NaiveDate,
    pub avg_oficial: Option<f64>,
    pub avg_blue: Option<f64>,
    /// Mean of per-date gaps, not the gap of the monthly means
    pub avg_gap_pct: Option<f64>,
    /// Distinct dates in the month with at least one quote
    pub sample_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_tag_parse_is_case_insensitive() {
        assert_eq!(SourceTag::parse("Oficial"), Some(SourceTag::Oficial));
        assert_eq!(SourceTag::parse(" BLUE "), Some(SourceTag::Blue));
        assert_eq!(SourceTag::parse("tarjeta"), None);
    }

    #[test]
    fn test_first_of_month() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(first_of_month(date), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn test_dataset_serializes_lowercase() {
        let json = serde_json::to_string(&Dataset::Exchange).unwrap();
        assert_eq!(json, "\"exchange\"");
        assert_eq!(Dataset::Retail.to_string(), "retail");
    }
}
