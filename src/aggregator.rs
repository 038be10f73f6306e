// 📊 Aggregator - canonical records → monthly summaries
// Pure functions: no I/O, same input always gives the same output in the same order.

use crate::config::RetailGranularity;
use crate::errors::AggregationInvariantError;
use crate::models::{
    first_of_month, BenchmarkPricePoint, Dataset, ExchangeRatePoint, MonthlyBenchmarkSummary,
    MonthlyExchangeSummary, MonthlyRetailSummary, RetailPriceRecord, SourceTag,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;

type AggResult<T> = Result<Vec<T>, AggregationInvariantError>;

fn ensure(dataset: Dataset, month: NaiveDate, ok: bool, detail: impl FnOnce() -> String) -> Result<(), AggregationInvariantError> {
    if ok {
        Ok(())
    } else {
        Err(AggregationInvariantError {
            dataset,
            month,
            detail: detail(),
        })
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Median; even-sized input takes the average of the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

// ============================================================================
// BENCHMARK
// ============================================================================

/// avg / min / max per calendar month. Months without data produce no row.
pub fn aggregate_benchmark(points: &[BenchmarkPricePoint]) -> AggResult<MonthlyBenchmarkSummary> {
    let mut by_month: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for p in points {
        by_month.entry(first_of_month(p.date)).or_default().push(p.price);
    }

    let mut summaries = Vec::with_capacity(by_month.len());
    for (month, prices) in by_month {
        let avg_price = prices.iter().sum::<f64>() / prices.len() as f64;
        let min_price = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max_price = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        ensure(Dataset::Benchmark, month, positive(avg_price) && positive(min_price) && positive(max_price), || {
            format!("non-positive price (avg {avg_price}, min {min_price}, max {max_price})")
        })?;
        ensure(Dataset::Benchmark, month, min_price <= max_price, || {
            format!("min {min_price} exceeds max {max_price}")
        })?;

        summaries.push(MonthlyBenchmarkSummary {
            month,
            avg_price,
            min_price,
            max_price,
            sample_count: prices.len() as i64,
        });
    }

    Ok(summaries)
}

// ============================================================================
// RETAIL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RetailKey {
    month: NaiveDate,
    region: Option<String>,
    brand: Option<String>,
    product: String,
}

impl RetailKey {
    fn of(record: &RetailPriceRecord, granularity: RetailGranularity) -> Self {
        match granularity {
            RetailGranularity::Product => RetailKey {
                month: record.period,
                region: None,
                brand: None,
                product: record.product.clone(),
            },
            RetailGranularity::RegionBrandProduct => RetailKey {
                month: record.period,
                region: Some(record.region.clone()),
                brand: record.brand.clone(),
                product: record.product.clone(),
            },
        }
    }
}

#[derive(Default)]
struct RetailGroup {
    prices: Vec<f64>,
    volume: f64,
}

/// Median pump price and total volume per group. Missing volume counts as zero.
pub fn aggregate_retail(
    records: &[RetailPriceRecord],
    granularity: RetailGranularity,
) -> AggResult<MonthlyRetailSummary> {
    let mut groups: BTreeMap<RetailKey, RetailGroup> = BTreeMap::new();
    for r in records {
        let group = groups.entry(RetailKey::of(r, granularity)).or_default();
        group.prices.push(r.pump_price);
        group.volume += r.volume.unwrap_or(0.0);
    }

    let mut summaries = Vec::with_capacity(groups.len());
    for (key, group) in groups {
        let median_price = median(&group.prices).unwrap_or(f64::NAN);

        ensure(Dataset::Retail, key.month, positive(median_price), || {
            format!("median price {median_price} for {} is not positive", key.product)
        })?;
        ensure(Dataset::Retail, key.month, group.volume.is_finite() && group.volume >= 0.0, || {
            format!("total volume {} for {} is negative", group.volume, key.product)
        })?;

        summaries.push(MonthlyRetailSummary {
            month: key.month,
            region: key.region,
            brand: key.brand,
            product: key.product,
            median_price,
            total_volume: group.volume,
            sample_count: group.prices.len() as i64,
        });
    }

    Ok(summaries)
}

// ============================================================================
// EXCHANGE RATE
// ============================================================================

#[derive(Default, Clone, Copy)]
struct DailyQuotes {
    oficial: Option<f64>,
    blue: Option<f64>,
}

impl DailyQuotes {
    /// (blue - oficial) / oficial * 100, only when both quotes exist
    fn gap_pct(&self) -> Option<f64> {
        match (self.oficial, self.blue) {
            (Some(oficial), Some(blue)) => Some((blue - oficial) / oficial * 100.0),
            _ => None,
        }
    }
}

/// Monthly means of the sell rate per tag, and the mean of the per-date gaps.
///
/// The gap is averaged per date; it is never derived from the two monthly
/// means.
pub fn aggregate_exchange(points: &[ExchangeRatePoint]) -> AggResult<MonthlyExchangeSummary> {
    let mut by_month: BTreeMap<NaiveDate, BTreeMap<NaiveDate, DailyQuotes>> = BTreeMap::new();
    for p in points {
        let day = by_month
            .entry(first_of_month(p.date))
            .or_default()
            .entry(p.date)
            .or_default();
        match p.source_tag {
            SourceTag::Oficial => day.oficial = Some(p.sell),
            SourceTag::Blue => day.blue = Some(p.sell),
        }
    }

    let mut summaries = Vec::with_capacity(by_month.len());
    for (month, days) in by_month {
        let oficial: Vec<f64> = days.values().filter_map(|d| d.oficial).collect();
        let blue: Vec<f64> = days.values().filter_map(|d| d.blue).collect();
        let gaps: Vec<f64> = days.values().filter_map(DailyQuotes::gap_pct).collect();

        let avg_oficial = mean(&oficial);
        let avg_blue = mean(&blue);
        let avg_gap_pct = mean(&gaps);

        for (label, avg) in [("oficial", avg_oficial), ("blue", avg_blue)] {
            ensure(Dataset::Exchange, month, avg.map_or(true, positive), || {
                format!("average {label} rate {:?} is not positive", avg)
            })?;
        }
        ensure(Dataset::Exchange, month, avg_gap_pct.map_or(true, f64::is_finite), || {
            format!("average gap {:?} is not finite", avg_gap_pct)
        })?;

        summaries.push(MonthlyExchangeSummary {
            month,
            avg_oficial,
            avg_blue,
            avg_gap_pct,
            sample_count: days.len() as i64,
        });
    }

    Ok(summaries)
}
