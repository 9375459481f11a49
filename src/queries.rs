//! Canned read queries over the stored collections.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::constants::{AGGREGATED_COLLECTION, CLEAN_COLLECTION, SECTOR_KEY};
use crate::domain::{CapitalRange, CleanRecord, SectorAggregate};
use crate::error::Result;
use crate::pipeline::load_aggregates;
use crate::pipeline::storage::{filter_eq, from_document, DocumentStore};

pub const TOP_SECTORS_LIMIT: usize = 5;
pub const TIMELINE_LIMIT: usize = 10;
pub const HIGH_GROWTH_THRESHOLD: f64 = 0.1;
pub const LOW_RISK_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorFunding {
    pub sector: String,
    pub total_funding: f64,
    pub total_startups: u64,
    pub avg_funding_per_startup: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorGrowth {
    pub sector: String,
    pub growth_rate: f64,
    pub risk_score: f64,
    pub total_startups: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapitalDistribution {
    pub sector: String,
    pub total_startups: u64,
    pub capital_distribution: BTreeMap<CapitalRange, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorTimeline {
    pub sector: String,
    pub founded_year_min: Option<i32>,
    pub founded_year_max: Option<i32>,
    pub year_span: Option<i32>,
    pub total_startups: u64,
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Sectors with the most total funding
pub fn top_sectors_by_funding(aggregates: &[SectorAggregate], limit: usize) -> Vec<SectorFunding> {
    let mut ranked: Vec<&SectorAggregate> = aggregates.iter().collect();
    ranked.sort_by(|a, b| descending(a.total_funding, b.total_funding));
    ranked
        .into_iter()
        .take(limit)
        .map(|a| SectorFunding {
            sector: a.sector.clone(),
            total_funding: a.total_funding,
            total_startups: a.total_startups,
            avg_funding_per_startup: a.avg_funding_per_startup,
        })
        .collect()
}

/// Sectors growing faster than 10% with risk under 0.3, fastest first
pub fn high_growth_low_risk(aggregates: &[SectorAggregate]) -> Vec<SectorGrowth> {
    let mut matching: Vec<&SectorAggregate> = aggregates
        .iter()
        .filter(|a| a.growth_rate > HIGH_GROWTH_THRESHOLD && a.risk_score < LOW_RISK_THRESHOLD)
        .collect();
    matching.sort_by(|a, b| descending(a.growth_rate, b.growth_rate));
    matching
        .into_iter()
        .map(|a| SectorGrowth {
            sector: a.sector.clone(),
            growth_rate: a.growth_rate,
            risk_score: a.risk_score,
            total_startups: a.total_startups,
        })
        .collect()
}

/// Sectors with the widest span of founding years
pub fn sector_timeline(aggregates: &[SectorAggregate], limit: usize) -> Vec<SectorTimeline> {
    let mut timeline: Vec<SectorTimeline> = aggregates
        .iter()
        .map(|a| SectorTimeline {
            sector: a.sector.clone(),
            founded_year_min: a.founded_year_min,
            founded_year_max: a.founded_year_max,
            year_span: a.founded_year_min.zip(a.founded_year_max).map(|(min, max)| max - min),
            total_startups: a.total_startups,
        })
        .collect();
    // Sectors without founding years sort last
    timeline.sort_by(|a, b| b.year_span.cmp(&a.year_span));
    timeline.truncate(limit);
    timeline
}

pub async fn sector_capital_distribution(
    store: &dyn DocumentStore,
    sector: &str,
) -> Result<Option<CapitalDistribution>> {
    let Some(document) = store
        .find_one(AGGREGATED_COLLECTION, &filter_eq(SECTOR_KEY, sector))
        .await?
    else {
        return Ok(None);
    };
    let aggregate: SectorAggregate = from_document(document)?;
    Ok(Some(CapitalDistribution {
        sector: aggregate.sector,
        total_startups: aggregate.total_startups,
        capital_distribution: aggregate.capital_distribution,
    }))
}

/// Number of clean startups in `sector` with at least `min_funding`
pub async fn count_startups_with_funding(
    store: &dyn DocumentStore,
    sector: &str,
    min_funding: f64,
) -> Result<u64> {
    let mut count = 0;
    for document in store.find_all(CLEAN_COLLECTION).await? {
        if document.get(SECTOR_KEY).and_then(|v| v.as_str()) != Some(sector) {
            continue;
        }
        let record: CleanRecord = from_document(document)?;
        if record.total_funding >= min_funding {
            count += 1;
        }
    }
    Ok(count)
}

/// Top sectors by funding, read straight from the snapshot
pub async fn load_top_sectors(store: &dyn DocumentStore, limit: usize) -> Result<Vec<SectorFunding>> {
    Ok(top_sectors_by_funding(&load_aggregates(store).await?, limit))
}
