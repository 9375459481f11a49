//! Sector aggregation: the clean table grouped into per-sector statistics.
//!
//! Aggregation is two passes over the data. Pass one partitions the records
//! by sector and finds the largest sector, the only value that crosses sector
//! boundaries (it normalizes saturation). Pass two computes each sector's
//! aggregate independently against that read-only maximum.

pub mod stats;

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use crate::constants::{STATUS_ACTIVE, STATUS_CLOSED, TOP_COUNTRIES_LIMIT};
use crate::domain::{CleanRecord, SectorAggregate};
use crate::error::AggregateInvariantError;

use stats::{growth_rate, mean, median, top_by_frequency};

/// All records of one sector, in input order
#[derive(Debug, Clone)]
pub struct SectorPartition<'a> {
    pub sector: &'a str,
    pub records: Vec<&'a CleanRecord>,
}

/// Output of the first pass
#[derive(Debug, Clone, Default)]
pub struct Partitioned<'a> {
    /// Partitions in first-seen sector order
    pub partitions: Vec<SectorPartition<'a>>,
    /// Size of the largest partition across the whole run
    pub max_sector_size: usize,
}

/// Aggregates that passed validation plus the sectors that were dropped
#[derive(Debug, Clone, Default)]
pub struct AggregationOutcome {
    pub aggregates: Vec<SectorAggregate>,
    pub dropped: Vec<AggregateInvariantError>,
}

/// Pass one: group records by exact sector value and size the largest group
pub fn partition_by_sector(records: &[CleanRecord]) -> Partitioned<'_> {
    let mut partitions: Vec<SectorPartition<'_>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let sector = record.sector.as_str();
        match index.get(sector) {
            Some(&i) => partitions[i].records.push(record),
            None => {
                index.insert(sector, partitions.len());
                partitions.push(SectorPartition {
                    sector,
                    records: vec![record],
                });
            }
        }
    }

    let max_sector_size = partitions.iter().map(|p| p.records.len()).max().unwrap_or(0);
    Partitioned {
        partitions,
        max_sector_size,
    }
}

/// Pass two: compute one sector's statistics.
///
/// `max_sector_size` must come from the same run's first pass.
pub fn aggregate_sector(partition: &SectorPartition<'_>, max_sector_size: usize) -> SectorAggregate {
    let records = &partition.records;
    let total = records.len();

    let active = records.iter().filter(|r| r.status == STATUS_ACTIVE).count();
    let closed = records.iter().filter(|r| r.status == STATUS_CLOSED).count();

    let total_funding: f64 = records.iter().map(|r| r.total_funding).sum();
    let avg_funding = if total > 0 { total_funding / total as f64 } else { 0.0 };
    let median_funding = median(records.iter().map(|r| r.total_funding).collect()).unwrap_or(0.0);
    let avg_funding_rounds = mean(records.iter().map(|r| r.funding_rounds as f64)).unwrap_or(0.0);

    let avg_time_to_first = mean(
        records
            .iter()
            .filter_map(|r| r.time_to_first_funding_days)
            .map(|d| d as f64),
    );
    let avg_employees = mean(records.iter().filter_map(|r| r.employee_count).map(|c| c as f64));

    let founded_years: Vec<i32> = records.iter().filter_map(|r| r.founded_year).collect();
    let founded_year_min = founded_years.iter().copied().min();
    let founded_year_max = founded_years.iter().copied().max();

    let saturation_score = if max_sector_size > 0 {
        (total as f64 / max_sector_size as f64).min(1.0)
    } else {
        0.0
    };
    let risk_score = if total > 0 { closed as f64 / total as f64 } else { 0.0 };

    let top_countries = top_by_frequency(
        records.iter().filter_map(|r| r.country.as_deref()),
        TOP_COUNTRIES_LIMIT,
    );

    let mut capital_distribution = BTreeMap::new();
    for record in records {
        *capital_distribution.entry(record.capital_range).or_insert(0u64) += 1;
    }

    SectorAggregate {
        sector: partition.sector.to_string(),
        total_startups: total as u64,
        active_startups: active as u64,
        closed_startups: closed as u64,
        total_funding,
        avg_funding_per_startup: avg_funding,
        median_funding,
        avg_funding_rounds,
        avg_time_to_first_funding_days: avg_time_to_first,
        avg_employee_count: avg_employees,
        founded_year_min,
        founded_year_max,
        growth_rate: growth_rate(founded_years),
        saturation_score,
        risk_score,
        top_countries,
        capital_distribution,
    }
}

/// Aggregate the full clean table into one validated aggregate per sector.
///
/// A sector whose aggregate fails validation is dropped with a warning; the
/// other sectors are unaffected.
pub fn aggregate_by_sector(records: &[CleanRecord]) -> AggregationOutcome {
    info!("Aggregating {} records by sector", records.len());

    let partitioned = partition_by_sector(records);
    debug!(
        "Found {} sectors, largest has {} startups",
        partitioned.partitions.len(),
        partitioned.max_sector_size
    );

    let mut outcome = AggregationOutcome::default();
    for partition in &partitioned.partitions {
        let aggregate = aggregate_sector(partition, partitioned.max_sector_size);
        match aggregate.validate() {
            Ok(()) => outcome.aggregates.push(aggregate),
            Err(e) => {
                warn!("Validation error for sector {}: {}", partition.sector, e);
                outcome.dropped.push(e);
            }
        }
    }

    info!(
        "Aggregated {} sectors ({} dropped)",
        outcome.aggregates.len(),
        outcome.dropped.len()
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CapitalRange, FundingStage};
    use crate::pipeline::processing::classify::classify_capital_range;

    fn record(sector: &str, status: &str, funding: f64, country: Option<&str>, year: Option<i32>) -> CleanRecord {
        CleanRecord {
            name: format!("{}-{}-{}", sector, status, funding),
            sector: sector.to_string(),
            founded_year: year,
            funding_rounds: if funding > 0.0 { 2 } else { 0 },
            total_funding: funding,
            last_funding_date: None,
            status: status.to_string(),
            country: country.map(str::to_string),
            city: None,
            employee_count: None,
            first_funding_year: None,
            last_funding_year: None,
            time_to_first_funding_days: None,
            time_to_last_funding_days: None,
            funding_stage: FundingStage::SeriesA,
            capital_range: classify_capital_range(Some(funding)),
        }
    }

    fn find<'a>(outcome: &'a AggregationOutcome, sector: &str) -> &'a SectorAggregate {
        outcome
            .aggregates
            .iter()
            .find(|a| a.sector == sector)
            .expect("sector present")
    }

    #[test]
    fn test_partition_tracks_global_maximum() {
        let records = vec![
            record("Fintech", "active", 1.0, None, None),
            record("Edtech", "active", 1.0, None, None),
            record("Fintech", "closed", 1.0, None, None),
        ];
        let partitioned = partition_by_sector(&records);
        assert_eq!(partitioned.partitions.len(), 2);
        assert_eq!(partitioned.partitions[0].sector, "Fintech");
        assert_eq!(partitioned.max_sector_size, 2);
    }

    #[test]
    fn test_counts_funding_and_risk() {
        let records = vec![
            record("Fintech", "active", 100.0, Some("USA"), Some(2018)),
            record("Fintech", "closed", 300.0, Some("UK"), Some(2019)),
            record("Fintech", "acquired", 0.0, None, None),
            record("Fintech", "active", 2_000_000.0, Some("UK"), Some(2020)),
        ];
        let outcome = aggregate_by_sector(&records);
        let fintech = find(&outcome, "Fintech");

        assert_eq!(fintech.total_startups, 4);
        assert_eq!(fintech.active_startups, 2);
        assert_eq!(fintech.closed_startups, 1);
        assert_eq!(fintech.total_funding, 2_000_400.0);
        assert_eq!(fintech.avg_funding_per_startup, 500_100.0);
        assert_eq!(fintech.median_funding, 200.0);
        assert_eq!(fintech.avg_funding_rounds, 1.5);
        assert_eq!(fintech.risk_score, 0.25);
        assert_eq!(fintech.saturation_score, 1.0);
        assert_eq!(fintech.founded_year_min, Some(2018));
        assert_eq!(fintech.founded_year_max, Some(2020));
        assert_eq!(fintech.top_countries, vec!["UK", "USA"]);
        assert_eq!(fintech.capital_distribution.get(&CapitalRange::Zero), Some(&1));
        assert_eq!(fintech.capital_distribution.get(&CapitalRange::UnderOneMillion), Some(&2));
        assert_eq!(fintech.capital_distribution.get(&CapitalRange::OneToTenMillion), Some(&1));
        assert_eq!(fintech.capital_distribution.len(), 3);
    }

    #[test]
    fn test_saturation_is_relative_to_largest_sector() {
        let mut records = Vec::new();
        for _ in 0..4 {
            records.push(record("Fintech", "active", 1.0, None, None));
        }
        records.push(record("Edtech", "active", 1.0, None, None));

        let outcome = aggregate_by_sector(&records);
        assert_eq!(find(&outcome, "Fintech").saturation_score, 1.0);
        assert_eq!(find(&outcome, "Edtech").saturation_score, 0.25);
    }

    #[test]
    fn test_optional_means_absent_without_samples() {
        let records = vec![record("Fintech", "active", 1.0, None, None)];
        let outcome = aggregate_by_sector(&records);
        let fintech = find(&outcome, "Fintech");

        assert_eq!(fintech.avg_time_to_first_funding_days, None);
        assert_eq!(fintech.avg_employee_count, None);
        assert_eq!(fintech.founded_year_min, None);
        assert_eq!(fintech.growth_rate, 0.0);
        assert!(fintech.top_countries.is_empty());
    }

    #[test]
    fn test_optional_means_skip_missing_values() {
        let mut a = record("Fintech", "active", 1.0, None, None);
        a.employee_count = Some(10);
        a.time_to_first_funding_days = Some(100);
        let mut b = record("Fintech", "active", 1.0, None, None);
        b.employee_count = Some(30);
        let c = record("Fintech", "active", 1.0, None, None);

        let outcome = aggregate_by_sector(&[a, b, c]);
        let fintech = find(&outcome, "Fintech");
        assert_eq!(fintech.avg_employee_count, Some(20.0));
        assert_eq!(fintech.avg_time_to_first_funding_days, Some(100.0));
    }

    #[test]
    fn test_aggregate_invariants_hold() {
        let statuses = ["active", "closed", "unknown", "acquired"];
        let records: Vec<CleanRecord> = (0..40)
            .map(|i| {
                let sector = ["Fintech", "Edtech", "Biotech"][i % 3];
                record(sector, statuses[i % 4], (i * 10_000) as f64, Some("USA"), Some(2010 + (i % 7) as i32))
            })
            .collect();

        let outcome = aggregate_by_sector(&records);
        assert!(outcome.dropped.is_empty());
        for aggregate in &outcome.aggregates {
            assert!(aggregate.active_startups + aggregate.closed_startups <= aggregate.total_startups);
            assert!((0.0..=1.0).contains(&aggregate.saturation_score));
            assert!((0.0..=1.0).contains(&aggregate.risk_score));
            assert_eq!(
                aggregate.risk_score,
                aggregate.closed_startups as f64 / aggregate.total_startups as f64
            );
        }
    }

    #[test]
    fn test_invalid_sector_is_dropped_without_blocking_others() {
        let mut bad = record("Fintech", "active", 1.0, None, None);
        bad.total_funding = f64::INFINITY;
        let records = vec![bad, record("Edtech", "active", 1.0, None, None)];

        let outcome = aggregate_by_sector(&records);
        assert_eq!(outcome.aggregates.len(), 1);
        assert_eq!(outcome.aggregates[0].sector, "Edtech");
        assert_eq!(outcome.dropped.len(), 1);
        assert_eq!(outcome.dropped[0].sector, "Fintech");
    }

    #[test]
    fn test_empty_table_yields_no_sectors() {
        let outcome = aggregate_by_sector(&[]);
        assert!(outcome.aggregates.is_empty());
        assert!(outcome.dropped.is_empty());
    }
}
