use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::TOP_COUNTRIES_LIMIT;
use crate::error::AggregateInvariantError;

/// Unvalidated startup record as it arrives from an input file.
///
/// Every field is kept as loose JSON so that strings, floats and garbage in
/// numeric columns survive deserialization; coercion and validation happen in
/// the normalizer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawRecord {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub sector: Option<Value>,
    #[serde(default)]
    pub founded_year: Option<Value>,
    #[serde(default)]
    pub funding_rounds: Option<Value>,
    #[serde(default)]
    pub total_funding: Option<Value>,
    #[serde(default)]
    pub last_funding_date: Option<Value>,
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub country: Option<Value>,
    #[serde(default)]
    pub city: Option<Value>,
    #[serde(default)]
    pub employee_count: Option<Value>,
    #[serde(default)]
    pub first_funding_year: Option<Value>,
    #[serde(default)]
    pub last_funding_year: Option<Value>,
    #[serde(default)]
    pub time_to_first_funding_days: Option<Value>,
    #[serde(default)]
    pub time_to_last_funding_days: Option<Value>,
}

/// Funding stage derived from round count and total funding
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FundingStage {
    #[serde(rename = "pre-seed")]
    PreSeed,
    #[serde(rename = "seed")]
    Seed,
    #[serde(rename = "series-a")]
    SeriesA,
    #[serde(rename = "series-b")]
    SeriesB,
    #[serde(rename = "series-c-plus")]
    SeriesCPlus,
    #[serde(rename = "unknown")]
    Unknown,
}

impl FundingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FundingStage::PreSeed => "pre-seed",
            FundingStage::Seed => "seed",
            FundingStage::SeriesA => "series-a",
            FundingStage::SeriesB => "series-b",
            FundingStage::SeriesCPlus => "series-c-plus",
            FundingStage::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FundingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Total-funding bucket. Ordered from the smallest to the largest range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CapitalRange {
    #[serde(rename = "0-0")]
    Zero,
    #[serde(rename = "0-1M")]
    UnderOneMillion,
    #[serde(rename = "1M-10M")]
    OneToTenMillion,
    #[serde(rename = "10M-50M")]
    TenToFiftyMillion,
    #[serde(rename = "50M+")]
    FiftyMillionPlus,
}

impl CapitalRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapitalRange::Zero => "0-0",
            CapitalRange::UnderOneMillion => "0-1M",
            CapitalRange::OneToTenMillion => "1M-10M",
            CapitalRange::TenToFiftyMillion => "10M-50M",
            CapitalRange::FiftyMillionPlus => "50M+",
        }
    }
}

impl fmt::Display for CapitalRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully normalized startup record, as stored in the clean collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CleanRecord {
    pub name: String,
    pub sector: String,
    pub founded_year: Option<i32>,
    pub funding_rounds: u32,
    pub total_funding: f64,
    pub last_funding_date: Option<NaiveDate>,
    pub status: String,
    pub country: Option<String>,
    pub city: Option<String>,
    pub employee_count: Option<u64>,
    pub first_funding_year: Option<i32>,
    pub last_funding_year: Option<i32>,
    pub time_to_first_funding_days: Option<u64>,
    pub time_to_last_funding_days: Option<u64>,
    pub funding_stage: FundingStage,
    pub capital_range: CapitalRange,
}

/// Identity used for deduplication
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub name: String,
    pub sector: String,
    pub founded_year: Option<i32>,
}

impl CleanRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey {
            name: self.name.clone(),
            sector: self.sector.clone(),
            founded_year: self.founded_year,
        }
    }
}

/// Sector-level market statistics; one document per sector in the snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectorAggregate {
    pub sector: String,
    pub total_startups: u64,
    pub active_startups: u64,
    pub closed_startups: u64,
    pub total_funding: f64,
    pub avg_funding_per_startup: f64,
    pub median_funding: f64,
    pub avg_funding_rounds: f64,
    pub avg_time_to_first_funding_days: Option<f64>,
    pub avg_employee_count: Option<f64>,
    pub founded_year_min: Option<i32>,
    pub founded_year_max: Option<i32>,
    pub growth_rate: f64,
    pub saturation_score: f64,
    pub risk_score: f64,
    #[serde(default)]
    pub top_countries: Vec<String>,
    #[serde(default)]
    pub capital_distribution: BTreeMap<CapitalRange, u64>,
}

impl SectorAggregate {
    /// Check the aggregate's invariants, collecting every violation
    pub fn validate(&self) -> Result<(), AggregateInvariantError> {
        let mut violations = Vec::new();

        if self.sector.trim().is_empty() {
            violations.push("sector is empty".to_string());
        }
        if self.active_startups + self.closed_startups > self.total_startups {
            violations.push(format!(
                "active ({}) + closed ({}) exceeds total ({})",
                self.active_startups, self.closed_startups, self.total_startups
            ));
        }

        let non_negative = [
            ("total_funding", Some(self.total_funding)),
            ("avg_funding_per_startup", Some(self.avg_funding_per_startup)),
            ("median_funding", Some(self.median_funding)),
            ("avg_funding_rounds", Some(self.avg_funding_rounds)),
            ("avg_time_to_first_funding_days", self.avg_time_to_first_funding_days),
            ("avg_employee_count", self.avg_employee_count),
        ];
        for (field, value) in non_negative {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    violations.push(format!("{} must be a finite value >= 0, got {}", field, v));
                }
            }
        }

        for (field, value) in [("saturation_score", self.saturation_score), ("risk_score", self.risk_score)] {
            if !(0.0..=1.0).contains(&value) {
                violations.push(format!("{} must lie in [0, 1], got {}", field, value));
            }
        }

        if !self.growth_rate.is_finite() {
            violations.push(format!("growth_rate must be finite, got {}", self.growth_rate));
        }

        if let (Some(min), Some(max)) = (self.founded_year_min, self.founded_year_max) {
            if min > max {
                violations.push(format!("founded_year_min ({}) > founded_year_max ({})", min, max));
            }
        }

        if self.top_countries.len() > TOP_COUNTRIES_LIMIT {
            violations.push(format!(
                "top_countries has {} entries (max {})",
                self.top_countries.len(),
                TOP_COUNTRIES_LIMIT
            ));
        }

        let distributed: u64 = self.capital_distribution.values().sum();
        if distributed != self.total_startups {
            violations.push(format!(
                "capital_distribution covers {} startups, expected {}",
                distributed, self.total_startups
            ));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(AggregateInvariantError {
                sector: self.sector.clone(),
                violations,
            })
        }
    }

    /// Share of startups in this sector still operating
    pub fn active_ratio(&self) -> f64 {
        self.active_startups as f64 / self.total_startups.max(1) as f64
    }
}
