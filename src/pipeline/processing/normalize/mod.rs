//! Record normalization: raw startup rows into canonical clean records.
//!
//! Normalization runs in two phases. `validate` coerces the loosely typed raw
//! fields and enforces the record invariants, producing a [`ValidatedRecord`]
//! or a [`ValidationError`]. `transform` then canonicalizes text and derives
//! the categorical fields. Rejections are ordinary values, not errors, so a
//! batch always runs to completion.

mod coerce;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{info, warn};

use crate::constants::{MAX_YEAR, MIN_YEAR, STATUS_UNKNOWN};
use crate::domain::{CleanRecord, RawRecord};
use crate::error::ValidationError;
use crate::pipeline::processing::classify::{classify_capital_range, classify_funding_stage};

pub use coerce::{integral, title_case, to_date, to_f64, to_i64, to_text};

/// Outcome of normalizing one raw record
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Accepted(CleanRecord),
    Rejected(Rejection),
}

/// A record that failed validation, with enough context to log it
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// Record name if one could be read, for log lines
    pub name: Option<String>,
    pub error: ValidationError,
}

/// Raw record after coercion and invariant checks, before canonicalization
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecord {
    pub name: String,
    pub sector: String,
    pub founded_year: Option<i64>,
    pub funding_rounds: Option<i64>,
    pub total_funding: Option<f64>,
    pub last_funding_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub employee_count: Option<i64>,
    pub first_funding_year: Option<i64>,
    pub last_funding_year: Option<i64>,
    pub time_to_first_funding_days: Option<i64>,
    pub time_to_last_funding_days: Option<i64>,
}

/// Trait for turning raw records into clean records
pub trait Normalizer {
    fn normalize(&self, raw: &RawRecord) -> Normalized;
}

/// Normalizer applying the standard cleaning rules
#[derive(Debug, Default, Clone)]
pub struct DefaultNormalizer;

impl DefaultNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Phase one: coerce fields and enforce range and sign invariants
    pub fn validate(&self, raw: &RawRecord) -> Result<ValidatedRecord, ValidationError> {
        let name = raw.name.as_ref().and_then(to_text).ok_or(ValidationError::MissingField("name"))?;
        let sector = raw
            .sector
            .as_ref()
            .and_then(to_text)
            .ok_or(ValidationError::MissingField("sector"))?;

        let founded_year = checked_year("founded_year", raw.founded_year.as_ref())?;
        let first_funding_year = checked_year("first_funding_year", raw.first_funding_year.as_ref())?;
        let last_funding_year = checked_year("last_funding_year", raw.last_funding_year.as_ref())?;

        let funding_rounds = checked_count("funding_rounds", raw.funding_rounds.as_ref())?;
        let employee_count = checked_count("employee_count", raw.employee_count.as_ref())?;
        let time_to_first_funding_days =
            checked_count("time_to_first_funding_days", raw.time_to_first_funding_days.as_ref())?;
        let time_to_last_funding_days =
            checked_count("time_to_last_funding_days", raw.time_to_last_funding_days.as_ref())?;

        let total_funding = raw.total_funding.as_ref().and_then(to_f64);
        if let Some(value) = total_funding {
            if value < 0.0 {
                return Err(ValidationError::Negative { field: "total_funding", value });
            }
        }

        Ok(ValidatedRecord {
            name,
            sector,
            founded_year,
            funding_rounds,
            total_funding,
            last_funding_date: raw.last_funding_date.as_ref().and_then(to_date),
            status: raw.status.as_ref().and_then(to_text),
            country: raw.country.as_ref().and_then(to_text),
            city: raw.city.as_ref().and_then(to_text),
            employee_count,
            first_funding_year,
            last_funding_year,
            time_to_first_funding_days,
            time_to_last_funding_days,
        })
    }

    /// Phase two: canonicalize text, apply defaults and derive categories
    pub fn transform(&self, record: ValidatedRecord) -> CleanRecord {
        let funding_stage = classify_funding_stage(record.funding_rounds, record.total_funding);
        let capital_range = classify_capital_range(record.total_funding);

        let status = record
            .status
            .map(|s| s.to_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| STATUS_UNKNOWN.to_string());

        // Years are range-checked and counts sign-checked in `validate`,
        // so the narrowing conversions below cannot fail.
        CleanRecord {
            name: record.name,
            sector: title_case(&record.sector),
            founded_year: record.founded_year.map(|y| y as i32),
            funding_rounds: record.funding_rounds.map(|r| r.min(u32::MAX as i64) as u32).unwrap_or(0),
            total_funding: record.total_funding.unwrap_or(0.0),
            last_funding_date: record.last_funding_date,
            status,
            country: record.country,
            city: record.city,
            employee_count: record.employee_count.map(|c| c as u64),
            first_funding_year: record.first_funding_year.map(|y| y as i32),
            last_funding_year: record.last_funding_year.map(|y| y as i32),
            time_to_first_funding_days: record.time_to_first_funding_days.map(|d| d as u64),
            time_to_last_funding_days: record.time_to_last_funding_days.map(|d| d as u64),
            funding_stage,
            capital_range,
        }
    }
}

impl Normalizer for DefaultNormalizer {
    fn normalize(&self, raw: &RawRecord) -> Normalized {
        match self.validate(raw) {
            Ok(validated) => Normalized::Accepted(self.transform(validated)),
            Err(error) => Normalized::Rejected(Rejection {
                name: raw.name.as_ref().and_then(to_text),
                error,
            }),
        }
    }
}

/// Range-check a year on its numeric value, then keep it only if it is whole
fn checked_year(field: &'static str, raw: Option<&Value>) -> Result<Option<i64>, ValidationError> {
    match raw.and_then(to_f64) {
        Some(value) if !(MIN_YEAR as f64..=MAX_YEAR as f64).contains(&value) => {
            Err(ValidationError::YearOutOfRange { field, value })
        }
        Some(value) => Ok(integral(value)),
        None => Ok(None),
    }
}

/// Sign-check a count on its numeric value, then keep it only if it is whole
fn checked_count(field: &'static str, raw: Option<&Value>) -> Result<Option<i64>, ValidationError> {
    match raw.and_then(to_f64) {
        Some(value) if value < 0.0 => Err(ValidationError::Negative { field, value }),
        Some(value) => Ok(integral(value)),
        None => Ok(None),
    }
}

/// Result of normalizing a whole batch
#[derive(Debug, Clone, Default)]
pub struct BatchNormalization {
    pub accepted: Vec<CleanRecord>,
    pub rejected: usize,
}

/// Normalize every record, keeping input order for the accepted ones.
///
/// The first `max_logged` rejections are logged individually; the rest are
/// reported as a single count.
pub fn normalize_batch<N: Normalizer + ?Sized>(
    normalizer: &N,
    records: &[RawRecord],
    max_logged: usize,
) -> BatchNormalization {
    let mut batch = BatchNormalization::default();

    for raw in records {
        match normalizer.normalize(raw) {
            Normalized::Accepted(record) => batch.accepted.push(record),
            Normalized::Rejected(rejection) => {
                batch.rejected += 1;
                if batch.rejected <= max_logged {
                    warn!(
                        "Validation error for record {}: {}",
                        rejection.name.as_deref().unwrap_or("unknown"),
                        rejection.error
                    );
                }
            }
        }
    }

    if batch.rejected > max_logged {
        warn!(
            "{} further validation errors not logged individually",
            batch.rejected - max_logged
        );
    }
    info!(
        "Validated {} records ({} errors)",
        batch.accepted.len(),
        batch.rejected
    );

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CapitalRange, FundingStage};
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawRecord {
        serde_json::from_value(value).unwrap()
    }

    fn accepted(value: serde_json::Value) -> CleanRecord {
        match DefaultNormalizer::new().normalize(&raw(value)) {
            Normalized::Accepted(record) => record,
            Normalized::Rejected(r) => panic!("unexpected rejection: {}", r.error),
        }
    }

    fn rejected(value: serde_json::Value) -> ValidationError {
        match DefaultNormalizer::new().normalize(&raw(value)) {
            Normalized::Rejected(r) => r.error,
            Normalized::Accepted(record) => panic!("unexpected acceptance: {:?}", record),
        }
    }

    #[test]
    fn test_text_fields_are_canonicalized() {
        let record = accepted(json!({
            "name": "  Acme  ",
            "sector": "  artificial intelligence ",
            "status": "  ACTIVE  ",
            "country": " USA ",
            "city": "   "
        }));
        assert_eq!(record.name, "Acme");
        assert_eq!(record.sector, "Artificial Intelligence");
        assert_eq!(record.status, "active");
        assert_eq!(record.country.as_deref(), Some("USA"));
        assert_eq!(record.city, None);
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let record = accepted(json!({"name": "Acme", "sector": "fintech"}));
        assert_eq!(record.status, "unknown");
        assert_eq!(record.funding_rounds, 0);
        assert_eq!(record.total_funding, 0.0);
        assert_eq!(record.funding_stage, FundingStage::PreSeed);
        assert_eq!(record.capital_range, CapitalRange::Zero);
    }

    #[test]
    fn test_empty_status_defaults_to_unknown() {
        let record = accepted(json!({"name": "Acme", "sector": "fintech", "status": "   "}));
        assert_eq!(record.status, "unknown");
    }

    #[test]
    fn test_founded_year_boundaries() {
        for year in [1900, 2030] {
            let record = accepted(json!({"name": "Acme", "sector": "Saas", "founded_year": year}));
            assert_eq!(record.founded_year, Some(year));
        }
        for year in [1800, 2031] {
            assert_eq!(
                rejected(json!({"name": "Acme", "sector": "Saas", "founded_year": year})),
                ValidationError::YearOutOfRange { field: "founded_year", value: year as f64 }
            );
        }
    }

    #[test]
    fn test_funding_years_are_range_checked() {
        let err = rejected(json!({"name": "Acme", "sector": "Saas", "last_funding_year": 2099}));
        assert!(matches!(err, ValidationError::YearOutOfRange { field: "last_funding_year", .. }));
    }

    #[test]
    fn test_negative_values_reject_the_record() {
        let err = rejected(json!({"name": "Acme", "sector": "Saas", "total_funding": -5.0}));
        assert_eq!(err, ValidationError::Negative { field: "total_funding", value: -5.0 });

        let err = rejected(json!({"name": "Acme", "sector": "Saas", "employee_count": "-3"}));
        assert!(matches!(err, ValidationError::Negative { field: "employee_count", .. }));
    }

    #[test]
    fn test_fractional_values_are_checked_before_truncation() {
        let err = rejected(json!({"name": "Acme", "sector": "Saas", "employee_count": -2.5}));
        assert_eq!(err, ValidationError::Negative { field: "employee_count", value: -2.5 });

        let err = rejected(json!({"name": "Acme", "sector": "Saas", "time_to_first_funding_days": "-10.5"}));
        assert_eq!(err, ValidationError::Negative { field: "time_to_first_funding_days", value: -10.5 });

        let err = rejected(json!({"name": "Acme", "sector": "Saas", "founded_year": 1800.5}));
        assert_eq!(err, ValidationError::YearOutOfRange { field: "founded_year", value: 1800.5 });

        let record = accepted(json!({"name": "Acme", "sector": "Saas", "founded_year": 2015.5, "funding_rounds": 2.0}));
        assert_eq!(record.founded_year, None);
        assert_eq!(record.funding_rounds, 2);
    }

    #[test]
    fn test_uncoercible_numbers_become_absent() {
        let record = accepted(json!({
            "name": "Acme",
            "sector": "Saas",
            "founded_year": "not a year",
            "funding_rounds": "two",
            "total_funding": "1500000",
            "employee_count": 12.5
        }));
        assert_eq!(record.founded_year, None);
        assert_eq!(record.funding_rounds, 0);
        assert_eq!(record.total_funding, 1_500_000.0);
        assert_eq!(record.employee_count, None);
        assert_eq!(record.capital_range, CapitalRange::OneToTenMillion);
    }

    #[test]
    fn test_missing_name_or_sector_rejects() {
        assert_eq!(rejected(json!({"sector": "Saas"})), ValidationError::MissingField("name"));
        assert_eq!(rejected(json!({"name": "Acme", "sector": " "})), ValidationError::MissingField("sector"));
    }

    #[test]
    fn test_last_funding_date_formats() {
        let record = accepted(json!({
            "name": "Acme",
            "sector": "Saas",
            "last_funding_date": "2021-03-04 00:00:00"
        }));
        assert_eq!(record.last_funding_date, NaiveDate::from_ymd_opt(2021, 3, 4));

        let record = accepted(json!({"name": "Acme", "sector": "Saas", "last_funding_date": "soon"}));
        assert_eq!(record.last_funding_date, None);
    }

    #[test]
    fn test_batch_counts_rejections_and_keeps_order() {
        let records = vec![
            raw(json!({"name": "A", "sector": "x"})),
            raw(json!({"name": "B", "sector": "x", "founded_year": 1800})),
            raw(json!({"name": "C", "sector": "x"})),
            raw(json!({"name": "D", "sector": "x", "funding_rounds": -1})),
        ];
        let batch = normalize_batch(&DefaultNormalizer::new(), &records, 1);
        assert_eq!(batch.rejected, 2);
        let names: Vec<_> = batch.accepted.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
    }
}
