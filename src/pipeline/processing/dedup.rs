use std::collections::HashSet;

use crate::domain::{CleanRecord, RecordKey};

/// Survivors of a deduplication pass
#[derive(Debug, Clone, Default)]
pub struct Deduplicated {
    pub records: Vec<CleanRecord>,
    pub removed: usize,
}

/// Drop records whose `(name, sector, founded_year)` key was already seen.
///
/// The first occurrence wins and survivors keep their relative order.
pub fn deduplicate(records: Vec<CleanRecord>) -> Deduplicated {
    let before = records.len();
    let mut seen: HashSet<RecordKey> = HashSet::with_capacity(before);

    let records: Vec<CleanRecord> = records
        .into_iter()
        .filter(|record| seen.insert(record.key()))
        .collect();

    Deduplicated {
        removed: before - records.len(),
        records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CapitalRange, FundingStage};

    fn record(name: &str, sector: &str, founded_year: Option<i32>, city: &str) -> CleanRecord {
        CleanRecord {
            name: name.to_string(),
            sector: sector.to_string(),
            founded_year,
            funding_rounds: 0,
            total_funding: 0.0,
            last_funding_date: None,
            status: "active".to_string(),
            country: None,
            city: Some(city.to_string()),
            employee_count: None,
            first_funding_year: None,
            last_funding_year: None,
            time_to_first_funding_days: None,
            time_to_last_funding_days: None,
            funding_stage: FundingStage::PreSeed,
            capital_range: CapitalRange::Zero,
        }
    }

    #[test]
    fn test_first_occurrence_wins() {
        let result = deduplicate(vec![
            record("Acme", "Fintech", Some(2015), "first"),
            record("Beta", "Fintech", Some(2015), "beta"),
            record("Acme", "Fintech", Some(2015), "second"),
        ]);
        assert_eq!(result.removed, 1);
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].city.as_deref(), Some("first"));
        assert_eq!(result.records[1].name, "Beta");
    }

    #[test]
    fn test_key_includes_sector_and_year() {
        let result = deduplicate(vec![
            record("Acme", "Fintech", Some(2015), "a"),
            record("Acme", "Healthtech", Some(2015), "b"),
            record("Acme", "Fintech", Some(2016), "c"),
            record("Acme", "Fintech", None, "d"),
            record("Acme", "Fintech", None, "e"),
        ]);
        assert_eq!(result.removed, 1);
        assert_eq!(result.records.len(), 4);
    }

    #[test]
    fn test_deduplication_is_idempotent() {
        let once = deduplicate(vec![
            record("Acme", "Fintech", Some(2015), "a"),
            record("Acme", "Fintech", Some(2015), "b"),
            record("Zeta", "Edtech", None, "c"),
        ]);
        let twice = deduplicate(once.records.clone());
        assert_eq!(twice.removed, 0);
        assert_eq!(twice.records, once.records);
    }
}
