use crate::domain::{CapitalRange, FundingStage};

const ONE_MILLION: f64 = 1_000_000.0;
const TEN_MILLION: f64 = 10_000_000.0;
const FIFTY_MILLION: f64 = 50_000_000.0;

/// Classify the funding stage from round count and total funding.
///
/// A record with no rounds or no money is pre-seed regardless of the other
/// value; a negative round count has no stage.
pub fn classify_funding_stage(funding_rounds: Option<i64>, total_funding: Option<f64>) -> FundingStage {
    let rounds = funding_rounds.unwrap_or(0);
    let total = total_funding.unwrap_or(0.0);

    if rounds == 0 || total == 0.0 {
        return FundingStage::PreSeed;
    }
    match rounds {
        1 => FundingStage::Seed,
        2 => FundingStage::SeriesA,
        3 => FundingStage::SeriesB,
        r if r >= 4 => FundingStage::SeriesCPlus,
        _ => FundingStage::Unknown,
    }
}

/// Bucket total funding. Lower bounds are inclusive, upper bounds exclusive.
pub fn classify_capital_range(total_funding: Option<f64>) -> CapitalRange {
    let total = total_funding.unwrap_or(0.0);

    if total == 0.0 {
        CapitalRange::Zero
    } else if total < ONE_MILLION {
        CapitalRange::UnderOneMillion
    } else if total < TEN_MILLION {
        CapitalRange::OneToTenMillion
    } else if total < FIFTY_MILLION {
        CapitalRange::TenToFiftyMillion
    } else {
        CapitalRange::FiftyMillionPlus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_rounds_or_no_money_is_pre_seed() {
        assert_eq!(classify_funding_stage(None, Some(5_000.0)), FundingStage::PreSeed);
        assert_eq!(classify_funding_stage(Some(3), None), FundingStage::PreSeed);
        assert_eq!(classify_funding_stage(Some(3), Some(0.0)), FundingStage::PreSeed);
    }

    #[test]
    fn test_round_counts_map_to_series() {
        let funding = Some(2_000_000.0);
        assert_eq!(classify_funding_stage(Some(1), funding), FundingStage::Seed);
        assert_eq!(classify_funding_stage(Some(2), funding), FundingStage::SeriesA);
        assert_eq!(classify_funding_stage(Some(3), funding), FundingStage::SeriesB);
        assert_eq!(classify_funding_stage(Some(4), funding), FundingStage::SeriesCPlus);
        assert_eq!(classify_funding_stage(Some(11), funding), FundingStage::SeriesCPlus);
        assert_eq!(classify_funding_stage(Some(-1), funding), FundingStage::Unknown);
    }

    #[test]
    fn test_capital_range_boundaries_are_inclusive_lower() {
        assert_eq!(classify_capital_range(None), CapitalRange::Zero);
        assert_eq!(classify_capital_range(Some(0.0)), CapitalRange::Zero);
        assert_eq!(classify_capital_range(Some(999_999.0)), CapitalRange::UnderOneMillion);
        assert_eq!(classify_capital_range(Some(1_000_000.0)), CapitalRange::OneToTenMillion);
        assert_eq!(classify_capital_range(Some(9_999_999.99)), CapitalRange::OneToTenMillion);
        assert_eq!(classify_capital_range(Some(10_000_000.0)), CapitalRange::TenToFiftyMillion);
        assert_eq!(classify_capital_range(Some(50_000_000.0)), CapitalRange::FiftyMillionPlus);
    }
}
