use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

use super::ranking::{opportunity_reasons, opportunity_score, OpportunityBreakdown};
use crate::domain::SectorAggregate;
use crate::error::ScoringError;

pub const DEFAULT_DISCOVERY_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskAppetite {
    Low,
    Medium,
    High,
}

impl RiskAppetite {
    /// Preference bonus for a sector with the given risk score
    fn bonus(&self, risk: f64) -> f64 {
        match self {
            RiskAppetite::Low => (1.0 - risk) * 2.0,
            RiskAppetite::Medium => (1.0 - (risk - 0.45).abs()) * 2.0,
            RiskAppetite::High => risk * 2.0,
        }
    }
}

impl FromStr for RiskAppetite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(RiskAppetite::Low),
            "medium" => Ok(RiskAppetite::Medium),
            "high" => Ok(RiskAppetite::High),
            other => Err(format!("unknown risk appetite '{}' (low, medium, high)", other)),
        }
    }
}

/// Amount of capital the founder expects to raise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapitalBand {
    #[serde(rename = "under-50k")]
    Under50K,
    #[serde(rename = "50k-500k")]
    From50KTo500K,
    #[serde(rename = "500k-5m")]
    From500KTo5M,
    #[serde(rename = "over-5m")]
    Over5M,
}

impl CapitalBand {
    fn bonus(&self, avg_funding: f64, max_avg_funding: f64) -> f64 {
        let relative = if max_avg_funding > 0.0 {
            Some(avg_funding / max_avg_funding)
        } else {
            None
        };
        match self {
            CapitalBand::Under50K => relative.map(|r| (1.0 - r) * 1.5).unwrap_or(0.0),
            CapitalBand::From50KTo500K => (1.0 - (avg_funding - 275_000.0).abs() / 275_000.0) * 1.5,
            CapitalBand::From500KTo5M => relative.map(|r| r * 1.5).unwrap_or(0.0),
            CapitalBand::Over5M => 0.0,
        }
    }
}

impl FromStr for CapitalBand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "under-50k" => Ok(CapitalBand::Under50K),
            "50k-500k" => Ok(CapitalBand::From50KTo500K),
            "500k-5m" => Ok(CapitalBand::From500KTo5M),
            "over-5m" => Ok(CapitalBand::Over5M),
            other => Err(format!(
                "unknown capital band '{}' (under-50k, 50k-500k, 500k-5m, over-5m)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryPreferences {
    /// Restrict results to exactly this sector
    pub sector: Option<String>,
    pub risk_appetite: Option<RiskAppetite>,
    pub capital_band: Option<CapitalBand>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub sector: String,
    /// Unadjusted 0-10 opportunity score
    pub score: OpportunityBreakdown,
    /// Score plus preference bonuses, used for ordering only
    pub fit_score: f64,
    pub reasons: Vec<String>,
    pub aggregate: SectorAggregate,
}

/// Rank sectors by opportunity, adjusted for the founder's preferences.
///
/// Returns the best `limit` sectors. An empty aggregate table is `NoData`; a
/// preferred sector with no aggregate is `UnknownSector`.
pub fn discover_opportunities(
    aggregates: &[SectorAggregate],
    preferences: &DiscoveryPreferences,
    limit: usize,
) -> Result<Vec<Recommendation>, ScoringError> {
    if aggregates.is_empty() {
        return Err(ScoringError::NoData);
    }

    let candidates: Vec<&SectorAggregate> = match &preferences.sector {
        Some(sector) => {
            let matching: Vec<_> = aggregates.iter().filter(|a| &a.sector == sector).collect();
            if matching.is_empty() {
                return Err(ScoringError::UnknownSector(sector.clone()));
            }
            matching
        }
        None => aggregates.iter().collect(),
    };

    let max_avg_funding = candidates
        .iter()
        .map(|a| a.avg_funding_per_startup)
        .fold(0.0_f64, f64::max);

    let mut recommendations: Vec<Recommendation> = candidates
        .into_iter()
        .map(|aggregate| {
            let score = opportunity_score(aggregate);
            let mut fit_score = score.total;
            if let Some(appetite) = preferences.risk_appetite {
                fit_score += appetite.bonus(aggregate.risk_score);
            }
            if let Some(band) = preferences.capital_band {
                fit_score += band.bonus(aggregate.avg_funding_per_startup, max_avg_funding);
            }
            Recommendation {
                sector: aggregate.sector.clone(),
                score,
                fit_score,
                reasons: opportunity_reasons(aggregate),
                aggregate: aggregate.clone(),
            }
        })
        .collect();

    recommendations.sort_by(|a, b| {
        b.fit_score
            .partial_cmp(&a.fit_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.sector.cmp(&b.sector))
    });
    recommendations.truncate(limit);
    Ok(recommendations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::sample_aggregate;

    fn market() -> Vec<SectorAggregate> {
        let mut safe = sample_aggregate("Edtech");
        safe.risk_score = 0.1;
        safe.avg_funding_per_startup = 100_000.0;

        let mut risky = sample_aggregate("Crypto");
        risky.risk_score = 0.8;
        risky.avg_funding_per_startup = 4_000_000.0;

        let mut crowded = sample_aggregate("Saas");
        crowded.saturation_score = 1.0;
        crowded.growth_rate = -0.1;

        vec![safe, risky, crowded]
    }

    #[test]
    fn test_empty_table_is_no_data() {
        let err = discover_opportunities(&[], &DiscoveryPreferences::default(), 5).unwrap_err();
        assert_eq!(err, ScoringError::NoData);
    }

    #[test]
    fn test_unknown_preferred_sector() {
        let prefs = DiscoveryPreferences {
            sector: Some("Biotech".to_string()),
            ..Default::default()
        };
        let err = discover_opportunities(&market(), &prefs, 5).unwrap_err();
        assert_eq!(err, ScoringError::UnknownSector("Biotech".to_string()));
    }

    #[test]
    fn test_ranked_by_score_without_preferences() {
        let result = discover_opportunities(&market(), &DiscoveryPreferences::default(), 5).unwrap();
        let sectors: Vec<_> = result.iter().map(|r| r.sector.as_str()).collect();
        assert_eq!(sectors, vec!["Edtech", "Crypto", "Saas"]);
        assert!(result.iter().all(|r| r.fit_score == r.score.total));
    }

    #[test]
    fn test_high_risk_appetite_reorders() {
        let prefs = DiscoveryPreferences {
            risk_appetite: Some(RiskAppetite::High),
            ..Default::default()
        };
        let result = discover_opportunities(&market(), &prefs, 5).unwrap();
        // Crypto 6.55 + 1.6 against Edtech 7.55 + 0.2
        assert_eq!(result[0].sector, "Crypto");
    }

    #[test]
    fn test_capital_band_prefers_larger_rounds() {
        let prefs = DiscoveryPreferences {
            capital_band: Some(CapitalBand::From500KTo5M),
            ..Default::default()
        };
        let result = discover_opportunities(&market(), &prefs, 1).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].sector, "Crypto");
        assert!(result[0].fit_score > result[0].score.total);
    }

    #[test]
    fn test_preferred_sector_filters() {
        let prefs = DiscoveryPreferences {
            sector: Some("Saas".to_string()),
            ..Default::default()
        };
        let result = discover_opportunities(&market(), &prefs, 5).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].sector, "Saas");
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_medium_risk_bonus_peaks_at_moderate_risk() {
        assert!(approx(RiskAppetite::Medium.bonus(0.45), 2.0));
        assert!(approx(RiskAppetite::Medium.bonus(0.2), 1.5));
        assert!(approx(RiskAppetite::Medium.bonus(0.7), 1.5));
        assert!(approx(RiskAppetite::Medium.bonus(1.0), 0.9));
    }

    #[test]
    fn test_small_capital_bands_favor_cheaper_sectors() {
        assert!(approx(CapitalBand::Under50K.bonus(100_000.0, 400_000.0), 1.125));
        assert!(approx(CapitalBand::Under50K.bonus(400_000.0, 400_000.0), 0.0));

        assert!(approx(CapitalBand::From50KTo500K.bonus(275_000.0, 4_000_000.0), 1.5));
        assert!(approx(CapitalBand::From50KTo500K.bonus(137_500.0, 4_000_000.0), 0.75));
        assert!(approx(CapitalBand::From50KTo500K.bonus(550_000.0, 4_000_000.0), 0.0));
    }

    #[test]
    fn test_relative_bands_without_funded_sectors_get_no_bonus() {
        assert_eq!(CapitalBand::Under50K.bonus(0.0, 0.0), 0.0);
        assert_eq!(CapitalBand::From500KTo5M.bonus(0.0, 0.0), 0.0);
        assert_eq!(CapitalBand::Over5M.bonus(1_000_000.0, 2_000_000.0), 0.0);
    }

    #[test]
    fn test_parse_preferences() {
        assert_eq!("Medium".parse::<RiskAppetite>().unwrap(), RiskAppetite::Medium);
        assert_eq!("500k-5m".parse::<CapitalBand>().unwrap(), CapitalBand::From500KTo5M);
        assert!("huge".parse::<CapitalBand>().is_err());
    }
}
