use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

use crate::domain::SectorAggregate;
use crate::error::ScoringError;
use crate::scoring::ranking::{opportunity_score, OpportunityBreakdown};

const SATURATION_WEIGHT: f64 = 0.30;
const GROWTH_WEIGHT: f64 = 0.30;
const CAPITAL_WEIGHT: f64 = 0.20;
const RISK_WEIGHT: f64 = 0.20;

/// Subscores below this produce a factor line
const WEAK_SUBSCORE: f64 = 5.0;
/// Subscores below this produce a suggestion
const IMPROVABLE_SUBSCORE: f64 = 6.0;
const MAX_ALTERNATIVES: usize = 2;
/// Ideas scoring below this get ranked alternative sectors
const TOP_ALTERNATIVES_BELOW: f64 = 8.0;
const MAX_TOP_ALTERNATIVES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Viability {
    Excellent,
    Good,
    Challenging,
}

impl Viability {
    pub fn from_score(score: f64) -> Self {
        if score >= 7.0 {
            Viability::Excellent
        } else if score >= 5.0 {
            Viability::Good
        } else {
            Viability::Challenging
        }
    }
}

impl fmt::Display for Viability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Viability::Excellent => "Excellent",
            Viability::Good => "Good",
            Viability::Challenging => "Challenging",
        };
        f.write_str(label)
    }
}

/// 0-10 subscores of an idea evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Subscores {
    pub saturation: f64,
    pub growth: f64,
    pub capital: f64,
    pub risk: f64,
}

impl Subscores {
    pub fn overall(&self) -> f64 {
        SATURATION_WEIGHT * self.saturation
            + GROWTH_WEIGHT * self.growth
            + CAPITAL_WEIGHT * self.capital
            + RISK_WEIGHT * self.risk
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alternatives {
    /// Sectors with lower saturation, least saturated first
    pub less_saturated: Vec<String>,
    /// Sectors with higher growth, fastest first
    pub faster_growing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdeaEvaluation {
    pub sector: String,
    pub capital: f64,
    pub subscores: Subscores,
    pub overall: f64,
    pub viability: Viability,
    pub factors: Vec<String>,
    pub alternatives: Alternatives,
    /// Best other sectors by opportunity score, only for ideas under 8.0
    pub top_alternatives: Vec<(String, OpportunityBreakdown)>,
    pub suggestions: Vec<String>,
}

/// How well the founder's capital covers the sector's typical funding
pub fn capital_subscore(capital: f64, avg_funding: f64) -> f64 {
    if avg_funding < 1000.0 {
        5.0
    } else if capital >= avg_funding {
        10.0
    } else if capital >= 0.5 * avg_funding {
        7.0
    } else if capital >= 0.2 * avg_funding {
        4.0
    } else {
        2.0
    }
}

pub fn subscores(aggregate: &SectorAggregate, capital: f64) -> Subscores {
    Subscores {
        saturation: (1.0 - aggregate.saturation_score) * 10.0,
        growth: ((aggregate.growth_rate + 0.2) * 25.0).clamp(0.0, 10.0),
        capital: capital_subscore(capital, aggregate.avg_funding_per_startup),
        risk: (1.0 - aggregate.risk_score) * 10.0,
    }
}

/// Evaluate a startup idea in `sector` backed by `capital`.
pub fn evaluate_idea(
    aggregates: &[SectorAggregate],
    sector: &str,
    capital: f64,
) -> Result<IdeaEvaluation, ScoringError> {
    if aggregates.is_empty() {
        return Err(ScoringError::NoData);
    }
    let target = aggregates
        .iter()
        .find(|a| a.sector == sector)
        .ok_or_else(|| ScoringError::UnknownSector(sector.to_string()))?;

    let subscores = subscores(target, capital);
    let overall = subscores.overall();
    let factors = factors(target, &subscores);
    let alternatives = alternatives(aggregates, target);
    let suggestions = suggestions(target, &subscores, &alternatives, capital);
    let top_alternatives = if overall < TOP_ALTERNATIVES_BELOW {
        top_alternatives(aggregates, target)
    } else {
        Vec::new()
    };

    Ok(IdeaEvaluation {
        sector: target.sector.clone(),
        capital,
        subscores,
        overall,
        viability: Viability::from_score(overall),
        factors,
        alternatives,
        top_alternatives,
        suggestions,
    })
}

fn factors(aggregate: &SectorAggregate, subscores: &Subscores) -> Vec<String> {
    let mut factors = Vec::new();
    if subscores.saturation < WEAK_SUBSCORE {
        factors.push(format!(
            "High market saturation ({:.0}%)",
            aggregate.saturation_score * 100.0
        ));
    }
    if subscores.growth < WEAK_SUBSCORE {
        factors.push(format!(
            "Slow or negative market growth ({:.1}%)",
            aggregate.growth_rate * 100.0
        ));
    }
    if subscores.capital < WEAK_SUBSCORE {
        factors.push(format!(
            "Capital below sector average (avg ${:.0})",
            aggregate.avg_funding_per_startup
        ));
    }
    if subscores.risk < WEAK_SUBSCORE {
        factors.push(format!(
            "High failure rate ({:.0}%)",
            aggregate.risk_score * 100.0
        ));
    }
    factors
}

fn alternatives(aggregates: &[SectorAggregate], target: &SectorAggregate) -> Alternatives {
    let mut less_saturated: Vec<&SectorAggregate> = aggregates
        .iter()
        .filter(|a| a.sector != target.sector && a.saturation_score < target.saturation_score)
        .collect();
    less_saturated.sort_by(|a, b| {
        a.saturation_score
            .partial_cmp(&b.saturation_score)
            .unwrap_or(Ordering::Equal)
    });

    let mut faster_growing: Vec<&SectorAggregate> = aggregates
        .iter()
        .filter(|a| a.sector != target.sector && a.growth_rate > target.growth_rate)
        .collect();
    faster_growing.sort_by(|a, b| b.growth_rate.partial_cmp(&a.growth_rate).unwrap_or(Ordering::Equal));

    Alternatives {
        less_saturated: less_saturated
            .into_iter()
            .take(MAX_ALTERNATIVES)
            .map(|a| a.sector.clone())
            .collect(),
        faster_growing: faster_growing
            .into_iter()
            .take(MAX_ALTERNATIVES)
            .map(|a| a.sector.clone())
            .collect(),
    }
}

/// Other sectors ranked by opportunity score, ties by name
fn top_alternatives(aggregates: &[SectorAggregate], target: &SectorAggregate) -> Vec<(String, OpportunityBreakdown)> {
    let mut scored: Vec<(String, OpportunityBreakdown)> = aggregates
        .iter()
        .filter(|a| a.sector != target.sector)
        .map(|a| (a.sector.clone(), opportunity_score(a)))
        .collect();
    scored.sort_by(|(a_name, a), (b_name, b)| b.total.total_cmp(&a.total).then_with(|| a_name.cmp(b_name)));
    scored.truncate(MAX_TOP_ALTERNATIVES);
    scored
}

fn suggestions(
    aggregate: &SectorAggregate,
    subscores: &Subscores,
    alternatives: &Alternatives,
    capital: f64,
) -> Vec<String> {
    let mut suggestions = Vec::new();

    if subscores.saturation < IMPROVABLE_SUBSCORE && !alternatives.less_saturated.is_empty() {
        suggestions.push(format!(
            "Consider less saturated sectors: {}",
            alternatives.less_saturated.join(", ")
        ));
    }
    if subscores.capital < IMPROVABLE_SUBSCORE && capital < aggregate.avg_funding_per_startup {
        suggestions.push(format!(
            "Raise about ${:.0} more to reach the sector average",
            aggregate.avg_funding_per_startup - capital
        ));
    }
    if subscores.growth < IMPROVABLE_SUBSCORE && !alternatives.faster_growing.is_empty() {
        suggestions.push(format!(
            "Faster-growing sectors: {}",
            alternatives.faster_growing.join(", ")
        ));
    }
    if suggestions.is_empty() {
        suggestions.push("Your idea is well-positioned in this market".to_string());
    }
    suggestions
}
