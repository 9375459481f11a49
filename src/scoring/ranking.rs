use serde::Serialize;

use crate::domain::SectorAggregate;

pub const MAX_SCORE: f64 = 10.0;

/// Components of the 0-10 ranking score, kept for explanation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OpportunityBreakdown {
    /// Up to 3 points for an unsaturated market
    pub saturation: f64,
    /// Up to 3 points for growth
    pub growth: f64,
    /// Up to 2 points for a low failure rate
    pub risk: f64,
    /// Up to 2 points for the share of startups still active
    pub activity: f64,
    /// Sum of the components clamped to [0, 10]
    pub total: f64,
}

/// Score a sector for discovery on a 0-10 scale.
///
/// Growth is offset by 0.1 before scaling so a flat sector still earns a
/// modest 1.5 points.
pub fn opportunity_score(aggregate: &SectorAggregate) -> OpportunityBreakdown {
    let saturation = (1.0 - aggregate.saturation_score) * 3.0;
    let growth = ((aggregate.growth_rate + 0.1) * 15.0).clamp(0.0, 3.0);
    let risk = (1.0 - aggregate.risk_score) * 2.0;
    let activity = aggregate.active_ratio() * 2.0;

    OpportunityBreakdown {
        saturation,
        growth,
        risk,
        activity,
        total: (saturation + growth + risk + activity).clamp(0.0, MAX_SCORE),
    }
}

/// Human-readable reasons a sector looks attractive
pub fn opportunity_reasons(aggregate: &SectorAggregate) -> Vec<String> {
    let mut reasons = Vec::new();

    if aggregate.saturation_score < 0.5 {
        reasons.push(format!(
            "Low market saturation ({:.0}%) leaves room for new entrants",
            aggregate.saturation_score * 100.0
        ));
    }
    if aggregate.growth_rate > 0.05 {
        reasons.push(format!(
            "Growing market with {:.1}% year-over-year growth",
            aggregate.growth_rate * 100.0
        ));
    }
    if aggregate.risk_score < 0.4 {
        reasons.push(format!(
            "Lower risk sector with {:.0}% failure rate",
            aggregate.risk_score * 100.0
        ));
    }
    if aggregate.active_ratio() > 0.6 {
        reasons.push(format!(
            "High success rate: {:.0}% of startups remain active",
            aggregate.active_ratio() * 100.0
        ));
    }
    if reasons.is_empty() {
        reasons.push("Balanced opportunity with moderate characteristics across all metrics".to_string());
    }

    reasons
}
