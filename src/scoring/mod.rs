//! Opportunity scoring over the sector aggregate snapshot.
//!
//! Everything here is pure: callers load the aggregates (see
//! `pipeline::tasks::load_aggregates`) and pass them in.

pub mod discovery;
pub mod evaluation;
pub mod ranking;

pub use discovery::{
    discover_opportunities, CapitalBand, DiscoveryPreferences, Recommendation, RiskAppetite,
    DEFAULT_DISCOVERY_LIMIT,
};
pub use evaluation::{evaluate_idea, IdeaEvaluation, Viability};
pub use ranking::{opportunity_reasons, opportunity_score, OpportunityBreakdown};
