//! Enrichment phases, in execution order.

use serde::{Deserialize, Serialize};

/// One categorized sub-pipeline targeting a cohesive subset of fields.
///
/// Variant order is execution order: Discovery runs first because later
/// phases consume the company identity it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Discovery,
    Profile,
    Metrics,
    Funding,
    TechStack,
    General,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Phase; 6] = [
        Phase::Discovery,
        Phase::Profile,
        Phase::Metrics,
        Phase::Funding,
        Phase::TechStack,
        Phase::General,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Discovery => "discovery",
            Phase::Profile => "profile",
            Phase::Metrics => "metrics",
            Phase::Funding => "funding",
            Phase::TechStack => "tech_stack",
            Phase::General => "general",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
