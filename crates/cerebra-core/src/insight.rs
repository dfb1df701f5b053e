//! Analytics engine output types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The kind of condition an [`Insight`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    /// Recent spend is at least 2x the rolling baseline.
    CostSpike,
    /// A cheaper, roughly-equivalent model is available.
    ModelSwitch,
    /// A budget is approaching or has hit a threshold.
    BudgetWarning,
    /// An otherwise-unclassified irregularity.
    Anomaly,
    /// A concrete savings opportunity was identified.
    SavingsFound,
}

/// How urgently an [`Insight`] should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightSeverity {
    /// Informational only.
    Info,
    /// Worth a human's attention.
    Warning,
    /// Needs attention now.
    Critical,
}

/// A single analytics finding produced by `cerebra-analytics`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    /// Unique id.
    pub id: uuid::Uuid,
    /// Kind of finding.
    pub insight_type: InsightType,
    /// Urgency.
    pub severity: InsightSeverity,
    /// The entity (agent id, team id, etc.) this finding is about.
    pub affected_entity: String,
    /// Estimated USD impact, positive meaning money that could be saved or
    /// was overspent, depending on `insight_type`.
    pub estimated_saving: Decimal,
    /// Human-readable explanation.
    pub description: String,
    /// When this finding was generated.
    pub created_at: DateTime<Utc>,
}

impl Insight {
    /// Build a new insight, stamping a fresh id and `created_at`.
    #[must_use]
    pub fn new(
        insight_type: InsightType,
        severity: InsightSeverity,
        affected_entity: impl Into<String>,
        estimated_saving: Decimal,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            insight_type,
            severity,
            affected_entity: affected_entity.into(),
            estimated_saving,
            description: description.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn severity_orders_by_urgency() {
        assert!(InsightSeverity::Info < InsightSeverity::Warning);
        assert!(InsightSeverity::Warning < InsightSeverity::Critical);
    }

    #[test]
    fn new_stamps_id_and_timestamp() {
        let insight = Insight::new(
            InsightType::CostSpike,
            InsightSeverity::Critical,
            "agent-1",
            dec!(42.0),
            "spend is 10x baseline",
        );
        assert_eq!(insight.affected_entity, "agent-1");
        assert_eq!(insight.estimated_saving, dec!(42.0));
    }
}
