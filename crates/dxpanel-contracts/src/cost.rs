//! Cost types produced by the cost estimator.
//!
//! `TestCost` is the only record whose arithmetic is an invariant rather than
//! a convention: `total_cost` is always the sum of the three fees and
//! `cost_category` is always derived from `total_cost`. Both are computed in
//! the single constructor and the fields are private, so neither can drift.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse price band of a test, derived purely from its total cost.
///
/// Boundaries: `< 100` low, `< 500` moderate, `< 2000` high, otherwise
/// very high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostCategory {
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl CostCategory {
    /// Classify a dollar total.
    pub fn from_total(total: f64) -> Self {
        if total < 100.0 {
            CostCategory::Low
        } else if total < 500.0 {
            CostCategory::Moderate
        } else if total < 2000.0 {
            CostCategory::High
        } else {
            CostCategory::VeryHigh
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CostCategory::Low => "low",
            CostCategory::Moderate => "moderate",
            CostCategory::High => "high",
            CostCategory::VeryHigh => "very_high",
        }
    }
}

impl fmt::Display for CostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The priced result of estimating one test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TestCostParts")]
pub struct TestCost {
    test_name: String,
    cpt_codes: Vec<String>,
    base_cost: f64,
    facility_fee: f64,
    professional_fee: f64,
    total_cost: f64,
    cost_category: CostCategory,
}

/// Wire form accepted on deserialization. Any `total_cost` or
/// `cost_category` present in the input is ignored and recomputed.
#[derive(Deserialize)]
struct TestCostParts {
    test_name: String,
    #[serde(default)]
    cpt_codes: Vec<String>,
    #[serde(default)]
    base_cost: f64,
    #[serde(default)]
    facility_fee: f64,
    #[serde(default)]
    professional_fee: f64,
}

impl From<TestCostParts> for TestCost {
    fn from(p: TestCostParts) -> Self {
        TestCost::new(p.test_name, p.cpt_codes, p.base_cost, p.facility_fee, p.professional_fee)
    }
}

impl TestCost {
    /// Build a cost record, computing the total and its category.
    pub fn new(
        test_name: impl Into<String>,
        cpt_codes: Vec<String>,
        base_cost: f64,
        facility_fee: f64,
        professional_fee: f64,
    ) -> Self {
        let total_cost = base_cost + facility_fee + professional_fee;
        Self {
            test_name: test_name.into(),
            cpt_codes,
            base_cost,
            facility_fee,
            professional_fee,
            total_cost,
            cost_category: CostCategory::from_total(total_cost),
        }
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn cpt_codes(&self) -> &[String] {
        &self.cpt_codes
    }

    pub fn base_cost(&self) -> f64 {
        self.base_cost
    }

    pub fn facility_fee(&self) -> f64 {
        self.facility_fee
    }

    pub fn professional_fee(&self) -> f64 {
        self.professional_fee
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    pub fn cost_category(&self) -> CostCategory {
        self.cost_category
    }
}

/// A cheaper substitute for an expensive test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostAlternative {
    pub alternative: String,
    /// Original total minus the alternative's total. May be zero or negative
    /// for rules that are suggested unconditionally.
    pub cost_savings: f64,
    pub rationale: String,
}

/// One line of a cost breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestLine {
    pub name: String,
    pub cost: f64,
    pub category: CostCategory,
}

/// Physician visit portion of a cost breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitLine {
    pub count: u32,
    pub cost_per_visit: f64,
    pub total_visit_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub tests: Vec<TestLine>,
    pub visits: VisitLine,
}

/// Aggregate cost of a set of tests plus physician visits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    /// Sum of the test totals.
    pub test_costs: f64,
    /// Sum of the visit charges.
    pub physician_visits: f64,
    pub total_cost: f64,
    pub cost_breakdown: CostBreakdown,
}
