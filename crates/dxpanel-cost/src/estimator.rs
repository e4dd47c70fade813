//! Test cost estimation.
//!
//! `CostEstimator::estimate_test_cost` never fails. Resolution order, first
//! match wins:
//!
//! 1. Normalization: filler words (`order`, `obtain`, `get`, `test`, `lab`,
//!    `study`) are stripped and whitespace collapsed, then the first
//!    abbreviation in a priority-ordered table that occurs anywhere in the
//!    name replaces the whole name.
//! 2. Exact (case-insensitive) catalog lookup of the normalized name.
//! 3. Keyword families on the lower-cased original name: imaging, then lab,
//!    then procedure. A family that matches but has no sub-rule for the name
//!    falls through.
//! 4. Flat fallback: base cost 150, CPT `99999`.
//!
//! Both normalization and keyword families match by substring, so
//! "Electrolytes" normalizes to `CT` and prices as a CT scan. Catalog rows
//! whose names normalize to something else (`Stress Test` becomes `Stress`)
//! are only reachable through overrides under a reachable name.
//!
//! The returned `TestCost` always carries the caller's original name.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use dxpanel_contracts::{
    cost::{CostAlternative, CostBreakdown, CostSummary, TestCost, TestLine, VisitLine},
    error::{DxError, DxResult},
};
use dxpanel_core::traits::CostModel;

use crate::catalog::{PriceCatalog, PriceEntry, FALLBACK_BASE_COST, FALLBACK_CPT, PHYSICIAN_VISIT_COST};

/// Totals strictly above this are "high cost" by default.
pub const DEFAULT_HIGH_COST_THRESHOLD: f64 = 1000.0;

/// Flat price of the "Standard laboratory workup" alternative.
const STANDARD_WORKUP_COST: f64 = 200.0;

static FILLER_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(order|obtain|get|test|lab|study)\b").expect("filler word pattern is valid")
});

static CONTRAST_PHRASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(with\s+)?contrast").expect("contrast pattern is valid"));

static MRI_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)mri").expect("MRI pattern is valid"));

/// Abbreviation table, in priority order. The key is matched as a
/// case-insensitive substring; the value replaces the whole name.
const ABBREVIATIONS: [(&str, &str); 10] = [
    ("cbc", "CBC"),
    ("cmp", "CMP"),
    ("bmp", "BMP"),
    ("cxr", "Chest X-ray"),
    ("ct", "CT"),
    ("mri", "MRI"),
    ("us", "Ultrasound"),
    ("echo", "Echocardiogram"),
    ("ekg", "EKG"),
    ("ecg", "EKG"),
];

const IMAGING_KEYWORDS: [&str; 6] = ["ct", "mri", "ultrasound", "x-ray", "scan", "imaging"];
const LAB_KEYWORDS: [&str; 6] = ["blood", "serum", "plasma", "urine", "culture", "panel"];
const PROCEDURE_KEYWORDS: [&str; 4] = ["biopsy", "endoscopy", "puncture", "catheter"];

/// Lower-cased name for substring keyword matching.
struct Keywords {
    lower: String,
}

impl Keywords {
    fn new(name: &str) -> Self {
        Self { lower: name.to_lowercase() }
    }

    fn has(&self, keyword: &str) -> bool {
        self.lower.contains(keyword)
    }

    fn has_any(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.has(k))
    }
}

/// Prices diagnostic tests from a catalog with fuzzy fallbacks.
#[derive(Debug, Clone)]
pub struct CostEstimator {
    catalog: PriceCatalog,
}

impl Default for CostEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl CostEstimator {
    /// An estimator over the built-in catalog.
    pub fn new() -> Self {
        Self { catalog: PriceCatalog::builtin() }
    }

    /// An estimator over the built-in catalog merged with the override file
    /// at `path`.
    ///
    /// A missing or malformed file is logged at `warn` and ignored; the
    /// built-in catalog is always available.
    pub fn with_overrides_file(path: &Path) -> Self {
        let mut estimator = Self::new();
        let loaded = std::fs::read_to_string(path)
            .map_err(|e| DxError::PricingData {
                reason: format!("failed to read pricing file '{}': {}", path.display(), e),
            })
            .and_then(|contents| estimator.merge_overrides_json(&contents));

        match loaded {
            Ok(count) => info!(path = %path.display(), entries = count, "pricing overrides loaded"),
            Err(e) => warn!(path = %path.display(), error = %e, "pricing overrides ignored"),
        }
        estimator
    }

    /// Merge a JSON object of `name → PriceEntry` into the catalog.
    ///
    /// Entries add to or replace built-ins; nothing is removed. Individual
    /// malformed entries are skipped with a warning while valid siblings
    /// load. Returns the number of entries merged, or `PricingData` if the
    /// document is not a JSON object at all.
    pub fn merge_overrides_json(&mut self, json: &str) -> DxResult<usize> {
        let document: serde_json::Value = serde_json::from_str(json).map_err(|e| DxError::PricingData {
            reason: format!("pricing overrides are not valid JSON: {}", e),
        })?;
        let serde_json::Value::Object(entries) = document else {
            return Err(DxError::PricingData {
                reason: "pricing overrides must be a JSON object keyed by test name".to_string(),
            });
        };

        let mut merged = 0;
        for (name, raw) in entries {
            match serde_json::from_value::<PriceEntry>(raw) {
                Ok(price) if price.is_valid() && !name.trim().is_empty() => {
                    self.catalog.upsert(&name, price);
                    merged += 1;
                }
                Ok(_) => warn!(test = %name, "pricing override has invalid amounts; skipped"),
                Err(e) => warn!(test = %name, error = %e, "malformed pricing override skipped"),
            }
        }
        Ok(merged)
    }

    pub fn catalog(&self) -> &PriceCatalog {
        &self.catalog
    }

    /// Strip filler words, collapse whitespace, and expand the first
    /// matching abbreviation.
    pub fn normalize_test_name(test_name: &str) -> String {
        let stripped = FILLER_WORDS.replace_all(test_name, " ");
        let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
        let lower = collapsed.to_lowercase();

        ABBREVIATIONS
            .iter()
            .find(|(key, _)| lower.contains(key))
            .map(|(_, full)| full.to_string())
            .unwrap_or(collapsed)
    }

    /// Price one test. Never fails.
    pub fn estimate_test_cost(&self, test_name: &str) -> TestCost {
        let normalized = Self::normalize_test_name(test_name);
        if let Some(entry) = self.catalog.get(&normalized) {
            debug!(test = %test_name, normalized = %normalized, "priced via normalized name");
            return build(test_name, &entry.price);
        }

        if let Some(price) = fuzzy_price(test_name) {
            debug!(test = %test_name, "priced via keyword family");
            return build(test_name, &price);
        }

        debug!(test = %test_name, "no price match; using fallback");
        TestCost::new(test_name, vec![FALLBACK_CPT.to_string()], FALLBACK_BASE_COST, 0.0, 0.0)
    }

    /// Price several tests, preserving order.
    pub fn estimate_multiple_tests<S: AsRef<str>>(&self, test_names: &[S]) -> Vec<TestCost> {
        test_names.iter().map(|n| self.estimate_test_cost(n.as_ref())).collect()
    }

    /// True when the test's total is strictly above `threshold`.
    pub fn is_high_cost_test(&self, test_name: &str, threshold: f64) -> bool {
        self.estimate_test_cost(test_name).total_cost() > threshold
    }

    /// Total a set of priced tests plus `physician_visits` visits.
    pub fn calculate_total_cost(&self, test_costs: &[TestCost], physician_visits: u32) -> CostSummary {
        let tests: Vec<TestLine> = test_costs
            .iter()
            .map(|c| TestLine {
                name: c.test_name().to_string(),
                cost: c.total_cost(),
                category: c.cost_category(),
            })
            .collect();
        let test_total: f64 = tests.iter().map(|t| t.cost).sum();
        let visit_total = f64::from(physician_visits) * PHYSICIAN_VISIT_COST;

        CostSummary {
            test_costs: test_total,
            physician_visits: visit_total,
            total_cost: test_total + visit_total,
            cost_breakdown: CostBreakdown {
                tests,
                visits: VisitLine {
                    count: physician_visits,
                    cost_per_visit: PHYSICIAN_VISIT_COST,
                    total_visit_cost: visit_total,
                },
            },
        }
    }

    /// Suggest cheaper substitutes for `test_name`.
    ///
    /// | Trigger              | Alternative                 | Kept when   |
    /// |----------------------|-----------------------------|-------------|
    /// | CT with contrast     | same study without contrast | savings > 0 |
    /// | MRI                  | same study as CT            | always      |
    /// | MRI of the abdomen   | Ultrasound Abdomen          | always      |
    /// | genetic / molecular / specialized | Standard laboratory workup | always |
    pub fn suggest_cheaper_alternatives(&self, test_name: &str) -> Vec<CostAlternative> {
        let keywords = Keywords::new(test_name);
        let original = self.estimate_test_cost(test_name).total_cost();
        let mut alternatives = Vec::new();

        if keywords.has("ct") && keywords.has("contrast") {
            let plain = CONTRAST_PHRASE.replace_all(test_name, " ");
            let plain = plain.split_whitespace().collect::<Vec<_>>().join(" ");
            let savings = original - self.estimate_test_cost(&plain).total_cost();
            if savings > 0.0 {
                alternatives.push(CostAlternative {
                    alternative: plain,
                    cost_savings: savings,
                    rationale: "Consider non-contrast CT first if contrast not essential".to_string(),
                });
            }
        }

        if keywords.has("mri") {
            let ct = MRI_WORD.replace_all(test_name, "CT").into_owned();
            let savings = original - self.estimate_test_cost(&ct).total_cost();
            alternatives.push(CostAlternative {
                alternative: ct,
                cost_savings: savings,
                rationale: "CT may provide adequate information at lower cost".to_string(),
            });

            if keywords.has("abdomen") {
                let savings = original - self.estimate_test_cost("Ultrasound Abdomen").total_cost();
                alternatives.push(CostAlternative {
                    alternative: "Ultrasound Abdomen".to_string(),
                    cost_savings: savings,
                    rationale: "Ultrasound may be sufficient for initial evaluation".to_string(),
                });
            }
        }

        if keywords.has_any(&["genetic", "molecular", "specialized"]) {
            alternatives.push(CostAlternative {
                alternative: "Standard laboratory workup".to_string(),
                cost_savings: original - STANDARD_WORKUP_COST,
                rationale: "Consider standard tests before specialized assays".to_string(),
            });
        }

        alternatives
    }
}

fn build(test_name: &str, price: &PriceEntry) -> TestCost {
    TestCost::new(
        test_name,
        price.cpt_codes.clone(),
        price.base_cost,
        price.facility_fee,
        price.professional_fee,
    )
}

/// Keyword-family pricing for names the catalog does not know.
fn fuzzy_price(test_name: &str) -> Option<PriceEntry> {
    let k = Keywords::new(test_name);

    if k.has_any(&IMAGING_KEYWORDS) {
        return if k.has("ct") {
            let base = if k.has("contrast") { 1000.0 } else { 800.0 };
            Some(price(base, base * 0.5, 0.0, "74150"))
        } else if k.has("mri") {
            Some(price(1500.0, 750.0, 0.0, "70551"))
        } else if k.has("ultrasound") || k.has("us") {
            Some(price(400.0, 200.0, 0.0, "76700"))
        } else if k.has("x-ray") || k.has("xray") {
            Some(price(200.0, 100.0, 0.0, "71045"))
        } else {
            None
        };
    }

    if k.has_any(&LAB_KEYWORDS) {
        return Some(price(75.0, 0.0, 0.0, "80053"));
    }

    if k.has_any(&PROCEDURE_KEYWORDS) {
        return k.has("biopsy").then(|| price(500.0, 300.0, 200.0, "88305"));
    }

    None
}

fn price(base_cost: f64, facility_fee: f64, professional_fee: f64, cpt: &str) -> PriceEntry {
    PriceEntry {
        base_cost,
        facility_fee,
        professional_fee,
        cpt_codes: vec![cpt.to_string()],
    }
}

impl CostModel for CostEstimator {
    fn estimate(&self, test_name: &str) -> TestCost {
        self.estimate_test_cost(test_name)
    }

    fn physician_visit_cost(&self) -> f64 {
        PHYSICIAN_VISIT_COST
    }
}
