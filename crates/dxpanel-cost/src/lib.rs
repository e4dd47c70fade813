//! # dxpanel-cost
//!
//! Cost estimation for diagnostic tests and physician visits.
//!
//! ## Overview
//!
//! [`CostEstimator`] maps a free-text test name to a [`TestCost`] through
//! normalization, exact lookup, keyword families, and a flat fallback. It
//! implements [`CostModel`](dxpanel_core::traits::CostModel), so the
//! orchestrator prices every ordered test through it.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use dxpanel_cost::CostEstimator;
//!
//! let estimator = CostEstimator::with_overrides_file(Path::new("diagnostic_pricing.json"));
//! let cost = estimator.estimate_test_cost("order CBC test");
//! assert_eq!(cost.total_cost(), 25.0);
//! ```
//!
//! [`TestCost`]: dxpanel_contracts::cost::TestCost

pub mod catalog;
pub mod estimator;

pub use catalog::{PriceCatalog, PriceEntry, PHYSICIAN_VISIT_COST};
pub use estimator::{CostEstimator, DEFAULT_HIGH_COST_THRESHOLD};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use dxpanel_contracts::{cost::CostCategory, error::DxError};
    use dxpanel_core::traits::CostModel;

    use crate::{CostEstimator, DEFAULT_HIGH_COST_THRESHOLD, PHYSICIAN_VISIT_COST};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn estimator() -> CostEstimator {
        CostEstimator::new()
    }

    fn total(name: &str) -> f64 {
        estimator().estimate_test_cost(name).total_cost()
    }

    // ── 1. catalog ────────────────────────────────────────────────────────────

    #[test]
    fn test_builtin_catalog_size() {
        assert_eq!(estimator().catalog().len(), 40);
    }

    /// Names that survive normalization resolve to their catalog entry,
    /// case-insensitively.
    #[test]
    fn test_exact_lookup() {
        assert_eq!(total("Cardiac Catheterization"), 6000.0);
        assert_eq!(total("lipid panel"), 40.0);
        let cost = estimator().estimate_test_cost("d-dimer");
        assert_eq!(cost.cpt_codes(), ["85379".to_string()]);
        assert_eq!(cost.test_name(), "d-dimer");
    }

    /// Normalization runs before the catalog lookup, so a catalog name that
    /// normalizes to something else never reaches its own row.
    #[test]
    fn test_lookup_uses_normalized_name_only() {
        let cost = estimator().estimate_test_cost("CT Chest with Contrast");
        assert_eq!(cost.total_cost(), 1500.0);
        assert_eq!(cost.cpt_codes(), ["74150".to_string()]);
        assert_eq!(cost.test_name(), "CT Chest with Contrast");

        assert_eq!(total("Stress Test"), 150.0);
        assert_eq!(total("HIV Test"), 150.0);
    }

    // ── 2. normalization ──────────────────────────────────────────────────────

    /// Noisy and clean spellings of the same test price identically.
    #[test]
    fn test_normalization_is_idempotent() {
        let noisy = estimator().estimate_test_cost("order CBC test");
        let clean = estimator().estimate_test_cost("CBC");
        assert_eq!(noisy.base_cost(), 25.0);
        assert_eq!(clean.base_cost(), 25.0);
        assert_eq!(noisy.cpt_codes(), clean.cpt_codes());
        assert_eq!(noisy.test_name(), "order CBC test", "original name must be kept");
    }

    #[test]
    fn test_normalize_test_name() {
        assert_eq!(CostEstimator::normalize_test_name("  obtain   cbc  lab "), "CBC");
        assert_eq!(CostEstimator::normalize_test_name("get a CXR"), "Chest X-ray");
        assert_eq!(CostEstimator::normalize_test_name("ECG"), "EKG");
        assert_eq!(CostEstimator::normalize_test_name("order Troponin"), "Troponin");
        // Filler words only match whole words.
        assert_eq!(CostEstimator::normalize_test_name("Genetic Testing"), "Genetic Testing");
    }

    #[test]
    fn test_abbreviations_reach_catalog() {
        assert_eq!(total("stat cxr please"), 300.0);
        assert_eq!(total("12-lead ecg"), 100.0);
        assert_eq!(total("bedside echo"), 900.0);
    }

    // ── 3. keyword families ───────────────────────────────────────────────────

    #[test]
    fn test_fuzzy_imaging() {
        let ct = estimator().estimate_test_cost("CT sinus");
        assert_eq!(ct.base_cost(), 800.0);
        assert_eq!(ct.facility_fee(), 400.0);
        assert_eq!(ct.cpt_codes(), ["74150".to_string()]);

        let ct_contrast = estimator().estimate_test_cost("CT neck contrast");
        assert_eq!(ct_contrast.base_cost(), 1000.0);
        assert_eq!(ct_contrast.facility_fee(), 500.0);

        assert_eq!(total("MRI knee"), 2250.0);
        assert_eq!(total("Renal ultrasound"), 600.0);
        assert_eq!(total("Hand x-ray"), 300.0);
    }

    #[test]
    fn test_fuzzy_lab_and_procedure() {
        let lab = estimator().estimate_test_cost("Serum magnesium");
        assert_eq!(lab.total_cost(), 75.0);
        assert_eq!(lab.cpt_codes(), ["80053".to_string()]);

        assert_eq!(total("Skin biopsy of lesion"), 1000.0);
        // Procedure family without a biopsy sub-rule falls through.
        assert_eq!(total("Arterial catheter"), 150.0);
    }

    /// Keywords match anywhere in the name, in both normalization and the
    /// keyword families.
    #[test]
    fn test_keywords_match_substrings() {
        assert_eq!(CostEstimator::normalize_test_name("Electrolytes"), "CT");
        let cost = estimator().estimate_test_cost("Electrolytes");
        assert_eq!(cost.total_cost(), 1200.0);
        assert_eq!(cost.cpt_codes(), ["74150".to_string()]);
        // "puncture" contains "ct", so the imaging family decides first.
        assert_eq!(total("Arterial puncture"), 1200.0);
    }

    /// An imaging family hit with no sub-rule falls through to the fallback.
    #[test]
    fn test_imaging_without_subrule_falls_back() {
        let cost = estimator().estimate_test_cost("PET scan");
        assert_eq!(cost.total_cost(), 150.0);
        assert_eq!(cost.cpt_codes(), ["99999".to_string()]);
    }

    // ── 4. fallback ───────────────────────────────────────────────────────────

    #[test]
    fn test_unknown_test_fallback() {
        let cost = estimator().estimate_test_cost("Xyzzy Quantum Assay");
        assert_eq!(cost.cpt_codes(), ["99999".to_string()]);
        assert_eq!(cost.total_cost(), 150.0);
        assert_eq!(cost.cost_category(), CostCategory::Moderate);
    }

    #[test]
    fn test_empty_name_falls_back() {
        assert_eq!(total(""), 150.0);
        assert_eq!(total("   "), 150.0);
    }

    // ── 5. overrides ──────────────────────────────────────────────────────────

    /// Overrides add and replace entries but never remove built-ins.
    #[test]
    fn test_override_merge_is_additive() {
        let mut est = estimator();
        let merged = est
            .merge_overrides_json(
                r#"{
                    "Procalcitonin": { "base_cost": 110.0, "cpt_codes": ["84145"] },
                    "CBC": { "base_cost": 30.0, "facility_fee": 5.0 }
                }"#,
            )
            .unwrap();

        assert_eq!(merged, 2);
        assert_eq!(est.catalog().len(), 41);
        assert_eq!(est.estimate_test_cost("procalcitonin").total_cost(), 110.0);
        assert_eq!(est.estimate_test_cost("CBC").total_cost(), 35.0);
        assert_eq!(est.estimate_test_cost("CMP").total_cost(), 35.0);
    }

    /// Bad entries are skipped; good siblings still load.
    #[test]
    fn test_override_skips_malformed_entries() {
        let mut est = estimator();
        let merged = est
            .merge_overrides_json(
                r#"{
                    "Good": { "base_cost": 10.0 },
                    "NoBase": { "facility_fee": 10.0 },
                    "Negative": { "base_cost": -5.0 },
                    "WrongType": "cheap"
                }"#,
            )
            .unwrap();
        assert_eq!(merged, 1);
        assert_eq!(est.estimate_test_cost("Good").total_cost(), 10.0);
        assert_eq!(est.estimate_test_cost("Negative").total_cost(), 150.0);
    }

    #[test]
    fn test_override_document_errors() {
        let mut est = estimator();
        assert!(matches!(est.merge_overrides_json("not json"), Err(DxError::PricingData { .. })));
        assert!(matches!(est.merge_overrides_json("[1, 2]"), Err(DxError::PricingData { .. })));
        assert_eq!(est.catalog().len(), 40);
    }

    /// A missing override file leaves the built-in catalog usable.
    #[test]
    fn test_missing_override_file_ignored() {
        let est = CostEstimator::with_overrides_file(std::path::Path::new("/nonexistent/pricing.json"));
        assert_eq!(est.catalog().len(), 40);
        assert_eq!(est.estimate_test_cost("CBC").total_cost(), 25.0);
    }

    // ── 6. alternatives ───────────────────────────────────────────────────────

    #[test]
    fn test_contrast_alternative() {
        let alts = estimator().suggest_cheaper_alternatives("CT Chest with Contrast");
        assert_eq!(alts.len(), 1);
        assert_eq!(alts[0].alternative, "CT Chest");
        // 1500 with contrast against 1200 without, both via the CT family.
        assert_eq!(alts[0].cost_savings, 300.0);
    }

    /// MRI rules are suggested unconditionally; the abdominal one adds
    /// ultrasound.
    #[test]
    fn test_mri_alternatives() {
        let alts = estimator().suggest_cheaper_alternatives("MRI Abdomen");
        let names: Vec<&str> = alts.iter().map(|a| a.alternative.as_str()).collect();
        assert_eq!(names, vec!["CT Abdomen", "Ultrasound Abdomen"]);
        // MRI Abdomen prices via the MRI family at 2250, CT Abdomen via the
        // CT family at 1200.
        assert_eq!(alts[0].cost_savings, 2250.0 - 1200.0);
        assert_eq!(alts[1].cost_savings, 2250.0 - 600.0);
    }

    #[test]
    fn test_specialized_alternative() {
        let alts = estimator().suggest_cheaper_alternatives("Genetic Testing");
        assert_eq!(alts.len(), 1);
        assert_eq!(alts[0].alternative, "Standard laboratory workup");
        assert_eq!(alts[0].cost_savings, 1800.0);
    }

    #[test]
    fn test_no_alternatives_for_cheap_lab() {
        assert!(estimator().suggest_cheaper_alternatives("CBC").is_empty());
    }

    // ── 7. aggregates ─────────────────────────────────────────────────────────

    #[test]
    fn test_calculate_total_cost() {
        let est = estimator();
        let costs = est.estimate_multiple_tests(&["CBC", "Troponin", "Chest X-ray"]);
        let summary = est.calculate_total_cost(&costs, 2);

        assert_eq!(summary.test_costs, 25.0 + 85.0 + 300.0);
        assert_eq!(summary.physician_visits, 600.0);
        assert_eq!(summary.total_cost, 1010.0);
        assert_eq!(summary.cost_breakdown.tests.len(), 3);
        assert_eq!(summary.cost_breakdown.tests[2].category, CostCategory::Moderate);
        assert_eq!(summary.cost_breakdown.visits.cost_per_visit, PHYSICIAN_VISIT_COST);
    }

    #[test]
    fn test_high_cost_threshold_is_strict() {
        let est = estimator();
        assert!(est.is_high_cost_test("MRI Brain", DEFAULT_HIGH_COST_THRESHOLD));
        assert!(!est.is_high_cost_test("CBC", DEFAULT_HIGH_COST_THRESHOLD));
        // Biopsy totals exactly 1000.
        assert!(!est.is_high_cost_test("Biopsy", 1000.0));
    }

    #[test]
    fn test_cost_model_impl() {
        let est = estimator();
        let model: &dyn CostModel = &est;
        assert_eq!(model.estimate("BNP").total_cost(), 150.0);
        assert_eq!(model.physician_visit_cost(), 300.0);
    }
}
