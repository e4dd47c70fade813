//! Price catalog types and the built-in price table.
//!
//! The table is keyed by canonical test name. Lookups are case-insensitive;
//! the canonical spelling is only used for display.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Flat charge for one physician visit.
pub const PHYSICIAN_VISIT_COST: f64 = 300.0;

/// CPT code assigned to tests nothing else matched.
pub const FALLBACK_CPT: &str = "99999";

/// Base cost assigned to tests nothing else matched.
pub const FALLBACK_BASE_COST: f64 = 150.0;

/// One catalog row.
///
/// This is also the schema of a pricing override file, which maps test
/// names to entries:
///
/// ```json
/// {
///   "Procalcitonin": { "base_cost": 110.0, "cpt_codes": ["84145"] },
///   "CBC": { "base_cost": 30.0 }
/// }
/// ```
///
/// `base_cost` is required; fees default to 0 and CPT codes to empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub base_cost: f64,
    #[serde(default)]
    pub facility_fee: f64,
    #[serde(default)]
    pub professional_fee: f64,
    #[serde(default)]
    pub cpt_codes: Vec<String>,
}

impl PriceEntry {
    fn new(base_cost: f64, facility_fee: f64, professional_fee: f64, cpt: &str) -> Self {
        Self {
            base_cost,
            facility_fee,
            professional_fee,
            cpt_codes: vec![cpt.to_string()],
        }
    }

    /// True when every amount is a finite, non-negative number.
    pub fn is_valid(&self) -> bool {
        [self.base_cost, self.facility_fee, self.professional_fee]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// A catalog row together with its canonical name.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub price: PriceEntry,
}

/// Name-indexed price table with case-insensitive lookup.
#[derive(Debug, Clone, Default)]
pub struct PriceCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl PriceCatalog {
    /// The built-in table: labs, imaging, procedures, cardiac studies, and
    /// specialized labs.
    pub fn builtin() -> Self {
        let rows: [(&str, PriceEntry); 40] = [
            // Labs
            ("CBC", PriceEntry::new(25.0, 0.0, 0.0, "85025")),
            ("CMP", PriceEntry::new(35.0, 0.0, 0.0, "80053")),
            ("BMP", PriceEntry::new(30.0, 0.0, 0.0, "80048")),
            ("Lipid Panel", PriceEntry::new(40.0, 0.0, 0.0, "80061")),
            ("TSH", PriceEntry::new(60.0, 0.0, 0.0, "84443")),
            ("HbA1c", PriceEntry::new(45.0, 0.0, 0.0, "83036")),
            ("PT/INR", PriceEntry::new(35.0, 0.0, 0.0, "85610")),
            ("PTT", PriceEntry::new(30.0, 0.0, 0.0, "85730")),
            ("Urinalysis", PriceEntry::new(25.0, 0.0, 0.0, "81001")),
            ("Blood Culture", PriceEntry::new(75.0, 0.0, 0.0, "87040")),
            ("Troponin", PriceEntry::new(85.0, 0.0, 0.0, "84484")),
            ("BNP", PriceEntry::new(150.0, 0.0, 0.0, "83880")),
            ("D-Dimer", PriceEntry::new(95.0, 0.0, 0.0, "85379")),
            ("ESR", PriceEntry::new(25.0, 0.0, 0.0, "85652")),
            ("CRP", PriceEntry::new(35.0, 0.0, 0.0, "86140")),
            // Imaging
            ("Chest X-ray", PriceEntry::new(200.0, 100.0, 0.0, "71045")),
            ("CT Chest", PriceEntry::new(800.0, 400.0, 0.0, "71250")),
            ("CT Chest with Contrast", PriceEntry::new(1200.0, 600.0, 0.0, "71260")),
            ("CT Abdomen", PriceEntry::new(900.0, 450.0, 0.0, "74150")),
            ("CT Abdomen/Pelvis", PriceEntry::new(1100.0, 550.0, 0.0, "74177")),
            ("CT Head", PriceEntry::new(700.0, 350.0, 0.0, "70450")),
            ("MRI Brain", PriceEntry::new(1500.0, 750.0, 0.0, "70551")),
            ("MRI Spine", PriceEntry::new(1600.0, 800.0, 0.0, "72148")),
            ("Ultrasound Abdomen", PriceEntry::new(400.0, 200.0, 0.0, "76700")),
            ("Echocardiogram", PriceEntry::new(600.0, 300.0, 0.0, "93306")),
            ("EKG", PriceEntry::new(75.0, 25.0, 0.0, "93000")),
            // Procedures
            ("Colonoscopy", PriceEntry::new(1200.0, 800.0, 400.0, "45378")),
            ("Upper Endoscopy", PriceEntry::new(900.0, 600.0, 300.0, "43235")),
            ("Biopsy", PriceEntry::new(500.0, 300.0, 200.0, "88305")),
            ("Bone Marrow Biopsy", PriceEntry::new(1500.0, 1000.0, 500.0, "38221")),
            ("Lumbar Puncture", PriceEntry::new(800.0, 400.0, 400.0, "62270")),
            ("Bronchoscopy", PriceEntry::new(1800.0, 1200.0, 600.0, "31622")),
            // Cardiac
            ("Stress Test", PriceEntry::new(800.0, 400.0, 200.0, "93017")),
            ("Cardiac Catheterization", PriceEntry::new(3000.0, 2000.0, 1000.0, "93458")),
            ("Holter Monitor", PriceEntry::new(300.0, 150.0, 0.0, "93224")),
            // Specialized labs
            ("Tumor Markers", PriceEntry::new(200.0, 0.0, 0.0, "86304")),
            ("Hepatitis Panel", PriceEntry::new(150.0, 0.0, 0.0, "80074")),
            ("HIV Test", PriceEntry::new(75.0, 0.0, 0.0, "86703")),
            ("Autoimmune Panel", PriceEntry::new(400.0, 0.0, 0.0, "86235")),
            ("Genetic Testing", PriceEntry::new(2000.0, 0.0, 0.0, "81479")),
        ];

        let mut catalog = Self::default();
        for (name, price) in rows {
            catalog.upsert(name, price);
        }
        catalog
    }

    fn key(name: &str) -> String {
        name.trim().to_lowercase()
    }

    /// Add or replace one entry.
    pub fn upsert(&mut self, name: &str, price: PriceEntry) {
        let entry = CatalogEntry { name: name.trim().to_string(), price };
        self.entries.insert(Self::key(name), entry);
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(&Self::key(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
