//! Sample clinical vignettes.
//!
//! All cases are fictional. Each carries the script the offline reasoning
//! service follows for it: a differential whose leader firms up as findings
//! arrive, the history questions the panel asks first, and the tests it
//! orders next.

/// One differential entry: condition, and probability at each stage
/// (initial, after history, after tests).
pub struct ScriptedHypothesis {
    pub condition: &'static str,
    pub probabilities: [f64; 3],
    pub reasoning: &'static str,
}

pub struct SampleCase {
    pub id: &'static str,
    pub title: &'static str,
    pub case_info: &'static str,
    pub differential: &'static [ScriptedHypothesis],
    pub questions: &'static [&'static str],
    pub tests: &'static [&'static str],
    pub challenge: &'static str,
}

pub static SAMPLE_CASES: [SampleCase; 3] = [
    SampleCase {
        id: "case_001",
        title: "Chest Pain in Emergency Department",
        case_info: "A 45-year-old male presents to the emergency department with acute onset chest pain that \
                    started 2 hours ago. The pain is described as crushing, substernal, and radiates to the \
                    left arm. He has a history of hypertension and smoking. Vital signs show BP 150/90, HR 110, \
                    RR 20, O2 sat 96% on room air.",
        differential: &[
            ScriptedHypothesis {
                condition: "Acute coronary syndrome",
                probabilities: [0.55, 0.7, 0.9],
                reasoning: "Crushing substernal pain radiating to the left arm in a hypertensive smoker",
            },
            ScriptedHypothesis {
                condition: "Aortic dissection",
                probabilities: [0.2, 0.15, 0.05],
                reasoning: "Hypertension and severe pain; no tearing quality or pulse deficit reported",
            },
            ScriptedHypothesis {
                condition: "Pulmonary embolism",
                probabilities: [0.15, 0.1, 0.03],
                reasoning: "Tachycardia, but oxygenation is preserved and there are no risk factors",
            },
        ],
        questions: &[
            "Does the pain change with position, breathing, or exertion?",
            "Is there a personal or family history of coronary disease?",
        ],
        tests: &["EKG", "Troponin", "Chest X-ray"],
        challenge: "Are we anchoring on a cardiac cause? Dissection must be excluded before anticoagulation.",
    },
    SampleCase {
        id: "case_002",
        title: "Fever and Altered Mental Status",
        case_info: "A 72-year-old woman is brought to the hospital by her daughter for confusion and fever over \
                    the past 3 days. She has been increasingly disoriented and has difficulty recognizing family \
                    members. Temperature is 38.8°C (101.8°F), BP 100/60, HR 105. She has a history of diabetes \
                    and recent UTI treatment.",
        differential: &[
            ScriptedHypothesis {
                condition: "Urosepsis with septic encephalopathy",
                probabilities: [0.45, 0.6, 0.88],
                reasoning: "Fever, hypotension and tachycardia after a recent urinary tract infection",
            },
            ScriptedHypothesis {
                condition: "Bacterial meningitis",
                probabilities: [0.25, 0.2, 0.05],
                reasoning: "Fever with altered mental status in an older adult",
            },
            ScriptedHypothesis {
                condition: "Hyperosmolar hyperglycemic state",
                probabilities: [0.15, 0.1, 0.04],
                reasoning: "Diabetic with confusion; infection is a common trigger",
            },
        ],
        questions: &[
            "Has she had neck stiffness, headache, or a rash?",
            "Which antibiotic was used for the recent UTI, and did she finish the course?",
        ],
        tests: &["Blood Culture", "Urinalysis", "CMP"],
        challenge: "Meningitis cannot be excluded on history alone; consider a lumbar puncture if the urine is clean.",
    },
    SampleCase {
        id: "case_003",
        title: "Shortness of Breath in Young Adult",
        case_info: "A 28-year-old female presents with acute onset shortness of breath and pleuritic chest pain \
                    that began suddenly while watching TV. She recently returned from a 10-hour flight from \
                    Europe 3 days ago. She is on oral contraceptives. Vital signs: BP 110/70, HR 120, RR 24, \
                    O2 sat 91% on room air.",
        differential: &[
            ScriptedHypothesis {
                condition: "Pulmonary embolism",
                probabilities: [0.6, 0.75, 0.92],
                reasoning: "Sudden dyspnea and hypoxia after a long flight while on oral contraceptives",
            },
            ScriptedHypothesis {
                condition: "Spontaneous pneumothorax",
                probabilities: [0.2, 0.12, 0.04],
                reasoning: "Sudden pleuritic pain in a young adult",
            },
            ScriptedHypothesis {
                condition: "Community-acquired pneumonia",
                probabilities: [0.1, 0.08, 0.02],
                reasoning: "Hypoxia and tachypnea, but no fever or cough reported",
            },
        ],
        questions: &[
            "Is there calf pain or unilateral leg swelling?",
            "Any history of clotting disorders or previous thrombosis?",
        ],
        tests: &["D-Dimer", "CT Chest with Contrast", "EKG"],
        challenge: "A negative D-dimer would not be reassuring with this pretest probability; go straight to imaging.",
    },
];

/// Look up a sample case by id.
pub fn find_case(id: &str) -> Option<&'static SampleCase> {
    SAMPLE_CASES.iter().find(|c| c.id == id)
}
