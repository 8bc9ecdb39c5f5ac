//! Curated chemistry misconception library and pattern detector.
//!
//! The rule table is built once at process start and never mutated, so it is
//! safe for unlimited concurrent readers. Detection is deterministic pattern
//! matching over lower-cased text; there is no trained model behind it.

use std::sync::{Arc, OnceLock};

use chrono::Utc;
use regex::Regex;
use tracing::debug;

use crate::types::{Category, DetectedMisconception, Resource, Severity};

const BASE_CONFIDENCE: f64 = 0.5;
const LONG_MATCH_BONUS: f64 = 0.2;
const LONG_TEXT_BONUS: f64 = 0.1;
const REPEAT_MATCH_BONUS: f64 = 0.2;
const LONG_MATCH_SPAN: usize = 10;
const LONG_TEXT_WORDS: usize = 5;

/// Keyword groups for the aggregator's category fallback, checked in this
/// order; the first group with any hit wins.
const KEYWORD_GROUPS: &[(Category, &[&str])] = &[
    (Category::AcidBase, &["naoh", "koh", "acid", "base", "ph"]),
    (
        Category::Stoichiometry,
        &["mole", "stoichiometry", "limiting", "reagent", "mass"],
    ),
    (Category::Bonding, &["bond", "ionic", "covalent", "metallic"]),
    (Category::Thermodynamics, &["thermo", "entropy", "enthalpy"]),
    (
        Category::PeriodicTable,
        &["periodic", "group", "alkali", "noble"],
    ),
];

/// Last-resort mapping from a topic name fragment to a category.
const TOPIC_CATEGORY_MAP: &[(&str, Category)] = &[
    ("acid", Category::AcidBase),
    ("base", Category::AcidBase),
    ("stoich", Category::Stoichiometry),
    ("bond", Category::Bonding),
    ("thermo", Category::Thermodynamics),
    ("periodic", Category::PeriodicTable),
];

#[derive(Debug, Clone)]
pub struct MisconceptionRule {
    pub category: Category,
    pub patterns: Vec<Regex>,
    pub label: String,
    pub severity: Severity,
    pub resources: Vec<Resource>,
}

/// Immutable misconception rule table.
#[derive(Debug, Clone)]
pub struct MisconceptionRules {
    rules: Vec<MisconceptionRule>,
}

static BUILTIN: OnceLock<Arc<MisconceptionRules>> = OnceLock::new();

/// Process-wide built-in rule table, constructed on first use.
pub fn builtin() -> &'static Arc<MisconceptionRules> {
    BUILTIN.get_or_init(|| Arc::new(MisconceptionRules::builtin_table()))
}

impl MisconceptionRules {
    pub fn new(rules: Vec<MisconceptionRule>) -> Self {
        Self { rules }
    }

    pub fn iter(&self) -> impl Iterator<Item = &MisconceptionRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Match free text against every pattern of every rule.
    ///
    /// Each matching pattern yields its own detection, so a rule with several
    /// matching patterns appears several times; the aggregator collapses the
    /// redundancy later. No match yields an empty vec, never an error.
    pub fn detect(&self, text: &str, context: &str) -> Vec<DetectedMisconception> {
        let haystack = format!("{text} {context}").to_lowercase();
        let now = Utc::now();

        let mut detections = Vec::new();
        for rule in &self.rules {
            for pattern in &rule.patterns {
                if let Some(confidence) = match_confidence(&haystack, pattern) {
                    detections.push(DetectedMisconception {
                        category: rule.category,
                        misconception: rule.label.clone(),
                        severity: rule.severity,
                        confidence,
                        timestamp: now,
                    });
                }
            }
        }

        if !detections.is_empty() {
            debug!(count = detections.len(), "misconception patterns matched");
        }
        detections
    }

    /// Rules whose canonical label relates to `text`: either string contains
    /// the other, case-insensitively.
    pub fn matching_label(&self, text: &str) -> Vec<&MisconceptionRule> {
        let needle = text.to_lowercase();
        if needle.trim().is_empty() {
            return Vec::new();
        }
        self.rules
            .iter()
            .filter(|rule| {
                let label = rule.label.to_lowercase();
                label.contains(&needle) || needle.contains(&label)
            })
            .collect()
    }

    pub fn first_in_category(&self, category: Category) -> Option<&MisconceptionRule> {
        self.rules.iter().find(|rule| rule.category == category)
    }

    /// First keyword group with a hit in `text` decides the category.
    pub fn keyword_fallback(&self, text: &str) -> Option<&MisconceptionRule> {
        let haystack = text.to_lowercase();
        KEYWORD_GROUPS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| haystack.contains(k)))
            .and_then(|(category, _)| self.first_in_category(*category))
    }

    /// Direct topic-name-to-category mapping, the aggregator's last resort.
    pub fn topic_fallback(&self, topic: &str) -> Option<&MisconceptionRule> {
        let haystack = topic.to_lowercase();
        TOPIC_CATEGORY_MAP
            .iter()
            .find(|(fragment, _)| haystack.contains(fragment))
            .and_then(|(_, category)| self.first_in_category(*category))
    }

    fn builtin_table() -> Self {
        Self::new(vec![
            rule(
                Category::AcidBase,
                "Confusing strong bases with acids",
                Severity::High,
                &[
                    r"naoh\s*is\s*an\s*acid|naoh.*acid|sodium\s*hydroxide.*acid",
                    r"koh\s*is\s*an\s*acid|potassium\s*hydroxide.*acid",
                    r"ca\(oh\)2\s*is\s*an\s*acid|calcium\s*hydroxide.*acid",
                ],
                &[
                    (
                        "video",
                        "Acids vs Bases Basics",
                        "https://www.youtube.com/watch?v=KZ8qf4m5YwI",
                    ),
                    (
                        "article",
                        "Strong Bases: Why NaOH is Basic",
                        "https://chem.libretexts.org/Bookshelves/General_Chemistry",
                    ),
                    (
                        "interactive",
                        "Acid-Base Classification Game",
                        "https://phet.colorado.edu/sims/html/acid-base-solutions/latest/acid-base-solutions_en.html",
                    ),
                ],
            ),
            rule(
                Category::AcidBase,
                "Misunderstanding pH scale direction",
                Severity::Medium,
                &[
                    r"ph\s*scale.*confusion|ph.*basic.*acidic|ph.*neutral",
                    r"ph\s*below\s*7.*base|ph\s*above\s*7.*acid",
                ],
                &[
                    (
                        "animation",
                        "pH Scale Interactive",
                        "https://phet.colorado.edu/sims/html/ph-scale/latest/ph-scale_en.html",
                    ),
                    (
                        "video",
                        "Understanding pH Scale",
                        "https://www.youtube.com/watch?v=2S6e11NBwiw",
                    ),
                ],
            ),
            rule(
                Category::PeriodicTable,
                "Confusing metal properties and periodic groups",
                Severity::Medium,
                &[
                    r"all\s*metals.*conduct|metals.*always.*conduct",
                    r"noble\s*gases.*reactive|helium.*reactive",
                    r"group\s*1.*alkaline\s*earth|alkali\s*metals.*group\s*2",
                ],
                &[
                    (
                        "interactive",
                        "Periodic Table Explorer",
                        "https://phet.colorado.edu/sims/html/build-an-atom/latest/build-an-atom_en.html",
                    ),
                    (
                        "video",
                        "Understanding Metal Properties",
                        "https://www.youtube.com/watch?v=0RRVV4Diomg",
                    ),
                ],
            ),
            rule(
                Category::Bonding,
                "Confusing different types of chemical bonds",
                Severity::High,
                &[
                    r"ionic\s*bonds.*share|covalent\s*bonds.*transfer",
                    r"single\s*bond.*stronger.*double|double\s*bond.*weaker",
                    r"metallic\s*bonding.*covalent",
                ],
                &[
                    (
                        "animation",
                        "Chemical Bonding Types",
                        "https://phet.colorado.edu/sims/html/molecule-polarity/latest/molecule-polarity_en.html",
                    ),
                    (
                        "video",
                        "Types of Chemical Bonds",
                        "https://www.youtube.com/watch?v=QXT4OVM4vXI",
                    ),
                ],
            ),
            rule(
                Category::Stoichiometry,
                "Confusing moles, mass, and ratios in stoichiometry",
                Severity::High,
                &[
                    r"moles.*mass.*same|molar\s*mass.*moles",
                    r"limiting\s*reagent.*excess|excess.*limiting",
                    r"mole\s*ratio.*mass\s*ratio",
                ],
                &[
                    (
                        "calculator",
                        "Stoichiometry Calculator",
                        "/chemistry-calculator",
                    ),
                    (
                        "video",
                        "Mole Calculations Made Easy",
                        "https://www.youtube.com/watch?v=9T7Ugct6VsY",
                    ),
                ],
            ),
            rule(
                Category::Thermodynamics,
                "Confusing thermodynamic concepts and energy changes",
                Severity::Medium,
                &[
                    r"exothermic.*heat.*absorbed|endothermic.*heat.*released",
                    r"entropy.*disorder.*decrease|entropy.*order.*increase",
                    r"gibbs\s*free\s*energy.*spontaneous.*positive",
                ],
                &[
                    (
                        "simulation",
                        "Thermodynamics Simulator",
                        "https://phet.colorado.edu/sims/html/energy-forms-and-changes/latest/energy-forms-and-changes_en.html",
                    ),
                    (
                        "video",
                        "Understanding Energy Changes",
                        "https://www.youtube.com/watch?v=5Y2X1jRAon0",
                    ),
                ],
            ),
            rule(
                Category::AtomicStructure,
                "Misplacing electrons in the atomic model",
                Severity::High,
                &[
                    r"electrons.*in\s*the\s*nucleus|nucleus.*contains.*electrons",
                    r"electrons.*orbit.*like\s*planets|fixed\s*orbit.*electron",
                    r"mass\s*number.*same.*atomic\s*number",
                ],
                &[
                    (
                        "interactive",
                        "Models of the Hydrogen Atom",
                        "https://phet.colorado.edu/sims/html/models-of-the-hydrogen-atom/latest/models-of-the-hydrogen-atom_en.html",
                    ),
                    (
                        "video",
                        "Electron Shells and Orbitals",
                        "https://www.youtube.com/watch?v=Aoi4j8es4gQ",
                    ),
                ],
            ),
            rule(
                Category::Equilibrium,
                "Treating equilibrium as a stopped reaction",
                Severity::Medium,
                &[
                    r"equilibrium.*reaction.*stops|reaction.*stops.*equilibrium",
                    r"equilibrium.*equal\s*concentrations|equal\s*amounts.*equilibrium",
                    r"catalyst.*shifts.*equilibrium",
                ],
                &[
                    (
                        "simulation",
                        "Reversible Reactions",
                        "https://phet.colorado.edu/sims/html/reversible-reactions/latest/reversible-reactions_en.html",
                    ),
                    (
                        "video",
                        "Dynamic Equilibrium Explained",
                        "https://www.youtube.com/watch?v=dUMmoPdwBy4",
                    ),
                ],
            ),
            rule(
                Category::Solubility,
                "Confusing dissolving with melting and saturation limits",
                Severity::Low,
                &[
                    r"saturated.*dissolve\s*more|more\s*solute.*saturated",
                    r"dissolving.*melting|melting.*dissolving",
                    r"all\s*salts.*soluble|solubility.*always.*increases",
                ],
                &[
                    (
                        "simulation",
                        "Concentration and Saturation",
                        "https://phet.colorado.edu/sims/html/concentration/latest/concentration_en.html",
                    ),
                    (
                        "article",
                        "Dissolution vs Melting",
                        "https://chem.libretexts.org/Bookshelves/Physical_and_Theoretical_Chemistry",
                    ),
                ],
            ),
        ])
    }
}

/// Confidence for one pattern against the combined haystack, or `None` when
/// the pattern does not match. Base 0.5, bonuses for a long matched span,
/// a long input, and repeated matches, capped at 1.0.
fn match_confidence(haystack: &str, pattern: &Regex) -> Option<f64> {
    let first = pattern.find(haystack)?;

    let mut confidence = BASE_CONFIDENCE;
    if first.as_str().len() > LONG_MATCH_SPAN {
        confidence += LONG_MATCH_BONUS;
    }
    if haystack.split_whitespace().count() > LONG_TEXT_WORDS {
        confidence += LONG_TEXT_BONUS;
    }
    if pattern.find_iter(haystack).nth(1).is_some() {
        confidence += REPEAT_MATCH_BONUS;
    }

    Some(confidence.min(1.0))
}

fn rule(
    category: Category,
    label: &str,
    severity: Severity,
    patterns: &[&str],
    resources: &[(&str, &str, &str)],
) -> MisconceptionRule {
    MisconceptionRule {
        category,
        patterns: patterns.iter().map(|p| Regex::new(p).unwrap()).collect(),
        label: label.to_string(),
        severity,
        resources: resources
            .iter()
            .map(|(kind, title, url)| Resource {
                kind: kind.to_string(),
                title: title.to_string(),
                url: url.to_string(),
            })
            .collect(),
    }
}
