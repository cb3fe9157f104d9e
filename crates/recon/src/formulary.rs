use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::normalize::normalize;

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// Coverage policy for one normalized drug key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormularyEntry {
    pub covered: bool,
    #[serde(default = "default_tier")]
    pub tier: u8,
    #[serde(default)]
    pub prior_auth_required: bool,
    #[serde(default = "default_copay")]
    pub copay_estimate: String,
    /// Normalized keys to suggest instead, best first.
    #[serde(default)]
    pub alternatives: Vec<String>,
}

const DEFAULT_TIER: u8 = 2;
const DEFAULT_COPAY: &str = "$15";

fn default_tier() -> u8 {
    DEFAULT_TIER
}

fn default_copay() -> String {
    DEFAULT_COPAY.into()
}

impl FormularyEntry {
    /// Policy applied to any drug the catalog does not list. A missing entry
    /// must never block discharge.
    pub fn default_policy() -> Self {
        Self {
            covered: true,
            tier: DEFAULT_TIER,
            prior_auth_required: false,
            copay_estimate: DEFAULT_COPAY.into(),
            alternatives: Vec::new(),
        }
    }
}

impl Default for FormularyEntry {
    fn default() -> Self {
        Self::default_policy()
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Read-only coverage lookup. Lookup is total: implementations return
/// [`FormularyEntry::default_policy`] on a miss instead of failing.
pub trait FormularySource: Send + Sync {
    fn lookup(&self, key: &str) -> FormularyEntry;

    /// Label recorded in result metadata.
    fn name(&self) -> &str {
        "custom"
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Static in-process formulary keyed by normalized drug name.
///
/// ```toml
/// name = "Commercial PPO 2026"
///
/// [drugs.empagliflozin]
/// covered = false
/// tier = 3
/// prior_auth_required = true
/// copay_estimate = "$85"
/// alternatives = ["metformin"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormularyCatalog {
    #[serde(default = "default_catalog_name")]
    pub name: String,
    #[serde(default)]
    pub drugs: BTreeMap<String, FormularyEntry>,
}

fn default_catalog_name() -> String {
    "unnamed formulary".into()
}

// (key, covered, tier, prior auth, copay, alternatives)
type BuiltinRow = (&'static str, bool, u8, bool, &'static str, &'static [&'static str]);

const BUILTIN: &[BuiltinRow] = &[
    ("amlodipine", true, 1, false, "$5", &[]),
    ("apixaban", true, 3, false, "$47", &["warfarin"]),
    ("atorvastatin", true, 1, false, "$10", &[]),
    ("empagliflozin", false, 3, true, "$85", &["metformin"]),
    ("entresto", true, 3, true, "$60", &["lisinopril"]),
    ("furosemide", true, 1, false, "$6", &[]),
    ("insulin", true, 2, false, "$35", &[]),
    ("lisinopril", true, 1, false, "$5", &[]),
    ("metformin", true, 1, false, "$4", &[]),
    ("metoprolol", true, 1, false, "$7", &[]),
    ("omeprazole", true, 1, false, "$8", &[]),
    ("rivaroxaban", false, 3, true, "$95", &["apixaban", "warfarin"]),
    ("semaglutide", false, 4, true, "$150", &["metformin"]),
    ("warfarin", true, 1, false, "$4", &[]),
];

impl FormularyCatalog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            drugs: BTreeMap::new(),
        }
    }

    /// Demonstration catalog used when a run config names no formulary file.
    pub fn builtin() -> Self {
        let mut catalog = Self::new("built-in demonstration formulary");
        for &(key, covered, tier, prior_auth_required, copay, alternatives) in BUILTIN {
            catalog.insert(
                key,
                FormularyEntry {
                    covered,
                    tier,
                    prior_auth_required,
                    copay_estimate: copay.into(),
                    alternatives: alternatives.iter().map(|a| a.to_string()).collect(),
                },
            );
        }
        catalog
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: FormularyEntry) {
        self.drugs.insert(key.into(), entry);
    }

    pub fn get(&self, key: &str) -> Option<&FormularyEntry> {
        self.drugs.get(key)
    }

    pub fn len(&self) -> usize {
        self.drugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drugs.is_empty()
    }

    /// Exact-key lookup with the default policy on a miss.
    pub fn lookup(&self, key: &str) -> FormularyEntry {
        match self.drugs.get(key) {
            Some(entry) => entry.clone(),
            None => {
                log::debug!("formulary '{}': no entry for '{key}', applying default policy", self.name);
                FormularyEntry::default_policy()
            }
        }
    }

    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let catalog: FormularyCatalog =
            toml::from_str(input).map_err(|e| ReconError::CatalogParse(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        for (key, entry) in &self.drugs {
            // Keys must already be in normalized form or lookups can never hit them
            if key.is_empty() || normalize(key) != *key {
                return Err(ReconError::CatalogValidation {
                    key: key.clone(),
                    reason: "key must be a single lower-case token".into(),
                });
            }
            if entry.tier == 0 {
                return Err(ReconError::CatalogValidation {
                    key: key.clone(),
                    reason: "tier must be 1 or greater".into(),
                });
            }
            if let Some(alt) = entry.alternatives.iter().find(|a| a.trim().is_empty()) {
                return Err(ReconError::CatalogValidation {
                    key: key.clone(),
                    reason: format!("alternative '{alt}' is blank"),
                });
            }
        }
        Ok(())
    }
}

impl FormularySource for FormularyCatalog {
    fn lookup(&self, key: &str) -> FormularyEntry {
        FormularyCatalog::lookup(self, key)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
