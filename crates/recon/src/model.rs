use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedicationSource {
    #[default]
    Home,
    Inpatient,
}

impl MedicationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Inpatient => "inpatient",
        }
    }
}

impl std::fmt::Display for MedicationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One medication entry as reported by a source system.
///
/// Dosing fields are free text. A JSON snapshot may carry numbers there
/// (`"dose": 10`); anything that is neither a string nor a number is dropped
/// rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationRecord {
    pub id: String,
    pub display_name: String,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub dose: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default)]
    pub source: MedicationSource,
}

impl MedicationRecord {
    pub fn new(source: MedicationSource, id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            dose: None,
            unit: None,
            route: None,
            frequency: None,
            source,
        }
    }

    pub fn home(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::new(MedicationSource::Home, id, display_name)
    }

    pub fn inpatient(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self::new(MedicationSource::Inpatient, id, display_name)
    }

    pub fn with_dose(mut self, dose: impl Into<String>, unit: impl Into<String>) -> Self {
        self.dose = Some(dose.into());
        self.unit = Some(unit.into());
        self
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn with_frequency(mut self, frequency: impl Into<String>) -> Self {
        self.frequency = Some(frequency.into());
        self
    }

    /// Dose and unit joined for display, or `""` when no dose is recorded.
    pub fn dose_display(&self) -> String {
        let dose = self.dose.as_deref().map(str::trim).unwrap_or("");
        if dose.is_empty() {
            return String::new();
        }
        let unit = self.unit.as_deref().map(str::trim).unwrap_or("");
        if unit.is_empty() || dose.to_lowercase().ends_with(&unit.to_lowercase()) {
            dose.to_string()
        } else {
            format!("{dose} {unit}")
        }
    }

    pub fn has_structured_dose(&self) -> bool {
        self.dose.as_deref().is_some_and(|d| !d.trim().is_empty())
    }

    pub fn frequency_display(&self) -> String {
        text_or_empty(&self.frequency)
    }

    pub fn route_display(&self) -> String {
        text_or_empty(&self.route)
    }
}

fn text_or_empty(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or("").to_string()
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Active insurance plan. Display only; coverage decisions never read it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsurancePlan {
    pub plan_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formulary_tier_label: Option<String>,
}

/// Pharmacy directory entry, passed through to the caller untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pharmacy {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub delivery_capable: bool,
}

/// Full snapshot for one reconciliation run.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub home: Vec<MedicationRecord>,
    pub inpatient: Vec<MedicationRecord>,
    pub plan: Option<InsurancePlan>,
    pub pharmacies: Vec<Pharmacy>,
}

// ---------------------------------------------------------------------------
// Reconciliation items
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconStatus {
    Continue,
    Discontinue,
    Modify,
    New,
}

impl ReconStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Discontinue => "discontinue",
            Self::Modify => "modify",
            Self::New => "new",
        }
    }
}

impl std::fmt::Display for ReconStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReconStatus {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(Self::Continue),
            "discontinue" => Ok(Self::Discontinue),
            "modify" => Ok(Self::Modify),
            "new" => Ok(Self::New),
            _ => Err(ReconError::InvalidStatus {
                value: s.to_string(),
                reason: "expected one of continue, discontinue, modify, new".into(),
            }),
        }
    }
}

/// One row of the reconciled discharge plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconItem {
    pub id: String,
    pub name: String,
    /// Which list produced the row: home for continue/discontinue, inpatient for new.
    pub origin: MedicationSource,
    /// Normalized key of the originating record.
    pub drug_key: String,
    pub home_dose: String,
    pub discharge_dose: String,
    pub frequency: String,
    pub route: String,
    pub status: ReconStatus,
    pub is_new: bool,
    pub insurance_covered: bool,
    pub prior_auth_required: bool,
    pub tier: u8,
    pub estimated_cost: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_record_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inpatient_record_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Coverage issues + notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueReason {
    NotCovered,
    PriorAuthRequired,
    NotCoveredPriorAuth,
}

impl std::fmt::Display for IssueReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotCovered => write!(f, "not covered"),
            Self::PriorAuthRequired => write!(f, "prior authorization required"),
            Self::NotCoveredPriorAuth => write!(f, "not covered, prior authorization required"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageIssue {
    pub item_id: String,
    pub name: String,
    pub reason: IssueReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_suggestion: Option<String>,
}

/// Conditions the caller must surface alongside the item list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconNotice {
    /// Nothing was ordered for discharge; every home medication is discontinued.
    NoDischargeMedications,
    NoHomeMedications,
    IntravenousExcluded { record_ids: Vec<String> },
}

impl std::fmt::Display for ReconNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDischargeMedications => write!(f, "no discharge medications reconciled"),
            Self::NoHomeMedications => write!(f, "no home medications reported"),
            Self::IntravenousExcluded { record_ids } => write!(
                f,
                "{} intravenous inpatient order(s) excluded from the discharge plan: {}",
                record_ids.len(),
                record_ids.join(", ")
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

/// Stable drug identity an override is keyed by, independent of item ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OverrideKey {
    pub origin: MedicationSource,
    pub drug_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedOverride {
    pub key: OverrideKey,
    pub item_id: String,
    pub status: ReconStatus,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconSummary {
    pub total_items: usize,
    pub continued: usize,
    pub discontinued: usize,
    pub modified: usize,
    pub new: usize,
    pub coverage_issue_count: usize,
    /// Whole dollars over every item that is not discontinued.
    pub total_estimated_cost: u64,
    pub status_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconMeta {
    pub formulary: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub items: Vec<ReconItem>,
    pub coverage_issues: Vec<CoverageIssue>,
    #[serde(default)]
    pub notices: Vec<ReconNotice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<InsurancePlan>,
    #[serde(default)]
    pub pharmacies: Vec<Pharmacy>,
    #[serde(default)]
    pub overrides: Vec<AppliedOverride>,
}

impl ReconResult {
    pub fn item(&self, id: &str) -> Option<&ReconItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn has_notice(&self, notice: &ReconNotice) -> bool {
        self.notices.contains(notice)
    }
}
