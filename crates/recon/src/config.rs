use std::path::Path;

use serde::Deserialize;

use crate::error::ReconError;
use crate::model::{InsurancePlan, Pharmacy};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// A `*.discharge.toml` run config. File paths are relative to the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct DischargeConfig {
    pub name: String,
    pub home: SnapshotSource,
    pub inpatient: SnapshotSource,
    #[serde(default)]
    pub formulary: FormularyRef,
    #[serde(default)]
    pub plan: Option<InsurancePlan>,
    #[serde(default)]
    pub pharmacies: Vec<Pharmacy>,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Snapshot sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotSource {
    pub file: String,
    /// Inferred from the file extension when omitted.
    #[serde(default)]
    pub format: Option<SnapshotFormat>,
    #[serde(default)]
    pub columns: ColumnMapping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotFormat {
    Csv,
    Json,
}

impl std::fmt::Display for SnapshotFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl SnapshotSource {
    pub fn resolve_format(&self) -> Result<SnapshotFormat, ReconError> {
        if let Some(format) = self.format {
            return Ok(format);
        }
        let ext = Path::new(&self.file)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(SnapshotFormat::Csv),
            Some("json") => Ok(SnapshotFormat::Json),
            _ => Err(ReconError::ConfigValidation(format!(
                "cannot infer format of '{}'; set format = \"csv\" or \"json\"",
                self.file
            ))),
        }
    }
}

/// CSV header names for each record field. Only `id` and `display_name`
/// must be present in the file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub id: String,
    pub display_name: String,
    pub dose: String,
    pub unit: String,
    pub route: String,
    pub frequency: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            id: "id".into(),
            display_name: "display_name".into(),
            dose: "dose".into(),
            unit: "unit".into(),
            route: "route".into(),
            frequency: "frequency".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Formulary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormularyRef {
    /// Catalog TOML; the built-in catalog is used when omitted.
    #[serde(default)]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default)]
    pub dispense_csv: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl DischargeConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: DischargeConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("name must not be empty".into()));
        }

        for (label, source) in [("home", &self.home), ("inpatient", &self.inpatient)] {
            if source.file.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "{label}: file must not be empty"
                )));
            }
            source.resolve_format()?;
            if source.columns.id.is_empty() || source.columns.display_name.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "{label}: id and display_name columns must be named"
                )));
            }
        }

        if let Some(ref file) = self.formulary.file {
            if file.trim().is_empty() {
                return Err(ReconError::ConfigValidation(
                    "formulary.file must not be empty when set".into(),
                ));
            }
        }

        if let Some(ref plan) = self.plan {
            if plan.plan_name.trim().is_empty() {
                return Err(ReconError::ConfigValidation("plan.plan_name must not be empty".into()));
            }
        }

        for (idx, pharmacy) in self.pharmacies.iter().enumerate() {
            if pharmacy.name.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "pharmacies[{idx}]: name must not be empty"
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name = "Ward 4B discharge"

[home]
file = "home.csv"

[home.columns]
id = "med_id"
display_name = "medication"

[inpatient]
file = "orders.json"

[formulary]
file = "ppo.formulary.toml"

[plan]
plan_name = "Acme PPO"
payer = "Acme Health"
formulary_tier_label = "3-tier"

[[pharmacies]]
name = "Main St Pharmacy"
address = "12 Main St"
phone = "555-0100"
delivery_capable = true

[output]
json = "result.json"
dispense_csv = "dispense.csv"
"#;

    #[test]
    fn parse_valid() {
        let config = DischargeConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "Ward 4B discharge");
        assert_eq!(config.home.resolve_format().unwrap(), SnapshotFormat::Csv);
        assert_eq!(config.inpatient.resolve_format().unwrap(), SnapshotFormat::Json);
        assert_eq!(config.home.columns.id, "med_id");
        // Unmapped columns keep their defaults
        assert_eq!(config.home.columns.route, "route");
        assert_eq!(config.formulary.file.as_deref(), Some("ppo.formulary.toml"));
        assert_eq!(config.plan.unwrap().formulary_tier_label.as_deref(), Some("3-tier"));
        assert!(config.pharmacies[0].delivery_capable);
        assert_eq!(config.output.dispense_csv.as_deref(), Some("dispense.csv"));
    }

    #[test]
    fn minimal_config_defaults() {
        let config = DischargeConfig::from_toml(
            r#"
name = "Minimal"
[home]
file = "home.csv"
[inpatient]
file = "inpatient.csv"
"#,
        )
        .unwrap();
        assert!(config.formulary.file.is_none());
        assert!(config.plan.is_none());
        assert!(config.pharmacies.is_empty());
        assert_eq!(config.inpatient.columns, ColumnMapping::default());
    }

    #[test]
    fn explicit_format_overrides_extension() {
        let config = DischargeConfig::from_toml(
            r#"
name = "Explicit"
[home]
file = "home.txt"
format = "csv"
[inpatient]
file = "inpatient.export"
format = "json"
"#,
        )
        .unwrap();
        assert_eq!(config.inpatient.resolve_format().unwrap(), SnapshotFormat::Json);
    }

    #[test]
    fn reject_unknown_extension() {
        let err = DischargeConfig::from_toml(
            r#"
name = "Bad"
[home]
file = "home.xlsx"
[inpatient]
file = "inpatient.csv"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("cannot infer format of 'home.xlsx'"));
    }

    #[test]
    fn reject_missing_inpatient() {
        let err = DischargeConfig::from_toml("name = \"Bad\"\n[home]\nfile = \"home.csv\"\n").unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }

    #[test]
    fn reject_invalid_format() {
        let err = DischargeConfig::from_toml(
            r#"
name = "Bad"
[home]
file = "home.csv"
format = "xml"
[inpatient]
file = "inpatient.csv"
"#,
        );
        assert!(err.is_err(), "unknown format should fail deserialization");
    }

    #[test]
    fn reject_unnamed_pharmacy() {
        let mut config = DischargeConfig::from_toml(VALID).unwrap();
        config.pharmacies.push(Pharmacy {
            name: " ".into(),
            address: String::new(),
            phone: String::new(),
            delivery_capable: false,
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pharmacies[1]"));
    }
}
