//! `drx run|validate|lookup|order`: config-driven discharge reconciliation.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;

use dischargerx_recon::config::SnapshotSource;
use dischargerx_recon::export::{build_dispense_rows, build_pharmacy_order, write_dispense_csv};
use dischargerx_recon::model::MedicationSource;
use dischargerx_recon::snapshot::{parse_records, validate_records};
use dischargerx_recon::state::reapply_overrides;
use dischargerx_recon::{
    normalize, DischargeConfig, FormularyCatalog, FormularyEntry, MedicationRecord, ReconInput,
    ReconResult, Reconciler,
};

use crate::exit_codes::{EXIT_COVERAGE_ISSUES, EXIT_INVALID_CONFIG, EXIT_USAGE};
use crate::CliError;

#[derive(Args)]
pub struct RunArgs {
    /// Path to the .discharge.toml config file
    pub config: PathBuf,

    /// Output JSON to stdout instead of only the human summary
    #[arg(long)]
    pub json: bool,

    /// Write JSON result to file (overrides [output].json)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Write the dispense list as CSV (overrides [output].dispense_csv)
    #[arg(long)]
    pub dispense_csv: Option<PathBuf>,

    /// Clinician override, ITEM_ID=STATUS (repeatable, applied in order)
    #[arg(long = "override", value_name = "ITEM_ID=STATUS")]
    pub overrides: Vec<String>,

    /// Re-apply the overrides recorded in an earlier JSON result
    #[arg(long, value_name = "RESULT_JSON")]
    pub carry_from: Option<PathBuf>,
}

#[derive(Args)]
pub struct LookupArgs {
    /// Medication display name, e.g. "Apixaban 5mg"
    pub name: String,

    /// Formulary catalog TOML (built-in catalog when omitted)
    #[arg(long)]
    pub formulary: Option<PathBuf>,
}

#[derive(Args)]
pub struct OrderArgs {
    /// Path to the .discharge.toml config file
    pub config: PathBuf,

    /// Pharmacy name from the config's [[pharmacies]] directory
    #[arg(long)]
    pub pharmacy: String,

    /// Re-apply the overrides recorded in an earlier JSON result
    #[arg(long, value_name = "RESULT_JSON")]
    pub carry_from: Option<PathBuf>,

    /// Write the order JSON to file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

// ============================================================================
// Loading
// ============================================================================

/// Everything a run needs, with paths resolved against the config directory.
struct Loaded {
    config: DischargeConfig,
    base_dir: PathBuf,
    catalog: FormularyCatalog,
    input: ReconInput,
}

fn read_file(path: &Path, what: &str) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::runtime(format!("cannot read {what} {}: {e}", path.display())))
}

fn load_config(config_path: &Path) -> Result<(DischargeConfig, PathBuf), CliError> {
    let config_str = read_file(config_path, "config")?;
    let config = DischargeConfig::from_toml(&config_str)?;
    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((config, base_dir))
}

fn load_catalog(path: Option<&Path>) -> Result<FormularyCatalog, CliError> {
    match path {
        Some(path) => {
            let text = read_file(path, "formulary")?;
            Ok(FormularyCatalog::from_toml(&text)?)
        }
        None => Ok(FormularyCatalog::builtin()),
    }
}

fn load_snapshot(
    base_dir: &Path,
    source: MedicationSource,
    snapshot: &SnapshotSource,
) -> Result<Vec<MedicationRecord>, CliError> {
    let path = base_dir.join(&snapshot.file);
    let data = read_file(&path, &format!("{source} medications"))?;
    let format = snapshot.resolve_format()?;
    let records = parse_records(source, &data, format, &snapshot.columns)?;
    tracing::debug!("loaded {} {source} record(s) from {}", records.len(), path.display());
    Ok(records)
}

fn load(config_path: &Path) -> Result<Loaded, CliError> {
    let (config, base_dir) = load_config(config_path)?;
    let formulary_path = config.formulary.file.as_ref().map(|f| base_dir.join(f));
    let catalog = load_catalog(formulary_path.as_deref())?;

    let home = load_snapshot(&base_dir, MedicationSource::Home, &config.home)?;
    let inpatient = load_snapshot(&base_dir, MedicationSource::Inpatient, &config.inpatient)?;

    let input = ReconInput {
        home,
        inpatient,
        plan: config.plan.clone(),
        pharmacies: config.pharmacies.clone(),
    };
    Ok(Loaded { config, base_dir, catalog, input })
}

fn reconcile(loaded: &Loaded, carry_from: Option<&Path>) -> Result<ReconResult, CliError> {
    let mut result = Reconciler::new(&loaded.catalog).run(&loaded.input)?;

    if let Some(path) = carry_from {
        let previous: ReconResult = serde_json::from_str(&read_file(path, "previous result")?)
            .map_err(|e| {
                CliError::new(EXIT_USAGE, format!("{} is not a drx result: {e}", path.display()))
            })?;
        let applied = reapply_overrides(&mut result, &previous.overrides);
        eprintln!(
            "carried {applied} of {} override(s) from {}",
            previous.overrides.len(),
            path.display()
        );
    }
    Ok(result)
}

/// Split `ITEM_ID=STATUS`. Item ids contain `:`, never `=`.
fn parse_override(arg: &str) -> Result<(&str, &str), CliError> {
    match arg.split_once('=') {
        Some((id, status)) if !id.trim().is_empty() && !status.trim().is_empty() => {
            Ok((id.trim(), status.trim()))
        }
        _ => Err(CliError::usage(format!("invalid override '{arg}'"))
            .with_hint("use --override ITEM_ID=STATUS, e.g. --override home:h2=continue")),
    }
}

// ============================================================================
// run
// ============================================================================

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let loaded = load(&args.config)?;
    let mut result = reconcile(&loaded, args.carry_from.as_deref())?;

    for arg in &args.overrides {
        let (id, status) = parse_override(arg)?;
        result.set_status_str(id, status)?;
        tracing::info!("override applied: {id} -> {status}");
    }

    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| CliError::runtime(format!("JSON serialization error: {e}")))?;

    let output_file = args
        .output
        .or_else(|| loaded.config.output.json.as_ref().map(|f| loaded.base_dir.join(f)));
    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::runtime(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    let dispense_file = args
        .dispense_csv
        .or_else(|| loaded.config.output.dispense_csv.as_ref().map(|f| loaded.base_dir.join(f)));
    if let Some(ref path) = dispense_file {
        let file = std::fs::File::create(path)
            .map_err(|e| CliError::runtime(format!("cannot write {}: {e}", path.display())))?;
        write_dispense_csv(&build_dispense_rows(&result), file)?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        println!("{json_str}");
    }

    print_summary(&loaded.config.name, &result);

    if !result.coverage_issues.is_empty() {
        return Err(CliError::new(
            EXIT_COVERAGE_ISSUES,
            format!("{} coverage issue(s) need review before discharge", result.coverage_issues.len()),
        ));
    }
    Ok(())
}

/// Human summary to stderr.
fn print_summary(name: &str, result: &ReconResult) {
    let s = &result.summary;
    eprintln!(
        "{name}: {} item(s): {} continue, {} discontinue, {} new, est. ${} ({})",
        s.total_items, s.continued, s.discontinued, s.new, s.total_estimated_cost, result.meta.formulary,
    );
    for issue in &result.coverage_issues {
        match issue.alternative_suggestion {
            Some(ref alt) => eprintln!("  coverage: {} ({}); try {alt}", issue.name, issue.reason),
            None => eprintln!("  coverage: {} ({})", issue.name, issue.reason),
        }
    }
    for notice in &result.notices {
        eprintln!("  note: {notice}");
    }
    if !result.overrides.is_empty() {
        eprintln!("  {} clinician override(s) recorded", result.overrides.len());
    }
}

// ============================================================================
// validate
// ============================================================================

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let loaded = load(&config_path)?;
    validate_records(MedicationSource::Home, &loaded.input.home)?;
    validate_records(MedicationSource::Inpatient, &loaded.input.inpatient)?;
    eprintln!(
        "valid: '{}' with {} home / {} inpatient record(s), formulary '{}' ({} entries), {} pharmacy(ies)",
        loaded.config.name,
        loaded.input.home.len(),
        loaded.input.inpatient.len(),
        loaded.catalog.name,
        loaded.catalog.len(),
        loaded.input.pharmacies.len(),
    );
    Ok(())
}

// ============================================================================
// lookup
// ============================================================================

#[derive(Serialize)]
struct LookupOutput<'a> {
    name: &'a str,
    key: String,
    formulary: &'a str,
    /// False when the default policy applied.
    listed: bool,
    entry: FormularyEntry,
}

pub fn cmd_lookup(args: LookupArgs) -> Result<(), CliError> {
    let catalog = load_catalog(args.formulary.as_deref())?;
    let key = normalize(&args.name);
    if key.is_empty() {
        return Err(CliError::usage("medication name is empty"));
    }

    let output = LookupOutput {
        name: &args.name,
        listed: catalog.get(&key).is_some(),
        entry: catalog.lookup(&key),
        formulary: &catalog.name,
        key,
    };
    let json_str = serde_json::to_string_pretty(&output)
        .map_err(|e| CliError::runtime(format!("JSON serialization error: {e}")))?;
    println!("{json_str}");
    Ok(())
}

// ============================================================================
// order
// ============================================================================

pub fn cmd_order(args: OrderArgs) -> Result<(), CliError> {
    let loaded = load(&args.config)?;
    let result = reconcile(&loaded, args.carry_from.as_deref())?;

    let order = build_pharmacy_order(&result, &args.pharmacy);
    let Some(ref pharmacy) = order.pharmacy else {
        let known: Vec<&str> = result.pharmacies.iter().map(|p| p.name.as_str()).collect();
        let err = CliError::new(
            EXIT_INVALID_CONFIG,
            format!("pharmacy '{}' is not in the config's directory", args.pharmacy),
        );
        return Err(if known.is_empty() {
            err.with_hint("add a [[pharmacies]] entry to the config")
        } else {
            err.with_hint(format!("known pharmacies: {}", known.join(", ")))
        });
    };

    let json_str = serde_json::to_string_pretty(&order)
        .map_err(|e| CliError::runtime(format!("JSON serialization error: {e}")))?;
    match args.output {
        Some(ref path) => {
            std::fs::write(path, &json_str)
                .map_err(|e| CliError::runtime(format!("cannot write output: {e}")))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{json_str}"),
    }

    eprintln!(
        "order for {}: {} medication(s), est. ${}{}",
        pharmacy.name,
        order.medications.len(),
        order.total_estimated_cost,
        if pharmacy.delivery_capable { ", delivery available" } else { "" },
    );
    if !result.coverage_issues.is_empty() {
        eprintln!("  {} coverage issue(s) unresolved", result.coverage_issues.len());
    }
    Ok(())
}
