// CLI contract tests for `drx`: exit codes, stdout JSON, stderr summary.
// Run with: cargo test -p dischargerx-cli --test cli_tests

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const FIXTURES: [&str; 4] = ["ward.discharge.toml", "home.csv", "inpatient.json", "ppo.formulary.toml"];

fn drx() -> Command {
    Command::new(env!("CARGO_BIN_EXE_drx"))
}

/// Copy the engine's ward fixtures into a scratch directory so runs can
/// write outputs next to the config.
fn ward_dir() -> tempfile::TempDir {
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("../recon/tests/fixtures");
    let dir = tempfile::tempdir().unwrap();
    for name in FIXTURES {
        std::fs::copy(src.join(name), dir.path().join(name)).unwrap();
    }
    dir
}

fn config(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("ward.discharge.toml")
}

fn code(output: &Output) -> i32 {
    output.status.code().unwrap()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout)
        .unwrap_or_else(|e| panic!("stdout is not JSON: {e}\n{}", String::from_utf8_lossy(&output.stdout)))
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[test]
fn run_with_coverage_issues_exits_3() {
    let dir = ward_dir();
    let output = drx().arg("run").arg(config(&dir)).arg("--json").output().unwrap();

    assert_eq!(code(&output), 3, "stderr: {}", stderr(&output));
    let json = stdout_json(&output);
    assert_eq!(json["summary"]["total_items"], 6);
    assert_eq!(json["summary"]["total_estimated_cost"], 147);
    assert_eq!(json["coverage_issues"].as_array().unwrap().len(), 2);
    assert_eq!(json["meta"]["formulary"], "Acme PPO 2026");

    let err = stderr(&output);
    assert!(err.contains("Ward 4B discharge: 6 item(s)"), "{err}");
    assert!(err.contains("coverage: Empagliflozin 10mg"), "{err}");
    assert!(err.contains("note: "), "{err}");
}

#[test]
fn run_overrides_clear_issues() {
    let dir = ward_dir();
    let output = drx()
        .arg("run")
        .arg(config(&dir))
        .arg("--json")
        .args(["--override", "inpatient:o4=discontinue"])
        .args(["--override", "inpatient:o5=Discontinue"])
        .output()
        .unwrap();

    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));
    let json = stdout_json(&output);
    assert_eq!(json["summary"]["total_estimated_cost"], 15);
    assert_eq!(json["overrides"].as_array().unwrap().len(), 2);
    assert!(json["coverage_issues"].as_array().unwrap().is_empty());
}

#[test]
fn run_rejects_modify_override() {
    let dir = ward_dir();
    let output = drx()
        .arg("run")
        .arg(config(&dir))
        .args(["--override", "home:h1=modify"])
        .output()
        .unwrap();

    assert_eq!(code(&output), 2);
    let err = stderr(&output);
    assert!(err.contains("invalid status 'modify'"), "{err}");
    assert!(err.contains("hint:"), "{err}");
}

#[test]
fn run_rejects_unknown_item_and_bad_syntax() {
    let dir = ward_dir();
    let unknown = drx()
        .arg("run")
        .arg(config(&dir))
        .args(["--override", "home:zz=continue"])
        .output()
        .unwrap();
    assert_eq!(code(&unknown), 2);
    assert!(stderr(&unknown).contains("unknown reconciliation item: home:zz"));

    let syntax = drx().arg("run").arg(config(&dir)).args(["--override", "home:h1"]).output().unwrap();
    assert_eq!(code(&syntax), 2);
    assert!(stderr(&syntax).contains("invalid override 'home:h1'"));
}

#[test]
fn run_writes_result_and_dispense_files() {
    let dir = ward_dir();
    let result_path = dir.path().join("out/result.json");
    std::fs::create_dir_all(result_path.parent().unwrap()).unwrap();
    let csv_path = dir.path().join("dispense.csv");

    let output = drx()
        .arg("run")
        .arg(config(&dir))
        .arg("--output")
        .arg(&result_path)
        .arg("--dispense-csv")
        .arg(&csv_path)
        .output()
        .unwrap();
    assert_eq!(code(&output), 3);
    assert!(output.stdout.is_empty(), "no --json, stdout stays empty");

    let result: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&result_path).unwrap()).unwrap();
    assert_eq!(result["items"].as_array().unwrap().len(), 6);

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert!(csv.starts_with("item_id,name,dose,frequency,status,"));
    assert_eq!(csv.lines().count(), 5);
    assert!(!csv.contains("Metformin"), "discontinued items are not dispensed");
}

#[test]
fn run_uses_config_output_paths() {
    let dir = ward_dir();
    let mut text = std::fs::read_to_string(config(&dir)).unwrap();
    text.push_str("\n[output]\njson = \"plan.json\"\ndispense_csv = \"plan.csv\"\n");
    std::fs::write(config(&dir), text).unwrap();

    let output = drx().arg("run").arg(config(&dir)).output().unwrap();
    assert_eq!(code(&output), 3, "stderr: {}", stderr(&output));
    assert!(dir.path().join("plan.json").exists());
    assert!(dir.path().join("plan.csv").exists());
}

#[test]
fn carry_from_reapplies_earlier_overrides() {
    let dir = ward_dir();
    let first = dir.path().join("first.json");
    let output = drx()
        .arg("run")
        .arg(config(&dir))
        .arg("--output")
        .arg(&first)
        .args(["--override", "home:h2=continue"])
        .output()
        .unwrap();
    assert_eq!(code(&output), 3);

    let output = drx()
        .arg("run")
        .arg(config(&dir))
        .arg("--json")
        .arg("--carry-from")
        .arg(&first)
        .output()
        .unwrap();
    assert_eq!(code(&output), 3);
    assert!(stderr(&output).contains("carried 1 of 1 override(s)"));
    let json = stdout_json(&output);
    assert_eq!(json["items"][1]["id"], "home:h2");
    assert_eq!(json["items"][1]["status"], "continue");
    assert_eq!(json["summary"]["total_estimated_cost"], 151);
}

#[test]
fn run_without_formulary_uses_builtin_catalog() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("home.csv"), "id,display_name,route\nh1,Rivaroxaban 20mg,oral\n").unwrap();
    std::fs::write(dir.path().join("inpatient.csv"), "id,display_name,route\ni1,Rivaroxaban 20mg,PO\n").unwrap();
    let cfg = dir.path().join("min.discharge.toml");
    std::fs::write(
        &cfg,
        "name = \"Minimal\"\n[home]\nfile = \"home.csv\"\n[inpatient]\nfile = \"inpatient.csv\"\n",
    )
    .unwrap();

    let output = drx().arg("run").arg(&cfg).arg("--json").output().unwrap();
    assert_eq!(code(&output), 3);
    let json = stdout_json(&output);
    assert_eq!(json["meta"]["formulary"], "built-in demonstration formulary");
    assert_eq!(json["coverage_issues"][0]["alternative_suggestion"], "apixaban");
}

#[test]
fn empty_inpatient_list_discontinues_everything() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("home.csv"), "id,display_name\nh1,Metformin 500mg\n").unwrap();
    std::fs::write(dir.path().join("orders.json"), "[]").unwrap();
    let cfg = dir.path().join("empty.discharge.toml");
    std::fs::write(&cfg, "name = \"Empty\"\n[home]\nfile = \"home.csv\"\n[inpatient]\nfile = \"orders.json\"\n")
        .unwrap();

    let output = drx().arg("run").arg(&cfg).arg("--json").output().unwrap();
    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));
    let json = stdout_json(&output);
    assert_eq!(json["summary"]["discontinued"], 1);
    assert_eq!(json["notices"][0]["kind"], "no_discharge_medications");
}

// ---------------------------------------------------------------------------
// Error paths
// ---------------------------------------------------------------------------

#[test]
fn invalid_config_exits_4() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("bad.discharge.toml");
    std::fs::write(&cfg, "name = \"Bad\"\n[home]\nfile = \"home.xlsx\"\n[inpatient]\nfile = \"i.csv\"\n").unwrap();

    let output = drx().arg("validate").arg(&cfg).output().unwrap();
    assert_eq!(code(&output), 4);
    assert!(stderr(&output).contains("cannot infer format of 'home.xlsx'"));
}

#[test]
fn duplicate_record_exits_5() {
    let dir = ward_dir();
    std::fs::write(dir.path().join("home.csv"), "med_id,medication\nh1,Lisinopril 10mg\nh1,Metformin 500mg\n").unwrap();

    let output = drx().arg("run").arg(config(&dir)).output().unwrap();
    assert_eq!(code(&output), 5);
    assert!(stderr(&output).contains("'h1' appears more than once"));
}

#[test]
fn missing_column_exits_5_with_hint() {
    let dir = ward_dir();
    std::fs::write(dir.path().join("home.csv"), "id,display_name\nh1,Lisinopril 10mg\n").unwrap();

    let output = drx().arg("run").arg(config(&dir)).output().unwrap();
    assert_eq!(code(&output), 5);
    let err = stderr(&output);
    assert!(err.contains("missing column 'med_id'"), "{err}");
    assert!(err.contains("hint:"), "{err}");
}

#[test]
fn missing_config_file_is_runtime_error() {
    let output = drx().args(["run", "/nonexistent/ward.discharge.toml"]).output().unwrap();
    assert_eq!(code(&output), 6);
    assert!(stderr(&output).contains("cannot read config"));
}

// ---------------------------------------------------------------------------
// validate / lookup / order
// ---------------------------------------------------------------------------

#[test]
fn validate_reports_counts() {
    let dir = ward_dir();
    let output = drx().arg("validate").arg(config(&dir)).output().unwrap();
    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));
    let err = stderr(&output);
    assert!(err.contains("valid: 'Ward 4B discharge' with 4 home / 6 inpatient record(s)"), "{err}");
    assert!(err.contains("formulary 'Acme PPO 2026'"), "{err}");
}

#[test]
fn lookup_listed_and_default_policy() {
    let listed = drx().args(["lookup", "Empagliflozin 10mg"]).output().unwrap();
    assert_eq!(code(&listed), 0);
    let json = stdout_json(&listed);
    assert_eq!(json["key"], "empagliflozin");
    assert_eq!(json["listed"], true);
    assert_eq!(json["entry"]["covered"], false);
    assert_eq!(json["entry"]["alternatives"][0], "metformin");

    let unlisted = drx().args(["lookup", "Ondansetron 4mg"]).output().unwrap();
    let json = stdout_json(&unlisted);
    assert_eq!(json["listed"], false);
    assert_eq!(json["entry"]["tier"], 2);
    assert_eq!(json["entry"]["copay_estimate"], "$15");
}

#[test]
fn lookup_against_catalog_file() {
    let dir = ward_dir();
    let output = drx()
        .args(["lookup", "apixaban"])
        .arg("--formulary")
        .arg(dir.path().join("ppo.formulary.toml"))
        .output()
        .unwrap();
    assert_eq!(code(&output), 0);
    let json = stdout_json(&output);
    assert_eq!(json["formulary"], "Acme PPO 2026");
    assert_eq!(json["entry"]["prior_auth_required"], true);
}

#[test]
fn lookup_blank_name_is_usage_error() {
    let output = drx().args(["lookup", "   "]).output().unwrap();
    assert_eq!(code(&output), 2);
}

#[test]
fn order_for_known_pharmacy() {
    let dir = ward_dir();
    let output = drx()
        .arg("order")
        .arg(config(&dir))
        .args(["--pharmacy", "main st pharmacy"])
        .output()
        .unwrap();
    assert_eq!(code(&output), 0, "stderr: {}", stderr(&output));

    let json = stdout_json(&output);
    assert_eq!(json["pharmacy"]["phone"], "555-0100");
    assert_eq!(json["plan"]["plan_name"], "Acme PPO");
    assert_eq!(json["medications"].as_array().unwrap().len(), 4);
    assert_eq!(json["total_estimated_cost"], 147);
    assert!(stderr(&output).contains("delivery available"));
}

#[test]
fn order_for_unknown_pharmacy_lists_directory() {
    let dir = ward_dir();
    let output = drx()
        .arg("order")
        .arg(config(&dir))
        .args(["--pharmacy", "Elsewhere"])
        .output()
        .unwrap();
    assert_eq!(code(&output), 4);
    let err = stderr(&output);
    assert!(err.contains("pharmacy 'Elsewhere'"), "{err}");
    assert!(err.contains("known pharmacies: Main St Pharmacy, Hospital Outpatient Pharmacy"), "{err}");
}
