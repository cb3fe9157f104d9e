// drx - discharge medication reconciliation (headless)

mod exit_codes;
mod recon;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};
use recon::{LookupArgs, OrderArgs, RunArgs};

#[derive(Parser)]
#[command(name = "drx")]
#[command(about = "Discharge medication reconciliation and formulary checks")]
#[command(version)]
pub struct Cli {
    /// Log engine decisions to stderr (same as RUST_LOG=info)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile home medications against inpatient orders
    #[command(after_help = "\
Examples:
  drx run ward.discharge.toml
  drx run ward.discharge.toml --json
  drx run ward.discharge.toml --output result.json --dispense-csv dispense.csv
  drx run ward.discharge.toml --override inpatient:o4=discontinue
  drx run ward.discharge.toml --carry-from yesterday.json

Exit codes:
  0  plan has no coverage issues
  3  plan produced, coverage issues remain
  4  invalid config or formulary
  5  invalid medication input")]
    Run(RunArgs),

    /// Validate a discharge config and its formulary without running
    #[command(after_help = "\
Examples:
  drx validate ward.discharge.toml")]
    Validate {
        /// Path to the .discharge.toml config file
        config: std::path::PathBuf,
    },

    /// Show the formulary entry a medication name resolves to
    #[command(after_help = "\
Examples:
  drx lookup \"Empagliflozin 10mg\"
  drx lookup apixaban --formulary ppo.formulary.toml")]
    Lookup(LookupArgs),

    /// Build the discharge order for one pharmacy from the config directory
    #[command(after_help = "\
Examples:
  drx order ward.discharge.toml --pharmacy \"Main St Pharmacy\"")]
    Order(OrderArgs),
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // Also captures `log` records from the engine crate
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => recon::cmd_run(args),
        Commands::Validate { config } => recon::cmd_validate(config),
        Commands::Lookup(args) => recon::cmd_lookup(args),
        Commands::Order(args) => recon::cmd_order(args),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::new(exit_codes::EXIT_RUNTIME, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<dischargerx_recon::ReconError> for CliError {
    fn from(err: dischargerx_recon::ReconError) -> Self {
        use dischargerx_recon::ReconError;
        let hint = match &err {
            ReconError::MissingColumn { .. } => {
                Some("map CSV headers under [home.columns] / [inpatient.columns]".to_string())
            }
            ReconError::InvalidStatus { .. } => {
                Some("overrides accept continue or discontinue".to_string())
            }
            ReconError::UnknownItem(_) => {
                Some("item ids look like home:<record id> or inpatient:<record id>".to_string())
            }
            _ => None,
        };
        Self { code: exit_codes::exit_code_for(&err), message: err.to_string(), hint }
    }
}
