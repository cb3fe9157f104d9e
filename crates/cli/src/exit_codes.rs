//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `drx` exit codes.
//! Exit codes are part of the shell contract; discharge scripts rely on them.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success, plan has no coverage issues                      |
//! | 1    | General error (unspecified)                               |
//! | 2    | CLI usage error (bad args, bad `--override` syntax)       |
//! | 3    | Plan produced, but coverage issues remain                 |
//! | 4    | Invalid run config or formulary catalog                   |
//! | 5    | Invalid medication input (parse error, bad record)        |
//! | 6    | Runtime error (IO, serialization)                         |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `exit_code_for`

use dischargerx_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
#[allow(dead_code)]
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, malformed `ID=STATUS` overrides.
pub const EXIT_USAGE: u8 = 2;

/// The plan was produced, but at least one item is not covered or needs
/// prior authorization.
pub const EXIT_COVERAGE_ISSUES: u8 = 3;

/// Run config or formulary catalog failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 4;

/// A medication snapshot failed to parse, or a record is invalid.
pub const EXIT_INVALID_INPUT: u8 = 5;

/// IO or serialization failure.
pub const EXIT_RUNTIME: u8 = 6;

/// Map an engine error to its exit code.
pub fn exit_code_for(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_)
        | ReconError::ConfigValidation(_)
        | ReconError::CatalogParse(_)
        | ReconError::CatalogValidation { .. } => EXIT_INVALID_CONFIG,
        ReconError::SnapshotParse { .. }
        | ReconError::MissingColumn { .. }
        | ReconError::MissingDisplayName { .. }
        | ReconError::DuplicateRecord { .. } => EXIT_INVALID_INPUT,
        ReconError::InvalidStatus { .. } | ReconError::UnknownItem(_) => EXIT_USAGE,
        ReconError::Io(_) => EXIT_RUNTIME,
    }
}
