use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconError {
    /// TOML parse / deserialization error in a run config.
    ConfigParse(String),
    /// Run config validation error (missing file entry, bad format, etc.).
    ConfigValidation(String),
    /// TOML parse / deserialization error in a formulary catalog.
    CatalogParse(String),
    /// Formulary entry violates a catalog invariant.
    CatalogValidation { key: String, reason: String },
    /// Snapshot file could not be decoded (CSV or JSON).
    SnapshotParse { source: String, message: String },
    /// Missing required column in a snapshot CSV.
    MissingColumn { source: String, column: String },
    /// A medication record without a display name.
    MissingDisplayName { source: String, record_id: String },
    /// The same id appears twice within one source list.
    DuplicateRecord { source: String, record_id: String },
    /// Status value rejected by an override.
    InvalidStatus { value: String, reason: String },
    /// Override addressed an item id that is not in the result.
    UnknownItem(String),
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::CatalogParse(msg) => write!(f, "formulary parse error: {msg}"),
            Self::CatalogValidation { key, reason } => {
                write!(f, "formulary entry '{key}': {reason}")
            }
            Self::SnapshotParse { source, message } => {
                write!(f, "{source} medications: {message}")
            }
            Self::MissingColumn { source, column } => {
                write!(f, "{source} medications: missing column '{column}'")
            }
            Self::MissingDisplayName { source, record_id } => {
                write!(f, "{source} medication '{record_id}': display name is empty")
            }
            Self::DuplicateRecord { source, record_id } => {
                write!(f, "{source} medication '{record_id}' appears more than once")
            }
            Self::InvalidStatus { value, reason } => {
                write!(f, "invalid status '{value}': {reason}")
            }
            Self::UnknownItem(id) => write!(f, "unknown reconciliation item: {id}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
