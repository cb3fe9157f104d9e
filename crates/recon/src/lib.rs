//! `dischargerx-recon` — Discharge medication reconciliation and formulary decision engine.
//!
//! Pure engine crate: receives pre-loaded medication lists and an injected
//! formulary, returns the reconciled discharge plan. No CLI or file IO.

pub mod aggregate;
pub mod config;
pub mod coverage;
pub mod engine;
pub mod error;
pub mod export;
pub mod formulary;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod snapshot;
pub mod state;

pub use config::DischargeConfig;
pub use engine::{run, Reconciler};
pub use error::ReconError;
pub use formulary::{FormularyCatalog, FormularyEntry, FormularySource};
pub use model::{
    MedicationRecord, MedicationSource, ReconInput, ReconItem, ReconNotice, ReconResult, ReconStatus,
    ReconSummary,
};
pub use normalize::{normalize, DrugKeyResolver, FirstTokenResolver};
