//! User status overrides applied after the pipeline has run.
//!
//! Only `continue` and `discontinue` are reachable through an override, from
//! any state. `modify` and `new` are pipeline outputs. An override changes
//! the addressed item's status and re-derives the summary; it never re-runs
//! matching or coverage.

use crate::aggregate::{compute_summary, coverage_issues};
use crate::error::ReconError;
use crate::model::{AppliedOverride, OverrideKey, ReconItem, ReconResult, ReconStatus, ReconSummary};

/// Reject statuses a clinician cannot choose directly.
pub fn check_override(status: ReconStatus) -> Result<(), ReconError> {
    match status {
        ReconStatus::Continue | ReconStatus::Discontinue => Ok(()),
        ReconStatus::Modify | ReconStatus::New => Err(ReconError::InvalidStatus {
            value: status.to_string(),
            reason: "only continue or discontinue can be set by an override".into(),
        }),
    }
}

pub fn override_key(item: &ReconItem) -> OverrideKey {
    OverrideKey {
        origin: item.origin,
        drug_key: item.drug_key.clone(),
    }
}

impl ReconResult {
    /// Apply a user status override and return the refreshed summary.
    pub fn set_status(&mut self, item_id: &str, status: ReconStatus) -> Result<ReconSummary, ReconError> {
        check_override(status)?;

        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| ReconError::UnknownItem(item_id.to_string()))?;

        if item.status != status {
            log::debug!("item '{item_id}': {} -> {status}", item.status);
        }
        item.status = status;
        let key = override_key(item);

        match self.overrides.iter_mut().find(|o| o.key == key) {
            Some(existing) => {
                existing.status = status;
                existing.item_id = item_id.to_string();
            }
            None => self.overrides.push(AppliedOverride {
                key,
                item_id: item_id.to_string(),
                status,
            }),
        }

        self.refresh();
        Ok(self.summary.clone())
    }

    /// String form of [`ReconResult::set_status`]; unknown values are rejected, not coerced.
    pub fn set_status_str(&mut self, item_id: &str, status: &str) -> Result<ReconSummary, ReconError> {
        let status: ReconStatus = status.parse()?;
        self.set_status(item_id, status)
    }

    /// Re-derive summary and coverage issues from the current item list.
    pub fn refresh(&mut self) {
        self.summary = compute_summary(&self.items);
        self.coverage_issues = coverage_issues(&self.items);
    }
}

/// Re-apply overrides from an earlier run by drug identity.
///
/// Overrides whose key has no item in this run, or more than one, are
/// dropped. Returns how many were applied.
pub fn reapply_overrides(result: &mut ReconResult, overrides: &[AppliedOverride]) -> usize {
    let mut applied = 0;
    for o in overrides {
        let mut candidates = result.items.iter().filter(|i| override_key(i) == o.key);
        let target = match (candidates.next(), candidates.next()) {
            (Some(item), None) => item.id.clone(),
            (Some(_), Some(_)) => {
                log::debug!("override for {:?} is ambiguous in this run, dropped", o.key);
                continue;
            }
            (None, _) => {
                log::debug!("override for {:?} has no item in this run, dropped", o.key);
                continue;
            }
        };
        match result.set_status(&target, o.status) {
            Ok(_) => applied += 1,
            Err(e) => log::debug!("override for {:?} not re-applied: {e}", o.key),
        }
    }
    applied
}
