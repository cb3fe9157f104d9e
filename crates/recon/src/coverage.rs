use crate::formulary::{FormularyEntry, FormularySource};
use crate::model::{IssueReason, ReconItem, ReconStatus};
use crate::normalize::DrugKeyResolver;

/// Annotate every item with coverage from the formulary.
///
/// The lookup key is resolved from the item's display name (the inpatient
/// name for matched rows), not from the originating record.
pub fn evaluate_coverage(
    items: &mut [ReconItem],
    formulary: &dyn FormularySource,
    resolver: &dyn DrugKeyResolver,
) {
    for item in items.iter_mut() {
        let key = resolver.resolve(&item.name);
        let entry = formulary.lookup(&key);
        apply_entry(item, &entry);
    }
}

pub fn apply_entry(item: &mut ReconItem, entry: &FormularyEntry) {
    item.insurance_covered = entry.covered;
    item.prior_auth_required = entry.prior_auth_required;
    item.tier = entry.tier;
    item.estimated_cost = entry.copay_estimate.clone();
    item.alternative_suggestion = entry.alternatives.first().cloned();
}

/// Why an item needs attention, or `None` when it does not.
///
/// Discontinued items never need attention, whatever their coverage.
pub fn issue_reason(item: &ReconItem) -> Option<IssueReason> {
    if item.status == ReconStatus::Discontinue {
        return None;
    }
    match (item.insurance_covered, item.prior_auth_required) {
        (true, false) => None,
        (false, false) => Some(IssueReason::NotCovered),
        (true, true) => Some(IssueReason::PriorAuthRequired),
        (false, true) => Some(IssueReason::NotCoveredPriorAuth),
    }
}

pub fn is_coverage_issue(item: &ReconItem) -> bool {
    issue_reason(item).is_some()
}
