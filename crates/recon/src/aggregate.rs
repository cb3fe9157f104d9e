use std::collections::BTreeMap;

use crate::coverage::issue_reason;
use crate::model::{CoverageIssue, ReconItem, ReconStatus, ReconSummary};

/// Whole-dollar value of a copay display string.
///
/// Reads the leading digits after an optional `$`, skipping thousands
/// separators: "$15" -> 15, "$1,200" -> 1200, "$12.99" -> 12. Anything
/// else, including an empty string, is 0.
pub fn parse_cost(display: &str) -> u64 {
    let trimmed = display.trim();
    let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed).trim_start();

    let digits: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(|c| c.is_ascii_digit())
        .collect();

    digits.parse().unwrap_or(0)
}

/// Sum of estimated cost over every item that is not discontinued.
pub fn total_estimated_cost(items: &[ReconItem]) -> u64 {
    items
        .iter()
        .filter(|i| i.status != ReconStatus::Discontinue)
        .fold(0u64, |acc, i| acc.saturating_add(parse_cost(&i.estimated_cost)))
}

pub fn coverage_issues(items: &[ReconItem]) -> Vec<CoverageIssue> {
    items
        .iter()
        .filter_map(|item| {
            issue_reason(item).map(|reason| CoverageIssue {
                item_id: item.id.clone(),
                name: item.name.clone(),
                reason,
                alternative_suggestion: item.alternative_suggestion.clone(),
            })
        })
        .collect()
}

/// Compute summary statistics from the item list.
pub fn compute_summary(items: &[ReconItem]) -> ReconSummary {
    let mut status_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut continued = 0;
    let mut discontinued = 0;
    let mut modified = 0;
    let mut new = 0;
    let mut coverage_issue_count = 0;

    for item in items {
        *status_counts.entry(item.status.to_string()).or_insert(0) += 1;

        match item.status {
            ReconStatus::Continue => continued += 1,
            ReconStatus::Discontinue => discontinued += 1,
            ReconStatus::Modify => modified += 1,
            ReconStatus::New => new += 1,
        }

        if issue_reason(item).is_some() {
            coverage_issue_count += 1;
        }
    }

    ReconSummary {
        total_items: items.len(),
        continued,
        discontinued,
        modified,
        new,
        coverage_issue_count,
        total_estimated_cost: total_estimated_cost(items),
        status_counts,
    }
}
