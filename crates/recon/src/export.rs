//! Discharge medication plan export for the dispense / send-to-pharmacy step.

use std::io::Write;

use serde::Serialize;

use crate::error::ReconError;
use crate::model::{InsurancePlan, Pharmacy, ReconResult, ReconStatus};

/// One medication to dispense at discharge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispenseRow {
    pub item_id: String,
    pub name: String,
    pub dose: String,
    pub frequency: String,
    pub status: ReconStatus,
    pub covered: bool,
    pub prior_auth: bool,
    pub tier: u8,
    pub estimated_cost: String,
    pub alternative: String,
}

/// Every item still on the plan, in result order. Discontinued items are left out.
pub fn build_dispense_rows(result: &ReconResult) -> Vec<DispenseRow> {
    result
        .items
        .iter()
        .filter(|i| i.status != ReconStatus::Discontinue)
        .map(|i| DispenseRow {
            item_id: i.id.clone(),
            name: i.name.clone(),
            dose: i.discharge_dose.clone(),
            frequency: i.frequency.clone(),
            status: i.status,
            covered: i.insurance_covered,
            prior_auth: i.prior_auth_required,
            tier: i.tier,
            estimated_cost: i.estimated_cost.clone(),
            alternative: i.alternative_suggestion.clone().unwrap_or_default(),
        })
        .collect()
}

pub fn write_dispense_csv<W: Write>(rows: &[DispenseRow], writer: W) -> Result<(), ReconError> {
    let mut wtr = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        // serialize() emits headers lazily; write them for an empty plan too
        wtr.write_record([
            "item_id",
            "name",
            "dose",
            "frequency",
            "status",
            "covered",
            "prior_auth",
            "tier",
            "estimated_cost",
            "alternative",
        ])
        .map_err(|e| ReconError::Io(e.to_string()))?;
    }
    for row in rows {
        wtr.serialize(row).map_err(|e| ReconError::Io(e.to_string()))?;
    }
    wtr.flush().map_err(|e| ReconError::Io(e.to_string()))?;
    Ok(())
}

/// Discharge plan addressed to one pharmacy from the pass-through directory.
#[derive(Debug, Clone, Serialize)]
pub struct PharmacyOrder {
    /// `None` when the requested pharmacy is not in the directory.
    pub pharmacy: Option<Pharmacy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<InsurancePlan>,
    pub medications: Vec<DispenseRow>,
    pub total_estimated_cost: u64,
}

/// Bundle the plan for a pharmacy, matched by name case-insensitively.
/// The pharmacy entry itself is not validated.
pub fn build_pharmacy_order(result: &ReconResult, pharmacy_name: &str) -> PharmacyOrder {
    let wanted = pharmacy_name.trim();
    let pharmacy = result
        .pharmacies
        .iter()
        .find(|p| p.name.trim().eq_ignore_ascii_case(wanted))
        .cloned();

    PharmacyOrder {
        pharmacy,
        plan: result.plan.clone(),
        medications: build_dispense_rows(result),
        total_estimated_cost: result.summary.total_estimated_cost,
    }
}
