use crate::formulary::FormularyEntry;
use crate::model::{MedicationRecord, MedicationSource, ReconItem, ReconStatus};
use crate::normalize::{keys_match, DrugKeyResolver};

#[derive(Debug, Default)]
pub struct MatchOutput {
    pub items: Vec<ReconItem>,
    /// Unmatched inpatient records dropped by the intravenous rule.
    pub excluded_iv: Vec<String>,
}

/// Pair home medications against inpatient orders and assign provisional status.
///
/// Home-derived rows come first, in home-list order, followed by new inpatient
/// rows in inpatient-list order. Every home record yields exactly one row; an
/// inpatient record yields a row only when no home record matches it and it
/// is not intravenous.
pub fn match_medications(
    home: &[MedicationRecord],
    inpatient: &[MedicationRecord],
    resolver: &dyn DrugKeyResolver,
) -> MatchOutput {
    let home_keys: Vec<String> = home.iter().map(|r| resolver.resolve(&r.display_name)).collect();
    let inpatient_keys: Vec<String> = inpatient
        .iter()
        .map(|r| resolver.resolve(&r.display_name))
        .collect();

    let mut out = MatchOutput {
        items: Vec::with_capacity(home.len() + inpatient.len()),
        excluded_iv: Vec::new(),
    };

    for (h, home_key) in home.iter().zip(&home_keys) {
        let found = inpatient
            .iter()
            .zip(&inpatient_keys)
            .find(|(_, inpatient_key)| keys_match(home_key, inpatient_key));

        let item = match found {
            Some((i, _)) => {
                log::debug!("home '{}' matched inpatient '{}' -> continue", h.id, i.id);
                continued(h, home_key, i)
            }
            None => {
                log::debug!("home '{}' has no inpatient order -> discontinue", h.id);
                discontinued(h, home_key)
            }
        };
        out.items.push(item);
    }

    for (i, inpatient_key) in inpatient.iter().zip(&inpatient_keys) {
        if home_keys.iter().any(|home_key| keys_match(home_key, inpatient_key)) {
            continue;
        }
        if is_intravenous(i) {
            log::debug!("inpatient '{}' is intravenous, excluded from discharge plan", i.id);
            out.excluded_iv.push(i.id.clone());
            continue;
        }
        log::debug!("inpatient '{}' has no home counterpart -> new", i.id);
        out.items.push(started(i, inpatient_key));
    }

    out
}

/// True when a record is an intravenous-only formulation.
///
/// The route field matches on any "iv" substring ("IV", "IVPB", "iv push")
/// or "intraven". The display name needs a whole IV token ("Furosemide 40mg IV")
/// so names such as "Ivermectin" or "Divalproex" are not caught.
pub fn is_intravenous(record: &MedicationRecord) -> bool {
    let route_is_iv = record.route.as_deref().is_some_and(|route| {
        let route = route.to_lowercase();
        route.contains("iv") || route.contains("intraven")
    });
    if route_is_iv {
        return true;
    }

    record
        .display_name
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| matches!(token, "iv" | "ivp" | "ivpb") || token.starts_with("intraven"))
}

fn home_item_id(record: &MedicationRecord) -> String {
    format!("{}:{}", MedicationSource::Home, record.id)
}

fn inpatient_item_id(record: &MedicationRecord) -> String {
    format!("{}:{}", MedicationSource::Inpatient, record.id)
}

fn continued(home: &MedicationRecord, home_key: &str, inpatient: &MedicationRecord) -> ReconItem {
    let home_dose = home.dose_display();
    let discharge_dose = if inpatient.has_structured_dose() {
        inpatient.dose_display()
    } else {
        home_dose.clone()
    };
    let frequency = match inpatient.frequency_display() {
        f if f.is_empty() => home.frequency_display(),
        f => f,
    };
    let route = match inpatient.route_display() {
        r if r.is_empty() => home.route_display(),
        r => r,
    };

    provisional(ProvisionalItem {
        id: home_item_id(home),
        name: inpatient.display_name.clone(),
        origin: MedicationSource::Home,
        drug_key: home_key.to_string(),
        home_dose,
        discharge_dose,
        frequency,
        route,
        status: ReconStatus::Continue,
        home_record_id: Some(home.id.clone()),
        inpatient_record_id: Some(inpatient.id.clone()),
    })
}

fn discontinued(home: &MedicationRecord, home_key: &str) -> ReconItem {
    let home_dose = home.dose_display();
    provisional(ProvisionalItem {
        id: home_item_id(home),
        name: home.display_name.clone(),
        origin: MedicationSource::Home,
        drug_key: home_key.to_string(),
        // Kept for audit; the caller renders it struck through.
        discharge_dose: home_dose.clone(),
        home_dose,
        frequency: home.frequency_display(),
        route: home.route_display(),
        status: ReconStatus::Discontinue,
        home_record_id: Some(home.id.clone()),
        inpatient_record_id: None,
    })
}

fn started(inpatient: &MedicationRecord, inpatient_key: &str) -> ReconItem {
    provisional(ProvisionalItem {
        id: inpatient_item_id(inpatient),
        name: inpatient.display_name.clone(),
        origin: MedicationSource::Inpatient,
        drug_key: inpatient_key.to_string(),
        home_dose: String::new(),
        discharge_dose: inpatient.dose_display(),
        frequency: inpatient.frequency_display(),
        route: inpatient.route_display(),
        status: ReconStatus::New,
        home_record_id: None,
        inpatient_record_id: Some(inpatient.id.clone()),
    })
}

struct ProvisionalItem {
    id: String,
    name: String,
    origin: MedicationSource,
    drug_key: String,
    home_dose: String,
    discharge_dose: String,
    frequency: String,
    route: String,
    status: ReconStatus,
    home_record_id: Option<String>,
    inpatient_record_id: Option<String>,
}

/// Coverage fields start at the default policy until the evaluator runs.
fn provisional(p: ProvisionalItem) -> ReconItem {
    let policy = FormularyEntry::default_policy();
    ReconItem {
        id: p.id,
        name: p.name,
        origin: p.origin,
        drug_key: p.drug_key,
        home_dose: p.home_dose,
        discharge_dose: p.discharge_dose,
        frequency: p.frequency,
        route: p.route,
        is_new: p.status == ReconStatus::New,
        status: p.status,
        insurance_covered: policy.covered,
        prior_auth_required: policy.prior_auth_required,
        tier: policy.tier,
        estimated_cost: policy.copay_estimate,
        alternative_suggestion: None,
        home_record_id: p.home_record_id,
        inpatient_record_id: p.inpatient_record_id,
    }
}
