use crate::aggregate::{compute_summary, coverage_issues};
use crate::coverage::evaluate_coverage;
use crate::error::ReconError;
use crate::formulary::FormularySource;
use crate::matcher::match_medications;
use crate::model::{
    AppliedOverride, InsurancePlan, MedicationRecord, MedicationSource, Pharmacy, ReconInput, ReconMeta, ReconNotice,
    ReconResult,
};
use crate::normalize::{DrugKeyResolver, FirstTokenResolver};
use crate::snapshot::validate_records;
use crate::state::reapply_overrides;

static FIRST_TOKEN: FirstTokenResolver = FirstTokenResolver;

/// Runs the reconciliation pipeline against an injected formulary.
///
/// Holds only borrowed read-only dependencies, so one `Reconciler` can serve
/// any number of runs and threads.
#[derive(Clone, Copy)]
pub struct Reconciler<'a> {
    formulary: &'a dyn FormularySource,
    resolver: &'a dyn DrugKeyResolver,
}

impl<'a> Reconciler<'a> {
    pub fn new(formulary: &'a dyn FormularySource) -> Self {
        Self {
            formulary,
            resolver: &FIRST_TOKEN,
        }
    }

    pub fn with_resolver(mut self, resolver: &'a dyn DrugKeyResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Reconcile home medications against inpatient orders.
    ///
    /// Fails only when the input breaks a record invariant (blank display
    /// name, duplicate id within a list). Empty lists are valid.
    pub fn reconcile(
        &self,
        home: &[MedicationRecord],
        inpatient: &[MedicationRecord],
    ) -> Result<ReconResult, ReconError> {
        self.reconcile_snapshot(home, inpatient, None, Vec::new())
    }

    /// Full-snapshot run; plan and pharmacies are passed through untouched.
    pub fn run(&self, input: &ReconInput) -> Result<ReconResult, ReconError> {
        self.reconcile_snapshot(
            &input.home,
            &input.inpatient,
            input.plan.clone(),
            input.pharmacies.clone(),
        )
    }

    /// Fresh run followed by re-applying overrides from an earlier result.
    pub fn reconcile_with_overrides(
        &self,
        home: &[MedicationRecord],
        inpatient: &[MedicationRecord],
        overrides: &[AppliedOverride],
    ) -> Result<ReconResult, ReconError> {
        let mut result = self.reconcile(home, inpatient)?;
        let applied = reapply_overrides(&mut result, overrides);
        log::info!("carried {applied} of {} override(s) into the new run", overrides.len());
        Ok(result)
    }

    fn reconcile_snapshot(
        &self,
        home: &[MedicationRecord],
        inpatient: &[MedicationRecord],
        plan: Option<InsurancePlan>,
        pharmacies: Vec<Pharmacy>,
    ) -> Result<ReconResult, ReconError> {
        validate_records(MedicationSource::Home, home)?;
        validate_records(MedicationSource::Inpatient, inpatient)?;

        let matched = match_medications(home, inpatient, self.resolver);
        let mut items = matched.items;
        evaluate_coverage(&mut items, self.formulary, self.resolver);

        let mut notices = Vec::new();
        if inpatient.is_empty() {
            log::warn!("no inpatient orders: every home medication is discontinued");
            notices.push(ReconNotice::NoDischargeMedications);
        }
        if home.is_empty() {
            notices.push(ReconNotice::NoHomeMedications);
        }
        if !matched.excluded_iv.is_empty() {
            log::warn!(
                "{} intravenous order(s) excluded from the discharge plan",
                matched.excluded_iv.len()
            );
            notices.push(ReconNotice::IntravenousExcluded {
                record_ids: matched.excluded_iv,
            });
        }

        let summary = compute_summary(&items);
        let issues = coverage_issues(&items);

        log::info!(
            "reconciled {} home / {} inpatient -> {} items ({} continue, {} discontinue, {} new), {} coverage issue(s), ${} estimated",
            home.len(),
            inpatient.len(),
            summary.total_items,
            summary.continued,
            summary.discontinued,
            summary.new,
            summary.coverage_issue_count,
            summary.total_estimated_cost,
        );

        Ok(ReconResult {
            meta: ReconMeta {
                formulary: self.formulary.name().to_string(),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
            },
            summary,
            items,
            coverage_issues: issues,
            notices,
            plan,
            pharmacies,
            overrides: Vec::new(),
        })
    }
}

/// Run reconciliation over a snapshot with the default resolver.
pub fn run(formulary: &dyn FormularySource, input: &ReconInput) -> Result<ReconResult, ReconError> {
    Reconciler::new(formulary).run(input)
}
