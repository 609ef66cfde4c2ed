mod engine;
mod planner;
mod types;

pub use types::{GenerateOptions, PlannedSlot, SchedError};

use crate::model::{AssignmentRecord, Period};
use crate::rules::RuleTable;
use crate::sources::{AvailabilityStore, PersonnelDirectory};
use crate::storage::ScheduleRepository;

/// Collaborateurs en lecture pour une génération.
#[derive(Clone, Copy)]
pub struct Sources<'a> {
    pub directory: &'a dyn PersonnelDirectory,
    pub availability: &'a dyn AvailabilityStore,
}

impl<'a> Sources<'a> {
    pub fn new(
        directory: &'a dyn PersonnelDirectory,
        availability: &'a dyn AvailabilityStore,
    ) -> Self {
        Self {
            directory,
            availability,
        }
    }
}

/// Scheduler : planificateur + moteur paramétrés par une table de règles
#[derive(Debug, Clone)]
pub struct Scheduler {
    rules: RuleTable,
    opts: GenerateOptions,
}

impl Scheduler {
    pub fn new(rules: RuleTable, opts: GenerateOptions) -> Self {
        Self { rules, opts }
    }

    pub fn monthly() -> Self {
        Self::new(RuleTable::monthly(), GenerateOptions::monthly())
    }

    pub fn weekly() -> Self {
        Self::new(RuleTable::weekly(), GenerateOptions::weekly())
    }

    /// Tuples à pourvoir pour `period`, sans effet de bord.
    pub fn plan(&self, period: &Period) -> Result<Vec<PlannedSlot>, SchedError> {
        planner::plan(period, &self.rules)
    }

    /// Calcule les affectations sans rien persister.
    pub fn assign(
        &self,
        period: &Period,
        created_by: &str,
        sources: Sources<'_>,
    ) -> Result<Vec<AssignmentRecord>, SchedError> {
        let plan = self.plan(period)?;
        let range = planner::period_bounds(period, &self.rules)?;
        tracing::info!(%period, tuples = plan.len(), rules = %self.rules.id, "planning done");

        let outcome = engine::assign(
            &plan,
            *period,
            range,
            created_by,
            self.opts,
            sources.directory,
            sources.availability,
        )?;
        for (role, counter) in &outcome.loads {
            let loads: Vec<String> = counter.iter().map(|(id, n)| format!("{id}={n}")).collect();
            tracing::debug!(%role, loads = %loads.join(","), "final load");
        }
        Ok(outcome.records)
    }

    /// Génère puis persiste en un seul `bulk_insert`. Rien n'est écrit en cas d'erreur.
    pub fn generate(
        &self,
        period: &Period,
        created_by: &str,
        sources: Sources<'_>,
        repository: &mut dyn ScheduleRepository,
    ) -> Result<Vec<AssignmentRecord>, SchedError> {
        let records = self.assign(period, created_by, sources)?;
        repository.bulk_insert(&records)?;
        tracing::info!(%period, records = records.len(), "schedule persisted");
        Ok(records)
    }

    /// Calcule d'abord le nouveau jadual, puis remplace celui de la période.
    /// En cas d'erreur, les lignes existantes restent intactes.
    pub fn regenerate(
        &self,
        period: &Period,
        created_by: &str,
        sources: Sources<'_>,
        repository: &mut dyn ScheduleRepository,
    ) -> Result<Vec<AssignmentRecord>, SchedError> {
        let records = self.assign(period, created_by, sources)?;
        repository.replace_for_period(period, &records)?;
        tracing::info!(%period, records = records.len(), "schedule replaced");
        Ok(records)
    }

    /// Supprime les lignes d'une période (étape explicite avant regénération).
    pub fn clear(
        &self,
        period: &Period,
        repository: &mut dyn ScheduleRepository,
    ) -> Result<(), SchedError> {
        repository.delete_for_period(period)?;
        tracing::info!(%period, "schedule cleared");
        Ok(())
    }
}
