use super::types::{GenerateOptions, PlannedSlot, SchedError};
use crate::model::{AssignmentRecord, Period, Person, PersonId, Role, UnavailabilityException};
use crate::sources::{AvailabilityStore, PersonnelDirectory};
use anyhow::Context;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Compteur de charge d'un rôle, propre à une génération.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct LoadCounter {
    counts: BTreeMap<PersonId, u32>,
}

impl LoadCounter {
    fn seeded(pool: &[Person]) -> Self {
        Self {
            counts: pool.iter().map(|p| (p.id.clone(), 0)).collect(),
        }
    }

    fn get(&self, person: &PersonId) -> u32 {
        self.counts.get(person).copied().unwrap_or(0)
    }

    fn bump(&mut self, person: &PersonId) {
        *self.counts.entry(person.clone()).or_insert(0) += 1;
    }

    pub(super) fn iter(&self) -> impl Iterator<Item = (&PersonId, u32)> {
        self.counts.iter().map(|(id, n)| (id, *n))
    }
}

/// Données chargées une seule fois par génération.
struct Snapshot {
    pools: BTreeMap<Role, Vec<Person>>,
    exceptions: Vec<UnavailabilityException>,
}

fn load_snapshot(
    plan: &[PlannedSlot],
    range: (NaiveDate, NaiveDate),
    opts: GenerateOptions,
    directory: &dyn PersonnelDirectory,
    availability: &dyn AvailabilityStore,
) -> Result<Snapshot, SchedError> {
    let mut pools = BTreeMap::new();
    for slot in plan {
        if pools.contains_key(&slot.role) {
            continue;
        }
        let role = slot.role;
        let mut pool: Vec<Person> = directory
            .active_by_role(role)
            .with_context(|| format!("fetching personnel for role {role}"))?
            .into_iter()
            .filter(|p| p.active && p.holds(role))
            .collect();
        pool.sort_by(|a, b| a.id.cmp(&b.id));
        pool.dedup_by(|a, b| a.id == b.id);
        tracing::debug!(%role, pool = pool.len(), "personnel fetched");
        pools.insert(role, pool);
    }

    let exceptions = if opts.check_availability {
        let (start, end) = range;
        let exceptions = availability
            .exceptions(None, start, end)
            .with_context(|| format!("fetching unavailability from {start} to {end}"))?;
        tracing::debug!(count = exceptions.len(), "unavailability fetched");
        exceptions
    } else {
        Vec::new()
    };

    Ok(Snapshot { pools, exceptions })
}

pub(super) struct Outcome {
    pub records: Vec<AssignmentRecord>,
    pub loads: BTreeMap<Role, LoadCounter>,
}

/// Affecte chaque tuple au candidat le moins chargé (départage par identifiant croissant).
pub(super) fn assign(
    plan: &[PlannedSlot],
    period: Period,
    range: (NaiveDate, NaiveDate),
    created_by: &str,
    opts: GenerateOptions,
    directory: &dyn PersonnelDirectory,
    availability: &dyn AvailabilityStore,
) -> Result<Outcome, SchedError> {
    let snapshot = load_snapshot(plan, range, opts, directory, availability)?;
    let mut loads: BTreeMap<Role, LoadCounter> = snapshot
        .pools
        .iter()
        .map(|(role, pool)| (*role, LoadCounter::seeded(pool)))
        .collect();

    let mut records = Vec::with_capacity(plan.len());
    // personnes déjà placées sur l'occurrence courante
    let mut occurrence_start = 0usize;

    for (idx, slot) in plan.iter().enumerate() {
        if !plan[occurrence_start].same_occurrence(slot) {
            occurrence_start = idx;
        }
        let taken = &records[occurrence_start..idx];

        let pool = snapshot
            .pools
            .get(&slot.role)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let counter = loads.entry(slot.role).or_default();

        let chosen = pool
            .iter()
            .filter(|p| {
                !taken
                    .iter()
                    .any(|r: &AssignmentRecord| r.person_id.as_ref() == Some(&p.id))
            })
            .filter(|p| {
                !snapshot
                    .exceptions
                    .iter()
                    .any(|exc| exc.blocks(&p.id, slot.date, &slot.match_label))
            })
            .min_by(|a, b| {
                counter
                    .get(&a.id)
                    .cmp(&counter.get(&b.id))
                    .then_with(|| a.id.cmp(&b.id))
            })
            .map(|p| p.id.clone());

        match &chosen {
            Some(person) => counter.bump(person),
            None if slot.mandatory => {
                tracing::error!(
                    date = %slot.date,
                    slot = %slot.slot_type,
                    label = slot.slot_label.as_deref().unwrap_or("-"),
                    role = %slot.role,
                    "no eligible personnel for mandatory role"
                );
                return Err(SchedError::InsufficientPersonnel {
                    date: slot.date,
                    slot_type: slot.slot_type.clone(),
                    slot_label: slot.slot_label.clone(),
                    role: slot.role,
                });
            }
            None => {
                tracing::warn!(
                    date = %slot.date,
                    slot = %slot.slot_type,
                    role = %slot.role,
                    "optional role left unfilled"
                );
            }
        }

        records.push(AssignmentRecord {
            date: slot.date,
            slot_type: slot.slot_type.clone(),
            slot_label: slot.slot_label.clone(),
            role: slot.role,
            person_id: chosen,
            period,
            auto_generated: true,
            created_by: created_by.to_owned(),
        });
    }

    Ok(Outcome { records, loads })
}
