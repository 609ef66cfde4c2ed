use crate::model::{Person, Registry, Role, UnavailabilityException};
use chrono::NaiveDate;

/// Annuaire des personnels actifs.
pub trait PersonnelDirectory {
    /// Personnels actifs détenant `role`.
    fn active_by_role(&self, role: Role) -> anyhow::Result<Vec<Person>>;
}

/// Source des indisponibilités.
pub trait AvailabilityStore {
    /// Indisponibilités sur `[start, end]` (bornes incluses), filtrées par rôle si fourni.
    fn exceptions(
        &self,
        role: Option<Role>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<UnavailabilityException>>;
}

impl PersonnelDirectory for Registry {
    fn active_by_role(&self, role: Role) -> anyhow::Result<Vec<Person>> {
        Ok(self
            .people
            .iter()
            .filter(|p| p.active && p.holds(role))
            .cloned()
            .collect())
    }
}

impl AvailabilityStore for Registry {
    fn exceptions(
        &self,
        role: Option<Role>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<UnavailabilityException>> {
        Ok(self
            .exceptions
            .iter()
            .filter(|exc| start <= exc.date && exc.date <= end)
            .filter(|exc| match role {
                Some(role) => self
                    .find_person_by_id(&exc.person_id)
                    .map(|p| p.holds(role))
                    .unwrap_or(false),
                None => true,
            })
            .cloned()
            .collect())
    }
}
