#![forbid(unsafe_code)]
//! Giliran — génération des jadual de tugas d'une surau (imam, bilal, kuliah).
//!
//! - Planification des créneaux à partir d'une table de règles injectée.
//! - Rotation équitable : le candidat le moins chargé, départagé par identifiant.
//! - Tout ou rien : aucune ligne persistée si un rôle obligatoire reste vide.
//! - Stockage fichiers (JSON/CSV) pour la CLI ; annuaire et dépôt via traits.

pub mod io;
pub mod model;
pub mod report;
pub mod rules;
pub mod scheduler;
pub mod sources;
pub mod storage;

pub use model::{
    AssignmentRecord, Period, Person, PersonId, Registry, Role, UnavailabilityException,
};
pub use report::{LoadReport, ReportRenderer, TextReport};
pub use rules::{
    export_rules_json, load_rules_from_file, DayRule, RoleRequirement, RuleTable, SlotType,
};
pub use scheduler::{GenerateOptions, PlannedSlot, SchedError, Scheduler, Sources};
pub use sources::{AvailabilityStore, PersonnelDirectory};
pub use storage::{
    JsonScheduleRepository, JsonStorage, MemoryRepository, ScheduleRepository, StorageError,
};
