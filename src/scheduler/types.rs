use crate::model::{Period, Role};
use chrono::NaiveDate;
use thiserror::Error;

/// Options de génération
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Consulte les indisponibilités avant de choisir un candidat.
    pub check_availability: bool,
}

impl GenerateOptions {
    /// Comportement historique du jadual bulanan : indisponibilités ignorées.
    pub fn monthly() -> Self {
        Self {
            check_availability: false,
        }
    }

    pub fn weekly() -> Self {
        Self {
            check_availability: true,
        }
    }

    pub fn for_period(period: &Period) -> Self {
        if period.is_weekly() {
            Self::weekly()
        } else {
            Self::monthly()
        }
    }
}

/// Tuple à pourvoir : (date, créneau, libellé, rôle, obligatoire).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSlot {
    pub date: NaiveDate,
    pub slot_type: String,
    pub slot_label: Option<String>,
    /// Libellé comparé aux indisponibilités.
    pub match_label: String,
    pub role: Role,
    pub mandatory: bool,
}

impl PlannedSlot {
    pub(super) fn same_occurrence(&self, other: &PlannedSlot) -> bool {
        self.date == other.date
            && self.slot_type == other.slot_type
            && self.slot_label == other.slot_label
    }
}

#[derive(Error, Debug)]
pub enum SchedError {
    #[error("invalid period: {0}")]
    InvalidPeriod(String),
    #[error("invalid rules: {0}")]
    InvalidRules(String),
    #[error("no eligible {role} for {slot_type}{} on {date}", crate::model::label_suffix(.slot_label.as_deref()))]
    InsufficientPersonnel {
        date: NaiveDate,
        slot_type: String,
        slot_label: Option<String>,
        role: Role,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
