use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifiant fort pour Person
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersonId(String);

impl PersonId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rôle de tugas. L'ordre de déclaration sert d'ordre stable pour les compteurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Imam,
    Bilal,
    Caller,
    WeekdayReciter,
    DailyTutor,
    FridayImam,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Imam,
        Role::Bilal,
        Role::Caller,
        Role::WeekdayReciter,
        Role::DailyTutor,
        Role::FridayImam,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Imam => "imam",
            Role::Bilal => "bilal",
            Role::Caller => "caller",
            Role::WeekdayReciter => "weekday-reciter",
            Role::DailyTutor => "daily-tutor",
            Role::FridayImam => "friday-imam",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == wanted)
            .ok_or_else(|| format!("unknown role: {s}"))
    }
}

/// Personne inscrite au jadual (snapshot lu depuis l'annuaire, jamais modifié ici).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub roles: BTreeSet<Role>,
}

fn default_active() -> bool {
    true
}

impl Person {
    pub fn new<N: Into<String>>(name: N, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            id: PersonId::random(),
            name: name.into(),
            active: true,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn with_id<I: AsRef<str>, N: Into<String>>(
        id: I,
        name: N,
        roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        Self {
            id: PersonId::new(id),
            ..Self::new(name, roles)
        }
    }

    pub fn holds(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Indisponibilité ponctuelle : une personne, une date, un créneau précis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailabilityException {
    pub person_id: PersonId,
    pub date: NaiveDate,
    pub slot_label: String,
}

impl UnavailabilityException {
    pub fn new<L: Into<String>>(person_id: PersonId, date: NaiveDate, slot_label: L) -> Self {
        Self {
            person_id,
            date,
            slot_label: slot_label.into(),
        }
    }

    /// Le libellé est comparé sans tenir compte de la casse ("subuh" == "Subuh").
    pub fn blocks(&self, person: &PersonId, date: NaiveDate, label: &str) -> bool {
        &self.person_id == person
            && self.date == date
            && self.slot_label.trim().eq_ignore_ascii_case(label)
    }
}

/// Période couverte par une génération : un mois civil ou une fenêtre de 7 jours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Period {
    Month { year: i32, month: u32 },
    Week { start: NaiveDate },
}

impl Period {
    pub fn month(year: i32, month: u32) -> Self {
        Period::Month { year, month }
    }

    pub fn week(start: NaiveDate) -> Self {
        Period::Week { start }
    }

    /// Parse `YYYY-MM`.
    pub fn parse_month(raw: &str) -> Result<Self, String> {
        let (y, m) = raw
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got {raw}"))?;
        let year = y.parse().map_err(|_| format!("invalid year in {raw}"))?;
        let month = m.parse().map_err(|_| format!("invalid month in {raw}"))?;
        Ok(Period::Month { year, month })
    }

    /// Parse `YYYY-MM-DD` (premier jour de la semaine).
    pub fn parse_week(raw: &str) -> Result<Self, String> {
        let start = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|e| format!("invalid week start {raw}: {e}"))?;
        Ok(Period::Week { start })
    }

    /// Premier et dernier jour inclus. `None` si la période est malformée.
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        match *self {
            Period::Month { year, month } => {
                let first = NaiveDate::from_ymd_opt(year, month, 1)?;
                let next = if month == 12 {
                    NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
                } else {
                    NaiveDate::from_ymd_opt(year, month + 1, 1)?
                };
                Some((first, next.pred_opt()?))
            }
            Period::Week { start } => {
                let last = start.checked_add_days(chrono::Days::new(6))?;
                Some((start, last))
            }
        }
    }

    pub fn is_weekly(&self) -> bool {
        matches!(self, Period::Week { .. })
    }

    pub fn start_weekday(&self) -> Option<Weekday> {
        self.bounds().map(|(first, _)| first.weekday())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Month { year, month } => write!(f, "{year:04}-{month:02}"),
            Period::Week { start } => write!(f, "week of {start}"),
        }
    }
}

/// Ligne de jadual produite par le moteur. `person_id = None` : rôle optionnel non pourvu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub date: NaiveDate,
    pub slot_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_label: Option<String>,
    pub role: Role,
    pub person_id: Option<PersonId>,
    pub period: Period,
    pub auto_generated: bool,
    pub created_by: String,
}

impl AssignmentRecord {
    /// Clé d'unicité (date, type de créneau, libellé, rôle).
    pub fn key(&self) -> (NaiveDate, &str, Option<&str>, Role) {
        (
            self.date,
            self.slot_type.as_str(),
            self.slot_label.as_deref(),
            self.role,
        )
    }

    pub fn is_unfilled(&self) -> bool {
        self.person_id.is_none()
    }
}

/// Suffixe " (Libellé)" pour les messages d'erreur.
pub(crate) fn label_suffix(label: Option<&str>) -> String {
    label
        .map(|l| format!(" ({l})"))
        .unwrap_or_default()
}

/// Snapshot local des personnels et indisponibilités (fichier registry.json).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Registry {
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(default)]
    pub exceptions: Vec<UnavailabilityException>,
}

impl Registry {
    pub fn find_person_by_id<'a>(&'a self, id: &PersonId) -> Option<&'a Person> {
        self.people.iter().find(|p| &p.id == id)
    }

    /// Remplace une personne de même identifiant, sinon l'ajoute.
    pub fn upsert_people(&mut self, people: Vec<Person>) {
        for person in people {
            match self.people.iter_mut().find(|p| p.id == person.id) {
                Some(slot) => *slot = person,
                None => self.people.push(person),
            }
        }
    }

    pub fn add_exceptions(&mut self, exceptions: Vec<UnavailabilityException>) {
        for exc in exceptions {
            if !self.exceptions.contains(&exc) {
                self.exceptions.push(exc);
            }
        }
    }
}
