use crate::model::Role;
use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub const PRAYER_LABELS: [&str; 5] = ["Subuh", "Zohor", "Asar", "Maghrib", "Isyak"];

/// Jours où un type de créneau s'applique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayRule {
    EveryDay,
    /// Lundi à vendredi.
    Weekdays,
    Fridays,
}

impl DayRule {
    pub fn applies(&self, date: NaiveDate) -> bool {
        match self {
            DayRule::EveryDay => true,
            DayRule::Weekdays => !matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
            DayRule::Fridays => date.weekday() == Weekday::Fri,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRequirement {
    pub role: Role,
    #[serde(default = "default_mandatory")]
    pub mandatory: bool,
}

fn default_mandatory() -> bool {
    true
}

impl RoleRequirement {
    pub fn mandatory(role: Role) -> Self {
        Self {
            role,
            mandatory: true,
        }
    }
    pub fn optional(role: Role) -> Self {
        Self {
            role,
            mandatory: false,
        }
    }
}

/// Catégorie de tugas sur une date (ex. les cinq solat, une kuliah, le khutbah).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotType {
    pub key: String,
    /// Occurrences ordonnées ; vide = une seule occurrence sans libellé.
    #[serde(default)]
    pub labels: Vec<String>,
    pub days: DayRule,
    pub roles: Vec<RoleRequirement>,
}

impl SlotType {
    pub fn new<K: Into<String>>(key: K, days: DayRule, roles: Vec<RoleRequirement>) -> Self {
        Self {
            key: key.into(),
            labels: Vec::new(),
            days,
            roles,
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Libellés d'occurrence : `None` pour un créneau unique.
    pub fn occurrences(&self) -> Vec<Option<&str>> {
        if self.labels.is_empty() {
            vec![None]
        } else {
            self.labels.iter().map(|l| Some(l.as_str())).collect()
        }
    }

    /// Libellé comparé aux indisponibilités (la clé pour un créneau unique).
    pub fn match_label<'a>(&'a self, label: Option<&'a str>) -> &'a str {
        label.unwrap_or(&self.key)
    }

    fn validate(&self) -> Result<()> {
        if self.key.trim().is_empty() {
            bail!("slot type key cannot be empty");
        }
        if self.roles.is_empty() {
            bail!("slot type {} must require at least one role", self.key);
        }
        let mut seen = HashSet::new();
        for req in &self.roles {
            if !seen.insert(req.role) {
                bail!("slot type {} lists role {} twice", self.key, req.role);
            }
        }
        let mut labels = HashSet::new();
        for label in &self.labels {
            if label.trim().is_empty() {
                bail!("slot type {} has an empty label", self.key);
            }
            if !labels.insert(label.to_ascii_lowercase()) {
                bail!("slot type {} repeats label {label}", self.key);
            }
        }
        Ok(())
    }
}

/// Table de règles injectée dans le planificateur.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_week_start")]
    pub week_start: Weekday,
    pub slot_types: Vec<SlotType>,
}

fn default_week_start() -> Weekday {
    Weekday::Mon
}

impl RuleTable {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            bail!("rule table id cannot be empty");
        }
        if self.name.trim().is_empty() {
            bail!("rule table name cannot be empty");
        }
        if self.slot_types.is_empty() {
            bail!("rule table must contain at least one slot type");
        }
        let mut keys = HashSet::new();
        for slot in &self.slot_types {
            slot.validate()?;
            if !keys.insert(slot.key.as_str()) {
                bail!("rule table repeats slot type {}", slot.key);
            }
        }
        Ok(())
    }

    /// Rôles référencés, dans l'ordre de déclaration et sans doublon.
    pub fn roles(&self) -> Vec<Role> {
        let mut out = Vec::new();
        for req in self.slot_types.iter().flat_map(|s| s.roles.iter()) {
            if !out.contains(&req.role) {
                out.push(req.role);
            }
        }
        out
    }

    /// Jadual bulanan : solat fardu (imam + bilal) et khutbah Jumaat optionnel.
    pub fn monthly() -> Self {
        Self {
            id: "monthly".into(),
            name: "Jadual bulanan".into(),
            description: Some("Imam et bilal pour les cinq solat, khatib le vendredi".into()),
            week_start: Weekday::Mon,
            slot_types: vec![
                prayer_slot(),
                SlotType::new(
                    "khutbah",
                    DayRule::Fridays,
                    vec![RoleRequirement::optional(Role::FridayImam)],
                ),
            ],
        }
    }

    /// Jadual mingguan : solat, tadarus en semaine, kuliah quotidienne, Jumaat.
    pub fn weekly() -> Self {
        Self {
            id: "weekly".into(),
            name: "Jadual mingguan".into(),
            description: Some("Solat, tadarus, kuliah et Jumaat sur sept jours".into()),
            week_start: Weekday::Mon,
            slot_types: vec![
                prayer_slot(),
                SlotType::new(
                    "tadarus",
                    DayRule::Weekdays,
                    vec![RoleRequirement::optional(Role::WeekdayReciter)],
                ),
                SlotType::new(
                    "kuliah",
                    DayRule::EveryDay,
                    vec![RoleRequirement::optional(Role::DailyTutor)],
                ),
                SlotType::new(
                    "jumaat",
                    DayRule::Fridays,
                    vec![
                        RoleRequirement::optional(Role::FridayImam),
                        RoleRequirement::optional(Role::Caller),
                    ],
                ),
            ],
        }
    }

    pub fn preset(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "monthly" | "bulanan" => Ok(Self::monthly()),
            "weekly" | "mingguan" => Ok(Self::weekly()),
            other => bail!("unknown rule preset: {other}"),
        }
    }
}

fn prayer_slot() -> SlotType {
    SlotType::new(
        "solat",
        DayRule::EveryDay,
        vec![
            RoleRequirement::mandatory(Role::Imam),
            RoleRequirement::mandatory(Role::Bilal),
        ],
    )
    .with_labels(PRAYER_LABELS)
}

pub fn export_rules_json<P: AsRef<Path>>(path: P, rules: &RuleTable) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(rules)?;
    fs::write(path, json).with_context(|| format!("writing rules {}", path.display()))?;
    Ok(())
}

pub fn load_rules_from_file<P: AsRef<Path>>(path: P) -> Result<RuleTable> {
    let path = path.as_ref();
    let data = fs::read(path).with_context(|| format!("reading rules {}", path.display()))?;
    let rules: RuleTable = serde_json::from_slice(&data)
        .with_context(|| format!("parsing rules {}", path.display()))?;
    rules.validate()?;
    Ok(rules)
}
