use crate::model::{AssignmentRecord, Period, Registry, Role};
use anyhow::Context;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StorageError {
    #[error("record already exists for {role} {slot_type}{} on {date}; delete the period first", crate::model::label_suffix(.slot_label.as_deref()))]
    DuplicateRecord {
        date: NaiveDate,
        slot_type: String,
        slot_label: Option<String>,
        role: Role,
    },
}

/// Destination des lignes générées.
pub trait ScheduleRepository {
    /// Supprime toutes les lignes de `period`.
    fn delete_for_period(&mut self, period: &Period) -> anyhow::Result<()>;
    /// Insère toutes les lignes ou aucune.
    fn bulk_insert(&mut self, records: &[AssignmentRecord]) -> anyhow::Result<()>;
    /// Remplace les lignes de `period` par `records`.
    fn replace_for_period(
        &mut self,
        period: &Period,
        records: &[AssignmentRecord],
    ) -> anyhow::Result<()> {
        self.delete_for_period(period)?;
        self.bulk_insert(records)
    }
}

/// Vérifie qu'aucune clé (date, créneau, libellé, rôle) n'est déjà prise.
fn check_duplicates(
    existing: &[AssignmentRecord],
    incoming: &[AssignmentRecord],
) -> Result<(), StorageError> {
    let mut keys: HashSet<_> = existing.iter().map(AssignmentRecord::key).collect();
    for rec in incoming {
        if !keys.insert(rec.key()) {
            return Err(StorageError::DuplicateRecord {
                date: rec.date,
                slot_type: rec.slot_type.clone(),
                slot_label: rec.slot_label.clone(),
                role: rec.role,
            });
        }
    }
    Ok(())
}

/// Dépôt en mémoire (tests, intégrations).
#[derive(Debug, Default, Clone)]
pub struct MemoryRepository {
    records: Vec<AssignmentRecord>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn records(&self) -> &[AssignmentRecord] {
        &self.records
    }
}

impl ScheduleRepository for MemoryRepository {
    fn delete_for_period(&mut self, period: &Period) -> anyhow::Result<()> {
        self.records.retain(|r| &r.period != period);
        Ok(())
    }

    fn bulk_insert(&mut self, records: &[AssignmentRecord]) -> anyhow::Result<()> {
        check_duplicates(&self.records, records)?;
        self.records.extend_from_slice(records);
        Ok(())
    }

    fn replace_for_period(
        &mut self,
        period: &Period,
        records: &[AssignmentRecord],
    ) -> anyhow::Result<()> {
        let mut kept: Vec<_> = self
            .records
            .iter()
            .filter(|r| &r.period != period)
            .cloned()
            .collect();
        check_duplicates(&kept, records)?;
        kept.extend_from_slice(records);
        self.records = kept;
        Ok(())
    }
}

/// Fichier JSON générique, écrit de manière atomique.
pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Ok(Self {
            path: path.as_ref().to_path_buf(),
        })
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let data =
            fs::read(&self.path).with_context(|| format!("reading {}", self.path.display()))?;
        serde_json::from_slice(&data).with_context(|| format!("parsing {}", self.path.display()))
    }

    /// Charge le contenu, ou la valeur par défaut si le fichier n'existe pas encore.
    pub fn load_or_default<T: DeserializeOwned + Default>(&self) -> anyhow::Result<T> {
        if self.exists() {
            self.load()
        } else {
            Ok(T::default())
        }
    }

    pub fn save<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(value)?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).with_context(|| "creating temp file")?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).with_context(|| "atomic rename")?;
        Ok(())
    }

    pub fn load_registry(&self) -> anyhow::Result<Registry> {
        self.load_or_default()
    }

    pub fn save_registry(&self, registry: &Registry) -> anyhow::Result<()> {
        self.save(registry)
    }
}

/// Dépôt de jadual adossé à un fichier JSON (liste de lignes).
pub struct JsonScheduleRepository {
    storage: JsonStorage,
}

impl JsonScheduleRepository {
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Ok(Self {
            storage: JsonStorage::open(path)?,
        })
    }

    pub fn records(&self) -> anyhow::Result<Vec<AssignmentRecord>> {
        self.storage.load_or_default()
    }

    pub fn records_for(&self, period: &Period) -> anyhow::Result<Vec<AssignmentRecord>> {
        let mut records = self.records()?;
        records.retain(|r| &r.period == period);
        Ok(records)
    }
}

impl ScheduleRepository for JsonScheduleRepository {
    fn delete_for_period(&mut self, period: &Period) -> anyhow::Result<()> {
        let mut records = self.records()?;
        records.retain(|r| &r.period != period);
        self.storage.save(&records)
    }

    fn bulk_insert(&mut self, incoming: &[AssignmentRecord]) -> anyhow::Result<()> {
        let mut records = self.records()?;
        check_duplicates(&records, incoming)?;
        records.extend_from_slice(incoming);
        self.storage.save(&records)
    }

    /// Une seule écriture : le fichier garde l'ancien jadual si l'insertion échoue.
    fn replace_for_period(
        &mut self,
        period: &Period,
        incoming: &[AssignmentRecord],
    ) -> anyhow::Result<()> {
        let mut records = self.records()?;
        records.retain(|r| &r.period != period);
        check_duplicates(&records, incoming)?;
        records.extend_from_slice(incoming);
        self.storage.save(&records)
    }
}
