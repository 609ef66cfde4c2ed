use crate::model::{AssignmentRecord, Person, PersonId, Registry, Role, UnavailabilityException};
use anyhow::{bail, Context};
use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Import de personnels depuis CSV: header `id,name[,active][,roles]`, rôles séparés par `;`
pub fn import_people_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Person>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let id = rec.get(0).context("missing id")?.trim();
        let name = rec.get(1).context("missing name")?.trim();
        if id.is_empty() || name.is_empty() {
            bail!("invalid people row (empty)");
        }
        let mut person = Person::with_id(id, name, Vec::<Role>::new());
        if let Some(flag) = rec.get(2) {
            let flag = flag.trim();
            if !flag.is_empty() {
                person.active = parse_bool(flag)
                    .with_context(|| format!("invalid active value for {id}"))?;
            }
        }
        if let Some(roles) = rec.get(3) {
            person.roles =
                parse_roles(roles).with_context(|| format!("invalid roles value for {id}"))?;
        }
        out.push(person);
    }
    Ok(out)
}

fn parse_bool(s: &str) -> anyhow::Result<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "ya" => Ok(true),
        "false" | "0" | "no" | "n" | "tidak" => Ok(false),
        _ => bail!("expected boolean"),
    }
}

fn parse_roles(raw: &str) -> anyhow::Result<BTreeSet<Role>> {
    raw.split(';')
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| chunk.parse::<Role>().map_err(anyhow::Error::msg))
        .collect()
}

/// Import d'indisponibilités: header `person_id,date,slot_label` (date `YYYY-MM-DD`)
pub fn import_exceptions_csv<P: AsRef<Path>>(
    path: P,
) -> anyhow::Result<Vec<UnavailabilityException>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let person = rec.get(0).context("missing person_id")?.trim();
        let date = rec.get(1).context("missing date")?.trim();
        let label = rec.get(2).context("missing slot_label")?.trim();
        if person.is_empty() || label.is_empty() {
            bail!("invalid exception row (empty)");
        }
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("invalid date: {date}"))?;
        out.push(UnavailabilityException::new(
            PersonId::new(person),
            date,
            label,
        ));
    }
    Ok(out)
}

/// Export JSON des lignes (jolie mise en forme)
pub fn export_records_json<P: AsRef<Path>>(
    path: P,
    records: &[AssignmentRecord],
) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(records)?;
    fs::write(path, s)?;
    Ok(())
}

/// Export CSV: header `date,slot_type,slot_label,role,person_id,person_name,period,created_by`
pub fn export_records_csv<P: AsRef<Path>>(
    path: P,
    records: &[AssignmentRecord],
    registry: &Registry,
) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record([
        "date",
        "slot_type",
        "slot_label",
        "role",
        "person_id",
        "person_name",
        "period",
        "created_by",
    ])?;
    for r in records {
        let person_id = r.person_id.as_ref().map(PersonId::as_str).unwrap_or("");
        let person_name = r
            .person_id
            .as_ref()
            .and_then(|pid| registry.find_person_by_id(pid))
            .map(|p| p.name.as_str())
            .unwrap_or("");
        let date = r.date.to_string();
        let period = r.period.to_string();
        w.write_record([
            date.as_str(),
            r.slot_type.as_str(),
            r.slot_label.as_deref().unwrap_or(""),
            r.role.as_str(),
            person_id,
            person_name,
            period.as_str(),
            r.created_by.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}
