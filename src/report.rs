use crate::model::{AssignmentRecord, Period, PersonId, Role};
use std::collections::BTreeMap;

/// Charge par rôle reconstruite depuis les lignes d'un jadual.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub period: Option<Period>,
    pub total: usize,
    pub unfilled: usize,
    pub loads: BTreeMap<Role, BTreeMap<PersonId, u32>>,
}

impl LoadReport {
    pub fn from_records(records: &[AssignmentRecord]) -> Self {
        let mut report = LoadReport {
            period: records.first().map(|r| r.period),
            total: records.len(),
            ..Default::default()
        };
        for rec in records {
            let per_role = report.loads.entry(rec.role).or_default();
            match &rec.person_id {
                Some(id) => *per_role.entry(id.clone()).or_insert(0) += 1,
                None => report.unfilled += 1,
            }
        }
        report
    }

    pub fn load_of(&self, role: Role, person: &PersonId) -> u32 {
        self.loads
            .get(&role)
            .and_then(|m| m.get(person))
            .copied()
            .unwrap_or(0)
    }

    /// Écart max - min parmi les personnes ayant reçu au moins une affectation.
    pub fn spread(&self, role: Role) -> Option<u32> {
        let counts = self.loads.get(&role)?;
        let max = counts.values().max()?;
        let min = counts.values().min()?;
        Some(max - min)
    }

    /// `imam: a=2 b=1` (personnes par identifiant croissant).
    pub fn role_line(&self, role: Role) -> Option<String> {
        let counts = self.loads.get(&role)?;
        let mut buf = itoa::Buffer::new();
        let mut line = String::from(role.as_str());
        line.push(':');
        for (id, n) in counts {
            line.push(' ');
            line.push_str(id.as_str());
            line.push('=');
            line.push_str(buf.format(*n));
        }
        Some(line)
    }
}

/// Permet de customiser le rendu du rapport (texte, tableau, etc.).
pub trait ReportRenderer {
    fn render(&self, report: &LoadReport) -> String;
}

/// Rendu texte brut, une ligne par rôle.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextReport;

impl ReportRenderer for TextReport {
    fn render(&self, report: &LoadReport) -> String {
        let mut buf = itoa::Buffer::new();
        let mut out = String::new();
        match &report.period {
            Some(period) => out.push_str(&format!("Jadual {period}")),
            None => out.push_str("Jadual (empty)"),
        }
        out.push_str(" | slots: ");
        out.push_str(buf.format(report.total));
        out.push_str(" | unfilled: ");
        out.push_str(buf.format(report.unfilled));
        out.push('\n');
        for role in report.loads.keys() {
            if let Some(line) = report.role_line(*role) {
                out.push_str(&line);
                out.push('\n');
            }
        }
        out
    }
}
