use super::types::{PlannedSlot, SchedError};
use crate::model::Period;
use crate::rules::RuleTable;
use chrono::NaiveDate;

/// Valide la période et renvoie ses bornes incluses.
pub(super) fn period_bounds(
    period: &Period,
    rules: &RuleTable,
) -> Result<(NaiveDate, NaiveDate), SchedError> {
    if let Period::Month { month, .. } = period {
        if !(1..=12).contains(month) {
            return Err(SchedError::InvalidPeriod(format!(
                "month must be within 1-12, got {month}"
            )));
        }
    }
    let (first, last) = period
        .bounds()
        .ok_or_else(|| SchedError::InvalidPeriod(format!("{period} is out of range")))?;
    if let Period::Week { start } = period {
        if period.start_weekday() != Some(rules.week_start) {
            return Err(SchedError::InvalidPeriod(format!(
                "weekly period must start on {:?}, {start} is a {:?}",
                rules.week_start,
                period.start_weekday().unwrap_or(rules.week_start)
            )));
        }
    }
    Ok((first, last))
}

/// Énumère les tuples à pourvoir : date croissante, puis créneau, libellé, rôle
/// dans l'ordre de déclaration de la table.
pub(super) fn plan(period: &Period, rules: &RuleTable) -> Result<Vec<PlannedSlot>, SchedError> {
    rules
        .validate()
        .map_err(|e| SchedError::InvalidRules(e.to_string()))?;
    let (first, last) = period_bounds(period, rules)?;

    let mut out = Vec::new();
    for date in first.iter_days().take_while(|d| *d <= last) {
        for slot in rules.slot_types.iter().filter(|s| s.days.applies(date)) {
            for label in slot.occurrences() {
                for req in &slot.roles {
                    out.push(PlannedSlot {
                        date,
                        slot_type: slot.key.clone(),
                        slot_label: label.map(str::to_owned),
                        match_label: slot.match_label(label).to_owned(),
                        role: req.role,
                        mandatory: req.mandatory,
                    });
                }
            }
        }
    }
    Ok(out)
}
