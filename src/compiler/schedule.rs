//! Fuzzy schedules.
//!
//! `schedule: daily` (also `hourly`, `weekly`) compiles to a concrete cron
//! expression whose minute, hour and weekday are derived from a hash of the
//! workflow identifier. Workflows sharing a repository therefore spread out
//! over the day, and one workflow always gets the same slot.

use crate::error::{CompileError, Result};
use serde_yaml::{Mapping, Value};
use xxhash_rust::xxh3::xxh3_64;

/// Fuzzy schedule keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuzzySchedule {
    Hourly,
    Daily,
    Weekly,
}

impl FuzzySchedule {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "hourly" => Some(FuzzySchedule::Hourly),
            "daily" => Some(FuzzySchedule::Daily),
            "weekly" => Some(FuzzySchedule::Weekly),
            _ => None,
        }
    }

    /// The cron expression for `workflow_id`.
    pub fn cron(self, workflow_id: &str) -> String {
        let hash = xxh3_64(workflow_id.as_bytes());
        let minute = hash % 60;
        let hour = (hash / 60) % 24;
        let weekday = (hash / (60 * 24)) % 7;
        match self {
            FuzzySchedule::Hourly => format!("{} * * * *", minute),
            FuzzySchedule::Daily => format!("{} {} * * *", minute, hour),
            FuzzySchedule::Weekly => format!("{} {} * * {}", minute, hour, weekday),
        }
    }
}

/// Rewrite `on.schedule` in place, expanding fuzzy entries.
///
/// Accepted shapes: `schedule: daily`, `schedule: [daily]` and
/// `schedule: [{cron: daily}]`. Concrete cron strings pass through.
pub fn expand(on: &mut Value, workflow_id: &str) -> Result<()> {
    let Some(schedule) = on.get_mut("schedule") else {
        return Ok(());
    };

    let entries: Vec<Value> = match schedule {
        Value::String(text) => vec![Value::String(text.clone())],
        Value::Sequence(items) => items.clone(),
        _ => {
            return Err(CompileError::configuration(
                "on.schedule must be a string or a list of cron entries",
            ));
        }
    };

    let expanded = entries
        .iter()
        .map(|entry| {
            let cron = match entry {
                Value::String(text) => text.as_str(),
                Value::Mapping(_) => entry.get("cron").and_then(Value::as_str).ok_or_else(|| {
                    CompileError::configuration("each on.schedule entry needs a 'cron' string")
                })?,
                _ => {
                    return Err(CompileError::configuration(
                        "each on.schedule entry needs a 'cron' string",
                    ));
                }
            };
            let cron = match FuzzySchedule::parse(cron) {
                Some(fuzzy) => fuzzy.cron(workflow_id),
                None => cron.to_string(),
            };
            let mut mapping = Mapping::new();
            mapping.insert(Value::from("cron"), Value::from(cron));
            Ok(Value::Mapping(mapping))
        })
        .collect::<Result<Vec<_>>>()?;

    *schedule = Value::Sequence(expanded);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn crons(on: &Value) -> Vec<String> {
        on["schedule"]
            .as_sequence()
            .unwrap()
            .iter()
            .map(|entry| entry["cron"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_daily_is_stable_per_workflow() {
        let mut a = on("schedule: daily");
        let mut b = on("schedule: daily");
        expand(&mut a, "triage").unwrap();
        expand(&mut b, "triage").unwrap();
        assert_eq!(a, b);

        let fields: Vec<String> = crons(&a)[0].split(' ').map(str::to_string).collect();
        assert_eq!(fields.len(), 5);
        assert!(fields[0].parse::<u32>().unwrap() < 60);
        assert!(fields[1].parse::<u32>().unwrap() < 24);
        assert_eq!(&fields[2..], ["*", "*", "*"]);
    }

    #[test]
    fn test_workflow_id_changes_slot() {
        let ids = ["alpha", "beta", "gamma", "delta", "epsilon"];
        let slots: std::collections::BTreeSet<String> =
            ids.iter().map(|id| FuzzySchedule::Daily.cron(id)).collect();
        assert!(slots.len() > 1);
    }

    #[test]
    fn test_hourly_and_weekly_shapes() {
        let hourly = FuzzySchedule::Hourly.cron("x");
        assert!(hourly.ends_with(" * * * *"));
        let weekly = FuzzySchedule::Weekly.cron("x");
        let weekday: u32 = weekly.rsplit(' ').next().unwrap().parse().unwrap();
        assert!(weekday < 7);
    }

    #[test]
    fn test_concrete_cron_passes_through() {
        let mut value = on("schedule:\n  - cron: \"0 9 * * 1\"\n  - cron: weekly\n");
        expand(&mut value, "wf").unwrap();
        let crons = crons(&value);
        assert_eq!(crons[0], "0 9 * * 1");
        assert_eq!(crons[1], FuzzySchedule::Weekly.cron("wf"));
    }

    #[test]
    fn test_no_schedule_is_untouched() {
        let mut value = on("push:\n  branches: [main]\n");
        let before = value.clone();
        expand(&mut value, "wf").unwrap();
        assert_eq!(value, before);
    }

    #[test]
    fn test_invalid_entry_fails() {
        let mut value = on("schedule:\n  - at: noon\n");
        assert!(expand(&mut value, "wf").is_err());
    }
}
