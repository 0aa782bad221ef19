use atcdrill_engine::Settings;

use crate::logic::DrillPlan;

pub mod catalog;

use catalog::{CatalogEntry, catalog_entries};

/// A named drill plan the logic tester can run.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub key: &'static str,
    pub name: String,
    pub plan: DrillPlan,
}

impl TestScenario {
    fn from_entry(entry: &CatalogEntry, custom: Option<Settings>) -> Self {
        let settings = if entry.key == catalog::CUSTOM_KEY {
            custom.unwrap_or_default()
        } else {
            entry.settings
        };
        Self {
            key: entry.key,
            name: entry.name.to_string(),
            plan: (entry.build)(settings),
        }
    }
}

/// `(key, description)` for every scenario, in catalogue order.
#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    catalog_entries()
        .iter()
        .map(|entry| (entry.key, entry.description))
        .collect()
}

/// Keys that `all` expands to. `custom` is only run when asked for by name.
#[must_use]
pub fn default_scenario_keys() -> Vec<&'static str> {
    catalog_entries()
        .iter()
        .map(|entry| entry.key)
        .filter(|key| *key != catalog::CUSTOM_KEY)
        .collect()
}

/// Look up a scenario by key, case-insensitively. `custom` takes its
/// settings from `custom`, or the full default ranges when none are given.
#[must_use]
pub fn get_scenario(key: &str, custom: Option<Settings>) -> Option<TestScenario> {
    let wanted = key.trim().to_ascii_lowercase();
    catalog_entries()
        .iter()
        .find(|entry| entry.key == wanted)
        .map(|entry| TestScenario::from_entry(entry, custom))
}
