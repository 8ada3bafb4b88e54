//! Loads the scenario or scenarios a run will execute: a single JSON/YAML
//! configuration, or a `.csv` scenario table describing several variants to
//! run and aggregate together (spec §6 "Scenario table").

use std::path::Path;

use anyhow::{Context, Result};
use border_world::ScenarioConfig;

/// One scenario variant plus the label the orchestrator reports it under:
/// the row index within its scenario table, or "default" for a
/// single-scenario file.
pub struct ScenarioVariant {
    pub label: String,
    pub config: ScenarioConfig,
}

/// Loads the scenario variant(s) a `--config-file` names. `.csv` is read as
/// a scenario table (each row an independent variant); any other extension
/// is read as a single JSON/YAML scenario.
pub fn load_scenarios(path: &Path, strict_input: bool) -> Result<Vec<ScenarioVariant>> {
    let is_csv = path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        let outcome = border_world::load_scenario_table(path, strict_input)
            .with_context(|| format!("loading scenario table {}", path.display()))?;
        for diagnostic in &outcome.diagnostics {
            tracing::warn!(message = %diagnostic.message, "scenario table row skipped");
        }
        Ok(outcome
            .scenarios
            .into_iter()
            .enumerate()
            .map(|(index, config)| ScenarioVariant { label: format!("row {index}"), config })
            .collect())
    } else {
        let config = border_world::load_config_file(path)
            .with_context(|| format!("loading scenario file {}", path.display()))?;
        Ok(vec![ScenarioVariant { label: "default".to_string(), config }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn minimal_scenario_json() -> &'static str {
        r#"{
            "consignment": {
                "boxes_min": 1, "boxes_max": 2,
                "items_per_box_min": 4, "items_per_box_max": 4,
                "commodities": ["apples"], "origins": ["mexico"],
                "ports": ["laredo"], "pathways": ["maritime"],
                "date_start": "2024-01-01", "date_end": "2024-01-31"
            },
            "contamination": {"unit": "item", "rate": {"type": "fixed", "value": 0.1}, "arrangement": {"type": "random"}},
            "inspection": {
                "unit": "item", "within_box_proportion": 1.0, "tolerance_level": 0,
                "sample_strategy": {"type": "proportion", "p": 0.1},
                "selection_strategy": {"type": "random"},
                "min_boxes": 1, "effectiveness": 1.0
            }
        }"#
    }

    #[test]
    fn loads_single_json_scenario() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        file.write_all(minimal_scenario_json().as_bytes()).unwrap();
        let variants = load_scenarios(file.path(), true).unwrap();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].label, "default");
    }

    #[test]
    fn scenario_table_rows_missing_fields_fail_under_strict_input() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "consignment/boxes_min,consignment/boxes_max").unwrap();
        writeln!(file, "1,2").unwrap();
        writeln!(file, "3,4").unwrap();
        let result = load_scenarios(file.path(), true);
        assert!(result.is_err());
    }

    #[test]
    fn scenario_table_rows_missing_fields_are_skipped_when_not_strict() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "consignment/boxes_min,consignment/boxes_max").unwrap();
        writeln!(file, "1,2").unwrap();
        writeln!(file, "3,4").unwrap();
        let variants = load_scenarios(file.path(), false).unwrap();
        assert!(variants.is_empty());
    }

    #[test]
    fn unknown_extension_is_treated_as_a_single_config_file() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        let yaml = r"
consignment:
  boxes_min: 1
  boxes_max: 2
  items_per_box_min: 4
  items_per_box_max: 4
  commodities: [apples]
  origins: [mexico]
  ports: [laredo]
  pathways: [maritime]
  date_start: 2024-01-01
  date_end: 2024-01-31
contamination:
  unit: item
  rate: {type: fixed, value: 0.1}
  arrangement: {type: random}
inspection:
  unit: item
  within_box_proportion: 1.0
  tolerance_level: 0
  sample_strategy: {type: proportion, p: 0.1}
  selection_strategy: {type: random}
  min_boxes: 1
  effectiveness: 1.0
";
        file.write_all(yaml.as_bytes()).unwrap();
        let variants = load_scenarios(file.path(), true).unwrap();
        assert_eq!(variants.len(), 1);
    }
}
