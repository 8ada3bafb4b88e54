//! Configuration loading (spec §6): JSON, YAML, and a tabular scenario-table
//! format where nested keys become slash-joined column names
//! (`a/b/c`). Value parsing recognizes integers, floats, booleans, ISO-8601
//! dates, and JSON-encoded nested literals, following the teacher's
//! `apply_overrides`-style dotted-key walker generalized to an untyped tree.

use std::path::Path;

use border_core::{
    ComplianceLevel, ConfigError, ContaminationConfig, Diagnostic, DiagnosticKind, DynamicSkipLotConfig,
    FixedSkipLotConfig, GroupKey, InspectionConfig, NaiveCfrpConfig, ScheduledCfrpConfig,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::generator::GeneratorParams;
use crate::pretty::PrettyConfig;

/// A `FixedSkipLotConfig`'s compliance table as it appears in a config file —
/// `HashMap<GroupKey, ComplianceLevel>` isn't representable as a JSON/YAML
/// object key (non-string map keys), so the file format uses a row list and
/// this type converts it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedSkipLotRow {
    pub key: GroupKey,
    pub sampling_fraction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedSkipLotFile {
    pub group_by: Vec<String>,
    #[serde(default)]
    pub table: Vec<FixedSkipLotRow>,
    pub default_level: ComplianceLevel,
}

impl FixedSkipLotFile {
    #[must_use]
    pub fn into_config(self) -> FixedSkipLotConfig {
        let table = self
            .table
            .into_iter()
            .map(|row| (row.key, ComplianceLevel { sampling_fraction: row.sampling_fraction }))
            .collect();
        FixedSkipLotConfig { group_by: self.group_by, table, default_level: self.default_level }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReleaseProgramFile {
    NaiveCfrp(NaiveCfrpConfig),
    ScheduledCfrp(ScheduledCfrpConfig),
    FixedSkipLot(FixedSkipLotFile),
    DynamicSkipLot(DynamicSkipLotConfig),
}

/// A resolved release-program configuration, ready for dispatch by the
/// orchestrator (spec §9: "prefer explicit dispatch over virtual tables").
#[derive(Debug, Clone)]
pub enum ReleaseProgram {
    NaiveCfrp(NaiveCfrpConfig),
    ScheduledCfrp(ScheduledCfrpConfig),
    FixedSkipLot(FixedSkipLotConfig),
    DynamicSkipLot(DynamicSkipLotConfig),
}

impl From<ReleaseProgramFile> for ReleaseProgram {
    fn from(file: ReleaseProgramFile) -> Self {
        match file {
            ReleaseProgramFile::NaiveCfrp(c) => ReleaseProgram::NaiveCfrp(c),
            ReleaseProgramFile::ScheduledCfrp(c) => ReleaseProgram::ScheduledCfrp(c),
            ReleaseProgramFile::FixedSkipLot(f) => ReleaseProgram::FixedSkipLot(f.into_config()),
            ReleaseProgramFile::DynamicSkipLot(c) => ReleaseProgram::DynamicSkipLot(c),
        }
    }
}

/// The normalized top-level configuration tree (spec §6): `consignment`,
/// `contamination`, `inspection`, optional `release_programs`, optional
/// `pretty`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub consignment: GeneratorParams,
    pub contamination: ContaminationConfig,
    pub inspection: InspectionConfig,
    #[serde(default)]
    pub release_programs: Vec<ReleaseProgramFile>,
    #[serde(default)]
    pub pretty: Option<PrettyConfig>,
}

impl ScenarioConfig {
    #[must_use]
    pub fn release_programs(&self) -> Vec<ReleaseProgram> {
        self.release_programs.iter().cloned().map(ReleaseProgram::from).collect()
    }

    /// Rejects a structurally invalid scenario before any consignment is
    /// processed (spec §7: configuration errors are fatal and pre-run). The
    /// orchestrator calls this once per loaded scenario variant, ahead of
    /// the simulation fan-out, so a bad config aborts the whole run instead
    /// of failing silently on every consignment it touches.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.consignment.validate()?;
        border_core::contamination::validate(&self.contamination)?;
        border_core::inspection::validate(&self.inspection)?;
        Ok(())
    }
}

/// Loads a `ScenarioConfig` from a `.json` or `.yaml`/`.yml` file. The format
/// is chosen by file extension; anything else is tried as JSON first, then
/// YAML, matching how the teacher's scenario loader stays format-agnostic.
pub fn load_config_file(path: &Path) -> Result<ScenarioConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::config(path.display().to_string(), format!("reading config file: {e}")))?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "yaml" | "yml" => serde_yaml::from_str(&text)
            .map_err(|e| ConfigError::config(path.display().to_string(), format!("parsing YAML: {e}"))),
        _ => serde_json::from_str(&text)
            .or_else(|_| serde_yaml::from_str(&text))
            .map_err(|e| ConfigError::config(path.display().to_string(), format!("parsing config: {e}"))),
    }
}

/// Parses one tabular scenario-table cell into a JSON value: integers,
/// floats, booleans, ISO-8601 dates (kept as strings — the target field's
/// `Deserialize` impl for `NaiveDate` parses them), JSON-encoded literals
/// (objects/arrays/quoted strings), falling back to a bare string.
#[must_use]
pub fn parse_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return Value::from(f);
    }
    match trimmed {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if (trimmed.starts_with('{') && trimmed.ends_with('}')) || (trimmed.starts_with('[') && trimmed.ends_with(']')) {
        if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
            return v;
        }
    }
    Value::String(trimmed.to_string())
}

/// Sets `tree[path]` where `path` is a `/`-separated key path, creating
/// intermediate objects as needed (the tabular scenario-table walker, spec §6).
pub fn set_path(tree: &mut Value, path: &str, value: Value) -> Result<(), ConfigError> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(ConfigError::config(path, "empty override path"));
    }
    let mut cursor = tree;
    for segment in &segments[..segments.len() - 1] {
        if !cursor.is_object() {
            *cursor = Value::Object(serde_json::Map::new());
        }
        cursor = cursor
            .as_object_mut()
            .expect("just ensured object")
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }
    if !cursor.is_object() {
        *cursor = Value::Object(serde_json::Map::new());
    }
    cursor
        .as_object_mut()
        .expect("just ensured object")
        .insert((*segments.last().expect("non-empty")).to_string(), value);
    Ok(())
}

/// Applies a row of slash-path scenario-table overrides onto a base config
/// tree, then validates the result by attempting to deserialize it into a
/// `ScenarioConfig` — unknown enumerated values surface as a configuration
/// error (spec §7) through serde's ordinary "unknown variant" rejection.
pub fn apply_overrides_and_validate(
    base: &Value,
    overrides: &[(String, String)],
) -> Result<ScenarioConfig, ConfigError> {
    let mut tree = base.clone();
    for (path, raw_value) in overrides {
        set_path(&mut tree, path, parse_cell(raw_value))?;
    }
    serde_json::from_value(tree).map_err(|e| ConfigError::config("scenario_table", e.to_string()))
}

/// Outcome of loading a scenario table: the rows that parsed, plus a
/// diagnostic for each row skipped under non-strict input handling.
#[derive(Debug, Default)]
pub struct ScenarioTableOutcome {
    pub scenarios: Vec<ScenarioConfig>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Loads a scenario table (spec §6): a CSV whose header row is slash-joined
/// column paths and whose data rows are scenario variants, each validated
/// independently against an empty base tree. One file may describe several
/// variants the orchestrator runs and aggregates together.
///
/// `strict_input` controls row-error handling the same way it does for the
/// F280/AQIM readers (spec §7): abort on the first malformed row, or skip it
/// with a recorded diagnostic and keep going.
pub fn load_scenario_table(path: &Path, strict_input: bool) -> Result<ScenarioTableOutcome, ConfigError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| ConfigError::config(path.display().to_string(), format!("opening scenario table: {e}")))?;
    let headers = reader
        .headers()
        .map_err(|e| ConfigError::config(path.display().to_string(), format!("reading scenario table header: {e}")))?
        .clone();

    let mut outcome = ScenarioTableOutcome::default();
    for (row_index, record) in reader.records().enumerate() {
        let row_label = format!("{}:row {}", path.display(), row_index + 2);
        let parsed = record
            .map_err(|e| ConfigError::data(row_label.clone(), format!("malformed row: {e}")))
            .and_then(|record| {
                let overrides: Vec<(String, String)> =
                    headers.iter().zip(record.iter()).map(|(h, v)| (h.to_string(), v.to_string())).collect();
                apply_overrides_and_validate(&Value::Object(serde_json::Map::new()), &overrides)
                    .map_err(|e| ConfigError::data(row_label.clone(), e.message))
            });
        match parsed {
            Ok(scenario) => outcome.scenarios.push(scenario),
            Err(e) if strict_input => return Err(e),
            Err(e) => outcome
                .diagnostics
                .push(Diagnostic::new(DiagnosticKind::RowRejected, format!("skipped {row_label}: {e}"))),
        }
    }
    Ok(outcome)
}
