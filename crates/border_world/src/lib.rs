//! Consignment generation and configuration shared between `border-sim` and
//! any other future front end: turns configuration plus an RNG into
//! simulation-ready `Consignment`s, loads scenario configuration (JSON/YAML/
//! tabular), reads F280/AQIM input CSVs, and renders output (F280 lines, the
//! glyph pretty-printer).

pub mod config;
pub mod csv_input;
pub mod f280_output;
pub mod generator;
pub mod pretty;

pub use config::{
    apply_overrides_and_validate, load_config_file, load_scenario_table, parse_cell, set_path, FixedSkipLotFile,
    FixedSkipLotRow, ReleaseProgram, ReleaseProgramFile, ScenarioConfig, ScenarioTableOutcome,
};
pub use csv_input::{read_aqim_csv, read_f280_csv, CsvLoadOutcome};
pub use f280_output::{action_for, format_record, write_records, Action};
pub use generator::{
    from_aqim_record, from_f280_record, generate_from_parameters, AqimRecord, AqimUnit, F280Record, GeneratorParams,
};
pub use pretty::{render, PrettyConfig, PrettyMode};
