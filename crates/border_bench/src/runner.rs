//! Runs one (scenario variant, simulation) pair through the strict
//! generator → contamination → release → inspection pipeline (spec §4, §7)
//! and collects the resulting `RunRecord`s.

use std::sync::atomic::{AtomicBool, Ordering};

use border_control::{ArrivalSource, GeneratorArrivalSource};
use border_core::{
    contamination, inspection, release, ConfigError, Diagnostic, DynamicSkipLotStateMap, InspectionObservation,
    ReleaseDecision, RunRecord,
};
use border_world::{ReleaseProgram, ScenarioConfig};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A consignment released without inspection, or one whose inspection
/// engine returned an error: nothing was observed, so every count is zero.
fn uninspected_record(
    was_contaminated: bool,
    true_contamination_rate: f64,
    release_program_name: Option<String>,
    diagnostics: Vec<Diagnostic>,
    tolerance_level: f64,
) -> RunRecord {
    RunRecord {
        was_contaminated,
        was_inspected: false,
        detected: false,
        true_contamination_rate,
        items_inspected_to_detection: 0,
        items_inspected_to_completion: 0,
        boxes_opened_to_detection: 0,
        boxes_opened_to_completion: 0,
        missed_contaminants_to_detection: 0,
        intercepted_contaminants_to_completion: 0,
        release_program_name,
        tolerance_level,
        diagnostics,
    }
}

fn inspected_record(
    was_contaminated: bool,
    true_contamination_rate: f64,
    observation: &InspectionObservation,
    release_program_name: Option<String>,
    diagnostics: Vec<Diagnostic>,
    tolerance_level: f64,
) -> RunRecord {
    RunRecord {
        was_contaminated,
        was_inspected: true,
        detected: observation.detected,
        true_contamination_rate,
        items_inspected_to_detection: observation.items_inspected_to_detection,
        items_inspected_to_completion: observation.items_inspected_to_completion,
        boxes_opened_to_detection: observation.boxes_opened_to_detection,
        boxes_opened_to_completion: observation.boxes_opened_to_completion,
        missed_contaminants_to_detection: observation.missed_contaminants_to_detection,
        intercepted_contaminants_to_completion: observation.intercepted_contaminants_to_completion,
        release_program_name,
        tolerance_level,
        diagnostics,
    }
}

/// The outcome of running every consignment of one iteration: each
/// consignment paired with the `RunRecord` it produced, in arrival order.
pub struct IterationOutcome {
    pub records: Vec<(border_core::Consignment, RunRecord)>,
    /// `false` when cancellation cut the iteration short (spec §7: partial
    /// aggregates are flagged, never silently dropped).
    pub complete: bool,
}

/// Picks the first release program (in declared order) that claims the
/// consignment, defaulting to full inspection when none do. Every
/// `border_core::release::*` function signals "not applicable" the same
/// way: `program_name: None`.
fn evaluate_release_programs(
    programs: &[ReleaseProgram],
    consignment: &border_core::Consignment,
    state_map: &mut DynamicSkipLotStateMap,
    rng: &mut ChaCha8Rng,
) -> (ReleaseDecision, Option<usize>) {
    for (index, program) in programs.iter().enumerate() {
        let decision = match program {
            ReleaseProgram::NaiveCfrp(config) => release::naive_cfrp(consignment, config),
            ReleaseProgram::ScheduledCfrp(config) => release::scheduled_cfrp(consignment, config),
            ReleaseProgram::FixedSkipLot(config) => release::fixed_skip_lot(consignment, config, rng),
            ReleaseProgram::DynamicSkipLot(config) => {
                release::dynamic_skip_lot_evaluate(consignment, config, state_map, rng)
            }
        };
        if decision.program_name.is_some() {
            return (decision, Some(index));
        }
    }
    (ReleaseDecision { inspect: true, program_name: None }, None)
}

/// Runs `num_consignments` through the pipeline for one (scenario, seed)
/// pair. `cancel` is checked between consignments only (spec §7) — a
/// consignment already started always runs to completion.
/// Runs `num_consignments` through the pipeline for one (scenario, seed)
/// pair. `cancel` is checked between consignments only (spec §7) — a
/// consignment already started always runs to completion.
///
/// Assumes `scenario.validate()` already passed: a `ConfigError` surfacing
/// here means a structurally invalid configuration slipped past pre-run
/// validation, so it is propagated and aborts the whole run rather than
/// being downgraded to a per-consignment log line (spec §7: no error
/// propagates as a silent fallback).
pub fn run_iteration(
    scenario: &ScenarioConfig,
    seed: u64,
    num_consignments: u64,
    cancel: &AtomicBool,
) -> Result<IterationOutcome, ConfigError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut source = GeneratorArrivalSource::new(scenario.consignment.clone());
    let programs = scenario.release_programs();
    let mut state_map = DynamicSkipLotStateMap::new();
    let mut records = Vec::with_capacity(num_consignments as usize);

    let mut complete = true;
    for _ in 0..num_consignments {
        if cancel.load(Ordering::Relaxed) {
            complete = false;
            break;
        }

        let Some(mut consignment) = source.next_consignment(&mut rng)? else {
            complete = false;
            break;
        };

        let mut diagnostics = Vec::new();
        let true_contamination_rate = match contamination::resolve_config(&consignment, &scenario.contamination) {
            None => 0.0,
            Some(resolved) => {
                let outcome = contamination::contaminate(&mut consignment, &resolved, &mut rng)?;
                diagnostics.extend(outcome.diagnostics);
                outcome.true_contamination_rate
            }
        };
        let was_contaminated = consignment.is_contaminated();

        let (decision, program_index) = evaluate_release_programs(&programs, &consignment, &mut state_map, &mut rng);

        let record = if decision.inspect {
            let observation = inspection::inspect(&mut consignment, &scenario.inspection, &mut rng)?;
            if let Some(ReleaseProgram::DynamicSkipLot(config)) = program_index.map(|i| &programs[i]) {
                release::dynamic_skip_lot_record_outcome(&consignment, config, &mut state_map, !observation.detected);
            }
            inspected_record(
                was_contaminated,
                true_contamination_rate,
                &observation,
                decision.program_name,
                diagnostics,
                scenario.inspection.tolerance_level,
            )
        } else {
            uninspected_record(
                was_contaminated,
                true_contamination_rate,
                decision.program_name,
                diagnostics,
                scenario.inspection.tolerance_level,
            )
        };

        records.push((consignment, record));
    }

    Ok(IterationOutcome { records, complete })
}

#[cfg(test)]
mod tests {
    use super::*;
    use border_core::{
        ArrangementConfig, ContaminationConfig, ContaminationUnit, InspectionConfig, InspectionUnit, RateConfig,
        SampleStrategy, SelectionStrategy,
    };
    use border_world::GeneratorParams;
    use chrono::NaiveDate;

    fn scenario() -> ScenarioConfig {
        ScenarioConfig {
            consignment: GeneratorParams {
                boxes_min: 2,
                boxes_max: 4,
                items_per_box_min: 10,
                items_per_box_max: 10,
                commodities: vec!["apples".to_string()],
                origins: vec!["mexico".to_string()],
                ports: vec!["laredo".to_string()],
                pathways: vec!["maritime".to_string()],
                date_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                date_end: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            },
            contamination: ContaminationConfig {
                unit: ContaminationUnit::Item,
                rate: RateConfig::Fixed { value: 0.2 },
                arrangement: ArrangementConfig::Random,
                consignments: None,
            },
            inspection: InspectionConfig {
                unit: InspectionUnit::Item,
                within_box_proportion: 1.0,
                tolerance_level: 0,
                sample_strategy: SampleStrategy::Proportion { p: 0.5 },
                selection_strategy: SelectionStrategy::Random,
                min_boxes: 1,
                effectiveness: 1.0,
            },
            release_programs: Vec::new(),
            pretty: None,
        }
    }

    #[test]
    fn runs_every_consignment_when_not_cancelled() {
        let cancel = AtomicBool::new(false);
        let outcome = run_iteration(&scenario(), 1, 20, &cancel).unwrap();
        assert_eq!(outcome.records.len(), 20);
        assert!(outcome.complete);
    }

    #[test]
    fn default_program_inspects_every_consignment() {
        let cancel = AtomicBool::new(false);
        let outcome = run_iteration(&scenario(), 7, 10, &cancel).unwrap();
        assert!(outcome.records.iter().all(|(_, r)| r.was_inspected));
        assert!(outcome.records.iter().all(|(_, r)| r.release_program_name.is_none()));
    }

    #[test]
    fn cancellation_flag_stops_the_loop_early_and_marks_incomplete() {
        let cancel = AtomicBool::new(true);
        let outcome = run_iteration(&scenario(), 1, 50, &cancel).unwrap();
        assert!(outcome.records.is_empty());
        assert!(!outcome.complete);
    }

    #[test]
    fn same_seed_is_deterministic() {
        let cancel = AtomicBool::new(false);
        let first = run_iteration(&scenario(), 99, 15, &cancel).unwrap();
        let second = run_iteration(&scenario(), 99, 15, &cancel).unwrap();
        assert_eq!(first.records.len(), second.records.len());
        for ((_, a), (_, b)) in first.records.iter().zip(second.records.iter()) {
            assert_eq!(a.was_contaminated, b.was_contaminated);
            assert_eq!(a.detected, b.detected);
        }
    }

    #[test]
    fn invalid_consignment_config_aborts_the_iteration_instead_of_truncating_silently() {
        let mut bad_scenario = scenario();
        bad_scenario.consignment.boxes_min = 5;
        bad_scenario.consignment.boxes_max = 1;
        let cancel = AtomicBool::new(false);
        assert!(run_iteration(&bad_scenario, 1, 10, &cancel).is_err());
    }
}
