//! Release-program engines (spec §4.4).
//!
//! Every program exposes an `evaluate` returning a [`ReleaseDecision`]; this
//! runs strictly before the inspection engine and may short-circuit it. The
//! dynamic skip-lot state machine additionally needs the inspection *result*,
//! which isn't known until after §4.3 runs — so its transition
//! (`dynamic_skip_lot_record_outcome`) is a separate call the orchestrator
//! makes once inspection has completed.

use chrono::Datelike;

use crate::{
    Consignment, DynamicSkipLotConfig, DynamicSkipLotState, DynamicSkipLotStateMap, FixedSkipLotConfig,
    GroupKey, NaiveCfrpConfig, ReleaseDecision, ScheduledCfrpConfig,
};

fn group_key(consignment: &Consignment, group_by: &[String]) -> GroupKey {
    group_by
        .iter()
        .map(|field| match field.as_str() {
            "commodity" => consignment.commodity.clone(),
            "origin" => consignment.origin.clone(),
            "port" => consignment.port.clone(),
            "pathway" => consignment.pathway.clone(),
            other => format!("unknown:{other}"),
        })
        .collect()
}

/// Deterministically picks the day's "flower" from an ordered list, using a
/// continuous day count so the cycle doesn't reset every January 1st.
fn flower_of_the_day(date: chrono::NaiveDate, flowers: &[String]) -> Option<&String> {
    if flowers.is_empty() {
        return None;
    }
    let ordinal = date.num_days_from_ce();
    #[allow(clippy::cast_sign_loss)]
    let index = (ordinal as usize) % flowers.len();
    flowers.get(index)
}

#[must_use]
pub fn naive_cfrp(consignment: &Consignment, config: &NaiveCfrpConfig) -> ReleaseDecision {
    let in_program = config.flowers.iter().any(|f| f == &consignment.commodity);
    if !in_program || consignment.boxes >= config.max_boxes {
        return ReleaseDecision {
            inspect: true,
            program_name: None,
        };
    }
    let today_flower = flower_of_the_day(consignment.date, &config.flowers);
    let is_flower = today_flower == Some(&consignment.commodity);
    ReleaseDecision {
        inspect: is_flower,
        program_name: Some("naive_cfrp".to_string()),
    }
}

#[must_use]
pub fn scheduled_cfrp(consignment: &Consignment, config: &ScheduledCfrpConfig) -> ReleaseDecision {
    if let Some(ports) = &config.ports {
        if !ports.iter().any(|p| p == &consignment.port) {
            return ReleaseDecision {
                inspect: true,
                program_name: None,
            };
        }
    }

    let is_flower_today = config
        .schedule
        .iter()
        .any(|row| row.date == consignment.date && row.commodity == consignment.commodity && row.origin == consignment.origin);
    if is_flower_today {
        return ReleaseDecision {
            inspect: true,
            program_name: Some("scheduled_cfrp".to_string()),
        };
    }

    let commodity_in_schedule = config.schedule.iter().any(|row| row.commodity == consignment.commodity);
    ReleaseDecision {
        inspect: !commodity_in_schedule,
        program_name: Some("scheduled_cfrp".to_string()),
    }
}

pub fn fixed_skip_lot(
    consignment: &Consignment,
    config: &FixedSkipLotConfig,
    rng: &mut impl rand::Rng,
) -> ReleaseDecision {
    let key = group_key(consignment, &config.group_by);
    let level = config.table.get(&key).unwrap_or(&config.default_level);
    let inspect = crate::rng::bernoulli(rng, level.sampling_fraction);
    ReleaseDecision {
        inspect,
        program_name: Some("fixed_skip_lot".to_string()),
    }
}

#[must_use]
pub fn dynamic_skip_lot_evaluate(
    consignment: &Consignment,
    config: &DynamicSkipLotConfig,
    state_map: &mut DynamicSkipLotStateMap,
    rng: &mut impl rand::Rng,
) -> ReleaseDecision {
    let key = group_key(consignment, &config.group_by);
    let state = state_map
        .entry(key)
        .or_insert_with(|| DynamicSkipLotState::initial(config.start_level.saturating_sub(1)));
    let level = config
        .levels
        .get(state.level_index)
        .copied()
        .unwrap_or(config.levels[0]);
    let inspect = crate::rng::bernoulli(rng, level.sampling_fraction);
    ReleaseDecision {
        inspect,
        program_name: Some("dynamic_skip_lot".to_string()),
    }
}

/// Applies the `promote`/`fail` transition once the inspection result (if any
/// inspection happened) is known. Must be called exactly once per consignment
/// that was NOT released by [`dynamic_skip_lot_evaluate`], with `passed =
/// !detected`.
pub fn dynamic_skip_lot_record_outcome(
    consignment: &Consignment,
    config: &DynamicSkipLotConfig,
    state_map: &mut DynamicSkipLotStateMap,
    passed: bool,
) {
    let key = group_key(consignment, &config.group_by);
    let state = state_map
        .entry(key)
        .or_insert_with(|| DynamicSkipLotState::initial(config.start_level.saturating_sub(1)));
    let top = config.levels.len().saturating_sub(1);

    if passed {
        state.consecutive_successes += 1;
        let required = if state.using_quick_clearance {
            config.quick_restate_clearance_number.unwrap_or(config.clearance_number)
        } else {
            config.clearance_number
        };
        if state.consecutive_successes >= required && state.level_index < top {
            state.level_index += 1;
            state.consecutive_successes = 0;
            if state.level_index == top {
                state.has_ever_reached_top = true;
                state.using_quick_clearance = false;
            }
        }
    } else {
        let quick_restate = config.quick_restating && state.has_ever_reached_top;
        if quick_restate {
            let restate_to = config.restate_level.map_or(top.saturating_sub(1), |l| l.saturating_sub(1));
            state.level_index = restate_to;
            state.using_quick_clearance = true;
        } else {
            state.level_index = config.start_level.saturating_sub(1);
            state.using_quick_clearance = false;
        }
        state.consecutive_successes = 0;
    }
}
