//! Inspection engine (spec §4.3).
//!
//! `inspect` computes a sample size, selects which units to examine, and runs
//! two independent passes over the selection: "to detection" (stops at the
//! first effectiveness success) and "to completion" (examines every selected
//! index). The two passes draw independent effectiveness trials, so a
//! contaminated item that fails its to-detection draw is not guaranteed to
//! fail its to-completion draw — this is a deliberate choice among the
//! documented open alternatives, not an oversight.

use crate::{
    ClusterSelection, ConfigError, Consignment, InspectionConfig, InspectionObservation,
    InspectionUnit, SampleStrategy, SelectionStrategy,
};

/// Rejects structurally invalid inspection configuration up front (spec §7:
/// configuration errors are fatal and pre-run, not raised once per
/// consignment). `inspect` calls this too, as a defense against a config
/// slipping through un-validated, but the orchestrator is expected to call
/// it once per loaded scenario before any consignment is processed.
pub fn validate(config: &InspectionConfig) -> Result<(), ConfigError> {
    if config.unit == InspectionUnit::Box {
        if let SelectionStrategy::Cluster { .. } = config.selection_strategy {
            return Err(ConfigError::config(
                "inspection/selection_strategy",
                "cluster selection requires unit=item",
            ));
        }
    }
    Ok(())
}

pub fn inspect(
    consignment: &mut Consignment,
    config: &InspectionConfig,
    rng: &mut impl rand::Rng,
) -> Result<InspectionObservation, ConfigError> {
    validate(config)?;

    let n = consignment.total_items();
    if n == 0 {
        return Ok(empty_observation(false));
    }

    let b = consignment.boxes as usize;
    let k = consignment.items_per_box as usize;
    let c = per_box_capacity(config.within_box_proportion, k);

    let (mut indices, mut boxes) = match config.unit {
        InspectionUnit::Box => {
            let mut s = sample_size(config.sample_strategy, b)?;
            s = s.max(config.min_boxes as usize).min(b);
            select_boxes(config.selection_strategy, s, b, c, k, rng)
        }
        InspectionUnit::Item => {
            let cap = cap_items(config.within_box_proportion, k, b, n);
            let mut s = sample_size(config.sample_strategy, n)?;
            s = s.min(cap);
            select_items(config.selection_strategy, s, n, b, c, k, rng)?
        }
    };

    if config.unit == InspectionUnit::Item {
        enforce_min_boxes(&mut indices, &mut boxes, config.min_boxes as usize, b, k, c);
    }

    Ok(examine(consignment, &indices, &boxes, k, config.effectiveness, rng))
}

fn empty_observation(any_contaminant_present: bool) -> InspectionObservation {
    InspectionObservation {
        sample_size: 0,
        indices_inspected: Vec::new(),
        boxes_opened: Vec::new(),
        detected: false,
        items_inspected_to_detection: 0,
        items_inspected_to_completion: 0,
        boxes_opened_to_detection: 0,
        boxes_opened_to_completion: 0,
        missed_contaminants_to_detection: 0,
        intercepted_contaminants_to_completion: 0,
        any_contaminant_present,
    }
}

fn sample_size(strategy: SampleStrategy, total: usize) -> Result<usize, ConfigError> {
    Ok(match strategy {
        SampleStrategy::All => total,
        SampleStrategy::Proportion { p } => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let s = (p.clamp(0.0, 1.0) * total as f64).round() as usize;
            s
        }
        SampleStrategy::FixedN { n } => (n as usize).min(total),
        SampleStrategy::Hypergeometric {
            detection_level,
            confidence_level,
        } => hypergeometric_sample_size(total, detection_level, confidence_level),
    })
}

/// Sample size guaranteeing detection with probability `confidence_level`
/// when `round(detection_level * total)` units out of `total` are
/// contaminated: `s = ceil(ln(alpha) / ln(1 - D/N))`, the standard
/// without-replacement approximation `P(miss) ~= (1 - D/N)^s`. `D == 0` is
/// clamped to `s = 0`; `D >= N` (every unit contaminated) needs one draw;
/// `confidence_level >= 1` (`alpha == 0`) needs the whole population.
fn hypergeometric_sample_size(total: usize, detection_level: f64, confidence_level: f64) -> usize {
    #[allow(clippy::cast_precision_loss)]
    let n = total as f64;
    let d = (detection_level * n).round().clamp(0.0, n);
    if d <= 0.0 {
        return 0;
    }
    if d >= n {
        return total.min(1);
    }

    let alpha = (1.0 - confidence_level).clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return total;
    }

    let p_miss = 1.0 - d / n;
    let s = (alpha.ln() / p_miss.ln()).ceil();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let s = s.clamp(0.0, n) as usize;
    s
}

fn per_box_capacity(within_box_proportion: f64, k: usize) -> usize {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let c = (within_box_proportion.clamp(0.0, 1.0) * k as f64).round().clamp(0.0, k as f64) as usize;
    c
}

fn cap_items(within_box_proportion: f64, k: usize, b: usize, n: usize) -> usize {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let cap = (within_box_proportion.clamp(0.0, 1.0) * k as f64 * b as f64).floor() as usize;
    cap.min(n)
}

fn select_boxes(
    strategy: SelectionStrategy,
    s: usize,
    b: usize,
    c: usize,
    k: usize,
    rng: &mut impl rand::Rng,
) -> (Vec<usize>, Vec<u32>) {
    #[allow(clippy::cast_possible_truncation)]
    let box_list: Vec<u32> = match strategy {
        SelectionStrategy::Random => crate::rng::choice_without_replacement(rng, b, s)
            .into_iter()
            .map(|i| i as u32)
            .collect(),
        SelectionStrategy::Convenience => (0..s as u32).collect(),
        SelectionStrategy::Cluster { .. } => unreachable!("cluster selection requires unit=item, validated earlier"),
    };
    let mut indices = Vec::new();
    for &box_idx in &box_list {
        let start = box_idx as usize * k;
        let take = c.min(k);
        indices.extend(start..start + take);
    }
    (indices, box_list)
}

#[allow(clippy::too_many_arguments)]
fn select_items(
    strategy: SelectionStrategy,
    s: usize,
    n: usize,
    b: usize,
    c: usize,
    k: usize,
    rng: &mut impl rand::Rng,
) -> Result<(Vec<usize>, Vec<u32>), ConfigError> {
    match strategy {
        SelectionStrategy::Random => {
            let indices = crate::rng::choice_without_replacement(rng, n, s);
            let boxes = boxes_in_first_appearance_order(&indices, k);
            Ok((indices, boxes))
        }
        SelectionStrategy::Convenience => {
            let mut indices = Vec::new();
            let mut boxes = Vec::new();
            let mut remaining = s;
            for box_idx in 0..b {
                if remaining == 0 {
                    break;
                }
                let take = c.min(remaining).min(k);
                if take == 0 {
                    continue;
                }
                let start = box_idx * k;
                indices.extend(start..start + take);
                #[allow(clippy::cast_possible_truncation)]
                boxes.push(box_idx as u32);
                remaining -= take;
            }
            Ok((indices, boxes))
        }
        SelectionStrategy::Cluster { selection, interval } => {
            if c == 0 {
                return Err(ConfigError::config(
                    "inspection/within_box_proportion",
                    "within_box_proportion yields zero per-box inspection capacity",
                ));
            }
            let num_boxes_needed = s.div_ceil(c).max(1).min(b.max(1));
            let chosen_boxes: Vec<usize> = match selection {
                ClusterSelection::Random => crate::rng::choice_without_replacement(rng, b, num_boxes_needed),
                ClusterSelection::Interval => interval_boxes(b, interval as usize, num_boxes_needed),
            };
            let mut indices = Vec::new();
            let mut boxes = Vec::new();
            let mut remaining = s;
            for (i, &box_idx) in chosen_boxes.iter().enumerate() {
                if remaining == 0 {
                    break;
                }
                let is_last = i == chosen_boxes.len() - 1;
                let take = if is_last { remaining.min(k) } else { c.min(k) };
                let start = box_idx * k;
                indices.extend(start..start + take);
                #[allow(clippy::cast_possible_truncation)]
                boxes.push(box_idx as u32);
                remaining = remaining.saturating_sub(take);
            }
            Ok((indices, boxes))
        }
    }
}

/// Walks boxes `0, i, 2i, …` (mod `b`, wrap-around allowed) until `count`
/// distinct boxes are collected.
fn interval_boxes(b: usize, interval: usize, count: usize) -> Vec<usize> {
    if b == 0 {
        return Vec::new();
    }
    let interval = interval.max(1);
    let mut seen = Vec::new();
    let mut step = 0usize;
    let guard_limit = b * 4 + 16;
    let mut guard = 0usize;
    while seen.len() < count && guard < guard_limit {
        let box_idx = (step * interval) % b;
        if !seen.contains(&box_idx) {
            seen.push(box_idx);
        }
        step += 1;
        guard += 1;
    }
    seen
}

fn boxes_in_first_appearance_order(indices: &[usize], k: usize) -> Vec<u32> {
    let mut boxes = Vec::new();
    for &idx in indices {
        #[allow(clippy::cast_possible_truncation)]
        let box_idx = (idx / k) as u32;
        if !boxes.contains(&box_idx) {
            boxes.push(box_idx);
        }
    }
    boxes
}

/// Extends the selection with additional boxes (in ascending, unused-first
/// order) until `boxes_opened >= min_boxes` or every box has been used.
fn enforce_min_boxes(indices: &mut Vec<usize>, boxes: &mut Vec<u32>, min_boxes: usize, b: usize, k: usize, c: usize) {
    if c == 0 || b == 0 {
        return;
    }
    let mut candidate = 0usize;
    while boxes.len() < min_boxes && boxes.len() < b {
        #[allow(clippy::cast_possible_truncation)]
        while candidate < b && boxes.contains(&(candidate as u32)) {
            candidate += 1;
        }
        if candidate >= b {
            return;
        }
        let start = candidate * k;
        let take = c.min(k);
        indices.extend(start..start + take);
        #[allow(clippy::cast_possible_truncation)]
        boxes.push(candidate as u32);
        candidate += 1;
    }
}

fn examine(
    consignment: &mut Consignment,
    indices: &[usize],
    boxes: &[u32],
    k: usize,
    effectiveness: f64,
    rng: &mut impl rand::Rng,
) -> InspectionObservation {
    let mut items_to_detection = 0u32;
    let mut boxes_seen_detection: Vec<u32> = Vec::new();
    let mut detected = false;
    let mut missed_to_detection = 0u32;

    for &idx in indices {
        items_to_detection += 1;
        #[allow(clippy::cast_possible_truncation)]
        let box_idx = (idx / k) as u32;
        if !boxes_seen_detection.contains(&box_idx) {
            boxes_seen_detection.push(box_idx);
        }
        if consignment.item_contaminated.get(idx) {
            if crate::rng::bernoulli(rng, effectiveness) {
                detected = true;
                break;
            }
            missed_to_detection += 1;
        }
    }

    let mut intercepted_to_completion = 0u32;
    for &idx in indices {
        consignment.item_inspected.set(idx, true);
        if consignment.item_contaminated.get(idx) && crate::rng::bernoulli(rng, effectiveness) {
            intercepted_to_completion += 1;
        }
    }

    InspectionObservation {
        sample_size: indices.len(),
        indices_inspected: indices.to_vec(),
        boxes_opened: boxes.to_vec(),
        detected,
        items_inspected_to_detection: items_to_detection,
        #[allow(clippy::cast_possible_truncation)]
        items_inspected_to_completion: indices.len() as u32,
        boxes_opened_to_detection: boxes_seen_detection.len() as u32,
        #[allow(clippy::cast_possible_truncation)]
        boxes_opened_to_completion: boxes.len() as u32,
        missed_contaminants_to_detection: missed_to_detection,
        intercepted_contaminants_to_completion: intercepted_to_completion,
        any_contaminant_present: consignment.is_contaminated(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::consignment;
    use crate::{InspectionUnit, SelectionStrategy};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn scenario_1_full_sample_effectiveness_one_detects() {
        let mut c = consignment(3, 10);
        c.item_contaminated.set(2, true);
        c.item_contaminated.set(15, true);
        c.item_contaminated.set(29, true);
        let config = InspectionConfig {
            unit: InspectionUnit::Item,
            within_box_proportion: 1.0,
            tolerance_level: 0.0,
            sample_strategy: SampleStrategy::All,
            selection_strategy: SelectionStrategy::Random,
            min_boxes: 0,
            effectiveness: 1.0,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let obs = inspect(&mut c, &config, &mut rng).unwrap();
        assert!(obs.detected);
        assert_eq!(obs.items_inspected_to_completion, 30);
        assert_eq!(obs.missed_contaminants_to_detection, 0);
    }

    #[test]
    fn scenario_2_zero_contamination_never_detected() {
        let mut c = consignment(2, 10);
        let config = InspectionConfig {
            unit: InspectionUnit::Item,
            within_box_proportion: 1.0,
            tolerance_level: 0.0,
            sample_strategy: SampleStrategy::Proportion { p: 0.5 },
            selection_strategy: SelectionStrategy::Random,
            min_boxes: 0,
            effectiveness: 1.0,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let obs = inspect(&mut c, &config, &mut rng).unwrap();
        assert_eq!(obs.sample_size, 10);
        assert!(!obs.detected);
        assert!(!obs.any_contaminant_present);
    }

    #[test]
    fn hypergeometric_k_zero_clamps_to_zero_sample() {
        assert_eq!(hypergeometric_sample_size(1000, 0.0, 0.95), 0);
    }

    #[test]
    fn hypergeometric_scenario_five_percent_detection() {
        assert_eq!(hypergeometric_sample_size(1000, 0.05, 0.95), 59);
    }

    #[test]
    fn hypergeometric_scenario_ten_percent_detection() {
        assert_eq!(hypergeometric_sample_size(1000, 0.1, 0.95), 29);
    }

    #[test]
    fn hypergeometric_every_unit_contaminated_needs_one_draw() {
        assert_eq!(hypergeometric_sample_size(1000, 1.0, 0.95), 1);
    }

    #[test]
    fn hypergeometric_full_confidence_requires_whole_population() {
        assert_eq!(hypergeometric_sample_size(1000, 0.05, 1.0), 1000);
    }

    #[test]
    fn validate_rejects_cluster_selection_with_box_unit() {
        let config = InspectionConfig {
            unit: InspectionUnit::Box,
            within_box_proportion: 1.0,
            tolerance_level: 0.0,
            sample_strategy: SampleStrategy::All,
            selection_strategy: SelectionStrategy::Cluster {
                selection: crate::ClusterSelection::Random,
                interval: 1,
            },
            min_boxes: 0,
            effectiveness: 1.0,
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn cluster_selection_rejects_box_unit() {
        let mut c = consignment(4, 10);
        let config = InspectionConfig {
            unit: InspectionUnit::Box,
            within_box_proportion: 1.0,
            tolerance_level: 0.0,
            sample_strategy: SampleStrategy::All,
            selection_strategy: SelectionStrategy::Cluster {
                selection: crate::ClusterSelection::Random,
                interval: 1,
            },
            min_boxes: 0,
            effectiveness: 1.0,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        assert!(inspect(&mut c, &config, &mut rng).is_err());
    }

    #[test]
    fn bijection_of_inspected_bits_and_selection() {
        let mut c = consignment(5, 20);
        let config = InspectionConfig {
            unit: InspectionUnit::Item,
            within_box_proportion: 1.0,
            tolerance_level: 0.0,
            sample_strategy: SampleStrategy::Proportion { p: 0.3 },
            selection_strategy: SelectionStrategy::Random,
            min_boxes: 0,
            effectiveness: 0.5,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let obs = inspect(&mut c, &config, &mut rng).unwrap();
        let inspected_indices: Vec<usize> = c.item_inspected.iter_ones().collect();
        let mut expected = obs.indices_inspected.clone();
        expected.sort_unstable();
        assert_eq!(inspected_indices, expected);
    }

    #[test]
    fn min_boxes_extends_selection() {
        let mut c = consignment(10, 20);
        let config = InspectionConfig {
            unit: InspectionUnit::Item,
            within_box_proportion: 1.0,
            tolerance_level: 0.0,
            sample_strategy: SampleStrategy::FixedN { n: 5 },
            selection_strategy: SelectionStrategy::Convenience,
            min_boxes: 3,
            effectiveness: 1.0,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let obs = inspect(&mut c, &config, &mut rng).unwrap();
        assert!(obs.boxes_opened.len() >= 3);
    }

    #[test]
    fn empty_consignment_yields_empty_observation() {
        let mut c = consignment(0, 10);
        let config = InspectionConfig {
            unit: InspectionUnit::Item,
            within_box_proportion: 1.0,
            tolerance_level: 0.0,
            sample_strategy: SampleStrategy::All,
            selection_strategy: SelectionStrategy::Random,
            min_boxes: 0,
            effectiveness: 1.0,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let obs = inspect(&mut c, &config, &mut rng).unwrap();
        assert_eq!(obs.sample_size, 0);
        assert!(!obs.detected);
    }
}
