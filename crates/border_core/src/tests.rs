//! End-to-end and statistical property tests spanning the whole crate (spec §8).
//!
//! Per-module unit tests live beside the code they exercise; this file covers
//! properties that only make sense across the full contaminate → release →
//! inspect pipeline, or that need many independent draws to check a
//! distributional claim.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::contamination::{contaminate, resolve_config};
use crate::inspection::inspect;
use crate::release::naive_cfrp;
use crate::test_fixtures::consignment;
use crate::{
    ArrangementConfig, ContaminationConfig, ContaminationUnit, InspectionConfig, InspectionUnit, NaiveCfrpConfig,
    RateConfig, SampleStrategy, SelectionStrategy,
};

fn run_pipeline(seed: u64) -> (bool, bool, u32) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut c = consignment(4, 25);
    let contamination_config = ContaminationConfig {
        unit: ContaminationUnit::Item,
        rate: RateConfig::Fixed { value: 0.2 },
        arrangement: ArrangementConfig::Random,
        consignments: None,
    };
    let resolved = resolve_config(&c, &contamination_config).unwrap();
    contaminate(&mut c, &resolved, &mut rng).unwrap();

    let inspection_config = InspectionConfig {
        unit: InspectionUnit::Item,
        within_box_proportion: 1.0,
        tolerance_level: 0.0,
        sample_strategy: SampleStrategy::Proportion { p: 0.5 },
        selection_strategy: SelectionStrategy::Random,
        min_boxes: 0,
        effectiveness: 0.9,
    };
    let obs = inspect(&mut c, &inspection_config, &mut rng).unwrap();
    (c.is_contaminated(), obs.detected, obs.items_inspected_to_completion)
}

#[test]
fn reproducibility_same_seed_same_outputs() {
    let a = run_pipeline(2024);
    let b = run_pipeline(2024);
    assert_eq!(a, b);
}

#[test]
fn contamination_rate_converges_to_fixed_value() {
    let r = 0.2;
    let n_per_consignment = 200;
    let num_consignments = 400;
    let mut total_fraction = 0.0;
    for seed in 0..num_consignments {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut c = consignment(4, n_per_consignment / 4);
        let config = ContaminationConfig {
            unit: ContaminationUnit::Item,
            rate: RateConfig::Fixed { value: r },
            arrangement: ArrangementConfig::Random,
            consignments: None,
        };
        contaminate(&mut c, &config, &mut rng).unwrap();
        #[allow(clippy::cast_precision_loss)]
        let fraction = c.item_contaminated.count_ones() as f64 / c.total_items() as f64;
        total_fraction += fraction;
    }
    let mean = total_fraction / f64::from(num_consignments as u32);
    assert!((mean - r).abs() < 0.01, "mean {mean} not within tolerance of {r}");
}

fn choose(n: u64, k: u64) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    let mut result = 1.0_f64;
    for i in 0..k {
        result *= (n - i) as f64;
        result /= (i + 1) as f64;
    }
    result
}

#[test]
fn detection_probability_matches_hypergeometric_formula() {
    let n = 20usize;
    let k = 3usize;
    let sample = 5usize;
    let runs = 20_000u64;

    #[allow(clippy::cast_possible_truncation)]
    let analytic = 1.0 - choose((n - k) as u64, sample as u64) / choose(n as u64, sample as u64);

    let mut detections = 0u64;
    for seed in 0..runs {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut c = consignment(1, n as u32);
        for i in 0..k {
            c.item_contaminated.set(i * 2, true);
        }
        let config = InspectionConfig {
            unit: InspectionUnit::Item,
            within_box_proportion: 1.0,
            tolerance_level: 0.0,
            sample_strategy: SampleStrategy::FixedN { n: sample as u32 },
            selection_strategy: SelectionStrategy::Random,
            min_boxes: 0,
            effectiveness: 1.0,
        };
        let obs = inspect(&mut c, &config, &mut rng).unwrap();
        if obs.detected {
            detections += 1;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let empirical = detections as f64 / runs as f64;
    assert!(
        (empirical - analytic).abs() < 0.01,
        "empirical {empirical} vs analytic {analytic}"
    );
}

#[test]
fn naive_cfrp_releases_exactly_the_non_flower_commodities_each_day() {
    let flowers = vec!["apples".to_string(), "pears".to_string(), "grapes".to_string(), "plums".to_string()];
    let config = NaiveCfrpConfig {
        flowers: flowers.clone(),
        max_boxes: u32::MAX,
    };
    let date = chrono::NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();

    let decisions: Vec<bool> = flowers
        .iter()
        .map(|commodity| {
            let mut c = crate::test_fixtures::consignment_with(1, 10, commodity, "mexico");
            c.date = date;
            naive_cfrp(&c, &config).inspect
        })
        .collect();

    assert_eq!(decisions.iter().filter(|&&inspect| inspect).count(), 1);
}
