//! Integration tests over `ArrivalSource` implementations, exercising them
//! the way the orchestrator does: repeated calls against a shared RNG.

use border_control::{ArrivalSource, GeneratorArrivalSource, ScriptedArrivalSource};
use border_core::test_fixtures::consignment_with;
use border_world::GeneratorParams;
use chrono::NaiveDate;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn params() -> GeneratorParams {
    GeneratorParams {
        boxes_min: 1,
        boxes_max: 2,
        items_per_box_min: 8,
        items_per_box_max: 8,
        commodities: vec!["pears".to_string(), "apples".to_string()],
        origins: vec!["chile".to_string()],
        ports: vec!["miami".to_string()],
        pathways: vec!["air".to_string()],
        date_start: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        date_end: NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
    }
}

#[test]
fn generator_arrival_source_produces_consignments_within_bounds() {
    let mut source = GeneratorArrivalSource::new(params());
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    for _ in 0..50 {
        let c = source.next_consignment(&mut rng).unwrap().expect("generator source should not run dry");
        assert!((1..=2).contains(&c.boxes));
        assert_eq!(c.items_per_box, 8);
    }
}

#[test]
fn scripted_arrival_source_preserves_order() {
    let consignments = vec![
        consignment_with(1, 4, "mangoes", "brazil"),
        consignment_with(2, 4, "citrus", "peru"),
        consignment_with(3, 4, "apples", "mexico"),
    ];
    let mut source = ScriptedArrivalSource::new(consignments);
    let mut rng = ChaCha8Rng::seed_from_u64(0);

    assert_eq!(source.next_consignment(&mut rng).unwrap().unwrap().commodity, "mangoes");
    assert_eq!(source.next_consignment(&mut rng).unwrap().unwrap().commodity, "citrus");
    assert_eq!(source.next_consignment(&mut rng).unwrap().unwrap().commodity, "apples");
    assert!(source.next_consignment(&mut rng).unwrap().is_none());
}

#[test]
fn generator_and_scripted_sources_are_interchangeable_behind_the_trait() {
    fn drain_one(source: &mut dyn ArrivalSource, rng: &mut ChaCha8Rng) -> bool {
        source.next_consignment(rng).unwrap().is_some()
    }

    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut generator: Box<dyn ArrivalSource> = Box::new(GeneratorArrivalSource::new(params()));
    let mut scripted: Box<dyn ArrivalSource> =
        Box::new(ScriptedArrivalSource::new(vec![consignment_with(1, 4, "apples", "mexico")]));

    assert!(drain_one(generator.as_mut(), &mut rng));
    assert!(drain_one(scripted.as_mut(), &mut rng));
    assert!(!drain_one(scripted.as_mut(), &mut rng));
}
