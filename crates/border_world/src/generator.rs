//! Consignment generation: from synthesis parameters, or by translating an
//! already-parsed input record (F280/AQIM) into a `Consignment` (spec §2 item 3).
//!
//! This is the one place that turns configuration plus an RNG into
//! simulation-ready `Consignment`s, mirroring the teacher's role for
//! `build_initial_state` (content + RNG → simulation-ready state).

use border_core::{rng, Consignment, ConfigError};
use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Bounds and categorical pools used for from-parameters consignment synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorParams {
    pub boxes_min: u32,
    pub boxes_max: u32,
    pub items_per_box_min: u32,
    pub items_per_box_max: u32,
    pub commodities: Vec<String>,
    pub origins: Vec<String>,
    pub ports: Vec<String>,
    pub pathways: Vec<String>,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
}

impl GeneratorParams {
    /// Rejects inverted or empty bounds up front (spec §7: configuration
    /// errors are fatal and pre-run, not raised once per consignment).
    /// `generate_from_parameters` calls this too, as a defense against a
    /// config slipping through un-validated, but the orchestrator is
    /// expected to call it once per loaded scenario before any consignment
    /// is generated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.boxes_min > self.boxes_max {
            return Err(ConfigError::config(
                "consignment/boxes_min",
                format!("boxes_min ({}) must be <= boxes_max ({})", self.boxes_min, self.boxes_max),
            ));
        }
        if self.items_per_box_min > self.items_per_box_max {
            return Err(ConfigError::config(
                "consignment/items_per_box_min",
                format!(
                    "items_per_box_min ({}) must be <= items_per_box_max ({})",
                    self.items_per_box_min, self.items_per_box_max
                ),
            ));
        }
        if self.date_start > self.date_end {
            return Err(ConfigError::config(
                "consignment/date_start",
                format!("date_start ({}) must be <= date_end ({})", self.date_start, self.date_end),
            ));
        }
        for (field, list) in [
            ("commodities", &self.commodities),
            ("origins", &self.origins),
            ("ports", &self.ports),
            ("pathways", &self.pathways),
        ] {
            if list.is_empty() {
                return Err(ConfigError::config(format!("consignment/{field}"), "must not be empty"));
            }
        }
        Ok(())
    }
}

fn random_date(rng: &mut impl Rng, start: NaiveDate, end: NaiveDate) -> NaiveDate {
    let span = (end - start).num_days();
    if span <= 0 {
        return start;
    }
    #[allow(clippy::cast_sign_loss)]
    let offset = rng::uniform_int(rng, 0, span) as u64;
    start + chrono::Duration::days(offset as i64)
}

fn pick<'a>(rng: &mut impl Rng, pool: &'a [String]) -> &'a str {
    let idx = rng::uniform_int(rng, 0, pool.len() as i64 - 1);
    #[allow(clippy::cast_sign_loss)]
    pool[idx as usize].as_str()
}

/// Synthesizes one consignment from random box/item-per-box counts within the
/// configured bounds and uniformly-chosen categorical attributes.
pub fn generate_from_parameters(
    params: &GeneratorParams,
    rng: &mut impl Rng,
) -> Result<Consignment, ConfigError> {
    params.validate()?;
    #[allow(clippy::cast_sign_loss)]
    let boxes = rng::uniform_int(rng, i64::from(params.boxes_min), i64::from(params.boxes_max)) as u32;
    #[allow(clippy::cast_sign_loss)]
    let items_per_box =
        rng::uniform_int(rng, i64::from(params.items_per_box_min), i64::from(params.items_per_box_max)) as u32;
    let commodity = pick(rng, &params.commodities);
    let origin = pick(rng, &params.origins);
    let port = pick(rng, &params.ports);
    let pathway = pick(rng, &params.pathways);
    let date = random_date(rng, params.date_start, params.date_end);
    Ok(Consignment::new(boxes, items_per_box, commodity, origin, port, date, pathway))
}

/// Unit the AQIM `QUANTITY` column is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AqimUnit {
    Items,
    Boxes,
}

/// A parsed F280 CSV row (spec §6), ready for translation into a `Consignment`.
#[derive(Debug, Clone)]
pub struct F280Record {
    pub quantity: u32,
    pub pathway: String,
    pub report_date: NaiveDate,
    pub commodity: String,
    pub origin: String,
    pub location: String,
}

/// A parsed AQIM CSV row (spec §6).
#[derive(Debug, Clone)]
pub struct AqimRecord {
    pub unit: AqimUnit,
    pub quantity: u32,
    pub cargo_form: String,
    pub calendar_year: i32,
    pub commodities: Vec<String>,
    pub origin: String,
    pub location: String,
}

fn boxes_for_quantity(quantity: u32, items_per_box: u32) -> u32 {
    if items_per_box == 0 {
        return 0;
    }
    quantity.div_ceil(items_per_box)
}

/// Translates one F280 row into a `Consignment`. `items_per_box` is supplied
/// by the caller's configuration, since F280 carries only a total quantity.
#[must_use]
pub fn from_f280_record(record: &F280Record, items_per_box: u32) -> Consignment {
    let boxes = boxes_for_quantity(record.quantity, items_per_box);
    Consignment::new(
        boxes,
        items_per_box,
        record.commodity.clone(),
        record.origin.clone(),
        record.location.clone(),
        record.report_date,
        record.pathway.clone(),
    )
}

/// Translates one AQIM row into a `Consignment`. Only the first entry of
/// `COMMODITY_LIST` is used as the consignment's single `commodity` field
/// (a consignment carries one commodity in this model); `CARGO_FORM` is
/// carried through as `pathway`, since AQIM has no dedicated pathway column.
#[must_use]
pub fn from_aqim_record(record: &AqimRecord, items_per_box: u32) -> Consignment {
    let (boxes, items_per_box) = match record.unit {
        AqimUnit::Boxes => (record.quantity, items_per_box),
        AqimUnit::Items => (boxes_for_quantity(record.quantity, items_per_box), items_per_box),
    };
    let commodity = record.commodities.first().cloned().unwrap_or_default();
    let date = NaiveDate::from_ymd_opt(record.calendar_year, 1, 1).unwrap_or(NaiveDate::MIN);
    Consignment::new(boxes, items_per_box, commodity, record.origin.clone(), record.location.clone(), date, record.cargo_form.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sample_params() -> GeneratorParams {
        GeneratorParams {
            boxes_min: 2,
            boxes_max: 5,
            items_per_box_min: 10,
            items_per_box_max: 20,
            commodities: vec!["apples".to_string(), "pears".to_string()],
            origins: vec!["mexico".to_string()],
            ports: vec!["laredo".to_string()],
            pathways: vec!["maritime".to_string()],
            date_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            date_end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        }
    }

    #[test]
    fn generated_consignment_respects_bounds() {
        let params = sample_params();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            let c = generate_from_parameters(&params, &mut rng).unwrap();
            assert!((params.boxes_min..=params.boxes_max).contains(&c.boxes));
            assert!((params.items_per_box_min..=params.items_per_box_max).contains(&c.items_per_box));
            assert!(params.commodities.contains(&c.commodity));
            assert!((params.date_start..=params.date_end).contains(&c.date));
        }
    }

    #[test]
    fn rejects_inverted_bounds() {
        let mut params = sample_params();
        params.boxes_min = 10;
        params.boxes_max = 2;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(generate_from_parameters(&params, &mut rng).is_err());
    }

    #[test]
    fn f280_record_translates_quantity_into_boxes() {
        let record = F280Record {
            quantity: 95,
            pathway: "Maritime".to_string(),
            report_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            commodity: "mangoes".to_string(),
            origin: "brazil".to_string(),
            location: "miami".to_string(),
        };
        let c = from_f280_record(&record, 20);
        assert_eq!(c.boxes, 5); // ceil(95/20)
        assert_eq!(c.items_per_box, 20);
        assert_eq!(c.pathway, "Maritime");
    }

    #[test]
    fn aqim_record_in_boxes_unit_uses_quantity_directly() {
        let record = AqimRecord {
            unit: AqimUnit::Boxes,
            quantity: 7,
            cargo_form: "palletized".to_string(),
            calendar_year: 2023,
            commodities: vec!["citrus".to_string(), "other".to_string()],
            origin: "peru".to_string(),
            location: "long_beach".to_string(),
        };
        let c = from_aqim_record(&record, 15);
        assert_eq!(c.boxes, 7);
        assert_eq!(c.commodity, "citrus");
        assert_eq!(c.date.format("%Y-%m-%d").to_string(), "2023-01-01");
    }
}
