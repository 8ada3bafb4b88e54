//! Shared test helpers, gated behind `cfg(test)` or the `test-support` feature
//! so downstream crates (`border_world`, `border_bench`) can reuse them in
//! their own test suites without duplicating boilerplate.

use chrono::NaiveDate;

use crate::Consignment;

/// An uncontaminated, uninspected consignment with placeholder metadata.
#[must_use]
pub fn consignment(boxes: u32, items_per_box: u32) -> Consignment {
    Consignment::new(
        boxes,
        items_per_box,
        "apples",
        "mexico",
        "laredo",
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        "maritime",
    )
}

/// Same as [`consignment`] but with caller-supplied commodity/origin, the two
/// fields most `ConsignmentRule` tests match on.
#[must_use]
pub fn consignment_with(boxes: u32, items_per_box: u32, commodity: &str, origin: &str) -> Consignment {
    Consignment::new(
        boxes,
        items_per_box,
        commodity,
        origin,
        "laredo",
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        "maritime",
    )
}
