//! F280 output record emission (spec §6): space-separated
//! `DATE PORT ORIGIN COMMODITY ACTION` lines.

use std::io::{self, Write};

use border_core::{Consignment, RunRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Release,
    Prohibit,
}

impl Action {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Release => "RELEASE",
            Action::Prohibit => "PROHIBIT",
        }
    }
}

/// `PROHIBIT` when the consignment was inspected and detected contaminated;
/// `RELEASE` otherwise (released by a program, or inspected and passed).
#[must_use]
pub fn action_for(record: &RunRecord) -> Action {
    if record.was_inspected && record.detected {
        Action::Prohibit
    } else {
        Action::Release
    }
}

#[must_use]
pub fn format_record(consignment: &Consignment, record: &RunRecord) -> String {
    format!(
        "{} {} {} {} {}",
        consignment.date.format("%Y-%m-%d"),
        consignment.port,
        consignment.origin,
        consignment.commodity,
        action_for(record).as_str(),
    )
}

/// Writes one F280 output line per `(consignment, record)` pair.
pub fn write_records<W: Write>(
    mut writer: W,
    rows: impl IntoIterator<Item = (Consignment, RunRecord)>,
) -> io::Result<()> {
    for (consignment, record) in rows {
        writeln!(writer, "{}", format_record(&consignment, &record))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use border_core::test_fixtures::consignment_with;

    fn base_record() -> RunRecord {
        RunRecord {
            was_contaminated: false,
            was_inspected: false,
            detected: false,
            true_contamination_rate: 0.0,
            items_inspected_to_detection: 0,
            items_inspected_to_completion: 0,
            boxes_opened_to_detection: 0,
            boxes_opened_to_completion: 0,
            missed_contaminants_to_detection: 0,
            intercepted_contaminants_to_completion: 0,
            release_program_name: None,
            tolerance_level: 0.0,
            diagnostics: vec![],
        }
    }

    #[test]
    fn detected_consignment_is_prohibited() {
        let mut record = base_record();
        record.was_inspected = true;
        record.detected = true;
        assert_eq!(action_for(&record), Action::Prohibit);
    }

    #[test]
    fn released_by_program_is_released() {
        let mut record = base_record();
        record.release_program_name = Some("naive_cfrp".to_string());
        assert_eq!(action_for(&record), Action::Release);
    }

    #[test]
    fn inspected_and_clean_is_released() {
        let mut record = base_record();
        record.was_inspected = true;
        record.detected = false;
        assert_eq!(action_for(&record), Action::Release);
    }

    #[test]
    fn format_record_is_space_separated() {
        let c = consignment_with(2, 10, "apples", "mexico");
        let mut record = base_record();
        record.was_inspected = true;
        record.detected = true;
        let line = format_record(&c, &record);
        let fields: Vec<&str> = line.split(' ').collect();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[4], "PROHIBIT");
    }
}
