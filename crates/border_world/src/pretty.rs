//! Glyph pretty-printer for consignments (spec §6): one glyph per item
//! (clean vs. contaminated), boxes separated by a delimiter glyph, a header
//! line naming the consignment's box/item counts.

use border_core::Consignment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrettyMode {
    Boxes,
    Items,
    BoxesOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrettyConfig {
    pub flower: String,
    pub bug: String,
    pub horizontal_line: String,
    pub box_line: String,
    pub spaces: usize,
    pub mode: PrettyMode,
}

impl Default for PrettyConfig {
    fn default() -> Self {
        Self {
            flower: ".".to_string(),
            bug: "*".to_string(),
            horizontal_line: "-".to_string(),
            box_line: "|".to_string(),
            spaces: 1,
            mode: PrettyMode::Boxes,
        }
    }
}

fn header(consignment: &Consignment, config: &PrettyConfig) -> String {
    let rule = config.horizontal_line.repeat(2);
    format!(
        "{rule} Consignment {rule} Boxes: {} {rule} Items: {} {rule}",
        consignment.boxes,
        consignment.total_items(),
    )
}

fn item_glyph(consignment: &Consignment, index: usize, config: &PrettyConfig) -> &str {
    if consignment.item_contaminated.get(index) {
        &config.bug
    } else {
        &config.flower
    }
}

fn box_glyph(consignment: &Consignment, box_index: u32, config: &PrettyConfig) -> &str {
    if consignment.box_contaminated(box_index) {
        &config.bug
    } else {
        &config.flower
    }
}

/// Renders one consignment as a header line followed by a glyph body, per
/// `config.mode`.
#[must_use]
pub fn render(consignment: &Consignment, config: &PrettyConfig) -> String {
    let sep = " ".repeat(config.spaces);
    let body = match config.mode {
        PrettyMode::BoxesOnly => (0..consignment.boxes)
            .map(|b| box_glyph(consignment, b, config).to_string())
            .collect::<Vec<_>>()
            .join(&sep),
        PrettyMode::Items => (0..consignment.total_items())
            .map(|i| item_glyph(consignment, i, config).to_string())
            .collect::<Vec<_>>()
            .join(&sep),
        PrettyMode::Boxes => {
            let per_box: Vec<String> = (0..consignment.boxes)
                .map(|b| {
                    let start = consignment.box_start(b);
                    (start..start + consignment.items_per_box as usize)
                        .map(|i| item_glyph(consignment, i, config).to_string())
                        .collect::<Vec<_>>()
                        .join(&sep)
                })
                .collect();
            per_box.join(&format!("{sep}{}{sep}", config.box_line))
        }
    };
    format!("{}\n{body}", header(consignment, config))
}
