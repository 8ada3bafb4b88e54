//! Type definitions for `border_core`.
//!
//! All public data-model types used by the contamination engine, inspection
//! engine, release programs, and the aggregator.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Diagnostic, ItemBitset};

// ---------------------------------------------------------------------------
// Consignment
// ---------------------------------------------------------------------------

/// One shipment: `boxes` boxes of `items_per_box` items each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consignment {
    pub boxes: u32,
    pub items_per_box: u32,
    pub commodity: String,
    pub origin: String,
    pub port: String,
    pub date: NaiveDate,
    pub pathway: String,
    pub item_contaminated: ItemBitset,
    pub item_inspected: ItemBitset,
}

impl Consignment {
    /// Builds an uncontaminated, uninspected consignment of `boxes * items_per_box` items.
    #[must_use]
    pub fn new(
        boxes: u32,
        items_per_box: u32,
        commodity: impl Into<String>,
        origin: impl Into<String>,
        port: impl Into<String>,
        date: NaiveDate,
        pathway: impl Into<String>,
    ) -> Self {
        let n = total_items(boxes, items_per_box);
        Self {
            boxes,
            items_per_box,
            commodity: commodity.into(),
            origin: origin.into(),
            port: port.into(),
            date,
            pathway: pathway.into(),
            item_contaminated: ItemBitset::new(n),
            item_inspected: ItemBitset::new(n),
        }
    }

    /// Total item count `N = B * K`.
    #[must_use]
    pub fn total_items(&self) -> usize {
        total_items(self.boxes, self.items_per_box)
    }

    /// Index of the first item in `box_index` (0-based).
    #[must_use]
    pub fn box_start(&self, box_index: u32) -> usize {
        box_index as usize * self.items_per_box as usize
    }

    /// `box_contaminated[b] ⇔ any item in box b is contaminated` (spec invariant I2).
    #[must_use]
    pub fn box_contaminated(&self, box_index: u32) -> bool {
        let start = self.box_start(box_index);
        let end = start + self.items_per_box as usize;
        (start..end).any(|i| self.item_contaminated.get(i))
    }

    /// Indices of all boxes with at least one contaminated item.
    #[must_use]
    pub fn contaminated_boxes(&self) -> Vec<u32> {
        (0..self.boxes).filter(|&b| self.box_contaminated(b)).collect()
    }

    #[must_use]
    pub fn is_contaminated(&self) -> bool {
        self.item_contaminated.count_ones() > 0
    }
}

#[must_use]
pub fn total_items(boxes: u32, items_per_box: u32) -> usize {
    boxes as usize * items_per_box as usize
}

// ---------------------------------------------------------------------------
// Contamination configuration (spec §3, §4.2)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContaminationUnit {
    Item,
    Box,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateConfig {
    Fixed { value: f64 },
    Beta { a: f64, b: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterDistribution {
    Random,
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InBoxArrangement {
    All,
    First,
    OneRandom,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArrangementConfig {
    Random,
    ClusteredSingle {
        value: f64,
    },
    ClusteredMulti {
        units_per_cluster: usize,
        distribution: ClusterDistribution,
        cluster_item_width: usize,
    },
    RandomBox {
        probability: f64,
        ratio: f64,
        in_box_arrangement: InBoxArrangement,
    },
}

/// Contiguous or distributed subset of contaminated item indices, bounded above
/// by `max_size` (spec §3). Used internally while arranging `clustered-multi`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub indices: Vec<usize>,
    pub max_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContaminationConfig {
    pub unit: ContaminationUnit,
    pub rate: RateConfig,
    pub arrangement: ArrangementConfig,
    /// Per-consignment rule overrides (spec §3 `ConsignmentRule`). `None` means
    /// "no rule list" — every consignment uses the top-level config directly.
    #[serde(default)]
    pub consignments: Option<Vec<ConsignmentRule>>,
}

/// A predicate over consignment attributes, with an optional nested override
/// of the contamination config (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsignmentRule {
    #[serde(default)]
    pub commodity: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub contamination: Option<RuleContaminationOverride>,
    #[serde(default)]
    pub use_contamination_defaults: bool,
}

/// The nested override a `ConsignmentRule` may carry. Only `rate`/`arrangement`
/// are overridable per-rule; `unit` always comes from the top-level config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleContaminationOverride {
    #[serde(default)]
    pub rate: Option<RateConfig>,
    #[serde(default)]
    pub arrangement: Option<ArrangementConfig>,
}

impl ConsignmentRule {
    /// A consignment matches when every present field equals the consignment's
    /// corresponding field, and any present date bound contains the consignment date.
    #[must_use]
    pub fn matches(&self, consignment: &Consignment) -> bool {
        if let Some(ref c) = self.commodity {
            if c != &consignment.commodity {
                return false;
            }
        }
        if let Some(ref o) = self.origin {
            if o != &consignment.origin {
                return false;
            }
        }
        if let Some(ref p) = self.port {
            if p != &consignment.port {
                return false;
            }
        }
        if let Some(start) = self.start_date {
            if consignment.date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if consignment.date > end {
                return false;
            }
        }
        true
    }

    /// Resolves the effective contamination config for a matched consignment:
    /// the rule's own `rate`/`arrangement` where present, falling back to the
    /// top-level config's fields when `use_contamination_defaults` is set.
    #[must_use]
    pub fn resolve(&self, top_level: &ContaminationConfig) -> ContaminationConfig {
        let over = self.contamination.as_ref();
        let rate = over
            .and_then(|o| o.rate)
            .or_else(|| if self.use_contamination_defaults { Some(top_level.rate) } else { None })
            .unwrap_or(top_level.rate);
        let arrangement = over
            .and_then(|o| o.arrangement)
            .or_else(|| {
                if self.use_contamination_defaults {
                    Some(top_level.arrangement)
                } else {
                    None
                }
            })
            .unwrap_or(top_level.arrangement);
        ContaminationConfig {
            unit: top_level.unit,
            rate,
            arrangement,
            consignments: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Inspection configuration (spec §3, §4.3)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionUnit {
    Item,
    Box,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SampleStrategy {
    Proportion { p: f64 },
    Hypergeometric { detection_level: f64, confidence_level: f64 },
    FixedN { n: u32 },
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterSelection {
    Random,
    Interval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionStrategy {
    Random,
    Convenience,
    Cluster { selection: ClusterSelection, interval: u32 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InspectionConfig {
    pub unit: InspectionUnit,
    pub within_box_proportion: f64,
    pub tolerance_level: f64,
    pub sample_strategy: SampleStrategy,
    pub selection_strategy: SelectionStrategy,
    pub min_boxes: u32,
    pub effectiveness: f64,
}

/// What the inspection engine found (spec §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionObservation {
    pub sample_size: usize,
    pub indices_inspected: Vec<usize>,
    pub boxes_opened: Vec<u32>,
    pub detected: bool,
    pub items_inspected_to_detection: u32,
    pub items_inspected_to_completion: u32,
    pub boxes_opened_to_detection: u32,
    pub boxes_opened_to_completion: u32,
    pub missed_contaminants_to_detection: u32,
    pub intercepted_contaminants_to_completion: u32,
    pub any_contaminant_present: bool,
}

// ---------------------------------------------------------------------------
// Release programs (spec §3, §4.4)
// ---------------------------------------------------------------------------

/// Outcome of evaluating a release program against one consignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDecision {
    pub inspect: bool,
    pub program_name: Option<String>,
}

/// Group key for fixed/dynamic skip-lot: an ordered tuple over tracked attributes.
pub type GroupKey = Vec<String>;

/// Per-group dynamic skip-lot state (spec §3). Process-scoped: owned by the
/// orchestrator for one iteration, reset between iterations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicSkipLotState {
    pub level_index: usize,
    pub consecutive_successes: u32,
    pub has_ever_reached_top: bool,
    /// Set after a quick-restate; the next promotion uses
    /// `quick_restate_clearance_number` instead of `clearance_number`.
    pub using_quick_clearance: bool,
}

impl DynamicSkipLotState {
    #[must_use]
    pub fn initial(start_level: usize) -> Self {
        Self {
            level_index: start_level,
            consecutive_successes: 0,
            has_ever_reached_top: false,
            using_quick_clearance: false,
        }
    }
}

pub type DynamicSkipLotStateMap = HashMap<GroupKey, DynamicSkipLotState>;

// ---------------------------------------------------------------------------
// Release program configuration (spec §3, §4.4)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaiveCfrpConfig {
    pub flowers: Vec<String>,
    pub max_boxes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledCfrpRow {
    pub date: NaiveDate,
    pub commodity: String,
    pub origin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledCfrpConfig {
    pub schedule: Vec<ScheduledCfrpRow>,
    #[serde(default)]
    pub ports: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ComplianceLevel {
    pub sampling_fraction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedSkipLotConfig {
    pub group_by: Vec<String>,
    pub table: HashMap<GroupKey, ComplianceLevel>,
    pub default_level: ComplianceLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicSkipLotConfig {
    pub group_by: Vec<String>,
    /// Index 0 is level 1 (spec's 1-based level numbering).
    pub levels: Vec<ComplianceLevel>,
    pub clearance_number: u32,
    /// 1-based, per spec's `start_level` (default 1).
    pub start_level: usize,
    #[serde(default)]
    pub quick_restating: bool,
    #[serde(default)]
    pub quick_restate_clearance_number: Option<u32>,
    /// 1-based level to fall back to on a quick restate; defaults to `L-1`.
    #[serde(default)]
    pub restate_level: Option<usize>,
}

// ---------------------------------------------------------------------------
// Run-level observations (spec §3)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub was_contaminated: bool,
    pub was_inspected: bool,
    pub detected: bool,
    pub true_contamination_rate: f64,
    pub items_inspected_to_detection: u32,
    pub items_inspected_to_completion: u32,
    pub boxes_opened_to_detection: u32,
    pub boxes_opened_to_completion: u32,
    pub missed_contaminants_to_detection: u32,
    pub intercepted_contaminants_to_completion: u32,
    pub release_program_name: Option<String>,
    /// The inspection config's `tolerance_level` in effect when this
    /// consignment ran, carried along so `is_adjusted_slippage` can be
    /// computed later without threading the scenario config around.
    pub tolerance_level: f64,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl RunRecord {
    /// A consignment that was contaminated but never inspected, or inspected
    /// and not detected: slippage (glossary term).
    #[must_use]
    pub fn is_slippage(&self) -> bool {
        self.was_contaminated && !self.detected
    }

    /// Slippage excluding consignments whose true contamination rate fell
    /// below `tolerance_level` (glossary: "adjusted slippage statistic").
    #[must_use]
    pub fn is_adjusted_slippage(&self) -> bool {
        self.is_slippage() && self.true_contamination_rate >= self.tolerance_level
    }
}
