use border_core::RunRecord;
use serde::Serialize;

type Extractor = (&'static str, Box<dyn Fn(&RunRecord) -> f64>);

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub consignment_count: usize,
    pub contaminated_count: usize,
    pub inspected_count: usize,
    pub detected_count: usize,
    pub slippage_count: usize,
    /// Slippage excluding consignments whose true contamination rate fell
    /// below the inspection config's `tolerance_level` (glossary: "adjusted
    /// slippage statistic").
    pub adjusted_slippage_count: usize,
    /// `false` when cancellation cut one or more iterations short (spec §7):
    /// the aggregate below still reflects whatever ran, it just isn't the
    /// full requested grid.
    pub incomplete: bool,
    pub metrics: Vec<MetricSummary>,
}

#[derive(Debug, Serialize)]
pub struct MetricSummary {
    pub name: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
}

/// Aggregates every `RunRecord` produced across all (scenario, simulation)
/// iterations into one set of rates plus per-metric mean/min/max/stddev.
pub fn compute_summary(records: &[RunRecord], incomplete: bool) -> SummaryStats {
    let consignment_count = records.len();
    let contaminated_count = records.iter().filter(|r| r.was_contaminated).count();
    let inspected_count = records.iter().filter(|r| r.was_inspected).count();
    let detected_count = records.iter().filter(|r| r.detected).count();
    let slippage_count = records.iter().filter(|r| r.is_slippage()).count();
    let adjusted_slippage_count = records.iter().filter(|r| r.is_adjusted_slippage()).count();

    let extractors: Vec<Extractor> = vec![
        ("true_contamination_rate", Box::new(|r: &RunRecord| r.true_contamination_rate)),
        ("items_inspected_to_completion", Box::new(|r: &RunRecord| f64::from(r.items_inspected_to_completion))),
        ("boxes_opened_to_completion", Box::new(|r: &RunRecord| f64::from(r.boxes_opened_to_completion))),
        (
            "missed_contaminants_to_detection",
            Box::new(|r: &RunRecord| f64::from(r.missed_contaminants_to_detection)),
        ),
        (
            "intercepted_contaminants_to_completion",
            Box::new(|r: &RunRecord| f64::from(r.intercepted_contaminants_to_completion)),
        ),
    ];

    let metrics = extractors
        .iter()
        .map(|(name, extract)| {
            let values: Vec<f64> = records.iter().map(|r| extract(r)).collect();
            compute_metric_summary(name, &values)
        })
        .collect();

    SummaryStats {
        consignment_count,
        contaminated_count,
        inspected_count,
        detected_count,
        slippage_count,
        adjusted_slippage_count,
        incomplete,
        metrics,
    }
}

fn compute_metric_summary(name: &str, values: &[f64]) -> MetricSummary {
    if values.is_empty() {
        return MetricSummary { name: name.to_string(), mean: 0.0, min: 0.0, max: 0.0, stddev: 0.0 };
    }
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
    let stddev = variance.sqrt();

    MetricSummary { name: name.to_string(), mean, min, max, stddev }
}

pub fn print_summary(label: &str, stats: &SummaryStats) {
    let rate = |count: usize| {
        if stats.consignment_count == 0 {
            0.0
        } else {
            count as f64 / stats.consignment_count as f64
        }
    };
    println!("\n=== {} ({} consignments) ===\n", label, stats.consignment_count);
    println!("{:<30} {:>10}", "contamination_rate", format!("{:.4}", rate(stats.contaminated_count)));
    println!("{:<30} {:>10}", "inspection_rate", format!("{:.4}", rate(stats.inspected_count)));
    println!("{:<30} {:>10}", "detection_rate", format!("{:.4}", rate(stats.detected_count)));
    println!("{:<30} {:>10}", "slippage_rate", format!("{:.4}", rate(stats.slippage_count)));
    println!("{:<30} {:>10}", "adjusted_slippage_rate", format!("{:.4}", rate(stats.adjusted_slippage_count)));
    if stats.incomplete {
        println!("{:<30} {:>10}", "incomplete", "true");
    }
    println!();
    println!("{:<40} {:>8} {:>8} {:>8} {:>8}", "Metric", "Mean", "Min", "Max", "StdDev");
    println!("{}", "-".repeat(80));
    for metric in &stats.metrics {
        println!(
            "{:<40} {:>8.2} {:>8.2} {:>8.2} {:>8.2}",
            metric.name, metric.mean, metric.min, metric.max, metric.stddev
        );
    }
}
