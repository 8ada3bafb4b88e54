//! Contamination engine (spec §4.2).
//!
//! `contaminate` mutates a consignment's `item_contaminated` bitmap in place
//! according to a resolved [`ContaminationConfig`]. Rule resolution (matching
//! a [`ConsignmentRule`] against a consignment) is a separate step so callers
//! can distinguish "no rule matched, left uncontaminated" from "matched and
//! drew zero contaminated units".

use std::borrow::Cow;

use crate::rng;
use crate::{
    ArrangementConfig, ClusterDistribution, ConfigError, Consignment, ContaminationConfig,
    ContaminationUnit, Diagnostic, DiagnosticKind, InBoxArrangement, RateConfig,
};

/// Outcome of one `contaminate` call, independent of what ended up in the bitmap.
#[derive(Debug, Clone, Default)]
pub struct ContaminationOutcome {
    pub true_contamination_rate: f64,
    pub diagnostics: Vec<Diagnostic>,
}

/// Rejects structurally invalid contamination configuration up front (spec
/// §7: configuration errors are fatal and pre-run, not raised once per
/// consignment). Mirrors the checks `clustered_multi` otherwise repeats for
/// every contaminated consignment.
pub fn validate(config: &ContaminationConfig) -> Result<(), ConfigError> {
    if let ArrangementConfig::ClusteredMulti {
        units_per_cluster,
        distribution,
        cluster_item_width,
    } = config.arrangement
    {
        if units_per_cluster == 0 {
            return Err(ConfigError::config(
                "contamination/arrangement/units_per_cluster",
                "units_per_cluster must be > 0",
            ));
        }
        if matches!(distribution, ClusterDistribution::Random) && cluster_item_width < units_per_cluster {
            return Err(ConfigError::config(
                "contamination/arrangement/cluster_item_width",
                format!(
                    "cluster_item_width ({cluster_item_width}) must be >= units_per_cluster ({units_per_cluster}) for distribution=random"
                ),
            ));
        }
    }
    Ok(())
}

/// Resolves the effective config for `consignment` (spec §4.2 step 1).
///
/// `None` means "rule list present but nothing matched" — the consignment is
/// left uncontaminated. `Some` carries the config to actually contaminate with
/// (either the top-level config unchanged, or a rule's resolved override).
#[must_use]
pub fn resolve_config<'a>(
    consignment: &Consignment,
    config: &'a ContaminationConfig,
) -> Option<Cow<'a, ContaminationConfig>> {
    match &config.consignments {
        None => Some(Cow::Borrowed(config)),
        Some(rules) => rules
            .iter()
            .find(|rule| rule.matches(consignment))
            .map(|rule| Cow::Owned(rule.resolve(config))),
    }
}

/// Mutates `consignment.item_contaminated` per the resolved config (spec §4.2).
///
/// Returns the drawn true contamination rate and any recoverable diagnostics.
/// Does not perform rule resolution — call [`resolve_config`] first and skip
/// this call entirely (leaving the consignment clean) when it returns `None`.
pub fn contaminate(
    consignment: &mut Consignment,
    config: &ContaminationConfig,
    rng: &mut impl rand::Rng,
) -> Result<ContaminationOutcome, ConfigError> {
    let n = consignment.total_items();
    if n == 0 {
        return Ok(ContaminationOutcome {
            true_contamination_rate: 0.0,
            diagnostics: vec![Diagnostic::new(
                DiagnosticKind::EmptyConsignment,
                "consignment has 0 boxes; contamination skipped",
            )],
        });
    }

    if let ArrangementConfig::RandomBox {
        probability,
        ratio,
        in_box_arrangement,
    } = config.arrangement
    {
        return contaminate_random_box(consignment, config, probability, ratio, in_box_arrangement, rng);
    }

    let r = draw_rate(&config.rate, rng)?;
    let mut diagnostics = Vec::new();

    match config.unit {
        ContaminationUnit::Box => {
            let target_boxes_real = r * f64::from(consignment.boxes);
            let full_boxes = target_boxes_real.floor();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let full_boxes_n = full_boxes as u32;
            let residual_fraction = target_boxes_real - full_boxes;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let residual_items = (residual_fraction * f64::from(consignment.items_per_box)).round() as usize;
            let prefix_len = (full_boxes_n as usize * consignment.items_per_box as usize + residual_items).min(n);
            for i in 0..prefix_len {
                consignment.item_contaminated.set(i, true);
            }
        }
        ContaminationUnit::Item => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let mut target = (r * n as f64).round() as usize;
            if target > n {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::ClampedToPopulation {
                        requested: target,
                        available: n,
                    },
                    format!("contamination target {target} clamped to population {n}"),
                ));
                target = n;
            }
            let indices = arrange_item_unit(consignment, target, &config.arrangement, rng, &mut diagnostics)?;
            for i in indices {
                consignment.item_contaminated.set(i, true);
            }
        }
    }

    Ok(ContaminationOutcome {
        true_contamination_rate: r,
        diagnostics,
    })
}

fn draw_rate(rate: &RateConfig, rng: &mut impl rand::Rng) -> Result<f64, ConfigError> {
    match *rate {
        RateConfig::Fixed { value } => Ok(value.clamp(0.0, 1.0)),
        RateConfig::Beta { a, b } => rng::beta(rng, a, b),
    }
}

fn arrange_item_unit(
    consignment: &Consignment,
    target: usize,
    arrangement: &ArrangementConfig,
    rng: &mut impl rand::Rng,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<usize>, ConfigError> {
    let n = consignment.total_items();
    match *arrangement {
        ArrangementConfig::Random => Ok(rng::choice_without_replacement(rng, n, target)),
        ArrangementConfig::ClusteredSingle { value } => {
            Ok(clustered_single(n, target, value, rng))
        }
        ArrangementConfig::ClusteredMulti {
            units_per_cluster,
            distribution,
            cluster_item_width,
        } => clustered_multi(
            n,
            target,
            units_per_cluster,
            distribution,
            cluster_item_width,
            rng,
            diagnostics,
        ),
        ArrangementConfig::RandomBox { .. } => {
            unreachable!("random_box is handled by contaminate_random_box")
        }
    }
}

/// `clustered-single`: a circular window of size `s` around a random start,
/// from which `target` indices are drawn without replacement.
///
/// `value == 0.0` is treated as exactly `random` (spec §9 open question).
fn clustered_single(n: usize, target: usize, value: f64, rng: &mut impl rand::Rng) -> Vec<usize> {
    if value == 0.0 {
        return rng::choice_without_replacement(rng, n, target);
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let by_value = (n as f64 / (1.0 + value)).round() as usize;
    let s = target.max(by_value).min(n);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let s0 = rng::uniform_int(rng, 0, n as i64 - 1) as usize;
    let window: Vec<usize> = (0..s).map(|i| (s0 + i) % n).collect();
    let picked = rng::choice_without_replacement(rng, window.len(), target);
    picked.into_iter().map(|i| window[i]).collect()
}

/// `clustered-multi`: partitions `target` into clusters of size `<=
/// units_per_cluster`, then places each cluster within a non-overlapping
/// stratum.
///
/// For `distribution=random`, strata are fixed-width (`cluster_item_width`)
/// tiles of `N`, chosen at random, with the cluster's items placed uniformly
/// without replacement inside the tile. For `distribution=continuous`, each
/// stratum's width equals its own cluster size, and the whole stratum is
/// contaminated (i.e. placed contiguously).
fn clustered_multi(
    n: usize,
    target: usize,
    units_per_cluster: usize,
    distribution: ClusterDistribution,
    cluster_item_width: usize,
    rng: &mut impl rand::Rng,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<usize>, ConfigError> {
    if units_per_cluster == 0 {
        return Err(ConfigError::config(
            "contamination/arrangement/units_per_cluster",
            "units_per_cluster must be > 0",
        ));
    }
    if matches!(distribution, ClusterDistribution::Random) && cluster_item_width < units_per_cluster {
        return Err(ConfigError::config(
            "contamination/arrangement/cluster_item_width",
            format!(
                "cluster_item_width ({cluster_item_width}) must be >= units_per_cluster ({units_per_cluster}) for distribution=random"
            ),
        ));
    }

    let cluster_sizes = partition_into_clusters(target, units_per_cluster);
    let num_clusters = cluster_sizes.len();
    if num_clusters == 0 {
        return Ok(Vec::new());
    }

    let mut contaminated = Vec::with_capacity(target);
    match distribution {
        ClusterDistribution::Random => {
            let width = cluster_item_width.max(1);
            let num_strata = (n / width).max(1);
            let stratum_indices = rng::choice_without_replacement(rng, num_strata, num_clusters);
            if stratum_indices.len() < num_clusters {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::ClampedToPopulation {
                        requested: num_clusters,
                        available: stratum_indices.len(),
                    },
                    "fewer strata available than clusters requested; reusing strata",
                ));
            }
            for (cluster_idx, &cluster_size) in cluster_sizes.iter().enumerate() {
                let stratum = stratum_indices[cluster_idx % stratum_indices.len().max(1)];
                let start = stratum * width;
                let actual_width = width.min(n - start);
                let within = rng::choice_without_replacement(rng, actual_width, cluster_size);
                contaminated.extend(within.into_iter().map(|i| start + i));
            }
        }
        ClusterDistribution::Continuous => {
            let tile_width = units_per_cluster;
            let num_tiles = (n / tile_width).max(1);
            let tile_indices = rng::choice_without_replacement(rng, num_tiles, num_clusters);
            for (cluster_idx, &cluster_size) in cluster_sizes.iter().enumerate() {
                let tile = tile_indices[cluster_idx % tile_indices.len().max(1)];
                let start = tile * tile_width;
                let actual_width = tile_width.min(n - start);
                let take = cluster_size.min(actual_width);
                contaminated.extend(start..start + take);
            }
        }
    }
    Ok(contaminated)
}

/// Splits `target` into chunks of at most `max_chunk`, last chunk holds the remainder.
fn partition_into_clusters(target: usize, max_chunk: usize) -> Vec<usize> {
    if target == 0 || max_chunk == 0 {
        return Vec::new();
    }
    let mut remaining = target;
    let mut sizes = Vec::new();
    while remaining > 0 {
        let size = remaining.min(max_chunk);
        sizes.push(size);
        remaining -= size;
    }
    sizes
}

#[allow(clippy::too_many_arguments)]
fn contaminate_random_box(
    consignment: &mut Consignment,
    config: &ContaminationConfig,
    probability: f64,
    ratio: f64,
    in_box_arrangement: InBoxArrangement,
    rng: &mut impl rand::Rng,
) -> Result<ContaminationOutcome, ConfigError> {
    if !rng::bernoulli(rng, probability) {
        return Ok(ContaminationOutcome {
            true_contamination_rate: 0.0,
            diagnostics: Vec::new(),
        });
    }

    let b = consignment.boxes as usize;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let num_boxes = (ratio * b as f64).ceil() as usize;
    let num_boxes = num_boxes.min(b);
    let chosen_boxes = rng::choice_without_replacement(rng, b, num_boxes);

    let k = consignment.items_per_box as usize;
    let mut diagnostics = Vec::new();
    let mut contaminated_item_count = 0usize;

    for box_idx in chosen_boxes {
        #[allow(clippy::cast_possible_truncation)]
        let start = box_idx * k;
        match in_box_arrangement {
            InBoxArrangement::All => {
                for i in start..start + k {
                    consignment.item_contaminated.set(i, true);
                }
                contaminated_item_count += k;
            }
            InBoxArrangement::First => {
                consignment.item_contaminated.set(start, true);
                contaminated_item_count += 1;
            }
            InBoxArrangement::OneRandom => {
                let offset = rng::uniform_int(rng, 0, k as i64 - 1);
                #[allow(clippy::cast_sign_loss)]
                consignment.item_contaminated.set(start + offset as usize, true);
                contaminated_item_count += 1;
            }
            InBoxArrangement::Random => {
                let within_box_rate = draw_rate(&config.rate, rng)?;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let count = (within_box_rate * k as f64).round() as usize;
                let count = count.min(k);
                let indices = rng::choice_without_replacement(rng, k, count);
                for i in indices {
                    consignment.item_contaminated.set(start + i, true);
                }
                contaminated_item_count += count;
            }
        }
    }

    let n = consignment.total_items();
    #[allow(clippy::cast_precision_loss)]
    let effective_rate = if n == 0 { 0.0 } else { contaminated_item_count as f64 / n as f64 };

    Ok(ContaminationOutcome {
        true_contamination_rate: effective_rate,
        diagnostics,
    })
}
