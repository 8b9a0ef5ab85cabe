//! Per-entity quantity outlier suppression.
//!
//! Each entity (part number) is judged against its own quantity history.
//! The upper threshold widens with the entity's volume tier, is capped by
//! dataset-wide percentiles, and is tightened when a single value towers over
//! the rest. Only the upper tail is ever removed.

use crate::stats::QuantityDistribution;
use rfq_core::config::OutlierConfig;
use rfq_core::{
    parse_quantity, EntityOutlierSummary, GlobalQuantityStats, OutlierReport, Result,
    Table, VolumeTier,
};
use std::collections::HashMap;
use tracing::{debug, info};

/// Threshold derived for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityThreshold {
    /// Volume tier.
    pub tier: VolumeTier,
    /// Median quantity.
    pub median: f64,
    /// Interquartile range.
    pub iqr: f64,
    /// Maximum quantity.
    pub max: f64,
    /// Quantities strictly above this are removed.
    pub threshold: f64,
    /// Whether the single-spike rule tightened the threshold.
    pub spike_tightened: bool,
}

/// Outcome of evaluating one entity's quantities.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityVerdict {
    /// Too few numeric values to judge; everything is kept.
    TooFewValues,
    /// Uniformly large quantities; everything is kept.
    ConsistentHighVolume,
    /// Spread is within normal business variation; everything is kept.
    LegitimateVariation,
    /// Values above the threshold are removed.
    Threshold(EntityThreshold),
}

/// Removes excessively high quantities relative to same-entity history.
#[derive(Debug, Clone)]
pub struct QuantityOutlierFilter {
    config: OutlierConfig,
    entity_column: String,
    quantity_column: String,
}

impl QuantityOutlierFilter {
    /// Create a filter over the given columns.
    pub fn new(
        config: OutlierConfig,
        entity_column: impl Into<String>,
        quantity_column: impl Into<String>,
    ) -> Self {
        Self {
            config,
            entity_column: entity_column.into(),
            quantity_column: quantity_column.into(),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &OutlierConfig {
        &self.config
    }

    /// Check that the table carries the entity and quantity columns.
    pub fn check_schema(&self, table: &Table) -> Result<()> {
        self.resolve_columns(table).map(|_| ())
    }

    fn resolve_columns(&self, table: &Table) -> Result<(usize, usize)> {
        Ok((
            table.column_index(&self.entity_column)?,
            table.column_index(&self.quantity_column)?,
        ))
    }

    /// Evaluate one entity's valid quantities against dataset-wide statistics.
    pub fn evaluate(&self, quantities: &[f64], global: &GlobalQuantityStats) -> EntityVerdict {
        let cfg = &self.config;

        if quantities.len() < cfg.min_values {
            return EntityVerdict::TooFewValues;
        }
        let Some(dist) = QuantityDistribution::new(quantities.iter().copied()) else {
            return EntityVerdict::TooFewValues;
        };

        let median = dist.median();
        let q3 = dist.q3();
        let iqr = dist.iqr();
        let min = dist.min();
        let max = dist.max();

        let tier = VolumeTier::classify(median, cfg.low_tier_max_median, cfg.medium_tier_max_median);
        let mut threshold = self.tier_threshold(tier, median, q3, iqr, max, global);

        if let Some(ceiling) = cfg.absolute_ceiling {
            threshold = threshold.min(ceiling);
        }

        if min > cfg.consistent_min_quantity && max <= median * cfg.consistent_max_median_ratio {
            return EntityVerdict::ConsistentHighVolume;
        }
        if max <= median * cfg.legitimate_max_median_ratio && median > 0.0 {
            return EntityVerdict::LegitimateVariation;
        }

        let mut spike_tightened = false;
        if dist.len() >= cfg.spike_min_values {
            if let Some((highest, second)) = dist.top_two() {
                if highest > second * cfg.spike_ratio && second > 0.0 {
                    let tightened = second * cfg.spike_second_mult;
                    if tightened < threshold {
                        threshold = tightened;
                        spike_tightened = true;
                    }
                }
            }
        }

        // Nothing at or below the median is ever removed
        threshold = threshold.max(median);

        EntityVerdict::Threshold(EntityThreshold {
            tier,
            median,
            iqr,
            max,
            threshold,
            spike_tightened,
        })
    }

    /// Tier-specific threshold, capped by dataset-wide percentiles.
    fn tier_threshold(
        &self,
        tier: VolumeTier,
        median: f64,
        q3: f64,
        iqr: f64,
        max: f64,
        global: &GlobalQuantityStats,
    ) -> f64 {
        let cfg = &self.config;

        match tier {
            VolumeTier::Low => {
                let mut t = if iqr == 0.0 {
                    (median * cfg.low_flat_median_mult).max(cfg.low_flat_floor)
                } else {
                    (q3 + cfg.low_iqr_mult * iqr).max(cfg.low_iqr_floor)
                };
                if max > global.p99 * cfg.low_global_p99_trigger {
                    t = t.min(global.p99 * cfg.low_global_p99_cap);
                }
                t
            }
            VolumeTier::Medium => {
                let mut t = if iqr == 0.0 {
                    median * cfg.medium_flat_median_mult
                } else {
                    (q3 + cfg.medium_iqr_mult * iqr).max(median * cfg.medium_floor_median_mult)
                };
                if max > global.p999 * cfg.medium_global_p999_trigger {
                    t = t.min(global.p999 * cfg.medium_global_p999_cap);
                }
                t
            }
            VolumeTier::High => {
                let mut t = if iqr == 0.0 {
                    median * cfg.high_flat_median_mult
                } else {
                    (q3 + cfg.high_iqr_mult * iqr).max(median * cfg.high_floor_median_mult)
                };
                if max > global.p999 * cfg.high_global_p999_trigger {
                    t = t.min(global.p999 * cfg.high_global_p999_cap);
                }
                t
            }
        }
    }

    /// Remove outlier records.
    pub fn remove_quantity_outliers(&self, table: &Table) -> Result<Table> {
        self.remove_quantity_outliers_with_report(table).map(|(t, _)| t)
    }

    /// Remove outlier records and report what was removed.
    pub fn remove_quantity_outliers_with_report(
        &self,
        table: &Table,
    ) -> Result<(Table, OutlierReport)> {
        let mut report = OutlierReport {
            original_rows: table.len(),
            ..Default::default()
        };

        if table.is_empty() {
            info!("empty table, nothing to filter");
            return Ok((table.clone(), report));
        }

        let (entity_col, qty_col) = self.resolve_columns(table)?;

        let quantities: Vec<Option<f64>> =
            table.column_values(qty_col).map(parse_quantity).collect();

        let Some(global) =
            QuantityDistribution::new(quantities.iter().flatten().copied()).map(|d| d.global_stats())
        else {
            info!("no valid numeric quantities found");
            return Ok((table.clone(), report));
        };

        info!(
            median = global.median,
            p95 = global.p95,
            p99 = global.p99,
            p999 = global.p999,
            "global quantity statistics"
        );

        let mut removed = vec![false; table.len()];

        for (entity, rows) in group_by_entity(table, entity_col) {
            let values: Vec<f64> = rows.iter().filter_map(|&r| quantities[r]).collect();

            let limits = match self.evaluate(&values, &global) {
                EntityVerdict::Threshold(limits) => limits,
                verdict => {
                    debug!(entity, ?verdict, "entity kept in full");
                    continue;
                }
            };

            let mut removed_quantities = Vec::new();
            for &row in &rows {
                if let Some(q) = quantities[row] {
                    if q > limits.threshold {
                        removed[row] = true;
                        removed_quantities.push(q);
                    }
                }
            }

            if removed_quantities.is_empty() {
                continue;
            }

            debug!(
                entity,
                tier = %limits.tier,
                median = limits.median,
                iqr = limits.iqr,
                threshold = limits.threshold,
                removed = ?removed_quantities,
                "removed quantity outliers"
            );

            report.entities.push(EntityOutlierSummary {
                entity: entity.to_string(),
                tier: limits.tier,
                median: limits.median,
                iqr: limits.iqr,
                max_before: limits.max,
                threshold: limits.threshold,
                removed_quantities,
            });
        }

        let kept: Vec<usize> = (0..table.len()).filter(|&r| !removed[r]).collect();
        report.removed_rows = table.len() - kept.len();
        report.global = Some(global);

        info!(
            original = report.original_rows,
            removed = report.removed_rows,
            remaining = report.final_rows(),
            entities = report.entities.len(),
            removal_rate_pct = report.removal_rate() * 100.0,
            "quantity outlier detection complete"
        );

        Ok((table.select_rows(&kept), report))
    }
}

/// Remove quantity outliers from `table`, grouping by `entity_column`.
///
/// `absolute_ceiling`, when given, caps every entity's threshold.
pub fn remove_quantity_outliers(
    table: &Table,
    entity_column: &str,
    quantity_column: &str,
    absolute_ceiling: Option<f64>,
) -> Result<Table> {
    let config = OutlierConfig {
        absolute_ceiling,
        ..OutlierConfig::default()
    };
    config.validate()?;
    QuantityOutlierFilter::new(config, entity_column, quantity_column).remove_quantity_outliers(table)
}

/// Group row indices by entity, in first-appearance order.
///
/// Rows with an empty entity cell belong to no entity and are never judged.
fn group_by_entity(table: &Table, entity_col: usize) -> Vec<(&str, Vec<usize>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();

    for row in 0..table.len() {
        let entity = table.cell(row, entity_col);
        if entity.trim().is_empty() {
            continue;
        }
        let slot = *index.entry(entity).or_insert_with(|| {
            groups.push((entity, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(row);
    }

    groups
}
