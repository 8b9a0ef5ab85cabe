//! Per-entity quantity profiles.
//!
//! A read-only summary of each entity's quantity distribution, used to review
//! what the outlier filter will see before anything is removed.

use crate::stats::QuantityDistribution;
use rfq_core::config::OutlierConfig;
use rfq_core::{parse_quantity, Result, Table, VolumeTier};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::HashMap;

/// Distribution summary of one entity's valid quantities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityQuantityProfile {
    /// Entity identifier (part number).
    pub entity: String,
    /// Number of valid numeric quantities.
    pub count: usize,
    /// Smallest quantity.
    pub min: f64,
    /// Largest quantity.
    pub max: f64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Median quantity.
    pub median: f64,
    /// Sample standard deviation; zero for a single value.
    pub std_dev: f64,
    /// 75th percentile.
    pub q75: f64,
    /// 95th percentile.
    pub q95: f64,
    /// Volume tier of the median.
    pub tier: VolumeTier,
}

impl EntityQuantityProfile {
    /// Ratio of the maximum to the median, when the median is positive.
    pub fn max_to_median(&self) -> Option<f64> {
        (self.median > 0.0).then(|| self.max / self.median)
    }
}

/// Profile every entity with at least one valid quantity.
///
/// Profiles are returned in order of first appearance.
pub fn profile_entities(
    table: &Table,
    entity_column: &str,
    quantity_column: &str,
    config: &OutlierConfig,
) -> Result<Vec<EntityQuantityProfile>> {
    let entity_col = table.column_index(entity_column)?;
    let qty_col = table.column_index(quantity_column)?;

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut samples: Vec<(&str, Vec<f64>)> = Vec::new();

    for row in 0..table.len() {
        let entity = table.cell(row, entity_col);
        let Some(qty) = parse_quantity(table.cell(row, qty_col)) else {
            continue;
        };
        if entity.trim().is_empty() {
            continue;
        }
        let slot = *index.entry(entity).or_insert_with(|| {
            samples.push((entity, Vec::new()));
            samples.len() - 1
        });
        samples[slot].1.push(qty);
    }

    let profiles = samples
        .into_iter()
        .filter_map(|(entity, values)| profile(entity, values, config))
        .collect();

    Ok(profiles)
}

fn profile(
    entity: &str,
    values: Vec<f64>,
    config: &OutlierConfig,
) -> Option<EntityQuantityProfile> {
    let mean = values.iter().mean();
    let std_dev = if values.len() > 1 {
        values.iter().std_dev()
    } else {
        0.0
    };
    let dist = QuantityDistribution::new(values)?;
    let median = dist.median();

    Some(EntityQuantityProfile {
        entity: entity.to_string(),
        count: dist.len(),
        min: dist.min(),
        max: dist.max(),
        mean,
        median,
        std_dev,
        q75: dist.q3(),
        q95: dist.quantile(0.95),
        tier: VolumeTier::classify(
            median,
            config.low_tier_max_median,
            config.medium_tier_max_median,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn table(rows: &[(&str, &str)]) -> Table {
        Table::new(
            vec!["Part Number".into(), "Quantity".into()],
            rows.iter()
                .map(|(p, q)| vec![p.to_string(), q.to_string()])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_profile_values() {
        let rows: Vec<(&str, &str)> = ["2", "4", "4", "4", "5", "5", "7", "9"]
            .iter()
            .map(|q| ("P1", *q))
            .collect();
        let t = table(&rows);
        let profiles =
            profile_entities(&t, "Part Number", "Quantity", &OutlierConfig::default()).unwrap();

        assert_eq!(profiles.len(), 1);
        let p = &profiles[0];
        assert_eq!(p.count, 8);
        assert_relative_eq!(p.mean, 5.0, epsilon = 1e-12);
        assert_relative_eq!(p.median, 4.5);
        // Sample variance 32 / 7
        assert_relative_eq!(p.std_dev, (32.0f64 / 7.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(p.min, 2.0);
        assert_relative_eq!(p.max, 9.0);
        assert_relative_eq!(p.q75, 5.5);
        assert_eq!(p.tier, VolumeTier::Low);
        assert_relative_eq!(p.max_to_median().unwrap(), 2.0);
    }

    #[test]
    fn test_profiles_in_first_appearance_order() {
        let t = table(&[
            ("B", "500"),
            ("A", "50"),
            ("B", "700"),
            ("", "1"),
            ("C", "n/a"),
        ]);
        let profiles =
            profile_entities(&t, "Part Number", "Quantity", &OutlierConfig::default()).unwrap();

        let names: Vec<&str> = profiles.iter().map(|p| p.entity.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(profiles[0].tier, VolumeTier::High);
        assert_eq!(profiles[1].tier, VolumeTier::Medium);
        assert_eq!(profiles[1].std_dev, 0.0);
    }

    #[test]
    fn test_zero_median_has_no_ratio() {
        let t = table(&[("Z", "0"), ("Z", "0"), ("Z", "3")]);
        let profiles =
            profile_entities(&t, "Part Number", "Quantity", &OutlierConfig::default()).unwrap();
        assert!(profiles[0].max_to_median().is_none());
    }

    #[test]
    fn test_missing_column() {
        let t = table(&[("P1", "1")]);
        assert!(profile_entities(&t, "P/N", "Quantity", &OutlierConfig::default()).is_err());
    }
}
