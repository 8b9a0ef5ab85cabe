//! End-to-end cleaning scenarios and properties over generated tables.

use chrono::{Duration, NaiveDate};
use rfq_cleaning::{deduplicate, remove_quantity_outliers, CleaningPipeline, QuantityDistribution};
use rfq_core::{parse_quantity, Config, Table};
use std::collections::{HashMap, HashSet};

const BUYER: &str = "Buyer Company Name";
const PART: &str = "Part Number";
const COND: &str = "Condition Code";
const RECEIVED: &str = "Received At (UTC)";
const QTY: &str = "Quantity";

fn columns() -> Vec<String> {
    ["RFQ ID", BUYER, PART, COND, RECEIVED, QTY]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn key_columns() -> Vec<String> {
    vec![BUYER.to_string(), PART.to_string(), COND.to_string()]
}

/// Deterministic linear congruential generator.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

fn generated_table(seed: u64, rows: usize) -> Table {
    let mut rng = Lcg(seed);
    let base = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    let data = (0..rows)
        .map(|i| {
            let buyer = format!("Buyer-{}", rng.below(4));
            let part = format!("P-{}", rng.below(6));
            let cond = ["NE", "OH", "SV"][rng.below(3) as usize].to_string();
            let received = if rng.below(10) == 0 {
                String::new()
            } else {
                let offset = Duration::minutes(rng.below(60 * 24 * 30) as i64);
                (base + offset).format("%Y-%m-%d %H:%M:%S").to_string()
            };
            let qty = match rng.below(20) {
                0 => "N/A".to_string(),
                1 => (rng.below(900_000) + 10_000).to_string(),
                _ => (rng.below(50) + 1).to_string(),
            };
            vec![format!("rfq-{i}"), buyer, part, cond, received, qty]
        })
        .collect();

    Table::new(columns(), data).unwrap()
}

fn simple_table(rows: &[(&str, &str, &str)]) -> Table {
    let data = rows
        .iter()
        .enumerate()
        .map(|(i, (part, received, qty))| {
            vec![
                format!("rfq-{i}"),
                "Acme".to_string(),
                part.to_string(),
                "NE".to_string(),
                received.to_string(),
                qty.to_string(),
            ]
        })
        .collect();
    Table::new(columns(), data).unwrap()
}

fn ids(table: &Table) -> Vec<&str> {
    table.column_values(0).collect()
}

fn quantities(table: &Table) -> Vec<f64> {
    let col = table.column_index(QTY).unwrap();
    table.column_values(col).filter_map(parse_quantity).collect()
}

fn two_days() -> Duration {
    Duration::days(2)
}

#[test]
fn scenario_low_volume_spike() {
    let table = simple_table(&[
        ("P1", "2024-01-01", "1"),
        ("P1", "2024-01-05", "2"),
        ("P1", "2024-01-09", "3"),
        ("P1", "2024-01-13", "99999"),
    ]);
    let out = remove_quantity_outliers(&table, PART, QTY, None).unwrap();
    assert_eq!(quantities(&out), vec![1.0, 2.0, 3.0]);
}

#[test]
fn scenario_consistent_high_volume() {
    let table = simple_table(&[
        ("113270-307", "", "45000"),
        ("113270-307", "", "60000"),
        ("113270-307", "", "75000"),
        ("113270-307", "", "75000"),
        ("113270-307", "", "80000"),
    ]);
    let out = remove_quantity_outliers(&table, PART, QTY, None).unwrap();
    assert_eq!(out, table);
}

#[test]
fn scenario_medium_volume_spike() {
    let rows: Vec<(&str, &str, &str)> = ["20", "25", "30", "35", "40", "15000"]
        .iter()
        .map(|q| ("MED", "", *q))
        .collect();
    let out = remove_quantity_outliers(&simple_table(&rows), PART, QTY, None).unwrap();
    assert_eq!(quantities(&out), vec![20.0, 25.0, 30.0, 35.0, 40.0]);
}

#[test]
fn scenario_repeat_submissions() {
    let table = simple_table(&[
        ("P1", "2024-03-01 08:00:00", "5"),
        ("P1", "2024-03-02 08:00:00", "5"),
        ("P1", "2024-03-06 08:00:00", "5"),
    ]);
    let out = deduplicate(&table, &key_columns(), RECEIVED, two_days()).unwrap();
    assert_eq!(ids(&out), vec!["rfq-0", "rfq-2"]);
}

#[test]
fn scenario_all_undated() {
    let table = simple_table(&[("P1", "", "5"), ("P1", "", "6"), ("P1", "", "7")]);
    let out = deduplicate(&table, &key_columns(), RECEIVED, two_days()).unwrap();
    assert_eq!(ids(&out), vec!["rfq-0"]);
}

#[test]
fn scenario_single_quantity() {
    let table = simple_table(&[("SOLO", "2024-01-01", "99999")]);
    let out = remove_quantity_outliers(&table, PART, QTY, None).unwrap();
    assert_eq!(out, table);
}

#[test]
fn dedup_is_idempotent() {
    for seed in 1..=5 {
        let table = generated_table(seed, 300);
        let once = deduplicate(&table, &key_columns(), RECEIVED, two_days()).unwrap();
        let twice = deduplicate(&once, &key_columns(), RECEIVED, two_days()).unwrap();
        assert_eq!(once, twice, "seed {seed}");
    }
}

#[test]
fn dedup_keeps_every_group() {
    let key_of = |t: &Table, row: usize| -> Vec<String> {
        key_columns()
            .iter()
            .map(|c| t.cell(row, t.column_index(c).unwrap()).to_string())
            .collect()
    };

    for seed in 1..=5 {
        let table = generated_table(seed, 300);
        let out = deduplicate(&table, &key_columns(), RECEIVED, two_days()).unwrap();

        let before: HashSet<Vec<String>> = (0..table.len()).map(|r| key_of(&table, r)).collect();
        let after: HashSet<Vec<String>> = (0..out.len()).map(|r| key_of(&out, r)).collect();
        assert_eq!(before, after, "seed {seed}");
    }
}

#[test]
fn outlier_output_is_ordered_subset() {
    for seed in 1..=5 {
        let table = generated_table(seed, 300);
        let out = remove_quantity_outliers(&table, PART, QTY, None).unwrap();

        assert_eq!(out.columns(), table.columns());
        let mut input = table.rows().iter();
        for row in out.rows() {
            assert!(
                input.any(|candidate| candidate == row),
                "seed {seed}: output row {row:?} out of order or not in input"
            );
        }
    }
}

#[test]
fn outlier_filter_never_removes_low_values() {
    for seed in 1..=5 {
        let table = generated_table(seed, 300);
        let out = remove_quantity_outliers(&table, PART, QTY, None).unwrap();

        let mut per_entity: HashMap<&str, Vec<f64>> = HashMap::new();
        for row in table.rows() {
            if let Some(q) = parse_quantity(&row[5]) {
                per_entity.entry(row[2].as_str()).or_default().push(q);
            }
        }

        let kept: HashSet<&str> = out.column_values(0).collect();
        for row in table.rows() {
            let Some(q) = parse_quantity(&row[5]) else {
                assert!(kept.contains(row[0].as_str()), "non-numeric row removed");
                continue;
            };
            let median = QuantityDistribution::new(per_entity[row[2].as_str()].iter().copied())
                .unwrap()
                .median();
            if q <= median {
                assert!(kept.contains(row[0].as_str()), "seed {seed}: {q} <= {median} removed");
            }
        }
    }
}

#[test]
fn pipeline_dedups_before_filtering() {
    // Without dedup the repeated 5000 submissions would look like normal volume
    let table = simple_table(&[
        ("P1", "2024-01-01 00:00:00", "5000"),
        ("P1", "2024-01-01 01:00:00", "5000"),
        ("P1", "2024-01-01 02:00:00", "5000"),
        ("P1", "2024-01-05", "5"),
        ("P1", "2024-01-09", "5"),
        ("P1", "2024-01-13", "5"),
    ]);

    let outcome = CleaningPipeline::new(&Config::default(), Some((PART, QTY)))
        .unwrap()
        .run(&table)
        .unwrap();

    assert_eq!(outcome.dedup.as_ref().unwrap().removed_rows, 2);
    assert_eq!(outcome.outliers.as_ref().unwrap().removed_rows, 1);
    assert_eq!(quantities(&outcome.table), vec![5.0, 5.0, 5.0]);
}
