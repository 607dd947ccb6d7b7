//! Drawing agent records from a survey table
//!
//! Records are drawn either one by one or by whole sample unit (for example
//! every member of a household). Optional weight columns bias the draw.

use ahash::AHashMap;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use tracing::debug;

use crate::core::error::{PopError, Result};
use crate::core::types::{Record, Value};

fn default_relabel() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SampleSpec {
    /// Number of records to draw; `None` keeps every record (shuffled)
    #[serde(default)]
    pub n: Option<usize>,
    /// Column identifying sample units drawn as a whole
    #[serde(default)]
    pub sample_level: Option<String>,
    /// Column holding the draw weight of each record or unit
    #[serde(default)]
    pub sample_weight: Option<String>,
    /// Give each drawn unit a fresh number and keep the old one under
    /// `<sample_level>_original`
    #[serde(default = "default_relabel")]
    pub relabel_units: bool,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            n: None,
            sample_level: None,
            sample_weight: None,
            relabel_units: true,
        }
    }
}

impl SampleSpec {
    pub fn records(n: usize) -> Self {
        Self {
            n: Some(n),
            ..Self::default()
        }
    }

    pub fn units(n: usize, sample_level: impl Into<String>) -> Self {
        Self {
            n: Some(n),
            sample_level: Some(sample_level.into()),
            ..Self::default()
        }
    }

    pub fn weighted_by(mut self, column: impl Into<String>) -> Self {
        self.sample_weight = Some(column.into());
        self
    }
}

fn weight_of(record: &Record, column: &str) -> Result<f64> {
    record
        .get(column)
        .and_then(Value::as_f64)
        .ok_or_else(|| PopError::config(format!("sample weight column `{}` is missing or not numeric", column)))
}

fn weighted_index(weights: &[f64], column: &str) -> Result<WeightedIndex<f64>> {
    WeightedIndex::new(weights)
        .map_err(|e| PopError::config(format!("unusable sample weights in `{}`: {}", column, e)))
}

/// Draw records according to `spec`
///
/// Without weights and with `n` not larger than the table, records are drawn
/// without replacement. Otherwise draws are with replacement. Unit draws keep
/// adding whole units until at least `n` records are collected.
pub fn draw_sample<R: Rng + ?Sized>(records: &[Record], spec: &SampleSpec, rng: &mut R) -> Result<Vec<Record>> {
    let mut pool = records.to_vec();
    pool.shuffle(rng);

    let Some(n) = spec.n else {
        return Ok(pool);
    };
    if n == 0 {
        return Ok(Vec::new());
    }
    if pool.is_empty() {
        return Err(PopError::config(format!("cannot draw {} records from an empty table", n)));
    }

    let drawn = match &spec.sample_level {
        None => draw_records(pool, n, spec.sample_weight.as_deref(), rng)?,
        Some(level) => draw_units(&pool, n, level, spec, rng)?,
    };

    debug!("drew {} records from a table of {}", drawn.len(), records.len());
    Ok(drawn)
}

fn draw_records<R: Rng + ?Sized>(
    mut pool: Vec<Record>,
    n: usize,
    weight_column: Option<&str>,
    rng: &mut R,
) -> Result<Vec<Record>> {
    match weight_column {
        None if n <= pool.len() => {
            pool.truncate(n);
            Ok(pool)
        }
        None => Ok((0..n).map(|_| pool[rng.gen_range(0..pool.len())].clone()).collect()),
        Some(column) => {
            let weights = pool
                .iter()
                .map(|record| weight_of(record, column))
                .collect::<Result<Vec<f64>>>()?;
            let dist = weighted_index(&weights, column)?;
            Ok((0..n).map(|_| pool[dist.sample(rng)].clone()).collect())
        }
    }
}

fn draw_units<R: Rng + ?Sized>(
    pool: &[Record],
    n: usize,
    level: &str,
    spec: &SampleSpec,
    rng: &mut R,
) -> Result<Vec<Record>> {
    let mut units: Vec<Value> = Vec::new();
    let mut rows: AHashMap<Value, Vec<usize>> = AHashMap::new();
    for (i, record) in pool.iter().enumerate() {
        let unit = record
            .get(level)
            .cloned()
            .ok_or_else(|| PopError::config(format!("sample level column `{}` is missing", level)))?;
        rows.entry(unit.clone())
            .or_insert_with(|| {
                units.push(unit);
                Vec::new()
            })
            .push(i);
    }

    // a unit's weight is read from its first record
    let dist = match spec.sample_weight.as_deref() {
        None => None,
        Some(column) => {
            let weights = units
                .iter()
                .map(|unit| weight_of(&pool[rows[unit][0]], column))
                .collect::<Result<Vec<f64>>>()?;
            Some(weighted_index(&weights, column)?)
        }
    };

    let original_column = format!("{}_original", level);
    let mut drawn: Vec<Record> = Vec::with_capacity(n);
    let mut next_unit: i64 = 1;
    while drawn.len() < n {
        let pick = match &dist {
            Some(dist) => dist.sample(rng),
            None => rng.gen_range(0..units.len()),
        };
        for &row in &rows[&units[pick]] {
            let mut record = pool[row].clone();
            if spec.relabel_units {
                let original = record.insert(level.to_string(), Value::Int(next_unit)).unwrap_or_default();
                record.insert(original_column.clone(), original);
            }
            drawn.push(record);
        }
        next_unit += 1;
    }

    Ok(drawn)
}
