use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{PloidyError, Result};

/// One row of a pre-computed parameter table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub coverage: f64,
    pub fetal_fraction: f64,
    pub state: u8,
    pub mean: f64,
    pub variance: f64,
}

/// Emission parameters of one state for one observed feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateParams {
    pub mean: f64,
    pub variance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ReferenceKey {
    coverage: u64,
    fetal_fraction: u64,
    state: u8,
}

impl ReferenceKey {
    fn new(coverage: f64, fetal_fraction: f64, state: u8) -> Self {
        Self {
            coverage: key_bits(coverage),
            fetal_fraction: key_bits(fetal_fraction),
            state,
        }
    }
}

// Exact float equality, with -0.0 folded onto 0.0.
fn key_bits(v: f64) -> u64 {
    if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }
}

/// Reference parameters indexed by (coverage, fetal_fraction, state).
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    name: String,
    params: HashMap<ReferenceKey, StateParams>,
}

impl ReferenceTable {
    /// Index `records`, rejecting rows with a non-finite key or a repeated
    /// (coverage, fetal_fraction, state) triple.
    pub fn from_records<I>(name: &str, records: I) -> Result<Self>
    where
        I: IntoIterator<Item = ReferenceRecord>,
    {
        let mut params = HashMap::new();
        for rec in records {
            if !rec.coverage.is_finite() || !rec.fetal_fraction.is_finite() {
                return Err(PloidyError::invalid_parameter(format!(
                    "{name} reference row has non-finite key coverage={}, fetal_fraction={}",
                    rec.coverage, rec.fetal_fraction
                )));
            }
            let key = ReferenceKey::new(rec.coverage, rec.fetal_fraction, rec.state);
            let value = StateParams {
                mean: rec.mean,
                variance: rec.variance,
            };
            if params.insert(key, value).is_some() {
                return Err(PloidyError::DuplicateReference {
                    table: name.to_string(),
                    coverage: rec.coverage,
                    fetal_fraction: rec.fetal_fraction,
                    state: rec.state,
                });
            }
        }
        Ok(Self {
            name: name.to_string(),
            params,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn lookup(&self, coverage: f64, fetal_fraction: f64, state: u8) -> Result<StateParams> {
        self.params
            .get(&ReferenceKey::new(coverage, fetal_fraction, state))
            .copied()
            .ok_or_else(|| PloidyError::MissingReference {
                table: self.name.clone(),
                coverage,
                fetal_fraction,
                state,
            })
    }
}
