//! Parameter grids and parameter sets.
//!
//! A `ParamSet` is one point in the search space; its id is a blake3 hash
//! of the canonical JSON encoding, stable across runs and platforms, so
//! results keyed by id line up between processes and cache layers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One strongly typed parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
    Flag(bool),
}

impl ParamValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric view: integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(value) => Some(*value),
            ParamValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Flag(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(value) => write!(f, "{value}"),
            ParamValue::Float(value) => write!(f, "{value}"),
            ParamValue::Text(value) => write!(f, "{value}"),
            ParamValue::Flag(value) => write!(f, "{value}"),
        }
    }
}

/// One point in the search grid, immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSet {
    pub id: String,
    pub params: BTreeMap<String, ParamValue>,
}

impl ParamSet {
    pub fn new(params: BTreeMap<String, ParamValue>) -> Self {
        // BTreeMap iteration order makes the JSON canonical.
        let canonical = serde_json::to_string(&params).unwrap_or_default();
        let id = blake3::hash(canonical.as_bytes()).to_hex().to_string();
        Self { id, params }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }
}

/// One axis of the search grid: a parameter name and its candidate
/// values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamAxis {
    pub name: String,
    pub values: Vec<ParamValue>,
}

/// The full grid. Expansion is the cartesian product of all axes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamGrid {
    axes: Vec<ParamAxis>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an axis, builder-style.
    pub fn axis(mut self, name: impl Into<String>, values: Vec<ParamValue>) -> Self {
        self.axes.push(ParamAxis {
            name: name.into(),
            values,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty() || self.axes.iter().any(|axis| axis.values.is_empty())
    }

    /// Total number of param sets the grid expands to.
    pub fn size(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        self.axes.iter().map(|axis| axis.values.len()).product()
    }

    /// Every combination, in deterministic axis-major order.
    pub fn expand(&self) -> Vec<ParamSet> {
        if self.is_empty() {
            return Vec::new();
        }
        let mut combos: Vec<BTreeMap<String, ParamValue>> = vec![BTreeMap::new()];
        for axis in &self.axes {
            let mut next = Vec::with_capacity(combos.len() * axis.values.len());
            for base in &combos {
                for value in &axis.values {
                    let mut params = base.clone();
                    params.insert(axis.name.clone(), value.clone());
                    next.push(params);
                }
            }
            combos = next;
        }
        combos.into_iter().map(ParamSet::new).collect()
    }
}
