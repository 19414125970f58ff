// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::catalog::Catalog;
use crate::eval::value::{AbstractValue, Scalar};

use std::collections::BTreeMap;

use serde_json::Value;

/// Strings naming a declared place are places, whatever their depth.
fn data_value(catalog: &Catalog, value: &Value) -> AbstractValue {
    match value {
        Value::String(s) if catalog.location_kind(s).is_some() => {
            AbstractValue::Concrete(Scalar::Place(s.clone()))
        }
        _ => AbstractValue::from_json(value),
    }
}

/// Static per-spot data: global defaults with sparse per-spot overrides.
#[derive(Debug, Clone, Default)]
pub struct StaticTable {
    defaults: BTreeMap<String, AbstractValue>,
    spots: BTreeMap<String, BTreeMap<String, AbstractValue>>,
}

impl StaticTable {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut table = Self::default();
        for (name, value) in &catalog.data {
            table
                .defaults
                .insert(name.clone(), data_value(catalog, value));
        }
        for (path, spot) in catalog.spots() {
            for (name, value) in &spot.data {
                table.set(&path, name, data_value(catalog, value));
            }
        }
        table
    }

    pub fn set_default(&mut self, name: &str, value: AbstractValue) {
        self.defaults.insert(name.to_string(), value);
    }

    pub fn set(&mut self, spot: &str, name: &str, value: AbstractValue) {
        self.spots
            .entry(spot.to_string())
            .or_default()
            .insert(name.to_string(), value);
    }

    pub fn is_static(&self, name: &str) -> bool {
        self.defaults.contains_key(name)
    }

    /// Value of `name` at `spot`. Anything not static is Uncertain.
    pub fn lookup(&self, spot: &str, name: &str) -> AbstractValue {
        if let Some(v) = self.spots.get(spot).and_then(|s| s.get(name)) {
            return v.clone();
        }
        self.defaults
            .get(name)
            .cloned()
            .unwrap_or(AbstractValue::Uncertain)
    }
}
