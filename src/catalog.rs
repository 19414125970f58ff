// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Declarations the rules are checked against: items, settings, context
//! variables, constants, static data and the place tree.

use crate::place::{self, PlaceKind};

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    Bool,
    Int,
    Float,
    Enum,
    Str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingDecl {
    #[serde(rename = "type")]
    pub ty: SettingType,
    /// Upper bound for integer settings used as item counts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    /// Permitted values, when the setting is closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextDecl {
    /// `bool`, `int`, `float`, `enum`, `region`, `area` or `spot`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotDecl {
    /// Per-spot overrides of static data.
    pub data: BTreeMap<String, Value>,
    pub actions: Vec<String>,
    pub locations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaDecl {
    pub spots: BTreeMap<String, SpotDecl>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionDecl {
    pub areas: BTreeMap<String, AreaDecl>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub items: BTreeSet<String>,
    pub settings: BTreeMap<String, SettingDecl>,
    /// Context variables, in declaration order.
    pub context: IndexMap<String, ContextDecl>,
    pub consts: BTreeMap<String, Value>,
    /// Global defaults of static per-spot data.
    pub data: BTreeMap<String, Value>,
    pub regions: BTreeMap<String, RegionDecl>,
}

impl Catalog {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether the catalog describes a place tree at all. Place literals
    /// are only checked against the tree when it does.
    pub fn has_places(&self) -> bool {
        !self.regions.is_empty()
    }

    /// Kind of a declared place, or `None` if the path names nothing.
    pub fn location_kind(&self, path: &str) -> Option<PlaceKind> {
        let segs = place::segments(path);
        let region = self.regions.get(segs[0])?;
        if segs.len() == 1 {
            return Some(PlaceKind::Region);
        }
        let area = region.areas.get(segs[1])?;
        if segs.len() == 2 {
            return Some(PlaceKind::Area);
        }
        let spot = area.spots.get(segs[2])?;
        match segs.len() {
            3 => Some(PlaceKind::Spot),
            4 if spot.actions.iter().chain(spot.locations.iter()).any(|l| l == segs[3]) => {
                Some(PlaceKind::Leaf)
            }
            _ => None,
        }
    }

    /// Every declared spot, as `(path, declaration)` in sorted order.
    pub fn spots(&self) -> impl Iterator<Item = (String, &SpotDecl)> {
        self.regions.iter().flat_map(|(r, region)| {
            region.areas.iter().flat_map(move |(a, area)| {
                area.spots
                    .iter()
                    .map(move |(s, spot)| (format!("{r} > {a} > {s}"), spot))
            })
        })
    }

    pub fn spot(&self, path: &str) -> Option<&SpotDecl> {
        let segs = place::segments(path);
        if segs.len() != 3 {
            return None;
        }
        self.regions
            .get(segs[0])?
            .areas
            .get(segs[1])?
            .spots
            .get(segs[2])
    }

    /// Whether `name` is a static per-spot datum rather than live context.
    pub fn is_static(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }
}
