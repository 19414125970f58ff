// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Packs boolean state (context flags, boolean settings and single-count
//! items) into fixed-width bit groups.

use crate::ast::Literal;
use crate::catalog::{Catalog, SettingType};
use crate::context::{ContextKind, ContextTable};
use crate::items::ItemCensus;

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Width of every group but the last.
pub const GROUP_WIDTH: usize = 32;
/// Smallest width of the last group.
pub const MIN_TAIL_WIDTH: usize = 8;

/// A boolean candidate for packing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagEntry {
    pub name: String,
    pub default_on: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitFlagGroup {
    pub capacity: usize,
    pub members: Vec<String>,
    pub defaults_on: Vec<String>,
}

impl BitFlagGroup {
    /// Initial value of the group's storage word.
    pub fn default_bits(&self) -> u64 {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, m)| self.defaults_on.contains(m))
            .fold(0u64, |bits, (i, _)| bits | (1 << i))
    }

    /// Target-language storage type.
    pub fn repr(&self) -> &'static str {
        match self.capacity {
            0..=8 => "u8",
            9..=16 => "u16",
            17..=32 => "u32",
            _ => "u64",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagLayout {
    pub groups: Vec<BitFlagGroup>,
    /// Member name to its 1-based group number.
    pub index: BTreeMap<String, usize>,
}

impl FlagLayout {
    /// 1-based group of `name`, or 0 when it is not packed.
    pub fn group_of(&self, name: &str) -> usize {
        self.index.get(name).copied().unwrap_or(0)
    }

    /// `(group, bit)` position of `name`.
    pub fn bit(&self, name: &str) -> Option<(usize, usize)> {
        let group = *self.index.get(name)?;
        let bit = self
            .groups
            .get(group.checked_sub(1)?)?
            .members
            .iter()
            .position(|m| m == name)?;
        Some((group, bit))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Packing candidates in their canonical order: boolean context variables
/// in declaration order, then boolean settings, then single-count items,
/// each of the latter sorted by name.
pub fn flag_entries(contexts: &ContextTable, catalog: &Catalog, census: &ItemCensus) -> Vec<FlagEntry> {
    let vars = contexts
        .iter()
        .filter(|v| v.kind == Some(ContextKind::Bool))
        .map(|v| FlagEntry {
            name: v.name.clone(),
            default_on: v.declared_default == Some(Literal::Bool(true)),
        });
    let settings = catalog
        .settings
        .iter()
        .filter(|(_, d)| d.ty == SettingType::Bool)
        .map(|(name, _)| FlagEntry {
            name: name.clone(),
            default_on: false,
        });
    let items = census.boolean_items().map(|name| FlagEntry {
        name: name.to_string(),
        default_on: false,
    });
    vars.chain(settings).chain(items).collect()
}

/// Splits `entries` into groups: full-width groups while more than a full
/// group remains, then one tail group sized to the next power of two.
pub fn pack(entries: &[FlagEntry]) -> FlagLayout {
    let mut layout = FlagLayout::default();
    let mut rest = entries;
    while !rest.is_empty() {
        let (chunk, capacity) = if rest.len() > GROUP_WIDTH {
            (&rest[..GROUP_WIDTH], GROUP_WIDTH)
        } else {
            (rest, rest.len().next_power_of_two().max(MIN_TAIL_WIDTH))
        };
        rest = &rest[chunk.len()..];

        let number = layout.groups.len() + 1;
        for e in chunk {
            layout.index.insert(e.name.clone(), number);
        }
        layout.groups.push(BitFlagGroup {
            capacity,
            members: chunk.iter().map(|e| e.name.clone()).collect(),
            defaults_on: chunk
                .iter()
                .filter(|e| e.default_on)
                .map(|e| e.name.clone())
                .collect(),
        });
    }
    layout
}
