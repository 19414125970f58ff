// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Hierarchical place identifiers: `Region`, `Region > Area`,
//! `Region > Area > Spot`, and leaf actions/locations under a spot.

use core::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PlaceKind {
    Region,
    Area,
    Spot,
    Leaf,
}

impl PlaceKind {
    /// Kind of a place path, by its number of `>` separators.
    pub fn of(path: &str) -> Option<PlaceKind> {
        match separators(path) {
            0 => Some(PlaceKind::Region),
            1 => Some(PlaceKind::Area),
            2 => Some(PlaceKind::Spot),
            3 => Some(PlaceKind::Leaf),
            _ => None,
        }
    }

    pub fn separators(&self) -> usize {
        match self {
            PlaceKind::Region => 0,
            PlaceKind::Area => 1,
            PlaceKind::Spot => 2,
            PlaceKind::Leaf => 3,
        }
    }

    /// Name of the generated identifier type.
    pub fn id_type(&self) -> &'static str {
        match self {
            PlaceKind::Region => "RegionId",
            PlaceKind::Area => "AreaId",
            PlaceKind::Spot => "SpotId",
            PlaceKind::Leaf => "LocationId",
        }
    }
}

impl fmt::Display for PlaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlaceKind::Region => "Region",
            PlaceKind::Area => "Area",
            PlaceKind::Spot => "Spot",
            PlaceKind::Leaf => "Leaf",
        })
    }
}

pub fn separators(path: &str) -> usize {
    path.matches('>').count()
}

pub fn segments(path: &str) -> Vec<&str> {
    path.split('>').map(str::trim).collect()
}

/// The ancestor of `path` at `kind`, e.g. the area containing a spot.
pub fn ancestor(path: &str, kind: PlaceKind) -> Option<String> {
    let segs = segments(path);
    let depth = kind.separators() + 1;
    if segs.len() < depth || segs.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(segs[..depth].join(" > "))
}

/// Whether `inner` is `outer` or lies within it.
pub fn contains(outer: &str, inner: &str) -> bool {
    let outer = segments(outer);
    let inner = segments(inner);
    outer.len() <= inner.len() && outer.iter().zip(inner.iter()).all(|(a, b)| a == b)
}

/// Identifier-safe form of a place path: `A > B c` becomes `A__B_c`.
pub fn identifier(path: &str) -> String {
    segments(path)
        .iter()
        .map(|s| {
            s.chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("__")
}

fn check_depth(path: &str, expected: PlaceKind) -> Result<()> {
    let found = separators(path);
    if found != expected.separators() {
        bail!(
            "'{path}' is not a valid {} path: expected {} `>` separators, found {found}",
            expected.to_string().to_lowercase(),
            expected.separators(),
        );
    }
    if segments(path).iter().any(|s| s.is_empty()) {
        bail!("'{path}' has an empty path segment");
    }
    Ok(())
}

/// `region > area > spot`
pub fn check_spot_path(path: &str) -> Result<()> {
    check_depth(path, PlaceKind::Spot)
}

/// `region > area > spot > action-or-location`
pub fn check_leaf_path(path: &str) -> Result<()> {
    check_depth(path, PlaceKind::Leaf)
}
