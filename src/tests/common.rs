// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Shared fixtures for unit tests.

use crate::*;

use anyhow::Result;

pub const WORLD: &str = r#"
items: [Bomb, Sword, Shield, Key, Flask]
settings:
  hard_mode: { type: bool }
  keysanity: { type: bool }
  bomb_count: { type: int, max: 10 }
  logic: { type: enum, options: [casual, glitched] }
context:
  flags.sword: { type: bool, default: false }
  mode: { type: enum, default: walk }
  energy: { type: int, default: 0, max: 99 }
  save: { type: spot }
consts:
  MAX_ENERGY: 99
data:
  water: false
  depth: 0
  region_name: ""
  home: Town
regions:
  Cave:
    areas:
      Entry:
        spots:
          Door:
            data: { water: true, depth: 3, home: Cave }
            actions: [Open]
            locations: [Chest]
          Ledge:
            locations: [Grab]
      Pool:
        spots:
          Edge:
            data: { water: true }
  Town:
    areas:
      Square:
        spots:
          Fountain: {}
"#;

pub fn world() -> Result<Catalog> {
    Catalog::from_yaml_str(WORLD)
}

/// Builds a corpus from `(name, text)` requirement rules.
pub fn corpus(rules: &[(&str, &str)]) -> Result<Corpus> {
    let mut corpus = Corpus::new();
    for (name, text) in rules {
        corpus.add_rule(RuleDef::parse(name, text)?)?;
    }
    Ok(corpus)
}
