// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::catalog::Catalog;
use crate::corpus::{Corpus, RuleCategory, RuleDef};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::traversal::traverse_body;

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use log::debug;
use serde::Serialize;

/// Count used when a threshold names a setting without a declared maximum.
pub const UNBOUNDED_COUNT: i64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ItemUsage {
    /// Number of places the item is mentioned.
    pub uses: usize,
    /// Largest quantity any rule may require.
    pub max_count: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ItemCensus {
    items: BTreeMap<String, ItemUsage>,
}

impl ItemCensus {
    pub fn get(&self, item: &str) -> Option<&ItemUsage> {
        self.items.get(item)
    }

    pub fn max_count(&self, item: &str) -> Option<i64> {
        self.items.get(item).map(|u| u.max_count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ItemUsage)> {
        self.items.iter()
    }

    /// Items never needed in quantity; these fit in a single bit.
    pub fn boolean_items(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .filter(|(_, u)| u.max_count == 1)
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Any mention means the item is held at least once.
    fn record(&mut self, item: &str, count: i64) {
        let usage = self.items.entry(item.to_string()).or_insert(ItemUsage {
            uses: 0,
            max_count: 1,
        });
        usage.uses += 1;
        usage.max_count = usage.max_count.max(count);
    }
}

/// Computes the maximum quantity of every item the corpus tests for.
pub struct ItemCounter<'a> {
    catalog: &'a Catalog,
    corpus: &'a Corpus,
}

impl<'a> ItemCounter<'a> {
    pub fn new(catalog: &'a Catalog, corpus: &'a Corpus) -> Self {
        Self { catalog, corpus }
    }

    pub fn run(&self, census: &mut ItemCensus, diagnostics: &mut Diagnostics) -> Result<()> {
        for rule in self.corpus.rules() {
            self.count_rule(rule, census, diagnostics)?;
        }
        debug!("item census found {} items", census.len());
        Ok(())
    }

    pub fn count_rule(
        &self,
        rule: &RuleDef,
        census: &mut ItemCensus,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let mut seen: Vec<(String, i64)> = vec![];
        let mut add = |item: &str, count: i64| seen.push((item.to_string(), count));

        traverse_body(&rule.body, &mut |e| {
            match e.as_ref() {
                Expr::HasItem(item) | Expr::HasLiteralItem(item) => add(item, 1),
                Expr::Items(items)
                | Expr::RefInSet {
                    set: SetLit::Items(items),
                    ..
                } => items.iter().for_each(|i| add(i, 1)),
                Expr::RefEq {
                    rhs: RefRhs::Item(item),
                    ..
                } => add(item, 1),
                Expr::ItemAtLeast { item, threshold } => match threshold {
                    Threshold::Int(n) => add(item, *n),
                    Threshold::Setting(s) => {
                        let max = self.catalog.settings.get(s).and_then(|d| d.max);
                        match max {
                            Some(m) => add(item, m),
                            None => {
                                diagnostics.warn(
                                    DiagnosticKind::MissingSettingMax,
                                    &rule.name,
                                    format!(
                                        "Setting {s} used as a count of {item} in {} has no max; assuming {UNBOUNDED_COUNT}",
                                        rule.name
                                    ),
                                );
                                add(item, UNBOUNDED_COUNT);
                            }
                        }
                    }
                    Threshold::Ref(r) => diagnostics.warn(
                        DiagnosticKind::DynamicCount,
                        &rule.name,
                        format!(
                            "Count of {item} by {r} in {} cannot be bounded; ignored",
                            rule.name
                        ),
                    ),
                },
                Expr::PerItemSwitch { item, cases, .. } => {
                    let top = cases.iter().map(|(n, _)| *n).max().unwrap_or(1);
                    add(item, top);
                }
                _ => (),
            }
            Ok(true)
        })?;

        let mut unknown = BTreeSet::new();
        for (item, count) in seen {
            if !self.catalog.items.contains(&item) {
                if unknown.insert(item.clone()) {
                    self.report_unknown(rule, &item, diagnostics);
                }
                continue;
            }
            census.record(&item, count);
        }
        Ok(())
    }

    fn report_unknown(&self, rule: &RuleDef, item: &str, diagnostics: &mut Diagnostics) {
        if rule.category() == RuleCategory::Objective {
            diagnostics.warn(
                DiagnosticKind::UnknownItem,
                &rule.name,
                format!("Objective {} references undeclared item {item}", rule.name),
            );
        } else {
            diagnostics.error(
                DiagnosticKind::UnknownItem,
                &rule.name,
                format!("Unknown item {item} in {}", rule.name),
            );
        }
    }
}
