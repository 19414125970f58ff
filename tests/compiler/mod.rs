// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Result};
use rulesmith::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use test_generator::test_resources;

#[derive(Serialize, Deserialize, Debug)]
struct RuleCase {
    name: String,
    text: String,
    #[serde(default)]
    actions: bool,
    #[serde(default)]
    locals: BTreeMap<String, String>,
    spot: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
struct HelperCase {
    signature: String,
    text: String,
    #[serde(default)]
    actions: bool,
}

#[derive(Serialize, Deserialize, Debug)]
struct Case {
    note: String,
    catalog: Option<serde_yaml::Value>,
    #[serde(default)]
    rules: Vec<RuleCase>,
    #[serde(default)]
    helpers: Vec<HelperCase>,
    options: Option<CompileOptions>,
    #[serde(default)]
    errors: Vec<String>,
    warnings: Option<Vec<String>>,
    code: Option<BTreeMap<String, String>>,
    debug: Option<BTreeMap<String, String>>,
    reachability: Option<BTreeMap<String, String>>,
    items: Option<BTreeMap<String, i64>>,
    flags: Option<Vec<Vec<String>>>,
}

#[derive(Serialize, Deserialize, Debug)]
struct Test {
    catalog: Option<serde_yaml::Value>,
    cases: Vec<Case>,
}

fn build_corpus(case: &Case) -> Result<Corpus> {
    let mut corpus = Corpus::new();
    for r in &case.rules {
        let mut rule = if r.actions {
            RuleDef::parse_actions(&r.name, &r.text)?
        } else {
            RuleDef::parse(&r.name, &r.text)?
        };
        for (short, path) in &r.locals {
            rule = rule.with_local(short, path);
        }
        if let Some(spot) = &r.spot {
            rule = rule.at_spot(spot);
        }
        corpus.add_rule(rule)?;
    }
    for h in &case.helpers {
        if h.actions {
            corpus.parse_action_helper(&h.signature, &h.text)?;
        } else {
            corpus.parse_helper(&h.signature, &h.text)?;
        }
    }
    Ok(corpus)
}

/// Every expected message must be contained in a distinct actual one.
fn match_messages(what: &str, actual: &[String], expected: &[String]) -> Result<()> {
    if actual.len() != expected.len() {
        bail!(
            "expected {} {what} but got {}:\n{}",
            expected.len(),
            actual.len(),
            actual.join("\n")
        );
    }
    for e in expected {
        if !actual.iter().any(|a| a.contains(e.as_str())) {
            bail!("no {what} contains `{e}`. Got\n{}", actual.join("\n"));
        }
    }
    Ok(())
}

fn match_map(
    what: &str,
    expected: &BTreeMap<String, String>,
    actual: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    for (rule, want) in expected {
        match actual(rule) {
            Some(got) if &got == want => (),
            Some(got) => {
                std::println!(
                    "{what} mismatch :\n{}",
                    prettydiff::diff_chars(want, &got)
                );
                bail!("{what} mismatch for {rule}\nexpected: {want}\n  actual: {got}")
            }
            None => bail!("no {what} produced for {rule}"),
        }
    }
    Ok(())
}

fn run_case(catalog: &Catalog, case: &Case) -> Result<()> {
    let corpus = build_corpus(case)?;
    let mut compiler = Compiler::new(catalog);
    if let Some(options) = &case.options {
        compiler = compiler.with_options(options.clone());
    }
    let c = compiler.compile(&corpus)?;

    match_messages("errors", &c.errors(), &case.errors)?;
    if let Some(warnings) = &case.warnings {
        let actual: Vec<String> = c.diagnostics.warnings().map(|d| d.to_string()).collect();
        match_messages("warnings", &actual, warnings)?;
    }
    if let Some(code) = &case.code {
        match_map("code", code, |r| c.rules.get(r).and_then(|o| o.code.clone()))?;
    }
    if let Some(debug) = &case.debug {
        match_map("debug", debug, |r| c.rules.get(r).and_then(|o| o.debug.clone()))?;
    }
    if let Some(reach) = &case.reachability {
        match_map("reachability", reach, |r| {
            c.rules
                .get(r)
                .and_then(|o| o.reachability.as_ref())
                .map(|v| v.to_string())
        })?;
    }
    if let Some(items) = &case.items {
        for (item, want) in items {
            let got = c.items.max_count(item);
            if got != Some(*want) {
                bail!("max count of {item}: expected {want}, got {got:?}");
            }
        }
    }
    if let Some(flags) = &case.flags {
        let groups: Vec<Vec<String>> = c.layout.groups.iter().map(|g| g.members.clone()).collect();
        if &groups != flags {
            bail!("flag groups mismatch\nexpected: {flags:?}\n  actual: {groups:?}");
        }
    }
    Ok(())
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {file}");

    let yaml = std::fs::read_to_string(file)?;
    let test: Test = serde_yaml::from_str(&yaml)?;

    for case in &test.cases {
        print!("case {} ", case.note);
        let catalog = match case.catalog.as_ref().or(test.catalog.as_ref()) {
            Some(v) => serde_yaml::from_value::<Catalog>(v.clone())?,
            None => Catalog::default(),
        };
        if let Err(e) = run_case(&catalog, case) {
            bail!("case {} failed: {e}", case.note);
        }
        println!("passed");
    }
    println!("{} cases passed.", test.cases.len());
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            // Therefore, panic with the error.
            panic!("{}", e);
        }
    }
}

#[test]
#[ignore = "intended for running a single yaml file"]
fn one_yaml() -> Result<()> {
    let mut file = String::default();
    for a in env::args() {
        if a.ends_with(".yaml") {
            file = a;
            break;
        }
    }

    if file.is_empty() {
        bail!("missing yaml test file");
    }

    yaml_test(file.as_str())
}

#[test_resources("tests/compiler/**/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
