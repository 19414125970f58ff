// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Result};
use rulesmith::codegen::{Backend, DebugWriter};
use rulesmith::parser::{parse_actions, parse_rule, parse_signature};
use serde::{Deserialize, Serialize};
use std::env;
use test_generator::test_resources;

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Case {
    pub note: String,
    pub rule: Option<String>,
    pub actions: Option<String>,
    pub signature: Option<String>,
    pub debug: Option<String>,
    pub params: Option<Vec<String>>,
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Test {
    cases: Vec<Case>,
}

fn render(case: &Case) -> Result<String> {
    if let Some(text) = &case.rule {
        let e = parse_rule("case", text)?;
        return DebugWriter::render(&e);
    }
    if let Some(text) = &case.actions {
        let a = parse_actions("case", text)?;
        return DebugWriter::new().action(&a);
    }
    if let Some(text) = &case.signature {
        let (name, params) = parse_signature(text)?;
        let params: Vec<String> = params
            .iter()
            .map(|p| match &p.ty {
                Some(ty) => format!("^{}: {ty}", p.name),
                None => format!("^{}", p.name),
            })
            .collect();
        return Ok(format!("${name}({})", params.join(", ")));
    }
    bail!("case has no rule, actions or signature")
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {file}");

    let yaml = std::fs::read_to_string(file)?;
    let test: Test = serde_yaml::from_str(&yaml)?;

    for case in &test.cases {
        print!("case {} ", case.note);

        match render(case) {
            Ok(actual) => {
                if let Some(error) = &case.error {
                    bail!("parsing succeeded but expected error `{error}`. Got\n{actual}");
                }
                let expected = match (&case.debug, &case.params) {
                    (Some(d), _) => d.clone(),
                    (None, Some(p)) => p.join(", "),
                    (None, None) => bail!("case has neither debug nor error"),
                };
                let actual = match &case.params {
                    Some(_) => actual
                        .split_once('(')
                        .map(|(_, rest)| rest.trim_end_matches(')').to_string())
                        .unwrap_or_default(),
                    None => actual,
                };
                if actual != expected {
                    bail!("rendering mismatch\nexpected: {expected}\n  actual: {actual}");
                }
            }
            Err(actual) => match &case.error {
                Some(expected) => {
                    let actual = actual.to_string();
                    if !actual.contains(expected) {
                        bail!("Error message\n`{actual}\n`\ndoes not contain `{expected}`");
                    }
                }
                _ => return Err(actual),
            },
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

#[test_resources("tests/parser/**/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
