// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Result};
use rulesmith::unstable::*;
use serde::{Deserialize, Serialize};
use std::env;
use test_generator::test_resources;

fn get_tokens(source: &Source) -> Result<Vec<Token>> {
    let mut tokens = vec![];
    let mut lex = Lexer::new(source);
    loop {
        let tok = lex.next_token()?;
        tokens.push(tok.clone());
        if tok.0 == TokenKind::Eof {
            break;
        }
    }

    Ok(tokens)
}

/// The caret rendered for a token must point at the token's text.
fn check_loc(tok: &Token) -> Result<()> {
    let msg = tok.1.message("", "");
    let lines: Vec<&str> = msg.split('\n').collect();
    let (Some(source_line), Some(caret_line)) = (lines.get(3), lines.get(4)) else {
        bail!("malformed message {msg}");
    };
    let Some(source_start) = source_line.find("| ") else {
        bail!("no gutter in {source_line}");
    };
    let Some(caret) = caret_line.find('^') else {
        bail!("no caret in {caret_line}");
    };
    let at = caret.saturating_sub(source_start + 2);
    let source_text = source_line.get(source_start + 2..).unwrap_or_default();

    if tok.0 == TokenKind::Eof && at >= source_text.len() {
        return Ok(());
    }
    let rest = source_text.get(at..).unwrap_or_default();
    let text = tok.1.text();
    if !(rest.starts_with(text) || (text.is_empty() && tok.0 != TokenKind::Eof)) {
        bail!("location mismatch for {tok:?}{msg}");
    }
    Ok(())
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Case {
    pub text: String,
    pub note: String,
    #[serde(default)]
    pub tokens: Vec<String>,
    pub kinds: Option<Vec<String>>,
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Test {
    cases: Vec<Case>,
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {file}");

    let yaml = std::fs::read_to_string(file)?;
    let test: Test = serde_yaml::from_str(&yaml)?;

    for case in &test.cases {
        let source = Source::from_contents("case.rule".to_string(), case.text.clone())?;

        print!("case {} ", &case.note);

        match get_tokens(&source) {
            Ok(tokens) => {
                if case.error.is_some() {
                    bail!("lexing succeeded but an error was expected");
                }
                for (idx, tok) in tokens.iter().enumerate() {
                    let Some(expected) = case.tokens.get(idx) else {
                        break;
                    };
                    assert_eq!(
                        tok.1.text(),
                        expected,
                        "{} Expected token `{}` not found",
                        tok.1.message("mismatch-error", expected),
                        expected
                    );

                    if let Some(expected_kind) = case.kinds.as_ref().and_then(|k| k.get(idx)) {
                        assert_eq!(
                            format!("{:?}", tok.0),
                            *expected_kind,
                            "{}",
                            tok.1.message("mismatch-error", "token kind mismatch")
                        );
                    }

                    check_loc(tok)?;
                }
                assert_eq!(
                    tokens.len(),
                    case.tokens.len(),
                    "\n. Token count mismatch.\nLexed tokens:{tokens:?}"
                );
                if let Some(k) = &case.kinds {
                    assert_eq!(
                        tokens.len(),
                        k.len(),
                        "\n. Kind count mismatch.\nLexed tokens:{tokens:?}"
                    );
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

#[test_resources("tests/lexer/**/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
