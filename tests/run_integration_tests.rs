use basp::interpreter::{DefaultLoader, EffectKind};
use basp::run_source;

use regex::Regex;
use std::rc::Rc;
use test_generator::test_resources;

#[derive(Debug, PartialEq)]
struct Output {
    printed: Vec<String>,
    error: Option<String>,
}

#[test_resources("tests/scripts/**/*.basp")]
fn test_script(file: &str) {
    let source = std::fs::read_to_string(file).unwrap();

    let expected = get_expected_output(&source);
    let output = run_script(file, &source);

    assert_eq!(expected, output, "{}", file);
}

fn run_script(file: &str, source: &str) -> Output {
    let execution = run_source(file, source, Rc::new(DefaultLoader::default()));

    Output {
        printed: execution
            .effects
            .into_iter()
            .filter(|effect| effect.kind == EffectKind::Print)
            .filter_map(|effect| effect.value)
            .collect(),
        error: execution.result.err().map(|e| e.to_string()),
    }
}

fn get_expected_output(source: &str) -> Output {
    let output_regexer = Regex::new(r"// expect: (.*)$").unwrap();
    let error_regexer = Regex::new(r"// expect error: (.*)$").unwrap();

    let mut result = Output {
        printed: vec![],
        error: None,
    };

    for line in source.lines() {
        if let Some(r) = output_regexer.captures(line) {
            result.printed.push(r.get(1).unwrap().as_str().to_owned());
        }
        if let Some(r) = error_regexer.captures(line) {
            result.error.replace(r.get(1).unwrap().as_str().to_owned());
        }
    }

    result
}
