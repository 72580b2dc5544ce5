#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use proptest::prelude::*;
use udash_ast::{Instruction, Literal, Position};
use udash_compile::{compile, CompileError};
use udash_geom::Point;

fn count_tokens(body: &[Instruction]) -> usize {
    body.iter()
        .map(|ins| match ins {
            Instruction::Token(_) => 1,
            Instruction::List { items, .. } => count_tokens(items),
        })
        .sum()
}

#[test]
fn point_literals_parse_inside_lists() {
    let program = compile("main: [ (1,2) (-0.5,3.25) ] (1, 2)").unwrap();
    let points: Vec<_> = program
        .tokens()
        .iter()
        .filter_map(|t| match t.literal {
            Literal::Point(p) => Some(p),
            _ => None,
        })
        .collect();
    assert_eq!(points, vec![Point::new(1.0, 2.0), Point::new(-0.5, 3.25)]);
    // `(1,` and `2)` are two separate symbols.
    assert_eq!(program.token_at(Position::new(0, 5)).unwrap().literal, "(1,");
}

#[test]
fn labels_keep_their_bodies_in_order() {
    let src = "\
# draw a square
main:
  100 100 rectangle fill

helper:
  [ 1 2 ] body loop
";
    let program = compile(src).unwrap();
    let names: Vec<_> = program.label_names().collect();
    assert_eq!(names, vec!["helper", "main"]);
    assert_eq!(count_tokens(program.label("main").unwrap()), 4);
    assert_eq!(program.label("helper").unwrap().len(), 3);
}

#[test]
fn redefining_a_label_with_different_contents_fails() {
    let err = compile("a: 1\nb: 2\na: 3 4 5\n").unwrap_err();
    match err {
        CompileError::Redefinition { name, position, .. } => {
            assert_eq!(name, "a");
            assert_eq!(position, Position::new(2, 0));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn empty_label_is_still_defined() {
    let program = compile("main: 1\nempty:\n").unwrap();
    assert_eq!(program.label("empty").map(<[_]>::len), Some(0));
}

fn label_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}"
}

fn body() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![
            (-100i64..100).prop_map(|n| n.to_string()),
            Just("dup".to_string()),
            Just("+".to_string()),
            Just("[ 1 2 ]".to_string()),
        ],
        0..5,
    )
}

proptest! {
    #[test]
    fn defined_labels_are_exactly_the_declared_ones(
        defs in prop::collection::btree_map(label_name(), body(), 1..6)
    ) {
        let src: String = defs
            .iter()
            .map(|(name, words)| format!("{name}: {}\n", words.join(" ")))
            .collect();
        let program = compile(&src).unwrap();

        let mut expected: BTreeSet<&str> = defs.keys().map(String::as_str).collect();
        expected.insert("main");
        let actual: BTreeSet<&str> = program.label_names().collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn duplicate_label_always_fails(
        name in label_name(),
        first in body(),
        second in body(),
    ) {
        let src = format!("{name}: {}\n{name}: {}\n", first.join(" "), second.join(" "));
        let is_redefinition = matches!(
            compile(&src),
            Err(CompileError::Redefinition { .. })
        );
        prop_assert!(is_redefinition);
    }

    #[test]
    fn extra_close_bracket_is_always_mismatched(words in body(), extra in 1usize..3) {
        let src = format!("main: {} {}", words.join(" "), vec!["]"; extra].join(" "));
        let is_mismatch = matches!(
            compile(&src),
            Err(CompileError::MismatchedBracket { bracket: ']', .. })
        );
        prop_assert!(is_mismatch);
    }
}
