#![forbid(unsafe_code)]

use proptest::prelude::*;
use udash_ast::Position;
use udash_compile::compile;
use udash_geom::Matrix;
use udash_vm::{
    opcode_arity, opcode_names, Analyzer, Canvas, DrawOp, Environment, ErrorKind, Recorder, Value,
    Vm, VmError,
};

fn run_with(src: &str, env: &Environment) -> (Vm, Recorder, Result<(), VmError>) {
    let program = compile(src).unwrap();
    let mut vm = Vm::default();
    let mut recorder = Recorder::new();
    let result = vm.run(&program, "main", env, &mut recorder);
    (vm, recorder, result)
}

fn run(src: &str) -> (Vm, Recorder, Result<(), VmError>) {
    run_with(src, &Environment::new())
}

#[test]
fn adds_two_numbers() {
    let (vm, _, result) = run("main: 3 4 +");
    result.unwrap();
    assert_eq!(vm.stack(), &[Value::Number(7.0)]);
}

#[test]
fn loop_with_empty_body_from_env_leaves_the_items() {
    let env = Environment::new().with("body", Value::List(vec![]));
    let (vm, _, result) = run_with("main: [ 1 2 3 ] body loop", &env);
    result.unwrap();
    assert_eq!(vm.stack(), &[1.0, 2.0, 3.0].map(Value::Number));
}

#[test]
fn define_cannot_shadow_anything() {
    let env = Environment::new().with("t", 1.0);
    for src in [
        "main: 1 :dup define",
        "main: 1 :loop define",
        "main: 1 :t define",
        "main: 1 :helper define\nhelper: 2\n",
        "main: 1 :x define 2 :x define",
        "main: 1 :x define [ 2 :x define ] unquote",
    ] {
        let (_, _, result) = run_with(src, &env);
        assert!(
            matches!(result.unwrap_err().kind, ErrorKind::Redefinition { .. }),
            "{src}"
        );
    }
}

#[test]
fn errors_point_at_the_innermost_token() {
    let (_, _, result) = run("main: helper\nhelper:\n  1 fill\n");
    let err = result.unwrap_err();
    let token = err.token.unwrap();
    assert_eq!(token.source, "fill");
    assert_eq!(token.position, Position::new(2, 1));
}

#[test]
fn state_survives_a_failed_run() {
    let (vm, recorder, result) = run("main: 10 10 rectangle stroke 1 2 . 3 :x + 99");
    let err = result.unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));
    assert_eq!(err.token.unwrap().source, "+");
    assert_eq!(
        vm.stack(),
        &[
            Value::Number(1.0),
            Value::Number(2.0),
            Value::Number(3.0),
            Value::from("x"),
        ]
    );
    assert_eq!(vm.debug_output().len(), 1);
    assert_eq!(recorder.ops().len(), 2);
    assert_eq!(recorder.ops()[1], DrawOp::Stroke);
}

#[test]
fn failed_opcode_leaves_its_operands() {
    for (src, depth) in [
        ("main: 1 3 fill", 2),
        ("main: 1 :a +", 2),
        ("main: new 1 0 0 rgb", 4),
        ("main: 1 0 /", 2),
        ("main: :wobbly linejoin", 1),
    ] {
        let (vm, recorder, result) = run(src);
        assert!(result.is_err(), "{src}");
        assert_eq!(vm.stack().len(), depth, "{src}");
        assert!(recorder.ops().iter().all(|op| *op == DrawOp::NewPath), "{src}");
    }
    let (vm, _, _) = run("main: 1 3 fill");
    assert_eq!(vm.stack(), &[1.0, 3.0].map(Value::Number));
}

#[test]
fn unmatched_saves_are_restored_even_on_error() {
    let (_, recorder, result) = run("main: save (5,5) translate save 2 2 scale 1 fill");
    assert!(result.is_err());
    assert_eq!(recorder.save_depth(), 0);
    assert_eq!(recorder.matrix(), Matrix::IDENTITY);
}

#[test]
fn program_cannot_restore_host_state() {
    let program = compile("main: restore restore (1,1) translate").unwrap();
    let mut recorder = Recorder::new();
    recorder.save();
    recorder.scale(3.0, 3.0);
    Vm::default()
        .run(&program, "main", &Environment::new(), &mut recorder)
        .unwrap();
    assert_eq!(recorder.save_depth(), 1);
    assert_eq!(recorder.matrix().xx, 3.0);
}

#[test]
fn analyzer_traces_dup_back_to_its_sources() {
    let program = compile("main: 1 2 + dup").unwrap();
    let mut analyzer = Analyzer::default();
    analyzer
        .run(&program, "main", &Environment::new(), &mut Recorder::new())
        .unwrap();

    let id = |column| program.token_at(Position::new(0, column)).unwrap().id;
    let sources: Vec<_> = analyzer
        .trace(id(4))
        .into_iter()
        .map(|(t, _)| program.token(t).source.as_str())
        .collect();
    assert_eq!(sources, vec!["+", "1", "2"]);

    let from_plus: Vec<_> = analyzer.trace(id(3)).into_iter().map(|(t, _)| t).collect();
    assert!(!from_plus.contains(&id(4)));
}

#[test]
fn analyzer_trace_through_a_loop() {
    let src = "main: [ 1 2 ] :double loop +\ndouble: 2 *\n";
    let program = compile(src).unwrap();
    let mut analyzer = Analyzer::default();
    analyzer
        .run(&program, "main", &Environment::new(), &mut Recorder::new())
        .unwrap();
    assert_eq!(analyzer.vm().stack(), &[Value::Number(6.0)]);

    let plus = program.token_at(Position::new(0, 7)).unwrap().id;
    let sources: Vec<_> = analyzer
        .trace(plus)
        .into_iter()
        .map(|(t, _)| program.token(t).source.clone())
        .collect();
    assert!(sources.contains(&"*".to_string()));
    assert!(sources.contains(&"[".to_string()));
}

fn numbers_src(values: &[i32]) -> String {
    let body: Vec<String> = values.iter().map(ToString::to_string).collect();
    format!("main: {}", body.join(" "))
}

proptest! {
    #[test]
    fn dup_drop_is_a_no_op(values in prop::collection::vec(-1000i32..1000, 1..8)) {
        let base = numbers_src(&values);
        let (plain, _, r1) = run(&base);
        let (shuffled, _, r2) = run(&format!("{base} dup drop"));
        prop_assert!(r1.is_ok() && r2.is_ok());
        prop_assert_eq!(plain.stack(), shuffled.stack());
    }

    #[test]
    fn swap_swap_is_identity(values in prop::collection::vec(-1000i32..1000, 2..8)) {
        let base = numbers_src(&values);
        let (plain, _, r1) = run(&base);
        let (shuffled, _, r2) = run(&format!("{base} swap swap"));
        prop_assert!(r1.is_ok() && r2.is_ok());
        prop_assert_eq!(plain.stack(), shuffled.stack());
    }

    #[test]
    fn shallow_stack_underflows_without_side_effects(
        index in 0usize..64,
        depth_seed in 0usize..4,
    ) {
        let names: Vec<_> = opcode_names()
            .into_iter()
            .filter(|name| opcode_arity(name).unwrap_or(0) > 0)
            .collect();
        let name = names[index % names.len()];
        let arity = opcode_arity(name).unwrap();
        let depth = depth_seed % arity;

        let values: Vec<i32> = (1..=depth as i32).collect();
        let (mut vm, mut recorder, result) = run(&numbers_src(&values));
        prop_assert!(result.is_ok());
        let before = vm.stack().to_vec();
        let ops_before = recorder.ops().len();

        let err = vm.apply(name, &mut recorder).unwrap_err();
        prop_assert_eq!(err.kind, ErrorKind::StackUnderflow);
        prop_assert_eq!(vm.stack(), before.as_slice());
        prop_assert_eq!(recorder.ops().len(), ops_before);
    }
}
