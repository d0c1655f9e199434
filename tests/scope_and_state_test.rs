//! End-to-end scope and state scenarios run through the full
//! lex -> parse -> interpret pipeline.

use dana::config::DanaConfig;
use dana::interpreter::{self, RuntimeContext};
use dana::registry::ResourceRegistry;
use dana::value::Value;
use dana::{parser, state::StateStore};

fn run(source: &str) -> RuntimeContext {
    let mut ctx = RuntimeContext::new(DanaConfig::default(), ResourceRegistry::new(), None);
    let parsed = parser::parse(source);
    assert!(parsed.is_valid, "parse errors: {:?}", parsed.errors);
    interpreter::execute_program(&parsed.program, &mut ctx)
        .unwrap_or_else(|e| panic!("execution failed: {e}"));
    ctx
}

fn get(state: &StateStore, path: &str) -> Value {
    state.get(path, Value::None)
}

#[test]
fn test_self_referencing_assignment_and_last_value() {
    let ctx = run("private.counter = 5\nprivate.counter = private.counter + 1");
    assert_eq!(get(&ctx.state, "private.counter"), Value::Int(6));
    assert_eq!(get(&ctx.state, "private.__last_value"), Value::Int(6));
}

#[test]
fn test_arithmetic_across_two_variables() {
    let ctx = run("private.a = 10\nprivate.b = 100\nprivate.result = private.a + private.b");
    assert_eq!(get(&ctx.state, "private.result"), Value::Int(110));
}

#[test]
fn test_if_else_branch_selection() {
    let ctx = run(
        "private.a = 10\nif private.a > 5:\n    private.b = 20\nelse:\n    private.b = 0",
    );
    assert_eq!(get(&ctx.state, "private.b"), Value::Int(20));
}

#[test]
fn test_if_false_branch_takes_else() {
    let ctx = run(
        "private.a = 1\nif private.a > 5:\n    private.b = 20\nelse:\n    private.b = 0",
    );
    assert_eq!(get(&ctx.state, "private.b"), Value::Int(0));
}

#[test]
fn test_while_loop_accumulates() {
    let ctx = run("private.i = 0\nprivate.total = 0\nwhile private.i < 5:\n    private.total = private.total + private.i\n    private.i = private.i + 1");
    assert_eq!(get(&ctx.state, "private.total"), Value::Int(10));
}

#[test]
fn test_while_loop_exceeding_step_cap_errors() {
    let mut ctx = RuntimeContext::new(
        DanaConfig::builder().max_loop_steps(10).build().unwrap(),
        ResourceRegistry::new(),
        None,
    );
    let parsed = parser::parse("private.i = 0\nwhile private.i < 1000000:\n    private.i = private.i + 1");
    assert!(parsed.is_valid);
    let err = interpreter::execute_program(&parsed.program, &mut ctx).unwrap_err();
    assert!(err.to_string().to_lowercase().contains("loop"));
}

#[test]
fn test_each_scope_keeps_its_own_last_value() {
    let ctx = run("private.x = 1\npublic.y = 2");
    assert_eq!(get(&ctx.state, "private.__last_value"), Value::Int(1));
    assert_eq!(get(&ctx.state, "public.__last_value"), Value::Int(2));
}

#[test]
fn test_nested_path_auto_creates_intermediate_maps() {
    let ctx = run("private.config.retries = 3");
    assert_eq!(get(&ctx.state, "private.config.retries"), Value::Int(3));
}

#[test]
fn test_list_and_map_literals_round_trip() {
    let ctx = run(r#"private.items = [1, 2, 3]
private.meta = {"name": "widget", "count": 2}"#);
    match get(&ctx.state, "private.items") {
        Value::List(list) => assert_eq!(list.borrow().len(), 3),
        other => panic!("expected a list, got {other:?}"),
    }
    match get(&ctx.state, "private.meta") {
        Value::Map(map) => assert_eq!(map.borrow().get("name"), Some(&Value::Str("widget".to_string()))),
        other => panic!("expected a map, got {other:?}"),
    }
}
