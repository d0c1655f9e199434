//! Interpreter
//!
//! `execute_program` walks a [`Program`] tree against a [`RuntimeContext`],
//! mutating the state store, buffering printed output, and dispatching
//! builtin calls (`print`, `log.<level>`, `reason`, `agent`) and agent
//! method calls.

use std::collections::BTreeMap;
use std::path::PathBuf;

use log::{debug, warn};

use crate::agent::{AgentInstance, AgentRegistry, DEFAULT_METHODS};
use crate::ast::{BinaryOp, Expr, Literal, Location, Program, Stmt, UnaryOp};
use crate::config::{DanaConfig, LogLevel};
use crate::error::{DanaError, Result};
use crate::llm::LlmExecutor;
use crate::registry::ResourceRegistry;
use crate::state::StateStore;
use crate::value::Value;

const STANDARD_SYSTEM_PROMPT: &str =
    "You are a helpful assistant invoked from a Dana program's reason() call.";

/// Everything a running program needs: state, resources, agent registry,
/// configuration, and the buffered print sink.
pub struct RuntimeContext {
    pub state: StateStore,
    pub resources: ResourceRegistry,
    pub agents: AgentRegistry,
    pub config: DanaConfig,
    pub llm_executor: Option<LlmExecutor>,
    output: Vec<String>,
}

impl RuntimeContext {
    pub fn new(config: DanaConfig, resources: ResourceRegistry, llm_executor: Option<LlmExecutor>) -> Self {
        Self {
            state: StateStore::new(),
            resources,
            agents: AgentRegistry::new(),
            config,
            llm_executor,
            output: Vec::new(),
        }
    }

    /// Drain everything written by `print`/`log.*` since the last drain.
    pub fn get_and_clear_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    fn conversation_dir(&self) -> PathBuf {
        self.config.conversation_dir().clone()
    }
}

/// Evaluate every statement in `program` in order, returning the value of
/// the last top-level expression/assignment, if any.
pub fn execute_program(program: &Program, ctx: &mut RuntimeContext) -> Result<Option<Value>> {
    let mut last = None;
    let mut steps: u64 = 0;
    for stmt in &program.statements {
        last = execute_stmt(stmt, ctx, &mut steps)?;
    }
    Ok(last)
}

fn execute_stmt(stmt: &Stmt, ctx: &mut RuntimeContext, steps: &mut u64) -> Result<Option<Value>> {
    match stmt {
        Stmt::Assign { path, value, location } => {
            let evaluated = eval_expr(value, ctx)?;
            let dotted = path.join(".");
            ctx.state.set(&dotted, evaluated.clone()).map_err(|e| {
                attach_location(e, location)
            })?;
            Ok(Some(evaluated))
        }
        Stmt::Expr(expr) => {
            let value = eval_expr(expr, ctx)?;
            Ok(Some(value))
        }
        Stmt::If {
            branches,
            else_body,
            ..
        } => {
            for (cond, body) in branches {
                if eval_expr(cond, ctx)?.is_truthy() {
                    return execute_body(body, ctx, steps);
                }
            }
            if let Some(body) = else_body {
                return execute_body(body, ctx, steps);
            }
            Ok(None)
        }
        Stmt::While {
            condition,
            body,
            location,
        } => {
            let mut last = None;
            while eval_expr(condition, ctx)?.is_truthy() {
                *steps += 1;
                if *steps > ctx.config.max_loop_steps() {
                    return Err(DanaError::interpret_at(
                        format!(
                            "loop step cap exceeded ({} steps)",
                            ctx.config.max_loop_steps()
                        ),
                        location.clone().into(),
                    ));
                }
                last = execute_body(body, ctx, steps)?;
            }
            Ok(last)
        }
    }
}

fn execute_body(body: &[Stmt], ctx: &mut RuntimeContext, steps: &mut u64) -> Result<Option<Value>> {
    let mut last = None;
    for stmt in body {
        last = execute_stmt(stmt, ctx, steps)?;
    }
    Ok(last)
}

fn attach_location(err: DanaError, location: &Location) -> DanaError {
    match err {
        DanaError::State { message, location: None } => {
            DanaError::State { message, location: Some(location.clone().into()) }
        }
        other => other,
    }
}

fn eval_expr(expr: &Expr, ctx: &mut RuntimeContext) -> Result<Value> {
    match expr {
        Expr::Literal(lit, _) => Ok(eval_literal(lit)),
        Expr::Identifier(path, loc) => resolve_identifier(path, ctx, loc),
        Expr::Unary(op, operand, loc) => {
            let value = eval_expr(operand, ctx)?.force()?;
            eval_unary(*op, value, loc)
        }
        Expr::Binary(BinaryOp::And, left, right, _) => {
            let l = eval_expr(left, ctx)?.force()?;
            if !l.is_truthy() {
                return Ok(l);
            }
            eval_expr(right, ctx)?.force()
        }
        Expr::Binary(BinaryOp::Or, left, right, _) => {
            let l = eval_expr(left, ctx)?.force()?;
            if l.is_truthy() {
                return Ok(l);
            }
            eval_expr(right, ctx)?.force()
        }
        Expr::Binary(op, left, right, loc) => {
            let l = eval_expr(left, ctx)?.force()?;
            let r = eval_expr(right, ctx)?.force()?;
            eval_binary(*op, l, r, loc)
        }
        Expr::List(items, _) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval_expr(item, ctx)?);
            }
            Ok(Value::list(values))
        }
        Expr::Map(entries, _) => {
            let mut map = BTreeMap::new();
            for (key, value_expr) in entries {
                map.insert(key.clone(), eval_expr(value_expr, ctx)?);
            }
            Ok(Value::map(map))
        }
        Expr::Call { path, args, location } => eval_call(path, args, location, ctx),
    }
}

fn eval_literal(lit: &Literal) -> Value {
    match lit {
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(f) => Value::Float(*f),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Str(s) => Value::Str(s.clone()),
        Literal::None => Value::None,
    }
}

/// Resolve a dotted identifier. A single bare word probes
/// `private.x`, `public.x`, `system.x` in order.
fn resolve_identifier(path: &[String], ctx: &RuntimeContext, loc: &Location) -> Result<Value> {
    if path.len() == 1 {
        for scope in ["private", "public", "system"] {
            let dotted = format!("{scope}.{}", path[0]);
            let found = ctx.state.get(&dotted, Value::None);
            if found != Value::None {
                return Ok(found);
            }
        }
        return Ok(Value::None);
    }
    let dotted = path.join(".");
    let value = ctx.state.get(&dotted, Value::None);
    debug!("resolved {dotted} at {}:{}", loc.line, loc.column);
    Ok(value)
}

fn eval_unary(op: UnaryOp, value: Value, loc: &Location) -> Result<Value> {
    match (op, &value) {
        (UnaryOp::Neg, Value::Int(n)) => Ok(Value::Int(-n)),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Neg, other) => Err(DanaError::interpret_at(
            format!("cannot negate a {}", other.type_name()),
            loc.clone().into(),
        )),
        (UnaryOp::Not, other) => Ok(Value::Bool(!other.is_truthy())),
    }
}

fn eval_binary(op: BinaryOp, left: Value, right: Value, loc: &Location) -> Result<Value> {
    use BinaryOp::*;
    match op {
        Add => match (&left, &right) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
            (Value::Str(a), b) => Ok(Value::Str(format!("{a}{b}"))),
            (a, Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
            _ => numeric_binop(left, right, loc, |a, b| a + b, |a, b| a + b),
        },
        Sub => numeric_binop(left, right, loc, |a, b| a - b, |a, b| a - b),
        Mul => numeric_binop(left, right, loc, |a, b| a * b, |a, b| a * b),
        Div => {
            if is_zero(&right) {
                return Err(DanaError::interpret_at(
                    "division by zero",
                    loc.clone().into(),
                ));
            }
            numeric_binop(left, right, loc, |a, b| a / b, |a, b| a / b)
        }
        Eq => Ok(Value::Bool(left == right)),
        NotEq => Ok(Value::Bool(left != right)),
        Lt | LtEq | Gt | GtEq => compare(op, left, right, loc),
        And | Or => unreachable!("short-circuited in eval_expr"),
    }
}

fn is_zero(v: &Value) -> bool {
    matches!(v, Value::Int(0)) || matches!(v, Value::Float(f) if *f == 0.0)
}

fn numeric_binop(
    left: Value,
    right: Value,
    loc: &Location,
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(int_op(a, b))),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(float_op(a, b))),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(float_op(a as f64, b))),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(float_op(a, b as f64))),
        (a, b) => Err(DanaError::interpret_at(
            format!(
                "unsupported operand types: {} and {}",
                a.type_name(),
                b.type_name()
            ),
            loc.clone().into(),
        )),
    }
}

fn compare(op: BinaryOp, left: Value, right: Value, loc: &Location) -> Result<Value> {
    let ordering = match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
        _ => {
            return Err(DanaError::interpret_at(
                format!(
                    "cannot compare {} and {}",
                    left.type_name(),
                    right.type_name()
                ),
                loc.clone().into(),
            ));
        }
    };
    let Some(ordering) = ordering else {
        return Err(DanaError::interpret_at("comparison produced no ordering", loc.clone().into()));
    };
    use std::cmp::Ordering::*;
    let result = match op {
        BinaryOp::Lt => ordering == Less,
        BinaryOp::LtEq => ordering != Greater,
        BinaryOp::Gt => ordering == Greater,
        BinaryOp::GtEq => ordering != Less,
        _ => unreachable!(),
    };
    Ok(Value::Bool(result))
}

fn eval_call(path: &[String], args: &[Expr], loc: &Location, ctx: &mut RuntimeContext) -> Result<Value> {
    if path.len() == 2 && path[0] == "log" {
        return eval_log_call(&path[1], args, loc, ctx);
    }

    if path.len() == 1 {
        return eval_builtin_call(&path[0], args, loc, ctx);
    }

    // `obj.path.method(args)`: everything but the last segment names the
    // object, the last segment is the method.
    let (object_path, method_name) = path.split_at(path.len() - 1);
    let method_name = &method_name[0];
    let receiver = resolve_identifier(object_path, ctx, loc)?;
    let Value::Agent(instance) = receiver else {
        return Err(DanaError::interpret_at(
            format!(
                "cannot call method {method_name:?} on a {}",
                receiver.type_name()
            ),
            loc.clone().into(),
        ));
    };

    let mut evaluated_args = Vec::with_capacity(args.len());
    for arg in args {
        evaluated_args.push(eval_expr(arg, ctx)?.force()?);
    }

    dispatch_agent_method(instance, method_name, &evaluated_args, loc, ctx)
}

fn eval_log_call(level: &str, args: &[Expr], loc: &Location, ctx: &mut RuntimeContext) -> Result<Value> {
    let level: LogLevel = level
        .parse()
        .map_err(|_| DanaError::interpret_at(format!("unknown log level: {level}"), loc.clone().into()))?;

    let mut rendered = Vec::with_capacity(args.len());
    for arg in args {
        rendered.push(eval_expr(arg, ctx)?.to_display_string());
    }
    let message = rendered.join(" ");

    if level >= ctx.config.log_level() {
        ctx.output.push(format!("[{}] {}", level.as_str(), message));
    }
    Ok(Value::None)
}

fn eval_builtin_call(name: &str, args: &[Expr], loc: &Location, ctx: &mut RuntimeContext) -> Result<Value> {
    match name {
        "print" => {
            let mut rendered = Vec::with_capacity(args.len());
            for arg in args {
                rendered.push(eval_expr(arg, ctx)?.to_display_string());
            }
            ctx.output.push(rendered.join(" "));
            Ok(Value::None)
        }
        "reason" => {
            let Some(first) = args.first() else {
                return Err(DanaError::interpret_at("reason() requires a prompt argument", loc.clone().into()));
            };
            let prompt = eval_expr(first, ctx)?.to_display_string();
            Ok(build_reason_promise(&prompt, ctx))
        }
        "agent" => eval_agent_builtin(args, loc, ctx),
        other => Err(DanaError::interpret_at(
            format!("unknown function: {other}"),
            loc.clone().into(),
        )),
    }
}

fn build_reason_promise(prompt: &str, ctx: &RuntimeContext) -> Value {
    let promise = match (ctx.resources.llm(), &ctx.llm_executor) {
        (Some(llm), Some(executor)) => executor.spawn_chat_completion(
            llm,
            prompt.to_string(),
            STANDARD_SYSTEM_PROMPT.to_string(),
            "reason",
        ),
        _ => crate::promise::Promise::resolved(
            "reason",
            Value::Str(format!("No LLM configured. Prompt was: {prompt}")),
        ),
    };
    Value::Promise(std::rc::Rc::new(promise))
}

fn eval_agent_builtin(args: &[Expr], loc: &Location, ctx: &mut RuntimeContext) -> Result<Value> {
    let Some(name_expr) = args.first() else {
        return Err(DanaError::interpret_at("agent() requires a name argument", loc.clone().into()));
    };
    let name_value = eval_expr(name_expr, ctx)?;
    let Value::Str(name) = name_value else {
        return Err(DanaError::interpret_at("agent() name must be a string", loc.clone().into()));
    };

    let fields = match args.get(1) {
        Some(expr) => match eval_expr(expr, ctx)? {
            Value::Map(m) => m.borrow().clone(),
            other => {
                return Err(DanaError::interpret_at(
                    format!("agent() fields must be a map, got {}", other.type_name()),
                    loc.clone().into(),
                ));
            }
        },
        None => BTreeMap::new(),
    };

    let field_names: Vec<String> = fields.keys().cloned().collect();
    ctx.agents.ensure_type(&name, &field_names).map_err(|e| {
        if let DanaError::Validation { message, .. } = e {
            DanaError::Validation {
                message,
                location: Some(loc.clone().into()),
            }
        } else {
            e
        }
    })?;

    Ok(Value::agent(AgentInstance::new(name, fields)))
}

fn dispatch_agent_method(
    instance: std::rc::Rc<std::cell::RefCell<AgentInstance>>,
    method: &str,
    args: &[Value],
    loc: &Location,
    ctx: &mut RuntimeContext,
) -> Result<Value> {
    match method {
        "plan" | "solve" => {
            let Some(Value::Str(subject)) = args.first() else {
                return Err(DanaError::interpret_at(
                    format!("{method}() requires a string argument"),
                    loc.clone().into(),
                ));
            };
            let borrowed = instance.borrow();
            Ok(if method == "plan" {
                borrowed.plan(subject)
            } else {
                borrowed.solve(subject)
            })
        }
        "remember" => {
            let (Some(Value::Str(key)), Some(value)) = (args.first(), args.get(1)) else {
                return Err(DanaError::interpret_at(
                    "remember(key, value) requires a string key and a value",
                    loc.clone().into(),
                ));
            };
            Ok(instance.borrow_mut().remember(key.clone(), value.clone()))
        }
        "recall" => {
            let Some(Value::Str(key)) = args.first() else {
                return Err(DanaError::interpret_at(
                    "recall(key) requires a string key",
                    loc.clone().into(),
                ));
            };
            Ok(instance.borrow().recall(key))
        }
        "chat" => chat(instance, args, loc, ctx),
        other if DEFAULT_METHODS.contains(&other) => unreachable!("handled above"),
        other => Err(DanaError::interpret_at(
            format!("unknown agent method: {other}"),
            loc.clone().into(),
        )),
    }
}

fn chat(
    instance: std::rc::Rc<std::cell::RefCell<AgentInstance>>,
    args: &[Value],
    loc: &Location,
    ctx: &mut RuntimeContext,
) -> Result<Value> {
    let Some(Value::Str(message)) = args.first() else {
        return Err(DanaError::interpret_at(
            "chat(message) requires a string argument",
            loc.clone().into(),
        ));
    };

    let conversation_dir = ctx.conversation_dir();
    let max_turns = ctx.config.conversation_max_turns();

    let (type_name, fields_summary, history, bound_llm) = {
        let mut borrowed = instance.borrow_mut();
        let memory = borrowed.conversation_memory(&conversation_dir, max_turns);
        let history: Vec<String> = memory
            .last(max_turns)
            .into_iter()
            .map(|t| format!("user: {}\nassistant: {}", t.user, t.assistant))
            .collect();
        let fields_summary: Vec<String> = borrowed
            .fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        (
            borrowed.type_name.clone(),
            fields_summary.join(", "),
            history.join("\n"),
            borrowed.llm.clone(),
        )
    };

    let system_prompt = format!(
        "You are {type_name}, an agent with fields: {fields_summary}.\nConversation so far:\n{history}"
    );

    let llm = bound_llm.or_else(|| ctx.resources.llm());

    let promise = match (llm, &ctx.llm_executor) {
        (Some(llm), Some(executor)) => {
            executor.spawn_chat_completion(llm, message.clone(), system_prompt, "chat")
        }
        _ => crate::promise::Promise::resolved(
            "chat",
            Value::Str(format!("{type_name} acknowledges: {message}")),
        ),
    };

    let result = promise.resolve();
    let assistant_text = match &result {
        Ok(v) => v.to_display_string(),
        Err(e) => format!("LLM error: {e}"),
    };

    {
        let mut borrowed = instance.borrow_mut();
        let memory = borrowed.conversation_memory(&conversation_dir, max_turns);
        if let Err(e) = memory.append(message.clone(), assistant_text.clone()) {
            warn!("failed to persist conversation memory: {e}");
        }
    }

    Ok(Value::Promise(std::rc::Rc::new(
        crate::promise::Promise::resolved("chat", Value::Str(assistant_text)),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn run(source: &str) -> (RuntimeContext, Option<Value>) {
        let mut ctx = RuntimeContext::new(
            DanaConfig::builder().build().unwrap(),
            ResourceRegistry::new(),
            None,
        );
        let parsed = parse(source);
        assert!(parsed.is_valid, "parse errors: {:?}", parsed.errors);
        let result = execute_program(&parsed.program, &mut ctx).unwrap();
        (ctx, result)
    }

    #[test]
    fn test_assignment_sets_last_value() {
        let (mut ctx, _) = run("private.x = 5");
        assert_eq!(ctx.state.get("private.x", Value::None), Value::Int(5));
        assert_eq!(
            ctx.state.get("private.__last_value", Value::None),
            Value::Int(5)
        );
        let _ = ctx.get_and_clear_output();
    }

    #[test]
    fn test_self_referential_assignment() {
        let (mut ctx, _) = run("private.a = 1\nprivate.a = private.a + 1");
        assert_eq!(ctx.state.get("private.a", Value::None), Value::Int(2));
        let _ = ctx.get_and_clear_output();
    }

    #[test]
    fn test_if_elif_else_selects_one_branch() {
        let (mut ctx, _) = run(
            "private.x = 5\nif private.x > 10:\n    private.r = \"big\"\nelif private.x > 0:\n    private.r = \"small\"\nelse:\n    private.r = \"neg\"\n",
        );
        assert_eq!(
            ctx.state.get("private.r", Value::None),
            Value::Str("small".into())
        );
        let _ = ctx.get_and_clear_output();
    }

    #[test]
    fn test_while_loop_counts_up() {
        let (mut ctx, _) = run("private.x = 0\nwhile private.x < 3:\n    private.x = private.x + 1\n");
        assert_eq!(ctx.state.get("private.x", Value::None), Value::Int(3));
        let _ = ctx.get_and_clear_output();
    }

    #[test]
    fn test_division_by_zero_is_error() {
        let mut ctx = RuntimeContext::new(
            DanaConfig::builder().build().unwrap(),
            ResourceRegistry::new(),
            None,
        );
        let parsed = parse("private.x = 1 / 0");
        let err = execute_program(&parsed.program, &mut ctx).unwrap_err();
        assert!(matches!(err, DanaError::Interpret { .. }));
    }

    #[test]
    fn test_print_writes_to_output_buffer() {
        let (mut ctx, _) = run(r#"print("hello", "world")"#);
        assert_eq!(ctx.get_and_clear_output(), vec!["hello world".to_string()]);
    }

    #[test]
    fn test_loop_step_cap_is_enforced() {
        let mut ctx = RuntimeContext::new(
            DanaConfig::builder().max_loop_steps(3).build().unwrap(),
            ResourceRegistry::new(),
            None,
        );
        let parsed = parse("private.x = 0\nwhile true:\n    private.x = private.x + 1\n");
        let err = execute_program(&parsed.program, &mut ctx).unwrap_err();
        assert!(matches!(err, DanaError::Interpret { .. }));
    }

    #[test]
    fn test_agent_creation_and_default_methods() {
        let (mut ctx, _) = run(
            r#"private.bot = agent("Support", {"domain": "billing"})
private.bot.remember("ticket", 42)
private.result = private.bot.recall("ticket")
"#,
        );
        assert_eq!(ctx.state.get("private.result", Value::None), Value::Int(42));
        let _ = ctx.get_and_clear_output();
    }

    #[test]
    fn test_reason_without_llm_resource_returns_deterministic_promise() {
        let (mut ctx, result) = run(r#"private.answer = reason("what is 2+2?")"#);
        match ctx.state.get("private.answer", Value::None) {
            Value::Promise(p) => {
                let resolved = p.resolve().unwrap();
                assert!(resolved.to_string().contains("what is 2+2?"));
            }
            other => panic!("expected a promise, got {other:?}"),
        }
        let _ = result;
        let _ = ctx.get_and_clear_output();
    }

    #[test]
    fn test_unknown_function_is_interpret_error() {
        let mut ctx = RuntimeContext::new(
            DanaConfig::builder().build().unwrap(),
            ResourceRegistry::new(),
            None,
        );
        let parsed = parse("bogus(1)");
        let err = execute_program(&parsed.program, &mut ctx).unwrap_err();
        assert!(matches!(err, DanaError::Interpret { .. }));
    }
}
