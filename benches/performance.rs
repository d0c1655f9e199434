use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use dana::config::DanaConfig;
use dana::interpreter::{self, RuntimeContext};
use dana::registry::ResourceRegistry;
use dana::{completion, parser};

fn assignment_chain(count: usize) -> String {
    (0..count)
        .map(|i| format!("private.x{i} = {i} + {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn nested_if_program(depth: usize) -> String {
    let mut lines = Vec::new();
    for i in 0..depth {
        lines.push(format!("{}if private.x{i}:", "    ".repeat(i)));
    }
    lines.push(format!("{}private.result = 1", "    ".repeat(depth)));
    lines.join("\n")
}

fn bench_lexer(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer");
    for count in [1, 10, 50, 200].iter() {
        let source = assignment_chain(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &source, |b, src| {
            b.iter(|| dana::lexer::tokenize(black_box(src)).unwrap());
        });
    }
    group.finish();
}

fn bench_parser_flat_assignments(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_flat_assignments");
    for count in [1, 10, 50, 200].iter() {
        let source = assignment_chain(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &source, |b, src| {
            b.iter(|| parser::parse(black_box(src)));
        });
    }
    group.finish();
}

fn bench_parser_nested_blocks(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_nested_blocks");
    for depth in [1, 5, 10, 20].iter() {
        let source = nested_if_program(*depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &source, |b, src| {
            b.iter(|| parser::parse(black_box(src)));
        });
    }
    group.finish();
}

fn bench_interpreter_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpreter_execute");
    for count in [1, 10, 50, 200].iter() {
        let source = assignment_chain(*count);
        let parsed = parser::parse(&source);
        group.bench_with_input(BenchmarkId::from_parameter(count), &parsed, |b, parsed| {
            b.iter(|| {
                let config = DanaConfig::default();
                let mut ctx = RuntimeContext::new(config, ResourceRegistry::new(), None);
                interpreter::execute_program(black_box(&parsed.program), &mut ctx).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_completion_checker(c: &mut Criterion) {
    let mut group = c.benchmark_group("completion_checker");

    let single_line = "private.x = 2 + 2";
    group.bench_function("single_line", |b| {
        b.iter(|| completion::is_complete(black_box(single_line)));
    });

    let block = nested_if_program(10);
    group.bench_function("deep_unclosed_block", |b| {
        b.iter(|| completion::is_complete(black_box(&block)));
    });

    group.finish();
}

fn bench_while_loop_execution(c: &mut Criterion) {
    let mut group = c.benchmark_group("while_loop_execution");
    for iterations in [10, 100, 1000].iter() {
        let source = format!(
            "private.i = 0\nwhile private.i < {iterations}:\n    private.i = private.i + 1"
        );
        let parsed = parser::parse(&source);
        group.bench_with_input(
            BenchmarkId::from_parameter(iterations),
            &parsed,
            |b, parsed| {
                b.iter(|| {
                    let config = DanaConfig::default();
                    let mut ctx = RuntimeContext::new(config, ResourceRegistry::new(), None);
                    interpreter::execute_program(black_box(&parsed.program), &mut ctx).unwrap();
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_lexer,
    bench_parser_flat_assignments,
    bench_parser_nested_blocks,
    bench_interpreter_execute,
    bench_completion_checker,
    bench_while_loop_execution,
);
criterion_main!(benches);
