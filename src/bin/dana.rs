//! Dana CLI entry point.
//!
//! `dana` with no arguments starts the REPL. `dana run <file>` executes a
//! script non-interactively. `--nlp` starts the REPL in natural-language
//! input mode; `--mock-llm` forces the `"llm"` resource to the deterministic
//! mock regardless of `DANA_MOCK_LLM`.

use std::io::{self, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::error;

use dana::interpreter::{self, RuntimeContext};
use dana::llm::{HttpLlmResource, LlmExecutor, LlmResource, MockLlmResource};
use dana::registry::ResourceRegistry;
use dana::repl::{History, Repl, ReplEvent};
use dana::{DanaConfig, parser};

#[derive(Parser)]
#[command(name = "dana", about = "The Dana scripting language and REPL")]
struct Cli {
    /// Start the REPL with natural-language input mode enabled.
    #[arg(long)]
    nlp: bool,

    /// Path to the REPL history file (defaults to ~/.dana_history).
    #[arg(long)]
    history: Option<PathBuf>,

    /// Force the "llm" resource to a deterministic mock.
    #[arg(long)]
    mock_llm: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a Dana source file non-interactively.
    Run {
        /// Path to the .dana source file.
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config_builder = DanaConfig::builder();
    if let Some(history_path) = cli.history.clone() {
        config_builder = config_builder.history_path(history_path);
    }
    if cli.mock_llm {
        config_builder = config_builder.mock_llm(true);
    }
    let config = match config_builder.build() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e.display_for_repl());
            return ExitCode::FAILURE;
        }
    };

    let (resources, llm_executor) = match build_llm(&config) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("{}", e.display_for_repl());
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Some(Command::Run { path }) => run_file(config, resources, llm_executor, &path),
        None => run_repl(config, resources, llm_executor, cli.nlp),
    }
}

fn build_llm(
    config: &DanaConfig,
) -> dana::Result<(ResourceRegistry, Option<LlmExecutor>)> {
    let mut resources = ResourceRegistry::new();
    let resource: Arc<dyn LlmResource> = if config.mock_llm() {
        Arc::new(MockLlmResource::new())
    } else {
        Arc::new(HttpLlmResource::new(config)?)
    };
    resources.register_resource("llm", resource);
    let executor = LlmExecutor::new()?;
    Ok((resources, Some(executor)))
}

fn run_file(
    config: DanaConfig,
    resources: ResourceRegistry,
    llm_executor: Option<LlmExecutor>,
    path: &PathBuf,
) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: could not read {path:?}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let parsed = parser::parse(&source);
    if !parsed.is_valid {
        for err in &parsed.errors {
            eprintln!("{}", err.display_for_repl());
        }
        return ExitCode::FAILURE;
    }

    let mut ctx = RuntimeContext::new(config, resources, llm_executor);
    match interpreter::execute_program(&parsed.program, &mut ctx) {
        Ok(_) => {
            for line in ctx.get_and_clear_output() {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            for line in ctx.get_and_clear_output() {
                println!("{line}");
            }
            error!("script failed: {e}");
            eprintln!("{}", e.display_for_repl());
            ExitCode::FAILURE
        }
    }
}

fn run_repl(
    config: DanaConfig,
    resources: ResourceRegistry,
    llm_executor: Option<LlmExecutor>,
    nlp: bool,
) -> ExitCode {
    let history = History::load(config.history_path().clone(), config.history_cap());
    let ctx = RuntimeContext::new(config, resources, llm_executor);
    let mut repl = Repl::new(ctx, history, nlp);

    println!("Dana REPL. Type \"exit\" or \"quit\" to leave, \"help\" for commands.");

    let stdin = io::stdin();
    loop {
        print!("{}", repl.prompt());
        if io::stdout().flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) => break, // EOF (Ctrl-D)
            Ok(_) => {}
            Err(e) => {
                eprintln!("error reading input: {e}");
                break;
            }
        }
        let line = line.strip_suffix('\n').unwrap_or(&line).to_string();

        match repl.feed_line(&line) {
            ReplEvent::Continue => {}
            ReplEvent::Output(lines) => {
                for line in lines {
                    println!("{line}");
                }
            }
            ReplEvent::Exit => break,
        }
    }

    ExitCode::SUCCESS
}
