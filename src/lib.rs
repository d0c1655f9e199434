//! # Dana
//!
//! Dana is a small scoped scripting language for building and driving
//! agents against local OpenAI-compatible LLM servers (LM Studio, Ollama,
//! llama.cpp, vLLM). This crate is the language's lexer, parser, tree-walking
//! interpreter, REPL, and agent/LLM runtime.
//!
//! ## Overview
//!
//! Every variable reference in Dana lives in one of seven fixed scopes
//! (`private`, `public`, `system`, `local`, `temp`, `agent`, `world`), each
//! carrying a reserved `__last_value` slot updated on every assignment. A
//! program is a sequence of indentation-delimited statements -- assignments,
//! `if`/`elif`/`else`, `while`, and calls -- evaluated by a synchronous
//! tree-walking interpreter. LLM calls never block the interpreter directly:
//! they're represented as [`Promise`](promise::Promise) values backed by a
//! dedicated background Tokio runtime.
//!
//! ## Example
//!
//! ```rust
//! use dana::{DanaConfig, interpreter::RuntimeContext, parser, registry::ResourceRegistry};
//!
//! let config = DanaConfig::default();
//! let mut ctx = RuntimeContext::new(config, ResourceRegistry::new(), None);
//!
//! let parsed = parser::parse("private.x = 2 + 2\nprint(private.x)");
//! assert!(parsed.is_valid);
//!
//! dana::interpreter::execute_program(&parsed.program, &mut ctx).unwrap();
//! assert_eq!(ctx.get_and_clear_output(), vec!["4".to_string()]);
//! ```

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

/// Dotted-path variable AST: expressions, statements, locations.
pub mod ast;

/// Runtime-wide configuration: loop caps, history limits, LLM connection settings.
pub mod config;

/// Input-completion checker used by the REPL to decide when a buffer is ready to run.
pub mod completion;

/// Uniform error type and source-location caret rendering.
pub mod error;

/// Lexer: merges continuation lines and tokenizes into `LogicalLine`s.
pub mod lexer;

/// LLM resource abstraction: the OpenAI-compatible HTTP client, the mock, and
/// the background executor that bridges async LLM calls to the synchronous core.
pub mod llm;

/// Bounded, JSON-persisted conversation memory for agent `chat()`.
pub mod memory;

/// Agent type/instance system: `plan`, `solve`, `remember`, `recall`, `chat`.
pub mod agent;

/// Indentation-stack block parser and precedence-climbing expression parser.
pub mod parser;

/// Deferred LLM-call value returned by `reason(...)` and `chat(...)`.
pub mod promise;

/// Named LLM resource registry (`"llm"` and friends).
pub mod registry;

/// Exponential-backoff-with-jitter retry helper for the HTTP LLM client.
pub mod retry;

/// REPL driver: prompts, meta-commands, multi-line buffering, history.
pub mod repl;

/// Seven-scope variable store with dotted-path get/set.
pub mod state;

/// NLP transcoder: deterministic-first, LLM-fallback translation into Dana source.
pub mod transcoder;

/// Runtime value type and display rules.
pub mod value;

/// Tree-walking interpreter over the AST.
pub mod interpreter;

// ============================================================================
// PUBLIC EXPORTS
// ============================================================================

pub use config::DanaConfig;
pub use error::{DanaError, Result};
pub use interpreter::{RuntimeContext, execute_program};
pub use parser::{ParseResult, parse};
pub use promise::Promise;
pub use state::{Scope, StateStore};
pub use value::Value;

// ============================================================================
// CONVENIENCE PRELUDE
// ============================================================================

/// Import with `use dana::prelude::*;` for the common pieces of the runtime.
pub mod prelude {
    pub use crate::agent::{AgentInstance, AgentRegistry, AgentType};
    pub use crate::config::DanaConfig;
    pub use crate::error::{DanaError, Result};
    pub use crate::interpreter::{RuntimeContext, execute_program};
    pub use crate::llm::{HttpLlmResource, LlmExecutor, LlmResource, MockLlmResource};
    pub use crate::parser::{ParseResult, parse};
    pub use crate::promise::Promise;
    pub use crate::registry::ResourceRegistry;
    pub use crate::repl::{History, Repl, ReplEvent};
    pub use crate::state::{Scope, StateStore};
    pub use crate::value::Value;
}
