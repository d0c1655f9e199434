//! Agent struct system
//!
//! A global [`AgentRegistry`] maps type names to [`AgentType`] records.
//! `agent(name, fields)` ensures a type exists (creating a minimal one from
//! the field keys if needed) and creates an [`AgentInstance`] bound to it.
//! Four of the five core methods (`plan`, `solve`, `remember`, `recall`) are
//! pure functions over instance state and live here; `chat` additionally
//! needs the resource registry and an LLM executor and is implemented in
//! the interpreter, which calls back into this module's conversation-memory
//! accessor.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{DanaError, Result};
use crate::llm::LlmResource;
use crate::memory::ConversationMemory;
use crate::value::Value;

/// The four default methods every agent instance supports unless a type
/// overrides them; `chat` is a fifth core method handled by the interpreter.
pub const DEFAULT_METHODS: [&str; 4] = ["plan", "solve", "remember", "recall"];

/// A named agent type: an ordered field list plus advisory metadata.
#[derive(Debug, Clone)]
pub struct AgentType {
    pub name: String,
    pub field_names: Vec<String>,
    pub field_types: BTreeMap<String, String>,
    pub field_docs: BTreeMap<String, String>,
}

impl AgentType {
    fn minimal(name: &str, field_names: &[String]) -> Self {
        Self {
            name: name.to_string(),
            field_names: field_names.to_vec(),
            field_types: BTreeMap::new(),
            field_docs: BTreeMap::new(),
        }
    }
}

/// Registry of agent types, keyed by name. A type may be registered at most
/// once; re-declaring it with a different field set is an error.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    types: BTreeMap<String, AgentType>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a type named `name` exists with exactly `field_names`, creating
    /// a minimal one if absent.
    pub fn ensure_type(&mut self, name: &str, field_names: &[String]) -> Result<()> {
        match self.types.get(name) {
            Some(existing) if existing.field_names != field_names => Err(DanaError::validation(
                format!("agent type {name:?} already registered with a different shape"),
            )),
            Some(_) => Ok(()),
            None => {
                self.types
                    .insert(name.to_string(), AgentType::minimal(name, field_names));
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&AgentType> {
        self.types.get(name)
    }
}

/// A live agent instance: field values, its own memory map (for
/// `remember`/`recall`), an optional bound LLM, and lazily-created
/// conversation memory.
pub struct AgentInstance {
    pub type_name: String,
    pub fields: BTreeMap<String, Value>,
    pub memory: BTreeMap<String, Value>,
    pub llm: Option<Arc<dyn LlmResource>>,
    conversation: Option<ConversationMemory>,
}

impl AgentInstance {
    pub fn new(type_name: impl Into<String>, fields: BTreeMap<String, Value>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
            memory: BTreeMap::new(),
            llm: None,
            conversation: None,
        }
    }

    /// `remember(key, value) -> true`; always succeeds.
    pub fn remember(&mut self, key: impl Into<String>, value: Value) -> Value {
        self.memory.insert(key.into(), value);
        Value::Bool(true)
    }

    /// `recall(key) -> value | None`.
    pub fn recall(&self, key: &str) -> Value {
        self.memory.get(key).cloned().unwrap_or(Value::None)
    }

    /// Deterministic, side-effect-free summary used by both `plan` and `solve`.
    fn summary(&self, verb: &str, subject: &str) -> Value {
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        Value::Str(format!(
            "[{}] {} {:?} (fields: {})",
            self.type_name,
            verb,
            subject,
            fields.join(", ")
        ))
    }

    pub fn plan(&self, task: &str) -> Value {
        self.summary("planning", task)
    }

    pub fn solve(&self, problem: &str) -> Value {
        self.summary("solving", problem)
    }

    /// Access (lazily creating) this instance's conversation memory.
    pub fn conversation_memory(
        &mut self,
        conversation_dir: &Path,
        max_turns: usize,
    ) -> &mut ConversationMemory {
        if self.conversation.is_none() {
            self.conversation = Some(ConversationMemory::load(
                conversation_dir,
                &self.type_name,
                max_turns,
            ));
        }
        self.conversation.as_mut().expect("just initialized")
    }
}

impl std::fmt::Debug for AgentInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentInstance")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_type_creates_minimal_type() {
        let mut registry = AgentRegistry::new();
        registry
            .ensure_type("Support", &["domain".to_string()])
            .unwrap();
        assert!(registry.get("Support").is_some());
    }

    #[test]
    fn test_ensure_type_rejects_reshaping() {
        let mut registry = AgentRegistry::new();
        registry
            .ensure_type("Support", &["domain".to_string()])
            .unwrap();
        let err = registry.ensure_type("Support", &["other".to_string()]);
        assert!(err.is_err());
    }

    #[test]
    fn test_remember_and_recall_roundtrip() {
        let mut instance = AgentInstance::new("Support", BTreeMap::new());
        assert_eq!(instance.recall("k"), Value::None);
        instance.remember("k", Value::Int(5));
        assert_eq!(instance.recall("k"), Value::Int(5));
    }

    #[test]
    fn test_plan_includes_type_name_and_task() {
        let instance = AgentInstance::new("Support", BTreeMap::new());
        let Value::Str(s) = instance.plan("help a customer") else {
            panic!("expected string");
        };
        assert!(s.contains("Support"));
        assert!(s.contains("help a customer"));
    }
}
