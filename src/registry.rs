//! Resource registry
//!
//! A process-wide map of named resources, built once at startup and treated
//! as immutable during execution. The only resource the core contract
//! requires is `"llm"`; `register_resource` exists for future additions.

use std::collections::HashMap;
use std::sync::Arc;

use crate::llm::LlmResource;

/// Process-wide map of named resources.
#[derive(Default)]
pub struct ResourceRegistry {
    resources: HashMap<String, Arc<dyn LlmResource>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_resource(&mut self, name: impl Into<String>, resource: Arc<dyn LlmResource>) {
        self.resources.insert(name.into(), resource);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn LlmResource>> {
        self.resources.get(name).cloned()
    }

    pub fn llm(&self) -> Option<Arc<dyn LlmResource>> {
        self.get("llm")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmResource;

    #[test]
    fn test_register_and_fetch_llm_resource() {
        let mut registry = ResourceRegistry::new();
        assert!(registry.llm().is_none());
        registry.register_resource("llm", Arc::new(MockLlmResource::new()));
        assert!(registry.llm().is_some());
    }

    #[test]
    fn test_unknown_resource_is_none() {
        let registry = ResourceRegistry::new();
        assert!(registry.get("does-not-exist").is_none());
    }
}
