//! NLP transcoder
//!
//! When NLP mode is on, the REPL routes input through [`transcode`] before
//! parsing. A handful of deterministic regex patterns are tried first so
//! common inputs never touch the LLM; anything else is handed to the
//! configured `"llm"` resource with one retry on a parse failure.

use std::sync::Arc;
use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::error::{DanaError, Result};
use crate::llm::LlmResource;
use crate::parser::{self, ParseResult};

fn number_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*-?\d+(\.\d+)?\s*$").unwrap())
}

fn arithmetic_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+)\s*([+\-*/])\s*(\d+)\s*$").unwrap())
}

fn assignment_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*([A-Za-z_]\w*)\s*=\s*(.+)$").unwrap())
}

const KNOWN_SCOPES: [&str; 7] = [
    "private", "public", "system", "local", "temp", "agent", "world",
];

const TRANSCODE_SYSTEM_PROMPT: &str = "Translate the user's natural-language instruction into \
Dana source code. Respond with Dana source only, no explanation, no markdown fences.";

/// Translate free-form input into Dana source, trying deterministic patterns
/// first and falling back to the LLM (with one retry on a parse failure).
pub async fn transcode(input: &str, llm: Option<Arc<dyn LlmResource>>) -> Result<String> {
    if let Some(source) = try_deterministic(input) {
        debug!("transcoder: deterministic match for {input:?}");
        return Ok(source);
    }

    let Some(llm) = llm else {
        return Err(DanaError::runtime(
            "NLP mode requires an LLM: no \"llm\" resource is configured",
        ));
    };

    let first_attempt = llm.chat_completion(input, TRANSCODE_SYSTEM_PROMPT).await?;
    if parser::parse(&first_attempt).is_valid {
        return Ok(first_attempt);
    }

    let ParseResult { errors, .. } = parser::parse(&first_attempt);
    let retry_prompt = format!(
        "{input}\n\nThe previous translation failed to parse with: {:?}. Try again, Dana source only.",
        errors.first().map(|e| e.to_string()).unwrap_or_default()
    );
    let second_attempt = llm.chat_completion(&retry_prompt, TRANSCODE_SYSTEM_PROMPT).await?;
    if parser::parse(&second_attempt).is_valid {
        return Ok(second_attempt);
    }

    Err(DanaError::runtime(
        "transcoder could not produce parseable Dana source after two attempts",
    ))
}

pub(crate) fn try_deterministic(input: &str) -> Option<String> {
    if let Some(caps) = number_pattern().captures(input) {
        return Some(format!("private.result = {}", caps[0].trim()));
    }
    if let Some(caps) = arithmetic_pattern().captures(input) {
        return Some(format!(
            "private.result = {} {} {}",
            &caps[1], &caps[2], &caps[3]
        ));
    }
    if let Some(caps) = assignment_pattern().captures(input) {
        let name = &caps[1];
        if !KNOWN_SCOPES.contains(&name) {
            return Some(format!("private.{} = {}", name, caps[2].trim()));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmResource;

    #[tokio::test]
    async fn test_number_literal_is_deterministic() {
        let result = transcode("42", None).await.unwrap();
        assert_eq!(result, "private.result = 42");
    }

    #[tokio::test]
    async fn test_arithmetic_expression_is_deterministic() {
        let result = transcode("2 + 2", None).await.unwrap();
        assert_eq!(result, "private.result = 2 + 2");
    }

    #[tokio::test]
    async fn test_simple_variable_assignment_is_deterministic() {
        let result = transcode("x = 5", None).await.unwrap();
        assert_eq!(result, "private.x = 5");
    }

    #[tokio::test]
    async fn test_scope_name_assignment_is_not_deterministic_rewritten() {
        // "private = 5" looks like an assignment but `private` is a known
        // scope name, so the deterministic rule intentionally does not fire.
        assert!(try_deterministic("private = 5").is_none());
    }

    #[tokio::test]
    async fn test_no_llm_configured_is_an_error() {
        let err = transcode("do something clever", None).await.unwrap_err();
        assert!(err.to_string().contains("NLP mode requires an LLM"));
    }

    #[tokio::test]
    async fn test_falls_back_to_llm_for_free_form_text() {
        let llm: Arc<dyn LlmResource> = Arc::new(MockLlmResource::new());
        // The mock always returns "[mock response to: ...]" which never
        // parses, so this exercises the retry-then-fail path.
        let err = transcode("make me a sandwich", Some(llm)).await.unwrap_err();
        assert!(err.to_string().contains("could not produce parseable"));
    }
}
