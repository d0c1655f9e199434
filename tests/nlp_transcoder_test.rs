//! End-to-end natural-language mode: deterministic transcoding feeding
//! straight into the parser and interpreter, with no LLM involved.

use dana::config::DanaConfig;
use dana::interpreter::{self, RuntimeContext};
use dana::registry::ResourceRegistry;
use dana::value::Value;
use dana::{parser, transcoder};

#[tokio::test]
async fn test_deterministic_arithmetic_skips_the_llm() {
    let source = transcoder::transcode("5 + 5", None).await.unwrap();
    let parsed = parser::parse(&source);
    assert!(parsed.is_valid);

    let mut ctx = RuntimeContext::new(DanaConfig::default(), ResourceRegistry::new(), None);
    interpreter::execute_program(&parsed.program, &mut ctx).unwrap();
    assert_eq!(
        ctx.state.get("private.result", Value::None),
        Value::Int(10)
    );
}

#[tokio::test]
async fn test_deterministic_number_literal_assigns_result() {
    let source = transcoder::transcode("42", None).await.unwrap();
    assert_eq!(source, "private.result = 42");
}

#[tokio::test]
async fn test_nlp_without_llm_errors_on_free_form_text() {
    let err = transcoder::transcode("summarize the last conversation", None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("requires an LLM"));
}
