//! REPL driver
//!
//! Assembles multi-line input using [`crate::completion::is_complete`],
//! dispatches meta-commands, and otherwise routes submissions through the
//! (optional) NLP transcoder, the parser, and the interpreter. History is a
//! deduplicated, capped, newline-delimited file.

use std::fs;
use std::path::PathBuf;

use log::{error, warn};

use crate::completion::is_complete;
use crate::error::DanaError;
use crate::interpreter::{self, RuntimeContext};
use crate::parser;
use crate::value::Value;

pub const FRESH_PROMPT: &str = ">>> ";
pub const CONTINUATION_PROMPT: &str = ".... ";

/// What the caller should do after feeding the REPL one line of input.
pub enum ReplEvent {
    /// Keep collecting; show this prompt for the next line.
    Continue,
    /// A submission ran (successfully or not); these lines should be printed.
    Output(Vec<String>),
    /// The user asked to leave the REPL.
    Exit,
}

/// Escape `\` and `\n` so a multi-line command round-trips as a single
/// newline-delimited history line.
fn escape_entry(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape_entry(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Deduplicated, capped, persisted command history. Entries are stored one
/// per line with `\` and embedded newlines escaped, so a multi-line block
/// submission round-trips as a single entry.
pub struct History {
    path: PathBuf,
    cap: usize,
    entries: Vec<String>,
}

impl History {
    pub fn load(path: PathBuf, cap: usize) -> Self {
        let entries = fs::read_to_string(&path)
            .map(|contents| contents.lines().map(unescape_entry).collect())
            .unwrap_or_default();
        Self { path, cap, entries }
    }

    /// Append `command`, moving it to the end if it was already present, and
    /// persist to disk.
    pub fn append(&mut self, command: &str) {
        self.entries.retain(|e| e != command);
        self.entries.push(command.to_string());
        while self.entries.len() > self.cap {
            self.entries.remove(0);
        }
        let serialized: Vec<String> = self.entries.iter().map(|e| escape_entry(e)).collect();
        if let Err(e) = fs::write(&self.path, serialized.join("\n") + "\n") {
            warn!("failed to persist history to {:?}: {e}", self.path);
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// The REPL's buffered, multi-line input driver.
pub struct Repl {
    pub ctx: RuntimeContext,
    buffer: Vec<String>,
    in_multiline: bool,
    nlp_enabled: bool,
    history: History,
}

impl Repl {
    pub fn new(ctx: RuntimeContext, history: History, nlp_enabled: bool) -> Self {
        Self {
            ctx,
            buffer: Vec::new(),
            in_multiline: false,
            nlp_enabled,
            history,
        }
    }

    pub fn prompt(&self) -> &'static str {
        if self.in_multiline {
            CONTINUATION_PROMPT
        } else {
            FRESH_PROMPT
        }
    }

    /// A keyboard interrupt while collecting input: drop the buffer and
    /// return to the fresh prompt.
    pub fn cancel_input(&mut self) {
        self.buffer.clear();
        self.in_multiline = false;
    }

    /// Feed one line of input to the REPL.
    pub fn feed_line(&mut self, line: &str) -> ReplEvent {
        if !self.in_multiline {
            if let Some(event) = self.try_meta_command(line) {
                return event;
            }
            let trimmed = line.trim();
            if trimmed == "exit" || trimmed == "quit" {
                return ReplEvent::Exit;
            }
        }

        self.buffer.push(line.to_string());
        let joined = self.buffer.join("\n");

        if is_complete(&joined) {
            let command = joined.trim_end_matches("\n##").trim_end_matches('\n').to_string();
            self.buffer.clear();
            self.in_multiline = false;
            ReplEvent::Output(self.submit(&command))
        } else {
            self.in_multiline = true;
            ReplEvent::Continue
        }
    }

    fn try_meta_command(&mut self, line: &str) -> Option<ReplEvent> {
        let trimmed = line.trim();
        match trimmed {
            "help" | "?" | "##help" => Some(ReplEvent::Output(vec![
                "Dana REPL".to_string(),
                "  exit | quit          leave the REPL".to_string(),
                "  ##nlp on|off|status  toggle natural-language input mode".to_string(),
                "  ##nlp test           run a canned deterministic-transcoder self-check".to_string(),
                "  ##nlp test <text>    preview the Dana source NLP mode would produce".to_string(),
                "  ##                   end a multi-line block".to_string(),
            ])),
            "##nlp on" => {
                self.nlp_enabled = true;
                Some(ReplEvent::Output(vec!["NLP mode: on".to_string()]))
            }
            "##nlp off" => {
                self.nlp_enabled = false;
                Some(ReplEvent::Output(vec!["NLP mode: off".to_string()]))
            }
            "##nlp status" => Some(ReplEvent::Output(vec![format!(
                "NLP mode: {}",
                if self.nlp_enabled { "on" } else { "off" }
            )])),
            "##nlp test" => Some(ReplEvent::Output(vec![self.nlp_self_check()])),
            _ if trimmed.starts_with("##nlp test ") => {
                let text = &trimmed["##nlp test ".len()..];
                let translated = self.translate(text);
                Some(ReplEvent::Output(vec![match translated {
                    Ok(source) => source,
                    Err(e) => e.display_for_repl(),
                }]))
            }
            _ => None,
        }
    }

    /// Canned self-check for `##nlp test` with no argument: run a fixed
    /// sample through the transcoder's deterministic patterns directly, with
    /// no LLM call (and no background executor) required.
    fn nlp_self_check(&self) -> String {
        const SAMPLE_INPUT: &str = "2 + 2";
        const EXPECTED: &str = "private.result = 2 + 2";
        match crate::transcoder::try_deterministic(SAMPLE_INPUT) {
            Some(source) if source == EXPECTED => {
                format!("NLP self-check OK: {SAMPLE_INPUT:?} -> {source:?}")
            }
            Some(source) => format!(
                "NLP self-check FAILED: {SAMPLE_INPUT:?} -> {source:?}, expected {EXPECTED:?}"
            ),
            None => format!("NLP self-check FAILED: {SAMPLE_INPUT:?} did not match a deterministic pattern"),
        }
    }

    fn translate(&self, input: &str) -> crate::error::Result<String> {
        let llm = self.ctx.resources.llm();
        match &self.ctx.llm_executor {
            Some(executor) => executor.block_on(crate::transcoder::transcode(input, llm)),
            None => Err(DanaError::runtime(
                "NLP mode requires an LLM: no background LLM worker is running",
            )),
        }
    }

    /// Run one fully-assembled submission: optional NLP translation, parse,
    /// interpret, and format the result the way the REPL prints it.
    fn submit(&mut self, command: &str) -> Vec<String> {
        if command.trim().is_empty() {
            return Vec::new();
        }

        self.history.append(command);

        let source = if self.nlp_enabled {
            match self.translate(command) {
                Ok(translated) => translated,
                Err(e) => return vec![e.display_for_repl()],
            }
        } else {
            command.to_string()
        };

        let parsed = parser::parse(&source);
        if !parsed.is_valid {
            return parsed
                .errors
                .iter()
                .map(|e| e.display_for_repl())
                .collect();
        }

        let mut lines = Vec::new();
        match interpreter::execute_program(&parsed.program, &mut self.ctx) {
            Ok(_) => {
                lines.extend(self.ctx.get_and_clear_output());
                let last = self.ctx.state.get("private.__last_value", Value::None);
                if last != Value::None {
                    lines.push(last.to_display_string());
                }
            }
            Err(e) => {
                lines.extend(self.ctx.get_and_clear_output());
                error!("statement failed: {e}");
                lines.push(e.display_for_repl());
            }
        }
        lines
    }

    pub fn history(&self) -> &History {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DanaConfig;
    use crate::registry::ResourceRegistry;
    use tempfile::tempdir;

    fn new_repl() -> Repl {
        let dir = tempdir().unwrap();
        let config = DanaConfig::builder()
            .conversation_dir(dir.path().join("chats"))
            .build()
            .unwrap();
        let ctx = RuntimeContext::new(config, ResourceRegistry::new(), None);
        let history = History::load(dir.path().join("history"), 1000);
        std::mem::forget(dir); // keep tempdir alive for the test's duration
        Repl::new(ctx, history, false)
    }

    #[test]
    fn test_single_line_submission_executes_immediately() {
        let mut repl = new_repl();
        match repl.feed_line("private.x = 5") {
            ReplEvent::Output(lines) => assert_eq!(lines, vec!["5".to_string()]),
            _ => panic!("expected output"),
        }
    }

    #[test]
    fn test_multiline_if_block_waits_for_dedent() {
        let mut repl = new_repl();
        assert!(matches!(repl.feed_line("if private.x:"), ReplEvent::Continue));
        assert!(matches!(repl.feed_line("    print(\"yes\")"), ReplEvent::Continue));
        match repl.feed_line("") {
            ReplEvent::Output(_) => {}
            _ => panic!("expected the blank line to submit the block"),
        }
    }

    #[test]
    fn test_exit_returns_exit_event() {
        let mut repl = new_repl();
        assert!(matches!(repl.feed_line("exit"), ReplEvent::Exit));
    }

    #[test]
    fn test_help_meta_command_does_not_reach_parser() {
        let mut repl = new_repl();
        match repl.feed_line("help") {
            ReplEvent::Output(lines) => assert!(lines[0].contains("Dana REPL")),
            _ => panic!("expected help output"),
        }
    }

    #[test]
    fn test_parse_error_is_reported_without_crashing() {
        let mut repl = new_repl();
        match repl.feed_line("1 +") {
            ReplEvent::Output(lines) => assert!(lines[0].contains("Error")),
            _ => panic!("expected an error line"),
        }
    }

    #[test]
    fn test_history_records_successful_submission() {
        let mut repl = new_repl();
        repl.feed_line("private.x = 1");
        assert_eq!(repl.history().entries(), &["private.x = 1".to_string()]);
    }

    #[test]
    fn test_bare_nlp_test_runs_self_check_without_buffering_as_dana_source() {
        let mut repl = new_repl();
        match repl.feed_line("##nlp test") {
            ReplEvent::Output(lines) => assert!(lines[0].starts_with("NLP self-check OK")),
            _ => panic!("expected a self-check result, not a buffered/parsed submission"),
        }
    }

    #[test]
    fn test_history_round_trips_a_multiline_entry_across_reload() {
        let dir = tempdir().unwrap();
        let history_path = dir.path().join("history");
        let mut history = History::load(history_path.clone(), 1000);
        history.append("if private.x:\n    print(1)");
        history.append("private.y = 2");

        let reloaded = History::load(history_path, 1000);
        assert_eq!(
            reloaded.entries(),
            &[
                "if private.x:\n    print(1)".to_string(),
                "private.y = 2".to_string(),
            ]
        );
    }

    #[test]
    fn test_escape_unescape_round_trip_preserves_backslashes_and_newlines() {
        let original = "a\\b\nc\\\\n";
        assert_eq!(unescape_entry(&escape_entry(original)), original);
    }
}
