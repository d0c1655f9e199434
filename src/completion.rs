//! Input completion checker
//!
//! `is_complete` is a pure, conservative function the REPL uses to decide
//! whether to submit a buffer or keep collecting lines. It never parses the
//! buffer; it only looks at brackets, trailing colons, indentation, and the
//! `##` block terminator.
//!
//! Contract with the REPL driver: `text` is lines joined by `\n` with *no*
//! trailing newline, except when the user explicitly typed a blank line to
//! end a block — that blank line is represented as a trailing `\n`, which is
//! the one case this function treats as an explicit "stop collecting" signal.

/// Decide whether `text` is a complete Dana statement/block.
pub fn is_complete(text: &str) -> bool {
    if text.trim().is_empty() {
        return true;
    }

    let trailing_blank_terminator = text.ends_with('\n');
    let body = text.trim_end_matches('\n');
    let lines: Vec<&str> = body.split('\n').collect();

    if lines.last().map(|l| l.trim()) == Some("##") {
        return true;
    }

    if !brackets_balanced(body) {
        return false;
    }

    if lines.len() == 1 {
        let line = lines[0];
        if is_bare_word(line) {
            return true;
        }
        if line.trim_end().ends_with(':') {
            return false;
        }
        if let Some((_, rhs)) = line.split_once('=') {
            return !rhs.trim().is_empty();
        }
        return true;
    }

    if trailing_blank_terminator {
        return true;
    }

    is_block_complete(&lines)
}

fn is_bare_word(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_alphabetic() || c == '.')
}

/// Bracket balance, ignoring the contents of single- or double-quoted strings.
fn brackets_balanced(text: &str) -> bool {
    let mut depth = 0i32;
    let mut in_string: Option<char> = None;
    let mut escaped = false;
    for c in text.chars() {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => in_string = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0 && in_string.is_none()
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Conservative multi-line block completeness check, used when the buffer
/// has more than one line and was not explicitly closed with a blank line
/// or `##`. The buffer is complete once control has fully dedented back to
/// the header's own indent and the last line is not itself an open header
/// awaiting a body; otherwise more input is needed.
fn is_block_complete(lines: &[&str]) -> bool {
    let Some(first_non_blank) = lines.iter().find(|l| !l.trim().is_empty()) else {
        return true;
    };
    let header_indent = indent_of(first_non_blank);

    let mut indent_stack = vec![header_indent];
    let mut awaiting_body_for: Option<usize> = None;
    let mut last_indent = header_indent;
    let mut last_was_header = false;

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let indent = indent_of(line);

        if indent < header_indent {
            return false; // dedented past the buffer's own start: malformed
        }

        match awaiting_body_for {
            Some(open_indent) => {
                if indent <= open_indent {
                    return false; // header promised a body, none showed up
                }
                indent_stack.push(indent);
            }
            None => {
                while indent_stack.len() > 1 && indent < *indent_stack.last().unwrap() {
                    indent_stack.pop();
                }
                if indent != *indent_stack.last().unwrap() {
                    return false; // dedent landed on a level never seen before
                }
            }
        }

        last_was_header = line.trim_end().ends_with(':');
        awaiting_body_for = if last_was_header { Some(indent) } else { None };
        last_indent = indent;
    }

    !last_was_header && last_indent == header_indent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_complete() {
        assert!(is_complete(""));
        assert!(is_complete("   "));
    }

    #[test]
    fn test_bare_word_is_complete() {
        assert!(is_complete("private.x"));
    }

    #[test]
    fn test_simple_assignment_is_complete() {
        assert!(is_complete("private.x = 5"));
    }

    #[test]
    fn test_assignment_with_empty_rhs_is_incomplete() {
        assert!(!is_complete("private.x ="));
    }

    #[test]
    fn test_unbalanced_brackets_is_incomplete() {
        assert!(!is_complete("private.x = foo(1, 2"));
    }

    #[test]
    fn test_bracket_in_string_does_not_affect_balance() {
        assert!(is_complete(r#"print("(unbalanced")"#));
    }

    #[test]
    fn test_trailing_colon_alone_is_incomplete() {
        assert!(!is_complete("if private.x:"));
    }

    #[test]
    fn test_double_hash_terminates_block() {
        let text = "if private.x:\n    print(1)\n##";
        assert!(is_complete(text));
    }

    #[test]
    fn test_indented_if_body_without_dedent_is_incomplete() {
        let text = "if private.x:\n    print(1)";
        assert!(!is_complete(text));
    }

    #[test]
    fn test_trailing_blank_line_completes_block() {
        let text = "if private.x:\n    print(1)\n";
        assert!(is_complete(text));
    }

    #[test]
    fn test_dedent_back_to_header_indent_completes_block() {
        let text = "if private.x:\n    print(1)\nprivate.y = 2";
        assert!(is_complete(text));
    }

    #[test]
    fn test_else_at_matching_indent_still_incomplete_without_body() {
        let text = "if private.x:\n    print(1)\nelse:";
        assert!(!is_complete(text));
    }
}
