//! Lexer
//!
//! Tokenizes Dana source text into logical lines. Blank/comment lines are
//! dropped. Lines are joined across a trailing continuation whenever bracket
//! depth (`() [] {}`) is greater than zero at end-of-line, mirroring the
//! bracket-balance rule the REPL's completion checker also applies — a
//! `Newline` is never emitted while brackets are still open.

use crate::ast::Location;
use crate::error::{DanaError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
    Ident(String),
    Dot,
    Comma,
    Colon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Plus,
    Minus,
    Star,
    Slash,
    Assign,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Not,
    If,
    Elif,
    Else,
    While,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionedToken {
    pub token: Token,
    pub column: usize,
}

/// One indented, bracket-balanced logical line of tokens.
#[derive(Debug, Clone)]
pub struct LogicalLine {
    pub indent: usize,
    pub tokens: Vec<PositionedToken>,
    pub line: usize,
    pub source_text: String,
}

/// Tokenize a full program into logical lines, merging continuation lines
/// while bracket depth is nonzero.
pub fn tokenize(source: &str) -> Result<Vec<LogicalLine>> {
    let mut lines = Vec::new();
    let mut depth: i32 = 0;
    let mut pending: Option<LogicalLine> = None;

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed_leading = raw_line.trim_start_matches(' ');
        let indent = raw_line.len() - trimmed_leading.len();

        if pending.is_none() {
            if trimmed_leading.trim().is_empty() || trimmed_leading.trim_start().starts_with('#')
            {
                continue;
            }
            pending = Some(LogicalLine {
                indent,
                tokens: Vec::new(),
                line: line_no,
                source_text: raw_line.to_string(),
            });
        }

        let tokens = tokenize_line(trimmed_leading, line_no, indent)?;
        let current = pending.as_mut().expect("set above");
        for t in tokens {
            match &t.token {
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace => depth -= 1,
                _ => {}
            }
            current.tokens.push(t);
        }

        if depth <= 0 {
            lines.push(pending.take().expect("set above"));
            depth = 0;
        }
    }

    if let Some(unterminated) = pending {
        return Err(DanaError::parse_at(
            "unexpected end of input: unbalanced brackets",
            Location::new(unterminated.line, 1, unterminated.source_text).into(),
        ));
    }

    Ok(lines)
}

fn tokenize_line(text: &str, line: usize, base_indent: usize) -> Result<Vec<PositionedToken>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let column = base_indent + i + 1;

        if c == ' ' || c == '\t' {
            i += 1;
            continue;
        }
        if c == '#' {
            break; // rest of line is a comment
        }

        match c {
            '.' => {
                tokens.push(PositionedToken {
                    token: Token::Dot,
                    column,
                });
                i += 1;
            }
            ',' => {
                tokens.push(PositionedToken {
                    token: Token::Comma,
                    column,
                });
                i += 1;
            }
            ':' => {
                tokens.push(PositionedToken {
                    token: Token::Colon,
                    column,
                });
                i += 1;
            }
            '(' => {
                tokens.push(PositionedToken {
                    token: Token::LParen,
                    column,
                });
                i += 1;
            }
            ')' => {
                tokens.push(PositionedToken {
                    token: Token::RParen,
                    column,
                });
                i += 1;
            }
            '[' => {
                tokens.push(PositionedToken {
                    token: Token::LBracket,
                    column,
                });
                i += 1;
            }
            ']' => {
                tokens.push(PositionedToken {
                    token: Token::RBracket,
                    column,
                });
                i += 1;
            }
            '{' => {
                tokens.push(PositionedToken {
                    token: Token::LBrace,
                    column,
                });
                i += 1;
            }
            '}' => {
                tokens.push(PositionedToken {
                    token: Token::RBrace,
                    column,
                });
                i += 1;
            }
            '+' => {
                tokens.push(PositionedToken {
                    token: Token::Plus,
                    column,
                });
                i += 1;
            }
            '-' => {
                tokens.push(PositionedToken {
                    token: Token::Minus,
                    column,
                });
                i += 1;
            }
            '*' => {
                tokens.push(PositionedToken {
                    token: Token::Star,
                    column,
                });
                i += 1;
            }
            '/' => {
                tokens.push(PositionedToken {
                    token: Token::Slash,
                    column,
                });
                i += 1;
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(PositionedToken {
                        token: Token::Eq,
                        column,
                    });
                    i += 2;
                } else {
                    tokens.push(PositionedToken {
                        token: Token::Assign,
                        column,
                    });
                    i += 1;
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(PositionedToken {
                        token: Token::NotEq,
                        column,
                    });
                    i += 2;
                } else {
                    return Err(DanaError::parse_at(
                        "unexpected character '!'",
                        Location::new(line, column, text).into(),
                    ));
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(PositionedToken {
                        token: Token::LtEq,
                        column,
                    });
                    i += 2;
                } else {
                    tokens.push(PositionedToken {
                        token: Token::Lt,
                        column,
                    });
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(PositionedToken {
                        token: Token::GtEq,
                        column,
                    });
                    i += 2;
                } else {
                    tokens.push(PositionedToken {
                        token: Token::Gt,
                        column,
                    });
                    i += 1;
                }
            }
            '"' | '\'' => {
                let (s, consumed) = read_string(&chars[i..], c, line, column, text)?;
                tokens.push(PositionedToken {
                    token: Token::Str(s),
                    column,
                });
                i += consumed;
            }
            c if c.is_ascii_digit() => {
                let (tok, consumed) = read_number(&chars[i..]);
                tokens.push(PositionedToken { token: tok, column });
                i += consumed;
            }
            c if c.is_alphabetic() || c == '_' => {
                let (word, consumed) = read_word(&chars[i..]);
                let token = keyword_or_ident(&word);
                tokens.push(PositionedToken { token, column });
                i += consumed;
            }
            other => {
                return Err(DanaError::parse_at(
                    format!("unexpected character {other:?}"),
                    Location::new(line, column, text).into(),
                ));
            }
        }
    }

    Ok(tokens)
}

fn keyword_or_ident(word: &str) -> Token {
    match word {
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "if" => Token::If,
        "elif" => Token::Elif,
        "else" => Token::Else,
        "while" => Token::While,
        "True" | "true" => Token::Bool(true),
        "False" | "false" => Token::Bool(false),
        "None" | "none" => Token::None,
        _ => Token::Ident(word.to_string()),
    }
}

fn read_word(chars: &[char]) -> (String, usize) {
    let mut end = 0;
    while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
        end += 1;
    }
    (chars[..end].iter().collect(), end)
}

fn read_number(chars: &[char]) -> (Token, usize) {
    let mut end = 0;
    let mut is_float = false;
    while end < chars.len() && chars[end].is_ascii_digit() {
        end += 1;
    }
    if chars.get(end) == Some(&'.') && chars.get(end + 1).map(|c| c.is_ascii_digit()) == Some(true)
    {
        is_float = true;
        end += 1;
        while end < chars.len() && chars[end].is_ascii_digit() {
            end += 1;
        }
    }
    let text: String = chars[..end].iter().collect();
    if is_float {
        (Token::Float(text.parse().unwrap_or(0.0)), end)
    } else {
        (Token::Int(text.parse().unwrap_or(0)), end)
    }
}

fn read_string(
    chars: &[char],
    quote: char,
    line: usize,
    column: usize,
    source_text: &str,
) -> Result<(String, usize)> {
    let mut out = String::new();
    let mut i = 1; // skip opening quote
    loop {
        match chars.get(i) {
            None => {
                return Err(DanaError::parse_at(
                    "unterminated string literal",
                    Location::new(line, column, source_text).into(),
                ));
            }
            Some(c) if *c == quote => {
                i += 1;
                break;
            }
            Some('\\') => {
                let escaped = chars.get(i + 1).copied().unwrap_or('\\');
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '\\' => '\\',
                    '"' => '"',
                    '\'' => '\'',
                    other => other,
                });
                i += 2;
            }
            Some(c) => {
                out.push(*c);
                i += 1;
            }
        }
    }
    Ok((out, i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_simple_assignment() {
        let lines = tokenize("private.x = 5").unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].tokens.len(), 5);
    }

    #[test]
    fn test_tokenize_skips_blank_and_comment_lines() {
        let lines = tokenize("\n# comment\nprivate.x = 1\n").unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_tokenize_merges_continuation_across_open_bracket() {
        let src = "private.x = foo(1,\n    2)";
        let lines = tokenize(src).unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_tokenize_string_with_escape() {
        let lines = tokenize(r#"private.x = "a\nb""#).unwrap();
        let Token::Str(s) = &lines[0].tokens.last().unwrap().token else {
            panic!("expected string token");
        };
        assert_eq!(s, "a\nb");
    }

    #[test]
    fn test_tokenize_unterminated_bracket_is_error() {
        assert!(tokenize("private.x = foo(1,").is_err());
    }

    #[test]
    fn test_indent_is_captured() {
        let lines = tokenize("if private.x:\n    private.y = 1\n").unwrap();
        assert_eq!(lines[0].indent, 0);
        assert_eq!(lines[1].indent, 4);
    }
}
