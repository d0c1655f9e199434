//! Parser
//!
//! Turns tokenized [`LogicalLine`]s into a [`Program`] tree. Blocks are
//! delimited by indentation: a header line ending in `:` opens a block whose
//! body is every following line indented strictly more than the header,
//! until a line at or below the header's indent returns control to the
//! enclosing block. The parser never panics; malformed input is reported as
//! a [`ParseResult`] with `is_valid = false` and a populated `errors` list.

use crate::ast::{BinaryOp, Expr, Literal, Location, Program, Stmt, UnaryOp};
use crate::error::DanaError;
use crate::lexer::{self, LogicalLine, PositionedToken, Token};

/// Outcome of parsing a complete submission.
#[derive(Debug)]
pub struct ParseResult {
    pub is_valid: bool,
    pub program: Program,
    pub errors: Vec<DanaError>,
}

/// Parse Dana source text into a [`ParseResult`].
pub fn parse(source: &str) -> ParseResult {
    let lines = match lexer::tokenize(source) {
        Ok(lines) => lines,
        Err(e) => {
            return ParseResult {
                is_valid: false,
                program: Program::default(),
                errors: vec![e],
            };
        }
    };

    let mut parser = Parser { lines: &lines, pos: 0 };
    match parser.parse_block(0) {
        Ok(statements) if parser.pos >= lines.len() => ParseResult {
            is_valid: true,
            program: Program { statements },
            errors: Vec::new(),
        },
        Ok(statements) => {
            // Leftover input at an unexpected (lower) indent: dangling dedent.
            let loc = line_location(&lines[parser.pos]);
            ParseResult {
                is_valid: false,
                program: Program { statements },
                errors: vec![DanaError::parse_at(
                    "expected: statement at matching indentation",
                    loc.into(),
                )],
            }
        }
        Err(e) => ParseResult {
            is_valid: false,
            program: Program::default(),
            errors: vec![e],
        },
    }
}

fn line_location(line: &LogicalLine) -> Location {
    Location::new(line.line, line.indent + 1, line.source_text.clone())
}

struct Parser<'a> {
    lines: &'a [LogicalLine],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek_line(&self) -> Option<&'a LogicalLine> {
        self.lines.get(self.pos)
    }

    /// Parse every statement at exactly `indent`, stopping at the first line
    /// indented less than `indent` (end of this block) or consuming nested
    /// deeper blocks as part of `if`/`while` statements.
    fn parse_block(&mut self, indent: usize) -> crate::error::Result<Vec<Stmt>> {
        let mut statements = Vec::new();
        loop {
            let Some(line) = self.peek_line() else {
                break;
            };
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(DanaError::parse_at(
                    "expected: statement at matching indentation",
                    line_location(line).into(),
                ));
            }
            statements.push(self.parse_statement(indent)?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self, indent: usize) -> crate::error::Result<Stmt> {
        let line = self.peek_line().expect("checked by caller");
        match line.tokens.first().map(|t| &t.token) {
            Some(Token::If) => self.parse_if(indent),
            Some(Token::While) => self.parse_while(indent),
            _ => self.parse_simple_statement(),
        }
    }

    fn parse_if(&mut self, indent: usize) -> crate::error::Result<Stmt> {
        let header_line = self.peek_line().expect("checked by caller");
        let location = line_location(header_line);
        let mut branches = Vec::new();
        let mut else_body = None;

        // First branch: `if <cond>:`
        let cond = self.parse_header_condition(Token::If)?;
        let body = self.parse_indented_body(indent)?;
        branches.push((cond, body));

        loop {
            let Some(line) = self.peek_line() else { break };
            if line.indent != indent {
                break;
            }
            match line.tokens.first().map(|t| &t.token) {
                Some(Token::Elif) => {
                    let cond = self.parse_header_condition(Token::Elif)?;
                    let body = self.parse_indented_body(indent)?;
                    branches.push((cond, body));
                }
                Some(Token::Else) => {
                    self.expect_else_header()?;
                    else_body = Some(self.parse_indented_body(indent)?);
                    break;
                }
                _ => break,
            }
        }

        Ok(Stmt::If {
            branches,
            else_body,
            location,
        })
    }

    fn parse_while(&mut self, indent: usize) -> crate::error::Result<Stmt> {
        let header_line = self.peek_line().expect("checked by caller");
        let location = line_location(header_line);
        let condition = self.parse_header_condition(Token::While)?;
        let body = self.parse_indented_body(indent)?;
        Ok(Stmt::While {
            condition,
            body,
            location,
        })
    }

    /// Parse a `<keyword> <expr> :` header line and advance past it.
    fn parse_header_condition(&mut self, keyword: Token) -> crate::error::Result<Expr> {
        let line = self.peek_line().expect("checked by caller");
        let loc = line_location(line);
        if line.tokens.first().map(|t| &t.token) != Some(&keyword) {
            return Err(DanaError::parse_at("expected: if/elif/while", loc.into()));
        }
        let Some(Token::Colon) = line.tokens.last().map(|t| &t.token) else {
            return Err(DanaError::parse_at("expected: ':'", loc.into()));
        };
        let body_tokens = &line.tokens[1..line.tokens.len() - 1];
        let mut cursor = Cursor {
            tokens: body_tokens,
            pos: 0,
            line: line.line,
            source_text: &line.source_text,
        };
        let cond = cursor.parse_expr()?;
        cursor.expect_end()?;
        self.pos += 1;
        Ok(cond)
    }

    fn expect_else_header(&mut self) -> crate::error::Result<()> {
        let line = self.peek_line().expect("checked by caller");
        let loc = line_location(line);
        if line.tokens.len() != 2
            || line.tokens[0].token != Token::Else
            || line.tokens[1].token != Token::Colon
        {
            return Err(DanaError::parse_at("expected: 'else:'", loc.into()));
        }
        self.pos += 1;
        Ok(())
    }

    /// Parse the indented block following a header line already consumed.
    fn parse_indented_body(&mut self, header_indent: usize) -> crate::error::Result<Vec<Stmt>> {
        let Some(line) = self.peek_line() else {
            return Err(DanaError::parse(
                "expected: an indented block after ':'",
            ));
        };
        if line.indent <= header_indent {
            return Err(DanaError::parse_at(
                "expected: an indented block after ':'",
                line_location(line).into(),
            ));
        }
        self.parse_block(line.indent)
    }

    fn parse_simple_statement(&mut self) -> crate::error::Result<Stmt> {
        let line = self.peek_line().expect("checked by caller");
        let loc = line_location(line);

        // Assignment: dotted-path '=' expr, where '=' is not part of '=='.
        if let Some(eq_pos) = find_top_level_assign(&line.tokens) {
            let path = parse_dotted_path_tokens(&line.tokens[..eq_pos], line)?;
            let rhs_tokens = &line.tokens[eq_pos + 1..];
            if rhs_tokens.is_empty() {
                return Err(DanaError::parse_at(
                    "expected: an expression after '='",
                    loc.clone().into(),
                ));
            }
            let mut cursor = Cursor {
                tokens: rhs_tokens,
                pos: 0,
                line: line.line,
                source_text: &line.source_text,
            };
            let value = cursor.parse_expr()?;
            cursor.expect_end()?;
            self.pos += 1;
            return Ok(Stmt::Assign {
                path,
                value,
                location: loc,
            });
        }

        let mut cursor = Cursor {
            tokens: &line.tokens,
            pos: 0,
            line: line.line,
            source_text: &line.source_text,
        };
        let expr = cursor.parse_expr()?;
        cursor.expect_end()?;
        self.pos += 1;
        Ok(Stmt::Expr(expr))
    }
}

/// Find the position of a top-level `=` (assignment, not `==`) that is not
/// nested inside brackets — used to split `path = expr` statements.
fn find_top_level_assign(tokens: &[PositionedToken]) -> Option<usize> {
    let mut depth = 0i32;
    for (i, t) in tokens.iter().enumerate() {
        match &t.token {
            Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
            Token::RParen | Token::RBracket | Token::RBrace => depth -= 1,
            Token::Assign if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_dotted_path_tokens(
    tokens: &[PositionedToken],
    line: &LogicalLine,
) -> crate::error::Result<Vec<String>> {
    let loc = line_location(line);
    let mut parts = Vec::new();
    let mut expect_ident = true;
    for t in tokens {
        match (&t.token, expect_ident) {
            (Token::Ident(name), true) => {
                parts.push(name.clone());
                expect_ident = false;
            }
            (Token::Dot, false) => expect_ident = true,
            _ => {
                return Err(DanaError::parse_at(
                    "expected: a dotted assignment target (scope.name)",
                    loc.into(),
                ));
            }
        }
    }
    if parts.is_empty() || expect_ident {
        return Err(DanaError::parse_at(
            "expected: a dotted assignment target (scope.name)",
            loc.into(),
        ));
    }
    if parts.len() < 2 {
        return Err(DanaError::validation_with_loc(
            "a scope name alone is not a valid assignment target",
            loc.into(),
        ));
    }
    Ok(parts)
}

/// A cursor over the tokens of a single expression (already stripped of any
/// leading keyword/trailing colon from the caller).
struct Cursor<'a> {
    tokens: &'a [PositionedToken],
    pos: usize,
    line: usize,
    source_text: &'a str,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn column(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|t| t.column)
            .unwrap_or(self.source_text.len() + 1)
    }

    fn loc(&self) -> Location {
        Location::new(self.line, self.column(), self.source_text.to_string())
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).map(|t| t.token.clone());
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect_end(&self) -> crate::error::Result<()> {
        if self.pos != self.tokens.len() {
            return Err(DanaError::parse_at("expected: end of statement", self.loc().into()));
        }
        Ok(())
    }

    fn expect(&mut self, token: &Token, what: &str) -> crate::error::Result<()> {
        if self.peek() == Some(token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(DanaError::parse_at(format!("expected: {what}"), self.loc().into()))
        }
    }

    fn parse_expr(&mut self) -> crate::error::Result<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> crate::error::Result<Expr> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            let loc = self.loc();
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right), loc);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> crate::error::Result<Expr> {
        let mut left = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            let loc = self.loc();
            self.advance();
            let right = self.parse_not()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right), loc);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> crate::error::Result<Expr> {
        if self.peek() == Some(&Token::Not) {
            let loc = self.loc();
            self.advance();
            let operand = self.parse_not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand), loc));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> crate::error::Result<Expr> {
        let left = self.parse_additive()?;
        let op = match self.peek() {
            Some(Token::Eq) => Some(BinaryOp::Eq),
            Some(Token::NotEq) => Some(BinaryOp::NotEq),
            Some(Token::Lt) => Some(BinaryOp::Lt),
            Some(Token::LtEq) => Some(BinaryOp::LtEq),
            Some(Token::Gt) => Some(BinaryOp::Gt),
            Some(Token::GtEq) => Some(BinaryOp::GtEq),
            _ => None,
        };
        if let Some(op) = op {
            let loc = self.loc();
            self.advance();
            let right = self.parse_additive()?;
            return Ok(Expr::Binary(op, Box::new(left), Box::new(right), loc));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> crate::error::Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right), loc);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> crate::error::Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => break,
            };
            let loc = self.loc();
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right), loc);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> crate::error::Result<Expr> {
        if self.peek() == Some(&Token::Minus) {
            let loc = self.loc();
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(operand), loc));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> crate::error::Result<Expr> {
        let loc = self.loc();
        match self.advance() {
            Some(Token::Int(n)) => Ok(Expr::Literal(Literal::Int(n), loc)),
            Some(Token::Float(n)) => Ok(Expr::Literal(Literal::Float(n), loc)),
            Some(Token::Bool(b)) => Ok(Expr::Literal(Literal::Bool(b), loc)),
            Some(Token::Str(s)) => Ok(Expr::Literal(Literal::Str(s), loc)),
            Some(Token::None) => Ok(Expr::Literal(Literal::None, loc)),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::LBracket) => self.parse_list(loc),
            Some(Token::LBrace) => self.parse_map(loc),
            Some(Token::Ident(name)) => self.parse_ident_chain(name, loc),
            _ => Err(DanaError::parse_at("expected: an expression", loc.into())),
        }
    }

    fn parse_list(&mut self, loc: Location) -> crate::error::Result<Expr> {
        let mut items = Vec::new();
        if self.peek() != Some(&Token::RBracket) {
            loop {
                items.push(self.parse_expr()?);
                if self.peek() == Some(&Token::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&Token::RBracket, "']'")?;
        Ok(Expr::List(items, loc))
    }

    fn parse_map(&mut self, loc: Location) -> crate::error::Result<Expr> {
        let mut entries = Vec::new();
        if self.peek() != Some(&Token::RBrace) {
            loop {
                let key_loc = self.loc();
                let key = match self.advance() {
                    Some(Token::Str(s)) => s,
                    _ => {
                        return Err(DanaError::parse_at(
                            "expected: a string key in map literal",
                            key_loc.into(),
                        ));
                    }
                };
                self.expect(&Token::Colon, "':'")?;
                let value = self.parse_expr()?;
                entries.push((key, value));
                if self.peek() == Some(&Token::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&Token::RBrace, "'}'")?;
        Ok(Expr::Map(entries, loc))
    }

    fn parse_ident_chain(
        &mut self,
        first: String,
        loc: Location,
    ) -> crate::error::Result<Expr> {
        let mut path = vec![first];
        while self.peek() == Some(&Token::Dot) {
            self.advance();
            match self.advance() {
                Some(Token::Ident(name)) => path.push(name),
                _ => return Err(DanaError::parse_at("expected: an identifier after '.'", self.loc().into())),
            }
        }

        if self.peek() == Some(&Token::LParen) {
            self.advance();
            let mut args = Vec::new();
            if self.peek() != Some(&Token::RParen) {
                loop {
                    args.push(self.parse_expr()?);
                    if self.peek() == Some(&Token::Comma) {
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
            self.expect(&Token::RParen, "')'")?;
            return Ok(Expr::Call {
                path,
                args,
                location: loc,
            });
        }

        Ok(Expr::Identifier(path, loc))
    }
}

impl DanaError {
    /// Small helper only used by the parser: a validation error carrying a location.
    fn validation_with_loc(message: impl Into<String>, loc: crate::error::SourceLocation) -> Self {
        match DanaError::validation(message) {
            DanaError::Validation { message, .. } => DanaError::Validation {
                message,
                location: Some(loc),
            },
            other => other,
        }
    }
}
