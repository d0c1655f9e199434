//! Abstract syntax tree
//!
//! Every node carries a [`Location`] so the interpreter and parser can point
//! at the offending source line when reporting errors.

/// A point in source text: 1-based line/column plus the full text of that line.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub source_text: String,
}

impl Location {
    pub fn new(line: usize, column: usize, source_text: impl Into<String>) -> Self {
        Self {
            line,
            column,
            source_text: source_text.into(),
        }
    }
}

impl From<Location> for crate::error::SourceLocation {
    fn from(loc: Location) -> Self {
        crate::error::SourceLocation::new(loc.line, loc.column, loc.source_text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    None,
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal, Location),
    /// A dotted identifier, e.g. `private.x.y` or a bare `x`.
    Identifier(Vec<String>, Location),
    Unary(UnaryOp, Box<Expr>, Location),
    Binary(BinaryOp, Box<Expr>, Box<Expr>, Location),
    /// `name(args)`, `log.level(args)`, or `obj.method(args)`; dispatch is
    /// decided by the interpreter based on the shape of `path`.
    Call {
        path: Vec<String>,
        args: Vec<Expr>,
        location: Location,
    },
    List(Vec<Expr>, Location),
    Map(Vec<(String, Expr)>, Location),
}

impl Expr {
    pub fn location(&self) -> &Location {
        match self {
            Expr::Literal(_, loc)
            | Expr::Identifier(_, loc)
            | Expr::Unary(_, _, loc)
            | Expr::Binary(_, _, _, loc)
            | Expr::Call { location: loc, .. }
            | Expr::List(_, loc)
            | Expr::Map(_, loc) => loc,
        }
    }
}

/// A statement node.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `scope.path = expr`
    Assign {
        path: Vec<String>,
        value: Expr,
        location: Location,
    },
    Expr(Expr),
    If {
        branches: Vec<(Expr, Vec<Stmt>)>,
        else_body: Option<Vec<Stmt>>,
        location: Location,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
        location: Location,
    },
}

impl Stmt {
    pub fn location(&self) -> &Location {
        match self {
            Stmt::Assign { location, .. } => location,
            Stmt::Expr(e) => e.location(),
            Stmt::If { location, .. } => location,
            Stmt::While { location, .. } => location,
        }
    }
}

/// A parsed program: an ordered sequence of top-level statements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}
