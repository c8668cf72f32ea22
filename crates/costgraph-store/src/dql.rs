//! Structured DQL requests.
//!
//! Requests are assembled as plain data (blocks, root functions, filter trees,
//! selections and `math` expressions) and turned into DQL text only when they
//! are rendered. String literals are escaped at render time, so names coming
//! from callers can never break out of an `eq(..)` argument.

use std::fmt;
use std::ops::{Div, Mul, Sub};

const INDENT: &str = "  ";

pub const VAR_BLOCK: &str = "var";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    blocks: Vec<Block>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "query {{")?;
        for block in &self.blocks {
            block.fmt_at(f, 1)?;
        }
        write!(f, "}}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub root: RootFunc,
    pub filter: Option<Filter>,
    pub selections: Vec<Selection>,
}

impl Block {
    pub fn new(name: impl Into<String>, root: RootFunc) -> Self {
        Self {
            name: name.into(),
            root,
            filter: None,
            selections: Vec::new(),
        }
    }

    pub fn var(root: RootFunc) -> Self {
        Self::new(VAR_BLOCK, root)
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn select(mut self, selection: impl Into<Selection>) -> Self {
        self.selections.push(selection.into());
        self
    }

    pub fn select_all(mut self, selections: impl IntoIterator<Item = Selection>) -> Self {
        self.selections.extend(selections);
        self
    }

    pub fn is_var(&self) -> bool {
        self.name == VAR_BLOCK
    }

    fn fmt_at(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        indent(f, depth)?;
        write!(f, "{}(func: {})", self.name, self.root)?;
        if let Some(filter) = &self.filter {
            write!(f, " @filter({filter})")?;
        }
        writeln!(f, " {{")?;
        for selection in &self.selections {
            selection.fmt_at(f, depth + 1)?;
        }
        indent(f, depth)?;
        writeln!(f, "}}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootFunc {
    Has(String),
    Uid(String),
}

impl RootFunc {
    pub fn has(predicate: impl Into<String>) -> Self {
        Self::Has(predicate.into())
    }

    pub fn uid(var: impl Into<String>) -> Self {
        Self::Uid(var.into())
    }
}

impl fmt::Display for RootFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Has(predicate) => write!(f, "has({predicate})"),
            Self::Uid(var) => write!(f, "uid({var})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Has(String),
    Eq { predicate: String, value: String },
    Not(Box<Filter>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn has(predicate: impl Into<String>) -> Self {
        Self::Has(predicate.into())
    }

    pub fn eq(predicate: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Eq {
            predicate: predicate.into(),
            value: value.into(),
        }
    }

    pub fn not(filter: Filter) -> Self {
        Self::Not(Box::new(filter))
    }

    pub fn all(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::And(filters.into_iter().collect())
    }

    pub fn any(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::Or(filters.into_iter().collect())
    }

    fn is_compound(&self) -> bool {
        match self {
            Self::And(filters) | Self::Or(filters) => filters.len() > 1,
            Self::Not(_) => true,
            Self::Has(_) | Self::Eq { .. } => false,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_compound() {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }

    fn fmt_joined(f: &mut fmt::Formatter<'_>, filters: &[Filter], keyword: &str) -> fmt::Result {
        for (index, filter) in filters.iter().enumerate() {
            if index > 0 {
                write!(f, " {keyword} ")?;
            }
            filter.fmt_operand(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Has(predicate) => write!(f, "has({predicate})"),
            Self::Eq { predicate, value } => {
                let quoted = serde_json::to_string(value).map_err(|_| fmt::Error)?;
                write!(f, "eq({predicate}, {quoted})")
            }
            Self::Not(inner) => {
                write!(f, "NOT ")?;
                inner.fmt_operand(f)
            }
            Self::And(filters) => Self::fmt_joined(f, filters, "AND"),
            Self::Or(filters) => Self::fmt_joined(f, filters, "OR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub alias: Option<String>,
    pub var: Option<String>,
    pub kind: SelectionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionKind {
    Uid,
    Predicate(String),
    Count(String),
    Math(Expr),
    Edge(Edge),
}

impl Selection {
    fn of(kind: SelectionKind) -> Self {
        Self {
            alias: None,
            var: None,
            kind,
        }
    }

    pub fn uid() -> Self {
        Self::of(SelectionKind::Uid)
    }

    pub fn predicate(name: impl Into<String>) -> Self {
        Self::of(SelectionKind::Predicate(name.into()))
    }

    pub fn count(predicate: impl Into<String>) -> Self {
        Self::of(SelectionKind::Count(predicate.into()))
    }

    pub fn math(expr: Expr) -> Self {
        Self::of(SelectionKind::Math(expr))
    }

    pub fn edge(edge: Edge) -> Self {
        Self::of(SelectionKind::Edge(edge))
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn bind(mut self, var: impl Into<String>) -> Self {
        self.var = Some(var.into());
        self
    }

    /// Key the selection appears under in a response, if it is emitted at all.
    /// Unaliased `math` only feeds variables.
    pub fn output_key(&self) -> Option<String> {
        if let Some(alias) = &self.alias {
            return Some(alias.clone());
        }
        match &self.kind {
            SelectionKind::Uid => Some("uid".to_owned()),
            SelectionKind::Predicate(name) => Some(name.clone()),
            SelectionKind::Count(predicate) => Some(format!("count({predicate})")),
            SelectionKind::Math(_) => None,
            SelectionKind::Edge(edge) => Some(edge.path()),
        }
    }

    fn fmt_at(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        indent(f, depth)?;
        if let Some(alias) = &self.alias {
            write!(f, "{alias}: ")?;
        }
        if let Some(var) = &self.var {
            write!(f, "{var} as ")?;
        }
        match &self.kind {
            SelectionKind::Uid => writeln!(f, "uid"),
            SelectionKind::Predicate(name) => writeln!(f, "{name}"),
            SelectionKind::Count(predicate) => writeln!(f, "count({predicate})"),
            SelectionKind::Math(expr) => writeln!(f, "math({expr})"),
            SelectionKind::Edge(edge) => {
                write!(f, "{}", edge.path())?;
                if let Some(filter) = &edge.filter {
                    write!(f, " @filter({filter})")?;
                }
                writeln!(f, " {{")?;
                for selection in &edge.selections {
                    selection.fmt_at(f, depth + 1)?;
                }
                indent(f, depth)?;
                writeln!(f, "}}")
            }
        }
    }
}

impl From<Edge> for Selection {
    fn from(edge: Edge) -> Self {
        Self::edge(edge)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub predicate: String,
    pub reverse: bool,
    pub filter: Option<Filter>,
    pub selections: Vec<Selection>,
}

impl Edge {
    pub fn forward(predicate: impl Into<String>) -> Self {
        Self {
            predicate: predicate.into(),
            reverse: false,
            filter: None,
            selections: Vec::new(),
        }
    }

    pub fn reverse(predicate: impl Into<String>) -> Self {
        Self {
            reverse: true,
            ..Self::forward(predicate)
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn select(mut self, selection: impl Into<Selection>) -> Self {
        self.selections.push(selection.into());
        self
    }

    pub fn select_all(mut self, selections: impl IntoIterator<Item = Selection>) -> Self {
        self.selections.extend(selections);
        self
    }

    pub fn path(&self) -> String {
        if self.reverse {
            format!("~{}", self.predicate)
        } else {
            self.predicate.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }

    fn precedence(self) -> u8 {
        match self {
            Self::Sub => 1,
            Self::Mul | Self::Div => 2,
        }
    }

    fn is_associative(self) -> bool {
        matches!(self, Self::Mul)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub lhs: Expr,
    pub rhs: Expr,
}

impl Condition {
    pub fn eq(lhs: Expr, rhs: Expr) -> Self {
        Self { lhs, rhs }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} == {}", self.lhs, self.rhs)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(f64),
    Var(String),
    /// Seconds elapsed since the datetime bound to the named variable.
    Since(String),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Min(Box<Expr>, Box<Expr>),
    Max(Box<Expr>, Box<Expr>),
    Cond {
        condition: Box<Condition>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

impl Expr {
    pub fn lit(value: f64) -> Self {
        Self::Literal(value)
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    pub fn since(var: impl Into<String>) -> Self {
        Self::Since(var.into())
    }

    pub fn min(lhs: Expr, rhs: Expr) -> Self {
        Self::Min(Box::new(lhs), Box::new(rhs))
    }

    pub fn max(lhs: Expr, rhs: Expr) -> Self {
        Self::Max(Box::new(lhs), Box::new(rhs))
    }

    pub fn cond(condition: Condition, then: Expr, otherwise: Expr) -> Self {
        Self::Cond {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    fn fmt_operand(
        &self,
        f: &mut fmt::Formatter<'_>,
        parent: BinaryOp,
        is_rhs: bool,
    ) -> fmt::Result {
        let grouped = match self {
            Self::Binary { op, .. } => {
                op.precedence() < parent.precedence()
                    || (is_rhs
                        && op.precedence() == parent.precedence()
                        && !parent.is_associative())
            }
            _ => false,
        };
        if grouped {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "{}", format_number(*value)),
            Self::Var(name) => write!(f, "{name}"),
            Self::Since(var) => write!(f, "since({var})"),
            Self::Binary { op, lhs, rhs } => {
                lhs.fmt_operand(f, *op, false)?;
                write!(f, " {} ", op.symbol())?;
                rhs.fmt_operand(f, *op, true)
            }
            Self::Min(lhs, rhs) => write!(f, "min({lhs}, {rhs})"),
            Self::Max(lhs, rhs) => write!(f, "max({lhs}, {rhs})"),
            Self::Cond {
                condition,
                then,
                otherwise,
            } => write!(f, "cond({condition}, {then}, {otherwise})"),
        }
    }
}

impl Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Sub, self, rhs)
    }
}

impl Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Mul, self, rhs)
    }
}

impl Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Div, self, rhs)
    }
}

/// Whole numbers keep one decimal so DQL treats them as floats; anything else
/// keeps enough digits for per-hour prices.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value:.11}")
    }
}

fn indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }
    Ok(())
}
