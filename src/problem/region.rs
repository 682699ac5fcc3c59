//! Region definitions and the selector mini-language.
//!
//! A selector describes a subset of the mesh without reference to any concrete
//! mesh, e.g. `vertices in (x < 0.00001)` or `r.Omega -v r.Gamma`. Evaluating it
//! against a mesh happens in [`crate::discretization::regions`].

use std::fmt;
use std::str::FromStr;

use glam::DVec3;

use super::expression::{Cursor, ExpressionError};

/// Topological kind a region is used as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RegionKind {
    #[default]
    Cell,
    Facet,
    Edge,
    Vertex,
}

impl FromStr for RegionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cell" => Ok(Self::Cell),
            "facet" => Ok(Self::Facet),
            "edge" => Ok(Self::Edge),
            "vertex" => Ok(Self::Vertex),
            other => Err(format!("unknown region kind '{other}'")),
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Cell => "cell",
            Self::Facet => "facet",
            Self::Edge => "edge",
            Self::Vertex => "vertex",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Arithmetic over vertex coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum Arith {
    Coord(Axis),
    Number(f64),
    Neg(Box<Arith>),
    Binary {
        op: ArithOp,
        lhs: Box<Arith>,
        rhs: Box<Arith>,
    },
}

impl Arith {
    pub fn eval(&self, p: DVec3) -> f64 {
        match self {
            Arith::Coord(Axis::X) => p.x,
            Arith::Coord(Axis::Y) => p.y,
            Arith::Coord(Axis::Z) => p.z,
            Arith::Number(v) => *v,
            Arith::Neg(inner) => -inner.eval(p),
            Arith::Binary { op, lhs, rhs } => {
                let (a, b) = (lhs.eval(p), rhs.eval(p));
                match op {
                    ArithOp::Add => a + b,
                    ArithOp::Sub => a - b,
                    ArithOp::Mul => a * b,
                    ArithOp::Div => a / b,
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

/// Boolean vertex predicate, e.g. `(x < 0.1) & (y > 0)`.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Compare { lhs: Arith, op: CmpOp, rhs: Arith },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn eval(&self, p: DVec3) -> bool {
        match self {
            Predicate::Compare { lhs, op, rhs } => {
                let (a, b) = (lhs.eval(p), rhs.eval(p));
                match op {
                    CmpOp::Lt => a < b,
                    CmpOp::Le => a <= b,
                    CmpOp::Gt => a > b,
                    CmpOp::Ge => a >= b,
                    CmpOp::Eq => a == b,
                }
            }
            Predicate::And(a, b) => a.eval(p) && b.eval(p),
            Predicate::Or(a, b) => a.eval(p) || b.eval(p),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetOp {
    VertexUnion,
    VertexDifference,
    VertexIntersection,
    CellUnion,
    CellDifference,
    CellIntersection,
}

impl SetOp {
    const TOKENS: [(&'static str, SetOp); 6] = [
        ("+v", SetOp::VertexUnion),
        ("-v", SetOp::VertexDifference),
        ("*v", SetOp::VertexIntersection),
        ("+c", SetOp::CellUnion),
        ("-c", SetOp::CellDifference),
        ("*c", SetOp::CellIntersection),
    ];
}

#[derive(Clone, Debug, PartialEq)]
pub enum Selector {
    All,
    VerticesIn(Predicate),
    VerticesOfSurface,
    Vertices(Vec<usize>),
    Cells(Vec<usize>),
    CellsOfGroup(i32),
    Reference(String),
    Combine {
        op: SetOp,
        lhs: Box<Selector>,
        rhs: Box<Selector>,
    },
}

impl Selector {
    pub fn parse(src: &str) -> Result<Self, ExpressionError> {
        let mut cursor = Cursor::new(src);
        let selector = parse_selector(&mut cursor)?;
        if !cursor.is_at_end() {
            return Err(cursor.error("unexpected trailing input"));
        }
        Ok(selector)
    }

    /// Names of other regions this selector refers to via `r.Name`.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Selector::Reference(name) => out.push(name),
            Selector::Combine { lhs, rhs, .. } => {
                lhs.collect_references(out);
                rhs.collect_references(out);
            }
            _ => {}
        }
    }
}

/// A named region: selector plus the topological kind it is used as.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionDef {
    source: String,
    selector: Selector,
    kind: RegionKind,
}

impl RegionDef {
    pub fn parse(source: &str, kind: RegionKind) -> Result<Self, ExpressionError> {
        Ok(Self {
            source: source.to_string(),
            selector: Selector::parse(source)?,
            kind,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn kind(&self) -> RegionKind {
        self.kind
    }
}

fn parse_selector(c: &mut Cursor) -> Result<Selector, ExpressionError> {
    let mut lhs = parse_operand(c)?;
    'outer: loop {
        for (token, op) in SetOp::TOKENS {
            if c.eat_keyword(token) {
                let rhs = parse_operand(c)?;
                lhs = Selector::Combine {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                };
                continue 'outer;
            }
        }
        return Ok(lhs);
    }
}

fn parse_operand(c: &mut Cursor) -> Result<Selector, ExpressionError> {
    if c.eat_keyword("all") {
        return Ok(Selector::All);
    }
    if c.eat_keyword("vertices") {
        if c.eat_keyword("in") {
            return Ok(Selector::VerticesIn(parse_predicate(c)?));
        }
        if c.eat_keyword("of") {
            if c.eat_keyword("surface") {
                return Ok(Selector::VerticesOfSurface);
            }
            return Err(c.error("expected 'surface'"));
        }
        return Err(c.error("expected 'in' or 'of'"));
    }
    if c.eat_keyword("vertex") {
        return Ok(Selector::Vertices(parse_index_list(c)?));
    }
    if c.eat_keyword("cells") {
        if c.eat_keyword("of") && c.eat_keyword("group") {
            let negative = c.eat("-");
            let magnitude = i64::try_from(c.unsigned()?).ok();
            let group = magnitude
                .map(|m| if negative { -m } else { m })
                .and_then(|g| i32::try_from(g).ok())
                .ok_or_else(|| c.error("group id out of range"))?;
            return Ok(Selector::CellsOfGroup(group));
        }
        return Err(c.error("expected 'of group'"));
    }
    if c.eat_keyword("cell") {
        return Ok(Selector::Cells(parse_index_list(c)?));
    }
    if c.eat("r.") {
        return Ok(Selector::Reference(c.identifier()?.to_string()));
    }
    Err(c.error("expected region selector"))
}

fn parse_index_list(c: &mut Cursor) -> Result<Vec<usize>, ExpressionError> {
    let mut out = vec![c.unsigned()?];
    while c.eat(",") {
        out.push(c.unsigned()?);
    }
    Ok(out)
}

fn parse_predicate(c: &mut Cursor) -> Result<Predicate, ExpressionError> {
    let mut lhs = parse_conjunction(c)?;
    while c.eat("|") {
        let rhs = parse_conjunction(c)?;
        lhs = Predicate::Or(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_conjunction(c: &mut Cursor) -> Result<Predicate, ExpressionError> {
    let mut lhs = parse_unary_predicate(c)?;
    while c.eat("&") {
        let rhs = parse_unary_predicate(c)?;
        lhs = Predicate::And(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_unary_predicate(c: &mut Cursor) -> Result<Predicate, ExpressionError> {
    // `(` opens either a grouped predicate or a grouped arithmetic operand.
    if c.peek() == Some('(') {
        let start = c.position();
        c.expect("(")?;
        if let Ok(inner) = parse_predicate(c) {
            if c.eat(")") && peek_comparison(c).is_none() {
                return Ok(inner);
            }
        }
        c.reset(start);
    }
    parse_comparison(c)
}

fn peek_comparison(c: &mut Cursor) -> Option<CmpOp> {
    let start = c.position();
    let op = eat_comparison(c);
    c.reset(start);
    op
}

fn eat_comparison(c: &mut Cursor) -> Option<CmpOp> {
    if c.eat("<=") {
        Some(CmpOp::Le)
    } else if c.eat(">=") {
        Some(CmpOp::Ge)
    } else if c.eat("==") {
        Some(CmpOp::Eq)
    } else if c.eat("<") {
        Some(CmpOp::Lt)
    } else if c.eat(">") {
        Some(CmpOp::Gt)
    } else {
        None
    }
}

fn parse_comparison(c: &mut Cursor) -> Result<Predicate, ExpressionError> {
    let lhs = parse_sum(c)?;
    let op = eat_comparison(c).ok_or_else(|| c.error("expected comparison operator"))?;
    let rhs = parse_sum(c)?;
    Ok(Predicate::Compare { lhs, op, rhs })
}

fn parse_sum(c: &mut Cursor) -> Result<Arith, ExpressionError> {
    let mut lhs = parse_product(c)?;
    loop {
        let op = if c.eat("+") {
            ArithOp::Add
        } else if c.eat("-") {
            ArithOp::Sub
        } else {
            return Ok(lhs);
        };
        let rhs = parse_product(c)?;
        lhs = Arith::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        };
    }
}

fn parse_product(c: &mut Cursor) -> Result<Arith, ExpressionError> {
    let mut lhs = parse_factor(c)?;
    loop {
        let op = if c.eat("*") {
            ArithOp::Mul
        } else if c.eat("/") {
            ArithOp::Div
        } else {
            return Ok(lhs);
        };
        let rhs = parse_factor(c)?;
        lhs = Arith::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        };
    }
}

fn parse_factor(c: &mut Cursor) -> Result<Arith, ExpressionError> {
    if c.eat("-") {
        return Ok(Arith::Neg(Box::new(parse_factor(c)?)));
    }
    if c.eat("(") {
        let inner = parse_sum(c)?;
        c.expect(")")?;
        return Ok(inner);
    }
    if c.is_number_next() {
        return Ok(Arith::Number(c.number()?));
    }
    match c.identifier()? {
        "x" => Ok(Arith::Coord(Axis::X)),
        "y" => Ok(Arith::Coord(Axis::Y)),
        "z" => Ok(Arith::Coord(Axis::Z)),
        other => Err(c.error(format!("unknown coordinate '{other}'"))),
    }
}
