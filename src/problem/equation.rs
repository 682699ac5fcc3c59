//! Integrals and weak-form equations.
//!
//! Equations use the `term.integral.region(args)` notation, e.g.
//! `dw_laplace.i1.Omega( coef.val, s, t ) = 0`. Terms found on the right-hand
//! side are moved to the left with their sign flipped, so an [`Equation`] is
//! always a residual statement `sum(terms) = 0`.

use std::fmt;
use std::str::FromStr;

use super::expression::{Cursor, ExpressionError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntegralKind {
    Volume,
    Surface,
}

impl FromStr for IntegralKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v" => Ok(Self::Volume),
            "s" => Ok(Self::Surface),
            other => Err(format!("unknown integral kind '{other}'")),
        }
    }
}

/// Named quadrature rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntegralDef {
    pub kind: IntegralKind,
    pub order: u32,
}

impl IntegralDef {
    pub fn volume(order: u32) -> Self {
        Self {
            kind: IntegralKind::Volume,
            order,
        }
    }

    pub fn surface(order: u32) -> Self {
        Self {
            kind: IntegralKind::Surface,
            order,
        }
    }
}

/// Role of a term argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgRole {
    Material,
    Test,
    Unknown,
}

impl fmt::Display for ArgRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArgRole::Material => "material parameter",
            ArgRole::Test => "test variable",
            ArgRole::Unknown => "unknown variable",
        })
    }
}

/// Terms the engine knows how to assemble.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TermKind {
    /// `∫ c ∇s·∇t`
    Laplace,
    /// `∫ f s`
    VolumeLvf,
    /// `∫_Γ g s`
    SurfaceIntegrate,
}

impl TermKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "dw_laplace" => Some(Self::Laplace),
            "dw_volume_lvf" => Some(Self::VolumeLvf),
            "dw_surface_integrate" => Some(Self::SurfaceIntegrate),
            _ => None,
        }
    }

    pub fn signature(&self) -> &'static [ArgRole] {
        match self {
            Self::Laplace => &[ArgRole::Material, ArgRole::Test, ArgRole::Unknown],
            Self::VolumeLvf | Self::SurfaceIntegrate => &[ArgRole::Material, ArgRole::Test],
        }
    }

    pub fn integral_kind(&self) -> IntegralKind {
        match self {
            Self::Laplace | Self::VolumeLvf => IntegralKind::Volume,
            Self::SurfaceIntegrate => IntegralKind::Surface,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TermArg {
    Material { material: String, param: String },
    Variable(String),
}

impl fmt::Display for TermArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermArg::Material { material, param } => write!(f, "{material}.{param}"),
            TermArg::Variable(name) => f.write_str(name),
        }
    }
}

/// One `term.integral.region(args)` occurrence with its signed factor.
#[derive(Clone, Debug, PartialEq)]
pub struct TermCall {
    pub factor: f64,
    pub name: String,
    pub integral: String,
    pub region: String,
    pub args: Vec<TermArg>,
}

impl TermCall {
    pub fn kind(&self) -> Option<TermKind> {
        TermKind::from_name(&self.name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Equation {
    source: String,
    terms: Vec<TermCall>,
}

impl Equation {
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let mut c = Cursor::new(source);
        let mut terms = parse_side(&mut c, 1.0)?;
        c.expect("=")?;
        terms.extend(parse_side(&mut c, -1.0)?);
        if !c.is_at_end() {
            return Err(c.error("unexpected trailing input"));
        }
        if terms.is_empty() {
            return Err(c.error("equation has no terms"));
        }
        Ok(Self {
            source: source.to_string(),
            terms,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn terms(&self) -> &[TermCall] {
        &self.terms
    }
}

fn parse_side(c: &mut Cursor, side_sign: f64) -> Result<Vec<TermCall>, ExpressionError> {
    let mut terms = Vec::new();

    if c.is_number_next() {
        let start = c.position();
        let value = c.number()?;
        if !c.eat("*") {
            if value == 0.0 {
                return Ok(terms);
            }
            return Err(c.error("constant terms other than 0 are not supported"));
        }
        c.reset(start);
    }

    loop {
        let sign = if c.eat("-") {
            -1.0
        } else if c.eat("+") || terms.is_empty() {
            1.0
        } else {
            return Ok(terms);
        };
        let mut factor = sign * side_sign;
        if c.is_number_next() {
            factor *= c.number()?;
            c.expect("*")?;
        }
        terms.push(parse_term(c, factor)?);
    }
}

fn parse_term(c: &mut Cursor, factor: f64) -> Result<TermCall, ExpressionError> {
    let name = c.identifier()?.to_string();
    c.expect(".")?;
    let integral = c.identifier()?.to_string();
    c.expect(".")?;
    let region = c.identifier()?.to_string();
    c.expect("(")?;
    let mut args = vec![parse_arg(c)?];
    while c.eat(",") {
        args.push(parse_arg(c)?);
    }
    c.expect(")")?;
    Ok(TermCall {
        factor,
        name,
        integral,
        region,
        args,
    })
}

fn parse_arg(c: &mut Cursor) -> Result<TermArg, ExpressionError> {
    let first = c.identifier()?.to_string();
    if c.eat(".") {
        let param = c.identifier()?.to_string();
        Ok(TermArg::Material {
            material: first,
            param,
        })
    } else {
        Ok(TermArg::Variable(first))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_laplace_residual() {
        let eq = Equation::parse("dw_laplace.i1.Omega( coef.val, s, t ) = 0").unwrap();
        assert_eq!(eq.terms().len(), 1);
        let term = &eq.terms()[0];
        assert_eq!(term.kind(), Some(TermKind::Laplace));
        assert_eq!(term.integral, "i1");
        assert_eq!(term.region, "Omega");
        assert_eq!(term.factor, 1.0);
        assert_eq!(
            term.args,
            vec![
                TermArg::Material {
                    material: "coef".into(),
                    param: "val".into()
                },
                TermArg::Variable("s".into()),
                TermArg::Variable("t".into()),
            ]
        );
    }

    #[test]
    fn moves_right_hand_side_terms_left() {
        let eq = Equation::parse(
            "2 * dw_laplace.i.Omega(m.c, s, t) - dw_surface_integrate.is.Top(flux.g, s) \
             = dw_volume_lvf.i.Omega(src.f, s)",
        )
        .unwrap();
        let factors: Vec<f64> = eq.terms().iter().map(|t| t.factor).collect();
        assert_eq!(factors, vec![2.0, -1.0, -1.0]);
        assert_eq!(eq.terms()[2].kind(), Some(TermKind::VolumeLvf));
    }

    #[test]
    fn unknown_term_names_still_parse() {
        let eq = Equation::parse("dw_something.i.Omega(s, t) = 0").unwrap();
        assert_eq!(eq.terms()[0].kind(), None);
    }

    #[test]
    fn rejects_malformed_equations() {
        assert!(Equation::parse("dw_laplace.i1.Omega(coef.val, s, t)").is_err());
        assert!(Equation::parse("dw_laplace.i1(coef.val, s, t) = 0").is_err());
        assert!(Equation::parse("dw_laplace.i1.Omega(coef.val, s, t) = 1").is_err());
        assert!(Equation::parse("0 = 0").is_err());
    }

    #[test]
    fn term_signatures_match_domains() {
        assert_eq!(TermKind::Laplace.signature().len(), 3);
        assert_eq!(
            TermKind::SurfaceIntegrate.integral_kind(),
            IntegralKind::Surface
        );
        assert_eq!("v".parse::<IntegralKind>().unwrap(), IntegralKind::Volume);
    }
}
