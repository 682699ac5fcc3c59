//! Declarative description of a finite-element problem.
//!
//! A [`ProblemDescription`] is a set of named sections (materials, regions,
//! fields, variables, essential boundary conditions, integrals, equations,
//! solvers and options) plus a mesh reference. It is immutable once built and
//! every name it refers to is guaranteed to be declared in its owning section.
//!
//! Descriptions are created either with [`ProblemBuilder`] or loaded from JSON
//! with [`ProblemDescription::from_json_str`] / [`ProblemDescription::from_file`].

pub mod builder;
pub mod ebc;
pub mod equation;
pub(crate) mod expression;
pub mod field;
pub mod loader;
pub mod material;
pub mod region;
pub mod solver;
mod validate;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use builder::ProblemBuilder;
pub use ebc::{Component, DofSpec, EssentialBc};
pub use equation::{Equation, IntegralDef, IntegralKind, TermArg, TermCall, TermKind};
pub use expression::ExpressionError;
pub use field::{DataType, FieldDef, VariableDef};
pub use material::{Coefficient, Material};
pub use region::{RegionDef, RegionKind, Selector};
pub use solver::{NewtonParams, Options, SolverConf};

/// Section names, used when reporting problems with an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Mesh,
    Material,
    Region,
    Field,
    Variable,
    Ebc,
    Integral,
    Equation,
    Solver,
    Options,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Section::Mesh => "mesh",
            Section::Material => "material",
            Section::Region => "region",
            Section::Field => "field",
            Section::Variable => "variable",
            Section::Ebc => "ebc",
            Section::Integral => "integral",
            Section::Equation => "equation",
            Section::Solver => "solver",
            Section::Options => "options",
        })
    }
}

/// A single consistency problem found while validating a description.
#[derive(Clone, Debug, PartialEq)]
pub enum Issue {
    /// `owner` in `section` refers to `name`, which is not declared in `expected`.
    Unresolved {
        section: Section,
        owner: String,
        expected: Section,
        name: String,
    },
    Invalid {
        section: Section,
        owner: String,
        message: String,
    },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::Unresolved {
                section,
                owner,
                expected,
                name,
            } => write!(f, "{section} '{owner}' refers to undeclared {expected} '{name}'"),
            Issue::Invalid {
                section,
                owner,
                message,
            } => write!(f, "{section} '{owner}': {message}"),
        }
    }
}

/// All issues found in one validation pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Issues(pub Vec<Issue>);

impl fmt::Display for Issues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ProblemError {
    #[error("failed to read problem file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed problem description: {0}")]
    Json(#[from] serde_json::Error),
    #[error("mesh '{0}' has an unsupported format, expected a Medit '.mesh' file")]
    UnsupportedMeshFormat(PathBuf),
    #[error("{section} '{name}': {source}")]
    Expression {
        section: Section,
        name: String,
        #[source]
        source: ExpressionError,
    },
    #[error("{section} '{name}': {message}")]
    Entry {
        section: Section,
        name: String,
        message: String,
    },
    #[error("missing {0} section")]
    Missing(Section),
    #[error("invalid problem description: {0}")]
    Invalid(Issues),
}

impl ProblemError {
    /// Issues found by validation, empty for other kinds of errors.
    pub fn issues(&self) -> &[Issue] {
        match self {
            ProblemError::Invalid(issues) => &issues.0,
            _ => &[],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshFormat {
    Medit,
}

/// Path to the discretized geometry. Relative paths resolve against a data
/// directory.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshReference {
    path: PathBuf,
    format: MeshFormat,
}

impl MeshReference {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ProblemError> {
        let path = path.into();
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("mesh") => MeshFormat::Medit,
            _ => return Err(ProblemError::UnsupportedMeshFormat(path)),
        };
        Ok(Self { path, format })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> MeshFormat {
        self.format
    }

    pub fn resolve(&self, data_dir: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            data_dir.join(&self.path)
        }
    }
}

/// The complete, validated problem record.
#[derive(Clone, Debug, PartialEq)]
pub struct ProblemDescription {
    name: String,
    mesh: MeshReference,
    materials: BTreeMap<String, Material>,
    regions: BTreeMap<String, RegionDef>,
    fields: BTreeMap<String, FieldDef>,
    variables: BTreeMap<String, VariableDef>,
    ebcs: BTreeMap<String, EssentialBc>,
    integrals: BTreeMap<String, IntegralDef>,
    equations: BTreeMap<String, Equation>,
    solvers: BTreeMap<String, SolverConf>,
    options: Options,
}

impl ProblemDescription {
    pub fn builder(name: impl Into<String>) -> ProblemBuilder {
        ProblemBuilder::new(name)
    }

    pub fn from_json_str(name: impl Into<String>, json: &str) -> Result<Self, ProblemError> {
        loader::from_json_str(name.into(), json)
    }

    /// Load a description from a JSON file. The problem is named after the
    /// file stem unless the file sets `name` itself.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProblemError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ProblemError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("problem")
            .to_string();
        loader::from_json_str(stem, &json)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mesh(&self) -> &MeshReference {
        &self.mesh
    }

    pub fn materials(&self) -> &BTreeMap<String, Material> {
        &self.materials
    }

    pub fn regions(&self) -> &BTreeMap<String, RegionDef> {
        &self.regions
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldDef> {
        &self.fields
    }

    pub fn variables(&self) -> &BTreeMap<String, VariableDef> {
        &self.variables
    }

    pub fn ebcs(&self) -> &BTreeMap<String, EssentialBc> {
        &self.ebcs
    }

    pub fn integrals(&self) -> &BTreeMap<String, IntegralDef> {
        &self.integrals
    }

    pub fn equations(&self) -> &BTreeMap<String, Equation> {
        &self.equations
    }

    pub fn solvers(&self) -> &BTreeMap<String, SolverConf> {
        &self.solvers
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Coefficient referenced as `material.param`.
    pub fn coefficient(&self, material: &str, param: &str) -> Option<&Coefficient> {
        self.materials.get(material)?.get(param)
    }

    /// The nonlinear solver selected by `options.nls`.
    pub fn nonlinear_solver(&self) -> &SolverConf {
        // validated on construction
        &self.solvers[&self.options.nls]
    }

    /// The linear solver selected by `options.ls`.
    pub fn linear_solver(&self) -> &SolverConf {
        &self.solvers[&self.options.ls]
    }

    /// Unknown variables in name order.
    pub fn unknowns(&self) -> impl Iterator<Item = (&str, &VariableDef)> {
        self.variables
            .iter()
            .filter(|(_, v)| v.is_unknown())
            .map(|(k, v)| (k.as_str(), v))
    }
}
