use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Component {
    Index(usize),
    All,
}

/// Degree-of-freedom specifier such as `t.0` or `u.all`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct DofSpec {
    pub variable: String,
    pub component: Component,
}

impl FromStr for DofSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (variable, component) = s
            .split_once('.')
            .ok_or_else(|| format!("DOF specifier '{s}' must look like 'var.component'"))?;
        if variable.is_empty() {
            return Err(format!("DOF specifier '{s}' has no variable name"));
        }
        let component = match component {
            "all" => Component::All,
            idx => Component::Index(
                idx.parse()
                    .map_err(|_| format!("DOF specifier '{s}' has invalid component '{idx}'"))?,
            ),
        };
        Ok(Self {
            variable: variable.to_string(),
            component,
        })
    }
}

impl fmt::Display for DofSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.component {
            Component::Index(i) => write!(f, "{}.{i}", self.variable),
            Component::All => write!(f, "{}.all", self.variable),
        }
    }
}

/// Fixes DOF values of variables on a region.
#[derive(Clone, Debug, PartialEq)]
pub struct EssentialBc {
    pub region: String,
    pub dofs: Vec<(DofSpec, f64)>,
}

impl EssentialBc {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            dofs: Vec::new(),
        }
    }

    pub fn fix(mut self, dof: DofSpec, value: f64) -> Self {
        self.dofs.push((dof, value));
        self
    }
}
