use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    Real,
    Complex,
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "real" => Ok(Self::Real),
            "complex" => Ok(Self::Complex),
            other => Err(format!("unknown field data type '{other}'")),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Real => "real",
            Self::Complex => "complex",
        })
    }
}

/// A function space: data type, number of components, support region and
/// polynomial order.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDef {
    pub dtype: DataType,
    pub n_components: usize,
    pub region: String,
    pub approx_order: u32,
}

impl FieldDef {
    pub fn scalar(region: impl Into<String>, approx_order: u32) -> Self {
        Self {
            dtype: DataType::Real,
            n_components: 1,
            region: region.into(),
            approx_order,
        }
    }
}

/// Unknown, test or parameter function bound to a field.
#[derive(Clone, Debug, PartialEq)]
pub enum VariableDef {
    /// `history` is the number of previous time levels kept.
    Unknown { field: String, history: u32 },
    /// Test function paired with the unknown it is dual to.
    Test { field: String, dual_of: String },
    /// Known function with the layout of the `like` variable, if any.
    Parameter { field: String, like: Option<String> },
}

impl VariableDef {
    pub fn unknown(field: impl Into<String>) -> Self {
        Self::Unknown {
            field: field.into(),
            history: 0,
        }
    }

    pub fn test(field: impl Into<String>, dual_of: impl Into<String>) -> Self {
        Self::Test {
            field: field.into(),
            dual_of: dual_of.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Self::Unknown { field, .. } | Self::Test { field, .. } | Self::Parameter { field, .. } => {
                field
            }
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }

    pub fn is_test(&self) -> bool {
        matches!(self, Self::Test { .. })
    }

    pub fn role(&self) -> &'static str {
        match self {
            Self::Unknown { .. } => "unknown field",
            Self::Test { .. } => "test field",
            Self::Parameter { .. } => "parameter field",
        }
    }
}
