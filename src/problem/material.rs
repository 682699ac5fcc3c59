use std::collections::BTreeMap;

use serde::Deserialize;

/// A material coefficient value.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Coefficient {
    Scalar(f64),
    Vector(Vec<f64>),
    /// Row-major square tensor, e.g. an anisotropic conductivity.
    Matrix(Vec<Vec<f64>>),
}

impl Coefficient {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Coefficient::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_square_matrix(&self) -> bool {
        match self {
            Coefficient::Matrix(rows) => rows.iter().all(|r| r.len() == rows.len()),
            _ => true,
        }
    }
}

impl From<f64> for Coefficient {
    fn from(value: f64) -> Self {
        Coefficient::Scalar(value)
    }
}

/// Named group of coefficients, referenced from equations as `material.param`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Material {
    values: BTreeMap<String, Coefficient>,
}

impl Material {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Coefficient>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Coefficient> {
        self.values.get(name)
    }

    pub fn values(&self) -> &BTreeMap<String, Coefficient> {
        &self.values
    }
}

impl From<BTreeMap<String, Coefficient>> for Material {
    fn from(values: BTreeMap<String, Coefficient>) -> Self {
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_every_coefficient_shape() {
        let raw: BTreeMap<String, Coefficient> =
            serde_json::from_str(r#"{"val": 1.0, "dir": [1, 0, 0], "k": [[1, 0], [0, 2]]}"#)
                .unwrap();
        assert_eq!(raw["val"], Coefficient::Scalar(1.0));
        assert_eq!(raw["dir"], Coefficient::Vector(vec![1.0, 0.0, 0.0]));
        assert!(raw["k"].is_square_matrix());
        assert!(!Coefficient::Matrix(vec![vec![1.0, 2.0]]).is_square_matrix());
    }

    #[test]
    fn builder_style_lookup() {
        let m = Material::new().with("val", 1.0);
        assert_eq!(m.get("val").and_then(Coefficient::as_scalar), Some(1.0));
        assert!(m.get("missing").is_none());
    }
}
