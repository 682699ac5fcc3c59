use std::path::PathBuf;

use serde::Deserialize;

/// Newton parameters. Defaults follow the usual `nls.newton` conventions: a
/// single iteration, absolute tolerance `1e-10`, and a relative tolerance of 1
/// (any decrease after the first step counts as converged).
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NewtonParams {
    pub i_max: u32,
    pub eps_a: f64,
    pub eps_r: f64,
    /// Required linear solve precision relative to the current residual.
    pub lin_red: Option<f64>,
    pub ls_red: f64,
    /// Line search kicks in when the residual exceeds `ls_on` times the last one.
    pub ls_on: f64,
    pub ls_min: f64,
}

impl Default for NewtonParams {
    fn default() -> Self {
        Self {
            i_max: 1,
            eps_a: 1e-10,
            eps_r: 1.0,
            lin_red: Some(1.0),
            ls_red: 0.1,
            ls_on: 0.99999,
            ls_min: 1e-5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectParams {}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IterativeParams {
    pub method: String,
    pub i_max: u32,
    pub eps_a: f64,
    pub eps_r: f64,
}

impl Default for IterativeParams {
    fn default() -> Self {
        Self {
            method: "cg".to_string(),
            i_max: 100,
            eps_a: 1e-8,
            eps_r: 1e-8,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SolverConf {
    /// `ls.scipy_direct`
    Direct(DirectParams),
    /// `ls.scipy_iterative`
    Iterative(IterativeParams),
    /// `nls.newton`
    Newton(NewtonParams),
}

impl SolverConf {
    pub fn kind_name(&self) -> &'static str {
        match self {
            SolverConf::Direct(_) => "ls.scipy_direct",
            SolverConf::Iterative(_) => "ls.scipy_iterative",
            SolverConf::Newton(_) => "nls.newton",
        }
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, SolverConf::Direct(_) | SolverConf::Iterative(_))
    }

    pub fn is_nonlinear(&self) -> bool {
        matches!(self, SolverConf::Newton(_))
    }

    /// Build a configuration from a solver identifier and its parameter map.
    pub fn from_kind(kind: &str, params: serde_json::Value) -> Result<Self, String> {
        let params = match params {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other,
        };
        let bad = |e: serde_json::Error| format!("invalid parameters for '{kind}': {e}");
        match kind {
            "ls.scipy_direct" => Ok(SolverConf::Direct(
                serde_json::from_value(params).map_err(bad)?,
            )),
            "ls.scipy_iterative" => {
                let p: IterativeParams = serde_json::from_value(params).map_err(bad)?;
                if p.method != "cg" {
                    return Err(format!(
                        "iterative method '{}' is not supported, use 'cg'",
                        p.method
                    ));
                }
                Ok(SolverConf::Iterative(p))
            }
            "nls.newton" => Ok(SolverConf::Newton(
                serde_json::from_value(params).map_err(bad)?,
            )),
            other => Err(format!("unknown solver kind '{other}'")),
        }
    }
}

/// Selects the active solvers for a run.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Options {
    pub nls: String,
    pub ls: String,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl Options {
    pub fn new(nls: impl Into<String>, ls: impl Into<String>) -> Self {
        Self {
            nls: nls.into(),
            ls: ls.into(),
            output_dir: None,
        }
    }
}
