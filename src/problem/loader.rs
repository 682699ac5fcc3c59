//! JSON rendition of the declarative problem schema.
//!
//! Sections keep the tuple shapes of the classic problem-description files:
//!
//! ```json
//! {
//!   "filename_mesh": "meshes/3d/cylinder.mesh",
//!   "materials": { "coef": { "val": 1.0 } },
//!   "regions": { "Omega": "all", "Gamma_Left": ["vertices in (x < 0.00001)", "facet"] },
//!   "fields": { "temperature": ["real", 1, "Omega", 1] },
//!   "variables": { "t": ["unknown field", "temperature", 0],
//!                  "s": ["test field", "temperature", "t"] },
//!   "ebcs": { "t1": ["Gamma_Left", { "t.0": 2.0 }] },
//!   "integrals": { "i1": ["v", 2] },
//!   "equations": { "Temperature": "dw_laplace.i1.Omega( coef.val, s, t ) = 0" },
//!   "solvers": { "ls": ["ls.scipy_direct", {}],
//!                "newton": ["nls.newton", { "i_max": 1, "eps_a": 1e-10 }] },
//!   "options": { "nls": "newton", "ls": "ls" }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use super::{
    Coefficient, DofSpec, EssentialBc, FieldDef, IntegralDef, Material, Options, ProblemBuilder,
    ProblemDescription, ProblemError, RegionKind, Section, SolverConf, VariableDef,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProblem {
    #[serde(default)]
    name: Option<String>,
    filename_mesh: PathBuf,
    #[serde(default)]
    materials: BTreeMap<String, BTreeMap<String, Coefficient>>,
    regions: BTreeMap<String, RawRegion>,
    fields: BTreeMap<String, (String, usize, String, u32)>,
    variables: BTreeMap<String, (String, String, RawVariableExtra)>,
    #[serde(default)]
    ebcs: BTreeMap<String, (String, BTreeMap<String, f64>)>,
    #[serde(default)]
    integrals: BTreeMap<String, (String, u32)>,
    equations: BTreeMap<String, String>,
    solvers: BTreeMap<String, (String, serde_json::Value)>,
    options: Options,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRegion {
    Selector(String),
    WithKind(String, String),
}

/// Third element of a variable tuple: history order, dual/like name or null.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawVariableExtra {
    Order(u32),
    Name(String),
    Nothing,
}

pub(super) fn from_json_str(default_name: String, json: &str) -> Result<ProblemDescription, ProblemError> {
    let raw: RawProblem = serde_json::from_str(json)?;
    let name = raw.name.clone().unwrap_or(default_name);
    debug!(problem = %name, "converting problem description");
    convert(ProblemBuilder::new(name), raw).build()
}

fn convert(mut b: ProblemBuilder, raw: RawProblem) -> ProblemBuilder {
    b = b.mesh(raw.filename_mesh);

    for (name, values) in raw.materials {
        b = b.material(name, Material::from(values));
    }

    for (name, region) in raw.regions {
        let (selector, kind) = match region {
            RawRegion::Selector(s) => (s, "cell".to_string()),
            RawRegion::WithKind(s, k) => (s, k),
        };
        b = match kind.parse::<RegionKind>() {
            Ok(kind) => b.region(name, &selector, kind),
            Err(msg) => b.record_entry_error(Section::Region, name, msg),
        };
    }

    for (name, (dtype, n_components, region, approx_order)) in raw.fields {
        b = match dtype.parse() {
            Ok(dtype) => b.field(
                name,
                FieldDef {
                    dtype,
                    n_components,
                    region,
                    approx_order,
                },
            ),
            Err(msg) => b.record_entry_error(Section::Field, name, msg),
        };
    }

    for (name, (kind, field, extra)) in raw.variables {
        b = match variable_def(&kind, field, extra) {
            Ok(var) => b.variable(name, var),
            Err(msg) => b.record_entry_error(Section::Variable, name, msg),
        };
    }

    for (name, (region, dofs)) in raw.ebcs {
        let mut ebc = EssentialBc::new(region);
        let mut failed = None;
        for (spec, value) in dofs {
            match spec.parse::<DofSpec>() {
                Ok(dof) => ebc = ebc.fix(dof, value),
                Err(msg) => failed = Some(msg),
            }
        }
        b = match failed {
            None => b.ebc(name, ebc),
            Some(msg) => b.record_entry_error(Section::Ebc, name, msg),
        };
    }

    for (name, (kind, order)) in raw.integrals {
        b = match kind.parse() {
            Ok(kind) => b.integral(name, IntegralDef { kind, order }),
            Err(msg) => b.record_entry_error(Section::Integral, name, msg),
        };
    }

    for (name, source) in raw.equations {
        b = b.equation(name, &source);
    }

    for (name, (kind, params)) in raw.solvers {
        b = match SolverConf::from_kind(&kind, params) {
            Ok(conf) => b.solver(name, conf),
            Err(msg) => b.record_entry_error(Section::Solver, name, msg),
        };
    }

    b.options(raw.options)
}

fn variable_def(kind: &str, field: String, extra: RawVariableExtra) -> Result<VariableDef, String> {
    match (kind, extra) {
        ("unknown field", RawVariableExtra::Order(history)) => {
            Ok(VariableDef::Unknown { field, history })
        }
        ("test field", RawVariableExtra::Name(dual_of)) => Ok(VariableDef::Test { field, dual_of }),
        ("parameter field", RawVariableExtra::Name(like)) => Ok(VariableDef::Parameter {
            field,
            like: Some(like),
        }),
        ("parameter field", RawVariableExtra::Nothing) => {
            Ok(VariableDef::Parameter { field, like: None })
        }
        ("unknown field" | "test field" | "parameter field", extra) => {
            Err(format!("unexpected third element {extra:?} for a {kind}"))
        }
        (other, _) => Err(format!("unknown variable kind '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPERATURE: &str = r#"{
        "filename_mesh": "meshes/3d/cylinder.mesh",
        "materials": { "coef": { "val": 1.0 } },
        "regions": {
            "Omega": "all",
            "Gamma_Left": ["vertices in (x < 0.00001)", "facet"],
            "Gamma_Right": ["vertices in (x > 0.099999)", "facet"]
        },
        "fields": { "temperature": ["real", 1, "Omega", 1] },
        "variables": {
            "t": ["unknown field", "temperature", 0],
            "s": ["test field", "temperature", "t"]
        },
        "ebcs": {
            "t1": ["Gamma_Left", { "t.0": 2.0 }],
            "t2": ["Gamma_Right", { "t.0": -2.0 }]
        },
        "integrals": { "i1": ["v", 2] },
        "equations": { "Temperature": "dw_laplace.i1.Omega( coef.val, s, t ) = 0" },
        "solvers": {
            "ls": ["ls.scipy_direct", {}],
            "newton": ["nls.newton", { "i_max": 1, "eps_a": 1e-10 }]
        },
        "options": { "nls": "newton", "ls": "ls" }
    }"#;

    #[test]
    fn loads_tuple_shaped_sections() {
        let p = ProblemDescription::from_json_str("temperature", TEMPERATURE).unwrap();
        assert_eq!(p.regions()["Gamma_Left"].kind(), RegionKind::Facet);
        assert_eq!(p.regions()["Omega"].kind(), RegionKind::Cell);
        assert_eq!(p.fields()["temperature"].n_components, 1);
        assert_eq!(
            p.variables()["s"],
            VariableDef::test("temperature", "t")
        );
        assert_eq!(p.ebcs()["t2"].dofs[0].1, -2.0);
        assert_eq!(p.integrals()["i1"].order, 2);
    }

    #[test]
    fn parameter_variables_accept_null() {
        let v = variable_def("parameter field", "f".into(), RawVariableExtra::Nothing).unwrap();
        assert_eq!(v, VariableDef::Parameter { field: "f".into(), like: None });
        assert!(variable_def("unknown field", "f".into(), RawVariableExtra::Name("x".into())).is_err());
        assert!(variable_def("state field", "f".into(), RawVariableExtra::Order(0)).is_err());
    }

    #[test]
    fn bad_region_kind_is_an_entry_error() {
        let json = TEMPERATURE.replace(r#""facet"]"#, r#""surface"]"#);
        let err = ProblemDescription::from_json_str("t", &json).unwrap_err();
        assert!(matches!(err, ProblemError::Entry { section: Section::Region, .. }));
    }

    #[test]
    fn unknown_top_level_keys_are_rejected() {
        let json = TEMPERATURE.replacen('{', r#"{ "functions": {},"#, 1);
        assert!(matches!(
            ProblemDescription::from_json_str("t", &json),
            Err(ProblemError::Json(_))
        ));
    }
}
