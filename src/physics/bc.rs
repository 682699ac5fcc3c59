use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::discretization::regions::RegionMap;
use crate::problem::{Component, EssentialBc};

#[derive(Debug, Error, PartialEq)]
pub enum BcError {
    #[error("ebc '{ebc}' is imposed on region '{region}', which was not evaluated")]
    UnknownRegion { ebc: String, region: String },
    #[error("ebc '{ebc}' fixes component {component} of a field with {n_components} component(s)")]
    ComponentOutOfRange {
        ebc: String,
        component: usize,
        n_components: usize,
    },
    #[error(
        "vertex {vertex} is fixed to {first} by ebc '{first_ebc}' and to {second} by ebc '{second_ebc}'"
    )]
    Conflict {
        vertex: usize,
        first_ebc: String,
        first: f64,
        second_ebc: String,
        second: f64,
    },
}

/// One essential (Dirichlet) constraint: `variable.component = value` on every
/// vertex of `region`.
#[derive(Clone, Debug, PartialEq)]
pub struct DirichletRule {
    pub ebc: String,
    pub region: String,
    pub variable: String,
    pub component: Component,
    pub value: f64,
}

#[derive(Clone, Debug, Default)]
pub struct BCRegistry {
    rules: Vec<DirichletRule>,
}

impl BCRegistry {
    pub fn from_ebcs(ebcs: &BTreeMap<String, EssentialBc>) -> Self {
        let mut reg = Self::default();
        for (name, ebc) in ebcs {
            for (dof, value) in &ebc.dofs {
                reg.add(DirichletRule {
                    ebc: name.clone(),
                    region: ebc.region.clone(),
                    variable: dof.variable.clone(),
                    component: dof.component,
                    value: *value,
                });
            }
        }
        reg
    }

    pub fn add(&mut self, rule: DirichletRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[DirichletRule] {
        &self.rules
    }

    pub fn rules_for<'a>(&'a self, variable: &'a str) -> impl Iterator<Item = &'a DirichletRule> {
        self.rules.iter().filter(move |r| r.variable == variable)
    }

    /// Fixed DOF values of `variable`, keyed by `vertex * n_components + component`.
    ///
    /// Two rules may fix the same DOF only if they agree on its value.
    pub fn constrained_dofs(
        &self,
        variable: &str,
        n_components: usize,
        regions: &RegionMap,
    ) -> Result<BTreeMap<usize, f64>, BcError> {
        let mut fixed: BTreeMap<usize, (f64, &str)> = BTreeMap::new();
        for rule in self.rules_for(variable) {
            let region = regions.get(&rule.region).ok_or_else(|| BcError::UnknownRegion {
                ebc: rule.ebc.clone(),
                region: rule.region.clone(),
            })?;
            let components = match rule.component {
                Component::All => 0..n_components,
                Component::Index(c) if c < n_components => c..c + 1,
                Component::Index(component) => {
                    return Err(BcError::ComponentOutOfRange {
                        ebc: rule.ebc.clone(),
                        component,
                        n_components,
                    });
                }
            };
            for &vertex in &region.vertices {
                for c in components.clone() {
                    let dof = vertex * n_components + c;
                    match fixed.get(&dof) {
                        Some(&(value, other)) if !same_value(value, rule.value) => {
                            return Err(BcError::Conflict {
                                vertex,
                                first_ebc: other.to_string(),
                                first: value,
                                second_ebc: rule.ebc.clone(),
                                second: rule.value,
                            });
                        }
                        Some(_) => {}
                        None => {
                            fixed.insert(dof, (rule.value, &rule.ebc));
                        }
                    }
                }
            }
            debug!(ebc = %rule.ebc, region = %rule.region, value = rule.value, "applied ebc");
        }
        Ok(fixed.into_iter().map(|(dof, (value, _))| (dof, value)).collect())
    }
}

fn same_value(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-12 * a.abs().max(b.abs()).max(1.0)
}
