//! Cross-reference validation of a [`ProblemDescription`].

use std::collections::{BTreeMap, BTreeSet};

use super::equation::{ArgRole, TermArg, TermKind};
use super::{
    Component, Issue, Issues, ProblemDescription, ProblemError, RegionKind, Section, SolverConf,
    VariableDef,
};

struct Collector {
    issues: Vec<Issue>,
}

impl Collector {
    fn unresolved(&mut self, section: Section, owner: &str, expected: Section, name: &str) {
        self.issues.push(Issue::Unresolved {
            section,
            owner: owner.to_string(),
            expected,
            name: name.to_string(),
        });
    }

    fn invalid(&mut self, section: Section, owner: &str, message: impl Into<String>) {
        self.issues.push(Issue::Invalid {
            section,
            owner: owner.to_string(),
            message: message.into(),
        });
    }
}

pub(super) fn validate(p: &ProblemDescription) -> Result<(), ProblemError> {
    let mut c = Collector { issues: Vec::new() };

    check_materials(p, &mut c);
    check_regions(p, &mut c);
    check_fields(p, &mut c);
    check_variables(p, &mut c);
    check_ebcs(p, &mut c);
    check_integrals(p, &mut c);
    check_equations(p, &mut c);
    check_solvers(p, &mut c);
    check_options(p, &mut c);

    if c.issues.is_empty() {
        Ok(())
    } else {
        Err(ProblemError::Invalid(Issues(c.issues)))
    }
}

fn check_materials(p: &ProblemDescription, c: &mut Collector) {
    for (name, material) in &p.materials {
        for (param, value) in material.values() {
            if !value.is_square_matrix() {
                c.invalid(
                    Section::Material,
                    name,
                    format!("tensor '{param}' is not square"),
                );
            }
        }
    }
}

fn check_regions(p: &ProblemDescription, c: &mut Collector) {
    for (name, region) in &p.regions {
        for reference in region.selector().references() {
            if !p.regions.contains_key(reference) {
                c.unresolved(Section::Region, name, Section::Region, reference);
            }
        }
    }

    // r.Name references must form a DAG. Each cycle is reported once, owned
    // by its first member in name order.
    let mut reported: BTreeSet<BTreeSet<&str>> = BTreeSet::new();
    for name in p.regions.keys() {
        let mut state: BTreeMap<&str, bool> = BTreeMap::new();
        let mut stack = Vec::new();
        if !has_cycle(p, name, &mut state, &mut stack) {
            continue;
        }
        // the stack ends with the repeated region: [.., X, .., X]
        let Some(&last) = stack.last() else {
            continue;
        };
        let start = stack.iter().position(|&r| r == last).unwrap_or(0);
        let cycle = &stack[start..];
        let members: BTreeSet<&str> = cycle.iter().copied().collect();
        let owner = members.first().copied().unwrap_or(name.as_str());
        let message = format!("circular region reference: {}", cycle.join(" -> "));
        if reported.insert(members) {
            c.invalid(Section::Region, owner, message);
        }
    }
}

/// `state[name]` is `false` while `name` is on the DFS stack and `true` once done.
fn has_cycle<'a>(
    p: &'a ProblemDescription,
    name: &'a str,
    state: &mut BTreeMap<&'a str, bool>,
    stack: &mut Vec<&'a str>,
) -> bool {
    match state.get(name) {
        Some(true) => return false,
        Some(false) => {
            stack.push(name);
            return true;
        }
        None => {}
    }
    let Some(region) = p.regions.get(name) else {
        return false;
    };
    state.insert(name, false);
    stack.push(name);
    for reference in region.selector().references() {
        if has_cycle(p, reference, state, stack) {
            return true;
        }
    }
    stack.pop();
    state.insert(name, true);
    false
}

fn check_fields(p: &ProblemDescription, c: &mut Collector) {
    for (name, field) in &p.fields {
        if !p.regions.contains_key(&field.region) {
            c.unresolved(Section::Field, name, Section::Region, &field.region);
        }
        if field.n_components == 0 {
            c.invalid(Section::Field, name, "needs at least one component");
        }
        if field.approx_order == 0 {
            c.invalid(Section::Field, name, "approximation order must be at least 1");
        }
    }
}

fn check_variables(p: &ProblemDescription, c: &mut Collector) {
    for (name, var) in &p.variables {
        if !p.fields.contains_key(var.field()) {
            c.unresolved(Section::Variable, name, Section::Field, var.field());
        }
        match var {
            VariableDef::Test { field, dual_of } => match p.variables.get(dual_of) {
                None => c.unresolved(Section::Variable, name, Section::Variable, dual_of),
                Some(VariableDef::Unknown { field: other, .. }) => {
                    if other != field {
                        c.invalid(
                            Section::Variable,
                            name,
                            format!("test field '{field}' differs from field '{other}' of '{dual_of}'"),
                        );
                    }
                }
                Some(other) => c.invalid(
                    Section::Variable,
                    name,
                    format!("'{dual_of}' is a {}, not an unknown field", other.role()),
                ),
            },
            VariableDef::Parameter {
                like: Some(like), ..
            } if !p.variables.contains_key(like) => {
                c.unresolved(Section::Variable, name, Section::Variable, like);
            }
            _ => {}
        }
    }
}

fn check_ebcs(p: &ProblemDescription, c: &mut Collector) {
    for (name, ebc) in &p.ebcs {
        if !p.regions.contains_key(&ebc.region) {
            c.unresolved(Section::Ebc, name, Section::Region, &ebc.region);
        }
        if ebc.dofs.is_empty() {
            c.invalid(Section::Ebc, name, "fixes no DOFs");
        }
        for (dof, value) in &ebc.dofs {
            if !value.is_finite() {
                c.invalid(Section::Ebc, name, format!("value of '{dof}' is not finite"));
            }
            let Some(var) = p.variables.get(&dof.variable) else {
                c.unresolved(Section::Ebc, name, Section::Variable, &dof.variable);
                continue;
            };
            if !var.is_unknown() {
                c.invalid(
                    Section::Ebc,
                    name,
                    format!("'{}' is a {}, only unknowns can be fixed", dof.variable, var.role()),
                );
                continue;
            }
            if let (Component::Index(i), Some(field)) = (dof.component, p.fields.get(var.field()))
            {
                if i >= field.n_components {
                    c.invalid(
                        Section::Ebc,
                        name,
                        format!(
                            "component {i} of '{}' out of range, field '{}' has {}",
                            dof.variable,
                            var.field(),
                            field.n_components
                        ),
                    );
                }
            }
        }
    }
}

fn check_integrals(p: &ProblemDescription, c: &mut Collector) {
    for (name, integral) in &p.integrals {
        if integral.order == 0 {
            c.invalid(Section::Integral, name, "order must be at least 1");
        }
    }
}

fn check_equations(p: &ProblemDescription, c: &mut Collector) {
    for (name, eq) in &p.equations {
        let mut tests = BTreeSet::new();
        for term in eq.terms() {
            let Some(kind) = term.kind() else {
                c.invalid(Section::Equation, name, format!("unknown term '{}'", term.name));
                continue;
            };

            match p.integrals.get(&term.integral) {
                None => c.unresolved(Section::Equation, name, Section::Integral, &term.integral),
                Some(integral) if integral.kind != kind.integral_kind() => c.invalid(
                    Section::Equation,
                    name,
                    format!("integral '{}' has the wrong kind for '{}'", term.integral, term.name),
                ),
                Some(_) => {}
            }

            match p.regions.get(&term.region) {
                None => c.unresolved(Section::Equation, name, Section::Region, &term.region),
                Some(region) => {
                    let expected = match kind {
                        TermKind::SurfaceIntegrate => RegionKind::Facet,
                        TermKind::Laplace | TermKind::VolumeLvf => RegionKind::Cell,
                    };
                    if region.kind() != expected {
                        c.invalid(
                            Section::Equation,
                            name,
                            format!(
                                "'{}' needs a {expected} region, '{}' is a {} region",
                                term.name,
                                term.region,
                                region.kind()
                            ),
                        );
                    }
                }
            }

            let signature = kind.signature();
            if signature.len() != term.args.len() {
                c.invalid(
                    Section::Equation,
                    name,
                    format!(
                        "'{}' takes {} arguments, got {}",
                        term.name,
                        signature.len(),
                        term.args.len()
                    ),
                );
                continue;
            }
            for (role, arg) in signature.iter().zip(&term.args) {
                check_arg(p, c, name, *role, arg);
                if let (ArgRole::Test, TermArg::Variable(v)) = (role, arg) {
                    tests.insert(v.as_str());
                }
            }
        }
        if tests.len() > 1 {
            c.invalid(
                Section::Equation,
                name,
                "terms use different test variables",
            );
        }
    }
}

fn check_arg(p: &ProblemDescription, c: &mut Collector, owner: &str, role: ArgRole, arg: &TermArg) {
    match (role, arg) {
        (ArgRole::Material, TermArg::Material { material, param }) => {
            match p.materials.get(material) {
                None => c.unresolved(Section::Equation, owner, Section::Material, material),
                Some(m) if m.get(param).is_none() => c.unresolved(
                    Section::Equation,
                    owner,
                    Section::Material,
                    &format!("{material}.{param}"),
                ),
                Some(_) => {}
            }
        }
        (ArgRole::Test | ArgRole::Unknown, TermArg::Variable(v)) => match p.variables.get(v) {
            None => c.unresolved(Section::Equation, owner, Section::Variable, v),
            Some(var) => {
                let ok = match role {
                    ArgRole::Test => var.is_test(),
                    _ => var.is_unknown(),
                };
                if !ok {
                    c.invalid(
                        Section::Equation,
                        owner,
                        format!("'{v}' is a {}, expected a {role}", var.role()),
                    );
                }
            }
        },
        _ => c.invalid(Section::Equation, owner, format!("argument '{arg}' should be a {role}")),
    }
}

fn check_solvers(p: &ProblemDescription, c: &mut Collector) {
    fn positive(c: &mut Collector, name: &str, param: &str, value: f64) {
        if value.is_nan() || value <= 0.0 {
            c.invalid(Section::Solver, name, format!("{param} must be positive, got {value}"));
        }
    }
    for (name, solver) in &p.solvers {
        match solver {
            SolverConf::Newton(params) => {
                positive(c, name, "eps_a", params.eps_a);
                positive(c, name, "eps_r", params.eps_r);
                positive(c, name, "ls_on", params.ls_on);
                positive(c, name, "ls_min", params.ls_min);
                if let Some(lin_red) = params.lin_red {
                    positive(c, name, "lin_red", lin_red);
                }
                if params.ls_red.is_nan() || params.ls_red <= 0.0 || params.ls_red >= 1.0 {
                    c.invalid(
                        Section::Solver,
                        name,
                        format!("ls_red must lie in (0, 1), got {}", params.ls_red),
                    );
                }
            }
            SolverConf::Iterative(params) => {
                positive(c, name, "eps_a", params.eps_a);
                positive(c, name, "eps_r", params.eps_r);
                if params.method != "cg" {
                    c.invalid(
                        Section::Solver,
                        name,
                        format!("unsupported iterative method '{}'", params.method),
                    );
                }
            }
            SolverConf::Direct(_) => {}
        }
    }
}

fn check_options(p: &ProblemDescription, c: &mut Collector) {
    let opts = &p.options;
    match p.solvers.get(&opts.nls) {
        None => c.unresolved(Section::Options, "nls", Section::Solver, &opts.nls),
        Some(s) if !s.is_nonlinear() => c.invalid(
            Section::Options,
            "nls",
            format!("solver '{}' ({}) is not a nonlinear solver", opts.nls, s.kind_name()),
        ),
        Some(_) => {}
    }
    match p.solvers.get(&opts.ls) {
        None => c.unresolved(Section::Options, "ls", Section::Solver, &opts.ls),
        Some(s) if !s.is_linear() => c.invalid(
            Section::Options,
            "ls",
            format!("solver '{}' ({}) is not a linear solver", opts.ls, s.kind_name()),
        ),
        Some(_) => {}
    }
}
