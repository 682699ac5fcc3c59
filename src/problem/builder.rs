use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{
    Equation, EssentialBc, FieldDef, IntegralDef, Material, MeshReference, Options,
    ProblemDescription, ProblemError, RegionDef, RegionKind, Section, SolverConf, VariableDef,
    validate,
};

/// Fluent constructor for [`ProblemDescription`].
///
/// Errors from individual entries (unparsable selectors or equations, duplicate
/// names, unsupported mesh formats) are held back until [`ProblemBuilder::build`],
/// which reports the first of them or runs cross-reference validation.
#[derive(Debug, Default)]
pub struct ProblemBuilder {
    name: String,
    mesh: Option<MeshReference>,
    materials: BTreeMap<String, Material>,
    regions: BTreeMap<String, RegionDef>,
    fields: BTreeMap<String, FieldDef>,
    variables: BTreeMap<String, VariableDef>,
    ebcs: BTreeMap<String, EssentialBc>,
    integrals: BTreeMap<String, IntegralDef>,
    equations: BTreeMap<String, Equation>,
    solvers: BTreeMap<String, SolverConf>,
    options: Option<Options>,
    error: Option<ProblemError>,
}

fn insert_unique<T>(
    map: &mut BTreeMap<String, T>,
    error: &mut Option<ProblemError>,
    section: Section,
    name: String,
    value: T,
) {
    if map.contains_key(&name) {
        error.get_or_insert(ProblemError::Entry {
            section,
            name,
            message: "declared twice".to_string(),
        });
        return;
    }
    map.insert(name, value);
}

impl ProblemBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn record(&mut self, err: ProblemError) {
        self.error.get_or_insert(err);
    }

    pub fn mesh(mut self, path: impl Into<PathBuf>) -> Self {
        match MeshReference::new(path) {
            Ok(mesh) => self.mesh = Some(mesh),
            Err(e) => self.record(e),
        }
        self
    }

    pub fn material(mut self, name: impl Into<String>, material: Material) -> Self {
        insert_unique(
            &mut self.materials,
            &mut self.error,
            Section::Material,
            name.into(),
            material,
        );
        self
    }

    pub fn region(mut self, name: impl Into<String>, selector: &str, kind: RegionKind) -> Self {
        let name = name.into();
        match RegionDef::parse(selector, kind) {
            Ok(def) => insert_unique(&mut self.regions, &mut self.error, Section::Region, name, def),
            Err(source) => self.record(ProblemError::Expression {
                section: Section::Region,
                name,
                source,
            }),
        }
        self
    }

    pub fn field(mut self, name: impl Into<String>, field: FieldDef) -> Self {
        insert_unique(&mut self.fields, &mut self.error, Section::Field, name.into(), field);
        self
    }

    pub fn variable(mut self, name: impl Into<String>, variable: VariableDef) -> Self {
        insert_unique(
            &mut self.variables,
            &mut self.error,
            Section::Variable,
            name.into(),
            variable,
        );
        self
    }

    pub fn ebc(mut self, name: impl Into<String>, ebc: EssentialBc) -> Self {
        insert_unique(&mut self.ebcs, &mut self.error, Section::Ebc, name.into(), ebc);
        self
    }

    pub fn integral(mut self, name: impl Into<String>, integral: IntegralDef) -> Self {
        insert_unique(
            &mut self.integrals,
            &mut self.error,
            Section::Integral,
            name.into(),
            integral,
        );
        self
    }

    pub fn equation(mut self, name: impl Into<String>, source: &str) -> Self {
        let name = name.into();
        match Equation::parse(source) {
            Ok(eq) => insert_unique(&mut self.equations, &mut self.error, Section::Equation, name, eq),
            Err(source) => self.record(ProblemError::Expression {
                section: Section::Equation,
                name,
                source,
            }),
        }
        self
    }

    pub fn solver(mut self, name: impl Into<String>, solver: SolverConf) -> Self {
        insert_unique(&mut self.solvers, &mut self.error, Section::Solver, name.into(), solver);
        self
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }

    pub(crate) fn record_entry_error(mut self, section: Section, name: String, message: String) -> Self {
        self.record(ProblemError::Entry {
            section,
            name,
            message,
        });
        self
    }

    pub fn build(self) -> Result<ProblemDescription, ProblemError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mesh = self.mesh.ok_or(ProblemError::Missing(Section::Mesh))?;
        let options = self.options.ok_or(ProblemError::Missing(Section::Options))?;
        if self.equations.is_empty() {
            return Err(ProblemError::Missing(Section::Equation));
        }

        let problem = ProblemDescription {
            name: self.name,
            mesh,
            materials: self.materials,
            regions: self.regions,
            fields: self.fields,
            variables: self.variables,
            ebcs: self.ebcs,
            integrals: self.integrals,
            equations: self.equations,
            solvers: self.solvers,
            options,
        };
        validate::validate(&problem)?;
        Ok(problem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::solver::{DirectParams, NewtonParams};
    use crate::problem::{DofSpec, Issue};

    fn minimal() -> ProblemBuilder {
        ProblemBuilder::new("minimal")
            .mesh("box.mesh")
            .material("m", Material::new().with("c", 1.0))
            .region("Omega", "all", RegionKind::Cell)
            .region("Left", "vertices in (x < 0.001)", RegionKind::Facet)
            .field("u", FieldDef::scalar("Omega", 1))
            .variable("t", VariableDef::unknown("u"))
            .variable("s", VariableDef::test("u", "t"))
            .ebc("fix", EssentialBc::new("Left").fix("t.0".parse::<DofSpec>().unwrap(), 0.0))
            .integral("i", IntegralDef::volume(1))
            .equation("eq", "dw_laplace.i.Omega(m.c, s, t) = 0")
            .solver("ls", SolverConf::Direct(DirectParams::default()))
            .solver("newton", SolverConf::Newton(NewtonParams::default()))
            .options(Options::new("newton", "ls"))
    }

    #[test]
    fn builds_consistent_problem() {
        let problem = minimal().build().unwrap();
        assert_eq!(problem.name(), "minimal");
        assert_eq!(problem.linear_solver().kind_name(), "ls.scipy_direct");
        assert_eq!(problem.unknowns().count(), 1);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = minimal()
            .integral("i", IntegralDef::volume(2))
            .build()
            .unwrap_err();
        assert!(matches!(err, ProblemError::Entry { section: Section::Integral, .. }));
    }

    #[test]
    fn parse_errors_surface_on_build() {
        let err = minimal()
            .region("Bad", "vertices in (q < 1)", RegionKind::Cell)
            .build()
            .unwrap_err();
        assert!(matches!(err, ProblemError::Expression { section: Section::Region, .. }));
    }

    #[test]
    fn missing_options_are_reported() {
        let err = ProblemBuilder::new("x")
            .mesh("a.mesh")
            .equation("eq", "dw_laplace.i.Omega(m.c, s, t) = 0")
            .build()
            .unwrap_err();
        assert!(matches!(err, ProblemError::Missing(Section::Options)));
    }

    #[test]
    fn dangling_material_is_unresolved() {
        let err = minimal()
            .equation("other", "dw_volume_lvf.i.Omega(heat.f, s) = 0")
            .build()
            .unwrap_err();
        assert!(err.issues().iter().any(|i| matches!(
            i,
            Issue::Unresolved { expected: Section::Material, name, .. } if name == "heat"
        )));
    }
}
