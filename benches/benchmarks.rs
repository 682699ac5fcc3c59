use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use heatfem_rs::Simulation;
use heatfem_rs::discretization::generator::create_cylinder_mesh;
use heatfem_rs::discretization::regions::evaluate_regions;
use heatfem_rs::models::temperature::{LENGTH, RADIUS, temperature_problem};
use heatfem_rs::physics::PhysicsModel;

fn axial_sizes() -> Vec<usize> {
    vec![10, 20, 40]
}

fn simulation(n_axial: usize) -> Simulation {
    let mesh = create_cylinder_mesh(LENGTH, RADIUS, n_axial, 4).unwrap();
    Simulation::new(temperature_problem().unwrap(), mesh).unwrap()
}

fn bench_mesh_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("cylinder_mesh");
    for &n in &axial_sizes() {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let mesh = create_cylinder_mesh(LENGTH, RADIUS, std::hint::black_box(n), 4);
                std::hint::black_box(mesh)
            });
        });
    }
    group.finish();
}

fn bench_regions(c: &mut Criterion) {
    let mut group = c.benchmark_group("regions");
    let problem = temperature_problem().unwrap();
    for &n in &axial_sizes() {
        let mesh = create_cylinder_mesh(LENGTH, RADIUS, n, 4).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &_| {
            b.iter(|| {
                let regions = evaluate_regions(problem.regions(), std::hint::black_box(&mesh));
                std::hint::black_box(regions)
            });
        });
    }
    group.finish();
}

fn bench_jacobian(c: &mut Criterion) {
    let mut group = c.benchmark_group("jacobian");
    for &n in &axial_sizes() {
        let sim = simulation(n);
        let init = PhysicsModel::<f64>::initial_condition(sim.model(), sim.mesh());
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &_| {
            b.iter(|| {
                let (_res, jac) =
                    sim.newton()
                        .compute_residual_and_jacobian(sim.model(), sim.mesh(), &init);
                std::hint::black_box(jac);
            });
        });
    }
    group.finish();
}

fn bench_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("solve");
    for &n in &axial_sizes() {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter_batched(
                || simulation(n),
                |sim| {
                    let _ = std::hint::black_box(sim.solve());
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_mesh_generation,
    bench_regions,
    bench_jacobian,
    bench_solve
);
criterion_main!(benches);
