//! Integration tests for the vortex lattice solvers

use musrtools_vortex::*;
use rstest::{fixture, rstest};

#[fixture]
fn params() -> VortexParameters {
    // Hc2 is about 8230 G for xi = 20 nm
    VortexParameters::new(1000.0, 200.0, 20.0, 64)
}

fn relative(a: f64, b: f64) -> f64 {
    ((a - b) / b).abs()
}

#[rstest]
#[case(VortexLattice::BulkTriangular)] // case
#[case(VortexLattice::BulkSquare)] // case
#[case(VortexLattice::BulkModifiedLondon)] // case
#[case(VortexLattice::BulkAnalyticGl)] // case
fn analytic_mean_is_applied_field(params: VortexParameters, #[case] lattice: VortexLattice) {
    let mut solver = lattice.bulk_solver(params).unwrap();
    let grid = solver.grid();
    assert!(relative(grid.mean(), params.field) < 1e-9);

    let (b_min, b_max) = (solver.b_min(), solver.b_max());
    assert!(b_max > params.field);
    assert!(b_min < params.field);
    assert!(b_min > 0.0);
}

#[rstest]
#[case(VortexLattice::BulkTriangular)] // case
#[case(VortexLattice::BulkSquare)] // case
#[case(VortexLattice::BulkModifiedLondon)] // case
#[case(VortexLattice::BulkAnalyticGl)] // case
#[case(VortexLattice::BulkNonlinearGl)] // case
fn uniform_above_upper_critical_field(params: VortexParameters, #[case] lattice: VortexLattice) {
    let field = params.upper_critical_field() + 1.0;
    let params = VortexParameters { field, ..params };

    let mut solver = lattice.bulk_solver(params).unwrap();
    assert_eq!(solver.b_min(), field);
    assert_eq!(solver.b_max(), field);
    assert!(solver.grid().values().iter().all(|b| *b == field));
}

#[rstest]
fn type_one_is_uniform(params: VortexParameters) {
    let params = VortexParameters {
        lambda: 10.0,
        ..params
    };
    let mut solver = VortexLattice::BulkTriangular.bulk_solver(params).unwrap();
    assert_eq!(solver.b_min(), solver.b_max());
}

#[rstest]
#[case(0.0, 200.0, 20.0, "field")] // case
#[case(1000.0, 0.0, 20.0, "lambda")] // case
#[case(1000.0, 200.0, 0.0, "xi")] // case
fn zero_parameters_rejected(
    #[case] field: f64,
    #[case] lambda: f64,
    #[case] xi: f64,
    #[case] expected: &str,
) {
    let params = VortexParameters::new(field, lambda, xi, 64);
    let result = VortexLattice::BulkTriangular.bulk_solver(params);
    assert!(matches!(result, Err(Error::ZeroParameter { name }) if name == expected));
}

#[rstest]
#[case(0, 0)] // vortex core
#[case(5, 9)] // case
#[case(16, 16)] // case
#[case(32, 32)] // second vortex core
#[case(40, 3)] // case
fn grid_matches_direct_lattice_sum(
    params: VortexParameters,
    #[case] row: usize,
    #[case] col: usize,
) {
    let mut solver = AnalyticFieldCalc::new(VortexLattice::BulkTriangular, params).unwrap();
    let grid = solver.grid();
    let n = grid.steps() as f64;

    let a = params.lattice_constant(VortexLattice::BulkTriangular);
    let x = col as f64 * 3.0_f64.sqrt() * a / n;
    let y = row as f64 * a / n;

    let direct = london_field_at(&params, x, y).unwrap();
    assert!(relative(grid.get(row, col).unwrap(), direct) < 1e-8);
}

#[rstest]
fn both_cores_have_the_same_field(params: VortexParameters) {
    let mut solver = VortexLattice::BulkAnalyticGl.bulk_solver(params).unwrap();
    let grid = solver.grid();
    let second = grid.get(32, 32).unwrap();
    assert!(relative(second, grid.b_max()) < 1e-9);
}

#[rstest]
fn nonlinear_gl_keeps_the_mean_field() {
    // kappa = 10, b = 0.15
    let params = VortexParameters::new(5000.0, 100.0, 10.0, 32);
    let mut solver = VortexLattice::BulkNonlinearGl.bulk_solver(params).unwrap();
    assert_eq!(solver.steps(), 32);

    let grid = solver.grid();
    assert!(grid.values().iter().all(|b| b.is_finite()));
    assert!(relative(grid.mean(), 5000.0) < 1e-9);
    assert!(solver.b_min() < 5000.0 && 5000.0 < solver.b_max());
}

/// Field extrema of a lattice as (b_min, b_max)
fn extrema(lattice: VortexLattice, params: VortexParameters) -> (f64, f64) {
    let mut solver = lattice.bulk_solver(params).unwrap();
    (solver.b_min(), solver.b_max())
}

#[rstest]
#[case(300.0)] // low field, well separated cores
#[case(1000.0)]
#[case(4000.0)] // cores start to overlap
fn nonlinear_gl_spread_is_below_london(#[case] field: f64) {
    let params = VortexParameters::new(field, 200.0, 20.0, 64);
    let (ngl_min, ngl_max) = extrema(VortexLattice::BulkNonlinearGl, params);
    let (london_min, london_max) = extrema(VortexLattice::BulkTriangular, params);

    assert!(ngl_min < field && field < ngl_max);
    assert!(ngl_max - ngl_min < london_max - london_min);
    assert!(ngl_max < london_max);
}

#[rstest]
fn nonlinear_gl_close_to_analytic_gl(params: VortexParameters) {
    let (ngl_min, ngl_max) = extrema(VortexLattice::BulkNonlinearGl, params);
    let (agl_min, agl_max) = extrema(VortexLattice::BulkAnalyticGl, params);

    // 983.8 to 1048.5 G against 985.5 to 1052.3 G
    assert!((ngl_min - agl_min).abs() < 5.0);
    assert!((ngl_max - agl_max).abs() < 10.0);
    let (ngl_spread, agl_spread) = (ngl_max - ngl_min, agl_max - agl_min);
    assert!(relative(ngl_spread, agl_spread) < 0.1);
}

#[rstest]
fn parameters_from_json() {
    let params: VortexParameters = serde_json::from_str(
        r#"{"field": 250.0, "lambda": 180.0, "xi": 3.5, "steps": 128}"#,
    )
    .unwrap();
    assert_eq!(params.thickness, None);
    assert_eq!(params.steps_z, None);
    assert_eq!(params.steps, 128);
}
