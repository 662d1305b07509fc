//! Integration tests for field distributions of solved lattices

use musrtools_pofb::*;
use musrtools_vortex::{FieldGrid, VortexLattice, VortexParameters};
use rstest::{fixture, rstest};

fn total(pofb: &PofB) -> f64 {
    pofb.pb().iter().sum::<f64>() * pofb.db()
}

#[fixture]
fn params() -> VortexParameters {
    VortexParameters::new(1000.0, 200.0, 20.0, 64)
}

#[rstest]
#[case(VortexLattice::BulkTriangular, Weighting::Uniform)]
#[case(VortexLattice::BulkSquare, Weighting::Uniform)]
#[case(VortexLattice::BulkModifiedLondon, Weighting::Uniform)]
#[case(VortexLattice::BulkAnalyticGl, Weighting::Uniform)]
#[case(VortexLattice::BulkTriangular, Weighting::Gaussian { sigma: 5.0 })]
#[case(VortexLattice::BulkTriangular, Weighting::Lorentzian { sigma: 5.0 })]
#[case(VortexLattice::BulkSquare, Weighting::Lorentzian { sigma: 5.0 })] // falls back to uniform
fn lattices_are_normalised(
    params: VortexParameters,
    #[case] lattice: VortexLattice,
    #[case] weighting: Weighting,
) {
    let mut solver = lattice.bulk_solver(params).unwrap();
    let mut pofb = PofB::from_lattice(0.01, 0.5, solver.as_mut(), &weighting, None).unwrap();
    assert!((total(&pofb) - 1.0).abs() < 1e-9);
    assert!(pofb.pb().iter().all(|p| *p >= 0.0));
    assert!(pofb.b_min() < 1000.0 && 1000.0 < pofb.b_max());

    pofb.add_background(&Background {
        field: 1000.0,
        width: 0.3,
        weight: 0.2,
    });
    assert!((total(&pofb) - 1.0).abs() < 1e-9);

    pofb.convolve_gss(2.0);
    assert!((total(&pofb) - 1.0).abs() < 1e-9);
}

#[rstest]
fn mean_field_is_kept(params: VortexParameters) {
    let mut solver = VortexLattice::BulkTriangular.bulk_solver(params).unwrap();
    let pofb =
        PofB::from_lattice(0.01, 0.1, solver.as_mut(), &Weighting::Uniform, None).unwrap();
    assert!((pofb.first_moment() - 1000.0).abs() < 3.0);
}

#[rstest]
fn vortex_lattice_is_skewed_towards_the_cores(params: VortexParameters) {
    let mut solver = VortexLattice::BulkTriangular.bulk_solver(params).unwrap();
    let pofb =
        PofB::from_lattice(0.01, 0.1, solver.as_mut(), &Weighting::Uniform, None).unwrap();
    assert!(pofb.skewness_alpha() > 0.0);
}

#[rstest]
fn core_weighting_moves_weight_to_high_fields(params: VortexParameters) {
    let mut solver = VortexLattice::BulkTriangular.bulk_solver(params).unwrap();
    let uniform =
        PofB::from_lattice(0.01, 0.5, solver.as_mut(), &Weighting::Uniform, None).unwrap();
    let weighted = PofB::from_lattice(
        0.01,
        0.5,
        solver.as_mut(),
        &Weighting::Gaussian { sigma: 10.0 },
        None,
    )
    .unwrap();
    assert!(weighted.first_moment() > uniform.first_moment());
}

#[rstest]
#[case(100.0, 0.0, 0.5)] // zero width
#[case(100.0, 0.4, 0.0)] // zero weight
#[case(100.0, 0.4, 1.5)] // weight above one
#[case(-50.0, 0.4, 0.3)] // negative field
fn background_guards(#[case] field: f64, #[case] width: f64, #[case] weight: f64) {
    let grid = FieldGrid::uniform(16, 100.0);
    let mut pofb = PofB::from_grid(0.01, 1.0, &grid, true, &Weighting::Uniform).unwrap();
    let before = pofb.clone();

    pofb.add_background(&Background {
        field,
        width,
        weight,
    });
    assert_eq!(pofb, before);
}

#[rstest]
fn uniform_above_upper_critical_field() {
    // Hc2 of a 60 nm coherence length is about 914 G
    let params = VortexParameters::new(2000.0, 200.0, 60.0, 32);
    let mut solver = VortexLattice::BulkTriangular.bulk_solver(params).unwrap();
    let pofb =
        PofB::from_lattice(0.01, 1.0, solver.as_mut(), &Weighting::Uniform, None).unwrap();
    assert_eq!(pofb.pb().iter().filter(|p| **p != 0.0).count(), 1);
    assert_eq!(pofb.pb()[2000], 1.0);
}

#[test]
fn pofb_from_parts() {
    let b = (0..8).map(|i| 100.0 + 2.0 * i as f64).collect();
    let pb = vec![0.0, 0.0, 0.1, 0.2, 0.1, 0.1, 0.0, 0.0];
    let mut pofb = PofB::from_parts(b, pb, 0.01).unwrap();
    assert_eq!(pofb.db(), 2.0);
    assert_eq!((pofb.b_min(), pofb.b_max()), (104.0, 110.0));

    pofb.normalize();
    assert!((total(&pofb) - 1.0).abs() < 1e-12);
}
