//! Integration tests for the full run preparation pipeline

use musrtools_asymmetry::*;
use rstest::{fixture, rstest};
use std::collections::HashMap;

type Provider = HashMap<String, RawRunData>;

fn run_data(histograms: &[(usize, Vec<f64>)], t0: f64) -> RawRunData {
    let mut data = RawRunData {
        time_resolution: 10.0,
        field: Some(100.0),
        ..Default::default()
    };
    for (no, counts) in histograms {
        data.histograms
            .insert(*no, Histogram::new(counts.clone(), t0).with_t0(t0));
    }
    data
}

fn alpha_fixed() -> Vec<Parameter> {
    vec![Parameter::new("alpha", 1.0, 0.0)]
}

#[fixture]
fn short_run() -> (RunBlock, Provider) {
    let data = run_data(
        &[
            (1, vec![100.0, 90.0, 80.0, 70.0, 60.0, 50.0]),
            (2, vec![50.0, 55.0, 60.0, 65.0, 70.0, 75.0]),
        ],
        0.0,
    );
    let run = RunBlock {
        run_names: vec!["short".into()],
        forward_histo: vec![1],
        backward_histo: vec![2],
        alpha: Some(1),
        packing: Some(1),
        t0: vec![Some(0.0), Some(0.0)],
        data_range: [Some(0), Some(6), Some(0), Some(6)],
        bkg_fix: [Some(0.0), Some(0.0), None, None],
        ..Default::default()
    };
    (run, HashMap::from([("short".to_string(), data)]))
}

#[fixture]
fn flat_run() -> (RunBlock, Provider) {
    let data = run_data(&[(1, vec![120.0; 1000]), (2, vec![80.0; 1000])], 10.0);
    let run = RunBlock {
        run_names: vec!["flat".into()],
        forward_histo: vec![1],
        backward_histo: vec![2],
        alpha: Some(1),
        packing: Some(10),
        data_range: [Some(20), Some(1000), Some(20), Some(1000)],
        bkg_fix: [Some(0.0), Some(0.0), None, None],
        ..Default::default()
    };
    (run, HashMap::from([("flat".to_string(), data)]))
}

#[rstest]
fn unpacked_asymmetry(short_run: (RunBlock, Provider)) {
    let (run, provider) = short_run;
    let asym = AsymmetryRun::new(
        0,
        HandleTag::Fit,
        &run,
        &GlobalBlock::default(),
        &alpha_fixed(),
        &[],
        &provider,
    )
    .unwrap();

    let series = asym.series();
    assert_eq!(series.len(), 6);
    assert!((series.values[0] - 1.0 / 3.0).abs() < 1e-12);
    assert!((series.values[5] + 0.2).abs() < 1e-12);
    assert!(series.values.iter().all(|a| (-1.0..=1.0).contains(a)));
}

#[rstest]
fn packed_pairs(short_run: (RunBlock, Provider)) {
    let (mut run, provider) = short_run;
    run.packing = Some(2);
    run.data_range = [Some(0), Some(4), Some(0), Some(4)];
    let asym = AsymmetryRun::new(
        0,
        HandleTag::Fit,
        &run,
        &GlobalBlock::default(),
        &alpha_fixed(),
        &[],
        &provider,
    )
    .unwrap();

    // forward packs to [95, 75], backward to [52.5, 62.5]
    let series = asym.series();
    assert_eq!(series.len(), 2);
    assert!((series.values[0] - (95.0 - 52.5) / (95.0 + 52.5)).abs() < 1e-12);
    assert!((series.values[1] - (75.0 - 62.5) / (75.0 + 62.5)).abs() < 1e-12);
    assert_eq!(series.data_time_step, 0.02);
    assert!((series.data_time_start - 0.005).abs() < 1e-15);
}

#[rstest]
#[case([Some(15), Some(90), Some(22), Some(90)], [15, 90, 25, 100])] // backward shifted
#[case([Some(12), Some(90), Some(25), Some(90)], [15, 80, 25, 90])] // forward shifted
#[case([Some(13), Some(90), Some(23), Some(90)], [13, 90, 23, 90])] // equal offsets
fn larger_offset_wins(#[case] given: [Option<i64>; 4], #[case] expected: [i64; 4]) {
    let run = RunBlock {
        run_names: vec!["align".into()],
        data_range: given,
        ..Default::default()
    };
    let bins =
        resolve_data_range(&run, &GlobalBlock::default(), [10.0, 20.0], [100, 100], 0.01).unwrap();
    assert_eq!(bins, expected);
}

#[rstest]
fn reversed_data_range_is_swapped() {
    let run = RunBlock {
        run_names: vec!["swap".into()],
        data_range: [Some(80), Some(20), Some(80), Some(20)],
        ..Default::default()
    };
    let bins =
        resolve_data_range(&run, &GlobalBlock::default(), [10.0, 10.0], [100, 100], 0.01).unwrap();
    assert_eq!(bins, [20, 80, 20, 80]);
}

#[rstest]
fn add_run_is_summed(short_run: (RunBlock, Provider)) {
    let (mut run, mut provider) = short_run;
    run.run_names.push("extra".into());
    provider.insert(
        "extra".into(),
        run_data(&[(1, vec![60.0; 6]), (2, vec![90.0; 6])], 0.0),
    );

    let asym = AsymmetryRun::new(
        0,
        HandleTag::Fit,
        &run,
        &GlobalBlock::default(),
        &alpha_fixed(),
        &[],
        &provider,
    )
    .unwrap();

    // bin 0: forward 100 + 60, backward 50 + 90
    assert!((asym.series().values[0] - 20.0 / 300.0).abs() < 1e-12);
    assert_eq!(asym.alignment().add_t0, vec![vec![0.0, 0.0]]);
}

#[rstest]
fn grouped_channels(short_run: (RunBlock, Provider)) {
    let (mut run, mut provider) = short_run;
    let data = provider.get_mut("short").unwrap();
    data.histograms
        .insert(3, Histogram::new(vec![10.0; 6], 0.0).with_t0(1.0));
    data.histograms
        .insert(4, Histogram::new(vec![5.0; 6], 0.0).with_t0(1.0));
    run.forward_histo = vec![1, 3];
    run.backward_histo = vec![2, 4];
    run.t0 = vec![Some(0.0), Some(0.0), Some(1.0), Some(1.0)];

    let asym = AsymmetryRun::new(
        0,
        HandleTag::Fit,
        &run,
        &GlobalBlock::default(),
        &alpha_fixed(),
        &[],
        &provider,
    )
    .unwrap();

    // the second group is shifted by one bin, so its last bin is dropped
    let values = &asym.series().values;
    assert!((values[0] - (110.0 - 55.0) / 165.0).abs() < 1e-12);
    assert!((values[5] - (50.0 - 75.0) / 125.0).abs() < 1e-12);
}

#[rstest]
#[case::missing_histogram(|r: &mut RunBlock| r.forward_histo = vec![7])]
#[case::count_mismatch(|r: &mut RunBlock| r.backward_histo = vec![2, 2])]
#[case::missing_alpha(|r: &mut RunBlock| r.alpha = None)]
#[case::alpha_out_of_bounds(|r: &mut RunBlock| r.alpha = Some(4))]
#[case::missing_packing(|r: &mut RunBlock| r.packing = None)]
#[case::missing_add_run(|r: &mut RunBlock| r.run_names.push("nowhere".into()))]
#[case::missing_run(|r: &mut RunBlock| r.run_names = vec!["nowhere".into()])]
#[case::t0_outside(|r: &mut RunBlock| r.t0 = vec![Some(7.0), Some(0.0)])]
fn structural_errors(short_run: (RunBlock, Provider), #[case] breakage: fn(&mut RunBlock)) {
    let (mut run, provider) = short_run;
    breakage(&mut run);
    let result = AsymmetryRun::new(
        0,
        HandleTag::Fit,
        &run,
        &GlobalBlock::default(),
        &alpha_fixed(),
        &[],
        &provider,
    );
    assert!(result.is_err());
}

#[rstest]
fn packing_from_global(short_run: (RunBlock, Provider)) {
    let (mut run, provider) = short_run;
    run.packing = None;
    let global = GlobalBlock {
        packing: Some(3),
        ..Default::default()
    };
    let asym = AsymmetryRun::new(
        0,
        HandleTag::Fit,
        &run,
        &global,
        &alpha_fixed(),
        &[],
        &provider,
    )
    .unwrap();
    assert_eq!(asym.alignment().packing, 3);
    assert_eq!(asym.series().len(), 2);
}

#[rstest]
fn estimated_background(flat_run: (RunBlock, Provider)) {
    let (mut run, mut provider) = flat_run;
    let data = provider.get_mut("flat").unwrap();
    for (no, bkg) in [(1, 20.0), (2, 5.0)] {
        let histo = data.histograms.get_mut(&no).unwrap();
        histo.counts.iter_mut().take(10).for_each(|c| *c = bkg);
    }
    run.bkg_fix = [None; 4];
    run.bkg_range = [Some(0), Some(9), Some(0), Some(9)];

    let asym = AsymmetryRun::new(
        0,
        HandleTag::Fit,
        &run,
        &GlobalBlock::default(),
        &alpha_fixed(),
        &[],
        &provider,
    )
    .unwrap();

    let estimated = asym.alignment().bkg_estimated;
    assert_eq!(estimated.forward, Some(20.0));
    assert_eq!(estimated.backward, Some(5.0));
    assert_eq!(asym.alignment().bkg_range, Some([0, 9, 0, 9]));

    // 100 and 75 counts remain after the background
    assert!((asym.series().values[0] - 25.0 / 175.0).abs() < 1e-12);
}

#[rstest]
fn view_uses_alpha(flat_run: (RunBlock, Provider)) {
    let (run, provider) = flat_run;
    let params = vec![Parameter::new("alpha", 1.5, 0.01)];
    let view = AsymmetryRun::new(
        0,
        HandleTag::View,
        &run,
        &GlobalBlock::default(),
        &params,
        &[],
        &provider,
    )
    .unwrap();

    assert_eq!(view.alpha_beta(), AlphaBetaMode::AlphaOnly(ParamOrFunc::Param(0)));
    let expected = (1.5 * 120.0 - 80.0) / (1.5 * 120.0 + 80.0);
    assert!((view.series().values[0] - expected).abs() < 1e-12);
}

#[rstest]
fn theory_as_data_view(flat_run: (RunBlock, Provider)) {
    let (run, provider) = flat_run;
    let global = GlobalBlock {
        theory_as_data: true,
        view_packing: Some(50),
        ..Default::default()
    };
    let mut view = AsymmetryRun::new(
        0,
        HandleTag::View,
        &run,
        &global,
        &alpha_fixed(),
        &[],
        &provider,
    )
    .unwrap();
    view.calc_theory(&[1.0], &|t: f64, _: &[f64], _: &[f64]| t, &NoFunctions);

    let series = view.series();
    assert_eq!(series.data_time_step, 0.5);
    assert_eq!(series.theory.len(), series.len());
    assert_eq!(series.theory_time_step, series.data_time_step);
    assert_eq!(series.theory[0], series.time(0));
}

#[rstest]
fn fit_theory_applies_alpha(flat_run: (RunBlock, Provider)) {
    let (run, provider) = flat_run;
    let params = vec![Parameter::new("alpha", 2.0, 0.01)];
    let mut asym = AsymmetryRun::new(
        0,
        HandleTag::Fit,
        &run,
        &GlobalBlock::default(),
        &params,
        &[],
        &provider,
    )
    .unwrap();
    asym.calc_theory(&[2.0], &|_: f64, _: &[f64], _: &[f64]| 0.0, &NoFunctions);

    // a zero polarisation maps to (1 - alpha) / (1 + alpha)
    let theory = &asym.series().theory;
    assert_eq!(theory.len(), asym.series().len());
    assert!(theory.iter().all(|v| (v + 1.0 / 3.0).abs() < 1e-12));
}

#[rstest]
fn user_function_alpha(flat_run: (RunBlock, Provider)) {
    let (mut run, provider) = flat_run;
    run.alpha = Some(PARAM_FUN_OFFSET);
    let params = vec![Parameter::new("a", 0.75, 0.01)];
    let funcs = |par: &[f64]| vec![2.0 * par[0]];

    let asym = AsymmetryRun::new(
        0,
        HandleTag::Fit,
        &run,
        &GlobalBlock::default(),
        &params,
        &[1.5],
        &provider,
    )
    .unwrap();

    // the data is alpha independent, the theory maps zero to -1/5 with alpha 1.5
    let zero = |_: f64, _: &[f64], _: &[f64]| 0.0;
    let chisq = asym.calc_chi_square(&[0.75], &zero, &funcs);
    let expected: f64 = asym
        .series()
        .values
        .iter()
        .zip(asym.series().errors.iter())
        .map(|(v, e)| ((v + 0.2) / e).powi(2))
        .sum();
    assert!((chisq - expected).abs() < 1e-9 * expected);
}

#[rstest]
fn rrf_fit_data(flat_run: (RunBlock, Provider)) {
    let (mut run, mut provider) = flat_run;
    run.kind = RunKind::Rrf;
    provider.get_mut("flat").unwrap().time_resolution = 1.0;

    let global = GlobalBlock {
        rrf: Some(RrfSettings {
            frequency: 0.0,
            unit: RrfUnit::MHz,
            phase: 0.0,
            packing: Some(10),
        }),
        ..Default::default()
    };
    let asym = AsymmetryRun::new(
        0,
        HandleTag::Fit,
        &run,
        &global,
        &alpha_fixed(),
        &[],
        &provider,
    )
    .unwrap();

    // 980 bins flushed every tenth bin, the first block one short
    let series = asym.series();
    assert_eq!(series.len(), 98);
    assert!((series.data_time_step - 0.01).abs() < 1e-15);
    assert!((series.values[0] - 0.36).abs() < 1e-12);
    assert!(series.values[1..].iter().all(|v| (v - 0.4).abs() < 1e-12));
}

#[rstest]
fn rrf_view_theory_is_filtered(flat_run: (RunBlock, Provider)) {
    let (mut run, mut provider) = flat_run;
    run.kind = RunKind::Rrf;
    provider.get_mut("flat").unwrap().time_resolution = 1.0;

    let global = GlobalBlock {
        rrf: Some(RrfSettings {
            frequency: 0.0,
            unit: RrfUnit::MHz,
            phase: 0.0,
            packing: Some(10),
        }),
        ..Default::default()
    };
    let mut view = AsymmetryRun::new(
        0,
        HandleTag::View,
        &run,
        &global,
        &alpha_fixed(),
        &[],
        &provider,
    )
    .unwrap();
    view.calc_theory(&[1.0], &|_: f64, _: &[f64], _: &[f64]| 0.1, &NoFunctions);

    let series = view.series();
    assert_eq!(series.theory.len(), 8 * 980 / 10);
    assert!((series.theory_time_step - 0.01 / 8.0).abs() < 1e-15);
    assert!(series.theory[1..].iter().all(|v| (v - 0.1).abs() < 1e-9));
}

#[rstest]
fn rrf_needs_settings(flat_run: (RunBlock, Provider)) {
    let (mut run, provider) = flat_run;
    run.kind = RunKind::Rrf;
    let result = AsymmetryRun::new(
        0,
        HandleTag::Fit,
        &run,
        &GlobalBlock::default(),
        &alpha_fixed(),
        &[],
        &provider,
    );
    assert!(matches!(result, Err(Error::MissingRrfSettings(_))));
}

#[rstest]
fn run_block_from_json() {
    let json = r#"{
        "run_names": ["2024_0042", "2024_0043"],
        "institute": "PSI",
        "kind": "rrf",
        "forward_histo": [1, 3],
        "backward_histo": [2, 4],
        "alpha": 1,
        "t0": [120.5, null, 121.0, 119.5],
        "data_range": [130, 8000, null, null],
        "fit_range": { "bins": { "first_offset": 5, "last_offset": 10 } }
    }"#;
    let run: RunBlock = serde_json::from_str(json).unwrap();
    assert_eq!(run.kind, RunKind::Rrf);
    assert_eq!(run.add_run_names(), &["2024_0043".to_string()]);
    assert_eq!(run.t0[1], None);
    assert_eq!(
        run.fit_range,
        Some(FitRange::Bins {
            first_offset: 5,
            last_offset: 10
        })
    );
    assert_eq!(Institute::from_name(&run.institute), Institute::Psi);
}
