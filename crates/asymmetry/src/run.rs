//! A prepared run ready for fitting or viewing

// internal modules
use crate::alignment::{fit_range_from_bins, ResolvedAlignment};
use crate::assemble::{assemble, prepare, TheoryGrid};
use crate::asymmetry::AlphaBetaMode;
use crate::command::parse_fit_range_bins;
use crate::config::{GlobalBlock, HandleTag, Parameter, RunBlock, RunKind};
use crate::constants::THEORY_CLIP;
use crate::data::DataProvider;
use crate::error::Result;
use crate::series::{AsymmetrySeries, FitBins};
use crate::theory::{Functions, Theory};

// external crates
use log::{debug, info};
use rayon::prelude::*;

/// Asymmetry data of a single run with everything needed for chi-square
///
/// Construction runs the whole preparation pipeline. Any structural problem
/// with the configuration or data is returned as an error, so an existing
/// `AsymmetryRun` is always valid.
///
/// ```rust
/// # use musrtools_asymmetry::*;
/// # use std::collections::HashMap;
/// let mut data = RawRunData { time_resolution: 10.0, ..Default::default() };
/// data.histograms.insert(1, Histogram::new(vec![100.0; 200], 10.0));
/// data.histograms.insert(2, Histogram::new(vec![60.0; 200], 10.0));
/// let provider = HashMap::from([("run_1".to_string(), data)]);
///
/// let run = RunBlock {
///     run_names: vec!["run_1".into()],
///     forward_histo: vec![1],
///     backward_histo: vec![2],
///     alpha: Some(1),
///     packing: Some(10),
///     t0: vec![Some(10.0), Some(10.0)],
///     data_range: [Some(10), Some(200), Some(10), Some(200)],
///     bkg_fix: [Some(0.0), Some(0.0), None, None],
///     ..Default::default()
/// };
/// let params = [Parameter::new("alpha", 1.0, 0.0)];
///
/// let asym = AsymmetryRun::new(0, HandleTag::Fit, &run, &GlobalBlock::default(), &params, &[], &provider)?;
/// assert_eq!(asym.series().len(), 19);
/// assert!((asym.series().values[0] - 0.25).abs() < 1e-12);
/// # Ok::<(), musrtools_asymmetry::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct AsymmetryRun {
    run_name: String,
    kind: RunKind,
    tag: HandleTag,
    alpha_beta: AlphaBetaMode,
    alignment: ResolvedAlignment,
    series: AsymmetrySeries,
    theory_grid: TheoryGrid,
    fit_bins: FitBins,
}

impl AsymmetryRun {
    /// Prepare run `run_no` (0-based) for the given handle tag
    ///
    /// `params` are the fit parameters and `funcs` the current values of the
    /// user functions, used to resolve alpha and beta.
    pub fn new<P: DataProvider>(
        run_no: usize,
        tag: HandleTag,
        run: &RunBlock,
        global: &GlobalBlock,
        params: &[Parameter],
        funcs: &[f64],
        provider: &P,
    ) -> Result<Self> {
        let mut prepared = prepare(run_no, run, global, provider)?;

        let alpha_beta = AlphaBetaMode::new(
            &prepared.run_name,
            run.alpha,
            run.beta,
            params,
            funcs.len(),
        )?;
        let values: Vec<f64> = params.iter().map(|p| p.value).collect();
        prepared.alpha_beta = alpha_beta.values(&values, funcs);
        debug!(
            "AsymmetryRun::new(): run {}: alpha/beta tag {}",
            prepared.run_name,
            alpha_beta.tag()
        );

        let assembled = assemble(&mut prepared, tag)?;

        if let Some(bkg) = prepared.alignment.bkg_estimated.forward {
            info!(
                "AsymmetryRun::new(): run {}: estimated forward background {bkg}",
                prepared.run_name
            );
        }
        if let Some(bkg) = prepared.alignment.bkg_estimated.backward {
            info!(
                "AsymmetryRun::new(): run {}: estimated backward background {bkg}",
                prepared.run_name
            );
        }

        let mut asym = Self {
            run_name: prepared.run_name,
            kind: run.kind,
            tag,
            alpha_beta,
            alignment: prepared.alignment,
            series: assembled.series,
            theory_grid: assembled.theory,
            fit_bins: FitBins::default(),
        };
        asym.calc_no_of_fit_bins();
        Ok(asym)
    }

    /// Name of the main run
    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    /// Pipeline the run went through
    pub fn kind(&self) -> RunKind {
        self.kind
    }

    /// Fit or view data
    pub fn tag(&self) -> HandleTag {
        self.tag
    }

    /// Alpha/beta handling used for theory values
    pub fn alpha_beta(&self) -> AlphaBetaMode {
        self.alpha_beta
    }

    /// Every alignment quantity the run was prepared with
    pub fn alignment(&self) -> &ResolvedAlignment {
        &self.alignment
    }

    /// Asymmetry data and theory
    pub fn series(&self) -> &AsymmetrySeries {
        &self.series
    }

    /// Half-open bin range used by the chi-square
    pub fn fit_bins(&self) -> FitBins {
        self.fit_bins
    }

    /// Number of bins used by the chi-square
    pub fn no_of_fit_bins(&self) -> usize {
        self.fit_bins.count()
    }

    /// Recalculate the fit bins from the current fit range
    pub fn calc_no_of_fit_bins(&mut self) {
        self.fit_bins = self
            .series
            .fit_bins(self.alignment.fit_start, self.alignment.fit_end);
    }

    /// Change the fit range (us)
    pub fn set_fit_range(&mut self, start: f64, end: f64) {
        self.alignment.fit_start = start;
        self.alignment.fit_end = end;
        self.alignment.fit_offsets = None;
        self.calc_no_of_fit_bins();
    }

    /// Change the fit range from a `FIT_RANGE fgb+n0 lgb-n1` command
    ///
    /// `run_no` selects the pair to use if the command gives one per run. On
    /// error the fit range is left untouched.
    pub fn set_fit_range_bin(&mut self, command: &str, run_no: usize) -> Result<()> {
        let offsets = parse_fit_range_bins(command, run_no)?;
        let (start, end) = fit_range_from_bins(
            &self.alignment.good_bins,
            self.alignment.t0[0],
            offsets,
            self.alignment.time_resolution,
        );
        debug!(
            "AsymmetryRun::set_fit_range_bin(): run {}: fit range ({start}, {end}) us",
            self.run_name
        );
        self.alignment.fit_start = start;
        self.alignment.fit_end = end;
        self.alignment.fit_offsets = Some(offsets);
        self.calc_no_of_fit_bins();
        Ok(())
    }

    /// Chi-square of the data against a theory for one parameter set
    ///
    /// The theory is evaluated once serially before the parallel sum, so any
    /// per-parameter caching inside the theory happens outside of it.
    pub fn calc_chi_square<T, F>(&self, par: &[f64], theory: &T, functions: &F) -> f64
    where
        T: Theory + ?Sized,
        F: Functions + ?Sized,
    {
        let funcs = functions.eval(par);
        theory.func(1.0, par, &funcs);

        let series = &self.series;
        (self.fit_bins.start..self.fit_bins.end)
            .into_par_iter()
            .map(|i| {
                let f = theory.func(series.time(i), par, &funcs);
                let diff = series.values[i] - self.alpha_beta.evaluate(f, par, &funcs);
                let err = series.errors[i];
                diff * diff / (err * err)
            })
            .sum()
    }

    /// Fill the companion theory curve of the series for a parameter set
    ///
    /// Fit data gets the theory at the data points with the alpha/beta
    /// mapping. Views get a plain theory on their own grid, low-pass filtered
    /// and packed for rotating reference frame data.
    pub fn calc_theory<T, F>(&mut self, par: &[f64], theory: &T, functions: &F)
    where
        T: Theory + ?Sized,
        F: Functions + ?Sized,
    {
        let funcs = functions.eval(par);
        theory.func(1.0, par, &funcs);

        let clip = |v: f64| if v.abs() > THEORY_CLIP { 0.0 } else { v };

        match self.theory_grid {
            TheoryGrid::Fit => {
                let series = &self.series;
                let values = (0..series.len())
                    .into_par_iter()
                    .map(|i| {
                        let f = theory.func(series.time(i), par, &funcs);
                        self.alpha_beta.evaluate(f, par, &funcs)
                    })
                    .collect();
                self.series.theory = values;
                self.series.theory_time_start = self.series.data_time_start;
                self.series.theory_time_step = self.series.data_time_step;
            }
            TheoryGrid::View { start, step, size } => {
                self.series.theory = (0..size)
                    .into_par_iter()
                    .map(|i| clip(theory.func(start + i as f64 * step, par, &funcs)))
                    .collect();
                self.series.theory_time_start = start;
                self.series.theory_time_step = step;
            }
            TheoryGrid::RrfView {
                start,
                step,
                size,
                transformer,
                data_step,
            } => {
                let fine: Vec<f64> = (0..size)
                    .into_par_iter()
                    .map(|i| clip(theory.func(start + i as f64 * step, par, &funcs)))
                    .collect();
                let p = transformer.packing as f64;
                self.series.theory = transformer.filter_theory(&fine, step, data_step);
                self.series.theory_time_start = start + (p - 1.0) / 2.0 * step;
                self.series.theory_time_step = step * p;
            }
        }
    }
}

#[cfg(test)]
mod run_tests {
    use super::*;
    use crate::data::{Histogram, RawRunData};
    use crate::theory::NoFunctions;
    use std::collections::HashMap;

    fn provider() -> HashMap<String, RawRunData> {
        let mut data = RawRunData {
            time_resolution: 10.0,
            ..Default::default()
        };
        data.histograms
            .insert(1, Histogram::new(vec![120.0; 210], 10.0));
        data.histograms
            .insert(2, Histogram::new(vec![80.0; 210], 10.0));
        HashMap::from([("run".to_string(), data)])
    }

    fn run_block() -> RunBlock {
        RunBlock {
            run_names: vec!["run".into()],
            forward_histo: vec![1],
            backward_histo: vec![2],
            alpha: Some(1),
            packing: Some(10),
            t0: vec![Some(10.0), Some(10.0)],
            data_range: [Some(10), Some(210), Some(10), Some(210)],
            bkg_fix: [Some(0.0), Some(0.0), None, None],
            ..Default::default()
        }
    }

    #[test]
    fn constant_theory_chi_square() {
        let params = [Parameter::new("alpha", 1.0, 0.0)];
        let asym = AsymmetryRun::new(
            0,
            HandleTag::Fit,
            &run_block(),
            &GlobalBlock::default(),
            &params,
            &[],
            &provider(),
        )
        .unwrap();

        assert_eq!(asym.alpha_beta(), AlphaBetaMode::Fixed);
        assert_eq!(asym.series().len(), 20);

        let exact = |_: f64, _: &[f64], _: &[f64]| 0.2;
        assert!(asym.calc_chi_square(&[1.0], &exact, &NoFunctions) < 1e-20);

        let off = |_: f64, _: &[f64], _: &[f64]| 0.0;
        assert!(asym.calc_chi_square(&[1.0], &off, &NoFunctions) > 0.0);
    }

    #[test]
    fn fit_range_commands() {
        let params = [Parameter::new("alpha", 1.0, 0.0)];
        let mut asym = AsymmetryRun::new(
            0,
            HandleTag::Fit,
            &run_block(),
            &GlobalBlock::default(),
            &params,
            &[],
            &provider(),
        )
        .unwrap();
        let all = asym.no_of_fit_bins();

        asym.set_fit_range_bin("FIT_RANGE fgb+50 lgb-50", 0).unwrap();
        assert_eq!(asym.alignment().fit_offsets, Some((50, 50)));
        assert!(asym.no_of_fit_bins() < all);

        let before = asym.fit_bins();
        assert!(asym.set_fit_range_bin("FIT_RANGE fgb+x lgb", 0).is_err());
        assert_eq!(asym.fit_bins(), before);

        asym.set_fit_range(0.0, 0.5);
        assert_eq!(asym.alignment().fit_offsets, None);
        assert_eq!(asym.fit_bins().start, 0);
    }

    #[test]
    fn view_theory_is_oversampled_and_clipped() {
        let params = [Parameter::new("alpha", 1.0, 0.0)];
        let mut asym = AsymmetryRun::new(
            0,
            HandleTag::View,
            &run_block(),
            &GlobalBlock::default(),
            &params,
            &[],
            &provider(),
        )
        .unwrap();

        let wild = |t: f64, _: &[f64], _: &[f64]| if t < 0.5 { 20.0 } else { 0.1 };
        asym.calc_theory(&[1.0], &wild, &NoFunctions);

        let series = asym.series();
        assert_eq!(series.theory.len(), 8 * series.len());
        assert_eq!(series.theory_time_step, series.data_time_step / 8.0);
        assert_eq!(series.theory[0], 0.0);
        assert_eq!(*series.theory.last().unwrap(), 0.1);
    }
}
