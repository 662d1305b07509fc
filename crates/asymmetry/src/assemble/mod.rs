//! Data preparation shared by every run kind
//!
//! Histograms are collected and aligned here, then handed to the kind
//! specific assemblers for background removal, packing and asymmetry
//! formation.

mod asymmetry;
mod bnmr;
mod rrf;

// internal modules
use crate::aggregate::{add_run, group_channels};
use crate::alignment::{resolve_add_t0, resolve_data_range, resolve_fit_range, resolve_t0};
use crate::alignment::ResolvedAlignment;
use crate::background::{
    estimate_background, subtract_estimated, subtract_fixed, BackgroundEstimate, BackgroundMode,
    Channel, Institute,
};
use crate::config::{GlobalBlock, HandleTag, RunBlock, RunKind};
use crate::data::{DataProvider, RawRunData};
use crate::error::{Error, Result};
use crate::rrf::RrfTransformer;
use crate::series::AsymmetrySeries;

// external crates
use itertools::Itertools;
use log::{debug, warn};

/// How the companion theory curve of a run is sampled
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum TheoryGrid {
    /// At the data points, with the alpha/beta mapping
    Fit,
    /// Plain theory at `start + i * step`
    View { start: f64, step: f64, size: usize },
    /// Fine theory low-pass filtered and packed like rrf data
    RrfView {
        start: f64,
        step: f64,
        size: usize,
        transformer: RrfTransformer,
        data_step: f64,
    },
}

/// Output of an assembler
#[derive(Debug)]
pub(crate) struct Assembled {
    pub series: AsymmetrySeries,
    pub theory: TheoryGrid,
}

/// Inputs of an assembler
#[derive(Debug)]
pub(crate) struct Prepared<'a> {
    pub run: &'a RunBlock,
    pub global: &'a GlobalBlock,
    pub run_name: String,
    /// Forward channels, one per logical channel after grouping
    pub forward: Vec<Vec<f64>>,
    /// Backward channels, one per logical channel after grouping
    pub backward: Vec<Vec<f64>>,
    pub alignment: ResolvedAlignment,
    pub institute: Institute,
    /// alpha and beta at the starting parameters
    pub alpha_beta: (f64, f64),
}

impl Prepared<'_> {
    pub fn time_resolution(&self) -> f64 {
        self.alignment.time_resolution
    }

    pub fn packing(&self) -> usize {
        self.alignment.packing
    }

    /// Bounds-checked good bins of one side as `(start, end)`
    pub fn good_bins(&self, side: usize) -> Result<(usize, usize)> {
        let length = if side == 0 {
            self.forward[0].len()
        } else {
            self.backward[0].len()
        };
        let (start, end) = (
            self.alignment.good_bins[2 * side],
            self.alignment.good_bins[2 * side + 1],
        );
        check_bin(&self.run_name, "start", start, length)?;
        check_bin(&self.run_name, "end", end, length)?;
        Ok((start as usize, end as usize))
    }
}

pub(crate) fn check_bin(run_name: &str, what: &'static str, bin: i64, length: usize) -> Result<()> {
    if bin < 0 || bin > length as i64 {
        return Err(Error::BinOutOfBounds {
            what,
            run: run_name.to_string(),
            bin,
            length,
        });
    }
    Ok(())
}

/// Collect, add and group the histograms of a run and resolve its alignment
pub(crate) fn prepare<'a, P: DataProvider>(
    run_no: usize,
    run: &'a RunBlock,
    global: &'a GlobalBlock,
    provider: &P,
) -> Result<Prepared<'a>> {
    let run_name = run.run_name().ok_or(Error::MissingRunName(run_no))?.to_string();
    let data = provider
        .run_data(&run_name)
        .ok_or_else(|| Error::RunNotFound(run_name.clone()))?;

    check_histograms(&run_name, run, data)?;

    let time_resolution = data.time_resolution_us();
    debug!("AsymmetryRun::prepare(): run {run_name}: time resolution {time_resolution} us");

    let packing = run
        .packing
        .or(global.packing)
        .filter(|p| *p > 0)
        .ok_or_else(|| Error::MissingPacking(run_name.clone()))?;

    let t0 = resolve_t0(run, global, data)?;

    // copies of the raw histograms, index i is channel 2i / 2i+1 of t0
    let mut forward: Vec<Vec<f64>> = Vec::with_capacity(run.forward_histo.len());
    let mut backward: Vec<Vec<f64>> = Vec::with_capacity(run.backward_histo.len());
    for (f, b) in run.forward_histo.iter().zip(run.backward_histo.iter()) {
        forward.push(histogram_counts(&run_name, data, *f)?);
        backward.push(histogram_counts(&run_name, data, *b)?);
    }

    // add-runs
    let mut add_t0_all = Vec::with_capacity(run.add_run_names().len());
    for (k, add_name) in run.add_run_names().iter().enumerate() {
        let add_data = provider
            .run_data(add_name)
            .ok_or_else(|| Error::AddRunNotFound(add_name.clone()))?;
        let add_t0 = resolve_add_t0(run, k, add_data)?;

        for (i, (f, b)) in run
            .forward_histo
            .iter()
            .zip(run.backward_histo.iter())
            .enumerate()
        {
            let add_f = histogram_counts(add_name, add_data, *f)?;
            let add_b = histogram_counts(add_name, add_data, *b)?;
            add_run(&mut forward[i], &add_f, t0[2 * i], add_t0[2 * i]);
            add_run(&mut backward[i], &add_b, t0[2 * i + 1], add_t0[2 * i + 1]);
        }
        add_t0_all.push(add_t0);
    }

    // grouping, helicity channels of beta-NMR runs are kept apart
    let (forward, backward) = match run.kind {
        RunKind::Bnmr => {
            if forward.len() > 2 {
                warn!("AsymmetryRun::prepare(): run {run_name}: only the first two forward/backward histograms are used as helicity channels");
            }
            (forward, backward)
        }
        _ => {
            let (t0_forward, t0_backward): (Vec<f64>, Vec<f64>) =
                t0.iter().copied().tuples().unzip();
            (
                vec![group_channels(&forward, &t0_forward)],
                vec![group_channels(&backward, &t0_backward)],
            )
        }
    };

    let good_bins = resolve_data_range(
        run,
        global,
        [t0[0], t0[1]],
        [forward[0].len(), backward[0].len()],
        time_resolution,
    )?;

    let (fit_start, fit_end, fit_offsets) =
        resolve_fit_range(run, global, &good_bins, t0[0], time_resolution);

    Ok(Prepared {
        run,
        global,
        run_name,
        forward,
        backward,
        alignment: ResolvedAlignment {
            t0,
            add_t0: add_t0_all,
            good_bins,
            fit_start,
            fit_end,
            fit_offsets,
            time_resolution,
            packing,
            ..Default::default()
        },
        institute: Institute::from_name(&run.institute),
        alpha_beta: (1.0, 1.0),
    })
}

fn check_histograms(run_name: &str, run: &RunBlock, data: &RawRunData) -> Result<()> {
    let (n_forward, n_backward) = (run.forward_histo.len(), run.backward_histo.len());
    if n_forward == 0 || n_backward == 0 {
        return Err(Error::NoHistograms {
            run: run_name.to_string(),
        });
    }

    if n_forward != n_backward {
        return Err(Error::HistogramCountMismatch {
            run: run_name.to_string(),
            forward: n_forward,
            backward: n_backward,
        });
    }

    if run.kind == RunKind::Bnmr && n_forward < 2 {
        return Err(Error::UnexpectedHistogramCount {
            run: run_name.to_string(),
            expected: 2,
            found: n_forward,
        });
    }

    if let Some(histo) = run
        .forward_histo
        .iter()
        .chain(run.backward_histo.iter())
        .find(|h| !data.is_present(**h))
    {
        return Err(Error::HistogramNotPresent {
            run: run_name.to_string(),
            histo: *histo,
        });
    }

    Ok(())
}

fn histogram_counts(run_name: &str, data: &RawRunData, histo_no: usize) -> Result<Vec<f64>> {
    data.histogram(histo_no)
        .map(|h| h.counts.clone())
        .ok_or_else(|| Error::HistogramNotPresent {
            run: run_name.to_string(),
            histo: histo_no,
        })
}

/// Remove the background from the forward and backward channel
pub(crate) fn subtract_background_pair(prepared: &mut Prepared) -> Result<(Channel, Channel)> {
    let t0 = &prepared.alignment.t0;
    let (forward, backward) = (&prepared.forward[0], &prepared.backward[0]);

    match BackgroundMode::resolve(prepared.run, t0[0], t0[1]) {
        BackgroundMode::Fixed(values) => Ok((
            subtract_fixed(forward, BackgroundMode::fixed(&values, 0)?),
            subtract_fixed(backward, BackgroundMode::fixed(&values, 1)?),
        )),
        BackgroundMode::Estimated(range) => {
            let period = prepared.institute.accelerator_period();
            let dt = prepared.time_resolution();
            let bkg_f = estimate_background(forward, range[0], range[1], period, dt)?;
            let bkg_b = estimate_background(backward, range[2], range[3], period, dt)?;

            let corrected = (
                subtract_estimated(forward, bkg_f.value, bkg_f.error),
                subtract_estimated(backward, bkg_b.value, bkg_b.error),
            );

            prepared.alignment.bkg_range = Some(estimated_range(&bkg_f, &bkg_b));
            prepared.alignment.bkg_estimated.forward = Some(bkg_f.value);
            prepared.alignment.bkg_estimated.backward = Some(bkg_b.value);
            Ok(corrected)
        }
    }
}

pub(crate) fn estimated_range(forward: &BackgroundEstimate, backward: &BackgroundEstimate) -> [i64; 4] {
    [
        forward.start as i64,
        forward.end as i64,
        backward.start as i64,
        backward.end as i64,
    ]
}

/// Build the data series of a run for the given kind and tag
pub(crate) fn assemble(prepared: &mut Prepared, tag: HandleTag) -> Result<Assembled> {
    let assembled = match (prepared.run.kind, tag) {
        (RunKind::Asymmetry, HandleTag::Fit) => asymmetry::fit_data(prepared)?,
        (RunKind::Asymmetry, HandleTag::View) => asymmetry::view_data(prepared)?,
        (RunKind::Rrf, HandleTag::Fit) => rrf::fit_data(prepared)?,
        (RunKind::Rrf, HandleTag::View) => rrf::view_data(prepared)?,
        (RunKind::Bnmr, HandleTag::Fit) => bnmr::fit_data(prepared)?,
        (RunKind::Bnmr, HandleTag::View) => bnmr::view_data(prepared)?,
    };

    if assembled.series.is_empty() {
        return Err(Error::EmptyDataSet(prepared.run_name.clone()));
    }
    Ok(assembled)
}

/// Start bins of a view, aligned to the packing grid
///
/// The forward start is moved down to the packing grid and the backward
/// start keeps its offset to the forward start.
pub(crate) fn view_start_bins(fgb: [i64; 2], packing: usize) -> [i64; 2] {
    let p = packing as i64;
    let shift = fgb[1] - fgb[0];
    let mut val = fgb[0] - p * (fgb[0] / p);
    while val + shift < 0 {
        val += p;
    }
    [val, val + shift]
}

/// Theory grid of a plain view
///
/// Eight theory points per data bin, or one with `theory_as_data`.
pub(crate) fn view_theory_grid(series: &AsymmetrySeries, theory_as_data: bool) -> TheoryGrid {
    let factor = if theory_as_data {
        1
    } else {
        crate::constants::THEORY_OVERSAMPLING
    };
    TheoryGrid::View {
        start: series.data_time_start,
        step: series.data_time_step / factor as f64,
        size: series.len() * factor,
    }
}

#[cfg(test)]
mod assemble_tests {
    use super::*;

    #[test]
    fn view_starts_on_packing_grid() {
        assert_eq!(view_start_bins([107, 110], 10), [7, 10]);
        assert_eq!(view_start_bins([107, 100], 10), [7, 0]);
        assert_eq!(view_start_bins([103, 95], 10), [13, 5]);
        assert_eq!(view_start_bins([100, 100], 1), [0, 0]);
    }
}
