//! Resolution of t0, good bins and fit range for a run
//!
//! Values are taken from the run block first, then the global block, then
//! the data file, and finally estimated. Everything used is collected in a
//! [ResolvedAlignment] so that callers can report the concrete numbers
//! without touching the configuration.

// internal modules
use crate::config::{FitRange, GlobalBlock, RunBlock};
use crate::constants::FGB_OFFSET_FROM_T0;
use crate::data::RawRunData;
use crate::error::{Error, Result};

// external crates
use log::{debug, warn};

/// Backgrounds estimated from a pre-t0 window
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct EstimatedBackground {
    /// Forward (positive helicity for beta-NMR)
    pub forward: Option<f64>,
    /// Backward (positive helicity for beta-NMR)
    pub backward: Option<f64>,
    /// Forward negative helicity
    pub forward_minus: Option<f64>,
    /// Backward negative helicity
    pub backward_minus: Option<f64>,
}

/// Every alignment quantity a run was prepared with
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ResolvedAlignment {
    /// t0 per channel, forward/backward interleaved
    pub t0: Vec<f64>,
    /// t0 per channel of every add-run
    pub add_t0: Vec<Vec<f64>>,
    /// Forward start, forward end, backward start, backward end
    pub good_bins: [i64; 4],
    /// Fit start time (us)
    pub fit_start: f64,
    /// Fit end time (us)
    pub fit_end: f64,
    /// Bin offsets the fit range was derived from, if any
    pub fit_offsets: Option<(i64, i64)>,
    /// Background window actually used
    pub bkg_range: Option<[i64; 4]>,
    /// Estimated backgrounds
    pub bkg_estimated: EstimatedBackground,
    /// Time resolution (us)
    pub time_resolution: f64,
    /// Packing used for the data
    pub packing: usize,
}

/// Histogram number behind channel `i` of the interleaved t0 layout
pub(crate) fn channel_histo(run: &RunBlock, i: usize) -> Option<usize> {
    if i % 2 == 0 {
        run.forward_histo.get(i / 2).copied()
    } else {
        run.backward_histo.get(i / 2).copied()
    }
}

/// Resolve t0 for every forward/backward channel of the main run
///
/// The order of precedence is run block, global block, the t0 stored in the
/// data file, and finally the estimated t0. Falling back to the data file
/// is reported as a warning.
pub fn resolve_t0(run: &RunBlock, global: &GlobalBlock, data: &RawRunData) -> Result<Vec<f64>> {
    let run_name = run.run_name().unwrap_or_default();
    let n = 2 * run.forward_histo.len();
    let mut t0: Vec<Option<f64>> = vec![None; n];

    for (slot, value) in t0.iter_mut().zip(run.t0.iter()) {
        *slot = *value;
    }

    for (slot, value) in t0.iter_mut().zip(global.t0.iter()) {
        if slot.is_none() {
            *slot = *value;
        }
    }

    let mut resolved = Vec::with_capacity(n);
    for (i, value) in t0.into_iter().enumerate() {
        let histo_no = channel_histo(run, i).ok_or(Error::NoHistograms {
            run: run_name.to_string(),
        })?;
        let histo = data.histogram(histo_no).ok_or(Error::HistogramNotPresent {
            run: run_name.to_string(),
            histo: histo_no,
        })?;

        let value = match value {
            Some(v) => v,
            None => match histo.stored_t0() {
                Some(v) => {
                    warn!("AlignmentResolver::resolve_t0(): run {run_name}, histo {histo_no}: t0 taken from the data file ({v})");
                    v
                }
                None => {
                    warn!(
                        "AlignmentResolver::resolve_t0(): run {run_name}, histo {histo_no}: t0 not found, using estimated t0 {}",
                        histo.t0_estimated
                    );
                    histo.t0_estimated
                }
            },
        };

        check_t0(run_name, value, histo.len())?;
        resolved.push(value);
    }

    Ok(resolved)
}

/// Resolve t0 for every channel of one add-run
///
/// The add-run t0 from the run block is used if given, otherwise the data
/// file t0 and then the estimated t0.
pub fn resolve_add_t0(
    run: &RunBlock,
    add_index: usize,
    add_data: &RawRunData,
) -> Result<Vec<f64>> {
    let add_name = run
        .add_run_names()
        .get(add_index)
        .map(String::as_str)
        .unwrap_or_default();
    let given = run.add_t0.get(add_index);

    (0..2 * run.forward_histo.len())
        .map(|i| {
            let histo_no = channel_histo(run, i).ok_or(Error::NoHistograms {
                run: add_name.to_string(),
            })?;
            let histo = add_data
                .histogram(histo_no)
                .ok_or(Error::HistogramNotPresent {
                    run: add_name.to_string(),
                    histo: histo_no,
                })?;

            let value = match given.and_then(|t| t.get(i).copied().flatten()) {
                Some(v) => v,
                None => match histo.stored_t0() {
                    Some(v) => v,
                    None => {
                        warn!(
                            "AlignmentResolver::resolve_add_t0(): add-run {add_name}, histo {histo_no}: t0 not found, using estimated t0 {}",
                            histo.t0_estimated
                        );
                        histo.t0_estimated
                    }
                },
            };

            check_t0(add_name, value, histo.len())?;
            Ok(value)
        })
        .collect()
}

fn check_t0(run_name: &str, t0: f64, length: usize) -> Result<()> {
    if t0 < 0.0 || t0 > length as f64 {
        return Err(Error::T0OutOfBounds {
            run: run_name.to_string(),
            t0,
            length,
        });
    }
    Ok(())
}

/// Resolve the first/last good bins of the forward and backward side
///
/// `t0` holds the forward and backward t0 of the first channel pair and
/// `lengths` the corresponding histogram lengths. Missing entries are
/// estimated as `t0 + 10 ns` for the start and the histogram length for the
/// end.
///
/// When the two sides disagree on the offset of the first good bin from t0,
/// the side with the smaller offset is shifted to match the larger one.
pub fn resolve_data_range(
    run: &RunBlock,
    global: &GlobalBlock,
    t0: [f64; 2],
    lengths: [usize; 2],
    time_resolution: f64,
) -> Result<[i64; 4]> {
    let run_name = run.run_name().unwrap_or_default();
    let offset = (FGB_OFFSET_FROM_T0 / time_resolution) as i64;
    let mut bins = [0_i64; 4];

    for (i, bin) in bins.iter_mut().enumerate() {
        let side = i / 2;
        *bin = match run.data_range[i].or(global.data_range[i]) {
            Some(b) => b,
            None => {
                let estimate = if i % 2 == 0 {
                    t0[side] as i64 + offset
                } else {
                    lengths[side] as i64
                };
                warn!(
                    "AlignmentResolver::resolve_data_range(): run {run_name}: no data range given for {}, estimated as {estimate}",
                    ["forward start", "forward end", "backward start", "backward end"][i]
                );
                estimate
            }
        };
    }

    for side in 0..2 {
        let (s, e) = (2 * side, 2 * side + 1);
        let length = lengths[side];

        if bins[e] < bins[s] {
            debug!("AlignmentResolver::resolve_data_range(): swapping reversed data range");
            bins.swap(s, e);
        }

        if bins[s] < 0 || bins[s] > length as i64 {
            return Err(Error::BinOutOfBounds {
                what: "start",
                run: run_name.to_string(),
                bin: bins[s],
                length,
            });
        }

        if bins[e] < 0 {
            return Err(Error::BinOutOfBounds {
                what: "end",
                run: run_name.to_string(),
                bin: bins[e],
                length,
            });
        }

        if bins[e] > length as i64 {
            warn!(
                "AlignmentResolver::resolve_data_range(): run {run_name}: end bin {} beyond histogram length {length}, will set it to {}",
                bins[e],
                length - 1
            );
            bins[e] = length as i64 - 1;
        }

        check_t0(run_name, t0[side], length)?;
    }

    align_good_bins(&mut bins, t0);
    Ok(bins)
}

/// Shift the side closer to t0 so both sides start at the same offset
pub(crate) fn align_good_bins(bins: &mut [i64; 4], t0: [f64; 2]) {
    let forward_offset = (bins[0] as f64 - t0[0]).abs();
    let backward_offset = (bins[2] as f64 - t0[1]).abs();

    if forward_offset > backward_offset {
        let start = (t0[1] + bins[0] as f64 - t0[0]) as i64;
        let end = (t0[1] + bins[1] as f64 - t0[0]) as i64;
        warn!(
            "AlignmentResolver::align_good_bins(): backward start/end shifted from ({}, {}) to ({start}, {end})",
            bins[2], bins[3]
        );
        bins[2] = start;
        bins[3] = end;
    } else if forward_offset < backward_offset {
        let start = (t0[0] + bins[2] as f64 - t0[1]) as i64;
        let end = (t0[0] + bins[3] as f64 - t0[1]) as i64;
        warn!(
            "AlignmentResolver::align_good_bins(): forward start/end shifted from ({}, {}) to ({start}, {end})",
            bins[0], bins[1]
        );
        bins[0] = start;
        bins[1] = end;
    }
}

/// Fit range in time for the given bin offsets
///
/// `fit_start = (fgb + n0 - t0) dt` and `fit_end = (lgb - n1 - t0) dt` with
/// the forward first/last good bin and forward t0.
pub fn fit_range_from_bins(
    good_bins: &[i64; 4],
    t0: f64,
    offsets: (i64, i64),
    time_resolution: f64,
) -> (f64, f64) {
    let start = ((good_bins[0] + offsets.0) as f64 - t0) * time_resolution;
    let end = ((good_bins[1] - offsets.1) as f64 - t0) * time_resolution;
    (start, end)
}

/// Resolve the fit range in time units
///
/// Returns the start, end, and the bin offsets if the range was given in
/// bins. Without any fit range the good bins are used.
pub fn resolve_fit_range(
    run: &RunBlock,
    global: &GlobalBlock,
    good_bins: &[i64; 4],
    t0: f64,
    time_resolution: f64,
) -> (f64, f64, Option<(i64, i64)>) {
    match run.fit_range.or(global.fit_range) {
        Some(FitRange::Time { start, end }) => (start, end, None),
        Some(FitRange::Bins {
            first_offset,
            last_offset,
        }) => {
            let offsets = (first_offset, last_offset);
            let (start, end) = fit_range_from_bins(good_bins, t0, offsets, time_resolution);
            (start, end, Some(offsets))
        }
        None => {
            let (start, end) = fit_range_from_bins(good_bins, t0, (0, 0), time_resolution);
            warn!(
                "AlignmentResolver::resolve_fit_range(): run {}: no fit range given, using good bins ({start}, {end}) us",
                run.run_name().unwrap_or_default()
            );
            (start, end, None)
        }
    }
}
