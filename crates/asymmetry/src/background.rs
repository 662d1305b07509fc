//! Background subtraction with Poisson error propagation

// internal modules
use crate::config::RunBlock;
use crate::constants::{ACCEL_PERIOD_PSI, ACCEL_PERIOD_RAL, ACCEL_PERIOD_TRIUMF};
use crate::error::{Error, Result};

// external crates
use log::{debug, info, warn};
use musrtools_utils::SliceExt;

/// Working channel of values and errors
///
/// Both vectors always have the same length.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Channel {
    /// Background corrected counts
    pub values: Vec<f64>,
    /// Error on every value
    pub errors: Vec<f64>,
}

impl Channel {
    /// Number of bins
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if there are no bins
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Facility the data was taken at
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Institute {
    /// Paul Scherrer Institute
    Psi,
    /// ISIS/RAL, a pulsed source
    Ral,
    /// TRIUMF
    Triumf,
    /// Anything else
    #[default]
    Unknown,
}

impl Institute {
    /// Find the institute in a free-form facility string
    ///
    /// ```rust
    /// # use musrtools_asymmetry::Institute;
    /// assert_eq!(Institute::from_name("PSI/LEM"), Institute::Psi);
    /// assert_eq!(Institute::from_name("triumf"), Institute::Triumf);
    /// assert_eq!(Institute::from_name("jparc"), Institute::Unknown);
    /// ```
    pub fn from_name(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.contains("psi") {
            Self::Psi
        } else if name.contains("ral") {
            Self::Ral
        } else if name.contains("triumf") {
            Self::Triumf
        } else {
            Self::Unknown
        }
    }

    /// Accelerator period (us), zero if unknown or irrelevant
    pub fn accelerator_period(&self) -> f64 {
        match self {
            Self::Psi => ACCEL_PERIOD_PSI,
            Self::Ral => ACCEL_PERIOD_RAL,
            Self::Triumf => ACCEL_PERIOD_TRIUMF,
            Self::Unknown => 0.0,
        }
    }
}

/// How the background of a run is removed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackgroundMode {
    /// Fixed values per channel
    Fixed([Option<f64>; 4]),
    /// Estimated from the window forward start/end, backward start/end
    Estimated([i64; 4]),
}

impl BackgroundMode {
    /// Decide between fixed and estimated background for a run
    ///
    /// Without a fixed background or a complete background range the window
    /// is set to `[0.1 t0, 0.6 t0]` for each side.
    pub fn resolve(run: &RunBlock, t0_forward: f64, t0_backward: f64) -> Self {
        if run.bkg_fix[0].is_some() {
            return Self::Fixed(run.bkg_fix);
        }

        if let [Some(a), Some(b), Some(c), Some(d)] = run.bkg_range {
            if a >= 0 {
                return Self::Estimated([a, b, c, d]);
            }
        }

        let range = [
            (t0_forward * 0.1) as i64,
            (t0_forward * 0.6) as i64,
            (t0_backward * 0.1) as i64,
            (t0_backward * 0.6) as i64,
        ];
        warn!(
            "BackgroundSubtractor::resolve(): run {}: neither fix background nor background bins are given, will try {range:?}",
            run.run_name().unwrap_or_default()
        );
        Self::Estimated(range)
    }

    /// Fixed background of channel `index`
    pub fn fixed(values: &[Option<f64>; 4], index: usize) -> Result<f64> {
        values
            .get(index)
            .copied()
            .flatten()
            .ok_or(Error::MissingBackground(index))
    }
}

/// Subtract a constant background
///
/// The error is the Poisson error of the raw count, or 1 for an empty bin.
///
/// ```rust
/// # use musrtools_asymmetry::subtract_fixed;
/// let channel = subtract_fixed(&[100.0, 0.0], 4.0);
/// assert_eq!(channel.values, vec![96.0, -4.0]);
/// assert_eq!(channel.errors, vec![10.0, 1.0]);
/// ```
pub fn subtract_fixed(counts: &[f64], bkg: f64) -> Channel {
    let errors = counts
        .iter()
        .map(|&c| if c != 0.0 { c.sqrt() } else { 1.0 })
        .collect();
    let values = counts.iter().map(|c| c - bkg).collect();
    Channel { values, errors }
}

/// Background estimated from a window of a histogram
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct BackgroundEstimate {
    /// Mean count per bin over the window
    pub value: f64,
    /// Error on the mean
    pub error: f64,
    /// First bin of the window used
    pub start: usize,
    /// Last bin of the window used (inclusive)
    pub end: usize,
    /// Sum of the counts over the window
    pub sum: f64,
}

impl BackgroundEstimate {
    /// Number of bins in the window
    pub fn bins(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Estimate the background of a histogram over `[start, end]`
///
/// For a non-zero accelerator `period` the window end is moved so that the
/// window covers a whole number of beam cycles. `bin_width` is the time width
/// of one window bin in us.
///
/// A reversed window is swapped first. When the window is shorter than one
/// cycle the swapped end is kept, so a reversed short window still covers
/// the configured bins.
pub fn estimate_background(
    counts: &[f64],
    start: i64,
    end: i64,
    period: f64,
    bin_width: f64,
) -> Result<BackgroundEstimate> {
    let (start, mut end) = if end < start {
        debug!("BackgroundSubtractor::estimate_background(): end = {end} > start = {start}, will swap them");
        (end, start)
    } else {
        (start, end)
    };

    if period != 0.0 {
        let window = (end - start) as f64 * bin_width;
        let full_cycles = (window / period).floor();
        let snapped = start + (full_cycles * period / bin_width) as i64;
        if snapped != start {
            end = snapped;
        }
    }

    let out_of_bounds = || Error::BackgroundRangeOutOfBounds {
        start,
        end,
        length: counts.len(),
    };
    if start < 0 || end < 0 {
        return Err(out_of_bounds());
    }

    let window = counts
        .try_window(start as usize, end as usize)
        .map_err(|_| out_of_bounds())?;
    let sum: f64 = window.iter().sum();
    let n = window.len() as f64;

    let estimate = BackgroundEstimate {
        value: sum / n,
        error: sum.sqrt() / n,
        start: start as usize,
        end: end as usize,
        sum,
    };
    info!(
        "BackgroundSubtractor::estimate_background(): background {} +- {} over bins [{}, {}]",
        estimate.value, estimate.error, estimate.start, estimate.end
    );
    Ok(estimate)
}

/// Subtract an estimated background
///
/// The error adds the background error in quadrature to the Poisson error of
/// the raw count, and is 1 for bins without positive counts.
pub fn subtract_estimated(counts: &[f64], bkg: f64, bkg_error: f64) -> Channel {
    let errors = counts
        .iter()
        .map(|&c| {
            if c > 0.0 {
                (c + bkg_error * bkg_error).sqrt()
            } else {
                1.0
            }
        })
        .collect();
    let values = counts.iter().map(|c| c - bkg).collect();
    Channel { values, errors }
}
