//! Asymmetry series on an arithmetic time axis

// external crates
use musrtools_utils::{SliceExt, ValueExt};

/// Asymmetry values and errors with an optional companion theory curve
///
/// The data time axis is `data_time_start + i * data_time_step`, and the
/// theory has its own start and step so it may be sampled more finely.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AsymmetrySeries {
    /// Asymmetry per bin
    pub values: Vec<f64>,
    /// Error per bin
    pub errors: Vec<f64>,
    /// Time of the first bin (us)
    pub data_time_start: f64,
    /// Time between bins (us)
    pub data_time_step: f64,
    /// Theory curve, empty until calculated
    pub theory: Vec<f64>,
    /// Time of the first theory point (us)
    pub theory_time_start: f64,
    /// Time between theory points (us)
    pub theory_time_step: f64,
}

/// Half-open range of bins used by the chi-square
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FitBins {
    /// First bin used
    pub start: usize,
    /// One past the last bin used
    pub end: usize,
}

impl FitBins {
    /// Number of bins in the fit
    pub fn count(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

impl AsymmetrySeries {
    /// New series from values and errors on a time axis
    pub fn new(values: Vec<f64>, errors: Vec<f64>, start: f64, step: f64) -> Self {
        Self {
            values,
            errors,
            data_time_start: start,
            data_time_step: step,
            ..Default::default()
        }
    }

    /// Number of data bins
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if there is no data
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Time of data bin `i` (us)
    pub fn time(&self, i: usize) -> f64 {
        self.data_time_start + i as f64 * self.data_time_step
    }

    /// Time of theory point `i` (us)
    pub fn theory_time(&self, i: usize) -> f64 {
        self.theory_time_start + i as f64 * self.theory_time_step
    }

    /// Bins covered by the fit range `[fit_start, fit_end]`
    ///
    /// The start bin is the first bin at or after `fit_start`, and the end bin
    /// is one past the last bin at or before `fit_end`, clamped to the data.
    ///
    /// ```rust
    /// # use musrtools_asymmetry::AsymmetrySeries;
    /// let series = AsymmetrySeries::new(vec![0.0; 10], vec![1.0; 10], 0.0, 0.5);
    /// let bins = series.fit_bins(0.9, 2.5);
    /// assert_eq!((bins.start, bins.end, bins.count()), (2, 6, 4));
    /// assert_eq!(series.fit_bins(-3.0, 30.0).count(), 10);
    /// ```
    pub fn fit_bins(&self, fit_start: f64, fit_end: f64) -> FitBins {
        let start = ((fit_start - self.data_time_start) / self.data_time_step).ceil();
        let end = ((fit_end - self.data_time_start) / self.data_time_step).floor() + 1.0;

        let start = if start < 0.0 { 0 } else { start as usize };
        let end = if end < 0.0 {
            0
        } else {
            (end as usize).min(self.len())
        };
        FitBins { start, end }
    }
}

impl std::fmt::Display for AsymmetrySeries {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(f, "Asymmetry series:")?;
        writeln!(f, "  bins        : {}", self.len())?;
        writeln!(f, "  time start  : {} us", self.data_time_start.sci(5, 2))?;
        writeln!(f, "  time step   : {} us", self.data_time_step.sci(5, 2))?;
        match (self.values.try_min(), self.values.try_max()) {
            (Ok(min), Ok(max)) => {
                writeln!(f, "  asymmetry   : {} to {}", min.sci(5, 2), max.sci(5, 2))?
            }
            (Err(e), _) | (_, Err(e)) => writeln!(f, "  asymmetry   : {e}")?,
        }
        write!(f, "  theory      : {} points", self.theory.len())?;
        if !self.theory.is_empty() {
            write!(
                f,
                " from {} us every {} us",
                self.theory_time_start.sci(5, 2),
                self.theory_time_step.sci(5, 2)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod series_tests {
    use super::*;

    #[test]
    fn fit_bins_empty_when_reversed() {
        let series = AsymmetrySeries::new(vec![0.0; 10], vec![1.0; 10], 0.0, 1.0);
        let bins = series.fit_bins(6.0, 2.0);
        assert_eq!(bins.count(), 0);
    }

    #[test]
    fn fit_bins_offset_axis() {
        let series = AsymmetrySeries::new(vec![0.0; 20], vec![1.0; 20], 0.25, 0.1);
        let bins = series.fit_bins(0.0, 1.0);
        assert_eq!(bins.start, 0);
        assert_eq!(bins.end, 8);
    }

    #[test]
    fn display_mentions_theory() {
        let mut series = AsymmetrySeries::new(vec![0.0; 2], vec![1.0; 2], 0.0, 1.0);
        assert!(!series.to_string().contains(" from "));
        series.theory = vec![0.0; 16];
        series.theory_time_step = 0.125;
        assert!(series.to_string().contains("16 points from"));
    }

    #[test]
    fn display_value_range() {
        let series = AsymmetrySeries::new(vec![0.2, -0.1, 0.05], vec![0.01; 3], 0.0, 0.1);
        assert!(series
            .to_string()
            .contains("asymmetry   : -1.00000e-01 to 2.00000e-01"));

        let series = AsymmetrySeries::new(vec![0.2, f64::NAN], vec![0.01; 2], 0.0, 0.1);
        assert!(series.to_string().contains("asymmetry   : NaN or infinite values"));

        let series = AsymmetrySeries::new(vec![], vec![], 0.0, 0.1);
        assert!(series.to_string().contains("asymmetry   : no values"));
    }
}
