//! Run and global configuration blocks
//!
//! These mirror what a fit description provides for each run. Anything not
//! given is `None`, and resolution against the global block, the data file,
//! or an estimate happens during data preparation.

// external crates
use serde::{Deserialize, Serialize};

/// Which asymmetry pipeline a run goes through
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    /// Plain forward/backward asymmetry
    #[default]
    Asymmetry,
    /// Asymmetry in a rotating reference frame
    Rrf,
    /// Beta-NMR positive/negative helicity difference
    Bnmr,
}

/// Whether data is prepared for fitting or for viewing
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleTag {
    /// Packed data for chi-square evaluation
    #[default]
    Fit,
    /// Data for plotting next to a finer theory curve
    View,
}

/// Fit range given either in time or as bin offsets from the good bins
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitRange {
    /// Start and end time (us)
    Time {
        /// Fit start time (us)
        start: f64,
        /// Fit end time (us)
        end: f64,
    },
    /// `fgb+n0` and `lgb-n1`
    Bins {
        /// Offset added to the first good bin
        first_offset: i64,
        /// Offset subtracted from the last good bin
        last_offset: i64,
    },
}

/// Units the rrf frequency is given in
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RrfUnit {
    /// Frequency in kHz
    #[serde(rename = "kHz")]
    KHz,
    /// Frequency in MHz
    #[default]
    #[serde(rename = "MHz")]
    MHz,
    /// Angular frequency in rad/us
    #[serde(rename = "Mc")]
    Mc,
    /// Muon Larmor frequency of a field in Gauss
    #[serde(rename = "G")]
    G,
    /// Muon Larmor frequency of a field in Tesla
    #[serde(rename = "T")]
    T,
    /// Muon Larmor frequency of a field in milli-Tesla
    #[serde(rename = "mT")]
    MilliTesla,
}

/// Rotating reference frame settings of the global block
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RrfSettings {
    /// Rrf frequency, in `unit`
    pub frequency: f64,
    /// Unit of `frequency`
    #[serde(default)]
    pub unit: RrfUnit,
    /// Rrf phase (degrees)
    #[serde(default)]
    pub phase: f64,
    /// Packing applied after the rrf transform
    pub packing: Option<usize>,
}

/// Single fit parameter
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Current value
    pub value: f64,
    /// Step, zero for a fixed parameter
    pub step: f64,
}

impl Parameter {
    /// Convenience constructor
    ///
    /// ```rust
    /// # use musrtools_asymmetry::Parameter;
    /// let alpha = Parameter::new("alpha", 1.0, 0.0);
    /// assert!(alpha.is_fixed());
    /// ```
    pub fn new(name: &str, value: f64, step: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            step,
        }
    }

    /// True if the minimiser never changes this parameter
    pub fn is_fixed(&self) -> bool {
        self.step == 0.0
    }
}

/// Settings of a single run
///
/// The `t0` vector interleaves forward and backward channels: index `2i` is
/// forward histogram `i` and `2i+1` is backward histogram `i`. The same layout
/// is used for every entry of `add_t0`, one vector per add-run.
///
/// Four-element arrays are ordered forward start, forward end, backward start,
/// backward end. Fixed backgrounds of beta-NMR runs are ordered forward +,
/// forward -, backward +, backward -.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunBlock {
    /// Main run followed by any add-runs
    pub run_names: Vec<String>,
    /// Facility string, used to find the accelerator period
    pub institute: String,
    /// Pipeline for this run
    pub kind: RunKind,
    /// Forward histogram numbers
    pub forward_histo: Vec<usize>,
    /// Backward histogram numbers
    pub backward_histo: Vec<usize>,
    /// Alpha parameter (or function) number
    pub alpha: Option<usize>,
    /// Beta parameter (or function) number
    pub beta: Option<usize>,
    /// Packing of the run, overrides the global packing
    pub packing: Option<usize>,
    /// t0 per channel
    pub t0: Vec<Option<f64>>,
    /// t0 per channel of each add-run
    pub add_t0: Vec<Vec<Option<f64>>>,
    /// First/last good bins
    pub data_range: [Option<i64>; 4],
    /// Fixed background per channel
    pub bkg_fix: [Option<f64>; 4],
    /// Background estimation window
    pub bkg_range: [Option<i64>; 4],
    /// Fit range
    pub fit_range: Option<FitRange>,
}

/// Settings shared by every run of a fit
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalBlock {
    /// t0 per channel
    pub t0: Vec<Option<f64>>,
    /// First/last good bins
    pub data_range: [Option<i64>; 4],
    /// Fit range
    pub fit_range: Option<FitRange>,
    /// Packing used when a run does not give one
    pub packing: Option<usize>,
    /// Rotating reference frame settings
    pub rrf: Option<RrfSettings>,
    /// Packing used for views, overrides the run packing
    pub view_packing: Option<usize>,
    /// Evaluate view theory only at the data points
    pub theory_as_data: bool,
}

impl RunBlock {
    /// Name of the main run
    pub fn run_name(&self) -> Option<&str> {
        self.run_names.first().map(String::as_str)
    }

    /// Names of the add-runs
    pub fn add_run_names(&self) -> &[String] {
        self.run_names.get(1..).unwrap_or(&[])
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn add_run_names() {
        let run = RunBlock {
            run_names: vec!["2023_0101".into(), "2023_0102".into()],
            ..Default::default()
        };
        assert_eq!(run.run_name(), Some("2023_0101"));
        assert_eq!(run.add_run_names(), &["2023_0102".to_string()]);
        assert!(RunBlock::default().add_run_names().is_empty());
    }
}
