//! Raw run data as delivered by a data file reader

// standard library
use std::collections::{BTreeMap, HashMap};

// external crates
use serde::{Deserialize, Serialize};

/// Raw decay histogram of a single detector
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Counts per time bin
    pub counts: Vec<f64>,
    /// t0 stored in the data file, non-positive values count as missing
    pub t0: f64,
    /// t0 estimated from the prompt peak
    pub t0_estimated: f64,
}

impl Histogram {
    /// New histogram with an estimated t0 and no stored t0
    pub fn new(counts: Vec<f64>, t0_estimated: f64) -> Self {
        Self {
            counts,
            t0: 0.0,
            t0_estimated,
        }
    }

    /// Set the t0 stored in the data file
    pub fn with_t0(mut self, t0: f64) -> Self {
        self.t0 = t0;
        self
    }

    /// Number of time bins
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// True if there are no bins
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The stored t0 if it is usable
    pub fn stored_t0(&self) -> Option<f64> {
        (self.t0 > 0.0).then_some(self.t0)
    }
}

/// All histograms and metadata of a run
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRunData {
    /// Histograms by histogram number
    pub histograms: BTreeMap<usize, Histogram>,
    /// Time resolution (ns)
    pub time_resolution: f64,
    /// Applied field (G)
    pub field: Option<f64>,
    /// Implantation energy (keV)
    pub energy: Option<f64>,
    /// Sample temperatures (K)
    pub temperatures: Vec<f64>,
}

impl RawRunData {
    /// Histogram with the given number, if present
    pub fn histogram(&self, histo_no: usize) -> Option<&Histogram> {
        self.histograms.get(&histo_no)
    }

    /// True if the histogram exists in the run
    pub fn is_present(&self, histo_no: usize) -> bool {
        self.histograms.contains_key(&histo_no)
    }

    /// Time resolution (us)
    pub fn time_resolution_us(&self) -> f64 {
        self.time_resolution * 1.0e-3
    }
}

/// Anything able to look up run data by run name
pub trait DataProvider {
    /// Data of the named run, if it could be read
    fn run_data(&self, run_name: &str) -> Option<&RawRunData>;
}

impl DataProvider for HashMap<String, RawRunData> {
    fn run_data(&self, run_name: &str) -> Option<&RawRunData> {
        self.get(run_name)
    }
}

impl DataProvider for BTreeMap<String, RawRunData> {
    fn run_data(&self, run_name: &str) -> Option<&RawRunData> {
        self.get(run_name)
    }
}
