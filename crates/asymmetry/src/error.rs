//! Result and Error types for musrtools-asymmetry

/// Type alias for Result<T, asymmetry::Error>
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `musrtools-asymmetry` crate
///
/// Every variant is local to the run being prepared. A failing run never
/// affects other runs of the same fit.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("run {0} has no data block")]
    MissingRunName(usize),

    #[error("couldn't get data for run \"{0}\"")]
    RunNotFound(String),

    #[error("couldn't get data for add-run \"{0}\"")]
    AddRunNotFound(String),

    #[error("run \"{run}\" has no histogram {histo}")]
    HistogramNotPresent { run: String, histo: usize },

    #[error("run \"{run}\" has no forward/backward histograms")]
    NoHistograms { run: String },

    #[error(
        "number of forward ({forward}) and backward ({backward}) histograms differ in run \"{run}\""
    )]
    HistogramCountMismatch {
        run: String,
        forward: usize,
        backward: usize,
    },

    #[error("run \"{run}\" needs {expected} forward histograms, found {found}")]
    UnexpectedHistogramCount {
        run: String,
        expected: usize,
        found: usize,
    },

    #[error("no alpha parameter given for run \"{0}\"")]
    MissingAlpha(String),

    #[error("{name} parameter number {number} is out of bounds (only {available} available)")]
    ParameterOutOfBounds {
        name: &'static str,
        number: usize,
        available: usize,
    },

    #[error("no packing found in either the run or global block for run \"{0}\"")]
    MissingPacking(String),

    #[error("rrf runs need a frequency and packing in the global block (run \"{0}\")")]
    MissingRrfSettings(String),

    #[error("{what} bin {bin} is outside of the histogram (0..{length}) of run \"{run}\"")]
    BinOutOfBounds {
        what: &'static str,
        run: String,
        bin: i64,
        length: usize,
    },

    #[error("t0 {t0} is outside of the histogram (0..{length}) of run \"{run}\"")]
    T0OutOfBounds { run: String, t0: f64, length: usize },

    #[error("background range [{start}, {end}] outside of histogram with {length} bins")]
    BackgroundRangeOutOfBounds { start: i64, end: i64, length: usize },

    #[error("no background given for channel {0}")]
    MissingBackground(usize),

    #[error("invalid fit range command \"{0}\"")]
    InvalidFitRangeCommand(String),

    #[error("packed data set of run \"{0}\" is empty")]
    EmptyDataSet(String),
}
