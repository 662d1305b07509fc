//! Result and Error types for musrtools-pofb

/// Type alias for Result<T, pofb::Error>
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `musrtools-pofb` crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("time ({dt} us) and field ({db} G) resolutions must be positive")]
    InvalidResolution { dt: f64, db: f64 },

    #[error("field ({b}) and probability ({pb}) arrays differ in length")]
    LengthMismatch { b: usize, pb: usize },

    #[error("a distribution needs at least two bins, found {0}")]
    TooFewBins(usize),

    #[error("bin range {min}..={max} is outside of the {len} bins")]
    RangeOutOfBounds { min: usize, max: usize, len: usize },
}
