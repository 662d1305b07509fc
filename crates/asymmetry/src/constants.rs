//! Physical and bookkeeping constants

/// Parameter numbers at or above this offset refer to user functions
pub const PARAM_FUN_OFFSET: usize = 20_000;

/// Muon gyromagnetic ratio over 2 pi (MHz/G)
pub const GAMMA_BAR_MUON: f64 = 0.013_553_42;

/// Accelerator period at PSI (us)
pub const ACCEL_PERIOD_PSI: f64 = 0.019_75;

/// Accelerator period at TRIUMF (us)
pub const ACCEL_PERIOD_TRIUMF: f64 = 0.043_37;

/// Pulsed source, no period correction
pub const ACCEL_PERIOD_RAL: f64 = 0.0;

/// Offset after t0 used to estimate a missing first good bin (us)
pub const FGB_OFFSET_FROM_T0: f64 = 10.0e-3;

/// Oversampling of theory curves used for viewing
pub const THEORY_OVERSAMPLING: usize = 8;

/// Theory values above this magnitude are replaced by zero in views
pub const THEORY_CLIP: f64 = 10.0;

/// Stopband attenuation of the rrf theory filter (dB)
pub const RRF_FILTER_ATTENUATION: f64 = 60.0;

/// Relative transition band of the rrf theory filter
pub const RRF_FILTER_TRANSITION: f64 = 0.2;
