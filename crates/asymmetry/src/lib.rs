//! Raw muSR histograms to asymmetry data
//!
//! Decay histograms of the forward and backward detectors are aligned,
//! added, grouped, background corrected and packed before being turned into
//! an asymmetry series that a minimiser can compare against a theory.
//!
//! - [AsymmetryRun] - Prepared run data with chi-square and theory evaluation
//!
//! The pipeline is shared by three kinds of run, see [RunKind]:
//!
//! | Kind                  | Description                                            |
//! | --------------------- | ------------------------------------------------------ |
//! | [RunKind::Asymmetry]  | forward/backward asymmetry with alpha/beta correction  |
//! | [RunKind::Rrf]        | asymmetry in a rotating reference frame                |
//! | [RunKind::Bnmr]       | beta-NMR positive minus negative helicity asymmetry    |
//!
//! Every stage is also available on its own, for example
//! [resolve_data_range] for the good bins, [add_run] and [group_channels]
//! for aggregation, [subtract_fixed] and [estimate_background] for the
//! background, and [pack_channel] for rebinning.
//!
//! # Quickstart example
//!
//! ```rust
//! # use musrtools_asymmetry::*;
//! # use std::collections::HashMap;
//! let mut data = RawRunData { time_resolution: 10.0, ..Default::default() };
//! data.histograms.insert(1, Histogram::new(vec![100.0; 500], 20.0));
//! data.histograms.insert(2, Histogram::new(vec![80.0; 500], 20.0));
//! let provider = HashMap::from([("run_2024_0042".to_string(), data)]);
//!
//! let run = RunBlock {
//!     run_names: vec!["run_2024_0042".into()],
//!     forward_histo: vec![1],
//!     backward_histo: vec![2],
//!     alpha: Some(1),
//!     packing: Some(5),
//!     bkg_fix: [Some(0.0), Some(0.0), None, None],
//!     ..Default::default()
//! };
//! let params = [Parameter::new("alpha", 1.0, 0.0), Parameter::new("asym", 0.1, 0.01)];
//!
//! let asym = AsymmetryRun::new(0, HandleTag::Fit, &run, &GlobalBlock::default(), &params, &[], &provider)?;
//!
//! // flat theory given by the second parameter
//! let theory = |_: f64, par: &[f64], _: &[f64]| par[1];
//! let chisq = asym.calc_chi_square(&[1.0, 1.0 / 9.0], &theory, &NoFunctions);
//! assert!(chisq < 1e-20);
//! # Ok::<(), musrtools_asymmetry::Error>(())
//! ```

mod aggregate;
mod alignment;
mod assemble;
mod asymmetry;
mod background;
mod command;
mod config;
mod constants;
mod data;
mod error;
mod kaiser;
mod pack;
mod rrf;
mod run;
mod series;
mod theory;

// flatten public API and inline the documentation
#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use run::AsymmetryRun;

#[doc(inline)]
pub use config::{
    FitRange, GlobalBlock, HandleTag, Parameter, RrfSettings, RrfUnit, RunBlock, RunKind,
};

#[doc(inline)]
pub use data::{DataProvider, Histogram, RawRunData};

#[doc(inline)]
pub use theory::{Functions, NoFunctions, Theory};

#[doc(inline)]
pub use alignment::{
    fit_range_from_bins, resolve_add_t0, resolve_data_range, resolve_fit_range, resolve_t0,
    EstimatedBackground, ResolvedAlignment,
};

#[doc(inline)]
pub use aggregate::{add_run, group_channels, shifted_index};

#[doc(inline)]
pub use background::{
    estimate_background, subtract_estimated, subtract_fixed, BackgroundEstimate,
    BackgroundMode, Channel, Institute,
};

#[doc(inline)]
pub use pack::{pack_channel, pack_rrf, packed_time_start};

#[doc(inline)]
pub use asymmetry::{
    asymmetry_value, build_asymmetry, build_corrected_asymmetry, build_helicity_asymmetry,
    corrected_asymmetry_value, AlphaBetaMode, ParamOrFunc,
};

#[doc(inline)]
pub use rrf::RrfTransformer;

#[doc(inline)]
pub use kaiser::KaiserLowPass;

#[doc(inline)]
pub use series::{AsymmetrySeries, FitBins};

#[doc(inline)]
pub use command::parse_fit_range_bins;

#[doc(inline)]
pub use constants::{
    ACCEL_PERIOD_PSI, ACCEL_PERIOD_RAL, ACCEL_PERIOD_TRIUMF, GAMMA_BAR_MUON, PARAM_FUN_OFFSET,
};
