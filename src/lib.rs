//! `musrtools` is a semi-modular toolkit of fast and reliable libraries for
//! muon spin rotation analysis
//!
#![doc = include_str!("../readme.md")]
#![deny(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

// Re-exports of toolkit crates.
#[doc(inline)]
pub use musrtools_utils as utils;

#[cfg(feature = "asymmetry")]
#[cfg_attr(docsrs, doc(cfg(feature = "asymmetry")))]
#[doc(inline)]
pub use musrtools_asymmetry as asymmetry;

#[cfg(feature = "vortex")]
#[cfg_attr(docsrs, doc(cfg(feature = "vortex")))]
#[doc(inline)]
pub use musrtools_vortex as vortex;

#[cfg(feature = "pofb")]
#[cfg_attr(docsrs, doc(cfg(feature = "pofb")))]
#[doc(inline)]
pub use musrtools_pofb as pofb;
