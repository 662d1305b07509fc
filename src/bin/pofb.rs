//! Field distributions of a vortex lattice over a scan of applied fields
//!
//! Usage: `pofb <config.json>`
//!
//! Every scanned field is solved on its own thread and the distributions
//! are written to stdout as `B P(B)` columns, one block per field.

// standard library
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

// musrtools crates
use musrtools::pofb::{Background, PofB, Weighting};
use musrtools::utils::ValueExt;
use musrtools::vortex::{FilmNglFieldCalc, VortexFieldCalc, VortexLattice, VortexParameters};

// external crates
use kdam::par_tqdm;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Errors of the pofb command line
#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("usage: pofb <config.json>")]
    Usage,

    #[error("failed to read {}", .path.display())]
    Config {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration")]
    Json(#[from] serde_json::Error),

    #[error("failed to write the distributions")]
    Output(#[from] std::io::Error),

    #[error("vortex lattice at {field} G")]
    Vortex {
        field: f64,
        source: musrtools::vortex::Error,
    },

    #[error("field distribution at {field} G")]
    Pofb {
        field: f64,
        source: musrtools::pofb::Error,
    },

    #[error("film depth {depth} is outside of the {steps_z} steps")]
    Depth { depth: usize, steps_z: usize },
}

/// Configuration file of the pofb binary
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PofbConfig {
    lattice: VortexLattice,
    /// Lattice parameters, the field is replaced by every scanned field
    params: VortexParameters,
    /// Time resolution (us)
    dt: f64,
    /// Field resolution (G)
    db: f64,
    #[serde(default)]
    weighting: Weighting,
    #[serde(default)]
    background: Option<Background>,
    /// Gaussian broadening (G)
    #[serde(default)]
    broadening: f64,
    /// Applied fields to scan, the field of `params` if empty
    #[serde(default)]
    fields: Vec<f64>,
    /// Depth slice of film lattices, the middle of the film if missing
    #[serde(default)]
    depth: Option<usize>,
    #[serde(default)]
    quiet: bool,
    #[serde(default)]
    verbose: usize,
}

impl PofbConfig {
    fn scan(&self) -> Vec<f64> {
        if self.fields.is_empty() {
            vec![self.params.field]
        } else {
            self.fields.clone()
        }
    }

    /// Distribution at a single applied field
    fn distribution(&self, field: f64) -> Result<PofB, CliError> {
        let params = VortexParameters {
            field,
            ..self.params
        };
        let vortex = |source: musrtools::vortex::Error| CliError::Vortex { field, source };
        let pofb = |source: musrtools::pofb::Error| CliError::Pofb { field, source };

        let mut distribution = if self.lattice.is_film() {
            let mut solver = FilmNglFieldCalc::new(params).map_err(vortex)?;
            let steps_z = solver.steps_z();
            let depth = self.depth.unwrap_or(steps_z / 2);
            let slice = solver
                .grid()
                .magnitude_slice(depth)
                .ok_or(CliError::Depth { depth, steps_z })?;
            let mut distribution =
                PofB::from_grid(self.dt, self.db, &slice, true, &self.weighting).map_err(pofb)?;
            if let Some(background) = &self.background {
                distribution.add_background(background);
            }
            distribution
        } else {
            let mut solver = self.lattice.bulk_solver(params).map_err(vortex)?;
            PofB::from_lattice(
                self.dt,
                self.db,
                solver.as_mut(),
                &self.weighting,
                self.background.as_ref(),
            )
            .map_err(pofb)?
        };

        distribution.convolve_gss(self.broadening);
        Ok(distribution)
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .ok_or(CliError::Usage)?;

    let file = File::open(&path).map_err(|source| CliError::Config {
        path: path.clone(),
        source,
    })?;
    let config: PofbConfig = serde_json::from_reader(BufReader::new(file))?;

    stderrlog::new()
        .module(module_path!())
        .module("musrtools_vortex")
        .module("musrtools_pofb")
        .quiet(config.quiet)
        .verbosity(config.verbose + 2)
        .init()
        .ok();

    let fields = config.scan();
    log::info!(
        "Scanning {} field(s) of a {:?} lattice from {}",
        fields.len(),
        config.lattice,
        path.display()
    );

    let distributions: Vec<Result<PofB, CliError>> = par_tqdm!(
        fields.par_iter().map(|field| config.distribution(*field)),
        bar_format = "Solving lattices: {count}/{total} [{rate:.2} fields/s]  "
    )
    .collect();
    eprintln!();

    let mut out = BufWriter::new(std::io::stdout().lock());
    for (field, distribution) in fields.iter().zip(distributions) {
        let distribution = distribution?;
        writeln!(out, "# field {} G", field.sci(5, 2))?;
        writeln!(out, "#          B          P(B)")?;
        for (b, p) in distribution.b().iter().zip(distribution.pb()) {
            if *p != 0.0 {
                writeln!(out, "{} {}", b.sci(5, 2), p.sci(5, 2))?;
            }
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod pofb_tests {
    use super::*;

    #[test]
    fn minimal_config() {
        let config: PofbConfig = serde_json::from_str(
            r#"{
                "lattice": "bulk_square",
                "params": { "field": 800.0, "lambda": 150.0, "xi": 5.0, "steps": 32 },
                "dt": 0.01,
                "db": 1.0
            }"#,
        )
        .unwrap();
        assert_eq!(config.weighting, Weighting::Uniform);
        assert_eq!(config.scan(), vec![800.0]);
        assert_eq!(config.broadening, 0.0);

        let pofb = config.distribution(800.0).unwrap();
        let total = pofb.pb().iter().sum::<f64>() * pofb.db();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn film_needs_a_thickness() {
        let config: PofbConfig = serde_json::from_str(
            r#"{
                "lattice": "film_nonlinear_gl",
                "params": { "field": 800.0, "lambda": 150.0, "xi": 5.0, "steps": 32 },
                "dt": 0.01,
                "db": 1.0
            }"#,
        )
        .unwrap();
        assert!(matches!(
            config.distribution(800.0),
            Err(CliError::Vortex { field, .. }) if field == 800.0
        ));
    }
}
