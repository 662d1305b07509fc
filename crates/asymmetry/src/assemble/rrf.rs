//! Asymmetry in a rotating reference frame

// internal modules
use super::{check_bin, subtract_background_pair, Assembled, Prepared, TheoryGrid};
use crate::asymmetry::corrected_asymmetry_value;
use crate::constants::THEORY_OVERSAMPLING;
use crate::error::{Error, Result};
use crate::rrf::RrfTransformer;
use crate::series::AsymmetrySeries;

// external crates
use log::warn;

fn transformer(prepared: &Prepared) -> Result<RrfTransformer> {
    prepared
        .global
        .rrf
        .as_ref()
        .and_then(RrfTransformer::from_settings)
        .ok_or_else(|| Error::MissingRrfSettings(prepared.run_name.clone()))
}

pub(crate) fn fit_data(prepared: &mut Prepared) -> Result<Assembled> {
    let transformer = transformer(prepared)?;
    let (forward, backward) = subtract_background_pair(prepared)?;
    let dt = prepared.time_resolution();
    let t0 = [prepared.alignment.t0[0] as i64, prepared.alignment.t0[1] as i64];
    let gb = prepared.alignment.good_bins;

    // forward and backward may start at different offsets from t0, use the
    // larger of both
    let fgb_offset = (gb[0] - t0[0]).max(gb[2] - t0[1]);
    let lgb_offset = (gb[1] - t0[0] + fgb_offset).max(gb[3] - t0[1] + fgb_offset);

    let fgb = t0[0] + fgb_offset;
    let dt0 = t0[0] - t0[1];

    // both sides have to stay inside their histograms
    let max_lgb = (forward.len() as i64).min(backward.len() as i64 + dt0);
    let mut lgb = fgb + lgb_offset;
    if lgb > max_lgb {
        warn!(
            "RRFTransformer::fit_data(): run {}: last good bin {lgb} beyond the data, will set it to {max_lgb}",
            prepared.run_name
        );
        lgb = max_lgb;
    }
    check_bin(&prepared.run_name, "start", fgb, forward.len())?;
    check_bin(&prepared.run_name, "start", fgb - dt0, backward.len())?;

    let (values, errors): (Vec<f64>, Vec<f64>) = (fgb..lgb.max(fgb))
        .map(|i| {
            let (f, b) = (i as usize, (i - dt0) as usize);
            let (ff, bb) = (forward.values[f], backward.values[b]);
            let (asym, err) = corrected_asymmetry_value(
                ff,
                forward.errors[f],
                bb,
                backward.errors[b],
                1.0,
                1.0,
            );
            let err = if asym != 0.0 && ff + bb > 0.0 { err } else { 1.0 };
            (asym, err)
        })
        .unzip();

    let start_time = dt * fgb_offset as f64;
    let (values, errors) = transformer.transform(&values, &errors, start_time, dt);
    let p = transformer.packing as f64;

    let series = AsymmetrySeries::new(
        values,
        errors,
        start_time + dt * (p - 1.0) / 2.0,
        dt * p,
    );

    Ok(Assembled {
        series,
        theory: TheoryGrid::Fit,
    })
}

pub(crate) fn view_data(prepared: &mut Prepared) -> Result<Assembled> {
    let transformer = transformer(prepared)?;
    let (forward, backward) = subtract_background_pair(prepared)?;
    let dt = prepared.time_resolution();
    let t0_f = prepared.alignment.t0[0];
    let gb = prepared.alignment.good_bins;

    let (start_f, start_b) = (gb[0], gb[2]);
    check_bin(&prepared.run_name, "start", start_f, forward.len())?;
    check_bin(&prepared.run_name, "start", start_b, backward.len())?;

    // same number of bins on both sides
    let bins = (forward.len() as i64 - start_f).min(backward.len() as i64 - start_b) as usize;
    let (start_f, start_b) = (start_f as usize, start_b as usize);

    let (alpha, beta) = prepared.alpha_beta;
    let (values, errors): (Vec<f64>, Vec<f64>) = (0..bins)
        .map(|i| {
            corrected_asymmetry_value(
                forward.values[start_f + i],
                forward.errors[start_f + i],
                backward.values[start_b + i],
                backward.errors[start_b + i],
                alpha,
                beta,
            )
        })
        .unzip();

    let start_time = dt * (start_f as f64 - t0_f);
    let (values, errors) = transformer.transform(&values, &errors, start_time, dt);
    let p = transformer.packing as f64;
    let data_step = dt * p;

    let series = AsymmetrySeries::new(values, errors, start_time + dt * (p - 1.0) / 2.0, data_step);

    let factor = if prepared.global.theory_as_data {
        1
    } else {
        THEORY_OVERSAMPLING
    };
    let theory = TheoryGrid::RrfView {
        start: start_time,
        step: dt / factor as f64,
        size: bins * factor,
        transformer,
        data_step,
    };

    Ok(Assembled { series, theory })
}
