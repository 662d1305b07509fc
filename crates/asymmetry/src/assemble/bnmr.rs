//! Beta-NMR helicity difference asymmetry
//!
//! Forward and backward histograms 0 and 1 are the positive and negative
//! helicity channels. They are never grouped.

// internal modules
use super::{check_bin, estimated_range, view_start_bins, Assembled, Prepared, TheoryGrid};
use crate::asymmetry::build_helicity_asymmetry;
use crate::background::{
    estimate_background, subtract_estimated, subtract_fixed, BackgroundMode, Channel,
};
use crate::error::Result;
use crate::pack::{pack_channel, packed_time_start};
use crate::series::AsymmetrySeries;

/// Background corrected channels forward +, forward -, backward +, backward -
fn subtract_background(prepared: &mut Prepared) -> Result<[Channel; 4]> {
    let t0 = &prepared.alignment.t0;
    let raw = [
        &prepared.forward[0],
        &prepared.forward[1],
        &prepared.backward[0],
        &prepared.backward[1],
    ];

    match BackgroundMode::resolve(prepared.run, t0[0], t0[1]) {
        BackgroundMode::Fixed(values) => Ok([
            subtract_fixed(raw[0], BackgroundMode::fixed(&values, 0)?),
            subtract_fixed(raw[1], BackgroundMode::fixed(&values, 1)?),
            subtract_fixed(raw[2], BackgroundMode::fixed(&values, 2)?),
            subtract_fixed(raw[3], BackgroundMode::fixed(&values, 3)?),
        ]),
        BackgroundMode::Estimated(range) => {
            let period = prepared.institute.accelerator_period();
            let bin_width = prepared.time_resolution() * prepared.packing() as f64;

            let fp = estimate_background(raw[0], range[0], range[1], period, bin_width)?;
            let mut fm = estimate_background(raw[1], range[0], range[1], period, bin_width)?;
            let bp = estimate_background(raw[2], range[2], range[3], period, bin_width)?;
            let bm = estimate_background(raw[3], range[2], range[3], period, bin_width)?;

            // forward negative helicity error is derived from the mean of
            // the forward positive helicity window
            fm.error = fp.value.sqrt() / fm.bins() as f64;

            let corrected = [
                subtract_estimated(raw[0], fp.value, fp.error),
                subtract_estimated(raw[1], fm.value, fm.error),
                subtract_estimated(raw[2], bp.value, bp.error),
                subtract_estimated(raw[3], bm.value, bm.error),
            ];

            let estimated = &mut prepared.alignment.bkg_estimated;
            estimated.forward = Some(fp.value);
            estimated.backward = Some(bp.value);
            estimated.forward_minus = Some(fm.value);
            estimated.backward_minus = Some(bm.value);
            prepared.alignment.bkg_range = Some(estimated_range(&fp, &bp));
            Ok(corrected)
        }
    }
}

pub(crate) fn fit_data(prepared: &mut Prepared) -> Result<Assembled> {
    let [fp, fm, bp, bm] = subtract_background(prepared)?;
    let (fgb_f, lgb_f) = prepared.good_bins(0)?;
    let (fgb_b, lgb_b) = prepared.good_bins(1)?;
    let packing = prepared.packing();
    let dt = prepared.time_resolution();

    let fp = pack_channel(&fp, fgb_f, lgb_f, packing);
    let fm = pack_channel(&fm, fgb_f, lgb_f, packing);
    let bp = pack_channel(&bp, fgb_b, lgb_b, packing);
    let bm = pack_channel(&bm, fgb_b, lgb_b, packing);
    let asymmetry = build_helicity_asymmetry([&fp, &fm], [&bp, &bm], 1.0, 1.0);

    let series = AsymmetrySeries::new(
        asymmetry.values,
        asymmetry.errors,
        packed_time_start(dt, fgb_f as i64, prepared.alignment.t0[0], packing),
        dt * packing as f64,
    );

    Ok(Assembled {
        series,
        theory: TheoryGrid::Fit,
    })
}

pub(crate) fn view_data(prepared: &mut Prepared) -> Result<Assembled> {
    let [fp, fm, bp, bm] = subtract_background(prepared)?;
    let packing = prepared
        .global
        .view_packing
        .filter(|p| *p > 0)
        .unwrap_or(prepared.packing());
    let dt = prepared.time_resolution();
    let good_bins = prepared.alignment.good_bins;

    let start = view_start_bins([good_bins[0], good_bins[2]], packing);
    let lengths = [fp.len(), bp.len()];
    let bins = lengths
        .iter()
        .zip(start.iter())
        .map(|(len, s)| (*len as i64 - s).max(0) as usize / packing)
        .min()
        .unwrap_or(0);

    for (s, len) in start.iter().zip(lengths) {
        check_bin(&prepared.run_name, "start", *s, len)?;
        check_bin(&prepared.run_name, "end", s + (bins * packing) as i64, len)?;
    }

    let (start_f, start_b) = (start[0] as usize, start[1] as usize);
    let (end_f, end_b) = (start_f + bins * packing, start_b + bins * packing);
    let fp = pack_channel(&fp, start_f, end_f, packing);
    let fm = pack_channel(&fm, start_f, end_f, packing);
    let bp = pack_channel(&bp, start_b, end_b, packing);
    let bm = pack_channel(&bm, start_b, end_b, packing);

    let (alpha, beta) = prepared.alpha_beta;
    let asymmetry = build_helicity_asymmetry([&fp, &fm], [&bp, &bm], alpha, beta);

    let series = AsymmetrySeries::new(
        asymmetry.values,
        asymmetry.errors,
        packed_time_start(dt, start[0], prepared.alignment.t0[0], packing),
        dt * packing as f64,
    );

    // at least ten theory points per data bin, unless theory as data
    let theory = if prepared.global.theory_as_data {
        TheoryGrid::View {
            start: series.data_time_start,
            step: series.data_time_step,
            size: series.len(),
        }
    } else {
        let histo_len = lengths[0];
        let (size, factor) = if series.len() * 10 > histo_len {
            let size = series.len() * 10;
            (size, histo_len as f64 / size as f64)
        } else {
            (histo_len, 1.0)
        };
        TheoryGrid::View {
            start: series.data_time_start,
            step: dt * factor,
            size,
        }
    };

    Ok(Assembled { series, theory })
}
