//! Plain forward/backward asymmetry

// internal modules
use super::{
    check_bin, subtract_background_pair, view_start_bins, view_theory_grid, Assembled, Prepared,
    TheoryGrid,
};
use crate::asymmetry::{build_asymmetry, build_corrected_asymmetry};
use crate::error::Result;
use crate::pack::{pack_channel, packed_time_start};
use crate::series::AsymmetrySeries;

pub(crate) fn fit_data(prepared: &mut Prepared) -> Result<Assembled> {
    let (forward, backward) = subtract_background_pair(prepared)?;
    let (fgb_f, lgb_f) = prepared.good_bins(0)?;
    let (fgb_b, lgb_b) = prepared.good_bins(1)?;
    let packing = prepared.packing();
    let dt = prepared.time_resolution();

    let forward = pack_channel(&forward, fgb_f, lgb_f, packing);
    let backward = pack_channel(&backward, fgb_b, lgb_b, packing);
    let asymmetry = build_asymmetry(&forward, &backward);

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
    let (forward, backward) = subtract_background_pair(prepared)?;
    let packing = prepared
        .global
        .view_packing
        .filter(|p| *p > 0)
        .unwrap_or(prepared.packing());
    let dt = prepared.time_resolution();
    let good_bins = prepared.alignment.good_bins;

    let start = view_start_bins([good_bins[0], good_bins[2]], packing);
    let bins = [forward.len(), backward.len()]
        .iter()
        .zip(start.iter())
        .map(|(len, s)| (*len as i64 - s).max(0) as usize / packing)
        .min()
        .unwrap_or(0);

    for (s, len) in start.iter().zip([forward.len(), backward.len()]) {
        check_bin(&prepared.run_name, "start", *s, len)?;
        check_bin(&prepared.run_name, "end", s + (bins * packing) as i64, len)?;
    }

    let (start_f, start_b) = (start[0] as usize, start[1] as usize);
    let forward = pack_channel(&forward, start_f, start_f + bins * packing, packing);
    let backward = pack_channel(&backward, start_b, start_b + bins * packing, packing);

    let (alpha, beta) = prepared.alpha_beta;
    let asymmetry = build_corrected_asymmetry(&forward, &backward, alpha, beta);

    let series = AsymmetrySeries::new(
        asymmetry.values,
        asymmetry.errors,
        packed_time_start(dt, start[0], prepared.alignment.t0[0], packing),
        dt * packing as f64,
    );
    let theory = view_theory_grid(&series, prepared.global.theory_as_data);

    Ok(Assembled { series, theory })
}
