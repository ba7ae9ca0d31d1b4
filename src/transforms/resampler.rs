// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Time-domain resampling: apply the constant-acceleration warp
//! `t' = t + a·t²/(2c)` so that an accelerating periodic signal becomes
//! stationary.

use crate::constants::VEL_C;

/// Resample `tim` into `out` for acceleration `accel` [m/s²] by linear
/// interpolation; edge samples are clamped.
pub fn resample(tim: &[f32], out: &mut [f32], accel: f64, tsamp: f64) {
    assert_eq!(tim.len(), out.len());
    let n = tim.len();
    if n == 0 {
        return;
    }
    // In sample units the source position for output sample i is
    // i + a·i²·tsamp/(2c).
    let fact = accel * tsamp / (2.0 * *VEL_C);
    let max = (n - 1) as f64;
    for (i, o) in out.iter_mut().enumerate() {
        let i_f = i as f64;
        let x = (i_f + fact * i_f * i_f).clamp(0.0, max);
        let j = x.floor() as usize;
        let frac = (x - j as f64) as f32;
        *o = if frac == 0.0 {
            tim[j]
        } else {
            tim[j] * (1.0 - frac) + tim[j + 1] * frac
        };
    }
}
