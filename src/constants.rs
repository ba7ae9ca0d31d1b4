// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All floating-point constants are double precision; spindrift does as many
calculations as possible in double precision before narrowing to `f32` for
the sample buffers.
 */

use lazy_static::lazy_static;

lazy_static! {
    /// Speed of light [metres/second]
    pub static ref VEL_C: f64 = 299_792_458.0;

    /// Cold-plasma dispersion constant [s MHz² pc⁻¹ cm³]
    pub static ref DM_CONST: f64 = 4.148808e3;

    /// Per-channel dispersion smearing: `SMEAR_CONST · dm · |foff| / cfreq³`
    /// is the smearing time in seconds with frequencies in MHz.
    pub static ref SMEAR_CONST: f64 = 8.3e3;
}

/// Phase bins used when folding top candidates.
pub const FOLD_PHASE_BINS: usize = 32;

/// How many of the top candidates are folded after distillation.
pub const DEFAULT_FOLD_TOP: usize = 3000;
