// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The transform stages of the per-trial search pipeline, plus the
//! end-of-pipeline distillation, scoring and folding.

pub mod distill;
pub mod fft;
pub mod fold;
pub mod harmonics;
pub mod peaks;
pub mod rednoise;
pub mod resampler;
pub mod score;
pub mod spectrum;
pub mod zapper;
