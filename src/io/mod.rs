// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! File input and output: filterbank data, channel kill masks and birdie
//! zap lists.

pub mod masks;
pub mod sigproc;
