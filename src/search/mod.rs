// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The concurrent search machinery: the acceleration plan, the DM-trial
//! dispenser and the per-thread worker.

pub mod dispenser;
pub mod plan;
pub mod worker;
