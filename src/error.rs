// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all spindrift-related errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpindriftError {
    #[error("{0}")]
    InvalidArgs(#[from] crate::cli::InvalidArgsError),

    #[error("{0}")]
    Search(#[from] crate::params::SearchError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
