// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The DM-trial dispenser: a mutex-guarded cursor handing each trial
//! index to exactly one worker, with an optional progress sink written
//! only under the lock.

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::info;

use crate::PROGRESS_BARS;

struct DispenserState {
    next: usize,
    started: bool,
    finished: bool,
}

pub struct TrialDispenser {
    total: usize,
    state: Mutex<DispenserState>,
    progress: ProgressBar,
}

impl TrialDispenser {
    pub fn new(total: usize) -> TrialDispenser {
        let progress = ProgressBar::with_draw_target(
            Some(total as u64),
            if PROGRESS_BARS.load() {
                ProgressDrawTarget::stdout()
            } else {
                ProgressDrawTarget::hidden()
            },
        )
        .with_style(
            ProgressStyle::default_bar()
                .template("{msg:16}: [{wide_bar:.blue}] {pos}/{len} DM trials ({elapsed_precise}<{eta_precise})")
                .unwrap()
                .progress_chars("=> "),
        )
        .with_message("Searching");
        TrialDispenser {
            total,
            state: Mutex::new(DispenserState {
                next: 0,
                started: false,
                finished: false,
            }),
            progress,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Hand out the next unprocessed DM trial index, or `None` once the
    /// trials are exhausted. Each index in `[0, total)` is returned to
    /// exactly one caller.
    pub fn acquire(&self) -> Option<usize> {
        let mut state = self.state.lock().expect("dispenser mutex not poisoned");
        if !state.started {
            state.started = true;
            info!("Releasing {} DM trials to workers", self.total);
            self.progress.tick();
        }
        if state.next >= self.total {
            // Stopping the sink is idempotent across workers draining.
            if !state.finished {
                state.finished = true;
                self.progress.abandon();
            }
            return None;
        }
        let idx = state.next;
        state.next += 1;
        self.progress.inc(1);
        Some(idx)
    }
}
