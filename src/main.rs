// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::Parser;

use spindrift::cli::Spindrift;

fn main() {
    // clap's default exit code for a parse failure is 2; the pipeline
    // contract is 255, so handle the error ourselves. --help and --version
    // surface here too and must keep exiting 0.
    let cli = match Spindrift::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            e.print().expect("can write to stdout/stderr");
            std::process::exit(if e.use_stderr() { 255 } else { 0 });
        }
    };

    match cli.run() {
        Ok(()) => (),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
