// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::io::stdout;
use std::process::ExitCode;

use kms_plugin_setup::logging;
use kms_plugin_setup::shims::setup;

fn main() -> Result<ExitCode, std::io::Error> {
    let mut stdout = stdout();
    let outcome = match setup::parse_opts(std::env::args_os()) {
        Ok(opts) => {
            logging::init(opts.quiet, opts.verbose).map_err(std::io::Error::other)?;
            setup::main(&opts, &mut stdout)?
        }
        Err(err) => setup::report_parse_error(err, &mut stdout)?,
    };
    Ok(outcome.into())
}
