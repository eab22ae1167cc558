// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Maps the `--quiet` / `--verbose` flags to a maximum log level.
/// Certificates go to stdout, so the default only lets warnings through.
pub fn max_level(quiet: bool, verbose: u8) -> Level {
    match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, 2) => Level::DEBUG,
        (false, _) => Level::TRACE,
    }
}

/// Installs a stderr subscriber as the global default. Fails if a global
/// default has already been installed.
pub fn init(quiet: bool, verbose: u8) -> Result<(), SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_max_level(max_level(quiet, verbose))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}
