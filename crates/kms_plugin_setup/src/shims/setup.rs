// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command line surface for displaying the certificates in a KeyControl bundle

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{crate_version, ArgAction, CommandFactory, Parser, Subcommand};

use super::error::SetupCliError;
use crate::bundle::{render_certificates, CertSelection};

#[derive(Debug, Parser)]
#[clap(
    name = "kms-plugin-setup",
    about = "KMS Plugin Setup",
    long_about = "Displays the certificates held in a certificate bundle downloaded from KeyControl, for use when configuring the KMS plugin.",
    version = crate_version!(),
    disable_help_subcommand = true
)]
pub struct SetupOpts {
    #[clap(subcommand)]
    pub command: SetupCommand,
    #[clap(
        global = true,
        short,
        long,
        help = "Suppress warnings and only log errors."
    )]
    pub quiet: bool,
    #[clap(
        global = true,
        short,
        long,
        action = ArgAction::Count,
        help = "Increase log verbosity, can be used multiple times. Logs are written to stderr."
    )]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum SetupCommand {
    /// Display SSL certificate for KMS Plugin
    #[clap(name = "show_client_cert")]
    ShowClientCert {
        #[clap(help = "Certificate bundle downloaded from KeyControl")]
        cert_bundle: PathBuf,
    },
    /// Display CA certificate to verify KeyControl
    #[clap(name = "show_ca_cert")]
    ShowCaCert {
        #[clap(help = "Certificate bundle downloaded from KeyControl")]
        cert_bundle: PathBuf,
    },
}

impl SetupCommand {
    pub fn cert_bundle(&self) -> &Path {
        match self {
            Self::ShowClientCert { cert_bundle } | Self::ShowCaCert { cert_bundle } => cert_bundle,
        }
    }

    pub fn selection(&self) -> CertSelection {
        match self {
            Self::ShowClientCert { .. } => CertSelection::CLIENT,
            Self::ShowCaCert { .. } => CertSelection::CA,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Failure => ExitCode::from(1),
        }
    }
}

pub fn parse_opts<I, T>(args: I) -> Result<SetupOpts, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    SetupOpts::try_parse_from(args)
}

/// Writes the outcome of a failed parse to `stdout`. `--help` and `--version`
/// arrive here as well and are not failures.
pub fn report_parse_error<W: Write>(
    err: clap::Error,
    stdout: &mut W,
) -> Result<Outcome, std::io::Error> {
    if !err.use_stderr() {
        write!(stdout, "{}", err.render())?;
        return Ok(Outcome::Success);
    }
    match SetupCliError::from(err) {
        err @ SetupCliError::UnrecognizedCommand(_) => {
            writeln!(stdout, "{err}")?;
            write!(stdout, "{}", SetupOpts::command().render_help())?;
        }
        err => writeln!(stdout, "{err}")?,
    }
    Ok(Outcome::Failure)
}

pub fn main<W: Write>(opts: &SetupOpts, stdout: &mut W) -> Result<Outcome, std::io::Error> {
    match run(opts) {
        Ok(display_text) => {
            write!(stdout, "{display_text}")?;
            Ok(Outcome::Success)
        }
        Err(err) => {
            writeln!(stdout, "{err}")?;
            Ok(Outcome::Failure)
        }
    }
}

fn run(opts: &SetupOpts) -> Result<String, SetupCliError> {
    let display_text = render_certificates(opts.command.cert_bundle(), opts.command.selection())?;
    Ok(display_text)
}
