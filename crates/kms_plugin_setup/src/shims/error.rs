// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::error::{ContextKind, ContextValue, ErrorKind};

use crate::bundle::BundleError;

#[derive(Debug, thiserror::Error)]
pub enum SetupCliError {
    #[error("Unrecognized command: {0}")]
    UnrecognizedCommand(String),
    #[error("{0}")]
    Usage(String),
    #[error("Invalid certificate bundle. Error: {0}")]
    InvalidBundle(#[from] BundleError),
}

impl From<clap::Error> for SetupCliError {
    fn from(err: clap::Error) -> Self {
        if err.kind() == ErrorKind::InvalidSubcommand {
            if let Some(ContextValue::String(name)) = err.get(ContextKind::InvalidSubcommand) {
                return Self::UnrecognizedCommand(name.clone());
            }
        }
        Self::Usage(err.render().to_string().trim_end().to_owned())
    }
}
