// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decoding of a single bundle entry into PEM text.
//!
//! Entries are base64 of the PEM file contents. Decoding is lenient in the
//! same places the KeyControl tooling is:
//!
//! - bytes outside the base64 alphabet (such as the line breaks of wrapped
//!   base64) are skipped,
//! - a `=` only counts once it completes the current quantum, so stray
//!   padding is skipped and anything after a completed quantum is ignored,
//! - non-zero trailing bits are tolerated.
//!
//! Input that ends part way through a quantum without padding is rejected.

use base64::alphabet;
use base64::engine::{GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Bytes trimmed from both ends of a decoded certificate.
const PEM_PADDING: &[u8] = b" \t\n\r\x0b\x0c";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DecodeError {
    #[error("incorrect padding")]
    IncorrectPadding,
    #[error("{0}")]
    Base64(#[from] base64::DecodeError),
    #[error("decoded contents are not valid UTF-8 ({0})")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Decodes a base64 bundle entry, strips surrounding whitespace and returns the text.
pub fn decode_certificate(encoded: &str) -> Result<String, DecodeError> {
    let canonical = canonical_base64(encoded)?;
    let raw = LENIENT_STANDARD.decode(canonical)?;
    let text = String::from_utf8(strip_padding(&raw).to_vec())?;
    Ok(text)
}

/// Collects the alphabet bytes of `encoded` into correctly padded base64.
fn canonical_base64(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    let mut data = Vec::with_capacity(encoded.len());
    let mut pads = 0;
    for b in encoded.bytes() {
        if b == b'=' {
            let quad_pos = data.len() % 4;
            if quad_pos >= 2 {
                pads += 1;
                if quad_pos + pads >= 4 {
                    data.resize(data.len() + 4 - quad_pos, b'=');
                    return Ok(data);
                }
            }
            continue;
        }
        if b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/') {
            pads = 0;
            data.push(b);
        }
    }
    if data.len() % 4 != 0 {
        return Err(DecodeError::IncorrectPadding);
    }
    Ok(data)
}

fn strip_padding(bytes: &[u8]) -> &[u8] {
    let is_padding = |b: &u8| PEM_PADDING.contains(b);
    let start = bytes
        .iter()
        .position(|b| !is_padding(b))
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !is_padding(b))
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}
