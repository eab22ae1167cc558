// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The certificate bundle downloaded from KeyControl.
//!
//! A bundle is a JSON document whose `certificates` object maps file names to
//! base64-encoded PEM files:
//!
//! ```json
//! {
//!   "certificates": {
//!     "kmsplugin.pem": "LS0tLS1CRUdJTi...",
//!     "cacert.pem": "LS0tLS1CRUdJTi..."
//!   }
//! }
//! ```
//!
//! The entry named [`CA_CERT_FILENAME`] is the CA certificate. Every other
//! entry is a candidate client certificate, and when there are several the
//! last one in document order is used. Bundles are not expected to hold more
//! than one client certificate, but nothing in the format prevents it, so
//! that case is logged rather than rejected.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::decode::{decode_certificate, DecodeError};

pub const CA_CERT_FILENAME: &str = "cacert.pem";

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("Unable to read from {0:?}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("Unexpected bundle contents: {0}")]
    Format(#[from] serde_json::Error),
    #[error("Unable to decode certificate {0:?}: {1}")]
    Decode(String, DecodeError),
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CertificateBundle {
    certificates: IndexMap<String, String>,
}

/// Names of the bundle entries chosen for each certificate kind.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SelectedEntries<'a> {
    pub client: Option<&'a str>,
    pub ca: Option<&'a str>,
}

/// Which certificates to print.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CertSelection {
    pub client: bool,
    pub ca: bool,
}

impl CertSelection {
    pub const CLIENT: Self = Self {
        client: true,
        ca: false,
    };
    pub const CA: Self = Self {
        client: false,
        ca: true,
    };
}

impl CertificateBundle {
    pub fn from_json(text: &str) -> Result<Self, BundleError> {
        let bundle: Self = serde_json::from_str(text)?;
        Ok(bundle)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, BundleError> {
        let text =
            fs::read_to_string(path).map_err(|err| BundleError::Read(path.to_owned(), err))?;
        let bundle = Self::from_json(&text)?;
        debug!(path = ?path, entries = bundle.certificates.len(), "loaded certificate bundle");
        Ok(bundle)
    }

    /// Entry names in document order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.certificates.keys().map(String::as_str)
    }

    pub fn select(&self) -> SelectedEntries<'_> {
        let mut selected = SelectedEntries::default();
        let mut client_candidates = 0usize;
        for name in self.entry_names() {
            if name == CA_CERT_FILENAME {
                selected.ca = Some(name);
            } else {
                client_candidates += 1;
                selected.client = Some(name);
            }
        }
        if client_candidates > 1 {
            warn!(
                candidates = client_candidates,
                chosen = selected.client,
                "bundle holds more than one client certificate, using the last one"
            );
        }
        debug!(client = selected.client, ca = selected.ca, "selected bundle entries");
        selected
    }

    pub fn client_cert(&self) -> Result<Option<String>, BundleError> {
        self.decode_entry(self.select().client)
    }

    pub fn ca_cert(&self) -> Result<Option<String>, BundleError> {
        self.decode_entry(self.select().ca)
    }

    fn decode_entry(&self, name: Option<&str>) -> Result<Option<String>, BundleError> {
        let Some(name) = name else {
            return Ok(None);
        };
        let encoded = &self.certificates[name];
        decode_certificate(encoded)
            .map(Some)
            .map_err(|err| BundleError::Decode(name.to_owned(), err))
    }
}

/// Loads the bundle at `path` and renders each selected certificate that the
/// bundle contains, one per line. A certificate that is requested but absent
/// contributes nothing. Everything is decoded before anything is returned, so
/// a failure never yields partial output.
pub fn render_certificates(path: &Path, selection: CertSelection) -> Result<String, BundleError> {
    let bundle = CertificateBundle::load_from_file(path)?;
    let selected = bundle.select();

    let mut display_text = String::new();
    let wanted = [
        (selection.client, selected.client, "client"),
        (selection.ca, selected.ca, "CA"),
    ];
    for (requested, entry, kind) in wanted {
        if !requested {
            continue;
        }
        match bundle.decode_entry(entry)? {
            Some(pem) => {
                display_text.push_str(&pem);
                display_text.push('\n');
            }
            None => info!("no {kind} certificate found in {path:?}"),
        }
    }
    Ok(display_text)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use tempfile::TempDir;

    use super::*;

    fn bundle_json(entries: &[(&str, &str)]) -> String {
        let certificates: serde_json::Map<String, serde_json::Value> = entries
            .iter()
            .map(|(name, pem)| (name.to_string(), STANDARD.encode(pem).into()))
            .collect();
        serde_json::json!({ "certificates": certificates }).to_string()
    }

    fn write_bundle(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("bundle.json");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn selects_ca_and_client_entries() {
        let bundle =
            CertificateBundle::from_json(&bundle_json(&[("plugin.pem", "C"), ("cacert.pem", "A")]))
                .unwrap();
        let selected = bundle.select();
        assert_eq!(selected.client, Some("plugin.pem"));
        assert_eq!(selected.ca, Some("cacert.pem"));
        assert_eq!(bundle.client_cert().unwrap().as_deref(), Some("C"));
        assert_eq!(bundle.ca_cert().unwrap().as_deref(), Some("A"));
    }

    #[test]
    fn last_client_entry_in_document_order_wins() {
        // hand-written so the document order is not at the mercy of a map type
        let text = format!(
            r#"{{"certificates": {{"b.pem": "{}", "cacert.pem": "{}", "a.pem": "{}"}}}}"#,
            STANDARD.encode("B"),
            STANDARD.encode("CA"),
            STANDARD.encode("A"),
        );
        let bundle = CertificateBundle::from_json(&text).unwrap();
        assert_eq!(bundle.select().client, Some("a.pem"));
        assert_eq!(bundle.client_cert().unwrap().as_deref(), Some("A"));
    }

    #[test]
    fn duplicate_key_keeps_first_position_and_last_value() {
        let text = format!(
            r#"{{"certificates": {{"a.pem": "{}", "b.pem": "{}", "a.pem": "{}"}}}}"#,
            STANDARD.encode("A1"),
            STANDARD.encode("B"),
            STANDARD.encode("A2"),
        );
        let bundle = CertificateBundle::from_json(&text).unwrap();
        assert_eq!(bundle.entry_names().collect::<Vec<_>>(), ["a.pem", "b.pem"]);
        assert_eq!(bundle.client_cert().unwrap().as_deref(), Some("B"));
    }

    #[test]
    fn missing_entries_are_not_errors() {
        let bundle = CertificateBundle::from_json(r#"{"certificates": {}}"#).unwrap();
        assert_eq!(bundle.select(), SelectedEntries::default());
        assert_eq!(bundle.client_cert().unwrap(), None);
        assert_eq!(bundle.ca_cert().unwrap(), None);
    }

    #[test]
    fn extra_top_level_fields_are_ignored() {
        let text = format!(
            r#"{{"version": 2, "certificates": {{"cacert.pem": "{}"}}}}"#,
            STANDARD.encode("A")
        );
        assert!(CertificateBundle::from_json(&text).is_ok());
    }

    #[test]
    fn malformed_bundles_are_format_errors() {
        for text in [
            "not json",
            "[]",
            "{}",
            r#"{"certificates": []}"#,
            r#"{"certificates": {"cacert.pem": 7}}"#,
        ] {
            let result = CertificateBundle::from_json(text);
            assert!(
                matches!(result, Err(BundleError::Format(_))),
                "expected format error for {text:?}"
            );
        }
    }

    #[test]
    fn undecodable_entry_names_the_entry() {
        let bundle =
            CertificateBundle::from_json(r#"{"certificates": {"cacert.pem": "QQ"}}"#).unwrap();
        let err = bundle.ca_cert().unwrap_err();
        assert!(matches!(err, BundleError::Decode(ref name, _) if name == "cacert.pem"));
    }

    #[test]
    fn undecodable_entry_only_matters_when_requested() {
        let dir = TempDir::new().unwrap();
        let text = format!(
            r#"{{"certificates": {{"plugin.pem": "QQ", "cacert.pem": "{}"}}}}"#,
            STANDARD.encode("CA")
        );
        let path = write_bundle(&dir, &text);
        assert_eq!(render_certificates(&path, CertSelection::CA).unwrap(), "CA\n");
        assert!(render_certificates(&path, CertSelection::CLIENT).is_err());
    }

    #[test]
    fn load_handles_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("non/existent.json");
        let result = CertificateBundle::load_from_file(&path);
        assert!(matches!(result, Err(BundleError::Read(p, _)) if p == path));
    }

    #[test]
    fn renders_each_requested_certificate_on_its_own_line() {
        let dir = TempDir::new().unwrap();
        let path = write_bundle(
            &dir,
            &bundle_json(&[("plugin.pem", "client\n"), ("cacert.pem", " ca ")]),
        );
        let both = CertSelection {
            client: true,
            ca: true,
        };
        assert_eq!(render_certificates(&path, both).unwrap(), "client\nca\n");
        assert_eq!(
            render_certificates(&path, CertSelection::default()).unwrap(),
            ""
        );
    }

    #[test]
    fn render_of_absent_ca_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = write_bundle(&dir, &bundle_json(&[("plugin.pem", "client")]));
        assert_eq!(render_certificates(&path, CertSelection::CA).unwrap(), "");
    }

    quickcheck::quickcheck! {
        fn client_cert_round_trips(pem: String) -> bool {
            let text = bundle_json(&[("plugin.pem", pem.as_str())]);
            let bundle = CertificateBundle::from_json(&text).unwrap();
            let expected = pem.trim_matches(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c'));
            bundle.client_cert().unwrap().as_deref() == Some(expected)
        }
    }
}
