// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Working with Python package metadata (i.e. PKG-INFO files) */

use {
    anyhow::{Context, Result},
    mailparse::parse_mail,
    std::path::Path,
};

/// Value distutils writes for metadata fields that were never set.
pub const UNKNOWN_VALUE: &str = "UNKNOWN";

/// Represents a Python PKG-INFO or METADATA file.
pub struct PythonPackageMetadata {
    headers: Vec<(String, String)>,
    body: String,
}

impl PythonPackageMetadata {
    /// Create an instance from data in a PKG-INFO file.
    pub fn from_metadata(data: &[u8]) -> Result<PythonPackageMetadata> {
        let message = parse_mail(data).context("parsing metadata file")?;

        let headers = message
            .headers
            .iter()
            .map(|header| (header.get_key(), header.get_value()))
            .collect::<Vec<_>>();

        let body = message.get_body().context("reading metadata body")?;

        Ok(PythonPackageMetadata { headers, body })
    }

    /// Create an instance from a PKG-INFO file on disk.
    pub fn from_path(path: &Path) -> Result<PythonPackageMetadata> {
        let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;

        Self::from_metadata(&data).with_context(|| format!("parsing {}", path.display()))
    }

    /// Find the first value of a specified header.
    pub fn find_first_header(&self, key: &str) -> Option<&str> {
        for (k, v) in &self.headers {
            if k.eq_ignore_ascii_case(key) {
                return Some(v);
            }
        }

        None
    }

    /// Find all values of a specified header.
    pub fn find_all_headers(&self, key: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter_map(|(k, v)| {
                if k.eq_ignore_ascii_case(key) {
                    Some(v.as_ref())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
    }

    /// Find the first value of a header, treating the `UNKNOWN` placeholder as missing.
    fn find_known_header(&self, key: &str) -> Option<&str> {
        self.find_first_header(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty() && *v != UNKNOWN_VALUE)
    }

    pub fn name(&self) -> Option<&str> {
        self.find_known_header("Name")
    }

    pub fn version(&self) -> Option<&str> {
        self.find_known_header("Version")
    }

    pub fn summary(&self) -> Option<&str> {
        self.find_known_header("Summary")
    }

    pub fn home_page(&self) -> Option<&str> {
        self.find_known_header("Home-page")
    }

    pub fn license(&self) -> Option<&str> {
        self.find_known_header("License")
    }

    pub fn classifiers(&self) -> Vec<&str> {
        self.find_all_headers("Classifier")
    }

    /// The long description.
    ///
    /// Metadata 2.1 stores it in the message body. Older versions use a
    /// `Description` header.
    pub fn description(&self) -> Option<&str> {
        let body = self.body.trim();

        if !body.is_empty() && body != UNKNOWN_VALUE {
            Some(body)
        } else {
            self.find_known_header("Description")
        }
    }
}
