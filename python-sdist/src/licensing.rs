// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Resolving the license of a Python package. */

use {
    anyhow::{Context, Result},
    std::{collections::BTreeSet, path::Path},
};

/// Directory where distributions ship license texts shared by all packages.
pub const DEFAULT_COMMON_LICENSES_DIR: &str = "/usr/share/common-licenses";

/// Separator between the segments of a trove classifier.
const CLASSIFIER_SEPARATOR: &str = " :: ";

/// Obtain the license named by `License ::` trove classifiers.
///
/// The most specific (last) segment of the classifier is the license name.
/// If multiple license classifiers are present, the last one wins.
pub fn license_from_classifiers<'a>(
    classifiers: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    classifiers
        .into_iter()
        .filter_map(|classifier| {
            let mut segments = classifier.split(CLASSIFIER_SEPARATOR);

            if segments.next() == Some("License") {
                segments.last().map(|s| s.trim().to_string())
            } else {
                None
            }
        })
        .last()
}

/// Resolve the license string of a package.
///
/// An explicit license wins. Otherwise the license is derived from classifiers.
pub fn resolve_license<'a>(
    explicit: Option<&str>,
    classifiers: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    match explicit.map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some(license) => Some(license.to_string()),
        None => license_from_classifiers(classifiers),
    }
}

/// Names of license texts already provided by the system.
///
/// Packages under one of these licenses don't need to ship their own copy.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommonLicenses {
    names: BTreeSet<String>,
}

impl CommonLicenses {
    /// Construct an instance from the file names in a directory.
    ///
    /// A missing directory yields an empty set.
    pub fn from_dir(path: &Path) -> Result<Self> {
        let pattern = path.join("*");
        let pattern = pattern.to_string_lossy();

        let mut names = BTreeSet::new();

        for entry in glob::glob(&pattern).context("parsing common licenses glob")? {
            let entry = entry.context("resolving common license entry")?;

            if let Some(name) = entry.file_name() {
                names.insert(name.to_string_lossy().to_string());
            }
        }

        Ok(Self { names })
    }

    pub fn contains(&self, license: &str) -> bool {
        self.names.contains(license)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|s| s.as_str())
    }
}

impl<S: ToString> FromIterator<S> for CommonLicenses {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().map(|s| s.to_string()).collect(),
        }
    }
}
