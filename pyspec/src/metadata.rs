// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Package metadata combined from the sources a source distribution offers. */

use python_sdist::{
    distribution::SetupDistribution,
    licensing::resolve_license,
    package_metadata::{PythonPackageMetadata, UNKNOWN_VALUE},
};

/// Metadata describing the package a spec file is generated for.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    pub release: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    /// License string, resolved from classifiers if not declared.
    pub license: Option<String>,
    pub home_page: Option<String>,
    pub classifiers: Vec<String>,
}

fn known(value: Option<&str>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && *s != UNKNOWN_VALUE)
        .map(|s| s.to_string())
}

impl PackageMetadata {
    /// Resolve metadata for a package.
    ///
    /// `PKG-INFO` values are preferred over values the setup script
    /// declares. The requested name, version and release always win.
    pub fn resolve(
        name: &str,
        version: &str,
        release: &str,
        pkg_info: Option<&PythonPackageMetadata>,
        dist: &SetupDistribution,
    ) -> Self {
        let summary = known(pkg_info.and_then(|m| m.summary()))
            .or_else(|| known(dist.description.as_deref()));
        let description = known(pkg_info.and_then(|m| m.description()))
            .or_else(|| known(dist.long_description.as_deref()));
        let home_page =
            known(pkg_info.and_then(|m| m.home_page())).or_else(|| known(dist.url.as_deref()));
        let explicit_license =
            known(pkg_info.and_then(|m| m.license())).or_else(|| known(dist.license.as_deref()));

        let classifiers = match pkg_info.map(|m| m.classifiers()) {
            Some(classifiers) if !classifiers.is_empty() => {
                classifiers.into_iter().map(|s| s.to_string()).collect()
            }
            _ => dist.classifiers.clone(),
        };

        let license = resolve_license(
            explicit_license.as_deref(),
            classifiers.iter().map(|s| s.as_str()),
        );

        Self {
            name: name.to_string(),
            version: version.to_string(),
            release: release.to_string(),
            summary,
            description,
            license,
            home_page,
            classifiers,
        }
    }
}
