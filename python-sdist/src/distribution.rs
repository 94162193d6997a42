// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Description of a distribution as declared by its `setup.py`. */

use {
    anyhow::{Context, Result},
    serde::Deserialize,
    std::collections::BTreeMap,
};

/// Entry point groups whose entries become executables on install.
pub const SCRIPT_ENTRY_POINT_GROUPS: &[&str] = &["console_scripts", "gui_scripts"];

/// A distribution as seen by distutils after `setup.py` configuration.
///
/// This is what the introspection helper reports about a source tree.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct SetupDistribution {
    pub name: Option<String>,
    pub version: Option<String>,
    /// Short summary (distutils calls this the description).
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub license: Option<String>,
    pub url: Option<String>,
    pub classifiers: Vec<String>,
    /// Packages, in dotted notation.
    pub packages: Vec<String>,
    /// Top-level modules, in dotted notation.
    pub py_modules: Vec<String>,
    /// Names of extension modules, in dotted notation.
    pub ext_modules: Vec<String>,
    /// Paths of scripts relative to the source root.
    pub scripts: Vec<String>,
    /// Paths of data files relative to the source root.
    pub data_files: Vec<String>,
    /// Entry point group name to `name = target` specifications.
    pub entry_points: BTreeMap<String, Vec<String>>,
    pub test_suite: Option<String>,
    pub uses_setuptools: bool,
    /// Files the sdist command would include.
    pub manifest: Vec<String>,
    /// Filename suffix of extension modules for the introspecting interpreter.
    pub ext_suffix: Option<String>,
    /// Options from the `[bdist_rpm]` section of the setup configuration.
    pub bdist_rpm_options: BTreeMap<String, String>,
}

impl SetupDistribution {
    /// Parse the JSON document emitted by the introspection helper.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).context("parsing distribution JSON")
    }

    pub fn has_ext_modules(&self) -> bool {
        !self.ext_modules.is_empty()
    }

    /// Names of executables generated from script entry points.
    pub fn entry_point_executables(&self) -> Vec<String> {
        SCRIPT_ENTRY_POINT_GROUPS
            .iter()
            .filter_map(|group| self.entry_points.get(*group))
            .flatten()
            .filter_map(|spec| {
                let name = spec.split('=').next()?.trim();

                if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                }
            })
            .collect()
    }

    /// Whether the distribution declares a test suite.
    pub fn has_test_suite(&self) -> bool {
        self.test_suite
            .as_deref()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, indoc::indoc};

    #[test]
    fn parse_json() -> Result<()> {
        let data = indoc! {r#"
            {
                "name": "demo",
                "version": "1.0",
                "packages": ["demo", "demo.sub"],
                "ext_modules": ["demo._speedups"],
                "entry_points": {
                    "console_scripts": ["demo = demo.cli:main", "demo-admin=demo.admin:main"],
                    "gui_scripts": ["demo-gui = demo.gui:run"],
                    "distutils.commands": ["foo = demo.cmd:Foo"]
                },
                "test_suite": "tests",
                "uses_setuptools": true,
                "ext_suffix": ".cpython-311-x86_64-linux-gnu.so",
                "bdist_rpm_options": {"requires": "python-six"},
                "unrecognized": 42
            }
        "#};

        let dist = SetupDistribution::from_json(data.as_bytes())?;

        assert_eq!(dist.name.as_deref(), Some("demo"));
        assert_eq!(dist.packages, vec!["demo", "demo.sub"]);
        assert!(dist.has_ext_modules());
        assert!(dist.scripts.is_empty());
        assert!(dist.has_test_suite());
        assert!(dist.uses_setuptools);
        assert!(dist.manifest.is_empty());
        assert_eq!(
            dist.entry_point_executables(),
            vec!["demo", "demo-admin", "demo-gui"]
        );
        assert_eq!(
            dist.bdist_rpm_options.get("requires").map(|s| s.as_str()),
            Some("python-six")
        );

        Ok(())
    }

    #[test]
    fn empty_test_suite() {
        let dist = SetupDistribution {
            test_suite: Some(" ".to_string()),
            ..Default::default()
        };

        assert!(!dist.has_test_suite());
    }
}
