// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! RPM related options of a distribution's `[bdist_rpm]` configuration. */

use {
    once_cell::sync::Lazy,
    regex::Regex,
    std::{collections::BTreeMap, path::PathBuf},
};

/// distutils splits list options on commas and whitespace.
static LIST_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*|\s+").unwrap());

/// Split a list valued option the way distutils does.
pub fn split_option_list(value: &str) -> Vec<String> {
    LIST_SEPARATOR
        .split(value.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Options controlling RPM generation that a package can declare.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BdistRpmOptions {
    pub provides: Vec<String>,
    pub requires: Vec<String>,
    pub conflicts: Vec<String>,
    pub obsoletes: Vec<String>,
    pub build_requires: Vec<String>,
    pub force_arch: Option<String>,
    pub prep_script: Option<PathBuf>,
    pub build_script: Option<PathBuf>,
    pub install_script: Option<PathBuf>,
    pub verify_script: Option<PathBuf>,
    pub pre_install: Option<PathBuf>,
    pub post_install: Option<PathBuf>,
    pub pre_uninstall: Option<PathBuf>,
    pub post_uninstall: Option<PathBuf>,
}

impl BdistRpmOptions {
    /// Construct an instance from raw `[bdist_rpm]` key-value pairs.
    ///
    /// Keys may use dashes or underscores. Unknown keys are ignored.
    pub fn from_raw(raw: &BTreeMap<String, String>) -> Self {
        let mut options = Self::default();

        for (key, value) in raw {
            let value = value.trim();
            let path = || {
                if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                }
            };

            match key.replace('-', "_").as_str() {
                "provides" => options.provides = split_option_list(value),
                "requires" => options.requires = split_option_list(value),
                "conflicts" => options.conflicts = split_option_list(value),
                "obsoletes" => options.obsoletes = split_option_list(value),
                "build_requires" => options.build_requires = split_option_list(value),
                "force_arch" if !value.is_empty() => options.force_arch = Some(value.to_string()),
                "prep_script" => options.prep_script = path(),
                "build_script" => options.build_script = path(),
                "install_script" => options.install_script = path(),
                "verify_script" => options.verify_script = path(),
                "pre_install" => options.pre_install = path(),
                "post_install" => options.post_install = path(),
                "pre_uninstall" => options.pre_uninstall = path(),
                "post_uninstall" => options.post_uninstall = path(),
                _ => {}
            }
        }

        options
    }

    /// Overlay another set of options on top of this one.
    ///
    /// Non-empty fields of `other` replace fields of `self`.
    pub fn merge(&mut self, other: BdistRpmOptions) {
        fn merge_list(dest: &mut Vec<String>, src: Vec<String>) {
            if !src.is_empty() {
                *dest = src;
            }
        }

        fn merge_option<T>(dest: &mut Option<T>, src: Option<T>) {
            if src.is_some() {
                *dest = src;
            }
        }

        merge_list(&mut self.provides, other.provides);
        merge_list(&mut self.requires, other.requires);
        merge_list(&mut self.conflicts, other.conflicts);
        merge_list(&mut self.obsoletes, other.obsoletes);
        merge_list(&mut self.build_requires, other.build_requires);
        merge_option(&mut self.force_arch, other.force_arch);
        merge_option(&mut self.prep_script, other.prep_script);
        merge_option(&mut self.build_script, other.build_script);
        merge_option(&mut self.install_script, other.install_script);
        merge_option(&mut self.verify_script, other.verify_script);
        merge_option(&mut self.pre_install, other.pre_install);
        merge_option(&mut self.post_install, other.post_install);
        merge_option(&mut self.pre_uninstall, other.pre_uninstall);
        merge_option(&mut self.post_uninstall, other.post_uninstall);
    }
}
