// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Classification of source tree files into license and documentation files. */

use {
    python_sdist::licensing::CommonLicenses,
    std::collections::BTreeSet,
};

/// Names identifying license texts.
pub const LICENSE_NAMES: &[&str] = &["LICENSE", "COPYRIGHT", "COPYING"];

/// Names identifying documentation.
///
/// [LICENSE_NAMES] are documentation names too.
pub const DOC_NAMES: &[&str] = &[
    "README",
    "CHANGES",
    "ChangeLog",
    "NEWS",
    "THANKS",
    "HISTORY",
    "AUTHORS",
    "BUGS",
    "ReleaseNotes",
    "DISCLAIMER",
    "TODO",
    "TROUBLESHOOTING",
    "IDEAS",
    "HACKING",
    "WISHLIST",
    "CREDITS",
    "PROJECTS",
    "LEGAL",
    "KNOWN_BUGS",
    "MISSING_FEATURES",
    "FAQ",
    "ANNOUNCE",
    "FEATURES",
    "WHATSNEW",
];

/// Kind of a classified file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FileClass {
    License,
    Doc,
}

/// Files partitioned into `%license` and `%doc` entries.
///
/// Both lists preserve the order files were first seen in.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ClassifiedFiles {
    pub license: Vec<String>,
    pub doc: Vec<String>,
}

impl ClassifiedFiles {
    /// Whether a path landed in either list.
    pub fn contains(&self, path: &str) -> bool {
        self.license.iter().any(|p| p == path) || self.doc.iter().any(|p| p == path)
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

fn all_doc_names() -> impl Iterator<Item = &'static str> {
    DOC_NAMES.iter().chain(LICENSE_NAMES.iter()).copied()
}

/// Classify a single path.
///
/// License names are checked first. A path naming a license is a license
/// file unless `ship_license` is false, in which case it is considered for
/// documentation like any other path. A path is documentation when it
/// mentions a documentation name and either is exactly such a name or is
/// Markdown.
pub fn classify_path(path: &str, ship_license: bool) -> Option<FileClass> {
    if ship_license
        && LICENSE_NAMES
            .iter()
            .any(|name| contains_ignore_case(path, name))
    {
        return Some(FileClass::License);
    }

    let is_doc_shaped = all_doc_names().any(|name| path == name) || path.ends_with(".md");

    if is_doc_shaped && all_doc_names().any(|name| contains_ignore_case(path, name)) {
        Some(FileClass::Doc)
    } else {
        None
    }
}

/// Partition paths into license and documentation files.
///
/// `license` is the resolved license of the package. Packages under a
/// license in `common` don't ship their own license text.
///
/// Each path lands in at most one list, at its first occurrence.
pub fn classify_files<'a>(
    paths: impl IntoIterator<Item = &'a str>,
    license: Option<&str>,
    common: &CommonLicenses,
) -> ClassifiedFiles {
    let ship_license = !license.map(|l| common.contains(l)).unwrap_or(false);

    let mut seen = BTreeSet::new();
    let mut res = ClassifiedFiles::default();

    for path in paths {
        if !seen.insert(path) {
            continue;
        }

        match classify_path(path, ship_license) {
            Some(FileClass::License) => res.license.push(path.to_string()),
            Some(FileClass::Doc) => res.doc.push(path.to_string()),
            None => {}
        }
    }

    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_single() {
        assert_eq!(classify_path("LICENSE.txt", true), Some(FileClass::License));
        assert_eq!(classify_path("docs/copying", true), Some(FileClass::License));
        assert_eq!(classify_path("README", true), Some(FileClass::Doc));
        assert_eq!(classify_path("docs/changes.md", true), Some(FileClass::Doc));
        assert_eq!(classify_path("README.rst", true), None);
        assert_eq!(classify_path("setup.py", true), None);
        assert_eq!(classify_path("notes.md", true), None);

        // A license name without shipping licenses falls through to documentation.
        assert_eq!(classify_path("LICENSE", false), Some(FileClass::Doc));
        assert_eq!(classify_path("LICENSE.txt", false), None);
    }

    #[test]
    fn partition_first_match_wins() {
        let paths = [
            "README.md",
            "LICENSE",
            "setup.py",
            "AUTHORS",
            "README.md",
            "COPYING.md",
            "demo/__init__.py",
        ];

        let res = classify_files(paths, Some("BSD"), &CommonLicenses::default());

        assert_eq!(res.license, vec!["LICENSE", "COPYING.md"]);
        assert_eq!(res.doc, vec!["README.md", "AUTHORS"]);
        assert!(res.contains("AUTHORS"));
        assert!(!res.contains("setup.py"));
    }

    #[test]
    fn common_license_not_shipped() {
        let common = ["Apache-2.0", "GPL-3"].into_iter().collect::<CommonLicenses>();

        let res = classify_files(["LICENSE.txt", "README"], Some("GPL-3"), &common);
        assert!(res.license.is_empty());
        assert_eq!(res.doc, vec!["README"]);

        let res = classify_files(["LICENSE.txt", "README"], Some("MIT License"), &common);
        assert_eq!(res.license, vec!["LICENSE.txt"]);

        let res = classify_files(["LICENSE.txt"], None, &common);
        assert_eq!(res.license, vec!["LICENSE.txt"]);
    }
}
