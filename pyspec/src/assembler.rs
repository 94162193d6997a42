// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Assembly of spec files from package metadata.

Assembly is a pure function of its [SpecInput]: no files are read, no
processes run and no macros are consulted.
*/

use {
    crate::{
        classify::classify_files,
        config::{LifecycleScripts, PackageOptions},
        metadata::PackageMetadata,
    },
    chrono::{DateTime, Utc},
    python_sdist::{
        distribution::SetupDistribution,
        licensing::CommonLicenses,
        package_metadata::UNKNOWN_VALUE,
    },
    rpm_spec::{ChangelogEntry, SectionKind, SpecFile, SpecSection},
    std::{collections::BTreeSet, path::Path},
};

/// Site directory of packages with extension modules.
pub const PLATFORM_SITE_DIR: &str = "%{py_platsitedir}";

/// Site directory of pure Python packages.
pub const PURE_SITE_DIR: &str = "%{py_puresitedir}";

const BIN_DIR: &str = "%{_bindir}";

/// Extension module suffix assumed when the interpreter didn't report one.
const DEFAULT_EXT_SUFFIX: &str = ".so";

/// Settings of the `%changelog` entry.
#[derive(Clone, Debug)]
pub struct ChangelogSettings<'a> {
    pub date: DateTime<Utc>,
    pub packager: &'a str,
}

/// Everything a spec file is assembled from.
#[derive(Clone, Debug)]
pub struct SpecInput<'a> {
    pub metadata: &'a PackageMetadata,
    pub distribution: &'a SetupDistribution,
    pub options: &'a PackageOptions,
    pub scripts: &'a LifecycleScripts,
    /// Value of the `Source0` tag.
    pub source_url: &'a str,
    pub common_licenses: &'a CommonLicenses,
    /// Emit a `%changelog` if set.
    pub changelog: Option<ChangelogSettings<'a>>,
}

/// Default script of a lifecycle section.
fn default_script(kind: SectionKind, dist: &SetupDistribution) -> Option<&'static str> {
    match kind {
        SectionKind::Prep => Some("%setup -qDTn %{module}-%{version}"),
        SectionKind::Build => Some("%{__python} setup.py build"),
        SectionKind::Install => Some("%{__python} setup.py install --root=%{buildroot}"),
        SectionKind::Check if dist.has_test_suite() => Some("%{__python} setup.py test"),
        _ => None,
    }
}

fn summary_line(summary: Option<&str>) -> String {
    let summary = summary
        .map(|s| s.trim().trim_end_matches('.').trim_end())
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_VALUE);

    summary.to_string()
}

/// Convert a dotted Python name to a path.
fn dotted_path(name: &str) -> String {
    name.replace('.', "/")
}

/// Assemble a spec file.
pub fn assemble(input: &SpecInput) -> SpecFile<'static> {
    let metadata = input.metadata;
    let dist = input.distribution;
    let options = input.options;

    let version = metadata.version.replace('-', "_");
    let release = metadata.release.replace('-', "_");

    let mut spec = SpecFile::default();
    spec.add_define("module", metadata.name.clone());
    spec.add_blank();
    spec.add_tag("Name", "python-%{module}");
    spec.add_tag("Version", version.clone());
    spec.add_tag("Release", release.clone());
    spec.add_tag("Summary", summary_line(metadata.summary.as_deref()));
    spec.add_tag("Source0", input.source_url.to_string());
    spec.add_tag(
        "License",
        metadata
            .license
            .clone()
            .unwrap_or_else(|| UNKNOWN_VALUE.to_string()),
    );
    spec.add_tag("Group", "Development/Python");
    if let Some(url) = &metadata.home_page {
        spec.add_tag("Url", url.clone());
    }

    let classified = classify_files(
        dist.data_files
            .iter()
            .chain(dist.manifest.iter())
            .map(|s| s.as_str()),
        metadata.license.as_deref(),
        input.common_licenses,
    );

    match &options.force_arch {
        Some(arch) => spec.add_tag("BuildArch", arch.clone()),
        None if !dist.has_ext_modules() => spec.add_tag("BuildArch", "noarch"),
        None => {}
    }

    for (tag, values) in [
        ("Provides", &options.provides),
        ("Requires", &options.requires),
        ("Conflicts", &options.conflicts),
        ("Obsoletes", &options.obsoletes),
    ] {
        if !values.is_empty() {
            spec.add_tag(tag, values.join(" "));
        }
    }

    let mut build_requires = vec![];
    if dist.has_ext_modules() {
        build_requires.push("python-devel");
    }
    if dist.uses_setuptools {
        build_requires.push("python-setuptools");
    }
    if !build_requires.is_empty() {
        spec.add_tag("BuildRequires", build_requires.join(" "));
    }
    if !options.build_requires.is_empty() {
        spec.add_tag("BuildRequires", options.build_requires.join(" "));
    }

    let mut description = SpecSection::new(SectionKind::Description);
    description.add_line(
        metadata
            .description
            .as_deref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_VALUE.to_string()),
    );
    spec.add_section(description);

    for kind in SectionKind::LIFECYCLE {
        let mut section = SpecSection::new(kind);

        if let Some(lines) = input.scripts.get(kind) {
            section.extend_lines(lines.iter().cloned());
        } else if let Some(default) = default_script(kind, dist) {
            section.add_line(default);
        } else {
            continue;
        }

        spec.add_section(section);
    }

    let site_dir = if dist.has_ext_modules() {
        PLATFORM_SITE_DIR
    } else {
        PURE_SITE_DIR
    };

    let mut files = SpecSection::new(SectionKind::Files);
    files.extend_lines(classified.license.iter().map(|f| format!("%license {}", f)));
    files.extend_lines(classified.doc.iter().map(|f| format!("%doc {}", f)));
    files.extend_lines(payload_entries(dist, site_dir, |f| classified.contains(f)));
    files.add_line(format!(
        "{}/{}*.egg-info",
        site_dir,
        metadata.name.replace('-', "_")
    ));
    spec.add_section(files);

    if let Some(changelog) = &input.changelog {
        let entry = ChangelogEntry {
            date: changelog.date,
            packager: changelog.packager.into(),
            version: version.as_str().into(),
            release: release.as_str().into(),
            details: vec!["Initial release".into()],
        };

        let mut section = SpecSection::new(SectionKind::Changelog);
        section.extend_lines(entry.lines());
        spec.add_section(section);
    }

    spec
}

/// Entries of `%files` for the installed payload, sorted and de-duplicated.
///
/// Data files for which `classified` returns true are omitted.
pub fn payload_entries(
    dist: &SetupDistribution,
    site_dir: &str,
    classified: impl Fn(&str) -> bool,
) -> BTreeSet<String> {
    let mut entries = BTreeSet::new();

    for script in &dist.scripts {
        if let Some(name) = Path::new(script).file_name() {
            entries.insert(format!("{}/{}", BIN_DIR, name.to_string_lossy()));
        }
    }

    for data_file in dist.data_files.iter().filter(|f| !classified(f.as_str())) {
        entries.insert(format!("{}/{}", site_dir, data_file));
    }

    for name in dist.entry_point_executables() {
        entries.insert(format!("{}/{}", BIN_DIR, name));
    }

    for module in &dist.py_modules {
        entries.insert(format!("{}/{}.py*", site_dir, dotted_path(module)));
    }

    for package in &dist.packages {
        let path = dotted_path(package);
        entries.insert(format!("%dir {}/{}", site_dir, path));
        entries.insert(format!("{}/{}/*.py*", site_dir, path));
    }

    let ext_suffix = dist.ext_suffix.as_deref().unwrap_or(DEFAULT_EXT_SUFFIX);
    for ext in &dist.ext_modules {
        entries.insert(format!("{}/{}{}", site_dir, dotted_path(ext), ext_suffix));
    }

    entries
}
