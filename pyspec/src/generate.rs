// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Generating spec files for packages on a Python package index. */

use {
    crate::{
        assembler::{assemble, ChangelogSettings, SpecInput},
        config::{resolve_package_options, GeneratorConfig, LifecycleScripts, PackageOptions},
        metadata::PackageMetadata,
        pypi::PackageIndex,
    },
    anyhow::{Context, Result},
    log::{info, warn},
    python_sdist::{
        archive::{unpack_sdist, ArchiveFormat},
        distribution::SetupDistribution,
        introspect::SetupIntrospector,
        package_metadata::PythonPackageMetadata,
    },
    rpm_spec::{write_parsed_spec, SpecFile, SpecParser},
    std::{io::Write, path::Path},
};

/// A request to generate the spec of a package release.
#[derive(Clone, Debug)]
pub struct SpecRequest {
    /// Name of the package on the index.
    pub module: String,
    pub version: String,
    pub release: String,
    /// Suffix of the source archive, e.g. `tar.gz`.
    pub suffix: String,
    /// Emit a `%changelog` section.
    pub changelog: bool,
    /// Options taking precedence over those the package declares.
    pub options: PackageOptions,
}

impl SpecRequest {
    pub fn new(module: impl ToString, version: impl ToString) -> Self {
        Self {
            module: module.to_string(),
            version: version.to_string(),
            release: "1".to_string(),
            suffix: "tar.gz".to_string(),
            changelog: false,
            options: PackageOptions::default(),
        }
    }

    /// Name of the directory the source archive unpacks to.
    pub fn source_root_name(&self) -> String {
        format!("{}-{}", self.module, self.version)
    }
}

/// Read the `PKG-INFO` written by `egg_info`, if any.
fn load_pkg_info(
    introspector: &SetupIntrospector,
    source_root: &Path,
) -> Result<Option<PythonPackageMetadata>> {
    match introspector.egg_info(source_root)? {
        Some(path) => {
            info!("reading {}", path.display());
            Ok(Some(PythonPackageMetadata::from_path(&path)?))
        }
        None => {
            warn!("egg_info did not produce PKG-INFO; using setup.py metadata");
            Ok(None)
        }
    }
}

/// Everything learned about an unpacked source distribution.
pub struct IntrospectedSdist {
    pub distribution: SetupDistribution,
    pub pkg_info: Option<PythonPackageMetadata>,
}

/// Introspect an unpacked source distribution.
pub fn introspect_sdist(python: &Path, source_root: &Path) -> Result<IntrospectedSdist> {
    let introspector = SetupIntrospector::new(python);

    let distribution = introspector
        .introspect(source_root)
        .with_context(|| format!("introspecting {}", source_root.display()))?;
    let pkg_info = load_pkg_info(&introspector, source_root)?;

    Ok(IntrospectedSdist {
        distribution,
        pkg_info,
    })
}

/// Build the spec of an introspected source distribution.
pub fn build_spec(
    config: &GeneratorConfig,
    request: &SpecRequest,
    sdist: &IntrospectedSdist,
    source_root: &Path,
    source_url: &str,
) -> Result<SpecFile<'static>> {
    let metadata = PackageMetadata::resolve(
        &request.module,
        &request.version,
        &request.release,
        sdist.pkg_info.as_ref(),
        &sdist.distribution,
    );

    let options = resolve_package_options(
        &sdist.distribution.bdist_rpm_options,
        request.options.clone(),
    );
    let scripts = LifecycleScripts::load(&options, source_root)?;

    let input = SpecInput {
        metadata: &metadata,
        distribution: &sdist.distribution,
        options: &options,
        scripts: &scripts,
        source_url,
        common_licenses: &config.common_licenses,
        changelog: if request.changelog {
            Some(ChangelogSettings {
                date: config.changelog_date,
                packager: &config.packager,
            })
        } else {
            None
        },
    };

    Ok(assemble(&input))
}

/// Parse a spec through a parser and write the cleaned up result.
///
/// The spec is rendered to a temporary file in `tmp_dir`, which is removed
/// afterwards.
pub fn parse_and_write<W: Write>(
    spec: &SpecFile,
    module: &str,
    tmp_dir: &Path,
    parser: &dyn SpecParser,
    writer: &mut W,
) -> Result<()> {
    std::fs::create_dir_all(tmp_dir).with_context(|| format!("creating {}", tmp_dir.display()))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(module)
        .suffix(".spec")
        .tempfile_in(tmp_dir)
        .with_context(|| format!("creating temporary spec in {}", tmp_dir.display()))?;

    spec.write(tmp.as_file_mut())?;
    tmp.as_file_mut().flush()?;

    let parsed = parser
        .parse(tmp.path())
        .with_context(|| format!("parsing generated spec for {}", module))?;

    write_parsed_spec(&parsed, writer)?;

    Ok(())
}

/// Generate the spec of a package release and write it to `writer`.
///
/// The source archive is fetched into the source directory unless already
/// present and unpacked into the build directory, replacing any previous
/// tree.
pub fn pyspec<W: Write>(
    config: &GeneratorConfig,
    request: &SpecRequest,
    parser: &dyn SpecParser,
    writer: &mut W,
) -> Result<()> {
    let format = ArchiveFormat::from_suffix(&request.suffix)?;

    let index = PackageIndex::new(&config.index_url)?;
    let archive = index.source_archive(&request.module, &request.version, &request.suffix);
    index.ensure_downloaded(&archive, &config.source_dir)?;

    let source_root = unpack_sdist(
        &config.source_dir.join(&archive.filename),
        format,
        &config.build_dir,
        &request.source_root_name(),
    )?;

    let sdist = introspect_sdist(&config.python, &source_root)?;
    let spec = build_spec(config, request, &sdist, &source_root, &archive.source0())?;

    parse_and_write(&spec, &request.module, &config.tmp_dir, parser, writer)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::config::ParserKind,
        chrono::{TimeZone, Utc},
        python_sdist::licensing::CommonLicenses,
        rpm_spec::StructuralSpecParser,
        std::{collections::BTreeMap, path::PathBuf},
    };

    fn config(tmp: &Path) -> GeneratorConfig {
        GeneratorConfig {
            build_dir: tmp.join("BUILD"),
            source_dir: tmp.join("SOURCES"),
            tmp_dir: tmp.join("tmp"),
            python: PathBuf::from("python3"),
            packager: "Jane Doe <jane@example.com>".to_string(),
            common_licenses: CommonLicenses::default(),
            index_url: "https://pypi.org".to_string(),
            parser: ParserKind::Builtin,
            defines: vec![],
            changelog_date: Utc.timestamp_opt(1420000000, 0).unwrap(),
        }
    }

    #[test]
    fn request_defaults() {
        let request = SpecRequest::new("demo", "1.0");
        assert_eq!(request.release, "1");
        assert_eq!(request.suffix, "tar.gz");
        assert!(!request.changelog);
        assert_eq!(request.source_root_name(), "demo-1.0");
    }

    #[test]
    fn spec_from_introspection() -> Result<()> {
        let td = tempfile::tempdir()?;
        let config = config(td.path());

        let source_root = td.path().join("BUILD").join("demo-1.0");
        std::fs::create_dir_all(&source_root)?;
        std::fs::write(source_root.join("post.sh"), "echo installed")?;

        let mut bdist_rpm_options = BTreeMap::new();
        bdist_rpm_options.insert("post-install".to_string(), "post.sh".to_string());
        bdist_rpm_options.insert("requires".to_string(), "python-six".to_string());

        let sdist = IntrospectedSdist {
            distribution: SetupDistribution {
                description: Some("Demo things".to_string()),
                license: Some("UNKNOWN".to_string()),
                classifiers: vec!["License :: OSI Approved :: MIT License".to_string()],
                py_modules: vec!["demo".to_string()],
                bdist_rpm_options,
                ..Default::default()
            },
            pkg_info: None,
        };

        let mut request = SpecRequest::new("demo", "1.0");
        request.changelog = true;
        request.options.requires = vec!["python3-six".to_string()];

        let spec = build_spec(
            &config,
            &request,
            &sdist,
            &source_root,
            "https://files.example/demo-1.0.tar.gz",
        )?;

        assert_eq!(spec.tag("License").map(|t| t.value()), Some("MIT License"));
        assert_eq!(spec.tag("requires").map(|t| t.value()), Some("python3-six"));
        assert!(spec.section(rpm_spec::SectionKind::Post).is_some());
        assert!(spec.section(rpm_spec::SectionKind::Changelog).is_some());

        let mut out = vec![];
        parse_and_write(
            &spec,
            &request.module,
            &config.tmp_dir,
            &StructuralSpecParser,
            &mut out,
        )?;

        let out = String::from_utf8(out)?;
        assert!(out.starts_with("%define\tmodule\tdemo\n"));
        assert!(out.contains("\n%post\necho installed\n"));
        assert!(out.contains("* Wed Dec 31 2014 Jane Doe <jane@example.com> 1.0-1"));
        assert!(!out.contains("UNKNOWN"));
        assert!(!out.ends_with('\n'));

        // The temporary spec is cleaned up.
        assert_eq!(std::fs::read_dir(&config.tmp_dir)?.count(), 0);

        Ok(())
    }
}
