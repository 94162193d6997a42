// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Configuration of spec generation.

All values the generator needs from the rpm macro database are resolved
once into a [GeneratorConfig]. Nothing else consults rpm macros.
*/

use {
    anyhow::{anyhow, Context, Result},
    chrono::{DateTime, Utc},
    log::{debug, warn},
    python_sdist::{bdist_rpm::BdistRpmOptions, licensing::CommonLicenses},
    rpm_spec::{MacroExpander, MacroTable, SectionKind},
    std::{
        collections::BTreeMap,
        path::{Path, PathBuf},
        str::FromStr,
    },
};

/// Default URL of the Python package index.
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org";

/// Macro expression resolving the Python interpreter.
pub const PYTHON_MACRO: &str = "%{__python}";

/// Macro expression resolving the packager identity.
pub const PACKAGER_MACRO: &str = "%{?packager}%{?!packager:Unnamed Loser <foo@bar.cum>}";

/// Interpreter used when `%{__python}` is not defined.
const FALLBACK_PYTHON: &str = "python3";

/// Options controlling what goes into the spec of a package.
///
/// These are the knobs of distutils' `bdist_rpm` command.
pub type PackageOptions = BdistRpmOptions;

/// How the rendered spec file is parsed before output.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParserKind {
    /// `rpmspec --parse`.
    RpmSpec,
    /// The structural validator that doesn't need rpm.
    Builtin,
}

impl ParserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RpmSpec => "rpmspec",
            Self::Builtin => "builtin",
        }
    }
}

impl FromStr for ParserKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rpmspec" => Ok(Self::RpmSpec),
            "builtin" => Ok(Self::Builtin),
            _ => Err(anyhow!("unknown spec parser: {}", s)),
        }
    }
}

/// Construct a macro table holding rpm's stock definitions of the macros we use.
///
/// Used on hosts without rpm. `defines` are applied on top.
pub fn builtin_macros<'a>(defines: impl IntoIterator<Item = (&'a str, &'a str)>) -> MacroTable {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());

    let mut table = MacroTable::default();
    table.define("_topdir", format!("{}/rpmbuild", home));
    table.define("_builddir", "%{_topdir}/BUILD");
    table.define("_sourcedir", "%{_topdir}/SOURCES");
    table.define("_tmppath", "/var/tmp");
    table.define("__python", "/usr/bin/python3");

    for (name, value) in defines {
        table.define(name, value);
    }

    table
}

/// Split a `NAME VALUE` macro definition.
pub fn parse_define(define: &str) -> Result<(&str, &str)> {
    let define = define.trim();

    match define.split_once(char::is_whitespace) {
        Some((name, value)) if !name.is_empty() => Ok((name, value.trim_start())),
        _ => Err(anyhow!("macro definition must be NAME VALUE: {}", define)),
    }
}

/// Settings of a generator run.
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    /// `%{_builddir}`; source distributions are unpacked here.
    pub build_dir: PathBuf,
    /// `%{_sourcedir}`; source archives are downloaded here.
    pub source_dir: PathBuf,
    /// `%{_tmppath}`; the spec is rendered here for parsing.
    pub tmp_dir: PathBuf,
    /// Python interpreter introspecting setup scripts.
    pub python: PathBuf,
    /// Identity used in `%changelog`.
    pub packager: String,
    /// Licenses the system already ships texts for.
    pub common_licenses: CommonLicenses,
    pub index_url: String,
    pub parser: ParserKind,
    /// Macros passed on to the spec parser.
    pub defines: Vec<(String, String)>,
    /// Date of the generated changelog entry.
    pub changelog_date: DateTime<Utc>,
}

fn expand_path(expander: &dyn MacroExpander, expression: &str) -> Result<PathBuf> {
    let value = expander
        .expand(expression)
        .with_context(|| format!("expanding {}", expression))?;

    if value.is_empty() || value.contains("%{") {
        return Err(anyhow!("{} is not defined", expression));
    }

    debug!("{} = {}", expression, value);

    Ok(PathBuf::from(value))
}

impl GeneratorConfig {
    /// Resolve a configuration from rpm macros.
    ///
    /// `python` is a macro expression or path naming the interpreter.
    pub fn from_macros(expander: &dyn MacroExpander, python: &str) -> Result<Self> {
        let build_dir = expand_path(expander, "%{_builddir}")?;
        let source_dir = expand_path(expander, "%{_sourcedir}")?;
        let tmp_dir = expand_path(expander, "%{_tmppath}")?;

        let python = match expander
            .expand(python)
            .with_context(|| format!("expanding {}", python))?
        {
            value if value.is_empty() || value.contains("%{") => {
                warn!("{} is not defined; using {}", python, FALLBACK_PYTHON);
                PathBuf::from(FALLBACK_PYTHON)
            }
            value => PathBuf::from(value),
        };

        let packager = expander
            .expand(PACKAGER_MACRO)
            .context("resolving packager")?
            .trim()
            .to_string();

        Ok(Self {
            build_dir,
            source_dir,
            tmp_dir,
            python,
            packager,
            common_licenses: CommonLicenses::default(),
            index_url: DEFAULT_INDEX_URL.to_string(),
            parser: ParserKind::RpmSpec,
            defines: vec![],
            changelog_date: Utc::now(),
        })
    }

    /// Load the names of common licenses from a directory.
    pub fn load_common_licenses(&mut self, dir: &Path) -> Result<()> {
        self.common_licenses = CommonLicenses::from_dir(dir)?;
        debug!(
            "{} common licenses in {}",
            self.common_licenses.iter().count(),
            dir.display()
        );

        Ok(())
    }
}

/// Resolve package options from those a package declares and overrides.
///
/// Each field set in `overrides` replaces the declared one.
pub fn resolve_package_options(
    declared: &BTreeMap<String, String>,
    overrides: PackageOptions,
) -> PackageOptions {
    let mut options = PackageOptions::from_raw(declared);
    options.merge(overrides);

    options
}

/// Contents of user supplied lifecycle scripts, keyed by section.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LifecycleScripts {
    scripts: BTreeMap<SectionKind, Vec<String>>,
}

impl LifecycleScripts {
    /// Read the script files named by package options.
    ///
    /// Relative paths are resolved against `base_dir`.
    pub fn load(options: &PackageOptions, base_dir: &Path) -> Result<Self> {
        let mut res = Self::default();

        for (kind, path) in [
            (SectionKind::Prep, &options.prep_script),
            (SectionKind::Build, &options.build_script),
            (SectionKind::Install, &options.install_script),
            (SectionKind::Check, &options.verify_script),
            (SectionKind::Pre, &options.pre_install),
            (SectionKind::Post, &options.post_install),
            (SectionKind::Preun, &options.pre_uninstall),
            (SectionKind::Postun, &options.post_uninstall),
        ] {
            if let Some(path) = path {
                let path = base_dir.join(path);
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?;

                res.insert(kind, &content);
            }
        }

        Ok(res)
    }

    /// Register the content of a script.
    pub fn insert(&mut self, kind: SectionKind, content: &str) {
        self.scripts
            .insert(kind, content.split('\n').map(|l| l.to_string()).collect());
    }

    /// Lines of the script for a section.
    pub fn get(&self, kind: SectionKind) -> Option<&[String]> {
        self.scripts.get(&kind).map(|v| v.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> MacroTable {
        let mut table = MacroTable::default();
        table.define("_topdir", "/home/builder/rpmbuild");
        table.define("_builddir", "%{_topdir}/BUILD");
        table.define("_sourcedir", "%{_topdir}/SOURCES");
        table.define("_tmppath", "/var/tmp");
        table
    }

    #[test]
    fn from_macros() -> Result<()> {
        let mut macros = table();
        macros.define("__python", "/usr/bin/python3");

        let config = GeneratorConfig::from_macros(&macros, PYTHON_MACRO)?;

        assert_eq!(config.build_dir, PathBuf::from("/home/builder/rpmbuild/BUILD"));
        assert_eq!(config.source_dir, PathBuf::from("/home/builder/rpmbuild/SOURCES"));
        assert_eq!(config.tmp_dir, PathBuf::from("/var/tmp"));
        assert_eq!(config.python, PathBuf::from("/usr/bin/python3"));
        assert_eq!(config.packager, "Unnamed Loser <foo@bar.cum>");
        assert_eq!(config.parser, ParserKind::RpmSpec);

        macros.define("packager", "Jane Doe <jane@example.com>");
        let config = GeneratorConfig::from_macros(&macros, "/opt/python/bin/python3")?;
        assert_eq!(config.packager, "Jane Doe <jane@example.com>");
        assert_eq!(config.python, PathBuf::from("/opt/python/bin/python3"));

        Ok(())
    }

    #[test]
    fn from_macros_missing() -> Result<()> {
        let config = GeneratorConfig::from_macros(&table(), PYTHON_MACRO)?;
        assert_eq!(config.python, PathBuf::from(FALLBACK_PYTHON));

        assert!(GeneratorConfig::from_macros(&MacroTable::default(), PYTHON_MACRO).is_err());

        Ok(())
    }

    #[test]
    fn builtin_defaults() -> Result<()> {
        let macros = builtin_macros([("_topdir", "/srv/rpm"), ("_tmppath", "/tmp")]);
        let config = GeneratorConfig::from_macros(&macros, PYTHON_MACRO)?;

        assert_eq!(config.build_dir, PathBuf::from("/srv/rpm/BUILD"));
        assert_eq!(config.source_dir, PathBuf::from("/srv/rpm/SOURCES"));
        assert_eq!(config.tmp_dir, PathBuf::from("/tmp"));
        assert_eq!(config.python, PathBuf::from("/usr/bin/python3"));

        Ok(())
    }

    #[test]
    fn defines() -> Result<()> {
        assert_eq!(parse_define("_topdir /srv/rpm")?, ("_topdir", "/srv/rpm"));
        assert_eq!(
            parse_define("packager  Jane Doe <jane@example.com>")?,
            ("packager", "Jane Doe <jane@example.com>")
        );
        assert!(parse_define("_topdir").is_err());

        assert_eq!("builtin".parse::<ParserKind>()?, ParserKind::Builtin);
        assert!("rpm".parse::<ParserKind>().is_err());

        Ok(())
    }

    #[test]
    fn options_and_scripts() -> Result<()> {
        let td = tempfile::tempdir()?;
        std::fs::write(td.path().join("post.sh"), "ldconfig\necho done\n")?;

        let mut declared = BTreeMap::new();
        declared.insert("requires".to_string(), "python-six".to_string());
        declared.insert("post_install".to_string(), "post.sh".to_string());

        let options = resolve_package_options(
            &declared,
            PackageOptions {
                provides: vec!["demo".to_string()],
                ..Default::default()
            },
        );

        assert_eq!(options.requires, vec!["python-six"]);
        assert_eq!(options.provides, vec!["demo"]);

        let scripts = LifecycleScripts::load(&options, td.path())?;
        assert_eq!(
            scripts.get(SectionKind::Post),
            Some(["ldconfig", "echo done", ""].map(String::from).as_slice())
        );
        assert_eq!(scripts.get(SectionKind::Build), None);

        let options = PackageOptions {
            build_script: Some(PathBuf::from("missing.sh")),
            ..Default::default()
        };
        assert!(LifecycleScripts::load(&options, td.path()).is_err());

        Ok(())
    }
}
