// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    anyhow::Result,
    clap::{value_parser, Arg, ArgAction, ArgMatches, Command},
    log::LevelFilter,
    pyspec::{
        config::{
            builtin_macros, parse_define, GeneratorConfig, PackageOptions, ParserKind,
            DEFAULT_INDEX_URL, PYTHON_MACRO,
        },
        generate::{self, SpecRequest},
    },
    python_sdist::{bdist_rpm::split_option_list, licensing::DEFAULT_COMMON_LICENSES_DIR},
    rpm_spec::{RpmMacroExpander, RpmSpecParser, SpecParser, StructuralSpecParser},
    std::path::{Path, PathBuf},
};

const PYSPEC_ABOUT: &str = "\
Generate an RPM spec file for a Python package.

The source distribution of MODULE at VERSION is located through the JSON API
of the package index and downloaded into %{_sourcedir} unless a non-empty
copy is already there. It is unpacked into %{_builddir}, replacing any
existing %{_builddir}/MODULE-VERSION directory.

The setup script of the package is then introspected with the Python
interpreter and a spec file is assembled from what it declares. Options
from the [bdist_rpm] section of the package's setup.cfg are honored.
Command line options take precedence over them.

The spec is parsed before it is printed to stdout. By default `rpmspec
--parse` does this, expanding all macros. `--parser builtin` validates the
structure of the spec without rpm and resolves the macros this tool needs
from rpm's stock defaults and `--define` values.

Lines mentioning UNKNOWN metadata are omitted from the output.
";

/// Options naming lifecycle script files, with their help text.
const SCRIPT_ARGS: &[(&str, &str)] = &[
    ("prep-script", "File whose content replaces the default %prep script"),
    ("build-script", "File whose content replaces the default %build script"),
    (
        "install-script",
        "File whose content replaces the default %install script",
    ),
    ("verify-script", "File whose content is used as the %check script"),
    ("pre-install", "File whose content is used as the %pre script"),
    ("post-install", "File whose content is used as the %post script"),
    ("pre-uninstall", "File whose content is used as the %preun script"),
    (
        "post-uninstall",
        "File whose content is used as the %postun script",
    ),
];

/// Options holding lists of dependencies, with their help text.
const LIST_ARGS: &[(&str, &str)] = &[
    ("provides", "Capability the package provides"),
    ("requires", "Capability the package requires"),
    ("build-requires", "Capability required to build the package"),
    ("conflicts", "Capability the package conflicts with"),
    ("obsoletes", "Package obsoleted by the package"),
];

fn command() -> Command {
    let app = Command::new("pyspec")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Gregory Szorc <gregory.szorc@gmail.com>")
        .about("Generate an RPM spec file for a Python package")
        .long_about(PYSPEC_ABOUT)
        .arg_required_else_help(true);

    let app = app
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Increase logging verbosity. Can be specified multiple times"),
        )
        .arg(
            Arg::new("module")
                .value_name("MODULE")
                .required(true)
                .help("Name of the package on the package index"),
        )
        .arg(
            Arg::new("package_version")
                .value_name("VERSION")
                .required(true)
                .help("Version of the package"),
        )
        .arg(
            Arg::new("release")
                .long("release")
                .default_value("1")
                .help("Release of the RPM package"),
        )
        .arg(
            Arg::new("suffix")
                .long("suffix")
                .default_value("tar.gz")
                .help("File name suffix of the source archive"),
        )
        .arg(
            Arg::new("python")
                .long("python")
                .value_name("PATH")
                .default_value(PYTHON_MACRO)
                .help("Python interpreter to introspect the setup script with"),
        )
        .arg(
            Arg::new("changelog")
                .long("changelog")
                .action(ArgAction::SetTrue)
                .help("Emit a %changelog section"),
        )
        .arg(
            Arg::new("index_url")
                .long("index-url")
                .value_name("URL")
                .default_value(DEFAULT_INDEX_URL)
                .help("Base URL of the Python package index"),
        )
        .arg(
            Arg::new("parser")
                .long("parser")
                .value_parser([ParserKind::RpmSpec.as_str(), ParserKind::Builtin.as_str()])
                .default_value(ParserKind::RpmSpec.as_str())
                .help("How to parse the generated spec"),
        )
        .arg(
            Arg::new("define")
                .short('D')
                .long("define")
                .value_name("'NAME VALUE'")
                .action(ArgAction::Append)
                .help("Define an rpm macro"),
        )
        .arg(
            Arg::new("force-arch")
                .long("force-arch")
                .value_name("ARCH")
                .help("Architecture of the package instead of the automatic choice"),
        )
        .arg(
            Arg::new("common-licenses-dir")
                .long("common-licenses-dir")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .default_value(DEFAULT_COMMON_LICENSES_DIR)
                .help("Directory holding license texts shipped by the system"),
        );

    let app = LIST_ARGS.iter().fold(app, |app, (name, help)| {
        app.arg(
            Arg::new(*name)
                .long(*name)
                .action(ArgAction::Append)
                .help(*help),
        )
    });

    SCRIPT_ARGS.iter().fold(app, |app, (name, help)| {
        app.arg(
            Arg::new(*name)
                .long(*name)
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help(*help),
        )
    })
}

fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
        builder.filter_module("rustls", LevelFilter::Error);
    }

    builder.init();
}

fn list_option(args: &ArgMatches, id: &str) -> Vec<String> {
    args.get_many::<String>(id)
        .into_iter()
        .flatten()
        .flat_map(|value| split_option_list(value))
        .collect()
}

fn path_option(args: &ArgMatches, id: &str, cwd: &Path) -> Option<PathBuf> {
    args.get_one::<PathBuf>(id).map(|p| cwd.join(p))
}

fn string_option<'a>(args: &'a ArgMatches, id: &str) -> Option<&'a str> {
    args.get_one::<String>(id).map(|s| s.as_str())
}

/// Options given on the command line.
///
/// Relative script paths are resolved against `cwd`.
fn package_options(args: &ArgMatches, cwd: &Path) -> PackageOptions {
    PackageOptions {
        provides: list_option(args, "provides"),
        requires: list_option(args, "requires"),
        conflicts: list_option(args, "conflicts"),
        obsoletes: list_option(args, "obsoletes"),
        build_requires: list_option(args, "build-requires"),
        force_arch: string_option(args, "force-arch").map(|s| s.to_string()),
        prep_script: path_option(args, "prep-script", cwd),
        build_script: path_option(args, "build-script", cwd),
        install_script: path_option(args, "install-script", cwd),
        verify_script: path_option(args, "verify-script", cwd),
        pre_install: path_option(args, "pre-install", cwd),
        post_install: path_option(args, "post-install", cwd),
        pre_uninstall: path_option(args, "pre-uninstall", cwd),
        post_uninstall: path_option(args, "post-uninstall", cwd),
    }
}

fn resolve_config(args: &ArgMatches) -> Result<GeneratorConfig> {
    let defines = args
        .get_many::<String>("define")
        .into_iter()
        .flatten()
        .map(|define| parse_define(define).map(|(n, v)| (n.to_string(), v.to_string())))
        .collect::<Result<Vec<_>>>()?;

    let parser = string_option(args, "parser")
        .unwrap_or(ParserKind::RpmSpec.as_str())
        .parse::<ParserKind>()?;
    let python = string_option(args, "python").unwrap_or(PYTHON_MACRO);

    let mut config = match parser {
        ParserKind::RpmSpec => {
            let mut rpm = RpmMacroExpander::default();
            for (name, value) in &defines {
                rpm.define(name, value);
            }

            GeneratorConfig::from_macros(&rpm, python)?
        }
        ParserKind::Builtin => {
            let macros = builtin_macros(defines.iter().map(|(n, v)| (n.as_str(), v.as_str())));

            GeneratorConfig::from_macros(&macros, python)?
        }
    };

    config.parser = parser;
    config.defines = defines;

    if let Some(url) = string_option(args, "index_url") {
        config.index_url = url.to_string();
    }

    if let Some(dir) = args.get_one::<PathBuf>("common-licenses-dir") {
        config.load_common_licenses(dir)?;
    }

    Ok(config)
}

fn spec_parser(config: &GeneratorConfig) -> Box<dyn SpecParser> {
    match config.parser {
        ParserKind::RpmSpec => {
            let mut parser = RpmSpecParser::default();
            for (name, value) in &config.defines {
                parser.define(name, value);
            }

            Box::new(parser)
        }
        ParserKind::Builtin => Box::new(StructuralSpecParser),
    }
}

fn spec_request(args: &ArgMatches, cwd: &Path) -> SpecRequest {
    let mut request = SpecRequest::new(
        string_option(args, "module").unwrap_or_default(),
        string_option(args, "package_version").unwrap_or_default(),
    );

    if let Some(release) = string_option(args, "release") {
        request.release = release.to_string();
    }
    if let Some(suffix) = string_option(args, "suffix") {
        request.suffix = suffix.to_string();
    }
    request.changelog = args.get_flag("changelog");
    request.options = package_options(args, cwd);

    request
}

pub fn run() -> Result<()> {
    let matches = command().get_matches();

    init_logging(matches.get_count("verbose"));

    let cwd = std::env::current_dir()?;
    let config = resolve_config(&matches)?;
    let request = spec_request(&matches, &cwd);
    let parser = spec_parser(&config);

    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();

    generate::pyspec(&config, &request, parser.as_ref(), &mut stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_valid() {
        command().debug_assert();
    }

    #[test]
    fn request_from_args() -> Result<()> {
        let matches = command().try_get_matches_from([
            "pyspec",
            "-vv",
            "demo-pkg",
            "1.0",
            "--release",
            "3",
            "--changelog",
            "--requires",
            "python-six, python-idna",
            "--requires",
            "python-attrs",
            "--force-arch",
            "x86_64",
            "--post-install",
            "scripts/post.sh",
            "--define",
            "_topdir /srv/rpm",
        ])?;

        assert_eq!(matches.get_count("verbose"), 2);

        let request = spec_request(&matches, Path::new("/work"));
        assert_eq!(request.module, "demo-pkg");
        assert_eq!(request.version, "1.0");
        assert_eq!(request.release, "3");
        assert_eq!(request.suffix, "tar.gz");
        assert!(request.changelog);
        assert_eq!(
            request.options.requires,
            vec!["python-six", "python-idna", "python-attrs"]
        );
        assert_eq!(request.options.force_arch.as_deref(), Some("x86_64"));
        assert_eq!(
            request.options.post_install,
            Some(PathBuf::from("/work/scripts/post.sh"))
        );
        assert_eq!(request.options.build_script, None);

        assert_eq!(string_option(&matches, "parser"), Some("rpmspec"));
        assert_eq!(string_option(&matches, "python"), Some(PYTHON_MACRO));

        Ok(())
    }
}
