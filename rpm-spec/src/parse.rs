// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Parsing and validation of spec files. */

use {
    crate::error::{Result, RpmSpecError},
    duct::cmd,
    log::debug,
    std::path::{Path, PathBuf},
};

/// Tags rpm refuses to build without.
const REQUIRED_TAGS: &[&str] = &["Name", "Version", "Release", "Summary", "License"];

/// Section names recognized by the built-in validator.
const KNOWN_SECTIONS: &[&str] = &[
    "description",
    "package",
    "prep",
    "generate_buildrequires",
    "conf",
    "build",
    "install",
    "check",
    "clean",
    "pre",
    "post",
    "preun",
    "postun",
    "pretrans",
    "posttrans",
    "preuntrans",
    "postuntrans",
    "triggerprein",
    "triggerin",
    "triggerun",
    "triggerpostun",
    "verifyscript",
    "files",
    "changelog",
];

/// Preamble directives that are neither tags nor section headers.
const PREAMBLE_DIRECTIVES: &[&str] = &[
    "define", "global", "undefine", "if", "ifarch", "ifnarch", "ifos", "ifnos", "elif", "else",
    "endif",
];

/// Something that parses a spec file on disk.
///
/// On success the parsed spec text is returned.
pub trait SpecParser {
    fn parse(&self, path: &Path) -> Result<String>;
}

/// Parses spec files with `rpmspec --parse`.
///
/// The returned text has all macros expanded.
#[derive(Clone, Debug)]
pub struct RpmSpecParser {
    program: PathBuf,
    defines: Vec<(String, String)>,
}

impl Default for RpmSpecParser {
    fn default() -> Self {
        Self {
            program: PathBuf::from("rpmspec"),
            defines: vec![],
        }
    }
}

impl RpmSpecParser {
    /// Define a macro for parsing, like `rpmspec --define`.
    pub fn define(&mut self, name: impl ToString, value: impl ToString) {
        self.defines.push((name.to_string(), value.to_string()));
    }
}

impl SpecParser for RpmSpecParser {
    fn parse(&self, path: &Path) -> Result<String> {
        debug!("parsing {} with {}", path.display(), self.program.display());

        let mut args = vec![];
        for (name, value) in &self.defines {
            args.push("--define".to_string());
            args.push(format!("{} {}", name, value));
        }
        args.push("--parse".to_string());
        args.push(path.display().to_string());

        let output = cmd(&self.program, &args)
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()?;

        if !output.status.success() {
            return Err(RpmSpecError::CommandFailed(
                format!("{} {}", self.program.display(), args.join(" ")),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8(output.stdout)?)
    }
}

/// Validates the structure of spec files without rpm tooling.
///
/// The preamble must consist of tags and macro directives and contain all
/// required tags. Section headers must be known and `%description` must be
/// present. The text is returned unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct StructuralSpecParser;

impl StructuralSpecParser {
    pub fn validate(&self, text: &str) -> Result<()> {
        let mut in_preamble = true;
        let mut tags = vec![];
        let mut have_description = false;

        for (i, line) in text.lines().enumerate() {
            let lineno = i + 1;
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if let Some(directive) = section_word(trimmed) {
                if KNOWN_SECTIONS.contains(&directive) {
                    in_preamble = false;
                    have_description |= directive == "description";
                    continue;
                }

                if in_preamble && !PREAMBLE_DIRECTIVES.contains(&directive) {
                    return Err(RpmSpecError::UnknownSection(lineno, line.to_string()));
                }

                continue;
            }

            if in_preamble {
                let name = trimmed
                    .split_once(':')
                    .map(|(name, _)| name.trim())
                    .filter(|name| is_tag_name(name))
                    .ok_or_else(|| RpmSpecError::MalformedTag(lineno, line.to_string()))?;

                tags.push(name.to_ascii_lowercase());
            }
        }

        for required in REQUIRED_TAGS {
            if !tags.iter().any(|t| t == &required.to_ascii_lowercase()) {
                return Err(RpmSpecError::MissingTag(required));
            }
        }

        if !have_description {
            return Err(RpmSpecError::MissingSection("description"));
        }

        Ok(())
    }
}

impl SpecParser for StructuralSpecParser {
    fn parse(&self, path: &Path) -> Result<String> {
        let text = std::fs::read_to_string(path)?;
        self.validate(&text)?;

        Ok(text)
    }
}

/// Obtain the directive name of a line starting with `%`, e.g. `files` for `%files -f x`.
///
/// Lines starting with a macro expression like `%{...}` have no directive name.
fn section_word(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('%')?;
    let word = rest.split_whitespace().next()?;

    if word.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Some(word)
    } else {
        None
    }
}

/// Whether a string is a valid tag name like `Source0` or `Requires(post)`.
fn is_tag_name(name: &str) -> bool {
    let base = match name.split_once('(') {
        Some((base, qualifier)) if qualifier.ends_with(')') => base,
        Some(_) => return false,
        None => name,
    };

    !base.is_empty() && base.chars().all(|c| c.is_ascii_alphanumeric())
}
