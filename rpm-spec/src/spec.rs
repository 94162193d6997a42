// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Defines primitives in spec files.

See https://rpm-software-management.github.io/rpm/manual/spec.html
for the canonical source of truth for how spec files work.
*/

use std::{borrow::Cow, io::Write};

/// Column at which preamble tag values start.
const TAG_VALUE_COLUMN: usize = 16;
const TAB_WIDTH: usize = 8;

/// A named section of a spec file.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum SectionKind {
    Preamble,
    Description,
    Prep,
    Build,
    Install,
    Check,
    Pre,
    Post,
    Preun,
    Postun,
    Files,
    Changelog,
}

impl SectionKind {
    /// Sections holding shell scripts run at some point of the package lifecycle.
    ///
    /// Ordered the way they are emitted.
    pub const LIFECYCLE: [SectionKind; 8] = [
        Self::Prep,
        Self::Build,
        Self::Install,
        Self::Check,
        Self::Pre,
        Self::Post,
        Self::Preun,
        Self::Postun,
    ];

    /// The name of the section, without the leading `%`.
    ///
    /// The preamble has no header and therefore no name.
    pub fn name(&self) -> Option<&'static str> {
        match self {
            Self::Preamble => None,
            Self::Description => Some("description"),
            Self::Prep => Some("prep"),
            Self::Build => Some("build"),
            Self::Install => Some("install"),
            Self::Check => Some("check"),
            Self::Pre => Some("pre"),
            Self::Post => Some("post"),
            Self::Preun => Some("preun"),
            Self::Postun => Some("postun"),
            Self::Files => Some("files"),
            Self::Changelog => Some("changelog"),
        }
    }

    /// The header line introducing the section, e.g. `%files`.
    pub fn header(&self) -> Option<String> {
        self.name().map(|name| format!("%{}", name))
    }
}

/// A tag in the spec preamble, e.g. `Name: foo`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SpecTag<'a> {
    name: Cow<'a, str>,
    value: Cow<'a, str>,
}

impl<'a> SpecTag<'a> {
    pub fn new(name: impl Into<Cow<'a, str>>, value: impl Into<Cow<'a, str>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Render the tag as a line.
    ///
    /// The value is tab aligned to a common column so the preamble reads as a table.
    pub fn line(&self) -> String {
        let label = format!("{}:", self.name);

        let mut tabs = 1;
        let mut column = (label.len() / TAB_WIDTH + 1) * TAB_WIDTH;
        while column < TAG_VALUE_COLUMN {
            column += TAB_WIDTH;
            tabs += 1;
        }

        format!("{}{}{}", label, "\t".repeat(tabs), self.value)
    }
}

/// An entry in the spec preamble.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PreambleEntry<'a> {
    /// A `%define` macro definition.
    Define(Cow<'a, str>, Cow<'a, str>),
    /// An empty line.
    Blank,
    Tag(SpecTag<'a>),
}

impl<'a> PreambleEntry<'a> {
    pub fn line(&self) -> String {
        match self {
            Self::Define(name, value) => format!("%define\t{}\t{}", name, value),
            Self::Blank => String::new(),
            Self::Tag(tag) => tag.line(),
        }
    }
}

/// A section of a spec file following the preamble.
///
/// A section is a header line followed by an ordered series of body lines.
#[derive(Clone, Debug)]
pub struct SpecSection<'a> {
    kind: SectionKind,
    lines: Vec<Cow<'a, str>>,
}

impl<'a> SpecSection<'a> {
    pub fn new(kind: SectionKind) -> Self {
        Self {
            kind,
            lines: vec![],
        }
    }

    /// Append a line to the section body.
    pub fn add_line(&mut self, line: impl Into<Cow<'a, str>>) {
        self.lines.push(line.into());
    }

    /// Append multiple lines to the section body.
    pub fn extend_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<Cow<'a, str>>,
    {
        self.lines.extend(lines.into_iter().map(|l| l.into()));
    }

    /// Body lines of this section, without the header.
    pub fn body(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|l| l.as_ref())
    }
}

/// A spec file.
///
/// A spec file is a preamble followed by an ordered series of sections.
/// Each section is separated from what precedes it by an empty line.
#[derive(Clone, Debug, Default)]
pub struct SpecFile<'a> {
    preamble: Vec<PreambleEntry<'a>>,
    sections: Vec<SpecSection<'a>>,
}

impl<'a> SpecFile<'a> {
    /// Add a `%define` to the preamble.
    pub fn add_define(&mut self, name: impl Into<Cow<'a, str>>, value: impl Into<Cow<'a, str>>) {
        self.preamble
            .push(PreambleEntry::Define(name.into(), value.into()));
    }

    /// Add an empty line to the preamble.
    pub fn add_blank(&mut self) {
        self.preamble.push(PreambleEntry::Blank);
    }

    /// Add a tag to the preamble.
    pub fn add_tag(&mut self, name: impl Into<Cow<'a, str>>, value: impl Into<Cow<'a, str>>) {
        self.preamble
            .push(PreambleEntry::Tag(SpecTag::new(name, value)));
    }

    /// Add a section.
    pub fn add_section(&mut self, section: SpecSection<'a>) {
        self.sections.push(section);
    }

    /// Obtain the first tag with the given name.
    ///
    /// Tag names are case insensitive.
    pub fn tag(&self, name: &str) -> Option<&SpecTag<'a>> {
        self.tags().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Iterate over all tags in the preamble.
    pub fn tags(&self) -> impl Iterator<Item = &SpecTag<'a>> {
        self.preamble.iter().filter_map(|e| match e {
            PreambleEntry::Tag(tag) => Some(tag),
            _ => None,
        })
    }

    /// Obtain the first section of a given kind.
    pub fn section(&self, kind: SectionKind) -> Option<&SpecSection<'a>> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// Render the spec file as an ordered series of lines.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = self
            .preamble
            .iter()
            .map(|e| e.line())
            .collect::<Vec<_>>();

        for section in &self.sections {
            lines.push(String::new());
            if let Some(header) = section.kind.header() {
                lines.push(header);
            }
            lines.extend(section.body().map(|l| l.to_string()));
        }

        lines
    }

    /// Serialize the spec file to a writer.
    ///
    /// Lines are separated by newlines. No newline follows the final line.
    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(self.lines().join("\n").as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, anyhow::Result};

    #[test]
    fn tag_alignment() {
        assert_eq!(SpecTag::new("Name", "foo").line(), "Name:\t\tfoo");
        assert_eq!(SpecTag::new("Group", "x").line(), "Group:\t\tx");
        assert_eq!(SpecTag::new("Url", "x").line(), "Url:\t\tx");
        assert_eq!(SpecTag::new("Version", "1.0").line(), "Version:\t1.0");
        assert_eq!(SpecTag::new("Summary", "s").line(), "Summary:\ts");
        assert_eq!(SpecTag::new("Provides", "p").line(), "Provides:\tp");
        assert_eq!(
            SpecTag::new("BuildRequires", "python-devel").line(),
            "BuildRequires:\tpython-devel"
        );
    }

    #[test]
    fn render_sections() -> Result<()> {
        let mut spec = SpecFile::default();
        spec.add_define("module", "foo");
        spec.add_blank();
        spec.add_tag("Name", "python-%{module}");

        let mut description = SpecSection::new(SectionKind::Description);
        description.add_line("A package.");
        spec.add_section(description);

        let mut files = SpecSection::new(SectionKind::Files);
        files.extend_lines(["%doc README", "%{_bindir}/foo"]);
        spec.add_section(files);

        assert_eq!(spec.tag("name").map(|t| t.value()), Some("python-%{module}"));
        assert_eq!(
            spec.section(SectionKind::Files)
                .map(|s| s.body().collect::<Vec<_>>()),
            Some(vec!["%doc README", "%{_bindir}/foo"])
        );
        assert!(spec.section(SectionKind::Changelog).is_none());

        let mut buf = vec![];
        spec.write(&mut buf)?;
        assert_eq!(
            String::from_utf8(buf)?,
            "%define\tmodule\tfoo\n\nName:\t\tpython-%{module}\n\n%description\nA package.\n\n%files\n%doc README\n%{_bindir}/foo"
        );

        Ok(())
    }
}
