// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Expansion of rpm macros.

Macros are the `%{name}` placeholders rpm substitutes with paths, commands and
other host specific values. [MacroExpander] abstracts over where definitions
come from: the host macro database or an in-memory table.
*/

use {
    crate::error::{Result, RpmSpecError},
    duct::cmd,
    log::debug,
    std::{
        collections::BTreeMap,
        ffi::OsString,
        path::PathBuf,
    },
};

/// Nesting limit for macro expansion, matching rpm's.
const MAX_EXPANSION_DEPTH: usize = 64;

/// Something that can expand rpm macro expressions.
pub trait MacroExpander {
    /// Expand all macros in an expression.
    ///
    /// Undefined macros are left in place, as rpm does.
    fn expand(&self, expression: &str) -> Result<String>;
}

/// Expands macros by asking `rpm --eval`.
#[derive(Clone, Debug)]
pub struct RpmMacroExpander {
    program: PathBuf,
    defines: Vec<(String, String)>,
}

impl Default for RpmMacroExpander {
    fn default() -> Self {
        Self {
            program: PathBuf::from("rpm"),
            defines: vec![],
        }
    }
}

impl RpmMacroExpander {
    /// Define a macro for every subsequent evaluation, like `rpm --define`.
    pub fn define(&mut self, name: impl ToString, value: impl ToString) {
        self.defines.push((name.to_string(), value.to_string()));
    }

    fn args(&self, expression: &str) -> Vec<OsString> {
        let mut args = vec![];

        for (name, value) in &self.defines {
            args.push("--define".into());
            args.push(format!("{} {}", name, value).into());
        }

        args.push("--eval".into());
        args.push(expression.into());

        args
    }
}

impl MacroExpander for RpmMacroExpander {
    fn expand(&self, expression: &str) -> Result<String> {
        debug!("evaluating {} with {}", expression, self.program.display());

        let output = cmd(&self.program, self.args(expression))
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()?;

        if !output.status.success() {
            return Err(RpmSpecError::CommandFailed(
                format!("{} --eval {}", self.program.display(), expression),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let value = String::from_utf8(output.stdout)?;

        Ok(value.trim_end_matches('\n').to_string())
    }
}

/// An in-memory table of macro definitions.
///
/// Supports the subset of the macro language needed to resolve paths and
/// identities: `%name`, `%{name}`, `%{?name}`, `%{?name:text}`,
/// `%{!?name:text}` (also spelled `%{?!name:text}`) and `%%`.
#[derive(Clone, Debug, Default)]
pub struct MacroTable {
    definitions: BTreeMap<String, String>,
}

impl MacroTable {
    pub fn define(&mut self, name: impl ToString, value: impl ToString) {
        self.definitions.insert(name.to_string(), value.to_string());
    }

    fn expand_depth(&self, input: &str, depth: usize) -> Result<String> {
        if depth > MAX_EXPANSION_DEPTH {
            return Err(RpmSpecError::MacroRecursion(input.to_string()));
        }

        let mut res = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(pos) = rest.find('%') {
            res.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            if let Some(after) = after.strip_prefix('%') {
                res.push('%');
                rest = after;
            } else if let Some(inner) = after.strip_prefix('{') {
                let end = find_closing_brace(inner)
                    .ok_or_else(|| RpmSpecError::UnterminatedMacro(rest.to_string()))?;

                res.push_str(&self.expand_braced(&inner[..end], depth)?);
                rest = &inner[end + 1..];
            } else {
                let name_len = after
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                    .count();
                let name = &after[..name_len];

                match self.definitions.get(name) {
                    Some(value) if !name.is_empty() => {
                        res.push_str(&self.expand_depth(value, depth + 1)?);
                    }
                    _ => {
                        res.push('%');
                        res.push_str(name);
                    }
                }
                rest = &after[name_len..];
            }
        }

        res.push_str(rest);

        Ok(res)
    }

    /// Expand the inside of a `%{...}` expression.
    fn expand_braced(&self, body: &str, depth: usize) -> Result<String> {
        let flags_len = body.chars().take_while(|c| *c == '?' || *c == '!').count();
        let (flags, body) = body.split_at(flags_len);
        let conditional = flags.contains('?');
        let negated = flags.contains('!');

        let (name, arg) = match body.find(':') {
            Some(pos) => (&body[..pos], Some(&body[pos + 1..])),
            None => (body, None),
        };

        let value = self.definitions.get(name);

        if conditional {
            let matched = value.is_some() != negated;

            return match (matched, arg, value) {
                (true, Some(arg), _) => self.expand_depth(arg, depth + 1),
                (true, None, Some(value)) => self.expand_depth(value, depth + 1),
                _ => Ok(String::new()),
            };
        }

        match value {
            Some(value) => self.expand_depth(value, depth + 1),
            None => Ok(format!("%{{{}{}}}", flags, body)),
        }
    }
}

impl MacroExpander for MacroTable {
    fn expand(&self, expression: &str) -> Result<String> {
        self.expand_depth(expression, 0)
    }
}

/// Find the offset of the `}` closing an expression, honoring nesting.
fn find_closing_brace(s: &str) -> Option<usize> {
    let mut level = 0;

    for (i, c) in s.char_indices() {
        match c {
            '{' => level += 1,
            '}' if level == 0 => return Some(i),
            '}' => level -= 1,
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use {super::*, anyhow::Result};

    fn table() -> MacroTable {
        let mut t = MacroTable::default();
        t.define("_topdir", "/home/builder/rpmbuild");
        t.define("_builddir", "%{_topdir}/BUILD");
        t.define("__python", "/usr/bin/python3");
        t
    }

    #[test]
    fn plain_expansion() -> Result<()> {
        let t = table();

        assert_eq!(t.expand("%{_builddir}")?, "/home/builder/rpmbuild/BUILD");
        assert_eq!(t.expand("%__python setup.py")?, "/usr/bin/python3 setup.py");
        assert_eq!(t.expand("100%%")?, "100%");
        assert_eq!(t.expand("%{undefined}/x")?, "%{undefined}/x");
        assert_eq!(t.expand("%undefined")?, "%undefined");
        assert_eq!(t.expand("no macros")?, "no macros");

        Ok(())
    }

    #[test]
    fn conditional_expansion() -> Result<()> {
        let mut t = table();
        let expr = "%{?packager}%{?!packager:Unnamed Loser <foo@bar.cum>}";

        assert_eq!(t.expand(expr)?, "Unnamed Loser <foo@bar.cum>");
        assert_eq!(t.expand("%{!?packager:fallback}")?, "fallback");
        assert_eq!(t.expand("%{?packager:set}")?, "");

        t.define("packager", "Jane Doe <jane@example.com>");
        assert_eq!(t.expand(expr)?, "Jane Doe <jane@example.com>");
        assert_eq!(t.expand("%{?packager:set}")?, "set");
        assert_eq!(t.expand("%{?__python:%{__python} -c}")?, "/usr/bin/python3 -c");

        Ok(())
    }

    #[test]
    fn errors() {
        let mut t = MacroTable::default();
        assert!(matches!(
            t.expand("%{_builddir"),
            Err(RpmSpecError::UnterminatedMacro(_))
        ));

        t.define("loop", "%{loop}");
        assert!(matches!(
            t.expand("%{loop}"),
            Err(RpmSpecError::MacroRecursion(_))
        ));
    }

    #[test]
    fn rpm_eval_arguments() {
        let mut rpm = RpmMacroExpander::default();
        rpm.define("_topdir", "/tmp/top");

        assert_eq!(
            rpm.args("%{_topdir}"),
            vec![
                OsString::from("--define"),
                OsString::from("_topdir /tmp/top"),
                OsString::from("--eval"),
                OsString::from("%{_topdir}"),
            ]
        );
    }
}
