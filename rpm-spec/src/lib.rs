// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! RPM spec file primitives.

This crate defines a model of spec files for describing how to build
RPM packages, along with the seams needed to turn one into final text:
expansion of rpm macros and parsing of the rendered spec.
*/

mod changelog;
pub mod error;
pub mod macros;
pub mod output;
pub mod parse;
mod spec;

pub use {
    changelog::ChangelogEntry,
    error::{Result, RpmSpecError},
    macros::{MacroExpander, MacroTable, RpmMacroExpander},
    output::{finalize_parsed_spec, write_parsed_spec},
    parse::{RpmSpecParser, SpecParser, StructuralSpecParser},
    spec::{PreambleEntry, SectionKind, SpecFile, SpecSection, SpecTag},
};
