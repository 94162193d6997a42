// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use thiserror::Error;

/// Primary crate error type.
#[derive(Debug, Error)]
pub enum RpmSpecError {
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("invalid UTF-8 in command output: {0:?}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("command `{0}` failed: {1}")]
    CommandFailed(String, String),

    #[error("macro expansion too deep: {0}")]
    MacroRecursion(String),

    #[error("unterminated macro expression: {0}")]
    UnterminatedMacro(String),

    #[error("required tag missing from spec preamble: {0}")]
    MissingTag(&'static str),

    #[error("spec preamble line {0} is not a tag: {1}")]
    MalformedTag(usize, String),

    #[error("unknown spec section on line {0}: {1}")]
    UnknownSection(usize, String),

    #[error("required section missing from spec: %{0}")]
    MissingSection(&'static str),
}

/// Result wrapper for this crate.
pub type Result<T> = std::result::Result<T, RpmSpecError>;
