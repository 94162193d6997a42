// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Post-processing of spec text produced by a spec parser. */

use std::io::Write;

/// Placeholder distutils writes for metadata fields that were never set.
///
/// Mirrors `UNKNOWN_VALUE` in `python-sdist`, which this crate does not depend on.
pub const UNKNOWN_PLACEHOLDER: &str = "UNKNOWN";

/// Clean up parsed spec text for output.
///
/// Leading empty lines are dropped, as is every line mentioning
/// [UNKNOWN_PLACEHOLDER]. Trailing newlines are removed.
pub fn finalize_parsed_spec(parsed: &str) -> String {
    let mut output = String::with_capacity(parsed.len());

    for line in parsed
        .split('\n')
        .skip_while(|line| line.is_empty())
        .filter(|line| !line.contains(UNKNOWN_PLACEHOLDER))
    {
        output.push_str(line);
        output.push('\n');
    }

    output.truncate(output.trim_end_matches('\n').len());

    output
}

/// Write finalized spec text to a writer.
pub fn write_parsed_spec<W: Write>(parsed: &str, writer: &mut W) -> std::io::Result<()> {
    writer.write_all(finalize_parsed_spec(parsed).as_bytes())?;
    writer.flush()
}
