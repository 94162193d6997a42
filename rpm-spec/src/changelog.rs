// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Defines types representing `%changelog` entries. */

use {
    chrono::{DateTime, Utc},
    std::borrow::Cow,
};

/// Date format of changelog entry headers.
///
/// chrono renders weekday and month names in English regardless of the
/// process locale, which is what rpm requires.
const CHANGELOG_DATE_FORMAT: &str = "%a %b %d %Y";

#[derive(Clone, Debug)]
pub struct ChangelogEntry<'a> {
    pub date: DateTime<Utc>,
    pub packager: Cow<'a, str>,
    pub version: Cow<'a, str>,
    pub release: Cow<'a, str>,
    pub details: Vec<Cow<'a, str>>,
}

impl<'a> ChangelogEntry<'a> {
    /// Render the entry as lines of a `%changelog` section.
    pub fn lines(&self) -> Vec<String> {
        /*
        * Www Mmm DD YYYY packager version-release
        - change details
        - more change details
        */
        let mut lines = vec![format!(
            "* {} {} {}-{}",
            self.date.format(CHANGELOG_DATE_FORMAT),
            self.packager,
            self.version,
            self.release
        )];

        lines.extend(self.details.iter().map(|d| format!("- {}", d)));

        lines
    }
}
