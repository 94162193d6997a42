// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Generate RPM spec files for Python packages.

Given the name and version of a package on a Python package index, the
source distribution is fetched and unpacked, its setup script is
introspected with a Python interpreter and a spec file describing how to
build and install it is produced.

The main entry point is [generate::pyspec]. [assembler::assemble] turns
already gathered metadata into a spec without touching the outside world.
*/

pub mod assembler;
pub mod classify;
pub mod config;
pub mod generate;
pub mod metadata;
pub mod pypi;
