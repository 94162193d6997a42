// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Python Source Distributions

This crate exposes functionality for unpacking Python source distributions
and learning what they contain, both from their packaging metadata and by
asking a Python interpreter to configure their `setup.py`.
*/

pub mod archive;
pub mod bdist_rpm;
pub mod distribution;
pub mod introspect;
pub mod licensing;
pub mod package_metadata;
