// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Conversion between raw file system paths, raw tag bytes and UTF-8 display strings.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Crosses the boundary between raw bytes (file names, tag payloads) and UTF-8 strings.
pub trait Charset {
    /// Convert a UTF-8 display path into the raw form used by the file system.
    fn display_to_raw(&self, display: &str) -> PathBuf;

    /// Convert a raw file system path into a UTF-8 display string.
    fn raw_to_display(&self, raw: &Path) -> String;

    /// Turn arbitrary bytes into valid UTF-8, replacing invalid sequences instead of failing.
    fn sanitize<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        String::from_utf8_lossy(bytes)
    }
}

/// Charset for systems where file names are UTF-8 (or close enough to it).
#[derive(Debug, Default, Clone, Copy)]
pub struct Utf8Charset;

impl Charset for Utf8Charset {
    fn display_to_raw(&self, display: &str) -> PathBuf {
        PathBuf::from(display)
    }

    fn raw_to_display(&self, raw: &Path) -> String {
        raw.to_string_lossy().into_owned()
    }
}
