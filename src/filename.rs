// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! File names with collation keys for change detection and natural sorting.

use crate::charset::Charset;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use unidecode::unidecode;

/// Sorts before everything else on the primary level.
const DOT_MARKER: u8 = 0x01;

/// Introduces an encoded digit run.
const NUMBER_MARKER: u8 = 0x02;

/// Separates the primary level from the exact display string.
const LEVEL_SEPARATOR: u8 = 0x00;

/// A file name in raw and display form, together with its collation key.
///
/// A file name is never modified after construction. When the path changes, a new [`FileName`]
/// is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileName {
    /// Path as used by the file system.
    raw: Option<PathBuf>,
    /// Path as UTF-8 for display.
    display: Option<String>,
    /// Collation key computed from the display form.
    collation_key: Option<Vec<u8>>,
    /// Whether this file name has been persisted (i.e., the file has been renamed to it).
    pub saved: bool,
}

impl FileName {
    /// Create a file name without a path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a file name from the display form and/or the raw form.
    ///
    /// The form that is missing is derived from the other one using the charset. If neither form
    /// is given, the resulting file name has no path.
    #[must_use]
    pub fn with_path(display: Option<&str>, raw: Option<&Path>, charset: &impl Charset) -> Self {
        let (display, raw) = match (display, raw) {
            (Some(display), Some(raw)) => (display.to_owned(), raw.to_path_buf()),
            (Some(display), None) => (display.to_owned(), charset.display_to_raw(display)),
            (None, Some(raw)) => (charset.raw_to_display(raw), raw.to_path_buf()),
            (None, None) => return Self::new(),
        };
        let collation_key = collate_key_for_filename(&display);
        FileName {
            raw: Some(raw),
            display: Some(display),
            collation_key: Some(collation_key),
            saved: false,
        }
    }

    /// Create a file name from its UTF-8 display form.
    #[must_use]
    pub fn from_display(display: &str, charset: &impl Charset) -> Self {
        Self::with_path(Some(display), None, charset)
    }

    /// Create a file name from its raw file system form.
    #[must_use]
    pub fn from_raw(raw: &Path, charset: &impl Charset) -> Self {
        Self::with_path(None, Some(raw), charset)
    }

    /// The raw path, if any.
    #[must_use]
    pub fn raw(&self) -> Option<&Path> {
        self.raw.as_deref()
    }

    /// The display path, if any.
    #[must_use]
    pub fn display(&self) -> Option<&str> {
        self.display.as_deref()
    }

    /// The collation key, if the file name has a path.
    #[must_use]
    pub fn collation_key(&self) -> Option<&[u8]> {
        self.collation_key.as_deref()
    }

    /// Returns `true` if the two file names are not the same.
    ///
    /// Two file names without a path are the same, a file name with a path is never the same as
    /// one without. Otherwise, only the collation keys are compared.
    #[must_use]
    pub fn differs(&self, other: &Self) -> bool {
        match (&self.collation_key, &other.collation_key) {
            (None, None) => false,
            (Some(lhs), Some(rhs)) => lhs != rhs,
            _ => true,
        }
    }

    /// Compare two file names in natural order (numbers compared by value).
    ///
    /// File names without a path sort first.
    #[must_use]
    pub fn natural_cmp(&self, other: &Self) -> Ordering {
        self.collation_key.cmp(&other.collation_key)
    }
}

/// Returns `true` if the two file names are not the same.
///
/// See [`FileName::differs`].
#[must_use]
pub fn differs(lhs: &FileName, rhs: &FileName) -> bool {
    lhs.differs(rhs)
}

/// Compute a collation key for a file name.
///
/// Comparing two keys bytewise sorts the file names case-insensitively, with digit runs compared
/// by their numeric value, so that "file1", "file5", "file10" are in that order. The exact
/// display string is appended after the primary level, hence two keys are only equal if the
/// strings they were computed from are equal.
#[must_use]
pub fn collate_key_for_filename(display: &str) -> Vec<u8> {
    let mut primary = unidecode(display);
    primary.make_ascii_lowercase();

    let mut key = Vec::with_capacity(primary.len() + display.len() + 1);
    let mut bytes = primary.bytes().peekable();
    while let Some(byte) = bytes.next() {
        match byte {
            b'.' => key.push(DOT_MARKER),
            b'0'..=b'9' => {
                let mut digits = vec![byte];
                while let Some(digit) = bytes.next_if(u8::is_ascii_digit) {
                    digits.push(digit);
                }
                let significant = match digits.iter().position(|&d| d != b'0') {
                    Some(start) => &digits[start..],
                    None => &digits[digits.len() - 1..],
                };
                // The length byte orders numbers of different magnitude. It starts at 1 and
                // saturates, so it never collides with the level separator.
                let length = u8::try_from(significant.len()).unwrap_or(u8::MAX).max(1);
                key.push(NUMBER_MARKER);
                key.push(length);
                key.extend_from_slice(significant);
            }
            // Control characters would sort among the markers.
            byte if byte < 0x20 => key.push(b' '),
            byte => key.push(byte),
        }
    }

    key.push(LEVEL_SEPARATOR);
    key.extend_from_slice(display.as_bytes());
    key
}
