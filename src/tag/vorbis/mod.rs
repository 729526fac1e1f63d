// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Support for Vorbis comments in Ogg Vorbis and Ogg Opus files.

mod header;
mod mapping;
mod stream;

pub use header::{Codec, CommentHeader, HeaderError};
pub use mapping::{decode, encode, is_recognized, RECOGNIZED_KEYS};
pub use stream::{read_tag, skip_id3v2, write_tag};

use crate::charset::Charset;

/// An ordered list of Vorbis comments in `KEY=value` form.
///
/// Keys are matched case-insensitively. The same key may occur multiple times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VorbisComments {
    /// The comments in file order.
    entries: Vec<String>,
}

/// The value of a comment if its key matches.
fn value_of<'a>(entry: &'a str, key: &str) -> Option<&'a str> {
    entry
        .split_once('=')
        .filter(|(entry_key, _)| entry_key.eq_ignore_ascii_case(key))
        .map(|(_, value)| value)
}

impl VorbisComments {
    /// Create an empty comment list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a comment list from raw comment bytes, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn from_raw<'a>(raw: impl IntoIterator<Item = &'a [u8]>, charset: &impl Charset) -> Self {
        let entries = raw
            .into_iter()
            .map(|comment| charset.sanitize(comment).into_owned())
            .collect();
        VorbisComments { entries }
    }

    /// The comments as raw bytes, ready to be stored in a comment header.
    #[must_use]
    pub fn to_raw(&self) -> Vec<Vec<u8>> {
        self.entries
            .iter()
            .map(|entry| entry.as_bytes().to_vec())
            .collect()
    }

    /// All comments in order.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Number of comments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no comments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a comment.
    pub fn push(&mut self, key: &str, value: &str) {
        self.entries.push(format!("{key}={value}"));
    }

    /// Append a comment that is already in `KEY=value` form.
    pub fn push_raw(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    /// Append a field unless the value is blank.
    ///
    /// If `split` is set, the value is split on the multi-field separator and each piece is
    /// appended as a separate comment.
    pub fn push_field(&mut self, key: &str, value: Option<&str>, split: bool) {
        let Some(value) = super::fields::non_blank(value) else {
            return;
        };
        if split {
            for piece in super::fields::split_values(value) {
                self.push(key, piece);
            }
        } else {
            self.push(key, value);
        }
    }

    /// All values of the key, in order.
    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> {
        self.entries().filter_map(move |entry| value_of(entry, key))
    }

    /// The value of the `index`-th occurrence of the key.
    #[must_use]
    pub fn query(&self, key: &str, index: usize) -> Option<&str> {
        self.entries()
            .filter_map(|entry| value_of(entry, key))
            .nth(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::Utf8Charset;

    #[test]
    fn test_query_case_insensitive() {
        let mut comments = VorbisComments::new();
        comments.push_raw("Artist=Simon");
        comments.push_raw("ARTIST=Garfunkel");
        comments.push_raw("TITLE=The Boxer");

        assert_eq!(comments.query("artist", 0), Some("Simon"));
        assert_eq!(comments.query("ARTIST", 1), Some("Garfunkel"));
        assert_eq!(comments.query("ARTIST", 2), None);
        assert_eq!(comments.values("Title").collect::<Vec<_>>(), ["The Boxer"]);
    }

    #[test]
    fn test_query_empty_key() {
        let mut comments = VorbisComments::new();
        comments.push_raw("=untagged comment");
        comments.push_raw("no separator");
        assert_eq!(comments.query("", 0), Some("untagged comment"));
        assert_eq!(comments.query("", 1), None);
    }

    #[test]
    fn test_value_may_contain_separator() {
        let mut comments = VorbisComments::new();
        comments.push_raw("TITLE=a=b");
        assert_eq!(comments.query("TITLE", 0), Some("a=b"));
    }

    #[test]
    fn test_from_raw_sanitizes() {
        let raw: [&[u8]; 2] = [b"TITLE=Caf\xe9", b"ARTIST=Ok"];
        let comments = VorbisComments::from_raw(raw, &Utf8Charset);
        assert_eq!(comments.query("TITLE", 0), Some("Caf\u{fffd}"));
        assert_eq!(comments.len(), 2);
    }

    #[test]
    fn test_push_field() {
        let mut comments = VorbisComments::new();
        comments.push_field("ARTIST", Some("Simon - Garfunkel"), true);
        comments.push_field("ALBUM", Some("Bridge - Over"), false);
        comments.push_field("GENRE", Some("  "), false);
        comments.push_field("DATE", None, false);
        assert_eq!(
            comments.entries().collect::<Vec<_>>(),
            ["ARTIST=Simon", "ARTIST=Garfunkel", "ALBUM=Bridge - Over"]
        );
    }
}
