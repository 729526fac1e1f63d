// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Helpers shared by the container field mappers.

use itertools::Itertools;

/// Separator used when multiple values of a field are joined into a single string.
pub const MULTIFIELD_SEPARATOR: &str = " - ";

/// Returns `true` if the value is empty or consists only of whitespace.
#[must_use]
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Returns the value if it is not blank.
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !is_blank(value))
}

/// Join the non-blank values with the [`MULTIFIELD_SEPARATOR`].
///
/// Returns `None` if there is no non-blank value.
#[must_use]
pub fn join_values<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let joined = values
        .into_iter()
        .filter(|value| !is_blank(value))
        .join(MULTIFIELD_SEPARATOR);
    (!joined.is_empty()).then_some(joined)
}

/// Split a joined value on the [`MULTIFIELD_SEPARATOR`], leaving out blank pieces.
pub fn split_values(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(MULTIFIELD_SEPARATOR)
        .filter(|piece| !is_blank(piece))
}

/// Parse the leading integer of a string.
///
/// Leading whitespace and a single sign are accepted. Parsing stops at the first character that
/// is not a digit, and a string without leading digits yields `0`. Values that do not fit are
/// clamped.
#[must_use]
pub fn parse_leading_int(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, digit| {
            acc.saturating_mul(10).saturating_add(i64::from(digit - b'0'))
        });
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Split a `number/total` value into its parts.
///
/// The total is `None` if the value contains no `/`.
#[must_use]
pub fn split_number_pair(value: &str) -> (&str, Option<&str>) {
    match value.split_once('/') {
        Some((number, total)) => (number, Some(total)),
        None => (value, None),
    }
}
