// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Mapping between Vorbis comments and [`FileTag`] fields.

use super::VorbisComments;
use crate::config::{Config, NumberConfig, SplitField};
use crate::error::FieldError;
use crate::picture::{self, PictureType};
use crate::tag::fields::{join_values, non_blank, parse_leading_int, split_number_pair};
use crate::tag::{ExtensionField, FileTag};

/// Keys that are mapped to [`FileTag`] fields or pictures.
///
/// Comments with any other key are kept as [`ExtensionField`]s.
pub const RECOGNIZED_KEYS: [&str; 23] = [
    "TITLE",
    "ARTIST",
    "ALBUMARTIST",
    "ALBUM",
    "DISCNUMBER",
    "DISCTOTAL",
    "DATE",
    "TRACKNUMBER",
    "TRACKTOTAL",
    "GENRE",
    "DESCRIPTION",
    "COMMENT",
    "",
    "COMPOSER",
    "PERFORMER",
    "COPYRIGHT",
    "CONTACT",
    "ENCODED-BY",
    "COVERART",
    "COVERARTTYPE",
    "COVERARTMIME",
    "COVERARTDESCRIPTION",
    "METADATA_BLOCK_PICTURE",
];

/// Field that holds structured picture blocks.
const PICTURE_KEY: &str = "METADATA_BLOCK_PICTURE";

/// Field that holds legacy pictures.
const LEGACY_PICTURE_KEY: &str = "COVERART";

/// Returns `true` if the key of the `KEY=value` comment is one of the [`RECOGNIZED_KEYS`].
#[must_use]
pub fn is_recognized(entry: &str) -> bool {
    entry.split_once('=').is_some_and(|(key, _)| {
        RECOGNIZED_KEYS
            .iter()
            .any(|recognized| recognized.eq_ignore_ascii_case(key))
    })
}

/// Read a `number/total` pair from its first occurrence.
///
/// A non-blank dedicated total field takes precedence over a total after the `/`.
fn decode_number_pair<'a>(
    comments: &'a VorbisComments,
    number_key: &str,
    total_key: &str,
) -> (Option<&'a str>, Option<&'a str>) {
    let total = non_blank(comments.query(total_key, 0));
    match non_blank(comments.query(number_key, 0)) {
        Some(value) => {
            let (number, slash_total) = split_number_pair(value);
            (non_blank(Some(number)), total.or(non_blank(slash_total)))
        }
        None => (None, total),
    }
}

/// Render a number field with the configured formatting.
fn format_number(numbers: &NumberConfig, value: &str) -> String {
    numbers.format(parse_leading_int(value))
}

/// Comments, one per occurrence index.
///
/// At each index, `DESCRIPTION` is preferred over `COMMENT`, which is preferred over a comment
/// without key.
fn comment_values(comments: &VorbisComments) -> Vec<&str> {
    let mut values = Vec::new();
    for index in 0.. {
        let description = comments.query("DESCRIPTION", index);
        let comment = comments.query("COMMENT", index);
        let unkeyed = comments.query("", index);
        match description.or(comment).or(unkeyed) {
            Some(value) => values.push(value),
            None => break,
        }
    }
    values
}

/// Decode legacy and structured pictures. Invalid pictures are skipped.
fn decode_pictures(comments: &VorbisComments, tag: &mut FileTag, errors: &mut Vec<FieldError>) {
    for (index, value) in comments.values(LEGACY_PICTURE_KEY).enumerate() {
        let picture_type = comments
            .query("COVERARTTYPE", index)
            .and_then(|value| u32::try_from(parse_leading_int(value)).ok())
            .and_then(PictureType::from_u32);
        let description = comments.query("COVERARTDESCRIPTION", index);

        // Legacy pictures are always rewritten as picture blocks.
        tag.saved = false;
        match picture::decode_legacy(value, picture_type, description) {
            Ok(picture) => tag.pictures.push(picture),
            Err(reason) => errors.push(FieldError::DecodeSkipped {
                field: LEGACY_PICTURE_KEY,
                reason,
            }),
        }
    }

    for value in comments.values(PICTURE_KEY) {
        match picture::decode_block(value) {
            Ok(picture) => tag.pictures.push(picture),
            Err(reason) => errors.push(FieldError::DecodeSkipped {
                field: PICTURE_KEY,
                reason,
            }),
        }
    }
}

/// Decode Vorbis comments into a [`FileTag`].
///
/// Malformed fields are skipped and returned as errors. The tag is marked as saved unless
/// something was found that the next save will normalize.
#[must_use]
pub fn decode(comments: &VorbisComments, config: &Config) -> (FileTag, Vec<FieldError>) {
    let numbers = &config.numbers;
    let mut errors = Vec::new();
    let mut tag = FileTag {
        saved: true,
        ..FileTag::default()
    };

    tag.title = join_values(comments.values("TITLE"));
    tag.artist = join_values(comments.values("ARTIST"));
    tag.album_artist = join_values(comments.values("ALBUMARTIST"));
    tag.album = join_values(comments.values("ALBUM"));

    let (disc_number, disc_total) = decode_number_pair(comments, "DISCNUMBER", "DISCTOTAL");
    tag.disc_number = disc_number.map(|value| format_number(numbers, value));
    tag.disc_total = disc_total.map(|value| format_number(numbers, value));

    tag.year = non_blank(comments.query("DATE", 0)).map(ToOwned::to_owned);

    let (track_number, track_total) = decode_number_pair(comments, "TRACKNUMBER", "TRACKTOTAL");
    tag.track_number = track_number.map(ToOwned::to_owned);
    tag.track_total = track_total.map(|value| format_number(numbers, value));

    tag.genre = join_values(comments.values("GENRE"));
    tag.comment = join_values(comment_values(comments));
    tag.composer = join_values(comments.values("COMPOSER"));
    tag.original_artist = join_values(comments.values("PERFORMER"));
    tag.copyright = join_values(comments.values("COPYRIGHT"));
    tag.url = join_values(comments.values("CONTACT"));
    tag.encoded_by = join_values(comments.values("ENCODED-BY"));

    decode_pictures(comments, &mut tag, &mut errors);

    tag.other = comments
        .entries()
        .filter(|entry| !is_recognized(entry))
        .map(ExtensionField::new)
        .collect();

    if !errors.is_empty() {
        tag.saved = false;
    }
    (tag, errors)
}

/// Encode a [`FileTag`] as Vorbis comments.
///
/// Blank fields are left out. Pictures that cannot be stored are skipped and returned as errors.
/// Extension fields with a recognized key are superseded by the tag fields and left out.
#[must_use]
pub fn encode(tag: &FileTag, config: &Config) -> (VorbisComments, Vec<FieldError>) {
    let split = &config.split;
    let mut errors = Vec::new();
    let mut comments = VorbisComments::new();

    let title = tag.title.as_deref();
    comments.push_field("TITLE", title, split.should_split(SplitField::Title));
    let artist = tag.artist.as_deref();
    comments.push_field("ARTIST", artist, split.should_split(SplitField::Artist));
    let album_artist = tag.album_artist.as_deref();
    comments.push_field(
        "ALBUMARTIST",
        album_artist,
        split.should_split(SplitField::Artist),
    );
    let album = tag.album.as_deref();
    comments.push_field("ALBUM", album, split.should_split(SplitField::Album));
    comments.push_field("DISCNUMBER", tag.disc_number.as_deref(), false);
    comments.push_field("DISCTOTAL", tag.disc_total.as_deref(), false);
    comments.push_field("DATE", tag.year.as_deref(), false);
    comments.push_field("TRACKNUMBER", tag.track_number.as_deref(), false);
    comments.push_field("TRACKTOTAL", tag.track_total.as_deref(), false);
    let genre = tag.genre.as_deref();
    comments.push_field("GENRE", genre, split.should_split(SplitField::Genre));
    let comment = tag.comment.as_deref();
    comments.push_field(
        "DESCRIPTION",
        comment,
        split.should_split(SplitField::Comment),
    );
    let composer = tag.composer.as_deref();
    comments.push_field(
        "COMPOSER",
        composer,
        split.should_split(SplitField::Composer),
    );
    let original_artist = tag.original_artist.as_deref();
    comments.push_field(
        "PERFORMER",
        original_artist,
        split.should_split(SplitField::OriginalArtist),
    );
    comments.push_field("COPYRIGHT", tag.copyright.as_deref(), false);
    comments.push_field("CONTACT", tag.url.as_deref(), false);
    comments.push_field("ENCODED-BY", tag.encoded_by.as_deref(), false);

    for picture in &tag.pictures {
        match picture::encode_block(picture) {
            Ok(value) => comments.push(PICTURE_KEY, &value),
            Err(reason) => errors.push(FieldError::EncodeUnsupported(reason)),
        }
    }

    for field in &tag.other {
        if is_recognized(field.raw()) {
            log::debug!("Extension field {:?} is superseded", field.key());
            continue;
        }
        comments.push_raw(field.raw());
    }

    (comments, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picture::tests::{raw_block, PNG_DATA};
    use crate::picture::{Picture, PictureError};
    use crate::tag::TagKey;
    use base64::prelude::{Engine, BASE64_STANDARD};

    fn comments(entries: &[&str]) -> VorbisComments {
        let mut comments = VorbisComments::new();
        for entry in entries {
            comments.push_raw(*entry);
        }
        comments
    }

    fn decoded(entries: &[&str]) -> FileTag {
        let (tag, errors) = decode(&comments(entries), &Config::default());
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        tag
    }

    fn encoded(tag: &FileTag, config: &Config) -> Vec<String> {
        let (comments, errors) = encode(tag, config);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        comments.entries().map(ToOwned::to_owned).collect()
    }

    #[test]
    fn test_roundtrip_single_values() {
        let mut tag = FileTag::new();
        for (index, key) in TagKey::ALL.into_iter().enumerate() {
            tag.set(key, (index + 1).to_string());
        }
        tag.set(TagKey::TrackTitle, "So What");
        tag.set(TagKey::Year, "1959-08-17");
        tag.saved = true;

        let config = Config::default();
        let (comments, errors) = encode(&tag, &config);
        assert!(errors.is_empty());
        let (decoded, errors) = decode(&comments, &config);
        assert!(errors.is_empty());
        assert_eq!(decoded, tag);
    }

    #[test]
    fn test_encode_order() {
        let mut tag = FileTag::new();
        for key in TagKey::ALL {
            tag.set(key, "1");
        }
        let keys: Vec<_> = encoded(&tag, &Config::default())
            .into_iter()
            .map(|entry| entry.split_once('=').unwrap().0.to_owned())
            .collect();
        assert_eq!(
            keys,
            [
                "TITLE",
                "ARTIST",
                "ALBUMARTIST",
                "ALBUM",
                "DISCNUMBER",
                "DISCTOTAL",
                "DATE",
                "TRACKNUMBER",
                "TRACKTOTAL",
                "GENRE",
                "DESCRIPTION",
                "COMPOSER",
                "PERFORMER",
                "COPYRIGHT",
                "CONTACT",
                "ENCODED-BY",
            ]
        );
    }

    #[test]
    fn test_decode_joins_multiple_artists() {
        let tag = decoded(&["ARTIST=Simon", "ARTIST=  ", "ARTIST=Garfunkel"]);
        assert_eq!(tag.artist.as_deref(), Some("Simon - Garfunkel"));
    }

    #[test]
    fn test_encode_artist_without_split() {
        let tag = decoded(&["ARTIST=Simon", "ARTIST=Garfunkel"]);
        assert_eq!(
            encoded(&tag, &Config::default()),
            ["ARTIST=Simon - Garfunkel"]
        );
    }

    #[test]
    fn test_encode_artist_with_split() {
        let tag = decoded(&["ARTIST=Simon", "ARTIST=Garfunkel", "ALBUMARTIST=S - G"]);
        let config = Config::load_from_str("[split]\nartist = true\n").unwrap();
        assert_eq!(
            encoded(&tag, &config),
            [
                "ARTIST=Simon",
                "ARTIST=Garfunkel",
                "ALBUMARTIST=S",
                "ALBUMARTIST=G"
            ]
        );
    }

    #[test]
    fn test_track_number_with_slash() {
        let tag = decoded(&["TRACKNUMBER=3/12"]);
        assert_eq!(tag.track_number.as_deref(), Some("3"));
        assert_eq!(tag.track_total.as_deref(), Some("12"));
    }

    #[test]
    fn test_track_number_with_total_field() {
        let tag = decoded(&["TRACKNUMBER=3", "TRACKTOTAL=12"]);
        assert_eq!(tag.track_number.as_deref(), Some("3"));
        assert_eq!(tag.track_total.as_deref(), Some("12"));
    }

    #[test]
    fn test_total_field_wins() {
        let tag = decoded(&["TRACKNUMBER=3/10", "TRACKTOTAL=12"]);
        assert_eq!(tag.track_number.as_deref(), Some("3"));
        assert_eq!(tag.track_total.as_deref(), Some("12"));

        let tag = decoded(&["TRACKNUMBER=3/10", "TRACKTOTAL= "]);
        assert_eq!(tag.track_total.as_deref(), Some("10"));
    }

    #[test]
    fn test_disc_numbers_are_parsed() {
        let tag = decoded(&["DISCNUMBER=one/2", "DISCTOTAL=3x"]);
        assert_eq!(tag.disc_number.as_deref(), Some("0"));
        assert_eq!(tag.disc_total.as_deref(), Some("3"));
    }

    #[test]
    fn test_padded_numbers() {
        let config = Config::load_from_str("[numbers]\npadded = true\n").unwrap();
        let (tag, _) = decode(
            &comments(&["DISCNUMBER=1/2", "TRACKNUMBER=5", "TRACKTOTAL=9"]),
            &config,
        );
        assert_eq!(tag.disc_number.as_deref(), Some("01"));
        assert_eq!(tag.disc_total.as_deref(), Some("02"));
        // The track number is kept as it is.
        assert_eq!(tag.track_number.as_deref(), Some("5"));
        assert_eq!(tag.track_total.as_deref(), Some("09"));
    }

    #[test]
    fn test_numeric_pairs_are_written_separately() {
        let tag = decoded(&["TRACKNUMBER=3/12"]);
        assert_eq!(
            encoded(&tag, &Config::default()),
            ["TRACKNUMBER=3", "TRACKTOTAL=12"]
        );
    }

    #[test]
    fn test_date_is_verbatim() {
        let tag = decoded(&["DATE=1959-08-17", "DATE=1960"]);
        assert_eq!(tag.year.as_deref(), Some("1959-08-17"));
    }

    #[test]
    fn test_comment_priority() {
        let tag = decoded(&[
            "COMMENT=second choice",
            "DESCRIPTION=first choice",
            "=unkeyed 0",
            "=unkeyed 1",
            "COMMENT=comment 1",
            "=unkeyed 2",
        ]);
        assert_eq!(
            tag.comment.as_deref(),
            Some("first choice - comment 1 - unkeyed 2")
        );
    }

    #[test]
    fn test_extension_fields_keep_order() {
        let tag = decoded(&[
            "REPLAYGAIN_TRACK_GAIN=-6.5 dB",
            "TITLE=So What",
            "mood=calm",
            "no separator",
        ]);
        assert_eq!(
            tag.other,
            [
                ExtensionField::new("REPLAYGAIN_TRACK_GAIN=-6.5 dB"),
                ExtensionField::new("mood=calm"),
                ExtensionField::new("no separator"),
            ]
        );
        assert_eq!(
            encoded(&tag, &Config::default()),
            [
                "TITLE=So What",
                "REPLAYGAIN_TRACK_GAIN=-6.5 dB",
                "mood=calm",
                "no separator"
            ]
        );
    }

    #[test]
    fn test_recognized_extension_fields_are_superseded() {
        let mut tag = FileTag::new();
        tag.set(TagKey::TrackTitle, "New");
        tag.other.push(ExtensionField::new("title=Old"));
        assert_eq!(encoded(&tag, &Config::default()), ["TITLE=New"]);
    }

    #[test]
    fn test_blank_values_are_absent() {
        let tag = decoded(&["TITLE= ", "ALBUM=", "DATE=  "]);
        assert!(tag.is_empty());

        let mut tag = FileTag::new();
        tag.set(TagKey::Genre, "   ");
        assert!(encoded(&tag, &Config::default()).is_empty());
    }

    #[test]
    fn test_decode_picture_block() {
        let value = BASE64_STANDARD.encode(raw_block(3, b"image/png", 9, PNG_DATA));
        let tag = decoded(&[format!("METADATA_BLOCK_PICTURE={value}").as_str()]);
        assert!(tag.saved);
        assert_eq!(tag.pictures.len(), 1);
        assert_eq!(tag.pictures[0].picture_type, PictureType::FrontCover);
        assert!(tag.other.is_empty());
    }

    #[test]
    fn test_decode_invalid_picture_block() {
        let value = BASE64_STANDARD.encode([0u8; 16]);
        let (tag, errors) = decode(
            &comments(&[format!("METADATA_BLOCK_PICTURE={value}").as_str(), "TITLE=x"]),
            &Config::default(),
        );
        assert!(!tag.saved);
        assert!(tag.pictures.is_empty());
        assert_eq!(tag.title.as_deref(), Some("x"));
        assert!(matches!(
            errors.as_slice(),
            [FieldError::DecodeSkipped {
                field: "METADATA_BLOCK_PICTURE",
                reason: PictureError::TooShort(16)
            }]
        ));
    }

    #[test]
    fn test_decode_legacy_picture() {
        let value = BASE64_STANDARD.encode(PNG_DATA);
        let tag = decoded(&[
            format!("COVERART={value}").as_str(),
            "COVERARTTYPE=4",
            "COVERARTDESCRIPTION=Back",
            "COVERARTMIME=image/png",
            format!("COVERART={value}").as_str(),
            "COVERARTTYPE=99",
        ]);
        assert!(!tag.saved);
        assert_eq!(tag.pictures.len(), 2);
        assert_eq!(tag.pictures[0].picture_type, PictureType::BackCover);
        assert_eq!(tag.pictures[0].description, "Back");
        assert_eq!(tag.pictures[1].picture_type, PictureType::FrontCover);
        assert_eq!(tag.pictures[1].description, "");
        assert!(tag.other.is_empty());
    }

    #[test]
    fn test_decode_invalid_legacy_picture() {
        let (tag, errors) = decode(&comments(&["COVERART=!!!"]), &Config::default());
        assert!(!tag.saved);
        assert!(tag.pictures.is_empty());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_encode_pictures() {
        let mut tag = FileTag::new();
        tag.pictures
            .push(Picture::new(PictureType::FrontCover, "Front", PNG_DATA));
        tag.pictures.push(Picture::new(
            PictureType::BackCover,
            "",
            b"not an image".to_vec(),
        ));

        let (comments, errors) = encode(&tag, &Config::default());
        assert!(matches!(
            errors.as_slice(),
            [FieldError::EncodeUnsupported(PictureError::Conversion(_))]
        ));
        assert_eq!(comments.len(), 1);

        let (decoded, errors) = decode(&comments, &Config::default());
        assert!(errors.is_empty());
        assert_eq!(decoded.pictures.len(), 1);
        assert_eq!(decoded.pictures[0].description, "Front");
        assert_eq!(&*decoded.pictures[0].data, PNG_DATA);
    }
}
