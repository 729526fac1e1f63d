// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Support for MP4 tags.

#![cfg(feature = "mp4")]

use crate::config::{Config, NumberConfig};
use crate::error::FieldError;
use crate::picture::{Picture, PictureFormat, PictureType};
use crate::tag::fields::{non_blank, parse_leading_int, split_number_pair};
use crate::tag::FileTag;
use crate::util::StreamProvider;
use mp4ameta::{Data, Fourcc};
use std::collections::BTreeMap;
use std::path::Path;

/// Album artist atom.
const ALBUM_ARTIST: Fourcc = Fourcc(*b"aART");
/// Cover art atom.
const ARTWORK: Fourcc = Fourcc(*b"covr");

/// A property of the generic property map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Property {
    /// Track title.
    Title,
    /// Track artist.
    Artist,
    /// Album title.
    Album,
    /// Genre.
    Genre,
    /// Comment.
    Comment,
    /// Composer.
    Composer,
    /// Copyright message.
    Copyright,
    /// Encoding tool or person.
    EncodedBy,
    /// Release date.
    Date,
    /// Track number, as `number` or `number/total`.
    TrackNumber,
    /// Disc number, as `number` or `number/total`.
    DiscNumber,
}

impl Property {
    /// All properties.
    pub const ALL: [Property; 11] = [
        Property::Title,
        Property::Artist,
        Property::Album,
        Property::Genre,
        Property::Comment,
        Property::Composer,
        Property::Copyright,
        Property::EncodedBy,
        Property::Date,
        Property::TrackNumber,
        Property::DiscNumber,
    ];

    /// The text atom that stores this property, if it is a text property.
    fn text_atom(self) -> Option<Fourcc> {
        #[allow(clippy::match_same_arms)]
        match self {
            Property::Title => Fourcc(*b"\xa9nam").into(),
            Property::Artist => Fourcc(*b"\xa9ART").into(),
            Property::Album => Fourcc(*b"\xa9alb").into(),
            Property::Genre => Fourcc(*b"\xa9gen").into(),
            Property::Comment => Fourcc(*b"\xa9cmt").into(),
            Property::Composer => Fourcc(*b"\xa9wrt").into(),
            Property::Copyright => Fourcc(*b"cprt").into(),
            Property::EncodedBy => Fourcc(*b"\xa9too").into(),
            Property::Date => Fourcc(*b"\xa9day").into(),
            Property::TrackNumber => None,
            Property::DiscNumber => None,
        }
    }
}

/// Format-independent view of the standard MP4 atoms.
pub type PropertyMap = BTreeMap<Property, String>;

/// Join a number and an optional total as `number/total`. A total of zero means no total.
fn join_number_pair(number: Option<u16>, total: Option<u16>) -> Option<String> {
    match (number, total.filter(|&total| total != 0)) {
        (Some(number), Some(total)) => Some(format!("{number}/{total}")),
        (Some(number), None) => Some(number.to_string()),
        (None, Some(total)) => Some(format!("0/{total}")),
        (None, None) => None,
    }
}

/// Clamp a parsed number into the range of an MP4 number field.
fn clamp_u16(value: &str) -> u16 {
    u16::try_from(parse_leading_int(value).max(0)).unwrap_or(u16::MAX)
}

/// Collect the property map from an MP4 tag.
#[must_use]
pub fn read_properties(mp4: &mp4ameta::Tag) -> PropertyMap {
    let mut properties: PropertyMap = Property::ALL
        .into_iter()
        .filter_map(|property| {
            let atom = property.text_atom()?;
            let value = mp4.strings_of(&atom).next()?;
            Some((property, value.to_owned()))
        })
        .collect();
    properties.extend(
        join_number_pair(mp4.track_number(), mp4.total_tracks())
            .map(|value| (Property::TrackNumber, value)),
    );
    properties.extend(
        join_number_pair(mp4.disc_number(), mp4.total_discs())
            .map(|value| (Property::DiscNumber, value)),
    );
    properties
}

/// Store the property map in an MP4 tag.
///
/// Present properties are set, absent ones are removed. Atoms that are not covered by the
/// property map are left untouched.
pub fn apply_properties(mp4: &mut mp4ameta::Tag, properties: &PropertyMap) {
    for property in Property::ALL {
        let value = properties.get(&property);
        match (property, property.text_atom()) {
            (_, Some(atom)) => match value {
                Some(value) => {
                    mp4.set_data(atom, Data::Utf8(value.clone()));
                }
                None => {
                    mp4.remove_data_of(&atom);
                }
            },
            (Property::TrackNumber, None) => {
                mp4.remove_track();
                if let Some(value) = value {
                    let (number, total) = split_number_pair(value);
                    mp4.set_track_number(clamp_u16(number));
                    if let Some(total) = non_blank(total) {
                        mp4.set_total_tracks(clamp_u16(total));
                    }
                }
            }
            (Property::DiscNumber, None) => {
                mp4.remove_disc();
                if let Some(value) = value {
                    let (number, total) = split_number_pair(value);
                    mp4.set_disc_number(clamp_u16(number));
                    if let Some(total) = non_blank(total) {
                        mp4.set_total_discs(clamp_u16(total));
                    }
                }
            }
            (_, None) => {}
        }
    }
}

/// Split a `number/total` property into formatted numbers.
fn decode_number_pair(
    numbers: &NumberConfig,
    value: Option<&String>,
) -> (Option<String>, Option<String>) {
    let Some(value) = non_blank(value.map(String::as_str)) else {
        return (None, None);
    };
    let (number, total) = split_number_pair(value);
    (
        non_blank(Some(number)).map(|number| numbers.format(parse_leading_int(number))),
        non_blank(total).map(|total| numbers.format(parse_leading_int(total))),
    )
}

/// Build a [`FileTag`] from the property map.
#[must_use]
pub fn decode_properties(properties: &PropertyMap, config: &Config) -> FileTag {
    let text = |property: Property| {
        non_blank(properties.get(&property).map(String::as_str)).map(ToOwned::to_owned)
    };

    let (track_number, track_total) =
        decode_number_pair(&config.numbers, properties.get(&Property::TrackNumber));
    let (disc_number, disc_total) =
        decode_number_pair(&config.numbers, properties.get(&Property::DiscNumber));
    let year = properties
        .get(&Property::Date)
        .map(|date| parse_leading_int(date))
        .filter(|&year| year != 0)
        .map(|year| year.to_string());

    FileTag {
        title: text(Property::Title),
        artist: text(Property::Artist),
        album: text(Property::Album),
        genre: text(Property::Genre),
        comment: text(Property::Comment),
        composer: text(Property::Composer),
        copyright: text(Property::Copyright),
        encoded_by: text(Property::EncodedBy),
        year,
        track_number,
        track_total,
        disc_number,
        disc_total,
        saved: true,
        ..FileTag::default()
    }
}

/// Build the property map from a [`FileTag`]. Blank fields are left out.
#[must_use]
pub fn encode_properties(tag: &FileTag) -> PropertyMap {
    let mut properties = PropertyMap::new();
    let mut insert = |property: Property, value: Option<&String>| {
        properties.extend(
            non_blank(value.map(String::as_str)).map(|value| (property, value.to_owned())),
        );
    };
    insert(Property::Title, tag.title.as_ref());
    insert(Property::Artist, tag.artist.as_ref());
    insert(Property::Album, tag.album.as_ref());
    insert(Property::Genre, tag.genre.as_ref());
    insert(Property::Comment, tag.comment.as_ref());
    insert(Property::Composer, tag.composer.as_ref());
    insert(Property::Copyright, tag.copyright.as_ref());
    insert(Property::EncodedBy, tag.encoded_by.as_ref());
    insert(Property::Date, tag.year.as_ref());

    let pairs = [
        (Property::TrackNumber, &tag.track_number, &tag.track_total),
        (Property::DiscNumber, &tag.disc_number, &tag.disc_total),
    ];
    for (property, number, total) in pairs {
        let Some(number) = non_blank(number.as_deref()) else {
            continue;
        };
        let number = parse_leading_int(number);
        let value = match non_blank(total.as_deref()) {
            Some(total) => format!("{number}/{}", parse_leading_int(total)),
            None => number.to_string(),
        };
        properties.extend([(property, value)]);
    }
    properties
}

/// Read the first supported picture of the cover art atom.
fn read_picture(mp4: &mp4ameta::Tag) -> Option<Picture> {
    mp4.data_of(&ARTWORK).find_map(|data| match data {
        Data::Jpeg(bytes) | Data::Png(bytes) | Data::Bmp(bytes) => Some(Picture::new(
            PictureType::FrontCover,
            "",
            bytes.as_slice(),
        )),
        _ => None,
    })
}

/// Convert a picture into cover art data.
fn picture_data(picture: &Picture) -> Result<Data, FieldError> {
    match picture.format() {
        PictureFormat::Jpeg => Ok(Data::Jpeg(picture.data.to_vec())),
        PictureFormat::Png => Ok(Data::Png(picture.data.to_vec())),
        PictureFormat::Bmp => Ok(Data::Bmp(picture.data.to_vec())),
        PictureFormat::Gif | PictureFormat::Unknown => picture
            .to_canonical()
            .map(|converted| Data::Png(converted.data.to_vec()))
            .map_err(FieldError::EncodeUnsupported),
    }
}

/// Read the tag of an MP4 file.
///
/// # Errors
///
/// Fails if the file cannot be opened or contains no valid MP4 structure.
pub fn read_tag(
    provider: &dyn StreamProvider,
    path: &Path,
    config: &Config,
) -> crate::Result<FileTag> {
    let mut reader = provider.open_read(path)?;
    let mp4 = mp4ameta::Tag::read_from(&mut reader)
        .map_err(|err| crate::Error::FormatInvalid(format!("{}: {err}", path.display())))?;

    let mut tag = decode_properties(&read_properties(&mp4), config);
    tag.album_artist = mp4
        .strings_of(&ALBUM_ARTIST)
        .next()
        .and_then(|value| non_blank(Some(value)))
        .map(ToOwned::to_owned);
    tag.pictures.extend(read_picture(&mp4));
    Ok(tag)
}

/// Write the tag into an MP4 file.
///
/// Only the first picture is stored. Atoms that are not mapped to [`FileTag`] fields are kept.
///
/// The file is read through `provider` but updated in place at `path` on the local file system.
///
/// # Errors
///
/// Fails if the file cannot be read or written.
pub fn write_tag(
    provider: &dyn StreamProvider,
    path: &Path,
    tag: &FileTag,
    _config: &Config,
) -> crate::Result<()> {
    let mut reader = provider.open_read(path)?;
    let mut mp4 = mp4ameta::Tag::read_from(&mut reader)
        .map_err(|err| crate::Error::FormatInvalid(format!("{}: {err}", path.display())))?;
    drop(reader);

    apply_properties(&mut mp4, &encode_properties(tag));

    match non_blank(tag.album_artist.as_deref()) {
        Some(album_artist) => {
            mp4.set_data(ALBUM_ARTIST, Data::Utf8(album_artist.to_owned()));
        }
        None => {
            mp4.remove_data_of(&ALBUM_ARTIST);
        }
    }

    mp4.remove_data_of(&ARTWORK);
    if tag.pictures.len() > 1 {
        log::warn!(
            "{}: only the first of {} pictures is stored",
            path.display(),
            tag.pictures.len()
        );
    }
    if let Some(picture) = tag.pictures.first() {
        match picture_data(picture) {
            Ok(data) => {
                mp4.set_data(ARTWORK, data);
            }
            Err(err) => log::warn!("{}: {err}", path.display()),
        }
    }

    mp4.write_to_path(path).map_err(|err| {
        log::warn!("Failed to write MP4 tag to {}: {err}", path.display());
        crate::Error::SaveFailed(path.to_path_buf())
    })?;
    log::info!("Wrote MP4 tag to {}", path.display());
    Ok(())
}
