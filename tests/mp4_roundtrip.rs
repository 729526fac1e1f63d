// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

#![cfg(feature = "mp4")]

use mp4ameta::{Data, Fourcc};
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use tagsmith::util::{ReadSeek, StreamProvider, WriteFn};
use tagsmith::{
    AudioFile, Config, ContainerKind, FileTag, LocalFiles, Picture, PictureType, TagKey,
    Utf8Charset,
};

const ALBUM_ARTIST: Fourcc = Fourcc(*b"aART");
const ARTWORK: Fourcc = Fourcc(*b"covr");
const GROUPING: Fourcc = Fourcc(*b"\xa9grp");

/// Smallest valid PNG file (1x1 transparent pixel).
const PNG_DATA: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// Start of a JPEG file. Only the magic bytes matter here.
const JPEG_DATA: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];

/// Write an MP4 file that only contains the given metadata atoms.
fn write_mp4(directory: &Path, name: &str, mp4: &mp4ameta::Tag) -> PathBuf {
    let path = directory.join(name);
    mp4.dump_to_path(&path).unwrap();
    path
}

fn read(path: &Path) -> AudioFile {
    AudioFile::read_from_path(path, &LocalFiles, &Utf8Charset, &Config::default()).unwrap()
}

fn full_tag(file: &mut AudioFile) {
    let tag = file.tag_mut();
    tag.set(TagKey::TrackTitle, "So What");
    tag.set(TagKey::Artist, "Miles Davis");
    tag.set(TagKey::AlbumArtist, "Miles Davis");
    tag.set(TagKey::Album, "Kind of Blue");
    tag.set(TagKey::Genre, "Jazz");
    tag.set(TagKey::Comment, "Modal");
    tag.set(TagKey::Composer, "Miles Davis");
    tag.set(TagKey::Copyright, "Columbia");
    tag.set(TagKey::EncodedBy, "tagsmith");
    tag.set(TagKey::Year, "1959");
    tag.set(TagKey::TrackNumber, "1");
    tag.set(TagKey::TotalTracks, "5");
    tag.set(TagKey::DiscNumber, "1");
    tag.set(TagKey::TotalDiscs, "2");
    tag.pictures = vec![
        Picture::new(PictureType::BackCover, "back", PNG_DATA),
        Picture::new(PictureType::FrontCover, "front", JPEG_DATA),
    ];
}

#[test]
fn test_save_and_read_back() {
    let directory = tempfile::tempdir().unwrap();
    let path = write_mp4(directory.path(), "track.m4a", &mp4ameta::Tag::default());

    let mut file = read(&path);
    assert_eq!(file.kind(), ContainerKind::Mp4);
    assert!(file.tag().is_empty());
    full_tag(&mut file);
    file.save(&LocalFiles, &Config::default()).unwrap();

    let reread = read(&path);
    let tag = reread.tag();
    assert!(tag.saved);
    assert_eq!(tag.get(TagKey::TrackTitle), Some("So What"));
    assert_eq!(tag.get(TagKey::Artist), Some("Miles Davis"));
    assert_eq!(tag.get(TagKey::AlbumArtist), Some("Miles Davis"));
    assert_eq!(tag.get(TagKey::Album), Some("Kind of Blue"));
    assert_eq!(tag.get(TagKey::Genre), Some("Jazz"));
    assert_eq!(tag.get(TagKey::Comment), Some("Modal"));
    assert_eq!(tag.get(TagKey::Composer), Some("Miles Davis"));
    assert_eq!(tag.get(TagKey::Copyright), Some("Columbia"));
    assert_eq!(tag.get(TagKey::EncodedBy), Some("tagsmith"));
    assert_eq!(tag.get(TagKey::Year), Some("1959"));
    assert_eq!(tag.get(TagKey::TrackNumber), Some("1"));
    assert_eq!(tag.get(TagKey::TotalTracks), Some("5"));
    assert_eq!(tag.get(TagKey::DiscNumber), Some("1"));
    assert_eq!(tag.get(TagKey::TotalDiscs), Some("2"));

    // Only the first picture is stored, and MP4 has no picture type or description.
    assert_eq!(
        tag.pictures,
        [Picture::new(PictureType::FrontCover, "", PNG_DATA)]
    );
    let mp4 = mp4ameta::Tag::read_from_path(&path).unwrap();
    assert_eq!(mp4.data_of(&ARTWORK).count(), 1);
}

#[test]
fn test_clear_album_artist_and_pictures() {
    let directory = tempfile::tempdir().unwrap();
    let path = write_mp4(directory.path(), "track.m4a", &mp4ameta::Tag::default());

    let mut file = read(&path);
    full_tag(&mut file);
    file.save(&LocalFiles, &Config::default()).unwrap();
    let mp4 = mp4ameta::Tag::read_from_path(&path).unwrap();
    assert_eq!(mp4.strings_of(&ALBUM_ARTIST).collect::<Vec<_>>(), ["Miles Davis"]);

    let mut file = read(&path);
    file.tag_mut().clear(TagKey::AlbumArtist);
    file.tag_mut().clear(TagKey::TotalTracks);
    file.tag_mut().pictures.clear();
    file.save(&LocalFiles, &Config::default()).unwrap();

    let mp4 = mp4ameta::Tag::read_from_path(&path).unwrap();
    assert_eq!(mp4.strings_of(&ALBUM_ARTIST).count(), 0);
    assert_eq!(mp4.data_of(&ARTWORK).count(), 0);
    assert_eq!(mp4.track_number(), Some(1));
    assert_eq!(mp4.total_tracks(), None);

    let tag = read(&path).tag().clone();
    assert_eq!(tag.get(TagKey::AlbumArtist), None);
    assert_eq!(tag.get(TagKey::TrackTitle), Some("So What"));
    assert!(tag.pictures.is_empty());
}

#[test]
fn test_unrelated_atoms_are_kept() {
    let directory = tempfile::tempdir().unwrap();
    let mut mp4 = mp4ameta::Tag::default();
    mp4.set_data(GROUPING, Data::Utf8("Sessions".to_owned()));
    mp4.set_data(Fourcc(*b"\xa9nam"), Data::Utf8("Old Title".to_owned()));
    let path = write_mp4(directory.path(), "track.mp4", &mp4);

    let mut file = read(&path);
    assert_eq!(file.tag().get(TagKey::TrackTitle), Some("Old Title"));
    file.tag_mut().clear(TagKey::TrackTitle);
    file.tag_mut().set(TagKey::Album, "Kind of Blue");
    file.save(&LocalFiles, &Config::default()).unwrap();

    let mp4 = mp4ameta::Tag::read_from_path(&path).unwrap();
    assert_eq!(mp4.strings_of(&GROUPING).collect::<Vec<_>>(), ["Sessions"]);
    assert_eq!(mp4.strings_of(&Fourcc(*b"\xa9nam")).count(), 0);
    assert_eq!(
        mp4.strings_of(&Fourcc(*b"\xa9alb")).collect::<Vec<_>>(),
        ["Kind of Blue"]
    );
}

#[test]
fn test_read_invalid_file() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("track.m4a");
    fs::write(&path, b"definitely not an mp4 file").unwrap();
    assert!(matches!(
        AudioFile::read_from_path(&path, &LocalFiles, &Utf8Charset, &Config::default()),
        Err(tagsmith::Error::FormatInvalid(_))
    ));
}

/// Serves a fixed file content, regardless of the path.
struct InMemory(Vec<u8>);

impl StreamProvider for InMemory {
    fn open_read(&self, _path: &Path) -> io::Result<Box<dyn ReadSeek>> {
        Ok(Box::new(Cursor::new(self.0.clone())))
    }

    fn replace(&self, _path: &Path, _write: &mut WriteFn<'_>) -> tagsmith::Result<()> {
        Err(io::Error::other("read-only").into())
    }
}

#[test]
fn test_commit_failure_is_save_failed() {
    let mut content = Vec::new();
    mp4ameta::Tag::default().dump_to(&mut content).unwrap();
    let provider = InMemory(content);

    // The file can be read through the provider, but does not exist on disk.
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("missing.m4a");
    let mut tag = FileTag::new();
    tag.set(TagKey::TrackTitle, "So What");

    let result = ContainerKind::Mp4.write_tag(&provider, &path, &tag, &Config::default());
    assert!(matches!(result, Err(tagsmith::Error::SaveFailed(failed)) if failed == path));
    assert!(!path.exists());
}
