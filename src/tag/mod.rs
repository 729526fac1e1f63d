// Copyright (c) 2022 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Tags and tag-related functions.

pub mod fields;
#[cfg(feature = "mp4")]
pub mod mp4;
#[cfg(feature = "ogg")]
pub mod vorbis;

use crate::charset::Charset;
use crate::config::Config;
use crate::filename::FileName;
use crate::picture::Picture;
use crate::util::{ReadSeek, StreamProvider};
use std::ffi::OsStr;
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};

/// A tag key describes the kind of information in a generic, format-independent way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKey {
    /// Track Title.
    TrackTitle,
    /// Track Artist Name(s).
    Artist,
    /// Artist(s) primarily credited on the release.
    AlbumArtist,
    /// Title of the release.
    Album,
    /// Number of the disc in this release that contains this track.
    DiscNumber,
    /// Total number of discs in this release.
    TotalDiscs,
    /// Release Year, taken verbatim from the date field.
    Year,
    /// Track number on the disc.
    TrackNumber,
    /// Total tracks on this disc.
    TotalTracks,
    /// Genre Name(s) of the track.
    Genre,
    /// Comment.
    Comment,
    /// Composer Name(s).
    Composer,
    /// Track Artist of the original recording (stored as performer).
    OriginalArtist,
    /// Copyright message.
    Copyright,
    /// Contact URL.
    Url,
    /// Encoded by (person or organization).
    EncodedBy,
}

impl TagKey {
    /// All tag keys, in the order in which they are written.
    pub const ALL: [TagKey; 16] = [
        TagKey::TrackTitle,
        TagKey::Artist,
        TagKey::AlbumArtist,
        TagKey::Album,
        TagKey::DiscNumber,
        TagKey::TotalDiscs,
        TagKey::Year,
        TagKey::TrackNumber,
        TagKey::TotalTracks,
        TagKey::Genre,
        TagKey::Comment,
        TagKey::Composer,
        TagKey::OriginalArtist,
        TagKey::Copyright,
        TagKey::Url,
        TagKey::EncodedBy,
    ];
}

/// A field that is not mapped to a [`TagKey`], kept as `KEY=value` exactly as it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionField {
    /// The complete field.
    raw: String,
}

impl ExtensionField {
    /// Create an extension field from its raw `KEY=value` form.
    pub fn new(raw: impl Into<String>) -> Self {
        ExtensionField { raw: raw.into() }
    }

    /// The field as it was read.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The key, if the field contains a `=`.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.raw.split_once('=').map(|(key, _)| key)
    }

    /// The value, if the field contains a `=`.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.raw.split_once('=').map(|(_, value)| value)
    }
}

/// Format-independent tag of a single file.
///
/// Multiple values of a field are joined with [`fields::MULTIFIELD_SEPARATOR`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[expect(missing_docs)]
pub struct FileTag {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    pub disc_number: Option<String>,
    pub disc_total: Option<String>,
    pub year: Option<String>,
    pub track_number: Option<String>,
    pub track_total: Option<String>,
    pub genre: Option<String>,
    pub comment: Option<String>,
    pub composer: Option<String>,
    pub original_artist: Option<String>,
    pub copyright: Option<String>,
    pub url: Option<String>,
    pub encoded_by: Option<String>,
    /// Embedded pictures. The first one is the primary picture.
    pub pictures: Vec<Picture>,
    /// Fields that are kept without interpretation.
    pub other: Vec<ExtensionField>,
    /// `true` if this tag matches what is stored in the file.
    ///
    /// Decoding sets this to `false` if the file contains something that the next save will
    /// normalize, e.g. a legacy picture or a malformed field.
    pub saved: bool,
}

impl FileTag {
    /// Create an empty tag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The storage slot of a key.
    fn slot(&self, key: TagKey) -> Option<&String> {
        let slot = match key {
            TagKey::TrackTitle => &self.title,
            TagKey::Artist => &self.artist,
            TagKey::AlbumArtist => &self.album_artist,
            TagKey::Album => &self.album,
            TagKey::DiscNumber => &self.disc_number,
            TagKey::TotalDiscs => &self.disc_total,
            TagKey::Year => &self.year,
            TagKey::TrackNumber => &self.track_number,
            TagKey::TotalTracks => &self.track_total,
            TagKey::Genre => &self.genre,
            TagKey::Comment => &self.comment,
            TagKey::Composer => &self.composer,
            TagKey::OriginalArtist => &self.original_artist,
            TagKey::Copyright => &self.copyright,
            TagKey::Url => &self.url,
            TagKey::EncodedBy => &self.encoded_by,
        };
        slot.as_ref()
    }

    /// The mutable storage slot of a key.
    fn slot_mut(&mut self, key: TagKey) -> &mut Option<String> {
        match key {
            TagKey::TrackTitle => &mut self.title,
            TagKey::Artist => &mut self.artist,
            TagKey::AlbumArtist => &mut self.album_artist,
            TagKey::Album => &mut self.album,
            TagKey::DiscNumber => &mut self.disc_number,
            TagKey::TotalDiscs => &mut self.disc_total,
            TagKey::Year => &mut self.year,
            TagKey::TrackNumber => &mut self.track_number,
            TagKey::TotalTracks => &mut self.track_total,
            TagKey::Genre => &mut self.genre,
            TagKey::Comment => &mut self.comment,
            TagKey::Composer => &mut self.composer,
            TagKey::OriginalArtist => &mut self.original_artist,
            TagKey::Copyright => &mut self.copyright,
            TagKey::Url => &mut self.url,
            TagKey::EncodedBy => &mut self.encoded_by,
        }
    }

    /// Get the string value for the tag key.
    #[must_use]
    pub fn get(&self, key: TagKey) -> Option<&str> {
        self.slot(key).map(String::as_str)
    }

    /// Set the string value for the tag key.
    pub fn set(&mut self, key: TagKey, value: impl Into<String>) {
        *self.slot_mut(key) = Some(value.into());
        self.saved = false;
    }

    /// Remove the value for the tag key.
    pub fn clear(&mut self, key: TagKey) {
        if self.slot_mut(key).take().is_some() {
            self.saved = false;
        }
    }

    /// Set the value if it is `Some`, otherwise remove it.
    pub fn set_or_clear(&mut self, key: TagKey, value: Option<impl Into<String>>) {
        match value {
            Some(value) => self.set(key, value),
            None => self.clear(key),
        }
    }

    /// Returns `true` if the tag has no fields, pictures or extension fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        TagKey::ALL.iter().all(|&key| self.get(key).is_none())
            && self.pictures.is_empty()
            && self.other.is_empty()
    }
}

/// The container format of an audio file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Vorbis comments in an Ogg stream (Vorbis or Opus).
    Ogg,
    /// iTunes-style metadata atoms in an MP4 file.
    Mp4,
}

impl ContainerKind {
    /// Detect the container from the file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let extension = path
            .as_ref()
            .extension()
            .map(OsStr::to_ascii_lowercase)?;
        match extension.to_str()? {
            "ogg" | "oga" | "opus" => Some(ContainerKind::Ogg),
            "mp4" | "m4a" | "m4b" | "m4p" | "m4v" => Some(ContainerKind::Mp4),
            ext => {
                log::debug!("Unknown file extension {ext:?}");
                None
            }
        }
    }

    /// Detect the container from the content at the current reader position.
    ///
    /// # Errors
    ///
    /// Fails if reading fails.
    pub fn sniff(reader: &mut dyn ReadSeek) -> io::Result<Option<Self>> {
        #[cfg(feature = "ogg")]
        let _ = vorbis::skip_id3v2(reader)?;

        let mut header = Vec::with_capacity(8);
        let _ = Read::take(&mut *reader, 8).read_to_end(&mut header)?;
        let _ = reader.seek(io::SeekFrom::Start(0))?;
        if header.starts_with(b"OggS") {
            Ok(Some(ContainerKind::Ogg))
        } else if header.get(4..8) == Some(b"ftyp".as_slice()) {
            Ok(Some(ContainerKind::Mp4))
        } else {
            Ok(None)
        }
    }

    /// Detect the container of a file, first by extension and then by content.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::Error::UnknownFileType`] if neither method finds a supported container.
    pub fn detect(path: &Path, provider: &dyn StreamProvider) -> crate::Result<Self> {
        if let Some(kind) = Self::from_path(path) {
            return Ok(kind);
        }
        let mut reader = provider.open_read(path)?;
        Self::sniff(&mut reader)?.ok_or(crate::Error::UnknownFileType)
    }

    /// Read the tag of a file in this container format.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid file of this format.
    pub fn read_tag(
        self,
        provider: &dyn StreamProvider,
        path: &Path,
        charset: &impl Charset,
        config: &Config,
    ) -> crate::Result<FileTag> {
        match self {
            #[cfg(feature = "ogg")]
            ContainerKind::Ogg => vorbis::read_tag(provider, path, charset, config),
            #[cfg(feature = "mp4")]
            ContainerKind::Mp4 => mp4::read_tag(provider, path, config),
            #[allow(unreachable_patterns)]
            _ => {
                log::debug!("Support for {self:?} is disabled");
                Err(crate::Error::UnknownFileType)
            }
        }
    }

    /// Write the tag into a file in this container format.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or written.
    pub fn write_tag(
        self,
        provider: &dyn StreamProvider,
        path: &Path,
        tag: &FileTag,
        config: &Config,
    ) -> crate::Result<()> {
        match self {
            #[cfg(feature = "ogg")]
            ContainerKind::Ogg => vorbis::write_tag(provider, path, tag, config),
            #[cfg(feature = "mp4")]
            ContainerKind::Mp4 => mp4::write_tag(provider, path, tag, config),
            #[allow(unreachable_patterns)]
            _ => {
                log::debug!("Support for {self:?} is disabled");
                Err(crate::Error::UnknownFileType)
            }
        }
    }
}

/// An audio file together with its name, container format and tag.
#[derive(Debug)]
pub struct AudioFile {
    /// Path of the file.
    path: PathBuf,
    /// Name of the file.
    name: FileName,
    /// Container format.
    kind: ContainerKind,
    /// The tag read from the file.
    tag: FileTag,
}

impl AudioFile {
    /// Creates an [`AudioFile`] from the path.
    ///
    /// # Errors
    ///
    /// Fails if the container format is unknown or the tag cannot be read.
    pub fn read_from_path(
        path: impl AsRef<Path>,
        provider: &dyn StreamProvider,
        charset: &impl Charset,
        config: &Config,
    ) -> crate::Result<Self> {
        let path = path.as_ref();
        let kind = ContainerKind::detect(path, provider)?;
        let tag = kind.read_tag(provider, path, charset, config)?;
        let mut name = FileName::from_raw(path, charset);
        name.saved = true;
        Ok(AudioFile {
            path: path.to_path_buf(),
            name,
            kind,
            tag,
        })
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the file.
    #[must_use]
    pub fn name(&self) -> &FileName {
        &self.name
    }

    /// Container format of the file.
    #[must_use]
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// The tag of the file.
    #[must_use]
    pub fn tag(&self) -> &FileTag {
        &self.tag
    }

    /// Mutable access to the tag. The tag is marked as not saved.
    pub fn tag_mut(&mut self) -> &mut FileTag {
        self.tag.saved = false;
        &mut self.tag
    }

    /// Write the tag to the file if it is not saved yet.
    ///
    /// # Errors
    ///
    /// Fails if writing fails. The tag stays marked as not saved in that case.
    pub fn save(&mut self, provider: &dyn StreamProvider, config: &Config) -> crate::Result<()> {
        if self.tag.saved {
            log::debug!("Tag of {} is already saved", self.path.display());
            return Ok(());
        }
        self.kind
            .write_tag(provider, &self.path, &self.tag, config)?;
        self.tag.saved = true;
        log::info!("Saved tag of {}", self.path.display());
        Ok(())
    }
}
