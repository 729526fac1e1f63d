// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Embedded pictures and the picture block codec.
//!
//! The structured block is the layout that FLAC uses for its `PICTURE` metadata block and that
//! Vorbis comments carry base64-encoded in the `METADATA_BLOCK_PICTURE` field. All integers are
//! 32-bit big-endian:
//!
//! ```text
//! type | mime length | mime | description length | description
//!      | width | height | color depth | indexed colors | data length | data
//! ```

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::prelude::{Engine, BASE64_STANDARD};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor};
use std::sync::Arc;
use thiserror::Error;

/// Standard alphabet decoder that accepts values with or without padding. Other taggers do not
/// always pad.
const BASE64_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Size of the fixed-width part of a picture block (eight 32-bit integers).
const BLOCK_HEADER_SIZE: usize = 8 * 4;

/// MIME types accepted in picture blocks. The declared MIME type must be a prefix of one of them.
const ACCEPTED_MIME_TYPES: [&str; 3] = ["image/", "image/png", "image/jpeg"];

/// Reasons why a picture could not be decoded or encoded.
#[derive(Error, Debug)]
pub enum PictureError {
    /// The field is not valid base64.
    #[error("invalid base64 data ({0})")]
    Base64(#[from] base64::DecodeError),
    /// The decoded block is too short to contain the fixed-width fields.
    #[error("picture block has only {0} bytes")]
    TooShort(usize),
    /// The picture type is not one of the defined types.
    #[error("invalid picture type {0}")]
    InvalidType(u32),
    /// A length field points beyond the end of the block.
    #[error("{0} length exceeds picture block")]
    LengthExceeded(&'static str),
    /// The MIME type does not describe a supported image.
    #[error("invalid image MIME type {0:?}")]
    InvalidMimeType(String),
    /// The image data could not be converted into a supported format.
    #[error("image conversion failed ({0})")]
    Conversion(#[from] image::ImageError),
    /// A buffer does not fit into a 32-bit length field.
    #[error("{0} is too large for a picture block")]
    TooLarge(&'static str),
}

/// Picture kinds as defined by the ID3v2 `APIC` frame and the FLAC `PICTURE` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[expect(missing_docs)]
pub enum PictureType {
    Other,
    FileIcon,
    OtherFileIcon,
    #[default]
    FrontCover,
    BackCover,
    LeafletPage,
    Media,
    LeadArtist,
    Artist,
    Conductor,
    Band,
    Composer,
    Lyricist,
    RecordingLocation,
    DuringRecording,
    DuringPerformance,
    MovieScreenCapture,
    BrightColouredFish,
    Illustration,
    BandLogo,
    PublisherLogo,
    /// Not a valid type. Never written to a file.
    Undefined,
}

impl PictureType {
    /// Number of defined picture types. Numeric types at or above this are invalid.
    pub const COUNT: u32 = 21;

    /// All defined picture types, in numeric order.
    const ALL: [PictureType; 21] = [
        PictureType::Other,
        PictureType::FileIcon,
        PictureType::OtherFileIcon,
        PictureType::FrontCover,
        PictureType::BackCover,
        PictureType::LeafletPage,
        PictureType::Media,
        PictureType::LeadArtist,
        PictureType::Artist,
        PictureType::Conductor,
        PictureType::Band,
        PictureType::Composer,
        PictureType::Lyricist,
        PictureType::RecordingLocation,
        PictureType::DuringRecording,
        PictureType::DuringPerformance,
        PictureType::MovieScreenCapture,
        PictureType::BrightColouredFish,
        PictureType::Illustration,
        PictureType::BandLogo,
        PictureType::PublisherLogo,
    ];

    /// Look up a picture type by its numeric value.
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }

    /// The numeric value of this type. [`PictureType::Undefined`] maps to [`Self::COUNT`].
    #[must_use]
    pub fn as_u32(self) -> u32 {
        Self::ALL
            .iter()
            .position(|&picture_type| picture_type == self)
            .and_then(|index| u32::try_from(index).ok())
            .unwrap_or(Self::COUNT)
    }
}

/// Image format, detected from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureFormat {
    /// JPEG/JFIF.
    Jpeg,
    /// Portable Network Graphics.
    Png,
    /// Graphics Interchange Format.
    Gif,
    /// Windows bitmap.
    Bmp,
    /// Anything else.
    Unknown,
}

impl PictureFormat {
    /// Detect the format from the magic bytes at the start of the data.
    #[must_use]
    pub fn detect(data: &[u8]) -> Self {
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            PictureFormat::Jpeg
        } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            PictureFormat::Png
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            PictureFormat::Gif
        } else if data.starts_with(b"BM") {
            PictureFormat::Bmp
        } else {
            PictureFormat::Unknown
        }
    }

    /// The MIME type of the format.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            PictureFormat::Jpeg => "image/jpeg",
            PictureFormat::Png => "image/png",
            PictureFormat::Gif => "image/gif",
            PictureFormat::Bmp => "image/bmp",
            PictureFormat::Unknown => "",
        }
    }
}

/// An embedded picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    /// The picture kind.
    pub picture_type: PictureType,
    /// Description set by the user.
    pub description: String,
    /// Width in pixels (`0` if unknown). Advisory only.
    pub width: u32,
    /// Height in pixels (`0` if unknown). Advisory only.
    pub height: u32,
    /// The encoded image data.
    pub data: Arc<[u8]>,
}

impl Picture {
    /// Create a picture with unknown dimensions.
    #[must_use]
    pub fn new(
        picture_type: PictureType,
        description: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        Picture {
            picture_type,
            description: description.into(),
            width: 0,
            height: 0,
            data: data.into(),
        }
    }

    /// The image format of the data.
    #[must_use]
    pub fn format(&self) -> PictureFormat {
        PictureFormat::detect(&self.data)
    }

    /// Returns a picture whose data is PNG or JPEG.
    ///
    /// Pictures in other formats are decoded and re-encoded as PNG. The dimensions are taken from
    /// the decoded image in that case.
    ///
    /// # Errors
    ///
    /// Fails if the data is not an image that can be decoded.
    pub fn to_canonical(&self) -> Result<Self, PictureError> {
        match self.format() {
            PictureFormat::Jpeg | PictureFormat::Png => Ok(self.clone()),
            format => {
                log::debug!("Converting {format:?} picture to PNG");
                let decoded = image::load_from_memory(&self.data)?;
                let mut buffer = Cursor::new(Vec::new());
                decoded.write_to(&mut buffer, image::ImageFormat::Png)?;
                Ok(Picture {
                    picture_type: self.picture_type,
                    description: self.description.clone(),
                    width: decoded.width(),
                    height: decoded.height(),
                    data: buffer.into_inner().into(),
                })
            }
        }
    }
}

/// Read the length field of a variable-length part and check it against the bytes that follow.
///
/// `reserved` is the number of bytes that the fixed-width fields after this part need.
fn read_length(
    cursor: &mut Cursor<&[u8]>,
    reserved: usize,
    what: &'static str,
) -> Result<usize, PictureError> {
    let length = cursor
        .read_u32::<BigEndian>()
        .map_err(|_| PictureError::LengthExceeded(what))?;
    let length = usize::try_from(length).map_err(|_| PictureError::LengthExceeded(what))?;
    let remaining = remaining(cursor)
        .checked_sub(reserved)
        .ok_or(PictureError::LengthExceeded(what))?;
    if length > remaining {
        return Err(PictureError::LengthExceeded(what));
    }
    Ok(length)
}

/// Number of bytes after the current cursor position.
fn remaining(cursor: &Cursor<&[u8]>) -> usize {
    let position = usize::try_from(cursor.position()).unwrap_or(usize::MAX);
    cursor.get_ref().len().saturating_sub(position)
}

/// Take `length` bytes from the cursor. The length must have been checked before.
fn take<'a>(cursor: &mut Cursor<&'a [u8]>, length: usize) -> &'a [u8] {
    let data: &'a [u8] = *cursor.get_ref();
    let start = usize::try_from(cursor.position()).unwrap_or(usize::MAX);
    let slice = data.get(start..start.saturating_add(length)).unwrap_or(&[]);
    cursor.set_position(cursor.position() + slice.len() as u64);
    slice
}

/// Compare like C `strncmp` with `n = declared.len()`: the accepted string is NUL-terminated
/// and the comparison ends early only where both sides reach a NUL byte.
fn matches_declared(declared: &[u8], accepted: &[u8]) -> bool {
    for (index, &byte) in declared.iter().enumerate() {
        if byte != accepted.get(index).copied().unwrap_or(0) {
            return false;
        }
        if byte == 0 {
            return true;
        }
    }
    true
}

/// Check that the MIME type bytes describe a supported image type.
fn check_mime_type(mime: &[u8]) -> Result<(), PictureError> {
    if ACCEPTED_MIME_TYPES
        .iter()
        .any(|accepted| matches_declared(mime, accepted.as_bytes()))
    {
        Ok(())
    } else {
        let end = mime.iter().position(|&byte| byte == 0).unwrap_or(mime.len());
        Err(PictureError::InvalidMimeType(
            String::from_utf8_lossy(&mime[..end]).into_owned(),
        ))
    }
}

/// Parse a binary picture block.
///
/// # Errors
///
/// Fails if the block is truncated, contains an invalid picture type or length, or declares a
/// MIME type that is not an image.
pub fn parse_block(block: &[u8]) -> Result<Picture, PictureError> {
    if block.len() < BLOCK_HEADER_SIZE {
        return Err(PictureError::TooShort(block.len()));
    }

    let mut cursor = Cursor::new(block);
    let raw_type = cursor
        .read_u32::<BigEndian>()
        .map_err(|_| PictureError::TooShort(block.len()))?;
    let picture_type = PictureType::from_u32(raw_type).ok_or(PictureError::InvalidType(raw_type))?;

    let mime_length = read_length(&mut cursor, 6 * 4, "MIME type")?;
    check_mime_type(take(&mut cursor, mime_length))?;

    let description_length = read_length(&mut cursor, 5 * 4, "description")?;
    let description = String::from_utf8_lossy(take(&mut cursor, description_length)).into_owned();

    // The reserved space checked above guarantees that these reads succeed.
    let width = cursor.read_u32::<BigEndian>().unwrap_or(0);
    let height = cursor.read_u32::<BigEndian>().unwrap_or(0);
    let _color_depth = cursor.read_u32::<BigEndian>().unwrap_or(0);
    let _indexed_colors = cursor.read_u32::<BigEndian>().unwrap_or(0);

    let data_length = read_length(&mut cursor, 0, "picture data")?;
    let data = take(&mut cursor, data_length);

    Ok(Picture {
        picture_type,
        description,
        width,
        height,
        data: data.into(),
    })
}

/// Serialize a picture into a binary picture block.
///
/// The picture data is written as is; use [`Picture::to_canonical`] first if the target requires
/// a specific format.
///
/// # Errors
///
/// Fails if one of the variable-length parts does not fit into a 32-bit length field.
pub fn write_block(picture: &Picture) -> Result<Vec<u8>, PictureError> {
    let mime = picture.format().mime_type();
    let description = picture.description.as_bytes();
    let length_of = |bytes: &[u8], what: &'static str| {
        u32::try_from(bytes.len()).map_err(|_| PictureError::TooLarge(what))
    };

    let mut block = Vec::with_capacity(
        BLOCK_HEADER_SIZE + mime.len() + description.len() + picture.data.len(),
    );
    let write = |block: &mut Vec<u8>| -> Result<(), PictureError> {
        block.write_u32::<BigEndian>(picture.picture_type.as_u32())?;
        block.write_u32::<BigEndian>(length_of(mime.as_bytes(), "MIME type")?)?;
        block.extend_from_slice(mime.as_bytes());
        block.write_u32::<BigEndian>(length_of(description, "description")?)?;
        block.extend_from_slice(description);
        block.write_u32::<BigEndian>(picture.width)?;
        block.write_u32::<BigEndian>(picture.height)?;
        block.write_u32::<BigEndian>(0)?;
        block.write_u32::<BigEndian>(0)?;
        block.write_u32::<BigEndian>(length_of(&picture.data, "picture data")?)?;
        block.extend_from_slice(&picture.data);
        Ok(())
    };
    write(&mut block)?;
    Ok(block)
}

impl From<io::Error> for PictureError {
    fn from(_: io::Error) -> Self {
        // Writing to a `Vec` cannot fail, except for running out of memory.
        PictureError::TooLarge("picture block")
    }
}

/// Decode a base64-encoded picture block (the value of a `METADATA_BLOCK_PICTURE` field).
///
/// # Errors
///
/// Fails if the value is not valid base64 or if [`parse_block`] rejects the decoded block.
pub fn decode_block(value: &str) -> Result<Picture, PictureError> {
    let block = BASE64_LENIENT.decode(value.trim())?;
    parse_block(&block)
}

/// Encode a picture as a base64-encoded picture block.
///
/// The picture is converted to PNG first unless it already is PNG or JPEG.
///
/// # Errors
///
/// Fails if the picture cannot be converted or serialized.
pub fn encode_block(picture: &Picture) -> Result<String, PictureError> {
    let picture = picture.to_canonical()?;
    let block = write_block(&picture)?;
    Ok(BASE64_STANDARD.encode(block))
}

/// Decode a legacy flat picture (the value of a `COVERART` field).
///
/// The type and description come from separate fields and default to a front cover without a
/// description.
///
/// # Errors
///
/// Fails if the value is not valid base64.
pub fn decode_legacy(
    value: &str,
    picture_type: Option<PictureType>,
    description: Option<&str>,
) -> Result<Picture, PictureError> {
    let data = BASE64_LENIENT.decode(value.trim())?;
    Ok(Picture::new(
        picture_type.unwrap_or_default(),
        description.unwrap_or_default(),
        data,
    ))
}
