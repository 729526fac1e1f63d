// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Vorbis and Opus header packets.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;
use thiserror::Error;

/// Magic bytes of a Vorbis identification header.
const VORBIS_IDENTIFICATION_MAGIC: &[u8] = b"\x01vorbis";
/// Magic bytes of a Vorbis comment header.
const VORBIS_COMMENT_MAGIC: &[u8] = b"\x03vorbis";
/// Magic bytes of an Opus identification header.
const OPUS_IDENTIFICATION_MAGIC: &[u8] = b"OpusHead";
/// Magic bytes of an Opus comment header.
const OPUS_COMMENT_MAGIC: &[u8] = b"OpusTags";

/// Problems found while parsing a header packet.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    /// The first packet is not a Vorbis or Opus identification header.
    #[error("not a Vorbis or Opus stream")]
    UnknownCodec,
    /// The second packet is not the comment header of the codec.
    #[error("missing {0:?} comment header")]
    MissingCommentHeader(Codec),
    /// The packet ends before the announced data.
    #[error("comment header is truncated ({0})")]
    Truncated(&'static str),
    /// The Vorbis framing bit is not set.
    #[error("comment header has no framing bit")]
    MissingFramingBit,
    /// A length does not fit into a 32-bit length field.
    #[error("{0} is too large for a comment header")]
    TooLarge(&'static str),
}

impl From<HeaderError> for crate::Error {
    fn from(err: HeaderError) -> Self {
        crate::Error::FormatInvalid(err.to_string())
    }
}

/// Codec of a logical Ogg stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Vorbis audio.
    Vorbis,
    /// Opus audio.
    Opus,
}

impl Codec {
    /// Identify the codec from the first packet of a stream.
    ///
    /// # Errors
    ///
    /// Fails if the packet is not a Vorbis or Opus identification header.
    pub fn identify(packet: &[u8]) -> Result<Self, HeaderError> {
        if packet.starts_with(VORBIS_IDENTIFICATION_MAGIC) {
            Ok(Codec::Vorbis)
        } else if packet.starts_with(OPUS_IDENTIFICATION_MAGIC) {
            Ok(Codec::Opus)
        } else {
            Err(HeaderError::UnknownCodec)
        }
    }

    /// Magic bytes at the start of the comment header.
    fn comment_magic(self) -> &'static [u8] {
        match self {
            Codec::Vorbis => VORBIS_COMMENT_MAGIC,
            Codec::Opus => OPUS_COMMENT_MAGIC,
        }
    }
}

/// The content of a comment header packet.
///
/// Comments are kept as raw bytes. Turning them into strings is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentHeader {
    /// Codec that the header belongs to.
    pub codec: Codec,
    /// Vendor string of the encoder.
    pub vendor: Vec<u8>,
    /// Comments in `KEY=value` form.
    pub comments: Vec<Vec<u8>>,
    /// Data after the comment list. Only Opus headers may carry this.
    pub trailing: Vec<u8>,
}

/// Read a length-prefixed byte string.
fn read_bytes(cursor: &mut Cursor<&[u8]>, what: &'static str) -> Result<Vec<u8>, HeaderError> {
    let length = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| HeaderError::Truncated(what))?;
    let length = usize::try_from(length).map_err(|_| HeaderError::Truncated(what))?;
    let data: &[u8] = *cursor.get_ref();
    let start = usize::try_from(cursor.position()).map_err(|_| HeaderError::Truncated(what))?;
    let bytes = start
        .checked_add(length)
        .and_then(|end| data.get(start..end))
        .ok_or(HeaderError::Truncated(what))?;
    cursor.set_position(cursor.position() + bytes.len() as u64);
    Ok(bytes.to_vec())
}

/// Write a length-prefixed byte string.
fn write_bytes(packet: &mut Vec<u8>, bytes: &[u8], what: &'static str) -> Result<(), HeaderError> {
    let length = u32::try_from(bytes.len()).map_err(|_| HeaderError::TooLarge(what))?;
    packet
        .write_u32::<LittleEndian>(length)
        .map_err(|_| HeaderError::TooLarge(what))?;
    packet.extend_from_slice(bytes);
    Ok(())
}

impl CommentHeader {
    /// Create an empty comment header.
    #[must_use]
    pub fn new(codec: Codec, vendor: impl Into<Vec<u8>>) -> Self {
        CommentHeader {
            codec,
            vendor: vendor.into(),
            comments: Vec::new(),
            trailing: Vec::new(),
        }
    }

    /// Parse the comment header packet of a stream with the given codec.
    ///
    /// Every length is checked against the remaining packet before anything is allocated.
    ///
    /// # Errors
    ///
    /// Fails if the packet is not a comment header or is truncated.
    pub fn parse(codec: Codec, packet: &[u8]) -> Result<Self, HeaderError> {
        let magic = codec.comment_magic();
        let body = packet
            .strip_prefix(magic)
            .ok_or(HeaderError::MissingCommentHeader(codec))?;

        let mut cursor = Cursor::new(body);
        let vendor = read_bytes(&mut cursor, "vendor string")?;
        let count = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| HeaderError::Truncated("comment count"))?;

        // Each comment takes at least four bytes, so the count cannot exceed this.
        let max_count = body.len() / 4;
        let mut comments = Vec::with_capacity(usize::try_from(count).unwrap_or(0).min(max_count));
        for _ in 0..count {
            comments.push(read_bytes(&mut cursor, "comment")?);
        }

        let position = usize::try_from(cursor.position()).unwrap_or(body.len());
        let rest = body.get(position..).unwrap_or_default();
        let trailing = match codec {
            Codec::Vorbis => {
                if rest.first().is_some_and(|byte| byte & 1 == 1) {
                    Vec::new()
                } else {
                    return Err(HeaderError::MissingFramingBit);
                }
            }
            Codec::Opus => rest.to_vec(),
        };

        Ok(CommentHeader {
            codec,
            vendor,
            comments,
            trailing,
        })
    }

    /// Serialize the comment header into a packet.
    ///
    /// # Errors
    ///
    /// Fails if a length does not fit into a 32-bit field.
    pub fn to_packet(&self) -> Result<Vec<u8>, HeaderError> {
        let mut packet = Vec::new();
        packet.extend_from_slice(self.codec.comment_magic());
        write_bytes(&mut packet, &self.vendor, "vendor string")?;
        let count =
            u32::try_from(self.comments.len()).map_err(|_| HeaderError::TooLarge("comment list"))?;
        packet
            .write_u32::<LittleEndian>(count)
            .map_err(|_| HeaderError::TooLarge("comment list"))?;
        for comment in &self.comments {
            write_bytes(&mut packet, comment, "comment")?;
        }
        match self.codec {
            Codec::Vorbis => packet.push(1),
            Codec::Opus => packet.extend_from_slice(&self.trailing),
        }
        Ok(packet)
    }
}
