// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Reading and rewriting the comment header of an Ogg stream.

use super::header::{Codec, CommentHeader};
use super::{decode, encode, VorbisComments};
use crate::charset::Charset;
use crate::config::Config;
use crate::tag::FileTag;
use crate::util::{ReadSeek, StreamProvider};
use ogg::reading::PacketReader;
use ogg::writing::{PacketWriteEndInfo, PacketWriter};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

/// Skip an ID3v2 tag at the current reader position.
///
/// Returns `true` if a tag was found. If there is no tag, the reader position is unchanged.
///
/// # Errors
///
/// Fails if seeking fails.
pub fn skip_id3v2(reader: &mut dyn ReadSeek) -> io::Result<bool> {
    let start = reader.stream_position()?;
    // `id3` reads ahead, so the position has moved even if there is no tag.
    match id3::Tag::skip(&mut *reader) {
        Ok(true) => return Ok(true),
        Ok(false) => log::debug!("No ID3v2 tag found"),
        Err(err) => log::debug!("No ID3v2 tag found ({err})"),
    }
    let _ = reader.seek(SeekFrom::Start(start))?;
    Ok(false)
}

/// Read packets until the comment header of the first logical stream.
fn read_comment_header<R: io::Read + Seek>(
    packets: &mut PacketReader<R>,
) -> crate::Result<CommentHeader> {
    let first = packets
        .read_packet()?
        .ok_or_else(|| crate::Error::FormatInvalid("empty Ogg stream".to_string()))?;
    let codec = Codec::identify(&first.data)?;
    let serial = first.stream_serial();
    log::debug!("Found {codec:?} stream with serial {serial}");

    while let Some(packet) = packets.read_packet()? {
        if packet.stream_serial() == serial {
            return Ok(CommentHeader::parse(codec, &packet.data)?);
        }
    }
    Err(crate::Error::FormatInvalid(
        "Ogg stream ends before the comment header".to_string(),
    ))
}

/// Read the tag of an Ogg Vorbis or Ogg Opus file.
///
/// Comment bytes that are not valid UTF-8 are sanitized with `charset`.
///
/// # Errors
///
/// Fails if the file cannot be read or does not contain a valid comment header. Malformed
/// individual fields are skipped and only logged.
pub fn read_tag(
    provider: &dyn StreamProvider,
    path: &Path,
    charset: &impl Charset,
    config: &Config,
) -> crate::Result<FileTag> {
    let mut reader = provider.open_read(path)?;
    let has_id3v2 = skip_id3v2(&mut *reader)?;

    let mut packets = PacketReader::new(reader);
    let header = read_comment_header(&mut packets)?;
    let comments = VorbisComments::from_raw(header.comments.iter().map(Vec::as_slice), charset);

    let (mut tag, errors) = decode(&comments, config);
    for err in &errors {
        log::debug!("{}: {err}", path.display());
    }
    if has_id3v2 {
        log::debug!(
            "{} starts with an ID3v2 tag that will be removed",
            path.display()
        );
        tag.saved = false;
    }
    Ok(tag)
}

/// Copy the Ogg stream from `reader` to `output`, replacing the comments of the first logical
/// stream.
///
/// The page layout of all other packets is kept.
fn rewrite_stream(
    reader: Box<dyn ReadSeek>,
    comments: &VorbisComments,
    output: &mut dyn Write,
) -> crate::Result<()> {
    let mut packets = PacketReader::new(reader);
    let mut writer = PacketWriter::new(output);
    let mut first_stream: Option<(u32, Codec)> = None;
    let mut replaced = false;

    while let Some(packet) = packets.read_packet()? {
        let serial = packet.stream_serial();
        let absgp = packet.absgp_page();
        let end_info = if packet.last_in_stream() {
            PacketWriteEndInfo::EndStream
        } else if packet.last_in_page() {
            PacketWriteEndInfo::EndPage
        } else {
            PacketWriteEndInfo::NormalPacket
        };

        let data = match first_stream {
            None => {
                first_stream = Some((serial, Codec::identify(&packet.data)?));
                packet.data
            }
            Some((first_serial, codec)) if serial == first_serial && !replaced => {
                let mut header = CommentHeader::parse(codec, &packet.data)?;
                header.comments = comments.to_raw();
                replaced = true;
                header.to_packet()?
            }
            Some(_) => packet.data,
        };
        writer.write_packet(data, serial, end_info, absgp)?;
    }

    if replaced {
        Ok(())
    } else {
        Err(crate::Error::FormatInvalid(
            "Ogg stream ends before the comment header".to_string(),
        ))
    }
}

/// Write the tag into an Ogg Vorbis or Ogg Opus file.
///
/// The complete stream is rewritten into a staged file with a freshly built comment header. The
/// vendor string is kept, a leading ID3v2 tag is dropped.
///
/// # Errors
///
/// Fails if the file cannot be read or written, or is not a valid Ogg stream. The original file
/// is unchanged in that case.
pub fn write_tag(
    provider: &dyn StreamProvider,
    path: &Path,
    tag: &FileTag,
    config: &Config,
) -> crate::Result<()> {
    let (comments, errors) = encode(tag, config);
    for err in &errors {
        log::warn!("{}: {err}", path.display());
    }

    provider.replace(path, &mut |output| {
        let mut reader = provider.open_read(path)?;
        if skip_id3v2(&mut *reader)? {
            log::debug!("Removing ID3v2 tag from {}", path.display());
        }
        rewrite_stream(reader, &comments, output)
    })?;
    log::info!(
        "Wrote {} comments to {}",
        comments.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// An ID3v2.4 header followed by ten bytes of padding.
    const ID3V2_TAG: &[u8] = b"ID3\x04\x00\x00\x00\x00\x00\x0a\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00";

    #[test]
    fn test_skip_id3v2_without_tag_keeps_position() {
        let mut content = b"OggS".to_vec();
        content.extend([0; 100]);
        let mut reader = Cursor::new(content);

        assert!(!skip_id3v2(&mut reader).unwrap());
        assert_eq!(reader.stream_position().unwrap(), 0);
    }

    #[test]
    fn test_skip_id3v2_keeps_nonzero_start() {
        let mut content = vec![0; 8];
        content.extend(b"OggS");
        content.extend([0; 4096]);
        let mut reader = Cursor::new(content);
        let _ = reader.seek(SeekFrom::Start(8)).unwrap();

        assert!(!skip_id3v2(&mut reader).unwrap());
        assert_eq!(reader.stream_position().unwrap(), 8);
    }

    #[test]
    fn test_skip_id3v2_with_tag() {
        let mut content = ID3V2_TAG.to_vec();
        content.extend(b"OggS");
        let mut reader = Cursor::new(content);

        assert!(skip_id3v2(&mut reader).unwrap());
        let mut rest = Vec::new();
        let _ = io::Read::read_to_end(&mut reader, &mut rest).unwrap();
        assert_eq!(rest, b"OggS");
    }

    #[test]
    fn test_skip_id3v2_empty_input() {
        let mut reader = Cursor::new(Vec::new());
        assert!(!skip_id3v2(&mut reader).unwrap());
        assert_eq!(reader.stream_position().unwrap(), 0);
    }
}
