// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Filesystem access for the container adapters.

use std::ffi::OsStr;
use std::fs;
use std::io::{self, Read, Seek, Write};
use std::path::Path;

/// A readable and seekable byte stream.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// Callback that writes the complete new content of a file.
pub type WriteFn<'a> = dyn FnMut(&mut dyn Write) -> crate::Result<()> + 'a;

/// Opens files for reading and replaces them atomically.
///
/// Ogg files are read and written only through the provider. MP4 files are read through it, but
/// their tags are written in place on the local file system at the given path, without calling
/// [`StreamProvider::replace`].
pub trait StreamProvider {
    /// Open the file at `path` for reading.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened.
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadSeek>>;

    /// Replace the content of the file at `path` with what `write` produces.
    ///
    /// The new content is staged and only moved over the original file if `write` succeeded.
    /// Otherwise, the original file is left untouched.
    ///
    /// # Errors
    ///
    /// Fails if staging or moving the file fails, or if `write` returns an error.
    fn replace(&self, path: &Path, write: &mut WriteFn<'_>) -> crate::Result<()>;
}

/// Accesses files on the local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFiles;

impl StreamProvider for LocalFiles {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadSeek>> {
        let file = fs::File::open(path)?;
        Ok(Box::new(io::BufReader::new(file)))
    }

    fn replace(&self, path: &Path, write: &mut WriteFn<'_>) -> crate::Result<()> {
        let filename = path
            .file_name()
            .and_then(OsStr::to_str)
            .ok_or(io::Error::other("cannot determine file name"))?;
        let directory = path
            .parent()
            .map(|parent| {
                if parent.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    parent
                }
            })
            .ok_or(io::Error::other("cannot determine directory"))?;
        let mut staged_file = tempfile::Builder::new()
            .prefix(format!(".tagsmith.{filename}").as_str())
            .suffix(".tmp")
            .tempfile_in(directory)?;

        {
            let mut writer = io::BufWriter::new(staged_file.as_file_mut());
            write(&mut writer)?;
            writer.flush()?;
        }

        // Temporary files are created with restrictive permissions, keep the original ones.
        if let Ok(metadata) = fs::metadata(path) {
            staged_file
                .as_file()
                .set_permissions(metadata.permissions())?;
        }

        // When writing succeeded, persist the staged file at the actual destination.
        let staged_path = staged_file.into_temp_path();
        staged_path.persist(path).map_err(io::Error::from)?;
        log::info!("Replaced file {}", path.display());

        Ok(())
    }
}
