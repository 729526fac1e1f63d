// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Error and result types.

use crate::picture::PictureError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type.
///
/// Every variant is fatal to the single-file operation that raised it. Problems that only affect
/// a single field are reported as [`FieldError`] instead and never abort an operation.
#[derive(Error, Debug)]
pub enum ErrorType {
    /// Configuration error.
    #[error("Configuration Error ({0})")]
    Config(#[from] crate::config::ConfigError),
    /// I/O Error.
    #[error("Input/Output error ({:?})", .0)]
    Io(#[from] io::Error),
    /// File has an unknown file extension and content.
    #[error("File has unknown file type")]
    UnknownFileType,
    /// The container structure is not recognized or corrupt.
    #[error("Invalid file format: {0}")]
    FormatInvalid(String),
    /// Errors raised by the [`ogg`] crate while reading the page structure.
    #[cfg(feature = "ogg")]
    #[error("Failed to read Ogg stream ({0})")]
    Ogg(#[from] ogg::reading::OggReadError),
    /// Saving the tag failed.
    #[error("Failed to save tag to {}", .0.display())]
    SaveFailed(PathBuf),
}

/// Convenience type.
pub type Result<T> = std::result::Result<T, ErrorType>;

/// A problem with a single field that does not interrupt processing of the remaining fields.
///
/// The affected field is dropped and the tag is marked as not saved, so that the next save
/// writes a normalized version.
#[derive(Error, Debug)]
pub enum FieldError {
    /// A malformed field was dropped while decoding.
    #[error("Skipped malformed {field} field: {reason}")]
    DecodeSkipped {
        /// Name of the container field.
        field: &'static str,
        /// Why the field was rejected.
        reason: PictureError,
    },
    /// A picture cannot be stored in the target container and was left out.
    #[error("Skipped picture that cannot be stored: {0}")]
    EncodeUnsupported(PictureError),
}
