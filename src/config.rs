// Copyright (c) 2024 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Configuration utils.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Encountered when the configuration cannot be loaded.
#[derive(Error, Debug)]
#[error("Configuration Error: {0}")]
pub struct ConfigError(#[from] ::config::ConfigError);

/// Default configuration TOML string.
const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

/// Fields whose multiple values can be written as separate entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitField {
    /// Track title.
    Title,
    /// Track artist and album artist.
    Artist,
    /// Album title.
    Album,
    /// Genre.
    Genre,
    /// Comment.
    Comment,
    /// Composer.
    Composer,
    /// Original artist (stored as performer).
    OriginalArtist,
}

/// Which joined fields are split on the multi-field separator when saving.
///
/// A field that is not split is written as a single entry containing the joined string.
#[expect(clippy::struct_excessive_bools)]
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize)]
pub struct SplitConfig {
    /// Split the title.
    pub title: bool,
    /// Split the artist and the album artist.
    pub artist: bool,
    /// Split the album.
    pub album: bool,
    /// Split the genre.
    pub genre: bool,
    /// Split the comment.
    pub comment: bool,
    /// Split the composer.
    pub composer: bool,
    /// Split the original artist.
    pub original_artist: bool,
}

impl SplitConfig {
    /// Returns `true` if values of the given field should be written as separate entries.
    #[must_use]
    pub fn should_split(&self, field: SplitField) -> bool {
        match field {
            SplitField::Title => self.title,
            SplitField::Artist => self.artist,
            SplitField::Album => self.album,
            SplitField::Genre => self.genre,
            SplitField::Comment => self.comment,
            SplitField::Composer => self.composer,
            SplitField::OriginalArtist => self.original_artist,
        }
    }
}

/// Formatting of numbers that were parsed from disc and track fields.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct NumberConfig {
    /// Pad numbers with leading zeros.
    pub padded: bool,
    /// Minimum number of digits when padding is enabled.
    pub width: usize,
}

impl Default for NumberConfig {
    fn default() -> Self {
        NumberConfig {
            padded: false,
            width: 2,
        }
    }
}

impl NumberConfig {
    /// Render a number according to this configuration.
    #[must_use]
    pub fn format(&self, number: i64) -> String {
        if self.padded {
            format!("{number:0width$}", width = self.width)
        } else {
            number.to_string()
        }
    }
}

/// The main configuration struct.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Config {
    /// Split-on-save configuration.
    pub split: SplitConfig,
    /// Number formatting configuration.
    pub numbers: NumberConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::load_default().expect("Failed to load default config")
    }
}

impl Config {
    /// Start a configuration builder that already contains the default values.
    fn builder() -> ::config::ConfigBuilder<::config::builder::DefaultState> {
        ::config::Config::builder().add_source(::config::File::from_str(
            DEFAULT_CONFIG,
            ::config::FileFormat::Toml,
        ))
    }

    /// Load the default configuration.
    fn load_default() -> Result<Self, ConfigError> {
        let config = Self::builder().build()?.try_deserialize()?;
        Ok(config)
    }

    /// Load the configuration from a string slice, taking values not set in it from the
    /// defaults.
    ///
    /// # Errors
    ///
    /// This method fails if the string contains malformed configuration markup.
    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        let config = Self::builder()
            .add_source(::config::File::from_str(text, ::config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Load the configuration from a file located at the given path, taking values not set in
    /// the file from the defaults.
    ///
    /// # Errors
    ///
    /// This method can fail if the file cannot be accessed or if it contains malformed
    /// configuration markup.
    pub fn load_from_path<T: AsRef<Path>>(path: T) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::load_from_str(&text)?;
        Ok(config)
    }

    /// Serialize this configuration to a TOML string.
    ///
    /// # Panics
    ///
    /// Panics if the configuration cannot be represented as TOML, which constitutes a
    /// programming error.
    #[must_use]
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("Failed to serialize configuration")
    }
}
