// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::{ManifestParseError, ManifestParseErrorKind};

/// Options written explicitly on a single manifest line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntryOptions {
    /// The value of `--min-version`, if specified.
    pub min_version: Option<String>,

    /// The value of `--max-version`, if specified.
    pub max_version: Option<String>,

    /// True if `--slow` was specified.
    pub slow: bool,
}

/// A single parsed manifest line.
///
/// Entries only exist while a manifest is being resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestEntry {
    path: String,
    options: EntryOptions,
}

impl ManifestEntry {
    /// Parses a line of a manifest.
    ///
    /// `manifest` and `line_number` are only used for error reporting.
    pub fn parse(
        line: &str,
        manifest: &str,
        line_number: usize,
    ) -> Result<Self, ManifestParseError> {
        let mut tokens = line.split_whitespace();
        let mut options = EntryOptions::default();
        let mut path_parts = Vec::new();

        while let Some(token) = tokens.next() {
            let Some(rest) = token.strip_prefix('-') else {
                path_parts.push(token);
                continue;
            };
            let Some(option) = rest.strip_prefix('-') else {
                return Err(ManifestParseError::new(
                    manifest,
                    line_number,
                    token,
                    ManifestParseErrorKind::BadOption,
                ));
            };

            match option {
                "slow" => options.slow = true,
                "min-version" | "max-version" => {
                    let Some(value) = tokens.next() else {
                        return Err(ManifestParseError::new(
                            manifest,
                            line_number,
                            token,
                            ManifestParseErrorKind::MissingOptionArgument {
                                option: option.to_owned(),
                            },
                        ));
                    };
                    let slot = if option == "min-version" {
                        &mut options.min_version
                    } else {
                        &mut options.max_version
                    };
                    *slot = Some(value.to_owned());
                }
                _ => {
                    return Err(ManifestParseError::new(
                        manifest,
                        line_number,
                        token,
                        ManifestParseErrorKind::UnknownOption {
                            option: option.to_owned(),
                        },
                    ));
                }
            }
        }

        Ok(Self {
            path: path_parts.join(" "),
            options,
        })
    }

    /// The path on this line, relative to the manifest's directory.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The options written on this line.
    pub fn options(&self) -> &EntryOptions {
        &self.options
    }
}

/// Returns true if a raw manifest line carries no entry.
///
/// Blank lines, lines starting with `#`, `;` or `//`, and lines shorter than five characters after
/// trimming are all skipped.
pub fn is_comment_line(line: &str) -> bool {
    let line = line.trim();
    line.chars().count() < 5
        || line.starts_with('#')
        || line.starts_with(';')
        || line.starts_with("//")
}
