// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fetching manifest text.
//!
//! The resolver doesn't care where manifests come from. [`FsFetcher`] reads them from a directory on
//! disk, and [`StaticFetcher`] serves them from memory.

use crate::errors::FetchError;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use std::{collections::BTreeMap, future::Future, io};
use tracing::debug;

/// Retrieves the text of a manifest by URL.
pub trait TextFetcher {
    /// Fetches the text at `url`, or fails.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>>;
}

/// Fetches manifests from files under a base directory.
#[derive(Clone, Debug)]
pub struct FsFetcher {
    base_dir: Utf8PathBuf,
}

impl FsFetcher {
    /// Creates a new fetcher resolving URLs relative to `base_dir`.
    pub fn new(base_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Returns the base directory.
    pub fn base_dir(&self) -> &Utf8Path {
        &self.base_dir
    }

    fn resolve_path(&self, url: &str) -> Result<Utf8PathBuf, FetchError> {
        // Strip any query string or fragment.
        let path = url.split(['?', '#']).next().unwrap_or_default();
        let path = Utf8Path::new(path);
        let escapes = path.components().any(|component| {
            matches!(
                component,
                Utf8Component::RootDir | Utf8Component::Prefix(_) | Utf8Component::ParentDir
            )
        });
        if escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("URL `{url}` escapes the base directory `{}`", self.base_dir),
            )
            .into());
        }
        Ok(self.base_dir.join(path))
    }
}

impl TextFetcher for FsFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let path = self.resolve_path(url)?;
        debug!(%url, %path, "reading manifest");
        tokio::fs::read_to_string(&path).await.map_err(|err| {
            io::Error::new(err.kind(), format!("failed to read `{path}`: {err}")).into()
        })
    }
}

/// Serves manifests from an in-memory map.
#[derive(Clone, Debug, Default)]
pub struct StaticFetcher {
    texts: BTreeMap<String, String>,
}

impl StaticFetcher {
    /// Creates a new, empty fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the text served at `url`.
    pub fn insert(&mut self, url: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.texts.insert(url.into(), text.into());
        self
    }
}

impl<U: Into<String>, T: Into<String>> FromIterator<(U, T)> for StaticFetcher {
    fn from_iter<I: IntoIterator<Item = (U, T)>>(iter: I) -> Self {
        Self {
            texts: iter
                .into_iter()
                .map(|(url, text)| (url.into(), text.into()))
                .collect(),
        }
    }
}

impl TextFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.texts.get(url).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no text for `{url}`")).into()
        })
    }
}
