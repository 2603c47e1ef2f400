// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{FilterOptions, HierarchicalOptions, ManifestEntry, is_comment_line};
use crate::{
    errors::{ManifestFetchError, ResolveError},
    fetch::TextFetcher,
    helpers::url_directory,
};
use futures::future::{self, FutureExt, LocalBoxFuture};
use tracing::debug;

/// The extension that marks a manifest line as a nested manifest.
pub const DEFAULT_MANIFEST_EXTENSION: &str = ".txt";

/// Expands a root manifest into an ordered list of test URLs.
///
/// Nested manifests are fetched concurrently, but the output is always in manifest order: a nested
/// manifest's tests appear at the position of the line that referenced it.
#[derive(Debug)]
pub struct ManifestResolver<'f, F> {
    fetcher: &'f F,
    filter: FilterOptions,
    extension: String,
}

impl<'f, F: TextFetcher> ManifestResolver<'f, F> {
    /// Creates a new resolver fetching manifests through `fetcher`.
    pub fn new(fetcher: &'f F, filter: FilterOptions) -> Self {
        Self {
            fetcher,
            filter,
            extension: DEFAULT_MANIFEST_EXTENSION.to_owned(),
        }
    }

    /// Sets the extension that marks nested manifests.
    pub fn set_extension(&mut self, extension: impl Into<String>) -> &mut Self {
        self.extension = extension.into();
        self
    }

    /// Resolves `root` into the list of test URLs it selects.
    ///
    /// `root` is treated like a manifest line: if it doesn't end in the manifest extension, it is a
    /// single test. If any manifest fails to parse or load, the whole resolution fails, and the
    /// error reported is the first one in manifest order.
    pub async fn resolve(&self, root: &str) -> Result<Vec<String>, ResolveError> {
        let urls = self
            .resolve_line("", root, root, 1, HierarchicalOptions::default())
            .await?;
        debug!(root, count = urls.len(), "resolved manifest");
        Ok(urls)
    }

    fn resolve_line<'a>(
        &'a self,
        prefix: &'a str,
        line: &'a str,
        manifest: &'a str,
        line_number: usize,
        inherited: HierarchicalOptions,
    ) -> LocalBoxFuture<'a, Result<Vec<String>, ResolveError>> {
        async move {
            let entry = ManifestEntry::parse(line, manifest, line_number)?;
            let url = format!("{prefix}{}", entry.path());

            if url.ends_with(&self.extension) {
                let options = inherited.with_overrides(entry.options());
                return self.expand_manifest(url, options).await;
            }

            let effective = inherited.effective(entry.options());
            if self.filter.includes(&effective) {
                Ok(vec![url])
            } else {
                debug!(%url, ?effective, "test filtered out");
                Ok(Vec::new())
            }
        }
        .boxed_local()
    }

    async fn expand_manifest(
        &self,
        url: String,
        options: HierarchicalOptions,
    ) -> Result<Vec<String>, ResolveError> {
        let text = self
            .fetcher
            .fetch(&url)
            .await
            .map_err(|err| ManifestFetchError::new(&url, err))?;
        let prefix = url_directory(&url);

        let children = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !is_comment_line(line))
            .map(|(index, line)| {
                self.resolve_line(prefix, line, &url, index + 1, options.clone())
            });
        let results = future::join_all(children).await;
        debug!(%url, entries = results.len(), "expanded manifest");

        let mut urls = Vec::new();
        for result in results {
            urls.extend(result?);
        }
        Ok(urls)
    }
}
