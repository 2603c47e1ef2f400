// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The list of tests selected for a run.

use crate::helpers::url_directory;
use std::fmt;

/// A single test page.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TestFile {
    url: String,
}

impl TestFile {
    /// Creates a new test file for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// The URL of this test, relative to the root manifest.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The directory of this test, including the trailing `/`.
    pub fn directory(&self) -> &str {
        url_directory(&self.url)
    }
}

impl fmt::Display for TestFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// An ordered list of tests, in manifest order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestList {
    files: Vec<TestFile>,
}

impl TestList {
    /// Builds a list from resolved URLs, keeping only tests in one of `selected_folders`.
    ///
    /// A test is kept if its directory starts with any of the selected folders. An empty selection,
    /// or a selection containing `./` or the empty string, keeps everything.
    pub fn from_urls<I, S>(urls: I, selected_folders: &[String]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let select_all = selected_folders.is_empty()
            || selected_folders
                .iter()
                .any(|folder| folder.is_empty() || folder == "./");
        let files = urls
            .into_iter()
            .map(TestFile::new)
            .filter(|file| {
                select_all
                    || selected_folders
                        .iter()
                        .any(|folder| file.directory().starts_with(folder.as_str()))
            })
            .collect();
        Self { files }
    }

    /// The number of tests.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if there are no tests.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Returns the test at `index`.
    pub fn get(&self, index: usize) -> Option<&TestFile> {
        self.files.get(index)
    }

    /// Iterates over the tests in order.
    pub fn iter(&self) -> std::slice::Iter<'_, TestFile> {
        self.files.iter()
    }

    pub(crate) fn as_slice(&self) -> &[TestFile] {
        &self.files
    }
}

impl<'a> IntoIterator for &'a TestList {
    type Item = &'a TestFile;
    type IntoIter = std::slice::Iter<'a, TestFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
