// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for conformance-runner.

/// Utilities for pluralizing various words based on count or plurality.
pub mod plural {
    /// Returns "page" if `count` is 1, otherwise "pages".
    pub fn pages_str(count: usize) -> &'static str {
        if count == 1 { "page" } else { "pages" }
    }

    /// Returns "result" if `count` is 1, otherwise "results".
    pub fn results_str(count: usize) -> &'static str {
        if count == 1 { "result" } else { "results" }
    }
}

/// Returns the directory portion of a URL: everything up to and including the last `/`.
///
/// Returns an empty string if the URL has no `/`.
pub(crate) fn url_directory(url: &str) -> &str {
    match url.rfind('/') {
        Some(index) => &url[..=index],
        None => "",
    }
}

/// Appends query parameters to a URL, respecting any query string already present.
pub(crate) fn url_with_query<'a>(
    url: &str,
    params: impl IntoIterator<Item = (&'a str, String)>,
) -> String {
    let mut out = url.to_owned();
    let mut separator = if url.contains('?') { '&' } else { '?' };
    for (key, value) in params {
        out.push(separator);
        out.push_str(key);
        out.push('=');
        out.push_str(&value);
        separator = '&';
    }
    out
}
