// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dotted version comparisons.
//!
//! Versions look like `"<major>.<minor>.<patch> <anything>"`. Only the text before the first space
//! matters, and each dot-separated segment is read as a leading integer (so `"3rc1"` reads as 3).

/// Returns true if `have` is at least `want`.
///
/// The comparison walks `want`'s segments from left to right. A segment missing from `have` reads
/// as 0, so `is_at_least("1.1", "1.1.1")` is false. The first segment that differs decides the
/// result; if every compared segment is equal, `have` is at least `want`.
///
/// A segment that doesn't start with a number can't be ordered against anything, and the walk moves
/// on to the next segment.
pub fn is_at_least(have: &str, want: &str) -> bool {
    let have: Vec<&str> = significant(have).split('.').collect();

    for (index, want_segment) in significant(want).split('.').enumerate() {
        let want_num = leading_int(want_segment);
        let have_num = match have.get(index) {
            Some(segment) if !segment.is_empty() => leading_int(segment),
            _ => Some(0),
        };

        if let (Some(have_num), Some(want_num)) = (have_num, want_num) {
            if have_num > want_num {
                return true;
            }
            if have_num < want_num {
                return false;
            }
        }
    }

    true
}

/// Returns the major version number of a version string.
///
/// This is 1 if no version is provided, or if the major segment isn't a number.
pub fn major_version(version: Option<&str>) -> u32 {
    let Some(version) = version.filter(|v| !v.is_empty()) else {
        return 1;
    };
    let major = significant(version).split('.').next().unwrap_or_default();
    leading_int(major)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(1)
}

fn significant(version: &str) -> &str {
    version.split(' ').next().unwrap_or_default()
}

/// Parses an optional sign followed by leading decimal digits, ignoring anything afterwards.
fn leading_int(segment: &str) -> Option<i64> {
    let segment = segment.trim_start();
    let (negative, digits) = match segment.as_bytes().first() {
        Some(b'-') => (true, &segment[1..]),
        Some(b'+') => (false, &segment[1..]),
        _ => (false, segment),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // Saturate absurdly long segments rather than failing them.
    let value = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}
