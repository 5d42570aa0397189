//! Shared name and locator helpers for storage backends.
//!
//! Locator format: `{base_url}{shard}{filename}`, always joined with `/`.
//! A storage *name* is the locator without the base URL.

use crate::traits::{StorageError, StorageResult};

/// Byte limit of one path segment on common filesystems.
const MAX_FILENAME_LENGTH: usize = 255;

/// Room kept for the `_{n}` suffix a collision appends (`_` plus a u64).
const COLLISION_SUFFIX_RESERVE: usize = 21;

/// Append the trailing `/` a non-empty base URL needs before a name is joined.
pub(crate) fn normalize_base_url(base_url: &str) -> String {
    if base_url.is_empty() || base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{}/", base_url)
    }
}

pub(crate) fn build_locator(base_url: &str, name: &str) -> String {
    format!("{}{}", base_url, name)
}

/// Strip the configured base URL from a locator; names pass through unchanged.
pub(crate) fn strip_base_url<'a>(locator: &'a str, base_url: &str) -> &'a str {
    if base_url.is_empty() {
        return locator;
    }
    locator.strip_prefix(base_url).unwrap_or(locator)
}

/// Reject names that could escape the storage root.
pub(crate) fn validate_name(name: &str) -> StorageResult<()> {
    if name.is_empty() || name.starts_with('/') || name.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "Storage name is empty or not relative: {}",
            name
        )));
    }

    if name
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::InvalidKey(format!(
            "Storage name contains invalid path segments: {}",
            name
        )));
    }

    Ok(())
}

/// Reject names a filename policy returned that are not a single segment.
pub(crate) fn validate_segment(name: &str) -> StorageResult<()> {
    validate_name(name)?;
    if name.contains('/') {
        return Err(StorageError::InvalidKey(format!(
            "Allocated filename must not contain '/': {}",
            name
        )));
    }
    Ok(())
}

/// Reduce a client-supplied filename to a safe single path segment.
///
/// Directory components are dropped, characters outside `[A-Za-z0-9._-]` become
/// `_`, and an extension matching `ext` case-insensitively is rewritten to
/// `ext` itself so allocation can strip it exactly. The stem is trimmed on a
/// char boundary so that stem, collision suffix and `ext` fit in
/// `MAX_FILENAME_LENGTH` bytes. A name with no usable stem becomes `file{ext}`.
pub fn sanitize_filename(filename: &str, ext: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let mapped: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let (stem, ext) = match split_extension(&mapped, ext) {
        Some(stem) => (stem, ext),
        None => (mapped.as_str(), ""),
    };

    let budget = MAX_FILENAME_LENGTH
        .saturating_sub(COLLISION_SUFFIX_RESERVE)
        .saturating_sub(ext.len());
    let stem = truncate_to_bytes(stem, budget);

    fallback_if_blank(format!("{}{}", stem, ext), ext)
}

/// Longest prefix of `s` no longer than `max` bytes that ends on a char boundary.
fn truncate_to_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let end = s
        .char_indices()
        .map(|(idx, c)| idx + c.len_utf8())
        .take_while(|&end| end <= max)
        .last()
        .unwrap_or(0);
    &s[..end]
}

/// Stem of `name` when it ends with `ext`, compared case-insensitively.
fn split_extension<'a>(name: &'a str, ext: &str) -> Option<&'a str> {
    if ext.is_empty() || name.len() < ext.len() {
        return None;
    }
    let split = name.len() - ext.len();
    let suffix = name.get(split..)?;
    if suffix.eq_ignore_ascii_case(ext) {
        name.get(..split)
    } else {
        None
    }
}

fn fallback_if_blank(name: String, ext: &str) -> String {
    let stem = name.strip_suffix(ext).unwrap_or(&name);
    if stem.trim_matches('.').is_empty() {
        format!("file{}", ext)
    } else {
        name
    }
}
