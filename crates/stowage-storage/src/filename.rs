//! Collision-free filename allocation.
//!
//! A [`FilenamePolicy`] decides the final on-disk name for an upload given a
//! view of the target directory. The default, [`SuffixFilename`], keeps the
//! desired name when it is free and otherwise appends `_1`, `_2`, ... before
//! the extension.
//!
//! Allocation is a check, not a reservation: backends hold their creation
//! lock across `allocate` and the create call.

use std::collections::{BTreeSet, HashSet};
use std::hash::BuildHasher;
use std::io::ErrorKind;
use std::path::Path;

/// Read-only view of the entries in one directory
pub trait DirectoryView {
    fn contains(&self, name: &str) -> bool;
}

/// A directory on the local filesystem
///
/// Lookups behave like `stat`: any error other than "not found" counts as an
/// existing entry so that allocation never hands out a name it could not
/// verify.
#[derive(Debug, Clone, Copy)]
pub struct LocalDirectory<'a>(pub &'a Path);

impl DirectoryView for LocalDirectory<'_> {
    fn contains(&self, name: &str) -> bool {
        match std::fs::symlink_metadata(self.0.join(name)) {
            Ok(_) => true,
            Err(e) => e.kind() != ErrorKind::NotFound,
        }
    }
}

impl<S: BuildHasher> DirectoryView for HashSet<String, S> {
    fn contains(&self, name: &str) -> bool {
        HashSet::contains(self, name)
    }
}

impl DirectoryView for BTreeSet<String> {
    fn contains(&self, name: &str) -> bool {
        BTreeSet::contains(self, name)
    }
}

/// Pluggable filename allocation
///
/// `filename` is the desired name including `ext`; the returned name must not
/// collide with any entry of `dir`. Closures with the matching signature are
/// policies too.
pub trait FilenamePolicy: Send + Sync {
    fn allocate(&self, dir: &dyn DirectoryView, filename: &str, ext: &str) -> String;
}

impl<F> FilenamePolicy for F
where
    F: Fn(&dyn DirectoryView, &str, &str) -> String + Send + Sync,
{
    fn allocate(&self, dir: &dyn DirectoryView, filename: &str, ext: &str) -> String {
        self(dir, filename, ext)
    }
}

/// Default policy: `name.ext`, then `name_1.ext`, `name_2.ext`, ...
#[derive(Debug, Default, Clone, Copy)]
pub struct SuffixFilename;

impl FilenamePolicy for SuffixFilename {
    fn allocate(&self, dir: &dyn DirectoryView, filename: &str, ext: &str) -> String {
        unique_filename(dir, filename, ext)
    }
}

/// Return `filename` if `dir` has no such entry, else the first free
/// `{base}_{n}{ext}` for n = 1, 2, ...
pub fn unique_filename(dir: &dyn DirectoryView, filename: &str, ext: &str) -> String {
    if !dir.contains(filename) {
        return filename.to_string();
    }

    let base = filename.strip_suffix(ext).unwrap_or(filename);
    let mut count: u64 = 1;
    loop {
        let candidate = format!("{}_{}{}", base, count, ext);
        if !dir.contains(&candidate) {
            return candidate;
        }
        count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn view(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_free_name_is_kept() {
        assert_eq!(unique_filename(&view(&[]), "a.xml", ".xml"), "a.xml");
        assert_eq!(unique_filename(&view(&["b.xml"]), "abc", ""), "abc");
    }

    #[test]
    fn test_collision_appends_counter() {
        let mut dir = view(&["a.xml"]);
        let first = unique_filename(&dir, "a.xml", ".xml");
        assert_eq!(first, "a_1.xml");

        dir.insert(first);
        assert_eq!(unique_filename(&dir, "a.xml", ".xml"), "a_2.xml");
    }

    #[test]
    fn test_contiguous_suffixes_end_at_next_free() {
        let dir = view(&["a.xml", "a_1.xml", "a_2.xml", "a_3.xml"]);
        assert_eq!(unique_filename(&dir, "a.xml", ".xml"), "a_4.xml");
    }

    #[test]
    fn test_gap_in_suffixes_is_reused() {
        let dir = view(&["a.xml", "a_2.xml"]);
        assert_eq!(unique_filename(&dir, "a.xml", ".xml"), "a_1.xml");
    }

    #[test]
    fn test_empty_extension() {
        let dir = view(&["README"]);
        assert_eq!(unique_filename(&dir, "README", ""), "README_1");
    }

    #[test]
    fn test_local_directory_view() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("file.xml"), b"x").unwrap();

        let local = LocalDirectory(dir.path());
        assert!(local.contains("file.xml"));
        assert!(!local.contains("other.xml"));
        assert_eq!(
            SuffixFilename.allocate(&local, "file.xml", ".xml"),
            "file_1.xml"
        );
    }

    #[test]
    fn test_closure_policy() {
        let policy = |_: &dyn DirectoryView, name: &str, _: &str| format!("x-{}", name);
        assert_eq!(policy.allocate(&view(&[]), "a.png", ".png"), "x-a.png");
    }
}
