//! Filesystem driver: the only module permitted to touch the OS directly
//! for reads/writes outside of git and hook subprocesses. Concentrating
//! this here keeps the rest of the engine testable against a single seam.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Read a file's full contents. Distinguishes "does not exist" from other
/// I/O errors by returning `Ok(None)` for `NotFound`.
pub fn read(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write `bytes` to `path` atomically: write to a sibling temp file, flush
/// and sync it, then rename over the destination. A crash mid-write never
/// leaves a partially-written `path` behind.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    mkdir_all(dir)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = dir.join(format!(".{file_name}.wt-tmp-{}", std::process::id()));

    let mut tmp = fs::File::create(&tmp_path)?;
    tmp.write_all(bytes)?;
    tmp.sync_all()?;
    drop(tmp);

    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Create `path` and all missing parent directories.
pub fn mkdir_all(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// `true` if `path` exists on disk (file or directory).
pub fn exists(path: &Path) -> bool {
    path.exists()
}

/// List the immediate children of a directory. Returns an empty vec (not an
/// error) if the directory does not exist, since callers routinely probe an
/// as-yet-uncreated base directory.
pub fn readdir(path: &Path) -> io::Result<Vec<PathBuf>> {
    match fs::read_dir(path) {
        Ok(entries) => entries.map(|e| e.map(|e| e.path())).collect(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Copy a file from `src` to `dst`, creating `dst`'s parent directories.
/// Returns `Ok(false)` (rather than an error) if `src` has disappeared by
/// the time we get to it, so callers can implement the "skip silently on
/// TOCTOU" rule without special-casing `NotFound` themselves.
pub fn copy_if_present(src: &Path, dst: &Path) -> io::Result<bool> {
    if !src.exists() {
        return Ok(false);
    }
    if let Some(parent) = dst.parent() {
        mkdir_all(parent)?;
    }
    match fs::copy(src, dst) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remove a directory and everything under it. Tolerates it already being gone.
pub fn remove_dir_all(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Check whether the executable bit is set for the current user/group/other.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.exists()
}

/// Append `line` to `path` if it is not already present verbatim on its own
/// line. Used for the idempotent `.git/info/exclude` append (invariant 5,
/// idempotence property). Creates the file if missing.
pub fn append_line_if_missing(path: &Path, line: &str) -> io::Result<()> {
    let existing = read(path)?.unwrap_or_default();
    let existing = String::from_utf8_lossy(&existing);
    if existing.lines().any(|l| l == line) {
        return Ok(());
    }
    let mut updated = existing.into_owned();
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(line);
    updated.push('\n');
    write_atomic(path, updated.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_atomic_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("file.json");
        write_atomic(&path, b"hello").unwrap();
        assert_eq!(read(&path).unwrap().unwrap(), b"hello");
    }

    #[test]
    fn read_missing_is_none_not_err() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert!(read(&path).unwrap().is_none());
    }

    #[test]
    fn append_line_if_missing_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("exclude");
        append_line_if_missing(&path, ".wt/worktree.json").unwrap();
        append_line_if_missing(&path, ".wt/worktree.json").unwrap();
        let contents = String::from_utf8(read(&path).unwrap().unwrap()).unwrap();
        assert_eq!(contents.matches(".wt/worktree.json").count(), 1);
    }

    #[test]
    fn copy_if_present_skips_missing_source() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("gone");
        let dst = dir.path().join("dst");
        assert!(!copy_if_present(&src, &dst).unwrap());
        assert!(!dst.exists());
    }
}
