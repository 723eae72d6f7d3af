//! Destination naming for received files.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};

use crate::constants::{FALLBACK_FILENAME, MAX_FILENAME_LEN, MAX_RENAME_ATTEMPTS};
use crate::error::{Error, Result};
use crate::transfer::CollisionPolicy;

/// Reduce a peer-supplied filename to a single safe path component.
///
/// Keeps only the last component (either separator), drops control
/// characters and leading dots, and falls back to [`FALLBACK_FILENAME`]
/// when nothing is left.
pub fn sanitize_filename(offered: &str) -> String {
    let last = offered.rsplit(&['/', '\\'][..]).next().unwrap_or_default();
    let printable: String = last.chars().filter(|c| !c.is_control()).collect();
    let trimmed = printable.trim().trim_start_matches('.').trim_start();

    let mut name = if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed.to_string()
    };
    truncate_on_char_boundary(&mut name, MAX_FILENAME_LEN);
    name
}

fn truncate_on_char_boundary(name: &mut String, max: usize) {
    if name.len() <= max {
        return;
    }
    let mut cut = max;
    while !name.is_char_boundary(cut) {
        cut -= 1;
    }
    name.truncate(cut);
}

/// `report.pdf` -> `report (n).pdf`.
fn numbered(name: &str, n: u32) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem} ({n}).{ext}"),
        _ => format!("{name} ({n})"),
    }
}

/// Open the destination for `name` inside `dir`.
///
/// With [`CollisionPolicy::Rename`] the file is created exclusively, so an
/// existing file is never touched. Returns the path actually opened.
pub async fn open_destination(
    dir: &Path,
    name: &str,
    policy: CollisionPolicy,
) -> Result<(PathBuf, File)> {
    match policy {
        CollisionPolicy::Overwrite => {
            let path = dir.join(name);
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)
                .await?;
            Ok((path, file))
        }
        CollisionPolicy::Rename => {
            for attempt in 0..=MAX_RENAME_ATTEMPTS {
                let candidate = if attempt == 0 {
                    name.to_string()
                } else {
                    numbered(name, attempt)
                };
                let path = dir.join(candidate);
                match OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&path)
                    .await
                {
                    Ok(file) => return Ok((path, file)),
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                    Err(e) => return Err(e.into()),
                }
            }
            Err(Error::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("no free name for {name} in {}", dir.display()),
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\bob\\notes.txt"), "notes.txt");
        assert_eq!(sanitize_filename("dir/sub\\mixed.bin"), "mixed.bin");
    }

    #[test]
    fn sanitize_falls_back_when_empty() {
        assert_eq!(sanitize_filename(""), FALLBACK_FILENAME);
        assert_eq!(sanitize_filename(".."), FALLBACK_FILENAME);
        assert_eq!(sanitize_filename("uploads/"), FALLBACK_FILENAME);
        assert_eq!(sanitize_filename("\u{0}\u{7}"), FALLBACK_FILENAME);
    }

    #[test]
    fn sanitize_drops_control_and_leading_dots() {
        assert_eq!(sanitize_filename(".bashrc"), "bashrc");
        assert_eq!(sanitize_filename("evil\nname\t.txt"), "evilname.txt");
        assert_eq!(sanitize_filename("  spaced.md  "), "spaced.md");
    }

    #[test]
    fn sanitize_truncates_long_names() {
        let long = "é".repeat(300);
        let name = sanitize_filename(&long);
        assert!(name.len() <= MAX_FILENAME_LEN);
        assert!(name.chars().all(|c| c == 'é'));
    }

    #[test]
    fn numbered_names() {
        assert_eq!(numbered("report.pdf", 1), "report (1).pdf");
        assert_eq!(numbered("archive.tar.gz", 2), "archive.tar (2).gz");
        assert_eq!(numbered("README", 3), "README (3)");
    }

    #[tokio::test]
    async fn rename_picks_first_free_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"old").unwrap();
        std::fs::write(dir.path().join("a (1).txt"), b"old").unwrap();

        let (path, _file) = open_destination(dir.path(), "a.txt", CollisionPolicy::Rename)
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("a (2).txt"));
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"old");
    }

    #[tokio::test]
    async fn overwrite_truncates_existing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), b"previous contents").unwrap();

        let (path, file) = open_destination(dir.path(), "b.txt", CollisionPolicy::Overwrite)
            .await
            .unwrap();
        drop(file);
        assert_eq!(path, dir.path().join("b.txt"));
        assert!(std::fs::read(&path).unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = open_destination(&missing, "c.txt", CollisionPolicy::Rename)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
