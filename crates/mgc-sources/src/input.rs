//! Depth-first walk of the input tree.

use std::fs::{File, Permissions};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use mgc_core::{Error, Result};
use walkdir::WalkDir;

/// A regular file found under the input root.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub path: PathBuf,
    /// Path below the root, `/`-separated.
    pub relative: String,
    pub permissions: Permissions,
}

#[derive(Debug, Clone)]
pub enum Entry {
    File(InputFile),
    /// Never followed; only its relative path is kept.
    Symlink(String),
}

impl InputFile {
    pub fn open(&self) -> Result<LineReader> {
        let file = File::open(&self.path).map_err(|e| Error::file(&self.path, e))?;
        Ok(LineReader {
            reader: BufReader::new(file),
            path: self.path.clone(),
            lossy: false,
        })
    }

    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }
}

/// Yields the lines of a file without their `\n`. A `\r` before it is kept.
/// Bytes that are not UTF-8 are replaced rather than failing the file.
pub struct LineReader {
    reader: BufReader<File>,
    path: PathBuf,
    lossy: bool,
}

impl LineReader {
    /// Whether any line so far needed lossy decoding.
    pub fn was_lossy(&self) -> bool {
        self.lossy
    }
}

impl Iterator for LineReader {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf) {
            Ok(0) => None,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                let line = match String::from_utf8(buf) {
                    Ok(line) => line,
                    Err(e) => {
                        if !self.lossy {
                            tracing::warn!(
                                path = %self.path.display(),
                                "file is not valid UTF-8, invalid bytes will be replaced"
                            );
                            self.lossy = true;
                        }
                        String::from_utf8_lossy(e.as_bytes()).into_owned()
                    }
                };
                Some(Ok(line))
            }
            Err(e) => Some(Err(Error::file(&self.path, e))),
        }
    }
}

/// Walk `root` depth-first in file name order, calling `visit` for every
/// regular file and symlink. Directories are recursed into, never visited.
/// Stops early when `visit` returns `Ok(false)`.
pub fn walk<F>(root: &Path, mut visit: F) -> Result<()>
where
    F: FnMut(Entry) -> Result<bool>,
{
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .min_depth(1);

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            Error::file(path, e.into())
        })?;
        let relative = relative_path(root, entry.path());
        let file_type = entry.file_type();

        let item = if file_type.is_symlink() {
            Entry::Symlink(relative)
        } else if file_type.is_file() {
            let metadata = entry
                .metadata()
                .map_err(|e| Error::file(entry.path(), e.into()))?;
            Entry::File(InputFile {
                path: entry.path().to_path_buf(),
                relative,
                permissions: metadata.permissions(),
            })
        } else {
            if !file_type.is_dir() {
                tracing::debug!(path = %entry.path().display(), "skipping special file");
            }
            continue;
        };

        if !visit(item)? {
            break;
        }
    }
    Ok(())
}

fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
