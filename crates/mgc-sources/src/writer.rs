//! Output tree writer.
//!
//! Files are created exclusively. When an obfuscated name collides with one
//! already written, a numbered suffix is added (`pods-1.log`, `pods-2.log`).

use std::fs::{self, File, OpenOptions, Permissions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use mgc_core::{Error, Result};

const MAX_SUFFIX: u32 = 10_000;

/// Somewhere to put cleaned files. Implementations must be safe to call from
/// several workers as long as they write different paths.
pub trait OutputSink: Send + Sync {
    fn create(&self, relative: &str, permissions: &Permissions) -> Result<Box<dyn LineSink>>;
}

/// One output file, written line by line.
pub trait LineSink: Send {
    fn write_line(&mut self, line: &str) -> Result<()>;

    /// Flush and finish the file. Returns where it was written.
    fn close(self: Box<Self>) -> Result<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct FsWriter {
    root: PathBuf,
}

impl FsWriter {
    /// Use `root` as the output directory. It must be missing or empty
    /// unless `overwrite` is set, in which case it is cleared first.
    pub fn prepare(root: &Path, overwrite: bool) -> Result<Self> {
        if root.exists() {
            let mut entries = fs::read_dir(root).map_err(|e| Error::file(root, e))?;
            if entries.next().is_some() {
                if !overwrite {
                    return Err(Error::Config(format!(
                        "output directory {} is not empty (use --overwrite to replace it)",
                        root.display()
                    )));
                }
                tracing::info!(path = %root.display(), "removing existing output directory");
                fs::remove_dir_all(root).map_err(|e| Error::file(root, e))?;
            }
        }
        fs::create_dir_all(root).map_err(|e| Error::file(root, e))?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn open_exclusive(&self, relative: &str) -> Result<(File, PathBuf)> {
        let target = self.root.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::file(parent, e))?;
        }

        for n in 0..=MAX_SUFFIX {
            let candidate = if n == 0 {
                target.clone()
            } else {
                numbered(&target, n)
            };
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(file) => {
                    if n > 0 {
                        tracing::warn!(
                            path = %relative,
                            written = %candidate.display(),
                            "output name already taken, using a numbered name"
                        );
                    }
                    return Ok((file, candidate));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(Error::file(candidate, e)),
            }
        }
        Err(Error::file(
            target,
            std::io::Error::new(ErrorKind::AlreadyExists, "no free numbered name left"),
        ))
    }
}

/// `dir/name.ext` → `dir/name-N.ext`; names without an extension (or
/// starting with a dot) just get `-N`.
fn numbered(path: &Path, n: u32) -> PathBuf {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let renamed = match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}-{}{}", &name[..dot], n, &name[dot..]),
        _ => format!("{}-{}", name, n),
    };
    path.with_file_name(renamed)
}

impl OutputSink for FsWriter {
    fn create(&self, relative: &str, permissions: &Permissions) -> Result<Box<dyn LineSink>> {
        let (file, path) = self.open_exclusive(relative)?;
        Ok(Box::new(FileSink {
            writer: BufWriter::new(file),
            path,
            permissions: permissions.clone(),
        }))
    }
}

struct FileSink {
    writer: BufWriter<File>,
    path: PathBuf,
    permissions: Permissions,
}

impl LineSink for FileSink {
    fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .map_err(|e| Error::file(&self.path, e))
    }

    fn close(self: Box<Self>) -> Result<PathBuf> {
        let FileSink {
            writer,
            path,
            permissions,
        } = *self;
        let file = writer
            .into_inner()
            .map_err(|e| Error::file(&path, e.into_error()))?;
        file.sync_all().map_err(|e| Error::file(&path, e))?;
        drop(file);
        // Applied last so read-only sources can still be written.
        fs::set_permissions(&path, permissions).map_err(|e| Error::file(&path, e))?;
        Ok(path)
    }
}
