use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::warn;

/// Where ephemeral renderer inputs are allocated. Every file is uniquely
/// named and written in UTF-8; the default location is the system temp
/// directory.
#[derive(Debug, Clone, Default)]
pub struct ScratchSpace {
    dir: Option<PathBuf>,
}

impl ScratchSpace {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// Materialize the diagram source as a `.mmd` file.
    pub(crate) fn acquire_source(&self, text: &str) -> io::Result<ScratchFile> {
        self.acquire(".mmd", text)
    }

    /// Materialize a stylesheet override as a `.css` file.
    pub(crate) fn acquire_style(&self, css: &str) -> io::Result<ScratchFile> {
        self.acquire(".css", css)
    }

    fn acquire(&self, suffix: &str, contents: &str) -> io::Result<ScratchFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("tratto-").suffix(suffix);

        let mut file = match self.dir.as_ref() {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(contents.as_bytes())?;
        file.flush()?;

        Ok(ScratchFile { file })
    }
}

/// One ephemeral renderer input. Dropping the handle removes the file on any
/// exit path; the explicit [`release`](Self::release) form logs a deletion
/// failure instead of discarding it silently. Cleanup never fails the
/// surrounding request.
#[derive(Debug)]
pub(crate) struct ScratchFile {
    file: NamedTempFile,
}

impl ScratchFile {
    pub(crate) fn path(&self) -> &Path {
        self.file.path()
    }

    pub(crate) fn release(self) {
        let path = self.file.path().to_path_buf();
        if let Err(err) = self.file.close() {
            warn!(
                target = "tratto::render",
                op = "artifact::release",
                path = %path.display(),
                error = %err,
                "Failed to remove scratch file; leaving it behind"
            );
        }
    }
}
