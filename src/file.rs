//! File abstraction shared by inputs and outputs.
//!
//! A [`SourceFile`] is a path on disk or standard I/O, plus an
//! optional byte buffer that holds loaded content or a produced artifact.

use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use url::Url;

use crate::types::ConvertType;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    StandardIo,
}

/// Where converted artifacts are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputTarget {
    /// Next to the input, with the extension replaced.
    #[default]
    Auto,
    Stdout,
    /// A named file, or a directory when an input directory is set.
    Path(PathBuf),
}

impl OutputTarget {
    pub fn parse(value: &str) -> Self {
        if value == "-" {
            OutputTarget::Stdout
        } else {
            OutputTarget::Path(PathBuf::from(value))
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    kind: FileKind,
    pub buffer: Option<Vec<u8>>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: FileKind::File,
            buffer: None,
        }
    }

    pub fn stdin() -> Self {
        Self {
            path: PathBuf::from("-"),
            kind: FileKind::StandardIo,
            buffer: None,
        }
    }

    pub fn stdout() -> Self {
        Self::stdin()
    }

    /// A virtual file with preloaded content; `load` will not touch the disk.
    pub fn with_content(path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            kind: FileKind::File,
            buffer: Some(content.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn absolute_path(&self) -> PathBuf {
        std::path::absolute(&self.path).unwrap_or_else(|_| self.path.clone())
    }

    /// `file://` URL of the absolute path.
    pub fn absolute_file_scheme(&self) -> String {
        let absolute = self.absolute_path();
        Url::from_file_path(&absolute)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| format!("file://{}", absolute.display()))
    }

    /// Path relative to the current directory, for display.
    pub fn relative_path(&self) -> PathBuf {
        match self.kind {
            FileKind::StandardIo => PathBuf::from("<stdio>"),
            FileKind::File => std::env::current_dir()
                .ok()
                .and_then(|cwd| {
                    self.absolute_path()
                        .strip_prefix(&cwd)
                        .ok()
                        .map(Path::to_path_buf)
                })
                .unwrap_or_else(|| self.path.clone()),
        }
    }

    /// Loads content into the buffer unless it is already present.
    pub async fn load(&mut self) -> Result<&[u8]> {
        if self.buffer.is_none() {
            let content = match self.kind {
                FileKind::File => tokio::fs::read(&self.path).await?,
                FileKind::StandardIo => {
                    let mut content = Vec::new();
                    tokio::io::stdin().read_to_end(&mut content).await?;
                    content
                }
            };
            self.buffer = Some(content);
        }
        Ok(self.buffer.as_deref().unwrap_or_default())
    }

    /// Derives the output file for `convert_type`.
    pub fn convert(
        &self,
        output: &OutputTarget,
        input_dir: Option<&Path>,
        convert_type: ConvertType,
    ) -> SourceFile {
        let extension = convert_type.extension();
        match output {
            OutputTarget::Stdout => SourceFile::stdout(),
            OutputTarget::Path(out) => match (input_dir, self.kind) {
                (Some(dir), FileKind::File) => {
                    let relative = self.path_within(dir);
                    SourceFile::new(out.join(relative).with_extension(extension))
                }
                _ => SourceFile::new(out.clone()),
            },
            OutputTarget::Auto => match self.kind {
                FileKind::File => SourceFile::new(self.path.with_extension(extension)),
                FileKind::StandardIo => SourceFile::stdout(),
            },
        }
    }

    fn path_within(&self, dir: &Path) -> PathBuf {
        let absolute_dir = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
        self.absolute_path()
            .strip_prefix(&absolute_dir)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| {
                self.path
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| self.path.clone())
            })
    }

    /// Writes the buffer to its destination.
    pub async fn save(&self) -> Result<()> {
        let content = self.buffer.as_deref().unwrap_or_default();
        match self.kind {
            FileKind::File => {
                if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&self.path, content).await?;
            }
            FileKind::StandardIo => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(content).await?;
                stdout.flush().await?;
            }
        }
        Ok(())
    }

    /// Writes the buffer to a new temporary file with the given extension.
    pub async fn save_tmp_file(&self, extension: &str) -> Result<TmpFile> {
        let path = tempfile::Builder::new()
            .prefix(".slidepress-")
            .suffix(&format!(".{}", extension.trim_start_matches('.')))
            .tempfile()?
            .into_temp_path();
        tokio::fs::write(&path, self.buffer.as_deref().unwrap_or_default()).await?;
        Ok(TmpFile { path })
    }
}

/// A temporary file removed by [`TmpFile::cleanup`] or on drop.
#[derive(Debug)]
pub struct TmpFile {
    path: TempPath,
}

impl TmpFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_uri(&self) -> String {
        Url::from_file_path(&*self.path)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| format!("file://{}", self.path.display()))
    }

    pub fn cleanup(self) -> Result<()> {
        self.path.close()?;
        Ok(())
    }
}
