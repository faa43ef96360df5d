//! Per-channel capture file for raw worker output

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};

/// Open capture file; truncated when created, flushed on every line
pub struct LogSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl LogSink {
    /// Create (or truncate) the file at `path`, creating parent directories
    pub async fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let file = File::create(path).await?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    /// Flush and release the file
    pub async fn close(mut self) -> io::Result<()> {
        self.writer.flush().await?;
        self.writer.into_inner().sync_all().await
    }
}
