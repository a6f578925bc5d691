use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

/// Failure while establishing or appending to a report's durable sink.
///
/// Never retried and never downgraded to a log line: a reporter that cannot
/// persist has lost its purpose, so every variant names the failing path and
/// propagates to the caller.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create report directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open report sink {path}: {source}")]
    OpenSink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to append to report sink {path}: {source}")]
    Append {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Destination for formatted report blocks.
///
/// The reporter formats each record once and hands it to every registered
/// writer, so console and file always carry identical content and a test can
/// substitute an in-memory writer.
pub trait RecordWriter: Send {
    /// Append one formatted block, followed by a newline.
    fn append(&mut self, block: &str) -> Result<(), StorageError>;
}

/// Mirrors report content to standard output in real time. Infallible.
pub struct ConsoleWriter;

impl RecordWriter for ConsoleWriter {
    fn append(&mut self, block: &str) -> Result<(), StorageError> {
        println!("{}", block);
        Ok(())
    }
}

/// Appends report content to a file opened once at construction.
#[derive(Debug)]
pub struct FileWriter {
    path: PathBuf,
    file: File,
}

impl FileWriter {
    /// Open `path` for appending, creating missing parent directories.
    /// A pre-existing directory or file is not an error.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(|source| StorageError::CreateDir {
                    path: dir.to_path_buf(),
                    source,
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| StorageError::OpenSink {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordWriter for FileWriter {
    fn append(&mut self, block: &str) -> Result<(), StorageError> {
        let result = self
            .file
            .write_all(block.as_bytes())
            .and_then(|_| self.file.write_all(b"\n"))
            .and_then(|_| self.file.flush());

        result.map_err(|source| StorageError::Append {
            path: self.path.clone(),
            source,
        })
    }
}

/// Captures appended blocks in memory behind a shared handle, so the caller
/// can keep a clone for inspection after handing the writer to a reporter.
#[derive(Clone, Default)]
pub struct MemoryWriter {
    blocks: Arc<Mutex<Vec<String>>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything appended so far, joined exactly as a file sink would
    /// store it (each block followed by a newline).
    pub fn contents(&self) -> String {
        let blocks = self.blocks.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out = String::new();
        for block in blocks.iter() {
            out.push_str(block);
            out.push('\n');
        }
        out
    }

    pub fn block_count(&self) -> usize {
        self.blocks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl RecordWriter for MemoryWriter {
    fn append(&mut self, block: &str) -> Result<(), StorageError> {
        self.blocks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(block.to_string());
        Ok(())
    }
}
