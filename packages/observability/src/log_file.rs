//! JSONL log file behind `--log-file`.
//!
//! Each event is buffered in a [`LogLine`] and appended to the file in one
//! write when the line is dropped, so lines from concurrent events never
//! interleave.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

/// Append-only log file shared by every event of the process.
#[derive(Clone)]
pub struct LogFile {
    file: Arc<Mutex<File>>,
}

impl LogFile {
    /// Open `path` for appending, creating the file and its parent
    /// directories when missing.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogLine<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogLine {
            file: &self.file,
            buf: Vec::with_capacity(256),
        }
    }
}

/// Output of a single event, appended to the file on drop.
pub struct LogLine<'a> {
    file: &'a Mutex<File>,
    buf: Vec<u8>,
}

impl Write for LogLine<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LogLine<'_> {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        // Nowhere to report a failed log write.
        let _ = self.file.lock().write_all(&self.buf);
    }
}
