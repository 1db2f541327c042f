//! Line-delimited JSON files.
//!
//! [`JsonlFile`] is the shared primitive for the local backends: appends are
//! a single `write_all` on a file opened in append mode, reads skip lines that
//! fail to parse, and in-place updates go through a temp file and a rename so
//! a crash never leaves a half-written store behind.

use super::{InteractionRecord, LogSink, SinkFuture};
use crate::error::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// A JSON-lines file guarded against concurrent writers in this process.
#[derive(Debug)]
pub struct JsonlFile {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one value as a single line, creating the file if needed.
    pub fn append<T: Serialize>(&self, value: &T) -> Result<()> {
        let line = encode_line(value)?;
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.append_line(&line)
    }

    /// Every parseable line with its 1-based line number.
    ///
    /// A missing file yields an empty list.
    pub fn read_numbered<T: DeserializeOwned>(&self) -> Result<Vec<(usize, T)>> {
        let mut out = Vec::new();
        self.scan(|line_no, value| out.push((line_no, value)))?;
        Ok(out)
    }

    /// The last `limit` parseable lines, newest (last in file) first.
    pub fn read_last<T: DeserializeOwned>(&self, limit: usize) -> Result<Vec<T>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut window: VecDeque<T> = VecDeque::with_capacity(limit);
        self.scan(|_, value| {
            if window.len() == limit {
                window.pop_front();
            }
            window.push_back(value);
        })?;
        Ok(window.into_iter().rev().collect())
    }

    /// Replace the first line whose parsed value satisfies `matches`, or
    /// append `value` if none does. Returns `true` when a line was replaced.
    ///
    /// Lines that fail to parse are carried over verbatim.
    pub fn upsert<T, F>(&self, value: &T, matches: F) -> Result<bool>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(usize, &T) -> bool,
    {
        let new_line = encode_line(value)?;
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut lines = self.raw_lines()?;
        let target = lines.iter().enumerate().position(|(idx, line)| {
            serde_json::from_slice::<T>(line).is_ok_and(|parsed| matches(idx + 1, &parsed))
        });

        match target {
            Some(idx) => {
                lines[idx] = new_line.trim_end_matches('\n').as_bytes().to_vec();
                self.rewrite(&lines)?;
                Ok(true)
            }
            None => {
                self.append_line(&new_line)?;
                Ok(false)
            }
        }
    }

    fn append_line(&self, line: &str) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| Error::sink(&format!("failed to create {}", parent.display()), e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::sink(&format!("failed to open {}", self.path.display()), e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| Error::sink(&format!("failed to append to {}", self.path.display()), e))
    }

    /// Physical lines as raw bytes, without their `\n` terminators.
    fn raw_lines(&self) -> Result<Vec<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                let mut lines: Vec<Vec<u8>> =
                    bytes.split(|b| *b == b'\n').map(<[u8]>::to_vec).collect();
                if lines.last().is_some_and(Vec::is_empty) {
                    lines.pop();
                }
                Ok(lines)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(Error::sink(
                &format!("failed to read {}", self.path.display()),
                e,
            )),
        }
    }

    fn rewrite(&self, lines: &[Vec<u8>]) -> Result<()> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "store.jsonl".to_string());
        let tmp_path = self.path.with_file_name(format!(".{file_name}.tmp"));

        let mut body = Vec::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
        for line in lines {
            body.extend_from_slice(line);
            body.push(b'\n');
        }
        fs::write(&tmp_path, body)
            .map_err(|e| Error::sink(&format!("failed to write {}", tmp_path.display()), e))?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| Error::sink(&format!("failed to replace {}", self.path.display()), e))?;
        debug!("Rewrote {} ({} lines)", self.path.display(), lines.len());
        Ok(())
    }

    fn scan<T, F>(&self, mut visit: F) -> Result<()>
    where
        T: DeserializeOwned,
        F: FnMut(usize, T),
    {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(Error::sink(
                    &format!("failed to open {}", self.path.display()),
                    e,
                ));
            }
        };

        for (idx, line) in BufReader::new(file).split(b'\n').enumerate() {
            let line = line
                .map_err(|e| Error::sink(&format!("failed to read {}", self.path.display()), e))?;
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<T>(&line) {
                Ok(value) => visit(idx + 1, value),
                Err(e) => warn!(
                    "Skipping malformed line {} in {}: {e}",
                    idx + 1,
                    self.path.display()
                ),
            }
        }
        Ok(())
    }
}

fn encode_line<T: Serialize>(value: &T) -> Result<String> {
    let mut line = serde_json::to_string(value)
        .map_err(|e| Error::sink("failed to serialize record", e))?;
    line.push('\n');
    Ok(line)
}

// ── Log sink ───────────────────────────────────────────────────────

/// [`LogSink`] backed by a local JSON-lines file.
#[derive(Debug)]
pub struct JsonlLogSink {
    file: JsonlFile,
}

impl JsonlLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonlFile::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl LogSink for JsonlLogSink {
    fn append<'a>(&'a self, record: &'a InteractionRecord) -> SinkFuture<'a, ()> {
        Box::pin(async move { self.file.append(record) })
    }

    fn recent(&self, limit: usize) -> SinkFuture<'_, Vec<InteractionRecord>> {
        Box::pin(async move { self.file.read_last(limit) })
    }
}
