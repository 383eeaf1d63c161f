//! Process-wide file handle table.
//!
//! Handles are keyed by name: barewords (`FH`) use their own name, lexical
//! handles (`open(my $fh, ...)`) get a generated `GLOB(0x..)` name held in
//! a cell the variable refers to. The table tracks that cell weakly and
//! closes the handle once nothing refers to it any more. `STDOUT` and `STDERR` are not in the table; the
//! interpreter routes them to the print handler. `STDIN` reads process
//! stdin unless an in-memory input has been installed under that name.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};

use camel_value::{Value, WeakContainer};
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Open mode, as written in the second argument of `open`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FileMode {
    /// `<`
    Read,
    /// `>`
    Write,
    /// `>>`
    Append,
}

impl FileMode {
    pub fn parse(mode: &str) -> Option<Self> {
        match mode.trim() {
            "<" => Some(FileMode::Read),
            ">" => Some(FileMode::Write),
            ">>" => Some(FileMode::Append),
            _ => None,
        }
    }

    /// Split a two-argument `open` target such as `">>log.txt"` into mode
    /// and path. A bare path opens for reading.
    pub fn split_spec(spec: &str) -> (FileMode, &str) {
        let spec = spec.trim_start();
        if let Some(path) = spec.strip_prefix(">>") {
            (FileMode::Append, path.trim())
        } else if let Some(path) = spec.strip_prefix('>') {
            (FileMode::Write, path.trim())
        } else if let Some(path) = spec.strip_prefix('<') {
            (FileMode::Read, path.trim())
        } else {
            (FileMode::Read, spec.trim())
        }
    }
}

/// File layer failures. The program sees these as a false return value
/// and the text of [`FileError::os_message`] in `$!`.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("unknown open mode '{0}'")]
    BadMode(String),
    #[error("file handle {0} is not open")]
    NotOpen(String),
    #[error("file handle {0} was not opened for reading")]
    NotReadable(String),
    #[error("file handle {0} was not opened for writing")]
    NotWritable(String),
    #[error("I/O error on {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl FileError {
    /// The short OS-style message stored in `$!`, e.g.
    /// `No such file or directory`.
    pub fn os_message(&self) -> String {
        match self {
            FileError::Open { source, .. } | FileError::Io { source, .. } => {
                let text = source.to_string();
                match text.find(" (os error") {
                    Some(pos) => text[..pos].to_string(),
                    None => text,
                }
            }
            FileError::NotOpen(_) => "Bad file descriptor".to_string(),
            other => other.to_string(),
        }
    }
}

enum Handle {
    Reader(BufReader<File>),
    Writer(BufWriter<File>),
    /// Preloaded input lines (tests, embedding).
    Lines(VecDeque<String>),
}

/// Name → open handle.
#[derive(Default)]
pub struct FileTable {
    handles: FxHashMap<String, Handle>,
    /// Lexical handle name → the cell holding that name.
    owners: FxHashMap<String, WeakContainer<Value>>,
    next_anonymous: usize,
}

impl FileTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload `text` as the input behind `name`; `<NAME>` then reads its
    /// lines. Used to feed `STDIN` in tests.
    #[must_use]
    pub fn with_input(mut self, name: &str, text: &str) -> Self {
        let lines = text.split_inclusive('\n').map(str::to_string).collect();
        self.handles.insert(name.to_string(), Handle::Lines(lines));
        self
    }

    /// A fresh name for a lexical handle.
    pub fn anonymous_name(&mut self) -> String {
        self.next_anonymous += 1;
        format!("GLOB(0x{:x})", 0x1000 + self.next_anonymous)
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.handles.contains_key(name)
    }

    /// Tie the lexical handle `name` to `owner`, the cell that holds it.
    pub fn set_owner(&mut self, name: &str, owner: WeakContainer<Value>) {
        self.owners.insert(name.to_string(), owner);
    }

    /// Close lexical handles whose owning cell has been dropped.
    pub fn close_orphans(&mut self) {
        let orphans: Vec<String> = self
            .owners
            .iter()
            .filter(|(_, owner)| !owner.is_alive())
            .map(|(name, _)| name.clone())
            .collect();
        for name in orphans {
            self.owners.remove(&name);
            if let Some(handle) = self.handles.remove(&name) {
                tracing::debug!(handle = %name, "closing unreferenced handle");
                if let Err(error) = close_handle(&name, handle) {
                    tracing::debug!(handle = %name, %error, "flush on close failed");
                }
            }
        }
    }

    /// Number of open handles, preloaded inputs included.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Open `path` under `name`. A handle already bound to `name` is closed
    /// (and flushed) first, as are lexical handles nothing refers to.
    pub fn open(&mut self, name: &str, mode: FileMode, path: &str) -> Result<(), FileError> {
        self.close_orphans();
        if let Some(previous) = self.handles.remove(name) {
            tracing::debug!(handle = name, "closing handle before re-open");
            if let Err(error) = close_handle(name, previous) {
                tracing::debug!(handle = name, %error, "flush on re-open failed");
            }
        }

        let opened = match mode {
            FileMode::Read => File::open(path).map(|f| Handle::Reader(BufReader::new(f))),
            FileMode::Write => File::create(path).map(|f| Handle::Writer(BufWriter::new(f))),
            FileMode::Append => OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map(|f| Handle::Writer(BufWriter::new(f))),
        };
        let handle = opened.map_err(|source| FileError::Open {
            path: path.to_string(),
            source,
        })?;

        tracing::debug!(handle = name, path, ?mode, "opened file");
        self.handles.insert(name.to_string(), handle);
        Ok(())
    }

    pub fn close(&mut self, name: &str) -> Result<(), FileError> {
        let handle = self
            .handles
            .remove(name)
            .ok_or_else(|| FileError::NotOpen(name.to_string()))?;
        self.owners.remove(name);
        tracing::debug!(handle = name, "closed file");
        close_handle(name, handle)
    }

    /// Next line including its terminator; `None` at end of input.
    pub fn read_line(&mut self, name: &str) -> Result<Option<String>, FileError> {
        if name == "STDIN" && !self.handles.contains_key(name) {
            return read_from(name, &mut io::stdin().lock());
        }
        match self.handles.get_mut(name) {
            Some(Handle::Reader(reader)) => read_from(name, reader),
            Some(Handle::Lines(lines)) => Ok(lines.pop_front()),
            Some(Handle::Writer(_)) => Err(FileError::NotReadable(name.to_string())),
            None => Err(FileError::NotOpen(name.to_string())),
        }
    }

    pub fn write(&mut self, name: &str, text: &str) -> Result<(), FileError> {
        match self.handles.get_mut(name) {
            Some(Handle::Writer(writer)) => {
                writer
                    .write_all(text.as_bytes())
                    .map_err(|source| FileError::Io {
                        name: name.to_string(),
                        source,
                    })
            }
            Some(_) => Err(FileError::NotWritable(name.to_string())),
            None => Err(FileError::NotOpen(name.to_string())),
        }
    }

    /// Whether the next read on `name` would return end of input. Handles
    /// that are not open are at end of input.
    pub fn eof(&mut self, name: &str) -> bool {
        match self.handles.get_mut(name) {
            Some(Handle::Reader(reader)) => reader.fill_buf().map_or(true, |buf| buf.is_empty()),
            Some(Handle::Lines(lines)) => lines.is_empty(),
            Some(Handle::Writer(_)) | None => true,
        }
    }

    /// Flush every writer. Called before the process exits.
    pub fn flush_all(&mut self) {
        for (name, handle) in &mut self.handles {
            if let Handle::Writer(writer) = handle {
                if let Err(error) = writer.flush() {
                    tracing::debug!(handle = %name, %error, "flush failed");
                }
            }
        }
    }
}

fn read_from(name: &str, reader: &mut impl BufRead) -> Result<Option<String>, FileError> {
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) => Ok(None),
        Ok(_) => Ok(Some(line)),
        Err(source) => Err(FileError::Io {
            name: name.to_string(),
            source,
        }),
    }
}

fn close_handle(name: &str, handle: Handle) -> Result<(), FileError> {
    match handle {
        Handle::Writer(mut writer) => writer.flush().map_err(|source| FileError::Io {
            name: name.to_string(),
            source,
        }),
        Handle::Reader(_) | Handle::Lines(_) => Ok(()),
    }
}
