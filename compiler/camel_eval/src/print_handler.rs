//! Print handler for redirectable output.
//!
//! Program output (`print`, `say`, `printf`, writes to `STDOUT`) and error
//! output (`warn`, `die`, writes to `STDERR`) both go through one handler,
//! so tests can capture either stream without touching real stdio.
//!
//! Uses enum dispatch instead of trait objects; the set of sinks is closed.

use std::io::Write;

use parking_lot::Mutex;

/// Default print handler that writes to the process's stdout and stderr.
#[derive(Default)]
pub struct StdoutPrintHandler;

impl StdoutPrintHandler {
    pub fn print(&self, msg: &str) {
        print!("{msg}");
    }

    pub fn eprint(&self, msg: &str) {
        // Keep ordering sane when both streams go to a terminal.
        let _ = std::io::stdout().flush();
        eprint!("{msg}");
    }

    pub fn flush(&self) {
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();
    }
}

/// Print handler that captures both streams to buffers.
#[derive(Default)]
pub struct BufferPrintHandler {
    out: Mutex<String>,
    err: Mutex<String>,
}

impl BufferPrintHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print(&self, msg: &str) {
        self.out.lock().push_str(msg);
    }

    pub fn eprint(&self, msg: &str) {
        self.err.lock().push_str(msg);
    }

    pub fn get_output(&self) -> String {
        self.out.lock().clone()
    }

    pub fn get_error_output(&self) -> String {
        self.err.lock().clone()
    }

    pub fn clear(&self) {
        self.out.lock().clear();
        self.err.lock().clear();
    }
}

/// Print handler implementation using enum dispatch.
pub enum PrintHandlerImpl {
    /// Writes to the real stdout/stderr (default).
    Stdout(StdoutPrintHandler),
    /// Captures to buffers (testing, embedding).
    Buffer(BufferPrintHandler),
    /// Discards all output.
    Silent,
}

impl PrintHandlerImpl {
    /// Write to the output stream.
    pub fn print(&self, msg: &str) {
        match self {
            Self::Stdout(h) => h.print(msg),
            Self::Buffer(h) => h.print(msg),
            Self::Silent => {}
        }
    }

    /// Write a line (with newline) to the output stream.
    pub fn println(&self, msg: &str) {
        self.print(&format!("{msg}\n"));
    }

    /// Write to the error stream.
    pub fn eprint(&self, msg: &str) {
        match self {
            Self::Stdout(h) => h.eprint(msg),
            Self::Buffer(h) => h.eprint(msg),
            Self::Silent => {}
        }
    }

    /// Flush pending output. Called before the process terminates.
    pub fn flush(&self) {
        if let Self::Stdout(h) = self {
            h.flush();
        }
    }

    /// Captured output; empty for handlers that don't capture.
    pub fn get_output(&self) -> String {
        match self {
            Self::Buffer(h) => h.get_output(),
            Self::Stdout(_) | Self::Silent => String::new(),
        }
    }

    /// Captured error output; empty for handlers that don't capture.
    pub fn get_error_output(&self) -> String {
        match self {
            Self::Buffer(h) => h.get_error_output(),
            Self::Stdout(_) | Self::Silent => String::new(),
        }
    }

    pub fn clear(&self) {
        if let Self::Buffer(h) = self {
            h.clear();
        }
    }
}

/// Shared print handler that can be passed around.
pub type SharedPrintHandler = std::sync::Arc<PrintHandlerImpl>;

/// Create a default stdout print handler.
pub fn stdout_handler() -> SharedPrintHandler {
    std::sync::Arc::new(PrintHandlerImpl::Stdout(StdoutPrintHandler))
}

/// Create a buffer print handler for capturing output.
pub fn buffer_handler() -> SharedPrintHandler {
    std::sync::Arc::new(PrintHandlerImpl::Buffer(BufferPrintHandler::new()))
}

/// Create a silent print handler that discards all output.
pub fn silent_handler() -> SharedPrintHandler {
    std::sync::Arc::new(PrintHandlerImpl::Silent)
}
