//! `open`, `close`, `eof`, `<FH>` and the print family.
//!
//! `STDOUT` and `STDERR` go to the print handler; every other handle name
//! is looked up in the [`FileTable`](crate::file_handles::FileTable).
//! Failures surface to the program as false/undef with the reason in `$!`.

use camel_ir::{Expr, FileRef, PrintKind};
use camel_value::{Container, EvalError, EvalResult, RefTarget, Value};

use super::format::sprintf;
use super::Interpreter;
use crate::file_handles::{FileError, FileMode};

const LEXICAL_HANDLE_PREFIX: &str = "GLOB(";

/// The generated name behind a lexical handle, if `value` is one.
fn lexical_handle(value: &Value) -> Option<String> {
    let Value::Ref(RefTarget::Scalar(cell)) = value else {
        return None;
    };
    let name = cell.borrow().as_string();
    name.starts_with(LEXICAL_HANDLE_PREFIX).then_some(name)
}

/// Handle name a value stands for: a lexical handle's generated name, or
/// the value itself as a bareword name.
fn handle_of(value: &Value) -> String {
    lexical_handle(value).unwrap_or_else(|| value.as_string())
}

impl Interpreter {
    fn handle_name(&mut self, handle: &FileRef) -> Result<String, EvalError> {
        match handle {
            FileRef::Named(name) => Ok(name.clone()),
            FileRef::Expr(expr) => Ok(handle_of(&self.eval_scalar(expr)?)),
        }
    }

    fn record_os_error(&mut self, error: &FileError) {
        tracing::debug!(%error, "file operation failed");
        self.os_error = error.os_message();
    }

    fn read_one(&mut self, name: &str) -> Option<String> {
        match self.files.read_line(name) {
            Ok(line) => line,
            Err(error) => {
                self.record_os_error(&error);
                None
            }
        }
    }

    /// `<FH>` in scalar context: the next line, or undef at end of input.
    pub(crate) fn eval_read_line(&mut self, handle: &FileRef) -> EvalResult {
        let name = self.handle_name(handle)?;
        Ok(self.read_one(&name).map_or(Value::Undef, Value::string))
    }

    /// `<FH>` in list context: every remaining line.
    pub(crate) fn eval_read_all(&mut self, handle: &FileRef) -> Result<Vec<Value>, EvalError> {
        let name = self.handle_name(handle)?;
        let mut lines = Vec::new();
        while let Some(line) = self.read_one(&name) {
            lines.push(Value::string(line));
        }
        Ok(lines)
    }

    /// Send `text` to a handle. Returns the program-visible result.
    fn write_to(&mut self, handle: &str, text: &str) -> Value {
        match handle {
            "STDOUT" => self.print_handler.print(text),
            "STDERR" => self.print_handler.eprint(text),
            name => {
                if let Err(error) = self.files.write(name, text) {
                    self.record_os_error(&error);
                    return Value::boolean(false);
                }
            }
        }
        Value::Int(1)
    }

    /// `print`, `say` and `printf`, with an optional handle.
    pub(crate) fn eval_print(
        &mut self,
        kind: PrintKind,
        handle: Option<&FileRef>,
        args: &[Expr],
    ) -> EvalResult {
        let handle = match handle {
            Some(handle) => self.handle_name(handle)?,
            None => "STDOUT".to_string(),
        };
        let values = if args.is_empty() {
            vec![self.topic_cell().borrow().clone()]
        } else {
            self.eval_items(args)?
        };

        let text = match kind {
            PrintKind::Printf => match values.split_first() {
                Some((format, rest)) => sprintf(&format.as_string(), rest),
                None => String::new(),
            },
            PrintKind::Print | PrintKind::Say => {
                let separator = self.env.global_scalar("main::,").borrow().as_string();
                let mut text = values
                    .iter()
                    .map(Value::as_string)
                    .collect::<Vec<_>>()
                    .join(&separator);
                if kind == PrintKind::Say {
                    text.push('\n');
                }
                text
            }
        };
        Ok(self.write_to(&handle, &text))
    }

    /// `open(FH, MODE, PATH)` or `open(FH, SPEC)`.
    pub(crate) fn builtin_open(&mut self, args: &[Expr]) -> EvalResult {
        let Some(target) = args.first() else {
            return Err(EvalError::new("Not enough arguments for open"));
        };
        let (mode, path) = match args {
            [_, mode, path, ..] => {
                let mode_text = self.eval_scalar(mode)?.as_string();
                let path = self.eval_scalar(path)?.as_string();
                match FileMode::parse(&mode_text) {
                    Some(mode) => (mode, path),
                    None => {
                        self.record_os_error(&FileError::BadMode(mode_text));
                        return Ok(Value::boolean(false));
                    }
                }
            }
            [_, spec] => {
                let spec = self.eval_scalar(spec)?.as_string();
                let (mode, path) = FileMode::split_spec(&spec);
                (mode, path.to_string())
            }
            _ => return Err(EvalError::new("Not enough arguments for open")),
        };

        let name = self.bind_handle(target)?;
        match self.files.open(&name, mode, &path) {
            Ok(()) => Ok(Value::Int(1)),
            Err(error) => {
                self.record_os_error(&error);
                Ok(Value::boolean(false))
            }
        }
    }

    /// Handle name for the first argument of `open`. A variable that does
    /// not already hold a lexical handle gets a reference to a fresh cell
    /// carrying a generated name; the handle lives as long as that cell.
    fn bind_handle(&mut self, target: &Expr) -> Result<String, EvalError> {
        match target {
            Expr::FileHandle(name) => Ok(name.clone()),
            Expr::Literal(_) | Expr::Interpolate(_) => Ok(self.eval_scalar(target)?.as_string()),
            _ => {
                let place = self.resolve_place(target)?;
                let current = place.fetch();
                if let (Some(name), Value::Ref(RefTarget::Scalar(cell))) =
                    (lexical_handle(&current), &current)
                {
                    self.files.set_owner(&name, cell.downgrade());
                    return Ok(name);
                }
                let name = self.files.anonymous_name();
                let cell = Container::new(Value::string(name.as_str()));
                self.files.set_owner(&name, cell.downgrade());
                place.store(Value::Ref(RefTarget::Scalar(cell)))?;
                Ok(name)
            }
        }
    }

    pub(crate) fn builtin_close(&mut self, args: &[Expr]) -> EvalResult {
        let name = match args.first() {
            Some(expr) => self.file_operand(expr)?,
            None => return Ok(Value::boolean(false)),
        };
        if name == "STDOUT" || name == "STDERR" {
            self.print_handler.flush();
            return Ok(Value::Int(1));
        }
        match self.files.close(&name) {
            Ok(()) => Ok(Value::Int(1)),
            Err(error) => {
                self.record_os_error(&error);
                Ok(Value::boolean(false))
            }
        }
    }

    /// `eof(FH)`; with no argument, `STDIN`.
    pub(crate) fn builtin_eof(&mut self, args: &[Expr]) -> EvalResult {
        let name = match args.first() {
            Some(expr) => self.file_operand(expr)?,
            None => "STDIN".to_string(),
        };
        Ok(Value::boolean(self.files.eof(&name)))
    }

    /// `readline(FH)` as a function.
    pub(crate) fn builtin_readline(&mut self, args: &[Expr], list: bool) -> Result<Vec<Value>, EvalError> {
        let name = match args.first() {
            Some(expr) => self.file_operand(expr)?,
            None => "STDIN".to_string(),
        };
        let handle = FileRef::Named(name);
        if list {
            self.eval_read_all(&handle)
        } else {
            Ok(vec![self.eval_read_line(&handle)?])
        }
    }

    fn file_operand(&mut self, expr: &Expr) -> Result<String, EvalError> {
        match expr {
            Expr::FileHandle(name) => Ok(name.clone()),
            other => Ok(handle_of(&self.eval_scalar(other)?)),
        }
    }
}
