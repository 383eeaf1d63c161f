//! `InterpreterBuilder` for creating Interpreter instances with various configurations.

use std::rc::Rc;


use camel_ir::Want;
use camel_value::Value;

use super::Interpreter;
use crate::environment::Environment;
use crate::file_handles::FileTable;
use crate::packages::PackageRegistry;
use crate::print_handler::{stdout_handler, SharedPrintHandler};
use crate::regex_bridge::RegexCache;

/// Builder for [`Interpreter`].
///
/// ```text
/// let handler = buffer_handler();
/// let mut interp = InterpreterBuilder::new()
///     .print_handler(handler.clone())
///     .script_name("t.pl")
///     .build();
/// ```
pub struct InterpreterBuilder {
    print_handler: Option<SharedPrintHandler>,
    script_name: String,
    max_call_depth: Option<usize>,
    argv: Vec<String>,
    file_table: Option<FileTable>,
    import_env: bool,
}

impl InterpreterBuilder {
    pub fn new() -> Self {
        Self {
            print_handler: None,
            script_name: "-".to_string(),
            max_call_depth: None,
            argv: Vec::new(),
            file_table: None,
            import_env: true,
        }
    }

    /// Where program and error output go. Defaults to the process's
    /// stdout and stderr.
    #[must_use]
    pub fn print_handler(mut self, handler: SharedPrintHandler) -> Self {
        self.print_handler = Some(handler);
        self
    }

    /// `$0`, and the script name in ` at SCRIPT line N.` messages.
    #[must_use]
    pub fn script_name(mut self, name: &str) -> Self {
        self.script_name = name.to_string();
        self
    }

    /// Nested sub calls beyond `depth` are a fatal error. `None` (the
    /// default) relies on stack growth alone.
    #[must_use]
    pub fn max_call_depth(mut self, depth: Option<usize>) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Contents of `@ARGV`.
    #[must_use]
    pub fn argv(mut self, args: Vec<String>) -> Self {
        self.argv = args;
        self
    }

    /// Start from a prepared file table (e.g. with `STDIN` preloaded).
    #[must_use]
    pub fn file_table(mut self, files: FileTable) -> Self {
        self.file_table = Some(files);
        self
    }

    /// Whether `%ENV` is filled from the process environment (default on).
    #[must_use]
    pub fn import_env(mut self, import: bool) -> Self {
        self.import_env = import;
        self
    }

    pub fn build(self) -> Interpreter {
        let env = Environment::new();

        *env.global_scalar("main::0").borrow_mut() = Value::string(self.script_name.as_str());
        env.global_array("main::ARGV")
            .borrow_mut()
            .assign(self.argv.into_iter().map(Value::string).collect());
        if self.import_env {
            let vars = env.global_hash("main::ENV");
            let mut vars = vars.borrow_mut();
            for (key, value) in std::env::vars() {
                vars.store(key, Value::string(value));
            }
        }

        Interpreter {
            env,
            packages: PackageRegistry::new(),
            files: self.file_table.unwrap_or_default(),
            print_handler: self.print_handler.unwrap_or_else(stdout_handler),
            regexes: RegexCache::new(),
            last_match: None,
            package: Rc::from("main"),
            want: Want::Scalar,
            call_depth: 0,
            max_call_depth: self.max_call_depth,
            line: 0,
            os_error: String::new(),
            script_name: self.script_name,
        }
    }
}

impl Default for InterpreterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
