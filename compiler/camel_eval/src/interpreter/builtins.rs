//! Builtin functions.
//!
//! Builtins receive their argument *expressions*: several of them need a
//! container or a place rather than a flattened value list (`push @a`,
//! `delete $h{k}`, `chomp $line`). Functions that default to `$_` do so
//! when called without arguments.

use camel_ir::{Expr, PrintKind, Sigil, Special, Want};
use camel_value::{
    die, exit, not_a_reference, ArrayCell, EvalError, HashCell, Number, RefTarget, Value,
};
use smallvec::smallvec;

use super::format::sprintf;
use super::lvalue::Place;
use super::{last_value, Interpreter, Values};

/// An `@`- or `%`-form operand of `keys`, `values` and `each`.
enum Aggregate {
    Array(ArrayCell),
    Hash(HashCell),
}

fn list(values: Vec<Value>) -> Values {
    Values::from_vec(values)
}

fn chars_of(s: &str) -> Vec<char> {
    s.chars().collect()
}

/// Resolve a possibly negative offset against `len`, clamping at 0.
fn offset_from(offset: i64, len: usize) -> usize {
    let len = len as i64;
    if offset < 0 {
        (len + offset).max(0) as usize
    } else {
        offset as usize
    }
}

/// First char position of `needle` in `hay` at or after `from`, or -1.
fn char_index(hay: &str, needle: &str, from: i64) -> i64 {
    let hay = chars_of(hay);
    let needle = chars_of(needle);
    let start = from.clamp(0, hay.len() as i64) as usize;
    if needle.len() > hay.len() {
        return -1;
    }
    (start..=hay.len() - needle.len())
        .find(|&i| hay[i..i + needle.len()] == needle[..])
        .map_or(-1, |i| i as i64)
}

/// Last char position of `needle` in `hay` at or before `from`, or -1.
fn char_rindex(hay: &str, needle: &str, from: Option<i64>) -> i64 {
    let hay = chars_of(hay);
    let needle = chars_of(needle);
    if needle.len() > hay.len() {
        return -1;
    }
    let last = hay.len() - needle.len();
    let start = match from {
        Some(from) if from < 0 => return if needle.is_empty() { 0 } else { -1 },
        Some(from) => (from as usize).min(last),
        None => last,
    };
    (0..=start)
        .rev()
        .find(|&i| hay[i..i + needle.len()] == needle[..])
        .map_or(-1, |i| i as i64)
}

/// Leading digits of `text` in `radix`, ignoring underscores.
fn parse_radix(text: &str, radix: u32) -> Value {
    let digits: String = text
        .chars()
        .filter(|&c| c != '_')
        .take_while(|c| c.is_digit(radix))
        .collect();
    if digits.is_empty() {
        return Value::Int(0);
    }
    match u64::from_str_radix(&digits, radix) {
        Ok(n) => i64::try_from(n).map_or(Value::Float(n as f64), Value::Int),
        Err(_) => Value::Float(
            digits
                .chars()
                .filter_map(|c| c.to_digit(radix))
                .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d)),
        ),
    }
}

fn hex_value(text: &str) -> Value {
    let text = text.trim();
    let text = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix('x'))
        .unwrap_or(text);
    parse_radix(text, 16)
}

/// `oct`: `0x` is hex, `0b` binary, anything else octal.
fn oct_value(text: &str) -> Value {
    let text = text.trim();
    let lower = text.to_ascii_lowercase();
    if lower.starts_with("0x") || lower.starts_with('x') {
        return hex_value(text);
    }
    if let Some(rest) = lower.strip_prefix("0b").or_else(|| lower.strip_prefix('b')) {
        return parse_radix(rest, 2);
    }
    let rest = lower.strip_prefix("0o").unwrap_or(&lower);
    parse_radix(rest, 8)
}

fn upper_first(s: &str, upper: bool) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if upper => first.to_uppercase().chain(chars).collect(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn chomp_string(s: &mut String) -> i64 {
    if s.ends_with('\n') {
        s.pop();
        1
    } else {
        0
    }
}

impl Interpreter {
    /// Call the builtin `name`, or `None` when there is no such builtin.
    pub(crate) fn call_builtin(
        &mut self,
        name: &str,
        args: &[Expr],
        want: Want,
    ) -> Result<Option<Values>, EvalError> {
        let values = match name {
            // output and files
            "print" => smallvec![self.eval_print(PrintKind::Print, None, args)?],
            "say" => smallvec![self.eval_print(PrintKind::Say, None, args)?],
            "printf" => smallvec![self.eval_print(PrintKind::Printf, None, args)?],
            "sprintf" => {
                let values = self.eval_items(args)?;
                let text = match values.split_first() {
                    Some((format, rest)) => sprintf(&format.as_string(), rest),
                    None => String::new(),
                };
                smallvec![Value::string(text)]
            }
            "open" => smallvec![self.builtin_open(args)?],
            "close" => smallvec![self.builtin_close(args)?],
            "eof" => smallvec![self.builtin_eof(args)?],
            "readline" => {
                let lines = self.builtin_readline(args, want == Want::List)?;
                list(lines)
            }

            // arrays
            "push" | "unshift" => {
                let Some((target, rest)) = args.split_first() else {
                    return Err(EvalError::new(format!("Not enough arguments for {name}")));
                };
                let array = self.array_operand(target)?;
                let items = self.eval_items(rest)?;
                let len = if name == "push" {
                    array.borrow_mut().push(items)
                } else {
                    array.borrow_mut().unshift(items)
                };
                smallvec![Value::Int(len as i64)]
            }
            "pop" | "shift" => {
                let array = match args.first() {
                    Some(target) => self.array_operand(target)?,
                    None => self.default_array(),
                };
                let value = if name == "pop" {
                    array.borrow_mut().pop()
                } else {
                    array.borrow_mut().shift()
                };
                smallvec![value]
            }
            "splice" => self.builtin_splice(args, want)?,
            "reverse" => {
                let items = self.eval_items(args)?;
                if want == Want::List {
                    list(items.into_iter().rev().collect())
                } else {
                    let joined: String = items.iter().map(Value::as_string).collect();
                    smallvec![Value::string(joined.chars().rev().collect::<String>())]
                }
            }
            "join" => {
                let Some((separator, rest)) = args.split_first() else {
                    return Err(EvalError::new("Not enough arguments for join"));
                };
                let separator = self.eval_scalar(separator)?.as_string();
                let items = self.eval_items(rest)?;
                let joined = items
                    .iter()
                    .map(Value::as_string)
                    .collect::<Vec<_>>()
                    .join(&separator);
                smallvec![Value::string(joined)]
            }
            "split" => {
                let fields = self.eval_split(args)?;
                if want == Want::List {
                    list(fields)
                } else {
                    smallvec![Value::Int(fields.len() as i64)]
                }
            }

            // hashes
            "keys" | "values" | "each" => self.builtin_iterate(name, args, want)?,
            "exists" => smallvec![Value::boolean(self.builtin_exists(args)?)],
            "delete" => self.builtin_delete(args)?,

            // scalars and introspection
            "defined" => smallvec![Value::boolean(self.builtin_defined(args)?)],
            "undef" => {
                if let Some(target) = args.first() {
                    match self.resolve_place(target)? {
                        Place::Array(cell) => cell.borrow_mut().clear(),
                        Place::Hash(cell) => cell.borrow_mut().clear(),
                        place => place.store(Value::Undef)?,
                    }
                }
                smallvec![Value::Undef]
            }
            "scalar" => {
                let value = match args.first() {
                    Some(expr) => self.eval_scalar(expr)?,
                    None => Value::Undef,
                };
                smallvec![value]
            }
            "wantarray" => {
                let value = if self.call_depth == 0 {
                    Value::Undef
                } else {
                    Value::Int(i64::from(self.want == Want::List))
                };
                smallvec![value]
            }
            "ref" => {
                let value = self.arg_or_topic(args)?;
                let kind = match value.as_ref_target() {
                    Some(target) => target
                        .blessed()
                        .map_or_else(|| target.kind_name().to_string(), |p| p.to_string()),
                    None => String::new(),
                };
                smallvec![Value::string(kind)]
            }
            "bless" => smallvec![self.builtin_bless(args)?],

            // process control
            "die" => return Err(self.builtin_die(args)?),
            "warn" => {
                let message = self.located_message(args, "Warning: something's wrong")?;
                self.print_handler.eprint(&message);
                smallvec![Value::Int(1)]
            }
            "exit" => {
                let code = match args.first() {
                    Some(expr) => self.eval_scalar(expr)?.as_int(),
                    None => 0,
                };
                tracing::debug!(code, "exit");
                return Err(exit(i32::try_from(code).unwrap_or(255)));
            }

            // strings
            "length" => {
                let value = self.arg_or_topic(args)?;
                let length = if value.is_undef() {
                    Value::Undef
                } else {
                    Value::Int(value.as_string().chars().count() as i64)
                };
                smallvec![length]
            }
            "substr" => smallvec![self.builtin_substr(args)?],
            "index" | "rindex" => {
                let [hay, needle, rest @ ..] = args else {
                    return Err(EvalError::new(format!("Not enough arguments for {name}")));
                };
                let hay = self.eval_scalar(hay)?.as_string();
                let needle = self.eval_scalar(needle)?.as_string();
                let from = match rest.first() {
                    Some(expr) => Some(self.eval_scalar(expr)?.as_int()),
                    None => None,
                };
                let position = if name == "index" {
                    char_index(&hay, &needle, from.unwrap_or(0))
                } else {
                    char_rindex(&hay, &needle, from)
                };
                smallvec![Value::Int(position)]
            }
            "uc" => smallvec![Value::string(self.arg_or_topic(args)?.as_string().to_uppercase())],
            "lc" => smallvec![Value::string(self.arg_or_topic(args)?.as_string().to_lowercase())],
            "ucfirst" => {
                smallvec![Value::string(upper_first(&self.arg_or_topic(args)?.as_string(), true))]
            }
            "lcfirst" => {
                smallvec![Value::string(upper_first(&self.arg_or_topic(args)?.as_string(), false))]
            }
            "chomp" | "chop" => smallvec![self.builtin_chomp(args, name == "chop")?],
            "chr" => {
                let code = self.arg_or_topic(args)?.as_int();
                let c = u32::try_from(code)
                    .ok()
                    .and_then(char::from_u32)
                    .unwrap_or('\u{FFFD}');
                smallvec![Value::string(c.to_string())]
            }
            "ord" => {
                let text = self.arg_or_topic(args)?.as_string();
                smallvec![Value::Int(text.chars().next().map_or(0, |c| i64::from(u32::from(c))))]
            }
            "hex" => smallvec![hex_value(&self.arg_or_topic(args)?.as_string())],
            "oct" => smallvec![oct_value(&self.arg_or_topic(args)?.as_string())],

            // numbers
            "abs" => {
                let value = match self.arg_or_topic(args)?.as_number() {
                    Number::Int(n) => n.checked_abs().map_or(Value::Float((n as f64).abs()), Value::Int),
                    Number::Float(f) => Value::Float(f.abs()),
                };
                smallvec![value]
            }
            "int" => {
                let value = match self.arg_or_topic(args)?.as_number() {
                    Number::Int(n) => Value::Int(n),
                    Number::Float(f) if !f.is_finite() => Value::Float(f),
                    Number::Float(f) => {
                        let truncated = f.trunc();
                        if truncated.abs() < 9.0e18 {
                            Value::Int(truncated as i64)
                        } else {
                            Value::Float(truncated)
                        }
                    }
                };
                smallvec![value]
            }
            "sqrt" => {
                let value = self.arg_or_topic(args)?;
                let f = value.as_float();
                if f < 0.0 {
                    return Err(EvalError::new(format!(
                        "Can't take sqrt of {}",
                        value.as_string()
                    )));
                }
                smallvec![Value::Float(f.sqrt())]
            }

            _ => return Ok(None),
        };
        Ok(Some(values))
    }

    /// First argument in scalar context, or `$_` when there is none.
    fn arg_or_topic(&mut self, args: &[Expr]) -> Result<Value, EvalError> {
        match args.first() {
            Some(expr) => self.eval_scalar(expr),
            None => {
                let value = self.topic_cell().borrow().clone();
                Ok(value)
            }
        }
    }

    /// `shift`/`pop` without an operand: `@_` inside a sub, `@ARGV`
    /// outside.
    fn default_array(&mut self) -> ArrayCell {
        if self.call_depth > 0 {
            self.args_cell()
        } else {
            self.global_array("main::ARGV")
        }
    }

    /// The array an `@`-form operand names. A scalar holding an array
    /// reference also works (`push $aref, ...`).
    fn array_operand(&mut self, expr: &Expr) -> Result<ArrayCell, EvalError> {
        match expr {
            Expr::Var(Sigil::Array, _)
            | Expr::Special(Special::ArgList)
            | Expr::Deref {
                sigil: Sigil::Array,
                ..
            }
            | Expr::My(_) => Ok(self.array_container(expr, true)?.unwrap_or_default()),
            other => {
                let value = self.eval_scalar(other)?;
                self.deref_array(&value)?
                    .ok_or_else(|| not_a_reference("an ARRAY", &value))
            }
        }
    }

    fn aggregate_operand(&mut self, expr: &Expr) -> Result<Aggregate, EvalError> {
        match expr {
            Expr::Var(Sigil::Hash, _)
            | Expr::Deref {
                sigil: Sigil::Hash,
                ..
            } => Ok(Aggregate::Hash(
                self.hash_container(expr, true)?.unwrap_or_default(),
            )),
            Expr::Var(Sigil::Array, _)
            | Expr::Special(Special::ArgList)
            | Expr::Deref {
                sigil: Sigil::Array,
                ..
            } => Ok(Aggregate::Array(self.array_operand(expr)?)),
            other => {
                let value = self.eval_scalar(other)?;
                match value.as_ref_target() {
                    Some(RefTarget::Array(cell)) => Ok(Aggregate::Array(cell.clone())),
                    Some(RefTarget::Hash(cell)) => Ok(Aggregate::Hash(cell.clone())),
                    _ => Err(not_a_reference("a HASH", &value)),
                }
            }
        }
    }

    /// `splice(@a, OFFSET, LENGTH, LIST)`. Scalar context yields the last
    /// removed element.
    fn builtin_splice(&mut self, args: &[Expr], want: Want) -> Result<Values, EvalError> {
        let Some((target, rest)) = args.split_first() else {
            return Err(EvalError::new("Not enough arguments for splice"));
        };
        let array = self.array_operand(target)?;
        let offset = match rest.first() {
            Some(expr) => self.eval_scalar(expr)?.as_int(),
            None => 0,
        };
        let length = match rest.get(1) {
            Some(expr) => Some(self.eval_scalar(expr)?.as_int()),
            None => None,
        };
        let replacement = match rest.get(2..) {
            Some(items) => self.eval_items(items)?,
            None => Vec::new(),
        };
        let removed = array.borrow_mut().splice(offset, length, replacement);
        Ok(match want {
            Want::List => list(removed),
            Want::Scalar => smallvec![last_value(removed)],
        })
    }

    /// `keys`, `values` and `each` on a hash or an array.
    fn builtin_iterate(&mut self, name: &str, args: &[Expr], want: Want) -> Result<Values, EvalError> {
        let Some(operand) = args.first() else {
            return Err(EvalError::new(format!("Not enough arguments for {name}")));
        };
        let items = match (self.aggregate_operand(operand)?, name) {
            (Aggregate::Hash(hash), "keys") => {
                let keys = hash.borrow_mut().keys();
                keys.into_iter().map(Value::string).collect()
            }
            (Aggregate::Hash(hash), "values") => {
                let values = hash.borrow().values();
                values
            }
            (Aggregate::Hash(hash), _) => {
                let next = hash.borrow_mut().each();
                match next {
                    Some((key, value)) => vec![Value::string(key), value],
                    None => Vec::new(),
                }
            }
            (Aggregate::Array(array), "keys") => {
                let len = array.borrow().len() as i64;
                (0..len).map(Value::Int).collect()
            }
            (Aggregate::Array(array), "values") => {
                let items = array.borrow().to_vec();
                items
            }
            (Aggregate::Array(_), _) => {
                return Err(EvalError::new("each on an array is not supported"))
            }
        };
        if want == Want::Scalar {
            let value = if name == "each" {
                items.into_iter().next().unwrap_or(Value::Undef)
            } else {
                Value::Int(items.len() as i64)
            };
            return Ok(smallvec![value]);
        }
        Ok(list(items))
    }

    fn builtin_exists(&mut self, args: &[Expr]) -> Result<bool, EvalError> {
        let Some(target) = args.first() else {
            return Err(EvalError::new("Not enough arguments for exists"));
        };
        match target {
            Expr::Entry { hash, key } => {
                let key = self.eval_scalar(key)?.as_string();
                let found = self.hash_cell(hash).borrow().exists(&key);
                Ok(found)
            }
            Expr::Element { array, index } => {
                let index = self.eval_scalar(index)?.as_int();
                let found = self.array_cell(array).borrow().exists(index);
                Ok(found)
            }
            Expr::ArrowKey { base, key } => {
                let hash = self.hash_behind(base, false)?;
                let key = self.eval_scalar(key)?.as_string();
                Ok(hash.is_some_and(|h| h.borrow().exists(&key)))
            }
            Expr::ArrowIndex { base, index } => {
                let array = self.array_behind(base, false)?;
                let index = self.eval_scalar(index)?.as_int();
                Ok(array.is_some_and(|a| a.borrow().exists(index)))
            }
            Expr::Var(Sigil::Code, name) | Expr::Call { name, .. } => {
                Ok(self.find_named_sub(name).is_some())
            }
            _ => Err(EvalError::new(
                "exists argument is not a HASH or ARRAY element or a subroutine",
            )),
        }
    }

    /// `delete $h{k}`, `delete $a[i]`, `delete @h{LIST}`. Returns the
    /// removed values.
    fn builtin_delete(&mut self, args: &[Expr]) -> Result<Values, EvalError> {
        let Some(target) = args.first() else {
            return Err(EvalError::new("Not enough arguments for delete"));
        };
        let removed = match target {
            Expr::Entry { hash, key } => {
                let key = self.eval_scalar(key)?.as_string();
                let removed = self.hash_cell(hash).borrow_mut().delete(&key);
                smallvec![removed]
            }
            Expr::Element { array, index } => {
                let index = self.eval_scalar(index)?.as_int();
                let removed = self.array_cell(array).borrow_mut().delete(index);
                smallvec![removed]
            }
            Expr::ArrowKey { base, key } => {
                let hash = self.hash_behind(base, false)?;
                let key = self.eval_scalar(key)?.as_string();
                smallvec![hash.map_or(Value::Undef, |h| h.borrow_mut().delete(&key))]
            }
            Expr::ArrowIndex { base, index } => {
                let array = self.array_behind(base, false)?;
                let index = self.eval_scalar(index)?.as_int();
                smallvec![array.map_or(Value::Undef, |a| a.borrow_mut().delete(index))]
            }
            Expr::HashSlice { base, keys } => {
                let hash = self.hash_container(base, false)?;
                let keys = self.eval_list(keys)?;
                let Some(hash) = hash else {
                    return Ok(list(vec![Value::Undef; keys.len()]));
                };
                let mut hash = hash.borrow_mut();
                let removed: Values = keys.iter().map(|k| hash.delete(&k.as_string())).collect();
                removed
            }
            _ => {
                return Err(EvalError::new(
                    "delete argument is not a HASH or ARRAY element or slice",
                ))
            }
        };
        Ok(removed)
    }

    /// `defined EXPR`. Element tests never create the container they
    /// look into.
    fn builtin_defined(&mut self, args: &[Expr]) -> Result<bool, EvalError> {
        let Some(target) = args.first() else {
            return Ok(self.topic_cell().borrow().is_defined());
        };
        match target {
            Expr::Var(Sigil::Code, name) => Ok(self.find_named_sub(name).is_some()),
            Expr::Var(Sigil::Array, name) => Ok(!self.array_cell(name).borrow().is_empty()),
            Expr::Var(Sigil::Hash, name) => Ok(!self.hash_cell(name).borrow().is_empty()),
            other => Ok(self.eval_scalar(other)?.is_defined()),
        }
    }

    /// `bless REF, CLASS`; the class defaults to the current package.
    fn builtin_bless(&mut self, args: &[Expr]) -> Result<Value, EvalError> {
        let Some(target) = args.first() else {
            return Err(EvalError::new("Not enough arguments for bless"));
        };
        let value = self.eval_scalar(target)?;
        let class = match args.get(1) {
            Some(expr) => {
                let class = self.eval_scalar(expr)?;
                match class.as_ref_target().and_then(RefTarget::blessed) {
                    Some(package) => package.to_string(),
                    None => class.as_string(),
                }
            }
            None => self.package.to_string(),
        };
        let Some(reference) = value.as_ref_target() else {
            return Err(EvalError::new("Can't bless non-reference value"));
        };
        tracing::debug!(%class, "bless");
        reference.bless(&class);
        Ok(value)
    }

    /// Message for `die`/`warn`: the arguments joined, `default` when they
    /// are empty, and the location appended unless the text ends in a
    /// newline.
    fn located_message(&mut self, args: &[Expr], default: &str) -> Result<String, EvalError> {
        let mut message: String = self
            .eval_items(args)?
            .iter()
            .map(Value::as_string)
            .collect();
        if message.is_empty() {
            message = default.to_string();
        }
        if !message.ends_with('\n') {
            message.push_str(&self.location_suffix());
        }
        Ok(message)
    }

    fn builtin_die(&mut self, args: &[Expr]) -> Result<EvalError, EvalError> {
        let message = self.located_message(args, "Died")?;
        tracing::debug!(%message, "die");
        Ok(die(message))
    }

    /// `substr EXPR, OFFSET, LENGTH, REPLACEMENT`. With a replacement the
    /// first operand is modified and the original substring returned.
    fn builtin_substr(&mut self, args: &[Expr]) -> Result<Value, EvalError> {
        let [target, offset, rest @ ..] = args else {
            return Err(EvalError::new("Not enough arguments for substr"));
        };
        let text = chars_of(&self.eval_scalar(target)?.as_string());
        let offset = self.eval_scalar(offset)?.as_int();
        let length = match rest.first() {
            Some(expr) => Some(self.eval_scalar(expr)?.as_int()),
            None => None,
        };

        if offset > text.len() as i64 || offset < -(text.len() as i64) {
            return Ok(Value::Undef);
        }
        let start = offset_from(offset, text.len());
        let end = match length {
            None => text.len(),
            Some(n) if n < 0 => offset_from(n, text.len()).max(start),
            Some(n) => start.saturating_add(n as usize).min(text.len()),
        };
        let extracted: String = text[start..end].iter().collect();

        if let Some(replacement) = rest.get(1) {
            let replacement = self.eval_scalar(replacement)?.as_string();
            let updated: String = text[..start]
                .iter()
                .copied()
                .chain(replacement.chars())
                .chain(text[end..].iter().copied())
                .collect();
            self.resolve_place(target)?.store(Value::string(updated))?;
        }
        Ok(Value::string(extracted))
    }

    /// `chomp`/`chop` on a scalar, an array, or `$_`. `chomp` returns the
    /// number of characters removed, `chop` the last one removed.
    fn builtin_chomp(&mut self, args: &[Expr], chop: bool) -> Result<Value, EvalError> {
        let place = match args.first() {
            Some(target) => self.resolve_place(target)?,
            None => Place::Scalar(self.topic_cell()),
        };
        let mut removed = 0;
        let mut last_chopped = String::new();
        let mut trim = |value: &Value| -> Value {
            let mut text = value.as_string();
            if chop {
                last_chopped = text.pop().map(String::from).unwrap_or_default();
            } else {
                removed += chomp_string(&mut text);
            }
            Value::string(text)
        };

        match &place {
            Place::Array(cell) => {
                let items: Vec<Value> = cell.borrow().iter().map(&mut trim).collect();
                cell.borrow_mut().assign(items);
            }
            Place::Hash(cell) => {
                let mut hash = cell.borrow_mut();
                for key in hash.keys() {
                    let value = trim(&hash.fetch(&key));
                    hash.store(key, value);
                }
            }
            Place::List(places) => {
                for inner in places {
                    let value = trim(&inner.fetch());
                    inner.store(value)?;
                }
            }
            other => {
                let value = trim(&other.fetch());
                other.store(value)?;
            }
        }

        Ok(if chop {
            Value::string(last_chopped)
        } else {
            Value::Int(removed)
        })
    }
}
