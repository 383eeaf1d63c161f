//! Match, substitution, `qr//` and `split`.
//!
//! A successful match replaces the interpreter's capture state (`$&`,
//! `$1..$N`); a failed match leaves the previous captures in place.

use camel_ir::{Expr, Literal, Sigil, Special, Want};
use camel_value::{EvalError, EvalResult, ScalarCell, Value};
use regex::Regex;

use super::{Interpreter, Values};
use crate::regex_bridge::{match_all, match_at, next_position, splice, split, split_whitespace};

impl Interpreter {
    /// Pattern source and flags. A `qr//` operand contributes its own
    /// flags; anything else is evaluated as a string.
    fn pattern_source(&mut self, pattern: &Expr, flags: &str) -> Result<(String, String), EvalError> {
        if let Expr::Regex {
            pattern: inner,
            flags: inner_flags,
        } = pattern
        {
            let source = self.eval_scalar(inner)?.as_string();
            return Ok((source, format!("{flags}{inner_flags}")));
        }
        Ok((self.eval_scalar(pattern)?.as_string(), flags.to_string()))
    }

    fn compile(&mut self, pattern: &Expr, flags: &str) -> Result<Option<Regex>, EvalError> {
        let (source, flags) = self.pattern_source(pattern, flags)?;
        Ok(self.regexes.get(&source, &flags))
    }

    /// The variable a `/g` match runs against, which carries its resume
    /// position.
    fn position_cell(&self, target: Option<&Expr>) -> Option<ScalarCell> {
        match target {
            None | Some(Expr::Special(Special::Topic)) => Some(self.topic_cell()),
            Some(Expr::Var(Sigil::Scalar, name)) => Some(self.scalar_cell(name)),
            Some(_) => None,
        }
    }

    fn match_target(&mut self, target: Option<&Expr>) -> Result<String, EvalError> {
        match target {
            Some(expr) => Ok(self.eval_scalar(expr)?.as_string()),
            None => Ok(self.topic_cell().borrow().as_string()),
        }
    }

    /// `target =~ /pattern/flags`.
    ///
    /// Scalar context yields a boolean; `/g` resumes where the previous
    /// match on the same variable stopped and resets after a failure.
    /// List context yields the captures (every match's, with `/g`), or
    /// the matched strings when the pattern has no groups.
    pub(crate) fn eval_match(
        &mut self,
        target: Option<&Expr>,
        pattern: &Expr,
        flags: &str,
        negate: bool,
        want: Want,
    ) -> Result<Values, EvalError> {
        let text = self.match_target(target)?;
        let Some(re) = self.compile(pattern, flags)? else {
            return Ok(smallvec::smallvec![Value::boolean(negate)]);
        };
        let global = flags.contains('g');

        if want == Want::List && !negate {
            let has_groups = re.captures_len() > 1;
            let found = if global {
                match_all(&re, &text)
            } else {
                match_at(&re, &text, 0).into_iter().collect()
            };
            let Some(last) = found.last().cloned() else {
                return Ok(Values::new());
            };
            let values = if has_groups {
                found.iter().flat_map(|m| m.group_values()).collect()
            } else if global {
                found.iter().map(|m| Value::from(m.matched.as_str())).collect()
            } else {
                smallvec::smallvec![Value::Int(1)]
            };
            self.last_match = Some(last);
            return Ok(values);
        }

        let cell = if global { self.position_cell(target) } else { None };
        let start = cell
            .as_ref()
            .and_then(ScalarCell::match_position)
            .unwrap_or(0);
        let matched = match match_at(&re, &text, start) {
            Some(found) => {
                if let Some(cell) = &cell {
                    cell.set_match_position(Some(next_position(&text, &found)));
                }
                self.last_match = Some(found);
                true
            }
            None => {
                if let Some(cell) = &cell {
                    cell.set_match_position(None);
                }
                false
            }
        };
        Ok(smallvec::smallvec![Value::boolean(matched != negate)])
    }

    /// `target =~ s/pattern/replacement/flags`. The replacement is
    /// evaluated once per match, after that match's captures are set.
    /// Returns the number of substitutions, or the new string with `/r`.
    pub(crate) fn eval_subst(
        &mut self,
        target: Option<&Expr>,
        pattern: &Expr,
        replacement: &Expr,
        flags: &str,
    ) -> EvalResult {
        let place = match target {
            Some(expr) => self.resolve_place(expr)?,
            None => super::lvalue::Place::Scalar(self.topic_cell()),
        };
        let text = place.fetch().as_string();
        let keep_original = flags.contains('r');

        let Some(re) = self.compile(pattern, flags)? else {
            return Ok(if keep_original {
                Value::string(text)
            } else {
                Value::boolean(false)
            });
        };
        let found = if flags.contains('g') {
            match_all(&re, &text)
        } else {
            match_at(&re, &text, 0).into_iter().collect()
        };
        if found.is_empty() {
            return Ok(if keep_original {
                Value::string(text)
            } else {
                Value::boolean(false)
            });
        }

        let mut replacements = Vec::with_capacity(found.len());
        for m in &found {
            self.last_match = Some(m.clone());
            replacements.push(self.eval_scalar(replacement)?.as_string());
        }
        let result = splice(&text, &found, &replacements);
        if keep_original {
            return Ok(Value::string(result));
        }
        place.store(Value::string(result))?;
        Ok(Value::Int(found.len() as i64))
    }

    /// `qr/pattern/flags` stringifies to an inline-flagged group, so it
    /// can be interpolated into a larger pattern.
    pub(crate) fn eval_qr(&mut self, pattern: &Expr, flags: &str) -> EvalResult {
        let source = self.eval_scalar(pattern)?.as_string();
        let inline: String = flags.chars().filter(|c| "imsx".contains(*c)).collect();
        Ok(Value::string(format!("(?{inline}:{source})")))
    }

    /// `split PATTERN, EXPR, LIMIT`. A pattern of a single space splits on
    /// whitespace runs, ignoring leading whitespace.
    pub(crate) fn eval_split(&mut self, args: &[Expr]) -> Result<Vec<Value>, EvalError> {
        let text = match args.get(1) {
            Some(expr) => self.eval_scalar(expr)?.as_string(),
            None => self.topic_cell().borrow().as_string(),
        };
        let limit = match args.get(2) {
            Some(expr) => self.eval_scalar(expr)?.as_int(),
            None => 0,
        };
        let Some(pattern) = args.first() else {
            return Ok(split_whitespace(&text, limit));
        };

        let awk_mode = match pattern {
            Expr::Literal(Literal::Str(s)) => s == " ",
            Expr::Regex { pattern, .. } => matches!(&**pattern, Expr::Literal(Literal::Str(s)) if s == " "),
            _ => false,
        };
        if awk_mode {
            return Ok(split_whitespace(&text, limit));
        }
        match self.compile(pattern, "")? {
            Some(re) => Ok(split(&re, &text, limit)),
            None => Ok(vec![Value::string(text)]),
        }
    }
}
