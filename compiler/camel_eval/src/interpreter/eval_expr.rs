//! Expression evaluation in scalar and list context.
//!
//! [`Interpreter::eval_scalar`] and [`Interpreter::eval_list`] are the two
//! entry points. Most node kinds mean the same thing in both contexts and
//! are handled once, in `eval_scalar_inner`; `eval_list_inner` only
//! intercepts the kinds whose list value differs (arrays, hashes, comma
//! lists, slices, ranges, calls, `grep`/`map`/`sort`, ...).

use std::cmp::Ordering;

use camel_ir::{BinaryOp, Block, Expr, Literal, Sigil, Special, StrPart, Want};
use camel_stack::ensure_sufficient_stack;
use camel_value::{Container, EvalError, EvalResult, Hash, RefTarget, Subroutine, Value};

use super::{in_context, last_value, Interpreter, Signal, Values};
use crate::operators::{compare_strings, evaluate_binary};
use crate::unary_operators::{evaluate_unary, magic_increment};

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Undef => Value::Undef,
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(f) => Value::Float(*f),
        Literal::Str(s) => Value::string(s.as_str()),
    }
}

/// Parts of an interpolated string that expand to a space-joined list.
fn interpolates_as_list(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Var(Sigil::Array, _)
            | Expr::Special(Special::ArgList)
            | Expr::Slice { .. }
            | Expr::HashSlice { .. }
            | Expr::Deref {
                sigil: Sigil::Array,
                ..
            }
    )
}

/// Stable merge sort with a fallible comparator. Unlike `slice::sort_by`
/// it tolerates comparators that are not a total order.
fn merge_sort<E>(
    items: Vec<Value>,
    cmp: &mut impl FnMut(&Value, &Value) -> Result<Ordering, E>,
) -> Result<Vec<Value>, E> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = merge_sort(left, cmp)?;
    let right = merge_sort(right, cmp)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut right = right.into_iter().peekable();
    for item in left {
        while let Some(next) = right.peek() {
            if cmp(next, &item)? == Ordering::Less {
                merged.extend(right.next());
            } else {
                break;
            }
        }
        merged.push(item);
    }
    merged.extend(right);
    Ok(merged)
}

impl Interpreter {
    /// Evaluate in the given context.
    pub(crate) fn eval_want(&mut self, expr: &Expr, want: Want) -> Result<Values, EvalError> {
        match want {
            Want::Scalar => Ok(smallvec::smallvec![self.eval_scalar(expr)?]),
            Want::List => Ok(self.eval_list(expr)?.into_iter().collect()),
        }
    }

    /// Evaluate in scalar context.
    pub fn eval_scalar(&mut self, expr: &Expr) -> EvalResult {
        ensure_sufficient_stack(|| self.eval_scalar_inner(expr))
    }

    /// Evaluate in list context.
    pub fn eval_list(&mut self, expr: &Expr) -> Result<Vec<Value>, EvalError> {
        ensure_sufficient_stack(|| self.eval_list_inner(expr))
    }

    fn eval_scalar_inner(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::Literal(literal) => Ok(literal_value(literal)),
            Expr::Interpolate(parts) => self.interpolate(parts),

            Expr::Var(Sigil::Scalar, name) => {
                let cell = self.scalar_cell(name);
                let value = cell.borrow().clone();
                Ok(value)
            }
            Expr::Var(Sigil::Array, name) => {
                Ok(Value::Int(self.array_cell(name).borrow().len() as i64))
            }
            Expr::Var(Sigil::Hash, name) => {
                Ok(Value::Int(self.hash_cell(name).borrow().len() as i64))
            }
            Expr::Var(Sigil::Code, name) => Ok(self.code_ref(name)),
            Expr::Special(special) => Ok(self.special_value(*special)),

            Expr::Element { array, index } => {
                let index = self.eval_scalar(index)?.as_int();
                let array = self.array_cell(array);
                let value = array.borrow().fetch(index);
                Ok(value)
            }
            Expr::Entry { hash, key } => {
                let key = self.eval_scalar(key)?.as_string();
                let hash = self.hash_cell(hash);
                let value = hash.borrow().fetch(&key);
                Ok(value)
            }
            Expr::ArrowIndex { base, index } => {
                let array = self.array_behind(base, false)?;
                let index = self.eval_scalar(index)?.as_int();
                Ok(array.map_or(Value::Undef, |a| a.borrow().fetch(index)))
            }
            Expr::ArrowKey { base, key } => {
                let hash = self.hash_behind(base, false)?;
                let key = self.eval_scalar(key)?.as_string();
                Ok(hash.map_or(Value::Undef, |h| h.borrow().fetch(&key)))
            }
            Expr::Slice { .. } | Expr::HashSlice { .. } => Ok(last_value(self.eval_list(expr)?)),
            Expr::LastIndex(base) => {
                let len = self
                    .array_container(base, false)?
                    .map_or(0, |a| a.borrow().len() as i64);
                Ok(Value::Int(len - 1))
            }

            Expr::Unary { op, operand } => {
                let value = self.eval_scalar(operand)?;
                Ok(evaluate_unary(&value, *op))
            }
            Expr::IncDec { op, target } => self.eval_inc_dec(*op, target),
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right),
            Expr::Assign { op, target, value } => {
                Ok(last_value(self.eval_assign(*op, target, value, Want::Scalar)?))
            }
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                if self.eval_scalar(cond)?.is_true() {
                    self.eval_scalar(then_expr)
                } else {
                    self.eval_scalar(else_expr)
                }
            }

            // comma operator: every item is evaluated, the last one wins
            Expr::List(items) => {
                let mut last = Value::Undef;
                for item in items {
                    last = self.eval_scalar(item)?;
                }
                Ok(last)
            }
            Expr::AnonArray(items) => {
                let values = self.eval_items(items)?;
                Ok(Value::new_array_ref(values))
            }
            Expr::AnonHash(items) => {
                let values = self.eval_items(items)?;
                Ok(Value::new_hash_ref(Hash::from_pairs(values)))
            }
            Expr::AnonSub(body) => Ok(self.make_closure(body)),

            Expr::Ref(target) => Ok(last_value(self.make_refs(target)?)),
            Expr::Deref { sigil, expr } => self.eval_deref_scalar(*sigil, expr),
            Expr::My(decl) => Ok(self.declare(decl).fetch()),

            Expr::Call { name, args } => {
                Ok(last_value(self.eval_call(name, args, Want::Scalar)?))
            }
            Expr::CallRef { target, args } => {
                Ok(last_value(self.eval_call_ref(target, args, Want::Scalar)?))
            }
            Expr::MethodCall {
                invocant,
                method,
                args,
            } => Ok(last_value(
                self.eval_method_call(invocant, method, args, Want::Scalar)?,
            )),

            Expr::Match {
                target,
                pattern,
                flags,
                negate,
            } => Ok(last_value(self.eval_match(
                target.as_deref(),
                pattern,
                flags,
                *negate,
                Want::Scalar,
            )?)),
            Expr::Subst {
                target,
                pattern,
                replacement,
                flags,
            } => self.eval_subst(target.as_deref(), pattern, replacement, flags),
            Expr::Regex { pattern, flags } => self.eval_qr(pattern, flags),

            Expr::ReadLine(handle) => self.eval_read_line(handle),
            Expr::FileHandle(name) => Ok(Value::string(name.as_str())),
            Expr::Print { kind, handle, args } => self.eval_print(*kind, handle.as_ref(), args),

            Expr::Grep { .. } | Expr::Map { .. } | Expr::Sort { .. } => {
                Ok(Value::Int(self.eval_list(expr)?.len() as i64))
            }
        }
    }

    fn eval_list_inner(&mut self, expr: &Expr) -> Result<Vec<Value>, EvalError> {
        match expr {
            Expr::Var(Sigil::Array, name) => Ok(self.array_cell(name).borrow().to_vec()),
            Expr::Var(Sigil::Hash, name) => Ok(self.hash_cell(name).borrow().to_pairs()),
            Expr::Special(Special::ArgList) => Ok(self.args_cell().borrow().to_vec()),
            Expr::List(items) => self.eval_items(items),

            Expr::Slice { base, indices } => {
                let array = self.array_container(base, false)?;
                let indices = self.eval_list(indices)?;
                Ok(indices
                    .iter()
                    .map(|i| {
                        array
                            .as_ref()
                            .map_or(Value::Undef, |a| a.borrow().fetch(i.as_int()))
                    })
                    .collect())
            }
            Expr::HashSlice { base, keys } => {
                let hash = self.hash_container(base, false)?;
                let keys = self.eval_list(keys)?;
                Ok(keys
                    .iter()
                    .map(|k| {
                        hash.as_ref()
                            .map_or(Value::Undef, |h| h.borrow().fetch(&k.as_string()))
                    })
                    .collect())
            }
            Expr::Deref {
                sigil: Sigil::Array,
                expr,
            } => Ok(self
                .array_behind(expr, false)?
                .map_or_else(Vec::new, |a| a.borrow().to_vec())),
            Expr::Deref {
                sigil: Sigil::Hash,
                expr,
            } => Ok(self
                .hash_behind(expr, false)?
                .map_or_else(Vec::new, |h| h.borrow().to_pairs())),
            Expr::Deref {
                sigil: Sigil::Code,
                expr,
            } => Ok(self.call_with_current_args(expr, Want::List)?.into_vec()),

            Expr::Binary {
                op: BinaryOp::Range,
                left,
                right,
            } => self.eval_range(left, right),
            Expr::Binary {
                op: BinaryOp::Repeat,
                left,
                right,
            } if matches!(**left, Expr::List(_)) => {
                let items = self.eval_list(left)?;
                let count = usize::try_from(self.eval_scalar(right)?.as_int()).unwrap_or(0);
                Ok((0..count).flat_map(|_| items.iter().cloned()).collect())
            }

            Expr::Assign { op, target, value } => {
                Ok(self.eval_assign(*op, target, value, Want::List)?.into_vec())
            }
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                if self.eval_scalar(cond)?.is_true() {
                    self.eval_list(then_expr)
                } else {
                    self.eval_list(else_expr)
                }
            }
            Expr::Ref(target) => self.make_refs(target),
            Expr::My(decl) => Ok(self.declare(decl).values()),

            Expr::Call { name, args } => Ok(self.eval_call(name, args, Want::List)?.into_vec()),
            Expr::CallRef { target, args } => {
                Ok(self.eval_call_ref(target, args, Want::List)?.into_vec())
            }
            Expr::MethodCall {
                invocant,
                method,
                args,
            } => Ok(self
                .eval_method_call(invocant, method, args, Want::List)?
                .into_vec()),

            Expr::Match {
                target,
                pattern,
                flags,
                negate,
            } => Ok(self
                .eval_match(target.as_deref(), pattern, flags, *negate, Want::List)?
                .into_vec()),

            Expr::ReadLine(handle) => self.eval_read_all(handle),
            Expr::Grep { block, list } => self.eval_grep(block, list),
            Expr::Map { block, list } => self.eval_map(block, list),
            Expr::Sort { cmp, list } => self.eval_sort(cmp.as_ref(), list),

            _ => Ok(vec![self.eval_scalar(expr)?]),
        }
    }

    /// Evaluate each item in list context and flatten.
    pub(crate) fn eval_items(&mut self, items: &[Expr]) -> Result<Vec<Value>, EvalError> {
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            values.extend(self.eval_list(item)?);
        }
        Ok(values)
    }

    fn interpolate(&mut self, parts: &[StrPart]) -> EvalResult {
        let mut out = String::new();
        for part in parts {
            match part {
                StrPart::Lit(text) => out.push_str(text),
                StrPart::Expr(expr) if interpolates_as_list(expr) => {
                    let items = self.eval_list(expr)?;
                    let joined: Vec<String> = items.iter().map(Value::as_string).collect();
                    out.push_str(&joined.join(" "));
                }
                StrPart::Expr(expr) => out.push_str(&self.eval_scalar(expr)?.as_string()),
            }
        }
        Ok(Value::string(out))
    }

    /// Binary operators. Short-circuit operators return the deciding
    /// operand itself, not a boolean.
    fn eval_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> EvalResult {
        match op {
            BinaryOp::And => {
                let left = self.eval_scalar(left)?;
                if !left.is_true() {
                    return Ok(left);
                }
                self.eval_scalar(right)
            }
            BinaryOp::Or => {
                let left = self.eval_scalar(left)?;
                if left.is_true() {
                    return Ok(left);
                }
                self.eval_scalar(right)
            }
            BinaryOp::DefinedOr => {
                let left = self.eval_scalar(left)?;
                if left.is_defined() {
                    return Ok(left);
                }
                self.eval_scalar(right)
            }
            _ => {
                let left = self.eval_scalar(left)?;
                let right = self.eval_scalar(right)?;
                evaluate_binary(&left, &right, op)
            }
        }
    }

    /// `a..b`: integers when the left end looks numeric, otherwise the
    /// magic-increment sequence of strings (`"aa".."ad"`).
    fn eval_range(&mut self, left: &Expr, right: &Expr) -> Result<Vec<Value>, EvalError> {
        let from = self.eval_scalar(left)?;
        let to = self.eval_scalar(right)?;

        if from.looks_like_number() || from.is_undef() {
            let (from, to) = (from.as_int(), to.as_int());
            return Ok((from..=to).map(Value::Int).collect());
        }

        let to = to.as_string();
        let mut current = from.as_string();
        let mut values = Vec::new();
        loop {
            if current.len() > to.len() {
                break;
            }
            let done = current == to;
            values.push(Value::string(current.as_str()));
            if done {
                break;
            }
            match magic_increment(&current) {
                Some(next) => current = next,
                None => break,
            }
        }
        Ok(values)
    }

    // References

    /// `\&name`: a reference to the named sub, `Undef` if there is none.
    pub(crate) fn code_ref(&self, name: &str) -> Value {
        self.find_named_sub(name)
            .map_or(Value::Undef, |code| Value::Ref(RefTarget::Code(code)))
    }

    /// `sub { ... }` closing over every visible lexical.
    pub(crate) fn make_closure(&self, body: &std::rc::Rc<Block>) -> Value {
        let code = Container::new(Subroutine {
            name: None,
            package: std::rc::Rc::clone(&self.package),
            body: std::rc::Rc::clone(body),
            captures: self.env.capture(),
        });
        Value::Ref(RefTarget::Code(code))
    }

    /// `\expr`. Variables are referenced by their container, so the
    /// reference aliases the variable; any other value is copied into a
    /// fresh scalar container.
    fn make_refs(&mut self, target: &Expr) -> Result<Vec<Value>, EvalError> {
        let target = match target {
            Expr::Var(Sigil::Scalar, name) => RefTarget::Scalar(self.scalar_cell(name)),
            Expr::Var(Sigil::Array, name) => RefTarget::Array(self.array_cell(name)),
            Expr::Var(Sigil::Hash, name) => RefTarget::Hash(self.hash_cell(name)),
            Expr::Var(Sigil::Code, name) => return Ok(vec![self.code_ref(name)]),
            Expr::Special(Special::Topic) => RefTarget::Scalar(self.topic_cell()),
            Expr::Special(Special::ArgList) => RefTarget::Array(self.args_cell()),
            Expr::Deref { sigil, expr } => match sigil {
                Sigil::Scalar => RefTarget::Scalar(self.resolve_place_scalar(expr)?),
                Sigil::Array => RefTarget::Array(self.vivify_array(expr)?),
                Sigil::Hash => RefTarget::Hash(self.vivify_hash(expr)?),
                Sigil::Code => return Ok(vec![self.eval_scalar(expr)?]),
            },
            Expr::My(_) | Expr::List(_) => {
                let place = self.resolve_place(target)?;
                return Ok(self.refs_to_place(place));
            }
            Expr::AnonSub(_) => return Ok(vec![self.eval_scalar(target)?]),
            other => RefTarget::Scalar(Container::new(self.eval_scalar(other)?)),
        };
        Ok(vec![Value::Ref(target)])
    }

    fn refs_to_place(&self, place: super::lvalue::Place) -> Vec<Value> {
        use super::lvalue::Place;
        match place {
            Place::Scalar(cell) => vec![Value::Ref(RefTarget::Scalar(cell))],
            Place::Array(cell) => vec![Value::Ref(RefTarget::Array(cell))],
            Place::Hash(cell) => vec![Value::Ref(RefTarget::Hash(cell))],
            Place::List(places) => places
                .into_iter()
                .flat_map(|p| self.refs_to_place(p))
                .collect(),
            other => vec![Value::Ref(RefTarget::Scalar(Container::new(other.fetch())))],
        }
    }

    /// The scalar container behind `$$expr`, created when `expr` is an
    /// undefined variable.
    fn resolve_place_scalar(
        &mut self,
        expr: &Expr,
    ) -> Result<camel_value::ScalarCell, EvalError> {
        let deref = Expr::Deref {
            sigil: Sigil::Scalar,
            expr: Box::new(expr.clone()),
        };
        match self.resolve_place(&deref)? {
            super::lvalue::Place::Scalar(cell) => Ok(cell),
            _ => Ok(Container::new(Value::Undef)),
        }
    }

    /// `$$r`, `@$r` (length), `%$r` (key count), `&$r` (call with the
    /// current `@_`).
    fn eval_deref_scalar(&mut self, sigil: Sigil, expr: &Expr) -> EvalResult {
        match sigil {
            Sigil::Scalar => {
                let value = self.eval_scalar(expr)?;
                let cell = self.deref_scalar(&value)?;
                Ok(cell.map_or(Value::Undef, |c| c.borrow().clone()))
            }
            Sigil::Array => Ok(Value::Int(
                self.array_behind(expr, false)?
                    .map_or(0, |a| a.borrow().len() as i64),
            )),
            Sigil::Hash => Ok(Value::Int(
                self.hash_behind(expr, false)?
                    .map_or(0, |h| h.borrow().len() as i64),
            )),
            Sigil::Code => Ok(last_value(self.call_with_current_args(expr, Want::Scalar)?)),
        }
    }

    // grep / map / sort

    /// Run a `grep`/`map`/`sort` block and return its value in `want`.
    /// `return` inside the block yields its value; `last`/`next` cannot
    /// leave it.
    pub(crate) fn block_value(&mut self, block: &Block, want: Want) -> Result<Values, EvalError> {
        let flow = self.exec_block(block, Some(want))?;
        match flow.signal {
            Signal::Normal => Ok(in_context(flow.value, want)),
            Signal::Return(values) => Ok(in_context(values, want)),
            signal => Err(super::escaped_loop_control(signal)),
        }
    }

    /// Run `f` once per item with `$_` set to it, restoring `$_` after.
    fn with_topic<T>(
        &mut self,
        items: Vec<Value>,
        mut f: impl FnMut(&mut Self, Value) -> Result<Option<T>, EvalError>,
    ) -> Result<Vec<T>, EvalError> {
        let topic = self.topic_cell();
        let saved = topic.borrow().clone();
        let mut out = Vec::new();
        let mut result = Ok(());
        for item in items {
            *topic.borrow_mut() = item.clone();
            match f(self, item) {
                Ok(Some(value)) => out.push(value),
                Ok(None) => {}
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }
        *topic.borrow_mut() = saved;
        result.map(|()| out)
    }

    fn eval_grep(&mut self, block: &Block, list: &Expr) -> Result<Vec<Value>, EvalError> {
        let items = self.eval_list(list)?;
        self.with_topic(items, |interp, item| {
            let keep = last_value(interp.block_value(block, Want::Scalar)?).is_true();
            Ok(keep.then_some(item))
        })
    }

    fn eval_map(&mut self, block: &Block, list: &Expr) -> Result<Vec<Value>, EvalError> {
        let items = self.eval_list(list)?;
        let groups = self.with_topic(items, |interp, _| {
            Ok(Some(interp.block_value(block, Want::List)?))
        })?;
        Ok(groups.into_iter().flatten().collect())
    }

    /// `sort LIST` compares as strings; `sort { ... } LIST` runs the block
    /// with the package globals `$a` and `$b` set to the pair.
    fn eval_sort(&mut self, cmp: Option<&Block>, list: &Expr) -> Result<Vec<Value>, EvalError> {
        let items = self.eval_list(list)?;
        let Some(block) = cmp else {
            return merge_sort(items, &mut |a, b| Ok::<_, EvalError>(compare_strings(a, b)));
        };

        let a = self.env.global_scalar(&self.qualified("a"));
        let b = self.env.global_scalar(&self.qualified("b"));
        let saved = (a.borrow().clone(), b.borrow().clone());
        let sorted = merge_sort(items, &mut |x, y| {
            *a.borrow_mut() = x.clone();
            *b.borrow_mut() = y.clone();
            let result = last_value(self.block_value(block, Want::Scalar)?);
            Ok(result.as_int().cmp(&0))
        });
        *a.borrow_mut() = saved.0;
        *b.borrow_mut() = saved.1;
        sorted
    }
}
