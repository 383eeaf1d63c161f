//! Assignable locations and autovivification.
//!
//! A [`Place`] is where an assignment, `++`, `chomp` or `s///` writes.
//! Resolving a place for writing creates missing intermediate containers:
//! `$h{a}[2]{b} = 1` on an empty `%h` builds the inner array and hash.
//! Reads never create anything; a missing link reads as `Undef`.

use camel_ir::{BinaryOp, Expr, IncDec, Sigil, Special, Want};
use camel_value::{
    non_creatable_element, not_a_reference, Array, ArrayCell, Container, EvalError, EvalResult,
    Hash, HashCell, RefTarget, ScalarCell, Slot, Value,
};

use super::{Interpreter, Values};
use crate::operators::evaluate_binary;
use crate::unary_operators::step;

/// An assignable location.
#[derive(Clone, Debug)]
pub(crate) enum Place {
    Scalar(ScalarCell),
    Element(ArrayCell, i64),
    Entry(HashCell, String),
    Array(ArrayCell),
    Hash(HashCell),
    /// `$#a`
    LastIndex(ArrayCell),
    /// `($a, @rest)`, slices.
    List(Vec<Place>),
    /// `undef` in `(undef, $x) = ...`.
    Discard,
}

impl Place {
    pub(crate) fn from_slot(slot: Slot) -> Self {
        match slot {
            Slot::Scalar(cell) => Place::Scalar(cell),
            Slot::Array(cell) => Place::Array(cell),
            Slot::Hash(cell) => Place::Hash(cell),
        }
    }

    /// Current value as a scalar.
    pub(crate) fn fetch(&self) -> Value {
        match self {
            Place::Scalar(cell) => cell.borrow().clone(),
            Place::Element(array, index) => array.borrow().fetch(*index),
            Place::Entry(hash, key) => hash.borrow().fetch(key),
            Place::Array(array) => Value::Int(array.borrow().len() as i64),
            Place::Hash(hash) => Value::Int(hash.borrow().len() as i64),
            Place::LastIndex(array) => Value::Int(array.borrow().len() as i64 - 1),
            Place::List(places) => places.last().map_or(Value::Undef, Place::fetch),
            Place::Discard => Value::Undef,
        }
    }

    /// Scalar assignment.
    pub(crate) fn store(&self, value: Value) -> Result<(), EvalError> {
        match self {
            Place::Scalar(cell) => *cell.borrow_mut() = value,
            Place::Element(array, index) => {
                if !array.borrow_mut().store(*index, value) {
                    return Err(non_creatable_element(*index));
                }
            }
            Place::Entry(hash, key) => hash.borrow_mut().store(key.as_str(), value),
            Place::LastIndex(array) => array.borrow_mut().set_last_index(value.as_int()),
            Place::Array(_) | Place::Hash(_) | Place::List(_) => self.assign_list(vec![value])?,
            Place::Discard => {}
        }
        Ok(())
    }

    /// List assignment. Scalars take one value each in order; the first
    /// array or hash takes everything that is left.
    pub(crate) fn assign_list(&self, values: Vec<Value>) -> Result<(), EvalError> {
        match self {
            Place::Array(array) => array.borrow_mut().assign(values),
            Place::Hash(hash) => hash.borrow_mut().assign_pairs(values),
            Place::List(places) => {
                let mut rest = values.into_iter();
                for place in places {
                    match place {
                        Place::Array(_) | Place::Hash(_) | Place::List(_) => {
                            place.assign_list(rest.by_ref().collect())?;
                        }
                        _ => place.store(rest.next().unwrap_or(Value::Undef))?,
                    }
                }
            }
            _ => self.store(values.into_iter().next().unwrap_or(Value::Undef))?,
        }
        Ok(())
    }

    /// Current contents as a list.
    pub(crate) fn values(&self) -> Vec<Value> {
        match self {
            Place::Array(array) => array.borrow().to_vec(),
            Place::Hash(hash) => hash.borrow().to_pairs(),
            Place::List(places) => places.iter().flat_map(Place::values).collect(),
            Place::Discard => Vec::new(),
            _ => vec![self.fetch()],
        }
    }
}

/// Whether `target = value` is a list assignment.
pub(crate) fn is_list_target(target: &Expr) -> bool {
    match target {
        Expr::Var(Sigil::Array | Sigil::Hash, _)
        | Expr::List(_)
        | Expr::Slice { .. }
        | Expr::HashSlice { .. }
        | Expr::Special(Special::ArgList)
        | Expr::Deref {
            sigil: Sigil::Array | Sigil::Hash,
            ..
        } => true,
        Expr::My(decl) => {
            decl.parenthesized
                || decl
                    .vars
                    .first()
                    .is_some_and(|(sigil, _)| matches!(sigil, Sigil::Array | Sigil::Hash))
        }
        _ => false,
    }
}

/// Whether `expr` denotes a storage location that can be vivified.
fn is_scalar_place(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Var(Sigil::Scalar, _)
            | Expr::Special(Special::Topic)
            | Expr::Element { .. }
            | Expr::Entry { .. }
            | Expr::ArrowIndex { .. }
            | Expr::ArrowKey { .. }
            | Expr::Deref {
                sigil: Sigil::Scalar,
                ..
            }
            | Expr::My(_)
    )
}

impl Interpreter {
    /// Resolve `expr` to a place for writing, creating intermediate
    /// containers on the way.
    pub(crate) fn resolve_place(&mut self, expr: &Expr) -> Result<Place, EvalError> {
        let place = match expr {
            Expr::Var(Sigil::Scalar, name) => Place::Scalar(self.scalar_cell(name)),
            Expr::Var(Sigil::Array, name) => Place::Array(self.array_cell(name)),
            Expr::Var(Sigil::Hash, name) => Place::Hash(self.hash_cell(name)),
            Expr::Special(Special::Topic) => Place::Scalar(self.topic_cell()),
            Expr::Special(Special::ArgList) => Place::Array(self.args_cell()),

            Expr::Element { array, index } => {
                let index = self.eval_scalar(index)?.as_int();
                Place::Element(self.array_cell(array), index)
            }
            Expr::Entry { hash, key } => {
                let key = self.eval_scalar(key)?.as_string();
                Place::Entry(self.hash_cell(hash), key)
            }
            Expr::ArrowIndex { base, index } => {
                let array = self.vivify_array(base)?;
                let index = self.eval_scalar(index)?.as_int();
                Place::Element(array, index)
            }
            Expr::ArrowKey { base, key } => {
                let hash = self.vivify_hash(base)?;
                let key = self.eval_scalar(key)?.as_string();
                Place::Entry(hash, key)
            }
            Expr::Slice { base, indices } => {
                let array = self.array_container(base, true)?.unwrap_or_default();
                let places = self
                    .eval_list(indices)?
                    .iter()
                    .map(|i| Place::Element(array.clone(), i.as_int()))
                    .collect();
                Place::List(places)
            }
            Expr::HashSlice { base, keys } => {
                let hash = self.hash_container(base, true)?.unwrap_or_default();
                let places = self
                    .eval_list(keys)?
                    .iter()
                    .map(|k| Place::Entry(hash.clone(), k.as_string()))
                    .collect();
                Place::List(places)
            }
            Expr::LastIndex(base) => {
                Place::LastIndex(self.array_container(base, true)?.unwrap_or_default())
            }

            Expr::Deref { sigil, expr } => match sigil {
                Sigil::Scalar => Place::Scalar(self.vivify_scalar(expr)?),
                Sigil::Array => Place::Array(self.vivify_array(expr)?),
                Sigil::Hash => Place::Hash(self.vivify_hash(expr)?),
                Sigil::Code => return Err(EvalError::new("Can't modify non-lvalue subroutine call")),
            },

            Expr::My(decl) => self.declare(decl),
            Expr::List(items) => Place::List(
                items
                    .iter()
                    .map(|item| self.resolve_place(item))
                    .collect::<Result<_, _>>()?,
            ),
            Expr::Literal(camel_ir::Literal::Undef) => Place::Discard,

            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                if self.eval_scalar(cond)?.is_true() {
                    self.resolve_place(then_expr)?
                } else {
                    self.resolve_place(else_expr)?
                }
            }

            // `($copy = $orig) =~ s/a/b/` modifies the copy
            Expr::Assign { target, .. } => {
                self.eval_scalar(expr)?;
                self.resolve_place(target)?
            }

            _ => {
                return Err(EvalError::new(
                    "Can't modify non-lvalue expression in assignment",
                ))
            }
        };
        Ok(place)
    }

    // Container access

    /// Value of the reference expression `base`; when `base` is an
    /// undefined variable or element, a fresh container made by `create`
    /// is stored there first.
    fn vivify_ref(
        &mut self,
        base: &Expr,
        create: impl FnOnce() -> RefTarget,
    ) -> EvalResult {
        if !is_scalar_place(base) {
            return self.eval_scalar(base);
        }
        let place = self.resolve_place(base)?;
        let current = place.fetch();
        if current.is_defined() {
            return Ok(current);
        }
        let fresh = Value::Ref(create());
        place.store(fresh.clone())?;
        Ok(fresh)
    }

    pub(crate) fn vivify_array(&mut self, base: &Expr) -> Result<ArrayCell, EvalError> {
        let value = self.vivify_ref(base, || RefTarget::Array(Container::new(Array::new())))?;
        Ok(self.deref_array(&value)?.unwrap_or_default())
    }

    pub(crate) fn vivify_hash(&mut self, base: &Expr) -> Result<HashCell, EvalError> {
        let value = self.vivify_ref(base, || RefTarget::Hash(Container::new(Hash::new())))?;
        Ok(self.deref_hash(&value)?.unwrap_or_default())
    }

    fn vivify_scalar(&mut self, base: &Expr) -> Result<ScalarCell, EvalError> {
        let value = self.vivify_ref(base, || RefTarget::Scalar(Container::new(Value::Undef)))?;
        Ok(self
            .deref_scalar(&value)?
            .unwrap_or_else(|| Container::new(Value::Undef)))
    }

    /// The array `value` refers to. `Undef` refers to nothing; a plain
    /// string names a global array.
    pub(crate) fn deref_array(&mut self, value: &Value) -> Result<Option<ArrayCell>, EvalError> {
        match value {
            Value::Ref(RefTarget::Array(cell)) => Ok(Some(cell.clone())),
            Value::Undef => Ok(None),
            Value::Str(name) if !name.is_empty() => {
                let qualified = self.qualified(name);
                Ok(Some(self.global_array(&qualified)))
            }
            other => Err(not_a_reference("an ARRAY", other)),
        }
    }

    pub(crate) fn deref_hash(&self, value: &Value) -> Result<Option<HashCell>, EvalError> {
        match value {
            Value::Ref(RefTarget::Hash(cell)) => Ok(Some(cell.clone())),
            Value::Undef => Ok(None),
            Value::Str(name) if !name.is_empty() => {
                Ok(Some(self.env.global_hash(&self.qualified(name))))
            }
            other => Err(not_a_reference("a HASH", other)),
        }
    }

    pub(crate) fn deref_scalar(&self, value: &Value) -> Result<Option<ScalarCell>, EvalError> {
        match value {
            Value::Ref(RefTarget::Scalar(cell)) => Ok(Some(cell.clone())),
            Value::Undef => Ok(None),
            Value::Str(name) if !name.is_empty() => {
                Ok(Some(self.env.global_scalar(&self.qualified(name))))
            }
            other => Err(not_a_reference("a SCALAR", other)),
        }
    }

    /// The array named by an `@`-form operand: `@a`, `@{$r}`, `@_`, or an
    /// expression yielding an array reference.
    pub(crate) fn array_container(
        &mut self,
        base: &Expr,
        vivify: bool,
    ) -> Result<Option<ArrayCell>, EvalError> {
        match base {
            Expr::Var(Sigil::Array, name) => Ok(Some(self.array_cell(name))),
            Expr::Special(Special::ArgList) => Ok(Some(self.args_cell())),
            Expr::My(decl) => match self.declare(decl) {
                Place::Array(cell) => Ok(Some(cell)),
                _ => Ok(None),
            },
            Expr::Deref {
                sigil: Sigil::Array,
                expr,
            } => self.array_behind(expr, vivify),
            other => self.array_behind(other, vivify),
        }
    }

    /// The hash named by a `%`-form operand.
    pub(crate) fn hash_container(
        &mut self,
        base: &Expr,
        vivify: bool,
    ) -> Result<Option<HashCell>, EvalError> {
        match base {
            Expr::Var(Sigil::Hash, name) => Ok(Some(self.hash_cell(name))),
            Expr::Deref {
                sigil: Sigil::Hash,
                expr,
            } => self.hash_behind(expr, vivify),
            other => self.hash_behind(other, vivify),
        }
    }

    /// The array a reference-valued expression points at.
    pub(crate) fn array_behind(
        &mut self,
        base: &Expr,
        vivify: bool,
    ) -> Result<Option<ArrayCell>, EvalError> {
        if vivify {
            return self.vivify_array(base).map(Some);
        }
        let value = self.eval_scalar(base)?;
        self.deref_array(&value)
    }

    pub(crate) fn hash_behind(
        &mut self,
        base: &Expr,
        vivify: bool,
    ) -> Result<Option<HashCell>, EvalError> {
        if vivify {
            return self.vivify_hash(base).map(Some);
        }
        let value = self.eval_scalar(base)?;
        self.deref_hash(&value)
    }

    // Assignment

    pub(crate) fn eval_assign(
        &mut self,
        op: Option<BinaryOp>,
        target: &Expr,
        value: &Expr,
        want: Want,
    ) -> Result<Values, EvalError> {
        let Some(op) = op else {
            return self.eval_plain_assign(target, value, want);
        };

        let place = self.resolve_place(target)?;
        let current = place.fetch();
        let updated = match op {
            BinaryOp::And if !current.is_true() => return Ok(smallvec::smallvec![current]),
            BinaryOp::Or if current.is_true() => return Ok(smallvec::smallvec![current]),
            BinaryOp::DefinedOr if current.is_defined() => return Ok(smallvec::smallvec![current]),
            BinaryOp::And | BinaryOp::Or | BinaryOp::DefinedOr => self.eval_scalar(value)?,
            _ => {
                let rhs = self.eval_scalar(value)?;
                evaluate_binary(&current, &rhs, op)?
            }
        };
        place.store(updated.clone())?;
        Ok(smallvec::smallvec![updated])
    }

    /// `target = value`. The right side is evaluated first, in the context
    /// the left side imposes.
    fn eval_plain_assign(
        &mut self,
        target: &Expr,
        value: &Expr,
        want: Want,
    ) -> Result<Values, EvalError> {
        if is_list_target(target) {
            let values = self.eval_list(value)?;
            let count = values.len();
            let place = self.resolve_place(target)?;
            place.assign_list(values)?;
            return Ok(match want {
                Want::Scalar => smallvec::smallvec![Value::Int(count as i64)],
                Want::List => place.values().into_iter().collect(),
            });
        }

        let value = self.eval_scalar(value)?;
        let place = self.resolve_place(target)?;
        place.store(value.clone())?;
        Ok(smallvec::smallvec![value])
    }

    /// `++`/`--`, prefix or postfix. Increment of a non-numeric string is
    /// the magic string increment.
    pub(crate) fn eval_inc_dec(&mut self, op: IncDec, target: &Expr) -> EvalResult {
        let place = self.resolve_place(target)?;
        let old = place.fetch();
        let new = step(&old, op.is_increment());
        place.store(new.clone())?;
        if !op.is_postfix() {
            return Ok(new);
        }
        Ok(if old.is_undef() { Value::Int(0) } else { old })
    }
}
