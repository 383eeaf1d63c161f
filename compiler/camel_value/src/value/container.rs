//! Containers: arrays, hashes, scalar cells and code, behind shared handles.
//!
//! Every container lives behind a [`Container`] handle. The handle is the
//! container's identity: two handles are the same container iff
//! [`Container::ptr_eq`] holds. Package blessing, the scalar `/g` match
//! position and the hash `each` cursor are attached to the container
//! itself, so they follow identity and not any particular reference value.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use camel_ir::{Block, Sigil};
use rustc_hash::FxHashMap;

use super::Value;

struct Node<T> {
    data: RefCell<T>,
    package: RefCell<Option<Rc<str>>>,
    match_position: Cell<Option<usize>>,
}

/// Shared, identity-carrying handle to a container.
///
/// Single-threaded by construction (`Rc`); the evaluator never shares
/// values across threads.
pub struct Container<T>(Rc<Node<T>>);

impl<T> Container<T> {
    pub fn new(data: T) -> Self {
        Container(Rc::new(Node {
            data: RefCell::new(data),
            package: RefCell::new(None),
            match_position: Cell::new(None),
        }))
    }

    #[inline]
    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.data.borrow()
    }

    /// Mutable access. Any write forgets the `/g` match position.
    #[inline]
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.match_position.set(None);
        self.0.data.borrow_mut()
    }

    /// Identity comparison.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Stable address, used for stringification and numeric coercion.
    #[inline]
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0).cast::<()>() as usize
    }

    /// Package this container was blessed into, if any.
    pub fn blessed(&self) -> Option<Rc<str>> {
        self.0.package.borrow().clone()
    }

    /// Record `package` for this container, replacing any earlier blessing.
    pub fn bless(&self, package: &str) {
        *self.0.package.borrow_mut() = Some(Rc::from(package));
    }

    /// Byte offset where the next scalar-context `/g` match resumes.
    #[inline]
    pub fn match_position(&self) -> Option<usize> {
        self.0.match_position.get()
    }

    #[inline]
    pub fn set_match_position(&self, position: Option<usize>) {
        self.0.match_position.set(position);
    }
}

/// Non-owning handle; does not keep the container alive.
pub struct WeakContainer<T>(Weak<Node<T>>);

impl<T> Container<T> {
    pub fn downgrade(&self) -> WeakContainer<T> {
        WeakContainer(Rc::downgrade(&self.0))
    }
}

impl<T> WeakContainer<T> {
    /// Whether some [`Container`] handle still holds the container.
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl<T> Clone for Container<T> {
    #[inline]
    fn clone(&self) -> Self {
        Container(Rc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Container<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Container({:#x})", self.addr())
    }
}

impl<T: Default> Default for Container<T> {
    fn default() -> Self {
        Container::new(T::default())
    }
}

pub type ScalarCell = Container<Value>;
pub type ArrayCell = Container<Array>;
pub type HashCell = Container<Hash>;
pub type CodeCell = Container<Subroutine>;

/// What a reference points at.
#[derive(Clone, Debug)]
pub enum RefTarget {
    Scalar(ScalarCell),
    Array(ArrayCell),
    Hash(HashCell),
    Code(CodeCell),
}

impl RefTarget {
    /// Structural tag as reported by `ref` for unblessed references.
    pub fn kind_name(&self) -> &'static str {
        match self {
            RefTarget::Scalar(_) => "SCALAR",
            RefTarget::Array(_) => "ARRAY",
            RefTarget::Hash(_) => "HASH",
            RefTarget::Code(_) => "CODE",
        }
    }

    pub fn addr(&self) -> usize {
        match self {
            RefTarget::Scalar(c) => c.addr(),
            RefTarget::Array(c) => c.addr(),
            RefTarget::Hash(c) => c.addr(),
            RefTarget::Code(c) => c.addr(),
        }
    }

    pub fn ptr_eq(&self, other: &RefTarget) -> bool {
        self.addr() == other.addr()
    }

    pub fn blessed(&self) -> Option<Rc<str>> {
        match self {
            RefTarget::Scalar(c) => c.blessed(),
            RefTarget::Array(c) => c.blessed(),
            RefTarget::Hash(c) => c.blessed(),
            RefTarget::Code(c) => c.blessed(),
        }
    }

    pub fn bless(&self, package: &str) {
        match self {
            RefTarget::Scalar(c) => c.bless(package),
            RefTarget::Array(c) => c.bless(package),
            RefTarget::Hash(c) => c.bless(package),
            RefTarget::Code(c) => c.bless(package),
        }
    }

    /// `HASH(0x...)`, or `Pkg=HASH(0x...)` once blessed.
    pub fn describe(&self) -> String {
        let base = format!("{}({:#x})", self.kind_name(), self.addr());
        match self.blessed() {
            Some(package) => format!("{package}={base}"),
            None => base,
        }
    }
}

/// Ordered, index-addressable sequence.
///
/// Reads never fail: out-of-range indices read as `Undef`. Writes past the
/// end pad with `Undef`. Negative indices count from the end.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Array {
    items: Vec<Value>,
}

impl Array {
    pub fn new() -> Self {
        Array { items: Vec::new() }
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Array { items }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// An array is true when it has elements.
    #[inline]
    pub fn is_true(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.items.clone()
    }

    /// Map a possibly negative index to a position, if it addresses an
    /// existing element.
    fn position(&self, index: i64) -> Option<usize> {
        let len = self.items.len() as i64;
        let pos = if index < 0 { len + index } else { index };
        (0..len).contains(&pos).then_some(pos as usize)
    }

    pub fn fetch(&self, index: i64) -> Value {
        self.position(index)
            .map_or(Value::Undef, |pos| self.items[pos].clone())
    }

    /// Store at `index`, padding with `Undef` as needed.
    ///
    /// Returns `false` (and stores nothing) when a negative index reaches
    /// before the first element.
    pub fn store(&mut self, index: i64, value: Value) -> bool {
        let pos = if index < 0 {
            let pos = self.items.len() as i64 + index;
            if pos < 0 {
                return false;
            }
            pos as usize
        } else {
            index as usize
        };
        if pos >= self.items.len() {
            self.items.resize(pos + 1, Value::Undef);
        }
        self.items[pos] = value;
        true
    }

    pub fn exists(&self, index: i64) -> bool {
        self.position(index).is_some()
    }

    /// Remove the element at `index`: the last element shrinks the array,
    /// any other becomes `Undef`.
    pub fn delete(&mut self, index: i64) -> Value {
        let Some(pos) = self.position(index) else {
            return Value::Undef;
        };
        if pos + 1 == self.items.len() {
            self.items.pop().unwrap_or(Value::Undef)
        } else {
            std::mem::replace(&mut self.items[pos], Value::Undef)
        }
    }

    /// Append values; returns the new length.
    pub fn push(&mut self, values: impl IntoIterator<Item = Value>) -> usize {
        self.items.extend(values);
        self.items.len()
    }

    pub fn pop(&mut self) -> Value {
        self.items.pop().unwrap_or(Value::Undef)
    }

    pub fn shift(&mut self) -> Value {
        if self.items.is_empty() {
            Value::Undef
        } else {
            self.items.remove(0)
        }
    }

    /// Prepend values (keeping their order); returns the new length.
    pub fn unshift(&mut self, values: Vec<Value>) -> usize {
        self.items.splice(0..0, values);
        self.items.len()
    }

    /// Remove `length` elements from `offset` (default: to the end) and
    /// insert `replacement` in their place. Returns the removed elements.
    pub fn splice(
        &mut self,
        offset: i64,
        length: Option<i64>,
        replacement: Vec<Value>,
    ) -> Vec<Value> {
        let len = self.items.len() as i64;
        let start = if offset < 0 { (len + offset).max(0) } else { offset.min(len) };
        let end = match length {
            None => len,
            Some(n) if n < 0 => (len + n).max(start),
            Some(n) => (start + n).min(len),
        };
        self.items
            .splice(start as usize..end as usize, replacement)
            .collect()
    }

    /// Resize so that the last index is `last` (`$#a = n`).
    pub fn set_last_index(&mut self, last: i64) {
        let new_len = (last + 1).max(0) as usize;
        self.items.resize(new_len, Value::Undef);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Replace the whole contents.
    pub fn assign(&mut self, items: Vec<Value>) {
        self.items = items;
    }

    /// Stringify each element and join with `sep`.
    pub fn join(&self, sep: &str) -> String {
        let parts: Vec<String> = self.items.iter().map(Value::as_string).collect();
        parts.join(sep)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }
}

/// String-keyed mapping with a destructive `each` cursor.
///
/// `keys`/`values` return a snapshot for that call only; no order is
/// promised across calls.
#[derive(Clone, Debug, Default)]
pub struct Hash {
    entries: FxHashMap<String, Value>,
    cursor: Option<VecDeque<String>>,
}

impl Hash {
    pub fn new() -> Self {
        Hash::default()
    }

    /// Build from a flattened `key, value, key, value, ...` list. A trailing
    /// key without a value maps to `Undef`; later duplicates win.
    pub fn from_pairs(flat: Vec<Value>) -> Self {
        let mut hash = Hash::new();
        hash.assign_pairs(flat);
        hash
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A hash is true when it has keys.
    #[inline]
    pub fn is_true(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn fetch(&self, key: &str) -> Value {
        self.entries.get(key).cloned().unwrap_or(Value::Undef)
    }

    pub fn store(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn exists(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn delete(&mut self, key: &str) -> Value {
        self.entries.remove(key).unwrap_or(Value::Undef)
    }

    /// Key snapshot. Like the language's `keys`, this also resets the
    /// `each` cursor.
    pub fn keys(&mut self) -> Vec<String> {
        self.cursor = None;
        self.entries.keys().cloned().collect()
    }

    /// Value snapshot, in the same order `keys` would produce.
    pub fn values(&self) -> Vec<Value> {
        self.entries.values().cloned().collect()
    }

    /// Next `(key, value)` pair from this hash's cursor.
    ///
    /// The first call of a cycle snapshots the current keys; later calls
    /// consume that snapshot front to back, skipping keys deleted in the
    /// meantime. When the snapshot runs out the call returns `None` and
    /// drops the cursor, so the following call starts a fresh cycle. Every
    /// key present for the whole cycle surfaces exactly once.
    pub fn each(&mut self) -> Option<(String, Value)> {
        let entries = &self.entries;
        let cursor = self
            .cursor
            .get_or_insert_with(|| entries.keys().cloned().collect());
        while let Some(key) = cursor.pop_front() {
            if let Some(value) = entries.get(&key) {
                return Some((key, value.clone()));
            }
        }
        self.cursor = None;
        None
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    /// Replace the contents from a flattened pair list.
    pub fn assign_pairs(&mut self, flat: Vec<Value>) {
        self.clear();
        let mut iter = flat.into_iter();
        while let Some(key) = iter.next() {
            let value = iter.next().unwrap_or(Value::Undef);
            self.entries.insert(key.as_string(), value);
        }
    }

    /// Flatten to `key, value, ...` (list-context evaluation of `%h`).
    pub fn to_pairs(&self) -> Vec<Value> {
        self.entries
            .iter()
            .flat_map(|(k, v)| [Value::string(k.as_str()), v.clone()])
            .collect()
    }
}

/// A subroutine body plus what it closed over.
pub struct Subroutine {
    /// Fully qualified name (`Pkg::name`); `None` for anonymous subs.
    pub name: Option<Rc<str>>,
    /// Package the body was compiled in; `SUPER::` searches its parents.
    pub package: Rc<str>,
    pub body: Rc<Block>,
    /// Slots visible where an anonymous sub was created.
    pub captures: Pad,
}

impl Subroutine {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("__ANON__")
    }
}

impl fmt::Debug for Subroutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subroutine")
            .field("name", &self.display_name())
            .field("package", &self.package)
            .finish_non_exhaustive()
    }
}

/// A named variable slot.
#[derive(Clone, Debug)]
pub enum Slot {
    Scalar(ScalarCell),
    Array(ArrayCell),
    Hash(HashCell),
}

/// Lexical scratchpad: one namespace per sigil.
///
/// `$x`, `@x` and `%x` are unrelated slots that happen to share a name.
#[derive(Clone, Debug, Default)]
pub struct Pad {
    scalars: FxHashMap<Rc<str>, ScalarCell>,
    arrays: FxHashMap<Rc<str>, ArrayCell>,
    hashes: FxHashMap<Rc<str>, HashCell>,
}

impl Pad {
    pub fn new() -> Self {
        Pad::default()
    }

    pub fn get(&self, sigil: Sigil, name: &str) -> Option<Slot> {
        match sigil {
            Sigil::Scalar => self.scalars.get(name).cloned().map(Slot::Scalar),
            Sigil::Array => self.arrays.get(name).cloned().map(Slot::Array),
            Sigil::Hash => self.hashes.get(name).cloned().map(Slot::Hash),
            Sigil::Code => None,
        }
    }

    pub fn scalar(&self, name: &str) -> Option<&ScalarCell> {
        self.scalars.get(name)
    }

    pub fn array(&self, name: &str) -> Option<&ArrayCell> {
        self.arrays.get(name)
    }

    pub fn hash(&self, name: &str) -> Option<&HashCell> {
        self.hashes.get(name)
    }

    /// Bind `name` to `slot`, shadowing any earlier binding of the same
    /// sigil and name in this pad.
    pub fn insert(&mut self, name: &str, slot: Slot) {
        let name: Rc<str> = Rc::from(name);
        match slot {
            Slot::Scalar(c) => {
                self.scalars.insert(name, c);
            }
            Slot::Array(c) => {
                self.arrays.insert(name, c);
            }
            Slot::Hash(c) => {
                self.hashes.insert(name, c);
            }
        }
    }

    /// Copy every binding of `other` that this pad does not already have.
    pub fn absorb(&mut self, other: &Pad) {
        for (k, v) in &other.scalars {
            self.scalars.entry(Rc::clone(k)).or_insert_with(|| v.clone());
        }
        for (k, v) in &other.arrays {
            self.arrays.entry(Rc::clone(k)).or_insert_with(|| v.clone());
        }
        for (k, v) in &other.hashes {
            self.hashes.entry(Rc::clone(k)).or_insert_with(|| v.clone());
        }
    }

    /// Every binding, for installing captured slots into a call frame.
    pub fn slots(&self) -> impl Iterator<Item = (&str, Slot)> + '_ {
        let scalars = self
            .scalars
            .iter()
            .map(|(k, v)| (&**k, Slot::Scalar(v.clone())));
        let arrays = self
            .arrays
            .iter()
            .map(|(k, v)| (&**k, Slot::Array(v.clone())));
        let hashes = self
            .hashes
            .iter()
            .map(|(k, v)| (&**k, Slot::Hash(v.clone())));
        scalars.chain(arrays).chain(hashes)
    }

    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty() && self.arrays.is_empty() && self.hashes.is_empty()
    }
}
