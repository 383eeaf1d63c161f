//! Package registry: subroutine tables and `@ISA` inheritance.
//!
//! Every named sub is stored under its qualified name (`Pkg::name`); a
//! package's method table is simply the set of subs qualified by it.
//!
//! Each package's `@ISA` is an ordinary array container. The same container
//! is installed as the global `@Pkg::ISA`, so `our @ISA = (...)`,
//! `push @ISA, ...` and `use parent` all edit the list that method
//! resolution reads; there is no separate copy to keep in sync.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use camel_value::{Array, ArrayCell, CodeCell, Container, Value};

/// Packages in method resolution order. Most hierarchies are shallow.
pub type Linearization = SmallVec<[String; 8]>;

/// Join a package and a name: `qualify("Dog", "speak")` is `Dog::speak`.
pub fn qualify(package: &str, name: &str) -> String {
    format!("{package}::{name}")
}

/// Split `Pkg::Sub::name` into (`Pkg::Sub`, `name`). Unqualified names
/// have no package part.
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.rfind("::") {
        Some(pos) => (Some(&name[..pos]), &name[pos + 2..]),
        None => (None, name),
    }
}

#[derive(Default)]
pub struct PackageRegistry {
    subs: FxHashMap<String, CodeCell>,
    isa: FxHashMap<String, ArrayCell>,
}

impl PackageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or redefine) the sub `qualified`.
    pub fn define_sub(&mut self, qualified: &str, code: CodeCell) {
        tracing::debug!(sub = qualified, "registered sub");
        self.subs.insert(qualified.to_string(), code);
    }

    pub fn find_sub(&self, qualified: &str) -> Option<CodeCell> {
        self.subs.get(qualified).cloned()
    }

    /// Whether `package` has any subs or an `@ISA`.
    pub fn is_known_package(&self, package: &str) -> bool {
        self.isa.contains_key(package) || {
            let prefix = format!("{package}::");
            self.subs.keys().any(|k| k.starts_with(&prefix))
        }
    }

    /// The `@ISA` container of `package`, created empty on first use.
    pub fn isa_cell(&mut self, package: &str) -> ArrayCell {
        self.isa
            .entry(package.to_string())
            .or_insert_with(|| Container::new(Array::new()))
            .clone()
    }

    /// Replace `package`'s parent list.
    pub fn set_isa(&mut self, package: &str, parents: &[String]) {
        tracing::debug!(package, ?parents, "set @ISA");
        let items = parents.iter().map(|p| Value::string(p.as_str())).collect();
        self.isa_cell(package).borrow_mut().assign(items);
    }

    /// Direct parents, in declared order.
    pub fn parents(&self, package: &str) -> Vec<String> {
        self.isa.get(package).map_or_else(Vec::new, |cell| {
            cell.borrow().iter().map(Value::as_string).collect()
        })
    }

    /// Depth-first, left-to-right order starting at `package` itself.
    /// Packages reachable twice (diamonds) or through a cycle appear once.
    pub fn linearize(&self, package: &str) -> Linearization {
        let mut order = Linearization::new();
        let mut seen = FxHashSet::default();
        self.visit(package, &mut seen, &mut order);
        order
    }

    fn visit(&self, package: &str, seen: &mut FxHashSet<String>, order: &mut Linearization) {
        if !seen.insert(package.to_string()) {
            return;
        }
        order.push(package.to_string());
        for parent in self.parents(package) {
            self.visit(&parent, seen, order);
        }
    }

    /// First package in `order` that defines `method`.
    fn find_in(&self, order: &[String], method: &str) -> Option<(CodeCell, String)> {
        order.iter().find_map(|package| {
            self.subs
                .get(&qualify(package, method))
                .map(|code| (code.clone(), package.clone()))
        })
    }

    /// Method resolution: own table first, then each parent's hierarchy in
    /// declared order. Returns the code and the package that defined it.
    pub fn resolve_method(&self, package: &str, method: &str) -> Option<(CodeCell, String)> {
        self.find_in(&self.linearize(package), method)
    }

    /// `SUPER::method` from code compiled in `enclosing`: the same search,
    /// started at `enclosing`'s parents.
    pub fn resolve_super(&self, enclosing: &str, method: &str) -> Option<(CodeCell, String)> {
        let mut order = Linearization::new();
        let mut seen = FxHashSet::default();
        seen.insert(enclosing.to_string());
        for parent in self.parents(enclosing) {
            self.visit(&parent, &mut seen, &mut order);
        }
        self.find_in(&order, method)
    }

    /// Whether `package` is `target` or inherits from it.
    pub fn isa(&self, package: &str, target: &str) -> bool {
        self.linearize(package).iter().any(|p| p == target)
    }
}
