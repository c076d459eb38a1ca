use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::symbols::Symbol;

/// A lexical scope. Children point at their parent; parents never own children.
pub struct Scope {
    symbols: RefCell<HashMap<String, Symbol>>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    pub fn root() -> Rc<Self> {
        Rc::new(Self {
            symbols: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    pub fn child(parent: &Rc<Scope>) -> Rc<Self> {
        Rc::new(Self {
            symbols: RefCell::new(HashMap::new()),
            parent: Some(Rc::clone(parent)),
        })
    }

    pub fn parent(&self) -> Option<&Rc<Scope>> {
        self.parent.as_ref()
    }

    /// Inserts unconditionally; redeclaration checks belong to the caller.
    pub fn define(&self, name: impl Into<String>, symbol: Symbol) {
        self.symbols.borrow_mut().insert(name.into(), symbol);
    }

    /// Looks the name up here and then in every enclosing scope.
    pub fn resolve(&self, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.get(name) {
            return Some(symbol);
        }
        self.parent.as_ref().and_then(|parent| parent.resolve(name))
    }

    /// Looks the name up in this scope only.
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.symbols.borrow().get(name).cloned()
    }

    pub fn count(&self) -> usize {
        self.symbols.borrow().len()
    }

    /// Local symbols sorted by name.
    pub fn symbols(&self) -> Vec<(String, Symbol)> {
        let mut symbols: Vec<(String, Symbol)> = self
            .symbols
            .borrow()
            .iter()
            .map(|(name, symbol)| (name.clone(), symbol.clone()))
            .collect();
        symbols.sort_by(|a, b| a.0.cmp(&b.0));
        symbols
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.symbols.borrow().keys().cloned().collect();
        names.sort();
        f.debug_struct("Scope")
            .field("symbols", &names)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::VariableSymbol;
    use crate::types::Type;

    fn variable(name: &str, ty: Type) -> Symbol {
        Symbol::Variable(VariableSymbol::new(name, name, ty))
    }

    #[test]
    fn resolve_walks_parents_and_get_does_not() {
        let root = Scope::root();
        root.define("x", variable("x", Type::INT));
        let inner = Scope::child(&root);

        assert!(inner.resolve("x").is_some());
        assert!(inner.get("x").is_none());
        assert!(inner.resolve("y").is_none());
    }

    #[test]
    fn inner_definitions_shadow_outer_ones() {
        let root = Scope::root();
        root.define("x", variable("x", Type::INT));
        let inner = Scope::child(&root);
        inner.define("x", variable("x", Type::TEXT));

        match inner.resolve("x") {
            Some(Symbol::Variable(var)) => assert_eq!(var.ty, Type::TEXT),
            other => panic!("unexpected {:?}", other),
        }
        match root.resolve("x") {
            Some(Symbol::Variable(var)) => assert_eq!(var.ty, Type::INT),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn sibling_scopes_do_not_see_each_other() {
        let root = Scope::root();
        let first = Scope::child(&root);
        let second = Scope::child(&root);
        first.define("a", variable("a", Type::BOOL));

        assert!(first.resolve("a").is_some());
        assert!(second.resolve("a").is_none());
        assert_eq!(first.count(), 1);
        assert_eq!(second.count(), 0);
    }
}
