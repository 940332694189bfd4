//! Scope arena for the static inferencer.
//!
//! Every function definition gets its own node, but bindings resolve to the
//! nearest module or depth-one function scope: the symbol table only ever
//! sees `global` or a single top-level function name.

use serde::Serialize;

/// Label of the module scope in symbols and report rows.
pub const GLOBAL_SCOPE: &str = "global";

/// Index of a scope in a [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// What opened a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKind {
    /// The module namespace.
    Module,
    /// A function body.
    Function(String),
}

#[derive(Debug, Clone)]
struct Scope {
    kind: ScopeKind,
    parent: Option<ScopeId>,
    depth: usize,
}

/// Where the inferencer currently records bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ScopeState {
    /// Bindings go to the module scope.
    AtModuleScope,
    /// Bindings go to the named top-level function.
    InsideFunctionScope(String),
}

/// Arena of scopes with parent links.
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// Creates a tree holding only the module scope.
    pub fn new() -> Self {
        Self { scopes: vec![Scope { kind: ScopeKind::Module, parent: None, depth: 0 }] }
    }

    /// The module scope.
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Opens a function scope under `parent`.
    pub fn push_function(&mut self, parent: ScopeId, name: &str) -> ScopeId {
        let depth = self.scopes[parent.0].depth + 1;
        self.scopes.push(Scope {
            kind: ScopeKind::Function(name.to_string()),
            parent: Some(parent),
            depth,
        });
        ScopeId(self.scopes.len() - 1)
    }

    /// Parent of `id`, if any.
    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scopes[id.0].parent
    }

    /// The scope bindings made in `id` are recorded into.
    pub fn binding_scope(&self, mut id: ScopeId) -> ScopeId {
        while self.scopes[id.0].depth > 1 {
            match self.scopes[id.0].parent {
                Some(parent) => id = parent,
                None => break,
            }
        }
        id
    }

    /// Symbol-table label of the binding scope of `id`.
    pub fn label(&self, id: ScopeId) -> &str {
        match &self.scopes[self.binding_scope(id).0].kind {
            ScopeKind::Module => GLOBAL_SCOPE,
            ScopeKind::Function(name) => name,
        }
    }

    /// State corresponding to recording into `id`.
    pub fn state(&self, id: ScopeId) -> ScopeState {
        match &self.scopes[self.binding_scope(id).0].kind {
            ScopeKind::Module => ScopeState::AtModuleScope,
            ScopeKind::Function(name) => ScopeState::InsideFunctionScope(name.clone()),
        }
    }

    /// Distinct binding-scope labels from `id` outwards to the module.
    pub fn lookup_chain(&self, id: ScopeId) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        let mut current = Some(self.binding_scope(id));
        while let Some(scope) = current {
            let label = self.label(scope);
            if labels.last() != Some(&label) {
                labels.push(label);
            }
            current = self.parent(scope);
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_functions_flatten_to_top_level() {
        let mut tree = ScopeTree::new();
        let outer = tree.push_function(tree.root(), "outer");
        let inner = tree.push_function(outer, "inner");

        assert_eq!(tree.label(tree.root()), GLOBAL_SCOPE);
        assert_eq!(tree.label(outer), "outer");
        assert_eq!(tree.label(inner), "outer");
        assert_eq!(tree.state(inner), ScopeState::InsideFunctionScope("outer".into()));
        assert_eq!(tree.lookup_chain(inner), vec!["outer", GLOBAL_SCOPE]);
    }
}
