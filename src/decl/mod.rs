//! Declaration tree produced by the parser collaborator.
//!
//! A `DeclTree` is an arena of `Declaration`s rooted at the global namespace
//! (node 0). Parent links are plain indices, so a node never owns its parent.
//! Once a parser hands a tree over it is only read; selection state is kept
//! beside it in `rules::Selection`.

pub mod dump;
pub mod types;

use std::fmt;

use serde::Serialize;

pub use types::{TypeRef, TypeShape};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Namespace,
    Class,
    Function,
    Enum,
    Variable,
}

impl DeclKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclKind::Namespace => "namespace",
            DeclKind::Class => "class",
            DeclKind::Function => "function",
            DeclKind::Enum => "enum",
            DeclKind::Variable => "variable",
        }
    }

    pub fn from_str(s: &str) -> Option<DeclKind> {
        match s {
            "namespace" => Some(DeclKind::Namespace),
            "class" | "struct" => Some(DeclKind::Class),
            "function" | "method" => Some(DeclKind::Function),
            "enum" => Some(DeclKind::Enum),
            "variable" | "field" => Some(DeclKind::Variable),
            _ => None,
        }
    }

    /// Kinds that own member declarations.
    pub fn is_scope(&self) -> bool {
        matches!(self, DeclKind::Namespace | DeclKind::Class | DeclKind::Enum)
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Public,
    Protected,
    Private,
}

impl Access {
    pub fn from_str(s: &str) -> Option<Access> {
        match s {
            "public" => Some(Access::Public),
            "protected" => Some(Access::Protected),
            "private" => Some(Access::Private),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Declaration {
    pub kind: DeclKind,
    pub name: String,
    /// `::`-joined path from the global namespace, e.g. `anim::CStudioHdr::GetSequence`.
    pub qualified_name: String,
    pub return_type: Option<TypeRef>,
    pub arg_types: Vec<TypeRef>,
    /// Only class members carry an access specifier.
    pub access: Option<Access>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Declaration {
    /// Return type followed by argument types, in signature order.
    pub fn signature_types(&self) -> impl Iterator<Item = &TypeRef> {
        self.return_type.iter().chain(self.arg_types.iter())
    }
}

/// Input for `DeclTree::add`.
#[derive(Debug, Clone)]
pub struct NewDecl {
    pub kind: DeclKind,
    pub name: String,
    pub return_type: Option<TypeRef>,
    pub arg_types: Vec<TypeRef>,
    pub access: Option<Access>,
}

impl NewDecl {
    pub fn new(kind: DeclKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            return_type: None,
            arg_types: Vec::new(),
            access: None,
        }
    }

    pub fn namespace(name: impl Into<String>) -> Self {
        Self::new(DeclKind::Namespace, name)
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(DeclKind::Class, name)
    }

    pub fn function(name: impl Into<String>, returns: &str, args: &[&str]) -> Self {
        let mut decl = Self::new(DeclKind::Function, name);
        decl.return_type = Some(TypeRef::new(returns));
        decl.arg_types = args.iter().map(|a| TypeRef::new(*a)).collect();
        decl
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = Some(access);
        self
    }
}

#[derive(Debug, Clone)]
pub struct DeclTree {
    nodes: Vec<Declaration>,
}

impl Default for DeclTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DeclTree {
    /// A tree holding only the global namespace.
    pub fn new() -> Self {
        Self {
            nodes: vec![Declaration {
                kind: DeclKind::Namespace,
                name: String::new(),
                qualified_name: String::new(),
                return_type: None,
                arg_types: Vec::new(),
                access: None,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn add(&mut self, parent: NodeId, decl: NewDecl) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent_decl = &self.nodes[parent.0];
        let qualified_name = if parent_decl.qualified_name.is_empty() {
            decl.name.clone()
        } else {
            format!("{}::{}", parent_decl.qualified_name, decl.name)
        };
        self.nodes.push(Declaration {
            kind: decl.kind,
            name: decl.name,
            qualified_name,
            return_type: decl.return_type,
            arg_types: decl.arg_types,
            access: decl.access,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn get(&self, id: NodeId) -> &Declaration {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when nothing besides the global namespace was declared.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Depth-first pre-order from the root, children in declaration order.
    pub fn walk(&self) -> Vec<NodeId> {
        self.walk_from(self.root())
    }

    /// Pre-order walk of `id` and everything beneath it.
    pub fn walk_from(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            order.push(next);
            stack.extend(self.nodes[next.0].children.iter().rev().copied());
        }
        order
    }

    /// Parent, grandparent, ... up to and including the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes[id.0].parent, move |p| self.nodes[p.0].parent)
    }

    /// First declaration with this qualified name, in pre-order.
    pub fn find_path(&self, qualified: &str) -> Option<NodeId> {
        let wanted = qualified.strip_prefix("::").unwrap_or(qualified);
        self.walk()
            .into_iter()
            .find(|id| *id != self.root() && self.nodes[id.0].qualified_name == wanted)
    }

    pub fn find_by_name(&self, name: &str) -> Vec<NodeId> {
        self.walk()
            .into_iter()
            .filter(|id| *id != self.root() && self.nodes[id.0].name == name)
            .collect()
    }

    pub fn child_named(&self, parent: NodeId, name: &str, kind: DeclKind) -> Option<NodeId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|c| self.nodes[c.0].name == name && self.nodes[c.0].kind == kind)
    }

    /// True when the declaration's parent is a class (a method or field).
    pub fn is_member(&self, id: NodeId) -> bool {
        self.nodes[id.0]
            .parent
            .is_some_and(|p| self.nodes[p.0].kind == DeclKind::Class)
    }

    /// True when some ancestor has the given qualified name.
    pub fn is_within(&self, id: NodeId, scope: &str) -> bool {
        let scope = scope.strip_prefix("::").unwrap_or(scope);
        self.ancestors(id)
            .any(|a| a != self.root() && self.nodes[a.0].qualified_name == scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DeclTree, NodeId, NodeId, NodeId) {
        let mut tree = DeclTree::new();
        let ns = tree.add(tree.root(), NewDecl::namespace("anim"));
        let class = tree.add(ns, NewDecl::class("CStudioHdr"));
        let method = tree.add(
            class,
            NewDecl::function("GetNumSeq", "int", &[]).with_access(Access::Public),
        );
        (tree, ns, class, method)
    }

    #[test]
    fn empty_means_only_the_root() {
        let mut tree = DeclTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 1);
        tree.add(tree.root(), NewDecl::namespace("anim"));
        assert!(!tree.is_empty());
    }

    #[test]
    fn qualified_names_follow_parents() {
        let (tree, ns, class, method) = sample();
        assert_eq!(tree.get(ns).qualified_name, "anim");
        assert_eq!(tree.get(class).qualified_name, "anim::CStudioHdr");
        assert_eq!(tree.get(method).qualified_name, "anim::CStudioHdr::GetNumSeq");
        assert_eq!(tree.get(method).parent, Some(class));
    }

    #[test]
    fn walk_is_preorder() {
        let mut tree = DeclTree::new();
        let a = tree.add(tree.root(), NewDecl::namespace("a"));
        let b = tree.add(tree.root(), NewDecl::namespace("b"));
        let a1 = tree.add(a, NewDecl::function("f", "void", &[]));
        assert_eq!(tree.walk(), vec![tree.root(), a, a1, b]);
        assert_eq!(tree.walk_from(a), vec![a, a1]);
    }

    #[test]
    fn lookups() {
        let (tree, ns, class, method) = sample();
        assert_eq!(tree.find_path("anim::CStudioHdr"), Some(class));
        assert_eq!(tree.find_path("::anim::CStudioHdr"), Some(class));
        assert_eq!(tree.find_path("CStudioHdr"), None);
        assert_eq!(tree.find_by_name("GetNumSeq"), vec![method]);
        assert_eq!(tree.child_named(tree.root(), "anim", DeclKind::Namespace), Some(ns));
        assert!(tree.is_member(method));
        assert!(!tree.is_member(class));
        assert!(tree.is_within(method, "anim"));
        assert!(!tree.is_within(ns, "anim"));
    }

    #[test]
    fn ancestors_end_at_root() {
        let (tree, ns, class, method) = sample();
        let chain: Vec<NodeId> = tree.ancestors(method).collect();
        assert_eq!(chain, vec![class, ns, tree.root()]);
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in [
            DeclKind::Namespace,
            DeclKind::Class,
            DeclKind::Function,
            DeclKind::Enum,
            DeclKind::Variable,
        ] {
            assert_eq!(DeclKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(DeclKind::from_str("struct"), Some(DeclKind::Class));
        assert_eq!(DeclKind::from_str("typedef"), None);
    }
}
