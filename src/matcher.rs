//! Declaration matchers: pure predicates over one node of a `DeclTree`.
//!
//! A `Matcher` is a small closed algebra: leaf predicates combined with
//! `And`, `Or` and `Not`. Evaluation never fails; a predicate that cannot
//! apply to a node (an access test on a free function, a type test on a
//! namespace) simply does not match.
//!
//! ## Type targets
//!
//! `TypeTarget::Resolved` compares structurally (`const char*` equals
//! `char const *`). `TypeTarget::Decl` compares the exact declaration
//! string: case-sensitive, no normalization, no partial matches.

use std::fmt;

use regex::Regex;

use crate::decl::{Access, DeclKind, DeclTree, Declaration, NodeId, TypeRef};

#[derive(Debug, Clone)]
pub enum TypeTarget {
    Resolved(TypeRef),
    Decl(String),
}

impl TypeTarget {
    fn accepts(&self, ty: &TypeRef) -> bool {
        match self {
            TypeTarget::Resolved(target) => target.same_type(ty),
            TypeTarget::Decl(spelling) => ty.spelling() == spelling,
        }
    }
}

/// A named plain function predicate, for hooks that need a test the
/// built-in predicates do not cover.
#[derive(Clone, Copy)]
pub struct CustomPredicate {
    pub label: &'static str,
    pub test: fn(&Declaration) -> bool,
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Custom({})", self.label)
    }
}

#[derive(Debug, Clone)]
pub enum Predicate {
    /// Unqualified name equals.
    Name(String),
    /// Qualified name equals (leading `::` ignored).
    QualifiedName(String),
    /// Unqualified name matches the regex.
    NameRegex(Regex),
    Kind(DeclKind),
    /// Parent is a class.
    Member,
    /// Declared somewhere inside the scope with this qualified name.
    Within(String),
    /// Return type or any argument type matches.
    Type(TypeTarget),
    /// Access specifier equals; never matches nodes without one.
    Access(Access),
    Custom(CustomPredicate),
}

impl Predicate {
    fn test(&self, tree: &DeclTree, id: NodeId) -> bool {
        let decl = tree.get(id);
        match self {
            Predicate::Name(name) => decl.name == *name,
            Predicate::QualifiedName(path) => {
                decl.qualified_name == path.strip_prefix("::").unwrap_or(path)
            }
            Predicate::NameRegex(re) => re.is_match(&decl.name),
            Predicate::Kind(kind) => decl.kind == *kind,
            Predicate::Member => tree.is_member(id),
            Predicate::Within(scope) => tree.is_within(id, scope),
            Predicate::Type(target) => decl.signature_types().any(|t| target.accepts(t)),
            Predicate::Access(access) => decl.access == Some(*access),
            Predicate::Custom(custom) => (custom.test)(decl),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Matcher {
    Leaf(Predicate),
    And(Vec<Matcher>),
    Or(Vec<Matcher>),
    Not(Box<Matcher>),
}

impl Matcher {
    pub fn matches(&self, tree: &DeclTree, id: NodeId) -> bool {
        match self {
            Matcher::Leaf(p) => p.test(tree, id),
            Matcher::And(all) => all.iter().all(|m| m.matches(tree, id)),
            Matcher::Or(any) => any.iter().any(|m| m.matches(tree, id)),
            Matcher::Not(inner) => !inner.matches(tree, id),
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Matcher::Leaf(Predicate::Name(name.into()))
    }

    pub fn path(path: impl Into<String>) -> Self {
        Matcher::Leaf(Predicate::QualifiedName(path.into()))
    }

    pub fn kind(kind: DeclKind) -> Self {
        Matcher::Leaf(Predicate::Kind(kind))
    }

    pub fn member() -> Self {
        Matcher::Leaf(Predicate::Member)
    }

    pub fn within(scope: impl Into<String>) -> Self {
        Matcher::Leaf(Predicate::Within(scope.into()))
    }

    pub fn access(access: Access) -> Self {
        Matcher::Leaf(Predicate::Access(access))
    }

    /// Structural type match against a parsed spelling.
    pub fn uses_type(spelling: &str) -> Self {
        Matcher::Leaf(Predicate::Type(TypeTarget::Resolved(TypeRef::new(spelling))))
    }

    /// Exact declaration-string type match.
    pub fn uses_type_decl(spelling: impl Into<String>) -> Self {
        Matcher::Leaf(Predicate::Type(TypeTarget::Decl(spelling.into())))
    }

    pub fn custom(label: &'static str, test: fn(&Declaration) -> bool) -> Self {
        Matcher::Leaf(Predicate::Custom(CustomPredicate { label, test }))
    }

    pub fn and(self, other: Matcher) -> Self {
        match self {
            Matcher::And(mut all) => {
                all.push(other);
                Matcher::And(all)
            }
            first => Matcher::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Matcher) -> Self {
        match self {
            Matcher::Or(mut any) => {
                any.push(other);
                Matcher::Or(any)
            }
            first => Matcher::Or(vec![first, other]),
        }
    }

    pub fn negate(self) -> Self {
        Matcher::Not(Box::new(self))
    }
}
