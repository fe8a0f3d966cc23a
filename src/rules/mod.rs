//! Ordered rule sets and the selection fold.
//!
//! Every node starts excluded. Rules are folded left to right and the last
//! matching rule wins:
//!
//! - `Include` / `Exclude` set inclusion on the matched node only. Members
//!   of a class are reached with `Selector::namespace`.
//! - `Rename` only takes effect on a node that is currently included, and
//!   never changes inclusion.
//! - `Transform` and `SuppressWarning` attach metadata whatever the
//!   inclusion state.
//!
//! A selector that matches nothing is a no-op, not an error.

pub mod selection;

use crate::decl::{DeclKind, DeclTree, NodeId};
use crate::error::RuleError;
use crate::matcher::Matcher;
use crate::module::{PassScope, Target};

pub use selection::{ExposedDecl, FilteredTree, Selection, SelectionState};

#[derive(Debug, Clone)]
pub enum Selector {
    /// Every node, the global namespace included.
    All,
    /// Unqualified name, any kind.
    Name(String),
    /// Qualified name; all overloads.
    Path(String),
    /// Everything declared inside the namespace (or class), not the scope itself.
    Namespace(String),
    Matching(Matcher),
}

impl Selector {
    pub fn name(name: impl Into<String>) -> Self {
        Selector::Name(name.into())
    }

    pub fn path(path: impl Into<String>) -> Self {
        Selector::Path(path.into())
    }

    pub fn namespace(scope: impl Into<String>) -> Self {
        Selector::Namespace(scope.into())
    }

    /// A function not declared inside a class.
    pub fn free_function(name: &str) -> Self {
        Selector::Matching(
            Matcher::kind(DeclKind::Function)
                .and(Matcher::member().negate())
                .and(Matcher::name(name)),
        )
    }

    pub fn member_function(name: &str) -> Self {
        Selector::Matching(
            Matcher::kind(DeclKind::Function)
                .and(Matcher::member())
                .and(Matcher::name(name)),
        )
    }

    pub fn class(name: &str) -> Self {
        Self::of_kind(DeclKind::Class, name)
    }

    pub fn enum_(name: &str) -> Self {
        Self::of_kind(DeclKind::Enum, name)
    }

    pub fn variable(name: &str) -> Self {
        Self::of_kind(DeclKind::Variable, name)
    }

    pub fn of_kind(kind: DeclKind, name: &str) -> Self {
        Selector::Matching(Matcher::kind(kind).and(Matcher::name(name)))
    }

    /// Matched nodes in pre-order.
    pub fn select(&self, tree: &DeclTree) -> Vec<NodeId> {
        let root = tree.root();
        let candidates = tree.walk().into_iter();
        match self {
            Selector::All => candidates.collect(),
            Selector::Name(name) => candidates
                .filter(|id| *id != root && tree.get(*id).name == *name)
                .collect(),
            Selector::Path(path) => {
                let path = path.strip_prefix("::").unwrap_or(path);
                candidates
                    .filter(|id| *id != root && tree.get(*id).qualified_name == path)
                    .collect()
            }
            Selector::Namespace(scope) => candidates
                .filter(|id| tree.is_within(*id, scope))
                .collect(),
            Selector::Matching(m) => candidates
                .filter(|id| *id != root && m.matches(tree, *id))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Include,
    Exclude,
    Rename(String),
    Transform(String),
    SuppressWarning(String),
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub selector: Selector,
    pub action: Action,
    /// Restrict the rule to passes for one target.
    pub only: Option<Target>,
}

impl Rule {
    pub fn new(selector: Selector, action: Action) -> Self {
        Self {
            selector,
            action,
            only: None,
        }
    }

    pub fn only_for(mut self, target: Target) -> Self {
        self.only = Some(target);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: Rule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn include(&mut self, selector: Selector) -> &mut Self {
        self.push(Rule::new(selector, Action::Include))
    }

    pub fn exclude(&mut self, selector: Selector) -> &mut Self {
        self.push(Rule::new(selector, Action::Exclude))
    }

    pub fn rename(&mut self, selector: Selector, to: impl Into<String>) -> &mut Self {
        self.push(Rule::new(selector, Action::Rename(to.into())))
    }

    pub fn transform(&mut self, selector: Selector, tag: impl Into<String>) -> &mut Self {
        self.push(Rule::new(selector, Action::Transform(tag.into())))
    }

    pub fn suppress(&mut self, selector: Selector, code: impl Into<String>) -> &mut Self {
        self.push(Rule::new(selector, Action::SuppressWarning(code.into())))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Fold the rules over `tree` for one pass.
    ///
    /// The result depends only on the rules, the tree and the pass scope, so
    /// applying the same set twice gives the same selection.
    pub fn apply(&self, tree: &DeclTree, scope: &PassScope) -> Result<Selection, RuleError> {
        let mut selection = Selection::excluded(tree);

        for rule in &self.rules {
            if let Some(target) = rule.only {
                if !scope.allows_divergence() {
                    return Err(RuleError::Divergent {
                        variant: scope.variant,
                        detail: format!("rule scoped to {target}"),
                    });
                }
                if target != scope.target {
                    continue;
                }
            }

            for id in rule.selector.select(tree) {
                apply_action(&mut selection, id, &rule.action);
            }
        }

        Ok(selection)
    }

    /// Fold and package the result with its tree.
    pub fn filter(&self, tree: DeclTree, scope: &PassScope) -> Result<FilteredTree, RuleError> {
        let selection = self.apply(&tree, scope)?;
        Ok(FilteredTree::new(tree, selection))
    }
}

impl Extend<Rule> for RuleSet {
    fn extend<I: IntoIterator<Item = Rule>>(&mut self, iter: I) {
        self.rules.extend(iter);
    }
}

fn apply_action(selection: &mut Selection, id: NodeId, action: &Action) {
    match action {
        Action::Include => selection.state_mut(id).included = true,
        Action::Exclude => selection.state_mut(id).included = false,
        Action::Rename(to) => {
            let state = selection.state_mut(id);
            if state.included {
                state.rename = Some(to.clone());
            }
        }
        Action::Transform(tag) => {
            selection.state_mut(id).transforms.insert(tag.clone());
        }
        Action::SuppressWarning(code) => {
            selection.state_mut(id).suppressed.insert(code.clone());
        }
    }
}
