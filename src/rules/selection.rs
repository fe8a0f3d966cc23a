//! Selection state attached to a declaration tree by rule application.

use std::collections::BTreeSet;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::decl::{DeclKind, DeclTree, NodeId};

/// Per-node outcome of folding a rule set. The default is excluded with no
/// metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub included: bool,
    pub rename: Option<String>,
    pub transforms: BTreeSet<String>,
    pub suppressed: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    states: Vec<SelectionState>,
}

impl Selection {
    /// Every node of `tree` excluded.
    pub fn excluded(tree: &DeclTree) -> Self {
        Self {
            states: vec![SelectionState::default(); tree.len()],
        }
    }

    pub fn state(&self, id: NodeId) -> &SelectionState {
        &self.states[id.index()]
    }

    pub(crate) fn state_mut(&mut self, id: NodeId) -> &mut SelectionState {
        &mut self.states[id.index()]
    }

    pub fn is_included(&self, id: NodeId) -> bool {
        self.states[id.index()].included
    }
}

/// One exposed declaration, as handed to the emission backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExposedDecl {
    pub qualified_name: String,
    pub exposed_name: String,
    pub kind: DeclKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transforms: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suppressed: Vec<String>,
}

/// A parse result together with the selection its pass folded over it.
///
/// The tree is owned: each pass parses its own copy and nothing else holds
/// a mutable handle to it.
#[derive(Debug, Clone)]
pub struct FilteredTree {
    tree: DeclTree,
    selection: Selection,
}

impl FilteredTree {
    pub fn new(tree: DeclTree, selection: Selection) -> Self {
        Self { tree, selection }
    }

    pub fn tree(&self) -> &DeclTree {
        &self.tree
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn state(&self, id: NodeId) -> &SelectionState {
        self.selection.state(id)
    }

    /// Included declarations in pre-order. The global namespace is never
    /// reported.
    pub fn included(&self) -> Vec<NodeId> {
        self.tree
            .walk()
            .into_iter()
            .filter(|id| *id != self.tree.root() && self.selection.is_included(*id))
            .collect()
    }

    pub fn is_included_path(&self, qualified: &str) -> bool {
        self.included()
            .into_iter()
            .any(|id| self.tree.get(id).qualified_name == qualified)
    }

    /// Name the declaration is exposed under: its rename if one applied.
    pub fn exposed_name(&self, id: NodeId) -> &str {
        self.selection
            .state(id)
            .rename
            .as_deref()
            .unwrap_or(self.tree.get(id).name.as_str())
    }

    /// Comparable view of the exposed surface, in pre-order.
    pub fn summary(&self) -> Vec<ExposedDecl> {
        self.included()
            .into_iter()
            .map(|id| {
                let decl = self.tree.get(id);
                let state = self.selection.state(id);
                ExposedDecl {
                    qualified_name: decl.qualified_name.clone(),
                    exposed_name: self.exposed_name(id).to_string(),
                    kind: decl.kind,
                    transforms: state.transforms.iter().cloned().collect(),
                    suppressed: state.suppressed.iter().cloned().collect(),
                }
            })
            .collect()
    }

    /// SHA-256 over the exposed surface. Equal for equal summaries, so two
    /// runs (or two targets) can be compared cheaply.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for entry in self.summary() {
            hasher.update(entry.qualified_name.as_bytes());
            hasher.update([0u8]);
            hasher.update(entry.exposed_name.as_bytes());
            hasher.update([0u8]);
            hasher.update(entry.kind.as_str().as_bytes());
            for t in &entry.transforms {
                hasher.update(b"\x01");
                hasher.update(t.as_bytes());
            }
            for s in &entry.suppressed {
                hasher.update(b"\x02");
                hasher.update(s.as_bytes());
            }
            hasher.update(b"\n");
        }
        let hash = hasher.finalize();
        format!("{:x}", hash)
    }
}
