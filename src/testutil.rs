use std::collections::HashMap;

use crate::decl::dump::{DeclParser, ParseRequest};
use crate::decl::{Access, DeclTree, NewDecl};
use crate::error::ParseError;
use crate::module::Target;

/// Two free functions and a class with one public and one private method:
///
/// ```text
/// int LookupActivity(CStudioHdr *, const char *)
/// int LookupSequence(CStudioHdr *, const char *)
/// class CBaseAnimating { public: void SetSequence(int); private: void ResetSequenceInfo(); }
/// ```
pub fn anim_tree() -> DeclTree {
    let mut tree = DeclTree::new();
    let root = tree.root();
    tree.add(
        root,
        NewDecl::function("LookupActivity", "int", &["CStudioHdr *", "const char *"]),
    );
    tree.add(
        root,
        NewDecl::function("LookupSequence", "int", &["CStudioHdr *", "const char *"]),
    );
    let class = tree.add(root, NewDecl::class("CBaseAnimating"));
    tree.add(
        class,
        NewDecl::function("SetSequence", "void", &["int"]).with_access(Access::Public),
    );
    tree.add(
        class,
        NewDecl::function("ResetSequenceInfo", "void", &[]).with_access(Access::Private),
    );
    tree
}

/// A parser that hands out a copy of a fixed tree per target and counts
/// how often it was asked.
pub struct FixedParser {
    trees: HashMap<Target, DeclTree>,
    calls: usize,
    fail_for: Option<String>,
}

impl FixedParser {
    /// The same tree for both targets.
    pub fn uniform(tree: DeclTree) -> Self {
        let mut trees = HashMap::new();
        trees.insert(Target::Client, tree.clone());
        trees.insert(Target::Server, tree);
        Self {
            trees,
            calls: 0,
            fail_for: None,
        }
    }

    pub fn per_target(client: DeclTree, server: DeclTree) -> Self {
        let mut trees = HashMap::new();
        trees.insert(Target::Client, client);
        trees.insert(Target::Server, server);
        Self {
            trees,
            calls: 0,
            fail_for: None,
        }
    }

    /// Fail every parse for the named module.
    pub fn failing_for(mut self, module: &str) -> Self {
        self.fail_for = Some(module.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl DeclParser for FixedParser {
    fn parse(&mut self, request: &ParseRequest<'_>) -> Result<DeclTree, ParseError> {
        self.calls += 1;
        if self.fail_for.as_deref() == Some(request.module) {
            return Err(ParseError::Other(format!("cannot parse {}", request.module)));
        }
        Ok(self.trees[&request.target].clone())
    }
}
