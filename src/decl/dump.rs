//! Parser collaborator: the trait the generator parses through, and a
//! parser that loads pre-extracted JSON declaration dumps.
//!
//! Each header `foo/bar.h` is backed by a dump `foo/bar.h.json`:
//!
//! ```json
//! { "decls": [
//!     { "kind": "function", "name": "LookupActivity",
//!       "returns": "int", "args": ["CStudioHdr *", "const char *"] },
//!     { "kind": "class", "name": "C_BaseEntity", "targets": ["client"],
//!       "children": [ { "kind": "function", "name": "Spawn", "returns": "void",
//!                       "access": "public" } ] }
//! ] }
//! ```
//!
//! `targets` and `if_defined` model platform-conditional declarations; an
//! entry that fails either test is dropped together with its children.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::{Access, DeclKind, DeclTree, NewDecl, NodeId, TypeRef};
use crate::error::ParseError;
use crate::module::Target;

/// One parse invocation: the module's headers for one target.
#[derive(Debug, Clone, Copy)]
pub struct ParseRequest<'a> {
    pub module: &'a str,
    pub files: &'a [PathBuf],
    pub target: Target,
    pub include_paths: &'a [PathBuf],
    pub defines: &'a [String],
}

pub trait DeclParser {
    /// Produce a fresh tree rooted at the global namespace.
    fn parse(&mut self, request: &ParseRequest<'_>) -> Result<DeclTree, ParseError>;
}

impl<P: DeclParser + ?Sized> DeclParser for &mut P {
    fn parse(&mut self, request: &ParseRequest<'_>) -> Result<DeclTree, ParseError> {
        (**self).parse(request)
    }
}

#[derive(Debug, Deserialize)]
struct DumpFile {
    #[serde(default)]
    decls: Vec<DumpDecl>,
}

#[derive(Debug, Deserialize)]
struct DumpDecl {
    kind: String,
    name: String,
    #[serde(default)]
    returns: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    targets: Vec<String>,
    #[serde(default)]
    if_defined: Option<String>,
    #[serde(default)]
    children: Vec<DumpDecl>,
}

impl DumpDecl {
    fn visible(&self, request: &ParseRequest<'_>) -> bool {
        let target_ok = self.targets.is_empty()
            || self.targets.iter().any(|t| t == request.target.as_str());
        let define_ok = self
            .if_defined
            .as_ref()
            .is_none_or(|d| request.defines.iter().any(|have| have == d));
        target_ok && define_ok
    }
}

/// Loads `<header>.json` dumps, looking next to the settings file first and
/// then in each include path.
#[derive(Debug, Clone)]
pub struct DumpParser {
    base_dir: PathBuf,
}

impl DumpParser {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn candidates(&self, header: &Path, include_paths: &[PathBuf]) -> Vec<PathBuf> {
        let dump_name = {
            let mut name = header.as_os_str().to_owned();
            name.push(".json");
            PathBuf::from(name)
        };
        if dump_name.is_absolute() {
            return vec![dump_name];
        }
        let mut out = vec![self.base_dir.join(&dump_name)];
        for dir in include_paths {
            out.push(self.base_dir.join(dir).join(&dump_name));
        }
        out
    }

    fn load(&self, header: &Path, request: &ParseRequest<'_>) -> Result<DumpFile, ParseError> {
        let searched = self.candidates(header, request.include_paths);
        let Some(path) = searched.iter().find(|p| p.is_file()) else {
            return Err(ParseError::MissingDump {
                header: header.display().to_string(),
                searched,
            });
        };
        debug!(module = request.module, dump = %path.display(), "loading declaration dump");
        let contents = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ParseError::Json {
            path: path.clone(),
            source,
        })
    }
}

impl DeclParser for DumpParser {
    fn parse(&mut self, request: &ParseRequest<'_>) -> Result<DeclTree, ParseError> {
        let mut tree = DeclTree::new();
        let mut seen = HashSet::new();
        for header in request.files {
            // Include guards: a header contributes once.
            if !seen.insert(header.clone()) {
                continue;
            }
            let dump = self.load(header, request)?;
            let root = tree.root();
            for decl in &dump.decls {
                insert(&mut tree, root, decl, request)?;
            }
        }
        debug!(
            module = request.module,
            target = %request.target,
            nodes = tree.len(),
            "parsed declaration tree"
        );
        Ok(tree)
    }
}

fn insert(
    tree: &mut DeclTree,
    parent: NodeId,
    decl: &DumpDecl,
    request: &ParseRequest<'_>,
) -> Result<(), ParseError> {
    if !decl.visible(request) {
        return Ok(());
    }
    let kind = DeclKind::from_str(&decl.kind).ok_or_else(|| {
        ParseError::Other(format!(
            "unknown declaration kind `{}` for `{}`",
            decl.kind, decl.name
        ))
    })?;

    // Reopened namespaces merge into the existing node.
    let existing = if kind == DeclKind::Namespace {
        tree.child_named(parent, &decl.name, kind)
    } else {
        None
    };

    let id = match existing {
        Some(id) => id,
        None => {
            let access = match decl.access.as_deref() {
                Some(s) => Some(Access::from_str(s).ok_or_else(|| {
                    ParseError::Other(format!("unknown access `{s}` for `{}`", decl.name))
                })?),
                // Members without an explicit specifier are treated as public.
                None if tree.get(parent).kind == DeclKind::Class => Some(Access::Public),
                None => None,
            };
            let mut new = NewDecl::new(kind, decl.name.clone());
            new.return_type = decl.returns.as_deref().map(TypeRef::new);
            new.arg_types = decl.args.iter().map(|a| TypeRef::new(a.as_str())).collect();
            new.access = access;
            tree.add(parent, new)
        }
    };

    for child in &decl.children {
        insert(tree, id, child, request)?;
    }
    Ok(())
}
