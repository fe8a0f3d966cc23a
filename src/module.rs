//! Module descriptors, build variants and the variant plan table.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::decl::{DeclTree, NodeId};
use crate::error::RuleError;
use crate::rules::RuleSet;

/// A concrete build artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Client,
    Server,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Client => "client",
            Target::Server => "server",
        }
    }

    pub fn from_str(s: &str) -> Option<Target> {
        match s {
            "client" => Some(Target::Client),
            "server" => Some(Target::Server),
            _ => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Client,
    Server,
    /// Same files and rules on both sides, one pass per artifact.
    Shared,
    /// One pass whose result is linked into both artifacts.
    PureShared,
    /// One pass per artifact; the hook may branch on the target.
    SemiShared,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Client => "client",
            Variant::Server => "server",
            Variant::Shared => "shared",
            Variant::PureShared => "pure_shared",
            Variant::SemiShared => "semi_shared",
        }
    }

    pub fn from_str(s: &str) -> Option<Variant> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "client" => Some(Variant::Client),
            "server" => Some(Variant::Server),
            "shared" => Some(Variant::Shared),
            "pure_shared" | "pureshared" => Some(Variant::PureShared),
            "semi_shared" | "semishared" => Some(Variant::SemiShared),
            _ => None,
        }
    }

    pub fn plan(&self) -> &'static VariantPlan {
        match self {
            Variant::Client => &CLIENT_PLAN,
            Variant::Server => &SERVER_PLAN,
            Variant::Shared => &SHARED_PLAN,
            Variant::PureShared => &PURE_SHARED_PLAN,
            Variant::SemiShared => &SEMI_SHARED_PLAN,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which configured output directory a pass writes under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputBase {
    Client,
    Server,
    Shared,
}

impl OutputBase {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputBase::Client => "client",
            OutputBase::Server => "server",
            OutputBase::Shared => "shared",
        }
    }
}

#[derive(Debug)]
pub struct PassPlan {
    /// Target whose parser settings (include paths, defines) the pass uses.
    pub parse_target: Target,
    /// Artifacts the pass's filtered tree is emitted for.
    pub emit_targets: &'static [Target],
    pub output: OutputBase,
}

#[derive(Debug)]
pub struct VariantPlan {
    pub passes: &'static [PassPlan],
    /// Whether rules and hooks may behave differently per target.
    pub divergence: bool,
}

static CLIENT_PLAN: VariantPlan = VariantPlan {
    passes: &[PassPlan {
        parse_target: Target::Client,
        emit_targets: &[Target::Client],
        output: OutputBase::Client,
    }],
    divergence: true,
};

static SERVER_PLAN: VariantPlan = VariantPlan {
    passes: &[PassPlan {
        parse_target: Target::Server,
        emit_targets: &[Target::Server],
        output: OutputBase::Server,
    }],
    divergence: true,
};

static SHARED_PLAN: VariantPlan = VariantPlan {
    passes: &[
        PassPlan {
            parse_target: Target::Client,
            emit_targets: &[Target::Client],
            output: OutputBase::Client,
        },
        PassPlan {
            parse_target: Target::Server,
            emit_targets: &[Target::Server],
            output: OutputBase::Server,
        },
    ],
    divergence: false,
};

static PURE_SHARED_PLAN: VariantPlan = VariantPlan {
    passes: &[PassPlan {
        parse_target: Target::Server,
        emit_targets: &[Target::Client, Target::Server],
        output: OutputBase::Shared,
    }],
    divergence: false,
};

static SEMI_SHARED_PLAN: VariantPlan = VariantPlan {
    passes: &[
        PassPlan {
            parse_target: Target::Client,
            emit_targets: &[Target::Client],
            output: OutputBase::Client,
        },
        PassPlan {
            parse_target: Target::Server,
            emit_targets: &[Target::Server],
            output: OutputBase::Server,
        },
    ],
    divergence: true,
};

/// The variant and parse target a rule set is being applied for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassScope {
    pub variant: Variant,
    pub target: Target,
}

impl PassScope {
    pub fn new(variant: Variant, target: Target) -> Self {
        Self { variant, target }
    }

    pub fn allows_divergence(&self) -> bool {
        self.variant.plan().divergence
    }
}

/// What a rule hook sees for one pass.
pub struct HookContext<'a> {
    module: &'a str,
    scope: PassScope,
    tree: &'a DeclTree,
}

impl<'a> HookContext<'a> {
    pub fn new(module: &'a str, scope: PassScope, tree: &'a DeclTree) -> Self {
        Self {
            module,
            scope,
            tree,
        }
    }

    pub fn module_name(&self) -> &str {
        self.module
    }

    pub fn variant(&self) -> Variant {
        self.scope.variant
    }

    pub fn scope(&self) -> PassScope {
        self.scope
    }

    /// The raw parse result for this pass.
    pub fn tree(&self) -> &DeclTree {
        self.tree
    }

    /// The target this pass is built for. Asking is an error for variants
    /// whose passes must not diverge.
    pub fn target(&self) -> Result<Target, RuleError> {
        if self.scope.allows_divergence() {
            Ok(self.scope.target)
        } else {
            Err(RuleError::Divergent {
                variant: self.scope.variant,
                detail: "hook asked for the active target".to_string(),
            })
        }
    }

    /// Look up a declaration the hook cannot do without.
    pub fn require(&self, path: &str) -> Result<NodeId, RuleError> {
        self.tree
            .find_path(path)
            .ok_or_else(|| RuleError::MissingSymbol(path.to_string()))
    }
}

/// User code that produces a module's rules for one pass.
pub trait RuleHook: Send + Sync {
    fn rules(&self, ctx: &HookContext<'_>) -> Result<RuleSet, RuleError>;
}

impl<F> RuleHook for F
where
    F: Fn(&HookContext<'_>) -> Result<RuleSet, RuleError> + Send + Sync,
{
    fn rules(&self, ctx: &HookContext<'_>) -> Result<RuleSet, RuleError> {
        self(ctx)
    }
}

/// Static description of one binding module.
#[derive(Clone)]
pub struct ModuleDescriptor {
    pub name: String,
    /// Header files in include order.
    pub files: Vec<PathBuf>,
    pub variant: Variant,
    hook: Arc<dyn RuleHook>,
}

impl ModuleDescriptor {
    pub fn new(
        name: impl Into<String>,
        files: Vec<PathBuf>,
        variant: Variant,
        hook: Arc<dyn RuleHook>,
    ) -> Self {
        Self {
            name: name.into(),
            files,
            variant,
            hook,
        }
    }

    pub fn hook(&self) -> &dyn RuleHook {
        &*self.hook
    }

    pub fn plan(&self) -> &'static VariantPlan {
        self.variant.plan()
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("files", &self.files)
            .field("variant", &self.variant)
            .finish_non_exhaustive()
    }
}
