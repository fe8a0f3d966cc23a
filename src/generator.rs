//! Per-module orchestration: plan the passes for a variant, parse, run the
//! module's hook and fold its rules.
//!
//! Modules run sequentially. A failed pass ends its module and is recorded
//! in that module's [`GenerationResult`]; other modules are unaffected.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::decl::dump::{DeclParser, ParseRequest};
use crate::error::{ConfigError, GenerationError};
use crate::module::{HookContext, ModuleDescriptor, PassScope, Target, Variant};
use crate::rules::FilteredTree;

/// Whether the emitter should render the whole module or only refresh its
/// hand-maintained append file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitMode {
    Full,
    AppendOnly,
}

/// One parse + filter pass of a module.
#[derive(Debug)]
pub struct PassOutcome {
    pub parse_target: Target,
    /// Artifacts this pass's tree is emitted for. Two for a pure shared module.
    pub emit_targets: Vec<Target>,
    pub output_dir: PathBuf,
    pub result: Result<FilteredTree, GenerationError>,
    /// File the emitter produced (or would produce) for this pass.
    pub artifact: Option<PathBuf>,
}

#[derive(Debug)]
pub struct GenerationResult {
    pub module_name: String,
    pub variant: Variant,
    pub mode: EmitMode,
    /// Passes in plan order. A failed pass ends the module, so later passes
    /// are absent.
    pub passes: Vec<PassOutcome>,
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        self.passes.iter().all(|p| p.result.is_ok())
    }

    pub fn error(&self) -> Option<&GenerationError> {
        self.passes.iter().find_map(|p| p.result.as_ref().err())
    }

    /// The filtered tree emitted for `target`, if that pass succeeded.
    pub fn tree_for(&self, target: Target) -> Option<&FilteredTree> {
        self.passes
            .iter()
            .find(|p| p.emit_targets.contains(&target))
            .and_then(|p| p.result.as_ref().ok())
    }
}

/// Drives module generation: parses each planned pass, runs the module's
/// rule hook against it and folds the rules into a filtered tree.
pub struct Generator<'s, P> {
    settings: &'s Settings,
    parser: P,
}

impl<'s, P: DeclParser> Generator<'s, P> {
    pub fn new(settings: &'s Settings, parser: P) -> Self {
        Self { settings, parser }
    }

    /// Run every pass the module's variant plans.
    ///
    /// Each pass parses its own tree; nothing from one pass is visible to
    /// another. The first failing pass ends the module.
    pub fn generate_module(&mut self, module: &ModuleDescriptor) -> GenerationResult {
        let plan = module.plan();
        let mut passes = Vec::with_capacity(plan.passes.len());

        for pass in plan.passes {
            let scope = PassScope::new(module.variant, pass.parse_target);
            let result = self.run_pass(module, scope);
            let failed = result.is_err();
            match &result {
                Ok(filtered) => debug!(
                    module = %module.name,
                    target = %pass.parse_target,
                    included = filtered.included().len(),
                    "pass complete"
                ),
                Err(e) => warn!(
                    module = %module.name,
                    target = %pass.parse_target,
                    kind = e.kind(),
                    "pass abandoned: {e}"
                ),
            }
            passes.push(PassOutcome {
                parse_target: pass.parse_target,
                emit_targets: pass.emit_targets.to_vec(),
                output_dir: self.settings.paths.resolve(pass.output).to_path_buf(),
                result,
                artifact: None,
            });
            if failed {
                break;
            }
        }

        GenerationResult {
            module_name: module.name.clone(),
            variant: module.variant,
            mode: EmitMode::Full,
            passes,
        }
    }

    fn run_pass(
        &mut self,
        module: &ModuleDescriptor,
        scope: PassScope,
    ) -> Result<FilteredTree, GenerationError> {
        let target_settings = self.settings.target(scope.target);
        let request = ParseRequest {
            module: &module.name,
            files: &module.files,
            target: scope.target,
            include_paths: &target_settings.include_paths,
            defines: &target_settings.defines,
        };
        let tree = self.parser.parse(&request)?;

        let rules = {
            let ctx = HookContext::new(&module.name, scope, &tree);
            module.hook().rules(&ctx)?
        };
        Ok(rules.filter(tree, &scope)?)
    }

    /// Generate all modules, or the one named by `specific`.
    ///
    /// `append_only` restricts the batch to the listed modules and marks them
    /// for append-file regeneration. Unknown names fail before anything is
    /// generated; after that, a module's failure is recorded in its result
    /// and the batch moves on.
    pub fn run_all(
        &mut self,
        specific: Option<&str>,
        append_only: Option<&[String]>,
    ) -> Result<Vec<GenerationResult>, ConfigError> {
        let settings = self.settings;

        let requested = append_only.unwrap_or_default().iter().map(String::as_str);
        for name in specific.into_iter().chain(requested) {
            if settings.module(name).is_none() {
                return Err(ConfigError::UnknownModule(name.to_string()));
            }
        }

        let selected: Vec<&ModuleDescriptor> = settings
            .modules()
            .iter()
            .filter(|m| specific.is_none_or(|s| s == m.name))
            .filter(|m| append_only.is_none_or(|list| list.contains(&m.name)))
            .collect();
        let mode = if append_only.is_some() {
            EmitMode::AppendOnly
        } else {
            EmitMode::Full
        };

        info!(modules = selected.len(), ?mode, "generation started");
        let mut results = Vec::with_capacity(selected.len());
        for module in selected {
            let mut result = self.generate_module(module);
            result.mode = mode;
            results.push(result);
        }

        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(modules = results.len(), failed, "generation finished");
        Ok(results)
    }
}
