//! Turning filtered trees into artifacts on disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{EmitError, GenerationError};
use crate::generator::{EmitMode, GenerationResult};
use crate::module::{Target, Variant};
use crate::rules::{ExposedDecl, FilteredTree};

/// Everything an emitter gets to see about one successful pass.
#[derive(Debug, Clone, Copy)]
pub struct EmitRequest<'a> {
    pub module: &'a str,
    pub variant: Variant,
    pub mode: EmitMode,
    pub targets: &'a [Target],
    pub output_dir: &'a Path,
    pub tree: &'a FilteredTree,
}

/// Renders a filtered tree into output artifacts. Returns the file written.
pub trait Emitter {
    fn emit(&mut self, request: &EmitRequest<'_>) -> Result<PathBuf, EmitError>;
}

impl<E: Emitter + ?Sized> Emitter for &mut E {
    fn emit(&mut self, request: &EmitRequest<'_>) -> Result<PathBuf, EmitError> {
        (**self).emit(request)
    }
}

/// Path of the artifact an emitter produces for `module` in `mode`.
pub fn artifact_path(output_dir: &Path, module: &str, mode: EmitMode) -> PathBuf {
    match mode {
        EmitMode::Full => output_dir.join(format!("{module}.json")),
        EmitMode::AppendOnly => output_dir.join(format!("{module}_append.json")),
    }
}

#[derive(Serialize)]
struct Manifest<'a> {
    module: &'a str,
    variant: Variant,
    targets: &'a [Target],
    fingerprint: String,
    declarations: Vec<ExposedDecl>,
}

#[derive(Serialize)]
struct AppendList<'a> {
    module: &'a str,
    targets: &'a [Target],
    names: Vec<String>,
}

/// Writes a JSON manifest per module, or only the append list in
/// append-only mode.
#[derive(Debug, Default)]
pub struct ManifestEmitter;

impl Emitter for ManifestEmitter {
    fn emit(&mut self, request: &EmitRequest<'_>) -> Result<PathBuf, EmitError> {
        let path = artifact_path(request.output_dir, request.module, request.mode);
        let json = match request.mode {
            EmitMode::Full => serde_json::to_string_pretty(&Manifest {
                module: request.module,
                variant: request.variant,
                targets: request.targets,
                fingerprint: request.tree.fingerprint(),
                declarations: request.tree.summary(),
            })?,
            EmitMode::AppendOnly => serde_json::to_string_pretty(&AppendList {
                module: request.module,
                targets: request.targets,
                names: request
                    .tree
                    .summary()
                    .into_iter()
                    .map(|d| d.exposed_name)
                    .collect(),
            })?,
        };

        let io_err = |source| EmitError::Io {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(request.output_dir).map_err(io_err)?;
        fs::write(&path, json + "\n").map_err(io_err)?;
        debug!(path = %path.display(), "wrote artifact");
        Ok(path)
    }
}

/// Reports what would be written without touching the filesystem.
#[derive(Debug, Default)]
pub struct DryRun {
    pub planned: Vec<PathBuf>,
}

impl Emitter for DryRun {
    fn emit(&mut self, request: &EmitRequest<'_>) -> Result<PathBuf, EmitError> {
        let path = artifact_path(request.output_dir, request.module, request.mode);
        self.planned.push(path.clone());
        Ok(path)
    }
}

/// Emit every module whose passes all succeeded.
///
/// A failed module writes nothing, so client and server output never
/// disagree. An emission failure replaces that pass's result, is reported
/// like any other module failure and ends the module's emission.
pub fn emit_all(results: &mut [GenerationResult], emitter: &mut dyn Emitter) -> usize {
    let mut written = 0;
    for result in results.iter_mut() {
        if !result.is_success() {
            debug!(module = %result.module_name, "module failed, nothing emitted");
            continue;
        }
        for pass in result.passes.iter_mut() {
            let Ok(tree) = &pass.result else {
                continue;
            };
            let request = EmitRequest {
                module: &result.module_name,
                variant: result.variant,
                mode: result.mode,
                targets: &pass.emit_targets,
                output_dir: &pass.output_dir,
                tree,
            };
            match emitter.emit(&request) {
                Ok(path) => {
                    pass.artifact = Some(path);
                    written += 1;
                }
                Err(e) => {
                    pass.result = Err(GenerationError::Emit(e));
                    break;
                }
            }
        }
    }
    written
}
