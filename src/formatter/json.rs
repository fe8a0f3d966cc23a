use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;

use crate::formatter::Formatter;
use crate::generator::{EmitMode, GenerationResult};
use crate::module::{Target, Variant};

pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonOutput<'a> {
    metadata: Metadata,
    modules: Vec<ModuleOutput<'a>>,
}

#[derive(Serialize)]
struct Metadata {
    module_count: usize,
    failed_count: usize,
}

#[derive(Serialize)]
struct ModuleOutput<'a> {
    name: &'a str,
    variant: Variant,
    mode: EmitMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorOutput>,
    passes: Vec<PassOutput<'a>>,
}

#[derive(Serialize)]
struct ErrorOutput {
    kind: &'static str,
    message: String,
}

#[derive(Serialize)]
struct PassOutput<'a> {
    parse_target: Target,
    emit_targets: &'a [Target],
    output_dir: &'a PathBuf,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    included: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifact: Option<&'a PathBuf>,
}

impl Formatter for JsonFormatter {
    fn format_to(&self, results: &[GenerationResult], out: &mut dyn Write) {
        let output = JsonOutput {
            metadata: Metadata {
                module_count: results.len(),
                failed_count: results.iter().filter(|r| !r.is_success()).count(),
            },
            modules: results
                .iter()
                .map(|r| ModuleOutput {
                    name: &r.module_name,
                    variant: r.variant,
                    mode: r.mode,
                    error: r.error().map(|e| ErrorOutput {
                        kind: e.kind(),
                        message: e.to_string(),
                    }),
                    passes: r
                        .passes
                        .iter()
                        .map(|p| {
                            let tree = p.result.as_ref().ok();
                            PassOutput {
                                parse_target: p.parse_target,
                                emit_targets: &p.emit_targets,
                                output_dir: &p.output_dir,
                                ok: tree.is_some(),
                                included: tree.map(|t| t.included().len()),
                                fingerprint: tree.map(|t| t.fingerprint()),
                                artifact: p.artifact.as_ref(),
                            }
                        })
                        .collect(),
                })
                .collect(),
        };
        let _ = serde_json::to_writer_pretty(&mut *out, &output);
        let _ = writeln!(out);
    }
}
