use std::io::Write;

use crate::formatter::{Formatter, failure_line, plural};
use crate::generator::{EmitMode, GenerationResult};

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_to(&self, results: &[GenerationResult], out: &mut dyn Write) {
        for result in results {
            if let Some(line) = failure_line(result) {
                let _ = writeln!(out, "{line}");
                continue;
            }
            let exposed: usize = result
                .passes
                .iter()
                .filter_map(|p| p.result.as_ref().ok())
                .map(|t| t.included().len())
                .max()
                .unwrap_or(0);
            let mode = match result.mode {
                EmitMode::Full => "",
                EmitMode::AppendOnly => ", append only",
            };
            let _ = writeln!(
                out,
                "{}: ok ({}, {} exposed{mode})",
                result.module_name,
                result.variant,
                plural(exposed, "declaration"),
            );
        }
        let failed = results.iter().filter(|r| !r.is_success()).count();
        let _ = writeln!(
            out,
            "\n{} generated, {failed} failed",
            plural(results.len(), "module"),
        );
    }
}
