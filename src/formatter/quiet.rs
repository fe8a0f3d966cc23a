use std::io::Write;

use crate::formatter::{Formatter, failure_line};
use crate::generator::GenerationResult;

/// Prints failures only.
pub struct QuietFormatter;

impl Formatter for QuietFormatter {
    fn format_to(&self, results: &[GenerationResult], out: &mut dyn Write) {
        for line in results.iter().filter_map(failure_line) {
            let _ = writeln!(out, "{line}");
        }
    }
}
