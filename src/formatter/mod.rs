pub mod json;
pub mod quiet;
pub mod text;

use std::io::Write;

use crate::generator::GenerationResult;

pub trait Formatter {
    fn format_to(&self, results: &[GenerationResult], out: &mut dyn Write);

    fn print(&self, results: &[GenerationResult]) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        self.format_to(results, &mut lock);
    }
}

pub fn create_formatter(format: &str) -> Box<dyn Formatter> {
    match format {
        "json" => Box::new(json::JsonFormatter),
        "quiet" => Box::new(quiet::QuietFormatter),
        _ => Box::new(text::TextFormatter),
    }
}

/// `<module>: <kind>: <message>` for a failed module.
pub(crate) fn failure_line(result: &GenerationResult) -> Option<String> {
    let err = result.error()?;
    Some(format!("{}: {}: {err}", result.module_name, err.kind()))
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}
