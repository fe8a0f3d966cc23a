pub mod cli;
pub mod config;
pub mod decl;
pub mod emit;
pub mod error;
pub mod formatter;
pub mod generator;
pub mod matcher;
pub mod module;
pub mod rules;

#[cfg(test)]
pub mod testutil;

use anyhow::{Context, Result};
use tracing::debug;

use cli::Args;
use config::load_settings;
use decl::dump::DumpParser;
use emit::{DryRun, Emitter, ManifestEmitter, emit_all};
use formatter::create_formatter;
use generator::Generator;

/// Run the generator. Returns the exit code: 0 once settings resolved (even if
/// some modules failed), 2 when the settings could not be used.
pub fn run(args: Args) -> Result<i32> {
    let settings = load_settings(args.settings.as_deref()).context("loading settings")?;
    debug!(
        base_dir = %settings.base_dir.display(),
        modules = settings.modules().len(),
        "settings resolved"
    );

    // --list-modules: print each module with its variant and exit
    if args.list_modules {
        for module in settings.modules() {
            println!("{} ({})", module.name, module.variant);
        }
        return Ok(0);
    }

    let parser = DumpParser::new(&settings.base_dir);
    let mut generator = Generator::new(&settings, parser);
    let mut results = generator
        .run_all(args.module.as_deref(), args.append_only())
        .context("selecting modules")?;

    let mut manifest = ManifestEmitter;
    let mut dry = DryRun::default();
    let emitter: &mut dyn Emitter = if args.dry_run { &mut dry } else { &mut manifest };
    let written = emit_all(&mut results, emitter);
    debug!(written, dry_run = args.dry_run, "emission finished");

    // stdout carries only the formatter's report
    if args.dry_run {
        for path in &dry.planned {
            eprintln!("would write {}", path.display());
        }
    }

    let formatter = create_formatter(&args.format);
    formatter.print(&results);
    Ok(0)
}
