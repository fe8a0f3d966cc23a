use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "modgen",
    version,
    about = "Generate binding modules from declarative rule sets"
)]
pub struct Args {
    /// Path to the settings file [default: modgen.yml]
    #[arg(short, long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Generate only the named module
    #[arg(short, long, value_name = "NAME")]
    pub module: Option<String>,

    /// Regenerate only the append files of these modules (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    pub append_only: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "text", value_parser = ["text", "json", "quiet"])]
    pub format: String,

    /// Run every pass but write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// List configured modules with their variants, then exit
    #[arg(long)]
    pub list_modules: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Args {
    /// The append-only list, if one was given.
    pub fn append_only(&self) -> Option<&[String]> {
        if self.append_only.is_empty() {
            None
        } else {
            Some(&self.append_only)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("modgen").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let args = parse(&[]);
        assert_eq!(args.settings, None);
        assert_eq!(args.module, None);
        assert_eq!(args.append_only(), None);
        assert_eq!(args.format, "text");
        assert!(!args.dry_run);
        assert!(!args.list_modules);
        assert!(!args.debug);
    }

    #[test]
    fn append_only_is_comma_separated() {
        let args = parse(&["--append-only", "anim,physics"]);
        assert_eq!(
            args.append_only(),
            Some(&["anim".to_string(), "physics".to_string()][..])
        );
    }

    #[test]
    fn module_and_settings() {
        let args = parse(&["-s", "build/modgen.yml", "--module", "anim", "-f", "json"]);
        assert_eq!(args.settings, Some(PathBuf::from("build/modgen.yml")));
        assert_eq!(args.module.as_deref(), Some("anim"));
        assert_eq!(args.format, "json");
    }

    #[test]
    fn unknown_format_rejected() {
        assert!(Args::try_parse_from(["modgen", "--format", "xml"]).is_err());
    }
}
