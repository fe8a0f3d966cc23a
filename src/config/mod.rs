pub mod hook;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_yml::Value;
use tracing::debug;

use crate::error::ConfigError;
use crate::module::{ModuleDescriptor, OutputBase, Target, Variant};

use hook::DeclarativeHook;

/// Default settings file looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "modgen.yml";

/// Base directories generated output is routed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub client: PathBuf,
    pub server: PathBuf,
    pub shared: PathBuf,
}

impl OutputPaths {
    /// Shared output lands beside the server output unless overridden.
    pub fn new(client: impl Into<PathBuf>, server: impl Into<PathBuf>) -> Self {
        let server = server.into();
        Self {
            client: client.into(),
            shared: server.clone(),
            server,
        }
    }

    pub fn with_shared(mut self, shared: impl Into<PathBuf>) -> Self {
        self.shared = shared.into();
        self
    }

    pub fn resolve(&self, base: OutputBase) -> &Path {
        match base {
            OutputBase::Client => &self.client,
            OutputBase::Server => &self.server,
            OutputBase::Shared => &self.shared,
        }
    }
}

/// Parser settings for one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSettings {
    pub include_paths: Vec<PathBuf>,
    pub defines: Vec<String>,
}

/// Everything a generation run reads: output paths, per-target parser
/// settings and the module descriptors, in declaration order.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory relative input paths resolve against.
    pub base_dir: PathBuf,
    pub paths: OutputPaths,
    targets: HashMap<Target, TargetSettings>,
    modules: Vec<ModuleDescriptor>,
}

impl Settings {
    pub fn new(base_dir: impl Into<PathBuf>, paths: OutputPaths) -> Self {
        Self {
            base_dir: base_dir.into(),
            paths,
            targets: HashMap::new(),
            modules: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: Target, settings: TargetSettings) -> Self {
        self.targets.insert(target, settings);
        self
    }

    /// Append a module. Names must be unique.
    pub fn add_module(&mut self, module: ModuleDescriptor) -> Result<(), ConfigError> {
        if self.module(&module.name).is_some() {
            return Err(ConfigError::DuplicateModule(module.name));
        }
        self.modules.push(module);
        Ok(())
    }

    pub fn modules(&self) -> &[ModuleDescriptor] {
        &self.modules
    }

    pub fn module(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn target(&self, target: Target) -> TargetSettings {
        self.targets.get(&target).cloned().unwrap_or_default()
    }
}

/// Load settings from `path`, or `modgen.yml` in the current directory.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let path = path.unwrap_or(Path::new(DEFAULT_SETTINGS_FILE));
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let base_dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let settings = parse_settings(&contents, &base_dir).map_err(|e| match e {
        ParseFailure::Yaml(source) => ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        },
        ParseFailure::Config(e) => e,
    })?;
    debug!(
        settings = %path.display(),
        modules = settings.modules.len(),
        "settings loaded"
    );
    Ok(settings)
}

enum ParseFailure {
    Yaml(serde_yml::Error),
    Config(ConfigError),
}

impl From<ConfigError> for ParseFailure {
    fn from(e: ConfigError) -> Self {
        ParseFailure::Config(e)
    }
}

fn parse_settings(contents: &str, base_dir: &Path) -> Result<Settings, ParseFailure> {
    let raw: Value = serde_yml::from_str(contents).map_err(ParseFailure::Yaml)?;
    let Value::Mapping(map) = &raw else {
        return Err(invalid("top level must be a mapping").into());
    };

    let mut paths = OutputPaths::new(base_dir.join("client"), base_dir.join("server"));
    let mut targets = HashMap::new();
    let mut modules_value = None;

    for (key, value) in map {
        let Some(key) = key.as_str() else {
            continue;
        };
        match key {
            "paths" => paths = parse_paths(value, base_dir)?,
            "targets" => targets = parse_targets(value)?,
            "modules" => modules_value = Some(value),
            other => return Err(invalid(format!("unknown top-level key `{other}`")).into()),
        }
    }

    let Some(modules_value) = modules_value else {
        return Err(invalid("missing `modules`").into());
    };
    let Some(entries) = modules_value.as_sequence() else {
        return Err(invalid("`modules` must be a list").into());
    };

    let mut settings = Settings::new(base_dir, paths);
    settings.targets = targets;
    let mut seen = HashSet::new();
    for (i, entry) in entries.iter().enumerate() {
        let module = parse_module(entry, i)?;
        if !seen.insert(module.name.clone()) {
            return Err(ConfigError::DuplicateModule(module.name).into());
        }
        settings.modules.push(module);
    }
    Ok(settings)
}

fn parse_paths(value: &Value, base_dir: &Path) -> Result<OutputPaths, ConfigError> {
    if !value.is_mapping() {
        return Err(invalid("`paths` must be a mapping"));
    }
    let get = |key: &str| -> Result<Option<PathBuf>, ConfigError> {
        match value.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(|s| Some(base_dir.join(s)))
                .ok_or_else(|| invalid(format!("`paths.{key}` must be a string"))),
        }
    };
    let client = get("client")?.unwrap_or_else(|| base_dir.join("client"));
    let server = get("server")?.unwrap_or_else(|| base_dir.join("server"));
    let mut paths = OutputPaths::new(client, server);
    if let Some(shared) = get("shared")? {
        paths = paths.with_shared(shared);
    }
    Ok(paths)
}

fn parse_targets(value: &Value) -> Result<HashMap<Target, TargetSettings>, ConfigError> {
    let map = value
        .as_mapping()
        .ok_or_else(|| invalid("`targets` must be a mapping"))?;
    let mut targets = HashMap::new();
    for (key, value) in map {
        let name = key.as_str().unwrap_or_default();
        let target = Target::from_str(name)
            .ok_or_else(|| invalid(format!("unknown target `{name}`")))?;
        let mut settings = TargetSettings::default();
        if let Some(list) = string_list(value, "include_paths", name)? {
            settings.include_paths = list.into_iter().map(PathBuf::from).collect();
        }
        if let Some(list) = string_list(value, "defines", name)? {
            settings.defines = list;
        }
        targets.insert(target, settings);
    }
    Ok(targets)
}

fn parse_module(value: &Value, index: usize) -> Result<ModuleDescriptor, ConfigError> {
    let map = value
        .as_mapping()
        .ok_or_else(|| invalid(format!("module #{index} must be a mapping")))?;

    let name = value
        .get("name")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid(format!("module #{index} has no `name`")))?
        .to_string();

    let files = string_list(value, "files", &name)?
        .ok_or_else(|| invalid(format!("module `{name}` has no `files`")))?
        .into_iter()
        .map(PathBuf::from)
        .collect();

    let variant_str = value
        .get("variant")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(format!("module `{name}` has no `variant`")))?;
    let variant = Variant::from_str(variant_str)
        .ok_or_else(|| invalid(format!("module `{name}`: unknown variant `{variant_str}`")))?;

    let require = string_list(value, "require", &name)?.unwrap_or_default();
    let rules = match value.get("rules") {
        None => Vec::new(),
        Some(v) => hook::parse_rules(v, &name)?,
    };

    for key in map.iter().filter_map(|(k, _)| k.as_str()) {
        if !matches!(key, "name" | "files" | "variant" | "require" | "rules") {
            return Err(invalid(format!("module `{name}`: unknown key `{key}`")));
        }
    }

    let hook = DeclarativeHook::new(require, rules);
    Ok(ModuleDescriptor::new(name, files, variant, Arc::new(hook)))
}

fn string_list(value: &Value, key: &str, owner: &str) -> Result<Option<Vec<String>>, ConfigError> {
    let Some(v) = value.get(key) else {
        return Ok(None);
    };
    let seq = v
        .as_sequence()
        .ok_or_else(|| invalid(format!("`{owner}.{key}` must be a list")))?;
    seq.iter()
        .map(|item| {
            item.as_str()
                .map(String::from)
                .ok_or_else(|| invalid(format!("`{owner}.{key}` entries must be strings")))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

pub(crate) fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_settings(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("modgen.yml");
        fs::write(&path, content).unwrap();
        path
    }

    const ANIM: &str = "\
paths:
  client: out/client
  server: out/server
targets:
  client:
    include_paths: [dumps/client]
    defines: [CLIENT_DLL]
  server:
    defines: [GAME_DLL]
modules:
  - name: anim
    files: [animation.h]
    variant: shared
    rules:
      - exclude: all
      - include: { function: LookupActivity }
  - name: physics
    files: [physics.h, vphysics.h]
    variant: pure_shared
";

    #[test]
    fn loads_modules_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_settings(dir.path(), ANIM);
        let settings = load_settings(Some(&path)).unwrap();
        let names: Vec<&str> = settings.modules().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["anim", "physics"]);

        let physics = settings.module("physics").unwrap();
        assert_eq!(physics.variant, Variant::PureShared);
        assert_eq!(
            physics.files,
            vec![PathBuf::from("physics.h"), PathBuf::from("vphysics.h")]
        );
    }

    #[test]
    fn paths_resolve_against_settings_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_settings(dir.path(), ANIM);
        let settings = load_settings(Some(&path)).unwrap();
        assert_eq!(settings.paths.client, dir.path().join("out/client"));
        assert_eq!(settings.paths.server, dir.path().join("out/server"));
        // No explicit shared path: falls back to the server path.
        assert_eq!(settings.paths.resolve(OutputBase::Shared), dir.path().join("out/server"));
        assert_eq!(settings.base_dir, dir.path());
    }

    #[test]
    fn target_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_settings(dir.path(), ANIM);
        let settings = load_settings(Some(&path)).unwrap();
        let client = settings.target(Target::Client);
        assert_eq!(client.include_paths, vec![PathBuf::from("dumps/client")]);
        assert_eq!(client.defines, vec!["CLIENT_DLL".to_string()]);
        assert!(settings.target(Target::Server).include_paths.is_empty());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_settings(Some(Path::new("/nonexistent/modgen.yml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_settings(dir.path(), "modules: [unclosed\n");
        assert!(matches!(
            load_settings(Some(&path)).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn duplicate_modules_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_settings(
            dir.path(),
            "modules:\n  - {name: a, files: [a.h], variant: client}\n  - {name: a, files: [b.h], variant: server}\n",
        );
        match load_settings(Some(&path)).unwrap_err() {
            ConfigError::DuplicateModule(name) => assert_eq!(name, "a"),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn invalid_modules_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for (content, needle) in [
            ("paths: {}\n", "missing `modules`"),
            ("modules:\n  - {files: [a.h], variant: client}\n", "has no `name`"),
            ("modules:\n  - {name: a, variant: client}\n", "has no `files`"),
            ("modules:\n  - {name: a, files: [a.h], variant: both}\n", "unknown variant `both`"),
            ("modules:\n  - {name: a, files: [a.h], variant: client, extra: 1}\n", "unknown key `extra`"),
            ("bogus: 1\nmodules: []\n", "unknown top-level key `bogus`"),
            ("targets: {mobile: {}}\nmodules: []\n", "unknown target `mobile`"),
        ] {
            let path = write_settings(dir.path(), content);
            let err = load_settings(Some(&path)).unwrap_err();
            assert!(
                err.to_string().contains(needle),
                "expected `{needle}` in `{err}`"
            );
        }
    }

    #[test]
    fn add_module_rejects_duplicates() {
        use crate::module::{HookContext, ModuleDescriptor};
        use crate::rules::RuleSet;
        fn hook(_: &HookContext<'_>) -> Result<RuleSet, crate::error::RuleError> {
            Ok(RuleSet::new())
        }
        let mut settings = Settings::new(".", OutputPaths::new("c", "s"));
        settings
            .add_module(ModuleDescriptor::new("m", vec![], Variant::Client, Arc::new(hook)))
            .unwrap();
        assert!(matches!(
            settings.add_module(ModuleDescriptor::new("m", vec![], Variant::Server, Arc::new(hook))),
            Err(ConfigError::DuplicateModule(_))
        ));
    }
}
