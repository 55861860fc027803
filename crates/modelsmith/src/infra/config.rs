//! Configuration management utilities.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".modelsmith/config.toml";

/// Resolved configuration after layering defaults, user, workspace, explicit file, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct Config {
    pub generation: Generation,
    pub output: Output,
    pub templates: Templates,
}

/// Naming and attribute conventions for generated code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Generation {
    pub default_behaviors: Vec<String>,
    pub retain_behavior: String,
    pub assign_behavior: String,
    pub initializer_prefix: String,
    pub argument_prefix: String,
}

impl Default for Generation {
    fn default() -> Self {
        Self {
            default_behaviors: vec!["nonatomic".into()],
            retain_behavior: "retain".into(),
            assign_behavior: "assign".into(),
            initializer_prefix: "initWith".into(),
            argument_prefix: "in".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Output {
    pub implementation_extension: String,
    pub backup: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            implementation_extension: "m".into(),
            backup: false,
        }
    }
}

/// Optional template files replacing the built-in initializer and dealloc templates.
///
/// Relative paths are resolved against the directory of the config file that names them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Templates {
    #[serde(default)]
    pub initializer: Option<PathBuf>,
    #[serde(default)]
    pub dealloc: Option<PathBuf>,
}

/// One config file as written: every key is optional and only set keys override lower layers.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigLayer {
    #[serde(default)]
    generation: GenerationLayer,
    #[serde(default)]
    output: OutputLayer,
    #[serde(default)]
    templates: Templates,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GenerationLayer {
    default_behaviors: Option<Vec<String>>,
    retain_behavior: Option<String>,
    assign_behavior: Option<String>,
    initializer_prefix: Option<String>,
    argument_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct OutputLayer {
    implementation_extension: Option<String>,
    backup: Option<bool>,
}

impl ConfigLayer {
    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let layer = Self::from_str(&data)
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(layer.rebase_templates(base))
    }

    fn from_str(contents: &str) -> Result<Self> {
        let layer: ConfigLayer =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(layer)
    }

    fn rebase_templates(mut self, base: &Path) -> Self {
        let rebase = |path: PathBuf| {
            if path.is_relative() {
                base.join(path)
            } else {
                path
            }
        };
        self.templates.initializer = self.templates.initializer.map(rebase);
        self.templates.dealloc = self.templates.dealloc.map(rebase);
        self
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    argument_prefix: Option<String>,
    initializer_prefix: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            argument_prefix: env::var("MODELSMITH_ARGUMENT_PREFIX").ok(),
            initializer_prefix: env::var("MODELSMITH_INITIALIZER_PREFIX").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(argument_prefix: &str, initializer_prefix: &str) -> Self {
        Self {
            argument_prefix: Some(argument_prefix.to_owned()),
            initializer_prefix: Some(initializer_prefix.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config, and env overrides.
    pub fn load() -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, None, env)
    }

    /// Like [`Config::load`] with `path` layered after the workspace config and before env.
    pub fn load_with_file(path: &Path) -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, Some(path.to_path_buf()), env)
    }

    pub(crate) fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        explicit: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<ConfigLayer> = Vec::new();

        layers.push(ConfigLayer::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            tracing::debug!(path = %global_path.display(), "loading global config");
            layers.push(ConfigLayer::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            tracing::debug!(path = %workspace_path.display(), "loading workspace config");
            layers.push(ConfigLayer::from_file(&workspace_path)?);
        }

        if let Some(explicit_path) = explicit {
            tracing::debug!(path = %explicit_path.display(), "loading explicit config");
            layers.push(ConfigLayer::from_file(&explicit_path)?);
        }

        let merged = layers.into_iter().fold(Config::default(), Config::merge);
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn merge(self, layer: ConfigLayer) -> Self {
        Self {
            generation: merge_generation(self.generation, layer.generation),
            output: merge_output(self.output, layer.output),
            templates: merge_templates(self.templates, layer.templates),
        }
    }
}

fn merge_generation(base: Generation, overlay: GenerationLayer) -> Generation {
    Generation {
        default_behaviors: overlay.default_behaviors.unwrap_or(base.default_behaviors),
        retain_behavior: overlay.retain_behavior.unwrap_or(base.retain_behavior),
        assign_behavior: overlay.assign_behavior.unwrap_or(base.assign_behavior),
        initializer_prefix: overlay.initializer_prefix.unwrap_or(base.initializer_prefix),
        argument_prefix: overlay.argument_prefix.unwrap_or(base.argument_prefix),
    }
}

fn merge_output(base: Output, overlay: OutputLayer) -> Output {
    Output {
        implementation_extension: overlay
            .implementation_extension
            .unwrap_or(base.implementation_extension),
        backup: overlay.backup.unwrap_or(base.backup),
    }
}

fn merge_templates(base: Templates, overlay: Templates) -> Templates {
    Templates {
        initializer: overlay.initializer.or(base.initializer),
        dealloc: overlay.dealloc.or(base.dealloc),
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("modelsmith/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    Ok(Some(workspace_config_path_from(&cwd)))
}

fn workspace_config_path_from(start: &Path) -> PathBuf {
    let root = find_repo_root(start).unwrap_or_else(|| start.to_path_buf());
    root.join(DEFAULT_WORKSPACE_CONFIG_PATH)
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(prefix) = env.argument_prefix {
        config.generation.argument_prefix = prefix;
    }
    if let Some(prefix) = env.initializer_prefix {
        config.generation.initializer_prefix = prefix;
    }
    config
}
